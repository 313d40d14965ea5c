//! 图片存储目录管理模块
//!
//! # 设计思路
//!
//! 统一管理持久化图片的落盘目录：外部存储下的调用方子目录，或上下文给定的缓存目录。
//!
//! # 实现思路
//!
//! - 子目录按“外部存储根目录 + 相对路径”拼接，拒绝 `..` 与绝对前缀逃逸。
//! - 目录不存在时自动 `create_dir_all`，避免上层判断。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::bitmap::BitmapError;
use crate::context::AppContext;

/// 存储目录信息
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageInfo {
    pub path: String,
    pub total_size: u64,
    pub file_count: u64,
}

/// 获取外部存储下的子目录，不存在时自动创建。
///
/// `sub_folder` 可带前导 `/`（如 `"/myapp/images"`），始终解析在外部存储根目录之下。
pub fn get_external_dir(ctx: &AppContext, sub_folder: &str) -> Result<PathBuf, BitmapError> {
    let relative = sanitize_sub_folder(sub_folder)?;
    let dir = ctx.external_storage_dir().join(relative);
    ensure_dir(&dir)?;
    Ok(dir)
}

/// 获取缓存目录，不存在时自动创建。
pub fn get_cache_dir(ctx: &AppContext) -> Result<PathBuf, BitmapError> {
    let dir = ctx.cache_dir().to_path_buf();
    ensure_dir(&dir)?;
    Ok(dir)
}

/// 获取缓存目录信息（路径 + 占用大小 + 文件数）
pub fn cache_dir_info(ctx: &AppContext) -> Result<StorageInfo, BitmapError> {
    let dir = get_cache_dir(ctx)?;
    let mut total_size: u64 = 0;
    let mut file_count: u64 = 0;

    if let Ok(entries) = fs::read_dir(&dir) {
        for entry in entries.flatten() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    total_size += metadata.len();
                    file_count += 1;
                }
            }
        }
    }

    Ok(StorageInfo {
        path: dir.to_string_lossy().to_string(),
        total_size,
        file_count,
    })
}

fn ensure_dir(dir: &Path) -> Result<(), BitmapError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            BitmapError::Io(format!("创建目录 '{}' 失败：{}", dir.display(), e))
        })?;
        log::debug!("📁 已创建目录：{}", dir.display());
    }
    Ok(())
}

fn sanitize_sub_folder(sub_folder: &str) -> Result<PathBuf, BitmapError> {
    let mut relative = PathBuf::new();
    for component in Path::new(sub_folder).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(BitmapError::InvalidArgument(format!(
                    "子目录不能跳出外部存储：{}",
                    sub_folder
                )));
            }
        }
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_dir_is_created_under_root() {
        let root = tempfile::tempdir().expect("create temp dir failed");
        let ctx = AppContext::new(root.path().join("cache"), root.path().join("sdcard"));

        let dir = get_external_dir(&ctx, "/myapp/images").expect("resolve dir failed");

        assert_eq!(dir, root.path().join("sdcard").join("myapp").join("images"));
        assert!(dir.is_dir());
    }

    #[test]
    fn parent_components_are_rejected() {
        let root = tempfile::tempdir().expect("create temp dir failed");
        let ctx = AppContext::new(root.path().join("cache"), root.path().join("sdcard"));

        let result = get_external_dir(&ctx, "../escape");

        assert!(matches!(result, Err(BitmapError::InvalidArgument(_))));
    }

    #[test]
    fn cache_dir_info_counts_files() {
        let root = tempfile::tempdir().expect("create temp dir failed");
        let ctx = AppContext::new(root.path().join("cache"), root.path().join("sdcard"));
        let cache = get_cache_dir(&ctx).expect("resolve cache failed");
        fs::write(cache.join("a.png"), [0u8; 10]).expect("write failed");
        fs::write(cache.join("b.jpg"), [0u8; 5]).expect("write failed");

        let info = cache_dir_info(&ctx).expect("info failed");

        assert_eq!(info.file_count, 2);
        assert_eq!(info.total_size, 15);
    }
}
