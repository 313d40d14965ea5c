//! 运行环境上下文模块
//!
//! # 设计思路
//!
//! `AppContext` 集中持有位图链路依赖的外部环境：
//! - 资源表：非 0 整数 id → 已编码的图片字节
//! - 缓存目录
//! - 外部存储根目录
//!
//! 上下文只在构建阶段被修改，处理链路内只读，不引入共享可变状态。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bitmap::BitmapError;

/// 位图处理所需的运行环境。
#[derive(Debug, Clone)]
pub struct AppContext {
    resources: HashMap<u32, Vec<u8>>,
    cache_dir: PathBuf,
    external_storage_dir: PathBuf,
}

impl AppContext {
    /// # 示例
    /// ```rust
    /// use scaled_bitmap::AppContext;
    ///
    /// let ctx = AppContext::new("/tmp/app/cache", "/tmp/sdcard");
    /// assert!(ctx.cache_dir().ends_with("cache"));
    /// ```
    pub fn new(cache_dir: impl Into<PathBuf>, external_storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            resources: HashMap::new(),
            cache_dir: cache_dir.into(),
            external_storage_dir: external_storage_dir.into(),
        }
    }

    /// 注册资源并返回自身，便于链式构建。
    pub fn with_resource(mut self, id: u32, bytes: Vec<u8>) -> Result<Self, BitmapError> {
        self.register_resource(id, bytes)?;
        Ok(self)
    }

    pub fn register_resource(&mut self, id: u32, bytes: Vec<u8>) -> Result<(), BitmapError> {
        ensure_valid_resource_id(id)?;
        self.resources.insert(id, bytes);
        Ok(())
    }

    /// 从文件读取字节并注册为资源。
    pub fn register_resource_file(&mut self, id: u32, path: &Path) -> Result<(), BitmapError> {
        ensure_valid_resource_id(id)?;
        let bytes = fs::read(path).map_err(|e| {
            BitmapError::Io(format!("读取资源文件 '{}' 失败：{}", path.display(), e))
        })?;
        self.resources.insert(id, bytes);
        Ok(())
    }

    /// 查找资源字节。id 为 0 或未注册都视为参数错误。
    pub fn resource(&self, id: u32) -> Result<&[u8], BitmapError> {
        ensure_valid_resource_id(id)?;
        self.resources
            .get(&id)
            .map(Vec::as_slice)
            .ok_or_else(|| BitmapError::InvalidArgument(format!("资源不存在：{}", id)))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn external_storage_dir(&self) -> &Path {
        &self.external_storage_dir
    }
}

fn ensure_valid_resource_id(id: u32) -> Result<(), BitmapError> {
    if id == 0 {
        return Err(BitmapError::InvalidArgument("请传入有效的资源 id".to_string()));
    }
    Ok(())
}
