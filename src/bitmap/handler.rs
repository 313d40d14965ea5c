//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ScaledBitmap` 只负责流程编排，不持有任何跨调用的可变状态。
//! 解码链路固定为：
//! 1. 按来源加载原始字节
//! 2. 只读 header 测量原图尺寸
//! 3. 计算采样倍率并按倍率解码
//! 4. 需要精确尺寸时再做一次显式缩放，并立即回收中间位图
//!
//! 持久化链路在此基础上追加“选择格式 → 解析目录 → 生成文件名 → 写入”。
//!
//! ## 采样策略约定
//!
//! | 调用点 | 策略 |
//! |--------|------|
//! | 资源 / 本地路径 | `Ratio` |
//! | 网络地址（含所有保存到磁盘的 URL 入口） | `PowerOfTwo` |

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::persist::{self, CompressFormat, FileNaming, GifHandling};
use super::pipeline::{decode_with_factor, measure_bounds, resize_exact};
use super::sample::{SampleFactor, SamplePolicy, TargetSize, compute_sample_factor};
use super::source::{ImageSource, RawImageData};
use super::{Bitmap, BitmapConfig, BitmapError};
use crate::context::AppContext;
use crate::storage;

/// 解码、缩放、下载与持久化的统一入口。
pub struct ScaledBitmap {
    pub(super) context: AppContext,
    pub(super) config: BitmapConfig,
}

impl ScaledBitmap {
    /// 使用默认配置创建。
    ///
    /// # 示例
    /// ```rust
    /// use scaled_bitmap::{AppContext, ScaledBitmap};
    ///
    /// let helper = ScaledBitmap::new(AppContext::new("/tmp/cache", "/tmp/sdcard"));
    /// assert_eq!(helper.config().compress_quality, 85);
    /// ```
    pub fn new(context: AppContext) -> Self {
        Self {
            context,
            config: BitmapConfig::default(),
        }
    }

    /// 使用自定义配置创建，配置非法时返回 `Config`。
    pub fn with_config(context: AppContext, config: BitmapConfig) -> Result<Self, BitmapError> {
        config.validate()?;
        Ok(Self { context, config })
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn config(&self) -> &BitmapConfig {
        &self.config
    }

    /// 完整解码本地文件。
    pub fn create_from_path(&self, path: impl AsRef<Path>) -> Result<Bitmap, BitmapError> {
        let source = ImageSource::FilePath(path.as_ref().to_path_buf());
        self.decode_and_scale(&source, None, SamplePolicy::Ratio, false)
    }

    /// 按 `Ratio` 策略采样解码本地文件，结果不小于目标尺寸的约束边。
    pub fn create_scaled_from_path(
        &self,
        path: impl AsRef<Path>,
        target: TargetSize,
    ) -> Result<Bitmap, BitmapError> {
        let source = ImageSource::FilePath(path.as_ref().to_path_buf());
        self.decode_and_scale(&source, Some(target), SamplePolicy::Ratio, false)
    }

    /// 按 `Ratio` 策略采样解码资源图片。
    pub fn create_from_resource(&self, id: u32, target: TargetSize) -> Result<Bitmap, BitmapError> {
        self.decode_and_scale(&ImageSource::Resource(id), Some(target), SamplePolicy::Ratio, false)
    }

    /// 按 `Ratio` 策略采样解码资源图片，再精确缩放到目标尺寸。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use scaled_bitmap::{AppContext, ScaledBitmap, TargetSize};
    ///
    /// let ctx = AppContext::new("/tmp/cache", "/tmp/sdcard")
    ///     .with_resource(1, std::fs::read("banner.png")?)?;
    /// let helper = ScaledBitmap::new(ctx);
    /// let bitmap = helper.create_from_resource_exact_size(1, TargetSize::new(0, 120))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn create_from_resource_exact_size(
        &self,
        id: u32,
        target: TargetSize,
    ) -> Result<Bitmap, BitmapError> {
        self.decode_and_scale(&ImageSource::Resource(id), Some(target), SamplePolicy::Ratio, true)
    }

    /// 下载并按原始尺寸解码远程图片。
    pub fn create_from_web_address(&self, url: &str) -> Result<Bitmap, BitmapError> {
        self.create_scaled_from_web_address(url, None)
    }

    /// 下载远程图片；给定目标尺寸时按 `PowerOfTwo` 策略采样解码。
    pub fn create_scaled_from_web_address(
        &self,
        url: &str,
        target: Option<TargetSize>,
    ) -> Result<Bitmap, BitmapError> {
        let source = ImageSource::Url(url.to_string());
        self.decode_and_scale(&source, target, SamplePolicy::PowerOfTwo, false)
    }

    /// 通用两阶段解码：测量尺寸 → 计算倍率 → 采样解码 →（可选）精确缩放。
    ///
    /// `target` 为 `None` 时按原始尺寸解码，忽略 `policy` 与 `exact`。
    pub fn decode_and_scale(
        &self,
        source: &ImageSource,
        target: Option<TargetSize>,
        policy: SamplePolicy,
        exact: bool,
    ) -> Result<Bitmap, BitmapError> {
        let total_start = Instant::now();

        let load_start = Instant::now();
        let raw = self.load_source(source)?;
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let bitmap = self.decode_raw(&raw, target, policy, exact)?;
        let decode_elapsed = decode_start.elapsed();

        log::info!(
            "✅ 位图处理完成 - 来源: {} load={}ms decode={}ms total={}ms",
            raw.source_hint,
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(bitmap)
    }

    fn decode_raw(
        &self,
        raw: &RawImageData,
        target: Option<TargetSize>,
        policy: SamplePolicy,
        exact: bool,
    ) -> Result<Bitmap, BitmapError> {
        let Some(target) = target else {
            return decode_with_factor(raw, SampleFactor::ONE, &self.config);
        };

        let bounds = measure_bounds(&raw.bytes)?;
        let factor = compute_sample_factor(bounds, target, policy)?;
        let mut sampled = decode_with_factor(raw, factor, &self.config)?;

        if !exact {
            return Ok(sampled);
        }

        let resolved = target.resolve(bounds)?;
        let exact_bitmap = resize_exact(&sampled, resolved, &self.config)?;
        sampled.recycle();

        Ok(exact_bitmap)
    }

    /// 下载远程图片并保存到外部存储子目录，文件名为毫秒时间戳。
    ///
    /// jpg / jpeg → JPEG，png / gif → PNG，其余扩展名返回 `InvalidArgument`。
    pub fn save_to_external(
        &self,
        url: &str,
        target: Option<TargetSize>,
        sub_folder: &str,
    ) -> Result<PathBuf, BitmapError> {
        let format = CompressFormat::from_url(url, GifHandling::CoerceToPng)?;
        let mut bitmap = self.create_scaled_from_web_address(url, target)?;
        let dir = storage::get_external_dir(&self.context, sub_folder)?;

        self.persist(&mut bitmap, &dir, FileNaming::Timestamp, format, true)
    }

    /// 下载远程图片并保存到缓存目录，文件名为毫秒时间戳加随机数。
    ///
    /// 仅接受 jpg / jpeg / png。
    pub fn save_url_to_cache(
        &self,
        url: &str,
        target: Option<TargetSize>,
    ) -> Result<PathBuf, BitmapError> {
        let format = CompressFormat::from_url(url, GifHandling::Reject)?;
        let mut bitmap = self.create_scaled_from_web_address(url, target)?;
        let dir = storage::get_cache_dir(&self.context)?;

        self.persist(&mut bitmap, &dir, FileNaming::TimestampWithRandom, format, true)
    }

    /// 下载远程图片并以指定格式保存到缓存目录，不依赖 URL 扩展名。
    pub fn save_url_to_cache_as(
        &self,
        url: &str,
        target: Option<TargetSize>,
        format: CompressFormat,
    ) -> Result<PathBuf, BitmapError> {
        let mut bitmap = self.create_scaled_from_web_address(url, target)?;
        let dir = storage::get_cache_dir(&self.context)?;

        self.persist(&mut bitmap, &dir, FileNaming::Timestamp, format, true)
    }

    /// 将已有位图保存到缓存目录；`destroy` 为真时保存后回收位图。
    pub fn save_bitmap_to_cache(
        &self,
        bitmap: &mut Bitmap,
        format: CompressFormat,
        destroy: bool,
    ) -> Result<PathBuf, BitmapError> {
        let dir = storage::get_cache_dir(&self.context)?;
        self.persist(bitmap, &dir, FileNaming::Timestamp, format, destroy)
    }

    fn persist(
        &self,
        bitmap: &mut Bitmap,
        dir: &Path,
        naming: FileNaming,
        format: CompressFormat,
        destroy: bool,
    ) -> Result<PathBuf, BitmapError> {
        let destination = dir.join(persist::file_name(naming, format));
        persist::save_image(
            bitmap,
            &destination,
            format,
            self.config.compress_quality,
            destroy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::test_support::{create_png_bytes, local_config};

    fn helper_with_resource(width: u32, height: u32) -> (tempfile::TempDir, ScaledBitmap) {
        let root = tempfile::tempdir().expect("create temp dir failed");
        let ctx = AppContext::new(root.path().join("cache"), root.path().join("sdcard"))
            .with_resource(7, create_png_bytes(width, height))
            .expect("register resource failed");
        let helper = ScaledBitmap::with_config(ctx, local_config()).expect("helper init failed");
        (root, helper)
    }

    #[test]
    fn resource_decode_uses_ratio_policy() {
        let (_root, helper) = helper_with_resource(1000, 500);

        let bitmap = helper
            .create_from_resource(7, TargetSize::new(100, 100))
            .expect("decode should succeed");

        assert_eq!(bitmap.dimensions().unwrap(), (200, 100));
    }

    #[test]
    fn exact_size_derives_missing_axis() {
        let (_root, helper) = helper_with_resource(1000, 500);

        let bitmap = helper
            .create_from_resource_exact_size(7, TargetSize::new(0, 100))
            .expect("decode should succeed");

        assert_eq!(bitmap.dimensions().unwrap(), (200, 100));
    }

    #[test]
    fn exact_size_resizes_after_sampling() {
        let (_root, helper) = helper_with_resource(1000, 500);

        let bitmap = helper
            .create_from_resource_exact_size(7, TargetSize::new(150, 0))
            .expect("decode should succeed");

        assert_eq!(bitmap.dimensions().unwrap(), (150, 75));
    }

    #[test]
    fn invalid_resource_ids_are_rejected() {
        let (_root, helper) = helper_with_resource(10, 10);

        assert!(matches!(
            helper.create_from_resource(0, TargetSize::new(5, 5)),
            Err(BitmapError::InvalidArgument(_))
        ));
        assert!(matches!(
            helper.create_from_resource(99, TargetSize::new(5, 5)),
            Err(BitmapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_target_is_rejected() {
        let (_root, helper) = helper_with_resource(10, 10);

        let result = helper.create_from_resource_exact_size(7, TargetSize::new(0, 0));

        assert!(matches!(result, Err(BitmapError::InvalidArgument(_))));
    }

    #[test]
    fn missing_path_is_decode_error() {
        let (root, helper) = helper_with_resource(10, 10);

        let result = helper.create_from_path(root.path().join("nope.png"));

        assert!(matches!(result, Err(BitmapError::Decode(_))));
    }

    #[test]
    fn text_file_is_invalid_format() {
        let (root, helper) = helper_with_resource(10, 10);
        let path = root.path().join("notes.png");
        std::fs::write(&path, b"just some text").expect("write failed");

        let result = helper.create_from_path(&path);

        assert!(matches!(result, Err(BitmapError::InvalidFormat(_))));
    }

    #[test]
    fn exact_size_over_limits_is_resource_limit() {
        let (_root, helper) = helper_with_resource(100, 50);

        for target in [TargetSize::new(u32::MAX, 0), TargetSize::new(100_000, 0)] {
            let result = helper.create_from_resource_exact_size(7, target);
            assert!(matches!(result, Err(BitmapError::ResourceLimit(_))));
        }
    }

    #[test]
    fn path_decode_keeps_full_size() {
        let (root, helper) = helper_with_resource(10, 10);
        let path = root.path().join("photo.png");
        std::fs::write(&path, create_png_bytes(64, 48)).expect("write failed");

        let full = helper.create_from_path(&path).expect("decode should succeed");
        let scaled = helper
            .create_scaled_from_path(&path, TargetSize::new(16, 0))
            .expect("decode should succeed");

        assert_eq!(full.dimensions().unwrap(), (64, 48));
        assert_eq!(scaled.dimensions().unwrap(), (16, 12));
    }

    #[test]
    fn bitmap_saved_to_cache_honours_destroy_flag() {
        let (_root, helper) = helper_with_resource(32, 32);
        let mut bitmap = helper
            .create_from_resource(7, TargetSize::new(32, 32))
            .expect("decode should succeed");

        let kept = helper
            .save_bitmap_to_cache(&mut bitmap, CompressFormat::Png, false)
            .expect("save should succeed");
        assert!(!bitmap.is_recycled());
        assert!(kept.starts_with(std::path::absolute(helper.context().cache_dir()).unwrap()));
        assert_eq!(kept.extension().and_then(|e| e.to_str()), Some("png"));

        helper
            .save_bitmap_to_cache(&mut bitmap, CompressFormat::Jpeg, true)
            .expect("save should succeed");
        assert!(bitmap.is_recycled());
    }
}
