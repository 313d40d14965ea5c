//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `BitmapConfig`：读取体积上限、解码像素上限、
//! 编码质量、精确缩放滤镜以及传输层超时。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置（编码质量固定 85）。
//! - 通过 `serde` 支持从 JSON 文件加载，缺省字段回落到默认值。
//! - `validate` 在构建 `ScaledBitmap` 时执行，尽早拒绝非法参数。

use std::fs;
use std::path::Path;

use fast_image_resize as fr;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::BitmapError;

/// 默认编码质量，与平台 `compress(format, 85, out)` 保持一致。
pub const DEFAULT_COMPRESS_QUALITY: u8 = 85;

/// 位图处理配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitmapConfig {
    /// 文件 / 资源 / 网络载荷允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码像素上限（`width * height`），在完整解码前按 header 校验。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// JPEG 编码质量（1~100），PNG 忽略该值。
    pub compress_quality: u8,
    /// 精确缩放阶段使用的滤镜。
    pub resize_filter: ResizeFilter,
    /// 建立连接超时（秒），`None` 表示不设置。
    pub connect_timeout_secs: Option<u64>,
    /// 整个请求超时（秒），`None` 表示不设置。
    pub request_timeout_secs: Option<u64>,
    /// 是否读取系统代理环境变量。
    pub use_system_proxy: bool,
}

impl Default for BitmapConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            compress_quality: DEFAULT_COMPRESS_QUALITY,
            resize_filter: ResizeFilter::Bilinear,
            connect_timeout_secs: None,
            request_timeout_secs: None,
            use_system_proxy: true,
        }
    }
}

/// 精确缩放滤镜。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    CatmullRom,
    Lanczos3,
}

impl ResizeFilter {
    pub(crate) fn to_fast_alg(self) -> fr::ResizeAlg {
        match self {
            Self::Nearest => fr::ResizeAlg::Nearest,
            Self::Bilinear => fr::ResizeAlg::Convolution(fr::FilterType::Bilinear),
            Self::CatmullRom => fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom),
            Self::Lanczos3 => fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3),
        }
    }

    /// fast_image_resize 失败时回退到 `image::resize_exact` 所用滤镜。
    pub(crate) fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Bilinear => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl BitmapConfig {
    /// 从 JSON 文件加载配置，缺省字段使用默认值。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use scaled_bitmap::BitmapConfig;
    ///
    /// let config = BitmapConfig::from_json_file("bitmap.json")?;
    /// # Ok::<(), scaled_bitmap::BitmapError>(())
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BitmapError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BitmapError::Config(format!("读取配置文件 '{}' 失败：{}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| BitmapError::Config(format!("解析配置文件失败：{}", e)))?;
        config.validate()?;

        log::debug!("⚙️ 已加载位图配置：{}", path.display());
        Ok(config)
    }

    /// 校验配置取值范围。
    pub fn validate(&self) -> Result<(), BitmapError> {
        if !(1..=100).contains(&self.compress_quality) {
            return Err(BitmapError::Config(format!(
                "compress_quality 必须在 1~100 之间（当前：{}）",
                self.compress_quality
            )));
        }
        if self.max_file_size == 0 {
            return Err(BitmapError::Config("max_file_size 不能为 0".to_string()));
        }
        if self.max_decoded_pixels == 0 || self.max_decoded_bytes == 0 {
            return Err(BitmapError::Config("解码上限不能为 0".to_string()));
        }
        if self.connect_timeout_secs == Some(0) || self.request_timeout_secs == Some(0) {
            return Err(BitmapError::Config("超时时间必须大于 0 秒".to_string()));
        }

        Ok(())
    }
}
