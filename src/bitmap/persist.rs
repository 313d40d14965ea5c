//! # 持久化模块
//!
//! ## 设计思路
//!
//! 负责把位图编码为 JPEG / PNG 并写入磁盘，以及从 URL 扩展名推断输出格式、
//! 生成基于毫秒时间戳的文件名。
//!
//! ## 实现思路
//!
//! - 写入流程为“创建文件 → 编码写入 → flush → 关闭”，不做临时文件替换。
//! - `destroy` 为真时由 `RecycleGuard` 保证所有退出路径上都回收位图。
//! - gif 只在调用方显式接受时按 PNG 重新编码（不做逐帧转码）。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat};

use super::{Bitmap, BitmapError, RecycleGuard};

const RANDOM_SUFFIX_BOUND: u64 = 10_000;

/// 输出编码格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressFormat {
    Jpeg,
    Png,
}

/// URL 以 gif 结尾时的处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GifHandling {
    /// 按 PNG 重新编码（只保留首帧）。
    CoerceToPng,
    Reject,
}

/// 文件命名方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNaming {
    /// `<毫秒时间戳><扩展名>`
    Timestamp,
    /// `<毫秒时间戳><0~9999 随机数><扩展名>`
    TimestampWithRandom,
}

impl CompressFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
        }
    }

    /// 根据 URL 扩展名选择格式（忽略大小写、query 与 fragment）。
    ///
    /// # 示例
    /// ```rust
    /// use scaled_bitmap::{CompressFormat, GifHandling};
    ///
    /// let format = CompressFormat::from_url("https://example.com/a.PNG", GifHandling::Reject)?;
    /// assert_eq!(format, CompressFormat::Png);
    /// assert_eq!(format.extension(), ".png");
    /// # Ok::<(), scaled_bitmap::BitmapError>(())
    /// ```
    pub fn from_url(url: &str, gif: GifHandling) -> Result<Self, BitmapError> {
        let extension = url_extension(url).unwrap_or_default();

        match (extension.as_str(), gif) {
            ("jpg" | "jpeg", _) => Ok(Self::Jpeg),
            ("png", _) => Ok(Self::Png),
            ("gif", GifHandling::CoerceToPng) => {
                log::warn!("⚠️ gif 将按 PNG 重新编码，动画帧不会保留");
                Ok(Self::Png)
            }
            _ => Err(BitmapError::InvalidArgument(match gif {
                GifHandling::CoerceToPng => {
                    format!("远程图片必须是 jpg、png 或 gif：{}", url)
                }
                GifHandling::Reject => format!("远程图片必须是 jpg 或 png：{}", url),
            })),
        }
    }
}

/// 提取 URL 路径最后一段的小写扩展名。
fn url_extension(url: &str) -> Option<String> {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let file_name = path.rsplit('/').next()?;
    let (_, extension) = file_name.rsplit_once('.')?;
    Some(extension.to_ascii_lowercase())
}

/// 生成持久化文件名。
pub fn file_name(naming: FileNaming, format: CompressFormat) -> String {
    let millis = Utc::now().timestamp_millis();
    match naming {
        FileNaming::Timestamp => format!("{}{}", millis, format.extension()),
        FileNaming::TimestampWithRandom => {
            format!("{}{}{}", millis, random_suffix(), format.extension())
        }
    }
}

fn random_suffix() -> u64 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    seed % RANDOM_SUFFIX_BOUND
}

/// 编码并写入位图，返回目标文件的绝对路径。
///
/// `destroy` 为真时，无论写入成功与否都会回收位图。
pub fn save_image(
    bitmap: &mut Bitmap,
    destination: &Path,
    format: CompressFormat,
    quality: u8,
    destroy: bool,
) -> Result<PathBuf, BitmapError> {
    let guard = RecycleGuard::new(bitmap, destroy);
    let image = guard.bitmap().image()?;

    let file = File::create(destination).map_err(|e| {
        BitmapError::Io(format!("无法创建文件 '{}'：{}", destination.display(), e))
    })?;
    let mut writer = BufWriter::new(file);

    encode(image, &mut writer, format, quality)?;

    writer
        .flush()
        .map_err(|e| BitmapError::Io(format!("写入图片失败：{}", e)))?;
    drop(writer);

    let absolute = std::path::absolute(destination)
        .map_err(|e| BitmapError::Io(format!("无法解析绝对路径：{}", e)))?;

    log::info!(
        "💾 图片已保存 - {:?} quality={} 路径: {}",
        format,
        quality,
        absolute.display()
    );

    Ok(absolute)
}

fn encode<W: Write>(
    image: &DynamicImage,
    writer: &mut W,
    format: CompressFormat,
    quality: u8,
) -> Result<(), BitmapError> {
    let result = match format {
        CompressFormat::Jpeg => image
            .to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(writer, quality)),
        CompressFormat::Png => image.write_with_encoder(PngEncoder::new(writer)),
    };

    result.map_err(|e| BitmapError::Io(format!("图片编码写入失败：{}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_extension_is_case_insensitive() {
        assert_eq!(
            CompressFormat::from_url("https://example.com/a/b.PNG", GifHandling::Reject).unwrap(),
            CompressFormat::Png
        );
        assert_eq!(
            CompressFormat::from_url("https://example.com/photo.JPG", GifHandling::Reject).unwrap(),
            CompressFormat::Jpeg
        );
        assert_eq!(
            CompressFormat::from_url("https://example.com/photo.jpeg", GifHandling::Reject)
                .unwrap(),
            CompressFormat::Jpeg
        );
    }

    #[test]
    fn url_extension_ignores_query_and_fragment() {
        let format =
            CompressFormat::from_url("https://cdn.example.com/img.png?w=300#top", GifHandling::Reject)
                .unwrap();

        assert_eq!(format, CompressFormat::Png);
    }

    #[test]
    fn unsupported_extension_is_invalid_argument() {
        assert!(matches!(
            CompressFormat::from_url("https://example.com/a.bmp", GifHandling::CoerceToPng),
            Err(BitmapError::InvalidArgument(_))
        ));
        assert!(matches!(
            CompressFormat::from_url("https://example.com/noext", GifHandling::Reject),
            Err(BitmapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn gif_follows_requested_handling() {
        assert_eq!(
            CompressFormat::from_url("http://example.com/anim.gif", GifHandling::CoerceToPng)
                .unwrap(),
            CompressFormat::Png
        );
        assert!(matches!(
            CompressFormat::from_url("http://example.com/anim.gif", GifHandling::Reject),
            Err(BitmapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn file_name_is_timestamp_plus_extension() {
        let name = file_name(FileNaming::Timestamp, CompressFormat::Jpeg);
        let stem = name.strip_suffix(".jpg").expect("jpg extension expected");

        assert!(!stem.is_empty());
        assert!(stem.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn save_image_respects_destroy_flag() {
        let dir = tempfile::tempdir().expect("create temp dir failed");

        let mut kept = Bitmap::new(DynamicImage::new_rgba8(16, 8));
        let kept_path = save_image(
            &mut kept,
            &dir.path().join("kept.png"),
            CompressFormat::Png,
            85,
            false,
        )
        .expect("save should succeed");
        assert!(!kept.is_recycled());
        assert!(kept_path.is_absolute());

        let mut destroyed = Bitmap::new(DynamicImage::new_rgba8(16, 8));
        let destroyed_path = save_image(
            &mut destroyed,
            &dir.path().join("destroyed.jpg"),
            CompressFormat::Jpeg,
            85,
            true,
        )
        .expect("save should succeed");
        assert!(destroyed.is_recycled());

        let reloaded = image::open(&destroyed_path).expect("saved jpeg should decode");
        assert_eq!((reloaded.width(), reloaded.height()), (16, 8));
    }

    #[test]
    fn failed_write_still_recycles_when_destroy_requested() {
        let dir = tempfile::tempdir().expect("create temp dir failed");
        let missing = dir.path().join("missing-folder").join("out.png");

        let mut bitmap = Bitmap::new(DynamicImage::new_rgba8(4, 4));
        let result = save_image(&mut bitmap, &missing, CompressFormat::Png, 85, true);

        assert!(matches!(result, Err(BitmapError::Io(_))));
        assert!(bitmap.is_recycled());
    }
}
