//! # 解码与缩放流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 尺寸 → 采样解码 → 精确缩放”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. `measure_bounds`：只读 header 获取真实宽高
//! 2. 按像素上限 / 内存上限快速拒绝
//! 3. `decode_with_factor`：完整解码后按采样倍率降采样（Box 滤镜）
//! 4. `resize_exact`：需要精确尺寸时再做一次显式缩放

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Rgba};
use std::io::Cursor;

use super::sample::{ImageBounds, SampleFactor, TargetSize};
use super::source::RawImageData;
use super::{Bitmap, BitmapConfig, BitmapError};

/// 仅通过内存中的图片头信息读取宽高，不分配像素缓冲。
pub fn measure_bounds(bytes: &[u8]) -> Result<ImageBounds, BitmapError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BitmapError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    if reader.format().is_none() {
        return Err(BitmapError::InvalidFormat("无法识别图片格式".to_string()));
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| BitmapError::Decode(format!("无法读取图片尺寸：{}", e)))?;

    Ok(ImageBounds::new(width, height))
}

/// 按采样倍率解码，输出尺寸为 `max(1, w / factor) × max(1, h / factor)`。
pub fn decode_with_factor(
    raw: &RawImageData,
    factor: SampleFactor,
    config: &BitmapConfig,
) -> Result<Bitmap, BitmapError> {
    let bounds = measure_bounds(&raw.bytes)?;
    validate_pixel_limits(config, bounds)?;
    validate_decoded_memory_limits(config, bounds)?;

    let decoded = image::load_from_memory(&raw.bytes)
        .map_err(|e| BitmapError::Decode(format!("图片解码失败：{}", e)))?;

    let (raw_width, raw_height) = decoded.dimensions();
    let sampled = subsample(decoded, factor)?;
    let (width, height) = sampled.dimensions();

    log::info!(
        "✅ 图片解码成功 - 来源: {} 原始尺寸: {}x{} 采样倍率: {} 输出尺寸: {}x{}",
        raw.source_hint,
        raw_width,
        raw_height,
        factor.get(),
        width,
        height
    );

    Ok(Bitmap::new(sampled))
}

/// 将位图缩放到精确尺寸，返回新的位图，原位图保持不变。
///
/// 目标尺寸与解码一样受 `max_decoded_pixels` / `max_decoded_bytes` 约束，
/// 超限时在分配目标缓冲之前返回 `ResourceLimit`。
///
/// 注意：发生缩放时输出统一为 RGBA8，16 位与灰度图的位深不会保留；
/// 目标尺寸与原图相同时原样复制，色彩类型不变。
pub fn resize_exact(
    bitmap: &Bitmap,
    target: TargetSize,
    config: &BitmapConfig,
) -> Result<Bitmap, BitmapError> {
    if target.width == 0 || target.height == 0 {
        return Err(BitmapError::InvalidArgument(format!(
            "精确缩放目标尺寸必须大于 0：{}x{}",
            target.width, target.height
        )));
    }

    let target_bounds = ImageBounds::new(target.width, target.height);
    validate_pixel_limits(config, target_bounds)?;
    validate_decoded_memory_limits(config, target_bounds)?;

    let filter = config.resize_filter;
    let image = bitmap.image()?;
    let (width, height) = image.dimensions();

    if (width, height) == (target.width, target.height) {
        return Ok(Bitmap::new(image.clone()));
    }

    log::debug!(
        "🧩 精确缩放：{}x{} -> {}x{}（filter={:?}）",
        width,
        height,
        target.width,
        target.height,
        filter
    );

    let resized = match resize_with_fast_image_resize(
        image,
        target.width,
        target.height,
        filter.to_fast_alg(),
    ) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}", err);
            image.resize_exact(target.width, target.height, filter.to_image_filter())
        }
    };

    Ok(Bitmap::new(resized))
}

/// 倍率为 1 时原样返回；否则输出 RGBA8。
fn subsample(image: DynamicImage, factor: SampleFactor) -> Result<DynamicImage, BitmapError> {
    if factor == SampleFactor::ONE {
        return Ok(image);
    }

    let (width, height) = image.dimensions();
    let target_width = factor.apply(width);
    let target_height = factor.apply(height);

    match resize_with_fast_image_resize(
        &image,
        target_width,
        target_height,
        fr::ResizeAlg::Convolution(fr::FilterType::Box),
    ) {
        Ok(sampled) => Ok(sampled),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 降采样失败，回退 image::resize_exact：{}", err);
            Ok(image.resize_exact(
                target_width,
                target_height,
                image::imageops::FilterType::Nearest,
            ))
        }
    }
}

/// 校验像素数量是否超过配置上限。
fn validate_pixel_limits(config: &BitmapConfig, bounds: ImageBounds) -> Result<(), BitmapError> {
    let pixels = u64::from(bounds.width)
        .checked_mul(u64::from(bounds.height))
        .ok_or_else(|| BitmapError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(BitmapError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn validate_decoded_memory_limits(
    config: &BitmapConfig,
    bounds: ImageBounds,
) -> Result<(), BitmapError> {
    let estimated = u64::from(bounds.width)
        .checked_mul(u64::from(bounds.height))
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| BitmapError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > config.max_decoded_bytes {
        return Err(BitmapError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    algorithm: fr::ResizeAlg,
) -> Result<DynamicImage, BitmapError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image =
        fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| BitmapError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new().resize_alg(algorithm);

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| BitmapError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
        target_width,
        target_height,
        dst_image.into_vec(),
    )
    .ok_or_else(|| BitmapError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}
