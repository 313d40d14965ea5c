//! # 位图与回收守卫
//!
//! ## 设计思路
//!
//! 解码后的像素缓冲通常是整条链路中最大的内存块，需要显式、可观测的释放语义：
//! - `Bitmap::recycle` 立即释放像素，重复调用无副作用；
//! - 回收后的任何像素访问都会返回 `InvalidState`；
//! - `RecycleGuard` 采用 RAII 模式，在所有退出路径（含错误提前返回）上按需回收。

use image::{DynamicImage, GenericImageView};

use super::BitmapError;

/// 已解码的位图。
#[derive(Debug)]
pub struct Bitmap {
    pixels: Option<DynamicImage>,
}

impl Bitmap {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            pixels: Some(image),
        }
    }

    /// 借用底层图像；已回收时返回 `InvalidState`。
    pub fn image(&self) -> Result<&DynamicImage, BitmapError> {
        self.pixels
            .as_ref()
            .ok_or_else(|| BitmapError::InvalidState("位图已被回收".to_string()))
    }

    /// 取出底层图像，消耗位图本身。
    pub fn into_image(self) -> Result<DynamicImage, BitmapError> {
        self.pixels
            .ok_or_else(|| BitmapError::InvalidState("位图已被回收".to_string()))
    }

    pub fn dimensions(&self) -> Result<(u32, u32), BitmapError> {
        Ok(self.image()?.dimensions())
    }

    /// 像素缓冲占用的字节数；回收后为 0。
    pub fn byte_count(&self) -> usize {
        self.pixels.as_ref().map_or(0, |image| image.as_bytes().len())
    }

    pub fn is_recycled(&self) -> bool {
        self.pixels.is_none()
    }

    /// 释放像素缓冲。返回本次调用是否真正释放了内存。
    pub fn recycle(&mut self) -> bool {
        match self.pixels.take() {
            Some(image) => {
                let (width, height) = image.dimensions();
                drop(image);
                log::debug!("♻️ 已回收位图 {}x{}", width, height);
                true
            }
            None => false,
        }
    }
}

impl From<DynamicImage> for Bitmap {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

/// 位图回收的 RAII 守卫。
///
/// `destroy == true` 时，守卫离开作用域即回收位图，无论调用是成功还是提前返回错误；
/// `destroy == false` 时守卫不做任何事，位图保持可用。
///
/// # 示例
/// ```rust
/// use image::DynamicImage;
/// use scaled_bitmap::{Bitmap, RecycleGuard};
///
/// let mut bitmap = Bitmap::new(DynamicImage::new_rgba8(4, 4));
/// {
///     let guard = RecycleGuard::new(&mut bitmap, true);
///     assert_eq!(guard.bitmap().dimensions().unwrap(), (4, 4));
/// }
/// assert!(bitmap.is_recycled());
/// ```
pub struct RecycleGuard<'a> {
    bitmap: &'a mut Bitmap,
    destroy: bool,
}

impl<'a> RecycleGuard<'a> {
    pub fn new(bitmap: &'a mut Bitmap, destroy: bool) -> Self {
        Self { bitmap, destroy }
    }

    pub fn bitmap(&self) -> &Bitmap {
        &*self.bitmap
    }
}

impl Drop for RecycleGuard<'_> {
    fn drop(&mut self) {
        if self.destroy {
            self.bitmap.recycle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycled_bitmap_rejects_pixel_access() {
        let mut bitmap = Bitmap::new(DynamicImage::new_rgba8(8, 4));
        assert_eq!(bitmap.byte_count(), 8 * 4 * 4);

        assert!(bitmap.recycle());
        assert!(!bitmap.recycle());
        assert!(bitmap.is_recycled());
        assert_eq!(bitmap.byte_count(), 0);
        assert!(matches!(bitmap.dimensions(), Err(BitmapError::InvalidState(_))));
    }

    #[test]
    fn guard_without_destroy_keeps_bitmap_alive() {
        let mut bitmap = Bitmap::new(DynamicImage::new_rgb8(2, 2));
        {
            let _guard = RecycleGuard::new(&mut bitmap, false);
        }

        assert!(!bitmap.is_recycled());
    }

    #[test]
    fn guard_recycles_on_early_error_return() {
        fn failing_write(bitmap: &mut Bitmap) -> Result<(), BitmapError> {
            let _guard = RecycleGuard::new(bitmap, true);
            Err(BitmapError::Io("磁盘已满".to_string()))
        }

        let mut bitmap = Bitmap::new(DynamicImage::new_rgb8(2, 2));
        assert!(failing_write(&mut bitmap).is_err());
        assert!(bitmap.is_recycled());
    }
}
