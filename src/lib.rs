//! # scaled-bitmap — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      调用方（同步阻塞）                    │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↓ Result<T, BitmapError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  ┌─ bitmap ─────── ScaledBitmap 统一入口                  │
//! │  │   ├─ sample         采样倍率（Ratio / PowerOfTwo）     │
//! │  │   ├─ pipeline       尺寸测量·按倍率解码·精确缩放       │
//! │  │   ├─ loader         文件 / 资源 / URL 加载             │
//! │  │   ├─ persist        JPEG/PNG 编码落盘                  │
//! │  │   └─ recycle        Bitmap + RecycleGuard (RAII)       │
//! │  │                                                       │
//! │  ├─ context ────── 资源表 / 缓存目录 / 外部存储根目录      │
//! │  └─ storage ────── 目录解析与自动创建                     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`bitmap`] | 解码、采样缩放、下载、持久化与统一错误类型 `BitmapError` |
//! | [`context`] | 运行环境：资源表、缓存目录、外部存储根目录 |
//! | [`storage`] | 持久化目录的解析、创建与统计 |
//!
//! ## 快速上手
//!
//! ```rust,no_run
//! use scaled_bitmap::{AppContext, ScaledBitmap, TargetSize};
//!
//! let helper = ScaledBitmap::new(AppContext::new("/data/app/cache", "/sdcard"));
//! let path = helper.save_to_external(
//!     "https://example.com/photos/cat.jpg",
//!     Some(TargetSize::new(320, 0)),
//!     "/myapp/images",
//! )?;
//! println!("saved to {}", path.display());
//! # Ok::<(), scaled_bitmap::BitmapError>(())
//! ```

pub mod bitmap;
pub mod context;
pub mod storage;

pub use bitmap::{
    Bitmap, BitmapConfig, BitmapError, CompressFormat, FileNaming, GifHandling, ImageBounds,
    ImageSource, RawImageData, RecycleGuard, ResizeFilter, SampleFactor, SamplePolicy,
    ScaledBitmap, TargetSize, compute_sample_factor, decode_with_factor, measure_bounds,
    resize_exact, save_image,
};
pub use context::AppContext;
