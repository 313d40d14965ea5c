//! # 位图处理模块（bitmap）
//!
//! ## 设计思路
//!
//! 该模块将“来源加载 → 尺寸测量 → 采样倍率 → 解码缩放 → 编码落盘”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `handler`：对外入口 `ScaledBitmap`，编排整条处理流水线
//! - `loader`：负责文件 / 资源 / URL 加载与签名校验
//! - `sample`：采样倍率计算（`Ratio` / `PowerOfTwo`）
//! - `pipeline`：尺寸测量、按倍率解码、精确缩放
//! - `persist`：格式选择、文件命名、编码写入
//! - `recycle`：位图与 RAII 回收守卫
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 调用链
//!
//! ```text
//! ScaledBitmap::create_* / save_*
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 体积 / 签名校验）
//!    ├─ pipeline.rs（measure_bounds → decode_with_factor → resize_exact）
//!    │     └─ sample.rs（compute_sample_factor）
//!    └─ persist.rs（save_image + RecycleGuard）
//! ```
//!
//! 所有操作都是同步阻塞的，调用方如需避免阻塞请自行放到后台线程执行。

mod config;
mod error;
mod handler;
mod loader;
mod persist;
mod pipeline;
mod recycle;
mod sample;
mod source;

pub use config::{BitmapConfig, DEFAULT_COMPRESS_QUALITY, ResizeFilter};
pub use error::BitmapError;
pub use handler::ScaledBitmap;
pub use persist::{CompressFormat, FileNaming, GifHandling, file_name, save_image};
pub use pipeline::{decode_with_factor, measure_bounds, resize_exact};
pub use recycle::{Bitmap, RecycleGuard};
pub use sample::{ImageBounds, SampleFactor, SamplePolicy, TargetSize, compute_sample_factor};
pub use source::{ImageSource, RawImageData};
