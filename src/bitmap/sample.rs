//! # 采样倍率模块
//!
//! ## 设计思路
//!
//! 在完整解码前，根据原图真实尺寸（`ImageBounds`）与调用方期望尺寸（`TargetSize`）
//! 计算整数采样倍率，使解码结果在约束方向上不小于目标尺寸，同时尽量减小内存占用。
//!
//! ## 实现思路
//!
//! - 目标尺寸某一边为 0 时，按原图宽高比推导该边（整数截断，最小为 1）。
//! - 提供两种策略：
//!   - `Ratio`：两边四舍五入比值取较小者，下限为 1，不保证是 2 的幂。
//!   - `PowerOfTwo`：从 1 开始翻倍，直到再翻倍会让任一边低于目标。
//! - 两种策略数值上不可互换，每个调用点固定使用其中之一。

use super::BitmapError;

/// 原图真实像素尺寸，来自仅解析 header 的测量阶段。
///
/// `Default`（0×0）表示尚未测量。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageBounds {
    pub width: u32,
    pub height: u32,
}

impl ImageBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_measured(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// 调用方期望的输出尺寸。某一边为 0 表示按宽高比推导。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 将 0 边按原图宽高比补齐，返回两边都大于 0 的目标尺寸。
    ///
    /// # 示例
    /// ```rust
    /// use scaled_bitmap::{ImageBounds, TargetSize};
    ///
    /// let resolved = TargetSize::new(0, 100).resolve(ImageBounds::new(1000, 500))?;
    /// assert_eq!(resolved, TargetSize::new(200, 100));
    /// # Ok::<(), scaled_bitmap::BitmapError>(())
    /// ```
    pub fn resolve(self, bounds: ImageBounds) -> Result<TargetSize, BitmapError> {
        ensure_measured(bounds)?;

        match (self.width, self.height) {
            (0, 0) => Err(BitmapError::InvalidArgument(
                "请传入大于 0 的目标宽度或高度".to_string(),
            )),
            (0, height) => Ok(Self {
                width: derive_axis(height, bounds.width, bounds.height),
                height,
            }),
            (width, 0) => Ok(Self {
                width,
                height: derive_axis(width, bounds.height, bounds.width),
            }),
            _ => Ok(self),
        }
    }
}

/// 采样倍率，恒大于等于 1。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SampleFactor(u32);

impl SampleFactor {
    pub const ONE: SampleFactor = SampleFactor(1);

    pub fn new(value: u32) -> Option<Self> {
        (value >= 1).then_some(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// 按倍率缩小后的单边尺寸，最小为 1。
    pub fn apply(self, dimension: u32) -> u32 {
        (dimension / self.0).max(1)
    }
}

/// 采样倍率选择策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePolicy {
    /// 宽高比值四舍五入后取较小者，至少为 1。
    Ratio,
    /// 2 的幂，命中解码器常见的快速降采样路径。
    PowerOfTwo,
}

/// 计算采样倍率。
///
/// 先校验原图已测量（否则 `InvalidState`），再校验目标尺寸（否则 `InvalidArgument`）。
///
/// # 示例
/// ```rust
/// use scaled_bitmap::{compute_sample_factor, ImageBounds, SamplePolicy, TargetSize};
///
/// let bounds = ImageBounds::new(1000, 500);
/// let target = TargetSize::new(100, 100);
///
/// assert_eq!(compute_sample_factor(bounds, target, SamplePolicy::Ratio)?.get(), 5);
/// assert_eq!(compute_sample_factor(bounds, target, SamplePolicy::PowerOfTwo)?.get(), 4);
/// # Ok::<(), scaled_bitmap::BitmapError>(())
/// ```
pub fn compute_sample_factor(
    bounds: ImageBounds,
    target: TargetSize,
    policy: SamplePolicy,
) -> Result<SampleFactor, BitmapError> {
    let target = target.resolve(bounds)?;

    let factor = match policy {
        SamplePolicy::Ratio => ratio_factor(bounds, target),
        SamplePolicy::PowerOfTwo => power_of_two_factor(bounds, target),
    };

    log::debug!(
        "📐 采样倍率：{}x{} -> {}x{}（{:?}）= {}",
        bounds.width,
        bounds.height,
        target.width,
        target.height,
        policy,
        factor
    );

    Ok(SampleFactor(factor))
}

fn ensure_measured(bounds: ImageBounds) -> Result<(), BitmapError> {
    if !bounds.is_measured() {
        return Err(BitmapError::InvalidState(
            "请先测量原图尺寸，再计算缩放参数".to_string(),
        ));
    }
    Ok(())
}

/// `derived = requested * source_opposite / source_requested`，整数截断。
fn derive_axis(requested: u32, source_opposite: u32, source_requested: u32) -> u32 {
    let derived = u64::from(requested) * u64::from(source_opposite) / u64::from(source_requested);
    derived.clamp(1, u64::from(u32::MAX)) as u32
}

fn ratio_factor(bounds: ImageBounds, target: TargetSize) -> u32 {
    if bounds.height <= target.height && bounds.width <= target.width {
        return 1;
    }

    let height_ratio = (f64::from(bounds.height) / f64::from(target.height)).round() as u32;
    let width_ratio = (f64::from(bounds.width) / f64::from(target.width)).round() as u32;

    height_ratio.min(width_ratio).max(1)
}

fn power_of_two_factor(bounds: ImageBounds, target: TargetSize) -> u32 {
    let mut factor: u32 = 1;
    while bounds.width / factor / 2 >= target.width && bounds.height / factor / 2 >= target.height {
        factor *= 2;
    }
    factor
}
