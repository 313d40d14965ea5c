//! # 数据源与中间模型
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节

use std::path::PathBuf;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 本地文件路径。
    FilePath(PathBuf),
    /// `AppContext` 资源表中的资源 id（0 无效）。
    Resource(u32),
    /// HTTP/HTTPS 地址。
    Url(String),
    /// 内存中的已编码字节。
    Bytes(Vec<u8>),
}

/// 加载阶段输出：原始字节与来源标识。
pub struct RawImageData {
    /// 原始图片字节。
    pub bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub source_hint: &'static str,
}

impl RawImageData {
    pub fn new(bytes: Vec<u8>, source_hint: &'static str) -> Self {
        Self { bytes, source_hint }
    }
}
