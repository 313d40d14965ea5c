//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载解码、缩放、下载、持久化链路中的所有错误来源，
//! 避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。

/// 位图处理统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum BitmapError {
    /// 尺寸为 0、资源 id 无效、扩展名不受支持、非 HTTP(S) 地址等。
    #[error("参数错误：{0}")]
    InvalidArgument(String),

    /// 尚未测量原图尺寸就请求缩放，或位图已被回收。
    #[error("状态错误：{0}")]
    InvalidState(String),

    #[error("解码错误：{0}")]
    Decode(String),

    /// 字节不是可识别的图片签名（HTML、空响应体等）。
    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("网络错误：{0}")]
    Network(String),

    /// 服务端返回非 2xx 状态码。
    #[error("HTTP 错误：{status}（{url}）")]
    Http { status: u16, url: String },

    /// 文件系统失败，消息中带上出错的路径。
    #[error("文件错误：{0}")]
    Io(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("配置错误：{0}")]
    Config(String),
}

impl BitmapError {
    /// 稳定的错误码，便于调用侧做埋点或映射。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidState(_) => "invalid_state",
            Self::Decode(_) => "decode",
            Self::InvalidFormat(_) => "invalid_format",
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Io(_) => "io",
            Self::ResourceLimit(_) => "resource_limit",
            Self::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_message_carries_status() {
        let error = BitmapError::Http {
            status: 404,
            url: "https://example.com/a.png".to_string(),
        };

        assert_eq!(error.code(), "http");
        assert!(error.to_string().contains("404"));
    }

    #[test]
    fn invalid_format_has_its_own_code() {
        let error = BitmapError::InvalidFormat("text/html".to_string());

        assert_eq!(error.code(), "invalid_format");
        assert!(error.to_string().starts_with("格式错误"));
    }
}
