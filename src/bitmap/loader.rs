//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 统一处理不同来源（本地文件 / 资源表 / URL / 内存字节）的原始字节加载，
//! 并在“尽可能早”的阶段执行输入校验，尽快失败。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取。
//! - 资源：id 校验 + 体积限制。
//! - URL：协议校验 + 阻塞式 GET + 状态码校验 + 体积限制。
//! - 所有来源最后都做一次文件签名（magic bytes）校验，失败返回 `InvalidFormat`。

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use super::source::{ImageSource, RawImageData};
use super::{BitmapConfig, BitmapError, ScaledBitmap};

impl ScaledBitmap {
    /// 按来源加载原始字节。
    pub(super) fn load_source(&self, source: &ImageSource) -> Result<RawImageData, BitmapError> {
        match source {
            ImageSource::FilePath(path) => self.load_from_file(path),
            ImageSource::Resource(id) => self.load_from_resource(*id),
            ImageSource::Url(url) => self.load_from_url(url),
            ImageSource::Bytes(bytes) => {
                validate_payload_size(bytes.len() as u64, &self.config)?;
                validate_image_signature(bytes)?;
                Ok(RawImageData::new(bytes.clone(), "bytes"))
            }
        }
    }

    /// 从本地路径加载图片原始字节。
    ///
    /// 文件不存在视为“没有可解码的数据”，返回 `Decode`。
    pub(super) fn load_from_file(&self, path: &Path) -> Result<RawImageData, BitmapError> {
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(BitmapError::Decode(format!(
                "图片文件不存在：{}",
                path.display()
            )));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| BitmapError::Io(format!("无法读取文件信息：{}", e)))?;
        validate_payload_size(metadata.len(), &self.config)?;

        let bytes = std::fs::read(path)
            .map_err(|e| BitmapError::Io(format!("无法读取图片文件：{}", e)))?;
        validate_image_signature(&bytes)?;

        Ok(RawImageData::new(bytes, "file"))
    }

    pub(super) fn load_from_resource(&self, id: u32) -> Result<RawImageData, BitmapError> {
        log::debug!("📦 读取资源图片 - id: {}", id);

        let bytes = self.context.resource(id)?;
        validate_payload_size(bytes.len() as u64, &self.config)?;
        validate_image_signature(bytes)?;

        Ok(RawImageData::new(bytes.to_vec(), "resource"))
    }

    pub(super) fn load_from_url(&self, url: &str) -> Result<RawImageData, BitmapError> {
        let bytes = self.fetch_remote_image(url)?;
        validate_image_signature(&bytes)?;
        Ok(RawImageData::new(bytes, "url"))
    }

    /// 阻塞式下载远程图片，返回响应体字节。
    ///
    /// - 传输失败：`Network`
    /// - 非 2xx 状态码：`Http`
    /// - 超过 `max_file_size`：`ResourceLimit`
    pub fn fetch_remote_image(&self, url: &str) -> Result<Vec<u8>, BitmapError> {
        let parsed = validate_url(url)?;
        let redacted = redact_url_for_log(url);
        log::info!("🌐 开始下载图片 - URL: {}", redacted);

        let client = build_http_client(&self.config)?;
        let response = client
            .get(parsed)
            .send()
            .map_err(|e| map_reqwest_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BitmapError::Http {
                status: status.as_u16(),
                url: redacted,
            });
        }

        if let Some(size) = response.content_length() {
            validate_payload_size(size, &self.config)?;
        }

        let limit = self.config.max_file_size;
        let mut buffer = Vec::new();
        response
            .take(limit.saturating_add(1))
            .read_to_end(&mut buffer)
            .map_err(|e| BitmapError::Network(format!("读取响应体失败：{}", e)))?;

        if buffer.len() as u64 > limit {
            return Err(BitmapError::ResourceLimit(
                "下载后文件超过大小限制".to_string(),
            ));
        }

        log::debug!("✅ 下载完成 - {} bytes", buffer.len());
        Ok(buffer)
    }
}

fn build_http_client(config: &BitmapConfig) -> Result<Client, BitmapError> {
    let mut builder = Client::builder();
    if let Some(secs) = config.connect_timeout_secs {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = config.request_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if !config.use_system_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|e| BitmapError::Network(format!("无法创建 HTTP 客户端：{}", e)))
}

fn validate_url(url: &str) -> Result<reqwest::Url, BitmapError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| BitmapError::InvalidArgument(format!("URL 格式错误：{}", e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(BitmapError::InvalidArgument("仅支持 HTTP/HTTPS".to_string()));
    }

    Ok(parsed)
}

fn validate_payload_size(size: u64, config: &BitmapConfig) -> Result<(), BitmapError> {
    if size > config.max_file_size {
        return Err(BitmapError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            size as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }
    Ok(())
}

/// 统一映射 reqwest 错误到业务错误。
fn map_reqwest_error(e: reqwest::Error, url: &str) -> BitmapError {
    let err_msg = e.to_string().replace(url, &redact_url_for_log(url));

    if e.is_timeout() {
        BitmapError::Network(format!("请求超时：{}", err_msg))
    } else if e.is_connect() {
        BitmapError::Network(format!("无法连接：{}", err_msg))
    } else {
        BitmapError::Network(format!("请求失败：{}", err_msg))
    }
}

/// 日志中去掉 query 与 fragment，避免泄露签名参数。
pub(crate) fn redact_url_for_log(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return "<invalid-url>".to_string();
    };

    let host = parsed.host_str().unwrap_or("<unknown-host>");
    let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

    format!("{}://{}{}{}", parsed.scheme(), host, port, parsed.path())
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), BitmapError> {
    if bytes.is_empty() {
        return Err(BitmapError::InvalidFormat("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| BitmapError::InvalidFormat("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(BitmapError::InvalidFormat(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}
