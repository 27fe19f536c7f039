//! # 请求与结果模型
//!
//! ## 设计思路
//!
//! 将“调用方意图”和“网络层产物”解耦：
//! - `ImageFile` 表示一份待上传的图片（字节 + 文件名 + MIME）
//! - `ProcessingRequest` 表示一次处理意图，构造后先 `validate` 再发送
//! - `ProcessedImage` 表示一次成功处理的结果，仅驻留内存

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;

use super::mode::{self, BackgroundQuality, BackgroundType, ProcessingMode, ProviderHint};
use super::ProcessingError;

/// 待上传的图片文件。
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub bytes: Bytes,
    pub file_name: String,
    pub mime_type: String,
}

impl ImageFile {
    /// 从内存字节构造，并通过文件签名校验是否为图片。
    pub fn from_bytes(bytes: impl Into<Bytes>, file_name: impl Into<String>) -> Result<Self, ProcessingError> {
        let bytes = bytes.into();
        let mime_type = sniff_image_mime(&bytes)?;

        Ok(Self {
            bytes,
            file_name: file_name.into(),
            mime_type,
        })
    }

    /// 从本地路径读取图片。
    pub fn from_path(path: impl AsRef<Path>, max_file_size: u64) -> Result<Self, ProcessingError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProcessingError::FileSystem(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| ProcessingError::FileSystem(format!("无法读取文件信息：{e}")))?;

        if metadata.len() > max_file_size {
            return Err(ProcessingError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| ProcessingError::FileSystem(format!("无法读取图片文件：{e}")))?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());

        Self::from_bytes(bytes, file_name)
    }
}

/// 通过 magic bytes 识别图片 MIME，非图片直接拒绝。
pub(crate) fn sniff_image_mime(bytes: &[u8]) -> Result<String, ProcessingError> {
    if bytes.is_empty() {
        return Err(ProcessingError::Validation("Image file is empty".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| ProcessingError::Validation("Please upload an image file".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(ProcessingError::Validation(format!(
            "Please upload an image file (detected {})",
            kind.mime_type()
        )));
    }

    Ok(kind.mime_type().to_string())
}

/// 一次处理请求。
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub source_image: ImageFile,
    pub mode: ProcessingMode,
    pub background_image: Option<ImageFile>,
    pub background_type: Option<BackgroundType>,
    pub background_prompt: Option<String>,
    pub background_quality: Option<BackgroundQuality>,
    pub provider_hint: Option<ProviderHint>,
    /// 覆盖按模式计算的默认超时。
    pub timeout: Option<Duration>,
}

impl ProcessingRequest {
    pub fn new(source_image: ImageFile, mode: ProcessingMode) -> Self {
        Self {
            source_image,
            mode,
            background_image: None,
            background_type: None,
            background_prompt: None,
            background_quality: None,
            provider_hint: None,
            timeout: None,
        }
    }

    pub fn with_background_image(mut self, background: ImageFile) -> Self {
        self.background_image = Some(background);
        self.background_type = Some(BackgroundType::Upload);
        self
    }

    pub fn with_generated_background(
        mut self,
        prompt: impl Into<String>,
        quality: BackgroundQuality,
    ) -> Self {
        self.background_type = Some(BackgroundType::Generate);
        self.background_prompt = Some(prompt.into());
        self.background_quality = Some(quality);
        self
    }

    pub fn with_provider_hint(mut self, hint: ProviderHint) -> Self {
        self.provider_hint = Some(hint);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 发送前校验。
    ///
    /// - `generate` 必须带非空提示词（trim 后）
    /// - `upload` 必须带背景图
    pub fn validate(&self) -> Result<(), ProcessingError> {
        match self.background_type {
            Some(BackgroundType::Generate) => {
                let has_prompt = self
                    .background_prompt
                    .as_deref()
                    .is_some_and(|prompt| !prompt.trim().is_empty());
                if !has_prompt {
                    return Err(ProcessingError::Validation(
                        "Please enter a background description".to_string(),
                    ));
                }
            }
            Some(BackgroundType::Upload) => {
                if self.background_image.is_none() {
                    return Err(ProcessingError::Validation(
                        "Please upload a background image".to_string(),
                    ));
                }
            }
            None => {}
        }

        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ProcessingError::Validation("Timeout must be greater than zero".to_string()));
        }

        Ok(())
    }

    /// 本次请求实际生效的超时。
    pub fn effective_timeout(&self) -> Duration {
        self.timeout
            .unwrap_or_else(|| mode::default_timeout(self.mode, self.background_type))
    }
}

/// 结果来源：直接二进制，或兼容旧后端的 HTML 内嵌图片。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    Binary,
    HtmlFallback,
}

/// 一次成功处理的结果。
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Bytes,
    pub mime_type: String,
    /// 响应头 `x-aurora-notice` 携带的提示。
    pub notice: Option<String>,
    pub origin: ResultOrigin,
}
