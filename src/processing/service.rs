//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! `ProcessingService` 在 `ProcessingClient` 之上提供面向工具的高层 API：
//! 去背景、放大、替换背景、生成背景。
//!
//! 背景生成后端偏好（provider hint）不再从全局存储读取，而是作为显式配置值
//! 注入服务；持久化由 `settings::PreferenceStore` 负责，调用方在启动时读入并传入。

use std::sync::RwLock;

use super::mode::{BackgroundQuality, BackgroundType, ProcessingMode, ProviderHint};
use super::request::{ImageFile, ProcessedImage, ProcessingRequest};
use super::{ProcessingClient, ProcessingConfig, ProcessingError};

/// 放大倍数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceScale {
    X2,
    X4,
}

impl EnhanceScale {
    pub fn from_factor(factor: u8) -> Result<Self, ProcessingError> {
        match factor {
            2 => Ok(Self::X2),
            4 => Ok(Self::X4),
            other => Err(ProcessingError::Validation(format!(
                "Unsupported enhancement scale: {other}x (expected 2 or 4)"
            ))),
        }
    }

    pub(crate) fn mode(self, advanced: bool) -> ProcessingMode {
        match (self, advanced) {
            (Self::X2, false) => ProcessingMode::Enhance2x,
            (Self::X4, false) => ProcessingMode::Enhance4x,
            (Self::X2, true) => ProcessingMode::Advanced2x,
            (Self::X4, true) => ProcessingMode::Advanced4x,
        }
    }
}

/// 图片处理服务。
pub struct ProcessingService {
    client: ProcessingClient,
    provider_hint: RwLock<ProviderHint>,
}

impl ProcessingService {
    pub fn new(config: ProcessingConfig) -> Result<Self, ProcessingError> {
        Self::with_provider_hint(config, ProviderHint::Auto)
    }

    /// 使用显式注入的背景生成偏好创建服务。
    pub fn with_provider_hint(
        config: ProcessingConfig,
        provider_hint: ProviderHint,
    ) -> Result<Self, ProcessingError> {
        Ok(Self {
            client: ProcessingClient::new(config)?,
            provider_hint: RwLock::new(provider_hint),
        })
    }

    pub fn client(&self) -> &ProcessingClient {
        &self.client
    }

    pub fn set_provider_hint(&self, hint: ProviderHint) -> Result<(), ProcessingError> {
        let mut guard = self
            .provider_hint
            .write()
            .map_err(|_| ProcessingError::ResourceLimit("provider 偏好写入锁已中毒".to_string()))?;
        *guard = hint;
        log::info!("⚙️ 背景生成偏好已切换为 {}", hint.as_str());
        Ok(())
    }

    pub fn provider_hint(&self) -> Result<ProviderHint, ProcessingError> {
        self.provider_hint
            .read()
            .map(|hint| *hint)
            .map_err(|_| ProcessingError::ResourceLimit("provider 偏好读取锁已中毒".to_string()))
    }

    /// 执行任意请求；生成背景且未显式指定 provider 时补上当前偏好。
    pub async fn process<N>(
        &self,
        mut request: ProcessingRequest,
        on_notice: N,
    ) -> Result<ProcessedImage, ProcessingError>
    where
        N: Fn(&str) + Send + Sync,
    {
        if request.provider_hint.is_none() && request.background_type == Some(BackgroundType::Generate) {
            request.provider_hint = Some(self.provider_hint()?);
        }
        self.client.process_with_notice(request, on_notice).await
    }

    pub async fn remove_background(&self, image: ImageFile) -> Result<ProcessedImage, ProcessingError> {
        self.process(ProcessingRequest::new(image, ProcessingMode::RemoveBackground), |_| {})
            .await
    }

    pub async fn enhance(
        &self,
        image: ImageFile,
        scale: EnhanceScale,
        advanced: bool,
    ) -> Result<ProcessedImage, ProcessingError> {
        self.process(ProcessingRequest::new(image, scale.mode(advanced)), |_| {})
            .await
    }

    pub async fn replace_background(
        &self,
        image: ImageFile,
        background: ImageFile,
    ) -> Result<ProcessedImage, ProcessingError> {
        let request = ProcessingRequest::new(image, ProcessingMode::RemoveBackground)
            .with_background_image(background);
        self.process(request, |_| {}).await
    }

    pub async fn generate_background(
        &self,
        image: ImageFile,
        prompt: &str,
        quality: BackgroundQuality,
    ) -> Result<ProcessedImage, ProcessingError> {
        let request = ProcessingRequest::new(image, ProcessingMode::RemoveBackground)
            .with_generated_background(prompt, quality);
        self.process(request, |_| {}).await
    }
}
