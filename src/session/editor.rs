//! # 编辑会话状态机
//!
//! ## 设计思路
//!
//! ```text
//! Empty ─upload→ Uploaded ─begin→ Processing ─complete→ Ready ⇄ Comparing
//!                   ↑                                     │
//!                   └──────────── reset / upload ─────────┘
//! ```
//!
//! - 任意状态下 `upload` 都回到 `Uploaded`，并释放旧缓冲与对比帧。
//! - 同一时刻最多一个处理请求（票据 `ProcessingTicket` 保证单飞）。
//!   新上传会让旧票据作废，迟到的结果被丢弃。
//! - 失败不改动 `current`：界面上看到的图片永远是一次完整成功的产物。

use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;

use crate::compositing::{self, CompareFrame, DecodeLimits, RgbColor};
use crate::processing::{
    BackgroundQuality, EnhanceScale, ImageFile, ProcessedImage, ProcessingError, ProcessingMode,
    ProcessingRequest, ProcessingService,
};

use super::chain::ImageChain;
use super::notice::{Notification, NotificationKind, NotificationQueue};

/// 超时失败时统一展示的提示。
pub const TIMEOUT_NOTIFICATION: &str = "Operation timed out. The request did not complete. \
     Your image has not been modified. Please try again with a smaller image or different settings.";
pub const COMPARE_FAILED_NOTIFICATION: &str = "Failed to prepare comparison. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorState {
    Empty,
    Uploaded,
    Processing,
    Ready,
    Comparing,
}

/// 工具面板中的一个工具及其参数。
#[derive(Debug, Clone)]
pub enum Tool {
    Enhance { scale: EnhanceScale, advanced: bool },
    RemoveBackground,
    ReplaceBackground { background: ImageFile },
    GenerateBackground { prompt: String, quality: BackgroundQuality },
}

impl Tool {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Enhance { .. } => "enhance",
            Self::RemoveBackground => "remove-bg",
            Self::ReplaceBackground { .. } => "replace-bg",
            Self::GenerateBackground { .. } => "generate-bg",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Self::Enhance { .. } => "Image enhanced successfully!",
            Self::RemoveBackground => "Background removed successfully!",
            Self::ReplaceBackground { .. } => "Background replaced successfully!",
            Self::GenerateBackground { .. } => "Background generated successfully!",
        }
    }

    /// 以当前图片为输入构造处理请求。
    pub fn to_request(&self, source: ImageFile) -> ProcessingRequest {
        match self {
            Self::Enhance { scale, advanced } => ProcessingRequest::new(source, scale.mode(*advanced)),
            Self::RemoveBackground => ProcessingRequest::new(source, ProcessingMode::RemoveBackground),
            Self::ReplaceBackground { background } => {
                ProcessingRequest::new(source, ProcessingMode::RemoveBackground)
                    .with_background_image(background.clone())
            }
            Self::GenerateBackground { prompt, quality } => {
                ProcessingRequest::new(source, ProcessingMode::RemoveBackground)
                    .with_generated_background(prompt.trim(), *quality)
            }
        }
    }
}

/// 一次处理的凭据，`complete` 时据此识别迟到的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingTicket {
    generation: u64,
    tool_id: &'static str,
    success_message: &'static str,
}

/// `complete` 的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed,
    /// 票据已过期（期间有新上传），结果被丢弃。
    Discarded,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("当前状态 {state:?} 不允许执行 {action}")]
    InvalidTransition { state: EditorState, action: &'static str },

    #[error("已有处理请求进行中")]
    Busy,

    #[error("没有可对比的处理结果")]
    NothingToCompare,

    #[error("{0}")]
    Processing(#[from] ProcessingError),

    #[error("{0}")]
    Composite(#[from] compositing::CompositeError),

    #[error("文件错误：{0}")]
    Io(#[from] std::io::Error),
}

/// 单个编辑会话。
#[derive(Debug)]
pub struct EditorSession {
    state: EditorState,
    chain: ImageChain,
    file_name: String,
    compare: Option<CompareFrame>,
    notifications: NotificationQueue,
    generation: u64,
    in_flight: bool,
    decode_limits: DecodeLimits,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self::with_decode_limits(DecodeLimits::default())
    }

    pub fn with_decode_limits(decode_limits: DecodeLimits) -> Self {
        Self {
            state: EditorState::Empty,
            chain: ImageChain::new(),
            file_name: String::new(),
            compare: None,
            notifications: NotificationQueue::default(),
            generation: 0,
            in_flight: false,
            decode_limits,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn original_image(&self) -> Option<&Bytes> {
        self.chain.original()
    }

    pub fn current_image(&self) -> Option<&Bytes> {
        self.chain.current()
    }

    pub fn chain(&self) -> &ImageChain {
        &self.chain
    }

    pub fn compare_frame(&self) -> Option<&CompareFrame> {
        self.compare.as_ref()
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight
    }

    /// 上传新图片：任意状态均可，旧缓冲与对比帧立即释放。
    pub fn upload(&mut self, file: ImageFile) {
        let released = self.chain.release();
        self.compare = None;
        self.generation += 1;

        if self.in_flight {
            log::info!("🗑️ 新上传覆盖进行中的处理请求，迟到结果将被丢弃");
        }
        self.in_flight = false;

        log::info!(
            "📥 载入图片 - name={} size={}KB（释放旧缓冲 {} 块）",
            file.file_name,
            file.bytes.len() / 1024,
            released
        );

        self.file_name = file.file_name;
        self.chain.load(file.bytes);
        self.state = EditorState::Uploaded;
    }

    /// 清空会话（对应“移除已上传图片”）。
    pub fn clear(&mut self) {
        self.chain.release();
        self.compare = None;
        self.generation += 1;
        self.in_flight = false;
        self.file_name.clear();
        self.state = EditorState::Empty;
    }

    /// 开始处理，返回票据与以当前图片构造的输入文件。
    pub fn begin_processing(&mut self, tool: &Tool) -> Result<(ProcessingTicket, ImageFile), SessionError> {
        match self.state {
            EditorState::Processing => return Err(SessionError::Busy),
            EditorState::Uploaded | EditorState::Ready => {}
            EditorState::Comparing => self.exit_compare(),
            EditorState::Empty => {
                return Err(SessionError::InvalidTransition {
                    state: self.state,
                    action: "begin_processing",
                });
            }
        }

        let current = self
            .chain
            .current()
            .cloned()
            .ok_or(SessionError::InvalidTransition {
                state: self.state,
                action: "begin_processing",
            })?;
        let source = ImageFile::from_bytes(current, self.file_name.clone())?;

        self.in_flight = true;
        self.state = EditorState::Processing;
        log::info!("🛠️ 开始处理 - tool={} generation={}", tool.id(), self.generation);

        Ok((
            ProcessingTicket {
                generation: self.generation,
                tool_id: tool.id(),
                success_message: tool.success_message(),
            },
            source,
        ))
    }

    /// 结束处理。失败时 `current` 保持不变。
    pub fn complete(
        &mut self,
        ticket: ProcessingTicket,
        result: Result<ProcessedImage, ProcessingError>,
    ) -> Completion {
        if ticket.generation != self.generation || !self.in_flight {
            log::info!(
                "🗑️ 丢弃过期结果 - tool={} ticket={} current={}",
                ticket.tool_id,
                ticket.generation,
                self.generation
            );
            return Completion::Discarded;
        }

        self.in_flight = false;
        self.state = EditorState::Ready;

        match result {
            Ok(image) => {
                self.compare = None;
                self.chain.replace_current(image.bytes);
                if let Some(notice) = image.notice {
                    self.notifications.push(NotificationKind::Notice, notice);
                }
                self.notifications.push(NotificationKind::Success, ticket.success_message);
                Completion::Applied
            }
            Err(err) => {
                let message = if err.is_timeout() {
                    TIMEOUT_NOTIFICATION.to_string()
                } else {
                    err.to_string()
                };
                self.notifications.push(NotificationKind::Error, message);
                Completion::Failed
            }
        }
    }

    /// 完整执行一个工具：开始 → 调用服务 → 结束。
    pub async fn run(&mut self, tool: &Tool, service: &ProcessingService) -> Result<Completion, SessionError> {
        let (ticket, source) = match self.begin_processing(tool) {
            Ok(started) => started,
            Err(err) => {
                if let SessionError::Processing(inner) = &err {
                    self.notifications.push(NotificationKind::Error, inner.to_string());
                }
                return Err(err);
            }
        };

        let notices = Mutex::new(Vec::new());
        let result = service
            .process(tool.to_request(source), |notice| {
                if let Ok(mut guard) = notices.lock() {
                    guard.push(notice.to_string());
                }
            })
            .await;

        if result.is_err() {
            let collected = notices.into_inner().unwrap_or_default();
            for notice in collected {
                self.notifications.push(NotificationKind::Notice, notice);
            }
        }

        Ok(self.complete(ticket, result))
    }

    /// 进入对比模式，生成尺寸一致的前后两帧。
    pub fn enter_compare(&mut self, background: RgbColor) -> Result<&CompareFrame, SessionError> {
        if !matches!(self.state, EditorState::Ready | EditorState::Comparing) {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "enter_compare",
            });
        }

        let (Some(original), Some(current)) = (self.chain.original(), self.chain.current()) else {
            return Err(SessionError::NothingToCompare);
        };
        if !self.chain.is_modified() {
            return Err(SessionError::NothingToCompare);
        }

        let frame = match self.build_compare_frame(original, current, background) {
            Ok(frame) => frame,
            Err(err) => {
                self.notifications.push(NotificationKind::Error, COMPARE_FAILED_NOTIFICATION);
                return Err(err);
            }
        };

        self.state = EditorState::Comparing;
        let frame = self.compare.insert(frame);
        Ok(&*frame)
    }

    fn build_compare_frame(
        &self,
        original: &Bytes,
        current: &Bytes,
        background: RgbColor,
    ) -> Result<CompareFrame, SessionError> {
        let before = compositing::decode_image(original, self.decode_limits)?;
        let after = compositing::decode_image(current, self.decode_limits)?;
        Ok(compositing::prepare_images_for_comparison(&before, &after, background)?)
    }

    /// 退出对比模式并释放对比帧。
    pub fn exit_compare(&mut self) {
        self.compare = None;
        if self.state == EditorState::Comparing {
            self.state = EditorState::Ready;
        }
    }

    /// 撤销到原图。
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if matches!(self.state, EditorState::Empty | EditorState::Processing) {
            return Err(SessionError::InvalidTransition {
                state: self.state,
                action: "reset",
            });
        }

        self.compare = None;
        self.chain.reset_to_original();
        self.state = EditorState::Uploaded;
        Ok(())
    }

    /// 本地预览：透明的当前图片叠加在指定背景上，不经过服务端。
    pub fn preview_background(&self, background: &ImageFile) -> Result<Bytes, SessionError> {
        let current = self.chain.current().ok_or(SessionError::InvalidTransition {
            state: self.state,
            action: "preview_background",
        })?;

        if !compositing::has_transparency_bytes(current) {
            return Err(SessionError::Processing(ProcessingError::Validation(
                "Background removal required. Please remove the background first, \
                 or upload an image with a transparent background."
                    .to_string(),
            )));
        }

        Ok(compositing::composite_png(current, &background.bytes, self.decode_limits)?)
    }

    /// 建议的下载文件名：`{原名}_aurora.png`。
    pub fn suggested_download_name(&self) -> String {
        let stem = Path::new(&self.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "output".to_string());
        format!("{stem}_aurora.png")
    }

    /// 保存当前图片（“下载”）。
    pub async fn save_current(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let current = self.chain.current().ok_or(SessionError::InvalidTransition {
            state: self.state,
            action: "save_current",
        })?;
        tokio::fs::write(path.as_ref(), current).await?;
        log::info!("💾 已保存结果：{}", path.as_ref().display());
        Ok(())
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}
