//! # 编辑会话（session）
//!
//! 编辑器一侧的状态：上传 → 处理 → 查看 / 对比 → 重置或下载。
//!
//! - `editor`：状态机与工具调度
//! - `chain`：original / current / previous 三块缓冲及其释放
//! - `notice`：自动消失的通知队列

mod chain;
mod editor;
mod notice;

pub use chain::ImageChain;
pub use editor::{
    COMPARE_FAILED_NOTIFICATION, Completion, EditorSession, EditorState, ProcessingTicket, SessionError,
    TIMEOUT_NOTIFICATION, Tool,
};
pub use notice::{DEFAULT_DISMISS_AFTER, Notification, NotificationKind, NotificationQueue};
