//! # Aurora AI 图片编辑客户端核心 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            编辑器界面 / CLI (main.rs)                      │
//! │   上传 ── 工具面板 ── 对比滑块 ── 下载 ── 通知              │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                            │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                   │
//! │  │                                                       │
//! │  ├─ session ──── 状态机 + ImageChain 缓冲 + 通知队列        │
//! │  │                                                       │
//! │  ├─ processing ─ multipart 请求 · 按模式超时 · 响应归一化   │
//! │  │   └─ html_fallback  旧后端 HTML 内嵌图片解码             │
//! │  │                                                       │
//! │  ├─ compositing ─ 透明度检测 · 本地合成 · 对比帧            │
//! │  ├─ settings ──── 编辑器偏好 (JSON 文件)                   │
//! │  └─ proxy ─────── 同源 /api 反向代理 (axum)                │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ HTTP multipart
//!     推理后端 POST /process
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，应用边界的返回类型 |
//! | [`processing`] | 构造并发送处理请求，超时分级，失败信息提取，HTML 兼容解码 |
//! | [`compositing`] | 采样透明度检测、前景/背景合成、前后对比帧 |
//! | [`session`] | 编辑会话状态机、单飞处理票据、缓冲释放、通知 |
//! | [`settings`] | provider / 质量 / 对比背景色偏好的持久化 |
//! | [`proxy`] | `/api` → 推理后端的长时限反向代理 |

pub mod error;
pub mod compositing;
pub mod processing;
pub mod proxy;
pub mod session;
pub mod settings;
