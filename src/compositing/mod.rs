//! # 客户端合成工具（compositing）
//!
//! 仅服务于界面展示的栅格操作，不参与最终结果的生成：
//!
//! - `transparency`：稀疏采样的透明度检测
//! - `composite`：抠图前景 + 背景的本地合成预览
//! - `compare`：前后对比帧（统一尺寸、压平透明）
//! - `codec`：带像素上限的解码、PNG 编码、缩放

mod codec;
mod compare;
mod composite;
mod transparency;

pub use codec::{DecodeLimits, decode_image, encode_png};
pub use compare::{CompareFrame, DEFAULT_COMPARE_BACKGROUND, RgbColor, prepare_images_for_comparison};
pub use composite::{composite_images, composite_png};
pub use transparency::{has_transparency, has_transparency_bytes, has_transparency_rgba, sampled_pixel_indices};

/// 合成链路错误。
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("尺寸无效：{0}")]
    InvalidDimensions(String),

    #[error("颜色格式无效：{0}（示例：#181b23）")]
    InvalidColor(String),
}
