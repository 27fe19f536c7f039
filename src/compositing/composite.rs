//! # 前景 / 背景合成
//!
//! 背景拉伸到前景尺寸，前景按原尺寸叠加在左上角，输出扁平化 PNG。
//! 仅用于本地预览“抠图 + 背景”的效果，不经过服务端。

use bytes::Bytes;
use image::{DynamicImage, RgbaImage};

use super::codec::{self, DecodeLimits};
use super::CompositeError;

/// 合成两张图片，输出尺寸恒等于前景尺寸。
///
/// # 示例
/// ```rust
/// use aurora_ai::compositing::composite_images;
/// use image::{DynamicImage, Rgba, RgbaImage};
///
/// let fg = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([0, 0, 0, 0])));
/// let bg = DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 80, Rgba([255, 0, 0, 255])));
/// let out = composite_images(&fg, &bg)?;
/// assert_eq!(out.dimensions(), (4, 3));
/// # Ok::<(), aurora_ai::compositing::CompositeError>(())
/// ```
pub fn composite_images(
    foreground: &DynamicImage,
    background: &DynamicImage,
) -> Result<RgbaImage, CompositeError> {
    let fg = foreground.to_rgba8();
    let (width, height) = fg.dimensions();

    if width == 0 || height == 0 {
        return Err(CompositeError::InvalidDimensions("前景图片尺寸为 0".to_string()));
    }

    let mut canvas = codec::resize_exact(&background.to_rgba8(), width, height)?;
    image::imageops::overlay(&mut canvas, &fg, 0, 0);

    log::debug!(
        "🧩 合成完成：fg={}x{} bg={}x{}",
        width,
        height,
        background.width(),
        background.height()
    );

    Ok(canvas)
}

/// 字节入、PNG 字节出的便捷版本。
pub fn composite_png(
    foreground: &[u8],
    background: &[u8],
    limits: DecodeLimits,
) -> Result<Bytes, CompositeError> {
    let fg = codec::decode_image(foreground, limits)?;
    let bg = codec::decode_image(background, limits)?;
    let composed = composite_images(&fg, &bg)?;
    codec::encode_png(&composed)
}
