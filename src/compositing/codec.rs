//! # 解码 / 编码与缩放
//!
//! ## 设计思路
//!
//! 合成工具的输入来自上传文件与后端结果，体积不可控。
//! 因此解码前先只读 header 拿尺寸，按像素上限快速拒绝，再做完整解码。
//! 缩放优先走 `fast_image_resize`，失败时回退 `image::imageops`。

use std::io::Cursor;

use bytes::Bytes;
use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};

use super::CompositeError;

/// 解码资源上限。
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// 解码后的像素上限（`width * height`）。
    pub max_pixels: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_pixels: 40_000_000,
        }
    }
}

/// 带像素上限的解码。
pub fn decode_image(bytes: &[u8], limits: DecodeLimits) -> Result<DynamicImage, CompositeError> {
    let (width, height) = inspect_dimensions(bytes)?;
    validate_pixel_limit(width, height, limits)?;

    image::load_from_memory(bytes).map_err(|e| CompositeError::Decode(format!("图片解码失败：{e}")))
}

/// 仅读取图片 header 中的宽高。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), CompositeError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompositeError::Decode(format!("无法识别图片格式：{e}")))?
        .into_dimensions()
        .map_err(|e| CompositeError::Decode(format!("无法读取图片尺寸：{e}")))
}

fn validate_pixel_limit(width: u32, height: u32, limits: DecodeLimits) -> Result<(), CompositeError> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > limits.max_pixels {
        return Err(CompositeError::ResourceLimit(format!(
            "图片像素过大：{pixels} 像素（限制：{} 像素）",
            limits.max_pixels
        )));
    }
    Ok(())
}

/// 编码为 PNG。
pub fn encode_png(image: &RgbaImage) -> Result<Bytes, CompositeError> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| CompositeError::Encode(format!("PNG 编码失败：{e}")))?;
    Ok(Bytes::from(cursor.into_inner()))
}

/// 缩放到精确尺寸（不保持宽高比）。
pub(crate) fn resize_exact(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage, CompositeError> {
    if target_width == 0 || target_height == 0 {
        return Err(CompositeError::InvalidDimensions(format!(
            "目标尺寸无效：{target_width}x{target_height}"
        )));
    }

    if image.dimensions() == (target_width, target_height) {
        return Ok(image.clone());
    }

    match resize_with_fast_image_resize(image, target_width, target_height) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{err}");
            Ok(image::imageops::resize(image, target_width, target_height, FilterType::Triangle))
        }
    }
}

fn resize_with_fast_image_resize(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
) -> Result<RgbaImage, CompositeError> {
    let (src_width, src_height) = image.dimensions();

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| CompositeError::Decode(format!("构建源图像缓冲失败：{e}")))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| CompositeError::Decode(format!("fast_image_resize 执行失败：{e}")))?;

    RgbaImage::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| CompositeError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}
