//! # 前后对比帧
//!
//! ## 设计思路
//!
//! 对比滑块要求两帧尺寸一致、无透明缝隙：
//! 1. 画布尺寸取两图宽、高各自的最大值
//! 2. 含透明像素的图片先压平到固定背景色
//! 3. 每张图等比缩放到画布内并居中，空白处填背景色
//!
//! 放大类工具的结果通常比原图大数倍，等比缩放后两帧内容才能对齐。

use bytes::Bytes;
use image::{DynamicImage, Rgba, RgbaImage};

use super::codec;
use super::transparency::has_transparency_rgba;
use super::CompositeError;

/// 编辑器对比模式的默认背景色。
pub const DEFAULT_COMPARE_BACKGROUND: RgbColor = RgbColor { r: 0x18, g: 0x1b, b: 0x23 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    /// 解析 `#rgb` / `#rrggbb`（`#` 可省略）。
    pub fn from_hex(value: &str) -> Result<Self, CompositeError> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || CompositeError::InvalidColor(value.to_string());

        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };

        let channel = |range: std::ops::Range<usize>| {
            expanded
                .get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(invalid)
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        DEFAULT_COMPARE_BACKGROUND
    }
}

/// 一对尺寸一致的对比帧。
#[derive(Debug, Clone)]
pub struct CompareFrame {
    pub before: RgbaImage,
    pub after: RgbaImage,
}

impl CompareFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        self.before.dimensions()
    }

    /// 编码为两张 PNG（before, after）。
    pub fn to_png_pair(&self) -> Result<(Bytes, Bytes), CompositeError> {
        Ok((codec::encode_png(&self.before)?, codec::encode_png(&self.after)?))
    }
}

/// 生成对比帧，两帧尺寸均为两图宽高的最大值。
pub fn prepare_images_for_comparison(
    before: &DynamicImage,
    after: &DynamicImage,
    background: RgbColor,
) -> Result<CompareFrame, CompositeError> {
    let width = before.width().max(after.width());
    let height = before.height().max(after.height());

    if width == 0 || height == 0 {
        return Err(CompositeError::InvalidDimensions("对比图片尺寸为 0".to_string()));
    }

    let before = fit_onto_canvas(&before.to_rgba8(), width, height, background)?;
    let after = fit_onto_canvas(&after.to_rgba8(), width, height, background)?;

    log::debug!("🪞 对比帧已生成：{width}x{height} bg={}", background.to_hex());
    Ok(CompareFrame { before, after })
}

/// 压平透明像素到纯色背景。
fn flatten_onto_color(image: &RgbaImage, background: RgbColor) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), background.rgba());
    image::imageops::overlay(&mut canvas, image, 0, 0);
    canvas
}

fn fit_onto_canvas(
    image: &RgbaImage,
    width: u32,
    height: u32,
    background: RgbColor,
) -> Result<RgbaImage, CompositeError> {
    let (src_width, src_height) = image.dimensions();
    if src_width == 0 || src_height == 0 {
        return Ok(RgbaImage::from_pixel(width, height, background.rgba()));
    }

    let flattened = if has_transparency_rgba(image) {
        flatten_onto_color(image, background)
    } else {
        image.clone()
    };

    let scale = (f64::from(width) / f64::from(src_width)).min(f64::from(height) / f64::from(src_height));
    let target_width = ((f64::from(src_width) * scale).round() as u32).clamp(1, width);
    let target_height = ((f64::from(src_height) * scale).round() as u32).clamp(1, height);

    let scaled = codec::resize_exact(&flattened, target_width, target_height)?;

    let mut canvas = RgbaImage::from_pixel(width, height, background.rgba());
    let x = i64::from((width - target_width) / 2);
    let y = i64::from((height - target_height) / 2);
    image::imageops::overlay(&mut canvas, &scaled, x, y);

    Ok(canvas)
}
