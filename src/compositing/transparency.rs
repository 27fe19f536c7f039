//! # 透明度检测
//!
//! 稀疏采样 alpha 通道：步长按总字节数计算，最多读取约一万个采样点，
//! 命中第一个 `alpha < 255` 即返回。大图中很小的透明区域可能被漏检。

use image::{DynamicImage, RgbaImage};

use super::codec::{DecodeLimits, decode_image};

/// 采样步长分母：`step = max(1, len / 40000)` 个像素，`len` 为 RGBA 字节数。
const SAMPLE_DIVISOR: usize = 40_000;

/// 判断图片是否含透明像素（近似）。
///
/// # 示例
/// ```rust
/// use aurora_ai::compositing::has_transparency;
/// use image::{DynamicImage, Rgba, RgbaImage};
///
/// let opaque = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
/// assert!(!has_transparency(&opaque));
/// ```
pub fn has_transparency(image: &DynamicImage) -> bool {
    if !image.color().has_alpha() {
        return false;
    }

    match image.as_rgba8() {
        Some(rgba) => has_transparency_rgba(rgba),
        None => has_transparency_rgba(&image.to_rgba8()),
    }
}

pub fn has_transparency_rgba(image: &RgbaImage) -> bool {
    let data = image.as_raw();
    let step = (data.len() / SAMPLE_DIVISOR).max(1);

    data.iter().skip(3).step_by(step * 4).any(|&alpha| alpha < 255)
}

/// 从编码字节检测透明度；无法解码时视为不透明。
pub fn has_transparency_bytes(bytes: &[u8]) -> bool {
    match decode_image(bytes, DecodeLimits::default()) {
        Ok(image) => has_transparency(&image),
        Err(err) => {
            log::debug!("透明度检测解码失败，按不透明处理：{err}");
            false
        }
    }
}

/// 被采样的像素下标（测试与调试用）。
pub fn sampled_pixel_indices(width: u32, height: u32) -> impl Iterator<Item = usize> {
    let len = width as usize * height as usize * 4;
    let step = (len / SAMPLE_DIVISOR).max(1);
    (0..width as usize * height as usize).step_by(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    #[test]
    fn rgb_image_is_never_transparent() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([9, 9, 9])));
        assert!(!has_transparency(&img));
    }

    #[test]
    fn single_transparent_pixel_in_small_image_is_found() {
        let mut img = RgbaImage::from_pixel(32, 32, Rgba([255, 255, 255, 255]));
        img.put_pixel(31, 31, Rgba([255, 255, 255, 254]));

        assert!(has_transparency(&DynamicImage::ImageRgba8(img)));
    }

    #[test]
    fn large_image_samples_sparsely() {
        let (w, h) = (1000, 1000);
        let mut img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]));

        // 步长为 100 像素，下标 1 不会被采样
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        assert!(!has_transparency_rgba(&img));

        let sampled = sampled_pixel_indices(w, h).nth(5).expect("sample index");
        img.put_pixel(sampled as u32 % w, sampled as u32 / w, Rgba([0, 0, 0, 0]));
        assert!(has_transparency_rgba(&img));
    }

    #[test]
    fn undecodable_bytes_are_treated_as_opaque() {
        assert!(!has_transparency_bytes(b"not an image"));
    }
}
