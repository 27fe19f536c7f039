use aurora_ai::compositing::{
    RgbColor, composite_images, has_transparency, has_transparency_rgba, prepare_images_for_comparison,
    sampled_pixel_indices,
};
use aurora_ai::processing::mode::{ENHANCE_2X_TIMEOUT, ENHANCE_4X_TIMEOUT, GENERATE_BACKGROUND_TIMEOUT, default_timeout};
use aurora_ai::processing::{BackgroundType, ProcessingMode};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use proptest::prelude::*;

fn rgba(width: u32, height: u32, alpha: u8) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([90, 60, 30, alpha])))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn composite_matches_foreground_dimensions(
        fw in 1u32..48, fh in 1u32..48, bw in 1u32..48, bh in 1u32..48,
    ) {
        let out = composite_images(&rgba(fw, fh, 0), &rgba(bw, bh, 255)).expect("composite");
        prop_assert_eq!(out.dimensions(), (fw, fh));
    }

    #[test]
    fn compare_frames_use_max_dimensions(
        w1 in 1u32..48, h1 in 1u32..48, w2 in 1u32..48, h2 in 1u32..48,
    ) {
        let frame = prepare_images_for_comparison(&rgba(w1, h1, 128), &rgba(w2, h2, 255), RgbColor::default())
            .expect("compare");
        let expected = (w1.max(w2), h1.max(h2));
        prop_assert_eq!(frame.before.dimensions(), expected);
        prop_assert_eq!(frame.after.dimensions(), expected);
    }

    #[test]
    fn fully_opaque_images_are_not_transparent(w in 1u32..64, h in 1u32..64) {
        prop_assert!(!has_transparency(&rgba(w, h, 255)));
    }

    #[test]
    fn transparent_pixel_on_sampled_index_is_detected(w in 1u32..64, h in 1u32..64, pick in any::<prop::sample::Index>()) {
        let indices: Vec<usize> = sampled_pixel_indices(w, h).collect();
        let index = indices[pick.index(indices.len())];

        let mut image = RgbaImage::from_pixel(w, h, Rgba([1, 2, 3, 255]));
        let (x, y) = ((index as u32) % w, (index as u32) / w);
        image.put_pixel(x, y, Rgba([1, 2, 3, 10]));

        prop_assert!(has_transparency_rgba(&image));
    }

    #[test]
    fn every_mode_gets_at_least_its_minimum_timeout(mode_index in 0usize..5, generate in any::<bool>()) {
        let mode = ProcessingMode::ALL[mode_index];
        let bg_type = generate.then_some(BackgroundType::Generate);
        let timeout = default_timeout(mode, bg_type);

        if mode.is_4x() {
            prop_assert!(timeout >= ENHANCE_4X_TIMEOUT);
        } else if mode.is_2x() {
            prop_assert!(timeout >= ENHANCE_2X_TIMEOUT);
        }
        if generate {
            prop_assert!(timeout >= GENERATE_BACKGROUND_TIMEOUT);
        }
        prop_assert!(timeout.as_millis() >= 60_000);
    }
}

#[test]
fn images_without_alpha_channel_are_opaque() {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([0, 0, 0])));
    assert!(!has_transparency(&image));
}

#[test]
fn four_x_timeout_is_at_least_five_minutes() {
    assert!(default_timeout(ProcessingMode::Enhance4x, None).as_millis() >= 300_000);
    assert!(default_timeout(ProcessingMode::Advanced4x, None).as_millis() >= 300_000);
}
