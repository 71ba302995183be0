use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::map::map_colors;

use crate::config::FilterConfig;

/// Resize to exactly `width` x `height`.
/// Bilinear sampling matches what a canvas `drawImage` produces.
pub fn upscale(img: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(&img.to_rgba8(), width, height, FilterType::Triangle)
}

/// Apply CSS `contrast(c) brightness(b)` in that order to every colour channel.
/// Alpha is left untouched.
pub fn apply_filter(img: &RgbaImage, filter: &FilterConfig) -> RgbaImage {
    let contrast = filter.contrast;
    let brightness = filter.brightness;
    map_colors(img, |Rgba([r, g, b, a])| {
        Rgba([
            adjust_channel(r, contrast, brightness),
            adjust_channel(g, contrast, brightness),
            adjust_channel(b, contrast, brightness),
            a,
        ])
    })
}

fn adjust_channel(value: u8, contrast: f32, brightness: f32) -> u8 {
    let v = value as f32 / 255.0;
    // contrast pivots around mid grey, brightness scales towards black/white
    let contrasted = ((v - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
    let brightened = (contrasted * brightness).clamp(0.0, 1.0);
    (brightened * 255.0).round() as u8
}
