//! Per-pixel image effects.
//!
//! Every kernel operates in place on a packed RGBA byte plane. Effects are
//! mutually exclusive and selected through the closed [`Effect`] enum, so
//! adding one is a compile-time-checked extension of the match below.

use super::luma::luminance_255;
use serde::{Deserialize, Serialize};

/// Luminance cutoff for the threshold effect. A pixel exactly at the
/// cutoff classifies as on.
pub const THRESHOLD_CUTOFF: f32 = 128.0;

/// Quantization levels for the posterize effect.
pub const POSTERIZE_LEVELS: u32 = 4;

/// Gain for the contrast effect.
pub const CONTRAST_AMOUNT: f32 = 1.5;

/// Selectable image effect, applied after mirroring and before luminance
/// extraction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Pass pixels through unchanged.
    #[default]
    None,
    /// Sobel edge magnitude over the luminance plane.
    Edges,
    /// Quantize each channel to a few levels.
    Posterize,
    /// Linear contrast stretch around mid-gray.
    Contrast,
    /// Invert color channels, alpha unchanged.
    Invert,
    /// Binarize on luminance.
    Threshold,
}

impl Effect {
    /// Returns the effect name for status display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Edges => "edges",
            Effect::Posterize => "posterize",
            Effect::Contrast => "contrast",
            Effect::Invert => "invert",
            Effect::Threshold => "threshold",
        }
    }

    /// Applies this effect in place.
    ///
    /// `luma_scratch` is only touched by the edge kernel, which needs a
    /// single-channel plane; it is resized as required and reused across
    /// calls.
    pub(crate) fn apply(
        self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        luma_scratch: &mut Vec<u8>,
    ) {
        match self {
            Effect::None => {}
            Effect::Edges => edges(pixels, width, height, luma_scratch),
            Effect::Posterize => posterize(pixels, POSTERIZE_LEVELS),
            Effect::Contrast => contrast(pixels, CONTRAST_AMOUNT),
            Effect::Invert => invert(pixels),
            Effect::Threshold => threshold(pixels, THRESHOLD_CUTOFF),
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `out = 255 - in` per color channel, alpha unchanged.
pub(crate) fn invert(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px[0] = 255 - px[0];
        px[1] = 255 - px[1];
        px[2] = 255 - px[2];
    }
}

/// Binarizes on Rec.601 luminance; a tie with the cutoff counts as on.
pub(crate) fn threshold(pixels: &mut [u8], cutoff: f32) {
    for px in pixels.chunks_exact_mut(4) {
        let on = luminance_255(px[0], px[1], px[2]) >= cutoff;
        let v = if on { 255 } else { 0 };
        px[0] = v;
        px[1] = v;
        px[2] = v;
    }
}

/// Quantizes each color channel to `levels` evenly spaced values.
pub(crate) fn posterize(pixels: &mut [u8], levels: u32) {
    let step = 255.0 / levels.saturating_sub(1).max(1) as f32;
    for px in pixels.chunks_exact_mut(4) {
        for c in &mut px[..3] {
            *c = ((f32::from(*c) / step).round() * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// `out = clamp(in * amount + (0.5 - 0.5 * amount) * 255, 0, 255)`.
pub(crate) fn contrast(pixels: &mut [u8], amount: f32) {
    let offset = (0.5 - 0.5 * amount) * 255.0;
    for px in pixels.chunks_exact_mut(4) {
        for c in &mut px[..3] {
            *c = (f32::from(*c) * amount + offset).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Sobel edge magnitude.
///
/// Converts to a single-channel luminance plane first, then writes the
/// gradient magnitude of each interior pixel to R, G and B with alpha 255.
/// The one-pixel border stays black.
pub(crate) fn edges(pixels: &mut [u8], width: u32, height: u32, luma: &mut Vec<u8>) {
    let w = width as usize;
    let h = height as usize;
    luma.resize(w * h, 0);
    for (l, px) in luma.iter_mut().zip(pixels.chunks_exact(4)) {
        *l = luminance_255(px[0], px[1], px[2]).round() as u8;
    }

    for y in 0..h {
        for x in 0..w {
            let mag = if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                0
            } else {
                let at = |dx: isize, dy: isize| {
                    let sx = (x as isize + dx) as usize;
                    let sy = (y as isize + dy) as usize;
                    i32::from(luma[sy * w + sx])
                };
                let gx = at(1, -1) - at(-1, -1) + 2 * (at(1, 0) - at(-1, 0)) + at(1, 1)
                    - at(-1, 1);
                let gy = at(-1, 1) - at(-1, -1) + 2 * (at(0, 1) - at(0, -1)) + at(1, 1)
                    - at(1, -1);
                (((gx * gx + gy * gy) as f32).sqrt()).min(255.0) as u8
            };
            let idx = (y * w + x) * 4;
            pixels[idx] = mag;
            pixels[idx + 1] = mag;
            pixels[idx + 2] = mag;
            pixels[idx + 3] = 255;
        }
    }
}

/// Horizontal flip as a whole-pixel swap per row.
pub(crate) fn mirror_in_place(pixels: &mut [u8], width: u32) {
    let w = width as usize;
    let row_bytes = w * 4;
    if row_bytes == 0 {
        return;
    }
    for row in pixels.chunks_exact_mut(row_bytes) {
        for x in 0..w / 2 {
            let i = x * 4;
            let j = (w - 1 - x) * 4;
            let (head, tail) = row.split_at_mut(j);
            head[i..i + 4].swap_with_slice(&mut tail[..4]);
        }
    }
}

/// Copies `src` into `dst` with each row's pixel order reversed.
pub(crate) fn copy_mirrored(src: &[u8], dst: &mut [u8], width: u32) {
    let row_bytes = width as usize * 4;
    if row_bytes == 0 {
        return;
    }
    for (src_row, dst_row) in src
        .chunks_exact(row_bytes)
        .zip(dst.chunks_exact_mut(row_bytes))
    {
        for (dst_px, src_px) in dst_row
            .chunks_exact_mut(4)
            .zip(src_row.chunks_exact(4).rev())
        {
            dst_px.copy_from_slice(src_px);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rgba(colors: &[(u8, u8, u8)]) -> Vec<u8> {
        colors
            .iter()
            .flat_map(|&(r, g, b)| [r, g, b, 255])
            .collect()
    }

    #[test]
    fn test_invert_is_self_inverse() {
        let original = rgba(&[(0, 128, 255), (17, 200, 3), (255, 255, 255)]);
        let mut pixels = original.clone();

        invert(&mut pixels);
        assert_ne!(pixels, original);
        invert(&mut pixels);
        assert_eq!(pixels, original);
    }

    #[test]
    fn test_invert_leaves_alpha() {
        let mut pixels = vec![10, 20, 30, 77];
        invert(&mut pixels);
        assert_eq!(pixels, vec![245, 235, 225, 77]);
    }

    #[test]
    fn test_threshold_tie_counts_as_on() {
        // Uniform gray 128 computes to luminance exactly at the cutoff.
        let mut pixels = rgba(&[(128, 128, 128)]);
        threshold(&mut pixels, THRESHOLD_CUTOFF);
        assert_eq!(&pixels[..3], &[255, 255, 255]);

        let mut below = rgba(&[(127, 127, 127)]);
        threshold(&mut below, THRESHOLD_CUTOFF);
        assert_eq!(&below[..3], &[0, 0, 0]);
    }

    #[test]
    fn test_posterize_quantizes_to_steps() {
        // levels=4 gives steps of 85: 100 snaps to 85, 200 snaps to 170.
        let mut pixels = rgba(&[(100, 200, 0)]);
        posterize(&mut pixels, POSTERIZE_LEVELS);
        assert_eq!(&pixels[..4], &[85, 170, 0, 255]);
    }

    #[test]
    fn test_contrast_pivots_at_mid_gray() {
        let mut pixels = rgba(&[(128, 200, 20)]);
        contrast(&mut pixels, CONTRAST_AMOUNT);
        // 128 stays at mid-gray, bright moves up, dark clamps toward 0.
        assert_eq!(pixels[0], 128);
        assert_eq!(pixels[1], 236);
        assert_eq!(pixels[2], 0);
        assert_eq!(pixels[3], 255);
    }

    #[test]
    fn test_mirror_is_self_inverse_for_odd_and_even_widths() {
        for width in [1u32, 2, 3, 7, 8] {
            let original: Vec<u8> = (0..width * 2 * 4).map(|i| i as u8).collect();
            let mut pixels = original.clone();

            mirror_in_place(&mut pixels, width);
            mirror_in_place(&mut pixels, width);
            assert_eq!(pixels, original, "width {width}");
        }
    }

    #[test]
    fn test_mirror_reverses_pixel_order() {
        let mut pixels = rgba(&[(1, 1, 1), (2, 2, 2), (3, 3, 3)]);
        mirror_in_place(&mut pixels, 3);
        assert_eq!(pixels, rgba(&[(3, 3, 3), (2, 2, 2), (1, 1, 1)]));
    }

    #[test]
    fn test_copy_mirrored_matches_in_place() {
        let src = rgba(&[(1, 2, 3), (4, 5, 6), (7, 8, 9), (10, 11, 12)]);
        let mut copied = vec![0u8; src.len()];
        copy_mirrored(&src, &mut copied, 2);

        let mut swapped = src.clone();
        mirror_in_place(&mut swapped, 2);
        assert_eq!(copied, swapped);
    }

    #[test]
    fn test_edges_seam_beats_flat_interior() {
        // 10x10, left half black, right half white.
        let (w, h) = (10u32, 10u32);
        let mut pixels = Vec::new();
        for _y in 0..h {
            for x in 0..w {
                let v = if x < 5 { 0 } else { 255 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }

        let mut luma = Vec::new();
        edges(&mut pixels, w, h, &mut luma);

        let at = |x: u32, y: u32| pixels[((y * w + x) * 4) as usize];
        let seam = at(4, 5).max(at(5, 5));
        let flat = at(2, 5);
        assert!(
            seam > flat,
            "seam magnitude {seam} not above flat magnitude {flat}"
        );
        // Border stays black with opaque alpha.
        assert_eq!(at(0, 0), 0);
        assert_eq!(pixels[3], 255);
    }

    #[test]
    fn test_edges_tiny_frame_is_all_border() {
        let mut pixels = rgba(&[(200, 10, 30), (5, 250, 90)]);
        let mut luma = Vec::new();
        edges(&mut pixels, 2, 1, &mut luma);
        assert_eq!(pixels, rgba(&[(0, 0, 0), (0, 0, 0)]));
    }

    proptest! {
        #[test]
        fn prop_invert_involution(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut pixels = bytes.clone();
            pixels.truncate(pixels.len() / 4 * 4);
            let original = pixels.clone();

            invert(&mut pixels);
            invert(&mut pixels);
            prop_assert_eq!(pixels, original);
        }

        #[test]
        fn prop_mirror_involution(width in 1u32..24, height in 1u32..8) {
            let len = (width * height * 4) as usize;
            let original: Vec<u8> = (0..len).map(|i| (i * 31 % 256) as u8).collect();
            let mut pixels = original.clone();

            mirror_in_place(&mut pixels, width);
            mirror_in_place(&mut pixels, width);
            prop_assert_eq!(pixels, original);
        }
    }
}
