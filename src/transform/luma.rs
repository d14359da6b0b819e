//! Luminance extraction and nearest-neighbor downsampling.

/// Rec.601 red weight.
const LUMA_R: f32 = 0.299;
/// Rec.601 green weight.
const LUMA_G: f32 = 0.587;
/// Rec.601 blue weight.
const LUMA_B: f32 = 0.114;

/// Rec.601 luminance on the 0..=255 scale.
#[inline]
pub fn luminance_255(r: u8, g: u8, b: u8) -> f32 {
    LUMA_R * f32::from(r) + LUMA_G * f32::from(g) + LUMA_B * f32::from(b)
}

/// Rec.601 luminance normalized into `[0, 1]`.
#[inline]
pub fn luminance_unit(r: u8, g: u8, b: u8) -> f32 {
    luminance_255(r, g, b) / 255.0
}

/// Fills the output luminance and color planes from a source RGBA plane.
///
/// Each destination pixel maps to the nearest source pixel via
/// integer-truncated scaling clamped to the last source column and row; no
/// interpolation. Equal dimensions take a direct pass with the same
/// semantics.
pub(crate) fn downsample_into(
    src: &[u8],
    src_width: u32,
    src_height: u32,
    out_width: u32,
    out_height: u32,
    luminance: &mut [f32],
    color: &mut [u8],
) {
    debug_assert_eq!(src.len(), (src_width as usize) * (src_height as usize) * 4);
    debug_assert_eq!(luminance.len(), (out_width as usize) * (out_height as usize));
    debug_assert_eq!(color.len(), luminance.len() * 4);

    if src_width == out_width && src_height == out_height {
        for (i, px) in src.chunks_exact(4).enumerate() {
            luminance[i] = luminance_unit(px[0], px[1], px[2]);
            color[i * 4..i * 4 + 4].copy_from_slice(px);
        }
        return;
    }

    let (sw, sh) = (src_width as usize, src_height as usize);
    let (ow, oh) = (out_width as usize, out_height as usize);
    for y in 0..oh {
        let sy = (y * sh / oh).min(sh - 1);
        let src_row = &src[sy * sw * 4..(sy + 1) * sw * 4];
        for x in 0..ow {
            let sx = (x * sw / ow).min(sw - 1);
            let px = &src_row[sx * 4..sx * 4 + 4];
            let di = y * ow + x;
            luminance[di] = luminance_unit(px[0], px[1], px[2]);
            color[di * 4..di * 4 + 4].copy_from_slice(px);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_extremes() {
        assert_eq!(luminance_unit(0, 0, 0), 0.0);
        assert!((luminance_unit(255, 255, 255) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mid_gray_luminance() {
        let l = luminance_unit(128, 128, 128);
        assert!((l - 0.502).abs() < 0.01);
    }

    #[test]
    fn test_direct_pass_when_dimensions_match() {
        let src = vec![
            10, 20, 30, 255, //
            200, 100, 50, 255,
        ];
        let mut luminance = vec![0.0f32; 2];
        let mut color = vec![0u8; 8];

        downsample_into(&src, 2, 1, 2, 1, &mut luminance, &mut color);

        assert_eq!(color, src);
        assert!((luminance[0] - luminance_unit(10, 20, 30)).abs() < 1e-6);
        assert!((luminance[1] - luminance_unit(200, 100, 50)).abs() < 1e-6);
    }

    #[test]
    fn test_downsample_picks_nearest_source_pixel() {
        // 4x2 source: each pixel's red channel encodes its column index.
        let mut src = Vec::new();
        for y in 0..2u8 {
            for x in 0..4u8 {
                src.extend_from_slice(&[x, y, 0, 255]);
            }
        }
        let mut luminance = vec![0.0f32; 2];
        let mut color = vec![0u8; 8];

        downsample_into(&src, 4, 2, 2, 1, &mut luminance, &mut color);

        // x=0 maps to source column 0, x=1 maps to source column 2; both
        // map to source row 0.
        assert_eq!(color[0], 0);
        assert_eq!(color[4], 2);
        assert_eq!(color[1], 0);
        assert_eq!(color[5], 0);
    }

    #[test]
    fn test_upscale_clamps_to_last_source_pixel() {
        let src = vec![9, 9, 9, 255];
        let mut luminance = vec![0.0f32; 9];
        let mut color = vec![0u8; 36];

        downsample_into(&src, 1, 1, 3, 3, &mut luminance, &mut color);

        assert!(color.chunks_exact(4).all(|px| px == [9, 9, 9, 255]));
    }
}
