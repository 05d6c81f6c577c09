//! Deterministic color-space utilities for displaying samples.
//!
//! Samples are drawn in HSV with every channel in `[0, 1)`; hue is mapped onto
//! the full `[0°, 360°)` circle before conversion. The functions here are
//! analytic and allocation-free so a front end can call them per frame.

/// Number of hue sectors on the HSV hexcone.
const HUE_SECTORS: f32 = 6.0;

/// Convert an HSV triplet with all channels in `[0, 1)` to RGB in `[0, 1]`.
pub fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    let [h, s, v] = hsv;
    let chroma = v * s;
    let sector = (h.rem_euclid(1.0)) * HUE_SECTORS;
    let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
    let m = v - chroma;

    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    [r + m, g + m, b + m]
}

/// Quantize an RGB triplet in `[0, 1]` to 8-bit channels (truncating).
pub fn rgb_to_rgb8(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|channel| (channel.clamp(0.0, 1.0) * 255.0) as u8)
}

/// Format 8-bit channels as an upper-case `#RRGGBB` string.
pub fn to_hex(rgb8: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb8[0], rgb8[1], rgb8[2])
}

#[cfg(test)]
mod tests {
    use super::{hsv_to_rgb, rgb_to_rgb8, to_hex};

    fn approx_equal(a: [f32; 3], b: [f32; 3], eps: f32) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() <= eps, "{:?} !≈ {:?}", a, b);
        }
    }

    #[test]
    fn primary_hues_map_to_primaries() {
        approx_equal(hsv_to_rgb([0.0, 1.0, 1.0]), [1.0, 0.0, 0.0], 1e-6);
        approx_equal(hsv_to_rgb([1.0 / 3.0, 1.0, 1.0]), [0.0, 1.0, 0.0], 1e-5);
        approx_equal(hsv_to_rgb([2.0 / 3.0, 1.0, 1.0]), [0.0, 0.0, 1.0], 1e-5);
    }

    #[test]
    fn zero_saturation_is_grey() {
        approx_equal(hsv_to_rgb([0.42, 0.0, 0.5]), [0.5, 0.5, 0.5], 1e-6);
    }

    #[test]
    fn zero_value_is_black() {
        assert_eq!(rgb_to_rgb8(hsv_to_rgb([0.7, 0.9, 0.0])), [0, 0, 0]);
    }

    #[test]
    fn hex_is_upper_case_and_truncated() {
        assert_eq!(to_hex(rgb_to_rgb8([1.0, 0.5, 0.0])), "#FF7F00");
        assert_eq!(to_hex([10, 171, 255]), "#0AABFF");
    }
}
