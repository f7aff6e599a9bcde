//! Chroma-plane conversion and the key math, CPU side.
//!
//! `shaders/chroma_key.frag` in `greenroom-runtime-glow` evaluates exactly these formulas per
//! fragment. Keep both in step.

use crate::config::ChromaKeyConfig;

/// RGB -> (U, V) chrominance plane, both centred on 0.5.
#[inline]
pub fn to_chroma_plane(rgb: [f32; 3]) -> [f32; 2] {
    let [r, g, b] = rgb;
    [
        -0.169 * r - 0.331 * g + 0.5 * b + 0.5,
        0.5 * r - 0.419 * g - 0.081 * b + 0.5,
    ]
}

/// Euclidean distance between two colors on the chroma plane.
pub fn chroma_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let [au, av] = to_chroma_plane(a);
    let [bu, bv] = to_chroma_plane(b);
    ((au - bu).powi(2) + (av - bv).powi(2)).sqrt()
}

#[inline]
fn ramp(base: f32, width: f32, curve: f32) -> f32 {
    (base / width).clamp(0.0, 1.0).powf(curve)
}

/// Output alpha for a pixel at chroma distance `d` from the key. 0 = keyed out.
pub fn alpha_mask(d: f32, cfg: &ChromaKeyConfig) -> f32 {
    ramp(d - cfg.similarity, cfg.smoothness, cfg.curve)
}

/// How much of the original color survives desaturation. 0 = fully grey.
pub fn spill_mask(d: f32, cfg: &ChromaKeyConfig) -> f32 {
    ramp(d - cfg.similarity, cfg.spill, cfg.curve)
}

/// BT.709 luma, clamped to [0, 1].
#[inline]
pub fn luma(rgb: [f32; 3]) -> f32 {
    (0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]).clamp(0.0, 1.0)
}

/// Key a single pixel: returns straight (non-premultiplied) RGBA.
pub fn key_pixel(rgb: [f32; 3], cfg: &ChromaKeyConfig) -> [f32; 4] {
    let d = chroma_distance(rgb, cfg.key_color);
    let alpha = alpha_mask(d, cfg);
    let keep = spill_mask(d, cfg);
    let y = luma(rgb);
    let mix = |c: f32| y * (1.0 - keep) + c * keep;
    [mix(rgb[0]), mix(rgb[1]), mix(rgb[2]), alpha]
}

/// Scale color by alpha, as transparent window compositors expect.
///
/// A fully keyed-out pixel becomes `[0, 0, 0, 0]` whatever its spill-suppressed color.
pub fn premultiply(px: [f32; 4]) -> [f32; 4] {
    let a = px[3];
    [px[0] * a, px[1] * a, px[2] * a, a]
}

/// Key a tightly packed RGB8 frame into straight-alpha RGBA8, row order preserved.
///
/// Reads whole pixels only: `rgb.len() % 3` trailing bytes are ignored, so the output holds
/// `rgb.len() / 3` pixels. Reference path for headless callers and tests; the live pipeline
/// keys on the GPU.
pub fn key_rgb_frame(rgb: &[u8], cfg: &ChromaKeyConfig) -> Vec<u8> {
    let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    let mut out = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        let c = [
            f32::from(px[0]) / 255.0,
            f32::from(px[1]) / 255.0,
            f32::from(px[2]) / 255.0,
        ];
        let k = key_pixel(c, cfg);
        out.extend(k.iter().map(|v| to_u8(*v)));
    }
    out
}

/// Summary of an RGBA8 matte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatteStats {
    /// Fraction of pixels with alpha 0.
    pub keyed_out: f32,
    /// Fraction of pixels with alpha 255.
    pub opaque: f32,
    pub mean_alpha: f32,
}

/// `None` for an empty buffer.
pub fn matte_stats(rgba: &[u8]) -> Option<MatteStats> {
    let n = rgba.len() / 4;
    if n == 0 {
        return None;
    }
    let (mut zero, mut full, mut sum) = (0usize, 0usize, 0u64);
    for px in rgba.chunks_exact(4) {
        match px[3] {
            0 => zero += 1,
            255 => full += 1,
            _ => {}
        }
        sum += u64::from(px[3]);
    }
    Some(MatteStats {
        keyed_out: zero as f32 / n as f32,
        opaque: full as f32 / n as f32,
        mean_alpha: sum as f32 / (n as f32 * 255.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ChromaKeyConfig {
        ChromaKeyConfig {
            key_color: [0.0667, 1.0, 0.0196],
            similarity: 0.4,
            smoothness: 0.08,
            spill: 0.1,
            curve: 1.5,
        }
    }

    #[test]
    fn chroma_plane_is_pure() {
        let c = [0.25, 0.5, 0.75];
        assert_eq!(to_chroma_plane(c), to_chroma_plane(c));
    }

    #[test]
    fn greys_sit_at_plane_centre() {
        for g in [0.0, 0.5, 1.0] {
            let [u, v] = to_chroma_plane([g, g, g]);
            assert!((u - 0.5).abs() < 1e-6, "u={u}");
            assert!((v - 0.5).abs() < 1e-6, "v={v}");
        }
    }

    #[test]
    fn alpha_is_zero_at_similarity() {
        let c = cfg();
        assert_eq!(alpha_mask(c.similarity, &c), 0.0);
    }

    #[test]
    fn alpha_is_one_past_the_ramp() {
        let c = cfg();
        let edge = c.similarity + c.smoothness;
        assert!((alpha_mask(edge, &c) - 1.0).abs() < 1e-4);
        for d in [edge + 1e-3, edge + 0.1, 1.0, 2.0] {
            assert_eq!(alpha_mask(d, &c), 1.0, "d={d}");
        }
    }

    #[test]
    fn alpha_is_monotonic_in_distance() {
        let c = cfg();
        let mut prev = 0.0;
        for i in 0..=400 {
            let d = i as f32 * 0.005;
            let a = alpha_mask(d, &c);
            assert!(a >= prev, "alpha dropped at d={d}: {a} < {prev}");
            prev = a;
        }
    }

    #[test]
    fn key_colored_pixel_is_transparent_for_any_similarity() {
        for similarity in [0.0, 0.01, 0.4, 1.0] {
            let c = ChromaKeyConfig {
                similarity,
                ..cfg()
            };
            let out = key_pixel(c.key_color, &c);
            assert_eq!(out[3], 0.0, "similarity={similarity}");
        }
    }

    #[test]
    fn spill_equals_alpha_when_widths_match() {
        let c = ChromaKeyConfig {
            spill: 0.08,
            ..cfg()
        };
        for i in 0..=100 {
            let d = i as f32 * 0.01;
            assert_eq!(spill_mask(d, &c), alpha_mask(d, &c));
        }
    }

    #[test]
    fn pixel_identical_to_key_is_desaturated_and_clear() {
        let c = cfg();
        assert_eq!(chroma_distance(c.key_color, c.key_color), 0.0);
        assert_eq!(alpha_mask(0.0, &c), 0.0);
        assert_eq!(spill_mask(0.0, &c), 0.0);

        let out = key_pixel(c.key_color, &c);
        let y = luma(c.key_color);
        assert!((y - 0.7308).abs() < 1e-3, "luma={y}");
        assert_eq!(&out[..3], &[y, y, y]);
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn far_pixel_passes_through() {
        let c = cfg();
        assert_eq!(alpha_mask(1.0, &c), 1.0);
        assert_eq!(spill_mask(1.0, &c), 1.0);

        // Magenta sits ~1.04 away from #11ff05 on the chroma plane.
        let magenta = [1.0, 0.0, 1.0];
        assert!(chroma_distance(magenta, c.key_color) > 1.0);
        assert_eq!(key_pixel(magenta, &c), [1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn frame_keying_emits_rgba() {
        let c = ChromaKeyConfig {
            key_color: [0.0, 1.0, 0.0],
            ..cfg()
        };
        let rgb = [0u8, 255, 0, 255, 0, 255];
        let out = key_rgb_frame(&rgb, &c);
        assert_eq!(out.len(), 8);
        assert_eq!(out[3], 0);
        assert_eq!(&out[4..], &[255, 0, 255, 255]);
    }

    #[test]
    fn trailing_partial_pixel_is_ignored() {
        let c = ChromaKeyConfig::default();
        let whole = key_rgb_frame(&[255, 0, 255], &c);
        let ragged = key_rgb_frame(&[255, 0, 255, 17, 255], &c);
        assert_eq!(ragged.len(), 4);
        assert_eq!(ragged, whole);
    }

    #[test]
    fn premultiplied_key_pixel_vanishes() {
        let c = ChromaKeyConfig::default();
        let straight = key_pixel(c.key_color, &c);
        assert_eq!(straight[3], 0.0);
        assert!(straight[0] > 0.5, "straight output keeps the luma: {straight:?}");
        assert_eq!(premultiply(straight), [0.0, 0.0, 0.0, 0.0]);

        let opaque = key_pixel([1.0, 0.0, 1.0], &c);
        assert_eq!(premultiply(opaque), opaque);
    }

    #[test]
    fn matte_stats_of_keyed_frame() {
        let keyed = key_rgb_frame(&[17, 255, 5, 255, 0, 255], &ChromaKeyConfig::default());
        let stats = matte_stats(&keyed).unwrap();
        assert_eq!(stats.keyed_out, 0.5);
        assert_eq!(stats.opaque, 0.5);
        assert!((stats.mean_alpha - 0.5).abs() < 1e-6);
        assert_eq!(matte_stats(&[]), None);
    }
}
