use glam::Vec3;

/// Convert hue/saturation/lightness (all 0..1, hue wraps) to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    if s == 0.0 {
        return Vec3::splat(l);
    }
    let hi = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let lo = 2.0 * l - hi;
    Vec3::new(
        hue_channel(lo, hi, h + 1.0 / 3.0),
        hue_channel(lo, hi, h),
        hue_channel(lo, hi, h - 1.0 / 3.0),
    )
}

#[inline]
fn hue_channel(lo: f32, hi: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        lo + (hi - lo) * 6.0 * t
    } else if t < 0.5 {
        hi
    } else if t < 2.0 / 3.0 {
        lo + (hi - lo) * 6.0 * (2.0 / 3.0 - t)
    } else {
        lo
    }
}
