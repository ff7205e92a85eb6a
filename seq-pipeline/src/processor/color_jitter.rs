//! The random color distortion algorithm.

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorJitterInit {
    /// Maximum hue shift in turns of the hue circle.
    pub hue_shift: R64,
    /// Range of the saturation factor.
    pub saturation_scale: (R64, R64),
    /// Maximum brightness delta.
    pub brightness_shift: R64,
    /// Range of the contrast factor.
    pub contrast_scale: (R64, R64),
}

impl ColorJitterInit {
    pub fn build(self) -> Result<ColorJitter> {
        let Self {
            hue_shift,
            saturation_scale,
            brightness_shift,
            contrast_scale,
        } = self;

        ensure!(
            (0.0..=0.5).contains(&hue_shift.raw()),
            "hue_shift must be in range [0, 0.5]"
        );
        ensure!(brightness_shift >= 0.0, "brightness_shift must be non-negative");

        let check_scale = |(lo, up): (R64, R64), name: &str| -> Result<_> {
            ensure!(lo >= 0.0, "{} min must be non-negative", name);
            ensure!(lo < up, "{} min must be less than {} max", name, name);
            Ok((lo.raw() as f32, up.raw() as f32))
        };

        Ok(ColorJitter {
            max_hue_shift: hue_shift.raw() as f32,
            saturation_scale: check_scale(saturation_scale, "saturation_scale")?,
            max_brightness_shift: brightness_shift.raw() as f32,
            contrast_scale: check_scale(contrast_scale, "contrast_scale")?,
        })
    }
}

impl Default for ColorJitterInit {
    fn default() -> Self {
        Self {
            hue_shift: r64(0.08),
            saturation_scale: (r64(0.6), r64(1.6)),
            brightness_shift: r64(0.05),
            contrast_scale: (r64(0.7), r64(1.3)),
        }
    }
}

/// The factors drawn for one color jitter application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorJitterParams {
    pub hue_shift: f32,
    pub saturation_scale: f32,
    pub brightness_shift: f32,
    pub contrast_scale: f32,
}

#[derive(Debug, Clone)]
pub struct ColorJitter {
    max_hue_shift: f32,
    saturation_scale: (f32, f32),
    max_brightness_shift: f32,
    contrast_scale: (f32, f32),
}

impl ColorJitter {
    /// Draws hue, saturation, brightness and contrast factors in this order.
    pub fn sample<R>(&self, rng: &mut R) -> ColorJitterParams
    where
        R: Rng,
    {
        let hue_shift = symmetric(rng, self.max_hue_shift);
        let saturation_scale = rng.gen_range(self.saturation_scale.0..self.saturation_scale.1);
        let brightness_shift = symmetric(rng, self.max_brightness_shift);
        let contrast_scale = rng.gen_range(self.contrast_scale.0..self.contrast_scale.1);

        ColorJitterParams {
            hue_shift,
            saturation_scale,
            brightness_shift,
            contrast_scale,
        }
    }

    pub fn forward<R>(&self, rgb: &Array3<f32>, rng: &mut R) -> Result<Array3<f32>>
    where
        R: Rng,
    {
        let params = self.sample(rng);
        apply_color_jitter(rgb, &params)
    }
}

fn symmetric<R>(rng: &mut R, max: f32) -> f32
where
    R: Rng,
{
    if max > 0.0 {
        rng.gen_range(-max..max)
    } else {
        0.0
    }
}

/// Applies hue, saturation, brightness and contrast adjustments in this order.
pub fn apply_color_jitter(rgb: &Array3<f32>, params: &ColorJitterParams) -> Result<Array3<f32>> {
    let (_height, _width, channels) = rgb.dim();
    ensure!(channels == 3, "channel size must be 3, but get {}", channels);

    let ColorJitterParams {
        hue_shift,
        saturation_scale,
        brightness_shift,
        contrast_scale,
    } = *params;

    let mut output = rgb.clone();

    // hue and saturation in HSV space
    output.lanes_mut(Axis(2)).into_iter().for_each(|mut pixel| {
        let [hue, saturation, value] = rgb_to_hsv([pixel[0], pixel[1], pixel[2]]);
        let hue = (hue + hue_shift).rem_euclid(1.0);
        let saturation = (saturation * saturation_scale).clamp(0.0, 1.0);
        let [r, g, b] = hsv_to_rgb([hue, saturation, value]);
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
    });

    // brightness
    output += brightness_shift;

    // contrast around per-channel means
    output.axis_iter_mut(Axis(2)).for_each(|mut channel| {
        let mean = channel.mean().unwrap_or(0.0);
        channel.mapv_inplace(|component| (component - mean) * contrast_scale + mean);
    });

    Ok(output)
}

pub fn rgb_to_hsv([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta <= 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let saturation = if max > 0.0 { delta / max } else { 0.0 };

    [hue, saturation, max]
}

pub fn hsv_to_rgb([hue, saturation, value]: [f32; 3]) -> [f32; 3] {
    let h6 = hue.rem_euclid(1.0) * 6.0;
    let sector = h6.floor();
    let frac = h6 - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * frac);
    let t = value * (1.0 - saturation * (1.0 - frac));

    match sector as u32 % 6 {
        0 => [value, t, p],
        1 => [q, value, p],
        2 => [p, value, t],
        3 => [p, q, value],
        4 => [t, p, value],
        _ => [value, p, q],
    }
}
