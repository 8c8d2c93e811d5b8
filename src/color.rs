use astrocube::config::ColorRange;
use astrocube::data::noise::nan_range;
use eframe::egui::{Color32, ColorImage};
use ndarray::{Array3, ArrayView2};
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Intensity gradient
// ---------------------------------------------------------------------------

const LUT_SIZE: usize = 256;

/// Dark violet → teal → pale yellow, evenly spaced in HSL.
fn gradient(t: f32) -> Color32 {
    let hue = 270.0 - 210.0 * t;
    let lightness = 0.12 + 0.76 * t;
    let hsl = Hsl::new(hue, 0.75, lightness);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Color scale: intensity → Color32
// ---------------------------------------------------------------------------

/// Linear map from an intensity range onto the gradient. NaN is transparent.
#[derive(Debug, Clone)]
pub struct ColorScale {
    pub lo: f64,
    pub hi: f64,
    lut: Vec<Color32>,
}

impl ColorScale {
    pub fn new(lo: f64, hi: f64) -> Self {
        let hi = if hi > lo { hi } else { lo + 1.0 };
        let lut = (0..LUT_SIZE)
            .map(|i| gradient(i as f32 / (LUT_SIZE - 1) as f32))
            .collect();
        Self { lo, hi, lut }
    }

    /// Scale covering the whole cube.
    pub fn from_data(data: &Array3<f64>, range: ColorRange) -> Self {
        let (min, max) = nan_range(data.iter()).unwrap_or((0.0, 1.0));
        match range {
            ColorRange::ZeroToMax => Self::new(0.0, max),
            ColorRange::MinToMax => Self::new(min, max),
        }
    }

    pub fn color_for(&self, value: f64) -> Color32 {
        if value.is_nan() {
            return Color32::TRANSPARENT;
        }
        let t = ((value - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0);
        self.lut[(t * (LUT_SIZE - 1) as f64).round() as usize]
    }

    /// Render an `[x, y]` plane with the origin at the lower left.
    pub fn render(&self, plane: ArrayView2<'_, f64>) -> ColorImage {
        let (nx, ny) = plane.dim();
        let mut image = ColorImage::new([nx, ny], Color32::TRANSPARENT);
        for ((x, y), &value) in plane.indexed_iter() {
            let row = ny - 1 - y;
            image.pixels[row * nx + x] = self.color_for(value);
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn nan_is_transparent() {
        let scale = ColorScale::new(0.0, 10.0);
        assert_eq!(scale.color_for(f64::NAN), Color32::TRANSPARENT);
    }

    #[test]
    fn values_clamp_to_gradient_ends() {
        let scale = ColorScale::new(0.0, 10.0);
        assert_eq!(scale.color_for(-5.0), scale.color_for(0.0));
        assert_eq!(scale.color_for(50.0), scale.color_for(10.0));
        assert_ne!(scale.color_for(0.0), scale.color_for(10.0));
    }

    #[test]
    fn flat_data_gets_a_usable_range() {
        let data = Array3::from_elem((2, 2, 2), 3.0);
        let scale = ColorScale::from_data(&data, ColorRange::MinToMax);
        assert_eq!(scale.lo, 3.0);
        assert!(scale.hi > scale.lo);
    }

    #[test]
    fn zero_to_max_ignores_minimum() {
        let data = Array3::from_shape_vec((1, 1, 3), vec![-2.0, f64::NAN, 8.0]).unwrap();
        let scale = ColorScale::from_data(&data, ColorRange::ZeroToMax);
        assert_eq!((scale.lo, scale.hi), (0.0, 8.0));
    }

    #[test]
    fn image_origin_is_lower_left() {
        let scale = ColorScale::new(0.0, 1.0);
        // plane[x, y]: only (1, 0) is bright.
        let plane = array![[0.0, 0.0], [1.0, 0.0], [0.0, f64::NAN]];
        let image = scale.render(plane.view());
        assert_eq!(image.size, [3, 2]);
        let bright = scale.color_for(1.0);
        // Bottom row (y = 0) is the last image row.
        assert_eq!(image.pixels[3 + 1], bright);
        assert_eq!(image.pixels[2], Color32::TRANSPARENT);
    }
}
