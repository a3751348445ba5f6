//! Shared pieces of the digitnet command line workbench: turning a drawing
//! into the network's input tensor and rendering classification results.

pub mod ranking;
pub mod script;

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::{Array1, Array2, Array3, Axis};
use nshare::ToNdarray2;

/// Networks built here consume 28x28 single-channel drawings.
pub const IMAGE_SIZE: usize = 28;

/// Pixels at least this bright (after inversion) count as stroke pixels
/// when the drawing is centered.
const STROKE_THRESHOLD: f32 = 254.;

/// Turns a drawing into the network input: scaled down to 28x28 grayscale,
/// inverted so strokes are bright on black, and translated so the center of
/// the stroke bounding box sits in the image center.
pub fn preprocess_drawing(img: &DynamicImage) -> Array3<f32> {
    let scaled = img
        .resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::Triangle)
        .to_luma8();
    let gray: Array2<u8> = scaled.into_ndarray2();
    let inverted = gray.mapv(|v| 255. - v as f32);
    center_strokes(&inverted).insert_axis(Axis(2))
}

/// Translates the image so the center of the stroke bounding box lands in
/// the middle. Pixels shifted outside the frame are dropped; an empty
/// drawing is shifted as if its strokes sat in the top-left corner.
fn center_strokes(image: &Array2<f32>) -> Array2<f32> {
    let (height, width) = image.dim();

    let mut min_x = usize::MAX;
    let mut max_x = 0;
    let mut min_y = usize::MAX;
    let mut max_y = 0;
    let mut found = false;
    for ((y, x), &v) in image.indexed_iter() {
        if v >= STROKE_THRESHOLD {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
            found = true;
        }
    }
    let (mid_x, mid_y) = if found {
        ((max_x + min_x) / 2, (max_y + min_y) / 2)
    } else {
        (0, 0)
    };

    let mut translated = Array2::zeros((height, width));
    for ((y, x), &v) in image.indexed_iter() {
        let y_shifted = y as isize - mid_y as isize + (height / 2) as isize;
        let x_shifted = x as isize - mid_x as isize + (width / 2) as isize;
        if (0..height as isize).contains(&y_shifted) && (0..width as isize).contains(&x_shifted) {
            translated[[y_shifted as usize, x_shifted as usize]] = v;
        }
    }
    translated
}

/// Renders the per-digit confidences as text bars, one line per digit.
pub fn format_confidence_bars(confidences: &Array1<f32>) -> String {
    let mut out = String::new();
    for (digit, &v) in confidences.iter().enumerate() {
        let filled = (v.clamp(0., 1.) * 40.).round() as usize;
        out.push_str(&format!(
            "{} | {:<40} {:.4}\n",
            digit,
            "#".repeat(filled),
            v
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_center_strokes_moves_bounding_box_center() {
        let mut image: Array2<f32> = Array::zeros((28, 28));
        // a 2x2 stroke blob in the top-left corner
        image[[2, 3]] = 255.;
        image[[3, 4]] = 255.;

        let centered = center_strokes(&image);
        // bounding box center was (2, 3) (mid_y, mid_x); it moves to (14, 14)
        assert_eq!(centered[[14, 14]], 255.);
        assert_eq!(centered[[15, 15]], 255.);
        assert_eq!(centered[[2, 3]], 0.);
    }

    #[test]
    fn test_center_strokes_keeps_centered_input() {
        let mut image: Array2<f32> = Array::zeros((28, 28));
        image[[14, 14]] = 255.;
        let centered = center_strokes(&image);
        assert_eq!(centered[[14, 14]], 255.);
    }

    #[test]
    fn test_center_strokes_empty_drawing() {
        let image: Array2<f32> = Array::zeros((28, 28));
        let centered = center_strokes(&image);
        assert!(centered.iter().all(|&v| v == 0.));
    }

    #[test]
    fn test_confidence_bars_have_one_line_per_digit() {
        let confidences = Array::from_elem(10, 0.1);
        let rendered = format_confidence_bars(&confidences);
        assert_eq!(rendered.lines().count(), 10);
        assert!(rendered.starts_with("0 |"));
        assert!(rendered.contains("0.1000"));
    }
}
