//! Helpers for the `stitch` binary that are not part of the stitching process itself.

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::{drawing, pixelops};
use itertools::Itertools;
use palette::{FromColor, Hsv, RgbHue, Srgb};
use pano_core::{FeatureMatch, KeyPoint};

/// Draws `a` and `b` side by side with a line between the two keypoints of every match.
///
/// The first keypoint of each match must lie on `a` and the second on `b`.
pub fn render_matches(
    a: &DynamicImage,
    b: &DynamicImage,
    matches: impl IntoIterator<Item = FeatureMatch>,
) -> RgbaImage {
    let canvas_width = a.width() + b.width();
    let canvas_height = a.height().max(b.height());
    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, Rgba([0, 0, 0, 255]));

    for (image, x_offset) in [(a, 0), (b, a.width())] {
        let image = image.to_rgba8();
        let (width, height) = image.dimensions();
        for (x, y) in (0..width).cartesian_product(0..height) {
            canvas.put_pixel(x + x_offset, y, *image.get_pixel(x, y));
        }
    }

    let to_tuple = |point: KeyPoint, offset: u32| (point.x as i32 + offset as i32, point.y as i32);
    for (ix, FeatureMatch(pa, pb)) in matches.into_iter().enumerate() {
        // Rotate through the saturated hues.
        let hsv = Hsv::new(RgbHue::from_radians(ix as f64 * 0.1), 1.0, 1.0);
        let rgb = Srgb::from_color(hsv);
        drawing::draw_antialiased_line_segment_mut(
            &mut canvas,
            to_tuple(pa, 0),
            to_tuple(pb, a.width()),
            Rgba([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
                255,
            ]),
            pixelops::interpolate,
        );
    }
    canvas
}
