use crate::{CompositingFailure, PanoramaError, Result};
use four_point::Homography;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use log::*;

/// The value of canvas pixels no image has been drawn on.
const EMPTY: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Warps `image` onto a new canvas with `to_canvas` and overlays `canvas` at the origin.
///
/// The new canvas is as wide as both images side by side and as tall as the taller one.
/// Every pixel of `canvas` that has been drawn on overwrites the warped image beneath it.
/// There is no blending: the canvas always wins.
pub fn composite(
    canvas: &RgbaImage,
    image: &RgbaImage,
    to_canvas: &Homography,
) -> std::result::Result<RgbaImage, CompositingFailure> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CompositingFailure::EmptyImage);
    }
    let width = canvas
        .width()
        .checked_add(image.width())
        .ok_or(CompositingFailure::CanvasTooLarge)?;
    let height = canvas.height().max(image.height());
    let projection = Projection::from_matrix(to_canvas.to_row_major().map(|v| v as f32))
        .ok_or(CompositingFailure::SingularTransform)?;

    let mut out = RgbaImage::from_pixel(width, height, EMPTY);
    warp_into(image, &projection, Interpolation::Bilinear, EMPTY, &mut out);
    for (x, y, &pixel) in canvas.enumerate_pixels() {
        if pixel[3] != 0 {
            out.put_pixel(x, y, pixel);
        }
    }
    Ok(out)
}

/// Folds images into a panorama one at a time.
///
/// The canvas lives in the frame of the first image. The transform of every placed image
/// into that frame is remembered so later images can be chained onto any of them.
/// Compositing is order dependent: placing the same images in another order produces a
/// different panorama.
#[derive(Debug, Clone)]
pub struct Compositor {
    canvas: RgbaImage,
    placed: Vec<(usize, Homography)>,
}

impl Compositor {
    pub fn new(index: usize, image: Option<&DynamicImage>) -> Result<Self> {
        let image = source_pixels(index, image)?;
        Ok(Self {
            canvas: image,
            placed: vec![(index, Homography::identity())],
        })
    }

    /// The images on the canvas, in the order they were placed.
    pub fn order(&self) -> Vec<usize> {
        self.placed.iter().map(|&(ix, _)| ix).collect()
    }

    pub fn last(&self) -> usize {
        self.placed.last().map(|&(ix, _)| ix).unwrap_or_default()
    }

    /// The transform taking a placed image into the canvas.
    pub fn transform(&self, index: usize) -> Option<Homography> {
        self.placed
            .iter()
            .find(|&&(ix, _)| ix == index)
            .map(|&(_, transform)| transform)
    }

    /// Places `image` on the canvas given the homography taking it into the already placed
    /// image `anchor`.
    pub fn add(
        &mut self,
        index: usize,
        image: Option<&DynamicImage>,
        anchor: usize,
        to_anchor: Homography,
    ) -> Result<()> {
        let failure = |reason| PanoramaError::Compositing {
            image: index,
            reason,
        };
        let anchor_transform = self
            .transform(anchor)
            .ok_or(failure(CompositingFailure::MissingImage))?;
        let to_canvas = anchor_transform * to_anchor;
        let image = source_pixels(index, image)?;
        self.canvas = composite(&self.canvas, &image, &to_canvas).map_err(failure)?;
        debug!(
            "placed image {} onto a {}x{} canvas",
            index,
            self.canvas.width(),
            self.canvas.height()
        );
        self.placed.push((index, to_canvas));
        Ok(())
    }

    pub fn finish(self) -> RgbaImage {
        self.canvas
    }
}

fn source_pixels(index: usize, image: Option<&DynamicImage>) -> Result<RgbaImage> {
    let failure = |reason| PanoramaError::Compositing {
        image: index,
        reason,
    };
    let image = image.ok_or(failure(CompositingFailure::MissingImage))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(failure(CompositingFailure::EmptyImage));
    }
    Ok(image.to_rgba8())
}
