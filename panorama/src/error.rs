use std::path::PathBuf;
use thiserror::Error;

/// Errors which abort a stitching run.
///
/// Routine filtering of image pairs is never an error. It is reported through
/// [`Diagnostic`](crate::Diagnostic) instead.
#[derive(Debug, Error)]
pub enum PanoramaError {
    #[error("at least two images are required to stitch a panorama, got {0}")]
    Input(usize),
    #[error("can't read image {path:?}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unable to composite image {image}: {reason}")]
    Compositing {
        image: usize,
        reason: CompositingFailure,
    },
    #[error("unable to write panorama to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The reason a step of the compositing fold could not be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompositingFailure {
    #[error("no image exists at this index")]
    MissingImage,
    #[error("the image has no pixels")]
    EmptyImage,
    #[error("the transform into the canvas is not invertible")]
    SingularTransform,
    #[error("the canvas would exceed the maximum image size")]
    CanvasTooLarge,
}

pub type Result<T> = std::result::Result<T, PanoramaError>;
