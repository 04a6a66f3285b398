use bitarray::BitArray;
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The binary descriptor type produced by AKAZE (486 bits padded to 64 bytes).
///
/// Descriptors are compared with the Hamming distance.
pub type Descriptor = BitArray<64>;

/// Allows the retrieval of the point on the image the feature came from.
pub trait ImagePoint {
    /// Retrieves the point on the image
    fn image_point(&self) -> Point2<f64>;
}

/// A detected location of interest on an image in pixel coordinates.
///
/// `+x` points right and `+y` points down, starting from the top left corner.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KeyPoint(pub Point2<f64>);

impl KeyPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self(Point2::new(x, y))
    }
}

impl ImagePoint for KeyPoint {
    fn image_point(&self) -> Point2<f64> {
        self.0
    }
}

/// The keypoints and descriptors extracted from a single image.
///
/// The keypoint at index `i` is described by the descriptor at index `i`, so both sequences
/// always have the same length. A `FeatureSet` is read-only once it has been created.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeatureSet {
    keypoints: Vec<KeyPoint>,
    descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    /// Returns `None` if the two sequences are not parallel.
    pub fn new(keypoints: Vec<KeyPoint>, descriptors: Vec<Descriptor>) -> Option<Self> {
        if keypoints.len() == descriptors.len() {
            Some(Self {
                keypoints,
                descriptors,
            })
        } else {
            None
        }
    }

    /// Builds a feature set from anything that knows where it lies on the image.
    pub fn from_image_points<P>(points: impl IntoIterator<Item = (P, Descriptor)>) -> Self
    where
        P: ImagePoint,
    {
        let (keypoints, descriptors) = points
            .into_iter()
            .map(|(point, descriptor)| (KeyPoint(point.image_point()), descriptor))
            .unzip();
        Self {
            keypoints,
            descriptors,
        }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[KeyPoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn keypoint(&self, ix: usize) -> KeyPoint {
        self.keypoints[ix]
    }
}
