#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A non-fatal outcome recorded while stitching.
///
/// Each of these shrinks the working set of pairs or images without stopping the run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum Diagnostic {
    /// The pair retained too few correspondences to determine a homography.
    InsufficientCorrespondences {
        source: usize,
        target: usize,
        count: usize,
    },
    /// The correspondences of the pair admit no non-degenerate homography.
    DegenerateGeometry { source: usize, target: usize },
    /// The homography of the pair failed the inlier test.
    ValidationRejection {
        source: usize,
        target: usize,
        inliers: usize,
        correspondences: usize,
    },
    /// These images could not be connected to the panorama and were left out of it.
    DisconnectedAssembly { excluded: Vec<usize> },
}
