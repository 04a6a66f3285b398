#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings for the stitching process.
///
/// These are passed into [`run_pipeline`](crate::run_pipeline) explicitly. Nothing about a
/// run is remembered between calls.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PanoramaSettings {
    /// The detector response threshold used for akaze
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_akaze_threshold")
    )]
    pub akaze_threshold: f64,
    /// A match is kept if its distance is at most this multiple of the smallest distance in its pair
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_match_ratio_threshold")
    )]
    pub match_ratio_threshold: f64,
    /// The number of most-matched images kept as registration candidates for every image
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_top_k"))]
    pub top_k: usize,
    /// The reprojection error in pixels below which a match is an inlier of a homography
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_ransac_threshold")
    )]
    pub ransac_threshold: f64,
    /// The constant term of the inlier test `inliers > alpha + beta * matches`
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_alpha"))]
    pub alpha: f64,
    /// The proportional term of the inlier test `inliers > alpha + beta * matches`
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_beta"))]
    pub beta: f64,
    /// The seed of the random sampling performed by sample consensus
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_consensus_seed")
    )]
    pub consensus_seed: u64,
}

impl Default for PanoramaSettings {
    fn default() -> Self {
        Self {
            akaze_threshold: default_akaze_threshold(),
            match_ratio_threshold: default_match_ratio_threshold(),
            top_k: default_top_k(),
            ransac_threshold: default_ransac_threshold(),
            alpha: default_alpha(),
            beta: default_beta(),
            consensus_seed: default_consensus_seed(),
        }
    }
}

fn default_akaze_threshold() -> f64 {
    0.001
}

fn default_match_ratio_threshold() -> f64 {
    2.0
}

fn default_top_k() -> usize {
    6
}

fn default_ransac_threshold() -> f64 {
    5.0
}

fn default_alpha() -> f64 {
    8.0
}

fn default_beta() -> f64 {
    0.3
}

fn default_consensus_seed() -> u64 {
    0
}
