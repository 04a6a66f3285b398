//! # `panorama`
//!
//! Assembles a panorama from overlapping photographs.
//!
//! The pipeline runs in stages, each of which only looks at the output of the previous one:
//!
//! 1. [`extract_features`] detects keypoints and descriptors on every image (AKAZE by default,
//!    or any [`FeatureExtractor`]).
//! 2. [`candidate_lists`] matches every ordered pair of images, keeps the matches within
//!    [`PanoramaSettings::match_ratio_threshold`] of the best one, and prunes every image to its
//!    [`PanoramaSettings::top_k`] best matched neighbors.
//! 3. [`register_candidates`] fits a homography to every candidate pair with ARRSAC and keeps the
//!    pairs whose inlier count passes [`PairValidator`].
//! 4. [`AssemblyGraph`] orders the images by when they were first seen on a validated pair.
//! 5. [`Compositor`] warps the images into the frame of the first one, in order, with the
//!    canvas always overwriting the newly warped image.
//!
//! [`run_pipeline`] performs all of the above. Pairs and images that get filtered along the
//! way are reported as [`Diagnostic`]s on the returned [`Panorama`]. Only unusable input and
//! compositing failures are errors.
//!
//! Enabling the `rayon` feature runs extraction, matching, and registration of independent
//! images and pairs in parallel. Results are identical either way.

mod assembly;
mod composite;
mod diagnostic;
mod error;
mod extract;
mod matching;
mod pipeline;
mod registration;
mod settings;

pub use assembly::*;
pub use composite::*;
pub use diagnostic::*;
pub use error::*;
pub use extract::*;
pub use four_point::{FourPoint, Homography};
pub use matching::*;
pub use pano_core::{Correspondence, Descriptor, FeatureMatch, FeatureSet, KeyPoint, MatchSet};
pub use pipeline::*;
pub use registration::*;
pub use settings::*;
