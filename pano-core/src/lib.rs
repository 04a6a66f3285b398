//! # Panorama Core
//!
//! Common types for the panorama stitching crates. Everything that needs to talk about
//! keypoints, descriptors, or correspondences between two images depends on this crate so
//! that the matcher, the homography estimator, and the compositor agree on one vocabulary.
//!
//! The pieces fit together like this:
//!
//! * A [`FeatureSet`] is produced once per image by a feature extractor. It holds parallel
//!   sequences of [`KeyPoint`] locations and binary [`Descriptor`]s.
//! * Matching a query [`FeatureSet`] against a train [`FeatureSet`] produces one
//!   [`Correspondence`] per query descriptor. A filtered collection of them between one
//!   ordered pair of images is a [`MatchSet`].
//! * A [`MatchSet`] is turned into [`FeatureMatch`]es (pairs of pixel locations) which are the
//!   data points consumed by [`sample_consensus`] estimators.
//!
//! Images are only ever referred to by their index in the input order. None of these types
//! borrow or own pixel data.

mod features;
mod matches;

pub use bitarray;
pub use features::*;
pub use matches::*;
pub use nalgebra;
pub use sample_consensus;
