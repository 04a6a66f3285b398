use crate::{FeatureSet, KeyPoint};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A pair of pixel locations hypothesized to show the same scene point.
///
/// The first keypoint lies on the query (object) image and the second on the train (scene) image.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeatureMatch(pub KeyPoint, pub KeyPoint);

/// A tentative correspondence between descriptor `query` of one image and descriptor `train`
/// of another.
///
/// Lower `distance` means more similar descriptors. It is never negative, but has no upper bound.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Correspondence {
    pub query: usize,
    pub train: usize,
    pub distance: f64,
}

/// Correspondences from image `source` (query) to image `target` (train).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct MatchSet {
    pub source: usize,
    pub target: usize,
    pub matches: Vec<Correspondence>,
}

impl MatchSet {
    pub fn new(source: usize, target: usize, matches: Vec<Correspondence>) -> Self {
        Self {
            source,
            target,
            matches,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Looks up the keypoints of every correspondence.
    ///
    /// `source` and `target` must be the feature sets this match set was computed from.
    pub fn feature_matches<'a>(
        &'a self,
        source: &'a FeatureSet,
        target: &'a FeatureSet,
    ) -> impl Iterator<Item = FeatureMatch> + Clone + 'a {
        self.matches.iter().map(move |correspondence| {
            FeatureMatch(
                source.keypoint(correspondence.query),
                target.keypoint(correspondence.train),
            )
        })
    }

    /// Splits the correspondences into the object (source) and scene (target) point sequences.
    pub fn point_sequences(
        &self,
        source: &FeatureSet,
        target: &FeatureSet,
    ) -> (Vec<KeyPoint>, Vec<KeyPoint>) {
        self.feature_matches(source, target)
            .map(|FeatureMatch(object, scene)| (object, scene))
            .unzip()
    }
}
