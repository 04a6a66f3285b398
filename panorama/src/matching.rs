use crate::PanoramaSettings;
use bitarray::Hamming;
use float_ord::FloatOrd;
use log::*;
use pano_core::{Correspondence, FeatureSet, MatchSet};
use space::{Knn, LinearKnn};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Matches every `query` descriptor to its nearest `train` descriptor by Hamming distance.
///
/// The output has exactly one correspondence per query descriptor, in query order,
/// unless either feature set is empty, in which case it is empty.
pub fn match_features(query: &FeatureSet, train: &FeatureSet) -> Vec<Correspondence> {
    if query.is_empty() || train.is_empty() {
        return Vec::new();
    }
    let knn_train = LinearKnn {
        metric: Hamming,
        iter: train.descriptors().iter(),
    };
    query
        .descriptors()
        .iter()
        .enumerate()
        .filter_map(|(query_ix, descriptor)| {
            knn_train
                .knn(descriptor, 1)
                .into_iter()
                .next()
                .map(|neighbor| Correspondence {
                    query: query_ix,
                    train: neighbor.index,
                    distance: neighbor.distance as f64,
                })
        })
        .collect()
}

/// Keeps only the correspondences whose distance is at most `ratio` times the smallest
/// distance among `matches`.
pub fn filter_by_distance_ratio(matches: &[Correspondence], ratio: f64) -> Vec<Correspondence> {
    let min_distance = match matches.iter().map(|m| FloatOrd(m.distance)).min() {
        Some(FloatOrd(min_distance)) => min_distance,
        None => return Vec::new(),
    };
    matches
        .iter()
        .filter(|m| m.distance <= ratio * min_distance)
        .copied()
        .collect()
}

/// Orders match sets by descending size and keeps the first `k`.
///
/// The sort is stable, so match sets of equal size keep the order they were given in.
pub fn retain_top_k(mut match_sets: Vec<MatchSet>, k: usize) -> Vec<MatchSet> {
    match_sets.sort_by(|a, b| b.len().cmp(&a.len()));
    match_sets.truncate(k);
    match_sets
}

/// The registration candidates of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateList {
    pub source: usize,
    /// Match sets from `source` to other images, largest first.
    pub match_sets: Vec<MatchSet>,
}

impl CandidateList {
    /// Matches `source` against every other image, filters each pair, and prunes to the
    /// `top_k` best matched images.
    pub fn new(source: usize, features: &[FeatureSet], settings: &PanoramaSettings) -> Self {
        let match_sets = (0..features.len())
            .filter(|&target| target != source)
            .map(|target| {
                let raw = match_features(&features[source], &features[target]);
                let good = filter_by_distance_ratio(&raw, settings.match_ratio_threshold);
                debug!(
                    "image {} to {}: {} matches, {} good",
                    source,
                    target,
                    raw.len(),
                    good.len()
                );
                MatchSet::new(source, target, good)
            })
            .collect();
        let match_sets = retain_top_k(match_sets, settings.top_k);
        trace!(
            "image {} candidates: {:?}",
            source,
            match_sets
                .iter()
                .map(|m| (m.target, m.len()))
                .collect::<Vec<_>>()
        );
        Self { source, match_sets }
    }
}

/// Computes the candidate list of every image.
///
/// Every pair is matched independently. The output is indexed by source image.
pub fn candidate_lists(features: &[FeatureSet], settings: &PanoramaSettings) -> Vec<CandidateList> {
    let build = |source: usize| CandidateList::new(source, features, settings);
    #[cfg(not(feature = "rayon"))]
    let lists = (0..features.len()).map(build).collect();
    #[cfg(feature = "rayon")]
    let lists = (0..features.len()).into_par_iter().map(build).collect();
    lists
}

#[cfg(test)]
mod tests {
    use super::*;
    use pano_core::{bitarray::BitArray, KeyPoint};

    fn descriptor(byte: u8) -> BitArray<64> {
        let mut bytes = [0; 64];
        bytes[0] = byte;
        BitArray::new(bytes)
    }

    fn features(bytes: &[u8]) -> FeatureSet {
        FeatureSet::new(
            bytes
                .iter()
                .enumerate()
                .map(|(ix, _)| KeyPoint::new(ix as f64, 0.0))
                .collect(),
            bytes.iter().copied().map(descriptor).collect(),
        )
        .unwrap()
    }

    fn correspondence(query: usize, distance: f64) -> Correspondence {
        Correspondence {
            query,
            train: 0,
            distance,
        }
    }

    #[test]
    fn nearest_neighbor() {
        let query = features(&[0b0000_0001, 0b1111_0000]);
        let train = features(&[0b1111_1000, 0b0000_0011, 0b1010_1010]);
        let matches = match_features(&query, &train);
        assert_eq!(
            matches,
            vec![
                Correspondence {
                    query: 0,
                    train: 1,
                    distance: 1.0
                },
                Correspondence {
                    query: 1,
                    train: 0,
                    distance: 1.0
                },
            ]
        );
    }

    #[test]
    fn empty_train_set() {
        let query = features(&[1, 2, 3]);
        assert!(match_features(&query, &FeatureSet::default()).is_empty());
        assert!(match_features(&FeatureSet::default(), &query).is_empty());
    }

    #[test]
    fn ratio_filter_keeps_close_matches() {
        let matches = [
            correspondence(0, 12.0),
            correspondence(1, 5.0),
            correspondence(2, 10.0),
            correspondence(3, 10.5),
        ];
        let good = filter_by_distance_ratio(&matches, 2.0);
        assert_eq!(good.iter().map(|m| m.query).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn ratio_filter_of_nothing() {
        assert!(filter_by_distance_ratio(&[], 2.0).is_empty());
    }

    #[test]
    fn top_k_is_stable() {
        let sizes = [3, 7, 3, 9, 7, 1, 3, 0];
        let match_sets = sizes
            .iter()
            .enumerate()
            .map(|(target, &size)| {
                MatchSet::new(
                    100,
                    target,
                    (0..size).map(|q| correspondence(q, 1.0)).collect(),
                )
            })
            .collect();
        let kept = retain_top_k(match_sets, 6);
        assert_eq!(
            kept.iter().map(|m| m.target).collect::<Vec<_>>(),
            vec![3, 1, 4, 0, 2, 6]
        );
    }

    #[test]
    fn candidate_lists_skip_self() {
        let all = vec![features(&[1, 2]), features(&[1, 2]), features(&[200])];
        let lists = candidate_lists(&all, &PanoramaSettings::default());
        assert_eq!(lists.len(), 3);
        for list in &lists {
            assert!(list.match_sets.iter().all(|m| m.target != list.source));
            assert_eq!(list.match_sets.len(), 2);
        }
        // Identical descriptors: both matches have distance 0 and survive.
        assert_eq!(lists[0].match_sets[0].target, 1);
        assert_eq!(lists[0].match_sets[0].len(), 2);
    }
}
