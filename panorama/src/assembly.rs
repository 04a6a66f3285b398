use crate::ValidatedPair;
use four_point::Homography;

/// The implicit graph whose edges are the validated pairs.
///
/// Vertices are image indices. Edges are kept in the order they were discovered, which is
/// what the assembly order is derived from.
#[derive(Debug, Clone, Default)]
pub struct AssemblyGraph {
    num_images: usize,
    edges: Vec<ValidatedPair>,
}

impl AssemblyGraph {
    pub fn new(num_images: usize, edges: Vec<ValidatedPair>) -> Self {
        Self { num_images, edges }
    }

    /// See [`assembly_order`].
    pub fn order(&self) -> Vec<usize> {
        assembly_order(&self.edges)
    }

    /// Images that appear on no validated edge.
    pub fn isolated(&self) -> Vec<usize> {
        let mut seen = vec![false; self.num_images];
        for edge in &self.edges {
            for ix in [edge.source, edge.target] {
                if let Some(seen) = seen.get_mut(ix) {
                    *seen = true;
                }
            }
        }
        (0..self.num_images).filter(|&ix| !seen[ix]).collect()
    }

    /// The homography taking image `from` into image `to`, if the two share an edge.
    ///
    /// An edge discovered in the `from -> to` direction is preferred over inverting one
    /// discovered in the other direction.
    pub fn homography(&self, from: usize, to: usize) -> Option<Homography> {
        self.edges
            .iter()
            .find(|edge| edge.source == from && edge.target == to)
            .map(|edge| edge.homography)
            .or_else(|| {
                self.edges
                    .iter()
                    .filter(|edge| edge.source == to && edge.target == from)
                    .find_map(|edge| edge.homography.inverse())
            })
    }

    /// The first image of `candidates` that `from` shares an edge with, and the homography
    /// taking `from` into it.
    pub fn link_to_any(&self, from: usize, candidates: &[usize]) -> Option<(usize, Homography)> {
        candidates
            .iter()
            .find_map(|&to| self.homography(from, to).map(|homography| (to, homography)))
    }
}

/// The order images are composited in.
///
/// Every image is listed once, at the point where it is first seen on either side of a
/// validated pair, with pairs taken in discovery order. Images on no validated pair are
/// not listed.
pub fn assembly_order(pairs: &[ValidatedPair]) -> Vec<usize> {
    let mut order: Vec<usize> = vec![];
    for pair in pairs {
        for ix in [pair.source, pair.target] {
            if !order.contains(&ix) {
                order.push(ix);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(source: usize, target: usize, dx: f64) -> ValidatedPair {
        ValidatedPair {
            source,
            target,
            homography: Homography::from_translation(dx, 0.0),
            inliers: 40,
            correspondences: 50,
        }
    }

    #[test]
    fn chain_of_three() {
        let pairs = [pair(0, 1, -30.0), pair(1, 2, -30.0)];
        assert_eq!(assembly_order(&pairs), vec![0, 1, 2]);
    }

    #[test]
    fn discovery_order_not_index_order() {
        let pairs = [pair(2, 0, 10.0), pair(0, 1, 10.0), pair(1, 0, -10.0), pair(3, 1, 5.0)];
        assert_eq!(assembly_order(&pairs), vec![2, 0, 1, 3]);
    }

    #[test]
    fn isolated_images_are_excluded() {
        let graph = AssemblyGraph::new(4, vec![pair(0, 1, -30.0), pair(1, 3, -30.0)]);
        assert_eq!(graph.order(), vec![0, 1, 3]);
        assert_eq!(graph.isolated(), vec![2]);
    }

    #[test]
    fn homography_lookup_inverts_reverse_edges() {
        let graph = AssemblyGraph::new(3, vec![pair(0, 1, -30.0)]);
        assert_eq!(
            graph.homography(0, 1),
            Some(Homography::from_translation(-30.0, 0.0))
        );
        assert_eq!(
            graph.homography(1, 0),
            Some(Homography::from_translation(30.0, 0.0))
        );
        assert_eq!(graph.homography(1, 2), None);
        assert_eq!(
            graph.link_to_any(1, &[2, 0]),
            Some((0, Homography::from_translation(30.0, 0.0)))
        );
    }
}
