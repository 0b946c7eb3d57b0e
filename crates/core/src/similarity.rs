//! All-pairs similarity over feature vectors.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::catalogue::Catalogue;
use crate::domain::car::CarId;
use crate::errors::RecommendError;
use crate::features::{FeatureTable, FeatureVector};

pub const DEFAULT_TOP_K: usize = 5;

/// `1 / (1 + d)` for the euclidean distance `d`; in `(0, 1]`.
pub fn edge_weight(left: &FeatureVector, right: &FeatureVector) -> f64 {
    1.0 / (1.0 + left.euclidean_distance(right))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarCar {
    pub car: CarId,
    pub name: String,
    pub weight: f64,
    pub similarity_percent: i64,
}

/// Complete undirected graph; vertex `i` is the record with `CarId(i)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimilarityGraph {
    adjacency: Vec<BTreeMap<CarId, f64>>,
}

impl SimilarityGraph {
    pub fn build(features: &FeatureTable) -> Self {
        let vectors = features.vectors();
        let mut adjacency = vec![BTreeMap::new(); vectors.len()];

        for (left, left_vector) in vectors.iter().enumerate() {
            for (right, right_vector) in vectors.iter().enumerate().skip(left + 1) {
                let weight = edge_weight(left_vector, right_vector);
                adjacency[left].insert(CarId(right), weight);
                adjacency[right].insert(CarId(left), weight);
            }
        }

        let graph = Self { adjacency };
        info!(
            event_name = "similarity.build.completed",
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "similarity graph built"
        );
        graph
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Undirected edges, each counted once.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeMap::len).sum::<usize>() / 2
    }

    pub fn weight(&self, left: CarId, right: CarId) -> Option<f64> {
        self.adjacency.get(left.0)?.get(&right).copied()
    }

    pub fn neighbours(&self, car: CarId) -> Option<&BTreeMap<CarId, f64>> {
        self.adjacency.get(car.0)
    }

    /// Up to `k` neighbours of `car`, heaviest first, ties in catalogue order.
    pub fn nearest(&self, car: CarId, k: usize) -> Option<Vec<(CarId, f64)>> {
        let mut ranked: Vec<(CarId, f64)> =
            self.neighbours(car)?.iter().map(|(id, weight)| (*id, *weight)).collect();
        ranked.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));
        ranked.truncate(k);
        Some(ranked)
    }

    /// Named lookup with percentages, as shown next to a recommendation.
    pub fn top_k(
        &self,
        catalogue: &Catalogue,
        name: &str,
        k: usize,
    ) -> Result<Vec<SimilarCar>, RecommendError> {
        let unknown = || RecommendError::UnknownCar(name.to_owned());
        let car = catalogue.position(name).ok_or_else(unknown)?;
        let nearest = self.nearest(car, k).ok_or_else(unknown)?;

        nearest
            .into_iter()
            .map(|(id, weight)| {
                let record = catalogue.get(id).ok_or_else(unknown)?;
                Ok(SimilarCar {
                    car: id,
                    name: record.name.clone(),
                    weight,
                    similarity_percent: similarity_percent(weight),
                })
            })
            .collect()
    }
}

pub fn similarity_percent(weight: f64) -> i64 {
    (weight * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::{similarity_percent, SimilarityGraph, DEFAULT_TOP_K};
    use crate::catalogue::{Catalogue, CatalogueOptions};
    use crate::domain::car::CarId;
    use crate::errors::RecommendError;
    use crate::features::FeatureNormaliser;

    const HEADER: &str = "name,engine,horsepower,price,torque,car_type,rating,reliability,zero_to_sixty,max_speed,image_ref\n";

    fn fixture(rows: &[&str]) -> (Catalogue, SimilarityGraph) {
        let csv = format!("{HEADER}{}\n", rows.join("\n"));
        let catalogue = Catalogue::from_reader(csv.as_bytes(), CatalogueOptions::default())
            .expect("fixture catalogue parses");
        let graph = SimilarityGraph::build(&FeatureNormaliser::new().fit(&catalogue));
        (catalogue, graph)
    }

    #[test]
    fn two_car_weight_follows_feature_distance() {
        let (catalogue, graph) = fixture(&[
            "A,V8,500,120000,600,Sports,9.0,4.5,3.2,300,imgA",
            "B,V6,300,60000,400,Sedan,8.0,4.0,5.0,250,imgB",
        ]);

        // seven numeric columns at opposite ends plus two differing bits per one-hot block
        let expected = 1.0 / (1.0 + 11.0_f64.sqrt());
        let weight = graph.weight(CarId(0), CarId(1)).expect("edge exists");
        assert!((weight - expected).abs() < 1e-12);

        let similar = graph.top_k(&catalogue, "A", 10).expect("A is known");
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].name, "B");
        assert_eq!(similar[0].similarity_percent, 23);
    }

    #[test]
    fn graph_is_complete_and_symmetric() {
        let (_, graph) = fixture(&[
            "A,V8,500,120000,600,Sports,9.0,4.5,3.2,300,a",
            "B,V6,300,60000,400,Sedan,8.0,4.0,5.0,250,b",
            "C,V12,700,250000,800,Luxury,9.5,3.5,3.0,320,c",
            "D,Electric,400,45000,450,SUV,7.5,4.8,4.1,210,d",
        ]);

        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 6);
        for left in 0..4 {
            assert_eq!(graph.weight(CarId(left), CarId(left)), None);
            for right in (0..4).filter(|right| *right != left) {
                let weight = graph.weight(CarId(left), CarId(right)).expect("complete graph");
                assert_eq!(Some(weight), graph.weight(CarId(right), CarId(left)));
                assert!(weight > 0.0 && weight <= 1.0);
            }
        }
    }

    #[test]
    fn top_k_orders_by_weight_then_catalogue_order() {
        let (catalogue, graph) = fixture(&[
            "A,V8,500,120000,600,Sports,9.0,4.5,3.2,300,a",
            "B,V6,300,60000,400,Sedan,8.0,4.0,5.0,250,b",
            "C,V8,500,120000,600,Sports,9.0,4.5,3.2,300,c",
            "D,V8,500,120000,600,Sports,9.0,4.5,3.2,300,d",
        ]);

        let similar = graph.top_k(&catalogue, "A", DEFAULT_TOP_K).expect("A is known");
        let names: Vec<_> = similar.iter().map(|car| car.name.as_str()).collect();
        assert_eq!(names, vec!["C", "D", "B"]);
        assert_eq!(similar[0].similarity_percent, 100);

        let first = graph.top_k(&catalogue, "A", 1).expect("A is known");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "C");
    }

    #[test]
    fn unknown_name_is_rejected() {
        let (catalogue, graph) = fixture(&["A,V8,500,120000,600,Sports,9.0,4.5,3.2,300,a"]);

        assert_eq!(
            graph.top_k(&catalogue, "Nope", 3),
            Err(RecommendError::UnknownCar("Nope".to_owned()))
        );
        assert_eq!(graph.top_k(&catalogue, "A", 3), Ok(Vec::new()));
    }

    #[test]
    fn percentages_round_to_nearest() {
        assert_eq!(similarity_percent(1.0), 100);
        assert_eq!(similarity_percent(0.236), 24);
        assert_eq!(similarity_percent(0.2316), 23);
    }
}
