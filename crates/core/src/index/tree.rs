//! Prefix tree over discretised attributes.
//!
//! Nodes live in a flat arena; children are arena indices in first-insertion
//! order, so every query replays catalogue order without sorting.

use serde::Serialize;
use tracing::{info, warn};

use crate::catalogue::Catalogue;
use crate::domain::car::CarId;
use crate::index::buckets::{DecisionKey, DEPTH};

/// Narrows the catalogue to the records that satisfy a full set of hard
/// constraints. Results are in catalogue order.
pub trait CandidateFilter: Send + Sync {
    fn candidates(&self, key: &DecisionKey) -> Vec<CarId>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexLeaf {
    pub name: String,
    pub car: CarId,
}

#[derive(Clone, Debug, Default)]
struct Node {
    discriminator: u8,
    children: Vec<usize>,
    leaves: Vec<IndexLeaf>,
}

#[derive(Clone, Debug)]
pub struct DecisionIndex {
    nodes: Vec<Node>,
    leaf_count: usize,
}

const ROOT: usize = 0;

impl Default for DecisionIndex {
    fn default() -> Self {
        Self { nodes: vec![Node::default()], leaf_count: 0 }
    }
}

impl DecisionIndex {
    pub fn build(catalogue: &Catalogue) -> Self {
        let mut index = Self::default();
        let mut skipped = 0_usize;

        for (id, record) in catalogue.iter() {
            match DecisionKey::from_record(record) {
                Some(key) => index.insert(&key, IndexLeaf { name: record.name.clone(), car: id }),
                None => {
                    skipped += 1;
                    warn!(
                        event_name = "index.build.skipped_record",
                        car = %record.name,
                        engine = %record.engine,
                        car_type = %record.car_type,
                        "record has an unknown engine or car type and is not indexed"
                    );
                }
            }
        }

        info!(
            event_name = "index.build.completed",
            leaves = index.leaf_count,
            nodes = index.nodes.len(),
            skipped,
            "decision index built"
        );
        index
    }

    /// Adds a leaf under the path for `key`. Keys carrying an `Other` value
    /// have no path and are ignored.
    pub fn insert(&mut self, key: &DecisionKey, leaf: IndexLeaf) {
        let Some(codes) = key.codes() else {
            return;
        };

        let mut current = ROOT;
        for code in codes {
            current = match self.child(current, code) {
                Some(child) => child,
                None => self.push_child(current, code),
            };
        }
        self.nodes[current].leaves.push(leaf);
        self.leaf_count += 1;
    }

    /// Leaves under the path for `key`, in insertion order. A path that was
    /// never created yields an empty list.
    pub fn query(&self, key: &DecisionKey) -> Vec<IndexLeaf> {
        self.terminal(key).map(|node| self.nodes[node].leaves.clone()).unwrap_or_default()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct complete paths.
    pub fn path_count(&self) -> usize {
        self.nodes.iter().filter(|node| !node.leaves.is_empty()).count()
    }

    pub fn depth(&self) -> usize {
        DEPTH
    }

    fn terminal(&self, key: &DecisionKey) -> Option<usize> {
        key.codes()?.into_iter().try_fold(ROOT, |node, code| self.child(node, code))
    }

    fn child(&self, parent: usize, code: u8) -> Option<usize> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[*child].discriminator == code)
    }

    fn push_child(&mut self, parent: usize, code: u8) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node { discriminator: code, ..Node::default() });
        self.nodes[parent].children.push(id);
        id
    }
}

impl CandidateFilter for DecisionIndex {
    fn candidates(&self, key: &DecisionKey) -> Vec<CarId> {
        self.query(key).into_iter().map(|leaf| leaf.car).collect()
    }
}

/// Linear filter over precomputed keys. Same answers as [`DecisionIndex`];
/// used as the reference when checking the tree.
#[derive(Clone, Debug, Default)]
pub struct ScanFilter {
    keys: Vec<(CarId, DecisionKey)>,
}

impl ScanFilter {
    pub fn build(catalogue: &Catalogue) -> Self {
        let keys = catalogue
            .iter()
            .filter_map(|(id, record)| DecisionKey::from_record(record).map(|key| (id, key)))
            .collect();
        Self { keys }
    }
}

impl CandidateFilter for ScanFilter {
    fn candidates(&self, key: &DecisionKey) -> Vec<CarId> {
        self.keys.iter().filter(|(_, candidate)| candidate == key).map(|(id, _)| *id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{CandidateFilter, DecisionIndex, ScanFilter};
    use crate::catalogue::{Catalogue, CatalogueOptions};
    use crate::domain::car::CarId;
    use crate::index::buckets::{DecisionKey, HardConstraints};

    const HEADER: &str = "name,engine,horsepower,price,torque,car_type,rating,reliability,zero_to_sixty,max_speed,image_ref\n";

    fn catalogue(rows: &[&str]) -> Catalogue {
        let mut csv = HEADER.to_owned();
        for row in rows {
            csv.push_str(row);
            csv.push('\n');
        }
        Catalogue::from_reader(csv.as_bytes(), CatalogueOptions::default())
            .expect("fixture catalogue parses")
    }

    fn key(engine: &str, hp: &str, price: &str, torque: &str, car_type: &str) -> DecisionKey {
        HardConstraints::new(engine, hp, price, torque, car_type)
            .resolve()
            .expect("fixture constraints resolve")
    }

    #[test]
    fn query_returns_matching_leaves_in_catalogue_order() {
        let catalogue = catalogue(&[
            "A,V8,500,150000,600,Sports,9,4,3.5,200,a",
            "B,V6,300,40000,300,Sedan,7,5,6.0,150,b",
            "C,V8,610,120000,700,Sports,8,3,3.1,205,c",
        ]);
        let index = DecisionIndex::build(&catalogue);

        let leaves = index.query(&key("V8", "450-620", "$100,000-$199,999", "500-750", "Sports"));
        let names: Vec<_> = leaves.iter().map(|leaf| leaf.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(leaves[1].car, CarId(2));

        assert_eq!(index.leaf_count(), 3);
        assert_eq!(index.path_count(), 2);
    }

    #[test]
    fn unseen_path_yields_nothing() {
        let catalogue = catalogue(&["B,V6,300,40000,300,Sedan,7,5,6.0,150,b"]);
        let index = DecisionIndex::build(&catalogue);

        assert!(index.query(&key("V12", "620+", "$200,000+", "750+", "Luxury")).is_empty());
        // shares the engine level only
        assert!(index.query(&key("V6", "620+", "$0-$49,999", "0-499", "Sedan")).is_empty());
    }

    #[test]
    fn prefix_nodes_are_shared() {
        let catalogue = catalogue(&[
            "A,V8,500,150000,600,Sports,9,4,3.5,200,a",
            "B,V8,500,150000,600,Luxury,9,4,3.5,200,b",
        ]);
        let index = DecisionIndex::build(&catalogue);

        // root + four shared levels + two car type nodes
        assert_eq!(index.node_count(), 7);
    }

    #[test]
    fn other_values_are_not_indexed() {
        let catalogue = catalogue(&[
            "A,V8,500,150000,600,Sports,9,4,3.5,200,a",
            "W,W16,1500,3000000,1180,Hyper,9,4,2.4,261,w",
        ]);
        let index = DecisionIndex::build(&catalogue);

        assert_eq!(index.leaf_count(), 1);
        assert_eq!(catalogue.unindexable_count(), 1);
    }

    #[test]
    fn scan_filter_agrees_with_tree() {
        let catalogue = catalogue(&[
            "A,V8,500,150000,600,Sports,9,4,3.5,200,a",
            "B,V6,300,40000,300,Sedan,7,5,6.0,150,b",
            "C,V8,610,120000,700,Sports,8,3,3.1,205,c",
            "D,Electric,1020,130000,1050,Sedan,9,4,2.0,200,d",
        ]);
        let index = DecisionIndex::build(&catalogue);
        let scan = ScanFilter::build(&catalogue);

        for (id, record) in catalogue.iter() {
            let key = DecisionKey::from_record(record).expect("fixture is indexable");
            let from_tree = index.candidates(&key);
            assert_eq!(from_tree, scan.candidates(&key));
            assert!(from_tree.contains(&id));
        }
    }
}
