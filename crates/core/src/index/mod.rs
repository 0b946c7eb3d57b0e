pub mod buckets;
pub mod tree;

pub use buckets::{
    ConstraintOptions, ConstraintSlot, DecisionKey, HardConstraints, HpBucket, PriceBucket,
    TorqueBucket,
};
pub use tree::{CandidateFilter, DecisionIndex, IndexLeaf, ScanFilter};
