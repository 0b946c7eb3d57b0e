//! Car recommendation core.
//!
//! Loads a catalogue once, derives a feature table, a decision index and a
//! similarity graph from it, and answers recommendation queries against
//! those read-only structures.

pub mod catalogue;
pub mod config;
pub mod domain;
pub mod errors;
pub mod features;
pub mod index;
pub mod ranking;
pub mod recommender;
pub mod similarity;

pub use catalogue::{Catalogue, CatalogueOptions};
pub use domain::car::{CarId, CarRecord, CarType, Engine};
pub use errors::{CatalogueError, InputKind, InterfaceError, RecommendError};
pub use features::{ColumnStats, FeatureNormaliser, FeatureTable, FeatureVector, FEATURE_DIM};
pub use index::{
    CandidateFilter, ConstraintOptions, ConstraintSlot, DecisionIndex, DecisionKey,
    HardConstraints, ScanFilter,
};
pub use ranking::{PreferenceFormula, PreferenceWeights, RankOutcome, RankedCar, Ranker};
pub use recommender::{
    BestFit, CatalogueSummary, RecommendOutcome, Recommendation, Recommender, RecommenderOptions,
    SimilarMatch,
};
pub use similarity::{SimilarCar, SimilarityGraph};
