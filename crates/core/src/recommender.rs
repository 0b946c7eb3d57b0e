//! Entry point for the presentation layer.
//!
//! A [`Recommender`] owns the catalogue and every structure derived from it.
//! All of them are built once in [`Recommender::build`] and only read after
//! that, so a recommender can be shared freely between threads.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::catalogue::Catalogue;
use crate::domain::car::{CarId, CarRecord, CarType, Engine};
use crate::errors::RecommendError;
use crate::features::{ColumnStats, FeatureNormaliser, FeatureTable};
use crate::index::buckets::HardConstraints;
use crate::index::tree::{CandidateFilter, DecisionIndex};
use crate::ranking::{PreferenceFormula, PreferenceWeights, RankOutcome, RankedCar, Ranker};
use crate::similarity::{SimilarityGraph, DEFAULT_TOP_K};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecommenderOptions {
    /// Similar cars returned next to the best fit.
    pub top_k: usize,
    pub preference_formula: PreferenceFormula,
}

impl Default for RecommenderOptions {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K, preference_formula: PreferenceFormula::V1 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BestFit {
    pub record: CarRecord,
    pub preference_score: f64,
    pub performance_score: i64,
    pub image_path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarMatch {
    pub record: CarRecord,
    pub weight: f64,
    pub similarity_percent: i64,
    pub image_path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub best: BestFit,
    pub similar: Vec<SimilarMatch>,
    /// Every candidate in rank order; `best` is the head.
    pub ranked: Vec<RankedCar>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecommendOutcome {
    Match(Recommendation),
    NoMatch,
}

impl RecommendOutcome {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            RecommendOutcome::Match(recommendation) => Some(recommendation),
            RecommendOutcome::NoMatch => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: &'static str,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogueSummary {
    pub records: usize,
    pub indexable: usize,
    pub unindexable: usize,
    pub columns: Vec<ColumnSummary>,
    pub engines: BTreeMap<String, usize>,
    pub car_types: BTreeMap<String, usize>,
    pub similarity_edges: usize,
    pub top_k: usize,
    pub preference_formula: PreferenceFormula,
}

pub struct Recommender<F: CandidateFilter = DecisionIndex> {
    catalogue: Catalogue,
    features: FeatureTable,
    filter: F,
    ranker: Ranker,
    graph: SimilarityGraph,
    options: RecommenderOptions,
}

impl Recommender<DecisionIndex> {
    pub fn build(catalogue: Catalogue, options: RecommenderOptions) -> Self {
        Self::with_filter(catalogue, options, DecisionIndex::build)
    }
}

impl<F: CandidateFilter> Recommender<F> {
    pub fn with_filter(
        catalogue: Catalogue,
        options: RecommenderOptions,
        build_filter: impl FnOnce(&Catalogue) -> F,
    ) -> Self {
        let features = FeatureNormaliser::new().fit(&catalogue);
        let filter = build_filter(&catalogue);
        let ranker = Ranker::new(&features, options.preference_formula);
        let graph = SimilarityGraph::build(&features);

        info!(
            event_name = "recommender.build.completed",
            records = catalogue.len(),
            top_k = options.top_k,
            preference_formula = %options.preference_formula,
            "recommender ready"
        );
        Self { catalogue, features, filter, ranker, graph, options }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn features(&self) -> &FeatureTable {
        &self.features
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn graph(&self) -> &SimilarityGraph {
        &self.graph
    }

    pub fn options(&self) -> RecommenderOptions {
        self.options
    }

    /// Filters by the hard constraints, ranks the survivors by the soft
    /// weights and attaches the best fit's nearest neighbours.
    pub fn recommend(
        &self,
        constraints: &HardConstraints,
        weights: &PreferenceWeights,
    ) -> Result<RecommendOutcome, RecommendError> {
        let key = constraints.resolve()?;
        let candidates = self.filter.candidates(&key);

        let ranked = match self.ranker.rank(self.records(&candidates), weights) {
            RankOutcome::Ranked(ranked) => ranked,
            RankOutcome::NoMatch => {
                info!(
                    event_name = "recommend.no_match",
                    engine = %key.engine,
                    car_type = %key.car_type,
                    "no car satisfies the hard constraints"
                );
                return Ok(RecommendOutcome::NoMatch);
            }
        };

        let Some(head) = ranked.first() else {
            return Ok(RecommendOutcome::NoMatch);
        };
        let best = BestFit {
            record: head.record.clone(),
            preference_score: head.preference_score,
            performance_score: head.performance_score,
            image_path: head.image_path.clone(),
        };
        let similar = self.similar(&best.record.name, self.options.top_k)?;

        info!(
            event_name = "recommend.completed",
            candidates = ranked.len(),
            best = %best.record.name,
            similar = similar.len(),
            "recommendation produced"
        );
        Ok(RecommendOutcome::Match(Recommendation { best, similar, ranked }))
    }

    /// Nearest `k` cars to `name`, with records attached.
    pub fn similar(&self, name: &str, k: usize) -> Result<Vec<SimilarMatch>, RecommendError> {
        self.graph
            .top_k(&self.catalogue, name, k)?
            .into_iter()
            .map(|neighbour| {
                let record = self
                    .catalogue
                    .get(neighbour.car)
                    .ok_or_else(|| RecommendError::UnknownCar(neighbour.name.clone()))?;
                Ok(SimilarMatch {
                    record: record.clone(),
                    weight: neighbour.weight,
                    similarity_percent: neighbour.similarity_percent,
                    image_path: record.image_path(),
                })
            })
            .collect()
    }

    pub fn summary(&self) -> CatalogueSummary {
        let mut engines = BTreeMap::new();
        let mut car_types = BTreeMap::new();
        for record in self.catalogue.records() {
            *engines.entry(record.engine.to_string()).or_insert(0) += 1;
            *car_types.entry(record.car_type.to_string()).or_insert(0) += 1;
        }
        let unindexable = self.catalogue.unindexable_count();

        CatalogueSummary {
            records: self.catalogue.len(),
            indexable: self.catalogue.len() - unindexable,
            unindexable,
            columns: self
                .features
                .all_stats()
                .map(|(column, ColumnStats { min, max })| ColumnSummary {
                    column: column.name(),
                    min,
                    max,
                })
                .collect(),
            engines,
            car_types,
            similarity_edges: self.graph.edge_count(),
            top_k: self.options.top_k,
            preference_formula: self.options.preference_formula,
        }
    }

    /// Distinct engine and car type values present in the catalogue, known
    /// values only, in display order.
    pub fn present_categories(&self) -> (Vec<Engine>, Vec<CarType>) {
        let records = self.catalogue.records();
        let engines = Engine::KNOWN
            .into_iter()
            .filter(|engine| records.iter().any(|record| &record.engine == engine))
            .collect();
        let car_types = CarType::KNOWN
            .into_iter()
            .filter(|car_type| records.iter().any(|record| &record.car_type == car_type))
            .collect();
        (engines, car_types)
    }

    fn records<'a>(&'a self, ids: &'a [CarId]) -> impl Iterator<Item = (CarId, &'a CarRecord)> + 'a {
        ids.iter().filter_map(|id| self.catalogue.get(*id).map(|record| (*id, record)))
    }
}

#[cfg(test)]
mod tests {
    use super::{RecommendOutcome, Recommender, RecommenderOptions};
    use crate::catalogue::{Catalogue, CatalogueOptions};
    use crate::errors::RecommendError;
    use crate::index::buckets::{ConstraintSlot, HardConstraints};
    use crate::index::tree::ScanFilter;
    use crate::ranking::{PreferenceFormula, PreferenceWeights};

    const CATALOGUE: &str = "\
name,engine,horsepower,price,torque,car_type,rating,reliability,zero_to_sixty,max_speed,image_ref
A,V8,500,120000,600,Sports,9.0,4.5,3.2,300,imgA
B,V6,300,60000,400,Sedan,8.0,4.0,5.0,250,imgB
C,V8,550,150000,700,Sports,8.5,4.0,3.6,290,imgC
D,V12,700,300000,800,Luxury,9.5,3.5,3.0,330,imgD
";

    fn catalogue() -> Catalogue {
        Catalogue::from_reader(CATALOGUE.as_bytes(), CatalogueOptions::default())
            .expect("fixture catalogue parses")
    }

    fn sports_v8() -> HardConstraints {
        HardConstraints::new("V8", "450-620", "$100,000-$199,999", "500-750", "Sports")
    }

    #[test]
    fn best_fit_comes_with_ranked_candidates_and_neighbours() {
        let recommender = Recommender::build(catalogue(), RecommenderOptions::default());
        let weights = PreferenceWeights::new(50, 50, 50, 50).expect("weights in range");

        let outcome = recommender.recommend(&sports_v8(), &weights).expect("valid query");
        let recommendation = outcome.recommendation().expect("two sports V8s match");

        assert_eq!(recommendation.best.record.name, "A");
        assert_eq!(recommendation.best.image_path, "imgA.jpg");
        let ranked: Vec<_> =
            recommendation.ranked.iter().map(|car| car.record.name.as_str()).collect();
        assert_eq!(ranked, vec!["A", "C"]);

        assert_eq!(recommendation.similar.len(), 3);
        assert!(recommendation.similar.iter().all(|car| car.record.name != "A"));
        assert_eq!(recommendation.similar[0].record.name, "C");
        assert_eq!(recommendation.similar[0].image_path, "imgC.jpg");
    }

    #[test]
    fn unmatched_constraints_are_not_an_error() {
        let recommender = Recommender::build(catalogue(), RecommenderOptions::default());
        let constraints = HardConstraints::new("Electric", "0-449", "$0-$49,999", "0-499", "Sedan");

        let outcome = recommender
            .recommend(&constraints, &PreferenceWeights::default())
            .expect("valid query");
        assert_eq!(outcome, RecommendOutcome::NoMatch);
    }

    #[test]
    fn incomplete_constraints_are_rejected() {
        let recommender = Recommender::build(catalogue(), RecommenderOptions::default());
        let mut constraints = sports_v8();
        constraints.torque = None;

        assert_eq!(
            recommender.recommend(&constraints, &PreferenceWeights::default()),
            Err(RecommendError::MissingConstraint(ConstraintSlot::Torque))
        );
    }

    #[test]
    fn top_k_option_limits_neighbours() {
        let options = RecommenderOptions { top_k: 1, ..RecommenderOptions::default() };
        let recommender = Recommender::build(catalogue(), options);

        let outcome =
            recommender.recommend(&sports_v8(), &PreferenceWeights::default()).expect("valid");
        assert_eq!(outcome.recommendation().map(|r| r.similar.len()), Some(1));
    }

    #[test]
    fn repeated_queries_are_identical() {
        let recommender = Recommender::build(catalogue(), RecommenderOptions::default());
        let weights = PreferenceWeights::new(10, 90, 30, 70).expect("weights in range");

        let first = recommender.recommend(&sports_v8(), &weights);
        let second = recommender.recommend(&sports_v8(), &weights);
        assert_eq!(first, second);
    }

    #[test]
    fn scan_filter_gives_the_same_answers() {
        let options = RecommenderOptions {
            preference_formula: PreferenceFormula::V2,
            ..RecommenderOptions::default()
        };
        let tree = Recommender::build(catalogue(), options);
        let scan = Recommender::with_filter(catalogue(), options, ScanFilter::build);
        let weights = PreferenceWeights::new(20, 40, 60, 80).expect("weights in range");

        assert_eq!(tree.recommend(&sports_v8(), &weights), scan.recommend(&sports_v8(), &weights));
    }

    #[test]
    fn summary_counts_categories() {
        let recommender = Recommender::build(catalogue(), RecommenderOptions::default());
        let summary = recommender.summary();

        assert_eq!(summary.records, 4);
        assert_eq!(summary.unindexable, 0);
        assert_eq!(summary.engines.get("V8"), Some(&2));
        assert_eq!(summary.car_types.get("Luxury"), Some(&1));
        assert_eq!(summary.similarity_edges, 6);
        assert_eq!(summary.columns[0].column, "horsepower");
        assert_eq!(summary.columns[0].min, 300.0);
        assert_eq!(summary.columns[0].max, 700.0);

        let (engines, _) = recommender.present_categories();
        assert_eq!(engines.len(), 3);
    }

    #[test]
    fn similar_rejects_unknown_names() {
        let recommender = Recommender::build(catalogue(), RecommenderOptions::default());
        assert_eq!(
            recommender.similar("Z", 5),
            Err(RecommendError::UnknownCar("Z".to_owned()))
        );
    }
}
