use carmatch_core::features::FEATURE_DIM;
use carmatch_core::{
    CandidateFilter, CarId, CarRecord, CarType, Catalogue, DecisionIndex, Engine,
    FeatureNormaliser, HardConstraints, PreferenceFormula, PreferenceWeights, RankOutcome, Ranker,
    Recommender, RecommenderOptions, SimilarityGraph,
};
use proptest::prelude::*;

fn record_strategy() -> impl Strategy<Value = CarRecord> {
    (
        0..Engine::KNOWN.len(),
        0..CarType::KNOWN.len(),
        100_u32..1_200,
        10_000_u64..400_000,
        100_u32..1_200,
        0_u32..=100,
        0_u32..=50,
        20_u32..=80,
        100_u32..350,
    )
        .prop_map(
            |(engine, car_type, horsepower, price, torque, rating, reliability, zts, max_speed)| {
                CarRecord {
                    name: String::new(),
                    engine: Engine::KNOWN[engine].clone(),
                    horsepower,
                    price,
                    torque,
                    car_type: CarType::KNOWN[car_type].clone(),
                    rating: f64::from(rating) / 10.0,
                    reliability: f64::from(reliability) / 10.0,
                    zero_to_sixty: f64::from(zts) / 10.0,
                    max_speed,
                    image_ref: String::new(),
                }
            },
        )
}

fn catalogue_strategy(max: usize) -> impl Strategy<Value = Catalogue> {
    proptest::collection::vec(record_strategy(), 1..max).prop_map(|records| {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| CarRecord {
                name: format!("car-{index}"),
                image_ref: format!("img-{index}"),
                ..record
            })
            .collect();
        Catalogue::from_records(records).expect("generated names are unique")
    })
}

fn weights_strategy() -> impl Strategy<Value = PreferenceWeights> {
    (0_i64..=100, 0_i64..=100, 0_i64..=100, 0_i64..=100).prop_map(|(a, b, c, d)| {
        PreferenceWeights::new(a, b, c, d).expect("generated weights are in range")
    })
}

proptest! {
    #[test]
    fn feature_vectors_are_fixed_length_and_unit_bounded(catalogue in catalogue_strategy(16)) {
        let table = FeatureNormaliser::new().fit(&catalogue);
        prop_assert_eq!(table.len(), catalogue.len());
        for vector in table.vectors() {
            prop_assert_eq!(vector.as_slice().len(), FEATURE_DIM);
            for component in vector.as_slice() {
                prop_assert!((0.0..=1.0).contains(component));
            }
        }
    }

    #[test]
    fn similarity_graph_is_complete_and_symmetric(catalogue in catalogue_strategy(12)) {
        let graph = SimilarityGraph::build(&FeatureNormaliser::new().fit(&catalogue));
        let n = catalogue.len();
        prop_assert_eq!(graph.edge_count(), n * (n - 1) / 2);

        for left in 0..n {
            for right in (0..n).filter(|right| *right != left) {
                let weight = graph.weight(CarId(left), CarId(right));
                prop_assert_eq!(weight, graph.weight(CarId(right), CarId(left)));
                let weight = weight.unwrap_or_default();
                prop_assert!(weight > 0.0 && weight <= 1.0);
            }
        }
    }

    #[test]
    fn top_k_never_contains_the_query(catalogue in catalogue_strategy(12), k in 0_usize..15) {
        let graph = SimilarityGraph::build(&FeatureNormaliser::new().fit(&catalogue));

        for record in catalogue.records() {
            let similar = graph.top_k(&catalogue, &record.name, k)
                .map_err(|error| TestCaseError::fail(error.to_string()))?;
            prop_assert_eq!(similar.len(), k.min(catalogue.len() - 1));
            prop_assert!(similar.iter().all(|car| car.name != record.name));
            prop_assert!(similar.windows(2).all(|pair| pair[0].weight >= pair[1].weight));
        }
    }

    #[test]
    fn index_finds_every_record_by_its_own_key(catalogue in catalogue_strategy(16)) {
        let index = DecisionIndex::build(&catalogue);

        for (id, record) in catalogue.iter() {
            let key = record.decision_key()
                .ok_or_else(|| TestCaseError::fail("known enums are indexable"))?;
            let candidates = index.candidates(&key);
            prop_assert!(candidates.contains(&id));
            prop_assert!(candidates.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn ranking_is_a_stable_sort_independent_of_input_permutation(
        catalogue in catalogue_strategy(10),
        weights in weights_strategy(),
        rotation in 0_usize..10,
    ) {
        let ranker = Ranker::new(&FeatureNormaliser::new().fit(&catalogue), PreferenceFormula::V1);
        let mut permuted: Vec<_> = catalogue.iter().collect();
        let shift = rotation % permuted.len();
        permuted.rotate_left(shift);
        permuted.reverse();

        let scored = |outcome: RankOutcome| -> Vec<(String, f64)> {
            match outcome {
                RankOutcome::Ranked(ranked) => ranked
                    .into_iter()
                    .map(|car| (car.record.name, car.preference_score))
                    .collect(),
                RankOutcome::NoMatch => Vec::new(),
            }
        };
        let in_order = scored(ranker.rank(catalogue.iter(), &weights));
        let shuffled = scored(ranker.rank(permuted.iter().copied(), &weights));

        let mut left = in_order.clone();
        let mut right = shuffled.clone();
        left.sort_by(|a, b| a.0.cmp(&b.0));
        right.sort_by(|a, b| a.0.cmp(&b.0));
        prop_assert_eq!(left, right);

        let mut expected: Vec<(String, f64)> = permuted
            .iter()
            .map(|(_, record)| (record.name.clone(), ranker.preference_score(record, &weights)))
            .collect();
        expected.sort_by(|a, b| b.1.total_cmp(&a.1));
        prop_assert_eq!(shuffled, expected);
    }

    #[test]
    fn recommend_is_idempotent(catalogue in catalogue_strategy(10), weights in weights_strategy()) {
        let key = catalogue.records()[0].decision_key()
            .ok_or_else(|| TestCaseError::fail("known enums are indexable"))?;
        let constraints = HardConstraints::from(&key);
        let recommender = Recommender::build(catalogue, RecommenderOptions::default());

        let first = recommender.recommend(&constraints, &weights);
        let second = recommender.recommend(&constraints, &weights);
        prop_assert!(first.is_ok());
        prop_assert_eq!(first, second);
    }
}
