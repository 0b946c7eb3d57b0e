//! Min–max normalisation and one-hot encoding of catalogue records.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalogue::Catalogue;
use crate::domain::car::{CarId, CarRecord};

pub const NUMERIC_COLUMNS: usize = 7;
pub const CAR_TYPE_OFFSET: usize = NUMERIC_COLUMNS;
pub const CAR_TYPE_BITS: usize = 4;
pub const ENGINE_OFFSET: usize = CAR_TYPE_OFFSET + CAR_TYPE_BITS;
pub const ENGINE_BITS: usize = 6;
pub const FEATURE_DIM: usize = ENGINE_OFFSET + ENGINE_BITS;

pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "horsepower",
    "price",
    "torque",
    "rating",
    "reliability",
    "zero_to_sixty",
    "max_speed",
    "is_sedan",
    "is_suv",
    "is_sports",
    "is_luxury",
    "is_v4",
    "is_v6",
    "is_v8",
    "is_v10",
    "is_v12",
    "is_electric",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumn {
    Horsepower,
    Price,
    Torque,
    Rating,
    Reliability,
    ZeroToSixty,
    MaxSpeed,
}

impl NumericColumn {
    /// Feature-vector order.
    pub const ALL: [NumericColumn; NUMERIC_COLUMNS] = [
        NumericColumn::Horsepower,
        NumericColumn::Price,
        NumericColumn::Torque,
        NumericColumn::Rating,
        NumericColumn::Reliability,
        NumericColumn::ZeroToSixty,
        NumericColumn::MaxSpeed,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    pub fn value(self, record: &CarRecord) -> f64 {
        match self {
            NumericColumn::Horsepower => f64::from(record.horsepower),
            NumericColumn::Price => record.price as f64,
            NumericColumn::Torque => f64::from(record.torque),
            NumericColumn::Rating => record.rating,
            NumericColumn::Reliability => record.reliability,
            NumericColumn::ZeroToSixty => record.zero_to_sixty,
            NumericColumn::MaxSpeed => f64::from(record.max_speed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut values = values.into_iter();
        let Some(first) = values.next() else {
            return Self::default();
        };
        values.fold(Self { min: first, max: first }, |stats, value| Self {
            min: stats.min.min(value),
            max: stats.max.max(value),
        })
    }

    /// `(x - min) / (max - min)`, or 0 when the column is constant.
    pub fn normalise(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / range).clamp(0.0, 1.0)
    }

    /// `1 - normalise(x)`, for columns where lower is better.
    pub fn normalise_inverted(&self, value: f64) -> f64 {
        1.0 - self.normalise(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_DIM]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn euclidean_distance(&self, other: &FeatureVector) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| (a - b).powi(2)).sum::<f64>().sqrt()
    }
}

/// Per-column statistics plus one feature vector per catalogue record,
/// indexed by [`CarId`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    stats: [ColumnStats; NUMERIC_COLUMNS],
    vectors: Vec<FeatureVector>,
}

impl FeatureTable {
    pub fn stats(&self, column: NumericColumn) -> ColumnStats {
        self.stats[column.index()]
    }

    pub fn all_stats(&self) -> impl Iterator<Item = (NumericColumn, ColumnStats)> + '_ {
        NumericColumn::ALL.into_iter().map(|column| (column, self.stats(column)))
    }

    pub fn vector(&self, id: CarId) -> Option<&FeatureVector> {
        self.vectors.get(id.0)
    }

    pub fn vectors(&self) -> &[FeatureVector] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct FeatureNormaliser;

impl FeatureNormaliser {
    pub fn new() -> Self {
        Self
    }

    pub fn fit(&self, catalogue: &Catalogue) -> FeatureTable {
        let stats = NumericColumn::ALL.map(|column| {
            ColumnStats::from_values(catalogue.records().iter().map(|record| column.value(record)))
        });

        let vectors = catalogue
            .records()
            .iter()
            .map(|record| encode(record, &stats))
            .collect::<Vec<_>>();

        debug!(
            event_name = "features.fit.completed",
            records = vectors.len(),
            dimensions = FEATURE_DIM,
            "feature table built"
        );
        FeatureTable { stats, vectors }
    }
}

fn encode(record: &CarRecord, stats: &[ColumnStats; NUMERIC_COLUMNS]) -> FeatureVector {
    let mut features = [0.0; FEATURE_DIM];

    for column in NumericColumn::ALL {
        features[column.index()] = stats[column.index()].normalise(column.value(record));
    }
    // Other encodes as all-zero bits.
    if let Some(bit) = record.car_type.one_hot_index() {
        features[CAR_TYPE_OFFSET + bit] = 1.0;
    }
    if let Some(bit) = record.engine.one_hot_index() {
        features[ENGINE_OFFSET + bit] = 1.0;
    }

    FeatureVector(features)
}

#[cfg(test)]
mod tests {
    use super::{
        ColumnStats, FeatureNormaliser, NumericColumn, CAR_TYPE_BITS, CAR_TYPE_OFFSET, ENGINE_BITS,
        ENGINE_OFFSET, FEATURE_DIM,
    };
    use crate::catalogue::{Catalogue, CatalogueOptions};
    use crate::domain::car::{CarId, CarType, Engine};

    fn catalogue(body: &str) -> Catalogue {
        let csv = format!(
            "name,engine,horsepower,price,torque,car_type,rating,reliability,zero_to_sixty,max_speed,image_ref\n{body}"
        );
        Catalogue::from_reader(csv.as_bytes(), CatalogueOptions::default()).expect("catalogue")
    }

    #[test]
    fn layout_has_seventeen_components() {
        assert_eq!(CAR_TYPE_OFFSET, 7);
        assert_eq!(ENGINE_OFFSET, 11);
        assert_eq!(FEATURE_DIM, 17);
        assert_eq!(CarType::KNOWN.len(), CAR_TYPE_BITS);
        assert_eq!(Engine::KNOWN.len(), ENGINE_BITS);
        assert_eq!(NumericColumn::ZeroToSixty.name(), "zero_to_sixty");
    }

    #[test]
    fn normalises_against_catalogue_min_and_max() {
        let catalogue = catalogue(
            "A,V8,500,120000,600,Sports,9.0,4.5,3.2,300,imgA\n\
             B,V6,300,60000,400,Sedan,8.0,4.0,5.0,250,imgB\n\
             C,V10,400,90000,500,Luxury,8.5,4.25,4.1,275,imgC\n",
        );
        let table = FeatureNormaliser::new().fit(&catalogue);

        assert_eq!(table.stats(NumericColumn::Horsepower), ColumnStats { min: 300.0, max: 500.0 });
        let c = table.vector(CarId(2)).expect("C has a vector");
        assert!((c.0[NumericColumn::Horsepower.index()] - 0.5).abs() < 1e-9);
        assert!((c.0[NumericColumn::Price.index()] - 0.5).abs() < 1e-9);
        assert_eq!(c.0[CAR_TYPE_OFFSET + 3], 1.0);
        assert_eq!(c.0[ENGINE_OFFSET + 3], 1.0, "V10 has its own bit");
        assert_eq!(c.0.iter().filter(|value| **value == 1.0).count(), 2);
    }

    #[test]
    fn constant_columns_normalise_to_zero() {
        let catalogue = catalogue(
            "A,V8,500,120000,600,Sports,9.0,4.5,3.2,300,imgA\n\
             B,V8,500,120000,600,Sports,9.0,4.5,3.2,300,imgB\n",
        );
        let table = FeatureNormaliser::new().fit(&catalogue);

        for vector in table.vectors() {
            assert!(vector.0[..7].iter().all(|value| *value == 0.0));
        }
        assert_eq!(
            table.vector(CarId(0)).expect("A").euclidean_distance(table.vector(CarId(1)).expect("B")),
            0.0
        );
    }

    #[test]
    fn other_enums_encode_as_zero_bits() {
        let catalogue = catalogue("W,W16,1500,3000000,1180,Hyper,9.5,4.0,2.4,261,imgW\n");
        let table = FeatureNormaliser::new().fit(&catalogue);
        let w = table.vector(CarId(0)).expect("W");
        assert!(w.0[CAR_TYPE_OFFSET..].iter().all(|value| *value == 0.0));
    }

    #[test]
    fn empty_catalogue_produces_empty_table() {
        let table = FeatureNormaliser::new().fit(&catalogue(""));
        assert!(table.is_empty());
        assert_eq!(table.stats(NumericColumn::Price), ColumnStats::default());
    }
}
