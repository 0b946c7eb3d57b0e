//! Soft-preference ranking of a filtered candidate set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::car::{CarId, CarRecord};
use crate::errors::RecommendError;
use crate::features::{ColumnStats, FeatureTable, NumericColumn};

pub const MAX_WEIGHT: i64 = 100;

/// Raw performance below this gets the display bump.
pub const RESCALE_CEILING: f64 = 75.0;
pub const RESCALE_BUMP: f64 = 20.0;

/// User importance weights, each an integer percentage in `0..=100`.
///
/// Only built through [`PreferenceWeights::new`] and its parsing wrappers,
/// so a value in hand is always in range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct PreferenceWeights {
    rating: u8,
    reliability: u8,
    zero_to_sixty: u8,
    max_speed: u8,
}

#[derive(Deserialize)]
struct RawWeights {
    rating: i64,
    reliability: i64,
    zero_to_sixty: i64,
    max_speed: i64,
}

impl TryFrom<RawWeights> for PreferenceWeights {
    type Error = RecommendError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        Self::new(raw.rating, raw.reliability, raw.zero_to_sixty, raw.max_speed)
    }
}

impl PreferenceWeights {
    /// Order is rating, reliability, zero-to-sixty, max speed.
    pub fn new(
        rating: i64,
        reliability: i64,
        zero_to_sixty: i64,
        max_speed: i64,
    ) -> Result<Self, RecommendError> {
        Ok(Self {
            rating: percent("rating", rating)?,
            reliability: percent("reliability", reliability)?,
            zero_to_sixty: percent("zero_to_sixty", zero_to_sixty)?,
            max_speed: percent("max_speed", max_speed)?,
        })
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn reliability(&self) -> u8 {
        self.reliability
    }

    pub fn zero_to_sixty(&self) -> u8 {
        self.zero_to_sixty
    }

    pub fn max_speed(&self) -> u8 {
        self.max_speed
    }

    pub fn as_array(&self) -> [u8; 4] {
        [self.rating, self.reliability, self.zero_to_sixty, self.max_speed]
    }

    fn fraction(weight: u8) -> f64 {
        f64::from(weight) / 100.0
    }
}

fn percent(name: &str, value: i64) -> Result<u8, RecommendError> {
    if (0..=MAX_WEIGHT).contains(&value) {
        u8::try_from(value).map_err(|_| out_of_range(name, value))
    } else {
        Err(out_of_range(name, value))
    }
}

fn out_of_range(name: &str, value: i64) -> RecommendError {
    RecommendError::InvalidWeights(format!("{name} weight {value} is outside 0..={MAX_WEIGHT}"))
}

impl TryFrom<[i64; 4]> for PreferenceWeights {
    type Error = RecommendError;

    fn try_from(value: [i64; 4]) -> Result<Self, Self::Error> {
        let [rating, reliability, zero_to_sixty, max_speed] = value;
        Self::new(rating, reliability, zero_to_sixty, max_speed)
    }
}

impl FromStr for PreferenceWeights {
    type Err = RecommendError;

    /// Parses `rating,reliability,zero_to_sixty,max_speed`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(RecommendError::InvalidWeights(format!(
                "expected 4 comma separated weights, got {}",
                parts.len()
            )));
        }

        let mut weights = [0_i64; 4];
        for (slot, part) in weights.iter_mut().zip(parts) {
            *slot = part.parse::<i64>().map_err(|_| {
                RecommendError::InvalidWeights(format!("`{part}` is not an integer weight"))
            })?;
        }
        Self::try_from(weights)
    }
}

impl fmt::Display for PreferenceWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.rating, self.reliability, self.zero_to_sixty, self.max_speed)
    }
}

/// Which preference-score formula the ranker applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceFormula {
    /// Weighted raw attributes, zero-to-sixty subtracted in seconds.
    #[default]
    V1,
    /// Weighted min-max normalised attributes, zero-to-sixty inverted.
    V2,
}

impl PreferenceFormula {
    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceFormula::V1 => "v1",
            PreferenceFormula::V2 => "v2",
        }
    }
}

impl fmt::Display for PreferenceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceFormula {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(PreferenceFormula::V1),
            "v2" => Ok(PreferenceFormula::V2),
            other => Err(format!("unknown preference formula `{other}` (expected v1 or v2)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedCar {
    pub car: CarId,
    pub record: CarRecord,
    pub preference_score: f64,
    /// Performance on a 0-100 scale before the display bump.
    pub performance_raw: f64,
    pub performance_score: i64,
    pub image_path: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RankOutcome {
    Ranked(Vec<RankedCar>),
    NoMatch,
}

impl RankOutcome {
    pub fn best(&self) -> Option<&RankedCar> {
        match self {
            RankOutcome::Ranked(ranked) => ranked.first(),
            RankOutcome::NoMatch => None,
        }
    }
}

/// Applies the display bump: +20 below 75, unchanged otherwise. Not clamped;
/// raw 74 shows as 94 while raw 75 shows as 75.
pub fn rescale_performance(raw: f64) -> f64 {
    if raw < RESCALE_CEILING {
        raw + RESCALE_BUMP
    } else {
        raw
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ranker {
    formula: PreferenceFormula,
    horsepower: ColumnStats,
    torque: ColumnStats,
    zero_to_sixty: ColumnStats,
    max_speed: ColumnStats,
    rating: ColumnStats,
    reliability: ColumnStats,
}

impl Ranker {
    /// Uses the catalogue-wide column bounds held by `features`.
    pub fn new(features: &FeatureTable, formula: PreferenceFormula) -> Self {
        Self {
            formula,
            horsepower: features.stats(NumericColumn::Horsepower),
            torque: features.stats(NumericColumn::Torque),
            zero_to_sixty: features.stats(NumericColumn::ZeroToSixty),
            max_speed: features.stats(NumericColumn::MaxSpeed),
            rating: features.stats(NumericColumn::Rating),
            reliability: features.stats(NumericColumn::Reliability),
        }
    }

    pub fn formula(&self) -> PreferenceFormula {
        self.formula
    }

    /// Scores every candidate and stable-sorts by preference score,
    /// highest first. Equal scores keep their input order.
    pub fn rank<'a>(
        &self,
        candidates: impl IntoIterator<Item = (CarId, &'a CarRecord)>,
        weights: &PreferenceWeights,
    ) -> RankOutcome {
        let mut ranked: Vec<RankedCar> = candidates
            .into_iter()
            .map(|(car, record)| {
                let performance_raw = self.performance_raw(record);
                RankedCar {
                    car,
                    record: record.clone(),
                    preference_score: self.preference_score(record, weights),
                    performance_raw,
                    performance_score: rescale_performance(performance_raw).round() as i64,
                    image_path: record.image_path(),
                }
            })
            .collect();

        if ranked.is_empty() {
            return RankOutcome::NoMatch;
        }
        ranked.sort_by(|left, right| right.preference_score.total_cmp(&left.preference_score));

        debug!(
            event_name = "ranking.rank.completed",
            candidates = ranked.len(),
            formula = %self.formula,
            best = %ranked[0].record.name,
            "candidates ranked"
        );
        RankOutcome::Ranked(ranked)
    }

    pub fn preference_score(&self, record: &CarRecord, weights: &PreferenceWeights) -> f64 {
        let w_rating = PreferenceWeights::fraction(weights.rating());
        let w_reliability = PreferenceWeights::fraction(weights.reliability());
        let w_zero_to_sixty = PreferenceWeights::fraction(weights.zero_to_sixty());
        let w_max_speed = PreferenceWeights::fraction(weights.max_speed());

        match self.formula {
            PreferenceFormula::V1 => {
                (record.rating * w_rating + record.reliability * w_reliability
                    - record.zero_to_sixty * w_zero_to_sixty
                    + f64::from(record.max_speed) * w_max_speed)
                    / 4.0
            }
            PreferenceFormula::V2 => {
                (self.rating.normalise(record.rating) * w_rating
                    + self.reliability.normalise(record.reliability) * w_reliability
                    + self.zero_to_sixty.normalise_inverted(record.zero_to_sixty) * w_zero_to_sixty
                    + self.max_speed.normalise(f64::from(record.max_speed)) * w_max_speed)
                    / 4.0
            }
        }
    }

    /// Mean of the four normalised performance attributes, times 100.
    pub fn performance_raw(&self, record: &CarRecord) -> f64 {
        let sum = self.horsepower.normalise(f64::from(record.horsepower))
            + self.torque.normalise(f64::from(record.torque))
            + self.zero_to_sixty.normalise_inverted(record.zero_to_sixty)
            + self.max_speed.normalise(f64::from(record.max_speed));
        sum / 4.0 * 100.0
    }
}
