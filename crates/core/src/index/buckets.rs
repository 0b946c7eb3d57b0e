//! Discretisation tables shared by the decision index and the UI contract.
//!
//! Every bucket has three faces: a numeric code (the tree discriminator),
//! a display label (what the UI offers), and a range over raw attribute
//! values.

use std::fmt;

use serde::Serialize;

use crate::domain::car::{CarRecord, CarType, Engine};
use crate::errors::RecommendError;

/// Number of discriminating levels below the root.
pub const DEPTH: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSlot {
    Engine,
    Horsepower,
    Price,
    Torque,
    CarType,
}

impl ConstraintSlot {
    pub const ALL: [ConstraintSlot; DEPTH] = [
        ConstraintSlot::Engine,
        ConstraintSlot::Horsepower,
        ConstraintSlot::Price,
        ConstraintSlot::Torque,
        ConstraintSlot::CarType,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintSlot::Engine => "engine",
            ConstraintSlot::Horsepower => "hp range",
            ConstraintSlot::Price => "price range",
            ConstraintSlot::Torque => "torque range",
            ConstraintSlot::CarType => "car type",
        }
    }
}

impl fmt::Display for ConstraintSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HpBucket {
    UpTo449,
    From450To620,
    Above620,
}

impl HpBucket {
    pub const ALL: [HpBucket; 3] = [HpBucket::UpTo449, HpBucket::From450To620, HpBucket::Above620];

    pub fn from_value(horsepower: u32) -> Self {
        match horsepower {
            0..=449 => HpBucket::UpTo449,
            450..=620 => HpBucket::From450To620,
            _ => HpBucket::Above620,
        }
    }

    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            HpBucket::UpTo449 => "0-449",
            HpBucket::From450To620 => "450-620",
            HpBucket::Above620 => "620+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|bucket| bucket.label() == label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PriceBucket {
    Under50k,
    From50kTo100k,
    From100kTo200k,
    From200k,
}

impl PriceBucket {
    pub const ALL: [PriceBucket; 4] = [
        PriceBucket::Under50k,
        PriceBucket::From50kTo100k,
        PriceBucket::From100kTo200k,
        PriceBucket::From200k,
    ];

    pub fn from_value(price: u64) -> Self {
        match price {
            0..=49_999 => PriceBucket::Under50k,
            50_000..=99_999 => PriceBucket::From50kTo100k,
            100_000..=199_999 => PriceBucket::From100kTo200k,
            _ => PriceBucket::From200k,
        }
    }

    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            PriceBucket::Under50k => "$0-$49,999",
            PriceBucket::From50kTo100k => "$50,000-$99,999",
            PriceBucket::From100kTo200k => "$100,000-$199,999",
            PriceBucket::From200k => "$200,000+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|bucket| bucket.label() == label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TorqueBucket {
    UpTo499,
    From500To750,
    Above750,
}

impl TorqueBucket {
    pub const ALL: [TorqueBucket; 3] =
        [TorqueBucket::UpTo499, TorqueBucket::From500To750, TorqueBucket::Above750];

    pub fn from_value(torque: u32) -> Self {
        match torque {
            0..=499 => TorqueBucket::UpTo499,
            500..=750 => TorqueBucket::From500To750,
            _ => TorqueBucket::Above750,
        }
    }

    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            TorqueBucket::UpTo499 => "0-499",
            TorqueBucket::From500To750 => "500-750",
            TorqueBucket::Above750 => "750+",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|bucket| bucket.label() == label)
    }
}

/// The discretised 5-tuple the decision index is keyed on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    pub engine: Engine,
    pub horsepower: HpBucket,
    pub price: PriceBucket,
    pub torque: TorqueBucket,
    pub car_type: CarType,
}

impl DecisionKey {
    /// `None` when the record has an `Other` engine or car type.
    pub fn from_record(record: &CarRecord) -> Option<Self> {
        let key = Self {
            engine: record.engine.clone(),
            horsepower: HpBucket::from_value(record.horsepower),
            price: PriceBucket::from_value(record.price),
            torque: TorqueBucket::from_value(record.torque),
            car_type: record.car_type.clone(),
        };
        key.codes().map(|_| key)
    }

    /// Discriminators from the first level to the last.
    pub fn codes(&self) -> Option<[u8; DEPTH]> {
        Some([
            self.engine.code()?,
            self.horsepower.code(),
            self.price.code(),
            self.torque.code(),
            self.car_type.code()?,
        ])
    }
}

/// Hard constraints as handed over by the presentation layer: one label per
/// slot, any of which may still be unselected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HardConstraints {
    pub engine: Option<String>,
    pub horsepower: Option<String>,
    pub price: Option<String>,
    pub torque: Option<String>,
    pub car_type: Option<String>,
}

impl HardConstraints {
    pub fn new(
        engine: impl Into<String>,
        horsepower: impl Into<String>,
        price: impl Into<String>,
        torque: impl Into<String>,
        car_type: impl Into<String>,
    ) -> Self {
        Self {
            engine: Some(engine.into()),
            horsepower: Some(horsepower.into()),
            price: Some(price.into()),
            torque: Some(torque.into()),
            car_type: Some(car_type.into()),
        }
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn with_horsepower(mut self, label: impl Into<String>) -> Self {
        self.horsepower = Some(label.into());
        self
    }

    pub fn with_price(mut self, label: impl Into<String>) -> Self {
        self.price = Some(label.into());
        self
    }

    pub fn with_torque(mut self, label: impl Into<String>) -> Self {
        self.torque = Some(label.into());
        self
    }

    pub fn with_car_type(mut self, car_type: impl Into<String>) -> Self {
        self.car_type = Some(car_type.into());
        self
    }

    fn slot(&self, slot: ConstraintSlot) -> Option<&str> {
        let value = match slot {
            ConstraintSlot::Engine => &self.engine,
            ConstraintSlot::Horsepower => &self.horsepower,
            ConstraintSlot::Price => &self.price,
            ConstraintSlot::Torque => &self.torque,
            ConstraintSlot::CarType => &self.car_type,
        };
        value.as_deref().map(str::trim).filter(|value| !value.is_empty())
    }

    /// Checks that every slot is filled, then discretises each label.
    pub fn resolve(&self) -> Result<DecisionKey, RecommendError> {
        if let Some(missing) = ConstraintSlot::ALL.into_iter().find(|slot| self.slot(*slot).is_none())
        {
            return Err(RecommendError::MissingConstraint(missing));
        }

        let required = |slot: ConstraintSlot| self.slot(slot).unwrap_or_default();
        let unknown = |slot: ConstraintSlot| RecommendError::UnknownEnumValue {
            slot,
            value: required(slot).to_owned(),
        };

        Ok(DecisionKey {
            engine: Engine::parse_known(required(ConstraintSlot::Engine))
                .ok_or_else(|| unknown(ConstraintSlot::Engine))?,
            horsepower: HpBucket::from_label(required(ConstraintSlot::Horsepower))
                .ok_or_else(|| unknown(ConstraintSlot::Horsepower))?,
            price: PriceBucket::from_label(required(ConstraintSlot::Price))
                .ok_or_else(|| unknown(ConstraintSlot::Price))?,
            torque: TorqueBucket::from_label(required(ConstraintSlot::Torque))
                .ok_or_else(|| unknown(ConstraintSlot::Torque))?,
            car_type: CarType::parse_known(required(ConstraintSlot::CarType))
                .ok_or_else(|| unknown(ConstraintSlot::CarType))?,
        })
    }
}

impl From<&DecisionKey> for HardConstraints {
    fn from(key: &DecisionKey) -> Self {
        Self::new(
            key.engine.as_str(),
            key.horsepower.label(),
            key.price.label(),
            key.torque.label(),
            key.car_type.as_str(),
        )
    }
}

/// Allowed values of every slot, in the order the UI lists them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConstraintOptions {
    pub engines: Vec<&'static str>,
    pub horsepower: Vec<&'static str>,
    pub price: Vec<&'static str>,
    pub torque: Vec<&'static str>,
    pub car_types: Vec<&'static str>,
}

impl ConstraintOptions {
    pub fn all() -> Self {
        Self {
            engines: vec!["V4", "V6", "V8", "V10", "V12", "Electric"],
            horsepower: HpBucket::ALL.into_iter().map(HpBucket::label).collect(),
            price: PriceBucket::ALL.into_iter().map(PriceBucket::label).collect(),
            torque: TorqueBucket::ALL.into_iter().map(TorqueBucket::label).collect(),
            car_types: vec!["Sedan", "SUV", "Sports", "Luxury"],
        }
    }
}
