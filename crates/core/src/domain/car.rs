use std::fmt;

use serde::{Deserialize, Serialize};

use crate::index::buckets::DecisionKey;

/// Suffix appended to a record's `image_ref` to obtain the path handed to the UI.
pub const IMAGE_SUFFIX: &str = ".jpg";

/// Position of a record in the loaded catalogue. Insertion order is the
/// tie-breaker everywhere, so ids compare in load order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CarId(pub usize);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Engine {
    V4,
    V6,
    V8,
    V10,
    V12,
    Electric,
    /// Value outside the known set, kept verbatim. Only the lenient loader
    /// produces it; the decision index and one-hot encoder reject it.
    Other(String),
}

impl Engine {
    pub const KNOWN: [Engine; 6] =
        [Engine::V4, Engine::V6, Engine::V8, Engine::V10, Engine::V12, Engine::Electric];

    /// Lenient parse: unknown names become `Other`.
    pub fn parse_lenient(value: &str) -> Self {
        Self::parse_known(value).unwrap_or_else(|| Engine::Other(value.trim().to_owned()))
    }

    pub fn parse_known(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::KNOWN.into_iter().find(|engine| engine.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Engine::V4 => "V4",
            Engine::V6 => "V6",
            Engine::V8 => "V8",
            Engine::V10 => "V10",
            Engine::V12 => "V12",
            Engine::Electric => "Electric",
            Engine::Other(raw) => raw,
        }
    }

    /// Discriminator used by the decision index.
    pub fn code(&self) -> Option<u8> {
        match self {
            Engine::V4 => Some(1),
            Engine::V6 => Some(2),
            Engine::V8 => Some(3),
            Engine::V10 => Some(4),
            Engine::V12 => Some(5),
            Engine::Electric => Some(6),
            Engine::Other(_) => None,
        }
    }

    /// Bit position inside the engine block of a feature vector.
    pub fn one_hot_index(&self) -> Option<usize> {
        self.code().map(|code| usize::from(code) - 1)
    }

    pub fn is_other(&self) -> bool {
        matches!(self, Engine::Other(_))
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Engine {
    fn from(value: String) -> Self {
        Engine::parse_lenient(&value)
    }
}

impl From<Engine> for String {
    fn from(value: Engine) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CarType {
    Sedan,
    Suv,
    Sports,
    Luxury,
    Other(String),
}

impl CarType {
    pub const KNOWN: [CarType; 4] = [CarType::Sedan, CarType::Suv, CarType::Sports, CarType::Luxury];

    pub fn parse_lenient(value: &str) -> Self {
        Self::parse_known(value).unwrap_or_else(|| CarType::Other(value.trim().to_owned()))
    }

    pub fn parse_known(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::KNOWN.into_iter().find(|car_type| car_type.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(&self) -> &str {
        match self {
            CarType::Sedan => "Sedan",
            CarType::Suv => "SUV",
            CarType::Sports => "Sports",
            CarType::Luxury => "Luxury",
            CarType::Other(raw) => raw,
        }
    }

    pub fn code(&self) -> Option<u8> {
        match self {
            CarType::Sedan => Some(1),
            CarType::Suv => Some(2),
            CarType::Sports => Some(3),
            CarType::Luxury => Some(4),
            CarType::Other(_) => None,
        }
    }

    pub fn one_hot_index(&self) -> Option<usize> {
        self.code().map(|code| usize::from(code) - 1)
    }

    pub fn is_other(&self) -> bool {
        matches!(self, CarType::Other(_))
    }
}

impl fmt::Display for CarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CarType {
    fn from(value: String) -> Self {
        CarType::parse_lenient(&value)
    }
}

impl From<CarType> for String {
    fn from(value: CarType) -> Self {
        value.as_str().to_owned()
    }
}

/// One catalogue entry. `name` is the identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarRecord {
    pub name: String,
    pub engine: Engine,
    pub horsepower: u32,
    pub price: u64,
    pub torque: u32,
    pub car_type: CarType,
    pub rating: f64,
    pub reliability: f64,
    pub zero_to_sixty: f64,
    pub max_speed: u32,
    pub image_ref: String,
}

impl CarRecord {
    pub fn image_path(&self) -> String {
        format!("{}{IMAGE_SUFFIX}", self.image_ref)
    }

    /// True when both categorical attributes are inside their known sets.
    pub fn is_indexable(&self) -> bool {
        !self.engine.is_other() && !self.car_type.is_other()
    }

    /// Discretised 5-tuple the decision index files this record under.
    pub fn decision_key(&self) -> Option<DecisionKey> {
        DecisionKey::from_record(self)
    }
}
