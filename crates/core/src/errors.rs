use std::path::PathBuf;

use thiserror::Error;

use crate::index::buckets::ConstraintSlot;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("could not read catalogue `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalogue at line {line}: {source}")]
    Csv { line: u64, source: csv::Error },
    #[error("malformed catalogue at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
    #[error("duplicate car `{name}` at line {line} (first defined at line {first_line})")]
    DuplicateCar { name: String, first_line: u64, line: u64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecommendError {
    #[error("missing constraint: {0}")]
    MissingConstraint(ConstraintSlot),
    #[error("unknown {slot} value `{value}`")]
    UnknownEnumValue { slot: ConstraintSlot, value: String },
    #[error("invalid weights: {0}")]
    InvalidWeights(String),
    #[error("unknown car `{0}`")]
    UnknownCar(String),
}

/// Which part of a request was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    MissingConstraint,
    UnknownValue,
    Weights,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("invalid input: {message}")]
    InvalidInput { kind: InputKind, message: String, correlation_id: String },
    #[error("catalogue unavailable: {message}")]
    CatalogueUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidInput { kind: InputKind::MissingConstraint, .. } => {
                "The selection is incomplete. Pick a value for every option and try again."
            }
            Self::InvalidInput { kind: InputKind::UnknownValue, .. } => {
                "The selection contains a value that is not offered. Run `carmatch options` to see the valid choices."
            }
            Self::InvalidInput { kind: InputKind::Weights, .. } => {
                "Preference weights must be four whole numbers from 0 to 100, separated by commas."
            }
            Self::CatalogueUnavailable { .. } => "The car catalogue could not be loaded.",
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::CatalogueUnavailable { .. } => "catalogue",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::InvalidInput { correlation_id, .. }
            | Self::CatalogueUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    fn invalid_input(kind: InputKind, error: &RecommendError) -> Self {
        Self::InvalidInput {
            kind,
            message: error.to_string(),
            correlation_id: "unassigned".to_owned(),
        }
    }

    fn with_correlation_id(mut self, correlation_id: String) -> Self {
        match &mut self {
            Self::InvalidInput { correlation_id: id, .. }
            | Self::CatalogueUnavailable { correlation_id: id, .. }
            | Self::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        self
    }
}

impl RecommendError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        InterfaceError::from(self).with_correlation_id(correlation_id.into())
    }
}

impl CatalogueError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        InterfaceError::from(self).with_correlation_id(correlation_id.into())
    }
}

impl From<RecommendError> for InterfaceError {
    fn from(value: RecommendError) -> Self {
        match value {
            RecommendError::MissingConstraint(_) => {
                Self::invalid_input(InputKind::MissingConstraint, &value)
            }
            RecommendError::UnknownEnumValue { .. } => {
                Self::invalid_input(InputKind::UnknownValue, &value)
            }
            RecommendError::InvalidWeights(_) => Self::invalid_input(InputKind::Weights, &value),
            // The facade only asks the graph about cars it just ranked.
            RecommendError::UnknownCar(_) => {
                Self::Internal { message: value.to_string(), correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

impl From<CatalogueError> for InterfaceError {
    fn from(value: CatalogueError) -> Self {
        Self::CatalogueUnavailable {
            message: value.to_string(),
            correlation_id: "unassigned".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{CatalogueError, InputKind, InterfaceError, RecommendError};
    use crate::index::buckets::ConstraintSlot;

    #[test]
    fn missing_constraint_maps_to_invalid_input() {
        let interface =
            RecommendError::MissingConstraint(ConstraintSlot::Torque).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::InvalidInput { kind: InputKind::MissingConstraint, ref correlation_id, ref message }
                if correlation_id == "req-1" && message.contains("torque")
        ));
        assert_eq!(interface.error_class(), "invalid_input");
        assert!(interface.user_message().contains("every option"));
    }

    #[test]
    fn each_input_problem_gets_its_own_user_message() {
        let unknown = RecommendError::UnknownEnumValue {
            slot: ConstraintSlot::Engine,
            value: "W16".to_owned(),
        }
        .into_interface("req-4");
        let weights = RecommendError::InvalidWeights("rating weight 101 is outside 0..=100".to_owned())
            .into_interface("req-5");

        assert!(matches!(unknown, InterfaceError::InvalidInput { kind: InputKind::UnknownValue, .. }));
        assert!(unknown.user_message().contains("carmatch options"));
        assert!(matches!(weights, InterfaceError::InvalidInput { kind: InputKind::Weights, .. }));
        assert!(weights.user_message().contains("0 to 100"));
        assert_eq!(weights.error_class(), "invalid_input");
    }

    #[test]
    fn unknown_car_maps_to_internal() {
        let interface = RecommendError::UnknownCar("Ghost".to_owned()).into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn catalogue_errors_keep_line_context() {
        let interface = CatalogueError::DuplicateCar {
            name: "A".to_owned(),
            first_line: 2,
            line: 5,
        }
        .into_interface("req-3");

        assert_eq!(interface.error_class(), "catalogue");
        assert_eq!(interface.correlation_id(), "req-3");
        assert!(interface.to_string().contains("line 5"));
    }
}
