use std::fmt;
use thiserror::Error;

use crate::store::QueryError;

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Stage 1: recipe ingredients
    Ingredients,
    /// Stage 2: recipe steps
    Steps,
    /// Stage 3: aggregate nutrition
    Nutrition,
    /// Stage 4: per-ingredient sourcing
    Sourcing,
    /// Connectivity check run by `foodreport verify`
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingredients => "ingredients",
            Stage::Steps => "steps",
            Stage::Nutrition => "nutrition",
            Stage::Sourcing => "sourcing",
            Stage::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Main error type for FoodReport
#[derive(Error, Debug)]
pub enum FoodReportError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system / output I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The knowledge store could not be reached, timed out or answered with an error status
    #[error("Knowledge store unavailable during {stage} stage: {message}")]
    StoreUnavailable { stage: Stage, message: String },

    /// The store rejected a query we built
    #[error("Malformed query in {stage} stage: {message}")]
    MalformedQuery { stage: Stage, message: String },

    /// The store answered, but the knowledge base content is inconsistent
    #[error("Data integrity error in {stage} stage: {message}")]
    DataIntegrity { stage: Stage, message: String },

    /// The caller-supplied run deadline elapsed
    #[error("Deadline exceeded during {stage} stage")]
    Timeout { stage: Stage },
}

impl FoodReportError {
    /// Attribute a store failure to the stage that issued the query.
    pub fn from_query(stage: Stage, err: QueryError) -> Self {
        match err {
            QueryError::Syntax(message) => {
                log::error!("Store rejected {} query: {}", stage, message);
                FoodReportError::MalformedQuery { stage, message }
            }
            other => FoodReportError::StoreUnavailable {
                stage,
                message: other.to_string(),
            },
        }
    }

    pub fn integrity(stage: Stage, message: impl Into<String>) -> Self {
        FoodReportError::DataIntegrity {
            stage,
            message: message.into(),
        }
    }

    /// Stage the failure happened in, if it came from the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            FoodReportError::StoreUnavailable { stage, .. }
            | FoodReportError::MalformedQuery { stage, .. }
            | FoodReportError::DataIntegrity { stage, .. }
            | FoodReportError::Timeout { stage } => Some(*stage),
            _ => None,
        }
    }
}

/// Convenient Result type using FoodReportError
pub type Result<T> = std::result::Result<T, FoodReportError>;
