pub mod config;
pub mod error;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod store;

pub use config::{Config, ConfigSource};
pub use error::{FoodReportError, Result, Stage};
pub use pipeline::{PipelineOptions, RecipeSummary, ReportPipeline};
pub use report::{OutputFormat, Report};
pub use store::{KnowledgeStore, SparqlClient};
