//! Report-generation pipeline.
//!
//! Runs the four query stages against a [`KnowledgeStore`]:
//! ingredients, then steps and nutrition side by side, then one sourcing
//! query per ingredient through a bounded worker pool. Any stage failure
//! aborts the run; no partial report is produced.

pub mod aggregate;
pub mod queries;

pub use queries::Vocabulary;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::{FoodReportError, Result, Stage};
use crate::query::{EntityRef, SelectQuery};
use crate::report::{self, Ingredient, OutputFormat, Report, SourcingOption};
use crate::store::{KnowledgeStore, RowSet};

/// Order of sourcing countries within an ingredient
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CountryOrder {
    /// Sorted by country name
    #[default]
    Name,
    /// Whatever grouping order the store returns
    Store,
}

/// Inputs of a report run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Recipe local name in the data namespace
    pub recipe: String,
    /// Consuming country trade routes must ship to
    pub destination: String,
    pub vocabulary: Vocabulary,
    /// Bound on in-flight sourcing queries
    pub concurrency: usize,
    pub deadline: Option<Duration>,
    pub country_order: CountryOrder,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            recipe: config.report.recipe.clone(),
            destination: config.report.destination.clone(),
            vocabulary: Vocabulary::from(&config.vocabulary),
            concurrency: config.report.concurrency,
            deadline: config.deadline(),
            country_order: config.report.country_order,
        }
    }
}

/// Ingredient and step counts reported by `verify`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeSummary {
    pub ingredient_count: usize,
    pub step_count: usize,
}

pub struct ReportPipeline {
    store: Arc<dyn KnowledgeStore>,
    options: PipelineOptions,
    recipe: EntityRef,
    destination: EntityRef,
}

impl ReportPipeline {
    pub fn new(store: Arc<dyn KnowledgeStore>, options: PipelineOptions) -> Self {
        let recipe = options.vocabulary.individual(&options.recipe);
        let destination = options.vocabulary.individual(&options.destination);
        Self {
            store,
            options,
            recipe,
            destination,
        }
    }

    /// Run every stage and assemble the report.
    pub async fn run(&self) -> Result<Report> {
        let deadline = self.options.deadline.map(|d| Instant::now() + d);
        let vocab = &self.options.vocabulary;
        log::info!("Generating food report for {} ({})", self.options.recipe, self.recipe);

        let rows = self
            .stage(Stage::Ingredients, deadline, queries::ingredients(vocab, &self.recipe))
            .await?;
        let ingredients = aggregate::ingredients_from_rows(&rows);

        // Steps and nutrition only depend on the recipe.
        let (step_rows, nutrition_rows) = tokio::try_join!(
            self.stage(Stage::Steps, deadline, queries::steps(vocab, &self.recipe)),
            self.stage(Stage::Nutrition, deadline, queries::nutrition(vocab, &self.recipe)),
        )?;
        let steps = aggregate::steps_from_rows(&step_rows);
        let nutrition = aggregate::nutrition_from_rows(&nutrition_rows, ingredients.len())?;

        let sourcing = self.sourcing(&ingredients, deadline).await?;

        Ok(aggregate::assemble(
            &self.options.recipe,
            &self.options.destination,
            ingredients,
            steps,
            nutrition,
            sourcing,
        ))
    }

    /// Run the pipeline and render the report to `out`. Nothing is written
    /// unless the whole run succeeds.
    pub async fn run_and_render(&self, format: OutputFormat, out: &mut impl Write) -> Result<Report> {
        let report = self.run().await?;
        report::render(&report, format, out)?;
        Ok(report)
    }

    /// Count the recipe's ingredients and steps without building a report.
    pub async fn verify(&self) -> Result<RecipeSummary> {
        let deadline = self.options.deadline.map(|d| Instant::now() + d);
        let vocab = &self.options.vocabulary;
        let (ingredient_rows, step_rows) = tokio::try_join!(
            self.stage(Stage::Verify, deadline, queries::ingredient_count(vocab, &self.recipe)),
            self.stage(Stage::Verify, deadline, queries::step_count(vocab, &self.recipe)),
        )?;
        Ok(RecipeSummary {
            ingredient_count: count(&ingredient_rows, queries::vars::INGREDIENT_COUNT)?,
            step_count: count(&step_rows, queries::vars::STEP_COUNT)?,
        })
    }

    async fn stage(&self, stage: Stage, deadline: Option<Instant>, query: SelectQuery) -> Result<RowSet> {
        log::debug!("Running {} query:\n{}", stage, query);
        let result = match deadline {
            Some(at) => tokio::time::timeout_at(at, self.store.select(&query))
                .await
                .map_err(|_| FoodReportError::Timeout { stage })?,
            None => self.store.select(&query).await,
        };
        let rows = result.map_err(|e| FoodReportError::from_query(stage, e))?;
        log::info!("{} query returned {} rows", stage, rows.len());
        Ok(rows)
    }

    /// Stage 4: one query per ingredient, at most `concurrency` in flight.
    /// Results come back in ingredient order; the first failure cancels the rest.
    async fn sourcing(
        &self,
        ingredients: &[Ingredient],
        deadline: Option<Instant>,
    ) -> Result<Vec<Vec<SourcingOption>>> {
        let vocab = &self.options.vocabulary;
        let order = self.options.country_order;

        let work = stream::iter(ingredients.iter().map(|ingredient| async move {
            let query = queries::sourcing(vocab, &ingredient.entity(), &self.destination);
            let rows = self.stage(Stage::Sourcing, None, query).await?;
            let options = aggregate::sourcing_from_rows(&rows, order)?;
            log::debug!("{} can be sourced from {} countries", ingredient.name, options.len());
            Ok::<_, FoodReportError>(options)
        }))
        .buffered(self.options.concurrency.max(1))
        .try_collect::<Vec<_>>();

        match deadline {
            Some(at) => tokio::time::timeout_at(at, work)
                .await
                .map_err(|_| FoodReportError::Timeout { stage: Stage::Sourcing })?,
            None => work.await,
        }
    }
}

fn count(rows: &RowSet, var: &str) -> Result<usize> {
    let value = match rows.as_slice() {
        [row] => row.get(var).and_then(|b| b.as_number()),
        _ => None,
    };
    match value {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        Some(n) => Err(FoodReportError::integrity(
            Stage::Verify,
            format!("{} is not a count: {}", var, n),
        )),
        None => Err(FoodReportError::integrity(
            Stage::Verify,
            format!("expected one numeric {} row, got {} rows", var, rows.len()),
        )),
    }
}
