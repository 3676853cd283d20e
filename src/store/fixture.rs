//! In-memory knowledge base answering the report queries, for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Binding, KnowledgeStore, QueryError, Row, RowSet};
use crate::pipeline::queries::{vars, NUTRIENTS};
use crate::query::SelectQuery;

pub(crate) const DATA: &str = "http://www.foodreport.be/data#";

/// Ingredient with its seven nutrient values (same order as `NUTRIENTS`)
#[derive(Clone)]
pub(crate) struct FixtureIngredient {
    pub iri: String,
    pub name: String,
    pub nutrients: [f64; 7],
}

/// One country an ingredient is manufactured from: the `(labour, environment)`
/// scores of each applicable law and the scores of each trajectory to a destination.
#[derive(Clone)]
pub(crate) struct FixtureSource {
    pub ingredient_iri: String,
    pub country: String,
    pub laws: Vec<(f64, f64)>,
    pub trajectories: Vec<(String, f64)>,
}

#[derive(Default)]
pub(crate) struct FixtureStore {
    pub ingredients: Vec<FixtureIngredient>,
    /// `(step IRI, description)`, in insertion order
    pub steps: Vec<(String, String)>,
    pub sources: Vec<FixtureSource>,
    /// Replace the stage-3 answer
    pub nutrition_override: Option<RowSet>,
    /// Fail any query whose projection binds this variable
    pub fail_on: Option<(&'static str, QueryError)>,
    /// Delay applied to sourcing queries
    pub sourcing_delay: Option<Duration>,
    pub queries: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

pub(crate) fn data_iri(local: &str) -> String {
    format!("{}{}", DATA, local)
}

impl FixtureStore {
    pub fn ingredient(mut self, local: &str, name: &str, nutrients: [f64; 7]) -> Self {
        self.ingredients.push(FixtureIngredient {
            iri: data_iri(local),
            name: name.to_string(),
            nutrients,
        });
        self
    }

    pub fn step(mut self, local: &str, description: &str) -> Self {
        self.steps.push((data_iri(local), description.to_string()));
        self
    }

    /// Country `country` supplies `ingredient` with the given laws and
    /// trajectory scores towards `destination`.
    pub fn source(
        mut self,
        ingredient: &str,
        country: &str,
        laws: &[(f64, f64)],
        destination: &str,
        trajectories: &[f64],
    ) -> Self {
        self.sources.push(FixtureSource {
            ingredient_iri: data_iri(ingredient),
            country: country.to_string(),
            laws: laws.to_vec(),
            trajectories: trajectories
                .iter()
                .map(|score| (data_iri(destination), *score))
                .collect(),
        });
        self
    }

    pub fn failing_on(mut self, var: &'static str, err: QueryError) -> Self {
        self.fail_on = Some((var, err));
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn answer(&self, query: &SelectQuery) -> RowSet {
        let names = query.output_names();
        if names.contains(&vars::COUNTRY_NAME) {
            self.sourcing(query)
        } else if names.contains(&vars::TOTAL_SUGAR) {
            self.nutrition()
        } else if names.contains(&vars::DESCRIPTION) {
            let mut steps = self.steps.clone();
            steps.sort_by(|a, b| a.0.cmp(&b.0));
            steps
                .into_iter()
                .map(|(iri, description)| {
                    Row::new()
                        .with(vars::STEP, Binding::Uri(iri))
                        .with(vars::DESCRIPTION, Binding::literal(&description))
                })
                .collect()
        } else if names.contains(&vars::INGREDIENT_COUNT) {
            vec![Row::new().with(vars::INGREDIENT_COUNT, Binding::decimal(self.ingredients.len() as f64))]
        } else if names.contains(&vars::STEP_COUNT) {
            vec![Row::new().with(vars::STEP_COUNT, Binding::decimal(self.steps.len() as f64))]
        } else {
            self.ingredients
                .iter()
                .map(|i| {
                    Row::new()
                        .with(vars::INGREDIENT, Binding::uri(&i.iri))
                        .with(vars::NAME, Binding::literal(&i.name))
                })
                .collect()
        }
    }

    fn nutrition(&self) -> RowSet {
        if let Some(ref rows) = self.nutrition_override {
            return rows.clone();
        }
        // SUM without GROUP BY yields one row even over zero solutions.
        let mut row = Row::new();
        for (idx, (_, alias)) in NUTRIENTS.iter().enumerate() {
            let sum: f64 = self.ingredients.iter().map(|i| i.nutrients[idx]).sum();
            row.insert(alias, Binding::decimal(sum));
        }
        vec![row]
    }

    fn sourcing(&self, query: &SelectQuery) -> RowSet {
        // The ingredient is the subject of the first pattern; the destination
        // is the object of the trajectoryTo pattern.
        let ingredient = query.patterns().first().and_then(|p| p.subject.as_entity());
        let destination = query
            .patterns()
            .iter()
            .find(|p| matches!(p.predicate.as_entity(), Some(e) if e.iri().ends_with("#trajectoryTo")))
            .and_then(|p| p.object.as_entity());
        let (Some(ingredient), Some(destination)) = (ingredient, destination) else {
            return Vec::new();
        };

        let mut rows = Vec::new();
        for source in self.sources.iter().filter(|s| s.ingredient_iri == ingredient.iri()) {
            let trajectories: Vec<f64> = source
                .trajectories
                .iter()
                .filter(|(to, _)| to == destination.iri())
                .map(|(_, score)| *score)
                .collect();
            if source.laws.is_empty() || trajectories.is_empty() {
                continue;
            }
            // Mean over every (law, trajectory) combination, as the join yields them.
            let mut labour = 0.0_f64;
            let mut environment = 0.0_f64;
            let mut trajectory = 0.0_f64;
            let mut combinations = 0.0_f64;
            for (law_labour, law_environment) in &source.laws {
                for score in &trajectories {
                    labour += law_labour;
                    environment += law_environment;
                    trajectory += score;
                    combinations += 1.0;
                }
            }
            rows.push(
                Row::new()
                    .with(vars::COUNTRY_NAME, Binding::literal(&source.country))
                    .with(vars::AVG_LABOUR, Binding::decimal(labour / combinations))
                    .with(vars::AVG_ENVIRONMENT, Binding::decimal(environment / combinations))
                    .with(vars::AVG_TRAJECTORY, Binding::decimal(trajectory / combinations)),
            );
        }
        rows
    }
}

#[async_trait]
impl KnowledgeStore for FixtureStore {
    async fn select(&self, query: &SelectQuery) -> Result<RowSet, QueryError> {
        self.queries.lock().unwrap().push(query.to_sparql());

        if let Some((var, ref err)) = self.fail_on {
            if query.output_names().contains(&var) {
                return Err(err.clone());
            }
        }

        let is_sourcing = query.output_names().contains(&vars::COUNTRY_NAME);
        if is_sourcing {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.sourcing_delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        Ok(self.answer(query))
    }
}
