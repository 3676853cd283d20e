//! Report data structures and rendering.

mod render;

pub use render::{render, render_json, render_text, OutputFormat};

use serde::Serialize;

use crate::query::{normalize_identifier, EntityRef};

/// An ingredient of the recipe, in store-returned order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ingredient {
    /// Full IRI as returned by the store
    pub uri: String,
    pub name: String,
}

impl Ingredient {
    /// Compact reference used to embed this ingredient in follow-up queries.
    pub fn entity(&self) -> EntityRef {
        normalize_identifier(&self.uri)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub description: String,
}

/// Sum of each nutrient over every ingredient of the recipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutritionTotals {
    pub sugar: f64,
    pub proteins: f64,
    pub sodium: f64,
    pub fat: f64,
    pub calories: f64,
    pub calcium: f64,
    pub carbohydrates: f64,
}

/// A country an ingredient can be sourced from, with mean scores (higher is better)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourcingOption {
    pub country_name: String,
    pub avg_labour_score: f64,
    pub avg_environment_score: f64,
    pub avg_trajectory_score: f64,
}

/// Sourcing options for one ingredient; empty when no country qualifies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientSourcing {
    pub ingredient: Ingredient,
    pub options: Vec<SourcingOption>,
}

/// The complete report for one recipe. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub recipe: String,
    pub destination: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub nutrition: NutritionTotals,
    /// One entry per ingredient, same order as `ingredients`
    pub sourcing: Vec<IngredientSourcing>,
}

impl Report {
    /// Sourcing options for the ingredient with the given IRI.
    pub fn sourcing_for(&self, ingredient_uri: &str) -> Option<&[SourcingOption]> {
        self.sourcing
            .iter()
            .find(|entry| entry.ingredient.uri == ingredient_uri)
            .map(|entry| entry.options.as_slice())
    }
}
