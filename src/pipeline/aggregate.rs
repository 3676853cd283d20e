//! Reduce raw binding rows into report structures. No I/O.

use super::queries::vars;
use super::CountryOrder;
use crate::error::{FoodReportError, Result, Stage};
use crate::report::{
    Ingredient, IngredientSourcing, NutritionTotals, Report, SourcingOption, Step,
};
use crate::store::Row;

/// Stage 1 rows to ingredients, keeping store order. Rows missing the IRI or
/// the name are skipped.
pub fn ingredients_from_rows(rows: &[Row]) -> Vec<Ingredient> {
    rows.iter()
        .filter_map(|row| match (row.text(vars::INGREDIENT), row.text(vars::NAME)) {
            (Some(uri), Some(name)) => Some(Ingredient {
                uri: uri.to_string(),
                name: name.to_string(),
            }),
            _ => {
                log::warn!("Skipping ingredient row with unbound variables: {:?}", row);
                None
            }
        })
        .collect()
}

/// Stage 2 rows to steps, keeping the store's ascending step order.
pub fn steps_from_rows(rows: &[Row]) -> Vec<Step> {
    rows.iter()
        .filter_map(|row| match row.text(vars::DESCRIPTION) {
            Some(description) => Some(Step {
                description: description.to_string(),
            }),
            None => {
                log::warn!("Skipping step row without a description: {:?}", row);
                None
            }
        })
        .collect()
}

/// Stage 3 rows to nutrition totals.
///
/// Exactly one row is expected. No row at all is accepted only for a recipe
/// without ingredients; unbound sums count as zero.
pub fn nutrition_from_rows(rows: &[Row], ingredient_count: usize) -> Result<NutritionTotals> {
    let row = match rows {
        [] if ingredient_count == 0 => return Ok(NutritionTotals::default()),
        [] => {
            return Err(FoodReportError::integrity(
                Stage::Nutrition,
                format!(
                    "expected one aggregate row for a recipe with {} ingredients, got none",
                    ingredient_count
                ),
            ))
        }
        [row] => row,
        _ => {
            return Err(FoodReportError::integrity(
                Stage::Nutrition,
                format!("expected one aggregate row, got {}", rows.len()),
            ))
        }
    };

    Ok(NutritionTotals {
        sugar: total(row, vars::TOTAL_SUGAR)?,
        proteins: total(row, vars::TOTAL_PROTEINS)?,
        sodium: total(row, vars::TOTAL_SODIUM)?,
        fat: total(row, vars::TOTAL_FAT)?,
        calories: total(row, vars::TOTAL_CALORIES)?,
        calcium: total(row, vars::TOTAL_CALCIUM)?,
        carbohydrates: total(row, vars::TOTAL_CARBOHYDRATES)?,
    })
}

fn total(row: &Row, var: &str) -> Result<f64> {
    match row.get(var) {
        None => Ok(0.0),
        Some(binding) => binding.as_number().ok_or_else(|| {
            FoodReportError::integrity(
                Stage::Nutrition,
                format!("{} is not numeric: {:?}", var, binding.value()),
            )
        }),
    }
}

/// Stage 4 rows for one ingredient to sourcing options.
///
/// Rows with unbound variables are skipped; bound but non-numeric scores are an
/// integrity error.
pub fn sourcing_from_rows(rows: &[Row], order: CountryOrder) -> Result<Vec<SourcingOption>> {
    let mut options = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(country), Some(labour), Some(environment), Some(trajectory)) = (
            row.text(vars::COUNTRY_NAME),
            row.get(vars::AVG_LABOUR),
            row.get(vars::AVG_ENVIRONMENT),
            row.get(vars::AVG_TRAJECTORY),
        ) else {
            log::warn!("Skipping sourcing row with unbound variables: {:?}", row);
            continue;
        };

        let score = |var: &str, binding: &crate::store::Binding| {
            binding.as_number().ok_or_else(|| {
                FoodReportError::integrity(
                    Stage::Sourcing,
                    format!("{} for {} is not numeric: {:?}", var, country, binding.value()),
                )
            })
        };

        options.push(SourcingOption {
            country_name: country.to_string(),
            avg_labour_score: score(vars::AVG_LABOUR, labour)?,
            avg_environment_score: score(vars::AVG_ENVIRONMENT, environment)?,
            avg_trajectory_score: score(vars::AVG_TRAJECTORY, trajectory)?,
        });
    }

    if order == CountryOrder::Name {
        // stable: equal names keep store order
        options.sort_by(|a, b| a.country_name.cmp(&b.country_name));
    }
    Ok(options)
}

/// Assemble the final report; `sourcing[i]` belongs to `ingredients[i]`.
pub fn assemble(
    recipe: &str,
    destination: &str,
    ingredients: Vec<Ingredient>,
    steps: Vec<Step>,
    nutrition: NutritionTotals,
    sourcing: Vec<Vec<SourcingOption>>,
) -> Report {
    debug_assert_eq!(ingredients.len(), sourcing.len());
    let sourcing = ingredients
        .iter()
        .cloned()
        .zip(sourcing)
        .map(|(ingredient, options)| IngredientSourcing { ingredient, options })
        .collect();

    Report {
        recipe: recipe.to_string(),
        destination: destination.to_string(),
        ingredients,
        steps,
        nutrition,
        sourcing,
    }
}
