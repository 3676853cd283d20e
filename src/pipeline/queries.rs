//! The graph queries issued by each report stage.

use crate::config::VocabularyConfig;
use crate::query::{Aggregate, EntityRef, SelectQuery, Term};

/// Result variable names shared by the queries and the aggregator.
pub mod vars {
    pub const INGREDIENT: &str = "ingredient";
    pub const NAME: &str = "name";
    pub const STEP: &str = "step";
    pub const DESCRIPTION: &str = "description";

    pub const TOTAL_SUGAR: &str = "totalSugar";
    pub const TOTAL_PROTEINS: &str = "totalProteins";
    pub const TOTAL_SODIUM: &str = "totalSodium";
    pub const TOTAL_FAT: &str = "totalFat";
    pub const TOTAL_CALORIES: &str = "totalCalories";
    pub const TOTAL_CALCIUM: &str = "totalCalcium";
    pub const TOTAL_CARBOHYDRATES: &str = "totalCarbohydrates";

    pub const COUNTRY_NAME: &str = "countryName";
    pub const AVG_LABOUR: &str = "averageLabourScore";
    pub const AVG_ENVIRONMENT: &str = "averageEnvironmentScore";
    pub const AVG_TRAJECTORY: &str = "avgTrajectoryScore";

    pub const INGREDIENT_COUNT: &str = "ingredientCount";
    pub const STEP_COUNT: &str = "stepCount";
}

/// Per-ingredient nutrient properties and the aliases of their sums.
pub const NUTRIENTS: [(&str, &str); 7] = [
    ("sugar", vars::TOTAL_SUGAR),
    ("proteins", vars::TOTAL_PROTEINS),
    ("sodium", vars::TOTAL_SODIUM),
    ("fat", vars::TOTAL_FAT),
    ("calories", vars::TOTAL_CALORIES),
    ("calcium", vars::TOTAL_CALCIUM),
    ("carbohydrates", vars::TOTAL_CARBOHYDRATES),
];

/// Ontology and data namespaces, bound to the `ontology:` and `data:` prefixes.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    pub ontology: String,
    pub data: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::from(&VocabularyConfig::default())
    }
}

impl From<&VocabularyConfig> for Vocabulary {
    fn from(config: &VocabularyConfig) -> Self {
        Self {
            ontology: config.ontology.clone(),
            data: config.data.clone(),
        }
    }
}

impl Vocabulary {
    /// Ontology property or class, e.g. `ontology:needsIngredient`.
    pub fn term(&self, local: &str) -> EntityRef {
        EntityRef::in_namespace("ontology", &self.ontology, local)
    }

    /// Named individual in the data namespace, e.g. `data:Italy`.
    pub fn individual(&self, name: &str) -> EntityRef {
        EntityRef::in_namespace("data", &self.data, name)
    }

    fn query(&self) -> SelectQuery {
        SelectQuery::new()
            .prefix("ontology", &self.ontology)
            .prefix("data", &self.data)
    }
}

/// Stage 1: the recipe's ingredients and their names.
pub fn ingredients(vocab: &Vocabulary, recipe: &EntityRef) -> SelectQuery {
    vocab
        .query()
        .select(vars::INGREDIENT)
        .select(vars::NAME)
        .triple(recipe, vocab.term("needsIngredient"), Term::var(vars::INGREDIENT))
        .triple(Term::var(vars::INGREDIENT), vocab.term("ingredientName"), Term::var(vars::NAME))
}

/// Stage 2: step descriptions, ordered by step identifier.
pub fn steps(vocab: &Vocabulary, recipe: &EntityRef) -> SelectQuery {
    vocab
        .query()
        .select(vars::STEP)
        .select(vars::DESCRIPTION)
        .triple(Term::var(vars::STEP), vocab.term("describesRecipe"), recipe)
        .triple(Term::var(vars::STEP), vocab.term("description"), Term::var(vars::DESCRIPTION))
        .order_by_asc(vars::STEP)
}

/// Stage 3: each nutrient summed over all ingredients; one row expected.
pub fn nutrition(vocab: &Vocabulary, recipe: &EntityRef) -> SelectQuery {
    let mut query = vocab.query();
    for (property, alias) in NUTRIENTS {
        query = query.aggregate(Aggregate::Sum, property, alias);
    }
    query = query.triple(recipe, vocab.term("needsIngredient"), Term::var(vars::INGREDIENT));
    for (property, _) in NUTRIENTS {
        query = query.triple(Term::var(vars::INGREDIENT), vocab.term(property), Term::var(property));
    }
    query
}

/// Stage 4: countries an ingredient can be sourced from and shipped to
/// `destination`, with law and trajectory scores averaged per country.
pub fn sourcing(vocab: &Vocabulary, ingredient: &EntityRef, destination: &EntityRef) -> SelectQuery {
    vocab
        .query()
        .select(vars::COUNTRY_NAME)
        .aggregate(Aggregate::Avg, "labourScore", vars::AVG_LABOUR)
        .aggregate(Aggregate::Avg, "environmentScore", vars::AVG_ENVIRONMENT)
        .aggregate(Aggregate::Avg, "trajectoryScore", vars::AVG_TRAJECTORY)
        .triple(ingredient, vocab.term("manufacturedFrom"), Term::var("country"))
        .triple(Term::var("country"), vocab.term("countryName"), Term::var(vars::COUNTRY_NAME))
        .triple(Term::var("country"), vocab.term("imposes"), Term::var("law"))
        .triple(Term::var("law"), vocab.term("appliesToFoodType"), Term::var("foodtype"))
        .triple(ingredient, vocab.term("hasFoodType"), Term::var("foodtype"))
        .triple(Term::var("law"), vocab.term("labourScore"), Term::var("labourScore"))
        .triple(Term::var("law"), vocab.term("environmentScore"), Term::var("environmentScore"))
        .triple(Term::var("trajectory"), vocab.term("trajectoryFrom"), Term::var("country"))
        .triple(Term::var("trajectory"), vocab.term("trajectoryTo"), destination)
        .triple(Term::var("trajectory"), vocab.term("ships"), ingredient)
        .triple(Term::var("trajectory"), vocab.term("trajectoryScore"), Term::var("trajectoryScore"))
        .group_by(vars::COUNTRY_NAME)
}

/// Connectivity check: how many ingredients the recipe has.
pub fn ingredient_count(vocab: &Vocabulary, recipe: &EntityRef) -> SelectQuery {
    vocab
        .query()
        .aggregate(Aggregate::Count, vars::INGREDIENT, vars::INGREDIENT_COUNT)
        .triple(recipe, vocab.term("needsIngredient"), Term::var(vars::INGREDIENT))
}

/// Connectivity check: how many steps describe the recipe.
pub fn step_count(vocab: &Vocabulary, recipe: &EntityRef) -> SelectQuery {
    vocab
        .query()
        .aggregate(Aggregate::Count, vars::STEP, vars::STEP_COUNT)
        .triple(Term::var(vars::STEP), vocab.term("describesRecipe"), recipe)
}
