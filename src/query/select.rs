//! SELECT query builder.

use std::fmt;

use super::Term;

/// Aggregate functions used by the report queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Avg,
    Count,
}

impl Aggregate {
    fn keyword(self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Count => "COUNT",
        }
    }
}

/// One entry of the SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Var(String),
    Aggregate {
        function: Aggregate,
        var: String,
        alias: String,
    },
}

impl Projection {
    /// Name of the variable this projection binds in result rows.
    pub fn output_name(&self) -> &str {
        match self {
            Projection::Var(name) => name,
            Projection::Aggregate { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

/// A SPARQL SELECT query built from structured parts.
///
/// Entities are serialized by [`Term`], never spliced in as raw text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    prefixes: Vec<(String, String)>,
    projection: Vec<Projection>,
    patterns: Vec<TriplePattern>,
    group_by: Vec<String>,
    order_by: Vec<String>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `PREFIX name: <namespace>`. Redeclaring a prefix replaces it.
    pub fn prefix(mut self, name: &str, namespace: &str) -> Self {
        self.prefixes.retain(|(existing, _)| existing != name);
        self.prefixes.push((name.to_string(), namespace.to_string()));
        self
    }

    pub fn select(mut self, var: &str) -> Self {
        self.projection.push(Projection::Var(var.to_string()));
        self
    }

    /// Project `(FUNCTION(?var) AS ?alias)`.
    pub fn aggregate(mut self, function: Aggregate, var: &str, alias: &str) -> Self {
        self.projection.push(Projection::Aggregate {
            function,
            var: var.to_string(),
            alias: alias.to_string(),
        });
        self
    }

    pub fn triple(
        mut self,
        subject: impl Into<Term>,
        predicate: impl Into<Term>,
        object: impl Into<Term>,
    ) -> Self {
        self.patterns.push(TriplePattern {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        });
        self
    }

    pub fn group_by(mut self, var: &str) -> Self {
        self.group_by.push(var.to_string());
        self
    }

    pub fn order_by_asc(mut self, var: &str) -> Self {
        self.order_by.push(var.to_string());
        self
    }

    pub fn projection(&self) -> &[Projection] {
        &self.projection
    }

    pub fn patterns(&self) -> &[TriplePattern] {
        &self.patterns
    }

    /// Variable names bound in each result row, in SELECT order.
    pub fn output_names(&self) -> Vec<&str> {
        self.projection.iter().map(Projection::output_name).collect()
    }

    /// Render the query text sent to the store.
    pub fn to_sparql(&self) -> String {
        let mut out = String::new();
        for (name, namespace) in &self.prefixes {
            out.push_str(&format!("PREFIX {}: <{}>\n", name, super::escape_iri(namespace)));
        }
        if !self.prefixes.is_empty() {
            out.push('\n');
        }

        out.push_str("SELECT");
        for projection in &self.projection {
            match projection {
                Projection::Var(name) => out.push_str(&format!(" ?{}", name)),
                Projection::Aggregate { function, var, alias } => {
                    out.push_str(&format!(" ({}(?{}) AS ?{})", function.keyword(), var, alias))
                }
            }
        }
        out.push_str("\nWHERE {\n");
        for pattern in &self.patterns {
            out.push_str(&format!(
                "  {} {} {} .\n",
                pattern.subject.to_sparql(&self.prefixes),
                pattern.predicate.to_sparql(&self.prefixes),
                pattern.object.to_sparql(&self.prefixes),
            ));
        }
        out.push('}');

        if !self.group_by.is_empty() {
            let vars: Vec<String> = self.group_by.iter().map(|v| format!("?{}", v)).collect();
            out.push_str(&format!("\nGROUP BY {}", vars.join(" ")));
        }
        if !self.order_by.is_empty() {
            let keys: Vec<String> = self.order_by.iter().map(|v| format!("ASC(?{})", v)).collect();
            out.push_str(&format!("\nORDER BY {}", keys.join(" ")));
        }
        out.push('\n');
        out
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sparql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::EntityRef;

    const ONTOLOGY: &str = "http://www.foodreport.be/ontology#";
    const DATA: &str = "http://www.foodreport.be/data#";

    fn ontology(local: &str) -> EntityRef {
        EntityRef::in_namespace("ontology", ONTOLOGY, local)
    }

    #[test]
    fn test_render_select_with_prefixes_and_patterns() {
        let recipe = EntityRef::in_namespace("data", DATA, "Spaghetti Bolognese");
        let query = SelectQuery::new()
            .prefix("ontology", ONTOLOGY)
            .prefix("data", DATA)
            .select("ingredient")
            .select("name")
            .triple(&recipe, ontology("needsIngredient"), Term::var("ingredient"))
            .triple(Term::var("ingredient"), ontology("ingredientName"), Term::var("name"));

        let expected = r#"PREFIX ontology: <http://www.foodreport.be/ontology#>
PREFIX data: <http://www.foodreport.be/data#>

SELECT ?ingredient ?name
WHERE {
  data:Spaghetti%20Bolognese ontology:needsIngredient ?ingredient .
  ?ingredient ontology:ingredientName ?name .
}
"#;
        assert_eq!(query.to_sparql(), expected);
    }

    #[test]
    fn test_render_aggregates_group_and_order() {
        let query = SelectQuery::new()
            .prefix("ontology", ONTOLOGY)
            .select("countryName")
            .aggregate(Aggregate::Avg, "labourScore", "averageLabourScore")
            .triple(Term::var("country"), ontology("countryName"), Term::var("countryName"))
            .group_by("countryName")
            .order_by_asc("countryName");
        let text = query.to_sparql();
        assert!(text.contains("SELECT ?countryName (AVG(?labourScore) AS ?averageLabourScore)\n"));
        assert!(text.contains("\nGROUP BY ?countryName"));
        assert!(text.ends_with("ORDER BY ASC(?countryName)\n"));
    }

    #[test]
    fn test_output_names_use_aggregate_aliases() {
        let query = SelectQuery::new()
            .select("step")
            .aggregate(Aggregate::Sum, "sugar", "totalSugar")
            .aggregate(Aggregate::Count, "ingredient", "ingredientCount");
        assert_eq!(query.output_names(), vec!["step", "totalSugar", "ingredientCount"]);
    }

    #[test]
    fn test_redeclared_prefix_replaces_namespace() {
        let query = SelectQuery::new()
            .prefix("data", "http://old.example/#")
            .prefix("data", DATA)
            .select("x")
            .triple(Term::var("x"), ontology("p"), Term::var("y"));
        let text = query.to_sparql();
        assert!(!text.contains("old.example"));
        assert_eq!(text.matches("PREFIX data:").count(), 1);
        // ontology prefix undeclared: predicate falls back to a full IRI
        assert!(text.contains("<http://www.foodreport.be/ontology#p>"));
    }

    #[test]
    fn test_literal_object_is_quoted() {
        let query = SelectQuery::new()
            .prefix("ontology", ONTOLOGY)
            .select("country")
            .triple(Term::var("country"), ontology("countryName"), Term::Literal("Côte \"d'Ivoire\"".to_string()));
        assert!(query.to_sparql().contains("ontology:countryName \"Côte \\\"d'Ivoire\\\"\" ."));
    }
}
