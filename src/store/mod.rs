//! Knowledge store access: typed result rows and the store trait.

pub mod sparql;

#[cfg(test)]
pub(crate) mod fixture;

pub use sparql::SparqlClient;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::query::SelectQuery;

/// Failure executing a query against the store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Connection refused, DNS failure, reset
    #[error("transport error: {0}")]
    Transport(String),

    /// The HTTP request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The store rejected the query text (HTTP 400)
    #[error("query rejected by store: {0}")]
    Syntax(String),

    /// Any other non-success status
    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is not a SPARQL JSON result set
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl QueryError {
    /// Whether resending the same query may succeed (429, 5xx, network failures).
    pub fn is_retryable(&self) -> bool {
        match self {
            QueryError::Transport(_) | QueryError::Timeout(_) => true,
            QueryError::Status { status, .. } => *status == 429 || *status >= 500,
            QueryError::Syntax(_) | QueryError::InvalidResponse(_) => false,
        }
    }
}

/// A typed value bound to a result variable
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Uri(String),
    Literal {
        value: String,
        datatype: Option<String>,
        lang: Option<String>,
    },
    BlankNode(String),
}

impl Binding {
    pub fn uri(value: &str) -> Self {
        Binding::Uri(value.to_string())
    }

    pub fn literal(value: &str) -> Self {
        Binding::Literal {
            value: value.to_string(),
            datatype: None,
            lang: None,
        }
    }

    /// Numeric literal typed as `xsd:decimal`.
    pub fn decimal(value: f64) -> Self {
        Binding::Literal {
            value: value.to_string(),
            datatype: Some(XSD_DECIMAL.to_string()),
            lang: None,
        }
    }

    /// Lexical value regardless of kind.
    pub fn value(&self) -> &str {
        match self {
            Binding::Uri(value) | Binding::BlankNode(value) => value,
            Binding::Literal { value, .. } => value,
        }
    }

    /// Numeric interpretation of a literal; `None` for IRIs, blank nodes and
    /// literals that are not finite numbers (`NaN`, `INF` included).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Binding::Literal { value, .. } => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
            _ => None,
        }
    }
}

pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";

/// One solution of a query. Variables the store left unbound are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    bindings: HashMap<String, Binding>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, var: &str, binding: Binding) -> Self {
        self.insert(var, binding);
        self
    }

    pub fn insert(&mut self, var: &str, binding: Binding) {
        self.bindings.insert(var.to_string(), binding);
    }

    pub fn get(&self, var: &str) -> Option<&Binding> {
        self.bindings.get(var)
    }

    /// Lexical value of `var`, if bound.
    pub fn text(&self, var: &str) -> Option<&str> {
        self.get(var).map(Binding::value)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Result rows in the order the store produced them
pub type RowSet = Vec<Row>;

/// A graph store that answers SELECT queries with binding rows
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> Result<RowSet, QueryError>;
}
