//! Typed SPARQL query construction.
//!
//! Queries are assembled from terms and triple patterns and serialized in one
//! place, so identifiers returned by the store can be re-embedded safely.

mod normalize;
mod select;
mod term;

pub use normalize::normalize_identifier;
pub use select::{Aggregate, Projection, SelectQuery, TriplePattern};
pub use term::{escape_iri, escape_literal, escape_local_name, EntityRef, Term};
