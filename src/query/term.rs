//! Query terms and their SPARQL serialization.

use std::fmt;

/// Reference to a knowledge-base entity.
///
/// Carries the full IRI plus the compact `prefix:local` split, so a query can
/// embed it either as a prefixed name or as `<iri>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    iri: String,
    prefix: Option<String>,
    local: String,
}

impl EntityRef {
    /// Entity whose compact form and IRI are known separately.
    pub fn new(iri: impl Into<String>, prefix: Option<String>, local: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            prefix,
            local: local.into(),
        }
    }

    /// Entity named `name` inside `namespace`, declared in queries as `prefix`.
    ///
    /// `name` is a human-readable local name (e.g. `Spaghetti Bolognese`); characters
    /// that cannot appear in an IRI are percent-encoded (`Spaghetti%20Bolognese`).
    pub fn in_namespace(prefix: &str, namespace: &str, name: &str) -> Self {
        let local = encode_iri_component(name);
        Self {
            iri: format!("{}{}", namespace, local),
            prefix: Some(prefix.to_string()),
            local,
        }
    }

    pub fn iri(&self) -> &str {
        &self.iri
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    /// Compact reference form: `prefix:local`, or the bare local name when no prefix is known.
    pub fn compact(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compact())
    }
}

/// A subject, predicate or object position in a triple pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Var(String),
    Entity(EntityRef),
    Literal(String),
}

impl Term {
    pub fn var(name: &str) -> Self {
        Term::Var(name.to_string())
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Term::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Serialize against the prefixes declared by the enclosing query.
    pub(crate) fn to_sparql(&self, prefixes: &[(String, String)]) -> String {
        match self {
            Term::Var(name) => format!("?{}", name),
            Term::Literal(value) => escape_literal(value),
            Term::Entity(entity) => entity_to_sparql(entity, prefixes),
        }
    }
}

impl From<EntityRef> for Term {
    fn from(entity: EntityRef) -> Self {
        Term::Entity(entity)
    }
}

impl From<&EntityRef> for Term {
    fn from(entity: &EntityRef) -> Self {
        Term::Entity(entity.clone())
    }
}

fn entity_to_sparql(entity: &EntityRef, prefixes: &[(String, String)]) -> String {
    // Prefixed form only when the declared namespace reproduces the exact IRI,
    // or the entity was already given in compact form, and the local name
    // survives escaping unchanged.
    if let Some(prefix) = entity.prefix() {
        let declared = prefixes
            .iter()
            .find(|(name, _)| name == prefix)
            .map(|(_, namespace)| namespace);
        if let Some(namespace) = declared {
            let expands = entity.iri().strip_prefix(namespace.as_str()) == Some(entity.local());
            let compact = entity.iri() == entity.compact();
            if (expands || compact) && is_representable_local(entity.local()) {
                return format!("{}:{}", prefix, escape_local_name(entity.local()));
            }
        }
    }
    format!("<{}>", escape_iri(entity.iri()))
}

/// Whether `escape_local_name` can write `local` without percent-encoding,
/// which would name a different IRI.
fn is_representable_local(local: &str) -> bool {
    local.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || c == '_'
            || c == ':'
            || PN_LOCAL_ESCAPABLE.contains(c)
            || (!c.is_ascii() && !c.is_control() && !c.is_whitespace())
    })
}

const PN_LOCAL_ESCAPABLE: &str = "_~.-!$&'()*+,;=/?#@%";

/// Escape a local name so it parses as SPARQL `PN_LOCAL`.
///
/// Existing `%HH` sequences are kept, reserved characters are backslash-escaped,
/// anything else outside the grammar is percent-encoded.
pub fn escape_local_name(local: &str) -> String {
    let chars: Vec<char> = local.chars().collect();
    let mut out = String::with_capacity(local.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let first = i == 0;
        let last = i + 1 == chars.len();
        if c == '%'
            && i + 2 < chars.len()
            && chars[i + 1].is_ascii_hexdigit()
            && chars[i + 2].is_ascii_hexdigit()
        {
            out.push(c);
            out.push(chars[i + 1]);
            out.push(chars[i + 2]);
            i += 3;
            continue;
        }
        let plain = c.is_ascii_alphanumeric()
            || c == '_'
            || c == ':'
            || (c == '-' && !first)
            || (c == '.' && !first && !last)
            || (!c.is_ascii() && !c.is_control() && !c.is_whitespace());
        if plain {
            out.push(c);
        } else if PN_LOCAL_ESCAPABLE.contains(c) {
            out.push('\\');
            out.push(c);
        } else {
            push_percent_encoded(&mut out, c);
        }
        i += 1;
    }
    out
}

/// Percent-encode the characters that are illegal inside `<...>`.
pub fn escape_iri(iri: &str) -> String {
    let mut out = String::with_capacity(iri.len());
    for c in iri.chars() {
        if c <= ' ' || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') {
            push_percent_encoded(&mut out, c);
        } else {
            out.push(c);
        }
    }
    out
}

/// Quote a plain string literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn encode_iri_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let keep = c.is_ascii_alphanumeric()
            || matches!(c, '-' | '.' | '_' | '~' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' | ':' | '@')
            || (!c.is_ascii() && !c.is_control() && !c.is_whitespace());
        if keep {
            out.push(c);
        } else {
            push_percent_encoded(&mut out, c);
        }
    }
    out
}

fn push_percent_encoded(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    for byte in c.encode_utf8(&mut buf).bytes() {
        out.push_str(&format!("%{:02X}", byte));
    }
}
