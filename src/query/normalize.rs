//! Identifier normalization: store-returned IRIs to compact entity references.

use super::EntityRef;

/// Convert an IRI returned by the store into a compact entity reference.
///
/// Takes the segment after the last `/`; the first `#` in that segment splits it
/// into `prefix` and `local` (`http://x/data#Tomato` becomes `data:Tomato`).
/// Without a `#` the segment is kept as a bare local name. The original IRI is
/// kept on the reference.
///
/// Input without any `/` is treated as already normalized: `data:Tomato` keeps
/// `data` as its prefix so a query declaring `data:` embeds it as a prefixed name.
pub fn normalize_identifier(iri: &str) -> EntityRef {
    if !iri.contains('/') {
        return match iri.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => {
                EntityRef::new(iri, Some(prefix.to_string()), local)
            }
            _ => EntityRef::new(iri, None, iri),
        };
    }
    let segment = iri.rsplit('/').next().unwrap_or(iri);
    match segment.split_once('#') {
        Some((prefix, local)) => EntityRef::new(iri, Some(prefix.to_string()), local),
        None => EntityRef::new(iri, None, segment),
    }
}
