//! Domain indices: the options index and the library index.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ordering;
use crate::registry::Registry;
use crate::types::{Entity, EntityKind};

/// One line of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Anchor inside the document.
    pub anchor: String,
    /// Declaring document.
    pub document: String,
    /// Kind of the entity.
    pub kind: EntityKind,
    /// Full path as text.
    pub path: String,
}

/// Entries sharing a first character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexGroup {
    /// Entries in presentation order.
    pub entries: Vec<IndexEntry>,
    /// Lowercase first character of every entry's path.
    pub letter: String,
}

/// Functions and packages, lexicographic by path.
pub fn library_index(registry: &Registry) -> Vec<IndexGroup> {
    let mut entities: Vec<&Entity> = registry
        .by_kind(EntityKind::Function)
        .chain(registry.by_kind(EntityKind::Package))
        .collect();
    entities.sort_by(|a, b| return ordering::compare_entities(a, b));
    return group(&entities);
}

/// Index for one kind: options enable-first, the others lexicographic.
pub fn kind_index(registry: &Registry, kind: EntityKind) -> Vec<IndexGroup> {
    return group(&registry.sorted(kind));
}

/// Options, enable-first.
pub fn options_index(registry: &Registry) -> Vec<IndexGroup> {
    return kind_index(registry, EntityKind::Option);
}

/// Group sorted entities by lowercase first character. Entry order is kept
/// within a group; groups come out sorted.
fn group(entities: &[&Entity]) -> Vec<IndexGroup> {
    let mut groups: BTreeMap<String, Vec<IndexEntry>> = BTreeMap::new();
    for entity in entities {
        let path = entity.path().to_string();
        let letter = path.chars().next().map(|c| return c.to_lowercase().collect::<String>()).unwrap_or_default();
        groups.entry(letter).or_default().push(IndexEntry {
            anchor: entity.anchor().to_string(),
            document: entity.origin_document().to_string(),
            kind: entity.kind(),
            path,
        });
    }
    return groups
        .into_iter()
        .map(|(letter, entries)| return IndexGroup { entries, letter })
        .collect();
}
