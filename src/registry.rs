//! Entity registry: append-only storage for every declared entity.
//!
//! One registry per build. Documents may be read into separate registries
//! (fragments) and merged afterwards; lookups do not depend on merge order.

use std::collections::HashMap;

use crate::attrpath::AttrPath;
use crate::ordering;
use crate::types::{Entity, EntityKind};

/// All entities registered during one build.
#[derive(Debug, Default)]
pub struct Registry {
    /// Entities in registration order.
    entities: Vec<Entity>,
    /// Kind, then path, to positions in `entities`, for exact-path lookups.
    index: HashMap<EntityKind, HashMap<AttrPath, Vec<usize>>>,
}

impl Registry {
    /// Entities of every kind: options, then packages, then functions.
    /// Within a kind, registration order.
    pub fn all(&self) -> Vec<&Entity> {
        return EntityKind::ALL
            .iter()
            .flat_map(|kind| return self.by_kind(*kind))
            .collect();
    }

    /// Entities of one kind, in registration order.
    pub fn by_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        return self.entities.iter().filter(move |e| return e.kind() == kind);
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        return self.entities.is_empty();
    }

    /// Number of registered entities, duplicates included.
    pub fn len(&self) -> usize {
        return self.entities.len();
    }

    /// Find the entity of `kind` at exactly `path`.
    ///
    /// When the same path was registered more than once, the entity from the
    /// lexicographically smallest origin document wins, then the earliest
    /// registration. The winner is the same whatever order documents were
    /// merged in.
    pub fn lookup(&self, kind: EntityKind, path: &AttrPath) -> Option<&Entity> {
        let positions = self.index.get(&kind)?.get(path)?;
        return positions
            .iter()
            .filter_map(|pos| return self.entities.get(*pos))
            .min_by(|a, b| {
                return a
                    .origin_document()
                    .cmp(b.origin_document())
                    .then_with(|| return a.registration_order().cmp(&b.registration_order()));
            });
    }

    /// Append every entity of `fragment`, renumbering registration order.
    pub fn merge(&mut self, fragment: Self) {
        for entity in fragment.entities {
            let order = self.next_order();
            self.push(entity.renumbered(order));
        }
    }

    /// Create an empty registry.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Number of entities of one kind at `path`. More than one means duplicates.
    pub fn occurrences(&self, kind: EntityKind, path: &AttrPath) -> usize {
        return self
            .index
            .get(&kind)
            .and_then(|paths| return paths.get(path))
            .map_or(0, Vec::len);
    }

    /// Register an entity and return its anchor.
    ///
    /// Never rejects and never deduplicates.
    pub fn register(&mut self, path: AttrPath, kind: EntityKind, origin_document: &str) -> String {
        let order = self.next_order();
        let entity = Entity::new(path, kind, origin_document, order);
        let anchor = entity.anchor().to_string();

        tracing::debug!(kind = %kind, path = %entity.path(), document = origin_document, "registered");
        if self.occurrences(kind, entity.path()) > 0 {
            tracing::debug!(kind = %kind, path = %entity.path(), "duplicate declaration");
        }

        self.push(entity);
        return anchor;
    }

    /// Drop everything. Called at the start of a build.
    pub fn reset(&mut self) {
        self.entities.clear();
        self.index.clear();
    }

    /// Entities of one kind sorted for presentation: enable-first for
    /// options, lexicographic for functions and packages.
    pub fn sorted(&self, kind: EntityKind) -> Vec<&Entity> {
        let mut entities: Vec<&Entity> = self.by_kind(kind).collect();
        entities.sort_by(|a, b| return ordering::compare_entities(a, b));
        return entities;
    }

    /// Next registration counter.
    fn next_order(&self) -> u64 {
        return u64::try_from(self.entities.len()).unwrap_or(u64::MAX);
    }

    /// Store an entity and index it.
    fn push(&mut self, entity: Entity) {
        let position = self.entities.len();
        self.index
            .entry(entity.kind())
            .or_default()
            .entry(entity.path().clone())
            .or_default()
            .push(position);
        self.entities.push(entity);
    }
}
