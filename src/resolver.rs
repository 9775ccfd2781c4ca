//! Scoped reference resolution.
//!
//! A reference `c` written inside `a.b` may mean `a.b.c`, `a.c`, or `c`.
//! The resolver builds those candidates from the lexical context, tries them
//! most nested first, and returns the first registered match.

use crate::attrpath::{self, AttrPath};
use crate::context::Scopes;
use crate::registry::Registry;
use crate::types::{Entity, EntityKind, Role, Unresolved};

/// Resolves references against a populated registry.
///
/// Resolution never mutates the registry, so it runs after every document
/// has been read.
pub struct Resolver<'r> {
    /// The registry to look paths up in.
    registry: &'r Registry,
}

impl<'r> Resolver<'r> {
    /// Create a resolver over `registry`.
    pub const fn new(registry: &'r Registry) -> Self {
        return Self { registry };
    }

    /// Resolve `target` as an entity of `kind` from the given context entries.
    ///
    /// # Errors
    ///
    /// Returns `Unresolved` when no candidate path is registered.
    pub fn resolve<S: AsRef<str>>(
        &self,
        kind: EntityKind,
        target: &str,
        context: &[S],
    ) -> Result<&'r Entity, Unresolved> {
        let target_segments = attrpath::split(target);
        let context_segments = attrpath::split_all(context);
        let candidates = candidate_paths(&context_segments, &target_segments);

        return self
            .best_match(kind, &candidates)
            .ok_or_else(|| return unresolved(Role::for_kind(kind), target, &candidates));
    }

    /// Resolve `target` as each kind `role` accepts, each with its own context.
    ///
    /// Kinds are tried in [`Role::kinds`] order and the first kind that
    /// resolves wins, however much context another kind would have used.
    ///
    /// # Errors
    ///
    /// Returns `Unresolved` listing the candidates of every kind tried.
    pub fn resolve_role(
        &self,
        role: Role,
        target: &str,
        scopes: &Scopes,
    ) -> Result<&'r Entity, Unresolved> {
        let target_segments = attrpath::split(target);
        let mut tried: Vec<String> = Vec::new();

        for kind in role.kinds() {
            let context_segments = attrpath::split_all(scopes.for_kind(*kind));
            let candidates = candidate_paths(&context_segments, &target_segments);
            for candidate in &candidates {
                let rendered = candidate.to_string();
                if !tried.contains(&rendered) {
                    tried.push(rendered);
                }
            }

            if let Some(found) = self.best_match(*kind, &candidates) {
                return Ok(found);
            }
        }

        tracing::debug!(role = %role, reference = target, candidates = ?tried, "reference did not resolve");
        return Err(Unresolved {
            candidates: tried,
            role,
            target: target.to_string(),
        });
    }

    /// Every `(role, entity)` pair `target` could refer to, one per kind,
    /// in [`EntityKind::RESOLUTION_ORDER`].
    ///
    /// Used for "any" references, where the caller may want to report every
    /// interpretation rather than pick one.
    pub fn resolve_all_kinds(&self, target: &str, scopes: &Scopes) -> Vec<(Role, &'r Entity)> {
        return EntityKind::RESOLUTION_ORDER
            .iter()
            .filter_map(|kind| {
                return self
                    .resolve(*kind, target, scopes.for_kind(*kind))
                    .ok()
                    .map(|entity| return (Role::for_kind(*kind), entity));
            })
            .collect();
    }

    /// First candidate (most specific) registered as `kind`.
    fn best_match(&self, kind: EntityKind, candidates: &[AttrPath]) -> Option<&'r Entity> {
        return candidates
            .iter()
            .find_map(|candidate| return self.registry.lookup(kind, candidate));
    }
}

/// Build the candidate paths for `target` inside `context`, most nested first.
///
/// For a context of `n` segments there are `n + 1` candidates, from the full
/// context down to the bare target. An empty target has no candidates.
pub fn candidate_paths(context: &[String], target: &[String]) -> Vec<AttrPath> {
    if target.is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<AttrPath> = (0..=context.len())
        .filter_map(|prefix_len| {
            let prefix = context.get(..prefix_len)?;
            let mut segments = prefix.to_vec();
            segments.extend_from_slice(target);
            return AttrPath::from_segments(segments);
        })
        .collect();
    candidates.reverse();
    return candidates;
}

/// Build the sentinel for a failed single-kind resolution.
fn unresolved(role: Role, target: &str, candidates: &[AttrPath]) -> Unresolved {
    tracing::debug!(role = %role, reference = target, "reference did not resolve");
    return Unresolved {
        candidates: candidates.iter().map(ToString::to_string).collect(),
        role,
        target: target.to_string(),
    };
}
