//! Enable-first ordering of attribute paths.
//!
//! `services.foo.enable` sorts right after `services.foo` and before every
//! other `services.foo.*` sibling. All comparisons go through [`sort_key`],
//! so the order is a plain string order on transformed keys and stays
//! transitive for any number of paths.

use std::cmp::Ordering;

use crate::types::{Entity, EntityKind};

/// Suffix that marks a boolean toggle option.
const ENABLE_SUFFIX: &str = ".enable";

/// Compare two paths by their sort keys.
pub fn compare(a: &str, b: &str) -> Ordering {
    return sort_key(a).cmp(sort_key(b));
}

/// Compare two entities the way their index presents them.
///
/// Options use the enable-first key; functions and packages use plain
/// lexicographic order. Ties fall back to document then anchor so that the
/// result does not depend on registration order.
pub fn compare_entities(a: &Entity, b: &Entity) -> Ordering {
    let a_path = a.path().to_string();
    let b_path = b.path().to_string();
    let by_path = match (a.kind(), b.kind()) {
        (EntityKind::Option, EntityKind::Option) => compare(&a_path, &b_path),
        _ => a_path.cmp(&b_path),
    };
    return by_path
        .then_with(|| return a.origin_document().cmp(b.origin_document()))
        .then_with(|| return a.anchor().cmp(b.anchor()));
}

/// Whether `a` comes first when `{a, b}` are stably sorted by [`sort_key`].
///
/// Equal keys keep `a` first, so `less_than(x, x)` is `true`.
pub fn less_than(a: &str, b: &str) -> bool {
    return compare(a, b) != Ordering::Greater;
}

/// Sort key for an option path.
///
/// Strips a trailing `enable` from paths ending in `.enable`, keeping the dot,
/// so `a.enable` becomes `a.` and lands between `a` and `a.<anything>`.
pub fn sort_key(path: &str) -> &str {
    if path.ends_with(ENABLE_SUFFIX) {
        return path.strip_suffix("enable").unwrap_or(path);
    }
    return path;
}

/// Sort option paths in place with the enable-first rule.
pub fn sort_option_paths<S: AsRef<str>>(paths: &mut [S]) {
    paths.sort_by(|a, b| return compare(a.as_ref(), b.as_ref()));
}
