/// Core domain types: entity kinds, reference roles, entities, and link targets.
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::attrpath::AttrPath;
use crate::error::Error;

/// A documented item, keyed by its full attribute path.
///
/// Fields are private and there are no setters: once the registry creates
/// an entity, nothing can change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Link target inside the origin document, `nix-{kind}-{path}`.
    anchor: String,
    /// Option, function, or package.
    kind: EntityKind,
    /// Name of the document that declared this entity.
    origin_document: String,
    /// Full attribute path.
    #[serde(serialize_with = "serialize_display")]
    path: AttrPath,
    /// Position within the registry fragment that created it.
    registration_order: u64,
}

impl Entity {
    /// Create an entity, deriving its anchor from `kind` and `path`.
    pub(crate) fn new(
        path: AttrPath,
        kind: EntityKind,
        origin_document: &str,
        registration_order: u64,
    ) -> Self {
        return Self {
            anchor: kind.anchor_for(&path),
            kind,
            origin_document: origin_document.to_string(),
            path,
            registration_order,
        };
    }

    /// Anchor used as the intra-document link target.
    pub fn anchor(&self) -> &str {
        return &self.anchor;
    }

    /// Entity kind.
    pub const fn kind(&self) -> EntityKind {
        return self.kind;
    }

    /// Where to link to for this entity.
    pub fn link(&self) -> LinkTarget {
        return LinkTarget {
            anchor: self.anchor.clone(),
            origin_document: self.origin_document.clone(),
            title: format!("{} {}", self.kind, self.path),
        };
    }

    /// Document that declared this entity.
    pub fn origin_document(&self) -> &str {
        return &self.origin_document;
    }

    /// Full attribute path.
    pub const fn path(&self) -> &AttrPath {
        return &self.path;
    }

    /// Registration counter within the fragment that created the entity.
    /// Not comparable across independently built fragments.
    pub const fn registration_order(&self) -> u64 {
        return self.registration_order;
    }

    /// Copy of this entity with a new registration counter, used when a
    /// fragment is appended to another registry.
    pub(crate) fn renumbered(&self, registration_order: u64) -> Self {
        return Self {
            registration_order,
            ..self.clone()
        };
    }
}

/// The three kinds of documented items. Closed set; every `match` is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A library function or other binding.
    Function,
    /// A module option such as `services.nginx.enable`.
    Option,
    /// A package such as `pkgs.hello`.
    Package,
}

impl EntityKind {
    /// Enumeration order for "all entities": options, then packages, then functions.
    pub const ALL: [Self; 3] = [Self::Option, Self::Package, Self::Function];
    /// Order multi-kind roles try kinds in: options, then functions, then packages.
    pub const RESOLUTION_ORDER: [Self; 3] = [Self::Option, Self::Function, Self::Package];

    /// Anchor for an entity of this kind at `path`.
    pub fn anchor_for(self, path: &AttrPath) -> String {
        return format!("nix-{}-{path}", self.name());
    }

    /// Human-readable label.
    pub const fn human_name(self) -> &'static str {
        return match self {
            Self::Function => "Nix function",
            Self::Option => "Nix option",
            Self::Package => "Nix package",
        };
    }

    /// Directive name, also used in anchors.
    pub const fn name(self) -> &'static str {
        return match self {
            Self::Function => "function",
            Self::Option => "option",
            Self::Package => "package",
        };
    }
}

impl fmt::Display for EntityKind {
    /// Writes the directive name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.name());
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    /// Parse a directive name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s {
            "function" => Ok(Self::Function),
            "option" => Ok(Self::Option),
            "package" => Ok(Self::Package),
            _ => Err(Error::UnknownKind { name: s.to_string() }),
        };
    }
}

/// Where a resolved reference points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTarget {
    /// Anchor inside the target document.
    pub anchor: String,
    /// Document that declares the target.
    pub origin_document: String,
    /// Hover title, e.g. `option services.nginx.enable`.
    pub title: String,
}

/// Reference roles as written in documents (`{nix:option}`, `{nix:bind}`, ...).
///
/// Each role accepts a fixed set of entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Functions and packages.
    Bind,
    /// Functions.
    Func,
    /// Any kind.
    Obj,
    /// Options.
    Option,
    /// Packages.
    Pkg,
}

impl Role {
    /// The single-kind role for `kind`.
    pub const fn for_kind(kind: EntityKind) -> Self {
        return match kind {
            EntityKind::Function => Self::Func,
            EntityKind::Option => Self::Option,
            EntityKind::Package => Self::Pkg,
        };
    }

    /// Kinds this role may refer to, in the order they are tried.
    pub const fn kinds(self) -> &'static [EntityKind] {
        return match self {
            Self::Bind => &[EntityKind::Function, EntityKind::Package],
            Self::Func => &[EntityKind::Function],
            Self::Obj => &EntityKind::RESOLUTION_ORDER,
            Self::Option => &[EntityKind::Option],
            Self::Pkg => &[EntityKind::Package],
        };
    }

    /// Role name as written after `nix:`.
    pub const fn name(self) -> &'static str {
        return match self {
            Self::Bind => "bind",
            Self::Func => "func",
            Self::Obj => "obj",
            Self::Option => "option",
            Self::Pkg => "pkg",
        };
    }
}

impl fmt::Display for Role {
    /// Writes the role name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.name());
    }
}

impl FromStr for Role {
    type Err = Error;

    /// Parse a role name, with or without the `nix:` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s.strip_prefix("nix:").unwrap_or(s) {
            "bind" => Ok(Self::Bind),
            "func" | "function" => Ok(Self::Func),
            "obj" => Ok(Self::Obj),
            "option" => Ok(Self::Option),
            "pkg" | "package" => Ok(Self::Pkg),
            _ => Err(Error::UnknownRole { name: s.to_string() }),
        };
    }
}

/// A reference that matched nothing. Not an error: the caller decides
/// whether to warn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    /// Candidate paths that were tried, most specific first.
    pub candidates: Vec<String>,
    /// Role (kind hint) the reference was made with.
    pub role: Role,
    /// The target as written.
    pub target: String,
}

/// Serialize any `Display` value as its string form.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize_display<T: fmt::Display, S: serde::Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    return serializer.collect_str(value);
}
