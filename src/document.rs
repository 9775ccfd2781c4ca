//! Reading one markdown document: `nix:` directives and roles.
//!
//! Directives use MyST fences (three or more `:` or `` ` ``). A directive's
//! body is parsed recursively, so nested option declarations see their
//! parents through the option context stack:
//!
//! ```text
//! ::::{nix:option} services.nginx
//! :type: submodule
//!
//! :::{nix:option} enable
//! See {nix:option}`package`.
//! :::
//! ::::
//! ```
//!
//! Reading never fails. Problems become [`Diagnostic`]s on the result.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::attrpath::{self, AttrPath};
use crate::context::{ContextStack, DocumentContext, Scopes};
use crate::diagnostics::Diagnostic;
use crate::objects::Objects;
use crate::registry::Registry;
use crate::types::{EntityKind, Role, serialize_display};

/// Closing fence: only fence characters on the line.
#[allow(clippy::expect_used, reason = "the pattern is a literal and always compiles")]
static CLOSING_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^ {0,3}(:{3,}|`{3,})\s*$").expect("valid closing fence regex");
});

/// Literal code block opener: a backtick or tilde fence with no `{directive}`.
#[allow(clippy::expect_used, reason = "the pattern is a literal and always compiles")]
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^ {0,3}(`{3,}|~{3,})[^`{]*$").expect("valid code fence regex");
});

/// Directive opener: fence, `{name}`, then the argument.
#[allow(clippy::expect_used, reason = "the pattern is a literal and always compiles")]
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^ {0,3}(:{3,}|`{3,})\{([^}\s]+)\}\s*(.*?)\s*$").expect("valid directive regex");
});

/// Explicit role title: `title <target>`.
#[allow(clippy::expect_used, reason = "the pattern is a literal and always compiles")]
static EXPLICIT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^(.+?)\s+<(.+)>$").expect("valid explicit title regex");
});

/// Directive option line: `:name:` or `:name: value`.
#[allow(clippy::expect_used, reason = "the pattern is a literal and always compiles")]
static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^\s*:([A-Za-z][\w-]*):(?:\s+(.*?))?\s*$").expect("valid option regex");
});

/// Inline role: ``{nix:role}`content` ``.
#[allow(clippy::expect_used, reason = "the pattern is a literal and always compiles")]
static ROLE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"\{nix:([A-Za-z]+)\}`([^`]+)`").expect("valid role regex");
});

/// Directive options the domain understands.
const KNOWN_OPTIONS: &[&str] = &[
    "declaration",
    "no-contents-entry",
    "no-index",
    "no-index-entry",
    "no-recursive",
    "no-typesetting",
    "read-only",
    "short-toc-name",
    "type",
];

/// Directives whose body is verbatim text, never markup.
const LITERAL_DIRECTIVES: &[&str] = &["code", "code-block", "literalinclude", "raw", "sourcecode"];

/// An entity declared in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    /// Declaration site (`file` or `file:line`) for source links.
    pub declared_at: Option<String>,
    /// Option, function, or package.
    pub kind: EntityKind,
    /// One-based line of the directive.
    pub line: u32,
    /// Metadata to present alongside the entity.
    pub metadata: Metadata,
    /// Full attribute path.
    #[serde(serialize_with = "serialize_display")]
    pub path: AttrPath,
}

/// The `nix:` directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    /// `nix:autofunction NAME`
    AutoFunction,
    /// `nix:autolibrary [SCOPE]`
    AutoLibrary,
    /// `nix:autooption NAME`
    AutoOption,
    /// `nix:autopackage NAME`
    AutoPackage,
    /// `nix:autopackages [SCOPE]`
    AutoPackages,
    /// `nix:function PATH`
    Function,
    /// `nix:option PATH`
    Option,
    /// `nix:package PATH`
    Package,
}

impl DirectiveKind {
    /// Parse a directive name; `None` for anything outside the `nix:` domain.
    fn from_name(name: &str) -> Option<Self> {
        return match name.strip_prefix("nix:")? {
            "autofunction" => Some(Self::AutoFunction),
            "autolibrary" => Some(Self::AutoLibrary),
            "autooption" => Some(Self::AutoOption),
            "autopackage" => Some(Self::AutoPackage),
            "autopackages" => Some(Self::AutoPackages),
            "function" => Some(Self::Function),
            "option" => Some(Self::Option),
            "package" => Some(Self::Package),
            _ => None,
        };
    }
}

/// An opening fence, remembered so its closer can be recognized.
#[derive(Debug, Clone, Copy)]
struct Fence {
    /// `:` or `` ` ``.
    character: char,
    /// Number of fence characters.
    length: usize,
    /// One-based line of the opener.
    line: u32,
}

impl Fence {
    /// Build from the fence text of an opener.
    fn from_marker(marker: &str, line: u32) -> Self {
        return Self {
            character: marker.chars().next().unwrap_or(':'),
            length: marker.chars().count(),
            line,
        };
    }

    /// Whether the fence text `marker` closes this fence.
    fn is_closed_by(&self, marker: &str) -> bool {
        return marker.chars().next() == Some(self.character) && marker.chars().count() >= self.length;
    }
}

/// Metadata shown with a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Description text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Example value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    /// Licenses (packages).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<String>,
    /// Presentation flags given on the directive.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub presentation: BTreeSet<Presentation>,
    /// Read-only option.
    pub read_only: bool,
    /// Option type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Package version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Result of reading one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedDocument {
    /// Entities declared in the document, in document order.
    pub declarations: Vec<Declaration>,
    /// Problems found while reading.
    pub diagnostics: Vec<Diagnostic>,
    /// Document name (path without extension).
    pub name: String,
    /// References to resolve once every document has been read.
    pub references: Vec<PendingReference>,
}

impl ParsedDocument {
    /// Registry fragment holding this document's declarations.
    pub fn fragment(&self) -> Registry {
        let mut registry = Registry::new();
        for declaration in &self.declarations {
            registry.register(declaration.path.clone(), declaration.kind, &self.name);
        }
        return registry;
    }
}

/// Option values given on a directive, in order.
#[derive(Debug, Default)]
struct DirectiveOptions {
    /// `(name, value)` pairs; flags have an empty value.
    entries: Vec<(String, String)>,
}

impl DirectiveOptions {
    /// Value of `name`, if present and non-empty.
    fn get(&self, name: &str) -> Option<&str> {
        return self
            .entries
            .iter()
            .find(|(key, _)| return key == name)
            .map(|(_, value)| return value.as_str())
            .filter(|value| return !value.is_empty());
    }

    /// Whether `name` was given, with or without a value.
    fn has(&self, name: &str) -> bool {
        return self.entries.iter().any(|(key, _)| return key == name);
    }
}

/// A reference found in a document, with the context it was written in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingReference {
    /// One-based line.
    pub line: u32,
    /// Role the reference was written with.
    pub role: Role,
    /// Lexical context at the reference.
    pub scopes: Scopes,
    /// Target path as written.
    pub target: String,
    /// Explicit link text, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Directive flags that only change how an entity is shown. An entity
/// carrying any of them is still registered and resolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Presentation {
    /// `:no-contents-entry:`: left out of the table of contents.
    NoContentsEntry,
    /// `:no-index-entry:`: left out of the general index.
    NoIndexEntry,
    /// `:no-typesetting:`: the signature is not rendered.
    NoTypesetting,
    /// `:short-toc-name:`: the table of contents shows only the last segment.
    ShortTocName,
}

impl Presentation {
    /// Every flag, in option-name order.
    pub const ALL: [Self; 4] = [Self::NoContentsEntry, Self::NoIndexEntry, Self::NoTypesetting, Self::ShortTocName];

    /// Directive option that sets this flag.
    pub const fn option_name(self) -> &'static str {
        return match self {
            Self::NoContentsEntry => "no-contents-entry",
            Self::NoIndexEntry => "no-index-entry",
            Self::NoTypesetting => "no-typesetting",
            Self::ShortTocName => "short-toc-name",
        };
    }
}

/// The option and function stacks, borrowed separately so a guard on one
/// can coexist with access to the other.
struct Stacks<'s> {
    /// Function context.
    functions: &'s mut ContextStack,
    /// Option context.
    options: &'s mut ContextStack,
}

impl Stacks<'_> {
    /// Reborrow both stacks for a nested call.
    fn reborrow(&mut self) -> Stacks<'_> {
        return Stacks {
            functions: &mut *self.functions,
            options: &mut *self.options,
        };
    }

    /// Capture both stacks.
    fn snapshot(&self) -> Scopes {
        return Scopes {
            functions: self.functions.entries().to_vec(),
            options: self.options.entries().to_vec(),
        };
    }
}

/// Line-by-line reader state for one document.
struct Reader<'a> {
    /// Document lines.
    lines: Vec<&'a str>,
    /// Object store for auto directives.
    objects: &'a Objects,
    /// What has been read so far.
    output: ParsedDocument,
    /// Index of the next unread line.
    position: usize,
}

impl<'a> Reader<'a> {
    /// Record a declaration if `raw` names a path.
    fn declare(&mut self, kind: EntityKind, raw: &str, line: u32, declared_at: Option<String>, metadata: Metadata) {
        let Ok(path) = AttrPath::parse(raw) else {
            self.diagnose(Diagnostic::EmptyPath {
                document: self.output.name.clone(),
                line,
                raw: raw.to_string(),
            });
            return;
        };
        self.output.declarations.push(Declaration {
            declared_at,
            kind,
            line,
            metadata,
            path,
        });
    }

    /// Record a diagnostic and log it.
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(document = %self.output.name, "{}", diagnostic.summary());
        self.output.diagnostics.push(diagnostic);
    }

    /// Report an auto directive whose scope matched nothing.
    fn empty_scope(&mut self, kind: EntityKind, scope: &str, line: u32) {
        self.diagnose(Diagnostic::EmptyScope {
            document: self.output.name.clone(),
            kind,
            line,
            scope: scope.to_string(),
        });
    }

    /// Expand `nix:autofunction`. Nothing is declared unless `registered`.
    fn expand_auto_function(&mut self, name: &str, registered: bool, line: u32) {
        let Some(function) = self.objects.function(name) else {
            self.missing_object(EntityKind::Function, name, line);
            return;
        };
        if !registered {
            return;
        }
        let metadata = Metadata {
            description: function.description.clone(),
            ..Metadata::default()
        };
        let location = function.location.clone();
        self.declare(EntityKind::Function, name, line, location, metadata);
    }

    /// Expand `nix:autolibrary`.
    fn expand_auto_library(&mut self, scope: &str, registered: bool, line: u32) {
        let scope_loc = attrpath::split(scope);
        let names: Vec<String> = self
            .objects
            .functions_in_scope(&scope_loc)
            .into_iter()
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            self.empty_scope(EntityKind::Function, scope, line);
        }
        for name in names {
            self.expand_auto_function(&name, registered, line);
        }
    }

    /// Expand `nix:autooption`. Nothing is declared unless `registered`.
    fn expand_auto_option(&mut self, name: &str, registered: bool, line: u32) {
        let Some(option) = self.objects.option(name) else {
            self.missing_object(EntityKind::Option, name, line);
            return;
        };
        if !registered {
            return;
        }
        let metadata = Metadata {
            default: option.default.clone(),
            description: option.description.clone(),
            example: option.example.clone(),
            read_only: option.read_only,
            typ: option.typ.clone(),
            ..Metadata::default()
        };
        let declared_at = option.declarations.first().cloned();
        self.declare(EntityKind::Option, name, line, declared_at, metadata);
    }

    /// Expand `nix:autopackage`. Nothing is declared unless `registered`.
    fn expand_auto_package(&mut self, name: &str, registered: bool, line: u32) {
        let Some(package) = self.objects.package(name) else {
            self.missing_object(EntityKind::Package, name, line);
            return;
        };
        if !registered {
            return;
        }
        let metadata = Metadata {
            description: Some(package.meta.description.clone()).filter(|d| return !d.is_empty()),
            licenses: package.meta.licenses.iter().map(|l| return l.full_name.clone()).collect(),
            version: package.version.clone(),
            ..Metadata::default()
        };
        let position = package.meta.position.clone();
        self.declare(EntityKind::Package, name, line, position, metadata);
    }

    /// Expand `nix:autopackages`.
    fn expand_auto_packages(&mut self, scope: &str, recursive: bool, registered: bool, line: u32) {
        let scope_loc = attrpath::split(scope);
        let names: Vec<String> = self
            .objects
            .packages_in_scope(&scope_loc, recursive)
            .into_iter()
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            self.empty_scope(EntityKind::Package, scope, line);
        }
        for name in names {
            self.expand_auto_package(&name, registered, line);
        }
    }

    /// One-based number of the line at `index`.
    fn line_number(index: usize) -> u32 {
        return u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX);
    }

    /// Report an auto directive naming an unknown object.
    fn missing_object(&mut self, kind: EntityKind, name: &str, line: u32) {
        self.diagnose(Diagnostic::MissingObject {
            document: self.output.name.clone(),
            kind,
            line,
            name: name.to_string(),
        });
    }

    /// Read the next line, if any.
    fn next_line(&mut self) -> Option<(u32, &'a str)> {
        let line = *self.lines.get(self.position)?;
        let number = Self::line_number(self.position);
        self.position = self.position.saturating_add(1);
        return Some((number, line));
    }

    /// Read lines until `closer` (or end of input at top level).
    fn read_body(&mut self, mut stacks: Stacks<'_>, closer: Option<Fence>) {
        while let Some((number, line)) = self.next_line() {
            if let Some(captures) = CLOSING_FENCE.captures(line) {
                let marker = captures.get(1).map_or("", |m| return m.as_str());
                if closer.is_some_and(|fence| return fence.is_closed_by(marker)) {
                    return;
                }
                if marker.starts_with('`') {
                    self.skip_literal(Fence::from_marker(marker, number));
                } else {
                    self.diagnose(Diagnostic::ContextImbalance {
                        document: self.output.name.clone(),
                        line: number,
                    });
                }
                continue;
            }

            if let Some(captures) = DIRECTIVE.captures(line) {
                let marker = captures.get(1).map_or("", |m| return m.as_str());
                let name = captures.get(2).map_or("", |m| return m.as_str());
                let argument = captures.get(3).map_or("", |m| return m.as_str());
                let fence = Fence::from_marker(marker, number);
                self.read_directive(stacks.reborrow(), fence, name, argument);
                continue;
            }

            if let Some(captures) = CODE_FENCE.captures(line) {
                let marker = captures.get(1).map_or("", |m| return m.as_str());
                self.skip_literal(Fence::from_marker(marker, number));
                continue;
            }

            self.read_roles(&stacks, line, number);
        }

        if let Some(fence) = closer {
            self.diagnose(Diagnostic::UnclosedDirective {
                document: self.output.name.clone(),
                line: fence.line,
            });
        }
    }

    /// Handle one directive: options, declaration, then its body.
    fn read_directive(&mut self, mut stacks: Stacks<'_>, fence: Fence, name: &str, argument: &str) {
        let Some(kind) = DirectiveKind::from_name(name) else {
            if name.starts_with("nix:") {
                self.diagnose(Diagnostic::UnknownDirective {
                    document: self.output.name.clone(),
                    line: fence.line,
                    name: name.to_string(),
                });
            }
            if LITERAL_DIRECTIVES.contains(&name) {
                self.skip_literal(fence);
            } else {
                self.read_body(stacks, Some(fence));
            }
            return;
        };

        let options = self.read_options(fence.line);
        let registered = !options.has("no-index");
        let declared_at = options.get("declaration").map(str::to_string);
        let metadata = Metadata {
            presentation: Presentation::ALL
                .into_iter()
                .filter(|flag| return options.has(flag.option_name()))
                .collect(),
            read_only: options.has("read-only"),
            typ: options.get("type").map(str::to_string),
            ..Metadata::default()
        };

        match kind {
            DirectiveKind::AutoFunction => self.expand_auto_function(argument, registered, fence.line),
            DirectiveKind::AutoLibrary => self.expand_auto_library(argument, registered, fence.line),
            DirectiveKind::AutoOption => self.expand_auto_option(argument, registered, fence.line),
            DirectiveKind::AutoPackage => self.expand_auto_package(argument, registered, fence.line),
            DirectiveKind::AutoPackages => {
                let recursive = !options.has("no-recursive");
                self.expand_auto_packages(argument, recursive, registered, fence.line);
            },
            DirectiveKind::Function => {
                let full = scoped_name(stacks.functions, argument);
                if registered {
                    self.declare(EntityKind::Function, &full, fence.line, declared_at, metadata);
                }
                let mut scope = stacks.functions.enter(argument);
                let nested = Stacks {
                    functions: &mut *scope,
                    options: &mut *stacks.options,
                };
                self.read_body(nested, Some(fence));
                return;
            },
            DirectiveKind::Option => {
                let full = scoped_name(stacks.options, argument);
                if registered {
                    self.declare(EntityKind::Option, &full, fence.line, declared_at, metadata);
                }
                let mut scope = stacks.options.enter(argument);
                let nested = Stacks {
                    functions: &mut *stacks.functions,
                    options: &mut *scope,
                };
                self.read_body(nested, Some(fence));
                return;
            },
            DirectiveKind::Package => {
                if registered {
                    self.declare(EntityKind::Package, argument, fence.line, declared_at, metadata);
                }
            },
        }

        self.read_body(stacks.reborrow(), Some(fence));
    }

    /// Consume `:name: value` lines directly after a directive opener.
    fn read_options(&mut self, line: u32) -> DirectiveOptions {
        let mut options = DirectiveOptions::default();
        while let Some(captures) = self.lines.get(self.position).copied().and_then(|l| return OPTION_LINE.captures(l)) {
            let key = captures.get(1).map_or("", |m| return m.as_str()).to_string();
            let value = captures.get(2).map_or("", |m| return m.as_str()).to_string();
            if !KNOWN_OPTIONS.contains(&key.as_str()) {
                tracing::warn!(document = %self.output.name, line, option = %key, "unknown directive option");
            }
            options.entries.push((key, value));
            self.position = self.position.saturating_add(1);
        }
        return options;
    }

    /// Record every role on a text line.
    fn read_roles(&mut self, stacks: &Stacks<'_>, line: &str, number: u32) {
        for captures in ROLE.captures_iter(line) {
            let role_name = captures.get(1).map_or("", |m| return m.as_str());
            let content = captures.get(2).map_or("", |m| return m.as_str());

            let Ok(role) = role_name.parse::<Role>() else {
                self.diagnose(Diagnostic::UnknownRole {
                    document: self.output.name.clone(),
                    line: number,
                    name: format!("nix:{role_name}"),
                });
                continue;
            };

            let (title, target) = split_explicit_title(content);
            self.output.references.push(PendingReference {
                line: number,
                role,
                scopes: stacks.snapshot(),
                target: target.to_string(),
                title: title.map(str::to_string),
            });
        }
    }

    /// Skip a literal code block up to its closing fence.
    fn skip_literal(&mut self, fence: Fence) {
        while let Some((_, line)) = self.next_line() {
            let marker = line.trim();
            if !marker.is_empty() && marker.chars().all(|c| return c == fence.character) && fence.is_closed_by(marker) {
                return;
            }
        }
    }
}

/// Read a document: collect declarations, references, and diagnostics.
///
/// `name` is the document name entities are registered under.
pub fn parse_document(name: &str, content: &str, objects: &Objects) -> ParsedDocument {
    let mut reader = Reader {
        lines: content.lines().collect(),
        objects,
        output: ParsedDocument {
            name: name.to_string(),
            ..ParsedDocument::default()
        },
        position: 0,
    };

    let mut context = DocumentContext::new();
    let stacks = Stacks {
        functions: &mut context.functions,
        options: &mut context.options,
    };
    reader.read_body(stacks, None);

    let underflows = context.functions.underflows().saturating_add(context.options.underflows());
    if underflows > 0 || !context.functions.is_empty() || !context.options.is_empty() {
        reader.diagnose(Diagnostic::ContextImbalance {
            document: name.to_string(),
            line: 0,
        });
    }

    return reader.output;
}

/// Full name of a declaration nested in `stack`: the open entries and the signature joined by `.`.
fn scoped_name(stack: &ContextStack, signature: &str) -> String {
    let mut parts: Vec<&str> = stack.entries().iter().map(String::as_str).collect();
    parts.push(signature);
    return parts.join(".");
}

/// Split role content into an optional explicit title and the target.
fn split_explicit_title(content: &str) -> (Option<&str>, &str) {
    let Some(captures) = EXPLICIT_TITLE.captures(content) else {
        return (None, content.trim());
    };
    let title = captures.get(1).map(|m| return m.as_str());
    let target = captures.get(2).map_or(content, |m| return m.as_str());
    return (title, target.trim());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> ParsedDocument {
        return parse_document("doc", content, &Objects::default());
    }

    fn declared(document: &ParsedDocument) -> Vec<(EntityKind, String)> {
        return document
            .declarations
            .iter()
            .map(|d| return (d.kind, d.path.to_string()))
            .collect();
    }

    #[test]
    fn nested_options_join_parent_paths() {
        let document = parse(
            "\
::::{nix:option} services.nginx
:type: submodule

:::{nix:option} enable
:type: boolean
Enables {nix:option}`package`.
:::

:::{nix:option} package
:::
::::

Outside: {nix:option}`services.nginx.enable`.
",
        );

        assert_eq!(declared(&document), vec![
            (EntityKind::Option, "services.nginx".to_string()),
            (EntityKind::Option, "services.nginx.enable".to_string()),
            (EntityKind::Option, "services.nginx.package".to_string()),
        ]);
        assert_eq!(document.declarations.get(1).unwrap().metadata.typ.as_deref(), Some("boolean"));

        let inner = document.references.first().unwrap();
        assert_eq!(inner.target, "package");
        assert_eq!(inner.scopes.options, vec!["services.nginx", "enable"]);
        assert_eq!(inner.line, 6);

        let outer = document.references.get(1).unwrap();
        assert!(outer.scopes.options.is_empty(), "context closed after the directive");
        assert!(document.diagnostics.is_empty(), "{:?}", document.diagnostics);
    }

    #[test]
    fn functions_nest_independently_of_options() {
        let document = parse(
            "\
::::{nix:function} lib.strings
:::{nix:function} concatStrings
{nix:func}`concatMapStrings` and {nix:option}`enable`
:::
::::
",
        );
        assert_eq!(declared(&document), vec![
            (EntityKind::Function, "lib.strings".to_string()),
            (EntityKind::Function, "lib.strings.concatStrings".to_string()),
        ]);
        let reference = document.references.first().unwrap();
        assert_eq!(reference.scopes.functions, vec!["lib.strings", "concatStrings"]);
        assert!(reference.scopes.options.is_empty(), "option context untouched");
    }

    #[test]
    fn packages_do_not_open_a_scope() {
        let document = parse(":::{nix:package} pkgs.hello\n{nix:pkg}`cowsay`\n:::\n");
        assert_eq!(declared(&document), vec![(EntityKind::Package, "pkgs.hello".to_string())]);
        let reference = document.references.first().unwrap();
        assert_eq!(reference.scopes, Scopes::default());
    }

    #[test]
    fn explicit_titles_and_placeholders() {
        let document = parse(
            "See {nix:option}`the home <users.users.<name>.home>` and {nix:option}`users.users.<name>`.\n",
        );
        let first = document.references.first().unwrap();
        assert_eq!(first.title.as_deref(), Some("the home"));
        assert_eq!(first.target, "users.users.<name>.home");

        let second = document.references.get(1).unwrap();
        assert_eq!(second.title, None);
        assert_eq!(second.target, "users.users.<name>");
    }

    #[test]
    fn code_blocks_are_literal() {
        let document = parse(
            "\
```nix
{nix:option}`not.a.reference`
:::{nix:option} not.a.declaration
```
",
        );
        assert!(document.declarations.is_empty(), "no declarations inside code");
        assert!(document.references.is_empty(), "no references inside code");
        assert!(document.diagnostics.is_empty(), "{:?}", document.diagnostics);
    }

    #[test]
    fn no_index_still_opens_scope() {
        let document = parse(
            "\
::::{nix:option} services.foo
:no-index:
:::{nix:option} enable
:::
::::
",
        );
        assert_eq!(declared(&document), vec![(EntityKind::Option, "services.foo.enable".to_string())]);
    }

    #[test]
    fn declaration_option_is_kept() {
        let document = parse(
            ":::{nix:package} pkgs.hello\n:declaration: pkgs/by-name/he/hello/package.nix:3\n:::\n",
        );
        assert_eq!(
            document.declarations.first().unwrap().declared_at.as_deref(),
            Some("pkgs/by-name/he/hello/package.nix:3"),
        );
    }

    #[test]
    fn other_directives_pair_their_fences() {
        let document = parse(
            "\
::::{note}
:::{nix:option} a
:::
::::
{nix:option}`a`
",
        );
        assert_eq!(declared(&document), vec![(EntityKind::Option, "a".to_string())]);
        assert!(document.references.first().unwrap().scopes.options.is_empty(), "closed");
        assert!(document.diagnostics.is_empty(), "{:?}", document.diagnostics);
    }

    #[test]
    fn problems_become_diagnostics() {
        let document = parse(
            "\
:::{nix:module} x
:::
:::
{nix:module}`x`
:::{nix:option} \"\"\"
:::
:::{nix:option} unclosed
",
        );
        let kinds: Vec<&str> = document.diagnostics.iter().map(Diagnostic::code).collect();
        assert_eq!(kinds, vec![
            "unknown-directive",
            "context-imbalance",
            "unknown-role",
            "unclosed-directive",
        ]);
        // `"""` still yields the `""` segment, so it is a valid declaration.
        assert_eq!(declared(&document), vec![
            (EntityKind::Option, "\"\"".to_string()),
            (EntityKind::Option, "unclosed".to_string()),
        ]);
    }

    #[test]
    fn empty_signature_is_reported() {
        let document = parse(":::{nix:package} ...\n:::\n");
        assert!(document.declarations.is_empty(), "nothing to register");
        assert!(matches!(document.diagnostics.first(), Some(Diagnostic::EmptyPath { .. })));
    }

    #[test]
    fn auto_directives_use_the_object_store() {
        let objects = Objects::parse(
            r#"{
                "options": {"services.foo.enable": {"name": "services.foo.enable", "loc": ["services", "foo", "enable"], "type": "boolean", "declarations": ["modules/foo.nix"]}},
                "packages": {
                    "pkgs.a": {"name": "a", "loc": ["pkgs", "a"], "version": "1.0", "meta": {"license": "mit"}},
                    "pkgs.b": {"name": "b", "loc": ["pkgs", "b"], "meta": {}},
                    "pkgs.sub.c": {"name": "c", "loc": ["pkgs", "sub", "c"], "meta": {}}
                },
                "functions": {"lib.id": {"name": "lib.id", "loc": ["lib", "id"], "location": "lib/trivial.nix:10"}}
            }"#,
        )
        .unwrap();
        let document = parse_document(
            "auto",
            "\
:::{nix:autooption} services.foo.enable
:::
:::{nix:autopackages} pkgs
:no-recursive:
:::
:::{nix:autolibrary} lib
:::
:::{nix:autooption} services.missing
:::
:::{nix:autopackages} nothing.here
:::
",
            &objects,
        );

        assert_eq!(declared(&document), vec![
            (EntityKind::Option, "services.foo.enable".to_string()),
            (EntityKind::Package, "pkgs.a".to_string()),
            (EntityKind::Package, "pkgs.b".to_string()),
            (EntityKind::Function, "lib.id".to_string()),
        ]);

        let option = document.declarations.first().unwrap();
        assert_eq!(option.declared_at.as_deref(), Some("modules/foo.nix"));
        assert_eq!(option.metadata.typ.as_deref(), Some("boolean"));
        let package = document.declarations.get(1).unwrap();
        assert_eq!(package.metadata.licenses, vec!["mit"]);

        let kinds: Vec<&str> = document.diagnostics.iter().map(Diagnostic::code).collect();
        assert_eq!(kinds, vec!["missing-object", "empty-scope"]);
    }

    #[test]
    fn no_index_applies_to_auto_directives() {
        let objects = Objects::parse(
            r#"{
                "options": {"services.foo.enable": {"name": "services.foo.enable", "loc": ["services", "foo", "enable"]}},
                "packages": {"pkgs.a": {"name": "a", "loc": ["pkgs", "a"], "meta": {}}},
                "functions": {"lib.id": {"name": "lib.id", "loc": ["lib", "id"]}}
            }"#,
        )
        .unwrap();
        let document = parse_document(
            "auto",
            "\
:::{nix:autopackage} pkgs.a
:no-index:
:::
:::{nix:autopackages} pkgs
:no-index:
:::
:::{nix:autolibrary} lib
:no-index:
:::
:::{nix:autofunction} lib.id
:no-index:
:::
:::{nix:autooption} services.foo.enable
:no-index:
:::
:::{nix:autopackage} pkgs.missing
:no-index:
:::
",
            &objects,
        );

        assert!(document.declarations.is_empty(), "{:?}", declared(&document));
        let kinds: Vec<&str> = document.diagnostics.iter().map(Diagnostic::code).collect();
        assert_eq!(kinds, vec!["missing-object"], "unknown objects are still reported");
    }

    #[test]
    fn literal_directives_are_not_parsed() {
        let document = parse(
            "\
```{code-block} markdown
:::{nix:option} fake.decl
{nix:option}`fake.ref`
:::
```
:::{code} markdown
{nix:pkg}`also.fake`
:::
::::{note}
:::{nix:option} real
:::
::::
",
        );
        assert_eq!(declared(&document), vec![(EntityKind::Option, "real".to_string())]);
        assert!(document.references.is_empty(), "{:?}", document.references);
        assert!(document.diagnostics.is_empty(), "{:?}", document.diagnostics);
    }

    #[test]
    fn presentation_flags_are_recorded() {
        let document = parse(
            "\
:::{nix:option} services.foo.enable
:no-index-entry:
:no-contents-entry:
:no-typesetting:
:short-toc-name:
:::
:::{nix:function} lib.id
:::
",
        );
        assert_eq!(declared(&document).len(), 2, "flags do not affect registration");
        let flagged = &document.declarations.first().unwrap().metadata;
        assert_eq!(flagged.presentation, Presentation::ALL.into_iter().collect());

        let plain = &document.declarations.get(1).unwrap().metadata;
        assert_eq!(*plain, Metadata::default());

        let json = serde_json::to_value(flagged).unwrap();
        assert_eq!(json["presentation"], serde_json::json!([
            "no-contents-entry",
            "no-index-entry",
            "no-typesetting",
            "short-toc-name"
        ]));
    }

    #[test]
    fn fragment_registers_under_document_name() {
        let document = parse(":::{nix:option} a.b\n:::\n");
        let registry = document.fragment();
        let entity = registry.all().into_iter().next().unwrap();
        assert_eq!(entity.origin_document(), "doc");
        assert_eq!(entity.anchor(), "nix-option-a.b");
    }
}
