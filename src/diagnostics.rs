//! Diagnostics and error rendering.
//!
//! Everything is rendered as markdown: a `#` heading saying what happened,
//! then detail sections. Headings are printed bold on a terminal.

use std::fmt::Write as _;

use serde::Serialize;

use crate::attrpath;
use crate::error::Error;
use crate::types::{EntityKind, Unresolved};

/// ANSI bold.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// A non-fatal problem found in a document. The build records it and continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "code")]
pub enum Diagnostic {
    /// A closing fence with no open directive, or a context left open at the end.
    ContextImbalance {
        /// Document name.
        document: String,
        /// One-based line, 0 when detected at end of document.
        line: u32,
    },
    /// A directive argument that contains no path segment.
    EmptyPath {
        /// Document name.
        document: String,
        /// One-based line.
        line: u32,
        /// The argument as written.
        raw: String,
    },
    /// An auto directive whose scope matched no object.
    EmptyScope {
        /// Document name.
        document: String,
        /// Kind the directive expands to.
        kind: EntityKind,
        /// One-based line.
        line: u32,
        /// The scope as written.
        scope: String,
    },
    /// An auto directive naming an object the store does not have.
    MissingObject {
        /// Document name.
        document: String,
        /// Kind the directive expands to.
        kind: EntityKind,
        /// One-based line.
        line: u32,
        /// The object name as written.
        name: String,
    },
    /// A directive still open at the end of the document.
    UnclosedDirective {
        /// Document name.
        document: String,
        /// One-based line of the opener.
        line: u32,
    },
    /// A `nix:` directive that does not exist.
    UnknownDirective {
        /// Document name.
        document: String,
        /// One-based line.
        line: u32,
        /// Directive name as written.
        name: String,
    },
    /// A `nix:` role that does not exist.
    UnknownRole {
        /// Document name.
        document: String,
        /// One-based line.
        line: u32,
        /// Role name as written.
        name: String,
    },
    /// A reference that matched no entity.
    UnresolvedReference {
        /// Document name.
        document: String,
        /// One-based line.
        line: u32,
        /// What was tried.
        reference: Unresolved,
        /// A registered path with the same final segment, if any.
        suggestion: Option<String>,
    },
}

impl Diagnostic {
    /// Stable kebab-case identifier, as used in JSON output.
    pub const fn code(&self) -> &'static str {
        return match *self {
            Self::ContextImbalance { .. } => "context-imbalance",
            Self::EmptyPath { .. } => "empty-path",
            Self::EmptyScope { .. } => "empty-scope",
            Self::MissingObject { .. } => "missing-object",
            Self::UnclosedDirective { .. } => "unclosed-directive",
            Self::UnknownDirective { .. } => "unknown-directive",
            Self::UnknownRole { .. } => "unknown-role",
            Self::UnresolvedReference { .. } => "unresolved-reference",
        };
    }

    /// Document the diagnostic belongs to.
    pub fn document(&self) -> &str {
        return match self {
            Self::ContextImbalance { document, .. }
            | Self::EmptyPath { document, .. }
            | Self::EmptyScope { document, .. }
            | Self::MissingObject { document, .. }
            | Self::UnclosedDirective { document, .. }
            | Self::UnknownDirective { document, .. }
            | Self::UnknownRole { document, .. }
            | Self::UnresolvedReference { document, .. } => document,
        };
    }

    /// One-based line, or 0 when the problem has no single line.
    pub const fn line(&self) -> u32 {
        return match *self {
            Self::ContextImbalance { line, .. }
            | Self::EmptyPath { line, .. }
            | Self::EmptyScope { line, .. }
            | Self::MissingObject { line, .. }
            | Self::UnclosedDirective { line, .. }
            | Self::UnknownDirective { line, .. }
            | Self::UnknownRole { line, .. }
            | Self::UnresolvedReference { line, .. } => line,
        };
    }

    /// Markdown block: location heading, what happened, and how to fix it.
    pub fn render(&self) -> String {
        let mut out = format!("# {}: {}\n\n", self.location(), self.summary());
        match self {
            Self::ContextImbalance { .. } => {
                out.push_str("A closing fence does not match any open directive.\n");
            },
            Self::EmptyPath { raw, .. } => {
                let _ = writeln!(out, "`{raw}` contains no attribute. Quote segments that are not identifiers.");
            },
            Self::EmptyScope { kind, scope, .. } => {
                let _ = writeln!(out, "No {} in the object store lives under `{scope}`.", kind.human_name());
            },
            Self::MissingObject { kind, name, .. } => {
                let _ = writeln!(out, "The object store has no {} named `{name}`.", kind.human_name());
                out.push_str("\n## Fix\n\nCheck the `objects` files listed in `nixdomain.toml`.\n");
            },
            Self::UnclosedDirective { .. } => {
                out.push_str("Add a closing fence at least as long as the opening one.\n");
            },
            Self::UnknownDirective { name, .. } | Self::UnknownRole { name, .. } => {
                let _ = writeln!(out, "`{name}` is not part of the `nix` domain.");
            },
            Self::UnresolvedReference { reference, suggestion, .. } => {
                render_unresolved(&mut out, reference, suggestion.as_deref());
            },
        }
        return out;
    }

    /// One-line description.
    pub fn summary(&self) -> String {
        return match self {
            Self::ContextImbalance { .. } => "unbalanced directive fences".to_string(),
            Self::EmptyPath { raw, .. } => format!("empty attribute path `{raw}`"),
            Self::EmptyScope { kind, scope, .. } => format!("no {} under `{scope}`", kind.human_name()),
            Self::MissingObject { kind, name, .. } => format!("unknown {} `{name}`", kind.human_name()),
            Self::UnclosedDirective { .. } => "directive is never closed".to_string(),
            Self::UnknownDirective { name, .. } => format!("unknown directive `{name}`"),
            Self::UnknownRole { name, .. } => format!("unknown role `{name}`"),
            Self::UnresolvedReference { reference, .. } => {
                format!("unresolved {} reference `{}`", reference.role, reference.target)
            },
        };
    }

    /// `document:line`, or just the document when there is no line.
    fn location(&self) -> String {
        if self.line() == 0 {
            return self.document().to_string();
        }
        return format!("{}:{}", self.document(), self.line());
    }
}

/// Find a known path whose final segment matches the target's.
///
/// Catches references written from the wrong context or with a wrong
/// prefix. Returns `None` when the target has no segment.
pub fn find_closest_suggestion<'a, I>(target: &str, known: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let segments = attrpath::split(target);
    let last = segments.last()?;
    return known
        .into_iter()
        .find(|candidate| return attrpath::split(candidate).last() == Some(last))
        .map(str::to_string);
}

/// Print a diagnostic to stderr.
pub fn print_diagnostic(diagnostic: &Diagnostic) {
    print_markdown(&diagnostic.render());
}

/// Render an error as markdown and print it to stderr.
pub fn print_error(e: &Error) {
    print_markdown(&render_error(e));
}

/// Print markdown to stderr with bold headings.
fn print_markdown(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render a fatal error as a markdown block with a fix where one is known.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::EmptyPath { raw } => format!(
            "\
# Error: Empty Path

`{raw}` contains no attribute.
"
        ),
        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),
        Error::ObjectsCorrupt { path, reason } => format!(
            "\
# Error: Object Store Corrupt

Could not read `{}`: {reason}

## Fix

Regenerate the object description, e.g. with `nixos-render-docs` or
`nix-instantiate --eval --json`.
",
            path.display()
        ),
        Error::ObjectsNotFound { path } => format!(
            "\
# Error: Object Store Not Found

`{}` does not exist.

## Fix

Check the `objects` list in `nixdomain.toml`.
",
            path.display()
        ),
        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}
"
        ),
        Error::UnknownKind { name } => format!(
            "\
# Error: Unknown Kind

`{name}` is not one of `option`, `package`, `function`.
"
        ),
        Error::UnknownRole { name } => format!(
            "\
# Error: Unknown Role

`{name}` is not one of `option`, `func`, `pkg`, `bind`, `obj`.
"
        ),
    };
}

/// Body of an unresolved-reference diagnostic.
fn render_unresolved(out: &mut String, reference: &Unresolved, suggestion: Option<&str>) {
    if reference.candidates.is_empty() {
        out.push_str("The target contains no attribute.\n");
        return;
    }

    out.push_str("## Tried\n\n");
    for candidate in &reference.candidates {
        let _ = writeln!(out, "- `{candidate}`");
    }

    if let Some(suggestion) = suggestion {
        let _ = write!(out, "\n## Did you mean `{suggestion}`?\n\n");
        let _ = writeln!(out, "    {{nix:{}}}`{suggestion}`", reference.role);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn unresolved(suggestion: Option<&str>) -> Diagnostic {
        return Diagnostic::UnresolvedReference {
            document: "services/nginx".to_string(),
            line: 12,
            reference: Unresolved {
                candidates: vec!["services.nginx.enabel".to_string(), "enabel".to_string()],
                role: Role::Option,
                target: "enabel".to_string(),
            },
            suggestion: suggestion.map(str::to_string),
        };
    }

    #[test]
    fn unresolved_reference_lists_candidates_and_suggestion() {
        let md = unresolved(Some("services.nginx.enable")).render();
        assert!(md.starts_with("# services/nginx:12: unresolved option reference `enabel`"), "{md}");
        assert!(md.contains("- `services.nginx.enabel`"), "{md}");
        assert!(md.contains("## Did you mean `services.nginx.enable`?"), "{md}");
        assert!(md.contains("{nix:option}`services.nginx.enable`"), "{md}");
    }

    #[test]
    fn no_suggestion_section_without_match() {
        let md = unresolved(None).render();
        assert!(!md.contains("Did you mean"), "{md}");
    }

    #[test]
    fn suggestion_matches_final_segment() {
        let known = ["services.nginx.package", "services.nginx.enable"];
        assert_eq!(
            find_closest_suggestion("nginx.enable", known).as_deref(),
            Some("services.nginx.enable"),
        );
        assert_eq!(find_closest_suggestion("missing", known), None);
        assert_eq!(find_closest_suggestion("...", known), None);
    }

    #[test]
    fn location_omits_zero_line() {
        let diagnostic = Diagnostic::ContextImbalance {
            document: "index".to_string(),
            line: 0,
        };
        assert!(diagnostic.render().starts_with("# index: unbalanced"), "{}", diagnostic.render());
    }

    #[test]
    fn json_carries_code_tag() {
        let diagnostic = Diagnostic::MissingObject {
            document: "pkgs".to_string(),
            kind: EntityKind::Package,
            line: 3,
            name: "pkgs.nope".to_string(),
        };
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["code"], "missing-object");
        assert_eq!(json["kind"], "package");
        assert_eq!(diagnostic.code(), "missing-object");
    }

    #[test]
    fn errors_render_with_fix() {
        let md = render_error(&Error::ObjectsNotFound {
            path: "objects.json".into(),
        });
        assert!(md.starts_with("# Error: Object Store Not Found"), "{md}");
        assert!(md.contains("## Fix"), "{md}");
    }
}
