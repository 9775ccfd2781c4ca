//! CLI commands: build, index, resolve, split.

use std::fmt::Write as _;
use std::path::Path;
use std::process::ExitCode;

use crate::attrpath::AttrPath;
use crate::build::{self, BuildReport};
use crate::config::Config;
use crate::context::Scopes;
use crate::diagnostics;
use crate::error::Error;
use crate::index::{self, IndexGroup};
use crate::linkcode::{SourceLinker, UrlTemplate};
use crate::objects::Objects;
use crate::resolver::Resolver;
use crate::scanner::{self, SourceDocument};
use crate::types::{EntityKind, Role};

/// Config, object store, and documents of one project.
struct Project {
    /// Loaded configuration.
    config: Config,
    /// Documents to read.
    documents: Vec<SourceDocument>,
    /// Merged object store.
    objects: Objects,
}

impl Project {
    /// Load everything under `root`.
    ///
    /// # Errors
    ///
    /// Returns config, object store, or scan errors.
    fn load(root: &Path) -> Result<Self, Error> {
        let config = Config::load(root)?;
        let objects = Objects::load(&config.object_files(root))?;
        let documents = scanner::scan(root, &config)?;
        return Ok(Self {
            config,
            documents,
            objects,
        });
    }
}

/// View a URL template as a source linker.
fn as_linker(template: &UrlTemplate) -> &dyn SourceLinker {
    return template;
}

/// Read and resolve every document, then report.
///
/// # Errors
///
/// Returns errors from loading the project.
pub fn build(root: &Path, json: bool, strict: bool) -> Result<ExitCode, Error> {
    let project = Project::load(root)?;
    let template = project.config.linker();
    let linker = template.as_ref().map(as_linker);
    let report = build::build(&project.documents, &project.objects, linker);

    if json {
        // serde_json::to_string_pretty won't fail on this structure.
        let out = serde_json::to_string_pretty(&report).unwrap_or_default();
        println!("{out}");
    } else {
        for diagnostic in &report.diagnostics {
            diagnostics::print_diagnostic(diagnostic);
            eprintln!();
        }
        println!("{}", summary(&report));
    }

    if strict && !report.diagnostics.is_empty() {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Print index groups: every index, or just the one for `kind`.
///
/// # Errors
///
/// Returns errors from loading the project.
pub fn index(root: &Path, kind: Option<EntityKind>, json: bool) -> Result<ExitCode, Error> {
    let project = Project::load(root)?;
    let pass = build::read_documents(&project.documents, &project.objects);

    let indices: Vec<(&str, Vec<IndexGroup>)> = match kind {
        Some(kind) => vec![(kind.name(), index::kind_index(&pass.registry, kind))],
        None => vec![
            ("options", index::options_index(&pass.registry)),
            ("library", index::library_index(&pass.registry)),
        ],
    };

    if json {
        let map: serde_json::Map<String, serde_json::Value> = indices
            .iter()
            .map(|(name, groups)| {
                return (name.to_string(), serde_json::to_value(groups).unwrap_or_default());
            })
            .collect();
        let out = serde_json::to_string_pretty(&map).unwrap_or_default();
        println!("{out}");
    } else {
        print!("{}", render_indices(&indices));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Markdown listing of index groups.
fn render_indices(indices: &[(&str, Vec<IndexGroup>)]) -> String {
    let mut out = String::new();
    for (name, groups) in indices {
        let _ = writeln!(out, "# {name}\n");
        if groups.is_empty() {
            out.push_str("(empty)\n\n");
            continue;
        }
        for group in groups {
            let _ = writeln!(out, "## {}\n", group.letter);
            for entry in &group.entries {
                let _ = writeln!(out, "- `{}` {}#{}", entry.path, entry.document, entry.anchor);
            }
            out.push('\n');
        }
    }
    return out;
}

/// Resolve one reference against the project's registry.
///
/// Prints `document#anchor` on success; otherwise the tried candidates,
/// with exit code 1.
///
/// # Errors
///
/// Returns errors from loading the project.
pub fn resolve(
    root: &Path,
    target: &str,
    role: Role,
    option_context: Vec<String>,
    function_context: Vec<String>,
) -> Result<ExitCode, Error> {
    let project = Project::load(root)?;
    let pass = build::read_documents(&project.documents, &project.objects);
    let resolver = Resolver::new(&pass.registry);
    let scopes = Scopes {
        functions: function_context,
        options: option_context,
    };

    return match resolver.resolve_role(role, target, &scopes) {
        Ok(entity) => {
            println!("{}#{}", entity.origin_document(), entity.anchor());
            Ok(ExitCode::SUCCESS)
        },
        Err(unresolved) => {
            println!("unresolved {} reference `{}`", unresolved.role, unresolved.target);
            for candidate in &unresolved.candidates {
                println!("  tried {candidate}");
            }
            Ok(ExitCode::from(1))
        },
    };
}

/// Print the segments of `path`, one per line.
///
/// # Errors
///
/// Returns `Error::EmptyPath` when `path` has no segment.
pub fn split(path: &str) -> Result<ExitCode, Error> {
    let parsed = AttrPath::parse(path)?;
    for segment in parsed.segments() {
        println!("{segment}");
    }
    return Ok(ExitCode::SUCCESS);
}

/// One-line build summary.
fn summary(report: &BuildReport) -> String {
    return format!(
        "{} entities, {} links, {} diagnostics ({} unresolved)",
        report.entities.len(),
        report.links.len(),
        report.diagnostics.len(),
        report.unresolved_count(),
    );
}
