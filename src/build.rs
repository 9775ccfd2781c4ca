//! The two-pass build.
//!
//! Pass 1 reads every document into its own registry fragment and merges the
//! fragments. Pass 2 resolves every reference against the merged registry.
//! Nothing resolves during pass 1, so forward references across documents
//! work and the result does not depend on document order.

use serde::Serialize;

use crate::diagnostics::{self, Diagnostic};
use crate::document::{self, Metadata, ParsedDocument, PendingReference};
use crate::index::{self, IndexGroup};
use crate::linkcode::SourceLinker;
use crate::objects::Objects;
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::scanner::SourceDocument;
use crate::types::{EntityKind, LinkTarget, Role};

/// Everything a build produced.
#[derive(Debug, Serialize)]
pub struct BuildReport {
    /// Problems found in either pass.
    pub diagnostics: Vec<Diagnostic>,
    /// Every declaration, in document order.
    pub entities: Vec<EntityReport>,
    /// Functions and packages index.
    pub library_index: Vec<IndexGroup>,
    /// Resolved references.
    pub links: Vec<ResolvedLink>,
    /// Options index.
    pub options_index: Vec<IndexGroup>,
}

impl BuildReport {
    /// Number of references that did not resolve.
    pub fn unresolved_count(&self) -> usize {
        return self
            .diagnostics
            .iter()
            .filter(|d| return matches!(d, Diagnostic::UnresolvedReference { .. }))
            .count();
    }
}

/// A declared entity as presented in the report.
#[derive(Debug, Serialize)]
pub struct EntityReport {
    /// Anchor inside the document.
    pub anchor: String,
    /// Declaration site, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_at: Option<String>,
    /// Declaring document.
    pub document: String,
    /// Kind of the entity.
    pub kind: EntityKind,
    /// One-based line of the directive.
    pub line: u32,
    /// Presentation metadata.
    pub metadata: Metadata,
    /// Full path as text.
    pub path: String,
    /// Link to the declaration site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Result of pass 1.
#[derive(Debug, Default)]
pub struct ReadPass {
    /// Parsed documents, sorted by name.
    pub documents: Vec<ParsedDocument>,
    /// Merged registry.
    pub registry: Registry,
}

/// A reference and where it points.
#[derive(Debug, Serialize)]
pub struct ResolvedLink {
    /// Referencing document.
    pub document: String,
    /// One-based line.
    pub line: u32,
    /// Role the reference was written with.
    pub role: Role,
    /// Target as written.
    pub target: String,
    /// Link text: the explicit title, or the target.
    pub text: String,
    /// Resolved destination.
    pub to: LinkTarget,
}

/// Run both passes.
pub fn build(sources: &[SourceDocument], objects: &Objects, linker: Option<&dyn SourceLinker>) -> BuildReport {
    let pass = read_documents(sources, objects);
    let resolver = Resolver::new(&pass.registry);

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut entities: Vec<EntityReport> = Vec::new();
    let mut links: Vec<ResolvedLink> = Vec::new();

    for parsed in &pass.documents {
        diagnostics.extend(parsed.diagnostics.iter().cloned());

        for declaration in &parsed.declarations {
            let source_url = declaration
                .declared_at
                .as_deref()
                .and_then(|site| return linker.and_then(|l| return l.link(site)));
            entities.push(EntityReport {
                anchor: declaration.kind.anchor_for(&declaration.path),
                declared_at: declaration.declared_at.clone(),
                document: parsed.name.clone(),
                kind: declaration.kind,
                line: declaration.line,
                metadata: declaration.metadata.clone(),
                path: declaration.path.to_string(),
                source_url,
            });
        }

        for reference in &parsed.references {
            match resolve_reference(&resolver, &pass.registry, &parsed.name, reference) {
                Ok(link) => links.push(link),
                Err(diagnostic) => {
                    tracing::warn!(document = %parsed.name, "{}", diagnostic.summary());
                    diagnostics.push(diagnostic);
                },
            }
        }
    }

    tracing::info!(
        entities = entities.len(),
        links = links.len(),
        diagnostics = diagnostics.len(),
        "build finished"
    );

    return BuildReport {
        diagnostics,
        entities,
        library_index: index::library_index(&pass.registry),
        links,
        options_index: index::options_index(&pass.registry),
    };
}

/// Pass 1: parse every document and merge the registry fragments.
///
/// Documents are processed in name order whatever order they are given in.
pub fn read_documents(sources: &[SourceDocument], objects: &Objects) -> ReadPass {
    let mut ordered: Vec<&SourceDocument> = sources.iter().collect();
    ordered.sort_by(|a, b| return a.name.cmp(&b.name));

    let mut pass = ReadPass::default();
    pass.registry.reset();
    for source in ordered {
        let parsed = document::parse_document(&source.name, &source.content, objects);
        tracing::debug!(
            document = %source.name,
            declarations = parsed.declarations.len(),
            references = parsed.references.len(),
            "read document"
        );
        pass.registry.merge(parsed.fragment());
        pass.documents.push(parsed);
    }

    tracing::info!(
        documents = pass.documents.len(),
        entities = pass.registry.len(),
        "read pass finished"
    );
    return pass;
}

/// Pass 2 for one reference.
///
/// # Errors
///
/// Returns an `UnresolvedReference` diagnostic, with a suggestion when a
/// registered path of an accepted kind shares the target's final segment.
fn resolve_reference(
    resolver: &Resolver<'_>,
    registry: &Registry,
    document: &str,
    reference: &PendingReference,
) -> Result<ResolvedLink, Diagnostic> {
    return match resolver.resolve_role(reference.role, &reference.target, &reference.scopes) {
        Ok(entity) => Ok(ResolvedLink {
            document: document.to_string(),
            line: reference.line,
            role: reference.role,
            target: reference.target.clone(),
            text: reference.title.clone().unwrap_or_else(|| return reference.target.clone()),
            to: entity.link(),
        }),
        Err(unresolved) => {
            let known: Vec<String> = reference
                .role
                .kinds()
                .iter()
                .flat_map(|kind| return registry.sorted(*kind))
                .map(|entity| return entity.path().to_string())
                .collect();
            let suggestion = diagnostics::find_closest_suggestion(&reference.target, known.iter().map(String::as_str));
            Err(Diagnostic::UnresolvedReference {
                document: document.to_string(),
                line: reference.line,
                reference: unresolved,
                suggestion,
            })
        },
    };
}
