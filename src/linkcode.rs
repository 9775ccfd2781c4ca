//! Links from declarations to source code.

/// Turns a declaration site into a URL. Supplied by whoever knows where the
/// sources are hosted.
pub trait SourceLinker {
    /// URL for `declaration` (a `file` or `file:line` string), if any.
    fn link(&self, declaration: &str) -> Option<String>;
}

/// A [`SourceLinker`] driven by a URL template such as
/// `https://github.com/NixOS/nixpkgs/blob/master/{path}#L{line}`.
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    /// Template with `{path}` and `{line}` placeholders.
    template: String,
}

impl UrlTemplate {
    /// Wrap a template string.
    pub fn new(template: impl Into<String>) -> Self {
        return Self { template: template.into() };
    }
}

impl SourceLinker for UrlTemplate {
    /// Substitute the declaration's path and line into the template.
    ///
    /// A template without `{line}` still works for `file:line` input; the line
    /// is simply dropped.
    fn link(&self, declaration: &str) -> Option<String> {
        let (path, line) = split_position(declaration);
        if path.is_empty() {
            return None;
        }
        return Some(self.template.replace("{path}", path).replace("{line}", line));
    }
}

/// Split `file:line` into its parts. Input without a numeric suffix has an empty line.
pub fn split_position(declaration: &str) -> (&str, &str) {
    let trimmed = declaration.trim();
    return match trimmed.rsplit_once(':') {
        Some((path, line)) if !line.is_empty() && line.bytes().all(|b| return b.is_ascii_digit()) => {
            (path, line)
        },
        _ => (trimmed, ""),
    };
}
