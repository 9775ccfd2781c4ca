use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::linkcode::UrlTemplate;

/// File name of the project configuration, looked up in the project root.
pub const CONFIG_FILE: &str = "nixdomain.toml";

/// Project configuration loaded from `nixdomain.toml`.
/// Include/exclude patterns are path prefixes applied to markdown documents.
#[derive(Debug, Default)]
pub struct Config {
    /// Skip documents whose relative path starts with any of these.
    exclude: Vec<String>,
    /// Only scan documents whose relative path starts with one of these.
    include: Vec<String>,
    /// Source-link URL template.
    linkcode_url: Option<String>,
    /// Object-store JSON files, relative to the root.
    objects: Vec<PathBuf>,
}

/// Raw TOML structure for `nixdomain.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct NixdomainTomlConfig {
    /// See [`Config::exclude`].
    #[serde(default)]
    exclude: Vec<String>,
    /// See [`Config::include`].
    #[serde(default)]
    include: Vec<String>,
    /// See [`Config::linkcode_url`].
    #[serde(default)]
    linkcode_url: Option<String>,
    /// See [`Config::objects`].
    #[serde(default)]
    objects: Vec<PathBuf>,
}

impl Config {
    /// Source linker built from `linkcode_url`, if configured.
    pub fn linker(&self) -> Option<UrlTemplate> {
        return self.linkcode_url.as_deref().map(UrlTemplate::new);
    }

    /// Load config from `nixdomain.toml` in the given root directory.
    /// Returns a default that scans everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Object-store files resolved against `root`.
    pub fn object_files(&self, root: &Path) -> Vec<PathBuf> {
        return self.objects.iter().map(|p| return root.join(p)).collect();
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: NixdomainTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            linkcode_url: raw.linkcode_url,
            objects: raw.objects,
        });
    }

    /// Check whether a markdown document path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}
