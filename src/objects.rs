//! Read-only object store: option, package, and function metadata
//! produced outside this crate as JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::attrpath::segments_within_scope;
use crate::error::Error;

/// A library function as described by the object store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FunctionDoc {
    /// Markdown description.
    pub description: Option<String>,
    /// Attribute path segments.
    pub loc: Vec<String>,
    /// Declaration site, `file:line`.
    pub location: Option<String>,
    /// Full dotted name.
    pub name: String,
}

/// All known objects, keyed by full dotted name.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Objects {
    /// Library functions.
    pub functions: BTreeMap<String, FunctionDoc>,
    /// Module options.
    pub options: BTreeMap<String, OptionDoc>,
    /// Packages.
    pub packages: BTreeMap<String, Package>,
}

impl Objects {
    /// Add every object of `other`; entries with the same name are replaced.
    pub fn extend(&mut self, other: Self) {
        self.functions.extend(other.functions);
        self.options.extend(other.options);
        self.packages.extend(other.packages);
    }

    /// Look up a function by full name.
    pub fn function(&self, name: &str) -> Option<&FunctionDoc> {
        return self.functions.get(name);
    }

    /// Names of the functions under `scope`, at any depth, in name order.
    pub fn functions_in_scope(&self, scope: &[String]) -> Vec<&str> {
        return self
            .functions
            .iter()
            .filter(|(_, function)| return segments_within_scope(&function.loc, scope, true))
            .map(|(name, _)| return name.as_str())
            .collect();
    }

    /// Load and merge object files in order.
    ///
    /// # Errors
    ///
    /// Returns `Error::ObjectsNotFound` if a file is missing, `Error::Io` for
    /// other read failures, or `Error::ObjectsCorrupt` if a file is not a
    /// valid object description.
    pub fn load(paths: &[PathBuf]) -> Result<Self, Error> {
        let mut objects = Self::default();
        for path in paths {
            tracing::info!(path = %path.display(), "loading Nix objects");
            let loaded = Self::load_file(path)?;
            tracing::info!(
                options = loaded.options.len(),
                packages = loaded.packages.len(),
                functions = loaded.functions.len(),
                "loaded Nix objects"
            );
            objects.extend(loaded);
        }
        return Ok(objects);
    }

    /// Look up an option by full name.
    pub fn option(&self, name: &str) -> Option<&OptionDoc> {
        return self.options.get(name);
    }

    /// Look up a package by full name.
    pub fn package(&self, name: &str) -> Option<&Package> {
        return self.packages.get(name);
    }

    /// Names of the packages under `scope`, in name order.
    ///
    /// Non-recursive scopes only include direct children.
    pub fn packages_in_scope(&self, scope: &[String], recursive: bool) -> Vec<&str> {
        return self
            .packages
            .iter()
            .filter(|(_, package)| return segments_within_scope(&package.loc, scope, recursive))
            .map(|(name, _)| return name.as_str())
            .collect();
    }

    /// Parse object-store JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error message on invalid input.
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        return serde_json::from_str(content);
    }

    /// Read and parse one file.
    ///
    /// # Errors
    ///
    /// See [`Objects::load`].
    fn load_file(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ObjectsNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content).map_err(|e| {
            return Error::ObjectsCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
        });
    }
}

/// A module option as described by the object store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OptionDoc {
    /// Files declaring the option.
    pub declarations: Vec<String>,
    /// Default value, as Nix source.
    pub default: Option<String>,
    /// Markdown description.
    pub description: Option<String>,
    /// Example value, as Nix source.
    pub example: Option<String>,
    /// Internal options are hidden from generated manuals.
    pub internal: bool,
    /// Attribute path segments.
    pub loc: Vec<String>,
    /// Full dotted name.
    pub name: String,
    /// Whether the option can only be read.
    pub read_only: bool,
    /// Markdown list of related packages.
    pub related_packages: Option<String>,
    /// Human-readable type, e.g. `boolean`.
    #[serde(rename = "type")]
    pub typ: Option<String>,
    /// Visibility flag from the module system.
    pub visible: bool,
}

/// A package as described by the object store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Package {
    /// Attribute path segments.
    pub loc: Vec<String>,
    /// `meta` attribute set.
    pub meta: PackageMeta,
    /// Package name (`pname`).
    pub name: String,
    /// Package version.
    pub version: Option<String>,
}

/// One license of a package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackageLicense {
    /// SPDX-ish full name.
    #[serde(rename = "fullName")]
    pub full_name: String,
    /// License text URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// A package maintainer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageMaintainer {
    /// Email address.
    pub email: Option<String>,
    /// GitHub handle.
    pub github: Option<String>,
    /// Matrix handle.
    pub matrix: Option<String>,
    /// Display name.
    pub name: String,
}

/// Package `meta` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageMeta {
    /// Known to be broken.
    pub broken: bool,
    /// Changelog URL.
    pub changelog: Option<String>,
    /// One-line description.
    pub description: String,
    /// Download page URL.
    #[serde(rename = "downloadPage")]
    pub download_page: Option<String>,
    /// Homepage URL.
    pub homepage: Option<String>,
    /// Has known vulnerabilities.
    pub insecure: bool,
    /// Licenses. The JSON may hold a string, an object, or a list of either.
    #[serde(rename = "license", deserialize_with = "deserialize_licenses")]
    pub licenses: Vec<PackageLicense>,
    /// Long markdown description.
    #[serde(rename = "longDescription")]
    pub long_description: String,
    /// Maintainers.
    pub maintainers: Vec<PackageMaintainer>,
    /// Declaration site, `file:line`.
    pub position: Option<String>,
    /// Not free software.
    pub unfree: bool,
}

/// The shapes a `meta.license` value can take.
#[derive(Deserialize)]
#[serde(untagged)]
enum LicenseField {
    /// A list of licenses.
    Many(Vec<LicenseValue>),
    /// A single license.
    One(LicenseValue),
}

/// One license, either by name or as a full record.
#[derive(Deserialize)]
#[serde(untagged)]
enum LicenseValue {
    /// Full record.
    Full(PackageLicense),
    /// Bare name.
    Name(String),
}

impl LicenseValue {
    /// Normalize to a full record.
    fn into_license(self) -> PackageLicense {
        return match self {
            Self::Full(license) => license,
            Self::Name(full_name) => PackageLicense { full_name, url: None },
        };
    }
}

/// Normalize `meta.license` into a list of full records.
///
/// # Errors
///
/// Returns a deserialization error if the value matches none of the shapes.
fn deserialize_licenses<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<PackageLicense>, D::Error> {
    let field = LicenseField::deserialize(deserializer)?;
    return Ok(match field {
        LicenseField::Many(values) => values.into_iter().map(LicenseValue::into_license).collect(),
        LicenseField::One(value) => vec![value.into_license()],
    });
}
