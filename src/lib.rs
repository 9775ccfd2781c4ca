//! Attribute-path cross-referencing for Nix documentation.
//!
//! Markdown documents declare options, functions, and packages with `nix:`
//! directives and refer to them with `nix:` roles. A build reads every
//! document into a [`registry::Registry`], then resolves each reference
//! against it using the lexical context it was written in.

pub mod attrpath;
pub mod build;
pub mod commands;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod index;
pub mod info;
pub mod linkcode;
pub mod objects;
pub mod ordering;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod types;
