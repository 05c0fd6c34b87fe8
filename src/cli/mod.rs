//! CLI support for tool-form
//!
//! Provides programmatic access to the `tool-form` commands so they can be
//! embedded in other tools.

mod check;
mod query;
mod render;

pub use check::{CheckOptions, execute_check};
pub use query::{QueryOptions, execute_query};
pub use render::{RenderOptions, RenderOutput, execute_render};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::node::Node;
use crate::resource::FileSystemResolver;
use crate::template::TemplateOptions;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Template error: {0}")]
    Transform(#[from] crate::TransformError),

    #[error("Invalid JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid base URI {0:?}: {1}")]
    BaseUri(String, #[source] url::ParseError),

    #[error("Cannot use {} as a base URI", .0.display())]
    Path(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No input provided. Use --args or pipe JSON to stdin.")]
    NoInput,

    #[error("Result is undefined")]
    Undefined,
}

/// Read and parse a JSON file.
pub fn read_json_file(path: &Path) -> Result<Node, CliError> {
    let text = std::fs::read_to_string(path)?;
    parse_json(&text, &path.display().to_string())
}

/// Parse JSON text, naming `origin` in any error.
pub fn parse_json(text: &str, origin: &str) -> Result<Node, CliError> {
    Node::from_json_str(text).map_err(|source| CliError::Json {
        origin: origin.to_string(),
        source,
    })
}

/// Template options for a template file: relative references resolve
/// against `base_uri`, or against the file itself, and are loaded from disk.
pub fn file_options(path: &Path, base_uri: Option<&str>) -> Result<TemplateOptions, CliError> {
    let base_uri = match base_uri {
        Some(base_uri) => Url::parse(base_uri).map_err(|err| CliError::BaseUri(base_uri.to_string(), err))?,
        None => {
            let path = std::fs::canonicalize(path)?;
            Url::from_file_path(&path).map_err(|()| CliError::Path(path))?
        }
    };
    Ok(TemplateOptions::new()
        .with_base_uri(base_uri)
        .with_resolver(FileSystemResolver))
}
