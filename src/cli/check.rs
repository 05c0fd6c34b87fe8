//! Parse templates without transforming them

use std::path::PathBuf;

use tracing::debug;

use super::{CliError, file_options, read_json_file};
use crate::template::Template;

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Path to the template file
    pub template: PathBuf,
    /// Base URI overriding the template's file URI
    pub base_uri: Option<String>,
}

/// Parse a template and everything it statically includes.
///
/// Succeeds when the template's directives are well formed and every
/// static `$include` and schema reference can be loaded.
pub fn execute_check(options: &CheckOptions) -> Result<(), CliError> {
    let node = read_json_file(&options.template)?;
    let template_options = file_options(&options.template, options.base_uri.as_deref())?;
    Template::parse_with(node, template_options)?;
    debug!(template = %options.template.display(), "template is valid");
    Ok(())
}
