//! Transform templates against JSON arguments

use std::path::PathBuf;

use indexmap::IndexMap;

use super::{CliError, file_options, parse_json, read_json_file};
use crate::node::{Node, PayloadValue};
use crate::output::JsonPrinter;
use crate::template::Template;

/// Options for the render command
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Path to the template file
    pub template: PathBuf,
    /// Query argument as JSON text; `null` when absent
    pub args: Option<String>,
    /// Base URI overriding the template's file URI
    pub base_uri: Option<String>,
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Write encoded payloads as their raw content instead of JSON
    pub raw: bool,
}

/// Rendered template output.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub body: Vec<u8>,
    /// Payload headers; empty for plain JSON output
    pub headers: IndexMap<String, String>,
}

/// Render a template.
///
/// Encoded results keep their headers. With `raw` set they are written as
/// their content; otherwise every result is written as JSON.
pub fn execute_render(options: &RenderOptions) -> Result<RenderOutput, CliError> {
    let node = read_json_file(&options.template)?;
    let args = match &options.args {
        Some(args) => parse_json(args, "args")?,
        None => Node::Null,
    };

    let template_options = file_options(&options.template, options.base_uri.as_deref())?;
    let mut template = Template::parse_with(node, template_options)?;
    let result = template.transform_node(&args)?;

    match result {
        Node::Payload(payload) if options.raw => {
            let body = match payload.value {
                PayloadValue::Text(text) => text.into_bytes(),
                PayloadValue::Bytes(bytes) => bytes,
            };
            Ok(RenderOutput {
                body,
                headers: payload.headers,
            })
        }
        Node::Payload(payload) => Ok(RenderOutput {
            body: print(&payload.to_node(), options.pretty)?,
            headers: payload.headers,
        }),
        node => Ok(RenderOutput {
            body: print(&node, options.pretty)?,
            headers: IndexMap::new(),
        }),
    }
}

fn print(node: &Node, pretty: bool) -> Result<Vec<u8>, CliError> {
    let indent = if pretty { 2 } else { 0 };
    JsonPrinter::new(indent)
        .print(node)
        .map(String::into_bytes)
        .ok_or(CliError::Undefined)
}
