pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod context;
pub mod directive;
pub mod encoding;
pub mod error;
pub mod evaluate;
pub mod evaluator;
pub mod frame;
pub mod interpolate;
pub mod lexer;
pub mod node;
pub mod order;
pub mod output;
pub mod parse;
pub mod parser;
pub mod process;
pub mod resource;
pub mod schema;
pub mod template;
pub mod transform;
pub mod uri_template;

pub use ast::{Query, SingularExpression, Token};
pub use context::FormContext;
pub use directive::{Directive, DomainDirective, ModifierDirective, OperatorDirective};
pub use encoding::Encoding;
pub use error::{TransformError, TransformResult};
pub use evaluator::{EvalError, Evaluator};
pub use frame::{Frame, Location, NodeKey};
pub use lexer::{LexError, Lexer};
pub use node::{Node, Object, Payload, PayloadValue};
pub use order::compare_nodes;
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser};
pub use resource::{FileSystemResolver, MemoryResolver, NullResolver, ResourceError, ResourceResolver};
pub use schema::{SchemaError, SchemaRegistry};
pub use template::{Template, TemplateOptions};
pub use transform::Transform;
pub use uri_template::UriTemplate;
