use std::error::Error as StdError;

use thiserror::Error;

use crate::frame::Location;

/// An error raised while parsing or transforming a template.
///
/// This is the single error kind surfaced by the engine. Failures from the
/// query language, schema validator, resource resolvers and encoders are
/// wrapped into it and kept available through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("{message} at {location}")]
pub struct TransformError {
    message: String,
    location: Location,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransformError {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        TransformError {
            message: message.into(),
            location,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// Result type for template operations.
pub type TransformResult<T> = Result<T, TransformError>;
