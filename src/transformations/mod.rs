//! Transformation functions applied to variable values before operators.

mod normalize;

pub use normalize::{CompressWhitespace, Lowercase, Trim};

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A pure string rewrite applied to a variable value.
///
/// Transformations must not observe the transaction; logging goes through
/// the ambient `tracing` subscriber.
pub trait Transformation: Send + Sync {
    /// Apply the transformation.
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str>;

    /// Get the transformation name.
    fn name(&self) -> &'static str;
}

/// Create a transformation from a dialect name.
///
/// `none` is not a transformation: the compiler implements it by calling
/// [`Rule::clear_transformations`](crate::Rule::clear_transformations).
pub fn create_transformation(name: &str) -> Result<Arc<dyn Transformation>> {
    match name.to_lowercase().as_str() {
        "lowercase" => Ok(Arc::new(Lowercase)),
        "trim" => Ok(Arc::new(Trim)),
        "compresswhitespace" => Ok(Arc::new(CompressWhitespace)),
        _ => Err(Error::InvalidTransformation {
            name: name.to_string(),
        }),
    }
}
