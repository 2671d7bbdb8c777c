//! Request body processors feeding the variable store.

mod mime;
mod multipart;

pub use multipart::MultipartProcessor;

use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

use crate::error::Result;
use crate::variables::RuleVariable;

/// Collections produced by a body processor, ready to merge into a
/// transaction's variable store.
pub type CollectionsMap = HashMap<RuleVariable, HashMap<String, Vec<String>>>;

/// Configuration handed to a body processor.
#[derive(Debug, Clone)]
pub struct Options {
    /// The request's `Content-Type` value.
    pub mime: String,
    /// Existing writable directory for spooled files.
    pub storage_path: PathBuf,
}

/// A processor turning a raw request body into structured variables.
pub trait BodyProcessor {
    /// Consume the body stream and build the collections.
    fn read(&mut self, reader: &mut dyn Read, options: &Options) -> Result<()>;

    /// The collections produced by the last `read`.
    fn collections(&self) -> &CollectionsMap;

    /// Select body content matching an expression.
    fn find(&self, expr: &str) -> Result<HashMap<String, Vec<String>>>;

    /// The variable a `ctl:requestBodyProcessor` selection hooks on.
    fn variable_hook(&self) -> RuleVariable;
}
