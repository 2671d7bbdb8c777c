//! Transaction variable addressing.

mod store;

pub use store::{Collection, VariableStore};

use phf::phf_map;

/// Well-known transaction variables that rules can address.
///
/// Each variable has a short stable name matching the SecRules dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleVariable {
    /// Placeholder for data not tied to any variable (synthetic matches).
    Unknown,
    /// All request arguments (GET and POST).
    Args,
    /// GET arguments only.
    ArgsGet,
    /// POST arguments only.
    ArgsPost,
    /// GET argument names.
    ArgsGetNames,
    /// POST argument names.
    ArgsPostNames,
    /// Request URI.
    RequestUri,
    /// HTTP method.
    RequestMethod,
    /// Query string.
    QueryString,
    /// Request headers.
    RequestHeaders,
    /// Client-supplied filenames of uploaded files.
    Files,
    /// Form field names that carried files.
    FilesNames,
    /// Byte sizes of uploaded files.
    FilesSizes,
    /// Temp paths of spooled uploaded files.
    FilesTmpNames,
    /// Combined size of the processed request body parts.
    FilesCombinedSize,
    /// Client IP address.
    RemoteAddr,
    /// Server IP address.
    ServerAddr,
    /// Metadata of the rule currently being evaluated.
    Rule,
    /// Transaction collection (mutable, rule-writable).
    Tx,
    /// Value of the most recent match.
    MatchedVar,
    /// Values of all matches announced so far.
    MatchedVars,
    /// Unique transaction identifier.
    UniqueId,
}

static VARIABLE_NAMES: phf::Map<&'static str, RuleVariable> = phf_map! {
    "ARGS" => RuleVariable::Args,
    "ARGS_GET" => RuleVariable::ArgsGet,
    "ARGS_POST" => RuleVariable::ArgsPost,
    "ARGS_GET_NAMES" => RuleVariable::ArgsGetNames,
    "ARGS_POST_NAMES" => RuleVariable::ArgsPostNames,
    "REQUEST_URI" => RuleVariable::RequestUri,
    "REQUEST_METHOD" => RuleVariable::RequestMethod,
    "QUERY_STRING" => RuleVariable::QueryString,
    "REQUEST_HEADERS" => RuleVariable::RequestHeaders,
    "FILES" => RuleVariable::Files,
    "FILES_NAMES" => RuleVariable::FilesNames,
    "FILES_SIZES" => RuleVariable::FilesSizes,
    "FILES_TMPNAMES" => RuleVariable::FilesTmpNames,
    "FILES_COMBINED_SIZE" => RuleVariable::FilesCombinedSize,
    "REMOTE_ADDR" => RuleVariable::RemoteAddr,
    "SERVER_ADDR" => RuleVariable::ServerAddr,
    "RULE" => RuleVariable::Rule,
    "TX" => RuleVariable::Tx,
    "MATCHED_VAR" => RuleVariable::MatchedVar,
    "MATCHED_VARS" => RuleVariable::MatchedVars,
    "UNIQUE_ID" => RuleVariable::UniqueId,
};

impl RuleVariable {
    /// The variable's stable dialect name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Args => "ARGS",
            Self::ArgsGet => "ARGS_GET",
            Self::ArgsPost => "ARGS_POST",
            Self::ArgsGetNames => "ARGS_GET_NAMES",
            Self::ArgsPostNames => "ARGS_POST_NAMES",
            Self::RequestUri => "REQUEST_URI",
            Self::RequestMethod => "REQUEST_METHOD",
            Self::QueryString => "QUERY_STRING",
            Self::RequestHeaders => "REQUEST_HEADERS",
            Self::Files => "FILES",
            Self::FilesNames => "FILES_NAMES",
            Self::FilesSizes => "FILES_SIZES",
            Self::FilesTmpNames => "FILES_TMPNAMES",
            Self::FilesCombinedSize => "FILES_COMBINED_SIZE",
            Self::RemoteAddr => "REMOTE_ADDR",
            Self::ServerAddr => "SERVER_ADDR",
            Self::Rule => "RULE",
            Self::Tx => "TX",
            Self::MatchedVar => "MATCHED_VAR",
            Self::MatchedVars => "MATCHED_VARS",
            Self::UniqueId => "UNIQUE_ID",
        }
    }

    /// Look up a variable by its dialect name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        VARIABLE_NAMES.get(name.to_uppercase().as_str()).copied()
    }
}

impl std::fmt::Display for RuleVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
