//! Rule execution phases.

/// The lifecycle stage a rule is attached to.
///
/// Every rule carries a `phase:N` number in its metadata; the outer engine
/// decides when each stage runs, the core only stores and reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    /// Stage 1, request headers are available.
    RequestHeaders = 1,
    /// Stage 2, the request body has been read.
    RequestBody = 2,
    /// Stage 3, response headers are available.
    ResponseHeaders = 3,
    /// Stage 4, the response body has been read.
    ResponseBody = 4,
    /// Stage 5, audit logging.
    Logging = 5,
}

const ORDERED: [(Phase, &str); 5] = [
    (Phase::RequestHeaders, "REQUEST_HEADERS"),
    (Phase::RequestBody, "REQUEST_BODY"),
    (Phase::ResponseHeaders, "RESPONSE_HEADERS"),
    (Phase::ResponseBody, "RESPONSE_BODY"),
    (Phase::Logging, "LOGGING"),
];

impl Phase {
    /// The numeric stage as written in `phase:N`.
    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// The stage name in the dialect's spelling.
    pub fn name(&self) -> &'static str {
        ORDERED[(self.number() - 1) as usize].1
    }

    /// Resolve a `phase:N` number; anything outside 1..=5 is rejected.
    pub fn from_number(n: u8) -> Option<Self> {
        ORDERED
            .iter()
            .map(|(phase, _)| *phase)
            .find(|phase| phase.number() == n)
    }
}

impl Default for Phase {
    // SecRules default phase is 2.
    fn default() -> Self {
        Phase::RequestBody
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
