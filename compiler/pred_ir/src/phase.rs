//! Host transaction phases.

use std::fmt;

/// A point in the host's transaction processing lifecycle.
///
/// Evaluation gated on a phase (`waitPhase`, `finishPhase`) compares the
/// context's current phase for equality only; no ordering is implied.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    None,
    RequestHeader,
    RequestBody,
    ResponseHeader,
    ResponseBody,
    Postprocess,
    RequestHeaderStream,
    RequestBodyStream,
    ResponseHeaderStream,
    ResponseBodyStream,
}

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::None,
        Phase::RequestHeader,
        Phase::RequestBody,
        Phase::ResponseHeader,
        Phase::ResponseBody,
        Phase::Postprocess,
        Phase::RequestHeaderStream,
        Phase::RequestBodyStream,
        Phase::ResponseHeaderStream,
        Phase::ResponseBodyStream,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Phase::None => "NONE",
            Phase::RequestHeader => "REQUEST_HEADER",
            Phase::RequestBody => "REQUEST_BODY",
            Phase::ResponseHeader => "RESPONSE_HEADER",
            Phase::ResponseBody => "RESPONSE_BODY",
            Phase::Postprocess => "POSTPROCESS",
            Phase::RequestHeaderStream => "REQUEST_HEADER_STREAM",
            Phase::RequestBodyStream => "REQUEST_BODY_STREAM",
            Phase::ResponseHeaderStream => "RESPONSE_HEADER_STREAM",
            Phase::ResponseBodyStream => "RESPONSE_BODY_STREAM",
        }
    }

    /// Look up a phase by name, ignoring ASCII case.
    ///
    /// `REQUEST` and `RESPONSE` are accepted as shorthands for the body
    /// phases.
    pub fn lookup(name: &str) -> Option<Phase> {
        if name.eq_ignore_ascii_case("REQUEST") {
            return Some(Phase::RequestBody);
        }
        if name.eq_ignore_ascii_case("RESPONSE") {
            return Some(Phase::ResponseBody);
        }
        Phase::ALL
            .into_iter()
            .find(|phase| phase.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
