//! The in-flight/queued protocol request (data model §3, `Request (R)`).

/// What should happen to a request's response.
#[derive(Debug, Clone)]
pub(crate) enum RequestKind {
    /// `!i<name>\n` or `!i<name>,1\n`. `transitive` selects which.
    ExpandSet { name: String, transitive: bool },
    /// `!i<name>,1\n` whose tokens are prefixes, not ASNs.
    ExpandRouteSet { name: String },
    /// `!gas<asn>\n`.
    FetchV4 { asn: u32 },
    /// `!6as<asn>\n`.
    FetchV6 { asn: u32 },
}

/// A queued or in-flight request: the exact command line, a write offset
/// for partial-write resumption, the recursion depth it was issued at, and
/// what kind of response is expected.
#[derive(Debug, Clone)]
pub(crate) struct Request {
    pub line: String,
    pub offset: usize,
    pub depth: u32,
    pub kind: RequestKind,
}

impl Request {
    pub fn new(line: String, kind: RequestKind, depth: u32) -> Self {
        Self {
            line,
            offset: 0,
            depth,
            kind,
        }
    }
}
