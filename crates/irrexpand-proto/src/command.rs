//! Command-line formatting for the IRRd query protocol (MS-... no, RFC-less:
//! see the IRRd operator's reference). Every command is a single `!`-prefixed
//! line terminated by `\n`.

/// `!!\n` — enters "multiple commands" mode; the server sends no reply.
pub fn multiple_commands() -> String {
    "!!\n".to_string()
}

/// `!n<ident>\n` — identifies the client. The server echoes one line back,
/// which the caller should read and discard.
pub fn identify(ident: &str) -> String {
    format!("!n{ident}\n")
}

/// `!s-lc\n` — requests the server's current default source list.
pub fn default_sources_request() -> String {
    "!s-lc\n".to_string()
}

/// `!s<sources>\n` — restricts (or resets) the active source list.
pub fn set_sources(sources: &str) -> String {
    format!("!s{sources}\n")
}

/// `!i<name>\n` — expands a set by name, one level.
pub fn expand_one_level(name: &str) -> String {
    format!("!i{name}\n")
}

/// `!i<name>,1\n` — expands a set transitively; the server performs the
/// recursion and returns only ASNs.
pub fn expand_transitive(name: &str) -> String {
    format!("!i{name},1\n")
}

/// `!gas<asn>\n` — fetches the IPv4 prefixes originated by `asn`.
pub fn fetch_v4(asn: u32) -> String {
    format!("!gas{asn}\n")
}

/// `!6as<asn>\n` — fetches the IPv6 prefixes originated by `asn`.
pub fn fetch_v6(asn: u32) -> String {
    format!("!6as{asn}\n")
}

/// `!q\n` — requests a clean shutdown of the session.
pub fn quit() -> String {
    "!q\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_expected_lines() {
        assert_eq!(multiple_commands(), "!!\n");
        assert_eq!(identify("pkg/1.0"), "!npkg/1.0\n");
        assert_eq!(default_sources_request(), "!s-lc\n");
        assert_eq!(set_sources("RADB,RIPE"), "!sRADB,RIPE\n");
        assert_eq!(expand_one_level("AS-FOO"), "!iAS-FOO\n");
        assert_eq!(expand_transitive("AS-FOO"), "!iAS-FOO,1\n");
        assert_eq!(fetch_v4(65000), "!gas65000\n");
        assert_eq!(fetch_v6(65000), "!6as65000\n");
        assert_eq!(quit(), "!q\n");
    }
}
