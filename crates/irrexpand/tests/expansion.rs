//! End-to-end expansion scenarios against an in-process scripted IRRd
//! stand-in: one TCP listener thread that asserts each request line it
//! receives and replies with a canned frame, exercising both the
//! non-pipelined and pipelined drivers.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use irrexpand::{Expander, ExpanderConfig, Generation};

/// Builds a well-formed `A<n>` data frame for `payload`.
fn data_frame(payload: &str) -> Vec<u8> {
    format!("A{}\n{payload}\nC\n", payload.len()).into_bytes()
}

/// Spawns a thread that accepts exactly one connection, runs the `!!`/`!n`
/// handshake, then walks `script` as alternating expect-line/reply-bytes
/// pairs. Drains (and ignores) whatever the client sends afterward, which
/// is the `!q` teardown.
fn spawn_server(script: Vec<(&'static str, Vec<u8>)>) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "!!\n", "expected multiple-commands handshake");

        let mut ident = String::new();
        reader.read_line(&mut ident).unwrap();
        assert!(ident.starts_with("!n"), "expected identify banner, got {ident:?}");
        writer.write_all(b"hi\n").unwrap();

        for (expect, reply) in script {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, expect, "unexpected request line");
            writer.write_all(&reply).unwrap();
        }

        let mut rest = String::new();
        let _ = reader.read_line(&mut rest);
    });
    (port, handle)
}

fn base_config(port: u16) -> ExpanderConfig {
    ExpanderConfig {
        server: "127.0.0.1".to_string(),
        port,
        ..ExpanderConfig::default()
    }
}

/// S1: a single macro with no recursion constraints expands eagerly
/// (`!i<name>,1`), harvesting bare ASNs straight from the server's own
/// transitive recursion.
#[test_log::test(maybe_async::test(
    not(feature = "async"),
    async(feature = "async", tokio::test(flavor = "multi_thread"))
))]
async fn simple_as_set_expands_via_transitive_query() -> Result<(), Box<dyn std::error::Error>> {
    let (port, server) = spawn_server(vec![("!iAS-FOO,1\n", data_frame("AS1 AS2"))]);

    let mut expander = Expander::new(base_config(port));
    expander.add_macro("AS-FOO");
    expander.run().await?;

    assert!(expander.asns().contains(1));
    assert!(expander.asns().contains(2));
    assert_eq!(expander.asns().len(), 2);

    server.join().unwrap();
    Ok(())
}

/// S2: a cycle back to the root is broken by the already-visited set, not
/// by a depth cap — `maxdepth: Some(0)` is the sentinel for "one-level
/// client recursion, no depth limit" (see `DESIGN.md`).
#[test_log::test(maybe_async::test(
    not(feature = "async"),
    async(feature = "async", tokio::test(flavor = "multi_thread"))
))]
async fn cyclic_sets_are_broken_by_the_visited_set() -> Result<(), Box<dyn std::error::Error>> {
    let (port, server) = spawn_server(vec![
        ("!iAS-A\n", data_frame("AS-B")),
        ("!iAS-B\n", data_frame("AS-A AS10")),
    ]);

    let mut expander = Expander::new(ExpanderConfig {
        maxdepth: Some(0),
        pipelining: false,
        ..base_config(port)
    });
    expander.add_macro("AS-A");
    expander.run().await?;

    assert_eq!(expander.asns().len(), 1);
    assert!(expander.asns().contains(10));

    server.join().unwrap();
    Ok(())
}

/// S3: `maxdepth: Some(2)` caps recursion once a child's depth would reach
/// it, leaving `AS-C` (and its ASN) unreached.
#[test_log::test(maybe_async::test(
    not(feature = "async"),
    async(feature = "async", tokio::test(flavor = "multi_thread"))
))]
async fn maxdepth_caps_further_recursion() -> Result<(), Box<dyn std::error::Error>> {
    let (port, server) = spawn_server(vec![
        ("!iAS-A\n", data_frame("AS-B")),
        ("!iAS-B\n", data_frame("AS-C")),
    ]);

    let mut expander = Expander::new(ExpanderConfig {
        maxdepth: Some(2),
        ..base_config(port)
    });
    expander.add_macro("AS-A");
    expander.run().await?;

    assert!(expander.asns().is_empty());

    server.join().unwrap();
    Ok(())
}

/// S4: the default admission filter drops both the documentation-range and
/// private 32-bit ASNs, keeping only the ordinary one.
#[test_log::test(maybe_async::test(
    not(feature = "async"),
    async(feature = "async", tokio::test(flavor = "multi_thread"))
))]
async fn default_filter_drops_special_and_private_asns() -> Result<(), Box<dyn std::error::Error>> {
    let (port, server) = spawn_server(vec![(
        "!iAS-FILTERME,1\n",
        data_frame("AS65000 AS4200000001 AS100"),
    )]);

    let mut expander = Expander::new(ExpanderConfig {
        pipelining: false,
        ..base_config(port)
    });
    expander.add_macro("AS-FILTERME");
    expander.run().await?;

    assert_eq!(expander.asns().len(), 1);
    assert!(expander.asns().contains(100));

    server.join().unwrap();
    Ok(())
}

/// S5: without `asn32` and below `PrefixList` generation, a 32-bit ASN
/// folds to the `AS_TRANS` (23456) sentinel instead of being admitted or
/// dropped — under the *default* config, exactly as S5 specifies, even
/// though this ASN also falls in the private 32-bit range the special
/// filter would otherwise drop on its own.
#[test_log::test(maybe_async::test(
    not(feature = "async"),
    async(feature = "async", tokio::test(flavor = "multi_thread"))
))]
async fn oversized_asn_folds_to_as_trans_sentinel() -> Result<(), Box<dyn std::error::Error>> {
    let (port, server) = spawn_server(vec![("!iAS-BIG,1\n", data_frame("AS4294967200"))]);

    let mut expander = Expander::new(base_config(port));
    expander.add_macro("AS-BIG");
    expander.run().await?;

    assert_eq!(expander.asns().len(), 1);
    assert!(expander.asns().contains(23456));

    server.join().unwrap();
    Ok(())
}

/// S6: `PrefixList` generation runs the prefix-fetch phase after macro
/// expansion, filing both returned prefixes into the primary IPv4 tree.
#[test_log::test(maybe_async::test(
    not(feature = "async"),
    async(feature = "async", tokio::test(flavor = "multi_thread"))
))]
async fn prefix_list_generation_fetches_originated_prefixes() -> Result<(), Box<dyn std::error::Error>> {
    let (port, server) = spawn_server(vec![
        ("!iAS-SEED,1\n", data_frame("AS64500")),
        ("!gas64500\n", data_frame("10.0.0.0/8 10.1.0.0/16")),
    ]);

    let mut expander = Expander::new(ExpanderConfig {
        expand_special_asn: true,
        generation: Generation::PrefixList,
        pipelining: false,
        ..base_config(port)
    });
    expander.add_macro("AS-SEED");
    expander.run().await?;

    assert_eq!(expander.asns().len(), 1);
    assert_eq!(expander.prefixes().primary().len(), 2);

    server.join().unwrap();
    Ok(())
}
