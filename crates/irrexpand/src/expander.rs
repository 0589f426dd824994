//! The expansion driver (C6) tying the protocol codec, I/O channels, source
//! controller, and the two result aggregators together into the single
//! `Expander::run` entry point described in §4.6–§4.8.

use std::net::TcpStream as StdTcpStream;

use irrexpand_asn::AsnBitset;
use irrexpand_proto::{command, tokenize, Frame};
use irrexpand_radix::{Family, PrefixSink, PrefixTree, RadixTrie};
use irrexpand_transport::{Connection, ConnectConfig, RawTransport, Ready};

use crate::channel::{Pipeline, Synchronous};
use crate::classify::{self, Token};
use crate::config::ExpanderConfig;
use crate::error::Error;
use crate::named_set::NamedSet;
use crate::request::{Request, RequestKind};
use crate::source::SourceController;

#[cfg(feature = "is_sync")]
type Transport = irrexpand_transport::MioTransport;
#[cfg(feature = "async")]
type Transport = irrexpand_transport::TokioTransport;

/// Recursively expands the AS-sets/route-sets seeded via [`Self::add_macro`]
/// / [`Self::add_route_set`] against an IRRd server, accumulating the
/// resulting ASNs and originated prefixes. Construct via [`Self::new`],
/// seed inputs, then call [`Self::run`] exactly once.
pub struct Expander {
    config: ExpanderConfig,
    asns: AsnBitset,
    already: NamedSet,
    stoplist: NamedSet,
    prefixes: PrefixSink,
    macros: Vec<String>,
    route_sets: Vec<String>,
    source: SourceController,
    ran: bool,
}

impl Expander {
    pub fn new(config: ExpanderConfig) -> Self {
        let secondary: Option<Box<dyn PrefixTree>> =
            if config.secondary_v6_tree && config.family == Family::V4 {
                Some(Box::new(RadixTrie::new()))
            } else {
                None
            };
        let prefixes = PrefixSink::new(
            config.family,
            Box::new(RadixTrie::new()),
            secondary,
            config.maxlen,
        );
        let stoplist: NamedSet = config.stoplist.iter().cloned().collect();
        Self {
            config,
            asns: AsnBitset::new(),
            already: NamedSet::new(),
            stoplist,
            prefixes,
            macros: Vec::new(),
            route_sets: Vec::new(),
            source: SourceController::new(),
            ran: false,
        }
    }

    pub fn add_macro(&mut self, name: impl Into<String>) {
        self.macros.push(name.into());
    }

    pub fn add_route_set(&mut self, name: impl Into<String>) {
        self.route_sets.push(name.into());
    }

    pub fn add_stop(&mut self, name: &str) {
        self.stoplist.insert(name);
    }

    pub fn asns(&self) -> &AsnBitset {
        &self.asns
    }

    pub fn prefixes(&self) -> &PrefixSink {
        &self.prefixes
    }

    /// Connects, expands every seeded macro and route-set, fetches prefixes
    /// when configured to, and tears down the session. A second call
    /// returns `Error::Fatal` rather than reconnecting.
    #[maybe_async::maybe_async]
    pub async fn run(&mut self) -> Result<(), Error> {
        if self.ran {
            return Err(Error::Fatal(
                "Expander::run called more than once".to_string(),
            ));
        }
        self.ran = true;

        let connect_config = ConnectConfig {
            server: self.config.server.clone(),
            port: self.config.port,
            identify: self.config.identify,
            client_ident: format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
            pipelining: self.config.pipelining,
        };
        log::info!(
            "connecting to {}:{}",
            connect_config.server,
            connect_config.port
        );
        let connection = Connection::connect(&connect_config)?;
        let mut sync_channel = Synchronous::new(connection);
        self.source.setup(&mut sync_channel, &self.config)?;

        if self.config.pipelining {
            let connection = sync_channel.into_connection();
            let std_stream = connection.into_nonblocking()?;
            let transport = make_pipeline_transport(std_stream)?;
            let mut pipeline = Pipeline::new(transport);
            self.run_pipelined(&mut pipeline).await?;
            teardown_pipeline(pipeline).await?;
        } else {
            self.run_synchronous(&mut sync_channel)?;
            let connection = sync_channel.into_connection();
            connection.teardown()?;
        }
        log::info!(
            "expansion complete: {} ASNs, {} primary prefixes",
            self.asns.len(),
            self.prefixes.primary().len()
        );
        Ok(())
    }

    fn initial_macro_request(&self, name: &str) -> Request {
        let transitive = self.config.maxdepth.is_none() && self.stoplist.is_empty();
        let line = if transitive {
            command::expand_transitive(name)
        } else {
            command::expand_one_level(name)
        };
        Request::new(
            line,
            RequestKind::ExpandSet {
                name: name.to_string(),
                transitive,
            },
            0,
        )
    }

    fn route_set_requests(&self) -> Vec<Request> {
        self.route_sets
            .iter()
            .map(|name| {
                Request::new(
                    command::expand_transitive(name),
                    RequestKind::ExpandRouteSet {
                        name: name.clone(),
                    },
                    0,
                )
            })
            .collect()
    }

    /// Builds one `!gas`/`!6as` request per live ASN, per the family rules
    /// of §4.6: `V6` fetches only `!6as`; `V4` fetches `!gas`, plus `!6as`
    /// too when a secondary IPv6 tree is configured.
    fn prefix_fetch_requests(&self) -> Vec<Request> {
        let mut requests = Vec::new();
        let secondary_present = self.prefixes.secondary().is_some();
        self.asns.for_each(|asn| match self.config.family {
            Family::V6 => {
                requests.push(Request::new(command::fetch_v6(asn), RequestKind::FetchV6 { asn }, 0));
            }
            Family::V4 => {
                requests.push(Request::new(command::fetch_v4(asn), RequestKind::FetchV4 { asn }, 0));
                if secondary_present {
                    requests.push(Request::new(command::fetch_v6(asn), RequestKind::FetchV6 { asn }, 0));
                }
            }
        });
        requests
    }

    #[maybe_async::maybe_async]
    async fn run_pipelined(&mut self, pipeline: &mut Pipeline<Transport>) -> Result<(), Error> {
        for name in self.macros.clone() {
            let request = self.initial_macro_request(&name);
            self.already.insert(&name);
            pipeline.submit(request)?;
        }
        {
            let mut on_frame = macro_token_callback(
                &mut self.asns,
                &mut self.already,
                &self.stoplist,
                &self.config,
            );
            pipeline.drain(&mut on_frame).await?;
        }

        if self.config.runs_prefix_phase() {
            for request in self.route_set_requests() {
                pipeline.submit(request)?;
            }
            {
                let mut on_frame = route_set_callback(&mut self.prefixes);
                pipeline.drain(&mut on_frame).await?;
            }

            for request in self.prefix_fetch_requests() {
                pipeline.submit(request)?;
            }
            {
                let mut on_frame =
                    prefix_fetch_callback(&mut self.asns, &mut self.prefixes, self.config.validate_asns);
                pipeline.drain(&mut on_frame).await?;
            }
        }
        Ok(())
    }

    fn run_synchronous(&mut self, channel: &mut Synchronous) -> Result<(), Error> {
        for name in self.macros.clone() {
            let request = self.initial_macro_request(&name);
            self.already.insert(&name);
            channel.submit(request)?;
        }
        {
            let mut on_frame = macro_token_callback(
                &mut self.asns,
                &mut self.already,
                &self.stoplist,
                &self.config,
            );
            channel.drain_with_fallback(&self.source, &mut on_frame)?;
        }

        if self.config.runs_prefix_phase() {
            for request in self.route_set_requests() {
                channel.submit(request)?;
            }
            {
                let mut on_frame = route_set_callback(&mut self.prefixes);
                channel.drain_with_fallback(&self.source, &mut on_frame)?;
            }

            for request in self.prefix_fetch_requests() {
                channel.submit(request)?;
            }
            {
                let mut on_frame =
                    prefix_fetch_callback(&mut self.asns, &mut self.prefixes, self.config.validate_asns);
                channel.drain_with_fallback(&self.source, &mut on_frame)?;
            }
        }
        Ok(())
    }
}

/// Builds the `!i` response callback shared by the pipelined and
/// synchronous macro-expansion drivers: classifies each token, admits ASNs
/// into `asns`, and recurses into unvisited, non-stoplisted set names
/// subject to `config.maxdepth`.
fn macro_token_callback<'a>(
    asns: &'a mut AsnBitset,
    already: &'a mut NamedSet,
    stoplist: &'a NamedSet,
    config: &'a ExpanderConfig,
) -> impl FnMut(Request, Frame) -> Result<Vec<Request>, Error> + 'a {
    move |request, frame| {
        let (depth, transitive) = match request.kind {
            RequestKind::ExpandSet { transitive, .. } => (request.depth, transitive),
            other => unreachable!("macro callback received non-ExpandSet request: {other:?}"),
        };
        let payload = match frame {
            Frame::Data(bytes) => bytes,
            Frame::NoData | Frame::NotFound => return Ok(Vec::new()),
            Frame::MultipleKeys(msg) => {
                log::warn!("set expansion returned multiple keys: {msg}");
                return Ok(Vec::new());
            }
            Frame::Error(msg) => {
                log::warn!("set expansion failed: {msg}");
                return Ok(Vec::new());
            }
        };

        let mut more = Vec::new();
        for token in tokenize(&payload) {
            match classify::classify(&token, config) {
                Token::Any => {}
                Token::Asn(Some(asn)) => asns.add(asn),
                Token::Asn(None) => {}
                Token::SetName(name) => {
                    if transitive {
                        log::warn!("unexpected set name {name:?} in transitive expansion reply");
                        continue;
                    }
                    if already.contains(&name) {
                        log::trace!("{name} already visited, skipping");
                        continue;
                    }
                    if stoplist.contains(&name) {
                        log::debug!("{name} is on the stoplist, skipping");
                        continue;
                    }
                    let child_depth = depth + 1;
                    if depth_capped(config.maxdepth, child_depth) {
                        log::debug!("depth cap reached at {name}, skipping");
                        continue;
                    }
                    already.insert(&name);
                    more.push(Request::new(
                        command::expand_one_level(&name),
                        RequestKind::ExpandSet {
                            name,
                            transitive: false,
                        },
                        child_depth,
                    ));
                }
                Token::Unexpected => log::warn!("unexpected token {token:?} in set expansion reply"),
            }
        }
        Ok(more)
    }
}

/// Callback for route-set expansion tokens, which are prefixes or
/// prefix-range expressions rather than ASNs or set names.
fn route_set_callback(prefixes: &mut PrefixSink) -> impl FnMut(Request, Frame) -> Result<Vec<Request>, Error> + '_ {
    move |_request, frame| {
        let payload = match frame {
            Frame::Data(bytes) => bytes,
            Frame::NoData | Frame::NotFound => return Ok(Vec::new()),
            Frame::MultipleKeys(msg) => {
                log::warn!("route-set expansion returned multiple keys: {msg}");
                return Ok(Vec::new());
            }
            Frame::Error(msg) => {
                log::warn!("route-set expansion failed: {msg}");
                return Ok(Vec::new());
            }
        };
        for token in tokenize(&payload) {
            feed_prefix_token(prefixes, &token);
        }
        Ok(Vec::new())
    }
}

/// Callback for `!gas`/`!6as` prefix-fetch replies; clears the fetched
/// ASN's bit when `validate_asns` is on and the server reports no
/// origination (§4.5's invalidation hook).
fn prefix_fetch_callback<'a>(
    asns: &'a mut AsnBitset,
    prefixes: &'a mut PrefixSink,
    validate_asns: bool,
) -> impl FnMut(Request, Frame) -> Result<Vec<Request>, Error> + 'a {
    move |request, frame| {
        let asn = match request.kind {
            RequestKind::FetchV4 { asn } | RequestKind::FetchV6 { asn } => asn,
            other => unreachable!("prefix-fetch callback received non-fetch request: {other:?}"),
        };
        match frame {
            Frame::Data(bytes) => {
                for token in tokenize(&bytes) {
                    feed_prefix_token(prefixes, &token);
                }
            }
            Frame::NoData | Frame::NotFound => {
                if validate_asns {
                    log::debug!("AS{asn} originates no prefixes, clearing");
                    asns.clear(asn);
                }
            }
            Frame::MultipleKeys(msg) => {
                log::warn!("prefix fetch for AS{asn} returned multiple keys: {msg}")
            }
            Frame::Error(msg) => log::warn!("prefix fetch for AS{asn} failed: {msg}"),
        }
        Ok(Vec::new())
    }
}

/// `maxdepth` gates recursion per §4.6: `None` lets the top-level request
/// run transitively (server-side recursion, see `initial_macro_request`)
/// when the stoplist is also empty; once one-level client-side recursion is
/// in effect, `Some(0)` is the historical sentinel for "no cap" rather than
/// "cap at zero", and `Some(n)` for `n > 0` caps a child whose depth would
/// reach `n`. See `DESIGN.md` for why `Some(0)` isn't treated literally.
fn depth_capped(maxdepth: Option<u32>, child_depth: u32) -> bool {
    match maxdepth {
        None | Some(0) => false,
        Some(n) => child_depth >= n,
    }
}

fn feed_prefix_token(prefixes: &mut PrefixSink, token: &str) {
    let result = if token.contains('^') {
        prefixes.add_prefix_range(token)
    } else {
        prefixes.add_prefix(token)
    };
    if let Err(e) = result {
        log::warn!("could not parse {token:?} as a prefix: {e}");
    }
}

#[cfg(feature = "is_sync")]
fn make_pipeline_transport(std_stream: StdTcpStream) -> Result<Transport, Error> {
    irrexpand_transport::MioTransport::new(std_stream)
        .map_err(irrexpand_transport::TransportError::from)
        .map_err(Error::from)
}

#[cfg(feature = "async")]
fn make_pipeline_transport(std_stream: StdTcpStream) -> Result<Transport, Error> {
    let tokio_stream = tokio::net::TcpStream::from_std(std_stream)
        .map_err(irrexpand_transport::TransportError::from)?;
    Ok(irrexpand_transport::TokioTransport::new(tokio_stream))
}

/// Best-effort `!q` shutdown for the pipelined path: the synchronous
/// connection's blocking teardown doesn't apply once the socket has been
/// switched non-blocking, so this writes the quit command directly through
/// the raw transport and shuts the socket down, ignoring write errors (the
/// peer may already have half-closed).
#[maybe_async::maybe_async]
async fn teardown_pipeline(pipeline: Pipeline<Transport>) -> Result<(), Error> {
    let mut transport = pipeline.into_transport();
    let quit = command::quit();
    let bytes = quit.as_bytes();
    let mut offset = 0;
    while offset < bytes.len() {
        match transport.try_write(&bytes[offset..]).await {
            Ok(0) => break,
            Ok(n) => offset += n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                if transport
                    .wait_ready(Ready::ReadWrite, std::time::Duration::from_secs(5))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    let _ = transport.shutdown().await;
    Ok(())
}
