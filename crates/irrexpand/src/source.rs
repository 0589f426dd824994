//! Source controller (C7): captures the server's default source list,
//! switches between user-restricted and default sources, and (for the
//! non-pipelined path only) retries a request once under defaults when
//! restricted sources answer `NotFound`.

use irrexpand_proto::{command, Frame};

use crate::channel::Synchronous;
use crate::config::ExpanderConfig;
use crate::error::Error;

#[derive(Debug, Default)]
pub(crate) struct SourceController {
    user_sources_cmd: Option<String>,
    default_sources_cmd: Option<String>,
    search_default: bool,
}

impl SourceController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this run restricts sources at all; if not, every method here
    /// is a no-op and the server's own defaults stay active throughout.
    fn active(&self) -> bool {
        self.user_sources_cmd.is_some()
    }

    /// Runs the pre-expansion setup described in §4.7: capture the server's
    /// defaults if fallback is requested, build the user command, and
    /// switch to it. No-op if the caller didn't restrict sources.
    pub fn setup(&mut self, channel: &mut Synchronous, config: &ExpanderConfig) -> Result<(), Error> {
        if config.sources.is_empty() {
            return Ok(());
        }
        self.search_default = config.search_default;
        if config.search_default {
            let defaults = self.capture_defaults(channel)?;
            self.default_sources_cmd = Some(command::set_sources(&defaults));
        }
        self.user_sources_cmd = Some(command::set_sources(&config.sources));
        self.switch(channel, true)?;
        Ok(())
    }

    fn capture_defaults(&mut self, channel: &mut Synchronous) -> Result<String, Error> {
        let frame = channel.exchange(&command::default_sources_request())?;
        match frame {
            Frame::Data(bytes) => Ok(String::from_utf8_lossy(&bytes).trim().to_string()),
            other => Err(Error::Fatal(format!(
                "server rejected default-sources request: {other:?}"
            ))),
        }
    }

    fn switch(&self, channel: &mut Synchronous, to_user: bool) -> Result<(), Error> {
        let cmd = if to_user {
            self.user_sources_cmd.as_deref()
        } else {
            self.default_sources_cmd.as_deref()
        };
        let Some(cmd) = cmd else { return Ok(()) };
        match channel.exchange(cmd)? {
            Frame::NoData => Ok(()),
            other => Err(Error::SourceSwitchRejected(format!("{other:?}"))),
        }
    }

    /// Runs `attempt` once under the currently active sources. If it
    /// reports `NotFound` and fallback is configured, switches to defaults,
    /// retries, then switches back to user sources before returning.
    ///
    /// Pipelined expansion never calls this — it runs under whichever
    /// sources are active when the pipeline starts (§4.7).
    pub fn with_fallback<F>(
        &self,
        channel: &mut Synchronous,
        mut attempt: F,
    ) -> Result<Frame, Error>
    where
        F: FnMut(&mut Synchronous) -> Result<Frame, Error>,
    {
        let frame = attempt(channel)?;
        if !self.active() || !self.search_default {
            return Ok(frame);
        }
        if !matches!(frame, Frame::NotFound) {
            return Ok(frame);
        }
        self.switch(channel, false)?;
        let retried = attempt(channel)?;
        self.switch(channel, true)?;
        Ok(retried)
    }
}
