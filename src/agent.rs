//! Agent Module
//!
//! The event loop that reads requests and dispatches them.
//!
//! ## State machine
//! ```text
//!  ┌──────────────┐  init ok   ┌───────┐  terminate  ┌────────────┐
//!  │ AwaitingInit │──────────▶│ Ready │───────────▶│ Terminated │
//!  └──────┬───────┘            └───┬───┘             └────────────┘
//!         │ init error             │ download / upload (synchronous)
//!         ▼                        ▼
//!    Terminated               (stays Ready)
//! ```
//!
//! Requests are handled strictly one at a time: a transfer runs to completion
//! before the next line is read. The protocol has no request ids, so there is
//! nothing to disambiguate interleaved completions with.

use std::io::{BufRead, Write};
use std::ops::ControlFlow;

use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::protocol::{read_request, Event, Request, Response, ResponseSink};
use crate::storage::{ObjectStore, StoreConnector};
use crate::transfer::{TransferKind, TransferOutcome, Transfers};

/// Error code carried by every failed `init` response
pub const INIT_ERROR_CODE: i32 = 1;

/// Dispatcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingInit,
    Ready,
    Terminated,
}

/// Why [`Agent::serve`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The peer sent `terminate`
    Terminated,

    /// `init` failed; the process should exit
    InitFailed,

    /// Input ended without `terminate`
    InputClosed,
}

/// Custom transfer agent
pub struct Agent<C: StoreConnector> {
    config: Config,
    connector: C,

    /// Connected lazily on the first transfer, then reused
    store: Option<Box<dyn ObjectStore>>,

    state: AgentState,
}

impl<C: StoreConnector> Agent<C> {
    pub fn new(config: Config, connector: C) -> Self {
        Self {
            config,
            connector,
            store: None,
            state: AgentState::AwaitingInit,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process requests from `input` until terminate, init failure, or EOF
    ///
    /// A line that fails to decode is logged and returned as an error; no
    /// further lines are read.
    pub fn serve<R: BufRead, W: Write>(&mut self, mut input: R, output: W) -> Result<ServeOutcome> {
        let mut sink = ResponseSink::new(output);

        loop {
            let request = match read_request(&mut input) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    tracing::info!("Input closed without terminate");
                    return Ok(ServeOutcome::InputClosed);
                }
                Err(e) => {
                    tracing::error!("Error reading input: {}", e);
                    return Err(e);
                }
            };

            if let ControlFlow::Break(outcome) = self.handle(request, &mut sink) {
                return Ok(outcome);
            }
        }
    }

    /// Handle a single decoded request
    pub fn handle<W: Write>(
        &mut self,
        request: Request,
        sink: &mut ResponseSink<W>,
    ) -> ControlFlow<ServeOutcome> {
        match request.event {
            Event::Init => self.handle_init(&request, sink),
            Event::Download => {
                self.handle_transfer(TransferKind::Download, &request, sink);
                ControlFlow::Continue(())
            }
            Event::Upload => {
                self.handle_transfer(TransferKind::Upload, &request, sink);
                ControlFlow::Continue(())
            }
            Event::Terminate => {
                tracing::info!("Terminating custom transfer agent gracefully");
                self.state = AgentState::Terminated;
                ControlFlow::Break(ServeOutcome::Terminated)
            }
            Event::Other(ref name) => {
                tracing::debug!("Ignoring unknown event {:?}", name);
                ControlFlow::Continue(())
            }
        }
    }

    fn handle_init<W: Write>(
        &mut self,
        request: &Request,
        sink: &mut ResponseSink<W>,
    ) -> ControlFlow<ServeOutcome> {
        tracing::debug!(
            operation = request.operation.as_deref().unwrap_or_default(),
            remote = request.remote.as_deref().unwrap_or_default(),
            concurrent = request.concurrent.unwrap_or_default(),
            concurrenttransfers = request.concurrenttransfers.unwrap_or_default(),
            "Received init"
        );

        if let Err(e) = self.config.validate() {
            tracing::error!("Initialization error: {}", e);
            let response = Response::init_error(
                INIT_ERROR_CODE,
                format!("Initialization error: {}.", config_message(&e)),
            );
            if let Err(e) = sink.send(&response) {
                tracing::error!("Unable to send init response: {}", e);
            }
            self.state = AgentState::Terminated;
            return ControlFlow::Break(ServeOutcome::InitFailed);
        }

        if let Err(e) = sink.send(&Response::init_ok()) {
            tracing::error!("Unable to send init response: {}", e);
        }
        self.state = AgentState::Ready;
        ControlFlow::Continue(())
    }

    fn handle_transfer<W: Write>(
        &mut self,
        kind: TransferKind,
        request: &Request,
        sink: &mut ResponseSink<W>,
    ) {
        let Some((oid, size)) = request.target() else {
            tracing::warn!("Ignoring {} request without oid and size", kind);
            return;
        };
        tracing::info!("Received {} request for {}", kind, oid);

        let result = if self.state != AgentState::Ready {
            Err(AgentError::Config(format!("{} requested before init", kind)))
        } else {
            self.run_transfer(kind, oid, size, sink)
        };

        match result {
            Ok(outcome) => {
                tracing::info!(
                    "Finished {} of {} ({} bytes, {})",
                    kind,
                    oid,
                    outcome.bytes,
                    outcome.path.display()
                );
            }
            Err(e) => {
                tracing::error!("Error during {} of {}: {}", kind, oid, e);
                if self.config.report_transfer_errors {
                    if let Err(e) = sink.send_failure(oid, &e) {
                        tracing::error!("Unable to send failure for {}: {}", oid, e);
                    }
                }
            }
        }
    }

    fn run_transfer<W: Write>(
        &mut self,
        kind: TransferKind,
        oid: &str,
        size: u64,
        sink: &mut ResponseSink<W>,
    ) -> Result<TransferOutcome> {
        if self.store.is_none() {
            self.store = Some(self.connector.connect(&self.config)?);
        }
        let Some(store) = self.store.as_deref() else {
            return Err(AgentError::Config("storage client unavailable".to_string()));
        };

        Transfers::new(&self.config, store).run(kind, oid, size, sink)
    }
}

/// The bare message of a configuration error, without the variant prefix
fn config_message(err: &AgentError) -> String {
    match err {
        AgentError::Config(message) => message.clone(),
        other => other.to_string(),
    }
}
