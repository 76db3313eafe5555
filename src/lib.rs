pub mod assembler;
pub mod cli;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod render;
pub mod request;
pub mod session;

use std::io::Write;

use tracing::{info, warn};

pub use assembler::{AssemblerState, StreamAssembler, StreamSnapshot};
pub use client::RelayClient;
pub use config::RelayConfig;
pub use error::RelayError;
pub use request::{Endpoint, Language, StreamRequest};
pub use session::StreamSession;

use render::SnapshotRenderer;

// ---------------------------------------------------------------------------
// Relay outcome
// ---------------------------------------------------------------------------

/// How one streaming request ended.
#[derive(Debug)]
pub struct RelayOutcome {
    pub state: AssemblerState,
    pub snapshots: usize,
    /// Last text shown to the caller (empty if nothing arrived).
    pub text: String,
    /// Set for request-time failures and transport faults. Never set for
    /// cancellation.
    pub error: Option<RelayError>,
}

impl RelayOutcome {
    fn failed_before_stream(error: RelayError) -> Self {
        let (state, error) = if error.is_cancelled() {
            (AssemblerState::Cancelled, None)
        } else {
            (AssemblerState::Failed, Some(error))
        };
        RelayOutcome {
            state,
            snapshots: 0,
            text: String::new(),
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Driving a request end to end
// ---------------------------------------------------------------------------

/// Issue `request`, render every snapshot into `out`, and report the end
/// state. Snapshots already written are never retracted, whatever the
/// outcome.
pub async fn relay<W: Write>(
    client: &RelayClient,
    request: &StreamRequest,
    renderer: &mut SnapshotRenderer,
    out: &mut W,
) -> std::io::Result<RelayOutcome> {
    let mut assembler = match client.open(request).await {
        Ok(a) => a,
        Err(e) => {
            if !e.is_cancelled() {
                warn!(error = %e, endpoint = %request.endpoint(), "stream could not start");
            }
            let outcome = RelayOutcome::failed_before_stream(e);
            renderer.footer(out, outcome.state)?;
            return Ok(outcome);
        }
    };

    let mut error = None;
    loop {
        match assembler.next_snapshot().await {
            Ok(Some(snapshot)) => renderer.render(out, &snapshot)?,
            Ok(None) => break,
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    let state = assembler.state();
    info!(
        endpoint = %request.endpoint(),
        %state,
        snapshots = assembler.snapshots_emitted(),
        "stream finished"
    );
    renderer.footer(out, state)?;

    Ok(RelayOutcome {
        state,
        snapshots: assembler.snapshots_emitted(),
        text: assembler.text().to_string(),
        error,
    })
}
