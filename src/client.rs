//! HTTP side of a streaming call: issue the POST, vet the response, and
//! hand the body to a [`StreamAssembler`].

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assembler::StreamAssembler;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::request::{Endpoint, Language, StreamRequest};

#[derive(Debug)]
pub struct RelayClient {
    client: Client,
    config: RelayConfig,
}

impl RelayClient {
    /// Build a client from `config`.
    ///
    /// # Errors
    /// `RelayError::Config` when the base URL is not http(s) or the TLS
    /// backend cannot be initialised.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RelayError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(RelayClient { client, config })
    }

    /// Full URL for `endpoint` under the configured base.
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.config.base_url.trim().trim_end_matches('/'), endpoint.path())
    }

    /// Issue `request` and return an assembler over its body.
    ///
    /// # Returns
    /// - `Ok(StreamAssembler)` on a 2xx response with a body.
    /// - `Err(RelayError::Cancelled)` if the token fired before or during the send.
    /// - `Err(RelayError::RequestFailed)` on a non-2xx status.
    /// - `Err(RelayError::StreamUnavailable)` on 204/205, which carry no body.
    /// - `Err(RelayError::Transport)` when the connection cannot be made.
    pub async fn open(&self, request: &StreamRequest) -> Result<StreamAssembler, RelayError> {
        let cancel = request.cancel_token().clone();
        if cancel.is_cancelled() {
            debug!(endpoint = %request.endpoint(), "cancelled before request was issued");
            return Err(RelayError::Cancelled);
        }

        let url = self.url_for(request.endpoint());
        info!(endpoint = %request.endpoint(), %url, "issuing stream request");

        let send = self.client.post(&url).json(request.payload()).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%url, "cancelled while waiting for response headers");
                return Err(RelayError::Cancelled);
            }
            res = send => res?,
        };

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), %url, "stream request rejected");
            return Err(RelayError::RequestFailed {
                status: status.as_u16(),
                url,
            });
        }
        debug!(status = status.as_u16(), "response headers received");

        if !has_body(status) {
            return StreamAssembler::new(None, cancel);
        }
        StreamAssembler::from_stream(response.bytes_stream(), cancel)
    }

    /// Stream a translation of `text` into `lang`.
    pub async fn translate(
        &self,
        text: &str,
        lang: Language,
        cancel: CancellationToken,
    ) -> Result<StreamAssembler, RelayError> {
        self.open(&StreamRequest::translate(text, lang, cancel)).await
    }

    /// Stream a pros/cons discussion of `text`.
    pub async fn pros_cons(
        &self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<StreamAssembler, RelayError> {
        self.open(&StreamRequest::pros_cons(text, cancel)).await
    }
}

/// Statuses whose responses never carry a body.
fn has_body(status: StatusCode) -> bool {
    !matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT)
}
