//! Incremental assembly of a chunked text response into cumulative snapshots.
//!
//! The assembler owns one body stream, one decoder and one running buffer.
//! Every pull that decodes to new text republishes the whole buffer, so a
//! renderer can simply replace what it shows with the latest snapshot.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::decoder::Utf8StreamDecoder;
use crate::error::RelayError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw response body: a stream of byte chunks with no framing.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

// ---------------------------------------------------------------------------
// State and snapshot types
// ---------------------------------------------------------------------------

/// Lifecycle of one streaming request.
///
/// `Idle → Requesting → Streaming → {Completed | Cancelled | Failed}`.
/// Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblerState {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl AssemblerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssemblerState::Completed | AssemblerState::Cancelled | AssemblerState::Failed
        )
    }
}

impl std::fmt::Display for AssemblerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssemblerState::Idle => "idle",
            AssemblerState::Requesting => "requesting",
            AssemblerState::Streaming => "streaming",
            AssemblerState::Completed => "completed",
            AssemblerState::Cancelled => "cancelled",
            AssemblerState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// All text decoded so far for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSnapshot {
    pub text: String,
    /// 1-based position of this snapshot in the sequence.
    pub sequence: usize,
}

impl std::fmt::Display for StreamSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

// ---------------------------------------------------------------------------
// StreamAssembler
// ---------------------------------------------------------------------------

pub struct StreamAssembler {
    body: Option<ByteStream>,
    cancel: CancellationToken,
    decoder: Utf8StreamDecoder,
    text: String,
    state: AssemblerState,
    emitted: usize,
}

impl std::fmt::Debug for StreamAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamAssembler")
            .field("state", &self.state)
            .field("emitted", &self.emitted)
            .field("text_len", &self.text.len())
            .finish()
    }
}

impl StreamAssembler {
    /// Wrap a response body. `None` means the response had nothing to read.
    pub fn new(body: Option<ByteStream>, cancel: CancellationToken) -> Result<Self, RelayError> {
        let Some(body) = body else {
            warn!("response body unavailable");
            return Err(RelayError::StreamUnavailable);
        };
        Ok(StreamAssembler {
            body: Some(body),
            cancel,
            decoder: Utf8StreamDecoder::new(),
            text: String::new(),
            state: AssemblerState::Requesting,
            emitted: 0,
        })
    }

    /// Convenience constructor over any chunk stream (a `reqwest` body,
    /// a test fixture, a file reader).
    pub fn from_stream<S, B, E>(stream: S, cancel: CancellationToken) -> Result<Self, RelayError>
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes> + 'static,
        E: Into<BoxError> + 'static,
    {
        let body: ByteStream = Box::pin(stream.map(|r| -> Result<Bytes, BoxError> {
            match r {
                Ok(chunk) => Ok(chunk.into()),
                Err(e) => Err(e.into()),
            }
        }));
        Self::new(Some(body), cancel)
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Text assembled so far. Equal to the last emitted snapshot.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn snapshots_emitted(&self) -> usize {
        self.emitted
    }

    /// Pull until the buffer grows, the source ends, or the token fires.
    ///
    /// Returns `Ok(None)` on completion or cancellation, and on every call
    /// after the stream has reached a terminal state. A transport fault is
    /// reported once as `Err`; snapshots handed out earlier stay valid.
    pub async fn next_snapshot(&mut self) -> Result<Option<StreamSnapshot>, RelayError> {
        loop {
            if self.state.is_terminal() {
                return Ok(None);
            }
            let Some(body) = self.body.as_mut() else {
                self.state = AssemblerState::Failed;
                return Err(RelayError::StreamUnavailable);
            };

            let pulled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                chunk = body.next() => Some(chunk),
            };

            match pulled {
                None => {
                    self.close(AssemblerState::Cancelled);
                    debug!(snapshots = self.emitted, "stream cancelled");
                    return Ok(None);
                }
                Some(None) => {
                    let tail = self.decoder.finish();
                    self.close(AssemblerState::Completed);
                    debug!(snapshots = self.emitted, bytes = self.text.len(), "stream completed");
                    if tail.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(self.push(&tail)));
                }
                Some(Some(Err(e))) => {
                    self.close(AssemblerState::Failed);
                    warn!(error = %e, snapshots = self.emitted, "chunk pull failed");
                    return Err(RelayError::Transport(e.to_string()));
                }
                Some(Some(Ok(chunk))) => {
                    self.state = AssemblerState::Streaming;
                    let decoded = self.decoder.decode(&chunk);
                    trace!(chunk_len = chunk.len(), decoded_len = decoded.len(), "chunk");
                    if decoded.is_empty() {
                        continue;
                    }
                    return Ok(Some(self.push(&decoded)));
                }
            }
        }
    }

    /// Drain the stream and return the final text.
    ///
    /// Cancellation is not an error here: the text assembled up to that
    /// point is returned.
    pub async fn collect_text(mut self) -> Result<String, RelayError> {
        while self.next_snapshot().await?.is_some() {}
        Ok(self.text)
    }

    /// Adapt into a `Stream` of snapshots. The stream ends after
    /// completion, cancellation, or the first error item.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<StreamSnapshot, RelayError>> + Send {
        async_stream::stream! {
            loop {
                match self.next_snapshot().await {
                    Ok(Some(snapshot)) => yield Ok(snapshot),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }

    fn push(&mut self, decoded: &str) -> StreamSnapshot {
        self.text.push_str(decoded);
        self.emitted += 1;
        StreamSnapshot {
            text: self.text.clone(),
            sequence: self.emitted,
        }
    }

    /// Enter a terminal state and release the body (and its connection).
    fn close(&mut self, state: AssemblerState) {
        self.state = state;
        self.body = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn ok_chunks(chunks: &[&'static [u8]]) -> Vec<Result<Bytes, BoxError>> {
        chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect()
    }

    fn assembler(items: Vec<Result<Bytes, BoxError>>) -> StreamAssembler {
        StreamAssembler::from_stream(stream::iter(items), CancellationToken::new()).expect("body")
    }

    #[tokio::test]
    async fn test_ascii_chunks_produce_cumulative_snapshots() {
        let mut asm = assembler(ok_chunks(&[b"Hol", b"a mun", b"do"]));
        let mut seen = Vec::new();
        while let Some(s) = asm.next_snapshot().await.expect("no error") {
            seen.push(s.text);
        }
        assert_eq!(seen, vec!["Hol", "Hola mun", "Hola mundo"]);
        assert_eq!(asm.state(), AssemblerState::Completed);
    }

    #[tokio::test]
    async fn test_initial_state_is_requesting() {
        let asm = assembler(ok_chunks(&[b"a"]));
        assert_eq!(asm.state(), AssemblerState::Requesting);
        assert_eq!(asm.snapshots_emitted(), 0);
    }

    #[tokio::test]
    async fn test_first_chunk_moves_to_streaming() {
        let mut asm = assembler(ok_chunks(&[b"a", b"b"]));
        asm.next_snapshot().await.expect("ok");
        assert_eq!(asm.state(), AssemblerState::Streaming);
    }

    #[tokio::test]
    async fn test_missing_body_is_unavailable() {
        let err = StreamAssembler::new(None, CancellationToken::new()).expect_err("no body");
        assert!(matches!(err, RelayError::StreamUnavailable));
    }

    #[tokio::test]
    async fn test_split_multibyte_is_not_corrupted() {
        // "año" = 61 C3 B1 6F
        let mut asm = assembler(ok_chunks(&[b"a\xC3", b"\xB1o"]));
        let first = asm.next_snapshot().await.expect("ok").expect("snapshot");
        assert_eq!(first.text, "a");
        let second = asm.next_snapshot().await.expect("ok").expect("snapshot");
        assert_eq!(second.text, "año");
        assert_eq!(second.sequence, 2);
    }

    #[tokio::test]
    async fn test_dangling_partial_flushed_on_completion() {
        let mut asm = assembler(ok_chunks(&[b"ok\xE2\x82"]));
        let first = asm.next_snapshot().await.expect("ok").expect("snapshot");
        assert_eq!(first.text, "ok");
        let last = asm.next_snapshot().await.expect("ok").expect("flush snapshot");
        assert_eq!(last.text, "ok\u{FFFD}");
        assert_eq!(asm.state(), AssemblerState::Completed);
        assert!(asm.next_snapshot().await.expect("ok").is_none());
    }

    #[tokio::test]
    async fn test_cancel_after_two_of_five() {
        let cancel = CancellationToken::new();
        let mut asm = StreamAssembler::from_stream(
            stream::iter(ok_chunks(&[b"1", b"2", b"3", b"4", b"5"])),
            cancel.clone(),
        )
        .expect("body");
        assert!(asm.next_snapshot().await.expect("ok").is_some());
        assert!(asm.next_snapshot().await.expect("ok").is_some());
        cancel.cancel();
        assert!(asm.next_snapshot().await.expect("ok").is_none());
        assert_eq!(asm.snapshots_emitted(), 2);
        assert_eq!(asm.text(), "12");
        assert_eq!(asm.state(), AssemblerState::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_wakes_pending_pull() {
        let cancel = CancellationToken::new();
        let mut asm = StreamAssembler::from_stream(
            stream::pending::<Result<Bytes, BoxError>>(),
            cancel.clone(),
        )
        .expect("body");
        let c = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            c.cancel();
        });
        let res = tokio::time::timeout(std::time::Duration::from_secs(2), asm.next_snapshot())
            .await
            .expect("cancellation should wake the pull");
        assert!(res.expect("ok").is_none());
        assert_eq!(asm.state(), AssemblerState::Cancelled);
    }

    #[tokio::test]
    async fn test_transport_fault_keeps_earlier_text() {
        let items: Vec<Result<Bytes, BoxError>> = vec![
            Ok(Bytes::from_static(b"partial ")),
            Err("connection reset".into()),
            Ok(Bytes::from_static(b"never seen")),
        ];
        let mut asm = assembler(items);
        let first = asm.next_snapshot().await.expect("ok").expect("snapshot");
        assert_eq!(first.text, "partial ");
        let err = asm.next_snapshot().await.expect_err("fault");
        assert!(matches!(err, RelayError::Transport(ref m) if m.contains("connection reset")));
        assert_eq!(asm.state(), AssemblerState::Failed);
        assert_eq!(asm.text(), "partial ");
        assert!(asm.next_snapshot().await.expect("absorbing").is_none());
    }

    #[tokio::test]
    async fn test_empty_chunks_do_not_emit() {
        let mut asm = assembler(ok_chunks(&[b"", b"a", b"", b"b"]));
        let mut seqs = Vec::new();
        while let Some(s) = asm.next_snapshot().await.expect("ok") {
            seqs.push((s.sequence, s.text));
        }
        assert_eq!(seqs, vec![(1, "a".to_string()), (2, "ab".to_string())]);
    }

    #[tokio::test]
    async fn test_collect_text() {
        let asm = assembler(ok_chunks(&[b"Hola", b", ", b"mundo"]));
        assert_eq!(asm.collect_text().await.expect("ok"), "Hola, mundo");
    }

    #[tokio::test]
    async fn test_into_stream_ends_after_error() {
        let items: Vec<Result<Bytes, BoxError>> =
            vec![Ok(Bytes::from_static(b"x")), Err("boom".into())];
        let out: Vec<_> = assembler(items).into_stream().collect().await;
        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AssemblerState::Idle.is_terminal());
        assert!(!AssemblerState::Requesting.is_terminal());
        assert!(!AssemblerState::Streaming.is_terminal());
        assert!(AssemblerState::Completed.is_terminal());
        assert!(AssemblerState::Cancelled.is_terminal());
        assert!(AssemblerState::Failed.is_terminal());
    }

    #[test]
    fn test_snapshot_serializes() {
        let s = StreamSnapshot { text: "hi".into(), sequence: 3 };
        let json = serde_json::to_string(&s).expect("serialize");
        assert_eq!(json, r#"{"text":"hi","sequence":3}"#);
    }
}
