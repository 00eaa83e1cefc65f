//! Native messaging host
//!
//! The browser extension launches this process and exchanges messages over
//! stdin/stdout. Each message is a 32-bit little-endian length prefix
//! followed by UTF-8 JSON. Three frame types flow over the channel:
//!
//! - `event` (browser to host): a [`HostEvent`] under `event`.
//! - `request` (host to browser): `id`, `method` and `params`.
//! - `reply` (browser to host): the `id` of a request plus `result` or
//!   `error`.
//!
//! Requests are tracked in a pending map keyed by id. The reader task
//! resolves the matching `oneshot` sender when a reply arrives; every
//! request carries a timeout so a silent browser never blocks the tracker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

use super::{BrowserHost, CheckinPayload, HostEvent, TabInfo};
use crate::error::{MindfulError, Result};
use crate::storage::TabId;

/// Largest frame accepted from the browser
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Default timeout applied to each host request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type PendingMap = HashMap<u64, oneshot::Sender<std::result::Result<Value, String>>>;

/// Frames read from the browser
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    Event {
        event: HostEvent,
    },
    Reply {
        id: u64,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Frames written to the browser
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Request {
        id: u64,
        method: String,
        params: Value,
    },
}

/// Length-prefixed codec used by browser native messaging
pub fn native_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .little_endian()
        .length_field_length(4)
        .max_frame_length(MAX_FRAME_BYTES)
        .new_codec()
}

/// [`BrowserHost`] backed by a native messaging channel
pub struct NativeHost {
    next_id: AtomicU64,
    pending: Arc<Mutex<PendingMap>>,
    outbound_tx: mpsc::UnboundedSender<OutboundFrame>,
    request_timeout: Duration,
}

impl std::fmt::Debug for NativeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHost")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// A connected native channel: the host handle, the inbound event stream
/// and the background I/O tasks
pub struct NativeChannel {
    pub host: Arc<NativeHost>,
    pub events: mpsc::UnboundedReceiver<HostEvent>,
    pub tasks: Vec<JoinHandle<()>>,
}

impl NativeHost {
    /// Wire a host over arbitrary async byte streams
    ///
    /// Spawns a writer task draining outbound frames and a reader task that
    /// resolves replies and forwards events. Both stop on cancellation or
    /// when their stream closes; pending requests then fail instead of
    /// waiting out their timeout.
    pub fn connect<R, W>(
        reader: R,
        writer: W,
        request_timeout: Duration,
        cancellation: CancellationToken,
    ) -> NativeChannel
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let host = Arc::new(NativeHost {
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            outbound_tx,
            request_timeout,
        });

        let writer_task = spawn_writer(writer, outbound_rx, cancellation.clone());
        let reader_task = spawn_reader(
            reader,
            Arc::clone(&host.pending),
            events_tx,
            cancellation,
        );

        NativeChannel {
            host,
            events: events_rx,
            tasks: vec![writer_task, reader_task],
        }
    }

    /// Send a request and await its `result`
    ///
    /// # Errors
    ///
    /// Returns `MindfulError::HostTimeout` if no reply arrives within the
    /// request timeout and `MindfulError::Host` if the channel is closed or
    /// the browser replied with an error.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = OutboundFrame::Request {
            id,
            method: method.to_string(),
            params,
        };
        if self.outbound_tx.send(frame).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(MindfulError::Host("outbound channel closed".to_string()).into());
        }

        let outcome = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(MindfulError::HostTimeout {
                    method: method.to_string(),
                    timeout_ms: self.request_timeout.as_millis() as u64,
                }
                .into());
            }
        };

        let reply = outcome.map_err(|_| {
            MindfulError::Host("reader exited before reply arrived".to_string())
        })?;
        reply.map_err(|e| MindfulError::Host(format!("{} failed: {}", method, e)).into())
    }

    async fn request_as<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value).map_err(|e| {
            MindfulError::Host(format!("Malformed reply to {}: {}", method, e)).into()
        })
    }
}

/// Connect over the process's own stdin and stdout
pub fn connect_stdio(request_timeout: Duration, cancellation: CancellationToken) -> NativeChannel {
    NativeHost::connect(
        tokio::io::stdin(),
        tokio::io::stdout(),
        request_timeout,
        cancellation,
    )
}

fn spawn_writer<W>(
    writer: W,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    cancellation: CancellationToken,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut sink = FramedWrite::new(writer, native_codec());
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,

                maybe_frame = outbound_rx.recv() => {
                    let Some(frame) = maybe_frame else { break };
                    let bytes = match serde_json::to_vec(&frame) {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            tracing::error!("Failed to encode native frame: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Bytes::from(bytes)).await {
                        tracing::warn!("Native channel write failed: {}", e);
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_reader<R>(
    reader: R,
    pending: Arc<Mutex<PendingMap>>,
    events_tx: mpsc::UnboundedSender<HostEvent>,
    cancellation: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut frames = FramedRead::new(reader, native_codec());
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,

                next = frames.next() => {
                    match next {
                        Some(Ok(bytes)) => dispatch_frame(&bytes, &pending, &events_tx).await,
                        Some(Err(e)) => {
                            tracing::warn!("Native channel read failed: {}", e);
                            break;
                        }
                        None => {
                            tracing::info!("Native channel closed by browser");
                            break;
                        }
                    }
                }
            }
        }
        // Dropping the senders fails every outstanding request right away.
        pending.lock().await.clear();
    })
}

async fn dispatch_frame(
    raw: &[u8],
    pending: &Arc<Mutex<PendingMap>>,
    events_tx: &mpsc::UnboundedSender<HostEvent>,
) {
    let frame: InboundFrame = match serde_json::from_slice(raw) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Ignoring malformed native frame: {}", e);
            return;
        }
    };

    match frame {
        InboundFrame::Event { event } => {
            tracing::debug!(?event, "Host event");
            if events_tx.send(event).is_err() {
                tracing::debug!("Event receiver dropped; discarding host event");
            }
        }
        InboundFrame::Reply { id, result, error } => {
            let Some(tx) = pending.lock().await.remove(&id) else {
                tracing::debug!("Reply for unknown request id {}; ignoring", id);
                return;
            };
            let outcome = match error {
                Some(message) => Err(message),
                None => Ok(result.unwrap_or(Value::Null)),
            };
            // The caller may already have timed out.
            let _ = tx.send(outcome);
        }
    }
}

#[async_trait]
impl BrowserHost for NativeHost {
    async fn tab(&self, tab_id: TabId) -> Result<Option<TabInfo>> {
        self.request_as("get_tab", json!({ "tab_id": tab_id })).await
    }

    async fn active_tab(&self) -> Result<Option<TabInfo>> {
        self.request_as("active_tab", json!({})).await
    }

    async fn probe(&self, tab_id: TabId) -> Result<bool> {
        let value = self.request("ping", json!({ "tab_id": tab_id })).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn inject_listener(&self, tab_id: TabId) -> Result<()> {
        self.request("inject", json!({ "tab_id": tab_id })).await?;
        Ok(())
    }

    async fn show_checkin(&self, tab_id: TabId, payload: &CheckinPayload) -> Result<()> {
        self.request(
            "show_checkin",
            json!({
                "tab_id": tab_id,
                "coaching": payload.coaching,
                "alternatives": payload.alternatives,
            }),
        )
        .await?;
        Ok(())
    }

    async fn notify(&self, title: &str, message: &str) -> Result<()> {
        self.request("notify", json!({ "title": title, "message": message }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    /// Browser side of a duplex pipe: reads requests, writes frames
    struct BrowserSide {
        frames: FramedRead<tokio::io::ReadHalf<DuplexStream>, LengthDelimitedCodec>,
        sink: FramedWrite<tokio::io::WriteHalf<DuplexStream>, LengthDelimitedCodec>,
    }

    impl BrowserSide {
        async fn next_request(&mut self) -> Value {
            let bytes = self.frames.next().await.unwrap().unwrap();
            serde_json::from_slice(&bytes).unwrap()
        }

        async fn send(&mut self, value: Value) {
            let bytes = serde_json::to_vec(&value).unwrap();
            self.sink.send(Bytes::from(bytes)).await.unwrap();
        }
    }

    fn connect(timeout: Duration) -> (NativeChannel, BrowserSide, CancellationToken) {
        let (host_io, browser_io) = duplex(64 * 1024);
        let (host_read, host_write) = tokio::io::split(host_io);
        let (browser_read, browser_write) = tokio::io::split(browser_io);
        let token = CancellationToken::new();
        let channel = NativeHost::connect(host_read, host_write, timeout, token.clone());
        let browser = BrowserSide {
            frames: FramedRead::new(browser_read, native_codec()),
            sink: FramedWrite::new(browser_write, native_codec()),
        };
        (channel, browser, token)
    }

    #[tokio::test]
    async fn test_request_resolves_matching_reply() {
        let (channel, mut browser, _token) = connect(Duration::from_secs(2));
        let host = Arc::clone(&channel.host);

        let call = tokio::spawn(async move { host.tab(TabId(7)).await });

        let request = browser.next_request().await;
        assert_eq!(request["type"], "request");
        assert_eq!(request["method"], "get_tab");
        assert_eq!(request["params"]["tab_id"], 7);

        browser
            .send(json!({
                "type": "reply",
                "id": request["id"],
                "result": {"id": 7, "url": "https://reddit.com", "active": true}
            }))
            .await;

        let tab = call.await.unwrap().unwrap().unwrap();
        assert_eq!(tab.url.as_deref(), Some("https://reddit.com"));
        assert!(tab.active);
    }

    #[tokio::test]
    async fn test_null_result_means_missing_tab() {
        let (channel, mut browser, _token) = connect(Duration::from_secs(2));
        let host = Arc::clone(&channel.host);
        let call = tokio::spawn(async move { host.tab(TabId(1)).await });
        let request = browser.next_request().await;
        browser
            .send(json!({"type": "reply", "id": request["id"], "result": null}))
            .await;
        assert!(call.await.unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_error_reply_is_host_error() {
        let (channel, mut browser, _token) = connect(Duration::from_secs(2));
        let host = Arc::clone(&channel.host);
        let call = tokio::spawn(async move { host.inject_listener(TabId(1)).await });
        let request = browser.next_request().await;
        browser
            .send(json!({"type": "reply", "id": request["id"], "error": "cannot access page"}))
            .await;
        let err = call.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("cannot access page"));
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let (channel, mut browser, _token) = connect(Duration::from_millis(50));
        let host = Arc::clone(&channel.host);
        let call = tokio::spawn(async move { host.probe(TabId(1)).await });
        let _ignored = browser.next_request().await;
        let err = call.await.unwrap().unwrap_err();
        let host_err = err.downcast_ref::<MindfulError>().unwrap();
        assert!(matches!(host_err, MindfulError::HostTimeout { .. }));
    }

    #[tokio::test]
    async fn test_events_are_forwarded() {
        let (mut channel, mut browser, _token) = connect(Duration::from_secs(2));
        browser
            .send(json!({
                "type": "event",
                "event": {"kind": "tab_removed", "tab_id": 4}
            }))
            .await;
        let event = channel.events.recv().await.unwrap();
        assert_eq!(event, HostEvent::TabRemoved { tab_id: TabId(4) });
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let (mut channel, mut browser, _token) = connect(Duration::from_secs(2));
        browser.send(json!({"type": "bogus"})).await;
        browser
            .send(json!({"type": "event", "event": {"kind": "checkin_dismissed"}}))
            .await;
        assert_eq!(channel.events.recv().await.unwrap(), HostEvent::CheckinDismissed);
    }

    #[tokio::test]
    async fn test_cancellation_fails_pending_requests() {
        let (channel, mut browser, token) = connect(Duration::from_secs(30));
        let host = Arc::clone(&channel.host);
        let call = tokio::spawn(async move { host.active_tab().await });
        let _ignored = browser.next_request().await;
        token.cancel();
        let err = call.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("Host error"));
    }

    #[test]
    fn test_outbound_frame_shape() {
        let frame = OutboundFrame::Request {
            id: 3,
            method: "notify".into(),
            params: json!({"title": "t"}),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "request");
        assert_eq!(value["id"], 3);
    }
}
