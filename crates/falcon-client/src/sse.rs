use bytes::{Buf, BytesMut};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::{GatewayError, Result};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeFilter, Subscription};

// ---------------------------------------------------------------------------
// SseChangeFeed
// ---------------------------------------------------------------------------

/// Change feed over a long-lived `text/event-stream` response from the
/// backend's realtime endpoint. One HTTP connection per subscription.
#[derive(Clone)]
pub struct SseChangeFeed {
    http: reqwest::Client,
    url: String,
}

impl SseChangeFeed {
    /// `http` must already carry the auth headers.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    fn request(&self, filter: &ChangeFilter) -> reqwest::RequestBuilder {
        let mut query: Vec<(&str, String)> = vec![
            ("schema", filter.schema.clone()),
            ("table", filter.table.clone()),
        ];
        if !filter.events.is_empty() {
            let events: Vec<&str> = filter.events.iter().map(|k| k.as_str()).collect();
            query.push(("events", events.join(",")));
        }
        if let Some(f) = filter.filter_param() {
            query.push(("filter", f));
        }
        self.http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .query(&query)
    }
}

impl ChangeFeed for SseChangeFeed {
    fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        let (tx, rx) = mpsc::channel(64);
        let request = self.request(&filter);

        let task = tokio::spawn(async move {
            if let Err(e) = pump(request, &filter, &tx).await {
                let _ = tx.send(Err(e)).await;
            }
            tracing::debug!(table = %filter.table, "change stream closed");
        });

        Subscription::new(
            Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx)),
            Some(task),
        )
    }
}

async fn pump(
    request: reqwest::RequestBuilder,
    filter: &ChangeFilter,
    tx: &mpsc::Sender<Result<ChangeEvent>>,
) -> Result<()> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Realtime(format!(
            "subscribe to {}.{} failed ({}): {}",
            filter.schema,
            filter.table,
            status.as_u16(),
            body.trim()
        )));
    }
    tracing::info!(table = %filter.table, filter = ?filter.filter_param(), "subscribed");

    let mut decoder = SseDecoder::default();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        for data in decoder.push(&chunk) {
            let event = match serde_json::from_str::<ChangeEvent>(&data) {
                Ok(ev) => ev,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unparsable change frame");
                    continue;
                }
            };
            if !filter.matches(&event) {
                continue;
            }
            if tx.send(Ok(event)).await.is_err() {
                return Ok(()); // Subscription dropped
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SseDecoder
// ---------------------------------------------------------------------------

/// Incremental `text/event-stream` parser. Returns the joined `data:` lines
/// of every complete event; comments and other fields are ignored.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: BytesMut,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some((end, sep)) = find_frame_end(&self.buf) {
            let frame = self.buf.split_to(end);
            self.buf.advance(sep);
            if let Some(data) = frame_data(&String::from_utf8_lossy(&frame)) {
                out.push(data);
            }
        }
        out
    }
}

fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn frame_data(frame: &str) -> Option<String> {
    let lines: Vec<&str> = frame
        .lines()
        .filter_map(|l| l.strip_prefix("data:"))
        .map(|l| l.strip_prefix(' ').unwrap_or(l))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
