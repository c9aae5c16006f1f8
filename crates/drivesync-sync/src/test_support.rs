//! In-memory fakes shared by the unit tests of this crate

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use drivesync_core::domain::{FileMeta, RemoteId};
use drivesync_core::ports::{
    ByteStream, ContentSource, IProgressReporter, IRemoteTransport, RemoteEntry,
};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub(crate) fn remote_id(id: &str) -> RemoteId {
    RemoteId::new(id).unwrap()
}

pub(crate) fn remote_blob(id: &str, secs: i64) -> FileMeta {
    FileMeta::blob(
        Some(remote_id(id)),
        format!("https://blobs.example.com/{id}"),
        "application/octet-stream",
        ts(secs),
    )
}

pub(crate) fn remote_dir(id: &str, secs: i64) -> FileMeta {
    FileMeta::directory(Some(remote_id(id)), ts(secs))
}

pub(crate) fn remote_document(id: &str, mime: &str, links: &[(&str, &str)], secs: i64) -> FileMeta {
    let links: BTreeMap<String, String> = links
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    FileMeta::document(Some(remote_id(id)), mime, links, ts(secs))
}

/// Shared, ordered event log used to check cross-component ordering
pub(crate) type EventLog = Arc<Mutex<Vec<String>>>;

/// Reader that fails after its prefix has been consumed
struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
    }
}

/// In-memory remote transport
#[derive(Default)]
pub(crate) struct MockTransport {
    content: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    broken: HashSet<String>,
    delay: Option<Duration>,
    by_path: HashMap<String, FileMeta>,
    children: HashMap<String, Vec<RemoteEntry>>,
    events: Option<EventLog>,
    requests: Mutex<Vec<ContentSource>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn source_key(source: &ContentSource) -> String {
    match source {
        ContentSource::Blob(id) => id.to_string(),
        ContentSource::Export(url) => url.clone(),
    }
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Content served for a blob ID or an export URL
    pub(crate) fn with_content(mut self, key: &str, bytes: &[u8]) -> Self {
        self.content.insert(key.to_string(), bytes.to_vec());
        self
    }

    /// Make `download` fail before any byte is returned
    pub(crate) fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Serve the content prefix, then fail mid-stream
    pub(crate) fn broken(mut self, key: &str) -> Self {
        self.broken.insert(key.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn with_path(mut self, path: &str, meta: FileMeta) -> Self {
        self.by_path.insert(path.to_string(), meta);
        self
    }

    pub(crate) fn with_children(mut self, id: &str, entries: Vec<(&str, FileMeta)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, meta)| RemoteEntry {
                name: name.to_string(),
                meta,
            })
            .collect();
        self.children.insert(id.to_string(), entries);
        self
    }

    pub(crate) fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub(crate) fn requests(&self) -> Vec<ContentSource> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IRemoteTransport for MockTransport {
    async fn fetch_by_path(&self, path: &str) -> anyhow::Result<FileMeta> {
        self.by_path
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("not found: {path}"))
    }

    async fn list_children(&self, id: &RemoteId) -> anyhow::Result<Vec<RemoteEntry>> {
        Ok(self.children.get(id.as_str()).cloned().unwrap_or_default())
    }

    async fn download(&self, source: &ContentSource) -> anyhow::Result<ByteStream> {
        let key = source_key(source);
        self.requests.lock().unwrap().push(source.clone());
        if let Some(events) = &self.events {
            events.lock().unwrap().push(format!("start:{key}"));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&key) {
            anyhow::bail!("remote refused {key}");
        }
        let bytes = self
            .content
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no content for {key}"))?;
        if self.broken.contains(&key) {
            return Ok(Box::pin(io::Cursor::new(bytes).chain(BrokenReader)));
        }
        Ok(Box::pin(io::Cursor::new(bytes)))
    }
}

/// Progress reporter that records every notification
#[derive(Default)]
pub(crate) struct RecordingProgress {
    pub(crate) total: AtomicUsize,
    pub(crate) done: AtomicUsize,
    pub(crate) finished: AtomicUsize,
    pub(crate) notices: Mutex<Vec<String>>,
    events: Option<EventLog>,
}

impl RecordingProgress {
    pub(crate) fn with_events(events: EventLog) -> Self {
        Self {
            events: Some(events),
            ..Self::default()
        }
    }
}

impl IProgressReporter for RecordingProgress {
    fn on_start(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn on_task_done(&self) {
        // Log under the same lock as the increment so the log order matches
        match &self.events {
            Some(events) => {
                let mut events = events.lock().unwrap();
                self.done.fetch_add(1, Ordering::SeqCst);
                events.push("done".to_string());
            }
            None => {
                self.done.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn on_finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    fn on_notice(&self, message: &str) {
        self.notices.lock().unwrap().push(message.to_string());
    }
}
