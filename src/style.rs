//! Per-track style overrides with a local JSON cache and remote persistence.
//!
//! The store keeps one [`StyleDocument`]. `load_all` reads the local cache
//! synchronously for the first paint and then fetches the remote document in
//! the background; the remote copy replaces the cached one when it arrives.
//! `save_all` posts the whole document and only bumps the local version after
//! the service acknowledges it. A failed save leaves every local edit in place.
//!
//! Admin gating lives outside: the store only carries the `admin_mode` flag
//! handed in by the embedding application.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::config::MapConfig;
use crate::error::{MapError, Result};
use crate::model::{SaveReceipt, StyleDocument, TrackStyle};

const TRACK_ID_SEPARATOR: char = '|';

/// Symmetric key for the segment between stations `a` and `b`.
///
/// The two names are ordered before joining, so `(a, b)` and `(b, a)` yield
/// the same key. Separator and escape characters inside names are escaped so
/// distinct pairs never collide.
pub fn generate_track_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}{}{}", escape(lo), TRACK_ID_SEPARATOR, escape(hi))
}

fn escape(name: &str) -> Cow<'_, str> {
    if name.contains(['\\', TRACK_ID_SEPARATOR]) {
        Cow::Owned(name.replace('\\', "\\\\").replace(TRACK_ID_SEPARATOR, "\\|"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Parse a style service body. Empty bodies, `null` and "not found"
/// envelopes all mean "no document yet".
pub fn parse_style_document(body: &str) -> Result<StyleDocument> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(StyleDocument::default());
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| MapError::Persistence(format!("style document is not JSON: {e}")))?;
    if value.is_null() {
        return Ok(StyleDocument::default());
    }
    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        if msg.to_ascii_lowercase().contains("not found") {
            return Ok(StyleDocument::default());
        }
        return Err(MapError::Persistence(msg));
    }
    serde_json::from_value(value)
        .map_err(|e| MapError::Persistence(format!("style document has wrong shape: {e}")))
}

/// Remote side of the style document.
pub trait StyleBackend: Send + Sync {
    /// Current document; a missing document is the default empty one.
    fn fetch(&self) -> Result<StyleDocument>;
    fn store(&self, doc: &StyleDocument) -> Result<SaveReceipt>;
    /// Reset the remote document to the default empty one.
    fn reset(&self) -> Result<()>;
}

/// Style service over HTTP: GET, POST and DELETE on a single URL.
pub struct HttpStyleBackend {
    url: String,
    timeout: Duration,
}

impl HttpStyleBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    fn status_error(&self, code: u16, resp: ureq::Response) -> MapError {
        let body = resp.into_string().unwrap_or_default();
        MapError::Persistence(format!("{} returned {code}: {}", self.url, body.trim()))
    }
}

impl StyleBackend for HttpStyleBackend {
    fn fetch(&self) -> Result<StyleDocument> {
        match ureq::get(&self.url).timeout(self.timeout).call() {
            Ok(resp) => parse_style_document(&resp.into_string()?),
            Err(ureq::Error::Status(404, _)) => Ok(StyleDocument::default()),
            Err(ureq::Error::Status(code, resp)) => Err(self.status_error(code, resp)),
            Err(e) => Err(MapError::Persistence(e.to_string())),
        }
    }

    fn store(&self, doc: &StyleDocument) -> Result<SaveReceipt> {
        let body = serde_json::to_string(doc)?;
        match ureq::post(&self.url)
            .timeout(self.timeout)
            .set("Content-Type", "application/json")
            .send_string(&body)
        {
            Ok(resp) => {
                let text = resp.into_string()?;
                serde_json::from_str(&text)
                    .map_err(|e| MapError::Persistence(format!("unexpected save reply: {e}")))
            }
            Err(ureq::Error::Status(code, resp)) => Err(self.status_error(code, resp)),
            Err(e) => Err(MapError::Persistence(e.to_string())),
        }
    }

    fn reset(&self) -> Result<()> {
        match ureq::delete(&self.url).timeout(self.timeout).call() {
            Ok(_) | Err(ureq::Error::Status(404, _)) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => Err(self.status_error(code, resp)),
            Err(e) => Err(MapError::Persistence(e.to_string())),
        }
    }
}

/// Cache file contents: the style document plus whether it holds edits the
/// style service has not accepted yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedStyles {
    #[serde(flatten)]
    pub doc: StyleDocument,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unsaved: bool,
}

/// Local JSON file holding the last known style document.
#[derive(Debug, Clone)]
pub struct StyleCache {
    path: Utf8PathBuf,
}

impl StyleCache {
    pub fn new(path: impl AsRef<Utf8Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Missing or unreadable caches yield `None`.
    pub fn read_entry(&self) -> Option<CachedStyles> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&text) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("ignoring corrupt style cache {}: {e}", self.path);
                None
            }
        }
    }

    pub fn read(&self) -> Option<StyleDocument> {
        self.read_entry().map(|entry| entry.doc)
    }

    pub fn write_entry(&self, doc: &StyleDocument, unsaved: bool) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let entry = CachedStyles {
            doc: doc.clone(),
            unsaved,
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&entry)?)?;
        Ok(())
    }

    /// Write `doc` as a copy of the remote document.
    pub fn write(&self, doc: &StyleDocument) -> Result<()> {
        self.write_entry(doc, false)
    }
}

/// Observable state of the store for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleStatus {
    Idle,
    Loading,
    Saving,
    Resetting,
    Error(String),
}

/// Completion of a background load, save or reset.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleEvent {
    Loaded,
    LoadFailed(String),
    Saved,
    SaveFailed(String),
    Reset,
    ResetFailed(String),
}

enum Job {
    Load(Receiver<Result<StyleDocument>>),
    Save {
        snapshot: StyleDocument,
        rx: Receiver<Result<SaveReceipt>>,
    },
    Reset(Receiver<Result<()>>),
}

fn spawn_job<T, F>(f: F) -> Receiver<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx
}

pub struct StyleStore {
    doc: StyleDocument,
    backend: Option<Arc<dyn StyleBackend>>,
    cache: Option<StyleCache>,
    admin_mode: bool,
    dirty: bool,
    status: StyleStatus,
    revision: u64,
    job: Option<Job>,
}

impl StyleStore {
    pub fn new(
        backend: Option<Arc<dyn StyleBackend>>,
        cache: Option<StyleCache>,
        admin_mode: bool,
    ) -> Self {
        Self {
            doc: StyleDocument::default(),
            backend,
            cache,
            admin_mode,
            dirty: false,
            status: StyleStatus::Idle,
            revision: 0,
            job: None,
        }
    }

    /// Store wired to the HTTP style service and cache file named in `cfg`.
    pub fn from_config(cfg: &MapConfig, admin_mode: bool) -> Self {
        let backend = cfg.style_url.as_ref().map(|url| {
            Arc::new(HttpStyleBackend::new(url.clone(), cfg.request_timeout())) as Arc<dyn StyleBackend>
        });
        let cache = cfg.style_cache.as_ref().map(StyleCache::new);
        Self::new(backend, cache, admin_mode)
    }

    /// A store with neither cache nor remote; edits stay in memory.
    pub fn in_memory(admin_mode: bool) -> Self {
        Self::new(None, None, admin_mode)
    }

    pub fn admin_mode(&self) -> bool {
        self.admin_mode
    }

    /// Edits are offered only to admins, and not while a remote load or
    /// save could overwrite them.
    pub fn can_edit(&self) -> bool {
        self.admin_mode && self.job.is_none()
    }

    pub fn document(&self) -> &StyleDocument {
        &self.doc
    }

    pub fn status(&self) -> &StyleStatus {
        &self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    /// Incremented whenever the style map changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get_style(&self, track_id: &str) -> Option<&TrackStyle> {
        self.doc.styles.get(track_id)
    }

    /// Merge `patch` into the override for `track_id`. An override left with
    /// no fields is removed.
    pub fn set_style(&mut self, track_id: &str, patch: TrackStyle) {
        let entry = self.doc.styles.entry(track_id.to_string()).or_default();
        entry.merge(&patch);
        if entry.is_empty() {
            self.doc.styles.remove(track_id);
        }
        self.after_edit();
    }

    /// Replace the override for `track_id` wholesale.
    pub fn replace_style(&mut self, track_id: &str, style: TrackStyle) {
        if style.is_empty() {
            self.doc.styles.remove(track_id);
        } else {
            self.doc.styles.insert(track_id.to_string(), style);
        }
        self.after_edit();
    }

    pub fn remove_style(&mut self, track_id: &str) -> Option<TrackStyle> {
        let removed = self.doc.styles.remove(track_id);
        if removed.is_some() {
            self.after_edit();
        }
        removed
    }

    fn after_edit(&mut self) {
        self.dirty = true;
        self.revision += 1;
        self.write_cache();
    }

    fn write_cache(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write_entry(&self.doc, self.dirty) {
                log::warn!("could not write style cache {}: {e}", cache.path());
            }
        }
    }

    fn load_cache(&mut self) -> bool {
        let Some(entry) = self.cache.as_ref().and_then(StyleCache::read_entry) else {
            return false;
        };
        log::debug!(
            "loaded {} cached style overrides (unsaved: {})",
            entry.doc.styles.len(),
            entry.unsaved
        );
        self.doc = entry.doc;
        self.dirty = entry.unsaved;
        self.revision += 1;
        true
    }

    /// Read the cache now and start the remote fetch in the background.
    /// Returns whether the cache supplied a document.
    pub fn load_all(&mut self) -> bool {
        let cached = self.load_cache();
        if self.job.is_none() {
            if let Some(backend) = self.backend.clone() {
                self.status = StyleStatus::Loading;
                self.job = Some(Job::Load(spawn_job(move || backend.fetch())));
            }
        }
        cached
    }

    /// Cache then remote, on the calling thread. On a remote failure the
    /// cached (or default) document stays in place and the error is returned.
    pub fn load_all_blocking(&mut self) -> Result<()> {
        self.load_cache();
        let Some(backend) = self.backend.clone() else {
            return Ok(());
        };
        let outcome = backend.fetch();
        let err = outcome.as_ref().err().map(|e| e.to_string());
        self.finish_load(outcome);
        match err {
            Some(msg) => Err(MapError::Persistence(msg)),
            None => Ok(()),
        }
    }

    fn finish_load(&mut self, outcome: Result<StyleDocument>) -> StyleEvent {
        match outcome {
            Ok(doc) => {
                log::info!(
                    "loaded style document v{} with {} overrides",
                    doc.version,
                    doc.styles.len()
                );
                self.doc = doc;
                self.dirty = false;
                self.revision += 1;
                self.status = StyleStatus::Idle;
                self.write_cache();
                StyleEvent::Loaded
            }
            Err(e) => {
                log::warn!("style load failed, keeping cached styles: {e}");
                self.status = StyleStatus::Error(e.to_string());
                StyleEvent::LoadFailed(e.to_string())
            }
        }
    }

    fn next_snapshot(&self) -> StyleDocument {
        let mut snapshot = self.doc.clone();
        snapshot.version = self.doc.version + 1;
        snapshot.last_modified = None;
        snapshot
    }

    /// Start posting the full document in the background.
    pub fn save_all(&mut self) -> Result<()> {
        let backend = self.require_backend()?;
        let snapshot = self.next_snapshot();
        let payload = snapshot.clone();
        self.status = StyleStatus::Saving;
        self.job = Some(Job::Save {
            snapshot,
            rx: spawn_job(move || backend.store(&payload)),
        });
        Ok(())
    }

    pub fn save_all_blocking(&mut self) -> Result<()> {
        let backend = self.require_backend()?;
        let snapshot = self.next_snapshot();
        let outcome = backend.store(&snapshot);
        match self.finish_save(snapshot, outcome) {
            StyleEvent::SaveFailed(msg) => Err(MapError::Persistence(msg)),
            _ => Ok(()),
        }
    }

    fn require_backend(&self) -> Result<Arc<dyn StyleBackend>> {
        if self.job.is_some() {
            return Err(MapError::Persistence(
                "another style operation is still running".to_string(),
            ));
        }
        self.backend
            .clone()
            .ok_or_else(|| MapError::Persistence("no style service configured".to_string()))
    }

    fn finish_save(&mut self, snapshot: StyleDocument, outcome: Result<SaveReceipt>) -> StyleEvent {
        let outcome = outcome.and_then(|receipt| {
            if receipt.success {
                Ok(receipt)
            } else {
                Err(MapError::Persistence("style service rejected the document".to_string()))
            }
        });
        match outcome {
            Ok(receipt) => {
                self.doc.version = snapshot.version;
                self.doc.last_modified = receipt.last_modified;
                self.dirty = self.doc.styles != snapshot.styles;
                self.status = StyleStatus::Idle;
                self.write_cache();
                log::info!("saved style document v{}", self.doc.version);
                StyleEvent::Saved
            }
            Err(e) => {
                log::warn!("style save failed, edits kept locally: {e}");
                self.status = StyleStatus::Error(e.to_string());
                StyleEvent::SaveFailed(e.to_string())
            }
        }
    }

    /// Ask the service to reset to the default document (background).
    pub fn reset_all(&mut self) -> Result<()> {
        let backend = self.require_backend()?;
        self.status = StyleStatus::Resetting;
        self.job = Some(Job::Reset(spawn_job(move || backend.reset())));
        Ok(())
    }

    pub fn reset_all_blocking(&mut self) -> Result<()> {
        let backend = self.require_backend()?;
        let outcome = backend.reset();
        match self.finish_reset(outcome) {
            StyleEvent::ResetFailed(msg) => Err(MapError::Persistence(msg)),
            _ => Ok(()),
        }
    }

    fn finish_reset(&mut self, outcome: Result<()>) -> StyleEvent {
        match outcome {
            Ok(()) => {
                self.doc = StyleDocument::default();
                self.dirty = false;
                self.revision += 1;
                self.status = StyleStatus::Idle;
                self.write_cache();
                StyleEvent::Reset
            }
            Err(e) => {
                self.status = StyleStatus::Error(e.to_string());
                StyleEvent::ResetFailed(e.to_string())
            }
        }
    }

    /// Collect a finished background job, if any. Call once per frame.
    pub fn pump(&mut self) -> Option<StyleEvent> {
        let job = self.job.take()?;
        match job {
            Job::Load(rx) => match rx.try_recv() {
                Ok(outcome) => Some(self.finish_load(outcome)),
                Err(TryRecvError::Empty) => {
                    self.job = Some(Job::Load(rx));
                    None
                }
                Err(TryRecvError::Disconnected) => {
                    Some(self.finish_load(Err(MapError::Persistence("style load worker vanished".into()))))
                }
            },
            Job::Save { snapshot, rx } => match rx.try_recv() {
                Ok(outcome) => Some(self.finish_save(snapshot, outcome)),
                Err(TryRecvError::Empty) => {
                    self.job = Some(Job::Save { snapshot, rx });
                    None
                }
                Err(TryRecvError::Disconnected) => Some(self.finish_save(
                    snapshot,
                    Err(MapError::Persistence("style save worker vanished".into())),
                )),
            },
            Job::Reset(rx) => match rx.try_recv() {
                Ok(outcome) => Some(self.finish_reset(outcome)),
                Err(TryRecvError::Empty) => {
                    self.job = Some(Job::Reset(rx));
                    None
                }
                Err(TryRecvError::Disconnected) => {
                    Some(self.finish_reset(Err(MapError::Persistence("style reset worker vanished".into()))))
                }
            },
        }
    }
}
