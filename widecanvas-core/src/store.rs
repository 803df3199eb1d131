//! Persisted HTML store for published previews and apps.
//!
//! [`LinkStore`] is the boundary the server reads and writes; the editor only
//! needs the narrower [`LinkWriter`]. [`MemoryLinkStore`] is a thread-safe
//! implementation with optional JSON-file persistence.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::PreviewResult;
use crate::preview::PreviewId;

/// Key of a stored link record.
///
/// Shape links and named apps live in separate key spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum LinkKey {
    /// A canvas preview shape, published under `/link/{id}`.
    Shape(PreviewId),
    /// A named app, published under `/{app-name}`.
    App(String),
}

impl LinkKey {
    fn file_stem(&self) -> String {
        match self {
            Self::Shape(id) => format!("shape~{}", encode_component(id.as_str())),
            Self::App(name) => format!("app~{}", encode_component(name)),
        }
    }
}

impl std::fmt::Display for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape(id) => write!(f, "link {id}"),
            Self::App(name) => write!(f, "app {name}"),
        }
    }
}

/// Server-side projection of a preview: the HTML plus link-preview metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Full HTML document.
    pub html: String,
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Page description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Social preview image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl LinkRecord {
    /// Record with HTML only.
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    /// Set the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the social preview image.
    #[must_use]
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Read/write access to stored link records.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Fetch a record.
    async fn get(&self, key: &LinkKey) -> PreviewResult<Option<LinkRecord>>;

    /// Insert or replace a whole record.
    async fn put(&self, key: &LinkKey, record: LinkRecord) -> PreviewResult<()>;

    /// Insert or replace the HTML of a record, keeping its metadata.
    async fn upsert_html(&self, key: &LinkKey, html: String) -> PreviewResult<()>;
}

/// Update-by-identifier access used by the editor's save action.
#[async_trait]
pub trait LinkWriter: Send + Sync {
    /// Persist `html` for the preview `id`.
    async fn update_html(&self, id: &PreviewId, html: &str) -> PreviewResult<()>;
}

#[derive(Serialize, Deserialize)]
struct StoredLink {
    key: LinkKey,
    record: LinkRecord,
}

/// Thread-safe link store, optionally persisted to a directory.
///
/// Writers are serialized and hold no lock on the records while a file is
/// written, so page reads never wait on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryLinkStore {
    records: Arc<RwLock<HashMap<LinkKey, LinkRecord>>>,
    writer: Arc<Mutex<()>>,
    /// Optional data directory for filesystem persistence.
    data_dir: Option<PathBuf>,
}

impl MemoryLinkStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `data_dir`, loading any records already there.
    ///
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory can't be created or listed. Record
    /// files that can't be read or parsed are logged and skipped.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> PreviewResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let mut records = HashMap::new();
        for entry in std::fs::read_dir(&data_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match load_record(&path) {
                    Ok(stored) => {
                        records.insert(stored.key, stored.record);
                    }
                    Err(e) => {
                        tracing::warn!("Skipping unreadable link record {}: {e}", path.display());
                    }
                }
            }
        }
        tracing::info!(
            "Loaded {} link records from {}",
            records.len(),
            data_dir.display()
        );

        Ok(Self {
            records: Arc::new(RwLock::new(records)),
            writer: Arc::default(),
            data_dir: Some(data_dir),
        })
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write `record` to disk. No-op without a data directory.
    ///
    /// The file is written next to its target and renamed into place, so a
    /// crash mid-write never leaves a truncated record behind.
    async fn persist(&self, key: &LinkKey, record: &LinkRecord) -> PreviewResult<()> {
        let Some(ref data_dir) = self.data_dir else {
            return Ok(());
        };
        let stored = StoredLink {
            key: key.clone(),
            record: record.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        let stem = key.file_stem();
        let path = data_dir.join(format!("{stem}.json"));
        let tmp = data_dir.join(format!("{stem}.json.tmp"));

        let target = path.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::write(&tmp, json)?;
            std::fs::rename(&tmp, &target)
        })
        .await
        .map_err(std::io::Error::other)?
        .map_err(|e| {
            tracing::warn!("Failed to persist {key} to {}: {e}", path.display());
            e
        })?;
        Ok(())
    }

    /// Read-modify-write of one record.
    ///
    /// The writer lock is held for the whole update, so no other write can
    /// land between reading the current record and storing the new one. The
    /// records map itself is only locked to read and to commit.
    async fn update<F>(&self, key: &LinkKey, apply: F) -> PreviewResult<()>
    where
        F: FnOnce(Option<LinkRecord>) -> LinkRecord + Send,
    {
        let _writer = self.writer.lock().await;
        let current = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        let record = apply(current);
        self.persist(key, &record).await?;
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), record);
        Ok(())
    }
}

fn load_record(path: &Path) -> PreviewResult<StoredLink> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get(&self, key: &LinkKey) -> PreviewResult<Option<LinkRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    async fn put(&self, key: &LinkKey, record: LinkRecord) -> PreviewResult<()> {
        self.update(key, |_| record).await
    }

    async fn upsert_html(&self, key: &LinkKey, html: String) -> PreviewResult<()> {
        self.update(key, |current| LinkRecord {
            html,
            ..current.unwrap_or_default()
        })
        .await
    }
}

#[async_trait]
impl LinkWriter for MemoryLinkStore {
    async fn update_html(&self, id: &PreviewId, html: &str) -> PreviewResult<()> {
        self.upsert_html(&LinkKey::Shape(id.clone()), html.to_string())
            .await
    }
}

/// Encode a key component so distinct keys never share a file name.
///
/// ASCII alphanumerics and `-` pass through; every other byte becomes `_xx`.
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "_{byte:02x}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(id: &str) -> LinkKey {
        LinkKey::Shape(PreviewId::from_raw(id))
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryLinkStore::new();
        assert!(store.get(&shape("nope")).await.expect("get").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_html() {
        let store = MemoryLinkStore::new();
        let key = shape("e1");
        store
            .upsert_html(&key, "<p>one</p>".into())
            .await
            .expect("first write");
        store
            .upsert_html(&key, "<p>two</p>".into())
            .await
            .expect("second write");

        let record = store.get(&key).await.expect("get").expect("record");
        assert_eq!(record.html, "<p>two</p>");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_html_keeps_metadata() {
        let store = MemoryLinkStore::new();
        let key = LinkKey::App("todo".into());
        store
            .put(&key, LinkRecord::new("<p>v1</p>").with_title("Todo"))
            .await
            .expect("put");
        store
            .upsert_html(&key, "<p>v2</p>".into())
            .await
            .expect("upsert");

        let record = store.get(&key).await.expect("get").expect("record");
        assert_eq!(record.html, "<p>v2</p>");
        assert_eq!(record.title.as_deref(), Some("Todo"));
    }

    #[tokio::test]
    async fn test_key_spaces_are_disjoint() {
        let store = MemoryLinkStore::new();
        store
            .upsert_html(&shape("same"), "<p>shape</p>".into())
            .await
            .expect("write");
        assert!(store
            .get(&LinkKey::App("same".into()))
            .await
            .expect("get")
            .is_none());
    }

    #[tokio::test]
    async fn test_writer_targets_shape_key() {
        let store = MemoryLinkStore::new();
        let id = PreviewId::from_raw("shape:xyz");
        store.update_html(&id, "<p>hi</p>").await.expect("write");
        let record = store
            .get(&LinkKey::Shape(id))
            .await
            .expect("get")
            .expect("record");
        assert_eq!(record.html, "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = MemoryLinkStore::with_data_dir(dir.path()).expect("open");
            store
                .upsert_html(&shape("shape:a"), "<p>a</p>".into())
                .await
                .expect("write a");
            store
                .put(
                    &LinkKey::App("my app".into()),
                    LinkRecord::new("<p>app</p>").with_description("demo"),
                )
                .await
                .expect("write app");
        }

        let reopened = MemoryLinkStore::with_data_dir(dir.path()).expect("reopen");
        assert_eq!(reopened.len(), 2);
        let app = reopened
            .get(&LinkKey::App("my app".into()))
            .await
            .expect("get")
            .expect("record");
        assert_eq!(app.description.as_deref(), Some("demo"));
    }

    #[tokio::test]
    async fn test_unparseable_files_are_skipped_on_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = MemoryLinkStore::with_data_dir(dir.path()).expect("open");
            store
                .upsert_html(&shape("shape:good"), "<p>good</p>".into())
                .await
                .expect("write");
        }
        std::fs::write(dir.path().join("notes.json"), r#"{"hello":1}"#).expect("stray");
        std::fs::write(dir.path().join("shape~cut.json"), r#"{"key":{"kind":"sh"#)
            .expect("truncated");

        let reopened = MemoryLinkStore::with_data_dir(dir.path()).expect("reopen");
        assert_eq!(reopened.len(), 1);
        let record = reopened
            .get(&shape("shape:good"))
            .await
            .expect("get")
            .expect("record");
        assert_eq!(record.html, "<p>good</p>");
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MemoryLinkStore::with_data_dir(dir.path()).expect("open");
        store
            .upsert_html(&shape("e1"), "<p>one</p>".into())
            .await
            .expect("first");
        store
            .upsert_html(&shape("e1"), "<p>two</p>".into())
            .await
            .expect("second");

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("list")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["shape~e1.json".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_put_and_upsert_keep_metadata() {
        let store = MemoryLinkStore::new();
        let key = LinkKey::App("todo".into());

        for round in 0..50 {
            let put = {
                let store = store.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    store
                        .put(&key, LinkRecord::new("<p>put</p>").with_title("Todo"))
                        .await
                })
            };
            let upsert = {
                let store = store.clone();
                let key = key.clone();
                tokio::spawn(async move { store.upsert_html(&key, format!("<p>{round}</p>")).await })
            };
            put.await.expect("join").expect("put");
            upsert.await.expect("join").expect("upsert");

            // Whichever order the writes landed in, the title survives.
            let record = store.get(&key).await.expect("get").expect("record");
            assert_eq!(record.title.as_deref(), Some("Todo"));
        }
    }

    #[test]
    fn test_encoding_is_injective() {
        assert_ne!(encode_component("a:b"), encode_component("a_b"));
        assert_ne!(encode_component("a_3ab"), encode_component("a:b"));
        assert_eq!(encode_component("shape:1"), "shape_3a1");
        assert_ne!(shape("x").file_stem(), LinkKey::App("x".into()).file_stem());
    }
}
