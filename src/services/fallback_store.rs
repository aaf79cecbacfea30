use chrono::Utc;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::rsvp::{RsvpFields, RsvpRecord};

pub const DEFAULT_STORAGE_KEY: &str = "rsvp_responses";

#[derive(Error, Debug)]
pub enum FallbackError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Local store at {0} is not a JSON object")]
    Corrupt(PathBuf),
}

/// File-backed list of responses kept when the backend cannot be reached.
///
/// The file holds one JSON object; the configured key maps to the list of
/// records. Every append rewrites the whole file through a temp file.
#[derive(Clone)]
pub struct LocalFallbackStore {
    path: PathBuf,
    key: String,
    write_lock: Arc<Mutex<()>>,
}

impl LocalFallbackStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, fields: RsvpFields) -> Result<RsvpRecord, FallbackError> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read_document().await?;
        let mut records = self.records_in(&document)?;

        let now = Utc::now();
        let last_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        let id = now.timestamp_millis().max(last_id + 1);

        let record = fields.into_record(id, now);
        records.push(record.clone());

        document.insert(self.key.clone(), serde_json::to_value(&records)?);
        self.write_document(&document).await?;

        info!(
            rsvp_id = id,
            path = %self.path.display(),
            stored = records.len(),
            "RSVP saved locally"
        );
        Ok(record)
    }

    pub async fn all(&self) -> Result<Vec<RsvpRecord>, FallbackError> {
        let document = self.read_document().await?;
        self.records_in(&document)
    }

    async fn read_document(&self) -> Result<Map<String, Value>, FallbackError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No local store yet");
                return Ok(Map::new());
            }
            Err(source) => {
                return Err(FallbackError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(FallbackError::Corrupt(self.path.clone())),
        }
    }

    fn records_in(&self, document: &Map<String, Value>) -> Result<Vec<RsvpRecord>, FallbackError> {
        match document.get(&self.key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), FallbackError> {
        let io_err = |source: std::io::Error| FallbackError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(io_err)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).await.map_err(io_err)?;
        fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rsvp::{Attendance, GenderPrediction};
    use tempfile::TempDir;

    fn fields(name: &str) -> RsvpFields {
        RsvpFields {
            guest_name: name.to_string(),
            email: "guest@example.com".to_string(),
            phone: Some("+6591234567".to_string()),
            attendee_count: 2,
            attendance: Attendance::Coming,
            gender_prediction: GenderPrediction::Boy,
            dietary_restrictions: None,
            special_message: Some("See you there".to_string()),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocalFallbackStore::new(dir.path().join("fallback.json"), DEFAULT_STORAGE_KEY);
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_list_keeps_fields() {
        let dir = TempDir::new().unwrap();
        let store = LocalFallbackStore::new(dir.path().join("fallback.json"), DEFAULT_STORAGE_KEY);

        let stored = store.append(fields("Bea")).await.unwrap();
        let listed = store.all().await.unwrap();

        assert_eq!(listed, vec![stored.clone()]);
        assert_eq!(stored.fields(), fields("Bea"));
        assert!(stored.id > 0);
    }

    #[tokio::test]
    async fn test_ids_strictly_increase() {
        let dir = TempDir::new().unwrap();
        let store = LocalFallbackStore::new(dir.path().join("fallback.json"), DEFAULT_STORAGE_KEY);

        let first = store.append(fields("One")).await.unwrap();
        let second = store.append(fields("Two")).await.unwrap();
        let third = store.append(fields("Three")).await.unwrap();

        assert!(first.id < second.id);
        assert!(second.id < third.id);
        assert_eq!(store.all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_other_keys_are_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fallback.json");
        std::fs::write(&path, r#"{"theme": "pink"}"#).unwrap();

        let store = LocalFallbackStore::new(&path, DEFAULT_STORAGE_KEY);
        store.append(fields("Cai")).await.unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "pink");
        assert_eq!(raw[DEFAULT_STORAGE_KEY].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fallback.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = LocalFallbackStore::new(&path, DEFAULT_STORAGE_KEY);
        assert!(matches!(store.append(fields("Dee")).await, Err(FallbackError::Corrupt(_))));
    }
}
