//! Flat JSON-backed label store.
//!
//! Labels are display names attached to `(username, finger)` pairs. The file
//! holds an array of `[username, finger, label]` triples; a duplicate
//! `(username, finger)` pair overwrites the stored label instead of
//! appending. The file is a best-effort mirror: the daemon's enrolled set is
//! the source of truth for which prints exist.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::{EngineError, Finger};

type LabelEntry = (String, String, String);

pub struct LabelStore {
    path: PathBuf,
    entries: Mutex<Vec<LabelEntry>>,
}

impl LabelStore {
    /// Opens the store, loading existing entries when the file is present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|err| EngineError::LabelStore(err.to_string()))?;
            serde_json::from_str(&raw).map_err(|err| EngineError::LabelStore(err.to_string()))?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sets the label for a `(username, finger)` pair, overwriting any
    /// previous entry for the same pair.
    pub async fn set(
        &self,
        username: &str,
        finger: Finger,
        label: &str,
    ) -> Result<(), EngineError> {
        let mut entries = self.entries.lock().await;
        match entries
            .iter_mut()
            .find(|(user, fname, _)| user == username && fname == finger.as_str())
        {
            Some(entry) => entry.2 = label.to_string(),
            None => entries.push((
                username.to_string(),
                finger.as_str().to_string(),
                label.to_string(),
            )),
        }
        self.save(&entries)
    }

    pub async fn get(&self, username: &str, finger: Finger) -> Option<String> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .find(|(user, fname, _)| user == username && fname == finger.as_str())
            .map(|(_, _, label)| label.clone())
    }

    /// Removes the label for a single `(username, finger)` pair.
    pub async fn remove(&self, username: &str, finger: Finger) -> Result<(), EngineError> {
        let mut entries = self.entries.lock().await;
        entries.retain(|(user, fname, _)| !(user == username && fname == finger.as_str()));
        self.save(&entries)
    }

    /// Removes every label belonging to a user.
    pub async fn remove_user(&self, username: &str) -> Result<(), EngineError> {
        let mut entries = self.entries.lock().await;
        entries.retain(|(user, _, _)| user != username);
        self.save(&entries)
    }

    fn save(&self, entries: &[LabelEntry]) -> Result<(), EngineError> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|err| EngineError::LabelStore(err.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|err| EngineError::LabelStore(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_path(name: &str) -> PathBuf {
        let root =
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_labels");
        std::fs::create_dir_all(&root).unwrap();
        root.join(format!("{name}_{}.json", std::process::id()))
    }

    #[tokio::test]
    async fn set_overwrites_existing_pair() {
        let path = store_path("overwrite");
        let _ = std::fs::remove_file(&path);
        let store = LabelStore::open(&path).unwrap();

        store
            .set("alice", Finger::RightIndexFinger, "personal")
            .await
            .unwrap();
        store
            .set("alice", Finger::RightIndexFinger, "work")
            .await
            .unwrap();

        assert_eq!(
            store.get("alice", Finger::RightIndexFinger).await,
            Some("work".to_string())
        );

        // Only one entry survives on disk.
        let raw = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<(String, String, String)> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let path = store_path("reopen");
        let _ = std::fs::remove_file(&path);

        {
            let store = LabelStore::open(&path).unwrap();
            store.set("bob", Finger::LeftThumb, "garage").await.unwrap();
        }

        let store = LabelStore::open(&path).unwrap();
        assert_eq!(
            store.get("bob", Finger::LeftThumb).await,
            Some("garage".to_string())
        );
        assert_eq!(store.get("bob", Finger::RightThumb).await, None);
    }

    #[tokio::test]
    async fn remove_user_drops_all_entries() {
        let path = store_path("remove_user");
        let _ = std::fs::remove_file(&path);
        let store = LabelStore::open(&path).unwrap();

        store.set("carol", Finger::LeftThumb, "a").await.unwrap();
        store
            .set("carol", Finger::RightThumb, "b")
            .await
            .unwrap();
        store.set("dave", Finger::LeftThumb, "c").await.unwrap();

        store.remove_user("carol").await.unwrap();

        assert_eq!(store.get("carol", Finger::LeftThumb).await, None);
        assert_eq!(store.get("carol", Finger::RightThumb).await, None);
        assert_eq!(store.get("dave", Finger::LeftThumb).await, Some("c".to_string()));
    }
}
