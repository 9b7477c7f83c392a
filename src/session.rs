//! The one piece of client-side persisted state: the selected customer.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::errors::ApiResult;
use crate::model::CustomerId;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct SessionState {
    #[serde(default)]
    selected_customer_id: Option<CustomerId>,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file counts as "nothing selected".
    async fn read(&self) -> SessionState {
        match fs::read(&self.path).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|err| {
                warn!(?err, path = %self.path.display(), "ignoring corrupt session file");
                SessionState::default()
            }),
            Err(_) => SessionState::default(),
        }
    }

    async fn write(&self, state: &SessionState) -> ApiResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(state)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&tmp, raw).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub async fn selected_customer(&self) -> Option<CustomerId> {
        self.read().await.selected_customer_id
    }

    #[instrument(skip(self))]
    pub async fn select_customer(&self, id: CustomerId) -> ApiResult<()> {
        let mut state = self.read().await;
        state.selected_customer_id = Some(id);
        self.write(&state).await?;
        debug!(path = %self.path.display(), "selected customer saved");
        Ok(())
    }

    pub async fn clear(&self) -> ApiResult<()> {
        let mut state = self.read().await;
        state.selected_customer_id = None;
        self.write(&state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn select_and_clear_round_trip() {
        let td = tempdir().unwrap();
        let store = SessionStore::new(td.path().join("nested").join("session.json"));
        assert_eq!(store.selected_customer().await, None);

        store.select_customer(12).await.unwrap();
        assert_eq!(store.selected_customer().await, Some(12));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("selectedCustomerId"));

        store.clear().await.unwrap();
        assert_eq!(store.selected_customer().await, None);
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let td = tempdir().unwrap();
        let path = td.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let store = SessionStore::new(&path);
        assert_eq!(store.selected_customer().await, None);
        store.select_customer(3).await.unwrap();
        assert_eq!(store.selected_customer().await, Some(3));
    }
}
