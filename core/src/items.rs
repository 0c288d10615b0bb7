//! Local item store: the user's saved notes, persisted as one JSON file.
//!
//! # Design
//! The whole list lives in memory and is rewritten on every change. Writes
//! go to a sibling temp file that is then renamed over the target, so a
//! crash mid-write leaves the previous file intact. `list` always returns
//! newest first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A single saved item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("item store file is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("item title is empty")]
    EmptyTitle,

    #[error("item {0} not found")]
    NotFound(Uuid),
}

#[derive(Debug)]
pub struct ItemStore {
    path: Option<PathBuf>,
    items: Vec<Item>,
}

impl ItemStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), count = items.len(), "opened item store");
        Ok(Self {
            path: Some(path),
            items,
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            items: Vec::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn create(&mut self, title: &str, content: Option<&str>) -> Result<Item, StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let item = Item {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.map(str::to_string),
            created_at: Utc::now(),
        };
        self.items.push(item.clone());
        if let Err(e) = self.persist() {
            self.items.pop();
            return Err(e);
        }
        tracing::debug!(id = %item.id, "created item");
        Ok(item)
    }

    /// All items, newest first.
    pub fn list(&self) -> Vec<Item> {
        let mut items = self.items.clone();
        // Later inserts win ties, so reverse before the stable sort.
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn get(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = self.items.remove(index);
        if let Err(e) = self.persist() {
            self.items.insert(index, removed);
            return Err(e);
        }
        tracing::debug!(%id, "deleted item");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.items)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
