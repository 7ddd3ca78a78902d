//! Filesystem session store - one JSON file per session

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Session, SessionStore};
use crate::error::Result;

/// Default sessions directory path
pub fn sessions_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("deskclerk"))
        .unwrap_or_else(|| PathBuf::from(".deskclerk"))
        .join("sessions")
}

/// Session store backed by JSON files in a directory
pub struct FsSessionStore {
    dir: PathBuf,
}

impl FsSessionStore {
    /// Store in the default data directory
    pub fn new() -> Self {
        Self { dir: sessions_dir() }
    }

    /// Store in a specific directory
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// List all stored sessions, most recently touched first.
    ///
    /// Unreadable files are skipped with a warning.
    pub fn list(&self) -> Result<Vec<Session>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match std::fs::read_to_string(&path) {
                    Ok(json) => match serde_json::from_str::<Session>(&json) {
                        Ok(session) => sessions.push(session),
                        Err(e) => warn!("Failed to parse session {:?}: {}", path, e),
                    },
                    Err(e) => warn!("Failed to read session {:?}: {}", path, e),
                }
            }
        }

        sessions.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(sessions)
    }
}

impl Default for FsSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for FsSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)?;
        let session: Session = serde_json::from_str(&json)?;
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&session.session_id);
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&path, json)?;
        info!("Saved session {} to {:?}", session.session_id, path);
        Ok(())
    }
}
