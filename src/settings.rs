use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    /// Runtime-entered Gemini credential. Takes precedence over the
    /// build-time default when present.
    gemini_api_key: Option<String>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn api_key(&self) -> Option<String> {
        self.data.read().unwrap().gemini_api_key.clone()
    }

    pub fn set_api_key(&self, api_key: impl Into<String>) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.gemini_api_key = Some(api_key.into());
        self.persist(&guard)
    }

    pub fn clear_api_key(&self) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.gemini_api_key = None;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
