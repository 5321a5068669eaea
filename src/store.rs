use crate::config::RemoteConfigSettings;
use crate::ports::store::{FetchedTemplate, TemplateStore};
use crate::types::holiday::{ConfigDocument, HolidayOffsetConfig};
use crate::types::template::{ParameterValue, RemoteConfigTemplate, Revision};

mod edits;

pub use edits::{EditError, append_entry, remove_entry, replace_entry, stamp_submitted, unix_millis};

use serde_json::Map;
use thiserror::Error;

use std::sync::Arc;

const VALUE_TYPE_JSON: &str = "JSON";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Remote config parameter not found")]
    KeyNotFound { key: String },
    #[error("stored configuration is not a valid array: {0}")]
    CorruptDocument(String),
    #[error("configuration was modified concurrently; reload and retry")]
    PublishConflict,
    #[error("failed to serialize configuration: {0}")]
    Serialize(String),
    #[error("remote config rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("remote config request timed out")]
    Timeout,
    #[error("remote config request failed: {0}")]
    Transport(String),
    #[error("failed to obtain remote config credentials: {0}")]
    Credentials(String),
}

/// Reads and replaces the configuration array held under one template parameter.
#[derive(Clone)]
pub struct ConfigRepository {
    store: Arc<dyn TemplateStore>,
    settings: RemoteConfigSettings,
}

impl ConfigRepository {
    pub fn new(store: Arc<dyn TemplateStore>, settings: RemoteConfigSettings) -> Self {
        Self { store, settings }
    }

    pub fn key(&self) -> &str {
        &self.settings.key
    }

    pub async fn read(&self) -> Result<ConfigDocument, StoreError> {
        let fetched = self.store.fetch().await?;
        let entries = self
            .entries_in(&fetched.template)?
            .ok_or_else(|| StoreError::KeyNotFound {
                key: self.settings.key.clone(),
            })?;
        Ok(ConfigDocument {
            entries,
            revision: fetched.revision,
        })
    }

    /// Like [`read`](Self::read), but an unset parameter reads as an empty array.
    pub async fn read_or_empty(&self) -> Result<ConfigDocument, StoreError> {
        let fetched = self.store.fetch().await?;
        let entries = self.entries_in(&fetched.template)?.unwrap_or_default();
        Ok(ConfigDocument {
            entries,
            revision: fetched.revision,
        })
    }

    /// Baseline for a whole-array replace. Unset or unparseable stored values
    /// read as empty so a replace can repair them.
    pub async fn read_for_replace(&self) -> Result<ConfigDocument, StoreError> {
        let fetched = self.store.fetch().await?;
        let entries = match self.entries_in(&fetched.template) {
            Ok(entries) => entries.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(key = %self.settings.key, error = %err, "replacing unparseable stored configuration");
                Vec::new()
            }
        };
        Ok(ConfigDocument {
            entries,
            revision: fetched.revision,
        })
    }

    /// Replaces the whole array and publishes the template. Fails with
    /// [`StoreError::PublishConflict`] when the template moved past `expected`.
    pub async fn write(
        &self,
        entries: &[HolidayOffsetConfig],
        expected: &Revision,
    ) -> Result<String, StoreError> {
        let FetchedTemplate {
            mut template,
            revision,
        } = self.store.fetch().await?;
        if revision != *expected {
            return Err(StoreError::PublishConflict);
        }

        let serialized =
            serde_json::to_string(entries).map_err(|err| StoreError::Serialize(err.to_string()))?;
        let parameter = template
            .parameters
            .entry(self.settings.key.clone())
            .or_default();
        parameter.default_value = Some(ParameterValue {
            value: Some(serialized),
            other: Map::new(),
        });
        parameter.description = Some(self.settings.description.clone());
        parameter.value_type = Some(VALUE_TYPE_JSON.to_string());
        // Version metadata is assigned by the store on publish.
        template.version = None;

        let published = self.store.publish(template, &revision).await?;
        Ok(published
            .version
            .and_then(|version| version.version_number)
            .unwrap_or_default())
    }

    fn entries_in(
        &self,
        template: &RemoteConfigTemplate,
    ) -> Result<Option<Vec<HolidayOffsetConfig>>, StoreError> {
        let raw = template
            .parameters
            .get(&self.settings.key)
            .and_then(|parameter| parameter.default_value.as_ref())
            .and_then(|default_value| default_value.value.as_deref());
        let Some(raw) = raw else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|err| StoreError::CorruptDocument(err.to_string()))
    }
}
