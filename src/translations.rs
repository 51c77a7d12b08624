//! Local translation storage seen by the pipelines.
//!
//! The pipelines never look inside translation data. They call a
//! [`TranslationManager`] at fixed points to move entries between a
//! [`TranslationReader`] and a [`TranslationWriter`]. [`JsonTranslationFile`]
//! and [`Catalog`] are the implementations the CLI uses.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::TmsError;

/// One translated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub language: String,
    pub key: String,
    pub value: String,
}

impl TranslationEntry {
    pub fn new(
        language: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Source of translation entries.
pub trait TranslationReader: Send {
    fn read_entries(&mut self) -> Result<Vec<TranslationEntry>, TmsError>;
}

/// Sink for translation entries.
pub trait TranslationWriter: Send {
    fn write_entries(&mut self, entries: &[TranslationEntry]) -> Result<(), TmsError>;
}

/// Owner of the local translations.
///
/// Pipelines hold the manager, reader and writer across awaits, so all three
/// must be `Send` for a pipeline future to be spawned on a multi-threaded
/// runtime.
pub trait TranslationManager: Send + Sync {
    /// Language codes to request from the TMS, in order.
    fn languages(&self) -> Vec<String>;

    /// Copies every entry from `reader` into `writer`, returning how many
    /// entries were written.
    fn copy_translations(
        &self,
        reader: &mut dyn TranslationReader,
        writer: &mut dyn TranslationWriter,
    ) -> Result<usize, TmsError> {
        let entries = reader.read_entries()?;
        writer.write_entries(&entries)?;
        Ok(entries.len())
    }
}

/// Fixed list of managed languages. Entries in other languages are skipped on
/// copy; an empty list copies everything.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    languages: Vec<String>,
}

impl Catalog {
    pub fn new(languages: Vec<String>) -> Self {
        Self { languages }
    }
}

impl TranslationManager for Catalog {
    fn languages(&self) -> Vec<String> {
        self.languages.clone()
    }

    fn copy_translations(
        &self,
        reader: &mut dyn TranslationReader,
        writer: &mut dyn TranslationWriter,
    ) -> Result<usize, TmsError> {
        let mut entries = reader.read_entries()?;
        if !self.languages.is_empty() {
            entries.retain(|e| self.languages.contains(&e.language));
        }
        writer.write_entries(&entries)?;
        Ok(entries.len())
    }
}

/// How [`JsonTranslationFile`] treats existing content on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file.
    Overwrite,
    /// Upsert by `(language, key)`, keeping existing order.
    Merge,
}

/// Translations stored as a JSON array of [`TranslationEntry`].
#[derive(Debug, Clone)]
pub struct JsonTranslationFile {
    path: PathBuf,
    mode: WriteMode,
}

impl JsonTranslationFile {
    pub fn overwrite(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: WriteMode::Overwrite,
        }
    }

    pub fn merge(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: WriteMode::Merge,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<TranslationEntry>, TmsError> {
        let contents = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents)
            .map_err(|e| TmsError::Store(format!("{}: {e}", self.path.display())))
    }
}

impl TranslationReader for JsonTranslationFile {
    fn read_entries(&mut self) -> Result<Vec<TranslationEntry>, TmsError> {
        let entries = self.load()?;
        debug!("Read {} entries from {}", entries.len(), self.path.display());
        Ok(entries)
    }
}

impl TranslationWriter for JsonTranslationFile {
    fn write_entries(&mut self, entries: &[TranslationEntry]) -> Result<(), TmsError> {
        let merged = match self.mode {
            WriteMode::Overwrite => entries.to_vec(),
            WriteMode::Merge => {
                let mut existing = if self.path.exists() {
                    self.load()?
                } else {
                    Vec::new()
                };
                let mut index: HashMap<(String, String), usize> = existing
                    .iter()
                    .enumerate()
                    .map(|(i, e)| ((e.language.clone(), e.key.clone()), i))
                    .collect();
                for entry in entries {
                    let key = (entry.language.clone(), entry.key.clone());
                    match index.get(&key) {
                        Some(&i) => existing[i].value = entry.value.clone(),
                        None => {
                            index.insert(key, existing.len());
                            existing.push(entry.clone());
                        }
                    }
                }
                existing
            }
        };

        let json = serde_json::to_string_pretty(&merged)
            .map_err(|e| TmsError::Store(format!("{}: {e}", self.path.display())))?;
        std::fs::write(&self.path, json)?;
        debug!("Wrote {} entries to {}", merged.len(), self.path.display());
        Ok(())
    }
}
