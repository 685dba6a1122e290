use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "kb-minigames";
const SCORES_FILE: &str = "scores.json";

#[derive(Debug, Error)]
pub enum StoreError
{
    #[error("failed to write {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode scores: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait ScoreStore
{
    fn get(&self, key: &str) -> Option<u32>;
    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryScoreStore
{
    values: BTreeMap<String, u32>,
}

impl MemoryScoreStore
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn with(key: &str, value: u32) -> Self
    {
        let mut store = Self::default();
        store.values.insert(key.to_string(), value);
        store
    }
}

impl ScoreStore for MemoryScoreStore
{
    fn get(&self, key: &str) -> Option<u32>
    {
        self.values.get(key).copied()
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError>
    {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Default, Serialize, Deserialize)]
struct ScoreFile
{
    scores: BTreeMap<String, u32>,
}

/// Scores kept in a small JSON file. The whole file is rewritten on every
/// `set`.
pub struct JsonScoreStore
{
    path: PathBuf,
    file: ScoreFile,
}

impl JsonScoreStore
{
    /// Opens `<data dir>/kb-minigames/scores.json`, or the directory named by
    /// `KB_MINIGAMES_DATA_DIR`.
    pub fn open_default() -> Self
    {
        Self::open(default_path())
    }

    pub fn open(path: impl Into<PathBuf>) -> Self
    {
        let path = path.into();
        let file: ScoreFile = fs::read_to_string(&path)
            .ok()
            .and_then(|text| match serde_json::from_str(&text) {
                Ok(file) => Some(file),
                Err(err) => {
                    warn!("ignoring unreadable score file {}: {err}", path.display());
                    None
                }
            })
            .unwrap_or_default();
        Self { path, file }
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }
}

impl ScoreStore for JsonScoreStore
{
    fn get(&self, key: &str) -> Option<u32>
    {
        self.file.scores.get(key).copied()
    }

    fn set(&mut self, key: &str, value: u32) -> Result<(), StoreError>
    {
        self.file.scores.insert(key.to_string(), value);
        let json = serde_json::to_string_pretty(&self.file)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn default_path() -> PathBuf
{
    let mut path = match env::var_os("KB_MINIGAMES_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(APP_DIR);
            path
        }
    };
    path.push(SCORES_FILE);
    path
}

/// A single best score under one key, read once when created.
pub struct HighScore<S>
{
    store: S,
    key: &'static str,
    value: u32,
}

impl<S: ScoreStore> HighScore<S>
{
    pub fn load(store: S, key: &'static str) -> Self
    {
        let value = store.get(key).unwrap_or(0);
        Self { store, key, value }
    }

    pub fn value(&self) -> u32
    {
        self.value
    }

    /// Records `score` if it beats the current best. Returns whether it did.
    /// A failed write keeps the new value for this session.
    pub fn submit(&mut self, score: u32) -> bool
    {
        if score <= self.value {
            return false;
        }
        self.value = score;
        if let Err(err) = self.store.set(self.key, score) {
            warn!("could not save high score: {err}");
        }
        true
    }

    pub fn store(&self) -> &S
    {
        &self.store
    }
}
