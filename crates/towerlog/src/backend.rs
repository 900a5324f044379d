//! Key-value persistence behind the record store
//!
//! The store only ever needs whole-value reads and writes, so any backend
//! that can hold a string per key will do. [`MemoryStore`] backs tests and
//! previews; [`FileStore`] keeps one JSON file per key under a data root.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait KeyValueStore {
  /// `Ok(None)` when nothing was ever written under `key`
  fn get(&self, key: &str) -> io::Result<Option<String>>;

  fn set(&mut self, key: &str, value: &str) -> io::Result<()>;

  /// Removing a missing key is not an error
  fn remove(&mut self, key: &str) -> io::Result<()>;

  /// Remove every key starting with `prefix`, returning how many went
  fn remove_prefix(&mut self, prefix: &str) -> io::Result<usize>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  entries: BTreeMap<String, String>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> io::Result<Option<String>> {
    Ok(self.entries.get(key).cloned())
  }

  fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
    self.entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&mut self, key: &str) -> io::Result<()> {
    self.entries.remove(key);
    Ok(())
  }

  fn remove_prefix(&mut self, prefix: &str) -> io::Result<usize> {
    let before = self.entries.len();
    self.entries.retain(|key, _| !key.starts_with(prefix));
    Ok(before - self.entries.len())
  }
}

const FILE_EXTENSION: &str = "json";

/// One `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
  root: PathBuf,
}

impl FileStore {
  /// The directory is created lazily on first write
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.root.join(format!("{key}.{FILE_EXTENSION}"))
  }

  fn keys(&self) -> io::Result<Vec<String>> {
    if !self.root.exists() {
      return Ok(Vec::new());
    }

    let mut keys = Vec::new();
    for entry in fs::read_dir(&self.root)? {
      let path = entry?.path();
      if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
        continue;
      }
      if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
        keys.push(stem.to_string());
      }
    }

    keys.sort();
    Ok(keys)
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> io::Result<Option<String>> {
    match fs::read_to_string(self.path_for(key)) {
      Ok(content) => Ok(Some(content)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }

  fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
    fs::create_dir_all(&self.root)?;

    // Staged beside the target, then renamed into place
    let path = self.path_for(key);
    let staging = path.with_extension(format!("{FILE_EXTENSION}.tmp"));
    fs::write(&staging, value)?;
    fs::rename(&staging, &path)?;

    debug!(path = %path.display(), bytes = value.len(), "Wrote store file");
    Ok(())
  }

  fn remove(&mut self, key: &str) -> io::Result<()> {
    match fs::remove_file(self.path_for(key)) {
      Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
      _ => Ok(()),
    }
  }

  fn remove_prefix(&mut self, prefix: &str) -> io::Result<usize> {
    let mut removed = 0;
    for key in self.keys()?.into_iter().filter(|key| key.starts_with(prefix)) {
      self.remove(&key)?;
      removed += 1;
    }
    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn exercise(store: &mut dyn KeyValueStore) {
    assert_eq!(store.get("tower-a").unwrap(), None);

    store.set("tower-a", "[1]").unwrap();
    store.set("tower-b", "[2]").unwrap();
    store.set("other", "[3]").unwrap();
    assert_eq!(store.get("tower-a").unwrap().as_deref(), Some("[1]"));

    store.set("tower-a", "[4]").unwrap();
    assert_eq!(store.get("tower-a").unwrap().as_deref(), Some("[4]"));

    store.remove("tower-b").unwrap();
    store.remove("tower-b").unwrap();
    assert_eq!(store.get("tower-b").unwrap(), None);

    store.set("tower-c", "[5]").unwrap();
    assert_eq!(store.remove_prefix("tower-").unwrap(), 2);
    assert_eq!(store.get("tower-a").unwrap(), None);
    assert_eq!(store.get("other").unwrap().as_deref(), Some("[3]"));
  }

  #[test]
  fn test_memory_store_contract() {
    let mut store = MemoryStore::new();
    exercise(&mut store);
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn test_file_store_contract() {
    let temp = TempDir::new().unwrap();
    let mut store = FileStore::new(temp.path().join("data"));
    exercise(&mut store);
    assert!(temp.path().join("data").join("other.json").exists());
  }

  #[test]
  fn test_file_store_reads_missing_root_as_empty() {
    let temp = TempDir::new().unwrap();
    let mut store = FileStore::new(temp.path().join("never-created"));
    assert_eq!(store.get("anything").unwrap(), None);
    assert_eq!(store.remove_prefix("any").unwrap(), 0);
  }
}
