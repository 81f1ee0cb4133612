use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// Files below a base directory on local disk.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        let data = fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Readers only ever observe complete documents.
        let tmp_path = full_path.with_extension("tmp");
        fs::write(&tmp_path, data).await?;
        fs::rename(&tmp_path, &full_path).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.base_path.join(path)).await?)
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut pending = vec![self.base_path.join(dir)];

        while let Some(current) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.base_path) {
                    let relative: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    files.push(relative.join("/"));
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Process-local storage, used by tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.files.read().await.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, format!("{} not found", path)).into()
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.files
            .write()
            .await
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.read().await.contains_key(path))
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .files
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_round_trip_and_listing() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_file("users/a/1.json", b"{}").await.unwrap();
        storage.write_file("users/b/2.json", b"[]").await.unwrap();
        storage.write_file("other/3.json", b"1").await.unwrap();

        assert_eq!(storage.read_file("users/b/2.json").await.unwrap(), b"[]");
        assert!(storage.exists("users/a/1.json").await.unwrap());
        assert!(!storage.exists("users/a/9.json").await.unwrap());
        assert_eq!(
            storage.list_files("users").await.unwrap(),
            vec!["users/a/1.json".to_string(), "users/b/2.json".to_string()]
        );
        assert!(storage.list_files("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_storage_missing_file_is_io_error() {
        let storage = MemoryStorage::new();
        storage.write_file("a/b.json", b"x").await.unwrap();

        assert_eq!(storage.list_files("a").await.unwrap(), vec!["a/b.json".to_string()]);
        assert!(storage.list_files("ab").await.unwrap().is_empty());
        assert!(storage.read_file("a/c.json").await.is_err());
    }
}
