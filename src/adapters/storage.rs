use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.full_path(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.full_path(path).exists())
    }

    async fn list_dirs(&self, path: &str) -> Result<Vec<String>> {
        let mut dirs = Vec::new();
        for entry in fs::read_dir(self.full_path(path))? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    dirs.push(name.to_string());
                }
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        storage
            .write_file("data/Leeds/pet_shop.csv", b"index\n")
            .await
            .unwrap();

        assert!(storage.exists("data/Leeds/pet_shop.csv").await.unwrap());
        assert!(!storage.exists("data/York/pet_shop.csv").await.unwrap());
        assert_eq!(
            storage.read_file("data/Leeds/pet_shop.csv").await.unwrap(),
            b"index\n"
        );
    }

    #[tokio::test]
    async fn test_list_dirs_skips_files_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        storage.write_file("data/York/a.csv", b"").await.unwrap();
        storage.write_file("data/Bath/a.csv", b"").await.unwrap();
        storage.write_file("data/notes.txt", b"").await.unwrap();

        assert_eq!(
            storage.list_dirs("data").await.unwrap(),
            vec!["Bath".to_string(), "York".to_string()]
        );
    }
}
