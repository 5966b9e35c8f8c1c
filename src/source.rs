use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Read access to the static content tree. Paths are `/`-separated and
/// relative to the content root. A missing file is `Ok(None)`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<String>>;
    /// Names of the immediate subdirectories of `path`, sorted.
    async fn list_dirs(&self, path: &str) -> Result<Vec<String>>;
}

/// Content directory on disk.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/').filter(|p| !p.is_empty() && *p != "..").fold(self.root.clone(), |acc, p| acc.join(p))
    }
}

#[async_trait]
impl ContentSource for FsSource {
    async fn read(&self, path: &str) -> Result<Option<String>> {
        let full = self.resolve(path);
        match tokio::fs::read_to_string(&full).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", full.display())),
        }
    }

    async fn list_dirs(&self, path: &str) -> Result<Vec<String>> {
        let full = self.resolve(path);
        let mut entries = match tokio::fs::read_dir(&full).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("listing {}", full.display())),
        };
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                out.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}

/// In-memory content tree, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: &str, text: &str) {
        self.files.insert(path.trim_start_matches('/').to_string(), text.to_string());
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn read(&self, path: &str) -> Result<Option<String>> {
        Ok(self.files.get(path.trim_start_matches('/')).cloned())
    }

    async fn list_dirs(&self, path: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", path.trim_matches('/'));
        let mut dirs: Vec<String> = self
            .files
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once('/').map(|(dir, _)| dir.to_string()))
            .collect();
        dirs.sort();
        dirs.dedup();
        Ok(dirs)
    }
}
