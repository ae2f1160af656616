use crate::types::Result;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Post identifiers already acted upon, backed by a plain text file with one
/// identifier per line.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    uris: BTreeSet<String>,
}

impl Ledger {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            uris: BTreeSet::new(),
        }
    }

    /// Load the ledger at `path`. A missing file is an empty ledger; any other
    /// read failure is returned.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No ledger at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(e.into()),
        };

        let uris: BTreeSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        info!("Loaded {} handled posts from {}", uris.len(), path.display());
        Ok(Self { path, uris })
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.uris.contains(uri)
    }

    /// Record `uri` as handled. Returns false if it was already present.
    pub fn insert(&mut self, uri: impl Into<String>) -> bool {
        self.uris.insert(uri.into())
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.uris.iter().map(String::as_str)
    }

    /// Write the sorted ledger to `<path>.tmp`, then rename it over `path`.
    /// The previous file stays intact unless the write fully succeeded.
    pub async fn save(&self) -> Result<()> {
        let tmp = self.temp_path();

        let mut content = String::with_capacity(self.uris.iter().map(|u| u.len() + 1).sum());
        for uri in &self.uris {
            content.push_str(uri);
            content.push('\n');
        }

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &self.path).await?;
        debug!("Persisted {} entries to {}", self.uris.len(), self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
