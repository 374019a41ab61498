use std::path::{Path, PathBuf};

use linkcard_common::EnvVars;

pub struct AssetsEnv {
    pub public_base_url: String,
    pub storage_public_root: String,
}

impl EnvVars for AssetsEnv {
    fn load() -> Self {
        Self {
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap(),
            storage_public_root: std::env::var("STORAGE_PUBLIC_ROOT").unwrap(),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "PUBLIC_BASE_URL" => self.public_base_url.clone(),
            "STORAGE_PUBLIC_ROOT" => self.storage_public_root.clone(),
            _ => panic!("{} is not set", key),
        }
    }
}

/// Where public artifacts live on disk and how their URLs are derived.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base URL prepended to public paths, e.g. `https://cards.example.com`.
    pub base_url: String,
    /// Filesystem root that the web layer serves publicly.
    pub public_root: PathBuf,
}

impl StorageConfig {
    pub fn new(base_url: impl Into<String>, public_root: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            public_root: public_root.into(),
        }
    }

    pub fn from_env() -> Self {
        let env = AssetsEnv::load();
        Self::new(env.public_base_url, env.storage_public_root)
    }

    /// Derives the public URL for a file under the public root: strips the
    /// root prefix and prepends the base URL. Deterministic for any stored
    /// path.
    pub fn public_url(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.public_root).unwrap_or(path);
        let relative = relative.to_string_lossy().replace('\\', "/");
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            relative.trim_start_matches('/')
        )
    }

    /// Inverse of [`public_url`](Self::public_url): maps a URL this config
    /// produced back to its filesystem path. Returns `None` for foreign URLs.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url.strip_prefix(self.base_url.trim_end_matches('/'))?;
        Some(self.public_root.join(relative.trim_start_matches('/')))
    }
}
