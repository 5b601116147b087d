use std::collections::BTreeMap;
use std::path::Path;

use crate::{ImageToolError, Result};

/// Key/value source for tool configuration: a dotenv overlay on top of the
/// process environment.
#[derive(Clone)]
pub struct Env {
    pub dotenv: BTreeMap<String, String>,
    /// When false, lookups never fall through to `std::env`.
    pub inherit_process: bool,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            dotenv: BTreeMap::new(),
            inherit_process: true,
        }
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&str> = self.dotenv.keys().map(|key| key.as_str()).collect();
        f.debug_struct("Env")
            .field("dotenv_keys", &keys)
            .field("inherit_process", &self.inherit_process)
            .finish()
    }
}

impl Env {
    pub fn parse_dotenv(contents: &str) -> Self {
        Self {
            dotenv: parse_dotenv(contents),
            ..Self::default()
        }
    }

    pub async fn load_dotenv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
            ImageToolError::Configuration(format!(
                "failed to read dotenv file {}: {err}",
                path.display()
            ))
        })?;
        Ok(Self::parse_dotenv(&contents))
    }

    /// An env that only sees `vars`; the process environment is ignored.
    pub fn isolated<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dotenv: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            inherit_process: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.dotenv.get(key).filter(|v| !v.trim().is_empty()) {
            return Some(value.clone());
        }
        if !self.inherit_process {
            return None;
        }
        std::env::var(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> Result<String> {
        self.get(key).ok_or_else(|| {
            ImageToolError::Configuration(format!("Missing {key} environment variable."))
        })
    }
}

/// Parses `KEY=value` lines. Blank values, comments and malformed lines are
/// dropped; quoted values keep inner `#`, unquoted ones end at ` #`.
pub fn parse_dotenv(contents: &str) -> BTreeMap<String, String> {
    contents.lines().filter_map(dotenv_entry).collect()
}

fn dotenv_entry(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);
    let (key, raw) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let raw = raw.trim();
    let value = ['"', '\'']
        .iter()
        .find_map(|quote| raw.strip_prefix(*quote)?.strip_suffix(*quote))
        .unwrap_or_else(|| raw.split_once(" #").map_or(raw, |(value, _)| value.trim_end()));

    (!value.trim().is_empty()).then(|| (key.to_string(), value.to_string()))
}
