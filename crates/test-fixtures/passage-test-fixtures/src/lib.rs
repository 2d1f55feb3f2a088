use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    pages: HashMap<String, PageEntry>,
    translations: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PageEntry {
    Path(String),
    Detailed { path: String, url: String },
}

impl PageEntry {
    fn as_path(&self) -> &str {
        match self {
            PageEntry::Path(path) => path,
            PageEntry::Detailed { path, .. } => path,
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = fixtures_root().join(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Destination documents as a site would serve them.
pub mod pages {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.pages.keys().cloned().collect()
    }

    pub fn html(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.pages, "page", name)?;
        read_to_string(entry.as_path())
    }

    /// URL the page is served under; pages without one live at `/<name>/`.
    pub fn url(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.pages, "page", name)?;
        Ok(match entry {
            PageEntry::Detailed { url, .. } => url.clone(),
            PageEntry::Path(_) => format!("https://atelier.test/{name}/"),
        })
    }
}

/// Translation tables in the `{ lang: { key: text } }` shape.
pub mod translations {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.translations.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.translations, "translation", name)?;
        read_to_string(rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_manifest_entry_resolves() {
        for key in pages::keys() {
            pages::html(&key).unwrap_or_else(|e| panic!("page {key}: {e:#}"));
            assert!(pages::url(&key).unwrap().starts_with("https://atelier.test/"));
        }
        for key in translations::keys() {
            translations::json(&key).unwrap_or_else(|e| panic!("translation {key}: {e:#}"));
        }
    }

    #[test]
    fn unknown_fixture_is_an_error() {
        assert!(pages::html("nope").is_err());
    }
}
