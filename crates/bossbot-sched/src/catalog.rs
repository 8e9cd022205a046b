//! Boss catalog lookup.
//!
//! The catalog file is community-maintained and its field names drifted over
//! time (`nome`/`name`, `imagem`/`image`/`img`, ...), so rows are read
//! through a lenient raw shape and normalized. The file is re-read on every
//! lookup: an edit takes effect on the next command, no restart needed.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use bossbot_types::CatalogEntry;

/// One row as it may appear on disk, every alias optional.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    nome: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    titulo: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    imagem: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    img: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl RawEntry {
    fn normalize(self) -> CatalogEntry {
        let id = self.id.as_ref().and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let key = self
            .nome
            .clone()
            .or_else(|| self.name.clone())
            .or_else(|| id.clone())
            .or_else(|| self.key.clone())
            .unwrap_or_default()
            .to_lowercase();
        let titulo = self
            .titulo
            .or(self.title)
            .or(self.nome)
            .or(self.name);
        let imagem = self.imagem.or(self.image).or(self.img).or(self.picture);
        CatalogEntry {
            key,
            titulo,
            imagem,
            id,
        }
    }
}

/// Read-only boss catalog backed by a JSON file.
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and normalize every entry. Absent or unparsable file yields an
    /// empty catalog, never an error.
    pub fn load(&self) -> Vec<CatalogEntry> {
        if !self.path.exists() {
            return Vec::new();
        }
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read catalog: {e}");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<RawEntry>>(&content) {
            Ok(raw) => raw.into_iter().map(RawEntry::normalize).collect(),
            Err(e) => {
                warn!(path = %self.path.display(), "Unparsable catalog: {e}");
                Vec::new()
            }
        }
    }

    /// Resolve a free-text key to an entry. Exact case-insensitive match on
    /// the catalog key, else on the display title, else on the external id.
    /// First match wins; no fuzzy matching.
    pub fn find(&self, key: &str) -> Option<CatalogEntry> {
        let needle = key.to_lowercase();
        let entries = self.load();
        entries
            .iter()
            .find(|e| !e.key.is_empty() && e.key == needle)
            .or_else(|| {
                entries.iter().find(|e| {
                    e.titulo
                        .as_ref()
                        .is_some_and(|t| t.to_lowercase() == needle)
                })
            })
            .or_else(|| {
                entries
                    .iter()
                    .find(|e| e.id.as_ref().is_some_and(|i| i.to_lowercase() == needle))
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_catalog(content: &str) -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bosses.json");
        std::fs::write(&path, content).unwrap();
        (dir, Catalog::new(path))
    }

    #[test]
    fn test_missing_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(dir.path().join("bosses.json"));
        assert!(catalog.find("dragon").is_none());
    }

    #[test]
    fn test_find_by_key_case_insensitive() {
        let (_dir, catalog) = write_catalog(
            r#"[{"nome": "Dragon", "titulo": "Ancient Dragon", "imagem": "http://x/d.png"}]"#,
        );
        let entry = catalog.find("DRAGON").unwrap();
        assert_eq!(entry.key, "dragon");
        assert_eq!(entry.titulo.as_deref(), Some("Ancient Dragon"));
        assert_eq!(entry.imagem.as_deref(), Some("http://x/d.png"));
    }

    #[test]
    fn test_find_by_title() {
        let (_dir, catalog) =
            write_catalog(r#"[{"nome": "dragon", "titulo": "Ancient Dragon"}]"#);
        let entry = catalog.find("ancient dragon").unwrap();
        assert_eq!(entry.key, "dragon");
    }

    #[test]
    fn test_find_by_external_id() {
        let (_dir, catalog) =
            write_catalog(r#"[{"nome": "dragon", "titulo": "Ancient Dragon", "id": 42}]"#);
        let entry = catalog.find("42").unwrap();
        assert_eq!(entry.key, "dragon");
    }

    #[test]
    fn test_key_match_beats_title_match() {
        let (_dir, catalog) = write_catalog(
            r#"[
                {"nome": "wyrm", "titulo": "dragon"},
                {"nome": "dragon", "titulo": "Ancient Dragon"}
            ]"#,
        );
        // "dragon" is the second row's key and the first row's title; key wins.
        let entry = catalog.find("dragon").unwrap();
        assert_eq!(entry.titulo.as_deref(), Some("Ancient Dragon"));
    }

    #[test]
    fn test_alias_fields_normalized() {
        let (_dir, catalog) =
            write_catalog(r#"[{"name": "Hydra", "title": "Swamp Hydra", "img": "http://x/h.png"}]"#);
        let entry = catalog.find("hydra").unwrap();
        assert_eq!(entry.titulo.as_deref(), Some("Swamp Hydra"));
        assert_eq!(entry.imagem.as_deref(), Some("http://x/h.png"));
    }

    #[test]
    fn test_no_fuzzy_match() {
        let (_dir, catalog) = write_catalog(r#"[{"nome": "dragon"}]"#);
        assert!(catalog.find("drag").is_none());
    }

    #[test]
    fn test_edit_visible_on_next_lookup() {
        let (_dir, catalog) = write_catalog(r#"[{"nome": "dragon"}]"#);
        assert!(catalog.find("hydra").is_none());
        std::fs::write(catalog.path(), r#"[{"nome": "hydra"}]"#).unwrap();
        assert!(catalog.find("hydra").is_some());
    }

    #[test]
    fn test_unparsable_catalog_empty() {
        let (_dir, catalog) = write_catalog("not json at all");
        assert!(catalog.find("dragon").is_none());
    }
}
