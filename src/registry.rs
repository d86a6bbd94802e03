//! Pre-trained artifact registry.
//!
//! A registry exposes a catalog of named artifacts grouped by category
//! (`"models"`, `"corpora"`) and hands out the raw bytes of an artifact.
//! The local implementation reads a cache directory laid out as
//!
//! ```text
//! <base_dir>/information.json
//! <base_dir>/<name>/<file_name>
//! ```
//!
//! where `information.json` maps `category -> name -> entry`.

use crate::error::{EmbeddingError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub const CATALOG_FILE: &str = "information.json";
pub const MODELS: &str = "models";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ArtifactInfo {
    #[serde(default = "unknown_records")]
    pub num_records: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

fn unknown_records() -> i64 {
    -1
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub num_records: i64,
    pub description: String,
}

impl CatalogEntry {

    // one human readable catalog line, the description is cut to `desc_len` characters when given
    pub fn line(&self, desc_len: Option<usize>) -> String {
        let description: String = match desc_len {
            Some(n) => self.description.chars().take(n).collect(),
            None => self.description.clone(),
        };
        format!("{:<40} {} records: {}...", self.name, self.num_records, description)
    }
}

/// Categories are kept in `BTreeMap`s so every listing comes out sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    categories: HashMap<String, BTreeMap<String, ArtifactInfo>>,
}

impl Catalog {

    pub fn entries(&self, category: &str) -> Result<Vec<CatalogEntry>> {
        let artifacts = self.categories
        .get(category)
        .ok_or_else(|| EmbeddingError::UnknownCategory(category.to_owned()))?;

        Ok(
            artifacts
            .iter()
            .map(|(name, info)| CatalogEntry {
                name: name.to_owned(),
                num_records: info.num_records,
                description: info.description.to_owned(),
            })
            .collect()
        )
    }

    pub fn model(&self, name: &str) -> Option<&ArtifactInfo> {
        self.categories.get(MODELS).and_then(|models| models.get(name))
    }
}

pub trait ModelRegistry {

    fn info(&self) -> Result<Catalog>;

    fn fetch(&self, name: &str) -> Result<Vec<u8>>;

    /// Artifacts of `category`, sorted by name.
    fn list_available(&self, category: &str) -> Result<Vec<CatalogEntry>> {
        self.info()?.entries(category)
    }
}

#[derive(Clone, Debug)]
pub struct LocalRegistry {
    base_dir: PathBuf,
}

impl LocalRegistry {

    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn artifact_path(&self, name: &str, info: &ArtifactInfo) -> PathBuf {
        let file_name = match &info.file_name {
            Some(file_name) => file_name.to_owned(),
            None => format!("{}.gz", name),
        };
        self.base_dir.join(name).join(file_name)
    }
}

impl ModelRegistry for LocalRegistry {

    fn info(&self) -> Result<Catalog> {
        let path = self.base_dir.join(CATALOG_FILE);
        debug!("reading registry catalog {}", path.display());
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let catalog = self.info()?;
        let info = catalog.model(name).ok_or_else(|| EmbeddingError::UnknownModel(name.to_owned()))?;

        let path = self.artifact_path(name, info);
        if !path.is_file() {
            return Err(EmbeddingError::UnknownModel(name.to_owned()));
        }
        debug!("fetching artifact {}", path.display());
        Ok(fs::read(path)?)
    }
}


#[cfg(test)]
pub(crate) mod tests {

    use super::{LocalRegistry, ModelRegistry, CATALOG_FILE};
    use crate::error::EmbeddingError;
    use flate2::{write::GzEncoder, Compression};
    use std::fs;
    use std::io::Write;
    use std::path::Path;

    pub(crate) const CATALOG: &str = r#"{
        "models": {
            "toy-plain": { "num_records": 7, "description": "plain text toy vectors", "file_name": "toy-plain.txt" },
            "toy-gz": { "num_records": 7, "description": "gzip toy vectors" },
            "missing-file": { "description": "catalogued but never downloaded" }
        },
        "corpora": {
            "text8": { "num_records": 1701, "description": "first 100MB of wikipedia" }
        }
    }"#;

    pub(crate) const TOY_VECTORS: &str = "\
woman 0.9 0.1 0.0
man 0.8 0.2 0.1
girl 0.85 0.05 0.2
boy 0.7 0.3 0.2
queen 0.6 0.0 0.4
king 0.5 0.2 0.5
apple -0.2 0.9 0.1
";

    pub(crate) fn toy_registry(dir: &Path) -> LocalRegistry {
        fs::write(dir.join(CATALOG_FILE), CATALOG).unwrap();

        fs::create_dir_all(dir.join("toy-plain")).unwrap();
        fs::write(dir.join("toy-plain").join("toy-plain.txt"), TOY_VECTORS).unwrap();

        fs::create_dir_all(dir.join("toy-gz")).unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(TOY_VECTORS.as_bytes()).unwrap();
        fs::write(dir.join("toy-gz").join("toy-gz.gz"), encoder.finish().unwrap()).unwrap();

        LocalRegistry::new(dir)
    }

    #[test]
    fn list_sorted_test() {
        let dir = tempfile::tempdir().unwrap();
        let registry = toy_registry(dir.path());

        let models = registry.list_available("models").unwrap();
        let names: Vec<&str> = models.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["missing-file", "toy-gz", "toy-plain"]);
        assert_eq!(models[0].num_records, -1);
        assert_eq!(models[2].num_records, 7);

        let corpora = registry.list_available("corpora").unwrap();
        assert_eq!(corpora.len(), 1);
        assert_eq!(corpora[0].description, "first 100MB of wikipedia");
    }

    #[test]
    fn unknown_category_test() {
        let dir = tempfile::tempdir().unwrap();
        let registry = toy_registry(dir.path());
        assert!(matches!(registry.list_available("tokenizers"), Err(EmbeddingError::UnknownCategory(_))));
    }

    #[test]
    fn catalog_line_test() {
        let dir = tempfile::tempdir().unwrap();
        let registry = toy_registry(dir.path());
        let entry = &registry.list_available("models").unwrap()[2];
        let line = entry.line(Some(5));
        assert!(line.starts_with("toy-plain "));
        assert!(line.ends_with("7 records: plain..."));
        assert!(entry.line(None).ends_with("plain text toy vectors..."));
    }

    #[test]
    fn fetch_test() {
        let dir = tempfile::tempdir().unwrap();
        let registry = toy_registry(dir.path());
        assert_eq!(registry.fetch("toy-plain").unwrap(), TOY_VECTORS.as_bytes());
        assert!(!registry.fetch("toy-gz").unwrap().is_empty());
    }

    #[test]
    fn unknown_model_test() {
        let dir = tempfile::tempdir().unwrap();
        let registry = toy_registry(dir.path());
        assert!(matches!(registry.fetch("glove-unknown"), Err(EmbeddingError::UnknownModel(_))));
        assert!(matches!(registry.fetch("missing-file"), Err(EmbeddingError::UnknownModel(_))));
        // corpora are not models
        assert!(matches!(registry.fetch("text8"), Err(EmbeddingError::UnknownModel(_))));
    }
}
