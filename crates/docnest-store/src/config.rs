use std::path::{Path, PathBuf};

use docnest_types::DocumentPath;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Environment variable naming the project.
pub const PROJECT_ID_VAR: &str = "PROJECT_ID";

/// Credentials file picked up by [`DatabaseConfig::from_env`] when present.
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials/gcloud.json";

/// Connection settings for a database backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub project_id: Option<String>,
    pub database: String,
    pub credentials_path: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: "(default)".into(),
            credentials_path: None,
        }
    }
}

impl DatabaseConfig {
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Settings from the process environment.
    ///
    /// The project comes from `PROJECT_ID`; the credentials file is only
    /// used if `credentials/gcloud.json` exists under the working directory.
    pub fn from_env() -> Self {
        let credentials = std::env::current_dir()
            .map(|cwd| cwd.join(DEFAULT_CREDENTIALS_PATH))
            .ok()
            .filter(|path| path.exists());
        Self::from_parts(std::env::var(PROJECT_ID_VAR).ok(), credentials)
    }

    fn from_parts(project_id: Option<String>, credentials_path: Option<PathBuf>) -> Self {
        Self {
            project_id: project_id.filter(|p| !p.is_empty()),
            credentials_path,
            ..Self::default()
        }
    }

    /// Fully-qualified name of a document in this database.
    pub fn resource_name(&self, doc: &DocumentPath) -> String {
        let project = self.project_id.as_deref().unwrap_or("local");
        format!("projects/{project}/databases/{}/documents/{doc}", self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = DatabaseConfig::default();
        assert!(c.project_id.is_none());
        assert_eq!(c.database, "(default)");
        assert!(c.credentials_path.is_none());
    }

    #[test]
    fn parse_partial_toml() {
        let c = DatabaseConfig::from_toml_str("project_id = \"demo\"").unwrap();
        assert_eq!(c.project_id.as_deref(), Some("demo"));
        assert_eq!(c.database, "(default)");
    }

    #[test]
    fn parse_error_is_config_error() {
        let err = DatabaseConfig::from_toml_str("project_id = [").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "project_id = \"demo\"\ndatabase = \"staging\"").unwrap();
        let c = DatabaseConfig::load(file.path()).unwrap();
        assert_eq!(c.database, "staging");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = DatabaseConfig::load("/nonexistent/docnest.toml").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn empty_project_is_ignored() {
        let c = DatabaseConfig::from_parts(Some(String::new()), None);
        assert!(c.project_id.is_none());
    }

    #[test]
    fn resource_name_layout() {
        let c = DatabaseConfig::from_parts(Some("demo".into()), None);
        let doc: DocumentPath = "items/p1/notes/q1".parse().unwrap();
        assert_eq!(
            c.resource_name(&doc),
            "projects/demo/databases/(default)/documents/items/p1/notes/q1"
        );
    }
}
