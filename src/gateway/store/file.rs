use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{RouteStore, StoreError};
use crate::gateway::RouteDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Yaml,
    Json,
}

/// Route definitions kept in a YAML or JSON file, chosen by extension
#[derive(Debug, Clone)]
pub struct FileRouteStore {
    path: PathBuf,
    format: FileFormat,
}

impl FileRouteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        };
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, contents: &str) -> Result<Vec<RouteDefinition>, StoreError> {
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(match self.format {
            FileFormat::Json => serde_json::from_str(contents)?,
            FileFormat::Yaml => serde_yaml::from_str(contents)?,
        })
    }

    fn encode(&self, definitions: &[RouteDefinition]) -> Result<String, StoreError> {
        Ok(match self.format {
            FileFormat::Json => serde_json::to_string_pretty(definitions)?,
            FileFormat::Yaml => serde_yaml::to_string(definitions)?,
        })
    }
}

#[async_trait]
impl RouteStore for FileRouteStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Vec<RouteDefinition>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => self.decode(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Route file {} not found, starting with no routes", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, definitions: &[RouteDefinition]) -> Result<(), StoreError> {
        let contents = self.encode(definitions)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write beside the target and rename so readers never see half a file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
