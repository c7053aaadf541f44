use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::info;

use crate::errors::Error;
use crate::release::ComponentImages;

/// Environment variable pointing at the operator configuration file
pub const CONFIG_ENV: &str = "HCP_OPERATOR_CONFIG";

const DEFAULT_RESYNC_SECONDS: u64 = 300;

fn default_resync_seconds() -> u64 {
    DEFAULT_RESYNC_SECONDS
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    #[serde(default)]
    pub component_images: ComponentImages,
    /// Interval at which converged hosted control planes are reconciled again
    #[serde(default = "default_resync_seconds")]
    pub resync_seconds: u64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        OperatorConfig {
            component_images: ComponentImages::default(),
            resync_seconds: DEFAULT_RESYNC_SECONDS,
        }
    }
}

impl OperatorConfig {
    pub fn from_file(path: &Path) -> Result<OperatorConfig, Error> {
        let config_error = |reason: String| Error::Config {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        serde_yaml::from_str(&contents).map_err(|e| config_error(e.to_string()))
    }

    /// Load from the file named by `HCP_OPERATOR_CONFIG`, or fall back to defaults
    pub fn from_env() -> Result<OperatorConfig, Error> {
        match env::var(CONFIG_ENV) {
            Ok(path) => {
                info!("Loading operator configuration from {path}");
                OperatorConfig::from_file(Path::new(&path))
            }
            Err(_) => Ok(OperatorConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseImageProvider;
    use std::io::Write;

    #[test]
    fn parses_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "componentImages:\n  kubevirt-cloud-controller-manager: quay.io/ccm:1\nresyncSeconds: 60"
        )
        .unwrap();

        let config = OperatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.resync_seconds, 60);
        assert_eq!(
            config
                .component_images
                .component_image("kubevirt-cloud-controller-manager"),
            Some("quay.io/ccm:1")
        );
    }

    #[test]
    fn missing_fields_use_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{}").unwrap();
        assert_eq!(
            OperatorConfig::from_file(file.path()).unwrap(),
            OperatorConfig::default()
        );
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = OperatorConfig::from_file(Path::new("/nonexistent/operator.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config { path, .. } if path == "/nonexistent/operator.yaml"));
    }
}
