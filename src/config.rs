use crate::errors::Result;
use serde::Deserialize;
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// File names looked up in the project root, in order.
const PROJECT_CONFIG_NAMES: &[&str] = &[".designv1.yaml", "designv1.yaml"];

/// Process-level settings, resolved once in `main` and passed down.
///
/// Nothing below `main` reads the environment; tests build this directly.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Credential for the edit provider. `None` disables the provider step.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    /// Upper bound on the provider round trip.
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Reads `OPENAI_API_KEY`, `DESIGNV1_MODEL`, `OPENAI_BASE_URL` and
    /// `DESIGNV1_TIMEOUT_SECS`. Empty values count as unset.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: var("OPENAI_API_KEY"),
            model: var("DESIGNV1_MODEL").unwrap_or(defaults.model),
            api_base: var("OPENAI_BASE_URL").unwrap_or(defaults.api_base),
            timeout_secs: var("DESIGNV1_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

/// Optional per-project defaults, read from YAML.
///
/// ```yaml
/// include: "src/**"
/// exclude: "**/*.stories.tsx"
/// max_files: 400
/// model: gpt-4.1
/// instructions: Prefer 8px spacing steps.
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub max_files: Option<usize>,
    pub model: Option<String>,
    pub instructions: Option<String>,
}

/// A utility for locating and loading [`ProjectConfig`] files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Finds the project configuration file, if any.
    ///
    /// The search order is:
    /// 1. `.designv1.yaml` in the project root.
    /// 2. `designv1.yaml` in the project root.
    /// 3. `designv1/config.yaml` in the user configuration directory.
    pub fn find_config(root: &Path) -> Option<PathBuf> {
        PROJECT_CONFIG_NAMES
            .iter()
            .map(|name| root.join(name))
            .chain(dirs::config_dir().map(|dir| dir.join("designv1").join("config.yaml")))
            .find(|candidate| candidate.is_file())
    }

    /// Loads a `ProjectConfig` from a YAML file.
    pub fn load_project_config(path: &Path) -> Result<ProjectConfig> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Finds and loads the project configuration, falling back to defaults
    /// when there is none. A file that exists but does not parse is an error.
    pub fn load_for_root(root: &Path) -> Result<ProjectConfig> {
        match Self::find_config(root) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using project config");
                Self::load_project_config(&path)
            }
            None => Ok(ProjectConfig::default()),
        }
    }
}
