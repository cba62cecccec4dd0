//! Where the segment lives and how big it is.

use std::path::{Path, PathBuf};

use facet::Facet;
use pmipc_shm::SEGMENT_OVERHEAD;

/// Name the segment is created under unless configured otherwise.
pub const DEFAULT_SEGMENT_NAME: &str = "pmipc-introspection";

/// Default segment size: 1 MiB.
pub const DEFAULT_SEGMENT_SIZE: usize = 1024 * 1024;

/// Settings shared by the producer and its consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub segment_name: String,
    pub segment_size: usize,
    /// Directory holding the segment file.
    pub directory: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            segment_name: DEFAULT_SEGMENT_NAME.to_string(),
            segment_size: DEFAULT_SEGMENT_SIZE,
            directory: default_directory(),
        }
    }
}

/// `/dev/shm` where the platform has it, the temp directory otherwise.
fn default_directory() -> PathBuf {
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

/// On-disk form; every key is optional.
#[derive(Debug, Default, Facet)]
struct ConfigFile {
    #[facet(default)]
    segment_name: Option<String>,
    #[facet(default)]
    segment_size: Option<u64>,
    #[facet(default)]
    directory: Option<String>,
}

impl ServiceConfig {
    /// Parse a JSON object. Missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            facet_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut config = Self::default();
        if let Some(name) = file.segment_name {
            config.segment_name = name;
        }
        if let Some(size) = file.segment_size {
            config.segment_size =
                usize::try_from(size).map_err(|_| ConfigError::Invalid("segment_size"))?;
        }
        if let Some(directory) = file.directory {
            config.directory = PathBuf::from(directory);
        }
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), name = %config.segment_name, "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_name.is_empty() {
            return Err(ConfigError::Invalid("segment_name"));
        }
        if self.segment_size <= SEGMENT_OVERHEAD {
            return Err(ConfigError::Invalid("segment_size"));
        }
        Ok(())
    }

    /// Full path of the segment file.
    pub fn segment_path(&self) -> PathBuf {
        self.directory.join(&self.segment_name)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    /// The named setting is out of range.
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "reading config: {}", e),
            Self::Parse(e) => write!(f, "parsing config: {}", e),
            Self::Invalid(key) => write!(f, "invalid config value for {}", key),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
