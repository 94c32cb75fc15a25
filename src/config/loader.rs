use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::RawClusteringConfig;
use crate::errors::{Error, Result, ResultExt};

pub const CONFIG_FILE_NAME: &str = "servicecut.toml";

pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse TOML contents without validating them.
pub fn parse_config(contents: &str) -> Result<RawClusteringConfig> {
    toml::from_str::<RawClusteringConfig>(contents).map_err(Error::from)
}

/// Load `explicit` if given, else `./servicecut.toml`.
///
/// An explicit path must exist. The implicit file may be missing, in which
/// case defaults are used. A file that exists but does not parse is always
/// an error.
pub fn load_config(explicit: Option<&Path>) -> Result<RawClusteringConfig> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(CONFIG_FILE_NAME), false),
    };

    let contents = match read_config_file(&path) {
        Ok(contents) => contents,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No {} found. Using default config.", path.display());
            return Ok(RawClusteringConfig::default());
        }
        Err(e) => {
            log::warn!("Failed to read config file {}: {}", path.display(), e);
            return Err(Error::from(e).with_context(format!("reading {}", path.display())));
        }
    };

    let config = parse_config(&contents).context(format!("parsing {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}
