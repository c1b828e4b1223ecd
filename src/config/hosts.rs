//! Host list loading.

use std::path::Path;

use super::validation::ConfigError;

/// Read the host list at `path`.
///
/// # Errors
/// Returns [`ConfigError::HostList`] if the file cannot be read.
pub fn load_hosts(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::HostList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_hosts(&content))
}

/// One host per line, trimmed. Blank lines are skipped; order and
/// duplicates are kept.
pub fn parse_hosts(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
