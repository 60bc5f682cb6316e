//! Upload checks applied to a file before it is handed to the parser.

use std::path::{Path, PathBuf};

use crate::config::InputConfig;

#[derive(Debug, thiserror::Error)]
pub(crate) enum InputError {
    #[error("error reading file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file type '{}': expected one of {}", path.display(), allowed.join(", "))]
    Extension { path: PathBuf, allowed: Vec<String> },

    #[error("file '{}' is empty", path.display())]
    Empty { path: PathBuf },

    #[error("file '{}' is {size} bytes, larger than the {max} byte limit", path.display())]
    TooLarge { path: PathBuf, size: u64, max: u64 },
}

fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

/// Check extension and size, then read the whole file.
pub(crate) fn read_input(path: &Path, config: &InputConfig) -> Result<Vec<u8>, InputError> {
    if !has_allowed_extension(path, &config.allowed_extensions) {
        return Err(InputError::Extension {
            path: path.to_path_buf(),
            allowed: config
                .allowed_extensions
                .iter()
                .map(|e| format!(".{}", e))
                .collect(),
        });
    }

    let read_err = |source| InputError::Read {
        path: path.to_path_buf(),
        source,
    };
    let size = std::fs::metadata(path).map_err(read_err)?.len();
    if size == 0 {
        return Err(InputError::Empty {
            path: path.to_path_buf(),
        });
    }
    if size > config.max_file_size {
        return Err(InputError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: config.max_file_size,
        });
    }

    std::fs::read(path).map_err(read_err)
}
