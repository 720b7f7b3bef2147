use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use wordmine_types::Vocabulary;

use crate::error::PersistError;

pub fn load_vocabulary(path: &Path) -> Result<Vocabulary, PersistError> {
    let file = File::open(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `vocabulary` as pretty JSON, replacing `path` atomically.
pub fn save_vocabulary(vocabulary: &Vocabulary, path: &Path) -> Result<(), PersistError> {
    let io_err = |source: std::io::Error| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;

    let temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, vocabulary).map_err(|source| {
            PersistError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.flush().map_err(io_err)?;
    }
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
