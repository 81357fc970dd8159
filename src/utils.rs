use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Splits a `;`-delimited cell (authors, countries) into trimmed, non-empty
/// entries.
pub fn split_delimited(input: &str) -> Vec<String> {
    input
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapses runs of whitespace to single spaces and trims the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn write_atomic<F>(path: &Path, write_fn: F) -> Result<(), String>
where
    F: FnOnce(&mut NamedTempFile) -> Result<(), String>,
{
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|err| format!("Failed to create temp file in {parent:?}: {err}"))?;
    write_fn(&mut temp)?;
    temp.flush()
        .map_err(|err| format!("Failed to flush {}: {err}", path.display()))?;
    temp.persist(path)
        .map_err(|err| format!("Failed to persist {}: {err}", path.display()))?;
    Ok(())
}

pub fn write_atomic_bytes(path: &Path, bytes: &[u8]) -> Result<(), String> {
    write_atomic(path, |file| {
        file.write_all(bytes)
            .map_err(|err| format!("Failed to write {}: {err}", path.display()))
    })
}

pub fn ensure_parent_dir(path: &Path) -> Result<Option<PathBuf>, String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("Failed to create directory {parent:?}: {err}"))?;
            return Ok(Some(parent.to_path_buf()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_delimited_trims_and_drops_empty_entries() {
        assert_eq!(
            split_delimited("South Africa; Kenya ;; Nigeria "),
            vec!["South Africa", "Kenya", "Nigeria"]
        );
        assert!(split_delimited("").is_empty());
        assert!(split_delimited(" ; ; ").is_empty());
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Deep\n  Nets \t Revisited "), "Deep Nets Revisited");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn write_atomic_bytes_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_atomic_bytes(&path, b"hello").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }
}
