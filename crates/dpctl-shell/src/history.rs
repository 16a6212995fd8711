//! Line-editing history file: one accepted command per line.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Entries kept when the file is written back.
pub const HISTORY_LIMIT: usize = 1000;

/// A missing file is an empty history.
pub fn load_history(path: &Path) -> io::Result<Vec<String>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    Ok(text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn save_history(path: &Path, entries: &[String]) -> io::Result<()> {
    let start = entries.len().saturating_sub(HISTORY_LIMIT);
    let mut file = io::BufWriter::new(fs::File::create(path)?);
    for entry in &entries[start..] {
        writeln!(file, "{entry}")?;
    }
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let entries = load_history(&dir.path().join("nope")).expect("load");
        assert!(entries.is_empty());
    }

    #[test]
    fn keeps_only_the_newest_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history");
        let entries: Vec<String> = (0..HISTORY_LIMIT + 5).map(|i| format!("show worker {i}")).collect();
        save_history(&path, &entries).expect("save");

        let loaded = load_history(&path).expect("load");
        assert_eq!(loaded.len(), HISTORY_LIMIT);
        assert_eq!(loaded[0], "show worker 5");
        assert_eq!(loaded.last(), entries.last());
    }
}
