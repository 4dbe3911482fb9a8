//! Low-level helpers shared across recon crates.
//!
//! Provides atomic file writes for reports and dumps, cell/URL text cleaning,
//! and char-safe truncation used when values land in spreadsheet cells.

pub mod atomic_io;
pub mod text;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
pub use text::{clean_text, truncate_chars};

#[cfg(test)]
mod tests {
    use std::fs::{read, read_to_string};

    use super::*;

    #[test]
    fn functional_write_text_atomic_writes_content_and_creates_parents() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("reports").join("dump.json");
        write_text_atomic(&path, "{\"ok\":true}").expect("write");
        let contents = read_to_string(&path).expect("read");
        assert_eq!(contents, "{\"ok\":true}");
    }

    #[test]
    fn functional_write_bytes_atomic_replaces_existing_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("report.xlsx");
        write_bytes_atomic(&path, b"first").expect("first write");
        write_bytes_atomic(&path, b"second").expect("second write");
        assert_eq!(read(&path).expect("read"), b"second");
        let leftovers = std::fs::read_dir(tempdir.path())
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn regression_write_text_atomic_rejects_directory_destination() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let error = write_text_atomic(tempdir.path(), "x").expect_err("directory must fail");
        assert!(error.to_string().contains("is a directory"));
    }
}
