use std::path::Path;

use anyhow::{bail, Context, Result};

/// Writes text using a temp file + rename so readers never observe partial data.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    write_bytes_atomic(path, content.as_bytes())
}

/// Byte variant of [`write_text_atomic`], used for workbook buffers.
pub fn write_bytes_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("destination path cannot be empty");
    }
    if path.exists() && path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }

    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create {}", parent_dir.display()))?;

    let temp_name = format!(
        ".{}.tmp-{}-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("recon-output"),
        std::process::id(),
        temp_nonce()
    );
    let temp_path = parent_dir.join(temp_name);
    std::fs::write(&temp_path, content)
        .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
    rename_or_remove(&temp_path, path)
}

/// Moves `temp_path` over `path`; the temp file is removed if the move fails.
fn rename_or_remove(temp_path: &Path, path: &Path) -> Result<()> {
    if let Err(error) = std::fs::rename(temp_path, path) {
        let _ = std::fs::remove_file(temp_path);
        return Err(error).with_context(|| {
            format!(
                "failed to rename temporary file {} to {}",
                temp_path.display(),
                path.display()
            )
        });
    }
    Ok(())
}

fn temp_nonce() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

#[cfg(test)]
mod tests {
    use super::rename_or_remove;

    #[test]
    fn regression_failed_rename_removes_temp_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let destination = tempdir.path().join("report.json");
        std::fs::create_dir(&destination).expect("create dir");
        std::fs::write(destination.join("occupied"), "x").expect("occupy dir");
        let temp_path = tempdir.path().join(".report.json.tmp-1-1");
        std::fs::write(&temp_path, "{}").expect("write temp");

        let error = rename_or_remove(&temp_path, &destination).expect_err("rename must fail");
        assert!(error.to_string().contains("failed to rename"), "{error}");
        assert!(!temp_path.exists());
        assert!(destination.join("occupied").exists());
    }
}
