//! Configuration persistence using toml_edit to preserve formatting and comments.

use anyhow::{Context, Result};
use std::path::Path;
use toml_edit::{value, DocumentMut};

/// Write the generated signing secret into the config file, creating the
/// file if it does not exist and leaving every other section untouched.
pub fn update_secret(path: &Path, secret: &str) -> Result<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?
    } else {
        String::new()
    };

    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if doc.get("tokens").is_none() {
        doc["tokens"] = toml_edit::table();
    }
    doc["tokens"]["secret_key"] = value(secret);

    std::fs::write(path, doc.to_string())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_existing_sections_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# my server\n[server]\nport = 9000\n").unwrap();

        update_secret(&path, "s3cr3t").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# my server"));
        assert!(content.contains("port = 9000"));
        assert!(content.contains("secret_key = \"s3cr3t\""));
    }

    #[test]
    fn creates_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        update_secret(&path, "s3cr3t").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[tokens]"));
        assert!(content.contains("secret_key = \"s3cr3t\""));
    }
}
