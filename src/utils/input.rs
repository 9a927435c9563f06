use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde_json::Value;

use crate::models::Artifact;

/// Parse artifacts from a JSON array, a single JSON object, or JSON lines.
pub fn parse_artifacts(content: &str) -> Result<Vec<Artifact>> {
    let trimmed = content.trim_start();

    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed).context("Invalid JSON array of artifacts")?;
        return values
            .into_iter()
            .enumerate()
            .map(|(index, value)| to_artifact(value, index + 1))
            .collect();
    }

    // A single pretty-printed object spans several lines
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(vec![to_artifact(value, 1)?]);
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let value: Value = serde_json::from_str(line)
                .with_context(|| format!("Invalid JSON on line {}", index + 1))?;
            to_artifact(value, index + 1)
        })
        .collect()
}

fn to_artifact(value: Value, position: usize) -> Result<Artifact> {
    if !value.is_object() {
        return Err(anyhow!("Artifact {} is not a JSON object", position));
    }
    Artifact::from_value(value).with_context(|| format!("Artifact {} has an invalid shape", position))
}

/// Read artifacts from a file, see [`parse_artifacts`].
pub fn read_artifacts(path: &Path) -> Result<Vec<Artifact>> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read artifacts from {}", path.display()))?;

    let artifacts = parse_artifacts(&content)
        .context(format!("Failed to parse artifacts from {}", path.display()))?;
    debug!("Read {} artifacts from {}", artifacts.len(), path.display());
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_json_array() {
        let artifacts = parse_artifacts(r#"[{"resource_id": "a"}, {"resource_id": "b"}]"#).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[1].artifact_id(), "b");
    }

    #[test]
    fn test_json_lines_skip_blank_lines() {
        let content = "{\"resource_id\": \"a\"}\n\n{\"resource_id\": \"b\", \"cloud_provider\": \"gcp\"}\n";
        let artifacts = parse_artifacts(content).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[1].provider().as_str(), "gcp");
    }

    #[test]
    fn test_single_pretty_object() {
        let artifacts = parse_artifacts("{\n  \"resource_id\": \"only\"\n}\n").unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].artifact_id(), "only");
    }

    #[test]
    fn test_bad_line_reports_position() {
        let err = parse_artifacts("{\"resource_id\": \"a\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let err = parse_artifacts("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_read_from_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"[{"resource_id": "disk-1"}]"#).unwrap();

        let artifacts = read_artifacts(file.path()).unwrap();
        assert_eq!(artifacts[0].artifact_id(), "disk-1");
        assert!(read_artifacts(Path::new("/nonexistent/artifacts.json")).is_err());
    }
}
