//! Append-only execution summaries, one JSON object per line

use super::events::ScriptFinishedEvent;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;

pub async fn append_summary(path: &Path, finished: &ScriptFinishedEvent) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut line = serde_json::to_string(finished)?;
    line.push('\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open metrics file {}", path.display()))?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScriptResult;
    use chrono::Utc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_appends_one_line_per_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("summary.jsonl");
        let finished = ScriptFinishedEvent {
            result: ScriptResult::Errored,
            error: Some("boom".into()),
            summary: "Script Failed".into(),
            duration: Duration::from_millis(12),
            file_name: Some("main.json".into()),
            finished_at: Utc::now(),
        };
        append_summary(&path, &finished).await.unwrap();
        append_summary(&path, &finished).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: ScriptFinishedEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.result, ScriptResult::Errored);
        assert_eq!(parsed.error.as_deref(), Some("boom"));
    }
}
