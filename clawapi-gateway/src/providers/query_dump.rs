//! Debug dumps of upstream relay cycles.
//!
//! When `dump_queries = true` in `[logging]`, each completed cycle writes
//! `{timestamp}-{provider}-{model}.request.json` and a matching
//! `.response.json` under `<root>/logs/queries/`. Bodies are written as sent;
//! session headers are never included. Failures only produce warnings.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

/// Handle pairing a request dump with its response.
pub struct QueryDump {
    dir: PathBuf,
    stem: String,
}

impl QueryDump {
    /// Write the request body and return a handle for the paired response.
    pub async fn request(dir: &Path, provider: &str, model: &str, value: &Value) -> Option<Self> {
        let timestamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
        let stem = format!("{}-{}-{}", timestamp, sanitize(provider), sanitize(model));

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("dump_queries: failed to create {}: {}", dir.display(), e);
            return None;
        }

        let dump = Self {
            dir: dir.to_path_buf(),
            stem,
        };
        write_json(&dump.path("request"), value).await;
        Some(dump)
    }

    pub async fn response(&self, value: &Value) {
        write_json(&self.path("response"), value).await;
    }

    // Stems contain dots, so `with_extension` would truncate them.
    fn path(&self, phase: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.json", self.stem, phase))
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn write_json(path: &Path, value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            if let Err(e) = tokio::fs::write(path, json).await {
                warn!("dump_queries: failed to write {}: {}", path.display(), e);
            }
        }
        Err(e) => warn!("dump_queries: failed to serialize: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_request_and_response_share_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let queries = dir.path().join("logs").join("queries");

        let dump = QueryDump::request(&queries, "claude", "claude-3.5/x", &json!({"prompt": "hi"}))
            .await
            .unwrap();
        dump.response(&json!({"text": "hello"})).await;

        let mut names: Vec<String> = std::fs::read_dir(&queries)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("-claude-claude-3.5_x.request.json"));
        assert_eq!(
            names[0].trim_end_matches(".request.json"),
            names[1].trim_end_matches(".response.json")
        );
    }
}
