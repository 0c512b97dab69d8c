use super::Interceptor;
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writes every prompt/response pair to `<dir>/generation_<timestamp>.md`.
#[derive(Debug)]
pub struct TranscriptInterceptor {
    base_path: PathBuf,
}

impl TranscriptInterceptor {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }
}

#[async_trait]
impl Interceptor for TranscriptInterceptor {
    async fn save(&self, prompt: &str, response: &str) -> std::io::Result<()> {
        let timestamp = Utc::now();
        let filename = format!("generation_{}.md", timestamp.format("%Y%m%d_%H%M%S_%3f"));
        let file_path = self.base_path.join(filename);

        fs::create_dir_all(&self.base_path).await?;

        let content = format!("# Prompt\n\n{}\n\n# Response\n\n```json\n{}\n```\n", prompt, response);

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        debug!(path = %file_path.display(), "transcript written");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcript_lands_in_directory() {
        let dir = std::env::temp_dir().join(format!("studygen-transcript-{}", std::process::id()));
        let interceptor = TranscriptInterceptor::new(dir.clone());
        interceptor.save("## System\n\nprompt", "[]").await.unwrap();

        let mut entries = fs::read_dir(&dir).await.unwrap();
        let entry = entries.next_entry().await.unwrap().expect("one transcript");
        let written = fs::read_to_string(entry.path()).await.unwrap();
        assert!(written.starts_with("# Prompt"));
        assert!(written.contains("[]"));
        let _ = fs::remove_dir_all(&dir).await;
    }
}
