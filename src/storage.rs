use axum::body::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Stores uploaded post images on local disk and hands back the URL path
/// they are served under.
#[derive(Clone)]
pub struct LocalImageStorage {
    pub media_dir: PathBuf,
    pub base_url: String,
}

impl LocalImageStorage {
    pub fn new(media_dir: String, base_url: String) -> Self {
        Self {
            media_dir: PathBuf::from(media_dir),
            base_url,
        }
    }

    pub async fn save_image(
        &self,
        file_bytes: Bytes,
        original_filename: Option<String>,
    ) -> Result<String, std::io::Error> {
        let extension = original_filename
            .and_then(|name| {
                Path::new(&name)
                    .extension()
                    .and_then(|os_str| os_str.to_str())
                    .map(|s| s.to_owned())
            })
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let unique_filename = format!("{}{}", Uuid::new_v4(), extension);
        let file_path = self.media_dir.join(&unique_filename);

        fs::create_dir_all(&self.media_dir).await?;
        fs::write(&file_path, file_bytes).await?;

        Ok(format!("{}/{}", self.base_url, unique_filename))
    }

    pub async fn delete_image(&self, image_url: &str) -> Result<(), std::io::Error> {
        let relative = image_url
            .strip_prefix(&self.base_url)
            .unwrap_or(image_url)
            .trim_start_matches('/');
        let file_path = self.media_dir.join(relative);
        fs::remove_file(&file_path).await?;
        Ok(())
    }
}
