use std::time::Duration;

const DEFAULT_MEDIA_DIR: &str = "./media";
const DEFAULT_MEDIA_BASE_URL: &str = "/media";
// Sessions live two weeks from login.
const SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

#[derive(Clone, Debug)]
pub struct BlogConfig {
    pub media_dir: String,
    pub media_base_url: String,
    pub session_ttl: Duration,
}

impl BlogConfig {
    pub fn new(media_dir: String, media_base_url: String) -> Self {
        Self {
            media_dir,
            media_base_url,
            session_ttl: SESSION_TTL,
        }
    }

    pub fn from_env() -> Self {
        let media_dir =
            std::env::var("MEDIA_DIR").unwrap_or_else(|_| DEFAULT_MEDIA_DIR.to_string());
        let media_base_url =
            std::env::var("MEDIA_BASE_URL").unwrap_or_else(|_| DEFAULT_MEDIA_BASE_URL.to_string());
        Self::new(media_dir, media_base_url)
    }
}
