use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Where the raw conflict table comes from.
#[async_trait]
pub trait DataSource {
    async fn fetch_text(&self) -> Result<String>;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    async fn fetch_text(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch_text(&self) -> Result<String> {
        let resp = self.client.get(self.url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {} returned {}", self.url, status));
        }
        Ok(resp.text().await?)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Text already in memory.
#[derive(Debug, Clone)]
pub struct StaticSource {
    name: String,
    text: String,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl DataSource for StaticSource {
    async fn fetch_text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// `http`/`https` URLs are fetched over the network, anything else is a path.
pub fn source_for(location: &str) -> Arc<dyn DataSource + Send + Sync> {
    match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Arc::new(HttpSource::new(url)),
        _ => Arc::new(FileSource::new(location)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_http_for_urls() {
        assert_eq!(
            source_for("https://example.org/episodes.csv").describe(),
            "https://example.org/episodes.csv"
        );
        assert_eq!(
            source_for("matched_peace_conflict_episodes.csv").describe(),
            "matched_peace_conflict_episodes.csv"
        );
        // a Windows drive letter parses as a URL scheme
        assert_eq!(source_for("C:\\data\\x.csv").describe(), "C:\\data\\x.csv");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let src = FileSource::new("definitely/not/here.csv");
        let err = src.fetch_text().await.unwrap_err();
        assert!(format!("{:#}", err).contains("definitely/not/here.csv"));
    }

    #[tokio::test]
    async fn static_source_returns_its_text() {
        let src = StaticSource::new("inline", "a,b\n1,2\n");
        assert_eq!(src.fetch_text().await.unwrap(), "a,b\n1,2\n");
        assert_eq!(src.describe(), "inline");
    }
}
