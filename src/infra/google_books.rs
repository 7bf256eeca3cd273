use std::time::Duration;

use serde::Deserialize;

use crate::domain::model::book::RawBookRecord;
use crate::domain::repository::BookCatalog;

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/books/v1/volumes";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned status {0}")]
    Status(u16),
}

/// Google Books volumes API のレスポンス。0件の場合 `items` が省略される。
#[derive(Debug, Deserialize)]
pub struct VolumeList {
    #[serde(default)]
    pub items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub description: Option<String>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
}

impl From<Volume> for RawBookRecord {
    fn from(v: Volume) -> Self {
        let info = v.volume_info;
        RawBookRecord {
            id: v.id,
            title: info.title,
            authors: info.authors,
            description: info.description,
            thumbnail: info.image_links.and_then(|l| l.thumbnail),
        }
    }
}

impl VolumeList {
    pub fn into_records(self) -> Vec<RawBookRecord> {
        self.items.into_iter().map(RawBookRecord::from).collect()
    }
}

/// Google Books 検索クライアント。
#[derive(Debug, Clone)]
pub struct GoogleBooksClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GoogleBooksClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BookCatalog for GoogleBooksClient {
    type Error = CatalogError;

    async fn search(&self, query: &str) -> Result<Vec<RawBookRecord>, Self::Error> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        let list: VolumeList = response.json().await?;
        Ok(list.into_records())
    }
}
