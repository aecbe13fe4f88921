use crate::domain::model::{Area, ListingRecord, PageResponse, StageReport};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    /// Immediate child directories of `path`, sorted by name.
    fn list_dirs(&self, path: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

#[async_trait]
pub trait AreaSource: Send + Sync {
    /// Areas ranked by population, largest first.
    async fn list_areas(&self) -> Result<Vec<Area>>;
}

#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn fetch_page(&self, area: &Area, page_number: u32) -> Result<PageResponse>;
}

#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch_detail(&self, listing_url: &str) -> Result<PageResponse>;
}

pub trait FieldExtractor: Send + Sync {
    fn extract_listings(&self, body: &str) -> Vec<ListingRecord>;
    /// Text of the listing's content region on a detail page.
    fn content_text(&self, body: &str) -> String;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn resolve_areas(&self) -> Result<Vec<Area>>;
    async fn extract(&self, areas: Vec<Area>) -> Result<StageReport>;
    async fn transform(&self, collected: StageReport) -> Result<StageReport>;
    async fn load(&self, enriched: StageReport) -> Result<String>;
}
