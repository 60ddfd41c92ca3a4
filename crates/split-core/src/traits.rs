use crate::{ByteRange, DownloadTarget, SplitError};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use url::Url;

/// Body of a ranged response. Dropping it releases the underlying connection.
pub type ByteStream = BoxStream<'static, Result<Bytes, SplitError>>;

#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Metadata-only request discovering the resource size.
    async fn probe(&self, url: &Url) -> Result<DownloadTarget, SplitError>;

    /// Issues one ranged request and hands back its body once the server
    /// has confirmed a partial-content response.
    async fn fetch_range(&self, url: &Url, range: ByteRange) -> Result<ByteStream, SplitError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub downloaded: u64,
    pub total: u64,
    pub percent: u8,
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Reporter that drops every update.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn report(&self, _update: ProgressUpdate) {}
}
