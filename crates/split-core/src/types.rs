use crate::SplitError;
use url::Url;

/// Inclusive byte range `[start, end]`, matching the HTTP `Range` header form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "range start {start} past end {end}");
        Self { start, end }
    }

    /// Number of bytes covered; never zero.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// A remote resource whose size has been discovered by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: Url,
    pub size: u64,
}

impl DownloadTarget {
    pub fn new(url: Url, size: u64) -> Self {
        Self { url, size }
    }

    pub fn size_mib(&self) -> f64 {
        self.size as f64 / 1024.0 / 1024.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    Probing,
    Planning,
    Downloading,
    Succeeded,
    Failed,
}

impl DownloadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadState::Succeeded | DownloadState::Failed)
    }
}

/// What happened to one planned range once its worker finished.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub index: usize,
    pub range: ByteRange,
    pub result: Result<u64, SplitError>,
}

impl ChunkOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_len_is_inclusive() {
        assert_eq!(ByteRange::new(0, 0).len(), 1);
        assert_eq!(ByteRange::new(4, 7).len(), 4);
    }

    #[test]
    fn test_header_value() {
        assert_eq!(ByteRange::new(8, 9).header_value(), "bytes=8-9");
    }

    #[test]
    fn test_terminal_states() {
        assert!(DownloadState::Succeeded.is_terminal());
        assert!(DownloadState::Failed.is_terminal());
        assert!(!DownloadState::Downloading.is_terminal());
    }
}
