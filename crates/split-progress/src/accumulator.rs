use parking_lot::Mutex;
use splitdl_core::{ProgressReporter, ProgressUpdate, SilentReporter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// `floor(downloaded / total * 100)`, clamped to 100.
pub fn percentage(downloaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (downloaded as u128 * 100) / total as u128;
    percent.min(100) as u8
}

/// Byte counter shared by every range worker of one download.
///
/// The increment and the read that feeds the percentage are one atomic
/// `fetch_add`, so concurrent reports never lose updates. Emission to the
/// reporter is coalesced: a line goes out only when the integer percentage
/// advances, and emissions never go backwards.
pub struct Progress {
    downloaded: AtomicU64,
    total: u64,
    last_emitted: Mutex<Option<u8>>,
    reporter: Arc<dyn ProgressReporter>,
}

impl Progress {
    pub fn new(total: u64, reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            downloaded: AtomicU64::new(0),
            total,
            last_emitted: Mutex::new(None),
            reporter,
        }
    }

    pub fn silent(total: u64) -> Self {
        Self::new(total, Arc::new(SilentReporter))
    }

    /// Adds `bytes` to the running total and returns the resulting percentage.
    pub fn report(&self, bytes: u64) -> u8 {
        let downloaded = self.downloaded.fetch_add(bytes, Ordering::AcqRel) + bytes;
        if downloaded > self.total {
            tracing::warn!(downloaded, total = self.total, "progress exceeded expected total");
        }

        let percent = percentage(downloaded, self.total);
        self.emit(downloaded, percent);
        percent
    }

    pub fn percentage(&self) -> u8 {
        percentage(self.downloaded(), self.total)
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Acquire)
    }

    fn emit(&self, downloaded: u64, percent: u8) {
        let mut last = self.last_emitted.lock();
        if last.is_some_and(|previous| percent <= previous) {
            return;
        }
        *last = Some(percent);
        self.reporter.report(ProgressUpdate {
            downloaded,
            total: self.total,
            percent,
        });
    }
}
