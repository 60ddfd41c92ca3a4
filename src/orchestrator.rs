use flume::Sender;
use futures_util::future::join_all;
use splitdl_core::{
    ByteRange, ChunkOutcome, DownloadState, DownloadTarget, ProgressReporter, ProgressUpdate,
    RangeFetcher, SplitError, file_name_from_url,
};
use splitdl_io::OutputFile;
use splitdl_progress::Progress;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    StateChange(DownloadState),
    Probed {
        target: DownloadTarget,
        file_name: String,
    },
    Planned {
        ranges: Vec<ByteRange>,
    },
    Progress(ProgressUpdate),
    ChunkFinished {
        index: usize,
        bytes: u64,
    },
    ChunkFailed {
        index: usize,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: Url,
    pub chunks: usize,
    pub output_dir: PathBuf,
    pub write_buffer: usize,
}

#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub chunks: usize,
}

struct ChannelReporter {
    event_tx: Sender<DownloadEvent>,
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, update: ProgressUpdate) {
        let _ = self.event_tx.send(DownloadEvent::Progress(update));
    }
}

/// Drives one download: probe, plan, fan out one worker per range, join.
///
/// Workers are never cancelled; every range runs to its own completion
/// before the outcome is decided.
pub struct Orchestrator {
    fetcher: Arc<dyn RangeFetcher>,
    event_tx: Sender<DownloadEvent>,
    state: DownloadState,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn RangeFetcher>, event_tx: Sender<DownloadEvent>) -> Self {
        Self {
            fetcher,
            event_tx,
            state: DownloadState::Idle,
        }
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub async fn run(&mut self, request: DownloadRequest) -> Result<DownloadReport, SplitError> {
        let result = self.execute(request).await;

        match &result {
            Ok(report) => {
                tracing::info!(path = %report.path.display(), bytes = report.bytes, "download complete");
                self.transition(DownloadState::Succeeded);
            }
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind(), "download failed");
                self.transition(DownloadState::Failed);
            }
        }

        result
    }

    fn transition(&mut self, state: DownloadState) {
        tracing::debug!(from = ?self.state, to = ?state, "state change");
        self.state = state;
        let _ = self.event_tx.send(DownloadEvent::StateChange(state));
    }

    async fn execute(&mut self, request: DownloadRequest) -> Result<DownloadReport, SplitError> {
        self.transition(DownloadState::Probing);
        let target = self.fetcher.probe(&request.url).await?;
        let file_name = file_name_from_url(&target.url);

        let _ = self.event_tx.send(DownloadEvent::Probed {
            target: target.clone(),
            file_name: file_name.clone(),
        });

        self.transition(DownloadState::Planning);
        let ranges = splitdl_segment::plan(target.size, request.chunks)?;

        let _ = self.event_tx.send(DownloadEvent::Planned {
            ranges: ranges.clone(),
        });

        self.transition(DownloadState::Downloading);
        let output = OutputFile::create(request.output_dir.join(&file_name), target.size).await?;

        let reporter = Arc::new(ChannelReporter {
            event_tx: self.event_tx.clone(),
        });
        let progress = Arc::new(Progress::new(target.size, reporter));

        let handles: Vec<_> = ranges
            .iter()
            .enumerate()
            .map(|(index, &range)| {
                let fetcher = self.fetcher.clone();
                let url = target.url.clone();
                let output = output.clone();
                let progress = progress.clone();
                let event_tx = self.event_tx.clone();
                let write_buffer = request.write_buffer;

                tokio::spawn(async move {
                    let result =
                        download_range(fetcher, &url, &output, range, write_buffer, progress).await;

                    let event = match &result {
                        Ok(bytes) => {
                            tracing::debug!(chunk = index, bytes, "chunk finished");
                            DownloadEvent::ChunkFinished {
                                index,
                                bytes: *bytes,
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                chunk = index,
                                start = range.start,
                                end = range.end,
                                error = %e,
                                "chunk failed"
                            );
                            DownloadEvent::ChunkFailed {
                                index,
                                error: e.to_string(),
                            }
                        }
                    };
                    let _ = event_tx.send(event);

                    result
                })
            })
            .collect();

        let outcomes: Vec<ChunkOutcome> = join_all(handles)
            .await
            .into_iter()
            .zip(ranges.iter())
            .enumerate()
            .map(|(index, (joined, &range))| ChunkOutcome {
                index,
                range,
                result: joined.unwrap_or_else(|e| Err(SplitError::Worker(e.to_string()))),
            })
            .collect();

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        if let Some(e) = outcomes.into_iter().find_map(|o| o.result.err()) {
            tracing::error!(failed, planned = ranges.len(), "download incomplete");
            return Err(e);
        }

        Ok(DownloadReport {
            path: output.path().to_path_buf(),
            bytes: progress.downloaded(),
            chunks: ranges.len(),
        })
    }
}

/// One worker: fetch the range, write it in place, report the bytes.
async fn download_range(
    fetcher: Arc<dyn RangeFetcher>,
    url: &Url,
    output: &OutputFile,
    range: ByteRange,
    write_buffer: usize,
    progress: Arc<Progress>,
) -> Result<u64, SplitError> {
    let stream = fetcher.fetch_range(url, range).await?;
    let writer = output.range_writer(range, write_buffer).await?;
    writer
        .copy_from(stream, |bytes| {
            progress.report(bytes);
        })
        .await
}
