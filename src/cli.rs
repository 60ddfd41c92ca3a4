use crate::orchestrator::{DownloadEvent, DownloadReport, DownloadRequest, Orchestrator};
use anyhow::Result;
use flume::Receiver;
use splitdl_core::{ProgressUpdate, SplitError};
use splitdl_protocol::{ClientOptions, HttpFetcher};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

pub struct DownloadArgs {
    pub chunks: usize,
    pub output_dir: PathBuf,
    pub client: ClientOptions,
    pub write_buffer: usize,
    pub quiet: bool,
    pub progress: bool,
}

/// Renders orchestrator events as the user-facing console lines.
struct Console {
    quiet: bool,
    progress: bool,
    line_open: bool,
}

impl Console {
    fn new(quiet: bool, progress: bool) -> Self {
        Self {
            quiet,
            progress: progress && !quiet,
            line_open: false,
        }
    }

    async fn render(mut self, event_rx: Receiver<DownloadEvent>) {
        while let Ok(event) = event_rx.recv_async().await {
            self.handle(event);
        }
        self.close_line();
    }

    fn handle(&mut self, event: DownloadEvent) {
        match event {
            DownloadEvent::Probed { target, file_name } => {
                if !self.quiet {
                    println!("File size: {:.2}MB", target.size_mib());
                    println!("Starting download: {}", file_name);
                }
            }
            DownloadEvent::Planned { ranges } => {
                tracing::debug!(ranges = ranges.len(), "ranges planned");
            }
            DownloadEvent::Progress(update) => {
                if self.progress {
                    eprint!("\r{}", progress_line(&update));
                    io::stderr().flush().ok();
                    self.line_open = true;
                }
            }
            DownloadEvent::ChunkFinished { index, bytes } => {
                tracing::debug!(chunk = index, bytes, "chunk done");
            }
            DownloadEvent::ChunkFailed { index, error } => {
                tracing::debug!(chunk = index, %error, "chunk error");
            }
            DownloadEvent::StateChange(state) => {
                if state.is_terminal() {
                    self.close_line();
                }
            }
        }
    }

    fn close_line(&mut self) {
        if self.line_open {
            eprintln!();
            self.line_open = false;
        }
    }
}

fn progress_line(update: &ProgressUpdate) -> String {
    format!("Downloading: {:3}%", update.percent)
}

pub fn download(url_str: &str, args: DownloadArgs) -> Result<DownloadReport> {
    let url = Url::parse(url_str)
        .map_err(|e| SplitError::InvalidUrl(format!("{url_str}: {e}")))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { download_async(url, args).await })
}

async fn download_async(url: Url, args: DownloadArgs) -> Result<DownloadReport> {
    let fetcher = Arc::new(HttpFetcher::with_options(&args.client)?);

    let (event_tx, event_rx) = flume::unbounded();
    let console = Console::new(args.quiet, args.progress);
    let render = tokio::spawn(console.render(event_rx));

    let mut orchestrator = Orchestrator::new(fetcher, event_tx);
    let result = orchestrator
        .run(DownloadRequest {
            url,
            chunks: args.chunks,
            output_dir: args.output_dir,
            write_buffer: args.write_buffer,
        })
        .await;

    tracing::debug!(state = ?orchestrator.state(), "orchestrator finished");
    drop(orchestrator);
    render.await?;

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitdl_core::{ByteRange, DownloadState, DownloadTarget, ErrorKind};

    fn update(percent: u8) -> ProgressUpdate {
        ProgressUpdate {
            downloaded: percent as u64,
            total: 100,
            percent,
        }
    }

    #[test]
    fn test_progress_line() {
        assert_eq!(progress_line(&update(7)), "Downloading:   7%");
        assert_eq!(progress_line(&update(100)), "Downloading: 100%");
    }

    #[test]
    fn test_quiet_console_suppresses_progress() {
        let mut console = Console::new(true, true);
        console.handle(DownloadEvent::Progress(update(50)));
        assert!(!console.line_open);
    }

    #[test]
    fn test_terminal_state_closes_progress_line() {
        let mut console = Console::new(false, true);
        console.handle(DownloadEvent::Planned {
            ranges: vec![ByteRange::new(0, 99)],
        });
        console.handle(DownloadEvent::Progress(update(50)));
        assert!(console.line_open);

        console.handle(DownloadEvent::StateChange(DownloadState::Succeeded));
        assert!(!console.line_open);
    }

    #[tokio::test]
    async fn test_render_ends_when_senders_drop() {
        let (tx, rx) = flume::unbounded();
        let target = DownloadTarget::new(Url::parse("http://example.test/a.bin").unwrap(), 10);
        tx.send(DownloadEvent::Probed {
            target,
            file_name: "a.bin".to_string(),
        })
        .unwrap();
        drop(tx);

        Console::new(true, false).render(rx).await;
    }

    #[test]
    fn test_invalid_url_rejected_before_network() {
        let args = DownloadArgs {
            chunks: 4,
            output_dir: PathBuf::from("."),
            client: ClientOptions::default(),
            write_buffer: 1024,
            quiet: true,
            progress: false,
        };
        let err = download("not a url", args).unwrap_err();
        assert!(err.to_string().starts_with("Invalid URL: not a url"));

        let split = err.downcast_ref::<SplitError>().unwrap();
        assert_eq!(split.kind(), ErrorKind::InvalidArgument);
    }
}
