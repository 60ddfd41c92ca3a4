use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{header, Client, StatusCode};
use splitdl_core::{ByteRange, ByteStream, DownloadTarget, RangeFetcher, SplitError};
use std::error::Error;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user_agent: concat!("splitdl/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: None,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, SplitError> {
        Self::with_options(&ClientOptions::default())
    }

    pub fn with_options(options: &ClientOptions) -> Result<Self, SplitError> {
        let mut builder = Client::builder()
            .user_agent(options.user_agent.as_str())
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .connect_timeout(options.connect_timeout);

        if let Some(read_timeout) = options.read_timeout {
            builder = builder.read_timeout(read_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| SplitError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

}

fn transport_error(e: reqwest::Error) -> SplitError {
    if e.is_connect() {
        SplitError::Transport(format!("Connection failed: {}", e))
    } else if e.is_timeout() {
        SplitError::Transport(format!("Timed out: {}", e))
    } else {
        match e.source() {
            Some(source) => SplitError::Transport(format!("{}: {}", e, source)),
            None => SplitError::Transport(e.to_string()),
        }
    }
}

#[async_trait]
impl RangeFetcher for HttpFetcher {
    async fn probe(&self, url: &Url) -> Result<DownloadTarget, SplitError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(%url, status = status.as_u16(), "size probe rejected");
            return Err(SplitError::UnexpectedStatus {
                status: status.as_u16(),
                expected: StatusCode::OK.as_u16(),
            });
        }

        // HEAD bodies are empty, so the length must come from the header
        // rather than the body size hint.
        let size = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or(SplitError::MissingLength)?;

        tracing::info!(%url, size, "probed resource");

        Ok(DownloadTarget::new(url.clone(), size))
    }

    async fn fetch_range(&self, url: &Url, range: ByteRange) -> Result<ByteStream, SplitError> {
        tracing::debug!(start = range.start, end = range.end, "requesting range");

        let response = self
            .client
            .get(url.clone())
            .header(header::RANGE, range.header_value())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::PARTIAL_CONTENT {
            tracing::debug!(
                start = range.start,
                end = range.end,
                status = status.as_u16(),
                "range request rejected"
            );
            return Err(SplitError::UnexpectedStatus {
                status: status.as_u16(),
                expected: StatusCode::PARTIAL_CONTENT.as_u16(),
            });
        }

        Ok(response.bytes_stream().map_err(transport_error).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitdl_core::ErrorKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(piece) = stream.next().await {
            out.extend_from_slice(&piece.unwrap());
        }
        out
    }

    fn url_for(server: &MockServer, file: &str) -> Url {
        Url::parse(&format!("{}/{}", server.uri(), file)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_reads_content_length() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/data.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 1500]))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = url_for(&server, "data.bin");
        let target = fetcher.probe(&url).await.unwrap();

        assert_eq!(target.size, 1500);
        assert_eq!(target.url, url);
    }

    /// Answers a single request with `response` verbatim. wiremock always
    /// sets `Content-Length`, so responses without one need a bare socket.
    async fn serve_raw(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        Url::parse(&format!("http://{}/stream.bin", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_without_content_length_is_missing_length() {
        let url = serve_raw(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        )
        .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.probe(&url).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingLength);
        assert!(matches!(err, SplitError::MissingLength));
    }

    #[tokio::test]
    async fn test_probe_rejects_non_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .probe(&url_for(&server, "missing.bin"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnexpectedStatus);
        assert!(matches!(
            err,
            SplitError::UnexpectedStatus {
                status: 404,
                expected: 200
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_range_sends_range_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_eq("Range", "bytes=5-9"))
            .respond_with(ResponseTemplate::new(206).set_body_string("World"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let stream = fetcher
            .fetch_range(&url_for(&server, "hello.txt"), ByteRange::new(5, 9))
            .await
            .unwrap();

        assert_eq!(collect(stream).await, b"World");
    }

    #[tokio::test]
    async fn test_fetch_range_requires_partial_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("HelloWorld"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = match fetcher
            .fetch_range(&url_for(&server, "hello.txt"), ByteRange::new(0, 4))
            .await
        {
            Ok(_) => panic!("a 200 response must not be accepted for a range"),
            Err(e) => e,
        };

        assert!(matches!(
            err,
            SplitError::UnexpectedStatus {
                status: 200,
                expected: 206
            }
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = Url::parse(&format!("http://127.0.0.1:{}/gone.bin", port)).unwrap();

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.probe(&url).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportError);
    }
}
