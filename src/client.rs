use std::env;
use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{ChatSession, MessageCreateParams};

const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const BASE_URL_ENV: &str = "COMPOSER_BASE_URL";

/// Raw body of a message response, chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The network seam between the conversation and the Composer service.
///
/// [`Composer`] is the HTTP implementation; tests substitute an in-memory one.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    /// `POST /api/chat-sessions`.
    async fn create_session(&self) -> Result<ChatSession>;

    /// `GET /api/chat-sessions/{id}`.
    async fn get_session(&self, id: &str) -> Result<ChatSession>;

    /// `POST /api/chat-sessions/{id}/messages`, returning the undecoded body.
    async fn submit_message(
        &self,
        session: &ChatSession,
        params: &MessageCreateParams,
    ) -> Result<ByteStream>;
}

/// Client for the Composer service.
#[derive(Debug, Clone)]
pub struct Composer {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl Composer {
    /// Create a new Composer client.
    ///
    /// The base URL can be provided directly or read from the
    /// COMPOSER_BASE_URL environment variable, falling back to a local server.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds session requests end to end. Message submits only
    /// bound the connect phase: a response stream may legitimately run for
    /// minutes.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The normalized base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Builds `{base}/api/chat-sessions[/segments...]` with each segment
    /// percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url("base URL cannot carry a path", None))?
            .pop_if_empty()
            .extend(["api", "chat-sessions"])
            .extend(segments);
        Ok(url)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> Error {
        CLIENT_REQUEST_ERRORS.click();
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Reads a non-success body into a short description.
    async fn error_body(response: Response) -> String {
        let status = response.status();
        match response.text().await {
            Ok(body) if !body.trim().is_empty() => body.trim().to_string(),
            _ => status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        }
    }

    async fn fetch_session(
        &self,
        request: reqwest::RequestBuilder,
        on_status: fn(String, u16) -> Error,
    ) -> Result<ChatSession> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = request
            .headers(self.default_headers())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let message = Self::error_body(response).await;
            return Err(on_status(message, status.as_u16()));
        }

        response.json::<ChatSession>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse session: {e}"),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait::async_trait]
impl ChatApi for Composer {
    async fn create_session(&self) -> Result<ChatSession> {
        let url = self.endpoint(&[])?;
        tracing::debug!(%url, "creating chat session");
        self.fetch_session(self.client.post(url), |message, status| {
            Error::session_creation_failed(message, Some(status))
        })
        .await
    }

    async fn get_session(&self, id: &str) -> Result<ChatSession> {
        let url = self.endpoint(&[id])?;
        tracing::debug!(%url, "fetching chat session");
        self.fetch_session(self.client.get(url), |message, status| {
            Error::api(status, message)
        })
        .await
    }

    async fn submit_message(
        &self,
        session: &ChatSession,
        params: &MessageCreateParams,
    ) -> Result<ByteStream> {
        let url = self.endpoint(&[session.id.as_str(), "messages"])?;
        tracing::debug!(%url, artifact_len = params.artifact.len(), "submitting message");

        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(self.default_headers())
            .json(params)
            .send()
            .await
            .map_err(|e| {
                let err = self.map_transport_error(e);
                Error::message_submit_failed(err.to_string(), None)
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let message = Self::error_body(response).await;
            return Err(Error::message_submit_failed(
                message,
                Some(status.as_u16()),
            ));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        return Err(Error::validation(
            format!("'{base_url}' cannot be used as a base URL"),
            Some("base_url".to_string()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, captures the request and answers with `response`.
    async fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + content_length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}/"), handle)
    }

    #[test]
    fn client_creation() {
        let client = Composer::new(Some("http://example.com/composer".to_string())).unwrap();
        assert_eq!(client.base_url.as_str(), "http://example.com/composer/");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = Composer::with_options(
            Some("https://composer.example.com/".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "https://composer.example.com/");
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_base_urls() {
        assert!(Composer::new(Some("not a url".to_string())).is_err());
        let err = Composer::new(Some("mailto:someone@example.com".to_string())).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn endpoints() {
        let client = Composer::new(Some("http://localhost:8080/prefix/".to_string())).unwrap();
        assert_eq!(
            client.endpoint(&[]).unwrap().as_str(),
            "http://localhost:8080/prefix/api/chat-sessions"
        );
        assert_eq!(
            client.endpoint(&["42", "messages"]).unwrap().as_str(),
            "http://localhost:8080/prefix/api/chat-sessions/42/messages"
        );
        assert_eq!(
            client.endpoint(&["a/b"]).unwrap().as_str(),
            "http://localhost:8080/prefix/api/chat-sessions/a%2Fb"
        );
    }

    #[tokio::test]
    async fn create_session_over_http() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 25\r\nConnection: close\r\n\r\n{\"id\":42,\"title\":\"Notes\"}",
        )
        .await;
        let client = Composer::new(Some(base_url)).unwrap();
        let session = client.create_session().await.unwrap();
        assert_eq!(session.id, "42");
        assert_eq!(session.title.as_deref(), Some("Notes"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/chat-sessions HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn create_session_failure_status() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 7\r\nConnection: close\r\n\r\ndb down",
        )
        .await;
        let client = Composer::new(Some(base_url)).unwrap();
        let err = client.create_session().await.unwrap_err();
        assert!(err.is_session_creation_failed());
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("db down"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn submit_message_streams_body() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{\"message\":\"Hi\"}\r\n{\"artifact\":\"# Doc\"}\r\n",
        )
        .await;
        let client = Composer::new(Some(base_url)).unwrap();
        let session = ChatSession::new("42");
        let params = MessageCreateParams::new("Write a doc", "# Draft");
        let stream = client.submit_message(&session, &params).await.unwrap();
        let frames: Vec<_> = crate::frames::process_frames(stream)
            .map(|frame| frame.unwrap())
            .collect()
            .await;
        assert_eq!(
            frames,
            vec![
                crate::StreamFrame::message("Hi"),
                crate::StreamFrame::artifact("# Doc")
            ]
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/chat-sessions/42/messages HTTP/1.1\r\n"));
        assert!(request.ends_with("{\"content\":\"Write a doc\",\"artifact\":\"# Draft\"}"));
    }

    #[tokio::test]
    async fn submit_message_failure_status() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let client = Composer::new(Some(base_url)).unwrap();
        let err = match client
            .submit_message(&ChatSession::new("9"), &MessageCreateParams::new("hi", ""))
            .await
        {
            Ok(_) => panic!("expected submit to fail"),
            Err(err) => err,
        };
        assert!(err.is_message_submit_failed());
        assert_eq!(err.status_code(), Some(404));
        assert!(err.to_string().contains("Not Found"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = Composer::new(Some(format!("http://{addr}/"))).unwrap();
        let err = client.create_session().await.unwrap_err();
        assert!(err.is_connection());
    }
}
