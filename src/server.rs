//! `POST /segment` over `tiny_http`.
//!
//! Request body `{"url": "..."}`; success body `{"segments": [...]}`;
//! failures answer `{"error": "..."}` with the status from
//! [`Error::status_code`]. Every response allows any origin.

use crate::host::PageHost;
use crate::{Error, HostConfig, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use tiny_http::{Header, Method, Request, Response};

/// JSON body accepted by `POST /segment`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentRequest {
    #[serde(default)]
    pub url: Option<String>,
}

/// Status plus JSON body, before it is written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status, body },
            Err(e) => Self::error(&Error::from(e)),
        }
    }

    fn error(err: &Error) -> Self {
        let body = serde_json::to_string(&err.to_body())
            .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string());
        Self {
            status: err.status_code(),
            body,
        }
    }
}

/// Route one request. Kept free of socket types so it can be tested directly.
pub fn route(host: &PageHost, method: &Method, path: &str, body: &str) -> Reply {
    let path = path.split('?').next().unwrap_or("");
    match (method, path) {
        (Method::Options, _) => Reply {
            status: 204,
            body: String::new(),
        },
        (Method::Post, "/segment") => {
            let request: SegmentRequest = serde_json::from_str(body).unwrap_or_default();
            let Some(url) = request.url.filter(|u| !u.trim().is_empty()) else {
                return Reply::error(&Error::MissingUrl);
            };
            match host.segment_url(&url) {
                Ok(response) => {
                    log::info!("segmented {}: {} segments", url, response.segments.len());
                    Reply::json(200, &response)
                }
                Err(e) => {
                    log::warn!("segmenting {} failed: {}", url, e);
                    Reply::error(&e)
                }
            }
        }
        _ => Reply {
            status: 404,
            body: r#"{"error":"Not found"}"#.to_string(),
        },
    }
}

fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn respond(mut request: Request, host: &PageHost) {
    let mut body = String::new();
    if let Err(e) = request.as_reader().read_to_string(&mut body) {
        log::warn!("failed to read request body: {}", e);
    }
    let reply = route(host, request.method(), request.url(), &body);
    log::debug!("{} {} -> {}", request.method(), request.url(), reply.status);

    let headers = [
        header("Content-Type", "application/json"),
        header("Access-Control-Allow-Origin", "*"),
        header("Access-Control-Allow-Methods", "POST, OPTIONS"),
        header("Access-Control-Allow-Headers", "Content-Type"),
    ];
    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    for h in headers.into_iter().flatten() {
        response.add_header(h);
    }
    if let Err(e) = request.respond(response) {
        log::warn!("failed to write response: {}", e);
    }
}

/// HTTP front end over a shared [`PageHost`].
pub struct SegmentServer {
    server: tiny_http::Server,
    host: Arc<PageHost>,
}

impl SegmentServer {
    pub fn bind(addr: &str, config: HostConfig) -> Result<Self> {
        let host = Arc::new(PageHost::new(config)?);
        let server = tiny_http::Server::http(addr).map_err(|e| Error::Other(format!("failed to bind {}: {}", addr, e)))?;
        Ok(Self { server, host })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve forever, one thread per request.
    pub fn run(self) {
        if let Some(addr) = self.local_addr() {
            log::info!("listening on http://{}", addr);
        }
        for request in self.server.incoming_requests() {
            let host = Arc::clone(&self.host);
            std::thread::spawn(move || respond(request, &host));
        }
    }
}
