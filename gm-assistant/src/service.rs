// Read-only HTTP/JSON service over the pipeline.
//
// A TCP accept loop answering GET requests with query strings. Requests and
// responses are `http` crate types; only the wire framing of a single
// request head and a single response lives here. Each connection gets its
// own task and a deadline for sending its head. Each request loads its
// snapshot fresh; the pipeline is the only shared state.

use std::sync::Arc;
use std::time::Duration;

use http::header::{self, HeaderValue};
use http::{Method, Request, Response, StatusCode, Version};
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use crate::analysis::RatioMode;
use crate::pipeline::{Pipeline, PipelineError, WaiverRequest};

/// Upper bound on the request head (request line + headers).
const MAX_HEAD_BYTES: usize = 16 * 1024;
/// How long a peer has to deliver its complete request head.
pub const HEAD_READ_TIMEOUT: Duration = Duration::from_secs(10);
const API_KEY_HEADER: &str = "x-api-key";

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

fn json_response(status: StatusCode, body: Value) -> Response<Value> {
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    resp
}

fn ok<T: Serialize>(body: &T) -> Response<Value> {
    match serde_json::to_value(body) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn error(status: StatusCode, detail: impl Into<String>) -> Response<Value> {
    json_response(status, json!({ "detail": detail.into() }))
}

/// Parse a request head into an `http::Request`. Returns `None` unless the
/// request line, method, target and every header are valid.
pub fn parse_request(head: &str) -> Option<Request<()>> {
    let mut lines = head.split("\r\n");
    let mut parts = lines.next()?.split_whitespace();
    let method = Method::from_bytes(parts.next()?.as_bytes()).ok()?;
    let target = parts.next()?;
    let version = match parts.next()? {
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/1.1" => Version::HTTP_11,
        _ => return None,
    };

    let mut builder = Request::builder().method(method).uri(target).version(version);
    for line in lines.take_while(|l| !l.is_empty()) {
        let (name, value) = line.split_once(':')?;
        builder = builder.header(name.trim(), value.trim());
    }
    builder.body(()).ok()
}

/// Frame a response as HTTP/1.1 bytes. The connection is always closed
/// after one response.
pub fn encode_response(resp: &Response<Value>) -> Vec<u8> {
    let body = resp.body().to_string();
    let status = resp.status();

    let mut out = format!(
        "HTTP/1.1 {} {}\r\n",
        status.as_str(),
        status.canonical_reason().unwrap_or("")
    );
    for (name, value) in resp.headers() {
        if let Ok(value) = value.to_str() {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
    }
    out.push_str(&format!(
        "{}: {}\r\n{}: close\r\n\r\n",
        header::CONTENT_LENGTH,
        body.len(),
        header::CONNECTION
    ));
    out.push_str(&body);
    out.into_bytes()
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Shared, read-only state for every connection.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub pipeline: Pipeline,
    /// When set, every route but `/health` requires a matching `x-api-key`.
    pub api_key: Option<String>,
}

/// Compare keys through their digests so the comparison time does not
/// depend on where the two keys differ.
fn keys_match(given: &str, expected: &str) -> bool {
    let a = Sha256::digest(given.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn pipeline_error(e: PipelineError) -> Response<Value> {
    if e.is_missing_snapshot() {
        error(StatusCode::NOT_FOUND, e.to_string())
    } else {
        error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

fn required_week(url: &Url) -> Result<u32, Response<Value>> {
    let raw = query_param(url, "week")
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "missing query parameter `week`"))?;
    raw.trim()
        .parse::<u32>()
        .map_err(|_| error(StatusCode::BAD_REQUEST, format!("invalid week '{raw}'")))
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn waiver_request(url: &Url) -> Result<WaiverRequest, Response<Value>> {
    let ratio_mode = match query_param(url, "ratio_mode") {
        Some(raw) => Some(
            raw.parse::<RatioMode>()
                .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?,
        ),
        None => None,
    };
    Ok(WaiverRequest {
        pool: query_param(url, "pool").map(Into::into),
        sv_pool: query_param(url, "sv_pool").map(Into::into),
        ratio_mode,
    })
}

/// Map one request to a response. Pure apart from the pipeline's file reads.
pub fn route<B>(ctx: &ServiceContext, req: &Request<B>) -> Response<Value> {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        return error(
            StatusCode::BAD_REQUEST,
            format!("invalid request target '{target}'"),
        );
    };
    let path = url.path();

    const KNOWN: &[&str] = &["/health", "/snapshot", "/pressure", "/inefficiency", "/waivers"];
    if !KNOWN.contains(&path) {
        return error(StatusCode::NOT_FOUND, "Not Found");
    }
    if req.method() != Method::GET {
        return error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    }
    if path == "/health" {
        return json_response(StatusCode::OK, json!({ "ok": true }));
    }

    if let Some(expected) = ctx.api_key.as_deref() {
        let given = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if !given.is_some_and(|given| keys_match(given, expected)) {
            return error(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
    }

    let week = match required_week(&url) {
        Ok(w) => w,
        Err(resp) => return resp,
    };
    let pipeline = &ctx.pipeline;

    let result = match path {
        "/snapshot" => pipeline.snapshot(week).map(|r| ok(&r)),
        "/pressure" => pipeline.pressure(week).map(|r| ok(&r)),
        "/inefficiency" => pipeline.inefficiency(week).map(|r| ok(&r)),
        _ => match waiver_request(&url) {
            Ok(wr) => pipeline.waivers(week, &wr).map(|r| ok(&r)),
            Err(resp) => return resp,
        },
    };
    result.unwrap_or_else(pipeline_error)
}

// ---------------------------------------------------------------------------
// Connection handling
// ---------------------------------------------------------------------------

enum Head {
    /// Peer closed before sending anything.
    Closed,
    Received(String),
    Rejected(&'static str),
}

async fn read_head<S>(stream: &mut S) -> std::io::Result<Head>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(if buf.is_empty() {
                Head::Closed
            } else {
                Head::Rejected("incomplete request")
            });
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = find_head_end(&buf) {
            return Ok(Head::Received(
                String::from_utf8_lossy(&buf[..end]).into_owned(),
            ));
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Ok(Head::Rejected("request head too large"));
        }
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Read one request head from `stream`, answer it, and close. A peer that
/// does not finish its head within [`HEAD_READ_TIMEOUT`] gets a 408.
///
/// Generic over the stream type so tests can drive it with in-memory duplex
/// pipes instead of TCP sockets.
pub async fn handle_connection<S>(mut stream: S, ctx: &ServiceContext) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response = match timeout(HEAD_READ_TIMEOUT, read_head(&mut stream)).await {
        Err(_) => {
            debug!("request head not received within {HEAD_READ_TIMEOUT:?}");
            error(StatusCode::REQUEST_TIMEOUT, "request head not received in time")
        }
        Ok(head) => match head? {
            Head::Closed => return Ok(()),
            Head::Rejected(why) => error(StatusCode::BAD_REQUEST, why),
            Head::Received(head) => match parse_request(&head) {
                Some(req) => {
                    debug!("{} {}", req.method(), req.uri());
                    route(ctx, &req)
                }
                None => error(StatusCode::BAD_REQUEST, "malformed request"),
            },
        },
    };

    if response.status().is_server_error() {
        warn!("request failed: {}", response.body());
    }
    stream.write_all(&encode_response(&response)).await?;
    stream.shutdown().await
}

/// Bind `host:port` and serve forever, one task per connection.
pub async fn run(host: &str, port: u16, ctx: ServiceContext) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("HTTP service listening on {local_addr}");
    if ctx.api_key.is_none() {
        warn!("no service_api_key configured; report endpoints are open");
    }

    let ctx = Arc::new(ctx);
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("Accepted connection from {addr}");
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &ctx).await {
                warn!("connection from {addr} failed: {e}");
            }
        });
    }
}
