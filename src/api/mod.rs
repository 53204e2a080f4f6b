//! Detection HTTP API.
//!
//! `GET /health`, `POST /api/detect` and `POST /api/webcam-detect`. Request
//! bodies are the raw image bytes; responses use the JSON wire format from
//! `detect::wire`.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::ApiSettings;
use crate::detect::services::{UPLOAD_SERVICE_NAME, WEBCAM_SERVICE_NAME};
use crate::detect::{wire, DetectionRequest, ServiceRegistry};

const MAX_HEADER_BYTES: usize = 8192;
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub const NO_IMAGE_ERROR: &str = "No image provided";
pub const PROCESSING_ERROR: &str = "Failed to process image";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
    pub max_body_bytes: usize,
    /// Service behind `/api/detect`.
    pub upload_service: String,
    /// Service behind `/api/webcam-detect`.
    pub webcam_service: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8787".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            upload_service: UPLOAD_SERVICE_NAME.to_string(),
            webcam_service: WEBCAM_SERVICE_NAME.to_string(),
        }
    }
}

impl From<&ApiSettings> for ApiConfig {
    fn from(settings: &ApiSettings) -> Self {
        Self {
            addr: settings.addr.clone(),
            max_body_bytes: settings.max_body_bytes,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    registry: Arc<ServiceRegistry>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, registry: Arc<ServiceRegistry>) -> Self {
        Self { cfg, registry }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        for name in [&self.cfg.upload_service, &self.cfg.webcam_service] {
            if self.registry.get(name).is_none() {
                return Err(anyhow!("api route service '{}' not registered", name));
            }
        }
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let cfg = self.cfg;
        let registry = self.registry;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, &cfg, &registry, shutdown_thread) {
                log::error!("detection api stopped: {}", err);
            }
        });
        log::info!("detection api listening on http://{}", addr);

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    cfg: &ApiConfig,
    registry: &ServiceRegistry,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, cfg, registry) {
                    log::warn!("detection api request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(
    mut stream: TcpStream,
    cfg: &ApiConfig,
    registry: &ServiceRegistry,
) -> Result<()> {
    stream.set_nonblocking(false)?;
    let request = match read_request(&mut stream, cfg.max_body_bytes) {
        Ok(request) => request,
        Err(RequestError::TooLarge) => {
            write_error(&mut stream, 413, "Payload too large")?;
            return Ok(());
        }
        Err(RequestError::Malformed(err)) => {
            write_error(&mut stream, 400, "Malformed request")?;
            return Err(err);
        }
    };

    let service = match request.path.as_str() {
        "/health" => {
            if request.method != "GET" {
                write_error(&mut stream, 405, "Method not allowed")?;
                return Ok(());
            }
            write_response(&mut stream, 200, br#"{"status":"ok"}"#)?;
            return Ok(());
        }
        "/api/detect" => cfg.upload_service.as_str(),
        "/api/webcam-detect" => cfg.webcam_service.as_str(),
        _ => {
            write_error(&mut stream, 404, "Not found")?;
            return Ok(());
        }
    };
    if request.method != "POST" {
        write_error(&mut stream, 405, "Method not allowed")?;
        return Ok(());
    }

    let content_type = request
        .headers
        .get("content-type")
        .cloned()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let detection = DetectionRequest::new(request.body, content_type);
    if detection.ensure_payload().is_err() {
        write_error(&mut stream, 400, NO_IMAGE_ERROR)?;
        return Ok(());
    }

    match registry.detect(Some(service), &detection) {
        Ok(batch) => {
            log::info!(
                "{} {}: {} detections via {}",
                request.method,
                request.path,
                batch.len(),
                service
            );
            let payload = wire::encode_batch(&batch)?;
            write_response(&mut stream, 200, &payload)?;
        }
        Err(err) => {
            log::error!("detection error on {}: {}", request.path, err);
            write_error(&mut stream, 500, PROCESSING_ERROR)?;
        }
    }
    Ok(())
}

enum RequestError {
    TooLarge,
    Malformed(anyhow::Error),
}

impl From<anyhow::Error> for RequestError {
    fn from(err: anyhow::Error) -> Self {
        RequestError::Malformed(err)
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Malformed(err.into())
    }
}

fn read_request(
    stream: &mut TcpStream,
    max_body_bytes: usize,
) -> std::result::Result<HttpRequest, RequestError> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(RequestError::TooLarge);
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before end of headers").into());
        }
        data.extend_from_slice(&buf[..n]);
    };

    let text = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| anyhow!("invalid content-length '{}'", value))?,
        None => 0,
    };
    if content_length > max_body_bytes {
        return Err(RequestError::TooLarge);
    }

    let mut body = data[header_end + 4..].to_vec();
    body.truncate(content_length);
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!(
                "body truncated: expected {} bytes, got {}",
                content_length,
                body.len()
            )
            .into());
        }
        let take = n.min(content_length - body.len());
        body.extend_from_slice(&buf[..take]);
    }

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        headers,
        body,
    })
}

fn write_error(stream: &mut TcpStream, status: u16, message: &str) -> Result<()> {
    let body = wire::encode_error(message)?;
    write_response(stream, status, &body)
}

fn write_response(stream: &mut TcpStream, status: u16, body: &[u8]) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        413 => "HTTP/1.1 413 Payload Too Large",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}
