// src/server/http.rs

//! Static file server with live reload for the build output.

use std::fs;
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::anyhow;
use tiny_http::{Header, Method, Request, Response, Server};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::server::hub::ReloadHub;

/// Long-poll endpoint used by the injected client script.
pub const RELOAD_ENDPOINT: &str = "/__siteflow/reload";

/// How long a reload long-poll is held open without news.
pub const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(25);

type HttpResponse = Response<Cursor<Vec<u8>>>;

/// A running dev server. Dropping it stops the accept loop.
pub struct DevServer {
    server: Arc<Server>,
    addr: SocketAddr,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for DevServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevServer").field("addr", &self.addr).finish()
    }
}

impl DevServer {
    /// Serve `root` on `host:port` (port 0 picks a free port).
    ///
    /// Requests are handled on plain threads; long-polls wait on `hub`
    /// through `runtime`.
    pub fn serve(
        root: impl Into<PathBuf>,
        host: &str,
        port: u16,
        hub: Arc<ReloadHub>,
        runtime: Handle,
    ) -> Result<Self> {
        let root = root.into();
        let server = Server::http((host, port))
            .map_err(|e| anyhow!("failed to start dev server on {host}:{port}: {e}"))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| anyhow!("dev server is not bound to an IP address"))?;
        let server = Arc::new(server);

        info!(%addr, root = ?root, "dev server listening");

        let accept = Arc::clone(&server);
        let thread = thread::Builder::new()
            .name("siteflow-http".into())
            .spawn(move || {
                for request in accept.incoming_requests() {
                    let root = root.clone();
                    let hub = Arc::clone(&hub);
                    let runtime = runtime.clone();
                    // Long-polls park their thread; keep them off the accept loop.
                    let spawned = thread::Builder::new()
                        .name("siteflow-http-req".into())
                        .spawn(move || handle_request(request, &root, &hub, &runtime));
                    if let Err(e) = spawned {
                        warn!(error = %e, "failed to spawn request thread");
                    }
                }
                debug!("dev server accept loop finished");
            })
            .map_err(|e| anyhow!("failed to spawn dev server thread: {e}"))?;

        Ok(Self {
            server,
            addr,
            thread: Some(thread),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn handle_request(request: Request, root: &Path, hub: &ReloadHub, runtime: &Handle) {
    let url = request.url().to_string();
    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    debug!(method = %request.method(), %path, "dev server request");

    let response = if *request.method() != Method::Get && *request.method() != Method::Head {
        text_response(405, "Method Not Allowed")
    } else if path == RELOAD_ENDPOINT {
        let since = query_param(query, "since")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        let signal = runtime.block_on(hub.wait_newer(since, LONG_POLL_TIMEOUT));
        match serde_json::to_vec(&signal) {
            Ok(body) => with_header(
                Response::from_data(body),
                "Content-Type",
                "application/json",
            ),
            Err(e) => text_response(500, &e.to_string()),
        }
    } else {
        serve_file(root, path, hub.current().seq)
    };

    if let Err(e) = request.respond(response) {
        debug!(error = %e, "client went away before response");
    }
}

fn serve_file(root: &Path, url_path: &str, seq: u64) -> HttpResponse {
    let Some(path) = resolve_path(root, url_path) else {
        return not_found();
    };

    match fs::read(&path) {
        Ok(bytes) => {
            let content_type = content_type(&path);
            let body = if content_type.starts_with("text/html") {
                inject_client(&bytes, seq)
            } else {
                bytes
            };
            with_header(Response::from_data(body), "Content-Type", content_type)
        }
        Err(_) => not_found(),
    }
}

/// Map a URL path onto a file under `root`.
///
/// `/` and directories map to `index.html`; `/about` falls back to
/// `about.html`. Anything that would leave `root` is rejected.
pub fn resolve_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode(url_path)?;
    let mut rel = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    let candidate = root.join(&rel);
    if candidate.is_dir() {
        let index = candidate.join("index.html");
        return index.is_file().then_some(index);
    }
    if candidate.is_file() {
        return Some(candidate);
    }
    if candidate.extension().is_none() {
        let html = candidate.with_extension("html");
        if html.is_file() {
            return Some(html);
        }
    }
    None
}

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Client that long-polls the reload endpoint. Stream updates swap matching
/// stylesheets in place; everything else reloads the page.
const CLIENT_SCRIPT: &str = r#"<script>
(function () {
  var seq = __SEQ__;
  function swapStyles(paths) {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var url = new URL(links[i].href, location.href);
      if (paths.length === 0 || paths.indexOf(url.pathname) !== -1) {
        url.searchParams.set('siteflow', String(seq));
        links[i].href = url.toString();
      }
    }
  }
  function poll() {
    fetch('/__siteflow/reload?since=' + seq)
      .then(function (r) { return r.json(); })
      .then(function (s) {
        if (s.seq > seq) {
          seq = s.seq;
          if (s.kind === 'stream') { swapStyles(s.paths); } else { location.reload(); return; }
        }
        poll();
      })
      .catch(function () { setTimeout(poll, 1000); });
  }
  poll();
})();
</script>"#;

/// Insert the client script before `</body>`, or append it.
pub fn inject_client(html: &[u8], seq: u64) -> Vec<u8> {
    let script = CLIENT_SCRIPT.replace("__SEQ__", &seq.to_string());
    let text = String::from_utf8_lossy(html);
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len() + script.len());
    match lower.rfind("</body>") {
        Some(idx) => {
            out.push_str(&text[..idx]);
            out.push_str(&script);
            out.push_str(&text[idx..]);
        }
        None => {
            out.push_str(&text);
            out.push_str(&script);
        }
    }
    out.into_bytes()
}

fn with_header(response: HttpResponse, name: &str, value: &str) -> HttpResponse {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn text_response(status: u16, body: &str) -> HttpResponse {
    with_header(
        Response::from_data(body.as_bytes().to_vec()).with_status_code(status),
        "Content-Type",
        "text/plain; charset=utf-8",
    )
}

fn not_found() -> HttpResponse {
    text_response(404, "Not Found")
}
