//! HTTP boundary for FxBridge.
//!
//! A single-threaded `tiny_http` listener feeding every request through
//! [`routes::dispatch`]. There is deliberately no parallelism here: the
//! bridge core serializes all host-touching work behind one gate anyway, so
//! extra listener threads would only queue on it. Requests block FIFO; a
//! slow catalog refresh stalls everything behind it and nothing is
//! cancellable once started.

pub mod routes;

use std::io::Read;

use anyhow::{anyhow, Result};
use fxbridge_core::CatalogService;
use fxbridge_host::HostFacade;
use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, Server};

pub use routes::{dispatch, Reply};

pub struct BridgeServer<H: HostFacade> {
    service: CatalogService<H>,
}

impl<H: HostFacade> BridgeServer<H> {
    pub fn new(service: CatalogService<H>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &CatalogService<H> {
        &self.service
    }

    /// Serve requests until the listener socket dies.
    pub fn run(&self, addr: &str) -> Result<()> {
        let server = Server::http(addr).map_err(|err| anyhow!("http bind failed: {err}"))?;
        log::info!("listening on {addr}");
        for mut request in server.incoming_requests() {
            let Some(method) = method_name(request.method()) else {
                respond_json(request, 404, json!({ "error": "not found" }));
                continue;
            };
            let url = request.url().to_string();
            let mut body = String::new();
            if let Err(err) = request.as_reader().read_to_string(&mut body) {
                respond_json(request, 400, json!({ "error": format!("read error: {err}") }));
                continue;
            }
            let reply = routes::dispatch(&self.service, method, &url, &body);
            log::debug!("{method} {url} -> {}", reply.status);
            respond_json(request, reply.status, reply.body);
        }
        Ok(())
    }
}

fn method_name(method: &Method) -> Option<&'static str> {
    match method {
        Method::Get => Some("GET"),
        Method::Post => Some("POST"),
        Method::Delete => Some("DELETE"),
        _ => None,
    }
}

fn respond_json(request: Request, status: u16, body: Value) {
    let response = Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap());
    if let Err(err) = request.respond(response) {
        log::debug!("failed to send response: {err}");
    }
}
