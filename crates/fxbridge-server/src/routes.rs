use std::sync::Arc;

use fxbridge_core::{BridgeError, CatalogService, PluginSchema};
use fxbridge_host::HostFacade;
use serde::Deserialize;
use serde_json::{json, Value};

/// One JSON response: status code plus the body to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            body: json!({ "error": "not found" }),
        }
    }
}

/// Route one request to the service and turn the outcome into a reply.
/// Errors never escape: every failure becomes a tagged JSON payload.
pub fn dispatch<H: HostFacade>(
    service: &CatalogService<H>,
    method: &str,
    url: &str,
    body: &str,
) -> Reply {
    let (path, query) = split_url(url);
    route(service, method, path, &query, body).unwrap_or_else(|err| error_reply(&err))
}

fn route<H: HostFacade>(
    service: &CatalogService<H>,
    method: &str,
    path: &str,
    query: &[(String, String)],
    body: &str,
) -> Result<Reply, BridgeError> {
    match (method, path) {
        ("GET", "/ping") => Ok(Reply::ok(
            json!({ "status": "ok", "service": "FxBridge" }),
        )),

        ("GET", "/tracks") => Ok(Reply::ok(to_json(&service.track_overview())?)),

        ("GET", "/fx/list") => {
            let track = optional_usize(query, "track", 0)?;
            Ok(Reply::ok(to_json(&service.fx_list(track)?)?))
        }

        ("GET", "/fx/catalog") => {
            let refresh = query_param(query, "refresh").is_some_and(|v| v != "0");
            let report = service.catalog(refresh);
            let plugins: Vec<&PluginSchema> =
                report.plugins.iter().map(Arc::as_ref).collect();
            Ok(Reply::ok(json!({
                "count": report.count,
                "plugins": plugins,
                "cache_size": report.cache_size,
                "refreshed": report.refreshed,
            })))
        }

        ("GET", "/fx/params") => {
            let track = optional_usize(query, "track", 0)?;
            let fx = optional_usize(query, "fx", 0)?;
            Ok(Reply::ok(to_json(&service.fx_params(track, fx)?)?))
        }

        ("GET", "/fx/param") => {
            let track = require_usize(query, "track")?;
            let fx = require_usize(query, "fx")?;
            let param = query_param(query, "param").unwrap_or_default();
            let read = service.param_by_name(track, fx, param)?;
            Ok(Reply::ok(json!({
                "track": read.track,
                "fx": read.fx,
                "param": param,
                "param_index": read.param_index,
                "value": read.value,
            })))
        }

        ("POST", "/fx/param") => {
            let req: SetParamBody = parse_body(body)?;
            let write = service.set_param_by_name(req.track, req.fx, &req.param, req.value)?;
            Ok(Reply::ok(json!({
                "success": true,
                "track": write.track,
                "fx": write.fx,
                "param_index": write.param_index,
                "value": write.value,
            })))
        }

        ("GET", "/fx/param_index") => {
            let track = require_usize(query, "track")?;
            let fx = require_usize(query, "fx")?;
            let index = require_usize(query, "param_index")?;
            let read = service.param_by_index(track, fx, index)?;
            Ok(Reply::ok(json!({
                "track": read.track,
                "fx": read.fx,
                "param_index": read.param_index,
                "param_name": read.param_name,
                "value": read.value,
            })))
        }

        ("POST", "/fx/param_index") => {
            let req: SetParamIndexBody = parse_body(body)?;
            let index = req
                .param_index
                .ok_or_else(|| BridgeError::InvalidInput("param_index is required".into()))?;
            let write = service.set_param_by_index(req.track, req.fx, index, req.value)?;
            Ok(Reply::ok(json!({
                "success": true,
                "track": write.track,
                "fx": write.fx,
                "param_index": write.param_index,
                "param_name": write.param_name,
                "value": write.value,
            })))
        }

        ("POST", "/fx/add") => {
            let req: AddFxBody = parse_body(body)?;
            let added = service.add_fx(req.track, &req.plugin)?;
            Ok(Reply::ok(json!({
                "success": true,
                "track": added.track,
                "fx_index": added.fx_index,
                "fx_name": added.fx_name,
            })))
        }

        ("DELETE", "/fx/remove") => {
            let track = require_usize(query, "track")?;
            let fx = require_usize(query, "fx")?;
            let removed = service.remove_fx(track, fx)?;
            Ok(Reply::ok(json!({
                "success": removed.removed,
                "track": removed.track,
                "fx": removed.fx,
            })))
        }

        ("POST", "/fx/toggle") => {
            let req: ToggleBody = parse_body(body)?;
            let toggled = service.set_fx_enabled(req.track, req.fx, req.enabled)?;
            Ok(Reply::ok(json!({
                "success": true,
                "track": toggled.track,
                "fx": toggled.fx,
                "enabled": toggled.enabled,
            })))
        }

        ("GET", "/transport/bpm") => {
            let sig = service.tempo();
            Ok(Reply::ok(json!({
                "bpm": sig.bpm,
                "beats_per_measure": sig.beats_per_measure,
            })))
        }

        ("POST", "/transport/bpm") => {
            let req: BpmBody = parse_body(body)?;
            service.set_tempo(req.bpm);
            Ok(Reply::ok(json!({ "success": true, "bpm": req.bpm })))
        }

        ("POST", "/project/save") => {
            let req: SaveBody = parse_body(body)?;
            let saved = service.save_project();
            Ok(Reply::ok(json!({
                "success": true,
                "preset_name": req.name,
                "project_path": saved.project_path,
            })))
        }

        ("POST", "/project/load") => {
            let req: LoadBody = parse_body(body)?;
            service.open_project(&req.path)?;
            Ok(Reply::ok(json!({ "success": true, "loaded_path": req.path })))
        }

        _ => Ok(Reply::not_found()),
    }
}

fn error_reply(err: &BridgeError) -> Reply {
    let (status, body) = match err {
        BridgeError::TrackNotFound(_) => (404, json!({ "error": "Track not found" })),
        BridgeError::FxNotFound { .. } => (404, json!({ "error": "FX not found" })),
        BridgeError::ParamIndexOutOfRange { .. } => {
            (404, json!({ "error": "Parameter index out of range" }))
        }
        BridgeError::ParamNotFound { searched, available } => (
            404,
            json!({
                "error": "Parameter not found",
                "searched": searched,
                "available_params": available,
            }),
        ),
        BridgeError::Instantiation(plugin) => (
            500,
            json!({ "error": "Failed to load plugin", "plugin": plugin }),
        ),
        BridgeError::NoScratchTrack => (500, json!({ "error": err.to_string() })),
        BridgeError::InvalidInput(msg) => (400, json!({ "error": msg })),
    };
    Reply { status, body }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, BridgeError> {
    serde_json::to_value(value).map_err(|err| BridgeError::InvalidInput(err.to_string()))
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a str) -> Result<T, BridgeError> {
    serde_json::from_str(body).map_err(|err| BridgeError::InvalidInput(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct SetParamBody {
    #[serde(default)]
    track: usize,
    #[serde(default)]
    fx: usize,
    #[serde(default)]
    param: String,
    #[serde(default)]
    value: f64,
}

#[derive(Debug, Deserialize)]
struct SetParamIndexBody {
    #[serde(default)]
    track: usize,
    #[serde(default)]
    fx: usize,
    param_index: Option<usize>,
    #[serde(default)]
    value: f64,
}

#[derive(Debug, Deserialize)]
struct AddFxBody {
    #[serde(default)]
    track: usize,
    #[serde(default)]
    plugin: String,
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    #[serde(default)]
    track: usize,
    #[serde(default)]
    fx: usize,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BpmBody {
    #[serde(default = "default_bpm")]
    bpm: f64,
}

fn default_bpm() -> f64 {
    120.0
}

#[derive(Debug, Deserialize)]
struct SaveBody {
    #[serde(default = "default_preset")]
    name: String,
}

fn default_preset() -> String {
    "preset".into()
}

#[derive(Debug, Deserialize)]
struct LoadBody {
    #[serde(default)]
    path: String,
}

fn split_url(url: &str) -> (&str, Vec<(String, String)>) {
    match url.split_once('?') {
        Some((path, raw)) => {
            let query = raw
                .split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((key, value)) => (decode_component(key), decode_component(value)),
                    None => (decode_component(pair), String::new()),
                })
                .collect();
            (path, query)
        }
        None => (url, Vec::new()),
    }
}

/// Minimal percent decoding: `+` as space, `%XX` as the encoded byte,
/// anything malformed passed through verbatim.
fn decode_component(raw: &str) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut rest = raw.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        match b {
            b'+' => {
                bytes.push(b' ');
                rest = tail;
            }
            b'%' if tail.len() >= 2 => {
                let hex = std::str::from_utf8(&tail[..2]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(decoded) => {
                        bytes.push(decoded);
                        rest = &tail[2..];
                    }
                    None => {
                        bytes.push(b);
                        rest = tail;
                    }
                }
            }
            _ => {
                bytes.push(b);
                rest = tail;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn query_param<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

fn require_usize(query: &[(String, String)], key: &str) -> Result<usize, BridgeError> {
    let raw = query_param(query, key)
        .ok_or_else(|| BridgeError::InvalidInput(format!("{key} is required")))?;
    raw.parse()
        .map_err(|_| BridgeError::InvalidInput(format!("{key} is not a valid index: {raw:?}")))
}

fn optional_usize(
    query: &[(String, String)],
    key: &str,
    default: usize,
) -> Result<usize, BridgeError> {
    match query_param(query, key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| BridgeError::InvalidInput(format!("{key} is not a valid index: {raw:?}"))),
        None => Ok(default),
    }
}
