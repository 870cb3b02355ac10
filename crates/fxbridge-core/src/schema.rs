use chrono::{DateTime, Utc};
use fxbridge_host::{HostFacade, TrackHandle};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::normalize::normalize;
use crate::scratch::ScratchTrack;

/// One parameter as read from a freshly instantiated effect. Immutable once
/// built. The index is only meaningful against the instance it was read
/// from; `name_normalized` is the stable identifier across sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub index: usize,
    pub name_raw: String,
    pub name_normalized: String,
    pub default_normalized: f64,
}

/// The cached description of one plugin's parameter set, or the recorded
/// reason it could not be described. Failures cache like successes — a
/// broken plugin is a fact about the installation worth remembering until
/// the next refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSchema {
    Ready {
        name: String,
        format: String,
        scanned_at: DateTime<Utc>,
        param_count: usize,
        params: Vec<ParamDescriptor>,
    },
    Failed {
        plugin: String,
        error: String,
    },
}

impl PluginSchema {
    pub fn name(&self) -> &str {
        match self {
            PluginSchema::Ready { name, .. } => name,
            PluginSchema::Failed { plugin, .. } => plugin,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PluginSchema::Ready { .. })
    }
}

/// The plugin-format tag hosts prefix onto installed-effect names
/// ("VST3: Pro-Q" → "VST3"), or "unknown" when there is no separator.
pub fn format_prefix(plugin_name: &str) -> &str {
    plugin_name
        .split_once(':')
        .map(|(prefix, _)| prefix)
        .unwrap_or("unknown")
}

/// Instantiate `plugin_name` in a scratch context and read out its full
/// parameter schema.
///
/// The scratch context is released on every path — acquisition failure is
/// reported before anything exists, instantiation failure releases before
/// returning, and the success path releases right after enumeration — so
/// the host's track and effect counts are unchanged once this returns.
pub fn describe_plugin<H: HostFacade>(host: &mut H, plugin_name: &str) -> PluginSchema {
    match probe_params(host, plugin_name) {
        Ok(params) => PluginSchema::Ready {
            name: plugin_name.to_string(),
            format: format_prefix(plugin_name).to_string(),
            scanned_at: Utc::now(),
            param_count: params.len(),
            params,
        },
        Err(err) => {
            log::warn!("schema probe failed for {plugin_name}: {err}");
            PluginSchema::Failed {
                plugin: plugin_name.to_string(),
                error: err.to_string(),
            }
        }
    }
}

fn probe_params<H: HostFacade>(
    host: &mut H,
    plugin_name: &str,
) -> Result<Vec<ParamDescriptor>, BridgeError> {
    let scratch = ScratchTrack::acquire(host).ok_or(BridgeError::NoScratchTrack)?;
    let track = scratch.track();

    let Some(fx_index) = host.add_fx_by_name(track, plugin_name) else {
        scratch.release(host, None);
        return Err(BridgeError::Instantiation(plugin_name.to_string()));
    };

    let params = collect_params(host, track, fx_index);
    scratch.release(host, Some(fx_index));
    Ok(params)
}

pub(crate) fn collect_params<H: HostFacade>(
    host: &H,
    track: TrackHandle,
    fx: usize,
) -> Vec<ParamDescriptor> {
    (0..host.param_count(track, fx))
        .filter_map(|index| {
            host.param_name(track, fx, index).map(|name_raw| ParamDescriptor {
                index,
                name_normalized: normalize(&name_raw),
                default_normalized: host.param_normalized(track, fx, index),
                name_raw,
            })
        })
        .collect()
}
