use std::collections::BTreeMap;
use std::sync::Arc;

use fxbridge_host::{HostFacade, TimeSignature, TrackHandle};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::BridgeError;
use crate::metadata::{classify_display, ParamMetadata};
use crate::resolve::{build_param_table, resolve};
use crate::schema::{describe_plugin, PluginSchema};

/// The serialized gateway to the host.
///
/// Owns the plugin schema cache and the one lock that stands in front of
/// every host-touching operation — the host side is not reentrant-safe, so
/// each boundary call holds the lock for its whole duration and callers
/// queue FIFO behind it. Constructed once per process and handed to the
/// routing layer by reference.
pub struct CatalogService<H: HostFacade> {
    state: Mutex<ServiceState<H>>,
}

struct ServiceState<H> {
    host: H,
    cache: BTreeMap<String, Arc<PluginSchema>>,
}

/// Result of one catalog pass over the installed plugins.
#[derive(Debug, Clone)]
pub struct CatalogReport {
    pub count: usize,
    pub plugins: Vec<Arc<PluginSchema>>,
    pub cache_size: usize,
    pub refreshed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxInfo {
    pub index: usize,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxList {
    pub track: usize,
    pub fx_count: usize,
    pub fx_list: Vec<FxInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    pub index: usize,
    pub name: String,
    pub fx_count: usize,
    pub fx_list: Vec<FxInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackOverview {
    pub track_count: usize,
    pub tracks: Vec<TrackInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxParamInfo {
    pub index: usize,
    pub name: String,
    pub value: f64,
    #[serde(flatten)]
    pub metadata: ParamMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxParamsReport {
    pub track: usize,
    pub fx: usize,
    pub params: Vec<FxParamInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamRead {
    pub track: usize,
    pub fx: usize,
    pub param_index: usize,
    pub param_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamWrite {
    pub track: usize,
    pub fx: usize,
    pub param_index: usize,
    pub param_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxAdded {
    pub track: usize,
    pub fx_index: usize,
    pub fx_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxRemoved {
    pub track: usize,
    pub fx: usize,
    pub removed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxToggled {
    pub track: usize,
    pub fx: usize,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSaved {
    pub project_path: String,
}

impl<H> ServiceState<H>
where
    H: HostFacade,
{
    fn track_at(&self, index: usize) -> Result<TrackHandle, BridgeError> {
        self.host
            .track(index)
            .ok_or(BridgeError::TrackNotFound(index))
    }

    fn fx_checked(
        &self,
        handle: TrackHandle,
        track: usize,
        fx: usize,
    ) -> Result<(), BridgeError> {
        if fx < self.host.fx_count(handle) {
            Ok(())
        } else {
            Err(BridgeError::FxNotFound { track, fx })
        }
    }

    fn param_checked(
        &self,
        handle: TrackHandle,
        track: usize,
        fx: usize,
        index: usize,
    ) -> Result<(), BridgeError> {
        if index < self.host.param_count(handle, fx) {
            Ok(())
        } else {
            Err(BridgeError::ParamIndexOutOfRange { track, fx, index })
        }
    }

    fn fx_infos(&self, handle: TrackHandle) -> Vec<FxInfo> {
        (0..self.host.fx_count(handle))
            .map(|index| FxInfo {
                index,
                name: self.host.fx_name(handle, index),
                enabled: self.host.fx_enabled(handle, index),
            })
            .collect()
    }
}

impl<H> CatalogService<H>
where
    H: HostFacade,
{
    pub fn new(host: H) -> Self {
        Self {
            state: Mutex::new(ServiceState {
                host,
                cache: BTreeMap::new(),
            }),
        }
    }

    /// Walk every installed plugin, serving schemas from the cache unless
    /// `refresh` wholesale-invalidates it first. Failed schemas are cached
    /// and emitted like any other — one broken plugin never aborts the scan.
    pub fn catalog(&self, refresh: bool) -> CatalogReport {
        let mut state = self.state.lock();
        if refresh {
            state.cache.clear();
        }
        let installed = state.host.installed_fx();
        log::debug!(
            "catalog pass: {} installed, {} cached, refresh={refresh}",
            installed.len(),
            state.cache.len()
        );

        let mut plugins = Vec::with_capacity(installed.len());
        for name in installed {
            if !refresh {
                if let Some(schema) = state.cache.get(&name) {
                    plugins.push(Arc::clone(schema));
                    continue;
                }
            }
            let schema = Arc::new(describe_plugin(&mut state.host, &name));
            state.cache.insert(name, Arc::clone(&schema));
            plugins.push(schema);
        }

        CatalogReport {
            count: plugins.len(),
            cache_size: state.cache.len(),
            refreshed: refresh,
            plugins,
        }
    }

    /// Probe a single named plugin, updating its cache entry with the fresh
    /// result.
    pub fn describe_schema(&self, plugin_name: &str) -> Arc<PluginSchema> {
        let mut state = self.state.lock();
        let schema = Arc::new(describe_plugin(&mut state.host, plugin_name));
        state
            .cache
            .insert(plugin_name.to_string(), Arc::clone(&schema));
        schema
    }

    /// Map a loosely-specified parameter name to the effect's current index
    /// for it.
    pub fn resolve_param(
        &self,
        track: usize,
        fx: usize,
        term: &str,
    ) -> Result<usize, BridgeError> {
        let state = self.state.lock();
        let handle = state.track_at(track)?;
        state.fx_checked(handle, track, fx)?;
        let table = build_param_table(&state.host, handle, fx);
        resolve(&table, term).ok_or_else(|| BridgeError::ParamNotFound {
            searched: term.to_string(),
            available: table.keys().cloned().collect(),
        })
    }

    pub fn param_metadata(
        &self,
        track: usize,
        fx: usize,
        index: usize,
    ) -> Result<ParamMetadata, BridgeError> {
        let state = self.state.lock();
        let handle = state.track_at(track)?;
        state.fx_checked(handle, track, fx)?;
        state.param_checked(handle, track, fx, index)?;
        Ok(classify_display(
            state.host.formatted_param_value(handle, fx, index),
        ))
    }

    pub fn param_by_name(
        &self,
        track: usize,
        fx: usize,
        term: &str,
    ) -> Result<ParamRead, BridgeError> {
        let state = self.state.lock();
        let handle = state.track_at(track)?;
        state.fx_checked(handle, track, fx)?;
        let table = build_param_table(&state.host, handle, fx);
        let index = resolve(&table, term).ok_or_else(|| BridgeError::ParamNotFound {
            searched: term.to_string(),
            available: table.keys().cloned().collect(),
        })?;
        Ok(ParamRead {
            track,
            fx,
            param_index: index,
            param_name: state.host.param_name(handle, fx, index).unwrap_or_default(),
            value: state.host.param_normalized(handle, fx, index),
        })
    }

    pub fn set_param_by_name(
        &self,
        track: usize,
        fx: usize,
        term: &str,
        value: f64,
    ) -> Result<ParamWrite, BridgeError> {
        let mut state = self.state.lock();
        let handle = state.track_at(track)?;
        state.fx_checked(handle, track, fx)?;
        let table = build_param_table(&state.host, handle, fx);
        let index = resolve(&table, term).ok_or_else(|| BridgeError::ParamNotFound {
            searched: term.to_string(),
            available: table.keys().cloned().collect(),
        })?;
        state.host.set_param_normalized(handle, fx, index, value);
        Ok(ParamWrite {
            track,
            fx,
            param_index: index,
            param_name: state.host.param_name(handle, fx, index).unwrap_or_default(),
            value,
        })
    }

    pub fn param_by_index(
        &self,
        track: usize,
        fx: usize,
        index: usize,
    ) -> Result<ParamRead, BridgeError> {
        let state = self.state.lock();
        let handle = state.track_at(track)?;
        state.fx_checked(handle, track, fx)?;
        state.param_checked(handle, track, fx, index)?;
        Ok(ParamRead {
            track,
            fx,
            param_index: index,
            param_name: state.host.param_name(handle, fx, index).unwrap_or_default(),
            value: state.host.param_normalized(handle, fx, index),
        })
    }

    pub fn set_param_by_index(
        &self,
        track: usize,
        fx: usize,
        index: usize,
        value: f64,
    ) -> Result<ParamWrite, BridgeError> {
        let mut state = self.state.lock();
        let handle = state.track_at(track)?;
        state.fx_checked(handle, track, fx)?;
        state.param_checked(handle, track, fx, index)?;
        state.host.set_param_normalized(handle, fx, index, value);
        Ok(ParamWrite {
            track,
            fx,
            param_index: index,
            param_name: state.host.param_name(handle, fx, index).unwrap_or_default(),
            value,
        })
    }

    pub fn fx_list(&self, track: usize) -> Result<FxList, BridgeError> {
        let state = self.state.lock();
        let handle = state.track_at(track)?;
        let fx_list = state.fx_infos(handle);
        Ok(FxList {
            track,
            fx_count: fx_list.len(),
            fx_list,
        })
    }

    /// Every parameter of one effect instance, with current values and the
    /// unit metadata derived from the host's display strings.
    pub fn fx_params(&self, track: usize, fx: usize) -> Result<FxParamsReport, BridgeError> {
        let state = self.state.lock();
        let handle = state.track_at(track)?;
        state.fx_checked(handle, track, fx)?;
        let params = (0..state.host.param_count(handle, fx))
            .filter_map(|index| {
                state.host.param_name(handle, fx, index).map(|name| FxParamInfo {
                    index,
                    name,
                    value: state.host.param_normalized(handle, fx, index),
                    metadata: classify_display(
                        state.host.formatted_param_value(handle, fx, index),
                    ),
                })
            })
            .collect();
        Ok(FxParamsReport { track, fx, params })
    }

    pub fn track_overview(&self) -> TrackOverview {
        let state = self.state.lock();
        let tracks = (0..state.host.track_count())
            .filter_map(|index| {
                state.host.track(index).map(|handle| {
                    let mut name = state.host.track_name(handle);
                    if name.is_empty() {
                        name = format!("Track {}", index + 1);
                    }
                    let fx_list = state.fx_infos(handle);
                    TrackInfo {
                        index,
                        name,
                        fx_count: fx_list.len(),
                        fx_list,
                    }
                })
            })
            .collect::<Vec<_>>();
        TrackOverview {
            track_count: tracks.len(),
            tracks,
        }
    }

    pub fn add_fx(&self, track: usize, plugin: &str) -> Result<FxAdded, BridgeError> {
        let mut state = self.state.lock();
        let handle = state.track_at(track)?;
        let fx_index = state
            .host
            .add_fx_by_name(handle, plugin)
            .ok_or_else(|| BridgeError::Instantiation(plugin.to_string()))?;
        Ok(FxAdded {
            track,
            fx_index,
            fx_name: state.host.fx_name(handle, fx_index),
        })
    }

    pub fn remove_fx(&self, track: usize, fx: usize) -> Result<FxRemoved, BridgeError> {
        let mut state = self.state.lock();
        let handle = state.track_at(track)?;
        let removed = state.host.delete_fx(handle, fx);
        Ok(FxRemoved { track, fx, removed })
    }

    pub fn set_fx_enabled(
        &self,
        track: usize,
        fx: usize,
        enabled: bool,
    ) -> Result<FxToggled, BridgeError> {
        let mut state = self.state.lock();
        let handle = state.track_at(track)?;
        state.fx_checked(handle, track, fx)?;
        state.host.set_fx_enabled(handle, fx, enabled);
        Ok(FxToggled {
            track,
            fx,
            enabled: state.host.fx_enabled(handle, fx),
        })
    }

    pub fn tempo(&self) -> TimeSignature {
        self.state.lock().host.tempo()
    }

    pub fn set_tempo(&self, bpm: f64) -> TimeSignature {
        let mut state = self.state.lock();
        state.host.set_tempo(bpm);
        state.host.tempo()
    }

    pub fn save_project(&self) -> ProjectSaved {
        let mut state = self.state.lock();
        state.host.save_project();
        ProjectSaved {
            project_path: state.host.project_path(),
        }
    }

    pub fn open_project(&self, path: &str) -> Result<(), BridgeError> {
        if path.is_empty() {
            return Err(BridgeError::InvalidInput("Project path required".into()));
        }
        self.state.lock().host.open_project(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use fxbridge_host::mock::{MockHost, PluginTemplate};
    use pretty_assertions::assert_eq;

    use super::*;

    fn studio() -> (CatalogService<MockHost>, MockHost) {
        let host = MockHost::new(vec![
            PluginTemplate::new("VST3: Graph EQ (Test)")
                .with_displayed_param("Low Gain", 0.5, "0.0 dB")
                .with_displayed_param("Cutoff Freq", 0.4, "440.0 Hz"),
            PluginTemplate::new("CLAP: Drive (Test)").with_param("Drive", 0.25),
            PluginTemplate::broken("VST3: Corrupt (Test)"),
        ]);
        host.add_track();
        let observer = host.clone();
        (CatalogService::new(host), observer)
    }

    #[test]
    fn catalog_covers_every_installed_plugin() {
        let (service, host) = studio();
        let report = service.catalog(false);

        assert_eq!(report.count, 3);
        assert_eq!(report.cache_size, 3);
        assert!(!report.refreshed);
        assert!(report.plugins[0].is_ready());
        assert!(report.plugins[1].is_ready());
        assert_eq!(
            *report.plugins[2],
            PluginSchema::Failed {
                plugin: "VST3: Corrupt (Test)".into(),
                error: "Failed to instantiate plugin".into(),
            }
        );

        // Scanning used exactly one scratch track at a time and left the
        // project as it found it.
        assert_eq!(host.track_count(), 1);
        assert_eq!(host.live_fx_instances(), 0);
        assert_eq!(host.max_track_count(), 2);
    }

    #[test]
    fn second_pass_serves_cached_schemas() {
        let (service, _host) = studio();
        let first = service.catalog(false);
        let second = service.catalog(false);
        for (a, b) in first.plugins.iter().zip(second.plugins.iter()) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn refresh_clears_and_recomputes() {
        let (service, _host) = studio();
        let first = service.catalog(false);
        let refreshed = service.catalog(true);
        assert!(refreshed.refreshed);
        assert_eq!(refreshed.cache_size, 3);
        for (a, b) in first.plugins.iter().zip(refreshed.plugins.iter()) {
            assert!(!Arc::ptr_eq(a, b));
            assert_eq!(a.name(), b.name());
        }
    }

    #[test]
    fn describe_schema_updates_the_cache_entry() {
        let (service, _host) = studio();
        let fresh = service.describe_schema("VST3: Graph EQ (Test)");
        let report = service.catalog(false);
        let cached = report
            .plugins
            .iter()
            .find(|schema| schema.name() == "VST3: Graph EQ (Test)")
            .unwrap();
        assert!(Arc::ptr_eq(&fresh, cached));
    }

    #[test]
    fn concurrent_refreshes_never_overlap_scratch_contexts() {
        let (service, host) = studio();
        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    service.catalog(true);
                });
            }
        });
        // Interleaved scans would each hold a scratch track at once; the
        // gate keeps the high-water mark at one above the seeded project.
        assert_eq!(host.max_track_count(), 2);
        assert_eq!(host.track_count(), 1);
        assert_eq!(host.live_fx_instances(), 0);
    }

    #[test]
    fn set_param_by_name_resolves_and_writes() {
        let (service, host) = studio();
        let fx = service.add_fx(0, "VST3: Graph EQ (Test)").unwrap();
        let write = service
            .set_param_by_name(0, fx.fx_index, "cutoff freq", 0.9)
            .unwrap();
        assert_eq!(write.param_index, 1);
        assert_eq!(write.param_name, "Cutoff Freq");
        let handle = host.track(0).unwrap();
        assert_eq!(host.param_normalized(handle, fx.fx_index, 1), 0.9);
    }

    #[test]
    fn resolve_param_matches_loose_spellings() {
        let (service, _host) = studio();
        service.add_fx(0, "VST3: Graph EQ (Test)").unwrap();
        assert_eq!(service.resolve_param(0, 0, "CUTOFF-FREQ!").unwrap(), 1);
        assert_eq!(service.resolve_param(0, 0, "freq").unwrap(), 1);
        assert_eq!(service.resolve_param(0, 0, "low").unwrap(), 0);
    }

    #[test]
    fn unresolved_name_reports_alternatives() {
        let (service, _host) = studio();
        service.add_fx(0, "CLAP: Drive (Test)").unwrap();
        let err = service.set_param_by_name(0, 0, "xyz", 0.5).unwrap_err();
        assert_eq!(
            err,
            BridgeError::ParamNotFound {
                searched: "xyz".into(),
                available: vec!["drive".into()],
            }
        );
    }

    #[test]
    fn index_access_is_range_checked() {
        let (service, _host) = studio();
        service.add_fx(0, "CLAP: Drive (Test)").unwrap();
        assert_eq!(
            service.param_by_index(0, 0, 5).unwrap_err(),
            BridgeError::ParamIndexOutOfRange {
                track: 0,
                fx: 0,
                index: 5
            }
        );
        assert_eq!(
            service.param_by_index(0, 3, 0).unwrap_err(),
            BridgeError::FxNotFound { track: 0, fx: 3 }
        );
        assert_eq!(
            service.param_by_index(7, 0, 0).unwrap_err(),
            BridgeError::TrackNotFound(7)
        );
    }

    #[test]
    fn fx_params_carries_display_metadata() {
        let (service, _host) = studio();
        service.add_fx(0, "VST3: Graph EQ (Test)").unwrap();
        let report = service.fx_params(0, 0).unwrap();
        assert_eq!(report.params.len(), 2);
        assert_eq!(report.params[0].metadata.unit, "dB");
        assert_eq!(report.params[1].metadata.unit, "Hz");
        assert_eq!(report.params[1].metadata.format_hint, "frequency");
    }

    #[test]
    fn overview_substitutes_numbered_names() {
        let host = MockHost::new(vec![PluginTemplate::new("CLAP: Drive (Test)")
            .with_param("Drive", 0.25)]);
        host.add_named_track("");
        host.add_named_track("Vocals");
        let service = CatalogService::new(host);
        service.add_fx(1, "CLAP: Drive (Test)").unwrap();

        let overview = service.track_overview();
        assert_eq!(overview.track_count, 2);
        assert_eq!(overview.tracks[0].name, "Track 1");
        assert_eq!(overview.tracks[1].name, "Vocals");
        assert_eq!(overview.tracks[1].fx_count, 1);
        assert!(overview.tracks[1].fx_list[0].enabled);
    }

    #[test]
    fn remove_fx_reports_host_refusal() {
        let (service, _host) = studio();
        let removed = service.remove_fx(0, 4).unwrap();
        assert!(!removed.removed);
    }

    #[test]
    fn toggle_reads_back_the_host_state() {
        let (service, _host) = studio();
        service.add_fx(0, "CLAP: Drive (Test)").unwrap();
        let toggled = service.set_fx_enabled(0, 0, false).unwrap();
        assert!(!toggled.enabled);
    }

    #[test]
    fn transport_and_project_passthrough() {
        let (service, host) = studio();
        let sig = service.set_tempo(96.0);
        assert_eq!(sig.bpm, 96.0);
        assert_eq!(sig.beats_per_measure, 4.0);

        let saved = service.save_project();
        assert_eq!(saved.project_path, "/tmp/fxbridge-project");
        assert_eq!(host.save_count(), 1);

        service.open_project("/tmp/other.rpp").unwrap();
        assert_eq!(
            service.open_project("").unwrap_err(),
            BridgeError::InvalidInput("Project path required".into())
        );
    }
}
