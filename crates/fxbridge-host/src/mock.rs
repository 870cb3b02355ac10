//! Scripted in-memory host used by the development server and the tests.
//!
//! The mock keeps a real (if tiny) track/effect graph and a registry of
//! plugin templates, so the bridge exercises the same code paths it would
//! against a live host. It also keeps scan accounting — a track-count
//! high-water mark and a live effect-instance counter — which the tests use
//! to assert that scratch contexts never leak and that gated operations
//! never overlap.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{HostFacade, TimeSignature, TrackHandle};

/// One parameter of a plugin template: name, factory default, and the
/// display text the host would render for it (when scripted).
#[derive(Debug, Clone)]
pub struct ParamTemplate {
    pub name: String,
    pub default: f64,
    pub display: Option<String>,
}

/// An installed plugin as the mock host advertises it.
#[derive(Debug, Clone)]
pub struct PluginTemplate {
    pub name: String,
    pub params: Vec<ParamTemplate>,
    pub loadable: bool,
}

impl PluginTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            loadable: true,
        }
    }

    /// A plugin the host advertises but refuses to instantiate, the way a
    /// stale registry entry or a crashed binary shows up in real scans.
    pub fn broken(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            loadable: false,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, default: f64) -> Self {
        self.params.push(ParamTemplate {
            name: name.into(),
            default,
            display: None,
        });
        self
    }

    pub fn with_displayed_param(
        mut self,
        name: impl Into<String>,
        default: f64,
        display: impl Into<String>,
    ) -> Self {
        self.params.push(ParamTemplate {
            name: name.into(),
            default,
            display: Some(display.into()),
        });
        self
    }
}

#[derive(Debug)]
struct FxInstance {
    plugin: String,
    enabled: bool,
    values: Vec<f64>,
    displays: Vec<Option<String>>,
    names: Vec<String>,
}

#[derive(Debug)]
struct TrackState {
    handle: TrackHandle,
    name: String,
    fx: Vec<FxInstance>,
}

#[derive(Debug)]
struct MockState {
    templates: Vec<PluginTemplate>,
    tracks: Vec<TrackState>,
    next_track_id: u64,
    next_track_number: u64,
    allow_track_creation: bool,
    max_track_count: usize,
    tempo: TimeSignature,
    project_path: String,
    save_count: u64,
}

impl MockState {
    fn track_mut(&mut self, handle: TrackHandle) -> Option<&mut TrackState> {
        self.tracks.iter_mut().find(|t| t.handle == handle)
    }

    fn track_ref(&self, handle: TrackHandle) -> Option<&TrackState> {
        self.tracks.iter().find(|t| t.handle == handle)
    }

    fn instantiate(&self, plugin: &str) -> Option<FxInstance> {
        let template = self
            .templates
            .iter()
            .find(|t| t.name == plugin && t.loadable)?;
        Some(FxInstance {
            plugin: template.name.clone(),
            enabled: true,
            values: template.params.iter().map(|p| p.default).collect(),
            displays: template.params.iter().map(|p| p.display.clone()).collect(),
            names: template.params.iter().map(|p| p.name.clone()).collect(),
        })
    }
}

/// Cloneable handle to a shared mock host. Clones observe the same project
/// state, so a test can keep one clone for assertions after handing the
/// other to the bridge.
#[derive(Debug, Clone)]
pub struct MockHost {
    inner: Arc<Mutex<MockState>>,
}

impl MockHost {
    pub fn new(templates: Vec<PluginTemplate>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                templates,
                tracks: Vec::new(),
                next_track_id: 1,
                next_track_number: 1,
                allow_track_creation: true,
                max_track_count: 0,
                tempo: TimeSignature {
                    bpm: 120.0,
                    beats_per_measure: 4.0,
                },
                project_path: "/tmp/fxbridge-project".into(),
                save_count: 0,
            })),
        }
    }

    /// A small simulated studio: a couple of effect plugins with plausible
    /// parameter sets, plus `seed_tracks` empty tracks.
    pub fn demo(seed_tracks: usize) -> Self {
        let host = Self::new(vec![
            PluginTemplate::new("VST3: Graph EQ (FxBridge)")
                .with_displayed_param("Low Gain", 0.5, "0.0 dB")
                .with_displayed_param("High Gain", 0.5, "0.0 dB")
                .with_displayed_param("Cutoff Freq", 0.4, "440.0 Hz")
                .with_displayed_param("Mix", 1.0, "100%"),
            PluginTemplate::new("VST3: Room Verb (FxBridge)")
                .with_displayed_param("Pre-Delay", 0.1, "20 ms")
                .with_displayed_param("Decay Time", 0.35, "1.2s")
                .with_displayed_param("Wet", 0.3, "30%"),
            PluginTemplate::new("CLAP: Drive (FxBridge)")
                .with_displayed_param("Drive", 0.25, "-6.0 dB")
                .with_param("Tone", 0.5),
        ]);
        for _ in 0..seed_tracks {
            host.add_track();
        }
        host
    }

    /// Append a track outside the facade, for seeding test projects.
    pub fn add_track(&self) -> TrackHandle {
        let mut state = self.inner.lock();
        let handle = TrackHandle(state.next_track_id);
        state.next_track_id += 1;
        let name = format!("Track {}", state.next_track_number);
        state.next_track_number += 1;
        state.tracks.push(TrackState {
            handle,
            name,
            fx: Vec::new(),
        });
        state.max_track_count = state.max_track_count.max(state.tracks.len());
        handle
    }

    /// Append a track with an explicit (possibly empty) name.
    pub fn add_named_track(&self, name: impl Into<String>) -> TrackHandle {
        let mut state = self.inner.lock();
        let handle = TrackHandle(state.next_track_id);
        state.next_track_id += 1;
        state.tracks.push(TrackState {
            handle,
            name: name.into(),
            fx: Vec::new(),
        });
        state.max_track_count = state.max_track_count.max(state.tracks.len());
        handle
    }

    /// Make `insert_track` refuse, forcing callers onto their borrowed-track
    /// fallback.
    pub fn deny_track_creation(&self) {
        self.inner.lock().allow_track_creation = false;
    }

    /// Highest number of tracks that ever existed at once.
    pub fn max_track_count(&self) -> usize {
        self.inner.lock().max_track_count
    }

    /// Effect instances currently alive across every track.
    pub fn live_fx_instances(&self) -> usize {
        self.inner.lock().tracks.iter().map(|t| t.fx.len()).sum()
    }

    pub fn save_count(&self) -> u64 {
        self.inner.lock().save_count
    }
}

impl HostFacade for MockHost {
    fn track_count(&self) -> usize {
        self.inner.lock().tracks.len()
    }

    fn track(&self, index: usize) -> Option<TrackHandle> {
        self.inner.lock().tracks.get(index).map(|t| t.handle)
    }

    fn track_name(&self, track: TrackHandle) -> String {
        self.inner
            .lock()
            .track_ref(track)
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }

    fn insert_track(&mut self, index: usize) -> bool {
        let mut state = self.inner.lock();
        if !state.allow_track_creation {
            return false;
        }
        let index = index.min(state.tracks.len());
        let handle = TrackHandle(state.next_track_id);
        state.next_track_id += 1;
        let name = format!("Track {}", state.next_track_number);
        state.next_track_number += 1;
        state.tracks.insert(
            index,
            TrackState {
                handle,
                name,
                fx: Vec::new(),
            },
        );
        state.max_track_count = state.max_track_count.max(state.tracks.len());
        true
    }

    fn delete_track(&mut self, track: TrackHandle) {
        let mut state = self.inner.lock();
        state.tracks.retain(|t| t.handle != track);
    }

    fn fx_count(&self, track: TrackHandle) -> usize {
        self.inner
            .lock()
            .track_ref(track)
            .map(|t| t.fx.len())
            .unwrap_or(0)
    }

    fn fx_name(&self, track: TrackHandle, fx: usize) -> String {
        self.inner
            .lock()
            .track_ref(track)
            .and_then(|t| t.fx.get(fx))
            .map(|f| f.plugin.clone())
            .unwrap_or_default()
    }

    fn add_fx_by_name(&mut self, track: TrackHandle, name: &str) -> Option<usize> {
        let mut state = self.inner.lock();
        let instance = state.instantiate(name)?;
        let track = state.track_mut(track)?;
        track.fx.push(instance);
        Some(track.fx.len() - 1)
    }

    fn delete_fx(&mut self, track: TrackHandle, fx: usize) -> bool {
        let mut state = self.inner.lock();
        match state.track_mut(track) {
            Some(t) if fx < t.fx.len() => {
                t.fx.remove(fx);
                true
            }
            _ => false,
        }
    }

    fn fx_enabled(&self, track: TrackHandle, fx: usize) -> bool {
        self.inner
            .lock()
            .track_ref(track)
            .and_then(|t| t.fx.get(fx))
            .map(|f| f.enabled)
            .unwrap_or(false)
    }

    fn set_fx_enabled(&mut self, track: TrackHandle, fx: usize, enabled: bool) {
        let mut state = self.inner.lock();
        if let Some(instance) = state.track_mut(track).and_then(|t| t.fx.get_mut(fx)) {
            instance.enabled = enabled;
        }
    }

    fn param_count(&self, track: TrackHandle, fx: usize) -> usize {
        self.inner
            .lock()
            .track_ref(track)
            .and_then(|t| t.fx.get(fx))
            .map(|f| f.values.len())
            .unwrap_or(0)
    }

    fn param_name(&self, track: TrackHandle, fx: usize, param: usize) -> Option<String> {
        self.inner
            .lock()
            .track_ref(track)
            .and_then(|t| t.fx.get(fx))
            .and_then(|f| f.names.get(param))
            .cloned()
    }

    fn param_normalized(&self, track: TrackHandle, fx: usize, param: usize) -> f64 {
        self.inner
            .lock()
            .track_ref(track)
            .and_then(|t| t.fx.get(fx))
            .and_then(|f| f.values.get(param))
            .copied()
            .unwrap_or(0.0)
    }

    fn set_param_normalized(&mut self, track: TrackHandle, fx: usize, param: usize, value: f64) {
        let mut state = self.inner.lock();
        if let Some(slot) = state
            .track_mut(track)
            .and_then(|t| t.fx.get_mut(fx))
            .and_then(|f| f.values.get_mut(param))
        {
            *slot = value.clamp(0.0, 1.0);
        }
    }

    fn formatted_param_value(&self, track: TrackHandle, fx: usize, param: usize) -> Option<String> {
        self.inner
            .lock()
            .track_ref(track)
            .and_then(|t| t.fx.get(fx))
            .and_then(|f| f.displays.get(param))
            .cloned()
            .flatten()
    }

    fn installed_fx(&self) -> Vec<String> {
        self.inner
            .lock()
            .templates
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    fn tempo(&self) -> TimeSignature {
        self.inner.lock().tempo
    }

    fn set_tempo(&mut self, bpm: f64) {
        self.inner.lock().tempo.bpm = bpm;
    }

    fn save_project(&mut self) {
        self.inner.lock().save_count += 1;
    }

    fn project_path(&self) -> String {
        self.inner.lock().project_path.clone()
    }

    fn open_project(&mut self, path: &str) {
        let mut state = self.inner.lock();
        state.project_path = path.to_string();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn gain_host() -> MockHost {
        MockHost::new(vec![PluginTemplate::new("VST3: Gain (Test)")
            .with_displayed_param("Gain", 0.5, "0.0 dB")])
    }

    #[test]
    fn instantiation_honors_templates() {
        let mut host = gain_host();
        let track = host.add_track();
        assert_eq!(host.add_fx_by_name(track, "VST3: Gain (Test)"), Some(0));
        assert_eq!(host.add_fx_by_name(track, "VST3: Missing"), None);
        assert_eq!(host.fx_count(track), 1);
        assert_eq!(host.param_name(track, 0, 0).as_deref(), Some("Gain"));
        assert_eq!(host.param_normalized(track, 0, 0), 0.5);
    }

    #[test]
    fn track_insertion_tracks_high_water() {
        let mut host = gain_host();
        host.add_track();
        assert!(host.insert_track(1));
        assert_eq!(host.track_count(), 2);
        let scratch = host.track(1).unwrap();
        host.delete_track(scratch);
        assert_eq!(host.track_count(), 1);
        assert_eq!(host.max_track_count(), 2);
    }

    #[test]
    fn denied_creation_leaves_graph_untouched() {
        let mut host = gain_host();
        host.add_track();
        host.deny_track_creation();
        assert!(!host.insert_track(1));
        assert_eq!(host.track_count(), 1);
    }

    #[test]
    fn set_param_clamps_to_normalized_range() {
        let mut host = gain_host();
        let track = host.add_track();
        host.add_fx_by_name(track, "VST3: Gain (Test)");
        host.set_param_normalized(track, 0, 0, 2.5);
        assert_eq!(host.param_normalized(track, 0, 0), 1.0);
    }
}
