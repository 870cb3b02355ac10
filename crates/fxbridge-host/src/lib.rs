//! Host automation boundary for FxBridge.
//!
//! This crate defines the [`HostFacade`] trait, the narrow surface FxBridge
//! needs from the audio host it controls: track and effect enumeration,
//! effect instantiation and deletion, normalized parameter access, and a
//! handful of transport/session primitives. A production backend adapts the
//! host's automation API behind this trait; [`mock::MockHost`] provides a
//! fully scripted in-memory backend used by the development server and the
//! test suites.

pub mod mock;

use serde::{Deserialize, Serialize};

/// Opaque identity of a track inside the host's project.
///
/// Handles stay valid across structural edits (unlike positional indices,
/// which shift whenever tracks are inserted or deleted) but die with the
/// track they name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackHandle(pub u64);

/// Project tempo as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub bpm: f64,
    pub beats_per_measure: f64,
}

/// Operations the bridge core consumes from the audio host.
///
/// Effect and parameter positions are plain indices with no stable identity;
/// they are only meaningful against the instance they were read from, and the
/// caller is expected to serialize access (the host side is not reentrant).
/// Absent values (`None`) and `false` returns stand in for the host's
/// null/negative sentinels.
pub trait HostFacade: Send {
    fn track_count(&self) -> usize;
    fn track(&self, index: usize) -> Option<TrackHandle>;
    fn track_name(&self, track: TrackHandle) -> String;
    /// Insert a new track at `index`. Returns `false` when the host refuses
    /// structural edits (callers then fall back to borrowing a track).
    fn insert_track(&mut self, index: usize) -> bool;
    fn delete_track(&mut self, track: TrackHandle);

    fn fx_count(&self, track: TrackHandle) -> usize;
    fn fx_name(&self, track: TrackHandle, fx: usize) -> String;
    /// Instantiate the named plugin at the end of the track's effect chain.
    /// Returns the new effect index, or `None` when the host cannot load it.
    fn add_fx_by_name(&mut self, track: TrackHandle, name: &str) -> Option<usize>;
    fn delete_fx(&mut self, track: TrackHandle, fx: usize) -> bool;
    fn fx_enabled(&self, track: TrackHandle, fx: usize) -> bool;
    fn set_fx_enabled(&mut self, track: TrackHandle, fx: usize, enabled: bool);

    fn param_count(&self, track: TrackHandle, fx: usize) -> usize;
    fn param_name(&self, track: TrackHandle, fx: usize, param: usize) -> Option<String>;
    fn param_normalized(&self, track: TrackHandle, fx: usize, param: usize) -> f64;
    fn set_param_normalized(&mut self, track: TrackHandle, fx: usize, param: usize, value: f64);
    /// The host-rendered display text for the parameter's current value
    /// (e.g. `"-6.0 dB"`), when the host can produce one.
    fn formatted_param_value(&self, track: TrackHandle, fx: usize, param: usize) -> Option<String>;

    /// Snapshot of every installed effect plugin name, in the host's own
    /// enumeration order. Finite; a fresh call restarts the enumeration.
    fn installed_fx(&self) -> Vec<String>;

    fn tempo(&self) -> TimeSignature;
    fn set_tempo(&mut self, bpm: f64);

    fn save_project(&mut self);
    fn project_path(&self) -> String;
    fn open_project(&mut self, path: &str);
}
