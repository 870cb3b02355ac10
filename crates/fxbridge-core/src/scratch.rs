use fxbridge_host::{HostFacade, TrackHandle};

/// A disposable track hosting one transient effect instance for schema
/// discovery.
///
/// Acquisition prefers appending a brand-new track at the end of the
/// project; when the host refuses structural edits it borrows the first
/// existing track instead. The release rules differ because of who owns the
/// track: a created track is ours and is deleted whole, a borrowed track
/// belongs to the user and only the probed effect instance is removed from
/// it.
///
/// `release` consumes the context, so each acquisition is torn down exactly
/// once; callers must route every exit path through it.
#[derive(Debug)]
pub struct ScratchTrack {
    track: TrackHandle,
    created: bool,
}

impl ScratchTrack {
    pub fn acquire<H: HostFacade>(host: &mut H) -> Option<Self> {
        let index = host.track_count();
        if host.insert_track(index) {
            if let Some(track) = host.track(index) {
                log::debug!("scratch: created track at index {index}");
                return Some(Self {
                    track,
                    created: true,
                });
            }
        }
        host.track(0).map(|track| {
            log::debug!("scratch: borrowing first track");
            Self {
                track,
                created: false,
            }
        })
    }

    pub fn track(&self) -> TrackHandle {
        self.track
    }

    pub fn created(&self) -> bool {
        self.created
    }

    /// Tear the context down. `fx_index` is the effect instantiated on the
    /// scratch track, when instantiation got that far; on a borrowed track
    /// with no instance there is nothing of ours to delete.
    pub fn release<H: HostFacade>(self, host: &mut H, fx_index: Option<usize>) {
        if self.created {
            host.delete_track(self.track);
        } else if let Some(fx) = fx_index {
            host.delete_fx(self.track, fx);
        }
    }
}

#[cfg(test)]
mod tests {
    use fxbridge_host::mock::{MockHost, PluginTemplate};
    use pretty_assertions::assert_eq;

    use super::*;

    fn host() -> MockHost {
        MockHost::new(vec![PluginTemplate::new("VST3: Gain (Test)").with_param("Gain", 0.5)])
    }

    #[test]
    fn prefers_creating_a_fresh_track() {
        let mut host = host();
        host.add_track();
        let scratch = ScratchTrack::acquire(&mut host).unwrap();
        assert!(scratch.created());
        assert_eq!(host.track_count(), 2);
        scratch.release(&mut host, None);
        assert_eq!(host.track_count(), 1);
    }

    #[test]
    fn borrows_when_creation_is_denied() {
        let mut host = host();
        let existing = host.add_track();
        host.add_fx_by_name(existing, "VST3: Gain (Test)");
        host.deny_track_creation();

        let scratch = ScratchTrack::acquire(&mut host).unwrap();
        assert!(!scratch.created());
        assert_eq!(scratch.track(), existing);

        // A probe effect lands after the user's own chain; release removes
        // only that instance.
        let fx = host.add_fx_by_name(existing, "VST3: Gain (Test)").unwrap();
        scratch.release(&mut host, Some(fx));
        assert_eq!(host.fx_count(existing), 1);
        assert_eq!(host.track_count(), 1);
    }

    #[test]
    fn borrowed_release_without_instance_deletes_nothing() {
        let mut host = host();
        let existing = host.add_track();
        host.add_fx_by_name(existing, "VST3: Gain (Test)");
        host.deny_track_creation();

        let scratch = ScratchTrack::acquire(&mut host).unwrap();
        scratch.release(&mut host, None);
        assert_eq!(host.fx_count(existing), 1);
    }

    #[test]
    fn no_tracks_and_no_creation_means_no_scratch() {
        let mut host = host();
        host.deny_track_creation();
        assert!(ScratchTrack::acquire(&mut host).is_none());
    }
}
