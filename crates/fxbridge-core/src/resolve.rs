use std::collections::BTreeMap;

use fxbridge_host::{HostFacade, TrackHandle};

use crate::normalize::normalize;

/// Normalized parameter name → parameter index, snapshotted from one effect
/// instance. Keyed by a `BTreeMap` so the substring scan below walks keys in
/// lexicographic order and resolution is reproducible run to run.
pub type ParamTable = BTreeMap<String, usize>;

/// Snapshot the parameter names of the effect at `fx` into a lookup table.
///
/// Indices in the table are only valid against this same instance; the table
/// is rebuilt per request rather than cached.
pub fn build_param_table<H: HostFacade>(host: &H, track: TrackHandle, fx: usize) -> ParamTable {
    let mut table = ParamTable::new();
    for index in 0..host.param_count(track, fx) {
        if let Some(name) = host.param_name(track, fx, index) {
            table.insert(normalize(&name), index);
        }
    }
    table
}

/// Resolve a loosely-specified search term to a parameter index.
///
/// Exact match on the normalized term wins; otherwise the first table entry
/// (in key order) whose name contains the term as a substring. Intentionally
/// permissive — a miss is reported together with every known name so the
/// caller can retry.
pub fn resolve(table: &ParamTable, term: &str) -> Option<usize> {
    let needle = normalize(term);
    if let Some(&index) = table.get(&needle) {
        return Some(index);
    }
    table
        .iter()
        .find(|(name, _)| name.contains(needle.as_str()))
        .map(|(_, &index)| index)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn table(entries: &[(&str, usize)]) -> ParamTable {
        entries
            .iter()
            .map(|(name, index)| (name.to_string(), *index))
            .collect()
    }

    #[test]
    fn exact_match_beats_substring() {
        let table = table(&[("cutoff", 3), ("cutofffreq", 7)]);
        assert_eq!(resolve(&table, "cutoff"), Some(3));
        assert_eq!(resolve(&table, "Cut-Off"), Some(3));
    }

    #[test]
    fn substring_fallback() {
        let table = table(&[("filterfreq", 2)]);
        assert_eq!(resolve(&table, "freq"), Some(2));
    }

    #[test]
    fn substring_scan_is_lexicographic() {
        let table = table(&[("outputgain", 9), ("inputgain", 4)]);
        // "inputgain" sorts first, so it wins the substring scan.
        assert_eq!(resolve(&table, "gain"), Some(4));
    }

    #[test]
    fn miss_returns_none() {
        let table = table(&[("gain", 0)]);
        assert_eq!(resolve(&table, "xyz"), None);
        assert_eq!(table.keys().cloned().collect::<Vec<_>>(), vec!["gain"]);
    }

    #[test]
    fn empty_term_hits_first_entry() {
        let table = table(&[("attack", 1), ("release", 2)]);
        assert_eq!(resolve(&table, ""), Some(1));
    }
}
