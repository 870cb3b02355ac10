/// Canonical matching key for a host-reported name: lowercased, with every
/// character that is not an ASCII letter or digit removed.
///
/// Hosts are wildly inconsistent about spacing and punctuation in parameter
/// names ("Cutoff Freq", "CUTOFF-FREQ!"), so both the lookup table and every
/// search term go through this before any comparison.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(normalize("Cutoff Freq"), "cutofffreq");
        assert_eq!(normalize("CUTOFF-FREQ!"), "cutofffreq");
        assert_eq!(normalize("  Dry / Wet  "), "drywet");
    }

    #[test]
    fn is_idempotent() {
        for raw in ["Gain", "Pre-Delay (ms)", "", "Äöü 12%"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn non_ascii_is_dropped() {
        assert_eq!(normalize("Länge"), "lnge");
        assert_eq!(normalize("空間"), "");
    }
}
