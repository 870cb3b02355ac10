use serde::{Deserialize, Serialize};

/// Unit classification derived from a host-rendered parameter display
/// string. Derived per request from the current formatted value; never
/// cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamMetadata {
    pub display: String,
    pub unit: String,
    pub format_hint: String,
}

impl Default for ParamMetadata {
    fn default() -> Self {
        Self {
            display: String::new(),
            unit: String::new(),
            format_hint: "raw".into(),
        }
    }
}

/// Classify a formatted display value into unit and format hint.
///
/// First match wins, and the order matters: "db" outranks "hz" so that a
/// string like "0 dB @ 1 kHz" reads as a level, and "ms" outranks the
/// trailing-seconds rule. `None` (the host produced no display text) yields
/// the raw default.
pub fn classify_display(display: Option<String>) -> ParamMetadata {
    let Some(display) = display else {
        return ParamMetadata::default();
    };

    let lower = display.to_lowercase();
    let trailing_seconds = lower.len() > 1
        && lower.ends_with('s')
        && lower
            .as_bytes()
            .get(lower.len() - 2)
            .is_some_and(|b| b.is_ascii_digit());

    let (unit, format_hint) = if lower.contains("db") {
        ("dB", "decibel")
    } else if lower.contains("khz") || lower.contains("hz") {
        ("Hz", "frequency")
    } else if lower.contains('%') {
        ("%", "percentage")
    } else if lower.contains("ms") {
        ("ms", "time")
    } else if lower.contains("sec") || trailing_seconds {
        ("s", "time")
    } else {
        ("", "raw")
    };

    ParamMetadata {
        display,
        unit: unit.into(),
        format_hint: format_hint.into(),
    }
}
