use serde_json::Value;

use crate::models::StatusSnapshot;

/// Rewrite every key of `section` to `prefix + key`. An empty prefix returns the section unchanged.
pub fn prefix_keys(section: StatusSnapshot, prefix: &str) -> StatusSnapshot {
    if prefix.is_empty() {
        return section;
    }
    section.into_iter().map(|(k, v)| (format!("{prefix}{k}"), v)).collect()
}

/// Merge sections in order; a later section overrides earlier ones on key collision.
pub fn merge_sections<I>(sections: I) -> StatusSnapshot
where
    I: IntoIterator<Item = StatusSnapshot>,
{
    let mut merged = StatusSnapshot::new();
    for section in sections {
        merged.extend(section);
    }
    merged
}

/// Setpoint as sent on the wire: integral values as JSON integers, anything else as a float.
pub fn setpoint_value(temp: f64) -> Value {
    if temp.is_finite() && temp.fract() == 0.0 && temp.abs() < i64::MAX as f64 {
        Value::from(temp as i64)
    } else {
        Value::from(temp)
    }
}
