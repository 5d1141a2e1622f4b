use chrono::TimeDelta;

use super::{fields, DATETIME_MODULE};
use crate::error::{HookError, HookResult};
use crate::locator::Locator;
use crate::registry::Registry;
use crate::value::{Composite, JsonMap, Map, Value};

/// Accepted keyword arguments and their length in microseconds.
const UNITS: [(&str, f64); 7] = [
    ("weeks", 604_800e6),
    ("days", 86_400e6),
    ("hours", 3_600e6),
    ("minutes", 60e6),
    ("seconds", 1e6),
    ("milliseconds", 1e3),
    ("microseconds", 1.0),
];

impl Composite for TimeDelta {}

/// Durations encode to their total seconds and are rebuilt by keyword
/// construction, so any mix of units decodes.
pub(super) fn register(registry: &Registry) {
    registry
        .register_type::<TimeDelta>()
        .with_locator(Locator::trusted(DATETIME_MODULE, "timedelta"))
        .with_encoder(encode)
        .with_constructor(construct);
}

fn encode(delta: &TimeDelta) -> HookResult<Map> {
    let seconds = delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1e9;
    Ok(fields([("seconds", Value::float(seconds))]))
}

fn construct(kwargs: &JsonMap) -> HookResult<TimeDelta> {
    let mut micros = 0.0;
    for (key, value) in kwargs {
        let (_, scale) = UNITS
            .iter()
            .find(|(unit, _)| *unit == key.as_str())
            .ok_or_else(|| HookError::msg(format!("unexpected keyword argument `{key}`")))?;
        let amount = value.as_f64().ok_or_else(|| HookError::InvalidField {
            field: key.clone(),
            expected: "a number",
        })?;
        micros += amount * scale;
    }
    let micros = micros.round_ties_even();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return Err(HookError::msg("duration out of range"));
    }
    Ok(TimeDelta::microseconds(micros as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Decoder, DumpOptions, Encoder, LoadOptions};
    use serde_json::json;

    fn kwargs(value: serde_json::Value) -> JsonMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn encodes_total_seconds() {
        let text = Encoder::new(Registry::new())
            .dumps(&Value::composite(TimeDelta::seconds(3672)), &DumpOptions::new())
            .unwrap();
        assert_eq!(
            text,
            r#"{"seconds": 3672.0, "__class__": "timedelta", "__module__": "datetime"}"#
        );
    }

    #[test]
    fn fractional_and_negative_seconds() {
        let out = encode(&TimeDelta::milliseconds(-1500)).unwrap();
        assert_eq!(out["seconds"], Value::from(-1.5));
    }

    #[test]
    fn decodes_by_keyword_construction() {
        let text = r#"{"__module__": "datetime", "__class__": "timedelta", "seconds": 3672}"#;
        let value = Decoder::new(Registry::new())
            .loads(text, &LoadOptions::new())
            .unwrap();
        assert_eq!(value.as_composite::<TimeDelta>(), Some(&TimeDelta::seconds(3672)));
    }

    #[test]
    fn mixes_units() {
        let delta = construct(&kwargs(json!({"days": 1, "hours": 2, "milliseconds": 3}))).unwrap();
        assert_eq!(
            delta,
            TimeDelta::days(1) + TimeDelta::hours(2) + TimeDelta::milliseconds(3)
        );
        assert_eq!(construct(&JsonMap::new()).unwrap(), TimeDelta::zero());
    }

    #[test]
    fn rounds_to_microseconds() {
        let delta = construct(&kwargs(json!({"microseconds": 2.5}))).unwrap();
        assert_eq!(delta, TimeDelta::microseconds(2));
        let delta = construct(&kwargs(json!({"microseconds": 3.5}))).unwrap();
        assert_eq!(delta, TimeDelta::microseconds(4));
    }

    #[test]
    fn sub_microseconds_round_on_decode() {
        let out = encode(&TimeDelta::nanoseconds(1_700)).unwrap();
        let seconds = out["seconds"].as_f64().unwrap();
        let delta = construct(&kwargs(json!({"seconds": seconds}))).unwrap();
        assert_eq!(delta, TimeDelta::microseconds(2));
    }

    #[test]
    fn rejects_unknown_units_and_non_numbers() {
        assert!(construct(&kwargs(json!({"years": 1}))).is_err());
        assert!(matches!(
            construct(&kwargs(json!({"seconds": "1"}))),
            Err(HookError::InvalidField { .. })
        ));
    }
}
