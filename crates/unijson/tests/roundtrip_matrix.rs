//! Round trips through the free functions and the process-wide registry.
//!
//! Types here are registered once with `unijson::submit!`.

#![cfg(feature = "auto_register")]

use std::any::TypeId;

use chrono::{NaiveDate, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::json;
use unijson::{
    dump, dumps, field, load, loads, Composite, DecodeError, DumpOptions, EncodeError, HookResult,
    LoadOptions, Map, Registry, ResolveError, Value,
};

// ---------------------------------------------------------------------------
// Fixture types
// ---------------------------------------------------------------------------

/// No hooks: field dump out, keyword construction in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NothingDefined {
    a1: Value,
    a2: Value,
}

impl Composite for NothingDefined {}

/// Encode hook only.
#[derive(Debug, Clone, PartialEq)]
struct DefineEncoder {
    a1: Value,
    a2: Value,
}

impl Composite for DefineEncoder {
    fn json_encode(&self) -> Option<HookResult<Map>> {
        Some(Ok(map([
            ("a1", self.a1.clone()),
            ("a2", self.a2.clone()),
            ("source", Value::from("__json_encode__")),
        ])))
    }
}

/// Decode hook only; encoded through its serde field dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct DefineDecoder {
    a1: Value,
    a2: Value,
    source: String,
}

impl DefineDecoder {
    fn from_fields(fields: &Map) -> HookResult<Self> {
        Ok(DefineDecoder {
            a1: field(fields, "a1")?.clone(),
            a2: field(fields, "a2")?.clone(),
            source: "__json_decode__".into(),
        })
    }
}

impl Composite for DefineDecoder {
    fn json_decode(fields: &Map) -> Option<HookResult<Self>> {
        Some(Self::from_fields(fields))
    }
}

/// Both hooks.
#[derive(Debug, Clone, PartialEq)]
struct DefineBoth {
    a1: Value,
    a2: Value,
}

impl Composite for DefineBoth {
    fn json_encode(&self) -> Option<HookResult<Map>> {
        Some(Ok(map([("a1", self.a1.clone()), ("a2", self.a2.clone())])))
    }

    fn json_decode(fields: &Map) -> Option<HookResult<Self>> {
        let decoded = field(fields, "a1").and_then(|a1| {
            Ok(DefineBoth {
                a1: a1.clone(),
                a2: field(fields, "a2")?.clone(),
            })
        });
        Some(decoded)
    }
}

/// Never registered.
#[derive(Debug, Clone, PartialEq)]
struct Stranger;

impl Composite for Stranger {}

fn register(registry: &Registry) {
    registry.register_type::<NothingDefined>().with_serde();
    registry.register_type::<DefineEncoder>();
    registry.register_type::<DefineDecoder>().with_fields();
    registry.register_type::<DefineBoth>();
}

unijson::submit!(register);

fn map<const N: usize>(entries: [(&str, Value); N]) -> Map {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn nothing(a1: impl Into<Value>, a2: impl Into<Value>) -> NothingDefined {
    NothingDefined {
        a1: a1.into(),
        a2: a2.into(),
    }
}

fn encode(value: Value) -> serde_json::Value {
    let text = dumps(&value, &DumpOptions::new()).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn decode(text: &str) -> Value {
    loads(text, &LoadOptions::new()).unwrap()
}

fn round_trip(value: Value) -> Value {
    decode(&dumps(&value, &DumpOptions::new()).unwrap())
}

const MODULE: &str = module_path!();

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[test]
fn encode_native_mapping_like_plain_json() {
    let value = Value::from(json!({"peuh": 12}));
    assert_eq!(dumps(&value, &DumpOptions::new()).unwrap(), r#"{"peuh": 12}"#);
}

#[test]
fn encode_native_sequence_like_plain_json() {
    let value = Value::from(json!([false, true, null, ["Well", "I test thoroughly"]]));
    assert_eq!(
        dumps(&value, &DumpOptions::new()).unwrap(),
        r#"[false, true, null, ["Well", "I test thoroughly"]]"#
    );
}

#[test]
fn encode_plain_composite_appends_locator() {
    let text = dumps(&Value::composite(nothing(12, 34)), &DumpOptions::new()).unwrap();
    assert_eq!(
        text,
        format!(r#"{{"a1": 12, "a2": 34, "__class__": "NothingDefined", "__module__": "{MODULE}"}}"#)
    );
}

#[test]
fn encode_hook_output_and_nested_composite() {
    let value = Value::composite(DefineEncoder {
        a1: Value::from(1643),
        a2: Value::composite(nothing("sgfd", json!([12, false, true, "peuh"]))),
    });
    assert_eq!(
        encode(value),
        json!({
            "a1": 1643,
            "a2": {
                "a1": "sgfd",
                "a2": [12, false, true, "peuh"],
                "__class__": "NothingDefined",
                "__module__": MODULE
            },
            "source": "__json_encode__",
            "__class__": "DefineEncoder",
            "__module__": MODULE
        })
    );
}

#[test]
fn encode_builtins() {
    assert_eq!(
        encode(Value::composite(Tz::UTC)),
        json!({"__module__": "pytz", "__class__": "timezone", "zone": "UTC"})
    );
    assert_eq!(
        encode(Value::composite(NaiveDate::from_ymd_opt(2018, 8, 13).unwrap())),
        json!({"__module__": "datetime", "__class__": "date", "date": "2018-08-13"})
    );
    assert_eq!(
        encode(Value::composite(NaiveTime::from_hms_opt(18, 53, 42).unwrap())),
        json!({"__module__": "datetime", "__class__": "time", "time": "18:53:42.000000", "tzinfo": null})
    );
}

#[test]
fn encode_duration_as_seconds() {
    let text = dumps(&Value::composite(TimeDelta::seconds(3672)), &DumpOptions::new()).unwrap();
    assert_eq!(
        text,
        r#"{"seconds": 3672.0, "__class__": "timedelta", "__module__": "datetime"}"#
    );
}

#[test]
fn encode_unregistered_type_fails() {
    let err = dumps(&Value::composite(Stranger), &DumpOptions::new()).unwrap_err();
    match err {
        EncodeError::UnsupportedType(name) => assert_eq!(name, format!("{MODULE}::Stranger")),
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[test]
fn decode_native_values_unchanged() {
    assert_eq!(decode(r#"{"peuh":12}"#), Value::from(json!({"peuh": 12})));
    assert_eq!(
        decode(r#"[false, true, null, ["Well", "I test thoroughly"]]"#),
        Value::from(json!([false, true, null, ["Well", "I test thoroughly"]]))
    );
}

#[test]
fn decode_by_keyword_construction() {
    let text = format!(r#"{{"__module__": "{MODULE}", "__class__": "NothingDefined", "a1": 12, "a2": 55789}}"#);
    assert_eq!(
        decode(&text).into_composite::<NothingDefined>().unwrap(),
        nothing(12, 55789)
    );
}

#[test]
fn decode_hook_sets_source() {
    let text = format!(r#"{{"__module__":"{MODULE}", "__class__":"DefineDecoder", "a1":12, "a2":55789}}"#);
    let expected = DefineDecoder {
        a1: Value::from(12),
        a2: Value::from(55789),
        source: "__json_decode__".into(),
    };
    assert_eq!(decode(&text).as_composite::<DefineDecoder>(), Some(&expected));
}

#[test]
fn decode_children_before_parent() {
    let text = format!(
        r#"{{"a1": 1643, "a2": {{"a1": "sgfd", "a2": [12, false, true, "peuh"], "__class__": "NothingDefined",
            "__module__": "{MODULE}"}}, "__class__": "DefineDecoder", "__module__": "{MODULE}"}}"#
    );
    let expected = DefineDecoder {
        a1: Value::from(1643),
        a2: Value::composite(nothing("sgfd", json!([12, false, true, "peuh"]))),
        source: "__json_decode__".into(),
    };
    assert_eq!(decode(&text).as_composite::<DefineDecoder>(), Some(&expected));
}

#[test]
fn decode_builtins_from_wire_layout() {
    let tz = decode(r#"{"__module__":"pytz", "__class__":"timezone", "zone":"UTC"}"#);
    assert_eq!(tz.as_composite::<Tz>(), Some(&Tz::UTC));

    let date = decode(r#"{"__module__":"datetime", "__class__":"date", "date":"2018-08-13"}"#);
    assert_eq!(
        date.as_composite::<NaiveDate>(),
        Some(&NaiveDate::from_ymd_opt(2018, 8, 13).unwrap())
    );

    let delta = decode(r#"{"__module__":"datetime", "__class__":"timedelta", "seconds":3672}"#);
    assert_eq!(delta.as_composite::<TimeDelta>(), Some(&TimeDelta::seconds(3672)));
}

#[test]
fn decode_unknown_module_fails() {
    let err = loads(
        r#"{"__module__": "no_such_module", "__class__": "Thing"}"#,
        &LoadOptions::new(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::TypeResolution(ResolveError::UnknownModule(ref module)) if module == "no_such_module"
    ));
}

#[test]
fn decode_unknown_class_in_known_module_fails() {
    let err = loads(
        r#"{"__module__": "datetime", "__class__": "calendar"}"#,
        &LoadOptions::new(),
    )
    .unwrap_err();
    assert!(err.is_type_resolution());
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn round_trip_native() {
    let value = Value::from(json!({"peuh": 12, "pouet": [false, true, null, ["Well", "I test thoroughly"]]}));
    assert_eq!(round_trip(value.clone()), value);
}

#[test]
fn round_trip_plain_composite() {
    let value = Value::composite(nothing(12, 55789));
    assert_eq!(round_trip(value.clone()), value);
}

#[test]
fn encode_plain_composite_nested_in_field_dump() {
    let value = Value::composite(nothing(0, Value::composite(nothing(1, 2))));
    assert_eq!(
        encode(value),
        json!({
            "a1": 0,
            "a2": {"a1": 1, "a2": 2, "__class__": "NothingDefined", "__module__": MODULE},
            "__class__": "NothingDefined",
            "__module__": MODULE
        })
    );
}

#[test]
fn round_trip_plain_composite_nested_in_plain_composite() {
    let value = Value::composite(nothing(0, Value::composite(nothing(1, 2))));
    let back = round_trip(value.clone());
    assert_eq!(back, value);
    let outer = back.as_composite::<NothingDefined>().unwrap();
    assert!(outer.a2.as_composite::<NothingDefined>().is_some());
}

#[test]
fn round_trip_builtin_in_plain_composite_field() {
    let date = NaiveDate::from_ymd_opt(2018, 8, 13).unwrap();
    let value = Value::composite(nothing(
        Value::composite(date),
        Value::from(vec![Value::composite(TimeDelta::seconds(90))]),
    ));
    assert_eq!(round_trip(value.clone()), value);
}

#[test]
fn unsupported_type_in_field_dump_names_the_field_value() {
    let err = dumps(
        &Value::composite(nothing(1, Value::composite(Stranger))),
        &DumpOptions::new(),
    )
    .unwrap_err();
    assert!(matches!(err, EncodeError::UnsupportedType(ref name) if name.ends_with("::Stranger")));
}

#[test]
fn round_trip_both_hooks() {
    let value = Value::composite(DefineBoth {
        a1: Value::from("fduhghdgg"),
        a2: Value::from(json!([null, "sdifj", 12, false, true])),
    });
    assert_eq!(round_trip(value.clone()), value);
}

#[test]
fn round_trip_builtins() {
    let dublin = Tz::Europe__Dublin
        .with_ymd_and_hms(2018, 8, 13, 18, 53, 42)
        .unwrap();
    let values = [
        Value::composite(NaiveDate::from_ymd_opt(2018, 8, 13).unwrap()),
        Value::composite(dublin),
        Value::composite(dublin.naive_local()),
        Value::composite(NaiveTime::from_hms_opt(18, 53, 42).unwrap()),
        Value::composite(TimeDelta::seconds(3672)),
        Value::composite(Tz::Asia__Tokyo),
    ];
    for value in values {
        assert_eq!(round_trip(value.clone()), value);
    }
}

#[test]
fn round_trip_composites_inside_containers() {
    let value = Value::from(vec![
        Value::composite(nothing(1, 2)),
        [("when", Value::composite(TimeDelta::minutes(5)))].into_iter().collect(),
    ]);
    assert_eq!(round_trip(value.clone()), value);
}

#[test]
fn round_trip_through_streams() {
    let value = Value::composite(nothing("a", json!({"nested": [1, 2]})));
    let mut out = Vec::new();
    dump(&value, &mut out, &DumpOptions::new().with_indent(2)).unwrap();
    let back = load(out.as_slice(), &LoadOptions::new()).unwrap();
    assert_eq!(back, value);
}

#[test]
fn encode_hook_without_decode_keeps_extra_field_on_decode() {
    let value = Value::composite(DefineEncoder {
        a1: Value::from(1),
        a2: Value::from(2),
    });
    let back = round_trip(value);
    assert_eq!(
        back,
        Value::from(json!({"a1": 1, "a2": 2, "source": "__json_encode__"}))
    );
}

// ---------------------------------------------------------------------------
// Static registration
// ---------------------------------------------------------------------------

#[test]
fn submitted_registrations_apply_on_request() {
    let registry = Registry::new();
    assert!(!registry.contains_type(TypeId::of::<NothingDefined>()));
    assert!(registry.auto_register());
    assert!(registry.contains_type(TypeId::of::<NothingDefined>()));
    assert!(Registry::global().contains_type(TypeId::of::<DefineBoth>()));
}
