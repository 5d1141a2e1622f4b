use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use super::{fields, DATETIME_MODULE};
use crate::error::{HookError, HookResult};
use crate::locator::Locator;
use crate::registry::Registry;
use crate::value::{str_field, Composite, Map, Value};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

impl Composite for NaiveDateTime {}

impl Composite for DateTime<Tz> {}

pub(super) fn register(registry: &Registry) {
    let locator = Locator::trusted(DATETIME_MODULE, "datetime");
    registry
        .register_type::<DateTime<Tz>>()
        .with_locator(locator.clone())
        .with_encoder(encode_aware);
    // Registered last so the shared locator resolves to the naive entry,
    // whose decoder yields either form.
    registry
        .register_type::<NaiveDateTime>()
        .with_locator(locator)
        .with_encoder(encode_naive)
        .with_decoder(decode);
}

fn encode_naive(datetime: &NaiveDateTime) -> HookResult<Map> {
    Ok(fields([
        ("datetime", Value::from(datetime.format(FORMAT).to_string())),
        ("tzinfo", Value::Null),
    ]))
}

fn encode_aware(datetime: &DateTime<Tz>) -> HookResult<Map> {
    Ok(fields([
        ("datetime", Value::from(datetime.naive_local().format(FORMAT).to_string())),
        ("tzinfo", Value::composite(datetime.timezone())),
    ]))
}

fn decode(map: &Map) -> HookResult<Value> {
    let naive = NaiveDateTime::parse_from_str(str_field(map, "datetime")?, FORMAT)?;
    match map.get("tzinfo").unwrap_or(&Value::Null) {
        Value::Null => Ok(Value::composite(naive)),
        tzinfo => {
            let tz = tzinfo.as_composite::<Tz>().ok_or_else(|| HookError::InvalidField {
                field: "tzinfo".into(),
                expected: "a timezone",
            })?;
            let aware = tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
                HookError::msg(format!("{naive} does not exist in {}", tz.name()))
            })?;
            Ok(Value::composite(aware))
        }
    }
}
