use chrono::NaiveTime;

use super::{fields, DATETIME_MODULE};
use crate::error::{HookError, HookResult};
use crate::locator::Locator;
use crate::registry::Registry;
use crate::value::{str_field, Composite, Map, Value};

const FORMAT: &str = "%H:%M:%S%.6f";

impl Composite for NaiveTime {}

pub(super) fn register(registry: &Registry) {
    registry
        .register_type::<NaiveTime>()
        .with_locator(Locator::trusted(DATETIME_MODULE, "time"))
        .with_encoder(encode)
        .with_decoder(decode);
}

fn encode(time: &NaiveTime) -> HookResult<Map> {
    Ok(fields([
        ("time", Value::from(time.format(FORMAT).to_string())),
        ("tzinfo", Value::Null),
    ]))
}

fn decode(map: &Map) -> HookResult<Value> {
    if map.get("tzinfo").is_some_and(|tz| !tz.is_null()) {
        return Err(HookError::msg("clock times with a timezone are not supported"));
    }
    let time = NaiveTime::parse_from_str(str_field(map, "time")?, FORMAT)?;
    Ok(Value::composite(time))
}
