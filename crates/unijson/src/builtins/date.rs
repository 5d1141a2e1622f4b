use chrono::NaiveDate;

use super::{fields, DATETIME_MODULE};
use crate::error::HookResult;
use crate::locator::Locator;
use crate::registry::Registry;
use crate::value::{str_field, Composite, Map, Value};

const FORMAT: &str = "%Y-%m-%d";

impl Composite for NaiveDate {}

pub(super) fn register(registry: &Registry) {
    registry
        .register_type::<NaiveDate>()
        .with_locator(Locator::trusted(DATETIME_MODULE, "date"))
        .with_encoder(encode)
        .with_decoder(decode);
}

fn encode(date: &NaiveDate) -> HookResult<Map> {
    Ok(fields([("date", Value::from(date.format(FORMAT).to_string()))]))
}

fn decode(map: &Map) -> HookResult<Value> {
    let date = NaiveDate::parse_from_str(str_field(map, "date")?, FORMAT)?;
    Ok(Value::composite(date))
}
