use chrono::Utc;
use chrono_tz::Tz;

use super::{fields, TIMEZONE_CLASS, TIMEZONE_MODULE};
use crate::error::{HookError, HookResult};
use crate::locator::{Locator, CLASS_KEY, MODULE_KEY};
use crate::registry::Registry;
use crate::value::{Composite, JsonMap, Map, Value};

impl Composite for Tz {}

impl Composite for Utc {}

/// Every zone encodes to the single public alias and is rebuilt from its
/// name. `Utc` shares the alias and decodes as `Tz::UTC`.
pub(super) fn register(registry: &Registry) {
    let locator = Locator::trusted(TIMEZONE_MODULE, TIMEZONE_CLASS);
    registry
        .register_type::<Utc>()
        .with_locator(locator.clone())
        .with_encoder(|_: &Utc| Ok(zone(Tz::UTC.name())));
    registry
        .register_type::<Tz>()
        .with_locator(locator)
        .with_encoder(|tz: &Tz| Ok(zone(tz.name())))
        .with_constructor(construct);
}

fn zone(name: &str) -> Map {
    fields([
        ("zone", Value::from(name)),
        (CLASS_KEY, Value::from(TIMEZONE_CLASS)),
        (MODULE_KEY, Value::from(TIMEZONE_MODULE)),
    ])
}

fn construct(kwargs: &JsonMap) -> HookResult<Tz> {
    if let Some(extra) = kwargs.keys().find(|key| *key != "zone") {
        return Err(HookError::msg(format!("unexpected keyword argument `{extra}`")));
    }
    let name = kwargs
        .get("zone")
        .ok_or_else(|| HookError::MissingField("zone".into()))?
        .as_str()
        .ok_or_else(|| HookError::InvalidField {
            field: "zone".into(),
            expected: "a string",
        })?;
    name.parse::<Tz>()
        .map_err(|_| HookError::msg(format!("unknown timezone `{name}`")))
}
