//! Registrations for the date/time family, seeded into every
//! [`Registry::new`](crate::Registry::new).
//!
//! The wire layout and the locators match the Python `datetime` and `pytz`
//! classes so documents stay interchangeable with other unijson writers:
//!
//! | Rust type                      | locator              | fields                      |
//! |--------------------------------|----------------------|-----------------------------|
//! | `NaiveDate`                    | `datetime.date`      | `date`                      |
//! | `NaiveDateTime`, `DateTime<Tz>`| `datetime.datetime`  | `datetime`, `tzinfo`        |
//! | `NaiveTime`                    | `datetime.time`      | `time`, `tzinfo`            |
//! | `TimeDelta`                    | `datetime.timedelta` | `seconds`                   |
//! | `chrono_tz::Tz`, `Utc`         | `pytz.timezone`      | `zone`                      |
//!
//! Limits of the layout:
//!
//! - Clock times, timestamps and durations keep microseconds. Finer parts
//!   of a chrono value are truncated (times, timestamps) or rounded half to
//!   even (durations) on the way back.
//! - An aware timestamp is written as local wall time plus zone, without an
//!   offset. In a fold, where a wall time occurs twice, it decodes to the
//!   earlier instant.

mod date;
mod datetime;
mod duration;
mod time;
mod timezone;

use crate::registry::Registry;
use crate::value::{Map, Value};

/// Module of the calendar and clock types.
pub const DATETIME_MODULE: &str = "datetime";

/// Module of the named timezone alias.
pub const TIMEZONE_MODULE: &str = "pytz";

/// Class every named timezone is tagged with.
pub const TIMEZONE_CLASS: &str = "timezone";

pub(crate) fn register(registry: &Registry) {
    timezone::register(registry);
    date::register(registry);
    datetime::register(registry);
    time::register(registry);
    duration::register(registry);
}

fn fields<const N: usize>(entries: [(&str, Value); N]) -> Map {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
