//! Universal JSON: encode arbitrary typed object graphs to JSON and back.
//!
//! Plain JSON values go through `serde_json` untouched. Values of registered
//! Rust types ([`Composite`]s) are encoded to JSON objects stamped with a
//! `__class__`/`__module__` locator, which the decoder resolves through the
//! [`Registry`] to rebuild a value of the same type.
//!
//! ```ignore
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Point { x: i64, y: i64 }
//! impl unijson::Composite for Point {}
//!
//! unijson::submit!(|registry| {
//!     registry.register_type::<Point>().with_serde();
//! });
//!
//! let text = unijson::dumps(&Value::composite(Point { x: 1, y: 2 }), &DumpOptions::new())?;
//! let back = unijson::loads(&text, &LoadOptions::new())?;
//! ```

mod diagnostics;
mod error;
mod scope;
mod value;

pub mod builtins;
pub mod decoder;
pub mod encoder;
pub mod format;
pub mod locator;
pub mod registry;

use std::io;

pub use decoder::Decoder;
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, NullSink, Strategy, TracingSink};
pub use encoder::Encoder;
pub use error::{
    DecodeError, DecodeResult, EncodeError, EncodeResult, HookError, HookResult, RegistryError,
    ResolveError,
};
pub use format::{DumpOptions, LoadOptions};
pub use locator::{Locator, CLASS_KEY, MODULE_KEY};
pub use registry::{Registration, Registry, TypeEntry, TypeRegistration};
pub use value::{field, str_field, Composite, DynComposite, JsonMap, Map, Value};

/// Serialize `value` to a JSON string with the process-wide registry.
pub fn dumps(value: &Value, options: &DumpOptions) -> EncodeResult<String> {
    Encoder::default().dumps(value, options)
}

/// Serialize `value` as JSON into `writer` with the process-wide registry.
pub fn dump<W: io::Write>(value: &Value, writer: W, options: &DumpOptions) -> EncodeResult<()> {
    Encoder::default().dump(value, writer, options)
}

/// Deserialize a JSON string with the process-wide registry.
pub fn loads(text: &str, options: &LoadOptions) -> DecodeResult<Value> {
    Decoder::default().loads(text, options)
}

/// Deserialize JSON from `reader` with the process-wide registry.
pub fn load<R: io::Read>(reader: R, options: &LoadOptions) -> DecodeResult<Value> {
    Decoder::default().load(reader, options)
}

#[doc(hidden)]
#[cfg(feature = "auto_register")]
pub mod __private {
    pub use inventory;
}

/// Submit a registration function, applied to [`Registry::global`] on first
/// use.
///
/// The argument must coerce to `fn(&Registry)`: a function path or a
/// non-capturing closure.
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! submit {
    ($register:expr) => {
        $crate::__private::inventory::submit! {
            $crate::registry::Registration::new($register)
        }
    };
}
