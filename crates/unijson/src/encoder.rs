//! The encoding strategy chain.
//!
//! Plain values pass through untouched. A composite goes through, in order:
//!
//! 1. the encoder registered for its exact type;
//! 2. its own [`Composite::json_encode`](crate::Composite::json_encode) hook;
//! 3. the field dump captured at registration (serde `Serialize`). Fields
//!    holding composites are encoded by this same encoder.
//!
//! The first strategy that succeeds wins. Failures of a strategy are reported
//! to the [`DiagnosticSink`] and the chain moves on. The produced mapping is
//! then stamped with the type locator, keeping any tag the strategy set itself.

use std::io;
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticSink, Strategy, TracingSink};
use crate::error::{EncodeError, EncodeResult, HookError, HookResult};
use crate::format::{self, DumpOptions};
use crate::registry::Registry;
use crate::scope;
use crate::value::{Composite, DynComposite, JsonMap, Map, Value};

/// Turns [`Value`] trees into plain JSON.
#[derive(Clone)]
pub struct Encoder {
    registry: Registry,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(Registry::global().clone())
    }
}

impl Encoder {
    pub fn new(registry: Registry) -> Self {
        Self::from_parts(registry, Arc::new(TracingSink))
    }

    pub(crate) fn from_parts(registry: Registry, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { registry, sink }
    }

    /// Send strategy diagnostics to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register `encode` for values of exactly type `T`. Last write wins.
    pub fn register<T, F>(&self, encode: F)
    where
        T: Composite,
        F: Fn(&T) -> HookResult<Map> + Send + Sync + 'static,
    {
        self.registry.register_encoder::<T, F>(encode);
    }

    /// Encode a value tree, tagging every composite with its locator.
    pub fn encode(&self, value: &Value) -> EncodeResult<serde_json::Value> {
        self.encode_value(value)
    }

    /// Encode a single composite into its tagged mapping.
    pub fn encode_composite(&self, value: &dyn DynComposite) -> EncodeResult<JsonMap> {
        self.encode_dyn(value)
    }

    /// Encode every entry of a mapping.
    pub fn encode_map(&self, map: &Map) -> EncodeResult<JsonMap> {
        let mut out = JsonMap::new();
        for (key, value) in map {
            out.insert(key.clone(), self.encode_value(value)?);
        }
        Ok(out)
    }

    pub fn dumps(&self, value: &Value, options: &DumpOptions) -> EncodeResult<String> {
        let json = self.encode(value)?;
        Ok(format::to_string(&json, options)?)
    }

    pub fn dump<W: io::Write>(&self, value: &Value, writer: W, options: &DumpOptions) -> EncodeResult<()> {
        let json = self.encode(value)?;
        format::to_writer(writer, &json, options).map_err(|err| {
            if err.is_io() {
                EncodeError::Io(err.into())
            } else {
                EncodeError::Json(err)
            }
        })
    }

    fn encode_value(&self, value: &Value) -> EncodeResult<serde_json::Value> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| self.encode_value(item))
                    .collect::<EncodeResult<_>>()?,
            ),
            Value::Object(map) => serde_json::Value::Object(self.encode_map(map)?),
            Value::Composite(c) => serde_json::Value::Object(self.encode_dyn(&**c)?),
        })
    }

    fn encode_dyn(&self, value: &dyn DynComposite) -> EncodeResult<JsonMap> {
        let type_id = value.composite_type_id();

        let mut encoded = None;
        if let Some(encode) = self.registry.encoder(type_id) {
            encoded = self.attempt(Strategy::RegisteredEncoder, value, encode(value));
        }
        if encoded.is_none() {
            if let Some(result) = value.encode_hook() {
                encoded = self.attempt(Strategy::EncodeHook, value, result);
            }
        }

        let mut out = match encoded {
            Some(fields) => self.encode_map(&fields)?,
            None => self
                .dump_fields(value)?
                .ok_or_else(|| EncodeError::UnsupportedType(value.type_name().to_string()))?,
        };

        self.registry
            .locator_for(type_id, value.type_name())
            .stamp(&mut out);
        Ok(out)
    }

    /// Field dump strategy. A composite nested in the fields that cannot be
    /// encoded fails the whole encoding with its own error.
    fn dump_fields(&self, value: &dyn DynComposite) -> EncodeResult<Option<JsonMap>> {
        let Some(entry) = self.registry.entry(value.composite_type_id()) else {
            return Ok(None);
        };
        let (dumped, nested) = scope::encoding(self, || entry.dump_fields(value));
        if let Some(err) = nested {
            return Err(err);
        }
        Ok(dumped.and_then(|result| self.attempt(Strategy::FieldDump, value, result)))
    }

    fn attempt<T>(&self, strategy: Strategy, value: &dyn DynComposite, result: HookResult<T>) -> Option<T> {
        match result {
            Ok(out) => Some(out),
            Err(err) => {
                self.report(strategy, value, &err);
                None
            }
        }
    }

    fn report(&self, strategy: Strategy, value: &dyn DynComposite, err: &HookError) {
        self.sink.report(Diagnostic {
            strategy,
            type_name: value.type_name().to_string(),
            message: err.to_string(),
        });
    }
}
