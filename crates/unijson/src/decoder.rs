//! The decoding strategy chain.
//!
//! Every JSON object is decoded bottom-up: its children first, then the
//! object itself through [`Decoder::decode_node`]. A node without `__class__`
//! stays a plain mapping. Otherwise the locator is stripped and resolved, and
//! the node goes through, in order:
//!
//! 1. the decoder registered for the resolved type;
//! 2. the type's [`Composite::json_decode`](crate::Composite::json_decode) hook;
//! 3. keyword construction from the remaining fields;
//! 4. field replacement on a default instance.
//!
//! Both construction strategies see already decoded composites among the
//! fields: they are handed over as tagged mappings and rebuilt by this
//! decoder when the type deserializes a [`Value`].
//!
//! If nothing succeeds the remaining fields are returned as a mapping.

use std::io;
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticSink, NullSink, Strategy, TracingSink};
use crate::encoder::Encoder;
use crate::error::{DecodeError, DecodeResult, HookError, HookResult};
use crate::format::LoadOptions;
use crate::locator::Locator;
use crate::registry::{Registry, TypeEntry};
use crate::scope;
use crate::value::{Composite, Map, Value};

/// Turns plain JSON back into [`Value`] trees.
#[derive(Clone)]
pub struct Decoder {
    registry: Registry,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(Registry::global().clone())
    }
}

impl Decoder {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            sink: Arc::new(TracingSink),
        }
    }

    /// Send strategy diagnostics to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register `decode` for mappings tagged with `T`'s locator. Last write
    /// wins.
    pub fn register<T, F>(&self, decode: F)
    where
        T: Composite,
        F: Fn(&Map) -> HookResult<Value> + Send + Sync + 'static,
    {
        self.registry.register_decoder::<T, F>(decode);
    }

    pub fn loads(&self, text: &str, options: &LoadOptions) -> DecodeResult<Value> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        self.decode(json, options)
    }

    pub fn load<R: io::Read>(&self, reader: R, options: &LoadOptions) -> DecodeResult<Value> {
        let json: serde_json::Value = serde_json::from_reader(reader).map_err(|err| {
            if err.is_io() {
                DecodeError::Io(err.into())
            } else {
                DecodeError::Json(err)
            }
        })?;
        self.decode(json, options)
    }

    /// Decode an already parsed JSON tree, children before parents.
    pub fn decode(&self, json: serde_json::Value, options: &LoadOptions) -> DecodeResult<Value> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) if options.int_as_float && !n.is_f64() => {
                n.as_f64().map_or(Value::Null, Value::float)
            }
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.decode(item, options))
                    .collect::<DecodeResult<_>>()?,
            ),
            serde_json::Value::Object(object) => {
                let mut map = Map::with_capacity(object.len());
                for (key, value) in object {
                    map.insert(key, self.decode(value, options)?);
                }
                self.decode_node(map)?
            }
        })
    }

    /// Decode one mapping whose children are already decoded.
    pub fn decode_node(&self, mut map: Map) -> DecodeResult<Value> {
        let Some(locator) = Locator::take(&mut map)? else {
            return Ok(Value::Object(map));
        };
        let entry = self.registry.resolve(&locator)?;

        if let Some(decode) = self.registry.decoder(entry.type_id()) {
            match decode(&map) {
                Ok(value) => return Ok(value),
                Err(err) => self.report(Strategy::RegisteredDecoder, &entry, &err),
            }
        }

        match entry.decode_hook(&map) {
            Some(Ok(value)) => return Ok(value),
            Some(Err(err)) => self.report(Strategy::DecodeHook, &entry, &err),
            None => {}
        }

        if let Some(value) = self.construct(&entry, &map) {
            return Ok(value);
        }

        tracing::debug!(
            locator = %locator,
            type_name = entry.type_name(),
            "no strategy rebuilt the value, keeping the raw mapping"
        );
        Ok(Value::Object(map))
    }

    /// Keyword construction, then field replacement. Failures here are
    /// expected for most types and only logged at debug level.
    ///
    /// Nested composites were decoded and reported once already, so the
    /// round trip through their tagged form runs without a sink.
    fn construct(&self, entry: &TypeEntry, map: &Map) -> Option<Value> {
        let constructors = [
            (Strategy::KeywordConstruction, entry.keyword_constructor()),
            (Strategy::FieldReplacement, entry.field_replacer()),
        ];
        if constructors.iter().all(|(_, construct)| construct.is_none()) {
            return None;
        }

        let quiet: Arc<dyn DiagnosticSink> = Arc::new(NullSink);
        let encoder = Encoder::from_parts(self.registry.clone(), quiet.clone());
        let kwargs = match encoder.encode_map(map) {
            Ok(kwargs) => kwargs,
            Err(err) => {
                tracing::debug!(type_name = entry.type_name(), error = %err, "fields have no JSON form");
                return None;
            }
        };
        let rebuild = Decoder {
            registry: self.registry.clone(),
            sink: quiet,
        };

        for (strategy, construct) in constructors {
            let Some(construct) = construct else { continue };
            let (result, _) = scope::encoding(&encoder, || scope::decoding(&rebuild, || construct(&kwargs)));
            match result {
                Ok(value) => return Some(value),
                Err(err) => tracing::debug!(
                    strategy = strategy.as_str(),
                    type_name = entry.type_name(),
                    error = %err,
                    "construction failed"
                ),
            }
        }
        None
    }

    fn report(&self, strategy: Strategy, entry: &TypeEntry, err: &HookError) {
        self.sink.report(Diagnostic {
            strategy,
            type_name: entry.type_name().to_string(),
            message: err.to_string(),
        });
    }
}
