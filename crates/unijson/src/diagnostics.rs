//! Non-fatal diagnostics emitted when a strategy fails and the chain falls
//! through to the next one.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// The strategy whose failure is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    RegisteredEncoder,
    EncodeHook,
    FieldDump,
    RegisteredDecoder,
    DecodeHook,
    KeywordConstruction,
    FieldReplacement,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::RegisteredEncoder => "registered encoder",
            Strategy::EncodeHook => "encode hook",
            Strategy::FieldDump => "field dump",
            Strategy::RegisteredDecoder => "registered decoder",
            Strategy::DecodeHook => "decode hook",
            Strategy::KeywordConstruction => "keyword construction",
            Strategy::FieldReplacement => "field replacement",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub strategy: Strategy,
    pub type_name: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} used for type `{}` failed: {}. Trying something else.",
            self.strategy, self.type_name, self.message
        )
    }
}

/// Receives diagnostics from the encoder and decoder.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at `WARN` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            strategy = diagnostic.strategy.as_str(),
            type_name = %diagnostic.type_name,
            "{}",
            diagnostic
        );
    }
}

/// Drops every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// Keeps diagnostics in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// Drain the collected diagnostics.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock())
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagnostic {
        Diagnostic {
            strategy: Strategy::RegisteredEncoder,
            type_name: "app::Point".into(),
            message: "boom".into(),
        }
    }

    #[test]
    fn display_reads_like_a_warning() {
        assert_eq!(
            sample().to_string(),
            "registered encoder used for type `app::Point` failed: boom. Trying something else."
        );
    }

    #[test]
    fn memory_sink_shares_buffer_between_clones() {
        let sink = MemorySink::new();
        let other = sink.clone();
        other.report(sample());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.entries()[0].strategy, Strategy::RegisteredEncoder);
        assert_eq!(sink.take().len(), 1);
        assert!(other.is_empty());
    }

    #[test]
    fn null_and_tracing_sinks_accept_reports() {
        NullSink.report(sample());
        TracingSink.report(sample());
    }
}
