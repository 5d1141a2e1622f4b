//! Text layout options passed through to `serde_json`.
//!
//! The defaults follow the conventional JSON library layout: `", "` between
//! items, `": "` between keys and values, no indentation, no key sorting and
//! non-ASCII characters escaped as `\uXXXX`.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

/// Options for `dumps`/`dump`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
    /// Pretty-print with this many spaces per level. `Some(0)` still inserts
    /// newlines.
    pub indent: Option<usize>,
    /// `(item, key)` separators. Defaults to `(", ", ": ")` without indent
    /// and `(",", ": ")` with indent.
    pub separators: Option<(String, String)>,
    /// Emit object keys in sorted order.
    pub sort_keys: bool,
    /// Escape every non-ASCII character as `\uXXXX`.
    pub ensure_ascii: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            indent: None,
            separators: None,
            sort_keys: false,
            ensure_ascii: true,
        }
    }
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same bytes as `serde_json::to_string`.
    pub fn compact() -> Self {
        Self::default()
            .with_separators(",", ":")
            .with_ensure_ascii(false)
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn with_separators(mut self, item: &str, key: &str) -> Self {
        self.separators = Some((item.to_string(), key.to_string()));
        self
    }

    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    pub fn with_ensure_ascii(mut self, ensure_ascii: bool) -> Self {
        self.ensure_ascii = ensure_ascii;
        self
    }

    fn separators(&self) -> (&str, &str) {
        match (&self.separators, self.indent) {
            (Some((item, key)), _) => (item, key),
            (None, Some(_)) => (",", ": "),
            (None, None) => (", ", ": "),
        }
    }
}

/// Options for `loads`/`load`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOptions {
    /// Read integer literals as floats.
    pub int_as_float: bool,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_int_as_float(mut self, int_as_float: bool) -> Self {
        self.int_as_float = int_as_float;
        self
    }
}

/// Write plain JSON with the given options.
pub fn to_writer<W: io::Write>(
    writer: W,
    value: &serde_json::Value,
    options: &DumpOptions,
) -> serde_json::Result<()> {
    let mut serializer = serde_json::Serializer::with_formatter(writer, OptionsFormatter::new(options));
    if options.sort_keys {
        sorted(value).serialize(&mut serializer)
    } else {
        value.serialize(&mut serializer)
    }
}

/// Render plain JSON with the given options.
pub fn to_string(value: &serde_json::Value, options: &DumpOptions) -> serde_json::Result<String> {
    let mut out = Vec::with_capacity(128);
    to_writer(&mut out, value, options)?;
    // The serializer only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn sorted(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => serde_json::Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

struct OptionsFormatter<'a> {
    indent: Option<usize>,
    item_separator: &'a str,
    key_separator: &'a str,
    ensure_ascii: bool,
    depth: usize,
    has_value: bool,
}

impl<'a> OptionsFormatter<'a> {
    fn new(options: &'a DumpOptions) -> Self {
        let (item_separator, key_separator) = options.separators();
        Self {
            indent: options.indent,
            item_separator,
            key_separator,
            ensure_ascii: options.ensure_ascii,
            depth: 0,
            has_value: false,
        }
    }

    fn newline<W: ?Sized + io::Write>(&self, writer: &mut W) -> io::Result<()> {
        if let Some(width) = self.indent {
            writer.write_all(b"\n")?;
            for _ in 0..self.depth * width {
                writer.write_all(b" ")?;
            }
        }
        Ok(())
    }

    fn begin_item<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if !first {
            writer.write_all(self.item_separator.as_bytes())?;
        }
        self.newline(writer)
    }

    fn end_nested<W: ?Sized + io::Write>(&mut self, writer: &mut W, close: &[u8]) -> io::Result<()> {
        self.depth -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(close)
    }
}

impl Formatter for OptionsFormatter<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.end_nested(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.begin_item(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.end_nested(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.begin_item(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.key_separator.as_bytes())
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        if !self.ensure_ascii || fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
