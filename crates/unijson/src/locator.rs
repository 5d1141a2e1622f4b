//! Type locators: the `(module, class)` pair stamped into encoded composites.

use std::fmt;
use std::sync::OnceLock;

use crate::error::{RegistryError, ResolveError};
use crate::value::{JsonMap, Map, Value};

/// Reserved key holding the simple type name.
pub const CLASS_KEY: &str = "__class__";

/// Reserved key holding the defining namespace.
pub const MODULE_KEY: &str = "__module__";

/// Identifies a type on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    module: String,
    class: String,
}

impl Locator {
    /// Build a locator from caller-supplied names.
    ///
    /// Both names must be non-empty and free of whitespace and control
    /// characters; the module must not start or end with a path separator.
    pub fn new(module: impl Into<String>, class: impl Into<String>) -> Result<Self, RegistryError> {
        let module = module.into();
        let class = class.into();
        validate_name("module", &module)?;
        validate_name("class", &class)?;
        if module.starts_with([':', '.']) || module.ends_with([':', '.']) {
            return Err(RegistryError::InvalidArgument(format!(
                "module `{module}` has a dangling path separator"
            )));
        }
        Ok(Self { module, class })
    }

    /// Locator for names already known to be well formed.
    pub(crate) fn trusted(module: &str, class: &str) -> Self {
        Self {
            module: module.to_string(),
            class: class.to_string(),
        }
    }

    /// Locator derived from the Rust type path of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from_type_name(std::any::type_name::<T>())
    }

    /// Split a full type path into module and class.
    ///
    /// Types without an enclosing module are attributed to the running
    /// entry binary (see [`entry_module`]).
    pub fn from_type_name(type_name: &str) -> Self {
        let (module, class) = split_type_name(type_name);
        let module = if module.is_empty() {
            entry_module().to_string()
        } else {
            module.to_string()
        };
        Self {
            module,
            class: class.to_string(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Insert the locator keys into an encoded mapping, keeping any that a
    /// strategy already set.
    pub fn stamp(&self, map: &mut JsonMap) {
        if !map.contains_key(CLASS_KEY) {
            map.insert(CLASS_KEY.to_string(), self.class.clone().into());
        }
        if !map.contains_key(MODULE_KEY) {
            map.insert(MODULE_KEY.to_string(), self.module.clone().into());
        }
    }

    /// Remove the locator keys from a decoded mapping.
    ///
    /// Returns `Ok(None)` when the mapping carries no `__class__` and is left
    /// untouched. A class without a module, or non-string tags, is malformed.
    pub fn take(map: &mut Map) -> Result<Option<Self>, ResolveError> {
        let Some(class) = map.shift_remove(CLASS_KEY) else {
            return Ok(None);
        };
        let module = map
            .shift_remove(MODULE_KEY)
            .ok_or_else(|| ResolveError::Malformed(format!("`{CLASS_KEY}` without `{MODULE_KEY}`")))?;
        match (module, class) {
            (Value::String(module), Value::String(class)) => Ok(Some(Self { module, class })),
            (module, class) => Err(ResolveError::Malformed(format!(
                "locator tags must be strings, got {} and {}",
                module.kind(),
                class.kind()
            ))),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.class)
    }
}

fn validate_name(what: &str, name: &str) -> Result<(), RegistryError> {
    if name.is_empty() {
        return Err(RegistryError::InvalidArgument(format!("{what} name is empty")));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RegistryError::InvalidArgument(format!(
            "{what} name `{}` contains whitespace or control characters",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// Split `a::b::Name<c::D>` into `("a::b", "Name<c::D>")`.
///
/// Only separators outside generic brackets count.
fn split_type_name(type_name: &str) -> (&str, &str) {
    let bytes = type_name.as_bytes();
    let mut depth = 0usize;
    let mut split = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' | b')' | b']' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    match split {
        Some(at) => (&type_name[..at], &type_name[at + 2..]),
        None => ("", type_name),
    }
}

/// Module name of the running entry binary.
///
/// Taken from the executable's file stem, with cargo's `-<hash>` suffix
/// removed and `-` mapped to `_`, so that it matches the crate name.
pub fn entry_module() -> &'static str {
    static ENTRY: OnceLock<String> = OnceLock::new();
    ENTRY.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .map(|stem| normalize_entry_name(&stem))
            .unwrap_or_else(|| "main".to_string())
    })
}

fn normalize_entry_name(stem: &str) -> String {
    let base = match stem.rsplit_once('-') {
        Some((head, hash))
            if !head.is_empty()
                && hash.len() == 16
                && hash.bytes().all(|b| b.is_ascii_hexdigit()) =>
        {
            head
        }
        _ => stem,
    };
    base.replace('-', "_")
}
