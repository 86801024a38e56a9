//! Typed option registry consumed exactly once at environment setup.
//!
//! Games and the episode lifecycle register their options with default
//! values, caller overrides are applied in one fail-fast pass, and the
//! resulting registry is read-only for the lifetime of the environment.
//! Unrecognized names and kind mismatches surface as [`SetupError`] values
//! instead of being silently ignored.

use serde::{Deserialize, Serialize};

use crate::SetupError;

/// A single typed option value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    /// Boolean mode switch.
    Flag(bool),
    /// 32-bit signed integer quantity.
    Int(i32),
    /// 32-bit floating point quantity.
    Float(f32),
}

impl OptionValue {
    /// Human-readable name of the value's kind, used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Flag(_) => "flag",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
        }
    }
}

#[derive(Clone, Debug)]
struct OptionEntry {
    name: String,
    value: OptionValue,
}

/// Registry of named typed options with registered defaults.
///
/// Entries are stored in registration order so diagnostics and debug dumps
/// are deterministic.
#[derive(Clone, Debug, Default)]
pub struct Options {
    entries: Vec<OptionEntry>,
}

impl Options {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a boolean option with its default value.
    ///
    /// # Panics
    ///
    /// Panics if the name is already registered; option tables are fixed at
    /// compile time, so a collision is a programming error.
    pub fn register_flag(&mut self, name: &str, default: bool) {
        self.register(name, OptionValue::Flag(default));
    }

    /// Registers an integer option with its default value.
    ///
    /// # Panics
    ///
    /// Panics if the name is already registered.
    pub fn register_int(&mut self, name: &str, default: i32) {
        self.register(name, OptionValue::Int(default));
    }

    /// Registers a float option with its default value.
    ///
    /// # Panics
    ///
    /// Panics if the name is already registered.
    pub fn register_float(&mut self, name: &str, default: f32) {
        self.register(name, OptionValue::Float(default));
    }

    fn register(&mut self, name: &str, value: OptionValue) {
        if self.position(name).is_some() {
            panic!("option `{name}` registered twice");
        }
        self.entries.push(OptionEntry {
            name: name.to_owned(),
            value,
        });
    }

    /// Applies caller-provided overrides to the registered defaults.
    ///
    /// Every override must name a registered option of a compatible kind.
    /// Integer values are accepted for float options, and `0`/`1` integers
    /// for flags; any other mismatch, or an unrecognized name, fails the
    /// whole application so configuration typos never pass silently.
    pub fn apply(&mut self, overrides: &[(String, OptionValue)]) -> Result<(), SetupError> {
        for (name, value) in overrides {
            let index = self
                .position(name)
                .ok_or_else(|| SetupError::UnknownOption { name: name.clone() })?;
            let current = self.entries[index].value;
            let merged = match (current, *value) {
                (OptionValue::Flag(_), OptionValue::Flag(flag)) => OptionValue::Flag(flag),
                (OptionValue::Flag(_), OptionValue::Int(0)) => OptionValue::Flag(false),
                (OptionValue::Flag(_), OptionValue::Int(1)) => OptionValue::Flag(true),
                (OptionValue::Int(_), OptionValue::Int(int)) => OptionValue::Int(int),
                (OptionValue::Float(_), OptionValue::Float(float)) => OptionValue::Float(float),
                (OptionValue::Float(_), OptionValue::Int(int)) => OptionValue::Float(int as f32),
                (expected, found) => {
                    return Err(SetupError::OptionKindMismatch {
                        name: name.clone(),
                        expected: expected.kind_name(),
                        found: found.kind_name(),
                    })
                }
            };
            self.entries[index].value = merged;
        }
        Ok(())
    }

    /// Reads a boolean option.
    ///
    /// # Panics
    ///
    /// Panics if the name was never registered or holds a different kind;
    /// reads happen after validation, so either is a programming error.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        match self.value(name) {
            OptionValue::Flag(flag) => flag,
            other => panic!("option `{name}` is a {}, not a flag", other.kind_name()),
        }
    }

    /// Reads an integer option.
    ///
    /// # Panics
    ///
    /// Panics if the name was never registered or holds a different kind.
    #[must_use]
    pub fn int(&self, name: &str) -> i32 {
        match self.value(name) {
            OptionValue::Int(int) => int,
            other => panic!("option `{name}` is a {}, not an int", other.kind_name()),
        }
    }

    /// Reads a float option.
    ///
    /// # Panics
    ///
    /// Panics if the name was never registered or holds a different kind.
    #[must_use]
    pub fn float(&self, name: &str) -> f32 {
        match self.value(name) {
            OptionValue::Float(float) => float,
            other => panic!("option `{name}` is a {}, not a float", other.kind_name()),
        }
    }

    /// Iterates over all entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.value))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    fn value(&self, name: &str) -> OptionValue {
        match self.position(name) {
            Some(index) => self.entries[index].value,
            None => panic!("option `{name}` was never registered"),
        }
    }
}
