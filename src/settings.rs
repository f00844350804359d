use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence sink for small UI state (lock flags, tuning numbers). Keys are
/// flat dotted strings such as `dev_ui.lock.scene.inspector`.
pub trait SettingsStore {
    fn load_bool(&self, key: &str) -> Option<bool>;
    fn save_bool(&mut self, key: &str, value: bool);
    fn load_number(&self, key: &str) -> Option<f64>;
    fn save_number(&mut self, key: &str, value: f64);
}

/// In-memory store. The default sink, and what tests install.
#[derive(Default)]
pub struct MemorySettings {
    values: Map<String, Value>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn load_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    fn save_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), Value::Bool(value));
    }

    fn load_number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    fn save_number(&mut self, key: &str, value: f64) {
        if let Some(num) = serde_json::Number::from_f64(value) {
            self.values.insert(key.to_string(), Value::Number(num));
        }
    }
}

/// File-backed store persisting a flat JSON object. Reads happen once at
/// open; every save rewrites the file. Failures are logged and the in-memory
/// state stays authoritative for the session.
pub struct JsonSettings {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonSettings {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Value>(&contents) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    eprintln!(
                        "[dev_ui] Settings file {} is not a JSON object; starting empty.",
                        path.display()
                    );
                    Map::new()
                }
                Err(err) => {
                    eprintln!(
                        "[dev_ui] Failed to parse settings {}: {err}. Starting empty.",
                        path.display()
                    );
                    Map::new()
                }
            },
            // Missing file is the normal first-run case.
            Err(_) => Map::new(),
        };
        Self { path, values }
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&Value::Object(self.values.clone()))?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing settings file {}", self.path.display()))?;
        Ok(())
    }

    fn flush_logged(&self) {
        if let Err(err) = self.flush() {
            eprintln!("[dev_ui] Failed to persist settings: {err:#}");
        }
    }
}

impl SettingsStore for JsonSettings {
    fn load_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    fn save_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), Value::Bool(value));
        self.flush_logged();
    }

    fn load_number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    fn save_number(&mut self, key: &str, value: f64) {
        if let Some(num) = serde_json::Number::from_f64(value) {
            self.values.insert(key.to_string(), Value::Number(num));
        }
        self.flush_logged();
    }
}

thread_local! {
    static STORE: RefCell<Box<dyn SettingsStore>> = RefCell::new(Box::new(MemorySettings::new()));
}

pub fn install_store(store: Box<dyn SettingsStore>) {
    STORE.with(|s| *s.borrow_mut() = store);
}

pub fn load_bool(key: &str) -> Option<bool> {
    STORE.with(|s| s.borrow().load_bool(key))
}

pub fn save_bool(key: &str, value: bool) {
    STORE.with(|s| s.borrow_mut().save_bool(key, value));
}

pub fn load_number(key: &str) -> Option<f64> {
    STORE.with(|s| s.borrow().load_number(key))
}

pub fn save_number(key: &str, value: f64) {
    STORE.with(|s| s.borrow_mut().save_number(key, value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemorySettings::new();
        assert_eq!(store.load_bool("a"), None);
        store.save_bool("a", true);
        store.save_number("b", 2.5);
        assert_eq!(store.load_bool("a"), Some(true));
        assert_eq!(store.load_number("b"), Some(2.5));
        // Wrong-typed reads miss instead of coercing.
        assert_eq!(store.load_bool("b"), None);
    }
}
