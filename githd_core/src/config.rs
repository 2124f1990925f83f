use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use camino::{Utf8Path, Utf8PathBuf};
use githd_api::{COMMITS_COUNT_KEY, USE_EXPLORER_KEY, WITH_FOLDER_KEY};
use serde_json::{Map, Value};

use crate::{host::Disposable, Error, Result, ViewPreferences};

type Listener = Rc<dyn Fn()>;
type Listeners = RefCell<Vec<(u64, Listener)>>;

/// Flat key/value settings, optionally backed by a JSON file.
///
/// Keys use the dotted `githd.*` namespace, e.g.
/// `{"githd.explorerView.withFolder": false}`.
pub struct SettingsStore {
    path: Option<Utf8PathBuf>,
    values: RefCell<Map<String, Value>>,
    listeners: Rc<Listeners>,
    next_listener: Cell<u64>,
}

impl SettingsStore {
    /// Store that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_values(Map::new())
    }

    /// In-memory store seeded with `values`.
    #[must_use]
    pub fn with_values(values: Map<String, Value>) -> Self {
        Self {
            path: None,
            values: RefCell::new(values),
            listeners: Rc::default(),
            next_listener: Cell::new(0),
        }
    }

    /// Load settings from `path`. A missing file yields an empty store that
    /// is created on the first update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::Settings`] when it is not a JSON object.
    pub fn load(path: impl Into<Utf8PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = read_settings(&path)?;
        tracing::debug!(%path, keys = values.len(), "loaded settings");
        Ok(Self {
            path: Some(path),
            values: RefCell::new(values),
            listeners: Rc::default(),
            next_listener: Cell::new(0),
        })
    }

    /// `<config dir>/githd/settings.json`, when the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<Utf8PathBuf> {
        let dir = dirs::config_dir()?;
        Utf8PathBuf::from_path_buf(dir.join("githd").join("settings.json")).ok()
    }

    /// Backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Raw value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    /// Current preference snapshot; absent or mistyped keys use defaults.
    #[must_use]
    pub fn preferences(&self) -> ViewPreferences {
        let defaults = ViewPreferences::default();
        let values = self.values.borrow();
        ViewPreferences {
            use_explorer: typed(&values, USE_EXPLORER_KEY, Value::as_bool)
                .unwrap_or(defaults.use_explorer),
            with_folder: typed(&values, WITH_FOLDER_KEY, Value::as_bool)
                .unwrap_or(defaults.with_folder),
            commits_count: typed(&values, COMMITS_COUNT_KEY, |value| {
                value.as_u64().and_then(|count| u32::try_from(count).ok())
            })
            .unwrap_or(defaults.commits_count),
        }
    }

    /// Store `value` under `key`, persist, then notify subscribers.
    ///
    /// Writing the value already stored is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing file cannot be written; the
    /// in-memory value is updated regardless.
    pub fn update(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        {
            let mut values = self.values.borrow_mut();
            if values.get(key) == Some(&value) {
                return Ok(());
            }
            tracing::info!(key, %value, "updating setting");
            values.insert(key.to_owned(), value);
        }
        let persisted = self.persist();
        self.notify();
        persisted
    }

    /// Re-read the backing file and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`SettingsStore::load`]; the previous values are
    /// kept on failure.
    pub fn reload(&self) -> Result<()> {
        if let Some(path) = &self.path {
            let values = read_settings(path)?;
            *self.values.borrow_mut() = values;
        }
        self.notify();
        Ok(())
    }

    /// Call `listener` after every change, until the returned subscription
    /// is disposed.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> SettingsSubscription {
        let id = self.next_listener.get();
        self.next_listener.set(id.wrapping_add(1));
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        SettingsSubscription {
            listeners: Rc::downgrade(&self.listeners),
            id,
        }
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let encoded = serde_json::to_string_pretty(&*self.values.borrow()).map_err(|source| {
            Error::Settings {
                path: path.to_string(),
                source,
            }
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::Io {
                path: parent.to_string(),
                source,
            })?;
        }
        std::fs::write(path, encoded + "\n").map_err(|source| Error::Io {
            path: path.to_string(),
            source,
        })
    }
}

/// Handle to one settings listener; disposing it removes only that listener.
pub struct SettingsSubscription {
    listeners: Weak<Listeners>,
    id: u64,
}

impl Disposable for SettingsSubscription {
    fn dispose(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for SettingsSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsSubscription")
            .field("id", &self.id)
            .finish()
    }
}

fn typed<T>(
    values: &Map<String, Value>,
    key: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = values.get(key)?;
    let converted = convert(value);
    if converted.is_none() {
        tracing::warn!(key, %value, "ignoring setting with unexpected type");
    }
    converted
}

fn read_settings(path: &Utf8Path) -> Result<Map<String, Value>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(Error::Io {
                path: path.to_string(),
                source,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }
    serde_json::from_str(&contents).map_err(|source| Error::Settings {
        path: path.to_string(),
        source,
    })
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.path)
            .field("values", &self.values.borrow())
            .finish_non_exhaustive()
    }
}
