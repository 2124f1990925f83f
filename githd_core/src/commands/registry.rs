use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::{
    host::{CommandArg, Disposable},
    Error, Result,
};

/// Callback stored for a command identifier.
pub type CommandCallback = Rc<dyn Fn(Vec<CommandArg>)>;

/// The host's table of invokable commands.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RefCell<BTreeMap<String, CommandCallback>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Bind `callback` to `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandAlreadyRegistered`] when `id` is taken.
    pub fn register(self: &Rc<Self>, id: &str, callback: CommandCallback) -> Result<Registration> {
        let mut commands = self.commands.borrow_mut();
        if commands.contains_key(id) {
            return Err(Error::CommandAlreadyRegistered { id: id.to_owned() });
        }
        commands.insert(id.to_owned(), callback);
        Ok(Registration {
            registry: Rc::downgrade(self),
            id: id.to_owned(),
            active: Cell::new(true),
        })
    }

    /// Invoke the callback bound to `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCommand`] when nothing is bound to `id`.
    pub fn execute(&self, id: &str, args: Vec<CommandArg>) -> Result<()> {
        let callback = self
            .commands
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownCommand { id: id.to_owned() })?;
        tracing::debug!(command = id, args = args.len(), "executing command");
        callback(args);
        Ok(())
    }

    /// Whether `id` is bound.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.commands.borrow().contains_key(id)
    }

    /// Bound identifiers in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.commands.borrow().keys().cloned().collect()
    }

    /// Number of bound identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    /// Whether no identifier is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.ids())
            .finish()
    }
}

/// Handle to one binding; disposing it unbinds the identifier.
pub struct Registration {
    registry: Weak<CommandRegistry>,
    id: String,
    active: Cell<bool>,
}

impl Registration {
    /// The bound identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Disposable for Registration {
    fn dispose(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.commands.borrow_mut().remove(&self.id);
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("active", &self.active.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CommandCallback {
        Rc::new(|_| {})
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let registry = CommandRegistry::new();
        let _first = registry.register("githd.clear", noop()).expect("register");

        let err = registry.register("githd.clear", noop()).expect_err("duplicate");
        assert!(matches!(err, Error::CommandAlreadyRegistered { id } if id == "githd.clear"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dispose_unbinds_once() {
        let registry = CommandRegistry::new();
        let registration = registry.register("githd.clear", noop()).expect("register");
        registration.dispose();
        assert!(!registry.contains("githd.clear"));

        let again = registry.register("githd.clear", noop()).expect("re-register");
        registration.dispose();
        assert!(registry.contains(again.id()));
    }

    #[test]
    fn execute_passes_arguments() {
        let registry = CommandRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _registration = registry
            .register(
                "githd.echo",
                Rc::new(move |args| sink.borrow_mut().extend(args)),
            )
            .expect("register");

        registry
            .execute("githd.echo", vec![CommandArg::Text("hi".into())])
            .expect("execute");
        assert_eq!(*seen.borrow(), [CommandArg::Text("hi".into())]);

        assert!(matches!(
            registry.execute("githd.missing", Vec::new()),
            Err(Error::UnknownCommand { .. })
        ));
    }
}
