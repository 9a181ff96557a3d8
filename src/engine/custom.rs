//! Custom elements - behaviors attached to element nodes.
//!
//! A definition maps a name to a factory producing one behavior instance per
//! created element. Elements pick their definition up at creation time, by
//! tag name or by the `is` specifier of a customized built-in.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{DomError, Result};
use crate::types::NodeId;

/// Lifecycle hooks of a custom element.
///
/// Errors returned from a hook are reported and do not abort the DOM
/// mutation that triggered it.
pub trait CustomElement {
    /// The element became connected to the document.
    fn connected(&self, _host: NodeId) -> Result<()> {
        Ok(())
    }

    /// The element left the document.
    fn disconnected(&self, _host: NodeId) -> Result<()> {
        Ok(())
    }
}

/// Produces a fresh behavior for each element created under a definition.
pub type ElementFactory = Rc<dyn Fn() -> Rc<dyn CustomElement>>;

thread_local! {
    static DEFINITIONS: RefCell<HashMap<String, ElementFactory>> = RefCell::new(HashMap::new());
}

/// Register a custom element definition.
pub fn define<F>(name: &str, factory: F) -> Result<()>
where
    F: Fn() -> Rc<dyn CustomElement> + 'static,
{
    let name = name.to_ascii_lowercase();
    DEFINITIONS.with(|defs| {
        let mut defs = defs.borrow_mut();
        if defs.contains_key(&name) {
            return Err(DomError::AlreadyDefined { name });
        }
        tracing::debug!(%name, "custom element defined");
        defs.insert(name, Rc::new(factory));
        Ok(())
    })
}

pub fn is_defined(name: &str) -> bool {
    DEFINITIONS.with(|defs| defs.borrow().contains_key(&name.to_ascii_lowercase()))
}

pub(crate) fn lookup(name: &str) -> Option<ElementFactory> {
    DEFINITIONS.with(|defs| defs.borrow().get(name).cloned())
}

/// Forget every definition (for testing).
pub fn reset_definitions() {
    DEFINITIONS.with(|defs| defs.borrow_mut().clear());
}
