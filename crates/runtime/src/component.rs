//! Component trait and code catalog.

use crate::{Env, Result};
use std::collections::HashMap;
use std::rc::Rc;

/// Executable code that can be deployed at an address.
///
/// Components hold no state of their own. Everything they remember goes
/// through [`Env`] into the storage of the address the current frame executes
/// for, which is not necessarily the address the code was deployed at: a proxy
/// runs its implementation's code against the proxy's own storage.
pub trait Component {
    /// Run once when the component is deployed.
    fn construct(&self, env: &mut Env<'_>, args: &[u8]) -> Result<()> {
        let _ = (env, args);
        Ok(())
    }

    /// Handle a call. Returning an error aborts the frame.
    fn invoke(&self, env: &mut Env<'_>, data: &[u8]) -> Result<Vec<u8>>;
}

/// Named code available for deployment.
///
/// The state store only records the name of the code at each address, so a
/// catalog with the same names must be installed whenever a store is reopened.
#[derive(Clone, Default)]
pub struct Catalog {
    codes: HashMap<String, Rc<dyn Component>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `component` deployable under `name`, replacing any previous entry.
    pub fn install(&mut self, name: impl Into<String>, component: impl Component + 'static) {
        self.codes.insert(name.into(), Rc::new(component));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Component>> {
        self.codes.get(name).cloned()
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.codes.keys().collect();
        names.sort();
        f.debug_struct("Catalog").field("codes", &names).finish()
    }
}
