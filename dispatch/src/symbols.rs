use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use object::Value;

use crate::{Condition, MultipleValues};

pub type LispResult = Result<MultipleValues, Condition>;

/// A function reachable through a symbol.
pub trait LispFunction: Send + Sync {
    fn call(&self, args: &[Value]) -> LispResult;
}

impl<F> LispFunction for F
where
    F: Fn(&[Value]) -> LispResult + Send + Sync,
{
    fn call(&self, args: &[Value]) -> LispResult {
        self(args)
    }
}

/// Function bindings of symbols, looked up on every call so that a
/// redefinition is seen by callers that were built before it.
#[derive(Default)]
pub struct SymbolTable {
    functions: RwLock<HashMap<String, Arc<dyn LispFunction>, ahash::RandomState>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, returning the previous binding.
    pub fn register(
        &self,
        name: impl Into<String>,
        function: impl LispFunction + 'static,
    ) -> Option<Arc<dyn LispFunction>> {
        let name = name.into();
        log::debug!("binding function {name}");
        self.functions.write().insert(name, Arc::new(function))
    }

    /// Remove the binding of `name`; `false` if it had none.
    pub fn unregister(&self, name: &str) -> bool {
        log::debug!("unbinding function {name}");
        self.functions.write().remove(name).is_some()
    }

    pub fn is_fbound(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn LispFunction>> {
        self.functions.read().get(name).cloned()
    }

    /// Call the current binding of `name`.
    ///
    /// The lock is released before the call, so the callee may rebind.
    pub fn funcall(&self, name: &str, args: &[Value]) -> LispResult {
        let Some(function) = self.lookup(name) else {
            return Err(Condition::UndefinedFunction {
                name: name.to_owned(),
            });
        };
        function.call(args)
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let functions = self.functions.read();
        let mut names: Vec<&String> = functions.keys().collect();
        names.sort();
        f.debug_struct("SymbolTable").field("functions", &names).finish()
    }
}
