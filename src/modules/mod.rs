//! Process-level module registry and native-function binding: a name ->
//! initializer table built once at VM construction, with each module's
//! own natives only bound into globals once `import` names it.

pub mod io;
pub mod math;

use crate::common::{table::StringTable, value::Value};

/// A module's one-time setup: called the first time its name is
/// imported, and never again. Registers one or more qualified names
/// into the VM's globals table.
pub type Initializer = fn(&mut StringTable<Value>);

/// Maps short module names (`"io"`) to their initializers. Built once
/// at VM construction and read-only thereafter — there is no public API
/// to register a module after construction.
pub struct ModuleRegistry {
    modules: StringTable<Initializer>,
}

impl ModuleRegistry {
    /// Registers every module the core ships with built in.
    pub fn with_builtins() -> ModuleRegistry {
        let mut registry = ModuleRegistry { modules: StringTable::new() };
        registry.register("io", io::init);
        registry.register("math", math::init);
        registry
    }

    fn register(&mut self, name: &str, initializer: Initializer) {
        self.modules.set(name, initializer);
    }

    /// Runs `name`'s initializer against `globals`, or returns `None` if
    /// no module by that name is registered; the caller turns that into
    /// the VM's "Failed to load module" diagnostic.
    pub fn initialize(&self, name: &str, globals: &mut StringTable<Value>) -> Option<()> {
        let initializer = *self.modules.get(name)?;
        initializer(globals);
        Some(())
    }
}

/// Binds a qualified name (`"io.println"`) to a native function in the
/// globals table. Exposed as a free function so each module's
/// initializer can call it directly.
pub fn register_native(
    globals: &mut StringTable<Value>,
    qualified_name: &'static str,
    implementation: impl Fn(&[Value]) -> Result<Value, crate::vm::error::RuntimeError> + 'static,
) {
    globals.set(qualified_name, Value::Native(crate::common::value::NativeFn::new(qualified_name, implementation)));
}
