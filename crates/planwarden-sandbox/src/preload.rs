//! Registry of modules a script may import.
//!
//! Entries are materialized on every import, so each import sees a freshly
//! loaded module. Names not in the registry fail at run time only.

use crate::error::ScriptResult;
use rhai::{AST, Engine, EvalAltResult, Module, ModuleResolver, Position, Scope, Shared};
use std::collections::BTreeMap;

enum Preloaded {
    Native(fn() -> Module),
    Script(AST),
}

#[derive(Default)]
pub(crate) struct PreloadRegistry {
    entries: BTreeMap<String, Preloaded>,
}

impl PreloadRegistry {
    pub(crate) fn register_native(&mut self, name: &str, loader: fn() -> Module) {
        self.insert(name, Preloaded::Native(loader));
    }

    pub(crate) fn register_script(&mut self, name: &str, ast: AST) {
        self.insert(name, Preloaded::Script(ast));
    }

    fn insert(&mut self, name: &str, entry: Preloaded) {
        if self.entries.insert(name.to_string(), entry).is_some() {
            tracing::warn!(module = name, "preloaded module replaced by a later registration");
        }
    }

    #[cfg(test)]
    pub(crate) fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl ModuleResolver for PreloadRegistry {
    fn resolve(
        &self,
        engine: &Engine,
        _source: Option<&str>,
        path: &str,
        pos: Position,
    ) -> ScriptResult<Shared<Module>> {
        let mut module = match self.entries.get(path) {
            Some(Preloaded::Native(loader)) => loader(),
            Some(Preloaded::Script(ast)) => Module::eval_ast_as_new(Scope::new(), ast, engine)
                .map_err(|err| EvalAltResult::ErrorInModule(path.to_string(), err, pos))?,
            None => return Err(EvalAltResult::ErrorModuleNotFound(path.to_string(), pos).into()),
        };
        tracing::trace!(module = path, "module imported");
        module.build_index();
        Ok(Shared::new(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer() -> Module {
        let mut module = Module::new();
        module.set_native_fn("answer", || -> ScriptResult<rhai::INT> { Ok(42) });
        module
    }

    #[test]
    fn resolves_native_and_script_entries() {
        let engine = Engine::new();
        let mut registry = PreloadRegistry::default();
        registry.register_native("native", answer);
        let ast = engine.compile("fn twice(x) { x * 2 }").expect("compiles");
        registry.register_script("helpers", ast);
        assert_eq!(registry.names(), vec!["helpers", "native"]);

        let mut engine = Engine::new();
        engine.set_module_resolver(registry);
        let out: rhai::INT = engine
            .eval(r#"import "native" as n; import "helpers" as h; h::twice(n::answer())"#)
            .expect("script runs");
        assert_eq!(out, 84);
    }

    #[test]
    fn unknown_module_fails_only_when_imported() {
        let mut engine = Engine::new();
        engine.set_module_resolver(PreloadRegistry::default());
        let ast = engine
            .compile(r#"import "missing" as m; true"#)
            .expect("compiles without resolving");
        let err = engine.eval_ast::<bool>(&ast).expect_err("import fails");
        assert!(matches!(*err, EvalAltResult::ErrorModuleNotFound(ref name, _) if name == "missing"));
    }
}
