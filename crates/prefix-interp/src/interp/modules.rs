// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Module loading: `IMPORT`/`IMPORT_PATH`/`EXPORT`, resolved against the
//! caller's source directory, a sibling `lib/`, and the interpreter's own
//! `lib/`, executed once per canonical path and cached.

use std::path::Path;

use prefix_ast::token::TypeTag;
use prefix_ast::Span;
use prefix_lexer::Lexer;
use prefix_parser::Parser;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::value::Value;

use super::Interpreter;

impl Interpreter {
    /// Resolve `name` (dots mapped to path separators) against the search
    /// order and execute it, returning the alias bound in the caller.
    pub fn import(&self, caller_env: &Environment, name: &str, alias: Option<&str>, span: Span) -> Result<String, RuntimeDiagnostic> {
        let rel = name.replace('.', std::path::MAIN_SEPARATOR_STR);
        let candidates = [
            self.script_dir().join(format!("{rel}.pre")),
            self.script_dir().join(&rel).join("init.pre"),
            self.script_dir().join("lib").join(format!("{rel}.pre")),
            self.script_dir().join("lib").join(&rel).join("init.pre"),
        ];
        let path = candidates
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| RuntimeDiagnostic::new(RuntimeError::Module(format!("module '{}' not found", name)), span))?;
        let default_alias = Path::new(&rel)
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        self.import_path(caller_env, &path, alias.or(Some(default_alias.as_str())), span)
    }

    /// Execute (or fetch from cache) the module at `path`, then expose every
    /// non-underscore top-level symbol in `caller_env` under `alias.name`;
    /// `alias` itself is bound to an empty string so a bare reference to it
    /// doesn't fail even though Prefix has no first-class module value.
    pub fn import_path(&self, caller_env: &Environment, path: &Path, alias: Option<&str>, span: Span) -> Result<String, RuntimeDiagnostic> {
        let canonical = path
            .canonicalize()
            .map_err(|e| RuntimeDiagnostic::new(RuntimeError::Io(e.to_string()), span))?;
        let alias = alias
            .map(str::to_string)
            .unwrap_or_else(|| canonical.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());

        let module_env = match self.module_cache_get(&canonical) {
            Some(env) => env,
            None => {
                self.load_extension_manifest(&canonical);
                let source = std::fs::read_to_string(&canonical)
                    .map_err(|e| RuntimeDiagnostic::new(RuntimeError::Io(e.to_string()), span))?;
                let source = source.strip_prefix('\u{feff}').unwrap_or(&source);
                let lexed = Lexer::new(source).tokenize();
                if !lexed.is_ok() {
                    let msg = lexed.errors.first().map(|e| e.message.clone()).unwrap_or_default();
                    return Err(RuntimeDiagnostic::new(RuntimeError::Module(format!("syntax error in {}: {}", canonical.display(), msg)), span));
                }
                let parsed = Parser::new(lexed.tokens).parse();
                if !parsed.errors.is_empty() {
                    let msg = parsed.errors.first().map(|e| e.message.clone()).unwrap_or_default();
                    return Err(RuntimeDiagnostic::new(RuntimeError::Module(format!("syntax error in {}: {}", canonical.display(), msg)), span));
                }
                let env = Environment::root();
                env.declare("__MODULE_SOURCE__", TypeTag::Str, Value::str(canonical.to_string_lossy().into_owned()), true);
                self.exec_block(&env, &parsed.stmts)?;
                env.declare("__MODULE_LOADED__", TypeTag::Int, Value::Int(1), true);
                self.module_cache_insert(canonical.clone(), env.clone());
                env
            }
        };

        self.alias_env_insert(alias.clone(), module_env.clone());

        for (name, value) in module_env.local_bindings() {
            if name.starts_with("__") {
                continue;
            }
            caller_env.assign(&format!("{alias}.{name}"), value).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
        }
        if !caller_env.contains(&alias) {
            caller_env.assign(&alias, Value::str("")).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
        }

        Ok(alias)
    }

    /// `EXPORT(symbol, module)`: installs the caller's `symbol` value into
    /// `module`'s own environment under the same name, and mirrors it back
    /// as `module.symbol` in the caller.
    pub fn export(&self, caller_env: &Environment, symbol: &str, module_alias: &str, span: Span) -> Result<(), RuntimeDiagnostic> {
        let qualified = format!("{}.{}", module_alias, symbol);
        let value = caller_env
            .get_checked(symbol)
            .map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
        let module_env = self
            .alias_env_get(module_alias)
            .ok_or_else(|| RuntimeDiagnostic::new(RuntimeError::Module(format!("unknown module alias '{}'", module_alias)), span))?;
        module_env.assign(symbol, value.clone()).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
        caller_env.assign(&qualified, value).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
        Ok(())
    }

    /// Read a `.prex` manifest alongside a module, if present, and note its
    /// extension lines; native extension loading itself is outside the
    /// evaluator's scope (owned by the CLI/host, see `EXTERNAL INTERFACES`).
    fn load_extension_manifest(&self, module_path: &Path) {
        let prex = module_path.with_extension("prex");
        if let Ok(contents) = std::fs::read_to_string(&prex) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('!') {
                    continue;
                }
                // Extension/native-library loading is a host (CLI)
                // responsibility; the evaluator only surfaces the manifest.
                let _ = line;
            }
        }
    }
}
