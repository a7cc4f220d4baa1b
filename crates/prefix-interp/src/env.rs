// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Environment for variable bindings.
//!
//! Prefix closures capture their defining environment by reference, and
//! `THR`/`PARFOR` run real OS threads that can reach into the same chain, so
//! scopes are `Arc<Mutex<..>>`-shared rather than snapshotted: a later write
//! through one binding's alias must be visible to every environment that
//! still holds it, from any thread.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use prefix_ast::token::TypeTag;

use crate::value::Value;

/// True if `value`'s runtime kind matches a declared static type. An
/// `Unknown` declared type (untyped bindings) always matches.
pub(crate) fn type_matches(declared: TypeTag, value: &Value) -> bool {
    match declared {
        TypeTag::Unknown => true,
        TypeTag::Int => value.type_tag() == "INT",
        TypeTag::Flt => value.type_tag() == "FLT",
        TypeTag::Str => value.type_tag() == "STR",
        TypeTag::Tns => value.type_tag() == "TNS",
        TypeTag::Map => value.type_tag() == "MAP",
        TypeTag::Func => value.type_tag() == "FUNC",
        TypeTag::Thr => value.type_tag() == "THR",
    }
}

/// Maximum alias-chain hops to follow before declaring a cycle. Generous
/// enough for any realistic program, small enough to fail fast on a bug.
const MAX_ALIAS_DEPTH: usize = 256;

#[derive(Debug)]
pub struct Binding {
    pub declared_type: TypeTag,
    pub value: Value,
    pub initialized: bool,
    pub frozen: bool,
    pub permafrozen: bool,
    /// When set, reads/writes to this binding are redirected to
    /// `(env, name)` instead — set up by an aliasing builtin.
    pub alias_target: Option<(Environment, String)>,
}

impl Binding {
    fn new(declared_type: TypeTag, value: Value, initialized: bool) -> Self {
        Self { declared_type, value, initialized, frozen: false, permafrozen: false, alias_target: None }
    }
}

struct Scope {
    bindings: IndexMap<String, Binding>,
    parent: Option<Environment>,
}

/// A reference-counted, mutably shared environment scope with a parent
/// pointer. Cloning an `Environment` clones the handle, not the scope.
#[derive(Clone)]
pub struct Environment(Arc<Mutex<Scope>>);

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Environment(..)")
    }
}

impl Environment {
    /// A fresh root environment with no parent.
    pub fn root() -> Self {
        Self(Arc::new(Mutex::new(Scope { bindings: IndexMap::new(), parent: None })))
    }

    /// A child scope whose lookups fall through to `self` when a name isn't
    /// found locally.
    pub fn child(&self) -> Self {
        Self(Arc::new(Mutex::new(Scope { bindings: IndexMap::new(), parent: Some(self.clone()) })))
    }

    /// True if `other` is the exact same shared scope as `self`.
    pub fn same_scope(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Declare a new binding in *this* scope (shadowing any outer binding of
    /// the same name). Used by `TYPE: name` and `TYPE: name = expr`.
    pub fn declare(&self, name: &str, declared_type: TypeTag, value: Value, initialized: bool) {
        let mut scope = self.0.lock().unwrap();
        scope.bindings.insert(name.to_string(), Binding::new(declared_type, value, initialized));
    }

    /// Read a binding's current value, walking alias targets and then
    /// parent scopes.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = self.clone();
        loop {
            let next_parent;
            {
                let scope = env.0.lock().unwrap();
                if let Some(binding) = scope.bindings.get(name) {
                    if let Some((target_env, target_name)) = &binding.alias_target {
                        let target_env = target_env.clone();
                        let target_name = target_name.clone();
                        drop(scope);
                        return target_env.get(&target_name);
                    }
                    return Some(binding.value.clone());
                }
                next_parent = scope.parent.clone();
            }
            match next_parent {
                Some(p) => env = p,
                None => return None,
            }
        }
    }

    /// Read a binding, erroring if it was declared (`TYPE: name`) but never
    /// assigned a value.
    pub fn get_checked(&self, name: &str) -> Result<Value, EnvError> {
        let mut env = self.clone();
        loop {
            let next_parent;
            {
                let scope = env.0.lock().unwrap();
                if let Some(binding) = scope.bindings.get(name) {
                    if let Some((target_env, target_name)) = &binding.alias_target {
                        let target_env = target_env.clone();
                        let target_name = target_name.clone();
                        drop(scope);
                        return target_env.get_checked(&target_name);
                    }
                    if !binding.initialized {
                        return Err(EnvError::Uninitialized(name.to_string()));
                    }
                    return Ok(binding.value.clone());
                }
                next_parent = scope.parent.clone();
            }
            match next_parent {
                Some(p) => env = p,
                None => return Err(EnvError::NotFound(name.to_string())),
            }
        }
    }

    /// True if a binding (declared but possibly uninitialized) named `name`
    /// is visible from this scope.
    pub fn contains(&self, name: &str) -> bool {
        let mut env = self.clone();
        loop {
            let next_parent;
            {
                let scope = env.0.lock().unwrap();
                if scope.bindings.contains_key(name) {
                    return true;
                }
                next_parent = scope.parent.clone();
            }
            match next_parent {
                Some(p) => env = p,
                None => return false,
            }
        }
    }

    /// Every name declared directly in this scope (not inherited from a
    /// parent), paired with its current value. Used by the module loader to
    /// re-expose a freshly executed module's top-level bindings under the
    /// importer's alias.
    pub fn local_bindings(&self) -> Vec<(String, Value)> {
        let names: Vec<String> = {
            let scope = self.0.lock().unwrap();
            scope.bindings.keys().cloned().collect()
        };
        names.into_iter().map(|n| { let v = self.get(&n).unwrap_or(Value::Null); (n, v) }).collect()
    }

    /// Find the scope (innermost first) that owns a binding for `name`.
    fn owning_scope(&self, name: &str) -> Option<Environment> {
        let mut env = self.clone();
        loop {
            let found = { env.0.lock().unwrap().bindings.contains_key(name) };
            if found {
                return Some(env);
            }
            let next_parent = { env.0.lock().unwrap().parent.clone() };
            match next_parent {
                Some(p) => env = p,
                None => return None,
            }
        }
    }

    /// Assign to an existing binding reachable from this scope, declaring it
    /// locally if it isn't found anywhere in the chain. Resolves through
    /// alias targets and honors frozen/permafrozen. Returns the declared
    /// type name for coercion purposes the caller may already know.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), EnvError> {
        match self.owning_scope(name) {
            Some(owner) => owner.write_local(name, value, 0),
            None => {
                self.declare(name, TypeTag::Unknown, value, true);
                Ok(())
            }
        }
    }

    /// Write directly to the binding owned by this exact scope, following
    /// alias redirection and depth-limited cycle detection.
    fn write_local(&self, name: &str, value: Value, depth: usize) -> Result<(), EnvError> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(EnvError::AliasCycle(name.to_string()));
        }
        let redirect = {
            let mut scope = self.0.lock().unwrap();
            let binding = scope.bindings.get_mut(name).ok_or_else(|| EnvError::NotFound(name.to_string()))?;
            if binding.permafrozen {
                return Err(EnvError::Permafrozen(name.to_string()));
            }
            if binding.frozen {
                return Err(EnvError::Frozen(name.to_string()));
            }
            if !type_matches(binding.declared_type, &value) {
                return Err(EnvError::TypeMismatch(format!(
                    "cannot assign {} to '{}' declared as {:?}",
                    value.type_tag(),
                    name,
                    binding.declared_type
                )));
            }
            if let Some((target_env, target_name)) = &binding.alias_target {
                Some((target_env.clone(), target_name.clone()))
            } else {
                binding.value = value.clone();
                binding.initialized = true;
                None
            }
        };
        if let Some((target_env, target_name)) = redirect {
            match target_env.owning_scope(&target_name) {
                Some(owner) => owner.write_local(&target_name, value, depth + 1),
                None => Err(EnvError::NotFound(target_name)),
            }
        } else {
            Ok(())
        }
    }

    /// Make `name` in this scope an alias of `target_name` in `target_env`.
    /// Disallows cycles and disallows aliasing onto a frozen/permafrozen
    /// target.
    pub fn alias(&self, name: &str, target_env: Environment, target_name: String) -> Result<(), EnvError> {
        if target_env.same_scope(self) && target_name == name {
            return Err(EnvError::AliasCycle(name.to_string()));
        }
        if let Some(owner) = target_env.owning_scope(&target_name) {
            let scope = owner.0.lock().unwrap();
            if let Some(binding) = scope.bindings.get(&target_name) {
                if binding.permafrozen {
                    return Err(EnvError::Permafrozen(target_name));
                }
                if binding.frozen {
                    return Err(EnvError::Frozen(target_name));
                }
            }
        }
        let mut scope = self.0.lock().unwrap();
        let entry = scope
            .bindings
            .entry(name.to_string())
            .or_insert_with(|| Binding::new(TypeTag::Unknown, Value::Null, false));
        entry.alias_target = Some((target_env, target_name));
        entry.initialized = true;
        Ok(())
    }

    /// Mark a binding frozen (rejects further writes until `thaw`ed).
    pub fn freeze(&self, name: &str) -> Result<(), EnvError> {
        match self.owning_scope(name) {
            Some(owner) => {
                owner.0.lock().unwrap().bindings.get_mut(name).unwrap().frozen = true;
                Ok(())
            }
            None => Err(EnvError::NotFound(name.to_string())),
        }
    }

    /// Clear a binding's frozen flag. Fails on a permafrozen binding, which
    /// can never be reverted.
    pub fn thaw(&self, name: &str) -> Result<(), EnvError> {
        match self.owning_scope(name) {
            Some(owner) => {
                let mut scope = owner.0.lock().unwrap();
                let binding = scope.bindings.get_mut(name).unwrap();
                if binding.permafrozen {
                    return Err(EnvError::Permafrozen(name.to_string()));
                }
                binding.frozen = false;
                Ok(())
            }
            None => Err(EnvError::NotFound(name.to_string())),
        }
    }

    /// Mark a binding permafrozen: unlike `frozen`, this can never be
    /// reverted and is checked even if a future alias re-routes through it.
    pub fn permafreeze(&self, name: &str) -> Result<(), EnvError> {
        match self.owning_scope(name) {
            Some(owner) => {
                owner.0.lock().unwrap().bindings.get_mut(name).unwrap().permafrozen = true;
                Ok(())
            }
            None => Err(EnvError::NotFound(name.to_string())),
        }
    }

    /// Remove a binding from whichever scope owns it (`POP`/`DEL`).
    pub fn remove(&self, name: &str) -> bool {
        match self.owning_scope(name) {
            Some(owner) => owner.0.lock().unwrap().bindings.shift_remove(name).is_some(),
            None => false,
        }
    }

    pub fn declared_type(&self, name: &str) -> Option<TypeTag> {
        self.owning_scope(name).map(|owner| owner.0.lock().unwrap().bindings.get(name).unwrap().declared_type)
    }
}

#[derive(Debug, Clone)]
pub enum EnvError {
    NotFound(String),
    Frozen(String),
    Permafrozen(String),
    AliasCycle(String),
    Uninitialized(String),
    TypeMismatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_falls_through_to_parent_for_reads() {
        let root = Environment::root();
        root.declare("x", TypeTag::Int, Value::Int(1), true);
        let child = root.child();
        assert_eq!(child.get("x").map(|v| matches!(v, Value::Int(1))), Some(true));
    }

    #[test]
    fn assign_without_existing_binding_declares_in_innermost_scope() {
        let root = Environment::root();
        let child = root.child();
        child.assign("y", Value::Int(5)).unwrap();
        assert!(child.contains("y"));
        assert!(root.get("y").is_none(), "assign must not leak a new binding up into the parent scope");
    }

    #[test]
    fn freeze_then_thaw_allows_write_again() {
        let env = Environment::root();
        env.declare("x", TypeTag::Int, Value::Int(1), true);
        env.freeze("x").unwrap();
        assert!(matches!(env.assign("x", Value::Int(2)), Err(EnvError::Frozen(_))));
        env.thaw("x").unwrap();
        env.assign("x", Value::Int(2)).unwrap();
        assert!(matches!(env.get("x"), Some(Value::Int(2))));
    }

    #[test]
    fn permafreeze_rejects_thaw_and_write() {
        let env = Environment::root();
        env.declare("x", TypeTag::Int, Value::Int(1), true);
        env.permafreeze("x").unwrap();
        assert!(matches!(env.thaw("x"), Err(EnvError::Permafrozen(_))));
        assert!(matches!(env.assign("x", Value::Int(2)), Err(EnvError::Permafrozen(_))));
    }

    #[test]
    fn alias_redirects_reads_and_writes() {
        let env = Environment::root();
        env.declare("a", TypeTag::Int, Value::Int(1), true);
        env.declare("b", TypeTag::Int, Value::Int(0), true);
        env.alias("b", env.clone(), "a".to_string()).unwrap();
        env.assign("a", Value::Int(9)).unwrap();
        assert!(matches!(env.get("b"), Some(Value::Int(9))));
    }

    #[test]
    fn alias_onto_frozen_target_fails() {
        let env = Environment::root();
        env.declare("a", TypeTag::Int, Value::Int(1), true);
        env.freeze("a").unwrap();
        env.declare("b", TypeTag::Int, Value::Int(0), true);
        assert!(matches!(env.alias("b", env.clone(), "a".to_string()), Err(EnvError::Frozen(_))));
    }

    #[test]
    fn direct_self_alias_is_a_cycle() {
        let env = Environment::root();
        env.declare("a", TypeTag::Int, Value::Int(1), true);
        assert!(matches!(env.alias("a", env.clone(), "a".to_string()), Err(EnvError::AliasCycle(_))));
    }

    #[test]
    fn local_bindings_excludes_parent_scope() {
        let root = Environment::root();
        root.declare("outer", TypeTag::Int, Value::Int(1), true);
        let child = root.child();
        child.declare("inner", TypeTag::Int, Value::Int(2), true);
        let names: Vec<String> = child.local_bindings().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["inner".to_string()]);
    }
}
