// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Lexical environments: symbol-to-value bindings with an optional parent
//! link, per §4.4.
//!
//! Bindings carry two independent flags: `is_const` (set by `defconst`,
//! rejects a later `set!`) and `is_method` (set by `defmethod`, marks the
//! binding callable with dot-call syntax). `no_def` marks an environment
//! created by a `lambda` body where `define` is disallowed (only `let`-like
//! forms may introduce new bindings at that scope).

use crate::error::{LonaError, Result};
use crate::handle::{Handle, VmId};
use crate::value::Value;

const HASH_INDEX_THRESHOLD: usize = 8;

#[derive(Debug, Clone)]
struct Binding {
    symbol: Handle,
    value: Value,
    is_const: bool,
    is_method: bool,
    /// Tombstone for a removed binding; keeps indices stable for `index`.
    live: bool,
}

/// A lexical scope: `Value::Environment`'s heap payload.
#[derive(Debug)]
pub struct Environment {
    bindings: Vec<Binding>,
    index: Option<std::collections::HashMap<Handle, usize>>,
    pub parent: Option<Handle>,
    pub no_def: bool,
    /// The VM that allocated this environment; `define`/`set!`/`defmethod`
    /// refuse to write through a handle owned by a different VM (§5, §8
    /// property 6).
    pub owner: VmId,
}

impl Environment {
    #[must_use]
    pub fn new(parent: Option<Handle>, owner: VmId) -> Self {
        Self {
            bindings: Vec::new(),
            index: None,
            parent,
            no_def: false,
            owner,
        }
    }

    #[must_use]
    pub fn no_def_scope(parent: Option<Handle>, owner: VmId) -> Self {
        let mut env = Self::new(parent, owner);
        env.no_def = true;
        env
    }

    fn find(&self, symbol: Handle) -> Option<usize> {
        if let Some(index) = &self.index {
            return index.get(&symbol).copied().filter(|&i| self.bindings[i].live);
        }
        self.bindings
            .iter()
            .position(|b| b.live && b.symbol == symbol)
    }

    fn rebuild_index_if_needed(&mut self) {
        if self.index.is_none() && self.bindings.len() > HASH_INDEX_THRESHOLD {
            let mut map = std::collections::HashMap::with_capacity(self.bindings.len());
            for (i, b) in self.bindings.iter().enumerate() {
                if b.live {
                    map.insert(b.symbol, i);
                }
            }
            self.index = Some(map);
        } else if let Some(map) = &mut self.index {
            let i = self.bindings.len() - 1;
            map.insert(self.bindings[i].symbol, i);
        }
    }

    /// Introduce a new binding in *this* environment, shadowing any binding
    /// of the same name already present here (not in a parent).
    ///
    /// # Errors
    /// Returns `Err` if `caller` does not own this environment, if this
    /// environment is a `no_def` lambda-body scope, or update fails.
    pub fn define(&mut self, symbol: Handle, value: Value, is_const: bool, caller: VmId) -> Result<()> {
        if self.owner != caller {
            return Err(LonaError::immutable(
                "cannot define in an environment owned by another VM",
            ));
        }
        if self.no_def {
            return Err(LonaError::immutable(
                "define is not allowed in this scope; use let",
            ));
        }
        if let Some(i) = self.find(symbol) {
            self.bindings[i].value = value;
            self.bindings[i].is_const = is_const;
            return Ok(());
        }
        self.bindings.push(Binding {
            symbol,
            value,
            is_const,
            is_method: false,
            live: true,
        });
        self.rebuild_index_if_needed();
        Ok(())
    }

    /// Mark an existing (or newly defined) binding as a method, per `defmethod`.
    pub fn define_method(&mut self, symbol: Handle, value: Value, caller: VmId) -> Result<()> {
        self.define(symbol, value, false, caller)?;
        let i = self.find(symbol).expect("just defined");
        self.bindings[i].is_method = true;
        Ok(())
    }

    /// Look up a binding in this environment only (no parent walk).
    #[must_use]
    pub fn get_local(&self, symbol: Handle) -> Option<Value> {
        self.find(symbol).map(|i| self.bindings[i].value)
    }

    #[must_use]
    pub fn is_method_local(&self, symbol: Handle) -> bool {
        self.find(symbol).is_some_and(|i| self.bindings[i].is_method)
    }

    /// Mutate an existing binding in this environment only.
    ///
    /// A binding not found here (`Ok(false)`) performs no write and so needs
    /// no ownership check — the caller walks on to the parent environment,
    /// which may belong to this same VM even if an intermediate scope in the
    /// chain does not. The check only applies once a binding to actually
    /// write is found.
    ///
    /// # Errors
    /// Returns `Err` if the binding is missing here, is const, or `caller`
    /// does not own this environment.
    pub fn set_local(&mut self, symbol: Handle, value: Value, caller: VmId) -> Result<bool> {
        match self.find(symbol) {
            Some(i) if self.bindings[i].is_const => {
                Err(LonaError::immutable("cannot set! a constant binding"))
            }
            Some(i) if self.owner != caller => Err(LonaError::immutable(
                "cannot set! a binding in an environment owned by another VM",
            )),
            Some(i) => {
                self.bindings[i].value = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a binding from this environment only. No-op if absent.
    pub fn undefine_local(&mut self, symbol: Handle) {
        if let Some(i) = self.find(symbol) {
            self.bindings[i].live = false;
            if let Some(map) = &mut self.index {
                map.remove(&symbol);
            }
        }
    }

    /// Iterate live bindings in insertion order (used by `environment->list`
    /// and the debugger's frame inspector).
    pub fn iter(&self) -> impl Iterator<Item = (Handle, Value)> + '_ {
        self.bindings
            .iter()
            .filter(|b| b.live)
            .map(|b| (b.symbol, b.value))
    }

    /// All handles reachable from this environment's bindings, for the GC mark phase.
    pub fn mark_roots(&self, mut push: impl FnMut(Value)) {
        for b in &self.bindings {
            if b.live {
                push(b.value);
            }
        }
    }
}

#[cfg(test)]
mod env_test {
    use super::*;
    use crate::handle::Handle;

    fn sym(n: u32) -> Handle {
        Handle::new(n)
    }

    #[test]
    fn define_rejects_a_caller_from_another_vm() {
        let owner = VmId::fresh();
        let foreign = VmId::fresh();
        let mut env = Environment::new(None, owner);
        assert!(env.define(sym(0), Value::Number(1.0), false, owner).is_ok());
        assert!(env.define(sym(1), Value::Number(2.0), false, foreign).is_err());
    }

    #[test]
    fn set_local_rejects_a_caller_from_another_vm_only_once_a_binding_is_found() {
        let owner = VmId::fresh();
        let foreign = VmId::fresh();
        let mut env = Environment::new(None, owner);
        env.define(sym(0), Value::Number(1.0), false, owner).unwrap();

        // No binding for sym(1) here: a foreign caller walking past this
        // environment on its way to a parent scope must not be rejected.
        assert!(matches!(env.set_local(sym(1), Value::Number(9.0), foreign), Ok(false)));

        assert!(env.set_local(sym(0), Value::Number(9.0), foreign).is_err());
        assert!(matches!(env.set_local(sym(0), Value::Number(9.0), owner), Ok(true)));
        assert!(matches!(env.get_local(sym(0)), Some(Value::Number(n)) if n == 9.0));
    }
}
