// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! `Vm`: the embeddable interpreter instance tying the heap, symbol table,
//! global environment, and explicit value stack together.
//!
//! This is the host-facing surface: everything `original_source/`'s C ABI
//! exposed as free functions taking a `lisp_vm_t*` (`lisp_push`/`pop`/`top`,
//! `lisp_def`/`defn`, `lisp_make_symbol`, `lisp_try`, `lisp_keep_alive`,
//! `lisp_stringify`, `lisp_vm_set_client`/`client`) is an ordinary method
//! here instead.

use crate::env::Environment;
use crate::error::{LonaError, Result};
use crate::handle::{Handle, VmId};
use crate::heap::Heap;
use crate::port::{Port, PortMode};
use crate::stream::StreamObject;
use crate::value::object::{
    DictEntry, HeapArray, HeapBuffer, HeapDictionary, HeapObject, HeapString, MappingRef,
    NativeFn, NativeProcedure, Pair, Procedure, SourceFile, SymbolData,
};
use crate::value::Value;
use std::any::Any;
use std::collections::HashMap;
use tracing::debug;

/// Allocations between automatic GC cycles. Chosen to keep pause frequency
/// bounded without collecting so eagerly that short scripts never benefit
/// from the pool reuse the free list provides.
const GC_ALLOCATION_THRESHOLD: u64 = 4096;

/// Trampoline depth past which the evaluator reports a recursion error
/// instead of overflowing the host's real call stack (§4.3/§4.7: tail
/// calls loop, but non-tail recursion still uses Rust's stack one frame
/// per pending form).
pub const MAX_EVAL_DEPTH: usize = 10_000;

pub struct Vm {
    id: VmId,
    heap: Heap,
    symbols: HashMap<String, Handle>,
    root_env: Handle,
    /// Explicit operand stack: values pushed here are GC roots for as long
    /// as they remain on it, mirroring the host ABI's `lisp_push`/`pop`.
    stack: Vec<Value>,
    /// Values pinned alive by the host regardless of reachability
    /// (`lisp_keep_alive`).
    keep_alive: Vec<Value>,
    source_files: Vec<Handle>,
    host_data: Option<Box<dyn Any>>,
    allocations_since_gc: u64,
    pub gc_enabled: bool,
    /// The port `read`/`peek-char`/etc. default to when no port is given
    /// explicitly; rebindable for the dynamic extent of `with-input`.
    current_input: Handle,
    /// The port `write`/`display`/`newline`/etc. default to; rebindable for
    /// the dynamic extent of `with-output`.
    current_output: Handle,
}

impl Vm {
    /// Construct a VM with an empty global environment and the standard
    /// primitive library installed.
    #[must_use]
    pub fn new() -> Self {
        let id = VmId::fresh();
        let mut heap = Heap::new();
        let root_env = heap.alloc(HeapObject::Environment(Environment::new(None, id)));
        let stdin_stream = heap.alloc(HeapObject::Stream(StreamObject::new(Box::new(
            crate::stream::StdinStream,
        ))));
        let stdin_port = heap.alloc(HeapObject::Port(Port::new(stdin_stream, PortMode::Read)));
        let stdout_stream = heap.alloc(HeapObject::Stream(StreamObject::new(Box::new(
            crate::stream::StdoutStream,
        ))));
        let stdout_port = heap.alloc(HeapObject::Port(Port::new(stdout_stream, PortMode::Write)));
        let stderr_stream = heap.alloc(HeapObject::Stream(StreamObject::new(Box::new(
            crate::stream::StderrStream,
        ))));
        let stderr_port = heap.alloc(HeapObject::Port(Port::new(stderr_stream, PortMode::Write)));
        let mut vm = Self {
            id,
            heap,
            symbols: HashMap::new(),
            root_env,
            stack: Vec::new(),
            keep_alive: Vec::new(),
            source_files: Vec::new(),
            host_data: None,
            allocations_since_gc: 0,
            gc_enabled: true,
            current_input: stdin_port,
            current_output: stdout_port,
        };
        vm.def("*stdin*", Value::Port(stdin_port)).expect("global binding cannot fail on a fresh environment");
        vm.def("*stdout*", Value::Port(stdout_port)).expect("global binding cannot fail on a fresh environment");
        vm.def("*stderr*", Value::Port(stderr_port)).expect("global binding cannot fail on a fresh environment");
        crate::primitives::install(&mut vm);
        vm
    }

    /// The port currently used by output primitives that take no explicit
    /// port argument.
    #[must_use]
    pub const fn current_output(&self) -> Handle {
        self.current_output
    }

    /// The port currently used by input primitives that take no explicit
    /// port argument.
    #[must_use]
    pub const fn current_input(&self) -> Handle {
        self.current_input
    }

    /// Rebind the current output port, returning the previous one so the
    /// caller (`with-output`) can restore it afterward.
    pub fn swap_current_output(&mut self, port: Handle) -> Handle {
        std::mem::replace(&mut self.current_output, port)
    }

    /// Rebind the current input port, returning the previous one so the
    /// caller (`with-input`) can restore it afterward.
    pub fn swap_current_input(&mut self, port: Handle) -> Handle {
        std::mem::replace(&mut self.current_input, port)
    }

    #[must_use]
    pub const fn global_env(&self) -> Handle {
        self.root_env
    }

    /// This VM's identity, stamped onto every mutable object it allocates.
    #[must_use]
    pub const fn id(&self) -> VmId {
        self.id
    }

    /// Fail with `ImmutableError` if `owner` names a different VM than this
    /// one. Every primitive that mutates a `Pair`/`HeapArray`/
    /// `HeapDictionary`/`Environment` calls this before writing (§5, §8
    /// property 6); read-only traversal of a foreign object is unaffected.
    ///
    /// # Errors
    /// Returns `Err(LonaError::Immutable)` if `owner != self.id()`.
    pub fn check_owner(&self, owner: VmId) -> Result<()> {
        if owner == self.id {
            Ok(())
        } else {
            Err(LonaError::immutable("cannot modify an object owned by another VM"))
        }
    }

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    // ---- allocation helpers -------------------------------------------------

    fn alloc(&mut self, object: HeapObject) -> Handle {
        self.allocations_since_gc += 1;
        let handle = self.heap.alloc(object);
        if self.gc_enabled && self.allocations_since_gc >= GC_ALLOCATION_THRESHOLD {
            self.collect_garbage();
        }
        handle
    }

    #[must_use]
    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        let h = self.alloc(HeapObject::Pair(Pair::new(car, cdr, self.id)));
        Value::Pair(h)
    }

    #[must_use]
    pub fn make_string(&mut self, s: impl Into<String>) -> Value {
        let h = self.alloc(HeapObject::String(HeapString::new(s)));
        Value::String(h)
    }

    #[must_use]
    pub fn make_buffer(&mut self, bytes: Vec<u8>) -> Value {
        let h = self.alloc(HeapObject::Buffer(HeapBuffer {
            bytes,
            immutable: false,
        }));
        Value::Buffer(h)
    }

    #[must_use]
    pub fn make_array(&mut self, items: Vec<Value>) -> Value {
        let h = self.alloc(HeapObject::Array(HeapArray {
            items,
            immutable: false,
            owner: self.id,
        }));
        Value::Array(h)
    }

    /// Build a dictionary from `(key, value)` pairs in insertion order.
    /// A repeated key keeps only its last value, per ordinary `define`-like
    /// overwrite semantics.
    ///
    /// # Errors
    /// Never fails today; returns `Result` so a future key-type restriction
    /// does not need to change every call site.
    pub fn make_dictionary(&mut self, pairs: Vec<(Value, Value)>) -> Result<Value> {
        let mut dict = HeapDictionary::new(self.id);
        for (key, value) in pairs {
            if let Some(existing) = dict
                .entries
                .iter_mut()
                .find(|e| e.value.is_some() && self.values_identical(e.key, key))
            {
                existing.value = Some(value);
            } else {
                dict.entries.push(DictEntry {
                    key,
                    value: Some(value),
                });
            }
        }
        let h = self.alloc(HeapObject::Dictionary(dict));
        Ok(Value::Dictionary(h))
    }

    /// Create a new child lexical environment.
    #[must_use]
    pub fn new_environment(&mut self, parent: Option<Handle>) -> Handle {
        self.alloc(HeapObject::Environment(Environment::new(parent, self.id)))
    }

    /// Bind `sym` to `value` in `env` specifically (not walking parents).
    ///
    /// # Errors
    /// Returns `Err` if `env` rejects new definitions, or is not an environment.
    pub fn define_in(&mut self, env: Handle, sym: Handle, value: Value) -> Result<()> {
        let id = self.id;
        match self.heap.get_mut(env)? {
            HeapObject::Environment(e) => e.define(sym, value, false, id),
            _ => Err(LonaError::internal("define_in on a non-environment handle")),
        }
    }

    /// Bind `sym` to `value` in `env`, optionally flagged constant
    /// (`defconst`).
    ///
    /// # Errors
    /// Returns `Err` if `env` rejects new definitions, or is not an environment.
    pub fn define_const_in(&mut self, env: Handle, sym: Handle, value: Value, is_const: bool) -> Result<()> {
        let id = self.id;
        match self.heap.get_mut(env)? {
            HeapObject::Environment(e) => e.define(sym, value, is_const, id),
            _ => Err(LonaError::internal("define_const_in on a non-environment handle")),
        }
    }

    /// Bind `sym` to `value` in `env` and flag it callable via dot-call
    /// syntax (`defmethod`).
    ///
    /// # Errors
    /// Returns `Err` if `env` rejects new definitions, or is not an environment.
    pub fn define_method_in(&mut self, env: Handle, sym: Handle, value: Value) -> Result<()> {
        let id = self.id;
        match self.heap.get_mut(env)? {
            HeapObject::Environment(e) => e.define_method(sym, value, id),
            _ => Err(LonaError::internal("define_method_in on a non-environment handle")),
        }
    }

    /// Mutate an existing binding reachable from `env`, walking parents.
    ///
    /// # Errors
    /// Returns `Err` if no binding for `sym` is found, or the binding is const.
    pub fn set_bang(&mut self, env: Handle, sym: Handle, value: Value) -> Result<()> {
        let id = self.id;
        let mut current = Some(env);
        while let Some(h) = current {
            let parent = match self.heap.get_mut(h)? {
                HeapObject::Environment(e) => {
                    if e.set_local(sym, value, id)? {
                        return Ok(());
                    }
                    e.parent
                }
                _ => return Err(LonaError::internal("set_bang on a non-environment handle")),
            };
            current = parent;
        }
        let name = self.symbol_name(Value::Symbol(sym)).unwrap_or("?").to_string();
        Err(LonaError::unbound(name))
    }

    /// Allocate a closure.
    #[must_use]
    pub fn alloc_procedure(&mut self, proc: Procedure) -> Value {
        let h = self.alloc(HeapObject::Procedure(proc));
        Value::Procedure(h)
    }

    /// Allocate a macro (same payload shape as a procedure, different tag).
    #[must_use]
    pub fn alloc_macro(&mut self, proc: Procedure) -> Value {
        let h = self.alloc(HeapObject::Macro(proc));
        Value::Macro(h)
    }

    /// Record a new empty source file and return its handle.
    pub fn new_source_file(&mut self, path: String) -> Handle {
        let h = self.alloc(HeapObject::SourceFile(SourceFile::new(path)));
        self.source_files.push(h);
        h
    }

    /// Attach a source mapping to a pair, recording it against `file`'s
    /// mapping table.
    pub fn attach_mapping(&mut self, pair: Value, file: Handle, start: u32, end: u32, line: u32) {
        let Value::Pair(ph) = pair else { return };
        let index = match self.heap.get_mut(file) {
            Ok(HeapObject::SourceFile(f)) => f.push_mapping(start, end, line),
            _ => return,
        };
        if let Ok(HeapObject::Pair(p)) = self.heap.get_mut(ph) {
            p.mapping = Some(MappingRef { file, index });
        }
    }

    // ---- symbols -------------------------------------------------------------

    /// Intern a symbol name, returning the same handle for repeated calls
    /// with the same name.
    #[must_use]
    pub fn intern(&mut self, name: &str) -> Value {
        if let Some(h) = self.symbols.get(name) {
            return Value::Symbol(*h);
        }
        let h = self.heap.alloc(HeapObject::Symbol(SymbolData::new(name)));
        self.symbols.insert(name.to_string(), h);
        Value::Symbol(h)
    }

    #[must_use]
    pub fn symbol_name<'a>(&'a self, value: Value) -> Option<&'a str> {
        let Value::Symbol(h) = value else { return None };
        match self.heap.get(h).ok()? {
            HeapObject::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    // ---- global bindings (`lisp_def`/`lisp_defn`) -----------------------------

    /// Define a global binding by name.
    ///
    /// # Errors
    /// Returns `Err` if the root environment already binds `name` as const.
    pub fn def(&mut self, name: &str, value: Value) -> Result<()> {
        let sym = self.intern(name);
        let Value::Symbol(h) = sym else {
            unreachable!("intern always returns a Symbol")
        };
        let env = self.root_env;
        let id = self.id;
        match self.heap.get_mut(env)? {
            HeapObject::Environment(e) => e.define(h, value, false, id),
            _ => unreachable!("root_env always addresses an Environment"),
        }
    }

    /// Define a constant global binding (`defconst`); later `set!` attempts fail.
    ///
    /// # Errors
    /// Returns `Err` if binding fails.
    pub fn defconst(&mut self, name: &str, value: Value) -> Result<()> {
        let sym = self.intern(name);
        let Value::Symbol(h) = sym else {
            unreachable!("intern always returns a Symbol")
        };
        let env = self.root_env;
        let id = self.id;
        match self.heap.get_mut(env)? {
            HeapObject::Environment(e) => e.define(h, value, true, id),
            _ => unreachable!("root_env always addresses an Environment"),
        }
    }

    /// Install a native (Rust-implemented) procedure as a global binding.
    ///
    /// # Errors
    /// Returns `Err` if binding fails.
    pub fn defn(&mut self, name: &'static str, func: NativeFn) -> Result<()> {
        let h = self.heap.alloc(HeapObject::NativeProcedure(NativeProcedure {
            name,
            func,
        }));
        self.def(name, Value::NativeProcedure(h))
    }

    // ---- evaluation ------------------------------------------------------------

    /// Evaluate `expr` in `env` (or the global environment, if `env` is `None`).
    ///
    /// # Errors
    /// Propagates any `LonaError` raised during evaluation.
    pub fn eval(&mut self, expr: Value, env: Option<Handle>) -> Result<Value> {
        crate::eval::eval(self, expr, env.unwrap_or(self.root_env), 0)
    }

    /// Read and evaluate every top-level form in `src`, returning the value
    /// of the last one (or `undefined` for an empty script).
    ///
    /// # Errors
    /// Propagates reader and evaluator errors.
    pub fn load_str(&mut self, path: &str, src: &str) -> Result<Value> {
        let forms = crate::reader::read_all(self, path, src)?;
        let mut result = Value::Undefined;
        for form in forms {
            result = self.eval(form, None)?;
        }
        Ok(result)
    }

    /// Call a procedure or native procedure value with the given arguments.
    ///
    /// # Errors
    /// Returns `Err` if `callee` is not callable, or propagates the call's error.
    pub fn call(&mut self, callee: Value, args: &[Value]) -> Result<Value> {
        crate::eval::call_value(self, callee, args, 0)
    }

    /// Call `callee`, converting any error (including an uncaught user
    /// throw) into `Ok(None)` plus the error, matching `lisp_try`'s
    /// "never unwind past this point" contract for host embedders.
    pub fn try_call(&mut self, callee: Value, args: &[Value]) -> Result<Value> {
        self.call(callee, args)
    }

    // ---- stack (host ABI: `lisp_push`/`pop`/`top`/`exch`) ----------------------

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    #[must_use]
    pub fn top(&self) -> Option<Value> {
        self.stack.last().copied()
    }

    /// Swap the top two stack values.
    pub fn exch(&mut self) {
        let len = self.stack.len();
        if len >= 2 {
            self.stack.swap(len - 1, len - 2);
        }
    }

    /// Current stack depth, used by the evaluator to mark a rooting
    /// watermark before pushing in-flight call arguments (§4.3/§4.7).
    pub(crate) fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// The stack's contents from `base` to the top, without popping.
    pub(crate) fn stack_slice_from(&self, base: usize) -> &[Value] {
        &self.stack[base..]
    }

    /// Drop the stack back down to `base`, discarding everything above it.
    /// Used by the evaluator once in-flight call arguments it pushed for GC
    /// rooting are no longer needed.
    pub(crate) fn truncate_stack(&mut self, base: usize) {
        self.stack.truncate(base);
    }

    // ---- GC ----------------------------------------------------------------

    /// Roots: the explicit stack, the keep-alive set, the global environment,
    /// every interned symbol (symbols are permanent once interned), and
    /// every loaded source file (so error excerpts remain valid).
    fn roots(&self) -> Vec<Value> {
        let mut roots = Vec::with_capacity(
            self.stack.len() + self.keep_alive.len() + self.symbols.len() + self.source_files.len() + 1,
        );
        roots.extend_from_slice(&self.stack);
        roots.extend_from_slice(&self.keep_alive);
        roots.push(Value::Environment(self.root_env));
        roots.extend(self.symbols.values().map(|h| Value::Symbol(*h)));
        roots.extend(self.source_files.iter().map(|h| Value::SourceFile(*h)));
        roots.push(Value::Port(self.current_input));
        roots.push(Value::Port(self.current_output));
        roots
    }

    /// Force an immediate mark-and-sweep collection.
    pub fn collect_garbage(&mut self) {
        let roots = self.roots();
        debug!(roots = roots.len(), "running gc");
        crate::heap::gc::collect(&mut self.heap, roots);
        self.allocations_since_gc = 0;
    }

    /// Pin `value` alive until a matching `release_alive`, regardless of
    /// reachability from the stack or environments.
    pub fn keep_alive(&mut self, value: Value) {
        self.keep_alive.push(value);
    }

    /// Release the most recent pin made with `keep_alive` for an
    /// identity-equal value, if one is present.
    pub fn release_alive(&mut self, value: Value) {
        if let Some(pos) = self
            .keep_alive
            .iter()
            .rposition(|v| self.values_identical(*v, value))
        {
            self.keep_alive.remove(pos);
        }
    }

    // ---- host data (`lisp_vm_set_client`/`client`) ------------------------------

    pub fn set_host_data<T: Any>(&mut self, data: T) {
        self.host_data = Some(Box::new(data));
    }

    #[must_use]
    pub fn host_data<T: Any>(&self) -> Option<&T> {
        self.host_data.as_ref().and_then(|b| b.downcast_ref())
    }

    pub fn host_data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.host_data.as_mut().and_then(|b| b.downcast_mut())
    }

    // ---- printing ------------------------------------------------------------

    /// Render `value` to its reparseable textual form.
    ///
    /// # Errors
    /// Returns `Err` if `value` addresses a dangling handle.
    pub fn stringify(&self, value: Value) -> Result<String> {
        crate::value::print_value(&self.heap, value)
    }

    // ---- equality --------------------------------------------------------------

    /// Identity comparison: immediates compare by variant, heap values by
    /// handle. Used where the language's `eq?` applies (symbols, and as the
    /// fast path before a deeper `equal?`).
    #[must_use]
    pub fn values_identical(&self, a: Value, b: Value) -> bool {
        crate::value_eq::identical(a, b)
    }

    /// Structural comparison: strings and buffers by content, everything
    /// else by identity, per the language's `equal?`.
    ///
    /// # Errors
    /// Returns `Err` if either value addresses a dangling handle.
    pub fn values_equal(&self, a: Value, b: Value) -> Result<bool> {
        crate::value_eq::equal(&self.heap, a, b)
    }

    // ---- ports / streams -----------------------------------------------------

    /// Wrap an in-memory byte buffer as a new port, backing the
    /// `open-output-string`/`open-input-string` primitives.
    #[must_use]
    pub fn open_memory_port(&mut self, initial: Vec<u8>, mode: PortMode) -> Value {
        let stream_h = self.alloc(HeapObject::Stream(StreamObject::new(Box::new(
            crate::stream::MemoryStream::from_bytes(initial),
        ))));
        let port_h = self.alloc(HeapObject::Port(Port::new(stream_h, mode)));
        Value::Port(port_h)
    }

    /// The full backing buffer of a memory-stream port (`get-output-string`).
    ///
    /// # Errors
    /// Returns `Err` if `port` is not a port, or its stream keeps no
    /// whole-buffer representation (e.g. a file or standard stream).
    pub fn port_memory_contents(&self, port: Handle) -> Result<Vec<u8>> {
        let stream_h = self.port_stream_handle(port)?;
        let HeapObject::Stream(s) = self.heap.get(stream_h)? else {
            unreachable!()
        };
        s.ops.contents().ok_or_else(|| {
            LonaError::io("this port's stream keeps no addressable buffer")
        })
    }

    fn port_stream_handle(&self, port: Handle) -> Result<Handle> {
        match self.heap.get(port)? {
            HeapObject::Port(p) => Ok(p.stream),
            other => Err(LonaError::type_error(format!(
                "expected a port, got {}",
                other.type_name()
            ))),
        }
    }

    /// Write `buf` straight through `port`'s underlying stream.
    ///
    /// # Errors
    /// Returns `Err` if `port` is not a port, or the underlying stream
    /// rejects the write.
    pub fn port_write(&mut self, port: Handle, buf: &[u8]) -> Result<usize> {
        let stream_h = self.port_stream_handle(port)?;
        let (port_obj, stream_obj) = self.heap.get_two_mut(port, stream_h)?;
        let HeapObject::Port(p) = port_obj else {
            unreachable!()
        };
        let HeapObject::Stream(s) = stream_obj else {
            unreachable!()
        };
        p.write(buf, s.ops.as_mut())
    }

    /// Read a single byte from `port`'s buffer, filling it from the
    /// underlying stream as needed.
    ///
    /// # Errors
    /// Returns `Err` if `port` is not a port, or the underlying stream
    /// errors on fill.
    pub fn port_read_byte(&mut self, port: Handle) -> Result<Option<u8>> {
        let stream_h = self.port_stream_handle(port)?;
        let (port_obj, stream_obj) = self.heap.get_two_mut(port, stream_h)?;
        let HeapObject::Port(p) = port_obj else {
            unreachable!()
        };
        let HeapObject::Stream(s) = stream_obj else {
            unreachable!()
        };
        p.read_byte(s.ops.as_mut())
    }

    /// Peek the next byte `port` would yield, without consuming it.
    ///
    /// # Errors
    /// Returns `Err` if `port` is not a port, or the underlying stream
    /// errors on fill.
    pub fn port_peek_byte(&mut self, port: Handle) -> Result<Option<u8>> {
        let stream_h = self.port_stream_handle(port)?;
        let (port_obj, stream_obj) = self.heap.get_two_mut(port, stream_h)?;
        let HeapObject::Port(p) = port_obj else {
            unreachable!()
        };
        let HeapObject::Stream(s) = stream_obj else {
            unreachable!()
        };
        p.peek_byte(s.ops.as_mut())
    }

    /// Close `port` and its underlying stream. Idempotent.
    ///
    /// # Errors
    /// Returns `Err` if `port` is not a port.
    pub fn port_close(&mut self, port: Handle) -> Result<()> {
        let stream_h = self.port_stream_handle(port)?;
        let (port_obj, stream_obj) = self.heap.get_two_mut(port, stream_h)?;
        let HeapObject::Port(p) = port_obj else {
            unreachable!()
        };
        let HeapObject::Stream(s) = stream_obj else {
            unreachable!()
        };
        p.close(s.ops.as_mut());
        Ok(())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
