// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Heap object payloads: everything a non-immediate [`Value`](super::Value)
//! variant's [`Handle`](crate::handle::Handle) addresses.
//!
//! Grounded on the teacher's `value/heap.rs` object shapes (`HeapString`,
//! `Pair`, `HeapTuple`, `HeapMap`), adapted from fixed-size `#[repr(C)]`
//! process-heap records to owned, growable Rust types backed by the VM's
//! single pooled heap.

use crate::error::Result;
use crate::handle::{Handle, VmId};
use crate::port::Port;
use crate::stream::StreamObject;
use crate::value::Value;

pub use crate::env::Environment;

/// A byte range in a loaded script, attached to the pair it parsed into.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceMapping {
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub hit_count: u32,
}

/// A back-pointer from a pair to its entry in the owning file's mapping
/// table, rather than an inline copy: the hit counter lives in exactly one
/// place so coverage tracking and error excerpts see the same value.
#[derive(Debug, Clone, Copy)]
pub struct MappingRef {
    pub file: Handle,
    pub index: u32,
}

/// A loaded script: `Value::SourceFile`'s heap payload.
#[derive(Debug)]
pub struct SourceFile {
    pub path: String,
    pub mappings: Vec<SourceMapping>,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: String) -> Self {
        Self {
            path,
            mappings: Vec::new(),
        }
    }

    /// Record a new mapping, returning its index within this file's table.
    /// The caller (which already knows this file's own handle) combines the
    /// index with that handle to build the `Pair`'s `MappingRef`.
    pub fn push_mapping(&mut self, start: u32, end: u32, line: u32) -> u32 {
        let index = self.mappings.len() as u32;
        self.mappings.push(SourceMapping {
            start,
            end,
            line,
            hit_count: 0,
        });
        index
    }
}

/// A cons cell: `Value::Pair`'s heap payload.
#[derive(Debug, Clone, Copy)]
pub struct Pair {
    pub car: Value,
    pub cdr: Value,
    pub mapping: Option<MappingRef>,
    /// True if this pair was parsed/created as the head of a proper list
    /// (every `cdr` chain ends in `nil`), used by the printer to decide
    /// between list and dotted-pair notation.
    pub is_list: bool,
    /// Set by the evaluator when this pair is being evaluated in tail
    /// position, so the trampoline can loop instead of recursing.
    pub tail_call: bool,
    /// Set when this pair is the target of an explicit `(return ...)`.
    pub is_return: bool,
    /// The VM that allocated this pair; `set-car!`/`set-cdr!` refuse to
    /// write through a handle owned by a different VM (§5, §8 property 6).
    pub owner: VmId,
}

impl Pair {
    #[must_use]
    pub const fn new(car: Value, cdr: Value, owner: VmId) -> Self {
        Self {
            car,
            cdr,
            mapping: None,
            is_list: false,
            tail_call: false,
            is_return: false,
            owner,
        }
    }
}

/// A UTF-8 string: `Value::String`'s heap payload.
#[derive(Debug, Clone)]
pub struct HeapString {
    pub bytes: Vec<u8>,
    pub hash: u64,
    pub immutable: bool,
}

impl HeapString {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        let s: String = s.into();
        let hash = fnv1a(s.as_bytes());
        Self {
            bytes: s.into_bytes(),
            hash,
            immutable: false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        // bytes are only ever produced from a `String`, or from UTF-8
        // validated substring/concat primitives.
        std::str::from_utf8(&self.bytes).unwrap_or("")
    }
}

/// An interned symbol: `Value::Symbol`'s heap payload. Symbols compare by
/// handle identity, never by name, once interned.
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub name: HeapString,
    pub is_const: bool,
    pub is_primitive: bool,
    pub is_special: bool,
}

impl SymbolData {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: HeapString::new(name),
            is_const: false,
            is_primitive: false,
            is_special: false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }
}

/// A growable array: `Value::Array`'s heap payload.
#[derive(Debug, Clone)]
pub struct HeapArray {
    pub items: Vec<Value>,
    pub immutable: bool,
    /// The VM that allocated this array; see `Pair::owner`.
    pub owner: VmId,
}

/// A growable byte buffer: `Value::Buffer`'s heap payload.
#[derive(Debug, Clone, Default)]
pub struct HeapBuffer {
    pub bytes: Vec<u8>,
    pub immutable: bool,
}

/// One slot in a dictionary's insertion-ordered entry list. `value: None`
/// marks a removed key: it keeps later entries' positions stable and is
/// skipped on iteration and lookup.
#[derive(Debug, Clone, Copy)]
pub struct DictEntry {
    pub key: Value,
    pub value: Option<Value>,
}

/// An ordered, symbol- or string-keyed dictionary: `Value::Dictionary`'s
/// heap payload. Below `HASH_INDEX_THRESHOLD` entries, lookup is linear
/// identity/content comparison; above it, a hash index is built lazily.
#[derive(Debug)]
pub struct HeapDictionary {
    pub entries: Vec<DictEntry>,
    pub immutable: bool,
    /// The VM that allocated this dictionary; see `Pair::owner`.
    pub owner: VmId,
}

impl HeapDictionary {
    const HASH_INDEX_THRESHOLD: usize = 8;

    #[must_use]
    pub fn new(owner: VmId) -> Self {
        Self {
            entries: Vec::new(),
            immutable: false,
            owner,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn should_index(&self) -> bool {
        self.entries.len() > Self::HASH_INDEX_THRESHOLD
    }
}

/// A closure or macro body: `Value::Procedure`/`Value::Macro`'s heap payload.
#[derive(Debug, Clone, Copy)]
pub struct Procedure {
    /// Environment captured at definition time (the closure).
    pub env: Handle,
    /// Lambda list: a list of symbols and `&optional`/`&rest`/`&key`
    /// modifier markers, per §4.3.
    pub formals: Value,
    /// Body forms, evaluated in sequence with the last in tail position.
    pub body: Value,
    /// True if defined with `defmethod`: callable via dot-call syntax.
    pub is_method: bool,
    /// True if call tracing was requested for this procedure (debugger aid).
    pub tracing: bool,
    /// The `&label` name, if the lambda list bound one for self-reference.
    pub label: Option<Handle>,
}

/// A built-in procedure implemented in Rust: `Value::NativeProcedure`'s
/// heap payload.
pub type NativeFn = fn(&mut crate::vm::Vm, &[Value]) -> Result<Value>;

#[derive(Clone, Copy)]
pub struct NativeProcedure {
    pub name: &'static str,
    pub func: NativeFn,
}

impl std::fmt::Debug for NativeProcedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeProcedure")
            .field("name", &self.name)
            .finish()
    }
}

/// A host-defined value opaque to ordinary Lona code: `Value::ExtensionObject`'s
/// heap payload. Extension classes register a finalizer and a GC marker so
/// the collector can trace values the host keeps inside its own data.
pub trait ExtensionClass: std::fmt::Debug {
    fn class_name(&self) -> &'static str;
    fn finalize(&mut self) {}
    fn mark_roots(&self, _push: &mut dyn FnMut(Value)) {}
}

#[derive(Debug)]
pub struct ExtensionObject {
    pub inner: Box<dyn ExtensionClass>,
}

/// Every non-immediate kind a [`Handle`] can address.
#[derive(Debug)]
pub enum HeapObject {
    String(HeapString),
    Symbol(SymbolData),
    Pair(Pair),
    Array(HeapArray),
    Dictionary(HeapDictionary),
    Buffer(HeapBuffer),
    Environment(Environment),
    Procedure(Procedure),
    NativeProcedure(NativeProcedure),
    /// Macros share `Procedure`'s shape; only the `Value` tag that points
    /// here differs (`Value::Macro` instead of `Value::Procedure`).
    Macro(Procedure),
    Port(Port),
    Stream(StreamObject),
    ExtensionObject(ExtensionObject),
    SourceFile(SourceFile),
}

impl HeapObject {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Pair(_) => "pair",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
            Self::Buffer(_) => "buffer",
            Self::Environment(_) => "environment",
            Self::Procedure(_) => "procedure",
            Self::NativeProcedure(_) => "native-procedure",
            Self::Macro(_) => "macro",
            Self::Port(_) => "port",
            Self::Stream(_) => "stream",
            Self::ExtensionObject(_) => "extension-object",
            Self::SourceFile(_) => "source-file",
        }
    }
}

/// FNV-1a, matching the hash the teacher's `value/heap.rs` uses for interned
/// string/symbol content so identical content always lands in the same
/// bucket once a dictionary's hash index is built.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}
