// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! I/O primitives. `display` prints a human-readable form (strings without
//! quotes); `write` prints the reparseable form §6 defines. Both write
//! through the current output port (`*stdout*` unless `with-output` has
//! rebound it) via `Vm::port_write`, so redirecting output is a matter of
//! changing which `Port`/`Stream` pair is current, not which code path runs.

use crate::error::{LonaError, Result};
use crate::handle::Handle;
use crate::port::PortMode;
use crate::value::Value;
use crate::value::object::HeapObject;
use crate::vm::Vm;

/// An optional trailing port argument, defaulting to the VM's current
/// input/output port. Shared by every I/O primitive that takes one.
fn port_arg(vm: &Vm, args: &[Value], index: usize, default: Handle) -> Result<Handle> {
    match args.get(index) {
        None => Ok(default),
        Some(Value::Port(h)) => Ok(*h),
        Some(other) => Err(LonaError::type_error(format!(
            "expected a port, got {}",
            other.type_name()
        ))),
    }
}

pub fn write(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("write", "expected at least one argument"))?;
    let port = port_arg(vm, args, 1, vm.current_output())?;
    let text = vm.stringify(v)?;
    vm.port_write(port, text.as_bytes())?;
    Ok(Value::Undefined)
}

pub fn display(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("display", "expected at least one argument"))?;
    let port = port_arg(vm, args, 1, vm.current_output())?;
    let text = match v {
        Value::String(h) => match vm.heap().get(h)? {
            HeapObject::String(s) => s.as_str().to_string(),
            _ => unreachable!(),
        },
        other => vm.stringify(other)?,
    };
    vm.port_write(port, text.as_bytes())?;
    Ok(Value::Undefined)
}

pub fn newline(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let port = port_arg(vm, args, 0, vm.current_output())?;
    vm.port_write(port, b"\n")?;
    Ok(Value::Undefined)
}

/// Read a single character from a port, or `*eof*` at end of stream.
pub fn read_char(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let port = port_arg(vm, args, 0, vm.current_input())?;
    match vm.port_read_byte(port)? {
        Some(b) => Ok(vm.make_string((b as char).to_string())),
        None => Ok(Value::Eof),
    }
}

/// Peek the next character from a port without consuming it, or `*eof*`.
pub fn peek_char(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let port = port_arg(vm, args, 0, vm.current_input())?;
    match vm.port_peek_byte(port)? {
        Some(b) => Ok(vm.make_string((b as char).to_string())),
        None => Ok(Value::Eof),
    }
}

/// True if a byte is currently available on a port without blocking.
pub fn ready_p(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let port = port_arg(vm, args, 0, vm.current_input())?;
    Ok(Value::bool(vm.port_peek_byte(port)?.is_some()))
}

pub fn close_port(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("close", "expected exactly one argument"))?;
    let Value::Port(h) = v else {
        return Err(LonaError::type_error(format!("close: expected a port, got {}", v.type_name())));
    };
    vm.port_close(h)?;
    Ok(Value::Undefined)
}

pub fn read_from_string(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("read-from-string", "expected exactly one argument"))?;
    let text = match v {
        Value::String(h) => match vm.heap().get(h)? {
            HeapObject::String(s) => s.as_str().to_string(),
            _ => unreachable!(),
        },
        other => return Err(LonaError::type_error(format!("read-from-string: expected a string, got {}", other.type_name()))),
    };
    let file = vm.new_source_file("<read-from-string>".to_string());
    match crate::reader::read_one(vm, file, &text)? {
        Some(value) => Ok(value),
        None => Ok(Value::Eof),
    }
}

/// Open a fresh, empty in-memory port for `display`/`write` to accumulate
/// into. Paired with `get-output-string` to pull the result back out.
pub fn open_output_string(vm: &mut Vm, _args: &[Value]) -> Result<Value> {
    Ok(vm.open_memory_port(Vec::new(), PortMode::Write))
}

/// Open an in-memory port pre-loaded with a string's bytes, for `read`/
/// `read-char` to consume.
pub fn open_input_string(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("open-input-string", "expected exactly one argument"))?;
    let text = match v {
        Value::String(h) => match vm.heap().get(h)? {
            HeapObject::String(s) => s.as_str().to_string(),
            _ => unreachable!(),
        },
        other => {
            return Err(LonaError::type_error(format!(
                "open-input-string: expected a string, got {}",
                other.type_name()
            )));
        }
    };
    Ok(vm.open_memory_port(text.into_bytes(), PortMode::Read))
}

/// Pull the bytes accumulated so far out of a memory port opened by
/// `open-output-string`, as a string.
pub fn get_output_string(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("get-output-string", "expected exactly one argument"))?;
    let Value::Port(h) = v else {
        return Err(LonaError::type_error(format!(
            "get-output-string: expected a port, got {}",
            v.type_name()
        )));
    };
    let bytes = vm.port_memory_contents(h)?;
    let text = String::from_utf8(bytes)
        .map_err(|_| LonaError::io("get-output-string: port does not hold valid UTF-8"))?;
    Ok(vm.make_string(text))
}

/// Read one value from a port, or `*eof*` once it is exhausted. Works by
/// draining the port's unread bytes and parsing a single form from them,
/// the same technique `read-from-string` uses on an already-complete string.
pub fn read(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let port = port_arg(vm, args, 0, vm.current_input())?;
    let mut bytes = Vec::new();
    while let Some(b) = vm.port_read_byte(port)? {
        bytes.push(b);
    }
    if bytes.is_empty() {
        return Ok(Value::Eof);
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| LonaError::io("read: port does not hold valid UTF-8"))?;
    let file = vm.new_source_file("<read>".to_string());
    match crate::reader::read_one(vm, file, &text)? {
        Some(value) => Ok(value),
        None => Ok(Value::Eof),
    }
}

pub fn install(vm: &mut Vm) -> Result<()> {
    vm.defn("write", write)?;
    vm.defn("display", display)?;
    vm.defn("newline", newline)?;
    vm.defn("read-char", read_char)?;
    vm.defn("peek-char", peek_char)?;
    vm.defn("ready?", ready_p)?;
    vm.defn("close", close_port)?;
    vm.defn("read-from-string", read_from_string)?;
    vm.defn("open-output-string", open_output_string)?;
    vm.defn("open-input-string", open_input_string)?;
    vm.defn("get-output-string", get_output_string)?;
    vm.defn("read", read)?;
    Ok(())
}
