// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! String and buffer primitives. Strings are UTF-8; indices and lengths in
//! `substring`/`string-ref` count Unicode scalar values, not bytes, so a
//! substring never splits a multi-byte character (§8 property: UTF-8
//! substring discipline).

use crate::error::{LonaError, Result};
use crate::value::Value;
use crate::value::object::HeapObject;
use crate::vm::Vm;

fn as_str<'a>(vm: &'a Vm, v: Value, procedure: &str) -> Result<&'a str> {
    match v {
        Value::String(h) => match vm.heap().get(h)? {
            HeapObject::String(s) => Ok(s.as_str()),
            _ => unreachable!(),
        },
        other => Err(LonaError::type_error(format!(
            "{procedure}: expected a string, got {}",
            other.type_name()
        ))),
    }
}

pub fn string_append(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for a in args {
        out.push_str(as_str(vm, *a, "string-append")?);
    }
    Ok(vm.make_string(out))
}

pub fn string_length(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("string-length", "expected exactly one argument"))?;
    let n = as_str(vm, v, "string-length")?.chars().count();
    Ok(Value::Number(n as f64))
}

pub fn substring(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [s, start, end] = args else {
        return Err(LonaError::arity("substring", "expected exactly three arguments"));
    };
    let text = as_str(vm, *s, "substring")?;
    let (Value::Number(start), Value::Number(end)) = (*start, *end) else {
        return Err(LonaError::type_error("substring: bounds must be numbers"));
    };
    let chars: Vec<char> = text.chars().collect();
    let (start, end) = (start as usize, end as usize);
    if start > end || end > chars.len() {
        return Err(LonaError::range("substring: out of range"));
    }
    let out: String = chars[start..end].iter().collect();
    Ok(vm.make_string(out))
}

pub fn string_ref(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [s, index] = args else {
        return Err(LonaError::arity("string-ref", "expected exactly two arguments"));
    };
    let text = as_str(vm, *s, "string-ref")?;
    let Value::Number(i) = *index else {
        return Err(LonaError::type_error("string-ref: index must be a number"));
    };
    let c = text
        .chars()
        .nth(i as usize)
        .ok_or_else(|| LonaError::range("string-ref: index out of range"))?;
    Ok(vm.make_string(c.to_string()))
}

pub fn string_to_symbol(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("string->symbol", "expected exactly one argument"))?;
    let name = as_str(vm, v, "string->symbol")?.to_string();
    Ok(vm.intern(&name))
}

pub fn symbol_to_string(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("symbol->string", "expected exactly one argument"))?;
    let name = vm
        .symbol_name(v)
        .ok_or_else(|| LonaError::type_error("symbol->string: expected a symbol"))?
        .to_string();
    Ok(vm.make_string(name))
}

pub fn number_to_string(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("number->string", "expected exactly one argument"))?;
    let Value::Number(_) = v else {
        return Err(LonaError::type_error("number->string: expected a number"));
    };
    let text = vm.stringify(v)?;
    Ok(vm.make_string(text))
}

pub fn string_to_number(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("string->number", "expected exactly one argument"))?;
    let text = as_str(vm, v, "string->number")?;
    text.trim()
        .parse::<f64>()
        .map(Value::Number)
        .map_err(|_| LonaError::type_error(format!("string->number: not a number: {text}")))
}

/// Variadic display-string concatenation: strings contribute their raw
/// content, every other value goes through the reparseable printer. Used by
/// the reader's string-interpolation expansion (`"a\(x)b"` → `(concat "a"
/// (evalq x) "b")`), but callable directly as an ordinary primitive too.
pub fn concat(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let mut out = String::new();
    for a in args {
        match a {
            Value::String(h) => {
                let HeapObject::String(s) = vm.heap().get(*h)? else {
                    unreachable!()
                };
                out.push_str(s.as_str());
            }
            other => out.push_str(&vm.stringify(*other)?),
        }
    }
    Ok(vm.make_string(out))
}

pub fn install(vm: &mut Vm) -> Result<()> {
    vm.defn("string-append", string_append)?;
    vm.defn("string-length", string_length)?;
    vm.defn("substring", substring)?;
    vm.defn("string-ref", string_ref)?;
    vm.defn("string->symbol", string_to_symbol)?;
    vm.defn("symbol->string", symbol_to_string)?;
    vm.defn("number->string", number_to_string)?;
    vm.defn("string->number", string_to_number)?;
    vm.defn("concat", concat)?;
    Ok(())
}
