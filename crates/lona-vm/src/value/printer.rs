// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The reparseable printer (§6): every value prints to text that, read back,
//! produces an `equal?` value. Numbers print with the shortest `%.15g`-style
//! representation that round-trips, falling back to 17 significant digits
//! when 15 is lossy.

use super::Value;
use super::object::HeapObject;
use crate::heap::Heap;

/// Print `value` to its reparseable textual form.
///
/// # Errors
/// Returns `Err` if `value` addresses a dangling handle (an internal
/// invariant violation).
pub fn print_value(heap: &Heap, value: Value) -> crate::error::Result<String> {
    let mut out = String::new();
    write_value(heap, value, &mut out)?;
    Ok(out)
}

fn write_value(heap: &Heap, value: Value, out: &mut String) -> crate::error::Result<()> {
    match value {
        Value::Nil => out.push_str("nil"),
        Value::True => out.push_str("true"),
        Value::False => out.push_str("false"),
        Value::Undefined => out.push_str("undefined"),
        Value::Eof => out.push_str("*eof*"),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::String(h) => {
            let HeapObject::String(s) = heap.get(h)? else {
                unreachable!("String value must address a HeapString")
            };
            write_quoted_string(s.as_str(), out);
        }
        Value::Symbol(h) => {
            let HeapObject::Symbol(s) = heap.get(h)? else {
                unreachable!("Symbol value must address a SymbolData")
            };
            out.push_str(s.as_str());
        }
        Value::Pair(h) => write_pair(heap, h, out)?,
        Value::Array(h) => {
            let HeapObject::Array(a) = heap.get(h)? else {
                unreachable!("Array value must address a HeapArray")
            };
            out.push_str("#(");
            for (i, item) in a.items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(heap, *item, out)?;
            }
            out.push(')');
        }
        Value::Dictionary(h) => {
            let HeapObject::Dictionary(d) = heap.get(h)? else {
                unreachable!("Dictionary value must address a HeapDictionary")
            };
            out.push_str("##[");
            let mut first = true;
            for entry in &d.entries {
                let Some(v) = entry.value else { continue };
                if !first {
                    out.push(' ');
                }
                first = false;
                write_value(heap, entry.key, out)?;
                out.push(' ');
                write_value(heap, v, out)?;
            }
            out.push(']');
        }
        Value::Buffer(h) => {
            let HeapObject::Buffer(b) = heap.get(h)? else {
                unreachable!("Buffer value must address a HeapBuffer")
            };
            out.push_str("#x\"");
            for byte in &b.bytes {
                out.push_str(&format!("{byte:02x}"));
            }
            out.push('"');
        }
        Value::Environment(_) => out.push_str("#<environment>"),
        Value::Procedure(_) => out.push_str("#<procedure>"),
        Value::NativeProcedure(h) => {
            if let HeapObject::NativeProcedure(np) = heap.get(h)? {
                out.push_str(&format!("#<native-procedure {}>", np.name));
            }
        }
        Value::Macro(_) => out.push_str("#<macro>"),
        Value::Port(_) => out.push_str("#<port>"),
        Value::Stream(_) => out.push_str("#<stream>"),
        Value::ExtensionObject(h) => {
            if let HeapObject::ExtensionObject(ext) = heap.get(h)? {
                out.push_str(&format!("#<{}>", ext.inner.class_name()));
            }
        }
        Value::SourceFile(h) => {
            if let HeapObject::SourceFile(f) = heap.get(h)? {
                out.push_str(&format!("#<source-file {}>", f.path));
            }
        }
    }
    Ok(())
}

/// If `handle` addresses a 2-element list headed by `quote`/`quasiquote`/
/// `unquote`/`unquote-splicing`, return the reader shorthand prefix and the
/// wrapped inner value, per §6's "quoted forms print with their reader
/// shorthand" rule.
fn quote_shorthand(
    heap: &Heap,
    handle: crate::handle::Handle,
) -> crate::error::Result<Option<(&'static str, Value)>> {
    let HeapObject::Pair(pair) = heap.get(handle)? else {
        unreachable!("Pair value must address a Pair")
    };
    let Value::Symbol(sym_handle) = pair.car else {
        return Ok(None);
    };
    let HeapObject::Symbol(sym) = heap.get(sym_handle)? else {
        unreachable!("Symbol value must address a SymbolData")
    };
    let prefix = match sym.as_str() {
        "quote" => "'",
        "quasiquote" => "`",
        "unquote" => ",",
        "unquote-splicing" => ",@",
        _ => return Ok(None),
    };
    let Value::Pair(inner_handle) = pair.cdr else {
        return Ok(None);
    };
    let HeapObject::Pair(inner) = heap.get(inner_handle)? else {
        unreachable!("Pair value must address a Pair")
    };
    if !matches!(inner.cdr, Value::Nil) {
        return Ok(None);
    }
    Ok(Some((prefix, inner.car)))
}

fn write_pair(heap: &Heap, handle: crate::handle::Handle, out: &mut String) -> crate::error::Result<()> {
    if let Some((prefix, inner)) = quote_shorthand(heap, handle)? {
        out.push_str(prefix);
        return write_value(heap, inner, out);
    }
    out.push('(');
    let mut current = Value::Pair(handle);
    let mut first = true;
    loop {
        match current {
            Value::Pair(h) => {
                let HeapObject::Pair(pair) = heap.get(h)? else {
                    unreachable!("Pair value must address a Pair")
                };
                if !first {
                    out.push(' ');
                }
                first = false;
                write_value(heap, pair.car, out)?;
                current = pair.cdr;
            }
            Value::Nil => break,
            other => {
                out.push_str(" . ");
                write_value(heap, other, out)?;
                break;
            }
        }
    }
    out.push(')');
    Ok(())
}

/// `%.15g`-equivalent formatting that falls back to 17 significant digits
/// when 15 does not round-trip, per §6's numeric printing rule.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == n.trunc() && n.abs() < 1e15 {
        return format!("{n:.0}");
    }
    let short = format!("{n:.15e}");
    if short.parse::<f64>() == Ok(n) {
        trim_exponential(n, 15)
    } else {
        trim_exponential(n, 17)
    }
}

fn trim_exponential(n: f64, precision: usize) -> String {
    let s = format!("{n:.*}", precision.saturating_sub(1));
    if let Ok(back) = s.parse::<f64>() {
        if back == n {
            return trim_trailing_zeros(&s);
        }
    }
    format!("{n}")
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    trimmed.strip_suffix('.').unwrap_or(trimmed).to_string()
}

fn write_quoted_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
}
