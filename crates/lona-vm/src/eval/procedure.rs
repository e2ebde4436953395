// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Binding a procedure's lambda list against call arguments (§4.3):
//! `&label` names the procedure itself for self-reference, `&optional`
//! introduces arguments that default to `false`, `&rest` collects the
//! remainder into a list, `&key` binds by an assoc-style keyword-symbol
//! lookup over the remaining actuals (also defaulting to `false`).

use crate::error::{LonaError, Result};
use crate::handle::Handle;
use crate::value::Value;
use crate::value::object::HeapObject;
use crate::vm::Vm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Required,
    Optional,
    Rest,
    Key,
    Label,
}

/// Create a fresh call-frame environment for `proc`, binding `args` against
/// its lambda list, and return that environment's handle.
///
/// # Errors
/// Returns `Err` on arity mismatch (too few required arguments, or a
/// non-`&rest`/`&key` lambda list given too many).
pub fn bind_call_frame(vm: &mut Vm, proc_handle: Handle, args: &[Value]) -> Result<Handle> {
    let (env, formals, label, name_for_errors) = {
        let HeapObject::Procedure(p) | HeapObject::Macro(p) = vm.heap().get(proc_handle)? else {
            return Err(LonaError::internal("bind_call_frame on a non-procedure"));
        };
        (p.env, p.formals, p.label, proc_handle.index())
    };
    let frame = vm.new_environment(Some(env));
    if let Some(label_sym) = label {
        vm.define_in(frame, label_sym, Value::Procedure(proc_handle))?;
    }

    let mut mode = Mode::Required;
    let mut cursor = formals;
    let mut arg_index = 0usize;
    loop {
        let (sym_value, rest) = match cursor {
            Value::Nil => break,
            Value::Pair(h) => {
                let HeapObject::Pair(pair) = vm.heap().get(h)? else {
                    unreachable!()
                };
                (pair.car, pair.cdr)
            }
            other => return Err(LonaError::internal(format!("malformed lambda list tail: {other}"))),
        };
        cursor = rest;

        if let Some(name) = vm.symbol_name(sym_value) {
            match name {
                "&optional" => {
                    mode = Mode::Optional;
                    continue;
                }
                "&rest" => {
                    mode = Mode::Rest;
                    continue;
                }
                "&key" => {
                    mode = Mode::Key;
                    continue;
                }
                "&label" => {
                    mode = Mode::Label;
                    continue;
                }
                _ => {}
            }
        }

        match mode {
            Mode::Required => {
                let value = args.get(arg_index).copied().ok_or_else(|| {
                    LonaError::arity(format!("#<procedure {name_for_errors}>"), "too few arguments")
                })?;
                arg_index += 1;
                bind_symbol(vm, frame, sym_value, value)?;
            }
            Mode::Optional => {
                let value = args.get(arg_index).copied().unwrap_or(Value::False);
                arg_index += 1;
                bind_symbol(vm, frame, sym_value, value)?;
            }
            Mode::Rest => {
                let rest_list = build_list(vm, &args[arg_index.min(args.len())..]);
                arg_index = args.len();
                bind_symbol(vm, frame, sym_value, rest_list)?;
            }
            Mode::Key => {
                // Bound by an assoc-style scan over the remaining actuals for a
                // pair whose car names this formal, not by position: the
                // matching argument is not consumed and `arg_index` is left
                // untouched, so later required/optional/rest formals still see
                // the full remaining actuals list.
                let value = find_keyword_arg(vm, &args[arg_index.min(args.len())..], sym_value)?
                    .unwrap_or(Value::False);
                bind_symbol(vm, frame, sym_value, value)?;
            }
            Mode::Label => {
                // `&label self` binds `self` to the procedure itself, for
                // self-reference inside an anonymous lambda; it consumes no
                // actual argument.
                bind_symbol(vm, frame, sym_value, Value::Procedure(proc_handle))?;
            }
        }
    }

    if mode == Mode::Required && arg_index < args.len() {
        return Err(LonaError::arity(
            format!("#<procedure {name_for_errors}>"),
            "too many arguments",
        ));
    }

    Ok(frame)
}

/// Scan `actuals` for a pair whose `car` is the same symbol (by handle
/// identity) as `formal`, returning its `cdr`. Mirrors the original
/// `bind_args`' keyword-argument lookup: the caller passes `&key` arguments
/// as `(cons 'name value)` pairs mixed in with the ordinary positional
/// actuals, rather than by position.
fn find_keyword_arg(vm: &Vm, actuals: &[Value], formal: Value) -> Result<Option<Value>> {
    let Value::Symbol(target) = formal else {
        return Ok(None);
    };
    for actual in actuals {
        if let Value::Pair(h) = *actual {
            let HeapObject::Pair(pair) = vm.heap().get(h)? else {
                unreachable!()
            };
            if let Value::Symbol(car_sym) = pair.car {
                if car_sym == target {
                    return Ok(Some(pair.cdr));
                }
            }
        }
    }
    Ok(None)
}

fn bind_symbol(vm: &mut Vm, frame: Handle, sym: Value, value: Value) -> Result<()> {
    let Value::Symbol(h) = sym else {
        return Err(LonaError::type_error("lambda list entry must be a symbol"));
    };
    vm.define_in(frame, h, value)
}

fn build_list(vm: &mut Vm, items: &[Value]) -> Value {
    let mut result = Value::Nil;
    for item in items.iter().rev() {
        result = vm.cons(*item, result);
    }
    result
}

/// Fully apply a procedure or macro value to `args`, running its body to
/// completion and returning the result (no trampoline handback). Used for
/// macro expansion, where the caller needs the expanded form as data before
/// it can continue the outer trampoline loop.
///
/// # Errors
/// Propagates binding and body-evaluation errors.
pub fn apply_to_value(vm: &mut Vm, proc_handle: Handle, args: &[Value], depth: usize) -> Result<Value> {
    let frame = bind_call_frame(vm, proc_handle, args)?;
    let body = {
        let HeapObject::Procedure(p) | HeapObject::Macro(p) = vm.heap().get(proc_handle)? else {
            return Err(LonaError::internal("apply_to_value on a non-procedure"));
        };
        p.body
    };
    let mut result = Value::Undefined;
    let mut cursor = body;
    loop {
        match cursor {
            Value::Nil => break,
            Value::Pair(h) => {
                let HeapObject::Pair(pair) = vm.heap().get(h)? else {
                    unreachable!()
                };
                let (car, cdr) = (pair.car, pair.cdr);
                result = crate::eval::eval(vm, car, frame, depth + 1)?;
                if super::special_forms::is_return_marker(vm, result)? {
                    let Value::Pair(rh) = result else { unreachable!() };
                    let HeapObject::Pair(rp) = vm.heap().get(rh)? else {
                        unreachable!()
                    };
                    result = rp.car;
                    break;
                }
                cursor = cdr;
            }
            other => return Err(LonaError::type_error(format!("malformed procedure body: {other}"))),
        }
    }
    Ok(result)
}
