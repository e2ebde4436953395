// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The tree-walking evaluator (§4.3): a trampoline loop that re-enters
//! itself for tail positions instead of recursing, an explicit catch/throw
//! nonlocal escape riding on `Result<Value, LonaError>`'s `Throw` variant,
//! and macro expansion performed in the caller's lexical scope before the
//! expansion is evaluated.

mod procedure;
mod special_forms;

#[cfg(test)]
mod eval_test;

use crate::error::{LonaError, Result};
use crate::handle::Handle;
use crate::value::Value;
use crate::value::object::HeapObject;
use crate::vm::{Vm, MAX_EVAL_DEPTH};
use tracing::trace;

/// Evaluate `expr` in `env`. `depth` bounds non-tail recursion through this
/// function; tail positions loop instead of incrementing it.
///
/// # Errors
/// Propagates any error raised by a special form, procedure call, or an
/// unbound-symbol lookup.
pub fn eval(vm: &mut Vm, expr: Value, env: Handle, depth: usize) -> Result<Value> {
    if depth > MAX_EVAL_DEPTH {
        return Err(LonaError::internal("maximum evaluation depth exceeded"));
    }

    let mut expr = expr;
    let mut env = env;
    // Set once this invocation has tail-called into a `Procedure`'s body;
    // stays set across further trampoline iterations (tail self-calls,
    // nested `begin`/`if`/... tail positions all loop in this same frame).
    // It marks the single point, per completed procedure application, where
    // a `(return ...)` marker produced somewhere in the body gets unwrapped
    // back to a plain value rather than propagated further — see
    // `special_forms::is_return_marker` and the body-sequence walkers that
    // check it.
    let mut in_procedure_body = false;
    loop {
        match expr {
            Value::Symbol(h) => return lookup(vm, env, h),
            Value::Pair(h) => {
                let (car, cdr) = {
                    let HeapObject::Pair(pair) = vm.heap().get(h)? else {
                        unreachable!()
                    };
                    (pair.car, pair.cdr)
                };

                if let Value::Symbol(head_sym) = car {
                    if let Some(name) = vm.symbol_name(Value::Symbol(head_sym)).map(str::to_string) {
                        if let Some(form) = special_forms::lookup(&name) {
                            match form(vm, env, cdr, depth)? {
                                special_forms::Outcome::Value(v) => {
                                    return finish_value(vm, in_procedure_body, v);
                                }
                                special_forms::Outcome::TailEval(next_expr, next_env) => {
                                    expr = next_expr;
                                    env = next_env;
                                    continue;
                                }
                            }
                        }
                        if is_macro(vm, env, head_sym)? {
                            expr = expand_macro(vm, env, head_sym, cdr, depth)?;
                            continue;
                        }
                    }
                }

                let callee = eval(vm, car, env, depth + 1)?;
                let arg_base = vm.stack_len();
                let args = eval_list(vm, cdr, env, depth + 1, arg_base)?;
                if matches!(callee, Value::Procedure(_)) {
                    in_procedure_body = true;
                }
                let outcome = tail_call(vm, callee, &args, depth);
                vm.truncate_stack(arg_base);
                match outcome? {
                    special_forms::Outcome::Value(v) => {
                        return finish_value(vm, in_procedure_body, v);
                    }
                    special_forms::Outcome::TailEval(next_expr, next_env) => {
                        expr = next_expr;
                        env = next_env;
                        continue;
                    }
                }
            }
            // Every other value, including nil and the other sentinels, is
            // self-evaluating.
            other => return Ok(other),
        }
    }
}

/// Unwrap a `(return ...)` marker into its plain value, but only once this
/// invocation of `eval` has actually entered a procedure's body — a marker
/// surfacing before that (e.g. bubbling out of a body-sequence walker
/// that merely forwards it) is left untouched for the enclosing call to
/// unwrap instead.
fn finish_value(vm: &Vm, in_procedure_body: bool, v: Value) -> Result<Value> {
    if !in_procedure_body {
        return Ok(v);
    }
    if let Value::Pair(h) = v {
        if let HeapObject::Pair(p) = vm.heap().get(h)? {
            if p.is_return {
                return Ok(p.car);
            }
        }
    }
    Ok(v)
}

fn lookup(vm: &Vm, env: Handle, sym: Handle) -> Result<Value> {
    let mut current = Some(env);
    while let Some(h) = current {
        let HeapObject::Environment(e) = vm.heap().get(h)? else {
            unreachable!()
        };
        if let Some(v) = e.get_local(sym) {
            return Ok(v);
        }
        current = e.parent;
    }
    let name = vm.symbol_name(Value::Symbol(sym)).unwrap_or("?");
    Err(LonaError::unbound(name))
}

/// Evaluate each argument form in turn, pushing every result onto `vm.stack`
/// as it is produced (starting at `arg_base`) so it is a GC root for the
/// rest of argument evaluation and the call that follows — a plain Rust
/// `Vec` would be invisible to `Vm::roots` and an allocation triggered by a
/// later argument could sweep an earlier one's freshly-allocated value
/// before the call uses it. The caller truncates the stack back to
/// `arg_base` once the call has completed.
fn eval_list(vm: &mut Vm, mut list: Value, env: Handle, depth: usize, arg_base: usize) -> Result<Vec<Value>> {
    loop {
        match list {
            Value::Nil => break,
            Value::Pair(h) => {
                let (car, cdr) = {
                    let HeapObject::Pair(p) = vm.heap().get(h)? else {
                        unreachable!()
                    };
                    (p.car, p.cdr)
                };
                let value = match eval(vm, car, env, depth) {
                    Ok(v) => v,
                    Err(e) => {
                        vm.truncate_stack(arg_base);
                        return Err(e);
                    }
                };
                vm.push(value);
                list = cdr;
            }
            other => {
                vm.truncate_stack(arg_base);
                return Err(LonaError::type_error(format!("improper argument list: {other}")));
            }
        }
    }
    Ok(vm.stack_slice_from(arg_base).to_vec())
}

fn is_macro(vm: &Vm, env: Handle, sym: Handle) -> Result<bool> {
    let mut current = Some(env);
    while let Some(h) = current {
        let HeapObject::Environment(e) = vm.heap().get(h)? else {
            unreachable!()
        };
        if let Some(v) = e.get_local(sym) {
            return Ok(matches!(v, Value::Macro(_)));
        }
        current = e.parent;
    }
    Ok(false)
}

fn expand_macro(vm: &mut Vm, env: Handle, sym: Handle, call_args: Value, depth: usize) -> Result<Value> {
    let macro_value = lookup(vm, env, sym)?;
    let Value::Macro(mh) = macro_value else {
        return Err(LonaError::internal("expand_macro on a non-macro"));
    };
    let args = list_to_vec(vm, call_args)?;
    trace!(depth, "expanding macro");
    procedure::apply_to_value(vm, mh, &args, depth + 1)
}

fn list_to_vec(vm: &Vm, mut list: Value) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    loop {
        match list {
            Value::Nil => break,
            Value::Pair(h) => {
                let HeapObject::Pair(p) = vm.heap().get(h)? else {
                    unreachable!()
                };
                out.push(p.car);
                list = p.cdr;
            }
            other => return Err(LonaError::type_error(format!("improper list: {other}"))),
        }
    }
    Ok(out)
}

/// Apply `callee` to `args`. If `callee` is an ordinary (non-native)
/// procedure, returns a `TailEval` so the caller's trampoline evaluates the
/// body without growing the Rust call stack; native procedures and macros
/// run to completion immediately since they are opaque to the trampoline.
fn tail_call(vm: &mut Vm, callee: Value, args: &[Value], depth: usize) -> Result<special_forms::Outcome> {
    match callee {
        Value::Procedure(h) => {
            let frame = procedure::bind_call_frame(vm, h, args)?;
            let body = {
                let HeapObject::Procedure(p) = vm.heap().get(h)? else {
                    unreachable!()
                };
                p.body
            };
            let last = last_form_in_tail_position(vm, body, frame, depth)?;
            Ok(last)
        }
        Value::NativeProcedure(h) => {
            let func = {
                let HeapObject::NativeProcedure(np) = vm.heap().get(h)? else {
                    unreachable!()
                };
                np.func
            };
            Ok(special_forms::Outcome::Value(func(vm, args)?))
        }
        other => Err(LonaError::type_error(format!(
            "cannot call a value of type {}",
            other.type_name()
        ))),
    }
}

/// Evaluate every body form but the last eagerly, then hand the last one
/// back as a tail position for the trampoline.
fn last_form_in_tail_position(
    vm: &mut Vm,
    mut body: Value,
    env: Handle,
    depth: usize,
) -> Result<special_forms::Outcome> {
    if matches!(body, Value::Nil) {
        return Ok(special_forms::Outcome::Value(Value::Undefined));
    }
    loop {
        let Value::Pair(h) = body else {
            return Err(LonaError::type_error("malformed procedure body"));
        };
        let (car, cdr) = {
            let HeapObject::Pair(p) = vm.heap().get(h)? else {
                unreachable!()
            };
            (p.car, p.cdr)
        };
        if matches!(cdr, Value::Nil) {
            return Ok(special_forms::Outcome::TailEval(car, env));
        }
        let v = eval(vm, car, env, depth + 1)?;
        if special_forms::is_return_marker(vm, v)? {
            return Ok(special_forms::Outcome::Value(v));
        }
        body = cdr;
    }
}

/// Call a value with already-evaluated arguments (the host-facing `call`
/// entry point; there is no trampoline to hand back into here).
///
/// # Errors
/// Returns `Err` if `callee` is not callable, or propagates the call's error.
pub fn call_value(vm: &mut Vm, callee: Value, args: &[Value], depth: usize) -> Result<Value> {
    match tail_call(vm, callee, args, depth)? {
        special_forms::Outcome::Value(v) => Ok(v),
        special_forms::Outcome::TailEval(expr, env) => eval(vm, expr, env, depth + 1),
    }
}
