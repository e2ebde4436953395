// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Special forms: syntax the evaluator recognizes by the head symbol's
//! *name* rather than its value, so they cannot be shadowed by a
//! user-defined procedure of the same name (matching the teacher's
//! convention of keyword dispatch by string, not by a reserved handle).

use super::eval;
use crate::error::{LonaError, Result};
use crate::handle::Handle;
use crate::value::Value;
use crate::value::object::{HeapObject, Procedure};
use crate::vm::Vm;

/// What a special form hands back to the trampoline in `eval`: either a
/// finished value, or an expression/environment pair to continue evaluating
/// in tail position.
pub enum Outcome {
    Value(Value),
    TailEval(Value, Handle),
}

type Form = fn(&mut Vm, Handle, Value, usize) -> Result<Outcome>;

/// Resolve a special form by name. Returns `None` for anything that is not
/// a special form (an ordinary call or macro invocation).
pub fn lookup(name: &str) -> Option<Form> {
    Some(match name {
        "quote" => quote,
        "if" => if_form,
        "define" => define,
        "defconst" => defconst,
        "defmethod" => defmethod,
        "define-macro" | "defmacro" => define_macro,
        "set!" => set_bang,
        "lambda" => lambda,
        "begin" => begin,
        "let" => let_form,
        "let*" => let_star,
        "and" => and_form,
        "or" => or_form,
        "cond" => cond,
        "while" => while_form,
        "catch" => catch,
        "throw" => throw,
        "quasiquote" => quasiquote,
        "consq" => consq,
        "evalq" => evalq,
        "return" => return_form,
        "this" => this_form,
        "debug" => debug_form,
        "case" => case_form,
        "match" => match_form,
        "with-input" => with_input,
        "with-output" => with_output,
        _ => return None,
    })
}

/// True if `value` is a pair created by `(return ...)`: its presence as the
/// result of a non-last form in a body sequence means the sequence must stop
/// and propagate it, unwrapped, rather than evaluate the remaining forms.
pub(super) fn is_return_marker(vm: &Vm, value: Value) -> Result<bool> {
    if let Value::Pair(h) = value {
        if let HeapObject::Pair(p) = vm.heap().get(h)? {
            return Ok(p.is_return);
        }
    }
    Ok(false)
}

/// Walk a proper list into a `Vec`, erroring on an improper tail.
fn list(vm: &Vm, mut value: Value) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    loop {
        match value {
            Value::Nil => break,
            Value::Pair(h) => {
                let HeapObject::Pair(p) = vm.heap().get(h)? else {
                    unreachable!()
                };
                out.push(p.car);
                value = p.cdr;
            }
            other => return Err(LonaError::type_error(format!("improper list in form: {other}"))),
        }
    }
    Ok(out)
}

fn nth(args: &[Value], i: usize, form: &str) -> Result<Value> {
    args.get(i)
        .copied()
        .ok_or_else(|| LonaError::arity(form, format!("missing argument {i}")))
}

fn symbol_handle(_vm: &Vm, value: Value, form: &str) -> Result<Handle> {
    match value {
        Value::Symbol(h) => Ok(h),
        other => Err(LonaError::type_error(format!(
            "{form}: expected a symbol, got {}",
            other.type_name()
        ))),
    }
}

fn quote(_vm: &mut Vm, _env: Handle, args: Value, _depth: usize) -> Result<Outcome> {
    let items = list(_vm, args)?;
    Ok(Outcome::Value(nth(&items, 0, "quote")?))
}

fn if_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let cond = eval(vm, nth(&items, 0, "if")?, env, depth + 1)?;
    if cond.is_truthy() {
        Ok(Outcome::TailEval(nth(&items, 1, "if")?, env))
    } else if let Some(else_branch) = items.get(2) {
        Ok(Outcome::TailEval(*else_branch, env))
    } else {
        Ok(Outcome::Value(Value::Undefined))
    }
}

fn define(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    bind_define(vm, env, args, depth, false, false)
}

fn defconst(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    bind_define(vm, env, args, depth, true, false)
}

fn defmethod(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    bind_define(vm, env, args, depth, false, true)
}

/// Shared implementation of `define`/`defconst`/`defmethod`: all three bind
/// `(name value-expr)`, or `(name (formals...) body...)` as sugar for
/// binding a lambda.
fn bind_define(
    vm: &mut Vm,
    env: Handle,
    args: Value,
    depth: usize,
    is_const: bool,
    is_method: bool,
) -> Result<Outcome> {
    let items = list(vm, args)?;
    let target = nth(&items, 0, "define")?;

    let (name_handle, value) = match target {
        Value::Symbol(h) => {
            let value_expr = items.get(1).copied().unwrap_or(Value::Undefined);
            let value = eval(vm, value_expr, env, depth + 1)?;
            (h, value)
        }
        Value::Pair(_) => {
            // `(define (name . formals) body...)` function-definition sugar.
            let target_items = list(vm, target)?;
            let name = symbol_handle(vm, nth(&target_items, 0, "define")?, "define")?;
            let formals = build_list(vm, &target_items[1..]);
            let body = build_list(vm, &items[1..]);
            let proc = Procedure {
                env,
                formals,
                body,
                is_method,
                tracing: false,
                label: Some(name),
            };
            let h = vm.alloc_procedure(proc);
            (name, h)
        }
        other => return Err(LonaError::type_error(format!("define: bad target {other}"))),
    };

    if is_method {
        vm.define_method_in(env, name_handle, value)?;
    } else {
        vm.define_const_in(env, name_handle, value, is_const)?;
    }
    Ok(Outcome::Value(Value::Symbol(name_handle)))
}

fn define_macro(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let target = nth(&items, 0, "define-macro")?;
    let target_items = list(vm, target)?;
    let name = symbol_handle(vm, nth(&target_items, 0, "define-macro")?, "define-macro")?;
    let formals = build_list(vm, &target_items[1..]);
    let body = build_list(vm, &items[1..]);
    let proc = Procedure {
        env,
        formals,
        body,
        is_method: false,
        tracing: false,
        label: Some(name),
    };
    let value = vm.alloc_macro(proc);
    vm.define_const_in(env, name, value, false)?;
    let _ = depth;
    Ok(Outcome::Value(Value::Symbol(name)))
}

fn set_bang(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let name = symbol_handle(vm, nth(&items, 0, "set!")?, "set!")?;
    let value = eval(vm, nth(&items, 1, "set!")?, env, depth + 1)?;
    vm.set_bang(env, name, value)?;
    Ok(Outcome::Value(value))
}

fn lambda(vm: &mut Vm, env: Handle, args: Value, _depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let formals = nth(&items, 0, "lambda")?;
    let body = build_list(vm, &items[1..]);
    let proc = Procedure {
        env,
        formals,
        body,
        is_method: false,
        tracing: false,
        label: None,
    };
    Ok(Outcome::Value(vm.alloc_procedure(proc)))
}

fn begin(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    eval_all_but_last_in_tail(vm, env, &items, depth)
}

fn let_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let bindings = list(vm, nth(&items, 0, "let")?)?;
    let child = vm.new_environment(Some(env));
    for binding in bindings {
        let pair = list(vm, binding)?;
        let name = symbol_handle(vm, nth(&pair, 0, "let")?, "let")?;
        let value_expr = pair.get(1).copied().unwrap_or(Value::Undefined);
        // Bound in the *outer* environment: `let` bindings do not see each other.
        let value = eval(vm, value_expr, env, depth + 1)?;
        vm.define_in(child, name, value)?;
    }
    eval_all_but_last_in_tail(vm, child, &items[1..], depth)
}

fn let_star(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let bindings = list(vm, nth(&items, 0, "let*")?)?;
    let mut current = env;
    for binding in bindings {
        let pair = list(vm, binding)?;
        let name = symbol_handle(vm, nth(&pair, 0, "let*")?, "let*")?;
        let value_expr = pair.get(1).copied().unwrap_or(Value::Undefined);
        let child = vm.new_environment(Some(current));
        let value = eval(vm, value_expr, current, depth + 1)?;
        vm.define_in(child, name, value)?;
        current = child;
    }
    eval_all_but_last_in_tail(vm, current, &items[1..], depth)
}

fn and_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    if items.is_empty() {
        return Ok(Outcome::Value(Value::True));
    }
    for expr in &items[..items.len() - 1] {
        let v = eval(vm, *expr, env, depth + 1)?;
        if !v.is_truthy() {
            return Ok(Outcome::Value(v));
        }
    }
    Ok(Outcome::TailEval(items[items.len() - 1], env))
}

fn or_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    if items.is_empty() {
        return Ok(Outcome::Value(Value::False));
    }
    for expr in &items[..items.len() - 1] {
        let v = eval(vm, *expr, env, depth + 1)?;
        if v.is_truthy() {
            return Ok(Outcome::Value(v));
        }
    }
    Ok(Outcome::TailEval(items[items.len() - 1], env))
}

fn cond(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let clauses = list(vm, args)?;
    for clause in clauses {
        let parts = list(vm, clause)?;
        let test = nth(&parts, 0, "cond")?;
        let matches_else = matches!(test, Value::Symbol(h) if vm.symbol_name(Value::Symbol(h)) == Some("else"));
        let test_value = if matches_else {
            Value::True
        } else {
            eval(vm, test, env, depth + 1)?
        };
        if test_value.is_truthy() {
            return eval_all_but_last_in_tail(vm, env, &parts[1..], depth);
        }
    }
    Ok(Outcome::Value(Value::Undefined))
}

fn while_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let test = nth(&items, 0, "while")?;
    let body = &items[1..];
    while eval(vm, test, env, depth + 1)?.is_truthy() {
        for expr in body {
            let v = eval(vm, *expr, env, depth + 1)?;
            if is_return_marker(vm, v)? {
                return Ok(Outcome::Value(v));
            }
        }
    }
    Ok(Outcome::Value(Value::Undefined))
}

fn catch(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let mut result = Value::Undefined;
    for expr in &items {
        match eval(vm, *expr, env, depth + 1) {
            Ok(v) => {
                if is_return_marker(vm, v)? {
                    return Ok(Outcome::Value(v));
                }
                result = v;
            }
            Err(LonaError::Throw(v)) => return Ok(Outcome::Value(v)),
            Err(other) => {
                let msg = vm.make_string(other.to_string());
                return Ok(Outcome::Value(msg));
            }
        }
    }
    Ok(Outcome::Value(result))
}

/// `(return expr)`: evaluates `expr`, conses it onto `nil`, and flags the
/// resulting pair `is_return`. Every body-sequence walker in this module
/// (and `last_form_in_tail_position` in the trampoline) checks for that flag
/// on a non-last form's result and stops, propagating the pair unchanged;
/// `eval`'s own loop is the one place that unwraps it back to a plain value,
/// exactly once per completed procedure application.
fn return_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let value_expr = items.first().copied().unwrap_or(Value::Undefined);
    let value = eval(vm, value_expr, env, depth + 1)?;
    let marker = vm.cons(value, Value::Nil);
    let Value::Pair(h) = marker else {
        unreachable!()
    };
    if let HeapObject::Pair(p) = vm.heap_mut().get_mut(h)? {
        p.is_return = true;
    }
    Ok(Outcome::Value(marker))
}

/// `(this)` returns the lexical environment the form is evaluated in.
fn this_form(_vm: &mut Vm, env: Handle, _args: Value, _depth: usize) -> Result<Outcome> {
    Ok(Outcome::Value(Value::Environment(env)))
}

/// Evaluates each argument in turn, printing its value to the current
/// output port as it goes, and yields the last one. A development aid, not
/// part of normal program output.
fn debug_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let mut result = Value::Undefined;
    for expr in &items {
        let value = eval(vm, *expr, env, depth + 1)?;
        let rendered = vm.stringify(value)?;
        let port = vm.current_output();
        vm.port_write(port, format!("; {rendered}\n").as_bytes())?;
        result = value;
    }
    Ok(Outcome::Value(result))
}

/// `(case key-expr (datum-or-data body...) ... (else body...))`: evaluates
/// `key-expr` once and matches it by identity against each clause's datum
/// (or, if the datum is itself a list, any of its elements); `else` always
/// matches. The first matching clause's body runs in sequence, last form in
/// tail position. No match yields `undefined`.
fn case_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let key = eval(vm, nth(&items, 0, "case")?, env, depth + 1)?;
    for clause in &items[1..] {
        let parts = list(vm, *clause)?;
        let datum = nth(&parts, 0, "case")?;
        let is_else = matches!(datum, Value::Symbol(h) if vm.symbol_name(Value::Symbol(h)) == Some("else"));
        if is_else || case_datum_matches(vm, datum, key)? {
            return eval_all_but_last_in_tail(vm, env, &parts[1..], depth);
        }
    }
    Ok(Outcome::Value(Value::Undefined))
}

fn case_datum_matches(vm: &Vm, datum: Value, key: Value) -> Result<bool> {
    if vm.values_identical(datum, key) {
        return Ok(true);
    }
    if let Value::Pair(_) = datum {
        for alt in list(vm, datum)? {
            if vm.values_identical(alt, key) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// `(match key-expr (pattern body...) ... (else body...))`: evaluates
/// `key-expr` once. A clause matches either by identity with its pattern
/// (or `else`), or, when both the key and the pattern are lists with `eq`
/// leading tags, by destructuring: the pattern's remaining elements are
/// bound (via an ad-hoc lambda) against the key's remaining elements. No
/// match yields `undefined`.
fn match_form(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let key = eval(vm, nth(&items, 0, "match")?, env, depth + 1)?;
    for clause in &items[1..] {
        let parts = list(vm, *clause)?;
        let pattern = nth(&parts, 0, "match")?;
        let body = &parts[1..];
        let is_else = matches!(pattern, Value::Symbol(h) if vm.symbol_name(Value::Symbol(h)) == Some("else"));
        if is_else || vm.values_identical(pattern, key) {
            return eval_all_but_last_in_tail(vm, env, body, depth);
        }
        if let (Value::Pair(ph), Value::Pair(kh)) = (pattern, key) {
            let (ptag, pvars) = pair_parts(vm, ph)?;
            let (ktag, kvals) = pair_parts(vm, kh)?;
            if vm.values_identical(ptag, ktag) {
                let proc = Procedure {
                    env,
                    formals: pvars,
                    body: build_list(vm, body),
                    is_method: false,
                    tracing: false,
                    label: None,
                };
                let proc_value = vm.alloc_procedure(proc);
                let Value::Procedure(ph2) = proc_value else {
                    unreachable!()
                };
                let vals = list(vm, kvals)?;
                let result = super::procedure::apply_to_value(vm, ph2, &vals, depth + 1)?;
                return Ok(Outcome::Value(result));
            }
        }
    }
    Ok(Outcome::Value(Value::Undefined))
}

/// Evaluate a `with-input`/`with-output` body to completion (not a tail
/// position: the rebound port must be restored once the body is done, so
/// the last form cannot be handed back to the trampoline unresolved).
fn eval_body_sequence(vm: &mut Vm, env: Handle, forms: &[Value], depth: usize) -> Result<Value> {
    let mut result = Value::Undefined;
    for expr in forms {
        result = eval(vm, *expr, env, depth + 1)?;
        if is_return_marker(vm, result)? {
            return Ok(result);
        }
    }
    Ok(result)
}

/// `(with-input port-expr body...)`: rebinds the VM's current input port
/// for the dynamic extent of `body`, restoring the previous one afterward
/// even if `body` errors.
fn with_input(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let port_value = eval(vm, nth(&items, 0, "with-input")?, env, depth + 1)?;
    let Value::Port(new_port) = port_value else {
        return Err(LonaError::type_error("with-input: expected a port"));
    };
    let saved = vm.swap_current_input(new_port);
    let outcome = eval_body_sequence(vm, env, &items[1..], depth);
    vm.swap_current_input(saved);
    Ok(Outcome::Value(outcome?))
}

/// `(with-output port-expr body...)`: as `with-input`, for the output port.
fn with_output(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let port_value = eval(vm, nth(&items, 0, "with-output")?, env, depth + 1)?;
    let Value::Port(new_port) = port_value else {
        return Err(LonaError::type_error("with-output: expected a port"));
    };
    let saved = vm.swap_current_output(new_port);
    let outcome = eval_body_sequence(vm, env, &items[1..], depth);
    vm.swap_current_output(saved);
    Ok(Outcome::Value(outcome?))
}

fn throw(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let value = eval(vm, nth(&items, 0, "throw")?, env, depth + 1)?;
    Err(LonaError::Throw(value))
}

/// The reader's bare leading-`:` sugar (`:a b` reads as `(consq a b)`):
/// conses its first argument *unevaluated* onto its second argument
/// evaluated, matching the original `consq` dispatch (`cons(CAR(args),
/// eval(CADR(args)))`).
fn consq(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let raw = nth(&items, 0, "consq")?;
    let evaluated = eval(vm, nth(&items, 1, "consq")?, env, depth + 1)?;
    Ok(Outcome::Value(vm.cons(raw, evaluated)))
}

/// Evaluates only the first element of its unevaluated argument list,
/// discarding the rest. Used by the reader's string-interpolation expansion
/// to evaluate an interpolated subform without evaluating the literal
/// fragments `concat` assembles it with.
fn evalq(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let value = eval(vm, nth(&items, 0, "evalq")?, env, depth + 1)?;
    Ok(Outcome::Value(value))
}

fn quasiquote(vm: &mut Vm, env: Handle, args: Value, depth: usize) -> Result<Outcome> {
    let items = list(vm, args)?;
    let template = nth(&items, 0, "quasiquote")?;
    let expanded = qq_expand(vm, env, template, 1, depth)?;
    Ok(Outcome::Value(expanded))
}

fn pair_parts(vm: &Vm, h: Handle) -> Result<(Value, Value)> {
    let HeapObject::Pair(p) = vm.heap().get(h)? else {
        unreachable!()
    };
    Ok((p.car, p.cdr))
}

fn single_arg(vm: &Vm, rest: Value, form: &str) -> Result<Value> {
    let items = list(vm, rest)?;
    nth(&items, 0, form)
}

fn rewrap(vm: &mut Vm, tag: Value, inner: Value) -> Value {
    let tail = vm.cons(inner, Value::Nil);
    vm.cons(tag, tail)
}

fn tag_name(vm: &Vm, car: Value) -> &'static str {
    match car {
        Value::Symbol(h) => match vm.symbol_name(Value::Symbol(h)) {
            Some("unquote") => "unquote",
            Some("unquote-splicing") => "unquote-splicing",
            Some("quasiquote") => "quasiquote",
            _ => "",
        },
        _ => "",
    }
}

/// Expand a quasiquote template: `level` tracks the quasiquote nesting depth
/// so `unquote`/`unquote-splicing` only escape at their matching level, and
/// nested `quasiquote` forms are left structurally intact one level down.
fn qq_expand(vm: &mut Vm, env: Handle, value: Value, level: u32, depth: usize) -> Result<Value> {
    match value {
        Value::Pair(h) => {
            let (car, cdr) = pair_parts(vm, h)?;
            match tag_name(vm, car) {
                "unquote" if level == 1 => {
                    let arg = single_arg(vm, cdr, "unquote")?;
                    eval(vm, arg, env, depth + 1)
                }
                "unquote" => {
                    let arg = single_arg(vm, cdr, "unquote")?;
                    let inner = qq_expand(vm, env, arg, level - 1, depth)?;
                    Ok(rewrap(vm, car, inner))
                }
                "unquote-splicing" if level == 1 => Err(LonaError::type_error(
                    "unquote-splicing: not valid outside a list",
                )),
                "unquote-splicing" => {
                    let arg = single_arg(vm, cdr, "unquote-splicing")?;
                    let inner = qq_expand(vm, env, arg, level - 1, depth)?;
                    Ok(rewrap(vm, car, inner))
                }
                "quasiquote" => {
                    let arg = single_arg(vm, cdr, "quasiquote")?;
                    let inner = qq_expand(vm, env, arg, level + 1, depth)?;
                    Ok(rewrap(vm, car, inner))
                }
                _ => qq_expand_list(vm, env, car, cdr, level, depth),
            }
        }
        Value::Array(h) => {
            let items = {
                let HeapObject::Array(a) = vm.heap().get(h)? else {
                    unreachable!()
                };
                a.items.clone()
            };
            let mut out = Vec::new();
            for item in items {
                if let Some(spliced) = try_splice(vm, env, item, level, depth)? {
                    out.extend(spliced);
                } else {
                    out.push(qq_expand(vm, env, item, level, depth)?);
                }
            }
            Ok(vm.make_array(out))
        }
        other => Ok(other),
    }
}

/// Splice candidate check for an *element* position: `,@expr` inside a list
/// or array splices `expr`'s items in place rather than nesting a sub-list.
fn try_splice(vm: &mut Vm, env: Handle, value: Value, level: u32, depth: usize) -> Result<Option<Vec<Value>>> {
    if level != 1 {
        return Ok(None);
    }
    let Value::Pair(h) = value else { return Ok(None) };
    let (car, cdr) = pair_parts(vm, h)?;
    if tag_name(vm, car) != "unquote-splicing" {
        return Ok(None);
    }
    let arg = single_arg(vm, cdr, "unquote-splicing")?;
    let spliced = eval(vm, arg, env, depth + 1)?;
    Ok(Some(list(vm, spliced)?))
}

fn qq_expand_list(vm: &mut Vm, env: Handle, car: Value, cdr: Value, level: u32, depth: usize) -> Result<Value> {
    if let Some(spliced) = try_splice(vm, env, car, level, depth)? {
        let rest = qq_expand(vm, env, cdr, level, depth)?;
        return Ok(append_values(vm, &spliced, rest));
    }
    let expanded_car = qq_expand(vm, env, car, level, depth)?;
    let expanded_cdr = qq_expand(vm, env, cdr, level, depth)?;
    Ok(vm.cons(expanded_car, expanded_cdr))
}

fn append_values(vm: &mut Vm, items: &[Value], tail: Value) -> Value {
    let mut result = tail;
    for item in items.iter().rev() {
        result = vm.cons(*item, result);
    }
    result
}

fn build_list(vm: &mut Vm, items: &[Value]) -> Value {
    let mut result = Value::Nil;
    for item in items.iter().rev() {
        result = vm.cons(*item, result);
    }
    result
}

/// Evaluate every form but the last eagerly, hand the last back as a tail
/// position. Shared by `begin`, `let`, `let*`, and `cond` clause bodies.
fn eval_all_but_last_in_tail(vm: &mut Vm, env: Handle, forms: &[Value], depth: usize) -> Result<Outcome> {
    if forms.is_empty() {
        return Ok(Outcome::Value(Value::Undefined));
    }
    for expr in &forms[..forms.len() - 1] {
        let v = eval(vm, *expr, env, depth + 1)?;
        if is_return_marker(vm, v)? {
            return Ok(Outcome::Value(v));
        }
    }
    Ok(Outcome::TailEval(forms[forms.len() - 1], env))
}
