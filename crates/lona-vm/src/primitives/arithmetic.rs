// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Numeric primitives. Every Lona number is an IEEE-754 double; there is no
//! separate integer type, so arithmetic is ordinary `f64` math throughout.

use crate::error::{LonaError, Result};
use crate::value::Value;
use crate::vm::Vm;

fn number(v: Value, procedure: &str) -> Result<f64> {
    match v {
        Value::Number(n) => Ok(n),
        other => Err(LonaError::type_error(format!(
            "{procedure}: expected a number, got {}",
            other.type_name()
        ))),
    }
}

pub fn add(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let mut total = 0.0;
    for a in args {
        total += number(*a, "+")?;
    }
    Ok(Value::Number(total))
}

pub fn sub(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    match args {
        [] => Err(LonaError::arity("-", "expected at least one argument")),
        [only] => Ok(Value::Number(-number(*only, "-")?)),
        [first, rest @ ..] => {
            let mut total = number(*first, "-")?;
            for a in rest {
                total -= number(*a, "-")?;
            }
            Ok(Value::Number(total))
        }
    }
}

pub fn mul(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let mut total = 1.0;
    for a in args {
        total *= number(*a, "*")?;
    }
    Ok(Value::Number(total))
}

pub fn div(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    match args {
        [] => Err(LonaError::arity("/", "expected at least one argument")),
        [only] => {
            let n = number(*only, "/")?;
            if n == 0.0 {
                return Err(LonaError::range("division by zero"));
            }
            Ok(Value::Number(1.0 / n))
        }
        [first, rest @ ..] => {
            let mut total = number(*first, "/")?;
            for a in rest {
                let d = number(*a, "/")?;
                if d == 0.0 {
                    return Err(LonaError::range("division by zero"));
                }
                total /= d;
            }
            Ok(Value::Number(total))
        }
    }
}

pub fn modulo(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [a, b] = args else {
        return Err(LonaError::arity("modulo", "expected exactly two arguments"));
    };
    let (a, b) = (number(*a, "modulo")?, number(*b, "modulo")?);
    if b == 0.0 {
        return Err(LonaError::range("modulo by zero"));
    }
    Ok(Value::Number(a.rem_euclid(b)))
}

fn compare_chain(args: &[Value], procedure: &str, ok: impl Fn(f64, f64) -> bool) -> Result<Value> {
    if args.len() < 2 {
        return Err(LonaError::arity(procedure, "expected at least two arguments"));
    }
    for pair in args.windows(2) {
        let a = number(pair[0], procedure)?;
        let b = number(pair[1], procedure)?;
        if !ok(a, b) {
            return Ok(Value::False);
        }
    }
    Ok(Value::True)
}

pub fn num_eq(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    compare_chain(args, "=", |a, b| a == b)
}

pub fn lt(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    compare_chain(args, "<", |a, b| a < b)
}

pub fn gt(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    compare_chain(args, ">", |a, b| a > b)
}

pub fn le(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    compare_chain(args, "<=", |a, b| a <= b)
}

pub fn ge(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    compare_chain(args, ">=", |a, b| a >= b)
}

pub fn install(vm: &mut Vm) -> Result<()> {
    vm.defn("+", add)?;
    vm.defn("-", sub)?;
    vm.defn("*", mul)?;
    vm.defn("/", div)?;
    vm.defn("modulo", modulo)?;
    vm.defn("=", num_eq)?;
    vm.defn("<", lt)?;
    vm.defn(">", gt)?;
    vm.defn("<=", le)?;
    vm.defn(">=", ge)?;
    Ok(())
}
