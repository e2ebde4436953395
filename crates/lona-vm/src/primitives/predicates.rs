// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Type predicates and the `eq?`/`equal?`/`not` family.

use crate::error::{LonaError, Result};
use crate::value::Value;
use crate::vm::Vm;

fn one(args: &[Value], procedure: &str) -> Result<Value> {
    args.first()
        .copied()
        .ok_or_else(|| LonaError::arity(procedure, "expected exactly one argument"))
}

pub fn not(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(Value::bool(!one(args, "not")?.is_truthy()))
}

pub fn nil_p(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(Value::bool(one(args, "nil?")?.is_nil()))
}

pub fn pair_p(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(Value::bool(one(args, "pair?")?.is_pair()))
}

pub fn symbol_p(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(Value::bool(one(args, "symbol?")?.is_symbol()))
}

pub fn string_p(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(Value::bool(one(args, "string?")?.is_string()))
}

pub fn number_p(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(Value::bool(one(args, "number?")?.is_number()))
}

pub fn procedure_p(_vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(Value::bool(one(args, "procedure?")?.is_callable()))
}

pub fn type_of(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = one(args, "type-of")?;
    Ok(vm.make_string(v.type_name()))
}

pub fn eq_p(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [a, b] = args else {
        return Err(LonaError::arity("eq?", "expected exactly two arguments"));
    };
    Ok(Value::bool(vm.values_identical(*a, *b)))
}

pub fn equal_p(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [a, b] = args else {
        return Err(LonaError::arity("equal?", "expected exactly two arguments"));
    };
    Ok(Value::bool(vm.values_equal(*a, *b)?))
}

pub fn install(vm: &mut Vm) -> Result<()> {
    vm.defn("not", not)?;
    vm.defn("nil?", nil_p)?;
    vm.defn("pair?", pair_p)?;
    vm.defn("symbol?", symbol_p)?;
    vm.defn("string?", string_p)?;
    vm.defn("number?", number_p)?;
    vm.defn("procedure?", procedure_p)?;
    vm.defn("type-of", type_of)?;
    vm.defn("eq?", eq_p)?;
    vm.defn("equal?", equal_p)?;
    Ok(())
}
