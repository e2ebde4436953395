// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Pair, list, and array primitives.

use crate::error::{LonaError, Result};
use crate::value::Value;
use crate::value::object::HeapObject;
use crate::vm::Vm;

fn pair_parts(vm: &Vm, v: Value, procedure: &str) -> Result<(Value, Value)> {
    match v {
        Value::Pair(h) => {
            let HeapObject::Pair(p) = vm.heap().get(h)? else {
                unreachable!()
            };
            Ok((p.car, p.cdr))
        }
        other => Err(LonaError::type_error(format!(
            "{procedure}: expected a pair, got {}",
            other.type_name()
        ))),
    }
}

pub fn cons(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [a, b] = args else {
        return Err(LonaError::arity("cons", "expected exactly two arguments"));
    };
    Ok(vm.cons(*a, *b))
}

pub fn car(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("car", "expected exactly one argument"))?;
    Ok(pair_parts(vm, v, "car")?.0)
}

pub fn cdr(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("cdr", "expected exactly one argument"))?;
    Ok(pair_parts(vm, v, "cdr")?.1)
}

fn pair_owner(vm: &Vm, h: crate::handle::Handle) -> Result<crate::handle::VmId> {
    match vm.heap().get(h)? {
        HeapObject::Pair(p) => Ok(p.owner),
        _ => unreachable!(),
    }
}

pub fn set_car_bang(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [target, value] = args else {
        return Err(LonaError::arity("set-car!", "expected exactly two arguments"));
    };
    let Value::Pair(h) = *target else {
        return Err(LonaError::type_error("set-car!: expected a pair"));
    };
    vm.check_owner(pair_owner(vm, h)?)?;
    match vm.heap_mut().get_mut(h)? {
        HeapObject::Pair(p) => p.car = *value,
        _ => unreachable!(),
    }
    Ok(Value::Undefined)
}

pub fn set_cdr_bang(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [target, value] = args else {
        return Err(LonaError::arity("set-cdr!", "expected exactly two arguments"));
    };
    let Value::Pair(h) = *target else {
        return Err(LonaError::type_error("set-cdr!: expected a pair"));
    };
    vm.check_owner(pair_owner(vm, h)?)?;
    match vm.heap_mut().get_mut(h)? {
        HeapObject::Pair(p) => p.cdr = *value,
        _ => unreachable!(),
    }
    Ok(Value::Undefined)
}

pub fn list(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let mut result = Value::Nil;
    for item in args.iter().rev() {
        result = vm.cons(*item, result);
    }
    Ok(result)
}

pub fn length(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("length", "expected exactly one argument"))?;
    let count = match v {
        Value::Nil => 0,
        Value::Pair(_) => {
            let mut n = 0usize;
            let mut cursor = v;
            loop {
                match cursor {
                    Value::Nil => break,
                    Value::Pair(h) => {
                        let HeapObject::Pair(p) = vm.heap().get(h)? else {
                            unreachable!()
                        };
                        n += 1;
                        cursor = p.cdr;
                    }
                    other => {
                        return Err(LonaError::type_error(format!(
                            "length: improper list tail {other}"
                        )));
                    }
                }
            }
            n
        }
        Value::Array(h) => {
            let HeapObject::Array(a) = vm.heap().get(h)? else {
                unreachable!()
            };
            a.items.len()
        }
        Value::String(h) => {
            let HeapObject::String(s) = vm.heap().get(h)? else {
                unreachable!()
            };
            s.as_str().chars().count()
        }
        other => return Err(LonaError::type_error(format!("length: unsupported for {}", other.type_name()))),
    };
    Ok(Value::Number(count as f64))
}

pub fn append(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let mut items = Vec::new();
    for (i, list_val) in args.iter().enumerate() {
        let is_last = i == args.len() - 1;
        let mut cursor = *list_val;
        loop {
            match cursor {
                Value::Nil => break,
                Value::Pair(h) => {
                    let HeapObject::Pair(p) = vm.heap().get(h)? else {
                        unreachable!()
                    };
                    items.push(p.car);
                    cursor = p.cdr;
                }
                other if is_last => {
                    // A non-list final argument becomes the result's dotted tail.
                    let mut result = other;
                    for item in items.into_iter().rev() {
                        result = vm.cons(item, result);
                    }
                    return Ok(result);
                }
                other => return Err(LonaError::type_error(format!("append: improper list {other}"))),
            }
        }
    }
    let mut result = Value::Nil;
    for item in items.into_iter().rev() {
        result = vm.cons(item, result);
    }
    Ok(result)
}

pub fn reverse(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let v = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("reverse", "expected exactly one argument"))?;
    let mut result = Value::Nil;
    let mut cursor = v;
    loop {
        match cursor {
            Value::Nil => break,
            Value::Pair(h) => {
                let HeapObject::Pair(p) = vm.heap().get(h)? else {
                    unreachable!()
                };
                result = vm.cons(p.car, result);
                cursor = p.cdr;
            }
            other => return Err(LonaError::type_error(format!("reverse: improper list {other}"))),
        }
    }
    Ok(result)
}

pub fn nth(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [list_val, index] = args else {
        return Err(LonaError::arity("nth", "expected exactly two arguments"));
    };
    let Value::Number(i) = *index else {
        return Err(LonaError::type_error("nth: index must be a number"));
    };
    let mut remaining = i as i64;
    if remaining < 0 {
        return Err(LonaError::range("nth: negative index"));
    }
    let mut cursor = *list_val;
    loop {
        match cursor {
            Value::Pair(h) => {
                let HeapObject::Pair(p) = vm.heap().get(h)? else {
                    unreachable!()
                };
                if remaining == 0 {
                    return Ok(p.car);
                }
                remaining -= 1;
                cursor = p.cdr;
            }
            _ => return Err(LonaError::range("nth: index out of range")),
        }
    }
}

// ---- arrays --------------------------------------------------------------

pub fn array(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    Ok(vm.make_array(args.to_vec()))
}

pub fn array_ref(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [arr, index] = args else {
        return Err(LonaError::arity("array-ref", "expected exactly two arguments"));
    };
    let Value::Array(h) = *arr else {
        return Err(LonaError::type_error("array-ref: expected an array"));
    };
    let Value::Number(i) = *index else {
        return Err(LonaError::type_error("array-ref: index must be a number"));
    };
    let HeapObject::Array(a) = vm.heap().get(h)? else {
        unreachable!()
    };
    a.items
        .get(i as usize)
        .copied()
        .ok_or_else(|| LonaError::range("array-ref: index out of range"))
}

fn array_owner(vm: &Vm, h: crate::handle::Handle) -> Result<crate::handle::VmId> {
    match vm.heap().get(h)? {
        HeapObject::Array(a) => Ok(a.owner),
        _ => unreachable!(),
    }
}

pub fn array_set_bang(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [arr, index, value] = args else {
        return Err(LonaError::arity("array-set!", "expected exactly three arguments"));
    };
    let Value::Array(h) = *arr else {
        return Err(LonaError::type_error("array-set!: expected an array"));
    };
    let Value::Number(i) = *index else {
        return Err(LonaError::type_error("array-set!: index must be a number"));
    };
    vm.check_owner(array_owner(vm, h)?)?;
    match vm.heap_mut().get_mut(h)? {
        HeapObject::Array(a) => {
            let idx = i as usize;
            if a.immutable {
                return Err(LonaError::immutable("array-set!: array is immutable"));
            }
            if idx >= a.items.len() {
                return Err(LonaError::range("array-set!: index out of range"));
            }
            a.items[idx] = *value;
        }
        _ => unreachable!(),
    }
    Ok(Value::Undefined)
}

pub fn array_push_bang(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [arr, value] = args else {
        return Err(LonaError::arity("array-push!", "expected exactly two arguments"));
    };
    let Value::Array(h) = *arr else {
        return Err(LonaError::type_error("array-push!: expected an array"));
    };
    vm.check_owner(array_owner(vm, h)?)?;
    match vm.heap_mut().get_mut(h)? {
        HeapObject::Array(a) => {
            if a.immutable {
                return Err(LonaError::immutable("array-push!: array is immutable"));
            }
            a.items.push(*value);
        }
        _ => unreachable!(),
    }
    Ok(Value::Undefined)
}

// ---- dictionaries ---------------------------------------------------------

pub fn dict_ref(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [dict, key] = args else {
        return Err(LonaError::arity("dict-ref", "expected exactly two arguments"));
    };
    let Value::Dictionary(h) = *dict else {
        return Err(LonaError::type_error("dict-ref: expected a dictionary"));
    };
    let HeapObject::Dictionary(d) = vm.heap().get(h)? else {
        unreachable!()
    };
    for entry in &d.entries {
        let Some(v) = entry.value else { continue };
        if vm.values_identical(entry.key, *key) {
            return Ok(v);
        }
    }
    Ok(Value::False)
}

fn dict_owner(vm: &Vm, h: crate::handle::Handle) -> Result<crate::handle::VmId> {
    match vm.heap().get(h)? {
        HeapObject::Dictionary(d) => Ok(d.owner),
        _ => unreachable!(),
    }
}

pub fn dict_set_bang(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [dict, key, value] = args else {
        return Err(LonaError::arity("dict-set!", "expected exactly three arguments"));
    };
    let Value::Dictionary(h) = *dict else {
        return Err(LonaError::type_error("dict-set!: expected a dictionary"));
    };
    vm.check_owner(dict_owner(vm, h)?)?;
    match vm.heap_mut().get_mut(h)? {
        HeapObject::Dictionary(d) => {
            if d.immutable {
                return Err(LonaError::immutable("dict-set!: dictionary is immutable"));
            }
            let key = *key;
            if let Some(entry) = d
                .entries
                .iter_mut()
                .find(|e| e.value.is_some() && crate::value_eq::identical(e.key, key))
            {
                entry.value = Some(*value);
            } else {
                d.entries.push(crate::value::object::DictEntry {
                    key: *key,
                    value: Some(*value),
                });
            }
        }
        _ => unreachable!(),
    }
    Ok(Value::Undefined)
}

/// Dotted accessor-path lookup (`a:b:c` reads as `(get a (quote b) (quote c))`):
/// walks each key against the current base, descending into dictionaries by
/// symbol, arrays by numeric index, and environments by symbol binding.
pub fn get(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let mut current = args
        .first()
        .copied()
        .ok_or_else(|| LonaError::arity("get", "expected at least one argument"))?;
    for key in &args[1..] {
        current = get_one(vm, current, *key)?;
    }
    Ok(current)
}

fn get_one(vm: &Vm, obj: Value, key: Value) -> Result<Value> {
    match obj {
        Value::Dictionary(h) => {
            let HeapObject::Dictionary(d) = vm.heap().get(h)? else {
                unreachable!()
            };
            for entry in &d.entries {
                let Some(v) = entry.value else { continue };
                if vm.values_identical(entry.key, key) {
                    return Ok(v);
                }
            }
            Ok(Value::False)
        }
        Value::Array(h) => {
            let HeapObject::Array(a) = vm.heap().get(h)? else {
                unreachable!()
            };
            let Value::Number(n) = key else {
                return Err(LonaError::type_error("get: array index must be a number"));
            };
            Ok(a.items.get(n as usize).copied().unwrap_or(Value::False))
        }
        Value::Environment(h) => {
            let HeapObject::Environment(e) = vm.heap().get(h)? else {
                unreachable!()
            };
            let Value::Symbol(sh) = key else {
                return Err(LonaError::type_error("get: environment key must be a symbol"));
            };
            Ok(e.get_local(sh).unwrap_or(Value::False))
        }
        other => Err(LonaError::type_error(format!(
            "get: cannot look up a key on {}",
            other.type_name()
        ))),
    }
}

pub fn install(vm: &mut Vm) -> Result<()> {
    vm.defn("cons", cons)?;
    vm.defn("car", car)?;
    vm.defn("cdr", cdr)?;
    vm.defn("set-car!", set_car_bang)?;
    vm.defn("set-cdr!", set_cdr_bang)?;
    vm.defn("list", list)?;
    vm.defn("length", length)?;
    vm.defn("append", append)?;
    vm.defn("reverse", reverse)?;
    vm.defn("nth", nth)?;
    vm.defn("array", array)?;
    vm.defn("array-ref", array_ref)?;
    vm.defn("array-set!", array_set_bang)?;
    vm.defn("array-push!", array_push_bang)?;
    vm.defn("dict-ref", dict_ref)?;
    vm.defn("dict-set!", dict_set_bang)?;
    vm.defn("get", get)?;
    Ok(())
}

#[cfg(test)]
mod owner_test {
    use super::*;

    #[test]
    fn a_pair_is_owned_by_the_vm_that_allocated_it() {
        let mut a = Vm::new();
        let b = Vm::new();
        let pair = a.cons(Value::Number(1.0), Value::Number(2.0));
        let Value::Pair(h) = pair else { unreachable!() };
        let owner = pair_owner(&a, h).unwrap();
        assert!(a.check_owner(owner).is_ok());
        assert!(b.check_owner(owner).is_err());
    }

    #[test]
    fn an_array_is_owned_by_the_vm_that_allocated_it() {
        let mut a = Vm::new();
        let b = Vm::new();
        let arr = a.make_array(vec![Value::Number(1.0)]);
        let Value::Array(h) = arr else { unreachable!() };
        let owner = array_owner(&a, h).unwrap();
        assert!(a.check_owner(owner).is_ok());
        assert!(b.check_owner(owner).is_err());
    }

    #[test]
    fn a_dictionary_is_owned_by_the_vm_that_allocated_it() {
        let mut a = Vm::new();
        let b = Vm::new();
        let dict = a.make_dictionary(Vec::new()).unwrap();
        let Value::Dictionary(h) = dict else { unreachable!() };
        let owner = dict_owner(&a, h).unwrap();
        assert!(a.check_owner(owner).is_ok());
        assert!(b.check_owner(owner).is_err());
    }
}
