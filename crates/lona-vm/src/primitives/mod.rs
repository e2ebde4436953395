// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Built-in native procedures, installed into a fresh `Vm`'s global
//! environment at construction time (§5).

mod arithmetic;
mod io;
mod predicates;
mod sequence;
mod strings;

#[cfg(test)]
mod primitives_test;

use crate::error::{LonaError, Result};
use crate::value::Value;
use crate::value::object::HeapObject;
use crate::vm::Vm;

/// `(apply proc arg1 ... argn list)`: call `proc` with `arg1 ... argn`
/// followed by every element of the final list argument.
fn apply(vm: &mut Vm, args: &[Value]) -> Result<Value> {
    let [proc, rest @ ..] = args else {
        return Err(LonaError::arity("apply", "expected at least a procedure argument"));
    };
    let mut call_args = Vec::new();
    if let Some((last, leading)) = rest.split_last() {
        call_args.extend_from_slice(leading);
        let mut cursor = *last;
        loop {
            match cursor {
                Value::Nil => break,
                Value::Pair(h) => {
                    let HeapObject::Pair(p) = vm.heap().get(h)? else {
                        unreachable!()
                    };
                    call_args.push(p.car);
                    cursor = p.cdr;
                }
                other => {
                    return Err(LonaError::type_error(format!(
                        "apply: final argument must be a list, got {}",
                        other.type_name()
                    )));
                }
            }
        }
    }
    vm.call(*proc, &call_args)
}

/// Install the standard library into `vm`'s global environment.
///
/// # Panics
/// Panics if a primitive name collides with an existing const binding; this
/// can only happen from a bug in this module, never from user input, since
/// it runs once against a brand-new `Vm`.
pub fn install(vm: &mut Vm) {
    arithmetic::install(vm).expect("arithmetic primitives must install cleanly");
    predicates::install(vm).expect("predicate primitives must install cleanly");
    sequence::install(vm).expect("sequence primitives must install cleanly");
    strings::install(vm).expect("string primitives must install cleanly");
    io::install(vm).expect("io primitives must install cleanly");
    vm.defn("apply", apply).expect("apply must install cleanly");
}
