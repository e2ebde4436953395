// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Value comparison (§3): identity (`eq?`) compares immediates by variant
//! and heap values by handle; structural equality (`equal?`) additionally
//! compares strings and buffers by content.
//!
//! Kept as free functions rather than a `PartialEq` impl on `Value` because
//! structural comparison needs heap access that `Value` itself does not carry.

use crate::error::Result;
use crate::heap::Heap;
use crate::value::Value;
use crate::value::object::HeapObject;

/// `eq?`: immediates compare by variant, heap kinds by handle identity.
#[must_use]
pub fn identical(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil)
        | (Value::True, Value::True)
        | (Value::False, Value::False)
        | (Value::Undefined, Value::Undefined)
        | (Value::Eof, Value::Eof) => true,
        (Value::Number(x), Value::Number(y)) => x.to_bits() == y.to_bits(),
        _ => match (a.handle(), b.handle()) {
            (Some(ha), Some(hb)) => ha == hb && std::mem::discriminant(&a) == std::mem::discriminant(&b),
            _ => false,
        },
    }
}

/// `equal?`: like `identical`, but strings and buffers compare by content.
///
/// # Errors
/// Returns `Err` if either value addresses a dangling handle.
pub fn equal(heap: &Heap, a: Value, b: Value) -> Result<bool> {
    if identical(a, b) {
        return Ok(true);
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok((x - y).abs() == 0.0 || x.to_bits() == y.to_bits()),
        (Value::String(ha), Value::String(hb)) => {
            let HeapObject::String(sa) = heap.get(ha)? else {
                unreachable!()
            };
            let HeapObject::String(sb) = heap.get(hb)? else {
                unreachable!()
            };
            Ok(sa.bytes == sb.bytes)
        }
        (Value::Buffer(ha), Value::Buffer(hb)) => {
            let HeapObject::Buffer(ba) = heap.get(ha)? else {
                unreachable!()
            };
            let HeapObject::Buffer(bb) = heap.get(hb)? else {
                unreachable!()
            };
            Ok(ba.bytes == bb.bytes)
        }
        (Value::Pair(ha), Value::Pair(hb)) => {
            let HeapObject::Pair(pa) = heap.get(ha)? else {
                unreachable!()
            };
            let HeapObject::Pair(pb) = heap.get(hb)? else {
                unreachable!()
            };
            let (car_a, cdr_a) = (pa.car, pa.cdr);
            let (car_b, cdr_b) = (pb.car, pb.cdr);
            Ok(equal(heap, car_a, car_b)? && equal(heap, cdr_a, cdr_b)?)
        }
        (Value::Array(ha), Value::Array(hb)) => {
            let HeapObject::Array(aa) = heap.get(ha)? else {
                unreachable!()
            };
            let HeapObject::Array(ab) = heap.get(hb)? else {
                unreachable!()
            };
            if aa.items.len() != ab.items.len() {
                return Ok(false);
            }
            for (x, y) in aa.items.iter().zip(ab.items.iter()) {
                if !equal(heap, *x, *y)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}
