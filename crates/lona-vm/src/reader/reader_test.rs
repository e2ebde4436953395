// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::read_all;
use crate::value::Value;
use crate::vm::Vm;
use proptest::prelude::*;

#[test]
fn reads_atoms() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "42 3.5 \"hi\" sym").unwrap();
    assert_eq!(forms.len(), 4);
    assert!(matches!(forms[0], Value::Number(n) if n == 42.0));
    assert!(matches!(forms[1], Value::Number(n) if (n - 3.5).abs() < f64::EPSILON));
    assert!(forms[2].is_string());
    assert!(forms[3].is_symbol());
}

#[test]
fn reads_nested_lists() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "(+ 1 (* 2 3))").unwrap();
    assert_eq!(forms.len(), 1);
    assert!(forms[0].is_pair());
    assert_eq!(vm.stringify(forms[0]).unwrap(), "(+ 1 (* 2 3))");
}

#[test]
fn reads_quote_shorthand() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "'(a b)").unwrap();
    assert_eq!(vm.stringify(forms[0]).unwrap(), "'(a b)");
}

#[test]
fn reads_bracket_and_brace_list_synonyms() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "[+ 1 2] {+ 3 4}").unwrap();
    assert_eq!(vm.stringify(forms[0]).unwrap(), "(+ 1 2)");
    assert_eq!(vm.stringify(forms[1]).unwrap(), "(+ 3 4)");
}

#[test]
fn mismatched_brackets_are_rejected() {
    let mut vm = Vm::new();
    assert!(read_all(&mut vm, "<test>", "(a b]").is_err());
}

#[test]
fn reads_dotted_pair() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "(a . b)").unwrap();
    assert_eq!(vm.stringify(forms[0]).unwrap(), "(a . b)");
}

#[test]
fn reads_array_and_dictionary_literals() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "#(1 2 3) ##[(a . 1) (b . 2)]").unwrap();
    assert_eq!(vm.stringify(forms[0]).unwrap(), "#(1 2 3)");
    assert_eq!(vm.stringify(forms[1]).unwrap(), "##[a 1 b 2]");
}

#[test]
fn array_literal_accepts_any_bracket_family() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "#[1 2] #{3 4}").unwrap();
    assert_eq!(vm.stringify(forms[0]).unwrap(), "#(1 2)");
    assert_eq!(vm.stringify(forms[1]).unwrap(), "#(3 4)");
}

#[test]
fn dict_literal_rejects_non_pair_elements() {
    let mut vm = Vm::new();
    assert!(read_all(&mut vm, "<test>", "##[a]").is_err());
}

#[test]
fn reads_colon_accessor_path() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "a:b:c").unwrap();
    assert_eq!(vm.stringify(forms[0]).unwrap(), "(get a (quote b) (quote c))");
}

#[test]
fn reads_caret_lambda_shorthand() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "^((x) (+ x 1))").unwrap();
    assert_eq!(vm.stringify(forms[0]).unwrap(), "(lambda (x) (+ x 1))");
}

#[test]
fn reads_string_interpolation() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "\"a\\(name)b\"").unwrap();
    assert_eq!(
        vm.stringify(forms[0]).unwrap(),
        "(concat \"a\" (evalq name) \"b\")"
    );
}

#[test]
fn reads_hex_buffer_literal() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "#x\"deadbeef\"").unwrap();
    assert_eq!(vm.stringify(forms[0]).unwrap(), "#x\"deadbeef\"");
}

#[test]
fn rejects_unterminated_list() {
    let mut vm = Vm::new();
    assert!(read_all(&mut vm, "<test>", "(a b").is_err());
}

#[test]
fn symbols_intern_to_the_same_handle() {
    let mut vm = Vm::new();
    let forms = read_all(&mut vm, "<test>", "foo foo").unwrap();
    assert_eq!(forms[0].handle(), forms[1].handle());
}

proptest! {
    /// §8 property 1: printing a value and reading it back yields an
    /// identical value, for integer-valued numbers (no float rounding to
    /// muddy the comparison) and for strings free of the characters the
    /// reader treats specially.
    #[test]
    fn integers_round_trip_through_print_and_read(n in -1_000_000_i64..1_000_000) {
        let mut vm = Vm::new();
        let original = Value::Number(n as f64);
        let printed = vm.stringify(original).unwrap();
        let forms = read_all(&mut vm, "<test>", &printed).unwrap();
        prop_assert_eq!(forms.len(), 1);
        prop_assert!(matches!(forms[0], Value::Number(m) if (m - n as f64).abs() < f64::EPSILON));
    }

    #[test]
    fn strings_round_trip_through_print_and_read(s in "[a-zA-Z0-9 ]{0,32}") {
        let mut vm = Vm::new();
        let original = vm.make_string(s.clone());
        let printed = vm.stringify(original).unwrap();
        let forms = read_all(&mut vm, "<test>", &printed).unwrap();
        prop_assert_eq!(forms.len(), 1);
        prop_assert_eq!(vm.stringify(forms[0]).unwrap(), printed);
    }
}
