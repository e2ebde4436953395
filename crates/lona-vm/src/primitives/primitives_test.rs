// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::vm::Vm;

fn run(vm: &mut Vm, src: &str) -> String {
    let result = vm.load_str("<test>", src).unwrap();
    vm.stringify(result).unwrap()
}

#[test]
fn arithmetic_basics() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(+ 1 2 3)"), "4");
    assert_eq!(run(&mut vm, "(- 10 3 2)"), "5");
    assert_eq!(run(&mut vm, "(* 2 3 4)"), "24");
    assert_eq!(run(&mut vm, "(/ 100 5 2)"), "10");
}

#[test]
fn division_by_zero_errors() {
    let mut vm = Vm::new();
    assert!(vm.load_str("<test>", "(/ 1 0)").is_err());
}

#[test]
fn comparisons_chain() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(< 1 2 3)"), "true");
    assert_eq!(run(&mut vm, "(< 1 3 2)"), "false");
}

#[test]
fn predicates_cover_each_kind() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(nil? nil)"), "true");
    assert_eq!(run(&mut vm, "(pair? (cons 1 2))"), "true");
    assert_eq!(run(&mut vm, "(string? \"x\")"), "true");
    assert_eq!(run(&mut vm, "(number? 1)"), "true");
    assert_eq!(run(&mut vm, "(symbol? 'x)"), "true");
}

#[test]
fn eq_is_identity_equal_is_structural() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(eq? \"a\" \"a\")"), "false");
    assert_eq!(run(&mut vm, "(equal? \"a\" \"a\")"), "true");
    assert_eq!(run(&mut vm, "(eq? 'a 'a)"), "true");
}

#[test]
fn list_operations() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(car (cons 1 2))"), "1");
    assert_eq!(run(&mut vm, "(cdr (cons 1 2))"), "2");
    assert_eq!(run(&mut vm, "(length (list 1 2 3))"), "3");
    assert_eq!(run(&mut vm, "(append (list 1 2) (list 3 4))"), "(1 2 3 4)");
    assert_eq!(run(&mut vm, "(reverse (list 1 2 3))"), "(3 2 1)");
    assert_eq!(run(&mut vm, "(nth (list 1 2 3) 1)"), "2");
}

#[test]
fn array_mutation() {
    let mut vm = Vm::new();
    run(&mut vm, "(define a (array 1 2 3))");
    run(&mut vm, "(array-set! a 1 99)");
    assert_eq!(run(&mut vm, "(array-ref a 1)"), "99");
    run(&mut vm, "(array-push! a 4)");
    assert_eq!(run(&mut vm, "(array-ref a 3)"), "4");
}

#[test]
fn string_operations() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(string-append \"foo\" \"bar\")"), "\"foobar\"");
    assert_eq!(run(&mut vm, "(string-length \"hello\")"), "5");
    assert_eq!(run(&mut vm, "(substring \"hello\" 1 3)"), "\"el\"");
}

#[test]
fn string_number_conversions_round_trip() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(string->number (number->string 42))"), "42");
}

#[test]
fn read_from_string_parses_a_form() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(read-from-string \"(1 2 3)\")"), "(1 2 3)");
}
