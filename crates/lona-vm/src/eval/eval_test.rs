// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::vm::Vm;
use proptest::prelude::*;

fn run(vm: &mut Vm, src: &str) -> String {
    let result = vm.load_str("<test>", src).unwrap();
    vm.stringify(result).unwrap()
}

#[test]
fn self_evaluating_forms() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "42"), "42");
    assert_eq!(run(&mut vm, "\"hi\""), "\"hi\"");
    assert_eq!(run(&mut vm, "nil"), "nil");
}

#[test]
fn quote_prevents_evaluation() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "'(1 2 3)"), "(1 2 3)");
}

#[test]
fn if_picks_the_right_branch() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(if true 1 2)"), "1");
    assert_eq!(run(&mut vm, "(if false 1 2)"), "2");
    assert_eq!(run(&mut vm, "(if nil 1)"), "undefined");
}

#[test]
fn define_and_lookup() {
    let mut vm = Vm::new();
    run(&mut vm, "(define x 10)");
    assert_eq!(run(&mut vm, "x"), "10");
}

#[test]
fn set_bang_mutates_existing_binding() {
    let mut vm = Vm::new();
    run(&mut vm, "(define x 1) (set! x 2)");
    assert_eq!(run(&mut vm, "x"), "2");
}

#[test]
fn set_bang_on_unbound_symbol_errors() {
    let mut vm = Vm::new();
    assert!(vm.load_str("<test>", "(set! nope 1)").is_err());
}

#[test]
fn defconst_rejects_later_set() {
    let mut vm = Vm::new();
    run(&mut vm, "(defconst pi 3)");
    assert!(vm.load_str("<test>", "(set! pi 4)").is_err());
}

#[test]
fn lambda_and_call() {
    let mut vm = Vm::new();
    run(&mut vm, "(define square (lambda (x) (* x x)))");
    assert_eq!(run(&mut vm, "(square 5)"), "25");
}

#[test]
fn function_definition_sugar() {
    let mut vm = Vm::new();
    run(&mut vm, "(define (add a b) (+ a b))");
    assert_eq!(run(&mut vm, "(add 2 3)"), "5");
}

#[test]
fn closures_capture_their_defining_environment() {
    let mut vm = Vm::new();
    run(
        &mut vm,
        "(define (make-adder n) (lambda (x) (+ x n))) (define add5 (make-adder 5))",
    );
    assert_eq!(run(&mut vm, "(add5 10)"), "15");
}

#[test]
fn tail_recursion_does_not_overflow() {
    let mut vm = Vm::new();
    run(
        &mut vm,
        "(define (loop n acc) (if (= n 0) acc (loop (- n 1) (+ acc 1))))",
    );
    assert_eq!(run(&mut vm, "(loop 100000 0)"), "100000");
}

#[test]
fn and_or_short_circuit() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(and 1 2 3)"), "3");
    assert_eq!(run(&mut vm, "(and 1 false 3)"), "false");
    assert_eq!(run(&mut vm, "(or false false 7)"), "7");
    assert_eq!(run(&mut vm, "(or 1 2)"), "1");
}

#[test]
fn cond_evaluates_first_matching_clause() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(cond (false 1) (true 2) (else 3))"), "2");
    assert_eq!(run(&mut vm, "(cond (false 1) (else 3))"), "3");
}

#[test]
fn let_bindings_do_not_see_each_other() {
    let mut vm = Vm::new();
    run(&mut vm, "(define x 1)");
    assert_eq!(run(&mut vm, "(let ((x 2) (y x)) y)"), "1");
}

#[test]
fn let_star_bindings_chain() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(let* ((x 2) (y (* x x))) y)"), "4");
}

#[test]
fn while_loops_mutate_via_set_bang() {
    let mut vm = Vm::new();
    run(&mut vm, "(define i 0) (define total 0) (while (< i 5) (set! total (+ total i)) (set! i (+ i 1)))");
    assert_eq!(run(&mut vm, "total"), "10");
}

#[test]
fn catch_returns_the_thrown_value() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(catch (throw 99) 1)"), "99");
}

#[test]
fn catch_around_an_internal_error_yields_a_message() {
    let mut vm = Vm::new();
    let result = vm.load_str("<test>", "(catch (car 5))").unwrap();
    assert!(result.is_string());
}

#[test]
fn unbound_symbol_errors() {
    let mut vm = Vm::new();
    assert!(vm.load_str("<test>", "never-defined").is_err());
}

#[test]
fn define_macro_expands_before_evaluation() {
    let mut vm = Vm::new();
    run(
        &mut vm,
        "(define-macro (my-if c t e) (list 'cond (list c t) (list 'else e)))",
    );
    assert_eq!(run(&mut vm, "(my-if true 1 2)"), "1");
}

#[test]
fn optional_and_rest_arguments() {
    let mut vm = Vm::new();
    run(&mut vm, "(define (f a &optional b &rest c) (list a b c))");
    assert_eq!(run(&mut vm, "(f 1)"), "(1 false nil)");
    assert_eq!(run(&mut vm, "(f 1 2 3 4)"), "(1 2 (3 4))");
}

#[test]
fn label_binds_the_procedure_for_self_reference() {
    let mut vm = Vm::new();
    run(
        &mut vm,
        "(define count (lambda (&label self n) (if (= n 0) 0 (+ 1 (self (- n 1))))))",
    );
    assert_eq!(run(&mut vm, "(count 5)"), "5");
}

#[test]
fn key_arguments_bind_by_assoc_lookup() {
    let mut vm = Vm::new();
    run(&mut vm, "(define (f &key x) x)");
    assert_eq!(run(&mut vm, "(f (cons 'x 9))"), "9");
    assert_eq!(run(&mut vm, "(f)"), "false");
}

#[test]
fn quasiquote_substitutes_unquoted_subforms() {
    let mut vm = Vm::new();
    run(&mut vm, "(define x 5)");
    assert_eq!(run(&mut vm, "`(a ,x c)"), "(a 5 c)");
}

#[test]
fn quasiquote_splices_a_list_in_place() {
    let mut vm = Vm::new();
    run(&mut vm, "(define xs (list 2 3))");
    assert_eq!(run(&mut vm, "`(1 ,@xs 4)"), "(1 2 3 4)");
}

#[test]
fn quasiquote_leaves_plain_structure_untouched() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "`(a b c)"), "(a b c)");
}

#[test]
fn nested_quasiquote_defers_inner_unquote() {
    let mut vm = Vm::new();
    run(&mut vm, "(define x 1)");
    assert_eq!(run(&mut vm, "`(a `(b ,x))"), "(a (quasiquote (b (unquote x))))");
}

#[test]
fn quasiquote_splices_inside_an_array() {
    let mut vm = Vm::new();
    run(&mut vm, "(define xs (list 2 3))");
    assert_eq!(run(&mut vm, "`#(1 ,@xs 4)"), "#(1 2 3 4)");
}

#[test]
fn return_short_circuits_a_procedure_body() {
    let mut vm = Vm::new();
    run(&mut vm, "(define (f) (return 1) 2)");
    assert_eq!(run(&mut vm, "(f)"), "1");
}

#[test]
fn return_short_circuits_through_begin_and_while() {
    let mut vm = Vm::new();
    run(
        &mut vm,
        "(define (first-even xs) (begin (while xs (if (= 0 (modulo (car xs) 2)) (return (car xs))) (set! xs (cdr xs))) false))",
    );
    assert_eq!(run(&mut vm, "(first-even (list 1 3 4 5))"), "4");
}

#[test]
fn return_inside_a_tail_self_call_still_unwinds_once() {
    let mut vm = Vm::new();
    run(
        &mut vm,
        "(define (f n) (if (= n 0) (return 'done) (f (- n 1))))",
    );
    assert_eq!(run(&mut vm, "(f 3)"), "done");
}

#[test]
fn this_yields_the_lexical_environment() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(type-of (this))"), "\"environment\"");
}

#[test]
fn debug_prints_and_returns_its_last_argument() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(debug 1 2 3)"), "3");
}

#[test]
fn case_matches_by_identity_or_list_membership() {
    let mut vm = Vm::new();
    run(&mut vm, "(define (f x) (case x ((1 2) 'small) (3 'three) (else 'other)))");
    assert_eq!(run(&mut vm, "(f 1)"), "small");
    assert_eq!(run(&mut vm, "(f 2)"), "small");
    assert_eq!(run(&mut vm, "(f 3)"), "three");
    assert_eq!(run(&mut vm, "(f 9)"), "other");
}

#[test]
fn case_with_no_matching_clause_and_no_else_is_undefined() {
    let mut vm = Vm::new();
    assert_eq!(run(&mut vm, "(case 9 (1 'one))"), "undefined");
}

#[test]
fn match_destructures_a_tagged_list_pattern() {
    let mut vm = Vm::new();
    run(
        &mut vm,
        "(define (f msg) (match msg ((add a b) (+ a b)) (else 'no-match)))",
    );
    assert_eq!(run(&mut vm, "(f (list 'add 2 3))"), "5");
    assert_eq!(run(&mut vm, "(f (list 'sub 2 3))"), "no-match");
}

#[test]
fn with_output_redirects_writes_for_its_body_only() {
    let mut vm = Vm::new();
    run(
        &mut vm,
        "(define p (open-output-string)) (with-output p (display 42)) (define captured (get-output-string p))",
    );
    assert_eq!(run(&mut vm, "captured"), "\"42\"");
}

#[test]
fn with_output_restores_the_previous_port_after_its_body() {
    let mut vm = Vm::new();
    run(&mut vm, "(define p (open-output-string))");
    run(&mut vm, "(with-output p (display 1))");
    assert_eq!(run(&mut vm, "(eq? *stdout* *stdout*)"), "true");
}

#[test]
fn with_input_redirects_reads_for_its_body_only() {
    let mut vm = Vm::new();
    run(&mut vm, "(define p (open-input-string \"(1 2 3)\"))");
    assert_eq!(run(&mut vm, "(with-input p (read))"), "(1 2 3)");
}

proptest! {
    /// §8 property 4: a tail call never grows the Rust call stack, for any
    /// recursion depth within a single procedure.
    #[test]
    fn tail_recursion_reaches_any_depth_without_overflow(n in 0_i64..200_000) {
        let mut vm = Vm::new();
        run(
            &mut vm,
            "(define (count-down n acc) (if (= n 0) acc (count-down (- n 1) (+ acc 1))))",
        );
        prop_assert_eq!(run(&mut vm, &format!("(count-down {n} 0)")), n.to_string());
    }

    /// §8 property 9: a `throw` unwinds through any number of non-catching
    /// forms (`begin` does not itself handle a throw) to reach its nearest
    /// enclosing `catch` carrying exactly the thrown value, untouched by the
    /// depth of the non-catching nesting it passed through.
    #[test]
    fn catch_receives_the_thrown_value_through_arbitrary_non_catching_nesting(
        depth in 0_usize..20,
        thrown in -1000_i64..1000,
    ) {
        let mut vm = Vm::new();
        let mut expr = format!("(throw {thrown})");
        for _ in 0..depth {
            expr = format!("(begin {expr})");
        }
        expr = format!("(catch {expr})");
        prop_assert_eq!(run(&mut vm, &expr), thrown.to_string());
    }
}
