//! Tests for the sandboxed evaluator's value semantics.
//!
//! These cover literals, operators, conversions, control flow and
//! function values, evaluated through the public Sandbox entry point.

extern crate brackish;

use brackish::runner::api::Sandbox;
use brackish::runner::ds::error::EvalError;
use brackish::runner::ds::value::{JsNumberType, JsValue};

/// Helper: evaluate in a fresh sandbox.
fn eval(source: &str) -> JsValue {
    Sandbox::new()
        .eval(source, None)
        .unwrap_or_else(|e| panic!("eval failed for {:?}: {}", source, e))
}

fn eval_err(source: &str) -> EvalError {
    match Sandbox::new().eval(source, None) {
        Ok(v) => panic!("expected error for {:?}, got {:?}", source, v),
        Err(e) => e,
    }
}

fn int(i: i64) -> JsValue {
    JsValue::Number(JsNumberType::Integer(i))
}

fn string(s: &str) -> JsValue {
    JsValue::String(s.to_string())
}

// ============================================================================
// Literals and primaries
// ============================================================================

#[test]
fn literals() {
    assert_eq!(eval("42"), int(42));
    assert_eq!(eval("0x10"), int(16));
    assert_eq!(eval("'hi'"), string("hi"));
    assert_eq!(eval("\"hi\""), string("hi"));
    assert_eq!(eval("true"), JsValue::Boolean(true));
    assert_eq!(eval("null"), JsValue::Null);
    assert_eq!(eval("undefined"), JsValue::Undefined);
    match eval("3.25") {
        JsValue::Number(JsNumberType::Float(f)) => assert!((f - 3.25).abs() < 1e-12),
        other => panic!("expected float, got {:?}", other),
    }
}

#[test]
fn the_program_value_is_the_last_statement() {
    assert_eq!(eval("1; 2; 3"), int(3));
    assert_eq!(eval("var x = 1; x + 1"), int(2));
}

#[test]
fn empty_program_is_undefined() {
    assert_eq!(eval(""), JsValue::Undefined);
    assert_eq!(eval("  "), JsValue::Undefined);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), int(7));
    assert_eq!(eval("10 % 3"), int(1));
    assert_eq!(eval("4 / 2"), int(2));
    assert_eq!(eval("1 / 2"), JsValue::Number(JsNumberType::Float(0.5)));
    assert_eq!(eval("-5"), int(-5));
    assert_eq!(eval("+'12'"), int(12));
    assert_eq!(eval("~1"), int(-2));
}

#[test]
fn division_by_zero() {
    assert_eq!(
        eval("1 / 0"),
        JsValue::Number(JsNumberType::PositiveInfinity)
    );
    assert_eq!(eval("0 / 0"), JsValue::Number(JsNumberType::NaN));
}

#[test]
fn string_concatenation() {
    assert_eq!(eval("'a' + 'b'"), string("ab"));
    assert_eq!(eval("1 + '2'"), string("12"));
    assert_eq!(eval("'n=' + 5"), string("n=5"));
    assert_eq!(eval("'' + [1,2]"), string("1,2"));
}

#[test]
fn equality_is_strict_for_both_operator_spellings() {
    assert_eq!(eval("1 == 1"), JsValue::Boolean(true));
    assert_eq!(eval("1 == '1'"), JsValue::Boolean(false));
    assert_eq!(eval("1 === '1'"), JsValue::Boolean(false));
    assert_eq!(eval("1 != '1'"), JsValue::Boolean(true));
    assert_eq!(eval("null == undefined"), JsValue::Boolean(false));
    assert_eq!(eval("0/0 == 0/0"), JsValue::Boolean(false));
}

#[test]
fn relational_operators() {
    assert_eq!(eval("2 < 10"), JsValue::Boolean(true));
    assert_eq!(eval("'2' < '10'"), JsValue::Boolean(false)); // lexicographic
    assert_eq!(eval("'a' < 'b'"), JsValue::Boolean(true));
    assert_eq!(eval("3 >= 3"), JsValue::Boolean(true));
}

#[test]
fn logical_operators_return_operands() {
    assert_eq!(eval("true && 'ok'"), string("ok"));
    assert_eq!(eval("false && 'ok'"), JsValue::Boolean(false));
    assert_eq!(eval("false || null || 'last'"), string("last"));
    assert_eq!(eval("0 || 'fallback'"), string("fallback"));
}

#[test]
fn conditional_expression() {
    assert_eq!(eval("1 < 2 ? 'yes' : 'no'"), string("yes"));
    assert_eq!(eval("1 > 2 ? 'yes' : 'no'"), string("no"));
}

#[test]
fn bitwise_operators() {
    assert_eq!(eval("6 & 3"), int(2));
    assert_eq!(eval("6 | 3"), int(7));
    assert_eq!(eval("6 ^ 3"), int(5));
}

#[test]
fn typeof_strings() {
    assert_eq!(eval("typeof 1"), string("number"));
    assert_eq!(eval("typeof 'a'"), string("string"));
    assert_eq!(eval("typeof true"), string("boolean"));
    assert_eq!(eval("typeof undefined"), string("undefined"));
    assert_eq!(eval("typeof null"), string("object"));
    assert_eq!(eval("typeof {}"), string("object"));
    assert_eq!(eval("typeof function () {}"), string("function"));
}

#[test]
fn update_expressions_yield_the_old_value() {
    assert_eq!(eval("var i = 5; i++"), int(5));
    assert_eq!(eval("var i = 5; i++; i"), int(6));
    assert_eq!(eval("var i = 5; i--; i"), int(4));
}

#[test]
fn compound_assignment() {
    assert_eq!(eval("var s = 'a'; s += 'b'; s"), string("ab"));
    assert_eq!(eval("var n = 10; n -= 4; n"), int(6));
}

// ============================================================================
// Objects, arrays, members
// ============================================================================

#[test]
fn array_and_object_literals() {
    assert_eq!(eval("[1,2,3].length"), int(3));
    assert_eq!(eval("[10,20][1]"), int(20));
    assert_eq!(eval("({a: 1}).a"), int(1));
    assert_eq!(eval("({'k e y': 2})['k e y']"), int(2));
    assert_eq!(eval("var o = {a: {b: 5}}; o.a.b"), int(5));
}

#[test]
fn member_writes() {
    assert_eq!(eval("var o = {}; o.x = 3; o.x"), int(3));
    assert_eq!(eval("var a = [1]; a[2] = 9; a.length"), int(3));
    assert_eq!(eval("var a = [1]; a[0] = 7; a[0]"), int(7));
}

#[test]
fn reading_members_of_nothing_is_an_error() {
    assert!(matches!(eval_err("null.x"), EvalError::TypeError(_)));
    assert!(matches!(eval_err("undefined.x"), EvalError::TypeError(_)));
}

#[test]
fn in_and_instanceof() {
    assert_eq!(eval("'a' in {a: 1}"), JsValue::Boolean(true));
    assert_eq!(eval("'b' in {a: 1}"), JsValue::Boolean(false));
    assert_eq!(eval("0 in [5]"), JsValue::Boolean(true));
    assert_eq!(eval("[] instanceof Array"), JsValue::Boolean(true));
    assert_eq!(eval("({}) instanceof Array"), JsValue::Boolean(false));
}

// ============================================================================
// Builtin methods
// ============================================================================

#[test]
fn array_methods() {
    assert_eq!(eval("[3,1,2].indexOf(2)"), int(2));
    assert_eq!(eval("[3,1,2].indexOf(9)"), int(-1));
    assert_eq!(eval("[1,2,3].join('-')"), string("1-2-3"));
    assert_eq!(eval("[1,2].concat([3], 4).join('')"), string("1234"));
    assert_eq!(eval("var a = [1]; a.push(2, 3)"), int(3));
    assert_eq!(eval("var a = [1,2]; a.pop()"), int(2));
    assert_eq!(eval("[1,2,3,4].slice(1, 3).join('')"), string("23"));
    assert_eq!(eval("[1,2,3].filter(function (x) { return x > 1 }).length"), int(2));
    assert_eq!(
        eval("[1,2,3].reduce(function (acc, x) { return acc + x }, 10)"),
        int(16)
    );
}

#[test]
fn string_methods() {
    assert_eq!(eval("'riot'.toUpperCase()"), string("RIOT"));
    assert_eq!(eval("'AbC'.toLowerCase()"), string("abc"));
    assert_eq!(eval("'hello'.indexOf('ll')"), int(2));
    assert_eq!(eval("'hello'.charAt(1)"), string("e"));
    assert_eq!(eval("'a,b,c'.split(',').length"), int(3));
    assert_eq!(eval("'  x  '.trim()"), string("x"));
    assert_eq!(eval("'hello'.slice(1, 3)"), string("el"));
    assert_eq!(eval("'aXbXc'.replace('X', '-')"), string("a-bXc"));
    assert_eq!(eval("'\\r\\n'.charCodeAt(0)"), int(13));
}

#[test]
fn number_methods() {
    assert_eq!(eval("(3.14159).toFixed(2)"), string("3.14"));
    assert_eq!(eval("(7).toString()"), string("7"));
}

#[test]
fn regex_literals_and_test() {
    assert_eq!(eval("/^14/.test('1464')"), JsValue::Boolean(true));
    assert_eq!(eval("/^14/.test('x14')"), JsValue::Boolean(false));
    assert_eq!(eval("/abc/i.test('xABCy')"), JsValue::Boolean(true));
    assert_eq!(eval("/x/.source"), string("x"));
    assert_eq!(eval("'abc'.search(/c/)"), int(2));
    assert_eq!(eval("10 /2+10/ 1"), int(15));
}

#[test]
fn date_values_are_numbers() {
    assert_eq!(eval("typeof +new Date()"), string("number"));
    assert_eq!(eval("new Date(86400000).getFullYear()"), int(1970));
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn function_declaration_and_call() {
    assert_eq!(eval("function add(a, b) { return a + b } add(2, 3)"), int(5));
}

#[test]
fn function_declarations_hoist() {
    assert_eq!(eval("var r = add(1, 2); function add(a, b) { return a + b } r"), int(3));
}

#[test]
fn function_expression_closure() {
    assert_eq!(
        eval("var make = function (n) { return function (m) { return n + m } }; make(10)(5)"),
        int(15)
    );
}

#[test]
fn missing_arguments_are_unbound_and_extras_ignored() {
    assert_eq!(eval("function f(a, b) { return a } f(1, 2, 3)"), int(1));
    // reading a parameter that never got an argument is a reference error
    assert!(matches!(
        eval_err("function f(a, b) { return b } f(1)"),
        EvalError::ReferenceError(_)
    ));
}

#[test]
fn arguments_object() {
    assert_eq!(eval("function f() { return arguments.length } f(1, 2, 3)"), int(3));
    assert_eq!(eval("function f() { return arguments[1] } f('a', 'b')"), string("b"));
}

#[test]
fn this_binding() {
    assert_eq!(
        eval("var o = {n: 7}; o.get = function () { return this.n }; o.get()"),
        int(7)
    );
    // a bare call sees null, never a host global object
    assert_eq!(eval("function f() { return this } f()"), JsValue::Null);
}

#[test]
fn call_and_apply() {
    assert_eq!(
        eval("function f(x) { return this.n + x } f.call({n: 1}, 2)"),
        int(3)
    );
    assert_eq!(
        eval("function f(x, y) { return x + y } f.apply(null, [3, 4])"),
        int(7)
    );
}

#[test]
fn map_end_to_end() {
    let result = eval("[1,2,3].map(function (x) { return x + 1 })");
    assert_eq!(result.to_string(), "2,3,4");
}

#[test]
fn new_on_scripted_functions() {
    assert_eq!(
        eval("function Point(x) { this.x = x } new Point(4).x"),
        int(4)
    );
    assert_eq!(
        eval(
            "function Point(x) { this.x = x } \
             Point.prototype.getX = function () { return this.x }; \
             new Point(9).getX()"
        ),
        int(9)
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn unresolved_identifiers_raise_reference_errors() {
    match eval_err("missingVar") {
        EvalError::ReferenceError(m) => assert_eq!(m, "missingVar is not defined"),
        other => panic!("expected ReferenceError, got {}", other),
    }
}

#[test]
fn syntax_errors_surface() {
    assert!(matches!(eval_err("var ="), EvalError::SyntaxError(_)));
    assert!(matches!(eval_err("1 = 2"), EvalError::SyntaxError(_)));
}

#[test]
fn calling_a_non_function_is_a_type_error() {
    assert!(matches!(eval_err("var x = 1; x()"), EvalError::TypeError(_)));
}
