//! Tests for the template engine: raw values, text interpolation, class
//! shorthands, custom brackets, caching and error handling.

extern crate brackish;

use std::cell::RefCell;
use std::rc::Rc;

use brackish::runner::ds::value::{JsNumberType, JsValue};
use brackish::template::TemplateEngine;

fn int(i: i64) -> JsValue {
    JsValue::Number(JsNumberType::Integer(i))
}

fn string(s: &str) -> JsValue {
    JsValue::String(s.to_string())
}

/// Engine plus a data object mirroring the classic fixture: x, str, obj,
/// arr, yes/no flags and a callable.
fn engine_and_data() -> (TemplateEngine, JsValue) {
    let engine = TemplateEngine::new();
    let sandbox = engine.sandbox();

    let obj = sandbox.new_object();
    obj.borrow_mut().set_own("val", int(11));

    let arr = sandbox.new_array(vec![int(1), int(2)]);

    let fn_value = sandbox
        .function(&["s"], "return 'hi ' + (arguments.length ? s : 'there')", None)
        .unwrap();

    let data = sandbox.new_object();
    {
        let mut d = data.borrow_mut();
        d.set_own("x", int(2));
        d.set_own("str", string("x"));
        d.set_own("obj", JsValue::Object(obj));
        d.set_own("arr", JsValue::Object(arr));
        d.set_own("yes", JsValue::Boolean(true));
        d.set_own("no", JsValue::Boolean(false));
        d.set_own("fn", fn_value);
    }
    (engine, JsValue::Object(data))
}

fn render(engine: &TemplateEngine, data: &JsValue, template: &str) -> JsValue {
    engine
        .render(template, data)
        .unwrap_or_else(|e| panic!("render failed for {:?}: {}", template, e))
}

// ============================================================================
// Return values
// ============================================================================

#[test]
fn single_expressions_return_raw_values() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ 1 }"), int(1));
    assert_eq!(render(&engine, &data, "{ x }"), int(2));
    assert_eq!(render(&engine, &data, "{ str }"), string("x"));
    assert_eq!(render(&engine, &data, "{ null }"), JsValue::Null);
    assert_eq!(render(&engine, &data, "{ no }"), JsValue::Boolean(false));
    assert_eq!(render(&engine, &data, "{ yes }"), JsValue::Boolean(true));
}

#[test]
fn raw_objects_keep_their_identity() {
    let (engine, data) = engine_and_data();
    let rendered = render(&engine, &data, "{ obj }");
    let original = match &data {
        JsValue::Object(d) => d.borrow().get_own("obj").unwrap(),
        _ => unreachable!(),
    };
    match (&rendered, &original) {
        (JsValue::Object(a), JsValue::Object(b)) => assert!(Rc::ptr_eq(a, b)),
        other => panic!("expected objects, got {:?}", other),
    }
}

#[test]
fn templates_with_text_return_strings() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ 1 } "), string("1 "));
    assert_eq!(render(&engine, &data, "{ 1 }{ 1 }"), string("11"));
    assert_eq!(render(&engine, &data, "{ 1 } { 1 }"), string("1 1"));
}

#[test]
fn empty_expressions_are_undefined() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{}"), JsValue::Undefined);
    assert_eq!(render(&engine, &data, "{ }"), JsValue::Undefined);
    assert_eq!(render(&engine, &data, ""), string(""));
    assert_eq!(render(&engine, &data, "{ } "), string(" "));
}

#[test]
fn falsy_values_render_empty_except_zero() {
    let (engine, data) = engine_and_data();
    assert_eq!(
        render(&engine, &data, "{ undefined } - { false } - { null } - { 0 }"),
        string(" -  -  - 0")
    );
    assert_eq!(render(&engine, &data, " { no }"), string(" "));
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn expressions_are_just_javascript() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ obj.val }"), int(11));
    assert_eq!(render(&engine, &data, "{ obj[\"val\"] }"), int(11));
    assert_eq!(render(&engine, &data, "{ arr[0] }"), int(1));
    assert_eq!(render(&engine, &data, "{ arr[0]; }"), int(1));
    assert_eq!(render(&engine, &data, "{ arr.pop() }"), int(2));
    assert_eq!(render(&engine, &data, "{ yes && \"ok\" }"), string("ok"));
    assert_eq!(render(&engine, &data, "{ no && \"ok\" }"), JsValue::Boolean(false));
    assert_eq!(
        render(&engine, &data, "{ false || null || !no && yes }"),
        JsValue::Boolean(true)
    );
    assert_eq!(render(&engine, &data, "{ !no ? \"yes\" : \"no\" }"), string("yes"));
    assert_eq!(render(&engine, &data, "{ str == \"x\" }"), JsValue::Boolean(true));
    assert_eq!(render(&engine, &data, "{ /x/.test(str) }"), JsValue::Boolean(true));
    assert_eq!(render(&engine, &data, "{ fn(str) }"), string("hi x"));
    assert_eq!(render(&engine, &data, "{ fn() }"), string("hi there"));
    assert_eq!(render(&engine, &data, "{ this.str }"), string("x"));
    assert_eq!(
        render(&engine, &data, "{filterState==''?'empty':'notempty'}"),
        string("notempty")
    );
}

#[test]
fn math_and_json_are_reachable() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ Math.round(2.6) }"), int(3));
    assert_eq!(render(&engine, &data, "{ typeof Math.random() }"), string("number"));
    assert_eq!(
        render(&engine, &data, "{ JSON.stringify({ x: 5 }) }"),
        string("{\"x\":5}")
    );
}

#[test]
fn missing_variables_read_as_undefined() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ nonExistingVar }"), JsValue::Undefined);
    assert_eq!(render(&engine, &data, "{ !nonExistingVar }"), JsValue::Boolean(true));
    assert_eq!(
        render(&engine, &data, "{ nonExistingVar ? \"yes\" : \"no\" }"),
        string("no")
    );
    assert_eq!(render(&engine, &data, " { nonExistingVar }"), string(" "));
}

#[test]
fn errors_degrade_to_undefined_and_reach_the_handler() {
    let (engine, data) = engine_and_data();
    let messages: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(vec![]));
    let sink = messages.clone();
    engine.set_error_handler(move |e| sink.borrow_mut().push(e.to_string()));

    assert_eq!(
        render(&engine, &data, "{ nonExistingVar.length }"),
        JsValue::Undefined
    );
    assert_eq!(render(&engine, &data, " { nonExistingVar.length }"), string(" "));

    let seen = messages.borrow();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].starts_with("TypeError"));
}

#[test]
fn expressions_can_write_into_the_data() {
    let (engine, data) = engine_and_data();
    if let JsValue::Object(d) = &data {
        d.borrow_mut().set_own("s", int(0));
    }
    render(&engine, &data, "{ s += 1 }");
    render(&engine, &data, "{ s += 1 }");
    if let JsValue::Object(d) = &data {
        assert_eq!(d.borrow().get_own("s"), Some(int(2)));
    }
}

#[test]
fn loops_inside_expressions() {
    let (engine, data) = engine_and_data();
    assert_eq!(
        render(
            &engine,
            &data,
            "{ (function () { var n = 0; for (var i = 0; i < 4; i++) { n += i } return n })() }"
        ),
        int(6)
    );
}

// ============================================================================
// Class shorthands
// ============================================================================

#[test]
fn shorthand_names_render_for_truthy_expressions() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ ok: yes }"), string("ok"));
    assert_eq!(render(&engine, &data, "{ a: !no, b: yes }"), string("a b"));
    assert_eq!(render(&engine, &data, "{ hidden: no }"), string(""));
    assert_eq!(render(&engine, &data, "{ y: 4 > 2 }"), string("y"));
    assert_eq!(render(&engine, &data, "{ y: str == \"x\" }"), string("y"));
    assert_eq!(render(&engine, &data, "{ y: new Date() }"), string("y"));
}

#[test]
fn shorthand_names_may_be_quoted_or_dashed() {
    let (engine, data) = engine_and_data();
    assert_eq!(
        render(&engine, &data, "{ \"a\": yes, 'b': yes, c: yes }"),
        string("a b c")
    );
    assert_eq!(render(&engine, &data, "{ a_b-c3: yes }"), string("a_b-c3"));
    assert_eq!(render(&engine, &data, "{ my-class: yes }"), string("my-class"));
    // one expression can switch several classes
    assert_eq!(render(&engine, &data, "{ \"a b\": yes }"), string("a b"));
}

#[test]
fn shorthand_name_whitespace_is_compacted() {
    let (engine, data) = engine_and_data();
    assert_eq!(
        render(&engine, &data, "{ \" \ta\n \r b\n \": yes }"),
        string("a b")
    );
}

#[test]
fn shorthand_expressions_allow_calls_and_literals() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ ok: fn(1, 2) }"), string("ok"));
    assert_eq!(render(&engine, &data, "{ ok: fn([1, 2]) }"), string("ok"));
    assert_eq!(render(&engine, &data, "{ ok: fn({a: 1, b: 1}) }"), string("ok"));
    assert_eq!(
        render(&engine, &data, "{ primary: (x === 2) }"),
        string("primary")
    );
}

#[test]
fn shorthand_errors_are_silently_dropped() {
    let (engine, data) = engine_and_data();
    assert_eq!(
        render(&engine, &data, "{ loading: !nonExistingVar.length }"),
        string("")
    );
}

// ============================================================================
// Custom brackets
// ============================================================================

#[test]
fn custom_bracket_pairs_render() {
    let (mut engine, data) = engine_and_data();

    engine.set_brackets(Some("[ ]")).unwrap();
    assert_eq!(render(&engine, &data, "[ x ]"), int(2));

    engine.set_brackets(Some("${ }")).unwrap();
    assert_eq!(render(&engine, &data, "${ x }"), int(2));

    engine.set_brackets(None).unwrap();
    assert_eq!(render(&engine, &data, "{ x }"), int(2));
}

#[test]
fn brackets_in_expressions_can_be_escaped() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ \"\\{ 1 \\}\" }"), string("{ 1 }"));
    assert_eq!(render(&engine, &data, "\\{ 1 }"), string("{ 1 }"));
    assert_eq!(render(&engine, &data, "{ \"\\}\" }"), string("}"));
    assert_eq!(render(&engine, &data, "{ \"\\{\" }"), string("{"));
}

#[test]
fn balanced_inner_brackets_need_no_escaping() {
    let (engine, data) = engine_and_data();
    assert_eq!(
        render(&engine, &data, "a{ \"b{c}d\" }e { \"{f{f}}\" } g"),
        string("ab{c}de {f{f}} g")
    );
}

#[test]
fn unsupported_bracket_pairs_error() {
    let (mut engine, _) = engine_and_data();
    assert!(engine.set_brackets(Some("<% %>")).is_err());
}

// ============================================================================
// Engine plumbing
// ============================================================================

#[test]
fn render_json_converts_data() {
    let engine = TemplateEngine::new();
    let out = engine
        .render_json(
            "{ list.length } item(s), first is { list[0].name }",
            &serde_json::json!({ "list": [{ "name": "one" }, { "name": "two" }] }),
        )
        .unwrap();
    assert_eq!(out, string("2 item(s), first is one"));
}

#[test]
fn compiled_templates_are_cached() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, "{ x } "), string("2 "));
    // same template again hits the cache and still renders fresh data
    if let JsValue::Object(d) = &data {
        d.borrow_mut().set_own("x", int(5));
    }
    assert_eq!(render(&engine, &data, "{ x } "), string("5 "));
}

#[test]
fn syntax_errors_propagate_from_render() {
    let (engine, data) = engine_and_data();
    assert!(engine.render("{ var }", &data).is_err());
}

#[test]
fn whitespace_friendly_expressions() {
    let (engine, data) = engine_and_data();
    assert_eq!(render(&engine, &data, " { yes ?\n\t2 : 4} "), string(" 2 "));
    assert_eq!(
        render(&engine, &data, "{ \t \nyes !== no\r\n }"),
        JsValue::Boolean(true)
    );
}

#[test]
fn quotes_are_preserved() {
    let (engine, data) = engine_and_data();
    assert_eq!(
        render(&engine, &data, "{ \"House \\\"Atrides\\\" wins\" }"),
        string("House \"Atrides\" wins")
    );
    assert_eq!(
        render(&engine, &data, "{ \"Leto's house\" }"),
        string("Leto's house")
    );
}
