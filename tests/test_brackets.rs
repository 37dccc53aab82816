//! Tests for the bracket/text splitter.

extern crate brackish;

use brackish::template::brackets::{has_expr, loop_keys, split, Brackets, Fragment};

fn default_pair() -> Brackets {
    Brackets::default_pair()
}

fn text(s: &str) -> Fragment {
    Fragment::Text(s.to_string())
}

fn expr(s: &str) -> Fragment {
    Fragment::Expr(s.to_string())
}

#[test]
fn splits_text_and_expressions() {
    assert_eq!(
        split("Hi { name }!", &default_pair()),
        vec![text("Hi "), expr(" name "), text("!")]
    );
}

#[test]
fn adjacent_expressions() {
    assert_eq!(
        split("{ 1 }{ 2 }", &default_pair()),
        vec![text(""), expr(" 1 "), text(""), expr(" 2 ")]
    );
}

#[test]
fn plain_text_stays_whole() {
    assert_eq!(split("no expressions here", &default_pair()), vec![text("no expressions here")]);
}

#[test]
fn nested_js_brackets_are_skipped() {
    assert_eq!(
        split("{ fn({a: 1}, [2, 3]) }", &default_pair()),
        vec![text(""), expr(" fn({a: 1}, [2, 3]) ")]
    );
}

#[test]
fn quoted_strings_hide_brackets() {
    assert_eq!(
        split("a{ \"b{c}d\" }e", &default_pair()),
        vec![text("a"), expr(" \"b{c}d\" "), text("e")]
    );
    assert_eq!(
        split("{ '}' }", &default_pair()),
        vec![text(""), expr(" '}' ")]
    );
}

#[test]
fn escaped_brackets_become_literal_text() {
    assert_eq!(
        split("\\{ 1 }", &default_pair()),
        vec![text("{ 1 }")]
    );
    assert_eq!(
        split("a \\{ b \\} c", &default_pair()),
        vec![text("a { b } c")]
    );
}

#[test]
fn escaped_brackets_unescape_inside_expressions() {
    let pair = Brackets::set(Some("[ ]")).unwrap();
    assert_eq!(
        split("[ arr\\[0\\] ]", &pair),
        vec![text(""), expr(" arr[0] ")]
    );
}

#[test]
fn regex_literals_hide_brackets_and_slashes() {
    assert_eq!(
        split("{ /}/.test(s) }", &default_pair()),
        vec![text(""), expr(" /}/.test(s) ")]
    );
    // a division is not mistaken for a regex opener
    assert_eq!(
        split("{ 10 /x+10/ 1 }", &default_pair()),
        vec![text(""), expr(" 10 /x+10/ 1 ")]
    );
}

#[test]
fn custom_pairs() {
    let pair = Brackets::set(Some("[ ]")).unwrap();
    assert_eq!(split("a[ x ]b", &pair), vec![text("a"), expr(" x "), text("b")]);

    let pair = Brackets::set(Some("${ }")).unwrap();
    assert_eq!(split("a${ x }b", &pair), vec![text("a"), expr(" x "), text("b")]);

    let pair = Brackets::set(Some("{{ }}")).unwrap();
    assert_eq!(
        split("a{{ \"b{{c}}d\" }}e", &pair),
        vec![text("a"), expr(" \"b{{c}}d\" "), text("e")]
    );
}

#[test]
fn invalid_pairs_are_rejected() {
    assert!(Brackets::set(Some("<% %>")).is_err());
    assert!(Brackets::set(Some("{ } {")).is_err());
    assert!(Brackets::set(Some("ab cd")).is_err());
    assert!(Brackets::set(Some("{}")).is_err());
}

#[test]
fn empty_pair_restores_the_default() {
    assert_eq!(Brackets::set(None).unwrap(), Brackets::default_pair());
    assert_eq!(Brackets::set(Some("")).unwrap(), Brackets::default_pair());
}

#[test]
fn has_expr_requires_a_complete_pair() {
    let pair = default_pair();
    assert!(has_expr("{ x }", &pair));
    assert!(has_expr("text { x } more", &pair));
    assert!(!has_expr("plain text", &pair));
    assert!(!has_expr("{ unterminated", &pair));
}

#[test]
fn loop_keys_extracts_each_parts() {
    let pair = default_pair();

    let keys = loop_keys("{ item in items }", &pair);
    assert_eq!(keys.key.as_deref(), Some("item"));
    assert_eq!(keys.pos, None);
    assert_eq!(keys.val, "{items}");

    let keys = loop_keys("{ item, i in items }", &pair);
    assert_eq!(keys.key.as_deref(), Some("item"));
    assert_eq!(keys.pos.as_deref(), Some("i"));
    assert_eq!(keys.val, "{items}");

    // non-loop expressions come back whole
    let keys = loop_keys("{ title }", &pair);
    assert_eq!(keys.key, None);
    assert_eq!(keys.val, "{ title }");
}
