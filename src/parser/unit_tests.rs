use super::ast::*;
use super::{free_variables, parse_to_ast, prepare_ast};

fn parse(script: &str) -> ProgramData {
    parse_to_ast(script).unwrap_or_else(|e| panic!("parse failed for {:?}: {}", script, e.message))
}

#[test]
fn parses_variable_declaration_with_binary_init() {
    let program = parse("var x = 5 + 3;");
    assert_eq!(program.body.len(), 1);
    match &program.body[0] {
        StatementType::VariableDeclaration(decl) => {
            assert_eq!(decl.kind, VariableDeclarationKind::Var);
            assert_eq!(decl.declarations.len(), 1);
            assert_eq!(decl.declarations[0].id.name, "x");
            match decl.declarations[0].init.as_ref().unwrap() {
                ExpressionType::BinaryExpression { operator, .. } => {
                    assert!(matches!(operator, BinaryOperator::Add))
                }
                other => panic!("expected BinaryExpression, got {}", other.kind_name()),
            }
        }
        other => panic!("expected VariableDeclaration, got {}", other.kind_name()),
    }
}

#[test]
fn parses_let_and_const_kinds() {
    let program = parse("let a = 1; const b = 2;");
    match &program.body[0] {
        StatementType::VariableDeclaration(decl) => {
            assert_eq!(decl.kind, VariableDeclarationKind::Let)
        }
        other => panic!("unexpected {}", other.kind_name()),
    }
    match &program.body[1] {
        StatementType::VariableDeclaration(decl) => {
            assert_eq!(decl.kind, VariableDeclarationKind::Const)
        }
        other => panic!("unexpected {}", other.kind_name()),
    }
}

#[test]
fn parses_classic_for_loop() {
    let program = parse("for (var i = 0; i < 3; i++) { s += i }");
    match &program.body[0] {
        StatementType::ForStatement {
            init,
            test,
            update,
            body,
            ..
        } => {
            assert!(matches!(init, Some(ForInit::VariableDeclaration(_))));
            assert!(test.is_some());
            assert!(matches!(
                update,
                Some(ExpressionType::UpdateExpression { prefix: false, .. })
            ));
            assert!(matches!(**body, StatementType::BlockStatement(_)));
        }
        other => panic!("expected ForStatement, got {}", other.kind_name()),
    }
}

#[test]
fn parses_for_in_with_let_binding() {
    let program = parse("for (let k in obj) { k }");
    match &program.body[0] {
        StatementType::ForInStatement(data) => match &data.left {
            ForInLeft::Declaration { kind, id } => {
                assert_eq!(*kind, VariableDeclarationKind::Let);
                assert_eq!(id.name, "k");
            }
            ForInLeft::Identifier(_) => panic!("expected a declaration binding"),
        },
        other => panic!("expected ForInStatement, got {}", other.kind_name()),
    }
}

#[test]
fn parses_member_call_chain() {
    let program = parse("a.b[\"c\"](1)");
    match &program.body[0] {
        StatementType::ExpressionStatement { expression, .. } => match expression {
            ExpressionType::CallExpression {
                callee, arguments, ..
            } => {
                assert_eq!(arguments.len(), 1);
                assert!(matches!(
                    **callee,
                    ExpressionType::MemberExpression(
                        MemberExpressionType::ComputedMemberExpression { .. }
                    )
                ));
            }
            other => panic!("expected CallExpression, got {}", other.kind_name()),
        },
        other => panic!("unexpected {}", other.kind_name()),
    }
}

#[test]
fn division_is_not_mistaken_for_regex() {
    let program = parse("10 /x+10/ 1");
    match &program.body[0] {
        StatementType::ExpressionStatement { expression, .. } => match expression {
            // (10 / x) + (10 / 1)
            ExpressionType::BinaryExpression { operator, .. } => {
                assert!(matches!(operator, BinaryOperator::Add))
            }
            other => panic!("expected division, got {}", other.kind_name()),
        },
        other => panic!("unexpected {}", other.kind_name()),
    }
}

#[test]
fn regex_literal_in_operand_position() {
    let program = parse("/^14/i.test(x)");
    match &program.body[0] {
        StatementType::ExpressionStatement { expression, .. } => match expression {
            ExpressionType::CallExpression { callee, .. } => match callee.as_ref() {
                ExpressionType::MemberExpression(
                    MemberExpressionType::SimpleMemberExpression { object, .. },
                ) => match object.as_ref() {
                    ExpressionType::Literal(LiteralData {
                        value: LiteralType::RegExpLiteral(regex),
                        ..
                    }) => {
                        assert_eq!(regex.pattern, "^14");
                        assert_eq!(regex.flags, "i");
                    }
                    other => panic!("expected regex literal, got {}", other.kind_name()),
                },
                other => panic!("expected member expression, got {}", other.kind_name()),
            },
            other => panic!("expected CallExpression, got {}", other.kind_name()),
        },
        other => panic!("unexpected {}", other.kind_name()),
    }
}

#[test]
fn parses_function_expression_with_params() {
    let program = parse("var f = function (a, b) { return a + b };");
    match &program.body[0] {
        StatementType::VariableDeclaration(decl) => {
            match decl.declarations[0].init.as_ref().unwrap() {
                ExpressionType::FunctionExpression(data) => {
                    assert!(data.id.is_none());
                    assert_eq!(data.params.len(), 2);
                    assert_eq!(data.params[0].name, "a");
                    assert_eq!(data.body.body.len(), 1);
                }
                other => panic!("expected FunctionExpression, got {}", other.kind_name()),
            }
        }
        other => panic!("unexpected {}", other.kind_name()),
    }
}

#[test]
fn parses_switch_with_default() {
    let program = parse("switch (x) { case 1: a(); case 2: b(); break; default: c() }");
    match &program.body[0] {
        StatementType::SwitchStatement { cases, .. } => {
            assert_eq!(cases.len(), 3);
            assert!(cases[0].test.is_some());
            assert!(cases[2].test.is_none());
            assert_eq!(cases[1].consequent.len(), 2);
        }
        other => panic!("unexpected {}", other.kind_name()),
    }
}

#[test]
fn parses_string_escapes() {
    let program = parse(r#"'a \'quote\' \n A'"#);
    match &program.body[0] {
        StatementType::ExpressionStatement { expression, .. } => match expression {
            ExpressionType::Literal(LiteralData {
                value: LiteralType::StringLiteral(s),
                ..
            }) => assert_eq!(s, "a 'quote' \n A"),
            other => panic!("expected string literal, got {}", other.kind_name()),
        },
        other => panic!("unexpected {}", other.kind_name()),
    }
}

#[test]
fn keywords_are_not_identifiers() {
    assert!(parse_to_ast("var function = 1").is_err());
    assert!(parse_to_ast("new = 2").is_err());
}

#[test]
fn assignment_target_must_be_assignable() {
    assert!(parse_to_ast("1 = 2").is_err());
    assert!(parse_to_ast("a + b = 2").is_err());
    assert!(parse_to_ast("f() = 2").is_err());
}

#[test]
fn hoisting_moves_functions_and_predeclares_vars() {
    let program = prepare_ast(parse("f(); function f() { var inner = 1 } var a = 1;"));
    assert!(matches!(
        program.body[0],
        StatementType::FunctionDeclaration(_)
    ));
    match &program.body[1] {
        StatementType::VariableDeclaration(decl) => {
            assert_eq!(decl.declarations.len(), 1);
            assert_eq!(decl.declarations[0].id.name, "a");
            assert!(decl.declarations[0].init.is_none());
        }
        other => panic!("expected hoisted var declaration, got {}", other.kind_name()),
    }
}

#[test]
fn hoisting_collects_vars_from_nested_blocks() {
    let program = prepare_ast(parse("if (x) { var y = 1 } else { var z = 2 }"));
    match &program.body[0] {
        StatementType::VariableDeclaration(decl) => {
            let names: Vec<&str> = decl
                .declarations
                .iter()
                .map(|d| d.id.name.as_str())
                .collect();
            assert_eq!(names, vec!["y", "z"]);
        }
        other => panic!("expected hoisted declaration, got {}", other.kind_name()),
    }
}

#[test]
fn free_variables_skip_declared_names() {
    let program = prepare_ast(parse(
        "var a = x + 1; function f(p) { return p + q } a + f(y) + undefined",
    ));
    // the hoisted declaration of f is walked first, so q comes before x
    let free = free_variables(&program);
    assert_eq!(free, vec!["q", "x", "y"]);
}

#[test]
fn empty_program_is_valid() {
    let program = parse("  ");
    assert!(program.body.is_empty());
}
