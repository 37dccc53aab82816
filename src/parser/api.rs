use std::rc::Rc;
use std::time::Instant;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::*;

#[derive(Parser)]
#[grammar = "parser/js_grammar.pest"] // relative to src
pub struct JsParser;

impl JsParser {
    /// Parse a script into an AST. No hoisting is applied; see
    /// [`super::static_semantics::prepare_ast`] for the evaluator-ready form.
    pub fn parse_to_ast_from_str(script: &str) -> Result<ProgramData, JsError> {
        parse_to_ast(script)
    }
}

pub fn parse_to_ast(script: &str) -> Result<ProgramData, JsError> {
    let start = Instant::now();
    let mut pairs = JsParser::parse(Rule::program, script).map_err(|e| JsError {
        message: e.to_string(),
    })?;
    let program = build_ast_from_program(pairs.next().unwrap())?;
    log::trace!(
        "parsed {} bytes in {}us",
        script.len(),
        start.elapsed().as_micros()
    );
    Ok(program)
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    let span = pair.as_span();
    Meta {
        start_index: span.start(),
        end_index: span.end(),
    }
}

fn get_unexpected_error(tag: u32, pair: &Pair<Rule>) -> JsError {
    JsError {
        message: format!(
            "Unexpected {:?} at offset {} (builder site {})",
            pair.as_rule(),
            pair.as_span().start(),
            tag
        ),
    }
}

fn is_keyword_rule(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_function
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_for
            | Rule::kw_while
            | Rule::kw_switch
            | Rule::kw_case
            | Rule::kw_default
            | Rule::kw_try
            | Rule::kw_catch
            | Rule::kw_finally
            | Rule::kw_return
            | Rule::kw_break
            | Rule::kw_continue
            | Rule::kw_new
            | Rule::kw_this
            | Rule::kw_in
    )
}

fn build_ast_from_program(pair: Pair<Rule>) -> Result<ProgramData, JsError> {
    let meta = get_meta(&pair);
    let mut body = vec![];
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::statement_list => body = build_statement_list(inner)?,
            Rule::EOI => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(1, &inner)),
        }
    }
    Ok(ProgramData { meta, body })
}

fn build_statement_list(pair: Pair<Rule>) -> Result<Vec<StatementType>, JsError> {
    let mut statements = vec![];
    for inner in pair.into_inner() {
        statements.push(build_ast_from_statement(inner)?);
    }
    Ok(statements)
}

fn build_ast_from_statement(pair: Pair<Rule>) -> Result<StatementType, JsError> {
    let meta = get_meta(&pair);
    let inner_pair = pair.into_inner().next().unwrap();
    Ok(match inner_pair.as_rule() {
        Rule::block_statement => StatementType::BlockStatement(build_ast_from_block(inner_pair)?),
        Rule::empty_statement => StatementType::EmptyStatement { meta },
        Rule::function_declaration => {
            StatementType::FunctionDeclaration(build_ast_from_function(inner_pair)?)
        }
        Rule::variable_statement => {
            let list = inner_pair.into_inner().next().unwrap();
            StatementType::VariableDeclaration(build_ast_from_variable_declaration_list(list)?)
        }
        Rule::if_statement => build_ast_from_if_statement(inner_pair)?,
        Rule::for_in_statement => build_ast_from_for_in_statement(inner_pair)?,
        Rule::for_statement => build_ast_from_for_statement(inner_pair)?,
        Rule::while_statement => build_ast_from_while_statement(inner_pair)?,
        Rule::switch_statement => build_ast_from_switch_statement(inner_pair)?,
        Rule::try_statement => build_ast_from_try_statement(inner_pair)?,
        Rule::return_statement => {
            let mut argument = None;
            for p in inner_pair.into_inner() {
                if p.as_rule() == Rule::expression {
                    argument = Some(build_ast_from_expression(p)?);
                }
            }
            StatementType::ReturnStatement { meta, argument }
        }
        Rule::break_statement => StatementType::BreakStatement { meta },
        Rule::continue_statement => StatementType::ContinueStatement { meta },
        Rule::expression_statement => {
            let expr_pair = inner_pair.into_inner().next().unwrap();
            StatementType::ExpressionStatement {
                meta,
                expression: build_ast_from_expression(expr_pair)?,
            }
        }
        _ => return Err(get_unexpected_error(2, &inner_pair)),
    })
}

fn build_ast_from_block(pair: Pair<Rule>) -> Result<BlockStatementData, JsError> {
    let meta = get_meta(&pair);
    let list = pair.into_inner().next().unwrap();
    Ok(BlockStatementData {
        meta,
        body: build_statement_list(list)?,
    })
}

fn build_ast_from_function(pair: Pair<Rule>) -> Result<FunctionData, JsError> {
    let meta = get_meta(&pair);
    let mut id = None;
    let mut params = vec![];
    let mut body = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => id = Some(build_identifier(inner)),
            Rule::function_params => {
                for p in inner.into_inner() {
                    if p.as_rule() == Rule::formal_parameters {
                        for param in p.into_inner() {
                            params.push(build_identifier(param));
                        }
                    }
                }
            }
            Rule::function_body => {
                let body_meta = get_meta(&inner);
                let list = inner.into_inner().next().unwrap();
                body = Some(FunctionBodyData {
                    meta: body_meta,
                    body: build_statement_list(list)?,
                });
            }
            r if is_keyword_rule(r) => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(3, &inner)),
        }
    }
    Ok(FunctionData {
        meta,
        id,
        params,
        body: Rc::new(body.unwrap()),
    })
}

fn build_ast_from_variable_declaration_list(
    pair: Pair<Rule>,
) -> Result<VariableDeclarationData, JsError> {
    let meta = get_meta(&pair);
    let mut kind = VariableDeclarationKind::Var;
    let mut declarations = vec![];
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::var_kind => {
                kind = match inner.as_str() {
                    "let" => VariableDeclarationKind::Let,
                    "const" => VariableDeclarationKind::Const,
                    _ => VariableDeclarationKind::Var,
                }
            }
            Rule::variable_declaration => {
                let decl_meta = get_meta(&inner);
                let mut decl_inner = inner.into_inner();
                let id = build_identifier(decl_inner.next().unwrap());
                let init = match decl_inner.next() {
                    Some(p) => Some(build_ast_from_assignment_expression(p)?),
                    None => None,
                };
                declarations.push(VariableDeclaratorData {
                    meta: decl_meta,
                    id,
                    init,
                });
            }
            _ => return Err(get_unexpected_error(4, &inner)),
        }
    }
    Ok(VariableDeclarationData {
        meta,
        declarations,
        kind,
    })
}

fn build_ast_from_if_statement(pair: Pair<Rule>) -> Result<StatementType, JsError> {
    let meta = get_meta(&pair);
    let mut test = None;
    let mut consequent = None;
    let mut alternate = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::expression => test = Some(build_ast_from_expression(inner)?),
            Rule::statement => {
                if consequent.is_none() {
                    consequent = Some(build_ast_from_statement(inner)?);
                } else {
                    alternate = Some(Box::new(build_ast_from_statement(inner)?));
                }
            }
            r if is_keyword_rule(r) => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(5, &inner)),
        }
    }
    Ok(StatementType::IfStatement {
        meta,
        test: test.unwrap(),
        consequent: Box::new(consequent.unwrap()),
        alternate,
    })
}

fn build_ast_from_for_in_statement(pair: Pair<Rule>) -> Result<StatementType, JsError> {
    let meta = get_meta(&pair);
    let mut left = None;
    let mut right = None;
    let mut body = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::for_in_left => {
                let mut kind = None;
                let mut id = None;
                for p in inner.into_inner() {
                    match p.as_rule() {
                        Rule::var_kind => {
                            kind = Some(match p.as_str() {
                                "let" => VariableDeclarationKind::Let,
                                "const" => VariableDeclarationKind::Const,
                                _ => VariableDeclarationKind::Var,
                            })
                        }
                        Rule::identifier => id = Some(build_identifier(p)),
                        _ => return Err(get_unexpected_error(6, &p)),
                    }
                }
                let id = id.unwrap();
                left = Some(match kind {
                    Some(kind) => ForInLeft::Declaration { kind, id },
                    None => ForInLeft::Identifier(id),
                });
            }
            Rule::expression => right = Some(build_ast_from_expression(inner)?),
            Rule::statement => body = Some(build_ast_from_statement(inner)?),
            r if is_keyword_rule(r) => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(7, &inner)),
        }
    }
    Ok(StatementType::ForInStatement(ForInData {
        meta,
        left: left.unwrap(),
        right: right.unwrap(),
        body: Box::new(body.unwrap()),
    }))
}

fn build_ast_from_for_statement(pair: Pair<Rule>) -> Result<StatementType, JsError> {
    let meta = get_meta(&pair);
    let mut init = None;
    let mut test = None;
    let mut update = None;
    let mut body = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::for_init_part => {
                if let Some(p) = inner.into_inner().next() {
                    let p = p.into_inner().next().unwrap();
                    init = Some(match p.as_rule() {
                        Rule::variable_declaration_list => ForInit::VariableDeclaration(
                            build_ast_from_variable_declaration_list(p)?,
                        ),
                        Rule::expression => ForInit::Expression(build_ast_from_expression(p)?),
                        _ => return Err(get_unexpected_error(8, &p)),
                    });
                }
            }
            Rule::for_test_part => {
                if let Some(p) = inner.into_inner().next() {
                    test = Some(build_ast_from_expression(p)?);
                }
            }
            Rule::for_update_part => {
                if let Some(p) = inner.into_inner().next() {
                    update = Some(build_ast_from_expression(p)?);
                }
            }
            Rule::statement => body = Some(build_ast_from_statement(inner)?),
            r if is_keyword_rule(r) => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(9, &inner)),
        }
    }
    Ok(StatementType::ForStatement {
        meta,
        init,
        test,
        update,
        body: Box::new(body.unwrap()),
    })
}

fn build_ast_from_while_statement(pair: Pair<Rule>) -> Result<StatementType, JsError> {
    let meta = get_meta(&pair);
    let mut test = None;
    let mut body = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::expression => test = Some(build_ast_from_expression(inner)?),
            Rule::statement => body = Some(build_ast_from_statement(inner)?),
            r if is_keyword_rule(r) => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(10, &inner)),
        }
    }
    Ok(StatementType::WhileStatement {
        meta,
        test: test.unwrap(),
        body: Box::new(body.unwrap()),
    })
}

fn build_ast_from_switch_statement(pair: Pair<Rule>) -> Result<StatementType, JsError> {
    let meta = get_meta(&pair);
    let mut discriminant = None;
    let mut cases = vec![];
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::expression => discriminant = Some(build_ast_from_expression(inner)?),
            Rule::switch_case => {
                let case_meta = get_meta(&inner);
                let mut test = None;
                let mut consequent = vec![];
                for p in inner.into_inner() {
                    match p.as_rule() {
                        Rule::expression => test = Some(build_ast_from_expression(p)?),
                        Rule::statement_list => consequent = build_statement_list(p)?,
                        r if is_keyword_rule(r) => { /* Do nothing */ }
                        _ => return Err(get_unexpected_error(11, &p)),
                    }
                }
                cases.push(SwitchCaseData {
                    meta: case_meta,
                    test,
                    consequent,
                });
            }
            r if is_keyword_rule(r) => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(12, &inner)),
        }
    }
    Ok(StatementType::SwitchStatement {
        meta,
        discriminant: discriminant.unwrap(),
        cases,
    })
}

fn build_ast_from_try_statement(pair: Pair<Rule>) -> Result<StatementType, JsError> {
    let meta = get_meta(&pair);
    let mut block = None;
    let mut handler = None;
    let mut finalizer = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::block_statement => block = Some(build_ast_from_block(inner)?),
            Rule::catch_clause => {
                let clause_meta = get_meta(&inner);
                let mut param = None;
                let mut body = None;
                for p in inner.into_inner() {
                    match p.as_rule() {
                        Rule::identifier => param = Some(build_identifier(p)),
                        Rule::block_statement => body = Some(build_ast_from_block(p)?),
                        r if is_keyword_rule(r) => { /* Do nothing */ }
                        _ => return Err(get_unexpected_error(13, &p)),
                    }
                }
                handler = Some(CatchClauseData {
                    meta: clause_meta,
                    param: param.unwrap(),
                    body: body.unwrap(),
                });
            }
            Rule::finally_clause => {
                for p in inner.into_inner() {
                    if p.as_rule() == Rule::block_statement {
                        finalizer = Some(build_ast_from_block(p)?);
                    }
                }
            }
            r if is_keyword_rule(r) => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(14, &inner)),
        }
    }
    Ok(StatementType::TryStatement {
        meta,
        block: block.unwrap(),
        handler,
        finalizer,
    })
}

fn build_ast_from_expression(pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    let inner = pair.into_inner().next().unwrap();
    build_ast_from_assignment_expression(inner)
}

fn build_ast_from_assignment_expression(pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    let meta = get_meta(&pair);
    let mut inner = pair.into_inner();
    let left = build_ast_from_conditional_expression(inner.next().unwrap())?;
    match inner.next() {
        None => Ok(left),
        Some(op_pair) => {
            if !is_valid_assignment_target(&left) {
                return Err(JsError {
                    message: format!(
                        "Invalid left-hand side in assignment at offset {}",
                        meta.start_index
                    ),
                });
            }
            let operator = match op_pair.as_str() {
                "=" => AssignmentOperator::Equals,
                "+=" => AssignmentOperator::AddEquals,
                "-=" => AssignmentOperator::SubtractEquals,
                _ => return Err(get_unexpected_error(15, &op_pair)),
            };
            let right = build_ast_from_assignment_expression(inner.next().unwrap())?;
            Ok(ExpressionType::AssignmentExpression {
                meta,
                operator,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
    }
}

fn is_valid_assignment_target(expr: &ExpressionType) -> bool {
    matches!(
        expr,
        ExpressionType::Identifier(_) | ExpressionType::MemberExpression(_)
    )
}

fn build_ast_from_conditional_expression(pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    let meta = get_meta(&pair);
    let mut inner = pair.into_inner();
    let test = build_ast_from_binary_chain(inner.next().unwrap())?;
    match inner.next() {
        None => Ok(test),
        Some(consequent_pair) => {
            let consequent = build_ast_from_assignment_expression(consequent_pair)?;
            let alternate = build_ast_from_assignment_expression(inner.next().unwrap())?;
            Ok(ExpressionType::ConditionalExpression {
                meta,
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            })
        }
    }
}

/// Folds the left-associative binary/logical operator chains. Every
/// precedence level in the grammar shares the `operand (op operand)*` shape.
fn build_ast_from_binary_chain(pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    match pair.as_rule() {
        Rule::logical_or_expression
        | Rule::logical_and_expression
        | Rule::bitwise_or_expression
        | Rule::bitwise_xor_expression
        | Rule::bitwise_and_expression
        | Rule::equality_expression
        | Rule::relational_expression
        | Rule::additive_expression
        | Rule::multiplicative_expression => {
            let meta = get_meta(&pair);
            let mut inner = pair.into_inner();
            let mut left = build_ast_from_binary_chain(inner.next().unwrap())?;
            while let Some(op_pair) = inner.next() {
                let right = build_ast_from_binary_chain(inner.next().unwrap())?;
                left = combine_binary(meta, op_pair.as_str(), left, right)?;
            }
            Ok(left)
        }
        Rule::unary_expression => build_ast_from_unary_expression(pair),
        _ => Err(get_unexpected_error(16, &pair)),
    }
}

fn combine_binary(
    meta: Meta,
    op: &str,
    left: ExpressionType,
    right: ExpressionType,
) -> Result<ExpressionType, JsError> {
    let meta = Meta {
        start_index: left.get_meta().start_index,
        end_index: meta.end_index,
    };
    if op == "||" || op == "&&" {
        return Ok(ExpressionType::LogicalExpression {
            meta,
            operator: if op == "||" {
                LogicalOperator::Or
            } else {
                LogicalOperator::And
            },
            left: Box::new(left),
            right: Box::new(right),
        });
    }
    let operator = match op {
        "==" => BinaryOperator::LooselyEqual,
        "!=" => BinaryOperator::LooselyUnequal,
        "===" => BinaryOperator::StrictlyEqual,
        "!==" => BinaryOperator::StrictlyUnequal,
        "<" => BinaryOperator::LessThan,
        "<=" => BinaryOperator::LessThanEqual,
        ">" => BinaryOperator::GreaterThan,
        ">=" => BinaryOperator::GreaterThanEqual,
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Subtract,
        "*" => BinaryOperator::Multiply,
        "/" => BinaryOperator::Divide,
        "%" => BinaryOperator::Modulo,
        "|" => BinaryOperator::BitwiseOr,
        "&" => BinaryOperator::BitwiseAnd,
        "^" => BinaryOperator::BitwiseXor,
        "in" => BinaryOperator::In,
        "instanceof" => BinaryOperator::InstanceOf,
        _ => {
            return Err(JsError {
                message: format!("Unknown binary operator '{}'", op),
            })
        }
    };
    Ok(ExpressionType::BinaryExpression {
        meta,
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn build_ast_from_unary_expression(pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    let meta = get_meta(&pair);
    let inner = pair.into_inner().next().unwrap();
    Ok(match inner.as_rule() {
        Rule::update_prefix => {
            let mut parts = inner.into_inner();
            let op_pair = parts.next().unwrap();
            let argument = build_ast_from_unary_expression(parts.next().unwrap())?;
            if !is_valid_assignment_target(&argument) {
                return Err(JsError {
                    message: format!(
                        "Invalid update target at offset {}",
                        meta.start_index
                    ),
                });
            }
            ExpressionType::UpdateExpression {
                meta,
                operator: build_update_operator(op_pair.as_str()),
                argument: Box::new(argument),
                prefix: true,
            }
        }
        Rule::unary_operation => {
            let mut parts = inner.into_inner();
            let op_pair = parts.next().unwrap();
            let argument = build_ast_from_unary_expression(parts.next().unwrap())?;
            let operator = match op_pair.as_str() {
                "+" => UnaryOperator::Plus,
                "-" => UnaryOperator::Minus,
                "~" => UnaryOperator::BitwiseNot,
                "!" => UnaryOperator::LogicalNot,
                "typeof" => UnaryOperator::TypeOf,
                _ => return Err(get_unexpected_error(17, &op_pair)),
            };
            ExpressionType::UnaryExpression {
                meta,
                operator,
                argument: Box::new(argument),
            }
        }
        Rule::postfix_expression => {
            let mut parts = inner.into_inner();
            let target = build_ast_from_left_hand_side(parts.next().unwrap())?;
            match parts.next() {
                None => target,
                Some(op_pair) => {
                    if !is_valid_assignment_target(&target) {
                        return Err(JsError {
                            message: format!(
                                "Invalid update target at offset {}",
                                meta.start_index
                            ),
                        });
                    }
                    ExpressionType::UpdateExpression {
                        meta,
                        operator: build_update_operator(op_pair.as_str()),
                        argument: Box::new(target),
                        prefix: false,
                    }
                }
            }
        }
        _ => return Err(get_unexpected_error(18, &inner)),
    })
}

fn build_update_operator(op: &str) -> UpdateOperator {
    if op == "++" {
        UpdateOperator::PlusPlus
    } else {
        UpdateOperator::MinusMinus
    }
}

fn build_ast_from_left_hand_side(pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::call_chain => {
            let mut parts = inner.into_inner();
            let mut expr = build_ast_from_primary_expression(parts.next().unwrap())?;
            for accessor in parts {
                expr = apply_accessor(expr, accessor)?;
            }
            Ok(expr)
        }
        Rule::new_expression => {
            let meta = get_meta(&inner);
            let mut callee = None;
            let mut expr = None;
            for p in inner.into_inner() {
                match p.as_rule() {
                    Rule::new_callee => {
                        let mut parts = p.into_inner();
                        let mut target = build_ast_from_primary_expression(parts.next().unwrap())?;
                        for accessor in parts {
                            target = apply_member_accessor(target, accessor)?;
                        }
                        callee = Some(target);
                    }
                    // the constructor argument list; later call_args arrive
                    // wrapped in accessor pairs
                    Rule::call_args => {
                        expr = Some(ExpressionType::NewExpression {
                            meta,
                            callee: Box::new(callee.take().unwrap()),
                            arguments: build_argument_list(p)?,
                        });
                    }
                    Rule::accessor => {
                        let target = match expr.take() {
                            Some(e) => e,
                            None => ExpressionType::NewExpression {
                                meta,
                                callee: Box::new(callee.take().unwrap()),
                                arguments: vec![],
                            },
                        };
                        expr = Some(apply_accessor(target, p)?);
                    }
                    r if is_keyword_rule(r) => { /* Do nothing */ }
                    _ => return Err(get_unexpected_error(19, &p)),
                }
            }
            Ok(match expr {
                Some(e) => e,
                None => ExpressionType::NewExpression {
                    meta,
                    callee: Box::new(callee.unwrap()),
                    arguments: vec![],
                },
            })
        }
        _ => Err(get_unexpected_error(20, &inner)),
    }
}

fn apply_accessor(expr: ExpressionType, pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    let meta = Meta {
        start_index: expr.get_meta().start_index,
        end_index: pair.as_span().end(),
    };
    let inner = match pair.as_rule() {
        Rule::accessor => pair.into_inner().next().unwrap(),
        _ => pair,
    };
    match inner.as_rule() {
        Rule::call_args => Ok(ExpressionType::CallExpression {
            meta,
            callee: Box::new(expr),
            arguments: build_argument_list(inner)?,
        }),
        Rule::member_accessor => apply_member_accessor(expr, inner),
        _ => Err(get_unexpected_error(21, &inner)),
    }
}

fn apply_member_accessor(expr: ExpressionType, pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    let meta = Meta {
        start_index: expr.get_meta().start_index,
        end_index: pair.as_span().end(),
    };
    let inner = match pair.as_rule() {
        Rule::member_accessor => pair.into_inner().next().unwrap(),
        _ => pair,
    };
    match inner.as_rule() {
        Rule::dot_property => {
            let name_pair = inner.into_inner().next().unwrap();
            Ok(ExpressionType::MemberExpression(
                MemberExpressionType::SimpleMemberExpression {
                    meta,
                    object: Box::new(expr),
                    property: build_identifier(name_pair),
                },
            ))
        }
        Rule::index_property => {
            let expr_pair = inner.into_inner().next().unwrap();
            Ok(ExpressionType::MemberExpression(
                MemberExpressionType::ComputedMemberExpression {
                    meta,
                    object: Box::new(expr),
                    property: Box::new(build_ast_from_expression(expr_pair)?),
                },
            ))
        }
        _ => Err(get_unexpected_error(22, &inner)),
    }
}

fn build_argument_list(pair: Pair<Rule>) -> Result<Vec<ExpressionType>, JsError> {
    let mut arguments = vec![];
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::argument_list {
            for arg in inner.into_inner() {
                arguments.push(build_ast_from_assignment_expression(arg)?);
            }
        }
    }
    Ok(arguments)
}

fn build_ast_from_primary_expression(pair: Pair<Rule>) -> Result<ExpressionType, JsError> {
    let meta = get_meta(&pair);
    let inner = pair.into_inner().next().unwrap();
    Ok(match inner.as_rule() {
        Rule::function_expression => {
            ExpressionType::FunctionExpression(build_ast_from_function(inner)?)
        }
        Rule::this_expression => ExpressionType::ThisExpression { meta },
        Rule::literal => ExpressionType::Literal(build_ast_from_literal(inner)?),
        Rule::array_literal => {
            let mut elements = vec![];
            for p in inner.into_inner() {
                if p.as_rule() == Rule::element_list {
                    for el in p.into_inner() {
                        elements.push(build_ast_from_assignment_expression(el)?);
                    }
                }
            }
            ExpressionType::ArrayExpression { meta, elements }
        }
        Rule::object_literal => {
            let mut properties = vec![];
            for p in inner.into_inner() {
                if p.as_rule() == Rule::property_list {
                    for prop in p.into_inner() {
                        properties.push(build_ast_from_property(prop)?);
                    }
                }
            }
            ExpressionType::ObjectExpression { meta, properties }
        }
        Rule::paren_expression => {
            build_ast_from_expression(inner.into_inner().next().unwrap())?
        }
        Rule::identifier => ExpressionType::Identifier(build_identifier(inner)),
        _ => return Err(get_unexpected_error(23, &inner)),
    })
}

fn build_ast_from_property(pair: Pair<Rule>) -> Result<PropertyData, JsError> {
    let meta = get_meta(&pair);
    let mut inner = pair.into_inner();
    let key_pair = inner.next().unwrap().into_inner().next().unwrap();
    let key = match key_pair.as_rule() {
        Rule::string_literal => build_string_value(key_pair),
        Rule::numeric_literal => numeric_property_key(key_pair)?,
        Rule::property_name => key_pair.as_str().to_string(),
        _ => return Err(get_unexpected_error(24, &key_pair)),
    };
    let value = build_ast_from_assignment_expression(inner.next().unwrap())?;
    Ok(PropertyData { meta, key, value })
}

fn numeric_property_key(pair: Pair<Rule>) -> Result<String, JsError> {
    Ok(match build_numeric_literal(pair)? {
        NumberLiteralType::IntegerLiteral(i) => i.to_string(),
        NumberLiteralType::FloatLiteral(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", f as i64)
            } else {
                format!("{}", f)
            }
        }
    })
}

fn build_ast_from_literal(pair: Pair<Rule>) -> Result<LiteralData, JsError> {
    let meta = get_meta(&pair);
    let inner = pair.into_inner().next().unwrap();
    let value = match inner.as_rule() {
        Rule::null_literal => LiteralType::NullLiteral,
        Rule::boolean_literal => LiteralType::BooleanLiteral(inner.as_str() == "true"),
        Rule::numeric_literal => LiteralType::NumberLiteral(build_numeric_literal(inner)?),
        Rule::string_literal => LiteralType::StringLiteral(build_string_value(inner)),
        Rule::regex_literal => {
            let mut pattern = String::new();
            let mut flags = String::new();
            for p in inner.into_inner() {
                match p.as_rule() {
                    Rule::regex_body => pattern = p.as_str().to_string(),
                    Rule::regex_flags => flags = p.as_str().to_string(),
                    _ => return Err(get_unexpected_error(25, &p)),
                }
            }
            LiteralType::RegExpLiteral(RegExpLiteralData { pattern, flags })
        }
        _ => return Err(get_unexpected_error(26, &inner)),
    };
    Ok(LiteralData { meta, value })
}

fn build_numeric_literal(pair: Pair<Rule>) -> Result<NumberLiteralType, JsError> {
    let inner = pair.into_inner().next().unwrap();
    let text = inner.as_str();
    Ok(match inner.as_rule() {
        Rule::hex_literal => {
            NumberLiteralType::IntegerLiteral(i64::from_str_radix(&text[2..], 16).map_err(
                |_| JsError {
                    message: format!("Invalid hex literal '{}'", text),
                },
            )?)
        }
        Rule::int_literal => match text.parse::<i64>() {
            Ok(i) => NumberLiteralType::IntegerLiteral(i),
            Err(_) => NumberLiteralType::FloatLiteral(text.parse::<f64>().unwrap_or(f64::NAN)),
        },
        Rule::float_literal => {
            NumberLiteralType::FloatLiteral(text.parse::<f64>().unwrap_or(f64::NAN))
        }
        _ => return Err(get_unexpected_error(27, &inner)),
    })
}

fn build_string_value(pair: Pair<Rule>) -> String {
    let inner = pair.into_inner().next().unwrap();
    unescape_string(inner.as_str())
}

fn unescape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('v') => out.push('\u{000B}'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(std::char::from_u32) {
                    Some(u) => out.push(u),
                    None => {
                        out.push('u');
                        out.push_str(&hex);
                    }
                }
            }
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(std::char::from_u32) {
                    Some(u) => out.push(u),
                    None => {
                        out.push('x');
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn build_identifier(pair: Pair<Rule>) -> IdentifierData {
    IdentifierData {
        name: pair.as_str().to_string(),
        meta: get_meta(&pair),
    }
}
