//! Static preparation of parsed scripts.
//!
//! `prepare_ast` reproduces the hoisting the evaluator expects: function
//! declarations move to the top of their enclosing function/program scope
//! and `var` names are pre-declared there. The evaluator itself never
//! hoists. `free_variables` reports identifiers a script reads without
//! declaring, which the template layer binds to `undefined` before
//! rendering.

use std::collections::HashSet;
use std::rc::Rc;

use super::ast::*;

/// Parse-tree preparation: hoist every function scope, recursively.
pub fn prepare_ast(mut program: ProgramData) -> ProgramData {
    hoist_scope(&mut program.body);
    program
}

fn hoist_scope(body: &mut Vec<StatementType>) {
    let mut var_names: Vec<(String, Meta)> = vec![];
    let mut seen = HashSet::new();
    collect_var_names(body, &mut var_names, &mut seen);

    let mut functions = vec![];
    extract_function_declarations(body, &mut functions);

    if !var_names.is_empty() {
        let meta = var_names[0].1;
        let declarations = var_names
            .into_iter()
            .map(|(name, meta)| VariableDeclaratorData {
                meta,
                id: IdentifierData { name, meta },
                init: None,
            })
            .collect();
        body.insert(
            0,
            StatementType::VariableDeclaration(VariableDeclarationData {
                meta,
                declarations,
                kind: VariableDeclarationKind::Var,
            }),
        );
    }
    for function in functions.into_iter().rev() {
        body.insert(0, function);
    }
}

/// Collect `var` (and `const`, which shares its scoping) declarator names
/// in this function scope, without descending into nested functions.
fn collect_var_names(
    statements: &[StatementType],
    names: &mut Vec<(String, Meta)>,
    seen: &mut HashSet<String>,
) {
    for statement in statements {
        collect_var_names_from_statement(statement, names, seen);
    }
}

fn collect_var_names_from_statement(
    statement: &StatementType,
    names: &mut Vec<(String, Meta)>,
    seen: &mut HashSet<String>,
) {
    match statement {
        StatementType::VariableDeclaration(decl) => {
            if decl.kind != VariableDeclarationKind::Let {
                for declarator in &decl.declarations {
                    if seen.insert(declarator.id.name.clone()) {
                        names.push((declarator.id.name.clone(), declarator.meta));
                    }
                }
            }
        }
        StatementType::BlockStatement(block) => collect_var_names(&block.body, names, seen),
        StatementType::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            collect_var_names_from_statement(consequent, names, seen);
            if let Some(alternate) = alternate {
                collect_var_names_from_statement(alternate, names, seen);
            }
        }
        StatementType::WhileStatement { body, .. } => {
            collect_var_names_from_statement(body, names, seen)
        }
        StatementType::ForStatement { init, body, .. } => {
            if let Some(ForInit::VariableDeclaration(decl)) = init {
                if decl.kind != VariableDeclarationKind::Let {
                    for declarator in &decl.declarations {
                        if seen.insert(declarator.id.name.clone()) {
                            names.push((declarator.id.name.clone(), declarator.meta));
                        }
                    }
                }
            }
            collect_var_names_from_statement(body, names, seen);
        }
        StatementType::ForInStatement(data) => {
            if let ForInLeft::Declaration { kind, id } = &data.left {
                if *kind != VariableDeclarationKind::Let && seen.insert(id.name.clone()) {
                    names.push((id.name.clone(), id.meta));
                }
            }
            collect_var_names_from_statement(&data.body, names, seen);
        }
        StatementType::SwitchStatement { cases, .. } => {
            for case in cases {
                collect_var_names(&case.consequent, names, seen);
            }
        }
        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            collect_var_names(&block.body, names, seen);
            if let Some(handler) = handler {
                collect_var_names(&handler.body.body, names, seen);
            }
            if let Some(finalizer) = finalizer {
                collect_var_names(&finalizer.body, names, seen);
            }
        }
        _ => {}
    }
}

/// Pull function declarations out of this scope (leaving empty statements
/// behind) and hoist each one's own body while we are at it.
fn extract_function_declarations(
    statements: &mut Vec<StatementType>,
    functions: &mut Vec<StatementType>,
) {
    for statement in statements.iter_mut() {
        let is_function = matches!(statement, StatementType::FunctionDeclaration(_));
        if is_function {
            let meta = *statement.get_meta();
            let mut taken = std::mem::replace(statement, StatementType::EmptyStatement { meta });
            if let StatementType::FunctionDeclaration(data) = &mut taken {
                hoist_function_body(data);
            }
            functions.push(taken);
        } else {
            extract_from_nested_statement(statement, functions);
        }
    }
}

fn extract_from_nested_statement(
    statement: &mut StatementType,
    functions: &mut Vec<StatementType>,
) {
    match statement {
        StatementType::BlockStatement(block) => {
            extract_function_declarations(&mut block.body, functions)
        }
        StatementType::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            extract_from_nested_statement(consequent, functions);
            if let Some(alternate) = alternate {
                extract_from_nested_statement(alternate, functions);
            }
        }
        StatementType::WhileStatement { body, .. } => {
            extract_from_nested_statement(body, functions)
        }
        StatementType::ForStatement { body, .. } => extract_from_nested_statement(body, functions),
        StatementType::ForInStatement(data) => {
            extract_from_nested_statement(&mut data.body, functions)
        }
        StatementType::SwitchStatement { cases, .. } => {
            for case in cases {
                extract_function_declarations(&mut case.consequent, functions);
            }
        }
        StatementType::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            extract_function_declarations(&mut block.body, functions);
            if let Some(handler) = handler {
                extract_function_declarations(&mut handler.body.body, functions);
            }
            if let Some(finalizer) = finalizer {
                extract_function_declarations(&mut finalizer.body, functions);
            }
        }
        StatementType::ExpressionStatement { expression, .. } => {
            hoist_nested_function_expressions(expression);
        }
        StatementType::ReturnStatement {
            argument: Some(expression),
            ..
        } => hoist_nested_function_expressions(expression),
        StatementType::VariableDeclaration(decl) => {
            for declarator in &mut decl.declarations {
                if let Some(init) = &mut declarator.init {
                    hoist_nested_function_expressions(init);
                }
            }
        }
        _ => {}
    }
}

/// Function expressions open their own scope; hoist their bodies in place.
fn hoist_nested_function_expressions(expression: &mut ExpressionType) {
    match expression {
        ExpressionType::FunctionExpression(data) => hoist_function_body(data),
        ExpressionType::ArrayExpression { elements, .. } => {
            for element in elements {
                hoist_nested_function_expressions(element);
            }
        }
        ExpressionType::ObjectExpression { properties, .. } => {
            for property in properties {
                hoist_nested_function_expressions(&mut property.value);
            }
        }
        ExpressionType::UnaryExpression { argument, .. }
        | ExpressionType::UpdateExpression { argument, .. } => {
            hoist_nested_function_expressions(argument)
        }
        ExpressionType::BinaryExpression { left, right, .. }
        | ExpressionType::LogicalExpression { left, right, .. }
        | ExpressionType::AssignmentExpression { left, right, .. } => {
            hoist_nested_function_expressions(left);
            hoist_nested_function_expressions(right);
        }
        ExpressionType::ConditionalExpression {
            test,
            consequent,
            alternate,
            ..
        } => {
            hoist_nested_function_expressions(test);
            hoist_nested_function_expressions(consequent);
            hoist_nested_function_expressions(alternate);
        }
        ExpressionType::CallExpression {
            callee, arguments, ..
        }
        | ExpressionType::NewExpression {
            callee, arguments, ..
        } => {
            hoist_nested_function_expressions(callee);
            for argument in arguments {
                hoist_nested_function_expressions(argument);
            }
        }
        ExpressionType::MemberExpression(member) => match member {
            MemberExpressionType::SimpleMemberExpression { object, .. } => {
                hoist_nested_function_expressions(object)
            }
            MemberExpressionType::ComputedMemberExpression {
                object, property, ..
            } => {
                hoist_nested_function_expressions(object);
                hoist_nested_function_expressions(property);
            }
        },
        _ => {}
    }
}

fn hoist_function_body(data: &mut FunctionData) {
    if let Some(body) = Rc::get_mut(&mut data.body) {
        hoist_scope(&mut body.body);
    }
}

/// Identifiers a prepared program reads without declaring anywhere.
/// Scope-aware but order-insensitive for `var`s thanks to hoisting.
pub fn free_variables(program: &ProgramData) -> Vec<String> {
    let mut walker = FreeVariableWalker::new();
    walker.push_scope();
    walker.walk_statements(&program.body);
    walker.pop_scope();
    walker.free
}

struct FreeVariableWalker {
    scopes: Vec<HashSet<String>>,
    free: Vec<String>,
    reported: HashSet<String>,
}

impl FreeVariableWalker {
    fn new() -> Self {
        FreeVariableWalker {
            scopes: vec![],
            free: vec![],
            reported: HashSet::new(),
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn reference(&mut self, name: &str) {
        if name == "undefined" {
            return;
        }
        if self.scopes.iter().any(|scope| scope.contains(name)) {
            return;
        }
        if self.reported.insert(name.to_string()) {
            self.free.push(name.to_string());
        }
    }

    fn walk_statements(&mut self, statements: &[StatementType]) {
        for statement in statements {
            self.walk_statement(statement);
        }
    }

    fn walk_statement(&mut self, statement: &StatementType) {
        match statement {
            StatementType::ExpressionStatement { expression, .. } => {
                self.walk_expression(expression)
            }
            StatementType::BlockStatement(block) => self.walk_statements(&block.body),
            StatementType::ReturnStatement { argument, .. } => {
                if let Some(argument) = argument {
                    self.walk_expression(argument);
                }
            }
            StatementType::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.walk_expression(test);
                self.walk_statement(consequent);
                if let Some(alternate) = alternate {
                    self.walk_statement(alternate);
                }
            }
            StatementType::SwitchStatement {
                discriminant,
                cases,
                ..
            } => {
                self.walk_expression(discriminant);
                for case in cases {
                    if let Some(test) = &case.test {
                        self.walk_expression(test);
                    }
                    self.walk_statements(&case.consequent);
                }
            }
            StatementType::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => {
                self.walk_statements(&block.body);
                if let Some(handler) = handler {
                    self.declare(&handler.param.name);
                    self.walk_statements(&handler.body.body);
                }
                if let Some(finalizer) = finalizer {
                    self.walk_statements(&finalizer.body);
                }
            }
            StatementType::WhileStatement { test, body, .. } => {
                self.walk_expression(test);
                self.walk_statement(body);
            }
            StatementType::ForStatement {
                init,
                test,
                update,
                body,
                ..
            } => {
                match init {
                    Some(ForInit::VariableDeclaration(decl)) => self.walk_declaration(decl),
                    Some(ForInit::Expression(expression)) => self.walk_expression(expression),
                    None => {}
                }
                if let Some(test) = test {
                    self.walk_expression(test);
                }
                if let Some(update) = update {
                    self.walk_expression(update);
                }
                self.walk_statement(body);
            }
            StatementType::ForInStatement(data) => {
                match &data.left {
                    ForInLeft::Declaration { id, .. } => self.declare(&id.name),
                    ForInLeft::Identifier(id) => self.reference(&id.name),
                }
                self.walk_expression(&data.right);
                self.walk_statement(&data.body);
            }
            StatementType::FunctionDeclaration(data) => {
                if let Some(id) = &data.id {
                    self.declare(&id.name);
                }
                self.walk_function(data);
            }
            StatementType::VariableDeclaration(decl) => self.walk_declaration(decl),
            StatementType::EmptyStatement { .. }
            | StatementType::BreakStatement { .. }
            | StatementType::ContinueStatement { .. } => {}
        }
    }

    fn walk_declaration(&mut self, decl: &VariableDeclarationData) {
        for declarator in &decl.declarations {
            self.declare(&declarator.id.name);
            if let Some(init) = &declarator.init {
                self.walk_expression(init);
            }
        }
    }

    fn walk_function(&mut self, data: &FunctionData) {
        self.push_scope();
        self.declare("arguments");
        if let Some(id) = &data.id {
            self.declare(&id.name);
        }
        for param in &data.params {
            self.declare(&param.name);
        }
        self.walk_statements(&data.body.body);
        self.pop_scope();
    }

    fn walk_expression(&mut self, expression: &ExpressionType) {
        match expression {
            ExpressionType::Identifier(id) => self.reference(&id.name),
            ExpressionType::Literal(_) | ExpressionType::ThisExpression { .. } => {}
            ExpressionType::ArrayExpression { elements, .. } => {
                for element in elements {
                    self.walk_expression(element);
                }
            }
            ExpressionType::ObjectExpression { properties, .. } => {
                for property in properties {
                    self.walk_expression(&property.value);
                }
            }
            ExpressionType::FunctionExpression(data) => self.walk_function(data),
            ExpressionType::UnaryExpression { argument, .. }
            | ExpressionType::UpdateExpression { argument, .. } => self.walk_expression(argument),
            ExpressionType::BinaryExpression { left, right, .. }
            | ExpressionType::LogicalExpression { left, right, .. }
            | ExpressionType::AssignmentExpression { left, right, .. } => {
                self.walk_expression(left);
                self.walk_expression(right);
            }
            ExpressionType::ConditionalExpression {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.walk_expression(test);
                self.walk_expression(consequent);
                self.walk_expression(alternate);
            }
            ExpressionType::CallExpression {
                callee, arguments, ..
            }
            | ExpressionType::NewExpression {
                callee, arguments, ..
            } => {
                self.walk_expression(callee);
                for argument in arguments {
                    self.walk_expression(argument);
                }
            }
            ExpressionType::MemberExpression(member) => match member {
                MemberExpressionType::SimpleMemberExpression { object, .. } => {
                    self.walk_expression(object)
                }
                MemberExpressionType::ComputedMemberExpression {
                    object, property, ..
                } => {
                    self.walk_expression(object);
                    self.walk_expression(property);
                }
            },
        }
    }
}
