use std::collections::BTreeSet;

use oxc_ast::ast::*;
use oxc_semantic::{Scoping, SymbolId};

/// Symbol declared by a plain identifier pattern.
pub(crate) fn binding_symbol(pattern: &BindingPattern<'_>) -> Option<SymbolId> {
    match pattern {
        BindingPattern::BindingIdentifier(id) => id.symbol_id.get(),
        _ => None,
    }
}

/// Symbol `id` resolves to; `None` for globals.
pub(crate) fn reference_symbol(
    scoping: &Scoping,
    id: &IdentifierReference<'_>,
) -> Option<SymbolId> {
    id.reference_id
        .get()
        .and_then(|reference| scoping.get_reference(reference).symbol_id())
}

pub(crate) fn simple_target_ident<'b, 'a>(
    target: &'b SimpleAssignmentTarget<'a>,
) -> Option<&'b IdentifierReference<'a>> {
    match target {
        SimpleAssignmentTarget::AssignmentTargetIdentifier(id) => Some(&**id),
        _ => None,
    }
}

pub(crate) fn assignment_target_ident<'b, 'a>(
    target: &'b AssignmentTarget<'a>,
) -> Option<&'b IdentifierReference<'a>> {
    match target {
        AssignmentTarget::AssignmentTargetIdentifier(id) => Some(&**id),
        _ => None,
    }
}

pub(crate) fn is_loop(stmt: &Statement<'_>) -> bool {
    matches!(
        stmt,
        Statement::WhileStatement(_)
            | Statement::DoWhileStatement(_)
            | Statement::ForStatement(_)
            | Statement::ForInStatement(_)
            | Statement::ForOfStatement(_)
    )
}

/// 1-based line and column of a byte offset.
pub(crate) fn line_col(source: &str, offset: u32) -> (usize, usize) {
    let offset = (offset as usize).min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count()) + 1;
    (line, column)
}

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

pub(crate) fn statement_kind(stmt: &Statement<'_>) -> &'static str {
    match stmt {
        Statement::BlockStatement(_) => "BlockStatement",
        Statement::BreakStatement(_) => "BreakStatement",
        Statement::ContinueStatement(_) => "ContinueStatement",
        Statement::DebuggerStatement(_) => "DebuggerStatement",
        Statement::DoWhileStatement(_) => "DoWhileStatement",
        Statement::EmptyStatement(_) => "EmptyStatement",
        Statement::ExpressionStatement(_) => "ExpressionStatement",
        Statement::ForInStatement(_) => "ForInStatement",
        Statement::ForOfStatement(_) => "ForOfStatement",
        Statement::ForStatement(_) => "ForStatement",
        Statement::IfStatement(_) => "IfStatement",
        Statement::LabeledStatement(_) => "LabeledStatement",
        Statement::ReturnStatement(_) => "ReturnStatement",
        Statement::SwitchStatement(_) => "SwitchStatement",
        Statement::ThrowStatement(_) => "ThrowStatement",
        Statement::TryStatement(_) => "TryStatement",
        Statement::WhileStatement(_) => "WhileStatement",
        Statement::WithStatement(_) => "WithStatement",
        Statement::VariableDeclaration(_) => "VariableDeclaration",
        Statement::FunctionDeclaration(_) => "FunctionDeclaration",
        Statement::ClassDeclaration(_) => "ClassDeclaration",
        Statement::ImportDeclaration(_) => "ImportDeclaration",
        Statement::ExportAllDeclaration(_) => "ExportAllDeclaration",
        Statement::ExportDefaultDeclaration(_) => "ExportDefaultDeclaration",
        Statement::ExportNamedDeclaration(_) => "ExportNamedDeclaration",
        _ => "TSDeclaration",
    }
}

pub(crate) fn expression_kind(expr: &Expression<'_>) -> &'static str {
    match expr {
        Expression::BooleanLiteral(_) => "BooleanLiteral",
        Expression::NullLiteral(_) => "NullLiteral",
        Expression::NumericLiteral(_) => "NumericLiteral",
        Expression::BigIntLiteral(_) => "BigIntLiteral",
        Expression::RegExpLiteral(_) => "RegExpLiteral",
        Expression::StringLiteral(_) => "StringLiteral",
        Expression::TemplateLiteral(_) => "TemplateLiteral",
        Expression::Identifier(_) => "Identifier",
        Expression::MetaProperty(_) => "MetaProperty",
        Expression::Super(_) => "Super",
        Expression::ArrayExpression(_) => "ArrayExpression",
        Expression::ArrowFunctionExpression(_) => "ArrowFunctionExpression",
        Expression::AssignmentExpression(_) => "AssignmentExpression",
        Expression::AwaitExpression(_) => "AwaitExpression",
        Expression::BinaryExpression(_) => "BinaryExpression",
        Expression::CallExpression(_) => "CallExpression",
        Expression::ChainExpression(_) => "ChainExpression",
        Expression::ClassExpression(_) => "ClassExpression",
        Expression::ConditionalExpression(_) => "ConditionalExpression",
        Expression::FunctionExpression(_) => "FunctionExpression",
        Expression::ImportExpression(_) => "ImportExpression",
        Expression::LogicalExpression(_) => "LogicalExpression",
        Expression::NewExpression(_) => "NewExpression",
        Expression::ObjectExpression(_) => "ObjectExpression",
        Expression::ParenthesizedExpression(_) => "ParenthesizedExpression",
        Expression::SequenceExpression(_) => "SequenceExpression",
        Expression::TaggedTemplateExpression(_) => "TaggedTemplateExpression",
        Expression::ThisExpression(_) => "ThisExpression",
        Expression::UnaryExpression(_) => "UnaryExpression",
        Expression::UpdateExpression(_) => "UpdateExpression",
        Expression::YieldExpression(_) => "YieldExpression",
        Expression::PrivateInExpression(_) => "PrivateInExpression",
        Expression::StaticMemberExpression(_) => "StaticMemberExpression",
        Expression::ComputedMemberExpression(_) => "ComputedMemberExpression",
        Expression::PrivateFieldExpression(_) => "PrivateFieldExpression",
        _ => "Expression",
    }
}

// ---------------------------------------------------------------------------
// Declaration and assignment pre-scans
// ---------------------------------------------------------------------------

/// Append the symbol of every `var` declared in `stmts`, outside nested
/// functions, in source order.
pub(crate) fn collect_var_symbols(stmts: &[Statement<'_>], symbols: &mut Vec<SymbolId>) {
    for stmt in stmts {
        collect_var_stmt(stmt, symbols);
    }
}

fn collect_var_stmt(stmt: &Statement<'_>, symbols: &mut Vec<SymbolId>) {
    match stmt {
        Statement::VariableDeclaration(decl) => collect_var_decl(decl, symbols),
        Statement::BlockStatement(block) => collect_var_symbols(&block.body, symbols),
        Statement::IfStatement(if_stmt) => {
            collect_var_stmt(&if_stmt.consequent, symbols);
            if let Some(alternate) = &if_stmt.alternate {
                collect_var_stmt(alternate, symbols);
            }
        }
        Statement::WhileStatement(w) => collect_var_stmt(&w.body, symbols),
        Statement::DoWhileStatement(d) => collect_var_stmt(&d.body, symbols),
        Statement::ForStatement(f) => {
            if let Some(ForStatementInit::VariableDeclaration(decl)) = &f.init {
                collect_var_decl(decl, symbols);
            }
            collect_var_stmt(&f.body, symbols);
        }
        Statement::ForInStatement(f) => {
            if let ForStatementLeft::VariableDeclaration(decl) = &f.left {
                collect_var_decl(decl, symbols);
            }
            collect_var_stmt(&f.body, symbols);
        }
        Statement::ForOfStatement(f) => {
            if let ForStatementLeft::VariableDeclaration(decl) = &f.left {
                collect_var_decl(decl, symbols);
            }
            collect_var_stmt(&f.body, symbols);
        }
        Statement::LabeledStatement(labeled) => collect_var_stmt(&labeled.body, symbols),
        _ => {}
    }
}

fn collect_var_decl(decl: &VariableDeclaration<'_>, symbols: &mut Vec<SymbolId>) {
    if decl.kind != VariableDeclarationKind::Var {
        return;
    }
    for declarator in &decl.declarations {
        if let Some(symbol) = binding_symbol(&declarator.id) {
            symbols.push(symbol);
        }
    }
}

/// Every symbol a loop may rebind, so its header can carry a phi for it.
/// Mirrors what the walker lowers: nested function bodies and unsupported
/// constructs never touch the enclosing environment.
pub(crate) struct AssignedScan<'s> {
    scoping: &'s Scoping,
    pub(crate) symbols: BTreeSet<SymbolId>,
}

impl<'s> AssignedScan<'s> {
    pub(crate) fn new(scoping: &'s Scoping) -> Self {
        Self {
            scoping,
            symbols: BTreeSet::new(),
        }
    }

    fn target(&mut self, id: Option<&IdentifierReference<'_>>) {
        if let Some(symbol) = id.and_then(|id| reference_symbol(self.scoping, id)) {
            self.symbols.insert(symbol);
        }
    }

    pub(crate) fn stmt(&mut self, stmt: &Statement<'_>) {
        match stmt {
            Statement::BlockStatement(block) => {
                for s in &block.body {
                    self.stmt(s);
                }
            }
            Statement::ExpressionStatement(es) => self.expr(&es.expression),
            Statement::VariableDeclaration(decl) => self.declared(decl),
            Statement::FunctionDeclaration(func) => {
                if let Some(symbol) = func.id.as_ref().and_then(|id| id.symbol_id.get()) {
                    self.symbols.insert(symbol);
                }
            }
            Statement::IfStatement(if_stmt) => {
                self.expr(&if_stmt.test);
                self.stmt(&if_stmt.consequent);
                if let Some(alternate) = &if_stmt.alternate {
                    self.stmt(alternate);
                }
            }
            Statement::WhileStatement(w) => {
                self.expr(&w.test);
                self.stmt(&w.body);
            }
            Statement::DoWhileStatement(d) => {
                self.stmt(&d.body);
                self.expr(&d.test);
            }
            Statement::ForStatement(f) => {
                match &f.init {
                    Some(ForStatementInit::VariableDeclaration(decl)) => self.declared(decl),
                    Some(init) => {
                        if let Some(expr) = init.as_expression() {
                            self.expr(expr);
                        }
                    }
                    None => {}
                }
                if let Some(test) = &f.test {
                    self.expr(test);
                }
                if let Some(update) = &f.update {
                    self.expr(update);
                }
                self.stmt(&f.body);
            }
            Statement::ForInStatement(f) => {
                self.for_left(&f.left);
                self.expr(&f.right);
                self.stmt(&f.body);
            }
            Statement::ForOfStatement(f) => {
                self.for_left(&f.left);
                self.expr(&f.right);
                self.stmt(&f.body);
            }
            Statement::LabeledStatement(labeled) => self.stmt(&labeled.body),
            Statement::ReturnStatement(ret) => {
                if let Some(arg) = &ret.argument {
                    self.expr(arg);
                }
            }
            Statement::ThrowStatement(throw) => self.expr(&throw.argument),
            _ => {}
        }
    }

    pub(crate) fn for_left(&mut self, left: &ForStatementLeft<'_>) {
        match left {
            ForStatementLeft::VariableDeclaration(decl) => self.declared(decl),
            other => self.target(other.as_assignment_target().and_then(assignment_target_ident)),
        }
    }

    fn declared(&mut self, decl: &VariableDeclaration<'_>) {
        for declarator in &decl.declarations {
            if let Some(symbol) = binding_symbol(&declarator.id) {
                self.symbols.insert(symbol);
            }
            if let Some(init) = &declarator.init {
                self.expr(init);
            }
        }
    }

    pub(crate) fn expr(&mut self, expr: &Expression<'_>) {
        match expr {
            Expression::AssignmentExpression(assign) => {
                self.target(assignment_target_ident(&assign.left));
                self.expr(&assign.right);
            }
            Expression::UpdateExpression(update) => {
                self.target(simple_target_ident(&update.argument));
            }
            Expression::BinaryExpression(bin) => {
                self.expr(&bin.left);
                self.expr(&bin.right);
            }
            Expression::LogicalExpression(log) => {
                self.expr(&log.left);
                self.expr(&log.right);
            }
            Expression::ConditionalExpression(cond) => {
                self.expr(&cond.test);
                self.expr(&cond.consequent);
                self.expr(&cond.alternate);
            }
            Expression::UnaryExpression(un) => self.expr(&un.argument),
            Expression::ParenthesizedExpression(paren) => self.expr(&paren.expression),
            Expression::SequenceExpression(seq) => {
                for e in &seq.expressions {
                    self.expr(e);
                }
            }
            Expression::CallExpression(call) => {
                self.expr(&call.callee);
                for arg in &call.arguments {
                    if let Some(e) = arg.as_expression() {
                        self.expr(e);
                    }
                }
            }
            Expression::NewExpression(new) => {
                self.expr(&new.callee);
                for arg in &new.arguments {
                    if let Some(e) = arg.as_expression() {
                        self.expr(e);
                    }
                }
            }
            Expression::StaticMemberExpression(member) => self.expr(&member.object),
            Expression::ComputedMemberExpression(member) => {
                self.expr(&member.object);
                self.expr(&member.expression);
            }
            Expression::ArrayExpression(arr) => {
                for el in &arr.elements {
                    if let Some(e) = el.as_expression() {
                        self.expr(e);
                    }
                }
            }
            Expression::ObjectExpression(obj) => {
                for prop in &obj.properties {
                    if let ObjectPropertyKind::ObjectProperty(p) = prop {
                        self.expr(&p.value);
                    }
                }
            }
            Expression::TemplateLiteral(tpl) => {
                for e in &tpl.expressions {
                    self.expr(e);
                }
            }
            _ => {}
        }
    }
}
