use oxc_ast::ast::*;
use oxc_span::GetSpan;

use jscfg_ir::{Completion, JumpTargets, NodeId};

use super::{
    FunctionSource, LowerCtx, LowerResult, Slot, binding_symbol, is_loop, lower_do_while,
    lower_expr, lower_for, lower_for_in, lower_for_of, lower_function, lower_while,
    statement_kind,
};

/// Lower a statement list. Function declarations are hoisted: they are
/// bound before any other statement of the list runs.
pub(crate) fn lower_stmts(stmts: &[Statement<'_>], ctx: &mut LowerCtx<'_>) -> LowerResult<()> {
    let is_function = |stmt: &&Statement<'_>| matches!(stmt, Statement::FunctionDeclaration(_));
    for stmt in stmts.iter().filter(is_function) {
        lower_stmt(stmt, ctx)?;
    }
    for stmt in stmts.iter().filter(|stmt| !is_function(stmt)) {
        lower_stmt(stmt, ctx)?;
    }
    Ok(())
}

pub(crate) fn lower_stmt(stmt: &Statement<'_>, ctx: &mut LowerCtx<'_>) -> LowerResult<()> {
    ctx.visit(statement_kind(stmt), stmt.span(), |ctx, node| {
        lower_stmt_node(stmt, node, ctx)
    })
}

fn lower_stmt_node(
    stmt: &Statement<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    match stmt {
        Statement::BlockStatement(block) => lower_stmts(&block.body, ctx),
        Statement::EmptyStatement(_) => Ok(()),
        Statement::ExpressionStatement(expr_stmt) => {
            lower_expr(&expr_stmt.expression, ctx)?;
            Ok(())
        }
        Statement::VariableDeclaration(decl) => lower_var_decl(decl, ctx),
        Statement::FunctionDeclaration(func) => {
            let name = func.id.as_ref().map_or_else(
                || format!("<function@{}>", func.span.start),
                |id| id.name.to_string(),
            );
            let source = FunctionSource {
                name,
                scope: func.scope_id.get(),
                params: &func.params,
                body: func.body.as_deref(),
                expression_body: false,
            };
            let closure = lower_function(source, node, ctx)?;
            if let Some(symbol) = func.id.as_ref().and_then(|id| id.symbol_id.get()) {
                ctx.bind(Slot::Symbol(symbol), closure);
            }
            Ok(())
        }
        Statement::IfStatement(if_stmt) => lower_if(if_stmt, ctx),
        Statement::LabeledStatement(labeled) => lower_labeled(labeled, node, ctx),
        Statement::BreakStatement(break_stmt) => {
            ctx.ensure_open()?;
            let targets = match &break_stmt.label {
                Some(label) => ctx.builder.get_label_completion(label.name.as_str()),
                None => ctx.builder.get_parent_loop_completion(ctx.tree.path(node)),
            };
            match targets {
                Some(targets) => ctx.terminate(targets.break_completion()),
                None => {
                    ctx.mark_unhandled(node);
                    Ok(())
                }
            }
        }
        Statement::ContinueStatement(continue_stmt) => {
            ctx.ensure_open()?;
            let targets = match &continue_stmt.label {
                Some(label) => ctx.builder.get_label_completion(label.name.as_str()),
                None => ctx.builder.get_parent_loop_completion(ctx.tree.path(node)),
            };
            // A label on a non-loop statement has no continue target.
            match targets.and_then(|targets| targets.continue_completion()) {
                Some(completion) => ctx.terminate(completion),
                None => {
                    ctx.mark_unhandled(node);
                    Ok(())
                }
            }
        }
        Statement::ReturnStatement(ret) => {
            let args = match &ret.argument {
                Some(arg) => vec![lower_expr(arg, ctx)?],
                None => Vec::new(),
            };
            ctx.step("return", &args)?;
            exit_unit(ctx)
        }
        Statement::ThrowStatement(throw) => {
            let arg = lower_expr(&throw.argument, ctx)?;
            ctx.step("throw", &[arg])?;
            exit_unit(ctx)
        }
        Statement::WhileStatement(while_stmt) => lower_while(while_stmt, node, ctx),
        Statement::DoWhileStatement(do_while) => lower_do_while(do_while, node, ctx),
        Statement::ForStatement(for_stmt) => lower_for(for_stmt, node, ctx),
        Statement::ForInStatement(for_in) => lower_for_in(for_in, node, ctx),
        Statement::ForOfStatement(for_of) => lower_for_of(for_of, node, ctx),
        Statement::DebuggerStatement(_) => {
            ctx.step("debugger", &[])?;
            Ok(())
        }
        // switch, try, with, classes, modules and TypeScript declarations.
        _ => {
            ctx.unsupported(node)?;
            Ok(())
        }
    }
}

fn exit_unit(ctx: &mut LowerCtx<'_>) -> LowerResult<()> {
    let exit = ctx.builder.exit();
    ctx.terminate(Completion::Normal { join: exit })
}

pub(crate) fn lower_var_decl(
    decl: &VariableDeclaration<'_>,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    for declarator in &decl.declarations {
        ctx.visit("VariableDeclarator", declarator.span, |ctx, node| {
            let Some(symbol) = binding_symbol(&declarator.id) else {
                ctx.unsupported(node)?;
                return Ok(());
            };
            let slot = Slot::Symbol(symbol);
            let is_var = decl.kind == VariableDeclarationKind::Var;
            let value = match &declarator.init {
                Some(init) => lower_expr(init, ctx)?,
                // `var x;` keeps the hoisted or earlier value.
                None if is_var && ctx.env.contains_key(&slot) => return Ok(()),
                None => ctx.undefined()?,
            };
            ctx.bind(slot, value);
            Ok(())
        })?;
    }
    Ok(())
}

fn lower_if(if_stmt: &IfStatement<'_>, ctx: &mut LowerCtx<'_>) -> LowerResult<()> {
    let test = lower_expr(&if_stmt.test, ctx)?;
    let then_bb = ctx.builder.new_block("then");
    let else_bb = if_stmt
        .alternate
        .as_ref()
        .map(|_| ctx.builder.new_block("else"));
    let merge = ctx.builder.new_block("merge");

    ctx.branch_on(test, then_bb, else_bb.unwrap_or(merge))?;

    ctx.enter(then_bb)?;
    lower_stmt(&if_stmt.consequent, ctx)?;
    ctx.terminate(Completion::Normal { join: merge })?;

    if let (Some(alternate), Some(else_bb)) = (&if_stmt.alternate, else_bb) {
        ctx.enter(else_bb)?;
        lower_stmt(alternate, ctx)?;
        ctx.terminate(Completion::Normal { join: merge })?;
    }

    ctx.enter(merge)
}

/// `name: body`. Labels directly on a loop (possibly through more labels)
/// are bound by the loop itself so `continue name` resolves.
fn lower_labeled(
    labeled: &LabeledStatement<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    ctx.pending_labels.push((labeled.label.name.to_string(), node));
    if is_loop(&labeled.body) || matches!(labeled.body, Statement::LabeledStatement(_)) {
        return lower_stmt(&labeled.body, ctx);
    }

    let end = ctx.builder.new_block("label_end");
    bind_pending_labels(JumpTargets::for_statement(end), ctx)?;
    lower_stmt(&labeled.body, ctx)?;
    ctx.terminate(Completion::Normal { join: end })?;
    ctx.enter(end)
}

pub(crate) fn bind_pending_labels(
    targets: JumpTargets,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    for (name, label_node) in std::mem::take(&mut ctx.pending_labels) {
        ctx.builder.set_label(&name, ctx.tree.path(label_node), targets)?;
    }
    Ok(())
}
