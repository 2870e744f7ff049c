use oxc_ast::ast::*;
use oxc_span::GetSpan;

use jscfg_ir::{Completion, JumpTargets, Location, NodeId};

use super::{
    AssignedScan, LowerCtx, LowerResult, Slot, assignment_target_ident, bind_pending_labels,
    binding_symbol, lower_expr, lower_stmt, lower_var_decl, reference_symbol,
};

/// Register the loop at `node` and any labels decorating it.
fn bind_loop(node: NodeId, targets: JumpTargets, ctx: &mut LowerCtx<'_>) -> LowerResult<()> {
    ctx.builder.set_loop(ctx.tree.path(node), targets);
    bind_pending_labels(targets, ctx)
}

pub(crate) fn lower_while(
    stmt: &WhileStatement<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    let mut assigned = AssignedScan::new(ctx.scoping);
    assigned.expr(&stmt.test);
    assigned.stmt(&stmt.body);

    let cond = ctx.builder.new_block("while_cond");
    let body = ctx.builder.new_block("while_body");
    let end = ctx.builder.new_block("while_end");
    bind_loop(node, JumpTargets::for_loop(end, cond), ctx)?;

    let header = ctx.enter_loop_header(cond, &assigned.symbols)?;
    let test = lower_expr(&stmt.test, ctx)?;
    ctx.branch_on(test, body, end)?;

    ctx.enter(body)?;
    lower_stmt(&stmt.body, ctx)?;
    ctx.terminate(Completion::Normal { join: cond })?;
    ctx.close_loop(header)?;

    ctx.enter(end)
}

pub(crate) fn lower_do_while(
    stmt: &DoWhileStatement<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    let mut assigned = AssignedScan::new(ctx.scoping);
    assigned.stmt(&stmt.body);
    assigned.expr(&stmt.test);

    let body = ctx.builder.new_block("do_body");
    let cond = ctx.builder.new_block("do_cond");
    let end = ctx.builder.new_block("do_end");
    bind_loop(node, JumpTargets::for_loop(end, cond), ctx)?;

    let header = ctx.enter_loop_header(body, &assigned.symbols)?;
    lower_stmt(&stmt.body, ctx)?;

    ctx.enter(cond)?;
    let test = lower_expr(&stmt.test, ctx)?;
    ctx.branch_on(test, body, end)?;
    ctx.close_loop(header)?;

    ctx.enter(end)
}

pub(crate) fn lower_for(
    stmt: &ForStatement<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    // Labels belong to the loop, not to whatever the init expression builds.
    let labels = std::mem::take(&mut ctx.pending_labels);
    match &stmt.init {
        Some(ForStatementInit::VariableDeclaration(decl)) => {
            ctx.visit("VariableDeclaration", decl.span, |ctx, _| lower_var_decl(decl, ctx))?;
        }
        Some(init) => {
            if let Some(expr) = init.as_expression() {
                lower_expr(expr, ctx)?;
            }
        }
        None => {}
    }
    ctx.pending_labels = labels;

    let mut assigned = AssignedScan::new(ctx.scoping);
    if let Some(test) = &stmt.test {
        assigned.expr(test);
    }
    if let Some(update) = &stmt.update {
        assigned.expr(update);
    }
    assigned.stmt(&stmt.body);

    let cond = ctx.builder.new_block("for_cond");
    let body = ctx.builder.new_block("for_body");
    let update = ctx.builder.new_block("for_update");
    let end = ctx.builder.new_block("for_end");
    bind_loop(node, JumpTargets::for_loop(end, update), ctx)?;

    let header = ctx.enter_loop_header(cond, &assigned.symbols)?;
    match &stmt.test {
        Some(test) => {
            let test = lower_expr(test, ctx)?;
            ctx.branch_on(test, body, end)?;
        }
        None => ctx.terminate(Completion::Normal { join: body })?,
    }

    ctx.enter(body)?;
    lower_stmt(&stmt.body, ctx)?;

    ctx.enter(update)?;
    if let Some(update_expr) = &stmt.update {
        lower_expr(update_expr, ctx)?;
    }
    ctx.terminate(Completion::Normal { join: cond })?;
    ctx.close_loop(header)?;

    ctx.enter(end)
}

pub(crate) fn lower_for_in(
    stmt: &ForInStatement<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    let each = ForEach {
        iterate: "for_in_keys",
        left: &stmt.left,
        right: &stmt.right,
        body: &stmt.body,
    };
    lower_for_each(each, node, ctx)
}

pub(crate) fn lower_for_of(
    stmt: &ForOfStatement<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    let each = ForEach {
        iterate: "for_of_iter",
        left: &stmt.left,
        right: &stmt.right,
        body: &stmt.body,
    };
    lower_for_each(each, node, ctx)
}

/// The shared shape of `for … in` and `for … of`.
struct ForEach<'b, 'a> {
    /// Step that turns the right-hand side into an iterator.
    iterate: &'static str,
    left: &'b ForStatementLeft<'a>,
    right: &'b Expression<'a>,
    body: &'b Statement<'a>,
}

fn lower_for_each(
    each: ForEach<'_, '_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    let labels = std::mem::take(&mut ctx.pending_labels);
    let iterable = lower_expr(each.right, ctx)?;
    let iterator = ctx.step(each.iterate, &[iterable])?;
    ctx.pending_labels = labels;

    let mut assigned = AssignedScan::new(ctx.scoping);
    assigned.for_left(each.left);
    assigned.stmt(each.body);

    let head = ctx.builder.new_block("for_head");
    let body = ctx.builder.new_block("for_body");
    let end = ctx.builder.new_block("for_end");
    bind_loop(node, JumpTargets::for_loop(end, head), ctx)?;

    let header = ctx.enter_loop_header(head, &assigned.symbols)?;
    let next = ctx.step("iter_next", &[iterator])?;
    ctx.branch_on(next, body, end)?;

    ctx.enter(body)?;
    let value = ctx.step("iter_value", &[next])?;
    bind_for_left(each.left, value, ctx)?;
    lower_stmt(each.body, ctx)?;
    ctx.terminate(Completion::Normal { join: head })?;
    ctx.close_loop(header)?;

    ctx.enter(end)
}

fn bind_for_left(
    left: &ForStatementLeft<'_>,
    value: Location,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    ctx.visit("ForStatementLeft", left.span(), |ctx, node| {
        if let ForStatementLeft::VariableDeclaration(decl) = left {
            let symbol = decl
                .declarations
                .first()
                .and_then(|declarator| binding_symbol(&declarator.id));
            match symbol {
                Some(symbol) => ctx.bind(Slot::Symbol(symbol), value),
                None => {
                    ctx.unsupported(node)?;
                }
            }
            return Ok(());
        }
        match left.as_assignment_target().and_then(assignment_target_ident) {
            Some(id) => {
                let symbol = reference_symbol(ctx.scoping, id);
                ctx.write(id.name.as_str(), symbol, value)?;
            }
            None => {
                ctx.unsupported(node)?;
            }
        }
        Ok(())
    })
}
