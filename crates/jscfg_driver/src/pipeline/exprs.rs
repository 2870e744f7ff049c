use oxc_ast::ast::*;
use oxc_span::GetSpan;

use jscfg_ir::{Completion, Literal, Location, NodeId};

use super::{
    FunctionSource, LowerCtx, LowerResult, Slot, assignment_target_ident, expression_kind,
    lower_function, reference_symbol, simple_target_ident,
};

pub(crate) fn lower_expr(expr: &Expression<'_>, ctx: &mut LowerCtx<'_>) -> LowerResult<Location> {
    ctx.visit(expression_kind(expr), expr.span(), |ctx, node| {
        ctx.ensure_open()?;
        lower_expr_node(expr, node, ctx)
    })
}

fn lower_expr_node(
    expr: &Expression<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<Location> {
    match expr {
        Expression::NumericLiteral(num) => ctx.constant("number", Literal::Number(num.value)),
        Expression::StringLiteral(s) => ctx.string(s.value.as_str()),
        Expression::BooleanLiteral(b) => ctx.constant("boolean", Literal::Boolean(b.value)),
        Expression::NullLiteral(_) => ctx.constant("null", Literal::Null),
        Expression::BigIntLiteral(big) => {
            let digits = ctx.text(big.span).trim_end_matches('n').replace('_', "");
            ctx.constant("bigint", Literal::BigInt(digits))
        }
        Expression::RegExpLiteral(re) => {
            let (pattern, flags) = split_regexp(ctx.text(re.span));
            let pattern = ctx.string(pattern)?;
            let flags = ctx.string(flags)?;
            ctx.step("regexp", &[pattern, flags])
        }
        Expression::TemplateLiteral(tpl) => {
            let mut parts = Vec::with_capacity(tpl.quasis.len() + tpl.expressions.len());
            for (i, quasi) in tpl.quasis.iter().enumerate() {
                parts.push(ctx.string(quasi.value.raw.as_str())?);
                if let Some(e) = tpl.expressions.get(i) {
                    parts.push(lower_expr(e, ctx)?);
                }
            }
            ctx.step("template", &parts)
        }
        Expression::Identifier(id) => read_reference(id, node, ctx),
        Expression::ThisExpression(_) => ctx.step("this", &[]),
        Expression::ParenthesizedExpression(paren) => lower_expr(&paren.expression, ctx),
        Expression::TSAsExpression(e) => lower_expr(&e.expression, ctx),
        Expression::TSSatisfiesExpression(e) => lower_expr(&e.expression, ctx),
        Expression::TSNonNullExpression(e) => lower_expr(&e.expression, ctx),
        Expression::SequenceExpression(seq) => {
            let mut last = None;
            for e in &seq.expressions {
                last = Some(lower_expr(e, ctx)?);
            }
            match last {
                Some(value) => Ok(value),
                None => ctx.undefined(),
            }
        }
        Expression::UnaryExpression(un) => {
            let arg = lower_expr(&un.argument, ctx)?;
            ctx.step(un.operator.as_str(), &[arg])
        }
        Expression::BinaryExpression(bin) => {
            let lhs = lower_expr(&bin.left, ctx)?;
            let rhs = lower_expr(&bin.right, ctx)?;
            ctx.step(bin.operator.as_str(), &[lhs, rhs])
        }
        Expression::LogicalExpression(log) => {
            let left = lower_expr(&log.left, ctx)?;
            lower_short_circuit(log.operator, left, ctx, |ctx| lower_expr(&log.right, ctx))
        }
        Expression::ConditionalExpression(cond) => lower_conditional(cond, ctx),
        Expression::AssignmentExpression(assign) => lower_assignment(assign, node, ctx),
        Expression::UpdateExpression(update) => {
            let Some(id) = simple_target_ident(&update.argument) else {
                return ctx.unsupported(node);
            };
            let old = read_reference(id, node, ctx)?;
            let new = ctx.step(update.operator.as_str(), &[old])?;
            write_reference(id, new, ctx)?;
            Ok(if update.prefix { new } else { old })
        }
        Expression::CallExpression(call) => {
            let mut args = vec![lower_expr(&call.callee, ctx)?];
            lower_arguments(&call.arguments, &mut args, ctx)?;
            ctx.step("call", &args)
        }
        Expression::NewExpression(new) => {
            let mut args = vec![lower_expr(&new.callee, ctx)?];
            lower_arguments(&new.arguments, &mut args, ctx)?;
            ctx.step("new", &args)
        }
        Expression::StaticMemberExpression(member) => {
            let object = lower_expr(&member.object, ctx)?;
            let key = ctx.string(member.property.name.as_str())?;
            ctx.step("get", &[object, key])
        }
        Expression::ComputedMemberExpression(member) => {
            let object = lower_expr(&member.object, ctx)?;
            let key = lower_expr(&member.expression, ctx)?;
            ctx.step("get", &[object, key])
        }
        Expression::ArrayExpression(arr) => {
            let mut elements = Vec::with_capacity(arr.elements.len());
            for el in &arr.elements {
                let value = match el {
                    ArrayExpressionElement::SpreadElement(spread) => {
                        unsupported_at("SpreadElement", spread.span, ctx)?
                    }
                    ArrayExpressionElement::Elision(_) => ctx.undefined()?,
                    _ => lower_expr(el.to_expression(), ctx)?,
                };
                elements.push(value);
            }
            ctx.step("array", &elements)
        }
        Expression::ObjectExpression(obj) => lower_object(obj, ctx),
        Expression::FunctionExpression(func) => {
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
            lower_function(source, node, ctx)
        }
        Expression::ArrowFunctionExpression(arrow) => {
            let source = FunctionSource {
                name: format!("<arrow@{}>", arrow.span.start),
                scope: arrow.scope_id.get(),
                params: &arrow.params,
                body: Some(&*arrow.body),
                expression_body: arrow.expression,
            };
            lower_function(source, node, ctx)
        }
        // Optional chains, classes, generators, async, tagged templates, ...
        _ => ctx.unsupported(node),
    }
}

fn read_reference(
    id: &IdentifierReference<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<Location> {
    let symbol = reference_symbol(ctx.scoping, id);
    ctx.read(id.name.as_str(), symbol, node)
}

fn write_reference(
    id: &IdentifierReference<'_>,
    value: Location,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    let symbol = reference_symbol(ctx.scoping, id);
    ctx.write(id.name.as_str(), symbol, value)
}

/// Visit a sub-node only to record it as unhandled.
fn unsupported_at(
    kind: &'static str,
    span: oxc_span::Span,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<Location> {
    ctx.visit(kind, span, |ctx, node| ctx.unsupported(node))
}

fn lower_arguments(
    arguments: &[Argument<'_>],
    args: &mut Vec<Location>,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    for arg in arguments {
        let value = match arg {
            Argument::SpreadElement(spread) => unsupported_at("SpreadElement", spread.span, ctx)?,
            _ => lower_expr(arg.to_expression(), ctx)?,
        };
        args.push(value);
    }
    Ok(())
}

/// `{ k: v, ... }` becomes an `object` step over alternating keys and values.
fn lower_object(obj: &ObjectExpression<'_>, ctx: &mut LowerCtx<'_>) -> LowerResult<Location> {
    let mut args = Vec::with_capacity(obj.properties.len() * 2);
    for prop in &obj.properties {
        match prop {
            ObjectPropertyKind::ObjectProperty(p) if p.kind == PropertyKind::Init => {
                let key = match &p.key {
                    PropertyKey::StaticIdentifier(id) => ctx.string(id.name.as_str())?,
                    PropertyKey::PrivateIdentifier(id) => {
                        unsupported_at("PrivateIdentifier", id.span, ctx)?
                    }
                    other => match other.as_expression() {
                        Some(e) => lower_expr(e, ctx)?,
                        None => ctx.undefined()?,
                    },
                };
                let value = lower_expr(&p.value, ctx)?;
                args.push(key);
                args.push(value);
            }
            // Getters, setters and spreads.
            other => {
                unsupported_at("ObjectProperty", other.span(), ctx)?;
            }
        }
    }
    ctx.step("object", &args)
}

fn lower_conditional(
    cond: &ConditionalExpression<'_>,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<Location> {
    let test = lower_expr(&cond.test, ctx)?;
    let consequent = ctx.builder.new_block("cond_then");
    let alternate = ctx.builder.new_block("cond_else");
    let merge = ctx.builder.new_block("cond_merge");
    ctx.branch_on(test, consequent, alternate)?;

    for (block, expr) in [(consequent, &cond.consequent), (alternate, &cond.alternate)] {
        ctx.enter(block)?;
        let value = lower_expr(expr, ctx)?;
        ctx.bind(Slot::Value, value);
        ctx.terminate(Completion::Normal { join: merge })?;
    }

    ctx.enter(merge)?;
    ctx.take_value()
}

/// `left && right`, `left || right` and `left ?? right`: `right` runs in its
/// own block, and the merge block picks between the two values.
fn lower_short_circuit(
    operator: LogicalOperator,
    left: Location,
    ctx: &mut LowerCtx<'_>,
    right: impl FnOnce(&mut LowerCtx<'_>) -> LowerResult<Location>,
) -> LowerResult<Location> {
    let rhs = ctx.builder.new_block("logical_rhs");
    let merge = ctx.builder.new_block("logical_merge");

    ctx.bind(Slot::Value, left);
    match operator {
        LogicalOperator::And => ctx.branch_on(left, rhs, merge)?,
        LogicalOperator::Or => ctx.branch_on(left, merge, rhs)?,
        LogicalOperator::Coalesce => {
            let nullish = ctx.step("nullish", &[left])?;
            ctx.branch_on(nullish, rhs, merge)?;
        }
    }

    ctx.enter(rhs)?;
    let value = right(ctx)?;
    ctx.bind(Slot::Value, value);
    ctx.terminate(Completion::Normal { join: merge })?;

    ctx.enter(merge)?;
    ctx.take_value()
}

fn lower_assignment(
    assign: &AssignmentExpression<'_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<Location> {
    let Some(id) = assignment_target_ident(&assign.left) else {
        return ctx.unsupported(node);
    };

    let short_circuit = match assign.operator {
        AssignmentOperator::LogicalAnd => Some(LogicalOperator::And),
        AssignmentOperator::LogicalOr => Some(LogicalOperator::Or),
        AssignmentOperator::LogicalNullish => Some(LogicalOperator::Coalesce),
        _ => None,
    };
    if let Some(operator) = short_circuit {
        let current = read_reference(id, node, ctx)?;
        return lower_short_circuit(operator, current, ctx, |ctx| {
            let value = lower_expr(&assign.right, ctx)?;
            write_reference(id, value, ctx)?;
            Ok(value)
        });
    }

    let value = match assign.operator.as_str().strip_suffix('=') {
        Some(op) if !op.is_empty() => {
            let current = read_reference(id, node, ctx)?;
            let rhs = lower_expr(&assign.right, ctx)?;
            ctx.step(op, &[current, rhs])?
        }
        _ => lower_expr(&assign.right, ctx)?,
    };
    write_reference(id, value, ctx)?;
    Ok(value)
}

/// Split `/pattern/flags` source text.
fn split_regexp(raw: &str) -> (&str, &str) {
    match raw.rfind('/') {
        Some(end) if end > 0 && raw.starts_with('/') => (&raw[1..end], &raw[end + 1..]),
        _ => (raw, ""),
    }
}
