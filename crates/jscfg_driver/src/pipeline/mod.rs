use oxc_ast::ast::*;
use oxc_semantic::{ScopeId, Scoping};
use tracing::{debug, info_span};

use jscfg_ir::{Cfg, Completion, Literal, Location, NodeId, NodeTree};

mod compile;
mod context;
mod exprs;
mod loops;
mod stmts;
mod utils;

pub use compile::{
    BuildError, BuildOptions, BuildOutput, OutputFormat, UnhandledNode, build_file, build_source,
};
pub(crate) use context::*;
pub(crate) use exprs::*;
pub(crate) use loops::*;
pub(crate) use stmts::*;
pub(crate) use utils::*;

/// Name of the unit holding top-level code.
pub const MODULE_UNIT: &str = "<module>";

/// The graph of one independently built unit: the module body or a function.
#[derive(Debug)]
pub struct Unit {
    pub name: String,
    pub cfg: Cfg,
}

// ---------------------------------------------------------------------------
// AST → CFG lowering
// ---------------------------------------------------------------------------

/// Lower a whole program. The module unit comes first, followed by every
/// function unit in the order its body was finished.
pub(crate) fn lower_program(
    program: &Program<'_>,
    source: &str,
    scoping: &Scoping,
    tree: &mut NodeTree,
) -> LowerResult<Vec<Unit>> {
    let root = tree.push(None, "Program", program.span.start, program.span.end);
    let mut units = Vec::new();

    let cfg = {
        let _span = info_span!("lower", unit = MODULE_UNIT).entered();
        let scope = program.scope_id.get();
        let mut ctx = LowerCtx::new(tree, &mut units, source, scoping, scope, Some(root));
        hoist_vars(&program.body, &mut ctx)
            .and_then(|()| lower_stmts(&program.body, &mut ctx))
            .and_then(|()| ctx.finish())
            .map_err(|e| e.in_unit(MODULE_UNIT))?
    };
    units.insert(
        0,
        Unit {
            name: MODULE_UNIT.to_string(),
            cfg,
        },
    );
    Ok(units)
}

/// The body of a function or arrow, lowered into its own graph.
pub(crate) struct FunctionSource<'b, 'a> {
    pub(crate) name: String,
    /// Scope the function's own `var`s and parameters live in.
    pub(crate) scope: Option<ScopeId>,
    pub(crate) params: &'b FormalParameters<'a>,
    pub(crate) body: Option<&'b FunctionBody<'a>>,
    /// Arrow functions with an expression body return that expression.
    pub(crate) expression_body: bool,
}

/// Build a separate unit for `function` and emit a `closure` step for it in
/// the enclosing unit.
pub(crate) fn lower_function(
    function: FunctionSource<'_, '_>,
    node: NodeId,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<Location> {
    let name = function.name.clone();
    let cfg = {
        let _span = info_span!("lower", unit = %name).entered();
        let mut inner = LowerCtx::new(
            &mut *ctx.tree,
            &mut *ctx.units,
            ctx.source,
            ctx.scoping,
            function.scope,
            Some(node),
        );
        lower_function_body(&function, &mut inner)
            .and_then(|()| inner.finish())
            .map_err(|e| e.in_unit(&name))?
    };
    debug!(unit = %name, blocks = cfg.blocks().count(), "function unit done");
    ctx.units.push(Unit {
        name: name.clone(),
        cfg,
    });

    let label = ctx.string(&name)?;
    ctx.step("closure", &[label])
}

/// Bind every `var` declared in `stmts` to `undefined` unless it already
/// holds a value, as a parameter of the same name does.
fn hoist_vars(stmts: &[Statement<'_>], ctx: &mut LowerCtx<'_>) -> LowerResult<()> {
    let mut symbols = Vec::new();
    collect_var_symbols(stmts, &mut symbols);
    symbols.retain(|&symbol| !ctx.env.contains_key(&Slot::Symbol(symbol)));
    if symbols.is_empty() {
        return Ok(());
    }
    let undefined = ctx.undefined()?;
    for symbol in symbols {
        ctx.bind(Slot::Symbol(symbol), undefined);
    }
    Ok(())
}

fn lower_function_body(
    function: &FunctionSource<'_, '_>,
    ctx: &mut LowerCtx<'_>,
) -> LowerResult<()> {
    for (index, param) in function.params.items.iter().enumerate() {
        ctx.visit("FormalParameter", param.span, |ctx, node| {
            match binding_symbol(&param.pattern) {
                Some(symbol) => {
                    let position = ctx.constant("number", Literal::Number(index as f64))?;
                    let value = ctx.step("param", &[position])?;
                    ctx.bind(Slot::Symbol(symbol), value);
                }
                None => {
                    ctx.unsupported(node)?;
                }
            }
            Ok(())
        })?;
    }

    let Some(body) = function.body else {
        return Ok(());
    };
    if function.expression_body {
        if let Some(Statement::ExpressionStatement(es)) = body.statements.first() {
            let value = lower_expr(&es.expression, ctx)?;
            ctx.step("return", &[value])?;
            let exit = ctx.builder.exit();
            ctx.terminate(Completion::Normal { join: exit })?;
            return Ok(());
        }
    }
    hoist_vars(&body.statements, ctx)?;
    lower_stmts(&body.statements, ctx)
}
