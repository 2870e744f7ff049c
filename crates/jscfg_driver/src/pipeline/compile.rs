use std::fmt::Write;
use std::path::Path;

use oxc_allocator::Allocator;
use tracing::info;

use jscfg_frontend::parse;
use jscfg_frontend::semantic;
use jscfg_ir::{CfgError, NodeTree, Value, dot};

use super::{Unit, line_col, lower_program};

/// What [`build_file`] writes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One Graphviz `digraph` per unit.
    #[default]
    Dot,
    /// A plain-text block listing per unit.
    Summary,
}

/// Build options.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub format: OutputFormat,
    /// Fail when any unit contains constructs the walker does not translate.
    pub strict: bool,
    /// Fail on the early errors oxc's semantic pass reports.
    pub check_syntax: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Dot,
            strict: false,
            check_syntax: true,
        }
    }
}

/// Errors that can occur while building graphs.
#[derive(Debug)]
pub enum BuildError {
    /// File I/O errors.
    Io(std::io::Error),
    /// Parse errors from the frontend.
    Parse(Vec<String>),
    /// Early errors from the semantic checker.
    Semantic(Vec<String>),
    /// Graph construction failed inside `unit`.
    Lower { unit: String, source: CfgError },
    /// A finished graph could not be rendered.
    Render { unit: String, source: CfgError },
    /// Strict mode: constructs that were not translated.
    Unhandled(Vec<String>),
}

impl BuildError {
    /// Attribute a construction error to `name` unless a nested unit already
    /// claimed it.
    pub(crate) fn in_unit(self, name: &str) -> Self {
        match self {
            BuildError::Lower { unit, source } if unit.is_empty() => BuildError::Lower {
                unit: name.to_string(),
                source,
            },
            other => other,
        }
    }
}

impl From<CfgError> for BuildError {
    fn from(source: CfgError) -> Self {
        BuildError::Lower {
            unit: String::new(),
            source,
        }
    }
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Io(e) => write!(f, "I/O error: {e}"),
            BuildError::Parse(errs) => {
                for e in errs {
                    writeln!(f, "parse error: {e}")?;
                }
                Ok(())
            }
            BuildError::Semantic(errs) => {
                for e in errs {
                    writeln!(f, "semantic error: {e}")?;
                }
                Ok(())
            }
            BuildError::Lower { unit, source } => write!(f, "lowering error in {unit}: {source}"),
            BuildError::Render { unit, source } => write!(f, "render error in {unit}: {source}"),
            BuildError::Unhandled(nodes) => {
                for node in nodes {
                    writeln!(f, "unhandled: {node}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Io(e) => Some(e),
            BuildError::Lower { source, .. } | BuildError::Render { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A construction the walker left untranslated, with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledNode {
    pub unit: String,
    pub kind: &'static str,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for UnhandledNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {} in {}", self.line, self.column, self.kind, self.unit)
    }
}

/// Every unit built from one source file, plus the node tree they share.
#[derive(Debug)]
pub struct BuildOutput {
    pub units: Vec<Unit>,
    pub tree: NodeTree,
    source: String,
}

impl BuildOutput {
    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.name == name)
    }

    pub fn unhandled(&self) -> Vec<UnhandledNode> {
        self.units
            .iter()
            .flat_map(|unit| unit.cfg.unhandled().iter().map(move |&node| (unit, node)))
            .map(|(unit, node)| {
                let syntax = self.tree.get(node);
                let (line, column) = line_col(&self.source, syntax.start);
                UnhandledNode {
                    unit: unit.name.clone(),
                    kind: syntax.kind,
                    line,
                    column,
                }
            })
            .collect()
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, BuildError> {
        let mut out = String::new();
        for unit in &self.units {
            let rendered = match format {
                OutputFormat::Dot => dot::render(&unit.cfg, &self.tree),
                OutputFormat::Summary => summarize(unit),
            };
            let rendered = rendered.map_err(|source| BuildError::Render {
                unit: unit.name.clone(),
                source,
            })?;
            if format == OutputFormat::Dot {
                let _ = writeln!(out, "// unit {}", unit.name);
            }
            out.push_str(&rendered);
        }
        Ok(out)
    }
}

/// Plain-text listing: blocks in traversal order with their producers,
/// completion and predecessors.
fn summarize(unit: &Unit) -> Result<String, CfgError> {
    let cfg = &unit.cfg;
    let mut out = String::new();
    let _ = writeln!(out, "unit {}", unit.name);

    let mut listed = cfg.traverse()?;
    let regions = cfg.traverse_unreachable()?;
    for (completed, blocks) in &regions {
        if let Some(start) = blocks.first() {
            let _ = writeln!(out, "  unreachable after {completed}: {start}");
        }
        listed.extend(blocks);
    }

    for id in listed {
        let block = cfg.block(id);
        let _ = write!(out, "  {id} {} ({})", block.name(), block.steps().len());
        if let Some(completion) = block.completion() {
            let _ = write!(out, " {}", completion.kind());
            for successor in completion.successors() {
                let _ = write!(out, " {successor}");
            }
        }
        let preds = cfg.predecessors(id);
        if !preds.is_empty() {
            let preds: Vec<String> = preds.iter().map(ToString::to_string).collect();
            let _ = write!(out, " <- {}", preds.join(" "));
        }
        out.push('\n');

        for (index, &value) in block.steps().iter().enumerate() {
            let line = match value {
                Value::Step(step) => {
                    let step = cfg.step(step);
                    let args: Vec<String> = step.args().iter().map(ToString::to_string).collect();
                    format!("{} {}", step.name(), args.join(" "))
                }
                Value::Constant(constant) => {
                    let constant = cfg.constants().get(constant);
                    format!("{} {}", constant.ty(), constant.value())
                }
                Value::Phi(phi) => {
                    let args = cfg.phi(phi).args().iter().map(ToString::to_string);
                    let args: Vec<String> = args.collect();
                    format!("phi {}", args.join(" "))
                }
            };
            let _ = writeln!(out, "    {index}: {value} = {}", line.trim_end());
        }
    }
    Ok(out)
}

/// Build graphs for every unit in `source`.
///
/// This runs the pipeline:
/// 1. Parse (oxc)
/// 2. Scope and symbol resolution, with early-error checks unless disabled
/// 3. Lower each unit into its own graph
/// 4. In strict mode, reject anything left unhandled
pub fn build_source(
    source: &str,
    path: &Path,
    options: &BuildOptions,
) -> Result<BuildOutput, BuildError> {
    info!(path = %path.display(), "parse");
    let allocator = Allocator::default();
    let parse_result = parse::parse_source(&allocator, source, path);
    if !parse_result.is_ok() {
        return Err(BuildError::Parse(parse_result.messages(path)));
    }

    let sem_result = semantic::analyze_semantics(&parse_result.program, options.check_syntax);
    if options.check_syntax && !sem_result.is_ok() {
        return Err(BuildError::Semantic(
            sem_result
                .errors
                .iter()
                .map(|e| format!("{}: {e}", path.display()))
                .collect(),
        ));
    }

    let mut tree = NodeTree::new();
    let scoping = sem_result.semantic.scoping();
    let units = lower_program(&parse_result.program, source, scoping, &mut tree)?;
    info!(units = units.len(), nodes = tree.len(), "lowered");

    let output = BuildOutput {
        units,
        tree,
        source: source.to_string(),
    };
    if options.strict {
        let unhandled = output.unhandled();
        if !unhandled.is_empty() {
            return Err(BuildError::Unhandled(
                unhandled.iter().map(ToString::to_string).collect(),
            ));
        }
    }
    Ok(output)
}

/// Read `path`, build its graphs and render them in `options.format`.
pub fn build_file(path: &Path, options: &BuildOptions) -> Result<String, BuildError> {
    let source = std::fs::read_to_string(path).map_err(BuildError::Io)?;
    let output = build_source(&source, path, options)?;
    info!(format = ?options.format, "render");
    output.render(options.format)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use jscfg_ir::{BlockId, Cfg, Completion, Edge, Location, Value};

    use super::*;
    use crate::pipeline::MODULE_UNIT;

    fn build(source: &str) -> BuildOutput {
        build_source(source, Path::new("test.js"), &BuildOptions::default()).unwrap()
    }

    fn module(output: &BuildOutput) -> &Cfg {
        &output.unit(MODULE_UNIT).unwrap().cfg
    }

    /// Blocks called `name`, in creation order.
    fn blocks_named(cfg: &Cfg, name: &str) -> Vec<BlockId> {
        cfg.blocks()
            .filter(|(_, block)| block.name() == name)
            .map(|(id, _)| id)
            .collect()
    }

    fn block_named(cfg: &Cfg, name: &str) -> BlockId {
        blocks_named(cfg, name)[0]
    }

    fn phi_args(cfg: &Cfg, location: Location) -> Vec<Location> {
        match cfg.value_at(location) {
            Some(Value::Phi(phi)) => cfg.phi(phi).args().to_vec(),
            other => panic!("expected a phi at {location}, found {other:?}"),
        }
    }

    fn step_names(cfg: &Cfg, block: BlockId) -> Vec<&str> {
        cfg.block(block)
            .steps()
            .iter()
            .filter_map(|value| match value {
                Value::Step(step) => Some(cfg.step(*step).name()),
                _ => None,
            })
            .collect()
    }

    /// Operands of the last `call` step in the unit.
    fn last_call_args(cfg: &Cfg) -> Vec<Value> {
        cfg.blocks()
            .flat_map(|(_, block)| block.steps().iter().copied())
            .filter_map(|value| match value {
                Value::Step(step) if cfg.step(step).name() == "call" => {
                    Some(cfg.step(step).args().to_vec())
                }
                _ => None,
            })
            .last()
            .unwrap()
    }

    /// Every phi has one argument per predecessor of its block.
    fn assert_phi_arity(cfg: &Cfg) {
        for (id, phi) in cfg.phis() {
            assert_eq!(
                phi.args().len(),
                cfg.predecessors(phi.block()).len(),
                "{id} in {}",
                phi.block()
            );
        }
    }

    #[test]
    fn test_if_else_merges_with_phi() {
        let output = build("let x = 1;\nif (c) { x = 2; } else { x = 3; }\nsink(x);\n");
        let cfg = module(&output);
        let then_bb = block_named(cfg, "then");
        let else_bb = block_named(cfg, "else");
        let merge = block_named(cfg, "merge");

        assert_eq!(
            cfg.block(cfg.root()).completion(),
            Some(&Completion::Branch {
                consequent: then_bb,
                alternate: else_bb,
            })
        );
        assert_eq!(cfg.predecessors(merge), vec![then_bb, else_bb]);
        assert_eq!(
            phi_args(cfg, Location::new(merge, 0)),
            vec![Location::new(then_bb, 0), Location::new(else_bb, 0)]
        );
        assert_phi_arity(cfg);
        assert!(cfg.unreachable().is_empty());
        assert!(cfg.unhandled().is_empty());
    }

    #[test]
    fn test_if_without_else_falls_through_to_merge() {
        let output = build("let a = 1;\nif (c) { a = 2; }\ng(a);\n");
        let cfg = module(&output);
        let then_bb = block_named(cfg, "then");
        let merge = block_named(cfg, "merge");

        assert!(blocks_named(cfg, "else").is_empty());
        assert_eq!(cfg.predecessors(merge), vec![cfg.root(), then_bb]);
        assert_eq!(cfg.traverse().unwrap(), vec![cfg.root(), then_bb, merge, cfg.exit()]);
        // The edge that skips the arm carries the value from before the `if`.
        assert_eq!(
            phi_args(cfg, Location::new(merge, 0)),
            vec![Location::new(cfg.root(), 0), Location::new(then_bb, 0)]
        );
    }

    #[test]
    fn test_infinite_for_with_break() {
        let output = build("for (;;) { if (a) break; }\ndone();\n");
        let cfg = module(&output);
        let body = block_named(cfg, "for_body");
        let end = block_named(cfg, "for_end");
        let then_bb = block_named(cfg, "then");

        assert_eq!(
            cfg.block(block_named(cfg, "for_cond")).completion(),
            Some(&Completion::Normal { join: body })
        );
        assert_eq!(
            cfg.block(then_bb).completion(),
            Some(&Completion::Break { join: end })
        );
        assert_eq!(cfg.predecessors(end), vec![then_bb]);
        assert!(cfg.unreachable().is_empty());
    }

    #[test]
    fn test_sibling_loops_resolve_their_own_break() {
        let output = build("for (;;) { break; }\nfor (;;) { break; }\n");
        let cfg = module(&output);
        let bodies = blocks_named(cfg, "for_body");
        let ends = blocks_named(cfg, "for_end");

        assert_eq!(cfg.block(bodies[0]).completion(), Some(&Completion::Break { join: ends[0] }));
        assert_eq!(cfg.block(bodies[1]).completion(), Some(&Completion::Break { join: ends[1] }));
    }

    #[test]
    fn test_while_loop_phis_match_predecessors() {
        let output =
            build("let i = 0;\nwhile (i < 10) { if (i) { i += 2; continue; } i++; }\nsink(i);\n");
        let cfg = module(&output);
        let cond = block_named(cfg, "while_cond");

        // entry, the `continue` and the fall-through at the end of the body
        assert_eq!(cfg.predecessors(cond).len(), 3);
        assert_eq!(phi_args(cfg, Location::new(cond, 0)).len(), 3);
        assert_phi_arity(cfg);
    }

    #[test]
    fn test_labeled_continue_targets_outer_update() {
        let source = "outer: for (let i = 0; i < 3; i++) {\n\
                      \x20 for (let j = 0; j < 3; j++) {\n\
                      \x20   if (j) continue outer;\n\
                      \x20 }\n\
                      }\n";
        let output = build(source);
        let cfg = module(&output);
        let updates = blocks_named(cfg, "for_update");
        let then_bb = block_named(cfg, "then");

        assert_eq!(updates.len(), 2);
        assert_eq!(
            cfg.block(then_bb).completion(),
            Some(&Completion::Continue { join: updates[0] })
        );
        assert!(cfg.predecessors(updates[0]).contains(&then_bb));
        assert_phi_arity(cfg);
        assert!(cfg.unhandled().is_empty());
    }

    #[test]
    fn test_labeled_block_break() {
        let output = build("done: { if (a) break done; f(); }\ng();\n");
        let cfg = module(&output);
        let end = block_named(cfg, "label_end");
        let then_bb = block_named(cfg, "then");

        assert_eq!(
            cfg.block(then_bb).completion(),
            Some(&Completion::Break { join: end })
        );
        assert_eq!(cfg.predecessors(end), vec![then_bb, block_named(cfg, "merge")]);
    }

    #[test]
    fn test_code_after_return_is_unreachable() {
        let output = build("function f(a) {\n  return a;\n  sink();\n}\n");
        assert_eq!(
            output.units.iter().map(|unit| unit.name.as_str()).collect::<Vec<_>>(),
            vec![MODULE_UNIT, "f"]
        );

        let cfg = &output.unit("f").unwrap().cfg;
        let dead = block_named(cfg, "unreachable");
        assert_eq!(cfg.unreachable().get(&cfg.root()), Some(&dead));
        assert_eq!(cfg.traverse().unwrap(), vec![cfg.root(), cfg.exit()]);
        assert_eq!(cfg.traverse_unreachable().unwrap(), vec![(cfg.root(), vec![dead])]);
        assert_eq!(cfg.block(dead).completion(), Some(&Completion::Marker { next: cfg.exit() }));
        assert_eq!(cfg.predecessors(cfg.exit()), vec![cfg.root()]);
    }

    #[test]
    fn test_dead_do_while_condition_adds_no_phi_args() {
        let output =
            build("function f() {\n  let n = 0;\n  do { n++; return n; } while (n < 3);\n}\n");
        let cfg = &output.unit("f").unwrap().cfg;
        let body = block_named(cfg, "do_body");
        let cond = block_named(cfg, "do_cond");

        assert_eq!(cfg.unreachable().get(&body), Some(&cond));
        assert_eq!(cfg.predecessors(body), vec![cfg.root()]);
        assert_phi_arity(cfg);
    }

    #[test]
    fn test_logical_and_merges_both_values() {
        let output = build("let v = a && b;\nsink(v);\n");
        let cfg = module(&output);
        let rhs = block_named(cfg, "logical_rhs");
        let merge = block_named(cfg, "logical_merge");

        assert_eq!(
            cfg.block(cfg.root()).completion(),
            Some(&Completion::Branch {
                consequent: rhs,
                alternate: merge,
            })
        );
        // `a` is read by a `global` step after its name constant.
        assert_eq!(
            phi_args(cfg, Location::new(merge, 0)),
            vec![Location::new(cfg.root(), 1), Location::new(rhs, 1)]
        );
        assert_phi_arity(cfg);
    }

    #[test]
    fn test_constants_are_shared_across_blocks() {
        let output = build("let a = 1;\nif (c) { a = 1; }\nlet s = 'x';\n");
        let cfg = module(&output);
        let then_bb = block_named(cfg, "then");

        assert_eq!(
            cfg.value_at(Location::new(cfg.root(), 0)),
            cfg.value_at(Location::new(then_bb, 0))
        );
        assert_eq!(cfg.constants().len(), 3);
        // Distinct producers of the same constant still meet in a phi.
        let merge = block_named(cfg, "merge");
        assert_eq!(
            phi_args(cfg, Location::new(merge, 0)),
            vec![Location::new(cfg.root(), 0), Location::new(then_bb, 0)]
        );
    }

    #[test]
    fn test_switch_is_recorded_as_unhandled() {
        let output = build("let x = 1;\nswitch (x) { case 1: break; }\n");
        let unhandled = output.unhandled();

        assert_eq!(
            unhandled,
            vec![UnhandledNode {
                unit: MODULE_UNIT.to_string(),
                kind: "SwitchStatement",
                line: 2,
                column: 1,
            }]
        );
        assert_eq!(unhandled[0].to_string(), "2:1: SwitchStatement in <module>");
    }

    #[test]
    fn test_strict_rejects_unhandled() {
        let options = BuildOptions {
            strict: true,
            ..BuildOptions::default()
        };
        let source = "try { f(); } catch (e) {}\n";
        let err = build_source(source, Path::new("test.js"), &options).unwrap_err();
        match err {
            BuildError::Unhandled(nodes) => {
                assert_eq!(nodes, vec!["1:1: TryStatement in <module>"]);
            }
            other => panic!("expected Unhandled, got {other}"),
        }
    }

    #[test]
    fn test_unresolved_continue_is_unhandled() {
        // The semantic checker rejects this as an early error.
        let options = BuildOptions {
            check_syntax: false,
            ..BuildOptions::default()
        };
        let source = "done: { continue done; }\n";
        let output = build_source(source, Path::new("test.js"), &options).unwrap();
        let unhandled = output.unhandled();

        assert_eq!(unhandled.len(), 1);
        assert_eq!(unhandled[0].kind, "ContinueStatement");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let options = BuildOptions::default();
        let err = build_source("let x = ;", Path::new("bad.js"), &options).unwrap_err();
        assert!(matches!(err, BuildError::Parse(ref errs) if !errs.is_empty()));
    }

    #[test]
    fn test_arrow_gets_its_own_unit() {
        let output = build("const add = (a, b) => a + b;\n");
        assert_eq!(output.units.len(), 2);

        let arrow = &output.units[1];
        assert!(arrow.name.starts_with("<arrow@"));
        let names: Vec<&str> = arrow
            .cfg
            .block(arrow.cfg.root())
            .steps()
            .iter()
            .filter_map(|value| match value {
                Value::Step(step) => Some(arrow.cfg.step(*step).name()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["param", "param", "+", "return"]);
    }

    #[test]
    fn test_block_scoped_let_does_not_leak() {
        let output = build("let x = 1;\n{ let x = 2; }\nf(x);\n");
        let cfg = module(&output);

        assert_eq!(
            last_call_args(cfg)[1],
            cfg.value_at(Location::new(cfg.root(), 0)).unwrap()
        );
        assert_eq!(cfg.phis().count(), 0);
    }

    #[test]
    fn test_shadowing_in_if_arm_needs_no_phi() {
        let output = build("let x = 1;\nif (c) { let x = 2; }\nf(x);\n");
        let cfg = module(&output);

        assert_eq!(cfg.phis().count(), 0);
        assert_eq!(
            last_call_args(cfg)[1],
            cfg.value_at(Location::new(cfg.root(), 0)).unwrap()
        );
    }

    #[test]
    fn test_shadowing_in_loop_body_needs_no_header_phi() {
        let output = build("let x = 1;\nwhile (c) { let x = 2; x++; }\nf(x);\n");
        let cfg = module(&output);

        assert_eq!(cfg.phis().count(), 0);
        assert_eq!(
            last_call_args(cfg)[1],
            cfg.value_at(Location::new(cfg.root(), 0)).unwrap()
        );
    }

    #[test]
    fn test_var_in_branch_is_hoisted() {
        let output = build("if (c) { var y = 1; }\nf(y);\n");
        let cfg = module(&output);
        let then_bb = block_named(cfg, "then");
        let merge = block_named(cfg, "merge");

        // `y` starts out undefined, ahead of the read of `c`.
        let hoisted = cfg.value_at(Location::new(cfg.root(), 0));
        assert!(matches!(
            hoisted,
            Some(Value::Constant(id)) if cfg.constants().get(id).ty() == "undefined"
        ));
        assert_eq!(step_names(cfg, cfg.root()), vec!["global"]);
        assert_eq!(
            phi_args(cfg, Location::new(merge, 0)),
            vec![Location::new(cfg.root(), 0), Location::new(then_bb, 0)]
        );
        assert!(matches!(last_call_args(cfg)[1], Value::Phi(_)));
        assert_phi_arity(cfg);
    }

    #[test]
    fn test_function_declaration_is_hoisted() {
        let output = build("g();\nfunction g() {}\n");
        let cfg = module(&output);

        assert_eq!(step_names(cfg, cfg.root()), vec!["closure", "call"]);
        assert_eq!(
            last_call_args(cfg)[0],
            cfg.value_at(Location::new(cfg.root(), 1)).unwrap()
        );
        assert!(output.unhandled().is_empty());
    }

    #[test]
    fn test_read_of_unbound_local_is_unhandled() {
        let output = build("{ let [a] = [1]; f(a); }\n");
        let kinds: Vec<&str> = output.unhandled().iter().map(|node| node.kind).collect();

        assert!(kinds.contains(&"VariableDeclarator"));
        assert!(kinds.contains(&"Identifier"));
    }

    #[test]
    fn test_outer_variables_are_captured() {
        let source = "let k = 1;\n\
                      function h() { return k; }\n\
                      const f = function self() { return self; };\n";
        let output = build(source);

        let h = &output.unit("h").unwrap().cfg;
        assert_eq!(step_names(h, h.root()), vec!["capture", "return"]);
        let named = &output.unit("self").unwrap().cfg;
        assert_eq!(step_names(named, named.root()), vec!["capture", "return"]);
        assert!(output.unhandled().is_empty());
    }

    #[test]
    fn test_assignment_to_undeclared_name_sets_global() {
        let output = build("g = 1;\n");
        let cfg = module(&output);

        assert_eq!(step_names(cfg, cfg.root()), vec!["set_global"]);
    }

    #[test]
    fn test_finished_graph_keeps_label_text_and_edges() {
        let output = build("outer: for (;;) { break outer; }\n");
        let cfg = module(&output);
        let (labeled, _) = output
            .tree
            .iter()
            .find(|(_, node)| node.kind == "LabeledStatement")
            .unwrap();
        let body = block_named(cfg, "for_body");
        let end = block_named(cfg, "for_end");

        // The label was disposed with its statement but its text survives.
        assert_eq!(cfg.label_of(labeled), Some("outer"));
        assert!(cfg.edges().contains(&Edge {
            from: body,
            to: end,
            completion: Completion::Break { join: end },
        }));
    }

    #[test]
    fn test_render_dot_per_unit() {
        let output = build("function f() { return 1; }\nif (f()) { g(); }\n");
        let dot = output.render(OutputFormat::Dot).unwrap();

        assert!(dot.starts_with("// unit <module>\ndigraph {\n"));
        assert!(dot.contains("// unit f\ndigraph {\n"));
        assert!(dot.contains("bb0:"));
        assert!(dot.contains("[label=truthy]"));
        assert!(dot.contains("[label=falsey]"));
        assert!(dot.contains("constants [label=<<table>"));
    }

    #[test]
    fn test_render_summary_lists_blocks() {
        let output = build("if (c) { f(); }\n");
        let summary = output.render(OutputFormat::Summary).unwrap();

        assert!(summary.starts_with("unit <module>\n"));
        assert!(summary.contains("  bb0 entry"));
        assert!(summary.contains(" branch bb2 bb3"));
        assert!(summary.contains("bb3 merge"));
    }
}
