//! Graphviz rendering of a finished [`Cfg`].
//!
//! Each block becomes an HTML-table node whose rows are addressable ports
//! (`bb3:0`, `bb3:1`, ...), so data edges can point at individual producers.
//! Constants share one `constants` node.

use std::collections::HashMap;
use std::fmt::Write;

use crate::block::Completion;
use crate::error::Result;
use crate::graph::Cfg;
use crate::ids::{BlockId, ConstantId, Location, Value};
use crate::tree::NodeTree;

/// Render `cfg` as a `digraph`. `tree` is the node tree the graph was built
/// against; it supplies kind and range for unhandled nodes.
///
/// # Errors
///
/// Fails with `UnexpectedExit` if a reachable block other than `exit` was
/// never sealed.
pub fn render(cfg: &Cfg, tree: &NodeTree) -> Result<String> {
    let reachable = cfg.traverse()?;
    let regions = cfg.traverse_unreachable()?;

    let mut out = String::new();
    out.push_str("digraph {\n");
    out.push_str("node [shape=box]\n");
    render_constants(cfg, &mut out);

    for &node in cfg.unhandled() {
        let syntax = tree.get(node);
        let _ = writeln!(out, "// unhandled {} {}..{}", syntax.kind, syntax.start, syntax.end);
    }

    let producers = producer_locations(cfg);
    let mut edges = Vec::new();
    let ordered = reachable
        .iter()
        .chain(regions.iter().flat_map(|(_, blocks)| blocks.iter()));
    for &block in ordered {
        render_block(cfg, block, &producers, &mut out, &mut edges);
    }
    for (completed, blocks) in &regions {
        if let Some(start) = blocks.first() {
            edges.push(format!("{completed} -> {start}:root [label=unreachable,style=dotted]"));
        }
    }

    for edge in edges {
        out.push_str(&edge);
        out.push('\n');
    }
    out.push_str("}\n");
    Ok(out)
}

fn render_constants(cfg: &Cfg, out: &mut String) {
    let mut table = String::new();
    for (ty, ids) in cfg.constants().iter_by_type() {
        let _ = write!(table, r##"<tr><td bgcolor="#cccccc">{}</td></tr>"##, escape(ty));
        for &id in ids {
            let value = cfg.constants().get(id).value().to_string();
            let port = constant_port(id);
            let _ = write!(table, r#"<tr><td port="{port}">{}</td></tr>"#, escape(&value));
        }
    }
    if !table.is_empty() {
        let _ = writeln!(
            out,
            "constants [label=<<table><tr><td>CONSTANTS</td></tr>{table}</table>>]"
        );
    }
}

fn render_block(
    cfg: &Cfg,
    id: BlockId,
    producers: &HashMap<Value, Location>,
    out: &mut String,
    edges: &mut Vec<String>,
) {
    let block = cfg.block(id);
    let _ = write!(
        out,
        r#"{id} [label=<<table><tr><td port="root">{}</td></tr>"#,
        escape(block.name())
    );

    for (index, &value) in block.steps().iter().enumerate() {
        let row = format!("{id}:{index}");
        let text = match value {
            Value::Step(step) => {
                let step = cfg.step(step);
                for (position, arg) in step.args().iter().enumerate() {
                    if let Some(target) = operand_target(*arg, producers) {
                        edges.push(format!("{row} -> {target} [label={position}]"));
                    }
                }
                escape(step.name())
            }
            Value::Constant(constant) => {
                edges.push(format!("{row} -> constants:{}", constant_port(constant)));
                escape(&cfg.constants().get(constant).value().to_string())
            }
            Value::Phi(phi) => {
                for (position, arg) in cfg.phi(phi).args().iter().enumerate() {
                    edges.push(format!("{row} -> {}:{} [label={position}]", arg.block, arg.index));
                }
                "&phi;".to_string()
            }
        };
        let _ = write!(out, r#"<tr><td port="{index}">{text}</td></tr>"#);
    }
    out.push_str("</table>>]\n");

    let Some(completion) = block.completion() else {
        return;
    };
    match *completion {
        Completion::Branch {
            consequent,
            alternate,
        } => {
            let test = block.steps().len().saturating_sub(1);
            edges.push(format!("{id}:{test} -> {consequent}:root [label=truthy]"));
            edges.push(format!("{id}:{test} -> {alternate}:root [label=falsey]"));
        }
        Completion::Normal { join }
        | Completion::Break { join }
        | Completion::Continue { join }
        | Completion::Marker { next: join } => {
            edges.push(format!("{id} -> {join}:root [label={}]", completion.kind()));
        }
    }
}

/// Where each step and phi lives, for drawing operand edges.
fn producer_locations(cfg: &Cfg) -> HashMap<Value, Location> {
    let mut producers = HashMap::new();
    for (id, block) in cfg.blocks() {
        for (index, &value) in block.steps().iter().enumerate() {
            if !matches!(value, Value::Constant(_)) {
                producers.insert(value, Location::new(id, index));
            }
        }
    }
    producers
}

fn operand_target(value: Value, producers: &HashMap<Value, Location>) -> Option<String> {
    match value {
        Value::Constant(constant) => Some(format!("constants:{}", constant_port(constant))),
        other => producers
            .get(&other)
            .map(|location| format!("{}:{}", location.block, location.index)),
    }
}

fn constant_port(id: ConstantId) -> String {
    id.to_string()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("<br/>"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CfgBuilder;
    use crate::constant::Literal;

    #[test]
    fn test_render_branch_and_constants() {
        let mut builder = CfgBuilder::new();
        let exit = builder.exit();
        let then_bb = builder.new_block("then");
        let else_bb = builder.new_block("else");

        let one = builder.push_constant("number", Literal::Number(1.0)).unwrap();
        let one = builder.value_at(one).unwrap();
        let test = builder.push_step("<", vec![one, one]).unwrap();
        builder.branch(test, then_bb, else_bb).unwrap();
        builder.seal(then_bb, Completion::Normal { join: exit }).unwrap();
        builder.seal(else_bb, Completion::Normal { join: exit }).unwrap();

        let cfg = builder.finish();
        let dot = render(&cfg, &NodeTree::new()).unwrap();

        assert!(dot.starts_with("digraph {\nnode [shape=box]\n"));
        assert!(dot.contains(r##"<td bgcolor="#cccccc">number</td>"##));
        assert!(dot.contains(r#"<td port="c0">1</td>"#));
        assert!(dot.contains(r#"<td port="1">&lt;</td>"#));
        assert!(dot.contains("bb0:0 -> constants:c0\n"));
        assert!(dot.contains("bb0:1 -> constants:c0 [label=0]\n"));
        assert!(dot.contains("bb0:1 -> bb2:root [label=truthy]\n"));
        assert!(dot.contains("bb0:1 -> bb3:root [label=falsey]\n"));
        assert!(dot.contains("bb2 -> bb1:root [label=normal]\n"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_render_unhandled_and_unreachable() {
        let mut tree = NodeTree::new();
        let node = tree.push(None, "SwitchStatement", 4, 20);

        let mut builder = CfgBuilder::new();
        let exit = builder.exit();
        let root = builder.root();
        builder.set_unhandled(tree.path(node));
        builder.seal_current(Completion::Normal { join: exit }).unwrap();
        let dead = builder.new_block("unreachable");
        builder.add_unreachable(root, dead);
        builder.seal(dead, Completion::Marker { next: exit }).unwrap();

        let dot = render(&builder.finish(), &tree).unwrap();
        assert!(dot.contains("// unhandled SwitchStatement 4..20\n"));
        assert!(dot.contains("bb0 -> bb2:root [label=unreachable,style=dotted]\n"));
        assert!(dot.contains("bb2 -> bb1:root [label=mark]\n"));
        assert!(!dot.contains("CONSTANTS"));
    }

    #[test]
    fn test_render_phi_edges() {
        let mut builder = CfgBuilder::new();
        let exit = builder.exit();
        let merge = builder.new_block("merge");
        let a = builder.push_constant("string", Literal::String("a\"b".into())).unwrap();
        builder.seal_current(Completion::Normal { join: merge }).unwrap();
        builder.switch_to(merge);
        builder.push_phi(merge, vec![a]).unwrap();
        builder.seal_current(Completion::Normal { join: exit }).unwrap();

        let dot = render(&builder.finish(), &NodeTree::new()).unwrap();
        assert!(dot.contains(r#"<td port="0">&phi;</td>"#));
        assert!(dot.contains("bb2:0 -> bb0:0 [label=0]\n"));
        assert!(dot.contains("a&quot;b"));
    }

    #[test]
    fn test_render_fails_on_open_block() {
        let mut builder = CfgBuilder::new();
        let open = builder.new_block("open");
        builder.seal_current(Completion::Normal { join: open }).unwrap();
        assert!(render(&builder.finish(), &NodeTree::new()).is_err());
    }
}
