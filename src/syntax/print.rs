use crate::syntax::node::{Block, Node};

/// Render a block as the text between its braces.
///
/// Statements keep their source text; continuation lines are moved from the
/// statement's original indentation to `indent`, which is a no-op for
/// statements that never left the block. Comments and blank-line hints are
/// emitted from trivia. Leading blank lines are dropped.
pub fn print_block(block: &Block, indent: &str, closing_indent: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (i, stmt) in block.stmts.iter().enumerate() {
        if i > 0 {
            let prev = &block.stmts[i - 1];
            if prev.trivia.blank_after || stmt.trivia.blank_before {
                lines.push(String::new());
            }
        }
        for comment in &stmt.trivia.leading {
            lines.push(format!("{indent}{}", comment.text));
            if comment.blank_after {
                lines.push(String::new());
            }
        }
        lines.push(statement_line(stmt, indent));
    }

    if !block.dangling.is_empty() {
        if block.stmts.last().is_some_and(|s| s.trivia.blank_after) {
            lines.push(String::new());
        }
        for comment in &block.dangling {
            lines.push(format!("{indent}{}", comment.text));
        }
    }

    if lines.is_empty() {
        return format!("\n{closing_indent}");
    }
    format!("\n{}\n{closing_indent}", lines.join("\n"))
}

fn statement_line(stmt: &Node, indent: &str) -> String {
    let mut line = reflow(&stmt.text, &stmt.indent, indent);
    for comment in &stmt.trivia.trailing {
        line.push(' ');
        line.push_str(&comment.text);
    }
    line
}

/// Re-indent `text` from `from` to `to`. Lines not starting with `from`
/// (raw string contents, for instance) are left alone.
fn reflow(text: &str, from: &str, to: &str) -> String {
    if from == to {
        return format!("{to}{text}");
    }
    let mut out = String::with_capacity(text.len() + to.len());
    for (i, line) in text.split('\n').enumerate() {
        if i == 0 {
            out.push_str(to);
            out.push_str(line);
            continue;
        }
        out.push('\n');
        match line.strip_prefix(from) {
            Some(rest) if !rest.trim().is_empty() => {
                out.push_str(to);
                out.push_str(rest);
            }
            Some(_) => {}
            None => out.push_str(line),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::node::{Comment, NodeKind};

    fn stmt(text: &str, indent: &str) -> Node {
        let mut node = Node::new(NodeKind::Other { kind: "stmt".into() }, text);
        node.indent = indent.to_string();
        node
    }

    #[test]
    fn empty_block_closes_on_next_line() {
        assert_eq!(print_block(&Block::default(), "\t", ""), "\n");
    }

    #[test]
    fn prints_trivia_and_hints() {
        let mut first = stmt("defer trace(ctx)", "");
        first.trivia.blank_after = true;
        first.trivia.trailing.push(Comment::line("ctxweave:generated"));
        let mut second = stmt("work()", "\t");
        second.trivia.leading.push(Comment::new("// do it"));

        let block = Block::new(vec![first, second]);
        assert_eq!(
            print_block(&block, "\t", ""),
            "\n\tdefer trace(ctx) //ctxweave:generated\n\n\t// do it\n\twork()\n"
        );
    }

    #[test]
    fn reindents_multiline_candidates() {
        let block = Block::new(vec![stmt("if x {\n\treturn\n}", "")]);
        assert_eq!(
            print_block(&block, "\t\t", "\t"),
            "\n\t\tif x {\n\t\t\treturn\n\t\t}\n\t"
        );
    }

    #[test]
    fn leaves_unindented_raw_lines_alone() {
        assert_eq!(reflow("x := `a\nb`", "\t", "\t"), "\tx := `a\nb`");
        assert_eq!(reflow("f(\n\t\ta)", "\t", "\t"), "\tf(\n\t\ta)");
    }
}
