//! Lowering from the tree-sitter Go CST into [`Node`] trees.
//!
//! Identifiers are resolved against the file's imports: a selector whose
//! operand names an imported package becomes an [`Ident`] carrying the import
//! path as its origin. Resolution is syntactic only; a local variable that
//! shadows a package name is resolved all the same.

use crate::syntax::node::{
    Block, Comment, Ident, Literal, LiteralKind, Node, NodeKind, Signature,
};
use tree_sitter::Node as TsNode;

/// One `import` spec of a Go file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit local name (`tr "example.com/trace"`), including `_` and `.`.
    pub alias: Option<String>,
    pub path: String,
}

impl ImportSpec {
    /// Name the package is referenced by inside the file.
    pub fn local_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => default_package_name(&self.path),
        }
    }
}

/// Imports visible in one file (or configured for candidates).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    specs: Vec<ImportSpec>,
}

impl ImportMap {
    pub fn new(specs: Vec<ImportSpec>) -> Self {
        Self { specs }
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            specs: paths
                .into_iter()
                .map(|path| ImportSpec {
                    alias: None,
                    path: path.into(),
                })
                .collect(),
        }
    }

    pub fn specs(&self) -> &[ImportSpec] {
        &self.specs
    }

    /// Import path for a package name used in the file.
    pub fn resolve(&self, local: &str) -> Option<&str> {
        self.specs
            .iter()
            .find(|spec| {
                let name = spec.local_name();
                name != "_" && name != "." && name == local
            })
            .map(|spec| spec.path.as_str())
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.specs.iter().any(|spec| spec.path == path)
    }
}

/// Package name Go would assign to an import path without an alias.
///
/// Takes the last path element, drops a `/vN` major-version element, a
/// `.vN` suffix (`gopkg.in/yaml.v3`) and a `go-` prefix, and maps `-` to `_`.
pub fn default_package_name(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 {
        if let Some(last) = segments.last() {
            if is_major_version(last) {
                segments.pop();
            }
        }
    }
    let mut name = segments.last().copied().unwrap_or(path);
    if let Some((base, suffix)) = name.rsplit_once('.') {
        if is_major_version(suffix) {
            name = base;
        }
    }
    let name = name.strip_prefix("go-").unwrap_or(name);
    name.replace('-', "_")
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Named, non-comment children of a node.
pub(crate) fn named(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Named children including comments, with `statement_list` wrappers flattened.
pub(crate) fn items(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "statement_list" {
            out.extend(items(child));
        } else {
            out.push(child);
        }
    }
    out
}

pub(crate) struct Lowerer<'s> {
    source: &'s str,
    imports: &'s ImportMap,
}

impl<'s> Lowerer<'s> {
    pub(crate) fn new(source: &'s str, imports: &'s ImportMap) -> Self {
        Self { source, imports }
    }

    pub(crate) fn text(&self, node: TsNode<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    pub(crate) fn imports_resolve(&self, local: &str) -> Option<&'s str> {
        self.imports.resolve(local)
    }

    /// Whitespace between the start of the node's line and the node, or ""
    /// when something else precedes it on that line.
    pub(crate) fn line_indent(&self, byte: usize) -> &'s str {
        let line_start = self.source[..byte].rfind('\n').map_or(0, |i| i + 1);
        let prefix = &self.source[line_start..byte];
        if prefix.chars().all(|c| c == ' ' || c == '\t') {
            prefix
        } else {
            ""
        }
    }

    fn node(&self, kind: NodeKind, ts: TsNode<'_>) -> Node {
        Node::new(kind, self.text(ts))
    }

    fn field(&self, ts: TsNode<'_>, name: &str) -> Option<Node> {
        ts.child_by_field_name(name).map(|child| self.expr(child))
    }

    fn boxed_field(&self, ts: TsNode<'_>, name: &str) -> Option<Box<Node>> {
        self.field(ts, name).map(Node::boxed)
    }

    /// Required child: a field when present, else the first named child.
    fn child_expr(&self, ts: TsNode<'_>, name: &str) -> Box<Node> {
        let child = ts
            .child_by_field_name(name)
            .or_else(|| named(ts).into_iter().next());
        match child {
            Some(child) => self.expr(child).boxed(),
            None => self.node(NodeKind::Other { kind: ts.kind().to_string() }, ts).boxed(),
        }
    }

    fn expr_list(&self, ts: Option<TsNode<'_>>) -> Vec<Node> {
        match ts {
            Some(list) if list.kind() == "expression_list" => {
                named(list).into_iter().map(|child| self.expr(child)).collect()
            }
            Some(single) => vec![self.expr(single)],
            None => Vec::new(),
        }
    }

    /// Lower the statements of a `{ ... }` block (or a case clause body).
    pub(crate) fn block(&self, ts: TsNode<'_>) -> Block {
        self.statements(items(ts), ts.start_position().row)
    }

    fn statements(&self, children: Vec<TsNode<'_>>, open_row: usize) -> Block {
        let mut stmts: Vec<Node> = Vec::new();
        let mut pending: Vec<Comment> = Vec::new();
        let mut group_blank = false;
        let mut last_row = open_row;
        let mut last_stmt_row: Option<usize> = None;

        for child in children {
            let start_row = child.start_position().row;
            let gap = start_row > last_row + 1;

            if child.kind() == "comment" {
                let comment = Comment::new(self.text(child));
                let same_line = last_stmt_row == Some(start_row);
                match stmts.last_mut() {
                    Some(prev) if pending.is_empty() && same_line => prev.trivia.trailing.push(comment),
                    _ => {
                        if pending.is_empty() {
                            group_blank = gap;
                        } else if gap {
                            if let Some(last) = pending.last_mut() {
                                last.blank_after = true;
                            }
                        }
                        pending.push(comment);
                    }
                }
            } else if child.kind() != "empty_statement" {
                let mut stmt = self.stmt(child);
                if pending.is_empty() {
                    stmt.trivia.blank_before = gap;
                } else {
                    stmt.trivia.blank_before = group_blank;
                    if gap {
                        if let Some(last) = pending.last_mut() {
                            last.blank_after = true;
                        }
                    }
                }
                stmt.trivia.leading = std::mem::take(&mut pending);
                stmt.indent = self.line_indent(child.start_byte()).to_string();
                stmts.push(stmt);
                last_stmt_row = Some(child.end_position().row);
            }
            last_row = child.end_position().row;
        }

        if !pending.is_empty() {
            if let Some(last) = stmts.last_mut() {
                last.trivia.blank_after = group_blank;
            }
        }

        Block {
            stmts,
            dangling: pending,
        }
    }

    fn block_node(&self, ts: TsNode<'_>) -> Node {
        let block = self.block(ts);
        self.node(NodeKind::Block(block.stmts), ts)
    }

    pub(crate) fn stmt(&self, ts: TsNode<'_>) -> Node {
        let kind = match ts.kind() {
            "expression_statement" => NodeKind::ExprStmt(self.child_expr(ts, "expression")),
            "defer_statement" => NodeKind::Defer(self.child_expr(ts, "expression")),
            "go_statement" => NodeKind::Go(self.child_expr(ts, "expression")),
            "short_var_declaration" => NodeKind::Assign {
                lhs: self.expr_list(ts.child_by_field_name("left")),
                op: ":=".to_string(),
                rhs: self.expr_list(ts.child_by_field_name("right")),
            },
            "assignment_statement" => NodeKind::Assign {
                lhs: self.expr_list(ts.child_by_field_name("left")),
                op: ts
                    .child_by_field_name("operator")
                    .map(|op| self.text(op).to_string())
                    .unwrap_or_else(|| "=".to_string()),
                rhs: self.expr_list(ts.child_by_field_name("right")),
            },
            "inc_statement" => NodeKind::IncDec {
                operand: self.child_expr(ts, "operand"),
                op: "++".to_string(),
            },
            "dec_statement" => NodeKind::IncDec {
                operand: self.child_expr(ts, "operand"),
                op: "--".to_string(),
            },
            "return_statement" => NodeKind::Return(self.expr_list(named(ts).into_iter().next())),
            "if_statement" => NodeKind::If {
                init: ts
                    .child_by_field_name("initializer")
                    .map(|init| self.stmt(init).boxed()),
                cond: self.child_expr(ts, "condition"),
                then: match ts.child_by_field_name("consequence") {
                    Some(body) => self.block_node(body).boxed(),
                    None => self.node(NodeKind::Block(Vec::new()), ts).boxed(),
                },
                otherwise: ts
                    .child_by_field_name("alternative")
                    .map(|alt| self.stmt(alt).boxed()),
            },
            "for_statement" => self.for_stmt(ts),
            "expression_switch_statement" => NodeKind::Switch {
                init: ts
                    .child_by_field_name("initializer")
                    .map(|init| self.stmt(init).boxed()),
                tag: self.boxed_field(ts, "value"),
                cases: named(ts)
                    .into_iter()
                    .filter(|child| matches!(child.kind(), "expression_case" | "default_case"))
                    .map(|case| self.case(case))
                    .collect(),
            },
            "block" => NodeKind::Block(self.block(ts).stmts),
            _ => return self.expr(ts),
        };
        self.node(kind, ts)
    }

    fn for_stmt(&self, ts: TsNode<'_>) -> NodeKind {
        let body = match ts.child_by_field_name("body") {
            Some(body) => self.block_node(body).boxed(),
            None => self.node(NodeKind::Block(Vec::new()), ts).boxed(),
        };
        let body_id = ts.child_by_field_name("body").map(|b| b.id());
        let header = named(ts)
            .into_iter()
            .find(|child| Some(child.id()) != body_id);

        match header {
            Some(clause) if clause.kind() == "for_clause" => NodeKind::For {
                init: clause
                    .child_by_field_name("initializer")
                    .map(|init| self.stmt(init).boxed()),
                cond: self.boxed_field(clause, "condition"),
                post: clause
                    .child_by_field_name("update")
                    .map(|post| self.stmt(post).boxed()),
                body,
            },
            Some(clause) if clause.kind() == "range_clause" => {
                let mut cursor = clause.walk();
                let define = clause.children(&mut cursor).any(|c| c.kind() == ":=");
                NodeKind::Range {
                    lhs: self.expr_list(clause.child_by_field_name("left")),
                    define,
                    expr: self.child_expr(clause, "right"),
                    body,
                }
            }
            Some(cond) => NodeKind::For {
                init: None,
                cond: Some(self.expr(cond).boxed()),
                post: None,
                body,
            },
            None => NodeKind::For {
                init: None,
                cond: None,
                post: None,
                body,
            },
        }
    }

    fn case(&self, ts: TsNode<'_>) -> Node {
        let is_default = ts.kind() == "default_case";
        let value = ts.child_by_field_name("value");
        let value_id = value.map(|v| v.id());
        let body_items = items(ts)
            .into_iter()
            .filter(|child| Some(child.id()) != value_id)
            .collect();
        let kind = NodeKind::Case {
            values: self.expr_list(value),
            is_default,
            body: self.statements(body_items, ts.start_position().row).stmts,
        };
        self.node(kind, ts)
    }

    fn signature(&self, params: Option<TsNode<'_>>, result: Option<TsNode<'_>>) -> Signature {
        let params = params.map(|list| self.param_types(list)).unwrap_or_default();
        let results = match result {
            Some(list) if list.kind() == "parameter_list" => self.param_types(list),
            Some(ty) => vec![self.expr(ty)],
            None => Vec::new(),
        };
        Signature { params, results }
    }

    fn param_types(&self, list: TsNode<'_>) -> Vec<Node> {
        let mut types = Vec::new();
        for decl in named(list) {
            let Some(ty) = decl.child_by_field_name("type") else {
                continue;
            };
            let lowered = self.expr(ty);
            if decl.kind() == "variadic_parameter_declaration" {
                types.push(self.node(NodeKind::Variadic(lowered.boxed()), decl));
                continue;
            }
            let mut cursor = decl.walk();
            let names = decl.children_by_field_name("name", &mut cursor).count().max(1);
            for _ in 1..names {
                types.push(lowered.clone());
            }
            types.push(lowered);
        }
        types
    }

    fn literal(&self, kind: LiteralKind, ts: TsNode<'_>) -> NodeKind {
        NodeKind::Literal(Literal {
            kind,
            value: self.text(ts).to_string(),
        })
    }

    /// Qualified reference `pkg.Member`; resolved when `pkg` is an import.
    fn qualified(&self, operand: TsNode<'_>, member: &str) -> NodeKind {
        if operand.kind() == "identifier" || operand.kind() == "package_identifier" {
            if let Some(path) = self.imports.resolve(self.text(operand)) {
                return NodeKind::Ident(Ident::resolved(member, path));
            }
        }
        NodeKind::Selector {
            operand: self.expr(operand).boxed(),
            member: member.to_string(),
        }
    }

    fn element(&self, ts: TsNode<'_>) -> Node {
        if ts.kind() != "literal_element" {
            return self.expr(ts);
        }
        match named(ts).into_iter().next() {
            Some(inner) => self.expr(inner),
            None => self.node(
                NodeKind::Other {
                    kind: ts.kind().to_string(),
                },
                ts,
            ),
        }
    }

    fn elements(&self, literal_value: Option<TsNode<'_>>) -> Vec<Node> {
        literal_value
            .map(|body| named(body).into_iter().map(|e| self.element(e)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn expr(&self, ts: TsNode<'_>) -> Node {
        let kind = match ts.kind() {
            "identifier" | "field_identifier" | "package_identifier" | "type_identifier"
            | "blank_identifier" | "nil" | "iota" => {
                NodeKind::Ident(Ident::new(self.text(ts)))
            }
            "true" | "false" => self.literal(LiteralKind::Bool, ts),
            "interpreted_string_literal" | "raw_string_literal" => {
                self.literal(LiteralKind::String, ts)
            }
            "int_literal" => self.literal(LiteralKind::Int, ts),
            "float_literal" => self.literal(LiteralKind::Float, ts),
            "imaginary_literal" => self.literal(LiteralKind::Imaginary, ts),
            "rune_literal" => self.literal(LiteralKind::Rune, ts),
            "call_expression" => self.call(ts),
            "selector_expression" => match (
                ts.child_by_field_name("operand"),
                ts.child_by_field_name("field"),
            ) {
                (Some(operand), Some(field)) => self.qualified(operand, self.text(field)),
                _ => NodeKind::Other {
                    kind: ts.kind().to_string(),
                },
            },
            "qualified_type" => match (
                ts.child_by_field_name("package"),
                ts.child_by_field_name("name"),
            ) {
                (Some(package), Some(name)) => self.qualified(package, self.text(name)),
                _ => NodeKind::Other {
                    kind: ts.kind().to_string(),
                },
            },
            "index_expression" => NodeKind::Index {
                operand: self.child_expr(ts, "operand"),
                index: self.child_expr(ts, "index"),
            },
            "unary_expression" => {
                let op = ts
                    .child_by_field_name("operator")
                    .map(|op| self.text(op))
                    .unwrap_or_default();
                let operand = self.child_expr(ts, "operand");
                if op == "*" {
                    NodeKind::Deref(operand)
                } else {
                    NodeKind::Unary {
                        op: op.to_string(),
                        operand,
                    }
                }
            }
            "pointer_type" => NodeKind::Deref(self.child_expr(ts, "type")),
            "binary_expression" => NodeKind::Binary {
                op: ts
                    .child_by_field_name("operator")
                    .map(|op| self.text(op).to_string())
                    .unwrap_or_default(),
                lhs: self.child_expr(ts, "left"),
                rhs: self.child_expr(ts, "right"),
            },
            "parenthesized_expression" | "parenthesized_type" => {
                NodeKind::Paren(self.child_expr(ts, "expression"))
            }
            "composite_literal" => NodeKind::CompositeLit {
                ty: self.boxed_field(ts, "type"),
                elems: self.elements(ts.child_by_field_name("body")),
            },
            "literal_value" => NodeKind::CompositeLit {
                ty: None,
                elems: self.elements(Some(ts)),
            },
            "literal_element" => return self.element(ts),
            "keyed_element" => {
                let parts = named(ts);
                let key = ts.child_by_field_name("key").or_else(|| parts.first().copied());
                let value = ts.child_by_field_name("value").or_else(|| parts.get(1).copied());
                match (key, value) {
                    (Some(key), Some(value)) => NodeKind::KeyValue {
                        key: self.element(key).boxed(),
                        value: self.element(value).boxed(),
                    },
                    _ => NodeKind::Other {
                        kind: ts.kind().to_string(),
                    },
                }
            }
            "func_literal" => NodeKind::FuncLit {
                sig: self.signature(
                    ts.child_by_field_name("parameters"),
                    ts.child_by_field_name("result"),
                ),
                body: match ts.child_by_field_name("body") {
                    Some(body) => self.block_node(body).boxed(),
                    None => self.node(NodeKind::Block(Vec::new()), ts).boxed(),
                },
            },
            "function_type" => NodeKind::FuncType(self.signature(
                ts.child_by_field_name("parameters"),
                ts.child_by_field_name("result"),
            )),
            "type_assertion_expression" => NodeKind::TypeAssert {
                operand: self.child_expr(ts, "operand"),
                ty: self.boxed_field(ts, "type"),
            },
            other => NodeKind::Other {
                kind: other.to_string(),
            },
        };
        self.node(kind, ts)
    }

    fn call(&self, ts: TsNode<'_>) -> NodeKind {
        let mut func = self.child_expr(ts, "function");
        if let Some(type_args) = ts.child_by_field_name("type_arguments") {
            let index = self.node(
                NodeKind::Other {
                    kind: type_args.kind().to_string(),
                },
                type_args,
            );
            func = self
                .node(
                    NodeKind::Index {
                        operand: func,
                        index: index.boxed(),
                    },
                    ts,
                )
                .boxed();
        }

        let mut args = Vec::new();
        let mut spread = false;
        if let Some(list) = ts.child_by_field_name("arguments") {
            let mut cursor = list.walk();
            for child in list.children(&mut cursor) {
                match child.kind() {
                    "..." => spread = true,
                    "comment" => {}
                    "variadic_argument" => {
                        spread = true;
                        args.push(*self.child_expr(child, "expression"));
                    }
                    _ if child.is_named() => args.push(self.expr(child)),
                    _ => {}
                }
            }
        }

        NodeKind::Call { func, args, spread }
    }
}
