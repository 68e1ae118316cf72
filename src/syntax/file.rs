use crate::syntax::errors::SyntaxError;
use crate::syntax::lower::{items, named, ImportMap, ImportSpec, Lowerer};
use crate::syntax::node::{Block, Comment, Node};
use crate::syntax::parser::GoParser;
use tree_sitter::Node as TsNode;

/// Where missing imports can be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAnchor {
    /// Byte offset of the `)` closing the last grouped import declaration.
    Group { close_paren: usize },
    /// End of the last single-spec import declaration.
    After { offset: usize },
    /// End of the package clause (file has no imports).
    Package { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    pub var: Option<String>,
    /// Base type name without pointer or type arguments.
    pub type_name: String,
    pub pointer: bool,
    pub generic: bool,
}

/// First regular parameter of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Names declared together (`a, b context.Context`); empty when unnamed.
    pub names: Vec<String>,
    /// Canonical type, e.g. `context.Context` or `*net/http.Request`.
    pub type_key: String,
}

impl Param {
    /// The variable a template can reference, if any.
    pub fn usable_name(&self) -> Option<&str> {
        self.names.first().map(String::as_str).filter(|name| *name != "_")
    }
}

/// A function body: its lowered statements and where they live in the file.
#[derive(Debug, Clone)]
pub struct FuncBody {
    pub block: Block,
    /// Byte offset just after `{`.
    pub inner_start: usize,
    /// Byte offset of `}`.
    pub inner_end: usize,
    /// Indentation of statements inside the body.
    pub indent: String,
    /// Indentation of the line holding `}`.
    pub closing_indent: String,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    /// 1-based line of the `func` keyword.
    pub line: usize,
    pub doc: Vec<Comment>,
    pub receiver: Option<Receiver>,
    pub has_type_params: bool,
    pub first_param: Option<Param>,
    pub body: Option<FuncBody>,
}

/// A Go source file lowered into the pieces the weaver needs.
#[derive(Debug, Clone)]
pub struct GoFile {
    pub package: String,
    pub imports: ImportMap,
    pub import_anchor: ImportAnchor,
    /// Comments before the package clause.
    pub leading_comments: Vec<Comment>,
    pub functions: Vec<FuncDecl>,
}

impl GoFile {
    /// Parse and lower a Go file. Files with syntax errors are rejected.
    pub fn parse(parser: &mut GoParser, source: &str) -> Result<GoFile, SyntaxError> {
        let parsed = parser.parse_with_source(source)?;
        parsed.check()?;
        let root = parsed.root_node();
        let top = items(root);

        let package_clause = top
            .iter()
            .find(|n| n.kind() == "package_clause")
            .copied()
            .ok_or(SyntaxError::MissingPackage)?;
        let package = named(package_clause)
            .first()
            .map(|n| source[n.byte_range()].to_string())
            .ok_or(SyntaxError::MissingPackage)?;

        let leading_comments = top
            .iter()
            .take_while(|n| n.kind() != "package_clause")
            .filter(|n| n.kind() == "comment")
            .map(|n| Comment::new(&source[n.byte_range()]))
            .collect();

        let (imports, import_anchor) = collect_imports(source, &top, package_clause);
        let lowerer = Lowerer::new(source, &imports);

        let mut functions = Vec::new();
        let mut doc: Vec<Comment> = Vec::new();
        let mut doc_end_row: Option<usize> = None;
        for item in &top {
            let start_row = item.start_position().row;
            match item.kind() {
                "comment" => {
                    if doc_end_row.is_some_and(|end| start_row > end + 1) {
                        doc.clear();
                    }
                    doc.push(Comment::new(&source[item.byte_range()]));
                    doc_end_row = Some(item.end_position().row);
                }
                "function_declaration" | "method_declaration" => {
                    let adjacent = doc_end_row.is_some_and(|end| end + 1 == start_row);
                    let decl_doc = if adjacent {
                        std::mem::take(&mut doc)
                    } else {
                        Vec::new()
                    };
                    functions.push(lower_func(&lowerer, *item, decl_doc));
                    doc.clear();
                    doc_end_row = None;
                }
                _ => {
                    doc.clear();
                    doc_end_row = None;
                }
            }
        }

        Ok(GoFile {
            package,
            imports,
            import_anchor,
            leading_comments,
            functions,
        })
    }
}

fn collect_imports(
    source: &str,
    top: &[TsNode<'_>],
    package_clause: TsNode<'_>,
) -> (ImportMap, ImportAnchor) {
    let mut specs = Vec::new();
    let mut anchor = ImportAnchor::Package {
        offset: package_clause.end_byte(),
    };

    for decl in top.iter().filter(|n| n.kind() == "import_declaration") {
        for child in named(*decl) {
            match child.kind() {
                "import_spec" => {
                    specs.extend(import_spec(source, child));
                    anchor = ImportAnchor::After {
                        offset: decl.end_byte(),
                    };
                }
                "import_spec_list" => {
                    specs.extend(
                        named(child)
                            .into_iter()
                            .filter(|spec| spec.kind() == "import_spec")
                            .filter_map(|spec| import_spec(source, spec)),
                    );
                    anchor = ImportAnchor::Group {
                        close_paren: child.end_byte().saturating_sub(1),
                    };
                }
                _ => {}
            }
        }
    }

    (ImportMap::new(specs), anchor)
}

fn import_spec(source: &str, spec: TsNode<'_>) -> Option<ImportSpec> {
    let path = spec.child_by_field_name("path")?;
    let path = source[path.byte_range()]
        .trim_matches(|c| c == '"' || c == '`')
        .to_string();
    let alias = spec
        .child_by_field_name("name")
        .map(|name| source[name.byte_range()].to_string());
    Some(ImportSpec { alias, path })
}

fn lower_func(lowerer: &Lowerer<'_>, decl: TsNode<'_>, doc: Vec<Comment>) -> FuncDecl {
    let name = decl
        .child_by_field_name("name")
        .map(|n| lowerer.text(n).to_string())
        .unwrap_or_default();

    let receiver = decl
        .child_by_field_name("receiver")
        .and_then(|list| named(list).into_iter().next())
        .map(|param| receiver(lowerer, param));

    let first_param = decl
        .child_by_field_name("parameters")
        .and_then(|list| named(list).into_iter().next())
        .filter(|param| param.kind() == "parameter_declaration")
        .and_then(|param| {
            let ty = param.child_by_field_name("type")?;
            let mut cursor = param.walk();
            let names = param
                .children_by_field_name("name", &mut cursor)
                .map(|n| lowerer.text(n).to_string())
                .collect();
            Some(Param {
                names,
                type_key: type_key(lowerer, ty),
            })
        });

    let body = decl
        .child_by_field_name("body")
        .map(|body| func_body(lowerer, decl, body));

    FuncDecl {
        name,
        line: decl.start_position().row + 1,
        doc,
        receiver,
        has_type_params: decl.child_by_field_name("type_parameters").is_some(),
        first_param,
        body,
    }
}

fn func_body(lowerer: &Lowerer<'_>, decl: TsNode<'_>, body: TsNode<'_>) -> FuncBody {
    let block = lowerer.block(body);
    let inner_start = body.start_byte() + 1;
    let inner_end = body.end_byte().saturating_sub(1).max(inner_start);

    let closing_indent = if body.start_position().row == body.end_position().row {
        lowerer.line_indent(decl.start_byte()).to_string()
    } else {
        lowerer.line_indent(inner_end).to_string()
    };
    let indent = block
        .stmts
        .first()
        .map(|stmt| stmt.indent.clone())
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| format!("{closing_indent}\t"));

    FuncBody {
        block,
        inner_start,
        inner_end,
        indent,
        closing_indent,
    }
}

fn receiver(lowerer: &Lowerer<'_>, param: TsNode<'_>) -> Receiver {
    let var = param
        .child_by_field_name("name")
        .map(|n| lowerer.text(n).to_string());
    let mut pointer = false;
    let mut generic = false;
    let mut ty = param.child_by_field_name("type");
    let mut type_name = String::new();

    while let Some(node) = ty {
        match node.kind() {
            "pointer_type" => {
                pointer = true;
                ty = named(node).into_iter().next();
            }
            "generic_type" => {
                generic = true;
                ty = node.child_by_field_name("type");
            }
            "parenthesized_type" => ty = named(node).into_iter().next(),
            _ => {
                type_name = lowerer.text(node).to_string();
                ty = None;
            }
        }
    }

    Receiver {
        var,
        type_name,
        pointer,
        generic,
    }
}

/// Canonical key of a parameter type: import path instead of package name.
fn type_key(lowerer: &Lowerer<'_>, ty: TsNode<'_>) -> String {
    match ty.kind() {
        "pointer_type" => match named(ty).into_iter().next() {
            Some(inner) => format!("*{}", type_key(lowerer, inner)),
            None => lowerer.text(ty).to_string(),
        },
        "parenthesized_type" => match named(ty).into_iter().next() {
            Some(inner) => type_key(lowerer, inner),
            None => lowerer.text(ty).to_string(),
        },
        "generic_type" => match ty.child_by_field_name("type") {
            Some(inner) => type_key(lowerer, inner),
            None => lowerer.text(ty).to_string(),
        },
        "qualified_type" => {
            match (
                ty.child_by_field_name("package"),
                ty.child_by_field_name("name"),
            ) {
                (Some(package), Some(name)) => {
                    let package = lowerer.text(package);
                    let path = lowerer.imports_resolve(package).unwrap_or(package);
                    format!("{path}.{}", lowerer.text(name))
                }
                _ => lowerer.text(ty).to_string(),
            }
        }
        _ => lowerer.text(ty).to_string(),
    }
}

/// Parse a statement sequence, as rendered from a template.
///
/// The text is wrapped in a synthetic function; it must parse cleanly and
/// stay inside that function's body.
pub fn parse_statements(
    parser: &mut GoParser,
    text: &str,
    imports: &ImportMap,
) -> Result<Vec<Node>, SyntaxError> {
    let wrapped = format!("package ctxweave\n\nfunc _() {{\n{text}\n}}\n");
    let parsed = parser.parse_with_source(&wrapped)?;
    parsed.check()?;

    let top: Vec<TsNode<'_>> = named(parsed.root_node());
    let [package, func] = top.as_slice() else {
        return Err(SyntaxError::EscapedBody);
    };
    if package.kind() != "package_clause" || func.kind() != "function_declaration" {
        return Err(SyntaxError::EscapedBody);
    }
    let body = func
        .child_by_field_name("body")
        .ok_or(SyntaxError::EscapedBody)?;

    let lowerer = Lowerer::new(&wrapped, imports);
    Ok(lowerer.block(body).stmts)
}
