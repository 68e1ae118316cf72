//! Node model shared by the front end and the matching engine.
//!
//! Nodes are a closed tagged union over the statement and expression shapes
//! the engine knows how to compare. Everything else lowers to
//! [`NodeKind::Other`], keyed by the grammar kind. Comments and blank-line
//! hints live on the node as [`Trivia`] instead of being derived from source
//! positions, so the mutator can move them without touching a formatter.

/// A comment attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Full comment text including the `//` or `/* */` delimiters.
    pub text: String,
    /// A blank line separates this comment from whatever follows it.
    pub blank_after: bool,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blank_after: false,
        }
    }

    /// Build a line comment from a bare marker token.
    pub fn line(body: &str) -> Self {
        Self::new(format!("//{body}"))
    }
}

/// Non-semantic text attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trivia {
    /// Comments on the lines directly above the node.
    pub leading: Vec<Comment>,
    /// Comments on the same line, after the node.
    pub trailing: Vec<Comment>,
    /// A blank line precedes the node's leading group.
    pub blank_before: bool,
    /// A blank line follows the node.
    pub blank_after: bool,
}

impl Trivia {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty() && !self.blank_before && !self.blank_after
    }

    /// Iterate leading then trailing comments.
    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.leading.iter().chain(self.trailing.iter())
    }
}

/// A reference by name, optionally resolved to the import path it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub origin: Option<String>,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: None,
        }
    }

    pub fn resolved(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: Some(origin.into()),
        }
    }

    /// True when the front end resolved this identifier to a non-empty origin.
    pub fn is_resolved(&self) -> bool {
        self.origin.as_deref().is_some_and(|o| !o.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    String,
    Int,
    Float,
    Imaginary,
    Rune,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub value: String,
}

/// Parameter and result types of a function literal or function type.
///
/// Parameter names are dropped during lowering; `a, b int` contributes two
/// `int` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub params: Vec<Node>,
    pub results: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Ident(Ident),
    Literal(Literal),
    Call {
        func: Box<Node>,
        args: Vec<Node>,
        /// Final argument is spread with `...`.
        spread: bool,
    },
    Defer(Box<Node>),
    Go(Box<Node>),
    ExprStmt(Box<Node>),
    Assign {
        lhs: Vec<Node>,
        op: String,
        rhs: Vec<Node>,
    },
    IncDec {
        operand: Box<Node>,
        op: String,
    },
    Return(Vec<Node>),
    If {
        init: Option<Box<Node>>,
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    For {
        init: Option<Box<Node>>,
        cond: Option<Box<Node>>,
        post: Option<Box<Node>>,
        body: Box<Node>,
    },
    Range {
        lhs: Vec<Node>,
        define: bool,
        expr: Box<Node>,
        body: Box<Node>,
    },
    Switch {
        init: Option<Box<Node>>,
        tag: Option<Box<Node>>,
        cases: Vec<Node>,
    },
    Case {
        /// Empty for `default:`.
        values: Vec<Node>,
        is_default: bool,
        body: Vec<Node>,
    },
    Block(Vec<Node>),
    CompositeLit {
        ty: Option<Box<Node>>,
        elems: Vec<Node>,
    },
    KeyValue {
        key: Box<Node>,
        value: Box<Node>,
    },
    Index {
        operand: Box<Node>,
        index: Box<Node>,
    },
    Selector {
        operand: Box<Node>,
        member: String,
    },
    /// `*x` as an expression or `*T` as a type.
    Deref(Box<Node>),
    Unary {
        op: String,
        operand: Box<Node>,
    },
    Binary {
        op: String,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Paren(Box<Node>),
    FuncLit {
        sig: Signature,
        body: Box<Node>,
    },
    FuncType(Signature),
    TypeAssert {
        operand: Box<Node>,
        /// `None` for the `x.(type)` form of a type switch.
        ty: Option<Box<Node>>,
    },
    /// `...T` in a parameter list.
    Variadic(Box<Node>),
    /// A grammar kind without a structural rule.
    Other { kind: String },
}

impl NodeKind {
    /// Short tag used in logs and reports.
    pub fn tag(&self) -> &str {
        match self {
            NodeKind::Ident(_) => "ident",
            NodeKind::Literal(_) => "literal",
            NodeKind::Call { .. } => "call",
            NodeKind::Defer(_) => "defer",
            NodeKind::Go(_) => "go",
            NodeKind::ExprStmt(_) => "expr",
            NodeKind::Assign { .. } => "assign",
            NodeKind::IncDec { .. } => "incdec",
            NodeKind::Return(_) => "return",
            NodeKind::If { .. } => "if",
            NodeKind::For { .. } => "for",
            NodeKind::Range { .. } => "range",
            NodeKind::Switch { .. } => "switch",
            NodeKind::Case { .. } => "case",
            NodeKind::Block(_) => "block",
            NodeKind::CompositeLit { .. } => "composite",
            NodeKind::KeyValue { .. } => "keyvalue",
            NodeKind::Index { .. } => "index",
            NodeKind::Selector { .. } => "selector",
            NodeKind::Deref(_) => "deref",
            NodeKind::Unary { .. } => "unary",
            NodeKind::Binary { .. } => "binary",
            NodeKind::Paren(_) => "paren",
            NodeKind::FuncLit { .. } => "funclit",
            NodeKind::FuncType(_) => "functype",
            NodeKind::TypeAssert { .. } => "typeassert",
            NodeKind::Variadic(_) => "variadic",
            NodeKind::Other { kind } => kind,
        }
    }
}

/// A syntax node with its attached trivia and source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub trivia: Trivia,
    /// Verbatim source text. Continuation lines keep their original indentation.
    pub text: String,
    /// Whitespace preceding the node on its first line.
    pub indent: String,
}

impl Node {
    pub fn new(kind: NodeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            trivia: Trivia::default(),
            text: text.into(),
            indent: String::new(),
        }
    }

    pub fn boxed(self) -> Box<Node> {
        Box::new(self)
    }
}

/// An ordered statement list plus the comments that trail its last statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Node>,
    pub dangling: Vec<Comment>,
}

impl Block {
    pub fn new(stmts: Vec<Node>) -> Self {
        Self {
            stmts,
            dangling: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}
