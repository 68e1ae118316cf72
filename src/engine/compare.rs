//! Structural comparison of nodes.
//!
//! Skeleton mode ignores literal values only; identifiers, operators,
//! arities and the presence of optional children must all agree. Exact mode
//! additionally compares literal values. Trivia is never compared.

use crate::syntax::{Node, NodeKind, Signature};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Skeleton,
    Exact,
}

/// Compare two nodes under `mode`.
pub fn compare(a: &Node, b: &Node, mode: MatchMode) -> bool {
    use NodeKind::*;

    match (&a.kind, &b.kind) {
        // Same name from different packages is a different reference.
        (Ident(x), Ident(y)) => x.name == y.name && same_origin(x, y),
        // `pkg.Member` written out vs. resolved by the loader
        (Selector { member, .. }, Ident(id)) | (Ident(id), Selector { member, .. }) => {
            id.is_resolved() && id.name == *member
        }
        (Literal(x), Literal(y)) => {
            x.kind == y.kind && (mode == MatchMode::Skeleton || x.value == y.value)
        }
        (
            Call {
                func: f1,
                args: a1,
                spread: s1,
            },
            Call {
                func: f2,
                args: a2,
                spread: s2,
            },
        ) => s1 == s2 && compare_list(a1, a2, mode) && compare(f1, f2, mode),
        (Defer(x), Defer(y)) | (Go(x), Go(y)) | (ExprStmt(x), ExprStmt(y)) => compare(x, y, mode),
        (
            Assign {
                lhs: l1,
                op: o1,
                rhs: r1,
            },
            Assign {
                lhs: l2,
                op: o2,
                rhs: r2,
            },
        ) => o1 == o2 && compare_list(l1, l2, mode) && compare_list(r1, r2, mode),
        (
            IncDec {
                operand: x,
                op: o1,
            },
            IncDec {
                operand: y,
                op: o2,
            },
        ) => o1 == o2 && compare(x, y, mode),
        (Return(x), Return(y)) | (Block(x), Block(y)) => compare_list(x, y, mode),
        (
            If {
                init: i1,
                cond: c1,
                then: t1,
                otherwise: e1,
            },
            If {
                init: i2,
                cond: c2,
                then: t2,
                otherwise: e2,
            },
        ) => {
            compare_opt(i1, i2, mode)
                && compare(c1, c2, mode)
                && compare(t1, t2, mode)
                && compare_opt(e1, e2, mode)
        }
        (
            For {
                init: i1,
                cond: c1,
                post: p1,
                body: b1,
            },
            For {
                init: i2,
                cond: c2,
                post: p2,
                body: b2,
            },
        ) => {
            compare_opt(i1, i2, mode)
                && compare_opt(c1, c2, mode)
                && compare_opt(p1, p2, mode)
                && compare(b1, b2, mode)
        }
        (
            Range {
                lhs: l1,
                define: d1,
                expr: x1,
                body: b1,
            },
            Range {
                lhs: l2,
                define: d2,
                expr: x2,
                body: b2,
            },
        ) => {
            d1 == d2
                && compare_list(l1, l2, mode)
                && compare(x1, x2, mode)
                && compare(b1, b2, mode)
        }
        (
            Switch {
                init: i1,
                tag: t1,
                cases: c1,
            },
            Switch {
                init: i2,
                tag: t2,
                cases: c2,
            },
        ) => compare_opt(i1, i2, mode) && compare_opt(t1, t2, mode) && compare_list(c1, c2, mode),
        (
            Case {
                values: v1,
                is_default: d1,
                body: b1,
            },
            Case {
                values: v2,
                is_default: d2,
                body: b2,
            },
        ) => d1 == d2 && compare_list(v1, v2, mode) && compare_list(b1, b2, mode),
        (CompositeLit { ty: t1, elems: e1 }, CompositeLit { ty: t2, elems: e2 }) => {
            compare_opt(t1, t2, mode) && compare_list(e1, e2, mode)
        }
        (KeyValue { key: k1, value: v1 }, KeyValue { key: k2, value: v2 }) => {
            compare(k1, k2, mode) && compare(v1, v2, mode)
        }
        (
            Index {
                operand: o1,
                index: i1,
            },
            Index {
                operand: o2,
                index: i2,
            },
        ) => compare(o1, o2, mode) && compare(i1, i2, mode),
        (
            Selector {
                operand: o1,
                member: m1,
            },
            Selector {
                operand: o2,
                member: m2,
            },
        ) => m1 == m2 && compare(o1, o2, mode),
        (Deref(x), Deref(y)) | (Paren(x), Paren(y)) | (Variadic(x), Variadic(y)) => {
            compare(x, y, mode)
        }
        (
            Unary {
                op: o1,
                operand: x,
            },
            Unary {
                op: o2,
                operand: y,
            },
        ) => o1 == o2 && compare(x, y, mode),
        (
            Binary {
                op: o1,
                lhs: l1,
                rhs: r1,
            },
            Binary {
                op: o2,
                lhs: l2,
                rhs: r2,
            },
        ) => o1 == o2 && compare(l1, l2, mode) && compare(r1, r2, mode),
        (FuncLit { sig: s1, body: b1 }, FuncLit { sig: s2, body: b2 }) => {
            compare_signature(s1, s2, mode) && compare(b1, b2, mode)
        }
        (FuncType(s1), FuncType(s2)) => compare_signature(s1, s2, mode),
        (
            TypeAssert {
                operand: o1,
                ty: t1,
            },
            TypeAssert {
                operand: o2,
                ty: t2,
            },
        ) => compare(o1, o2, mode) && compare_opt(t1, t2, mode),
        // No structural rule: same grammar kind is enough for a skeleton
        // match, exact mode falls back to the source text.
        (Other { kind: k1 }, Other { kind: k2 }) => {
            k1 == k2 && (mode == MatchMode::Skeleton || same_text(&a.text, &b.text))
        }
        _ => false,
    }
}

/// Compare two equally long node sequences pairwise.
pub fn compare_list(a: &[Node], b: &[Node], mode: MatchMode) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| compare(x, y, mode))
}

/// Both unresolved, or both resolved to the same import path.
fn same_origin(x: &crate::syntax::Ident, y: &crate::syntax::Ident) -> bool {
    match (x.is_resolved(), y.is_resolved()) {
        (false, false) => true,
        (true, true) => x.origin == y.origin,
        _ => false,
    }
}

fn compare_opt(a: &Option<Box<Node>>, b: &Option<Box<Node>>, mode: MatchMode) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => compare(x, y, mode),
        _ => false,
    }
}

fn compare_signature(a: &Signature, b: &Signature, mode: MatchMode) -> bool {
    compare_list(&a.params, &b.params, mode) && compare_list(&a.results, &b.results, mode)
}

/// Source text equality modulo whitespace runs.
fn same_text(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}
