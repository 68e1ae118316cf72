use ctxweave::engine::{apply, compare, detect, Action, Candidate, DetectOptions, MatchMode};
use ctxweave::syntax::{Block, Ident, Literal, LiteralKind, Node, NodeKind};
use ctxweave::{load_from_str, Weaver};
use proptest::prelude::*;

const FUNCS: [&str; 2] = ["trace", "log"];
const VARS: [&str; 2] = ["ctx", "c"];
const VALUES: [&str; 2] = ["a", "b"];

fn ident(name: &str) -> Node {
    Node::new(NodeKind::Ident(Ident::new(name)), name)
}

fn string_lit(value: &str) -> Node {
    let text = format!("{value:?}");
    Node::new(
        NodeKind::Literal(Literal {
            kind: LiteralKind::String,
            value: text.clone(),
        }),
        text,
    )
}

/// `func(var, "value")`, optionally deferred, optionally with a third argument.
fn statement(deferred: bool, func: usize, var: usize, value: usize, wide: bool) -> Node {
    let mut args = vec![ident(VARS[var]), string_lit(VALUES[value])];
    if wide {
        args.push(ident("extra"));
    }
    let call = Node::new(
        NodeKind::Call {
            func: ident(FUNCS[func]).boxed(),
            args,
            spread: false,
        },
        format!("{}(..)", FUNCS[func]),
    );
    if deferred {
        let text = format!("defer {}", call.text);
        Node::new(NodeKind::Defer(call.boxed()), text)
    } else {
        let text = call.text.clone();
        Node::new(NodeKind::ExprStmt(call.boxed()), text)
    }
}

fn arb_statement() -> impl Strategy<Value = Node> {
    (any::<bool>(), 0..2usize, 0..2usize, 0..2usize, any::<bool>())
        .prop_map(|(deferred, func, var, value, wide)| statement(deferred, func, var, value, wide))
}

fn arb_block() -> impl Strategy<Value = Vec<Node>> {
    proptest::collection::vec(arb_statement(), 0..6)
}

fn arb_candidate() -> impl Strategy<Value = Candidate> {
    proptest::collection::vec(arb_statement(), 1..3).prop_map(|nodes| Candidate::new(nodes).unwrap())
}

proptest! {
    #[test]
    fn prop_detect_apply_is_idempotent(stmts in arb_block(), candidate in arb_candidate()) {
        let options = DetectOptions::default();
        let mut block = Block::new(stmts);
        let action = detect(&block.stmts, &candidate, &options);
        apply(&mut block, action, &candidate, None).unwrap();

        prop_assert_eq!(detect(&block.stmts, &candidate, &options), Action::Skip);
        let settled = block.clone();
        prop_assert!(!apply(&mut block, Action::Skip, &candidate, None).unwrap());
        prop_assert_eq!(block, settled);
    }

    #[test]
    fn prop_exact_implies_skeleton(a in arb_statement(), b in arb_statement()) {
        if compare(&a, &b, MatchMode::Exact) {
            prop_assert!(compare(&a, &b, MatchMode::Skeleton));
        }
        prop_assert!(compare(&a, &a, MatchMode::Exact));
    }

    #[test]
    fn prop_remove_undoes_insert(stmts in arb_block(), candidate in arb_candidate()) {
        let options = DetectOptions::default();
        let mut block = Block::new(stmts.clone());
        prop_assume!(detect(&block.stmts, &candidate, &options) == Action::Insert);
        apply(&mut block, Action::Insert, &candidate, None).unwrap();

        let remove = DetectOptions { remove: true, ..options };
        let action = detect(&block.stmts, &candidate, &remove);
        prop_assert_eq!(action, Action::Remove { at: 0, count: candidate.len() });
        apply(&mut block, action, &candidate, None).unwrap();
        prop_assert_eq!(block.stmts, stmts);
    }

    #[test]
    fn prop_first_match_wins(prefix in arb_block(), candidate in arb_candidate()) {
        let stale: Vec<Node> = candidate
            .nodes()
            .iter()
            .map(|node| {
                let mut node = node.clone();
                node.text.push_str(" // stale");
                node
            })
            .collect();
        let mut stmts = prefix.clone();
        stmts.extend(stale.iter().cloned());
        stmts.extend(stale);

        let action = detect(&stmts, &candidate, &DetectOptions::default());
        let first = (0..=prefix.len())
            .find(|&at| {
                stmts[at..at + candidate.len()]
                    .iter()
                    .zip(candidate.nodes())
                    .all(|(a, b)| compare(a, b, MatchMode::Skeleton))
            })
            .unwrap();
        let exact = stmts[first..first + candidate.len()]
            .iter()
            .zip(candidate.nodes())
            .all(|(a, b)| compare(a, b, MatchMode::Exact));
        let expected = if exact {
            Action::Skip
        } else {
            Action::Update { at: first, count: candidate.len() }
        };
        prop_assert_eq!(action, expected);
    }
}

#[test]
fn identifier_and_arity_sensitivity() {
    let ctx = statement(true, 0, 0, 0, false);
    let c = statement(true, 0, 1, 0, false);
    assert!(!compare(&ctx, &c, MatchMode::Skeleton));

    let other_value = statement(true, 0, 0, 1, false);
    assert!(compare(&ctx, &other_value, MatchMode::Skeleton));
    assert!(!compare(&ctx, &other_value, MatchMode::Exact));

    let wide = statement(true, 0, 0, 0, true);
    assert!(!compare(&ctx, &wide, MatchMode::Skeleton));
    assert!(!compare(&ctx, &wide, MatchMode::Exact));
}

const BODY_LINES: [&str; 7] = [
    "work()",
    "x := load(ctx)",
    "defer trace.Start(ctx, \"old\").End()",
    "defer trace.Start(ctx, \"svc.F\").End()",
    "// note",
    "",
    "if err != nil {\n\t\treturn\n\t}",
];

fn arb_body() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::collection::vec(proptest::sample::select(BODY_LINES.to_vec()), 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_weaving_source_is_idempotent(body in arb_body()) {
        let config = load_from_str(
            "template = 'defer trace.Start({{.Ctx}}, \"{{.FuncName}}\").End()'\n\
             imports = [\"example.com/trace\"]\n",
        )
        .unwrap();
        let weaver = Weaver::from_config(&config).unwrap();

        let source = format!(
            "package svc\n\nimport \"context\"\n\nfunc F(ctx context.Context) {{\n\t{}\n}}\n",
            body.join("\n\t")
        );
        let first = weaver.weave_source(&source).unwrap();
        prop_assert!(first.errors.is_empty());
        let woven = first.output.unwrap_or(source);

        let second = weaver.weave_source(&woven).unwrap();
        prop_assert_eq!(second.output, None);
        prop_assert_eq!(second.functions[0].action, Action::Skip);
    }
}
