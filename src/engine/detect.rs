//! Window matching: decide what to do with a block given a candidate.

use crate::engine::compare::{compare, MatchMode};
use crate::engine::directive::{node_has_marker, DIRECTIVE_MARKER};
use crate::engine::errors::EngineError;
use crate::syntax::Node;
use serde::Serialize;

/// A non-empty statement sequence rendered from the template.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    nodes: Vec<Node>,
}

impl Candidate {
    pub fn new(nodes: Vec<Node>) -> Result<Self, EngineError> {
        if nodes.is_empty() {
            return Err(EngineError::EmptyCandidate);
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Outcome of detection for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Skip,
    Insert,
    Update { at: usize, count: usize },
    Remove { at: usize, count: usize },
}

impl Action {
    pub fn is_skip(&self) -> bool {
        matches!(self, Action::Skip)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DetectOptions<'a> {
    /// Remove matching statements instead of inserting or updating.
    pub remove: bool,
    /// Treat a run of statements carrying this marker as the match when no
    /// window matches structurally.
    pub generated_marker: Option<&'a str>,
}

/// Classify `block` against `candidate`.
///
/// Only the first window that skeleton-matches is considered; later
/// windows are never inspected.
pub fn detect(block: &[Node], candidate: &Candidate, options: &DetectOptions<'_>) -> Action {
    if let Some(at) = find_window(block, candidate.nodes()) {
        let window = &block[at..at + candidate.len()];
        if protected(window) {
            return Action::Skip;
        }
        if options.remove {
            return Action::Remove {
                at,
                count: candidate.len(),
            };
        }
        let exact = window
            .iter()
            .zip(candidate.nodes())
            .all(|(have, want)| compare(have, want, MatchMode::Exact));
        return if exact {
            Action::Skip
        } else {
            Action::Update {
                at,
                count: candidate.len(),
            }
        };
    }

    if let Some(marker) = options.generated_marker {
        if let Some((at, count)) = find_marked_run(block, marker) {
            if protected(&block[at..at + count]) {
                return Action::Skip;
            }
            return if options.remove {
                Action::Remove { at, count }
            } else {
                Action::Update { at, count }
            };
        }
    }

    if options.remove {
        Action::Skip
    } else {
        Action::Insert
    }
}

/// Lowest index whose window skeleton-matches `candidate` pairwise.
pub fn find_window(block: &[Node], candidate: &[Node]) -> Option<usize> {
    let n = candidate.len();
    if n == 0 || block.len() < n {
        return None;
    }
    (0..=block.len() - n).find(|&i| {
        block[i..i + n]
            .iter()
            .zip(candidate)
            .all(|(have, want)| compare(have, want, MatchMode::Skeleton))
    })
}

/// Any statement in the range carries the skip directive.
fn protected(range: &[Node]) -> bool {
    range.iter().any(|node| node_has_marker(node, DIRECTIVE_MARKER))
}

/// First run of consecutive statements carrying `marker`.
fn find_marked_run(block: &[Node], marker: &str) -> Option<(usize, usize)> {
    let at = block.iter().position(|n| node_has_marker(n, marker))?;
    let count = block[at..]
        .iter()
        .take_while(|n| node_has_marker(n, marker))
        .count();
    Some((at, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Comment, Ident, Literal, LiteralKind, NodeKind};

    fn ident(name: &str) -> Node {
        Node::new(NodeKind::Ident(Ident::new(name)), name)
    }

    fn trace(name: &str) -> Node {
        let call = Node::new(
            NodeKind::Call {
                func: ident("trace").boxed(),
                args: vec![
                    ident("ctx"),
                    Node::new(
                        NodeKind::Literal(Literal {
                            kind: LiteralKind::String,
                            value: format!("{name:?}"),
                        }),
                        format!("{name:?}"),
                    ),
                ],
                spread: false,
            },
            format!("trace(ctx, {name:?})"),
        );
        Node::new(NodeKind::Defer(call.boxed()), format!("defer trace(ctx, {name:?})"))
    }

    fn work() -> Node {
        let call = Node::new(
            NodeKind::Call {
                func: ident("doWork").boxed(),
                args: Vec::new(),
                spread: false,
            },
            "doWork()",
        );
        Node::new(NodeKind::ExprStmt(call.boxed()), "doWork()")
    }

    fn candidate(nodes: Vec<Node>) -> Candidate {
        Candidate::new(nodes).unwrap()
    }

    #[test]
    fn empty_candidate_is_rejected() {
        assert_eq!(Candidate::new(Vec::new()), Err(EngineError::EmptyCandidate));
    }

    #[test]
    fn empty_block_inserts() {
        let action = detect(&[], &candidate(vec![trace("x.Y")]), &DetectOptions::default());
        assert_eq!(action, Action::Insert);
    }

    #[test]
    fn stale_literal_updates() {
        let block = vec![trace("old.Name")];
        let action = detect(&block, &candidate(vec![trace("new.Name")]), &DetectOptions::default());
        assert_eq!(action, Action::Update { at: 0, count: 1 });
    }

    #[test]
    fn identical_block_skips() {
        let block = vec![trace("x.Y")];
        let action = detect(&block, &candidate(vec![trace("x.Y")]), &DetectOptions::default());
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn remove_mode_removes_first_match() {
        let block = vec![trace("x.Y"), work()];
        let options = DetectOptions {
            remove: true,
            ..Default::default()
        };
        let action = detect(&block, &candidate(vec![trace("other")]), &options);
        assert_eq!(action, Action::Remove { at: 0, count: 1 });
    }

    #[test]
    fn remove_mode_without_match_skips() {
        let options = DetectOptions {
            remove: true,
            ..Default::default()
        };
        let action = detect(&[work()], &candidate(vec![trace("x.Y")]), &options);
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn directive_beats_remove() {
        let mut protected = trace("x.Y");
        protected.trivia.trailing.push(Comment::new("//ctxweave:skip"));
        let options = DetectOptions {
            remove: true,
            ..Default::default()
        };
        let action = detect(&[protected], &candidate(vec![trace("x.Y")]), &options);
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn directive_beats_update() {
        let mut protected = trace("old");
        protected.trivia.leading.push(Comment::new("// ctxweave:skip keep the old name"));
        let action = detect(&[protected], &candidate(vec![trace("new")]), &DetectOptions::default());
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn directive_on_later_window_statement_protects_the_window() {
        let mut tuned = work();
        tuned.trivia.trailing.push(Comment::new("//ctxweave:skip hand-tuned"));
        let block = vec![trace("old"), tuned];
        let candidate = candidate(vec![trace("svc.Get"), work()]);

        assert_eq!(
            detect(&block, &candidate, &DetectOptions::default()),
            Action::Skip
        );
        let options = DetectOptions {
            remove: true,
            ..Default::default()
        };
        assert_eq!(detect(&block, &candidate, &options), Action::Skip);
    }

    #[test]
    fn directive_inside_generated_run_protects_the_run() {
        let mut first = work();
        first.trivia.trailing.push(Comment::line("ctxweave:generated"));
        let mut second = trace("old");
        second.trivia.trailing.push(Comment::line("ctxweave:generated"));
        second.trivia.leading.push(Comment::new("// ctxweave:skip"));
        let options = DetectOptions {
            generated_marker: Some("ctxweave:generated"),
            ..Default::default()
        };
        let action = detect(&[first, second], &candidate(vec![ident("x")]), &options);
        assert_eq!(action, Action::Skip);
    }

    #[test]
    fn first_matching_window_wins() {
        let block = vec![work(), trace("a"), work(), trace("b")];
        let action = detect(&block, &candidate(vec![trace("c")]), &DetectOptions::default());
        assert_eq!(action, Action::Update { at: 1, count: 1 });
    }

    #[test]
    fn multi_statement_window_after_unrelated_statement() {
        let block = vec![work(), trace("old"), work()];
        let action = detect(
            &block,
            &candidate(vec![trace("new"), work()]),
            &DetectOptions::default(),
        );
        assert_eq!(action, Action::Update { at: 1, count: 2 });
    }

    #[test]
    fn generated_marker_run_is_a_fallback_match() {
        let mut marked = work();
        marked.trivia.trailing.push(Comment::line("ctxweave:generated"));
        let block = vec![marked, trace("keep")];
        let options = DetectOptions {
            generated_marker: Some("ctxweave:generated"),
            ..Default::default()
        };
        let action = detect(&block[..1], &candidate(vec![ident("x")]), &options);
        assert_eq!(action, Action::Update { at: 0, count: 1 });

        // A structural match still takes precedence.
        let action = detect(&block, &candidate(vec![trace("keep")]), &options);
        assert_eq!(action, Action::Skip);
    }
}
