//! Block mutation primitives.
//!
//! Every [`Action`] maps to exactly one primitive or to a no-op. Trivia on
//! the boundary of an edited range moves onto the replacement so repeated
//! runs see the same comments in the same place.

use crate::engine::detect::{Action, Candidate};
use crate::engine::directive::has_marker;
use crate::engine::errors::EngineError;
use crate::syntax::{Block, Comment, Node};

/// Splice the candidate in front of the block.
pub fn insert_front(block: &mut Block, candidate: &Candidate) -> Result<(), EngineError> {
    let mut nodes = candidate.nodes().to_vec();
    if let Some(last) = nodes.last_mut() {
        last.trivia.blank_after = true;
    }
    block.stmts.splice(0..0, nodes);
    Ok(())
}

/// Replace `count` statements at `at` with the candidate.
pub fn replace_range(
    block: &mut Block,
    at: usize,
    count: usize,
    candidate: &Candidate,
) -> Result<(), EngineError> {
    check_bounds(block, at, count)?;

    let mut nodes = candidate.nodes().to_vec();
    let old_first = &block.stmts[at];
    let old_last = &block.stmts[at + count - 1];
    if let Some(first) = nodes.first_mut() {
        first.trivia.leading = old_first.trivia.leading.clone();
        first.trivia.blank_before = old_first.trivia.blank_before;
    }
    if let Some(last) = nodes.last_mut() {
        last.trivia.trailing = old_last.trivia.trailing.clone();
        last.trivia.blank_after = old_last.trivia.blank_after;
    }

    block.stmts.splice(at..at + count, nodes);
    Ok(())
}

/// Delete `count` statements at `at`.
pub fn remove_range(block: &mut Block, at: usize, count: usize) -> Result<(), EngineError> {
    check_bounds(block, at, count)?;
    block.stmts.drain(at..at + count);
    Ok(())
}

fn check_bounds(block: &Block, at: usize, count: usize) -> Result<(), EngineError> {
    let len = block.stmts.len();
    if at >= len || count == 0 || count > len - at {
        return Err(EngineError::Bounds { at, count, len });
    }
    Ok(())
}

/// Carry out `action`. Returns whether the block changed.
///
/// With `mark` set, statements produced by insert or update carry
/// `//<mark>` as a trailing comment.
pub fn apply(
    block: &mut Block,
    action: Action,
    candidate: &Candidate,
    mark: Option<&str>,
) -> Result<bool, EngineError> {
    match action {
        Action::Skip => Ok(false),
        Action::Insert => {
            insert_front(block, candidate)?;
            if let Some(marker) = mark {
                mark_range(block, 0, candidate.len(), marker);
            }
            Ok(true)
        }
        Action::Update { at, count } => {
            replace_range(block, at, count, candidate)?;
            if let Some(marker) = mark {
                mark_range(block, at, candidate.len(), marker);
            }
            Ok(true)
        }
        Action::Remove { at, count } => {
            remove_range(block, at, count)?;
            Ok(true)
        }
    }
}

fn mark_range(block: &mut Block, at: usize, count: usize, marker: &str) {
    for node in block.stmts.iter_mut().skip(at).take(count) {
        mark(node, marker);
    }
}

fn mark(node: &mut Node, marker: &str) {
    if !has_marker(&node.trivia.trailing, marker) {
        node.trivia.trailing.push(Comment::line(marker));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::NodeKind;

    fn stmt(text: &str) -> Node {
        Node::new(NodeKind::Other { kind: "stmt".into() }, text)
    }

    fn texts(block: &Block) -> Vec<&str> {
        block.stmts.iter().map(|n| n.text.as_str()).collect()
    }

    fn candidate(texts: &[&str]) -> Candidate {
        Candidate::new(texts.iter().map(|t| stmt(t)).collect()).unwrap()
    }

    #[test]
    fn insert_front_adds_blank_line_hint() {
        let mut existing = stmt("work()");
        existing.trivia.leading.push(Comment::new("// work"));
        let mut block = Block::new(vec![existing.clone()]);

        insert_front(&mut block, &candidate(&["a", "b"])).unwrap();

        assert_eq!(texts(&block), vec!["a", "b", "work()"]);
        assert!(!block.stmts[0].trivia.blank_after);
        assert!(block.stmts[1].trivia.blank_after);
        assert_eq!(block.stmts[2], existing);
    }

    #[test]
    fn replace_transfers_boundary_trivia() {
        let mut first = stmt("old1");
        first.trivia.leading.push(Comment::new("// keep me"));
        first.trivia.blank_before = true;
        let mut last = stmt("old2");
        last.trivia.trailing.push(Comment::new("// and me"));
        last.trivia.blank_after = true;
        let mut block = Block::new(vec![stmt("head"), first, last, stmt("tail")]);

        replace_range(&mut block, 1, 2, &candidate(&["new"])).unwrap();

        assert_eq!(texts(&block), vec!["head", "new", "tail"]);
        let new = &block.stmts[1];
        assert_eq!(new.trivia.leading, vec![Comment::new("// keep me")]);
        assert_eq!(new.trivia.trailing, vec![Comment::new("// and me")]);
        assert!(new.trivia.blank_before);
        assert!(new.trivia.blank_after);
    }

    #[test]
    fn remove_is_bounds_checked() {
        let mut block = Block::new(vec![stmt("a"), stmt("b")]);
        let before = block.clone();

        assert_eq!(
            remove_range(&mut block, 1, 2),
            Err(EngineError::Bounds { at: 1, count: 2, len: 2 })
        );
        assert!(remove_range(&mut block, 2, 1).is_err());
        assert!(remove_range(&mut block, 0, 0).is_err());
        assert!(replace_range(&mut block, 5, 1, &candidate(&["x"])).is_err());
        assert_eq!(block, before);

        remove_range(&mut block, 0, 1).unwrap();
        assert_eq!(texts(&block), vec!["b"]);
    }

    #[test]
    fn apply_marks_generated_statements_once() {
        let mut block = Block::default();
        let cand = candidate(&["a"]);
        assert!(apply(&mut block, Action::Insert, &cand, Some("ctxweave:generated")).unwrap());
        assert!(apply(
            &mut block,
            Action::Update { at: 0, count: 1 },
            &cand,
            Some("ctxweave:generated")
        )
        .unwrap());

        assert_eq!(block.stmts[0].trivia.trailing.len(), 1);
        assert_eq!(block.stmts[0].trivia.trailing[0].text, "//ctxweave:generated");
    }

    #[test]
    fn skip_is_a_no_op() {
        let mut block = Block::new(vec![stmt("a")]);
        let before = block.clone();
        assert!(!apply(&mut block, Action::Skip, &candidate(&["x"]), None).unwrap());
        assert_eq!(block, before);
    }
}
