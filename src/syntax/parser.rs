use crate::syntax::errors::SyntaxError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Parser, Tree};

/// Tree-sitter parser loaded with the Go grammar.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        // The Go grammar ships with ast-grep-language
        parser
            .set_language(&SupportLang::Go.get_ts_language())
            .map_err(|_| SyntaxError::LanguageSet)?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Result<Tree, SyntaxError> {
        self.parser
            .parse(source, None)
            .ok_or(SyntaxError::ParseFailed)
    }

    /// Parse and keep the source next to the tree, for text lookups.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, SyntaxError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Fails on the first ERROR or MISSING node, counting the rest.
    pub fn check(&self) -> Result<(), SyntaxError> {
        if !self.has_errors() {
            return Ok(());
        }
        let mut first: Option<tree_sitter::Node<'_>> = None;
        let mut count = 0;
        let mut stack = vec![self.tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                count += 1;
                if first.map_or(true, |f| node.start_byte() < f.start_byte()) {
                    first = Some(node);
                }
                continue;
            }
            if !node.has_error() {
                continue;
            }
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }

        let Some(node) = first else {
            return Err(SyntaxError::ParseFailed);
        };
        let position = node.start_position();
        let found = if node.is_missing() {
            format!("missing `{}`", node.kind())
        } else {
            let text = &self.source[node.start_byte()..node.end_byte()];
            let first_line = text.lines().next().unwrap_or("").trim();
            format!("unexpected `{first_line}`")
        };
        Err(SyntaxError::Invalid {
            line: position.row + 1,
            column: position.column + 1,
            found,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_go() {
        let mut parser = GoParser::new().unwrap();
        let source = "package main\n\nfunc main() { println(\"hello\") }\n";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(!parsed.has_errors());
        assert_eq!(parsed.root_node().kind(), "source_file");
        assert!(parsed.check().is_ok());
    }

    #[test]
    fn reports_first_error_position() {
        let mut parser = GoParser::new().unwrap();
        let source = "package main\n\nfunc main( {\n";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(parsed.has_errors());
        match parsed.check() {
            Err(SyntaxError::Invalid { line, count, .. }) => {
                assert_eq!(line, 3);
                assert!(count >= 1);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
