//! Recursive-descent parser for path expressions.
//!
//! Precedence, tightest first: `~` complement, `&` intersection,
//! `-` difference, then union (`+` or plain whitespace).

use smallvec::SmallVec;

use super::{ExprNode, Glob, PathPattern, Segment, SyntaxError};

fn is_segment_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '*' | '?' | '[')
}

fn unexpected(offset: usize, c: char) -> SyntaxError {
    match c {
        '{' => SyntaxError::new(offset, "predicate expressions are not supported"),
        '%' => SyntaxError::new(offset, "expression references are not supported"),
        _ => SyntaxError::new(offset, format!("unexpected '{}'", c)),
    }
}

fn collapse(mut items: Vec<ExprNode>, wrap: fn(Vec<ExprNode>) -> ExprNode) -> ExprNode {
    if items.len() == 1 {
        items.swap_remove(0)
    } else {
        wrap(items)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn peek_non_ws(&self) -> Option<char> {
        self.chars[self.pos..].iter().copied().find(|c| !c.is_whitespace())
    }

    /// Skip whitespace, returning whether any was consumed.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn starts_operand(c: char) -> bool {
        matches!(c, '(' | '~' | '/' | '{' | '%') || is_segment_start(c)
    }

    fn parse_union(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut items = vec![self.parse_difference()?];
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(')') => break,
                Some('+') => {
                    self.pos += 1;
                    self.skip_ws();
                    items.push(self.parse_difference()?);
                }
                Some(c) if had_ws && Self::starts_operand(c) => {
                    items.push(self.parse_difference()?);
                }
                Some(c) => return Err(unexpected(self.pos, c)),
            }
        }
        Ok(collapse(items, ExprNode::Union))
    }

    fn parse_difference(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut left = self.parse_intersection()?;
        while self.peek_non_ws() == Some('-') {
            self.skip_ws();
            self.pos += 1;
            let right = self.parse_intersection()?;
            left = ExprNode::Difference(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_intersection(&mut self) -> Result<ExprNode, SyntaxError> {
        let mut items = vec![self.parse_unary()?];
        while self.peek_non_ws() == Some('&') {
            self.skip_ws();
            self.pos += 1;
            items.push(self.parse_unary()?);
        }
        Ok(collapse(items, ExprNode::Intersect))
    }

    fn parse_unary(&mut self) -> Result<ExprNode, SyntaxError> {
        self.skip_ws();
        if self.peek() == Some('~') {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(ExprNode::Not(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<ExprNode, SyntaxError> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                self.skip_ws();
                if self.peek() == Some(')') {
                    return Err(SyntaxError::new(self.pos, "empty parentheses"));
                }
                let inner = self.parse_union()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(SyntaxError::new(self.pos, "expected ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(c) if c == '/' || is_segment_start(c) => {
                Ok(ExprNode::Pattern(self.parse_pattern()?))
            }
            Some(c) => Err(unexpected(start, c)),
            None => Err(SyntaxError::new(start, "expected a path pattern")),
        }
    }

    fn parse_glob(&mut self, allow_namespace: bool) -> Result<Glob, SyntaxError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '[' {
                while let Some(inner) = self.peek() {
                    self.pos += 1;
                    if inner == ']' {
                        break;
                    }
                }
            } else if is_segment_start(c) || (allow_namespace && c == ':') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let source: String = self.chars[start..self.pos].iter().collect();
        Glob::parse(&source, start)
    }

    fn parse_pattern(&mut self) -> Result<PathPattern, SyntaxError> {
        let mut absolute = false;
        let mut segments: SmallVec<[Segment; 4]> = SmallVec::new();

        if self.peek() == Some('/') {
            absolute = true;
            self.pos += 1;
            if self.peek() == Some('/') {
                self.pos += 1;
                segments.push(Segment::Descend);
            }
        }

        loop {
            if self.peek().map_or(false, is_segment_start) {
                segments.push(Segment::Name(self.parse_glob(false)?));
            } else {
                match segments.last() {
                    Some(Segment::Descend) => break,
                    None if absolute => break,
                    _ => {
                        return Err(SyntaxError::new(self.pos, "expected a prim name pattern"))
                    }
                }
            }

            match (self.peek(), self.peek_at(1)) {
                (Some('/'), Some('/')) => {
                    self.pos += 2;
                    segments.push(Segment::Descend);
                }
                (Some('/'), _) => {
                    self.pos += 1;
                    if !self.peek().map_or(false, is_segment_start) {
                        return Err(SyntaxError::new(
                            self.pos,
                            "expected a prim name pattern after '/'",
                        ));
                    }
                }
                _ => break,
            }
        }

        let mut property = None;
        if self.peek() == Some('.') {
            if segments.is_empty() {
                return Err(SyntaxError::new(
                    self.pos,
                    "property pattern requires a prim pattern",
                ));
            }
            self.pos += 1;
            if !self.peek().map_or(false, is_segment_start) {
                return Err(SyntaxError::new(self.pos, "expected a property name pattern"));
            }
            property = Some(self.parse_glob(true)?);
        }

        Ok(PathPattern::new(absolute, segments, property))
    }
}

/// Parse expression text into a tree.
pub(crate) fn parse_expression(text: &str) -> Result<ExprNode, SyntaxError> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
    };
    parser.skip_ws();
    if parser.peek().is_none() {
        return Err(SyntaxError::new(0, "empty expression"));
    }
    let node = parser.parse_union()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(unexpected(parser.pos, c));
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ExprNode {
        parse_expression(text).unwrap()
    }

    fn err(text: &str) -> SyntaxError {
        parse_expression(text).unwrap_err()
    }

    #[test]
    fn test_single_patterns() {
        for text in ["/World", "//", "/World//", "//Light*", "/A/*/B", "Geo/Mesh", "/A.vis*", "/"] {
            assert!(matches!(parse(text), ExprNode::Pattern(_)), "{}", text);
        }
    }

    #[test]
    fn test_precedence() {
        match parse("/A /B - /C & ~/D") {
            ExprNode::Union(items) => {
                assert_eq!(items.len(), 2);
                match &items[1] {
                    ExprNode::Difference(_, right) => {
                        assert!(matches!(**right, ExprNode::Intersect(_)));
                    }
                    other => panic!("expected difference, got {:?}", other),
                }
            }
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_union_and_grouping() {
        assert!(matches!(parse("/A + /B"), ExprNode::Union(_)));
        assert!(matches!(parse("(/A /B) & /C"), ExprNode::Intersect(_)));
        assert!(matches!(parse("~(/A)"), ExprNode::Not(_)));
    }

    #[test]
    fn test_errors() {
        assert_eq!(err("").message, "empty expression");
        assert_eq!(err("   ").message, "empty expression");
        assert_eq!(err("/A &").offset, 4);
        assert_eq!(err("(/A").message, "expected ')'");
        assert_eq!(err("()").message, "empty parentheses");
        assert_eq!(err("/A/").message, "expected a prim name pattern after '/'");
        assert_eq!(err("/World{isa:Mesh}").message, "predicate expressions are not supported");
        assert_eq!(err("%_").message, "expression references are not supported");
        assert_eq!(err("/A)").offset, 2);
        assert_eq!(err("/.x").message, "property pattern requires a prim pattern");
        assert_eq!(err("/A[b").message, "unterminated character class");
    }
}
