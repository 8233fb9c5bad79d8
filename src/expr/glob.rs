//! Glob matching for single name components.
//!
//! Supports `*` (any run), `?` (any single character) and bracket classes
//! `[abc]`, `[a-z]`, `[!x]` / `[^x]`.

use smallvec::SmallVec;

use super::SyntaxError;

#[derive(Clone, Debug, PartialEq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class {
        negated: bool,
        items: SmallVec<[ClassItem; 4]>,
    },
}

impl Token {
    fn matches_char(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => true,
            Token::AnyRun => false,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match item {
                    ClassItem::Char(x) => *x == c,
                    ClassItem::Range(lo, hi) => (*lo..=*hi).contains(&c),
                });
                hit != *negated
            }
        }
    }
}

/// Compiled glob over one path component or property name.
#[derive(Clone, Debug, PartialEq)]
pub struct Glob {
    source: String,
    tokens: SmallVec<[Token; 8]>,
}

impl Glob {
    /// Compile a glob. `base` is the offset of `source` within the whole
    /// expression, used for error positions.
    pub(crate) fn parse(source: &str, base: usize) -> Result<Self, SyntaxError> {
        let chars: Vec<char> = source.chars().collect();
        let mut tokens: SmallVec<[Token; 8]> = SmallVec::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '*' => {
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyChar);
                    i += 1;
                }
                '[' => {
                    let start = i;
                    i += 1;
                    let negated = matches!(chars.get(i), Some('!') | Some('^'));
                    if negated {
                        i += 1;
                    }
                    let mut items: SmallVec<[ClassItem; 4]> = SmallVec::new();
                    loop {
                        match chars.get(i) {
                            None => {
                                return Err(SyntaxError::new(
                                    base + start,
                                    "unterminated character class",
                                ))
                            }
                            Some(']') => {
                                i += 1;
                                break;
                            }
                            Some(&lo) => {
                                if chars.get(i + 1) == Some(&'-')
                                    && chars.get(i + 2).map_or(false, |c| *c != ']')
                                {
                                    let hi = chars[i + 2];
                                    if hi < lo {
                                        return Err(SyntaxError::new(
                                            base + i,
                                            format!("invalid range '{}-{}'", lo, hi),
                                        ));
                                    }
                                    items.push(ClassItem::Range(lo, hi));
                                    i += 3;
                                } else {
                                    items.push(ClassItem::Char(lo));
                                    i += 1;
                                }
                            }
                        }
                    }
                    if items.is_empty() {
                        return Err(SyntaxError::new(base + start, "empty character class"));
                    }
                    tokens.push(Token::Class { negated, items });
                }
                c if c.is_ascii_alphanumeric() || c == '_' || c == ':' => {
                    tokens.push(Token::Literal(c));
                    i += 1;
                }
                c => {
                    return Err(SyntaxError::new(
                        base + i,
                        format!("unexpected character '{}' in name pattern", c),
                    ))
                }
            }
        }
        if tokens.is_empty() {
            return Err(SyntaxError::new(base, "empty name pattern"));
        }
        Ok(Self {
            source: source.to_string(),
            tokens,
        })
    }

    /// Glob that matches exactly `name`.
    pub fn literal(name: &str) -> Self {
        Self {
            source: name.to_string(),
            tokens: name.chars().map(Token::Literal).collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when the glob contains no wildcards.
    pub fn is_literal(&self) -> bool {
        self.tokens.iter().all(|t| matches!(t, Token::Literal(_)))
    }

    pub fn matches(&self, text: &str) -> bool {
        let chars: Vec<char> = text.chars().collect();
        let tokens = &self.tokens;
        let (mut t, mut p) = (0, 0);
        // Resume point of the most recent `*`: (token after it, text index).
        let mut star: Option<(usize, usize)> = None;

        while t < chars.len() {
            if p < tokens.len() && tokens[p].matches_char(chars[t]) {
                t += 1;
                p += 1;
            } else if p < tokens.len() && tokens[p] == Token::AnyRun {
                star = Some((p + 1, t));
                p += 1;
            } else if let Some((sp, st)) = star {
                p = sp;
                t = st + 1;
                star = Some((sp, st + 1));
            } else {
                return false;
            }
        }
        while p < tokens.len() && tokens[p] == Token::AnyRun {
            p += 1;
        }
        p == tokens.len()
    }
}
