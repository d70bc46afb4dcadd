//! Bracket-notation reader.
//!
//! Two passes: a tokenizer that splits on parentheses and whitespace while
//! keeping byte positions for diagnostics, and a recursive-descent reader
//! that rebuilds the nesting.

use super::error::{TreeError, TreeResult};
use super::{Node, ParseTree};

/// Placeholder substituted for a literal `(` inside token text.
pub const LPAR: &str = "<LPAR>";
/// Placeholder substituted for a literal `)` inside token text.
pub const RPAR: &str = "<RPAR>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme<'a> {
    Open,
    Close,
    Atom(&'a str),
}

#[derive(Debug, Clone, Copy)]
struct Spanned<'a> {
    lexeme: Lexeme<'a>,
    position: usize,
}

fn tokenize(input: &str) -> Vec<Spanned<'_>> {
    let mut out = Vec::new();
    let mut atom_start: Option<usize> = None;

    for (pos, ch) in input.char_indices() {
        let is_break = ch == '(' || ch == ')' || ch.is_whitespace();
        if is_break {
            if let Some(start) = atom_start.take() {
                out.push(Spanned {
                    lexeme: Lexeme::Atom(&input[start..pos]),
                    position: start,
                });
            }
            match ch {
                '(' => out.push(Spanned {
                    lexeme: Lexeme::Open,
                    position: pos,
                }),
                ')' => out.push(Spanned {
                    lexeme: Lexeme::Close,
                    position: pos,
                }),
                _ => {}
            }
        } else if atom_start.is_none() {
            atom_start = Some(pos);
        }
    }
    if let Some(start) = atom_start {
        out.push(Spanned {
            lexeme: Lexeme::Atom(&input[start..]),
            position: start,
        });
    }
    out
}

struct Reader<'a> {
    tokens: Vec<Spanned<'a>>,
    cursor: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<Spanned<'a>> {
        self.tokens.get(self.cursor).copied()
    }

    fn next(&mut self) -> Option<Spanned<'a>> {
        let tok = self.peek();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    fn position(&self) -> usize {
        self.peek().map(|t| t.position).unwrap_or(self.end)
    }

    fn fail<T>(&self, position: usize, message: impl Into<String>) -> TreeResult<T> {
        Err(TreeError::MalformedTree {
            position,
            message: message.into(),
        })
    }

    fn expect_close(&mut self, label: &str) -> TreeResult<()> {
        match self.next() {
            Some(Spanned {
                lexeme: Lexeme::Close,
                ..
            }) => Ok(()),
            Some(tok) => self.fail(
                tok.position,
                format!("expected ')' to close \"{label}\" after its token"),
            ),
            None => self.fail(self.end, format!("unbalanced brackets: \"{label}\" is never closed")),
        }
    }

    fn node(&mut self) -> TreeResult<Node> {
        match self.next() {
            Some(Spanned {
                lexeme: Lexeme::Open,
                ..
            }) => {}
            Some(tok) => return self.fail(tok.position, "expected '('"),
            None => return self.fail(self.end, "unexpected end of input"),
        }

        let label = match self.next() {
            Some(Spanned {
                lexeme: Lexeme::Atom(label),
                ..
            }) => label,
            Some(tok) => return self.fail(tok.position, "node is missing its label"),
            None => return self.fail(self.end, "unexpected end of input after '('"),
        };

        match self.peek() {
            Some(Spanned {
                lexeme: Lexeme::Atom(token),
                ..
            }) => {
                self.cursor += 1;
                self.expect_close(label)?;
                Ok(Node::terminal(label, token))
            }
            Some(Spanned {
                lexeme: Lexeme::Close,
                position,
            }) => self.fail(position, format!("\"{label}\" has no children")),
            Some(Spanned {
                lexeme: Lexeme::Open,
                ..
            }) => {
                let mut children = Vec::new();
                loop {
                    match self.peek() {
                        Some(Spanned {
                            lexeme: Lexeme::Open,
                            ..
                        }) => children.push(self.node()?),
                        Some(Spanned {
                            lexeme: Lexeme::Close,
                            ..
                        }) => {
                            self.cursor += 1;
                            break;
                        }
                        Some(Spanned {
                            lexeme: Lexeme::Atom(_),
                            position,
                        }) => {
                            return self.fail(
                                position,
                                format!("\"{label}\" mixes a bare token with child nodes"),
                            );
                        }
                        None => {
                            return self.fail(
                                self.end,
                                format!("unbalanced brackets: \"{label}\" is never closed"),
                            );
                        }
                    }
                }
                Ok(Node::non_terminal(label, children))
            }
            None => self.fail(self.end, format!("unbalanced brackets: \"{label}\" is never closed")),
        }
    }
}

/// Parse a bracket string into a tree.
///
/// `()` reads as the empty tree, so the serialized empty sentinel
/// round-trips.
pub fn parse(input: &str) -> TreeResult<ParseTree> {
    let tokens = tokenize(input);
    let mut reader = Reader {
        tokens,
        cursor: 0,
        end: input.len(),
    };

    match (reader.tokens.first(), reader.tokens.get(1), reader.tokens.len()) {
        (None, _, _) => return reader.fail(0, "empty input"),
        (Some(a), Some(b), 2) if a.lexeme == Lexeme::Open && b.lexeme == Lexeme::Close => {
            return Ok(ParseTree::empty());
        }
        _ => {}
    }

    let root = reader.node()?;
    if reader.peek().is_some() {
        let position = reader.position();
        return reader.fail(position, "trailing input after the root node");
    }
    Ok(ParseTree::new(root))
}

/// Parse, substituting the empty tree (and logging a warning) on failure.
///
/// One unreadable sentence must not stop a corpus run.
pub fn parse_or_empty(input: &str) -> ParseTree {
    parse_or_else(input, |e| {
        tracing::warn!(error = %e, "substituting empty tree for malformed parse");
    })
}

/// Parse, handing any failure to `report` before substituting the empty tree.
///
/// Callers that know where the sentence came from use this to log it with
/// their own fields.
pub fn parse_or_else(input: &str, report: impl FnOnce(&TreeError)) -> ParseTree {
    parse(input).unwrap_or_else(|e| {
        report(&e);
        ParseTree::empty()
    })
}

/// Strip the outer unlabeled pair from parser output: `( (S ...) )` → `(S ...)`.
///
/// Input that is not wrapped this way is returned trimmed but otherwise as-is.
pub fn strip_outer(line: &str) -> &str {
    let trimmed = line.trim();
    match trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) if inner.trim_start().starts_with('(') => inner.trim(),
        _ => trimmed,
    }
}

/// Replace literal parentheses in token text with placeholders.
pub fn escape_token(text: &str) -> String {
    text.replace('(', LPAR).replace(')', RPAR)
}

/// Restore literal parentheses replaced by [`escape_token`].
pub fn unescape_token(text: &str) -> String {
    text.replace(LPAR, "(").replace(RPAR, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_malformed(input: &str) {
        match parse(input) {
            Err(TreeError::MalformedTree { .. }) => {}
            other => panic!("expected MalformedTree for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_structure() {
        let tree = parse("(S (NP (DT This)) (VP (VBZ is)))").unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.label(), "S");
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[0].children()[0], Node::terminal("DT", "This"));
    }

    #[test]
    fn whitespace_is_not_significant() {
        let a = parse("(S (NP (DT This)) (VP (VBZ is)))").unwrap();
        let b = parse("  (S\n\t(NP(DT This))\n  (VP (VBZ   is) ) )").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn punctuation_tokens_survive() {
        let tree = parse("(S (NP (NN x)) (. .) (, ,) (: --))").unwrap();
        assert_eq!(tree.leaves(), vec!["x", ".", ",", "--"]);
    }

    #[test]
    fn round_trip_is_structural() {
        let input = "(S (NP (JJ medical) (NN problem)) (VP (VBD indicated) (NP (JJ medical) (NN problem))))";
        let tree = parse(input).unwrap();
        let again = parse(&tree.to_string()).unwrap();
        assert_eq!(tree, again);
    }

    #[test]
    fn empty_sentinel_round_trips() {
        let tree = parse("()").unwrap();
        assert!(tree.is_empty());
        assert_eq!(parse(&tree.to_string()).unwrap(), tree);
    }

    #[test]
    fn rejects_unbalanced() {
        assert_malformed("(S (NP (DT This))");
        assert_malformed("(S (NP (DT This))))");
        assert_malformed("(NN");
    }

    #[test]
    fn rejects_childless_and_unlabeled_nodes() {
        assert_malformed("(S (NP) (VP (VBZ is)))");
        assert_malformed("(S ((DT a)))");
        assert_malformed("");
    }

    #[test]
    fn rejects_mixed_or_multiple_tokens() {
        assert_malformed("(NP word (NN x))");
        assert_malformed("(NN two words)");
        assert_malformed("(S (NN x)) (S (NN y))");
    }

    #[test]
    fn error_reports_position() {
        match parse("(S (NP) )") {
            Err(TreeError::MalformedTree { position, .. }) => assert_eq!(position, 6),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_or_empty_recovers() {
        assert!(parse_or_empty("(S (NP").is_empty());
        assert!(!parse_or_empty("(NN x)").is_empty());

        let mut reported = Vec::new();
        assert!(parse_or_else("(S (NP", |e| reported.push(e.to_string())).is_empty());
        assert!(!parse_or_else("(NN x)", |e| reported.push(e.to_string())).is_empty());
        assert_eq!(reported.len(), 1);
    }

    #[test]
    fn strips_parser_wrapper() {
        assert_eq!(strip_outer("( (S (NN x)) )\n"), "(S (NN x))");
        assert_eq!(strip_outer("(S (NN x))"), "(S (NN x))");
        assert_eq!(strip_outer("(())"), "()");
        let tree = ParseTree::from_parser_line("( (INTJ (UH Hello)) )").unwrap();
        assert_eq!(tree.to_string(), "(INTJ (UH Hello))");
    }

    #[test]
    fn escapes_parentheses_in_tokens() {
        let escaped = escape_token("have ()");
        assert_eq!(escaped, "have <LPAR><RPAR>");
        assert_eq!(unescape_token(&escaped), "have ()");
        let tree = parse(&format!("(NN {})", escape_token("(x)"))).unwrap();
        assert_eq!(tree.leaves(), vec!["<LPAR>x<RPAR>"]);
    }
}
