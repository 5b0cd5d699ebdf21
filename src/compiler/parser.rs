//! Filter expression tokenizer and parser.
//!
//! The parser reads one nesting level at a time as a flat sequence
//! `term (logical_op term)*` and hands that sequence to
//! [`regroup`](super::regroup::regroup), which restores AND-over-OR precedence.

use super::regroup::regroup;
use crate::ast::{Cmp, FilterNode, InRule, LogicalOp, SetMembership, StrCmp, StringCompare, ValueCompare};
use crate::error::ParseError;

/// Tokens of a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Bare word: label, keyword (`and`, `or`, `in`, `not_in`) or set item.
    Word(String),
    /// Number with its optional unit suffix, e.g. `42.0u` or `-1h`.
    Number {
        value: f64,
        unit: String,
        raw: String,
    },
    /// `'...'`
    Quoted(String),
    /// `"..."`
    DoubleQuoted(String),
    Compare(Cmp),
    And,
    Or,
    LeftParen,
    RightParen,
    Comma,
}

/// Token plus where it starts in the input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub position: usize,
    /// Whitespace (or start of input) precedes the token.
    pub spaced: bool,
}

/// Tokenize a filter string.
pub(crate) fn tokenize_filter(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let offset = |k: usize| chars.get(k).map_or(input.len(), |&(pos, _)| pos);
    let at = |k: usize| chars.get(k).map(|&(_, ch)| ch);

    let mut tokens = Vec::new();
    let mut i = 0;
    let mut spaced = true;

    while let Some(ch) = at(i) {
        let position = offset(i);

        if ch.is_whitespace() {
            spaced = true;
            i += 1;
            continue;
        }

        let token = match ch {
            '(' => {
                i += 1;
                Token::LeftParen
            }
            ')' => {
                i += 1;
                Token::RightParen
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '&' | '|' => {
                if at(i + 1) != Some(ch) {
                    return Err(ParseError::new(
                        input,
                        position,
                        format!("unexpected '{ch}', expected '{ch}{ch}'"),
                    ));
                }
                i += 2;
                if ch == '&' {
                    Token::And
                } else {
                    Token::Or
                }
            }
            '=' => {
                i += if at(i + 1) == Some('=') { 2 } else { 1 };
                Token::Compare(Cmp::Eq)
            }
            '!' => {
                if at(i + 1) != Some('=') {
                    return Err(ParseError::new(input, position, "unexpected '!', expected '!='"));
                }
                i += 2;
                Token::Compare(Cmp::Ne)
            }
            '<' | '>' => {
                let or_equal = at(i + 1) == Some('=');
                i += if or_equal { 2 } else { 1 };
                Token::Compare(match (ch, or_equal) {
                    ('<', false) => Cmp::Lt,
                    ('<', true) => Cmp::Le,
                    (_, false) => Cmp::Gt,
                    (_, true) => Cmp::Ge,
                })
            }
            '\'' | '"' => {
                let start = i + 1;
                let mut end = start;
                while at(end).is_some_and(|c| c != ch) {
                    end += 1;
                }
                if at(end).is_none() {
                    return Err(ParseError::new(input, position, "unterminated quoted string"));
                }
                let content = input[offset(start)..offset(end)].to_string();
                i = end + 1;
                if ch == '\'' {
                    Token::Quoted(content)
                } else {
                    Token::DoubleQuoted(content)
                }
            }
            '-' | '0'..='9' => {
                let start = i;
                if ch == '-' {
                    if !at(i + 1).is_some_and(|c| c.is_ascii_digit()) {
                        return Err(ParseError::new(input, position, "unexpected '-'"));
                    }
                    i += 1;
                }
                while at(i).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                }
                if at(i) == Some('.') && at(i + 1).is_some_and(|c| c.is_ascii_digit()) {
                    i += 1;
                    while at(i).is_some_and(|c| c.is_ascii_digit()) {
                        i += 1;
                    }
                }
                let number_end = i;
                while at(i).is_some_and(|c| c.is_ascii_alphabetic() || c == '%') {
                    i += 1;
                }

                let number = &input[offset(start)..offset(number_end)];
                let value: f64 = number.parse().map_err(|_| {
                    ParseError::new(input, position, format!("invalid number '{number}'"))
                })?;
                Token::Number {
                    value,
                    unit: input[offset(number_end)..offset(i)].to_string(),
                    raw: input[offset(start)..offset(i)].to_string(),
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while at(i)
                    .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
                {
                    i += 1;
                }
                Token::Word(input[offset(start)..offset(i)].to_string())
            }
            _ => {
                return Err(ParseError::new(
                    input,
                    position,
                    format!("unexpected character '{ch}'"),
                ));
            }
        };

        tokens.push(Spanned {
            token,
            position,
            spaced,
        });
        spaced = false;
    }

    Ok(tokens)
}

/// Recursive descent parser over a token slice.
pub(crate) struct FilterParser<'a> {
    input: &'a str,
    tokens: &'a [Spanned],
    position: usize,
    max_depth: usize,
}

impl<'a> FilterParser<'a> {
    pub(crate) fn new(input: &'a str, tokens: &'a [Spanned], max_depth: usize) -> Self {
        Self {
            input,
            tokens,
            position: 0,
            max_depth,
        }
    }

    fn current(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.position)
    }

    fn current_token(&self) -> Option<&'a Token> {
        self.current().map(|spanned| &spanned.token)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        let position = self.current().map_or(self.input.len(), |t| t.position);
        ParseError::new(self.input, position, reason)
    }

    /// Parse the whole token stream; anything left over is an error.
    pub(crate) fn parse_filter(&mut self) -> Result<FilterNode, ParseError> {
        let node = self.parse_expression(0)?;
        match self.current_token() {
            None => Ok(node),
            Some(Token::RightParen) => Err(self.error("unbalanced parenthesis, unexpected ')'")),
            Some(_) => Err(self.error("unexpected trailing input")),
        }
    }

    /// `term (logical_op term)*` at one nesting level.
    fn parse_expression(&mut self, depth: usize) -> Result<FilterNode, ParseError> {
        let first = self.parse_term(depth)?;
        let mut rest = Vec::new();

        while let Some(operator) = self.logical_operator() {
            self.advance();
            let term = self.parse_term(depth)?;
            rest.push((operator, term));
        }

        Ok(regroup(first, rest))
    }

    /// `and`/`or` only count as operators when surrounded by whitespace.
    fn logical_operator(&self) -> Option<LogicalOp> {
        let spanned = self.current()?;
        match &spanned.token {
            Token::And => Some(LogicalOp::And),
            Token::Or => Some(LogicalOp::Or),
            Token::Word(word) if spanned.spaced => {
                let next_spaced = self
                    .tokens
                    .get(self.position + 1)
                    .map_or(true, |next| next.spaced);
                match word.as_str() {
                    "and" if next_spaced => Some(LogicalOp::And),
                    "or" if next_spaced => Some(LogicalOp::Or),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn parse_term(&mut self, depth: usize) -> Result<FilterNode, ParseError> {
        match self.current_token() {
            Some(Token::LeftParen) => {
                if depth >= self.max_depth {
                    return Err(self.error(format!(
                        "parenthesis nesting deeper than {}",
                        self.max_depth
                    )));
                }
                self.advance();
                let node = self.parse_expression(depth + 1)?;
                match self.current_token() {
                    Some(Token::RightParen) => {
                        self.advance();
                        Ok(node)
                    }
                    _ => Err(self.error("unbalanced parenthesis, expected ')'")),
                }
            }
            Some(Token::Number { value, unit, .. }) => {
                self.advance();
                let comparator = match self.current_token() {
                    Some(Token::Compare(cmp)) => *cmp,
                    _ => return Err(self.error("expected a comparison operator after number")),
                };
                self.advance();
                let label = self.parse_label()?;
                Ok(ValueCompare::reversed(*value, unit.clone(), comparator, label).into())
            }
            Some(Token::Word(_)) => {
                let label = self.parse_label()?;
                self.parse_label_test(label)
            }
            Some(_) => Err(self.error("expected a comparison or '('")),
            None => Err(self.error("missing operand")),
        }
    }

    fn parse_label(&mut self) -> Result<String, ParseError> {
        match self.current_token() {
            Some(Token::Word(word)) if is_label(word) => {
                self.advance();
                Ok(word.clone())
            }
            Some(Token::Word(word)) => Err(self.error(format!(
                "invalid label '{word}', labels are lowercase letters, digits and '_'"
            ))),
            _ => Err(self.error("expected a label")),
        }
    }

    /// What follows a label: numeric or string comparison, or set membership.
    fn parse_label_test(&mut self, label: String) -> Result<FilterNode, ParseError> {
        let spanned = match self.current() {
            Some(spanned) => spanned,
            None => return Err(self.error("expected a comparison operator, 'in' or 'not_in'")),
        };

        match &spanned.token {
            Token::Compare(cmp) => {
                let cmp = *cmp;
                self.advance();
                match self.current_token() {
                    Some(Token::Number { value, unit, .. }) => {
                        self.advance();
                        Ok(ValueCompare::new(label, cmp, *value, unit.clone()).into())
                    }
                    Some(Token::Quoted(value)) => {
                        let comparator = match cmp {
                            Cmp::Eq => StrCmp::Eq,
                            Cmp::Ne => StrCmp::Ne,
                            other => {
                                return Err(self.error(format!(
                                    "operator '{other}' can't be applied to a string"
                                )))
                            }
                        };
                        self.advance();
                        Ok(StringCompare::new(label, comparator, value.clone()).into())
                    }
                    Some(Token::DoubleQuoted(_)) => {
                        Err(self.error("compared strings must be single quoted"))
                    }
                    _ => Err(self.error("expected a number or a quoted string")),
                }
            }
            Token::Word(word) if spanned.spaced && (word == "in" || word == "not_in") => {
                let rule = if word == "in" {
                    InRule::In
                } else {
                    InRule::NotIn
                };
                self.advance();
                let values = self.parse_set_items()?;
                Ok(SetMembership::new(label, rule, values).into())
            }
            _ => Err(self.error("expected a comparison operator, 'in' or 'not_in'")),
        }
    }

    /// `'(' item (',' item)* ')'`
    fn parse_set_items(&mut self) -> Result<Vec<String>, ParseError> {
        if self.current_token() != Some(&Token::LeftParen) {
            return Err(self.error("expected '(' to open the value list"));
        }
        self.advance();

        let mut values = Vec::new();
        loop {
            let item = match self.current_token() {
                Some(Token::Quoted(value) | Token::DoubleQuoted(value) | Token::Word(value)) => {
                    value.clone()
                }
                Some(Token::Number { raw, .. }) => raw.clone(),
                _ => return Err(self.error("expected a value in list")),
            };
            self.advance();
            values.push(item);

            match self.current_token() {
                Some(Token::Comma) => self.advance(),
                Some(Token::RightParen) => {
                    self.advance();
                    return Ok(values);
                }
                _ => return Err(self.error("expected ',' or ')' in value list")),
            }
        }
    }
}

/// `[a-z_][a-z0-9_]*`
fn is_label(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Tokenize and parse `input` (already trimmed and non-empty).
pub(crate) fn parse_tokens(input: &str, max_depth: usize) -> Result<FilterNode, ParseError> {
    let tokens = tokenize_filter(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new(input, 0, "empty filter"));
    }
    FilterParser::new(input, &tokens, max_depth).parse_filter()
}
