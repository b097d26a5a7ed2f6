//! Recursive-descent parser for source condition scripts.
//!
//! The language is a flat boolean expression over four lock functions:
//!
//! ```text
//! SIG(<pubkey>)  XHX(<sha256 hex>)  CLTV(<timestamp>)  CSV(<seconds>)
//! ```
//!
//! combined with `&&`, `||` and parentheses. Both operators live in the
//! same precedence tier and associate to the left: `A || B && C` reads as
//! `(A || B) && C`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Satisfied by a valid signature of the named key.
    Sig(String),
    /// Satisfied by a preimage of the given SHA-256 digest (uppercase hex).
    Xhx(String),
    /// Satisfied once the chain's median time reaches the timestamp.
    Cltv(u64),
    /// Satisfied once the source is older than the given number of seconds.
    Csv(u64),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// Number of `SIG`/`XHX` leaves, i.e. how many unlock parameters the
    /// script can consume.
    pub fn lock_count(&self) -> usize {
        match self {
            Condition::Sig(_) | Condition::Xhx(_) => 1,
            Condition::Cltv(_) | Condition::Csv(_) => 0,
            Condition::And(l, r) | Condition::Or(l, r) => l.lock_count() + r.lock_count(),
        }
    }

    /// All digests awaited by `XHX` leaves.
    pub fn xhx_digests(&self) -> Vec<&str> {
        match self {
            Condition::Xhx(h) => vec![h.as_str()],
            Condition::Sig(_) | Condition::Cltv(_) | Condition::Csv(_) => vec![],
            Condition::And(l, r) | Condition::Or(l, r) => {
                let mut digests = l.xhx_digests();
                digests.extend(r.xhx_digests());
                digests
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("bad argument '{arg}' for {func}")]
    BadArgument { func: &'static str, arg: String },
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of script")]
    UnexpectedEnd,
    #[error("unexpected trailing input")]
    TrailingInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Func(String, String),
    And,
    Or,
    Open,
    Close,
}

fn tokenize(script: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = script.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '&' => {
                chars.next();
                if chars.next() != Some('&') {
                    return Err(ParseError::UnexpectedChar('&'));
                }
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                if chars.next() != Some('|') {
                    return Err(ParseError::UnexpectedChar('|'));
                }
                tokens.push(Token::Or);
            }
            c if c.is_ascii_uppercase() => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_uppercase() {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if chars.next() != Some('(') {
                    return Err(ParseError::UnknownFunction(name));
                }
                let mut arg = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(c) => arg.push(c),
                        None => return Err(ParseError::UnexpectedEnd),
                    }
                }
                tokens.push(Token::Func(name, arg));
            }
            c => return Err(ParseError::UnexpectedChar(c)),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expr(&mut self) -> Result<Condition, ParseError> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                Some(Token::And) => Token::And,
                Some(Token::Or) => Token::Or,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_primary()?;
            left = match op {
                Token::And => Condition::And(Box::new(left), Box::new(right)),
                _ => Condition::Or(Box::new(left), Box::new(right)),
            };
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Condition, ParseError> {
        match self.next() {
            Some(Token::Func(name, arg)) => match name.as_str() {
                "SIG" => {
                    if arg.is_empty() {
                        return Err(ParseError::BadArgument { func: "SIG", arg });
                    }
                    Ok(Condition::Sig(arg))
                }
                "XHX" => {
                    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_hexdigit()) {
                        return Err(ParseError::BadArgument { func: "XHX", arg });
                    }
                    Ok(Condition::Xhx(arg))
                }
                "CLTV" => Ok(Condition::Cltv(arg.parse().map_err(|_| ParseError::BadArgument { func: "CLTV", arg })?)),
                "CSV" => Ok(Condition::Csv(arg.parse().map_err(|_| ParseError::BadArgument { func: "CSV", arg })?)),
                _ => Err(ParseError::UnknownFunction(name)),
            },
            Some(Token::Open) => {
                let inner = self.parse_expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    Some(_) => Err(ParseError::TrailingInput),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            Some(_) => Err(ParseError::TrailingInput),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}

pub fn parse(script: &str) -> Result<Condition, ParseError> {
    let mut parser = Parser { tokens: tokenize(script)?, pos: 0 };
    let condition = parser.parse_expr()?;
    if parser.peek().is_some() {
        return Err(ParseError::TrailingInput);
    }
    Ok(condition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_functions() {
        assert_eq!(parse("SIG(HgTT)").unwrap(), Condition::Sig("HgTT".into()));
        assert_eq!(parse("CLTV(1500000000)").unwrap(), Condition::Cltv(1_500_000_000));
        assert_eq!(parse("CSV(3600)").unwrap(), Condition::Csv(3600));
    }

    #[test]
    fn operators_are_left_associative_same_tier() {
        // A || B && C parses as (A || B) && C.
        let parsed = parse("SIG(A) || SIG(B) && SIG(C)").unwrap();
        assert_eq!(
            parsed,
            Condition::And(
                Box::new(Condition::Or(Box::new(Condition::Sig("A".into())), Box::new(Condition::Sig("B".into())))),
                Box::new(Condition::Sig("C".into())),
            )
        );
    }

    #[test]
    fn parentheses_override() {
        let parsed = parse("SIG(A) || (SIG(B) && SIG(C))").unwrap();
        assert_eq!(
            parsed,
            Condition::Or(
                Box::new(Condition::Sig("A".into())),
                Box::new(Condition::And(Box::new(Condition::Sig("B".into())), Box::new(Condition::Sig("C".into())))),
            )
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("SIG(A) &&").is_err());
        assert!(parse("SIG(A) & SIG(B)").is_err());
        assert!(parse("WHATEVER(A)").is_err());
        assert!(parse("SIG(A) SIG(B)").is_err());
        assert!(parse("(SIG(A)").is_err());
        assert!(parse("CLTV(notanumber)").is_err());
        assert!(parse("XHX(NOTHEX)").is_err());
    }

    #[test]
    fn lock_count_and_digests() {
        let parsed = parse("SIG(A) && XHX(AB12) || XHX(CD34) && CSV(10)").unwrap();
        assert_eq!(parsed.lock_count(), 3);
        assert_eq!(parsed.xhx_digests(), vec!["AB12", "CD34"]);
    }
}
