//! token.rs
//! Single-pass tokenizer over the interchange character stream.
//!
//! The grammar only needs braces, brackets, commas, colons, quoted strings
//! and numeric literals. Numeric tokens keep the non-negative-integer vs.
//! floating-point distinction: node indices and counts must reject negative
//! or fractional text, so `-2` and `2.0` scan as floats while `2` scans as
//! an unsigned integer.

use super::FormatError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Str(String),
    UInt(usize),
    Float(f64),
}

impl Token {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::LBrace => "'{'".into(),
            Token::RBrace => "'}'".into(),
            Token::LBracket => "'['".into(),
            Token::RBracket => "']'".into(),
            Token::Comma => "','".into(),
            Token::Colon => "':'".into(),
            Token::Str(s) => format!("\"{}\"", s),
            Token::UInt(u) => format!("{}", u),
            Token::Float(f) => format!("{:?}", f),
        }
    }
}

pub struct Tokenizer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Returns the next token, or a format error for anything the grammar
    /// does not know.
    pub fn next_token(&mut self) -> Result<Token, FormatError> {
        self.skip_whitespace();
        let b = match self.bytes.get(self.pos) {
            Some(&b) => b,
            None => return Err(FormatError::UnexpectedEnd),
        };
        self.pos += 1;
        match b {
            b'{' => Ok(Token::LBrace),
            b'}' => Ok(Token::RBrace),
            b'[' => Ok(Token::LBracket),
            b']' => Ok(Token::RBracket),
            b',' => Ok(Token::Comma),
            b':' => Ok(Token::Colon),
            b'"' => self.scan_string(),
            b'-' | b'0'..=b'9' => {
                self.pos -= 1;
                self.scan_number()
            }
            other => Err(FormatError::UnexpectedChar {
                ch: other as char,
                offset: self.pos - 1,
            }),
        }
    }

    /// True once only trailing whitespace remains.
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.bytes.len()
    }

    fn scan_string(&mut self) -> Result<Token, FormatError> {
        let mut out: Vec<u8> = Vec::new();
        loop {
            let b = match self.bytes.get(self.pos) {
                Some(&b) => b,
                None => return Err(FormatError::UnterminatedString),
            };
            self.pos += 1;
            match b {
                // Both delimiters are ASCII, so the accumulated bytes fall
                // on UTF-8 boundaries of the source text.
                b'"' => return Ok(Token::Str(String::from_utf8(out).expect("source is UTF-8"))),
                b'\\' => {
                    // Shared quote convention: only '\"' and '\\' escapes.
                    let esc = match self.bytes.get(self.pos) {
                        Some(&e @ (b'"' | b'\\')) => e,
                        _ => return Err(FormatError::UnterminatedString),
                    };
                    self.pos += 1;
                    out.push(esc);
                }
                other => out.push(other),
            }
        }
    }

    fn scan_number(&mut self) -> Result<Token, FormatError> {
        let start = self.pos;
        let mut fractional = false;
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b'0'..=b'9' => {}
                b'-' | b'+' | b'.' | b'e' | b'E' => fractional = true,
                _ => break,
            }
            self.pos += 1;
        }
        // `start` only points at '-' or a digit, so the slice is ASCII.
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        if fractional {
            match text.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Token::Float(f)),
                _ => Err(FormatError::BadNumber(text.into())),
            }
        } else {
            text.parse::<usize>()
                .map(Token::UInt)
                .map_err(|_| FormatError::BadNumber(text.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(text: &str) -> Vec<Token> {
        let mut t = Tokenizer::new(text);
        let mut out = Vec::new();
        while !t.at_end() {
            out.push(t.next_token().unwrap());
        }
        out
    }

    #[test]
    fn test_punctuation_and_numbers() {
        let toks = all_tokens("{ [ 2 , -2.0 ] : }");
        assert_eq!(
            toks,
            vec![
                Token::LBrace,
                Token::LBracket,
                Token::UInt(2),
                Token::Comma,
                Token::Float(-2.0),
                Token::RBracket,
                Token::Colon,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_integer_vs_float_distinction() {
        // Anything negative, fractional or exponent-bearing is a float
        // token; count/index positions will reject it.
        assert_eq!(all_tokens("7"), vec![Token::UInt(7)]);
        assert_eq!(all_tokens("7.0"), vec![Token::Float(7.0)]);
        assert_eq!(all_tokens("-7"), vec![Token::Float(-7.0)]);
        assert_eq!(all_tokens("1e3"), vec![Token::Float(1000.0)]);
    }

    #[test]
    fn test_string_with_escape() {
        assert_eq!(
            all_tokens(r#""a\"b""#),
            vec![Token::Str("a\"b".to_string())]
        );
    }

    #[test]
    fn test_multibyte_string_content() {
        assert_eq!(all_tokens("\"déjà\""), vec![Token::Str("déjà".to_string())]);
    }

    #[test]
    fn test_unterminated_string() {
        let mut t = Tokenizer::new("\"abc");
        assert_eq!(t.next_token(), Err(FormatError::UnterminatedString));
    }

    #[test]
    fn test_malformed_number() {
        let mut t = Tokenizer::new("1.2.3");
        assert!(matches!(t.next_token(), Err(FormatError::BadNumber(_))));
    }

    #[test]
    fn test_unexpected_character() {
        let mut t = Tokenizer::new("  ;");
        assert_eq!(
            t.next_token(),
            Err(FormatError::UnexpectedChar { ch: ';', offset: 2 })
        );
    }
}
