//! XPath Lexer
//!
//! Tokenizes XPath expressions into tokens. `*` and the operator names
//! (`and`, `or`, `div`, `mod`) are disambiguated by the preceding token.

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // * as a name test
    Multiply,    // * as an operator
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),         // NCName
    NameTest(String),     // prefix:* or prefix:local
    FunctionName(String), // NCName followed by (
    NodeType(String),     // node(), text(), comment(), processing-instruction()

    // Axis
    Axis(String), // child::, descendant::, etc.

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    // End of input
    Eof,
}

impl Token {
    /// Whether an operator may follow this token (it ends an operand)
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Number(_)
                | Token::String(_)
                | Token::Name(_)
                | Token::NameTest(_)
                | Token::Star
                | Token::Dot
                | Token::DoubleDot
                | Token::RightParen
                | Token::RightBracket
        )
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            after_operand: false,
        }
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, String> {
        let token = self.scan()?;
        self.after_operand = token.ends_operand();
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let token = match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    return Ok(self.read_number());
                }
                self.advance(1);
                if self.peek() == Some('.') {
                    self.advance(1);
                    Token::DoubleDot
                } else {
                    Token::Dot
                }
            }
            '@' => {
                self.advance(1);
                Token::At
            }
            '|' => {
                self.advance(1);
                Token::Pipe
            }
            '+' => {
                self.advance(1);
                Token::Plus
            }
            '-' => {
                self.advance(1);
                Token::Minus
            }
            '*' => {
                self.advance(1);
                if self.after_operand {
                    Token::Multiply
                } else {
                    Token::Star
                }
            }
            '=' => {
                self.advance(1);
                Token::Eq
            }
            '!' => {
                self.advance(1);
                if self.peek() != Some('=') {
                    return Err(format!("Unexpected '!' at position {}", self.pos - 1));
                }
                self.advance(1);
                Token::NotEq
            }
            '<' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '(' => {
                self.advance(1);
                Token::LeftParen
            }
            ')' => {
                self.advance(1);
                Token::RightParen
            }
            '[' => {
                self.advance(1);
                Token::LeftBracket
            }
            ']' => {
                self.advance(1);
                Token::RightBracket
            }
            ',' => {
                self.advance(1);
                Token::Comma
            }
            '$' => {
                self.advance(1);
                Token::Dollar
            }
            ':' => {
                if self.peek_at(1) != Some(':') {
                    return Err(format!("Unexpected ':' at position {}", self.pos));
                }
                self.advance(2);
                Token::DoubleColon
            }
            '"' | '\'' => self.read_string(c)?,
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword()?,
            _ => return Err(format!("Unexpected character '{}' at position {}", c, self.pos)),
        };
        Ok(token)
    }

    /// Read a number literal (`1`, `1.5`, `.5`, `1.`)
    fn read_number(&mut self) -> Token {
        let start = self.pos;
        self.skip_digits();
        if self.peek() == Some('.') {
            self.advance(1);
            self.skip_digits();
        }
        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        Token::Number(value)
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
    }

    /// Read a string literal; there are no escapes in XPath 1.0
    fn read_string(&mut self, quote: char) -> Result<Token, String> {
        let open = self.pos;
        self.advance(1);
        let rest = self.remaining();
        let len = rest
            .find(quote)
            .ok_or_else(|| format!("Unterminated string literal at position {}", open))?;
        let value = rest[..len].to_string();
        self.advance(len + 1);
        Ok(Token::String(value))
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    /// Read a name or keyword
    fn read_name_or_keyword(&mut self) -> Result<Token, String> {
        let name = self.read_name_or_qname()?;

        if self.after_operand {
            match name {
                "and" => return Ok(Token::And),
                "or" => return Ok(Token::Or),
                "mod" => return Ok(Token::Mod),
                "div" => return Ok(Token::Div),
                _ => {}
            }
        }

        if name.contains(':') {
            return Ok(Token::NameTest(name.to_string()));
        }

        // Lookahead past whitespace without consuming it
        let rest = self.remaining().trim_start();
        if rest.starts_with("::") {
            Ok(Token::Axis(name.to_string()))
        } else if rest.starts_with('(') {
            match name {
                "node" | "text" | "comment" | "processing-instruction" => {
                    Ok(Token::NodeType(name.to_string()))
                }
                _ => Ok(Token::FunctionName(name.to_string())),
            }
        } else {
            Ok(Token::Name(name.to_string()))
        }
    }

    /// An NCName, optionally followed by `:*` or `:NCName`
    fn read_name_or_qname(&mut self) -> Result<&'a str, String> {
        let start = self.pos;
        self.read_ncname();
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            self.advance(1);
            match self.peek() {
                Some('*') => self.advance(1),
                Some(c) if is_name_start_char(c) => {
                    self.read_ncname();
                }
                _ => {
                    return Err(format!(
                        "Incomplete qualified name '{}' at position {}",
                        &self.input[start..self.pos],
                        start
                    ))
                }
            }
        }
        Ok(&self.input[start..self.pos])
    }

    /// Tokenize entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_simple_path() {
        let mut lexer = Lexer::new("/root/child");
        assert_eq!(lexer.next_token(), Ok(Token::Slash));
        assert_eq!(lexer.next_token(), Ok(Token::Name("root".to_string())));
        assert_eq!(lexer.next_token(), Ok(Token::Slash));
        assert_eq!(lexer.next_token(), Ok(Token::Name("child".to_string())));
        assert_eq!(lexer.next_token(), Ok(Token::Eof));
    }

    #[test]
    fn test_predicate() {
        assert_eq!(
            tokens("item[@id='test']"),
            vec![
                Token::Name("item".to_string()),
                Token::LeftBracket,
                Token::At,
                Token::Name("id".to_string()),
                Token::Eq,
                Token::String("test".to_string()),
                Token::RightBracket,
            ]
        );
    }

    #[test]
    fn test_axis_and_function() {
        assert_eq!(
            tokens("child::element"),
            vec![
                Token::Axis("child".to_string()),
                Token::DoubleColon,
                Token::Name("element".to_string()),
            ]
        );
        assert_eq!(tokens("count (x)")[0], Token::FunctionName("count".to_string()));
        assert_eq!(tokens("text()")[0], Token::NodeType("text".to_string()));
    }

    #[test]
    fn test_star_and_keywords_by_context() {
        assert_eq!(tokens("*")[0], Token::Star);
        assert_eq!(tokens("2 * 3")[1], Token::Multiply);
        assert_eq!(tokens("a/*")[2], Token::Star);
        assert_eq!(tokens("//div")[1], Token::Name("div".to_string()));
        assert_eq!(tokens("6 div 2")[1], Token::Div);
        assert_eq!(tokens("a and b")[1], Token::And);
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(tokens("ns:item")[0], Token::NameTest("ns:item".to_string()));
        assert_eq!(tokens("ns:*")[0], Token::NameTest("ns:*".to_string()));
        assert!(Lexer::new("ns:").tokenize().is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokens("position() = 1").last(), Some(&Token::Number(1.0)));
        assert_eq!(tokens(".5"), vec![Token::Number(0.5)]);
        assert_eq!(tokens("3.25"), vec![Token::Number(3.25)]);
    }

    #[test]
    fn test_lexical_errors() {
        assert!(Lexer::new("'open").tokenize().is_err());
        assert!(Lexer::new("a ! b").tokenize().is_err());
        assert!(Lexer::new("#").tokenize().is_err());
    }
}
