//! Tokenizer for the query and order-by languages

use super::ast::CompareOp;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// `@name`
    Attribute(String),
    /// Unquoted numeric text
    Number(String),
    /// Quoted string, escapes resolved
    Quoted(String),
    /// Bare word; `@@x` arrives here as `@x`
    Word(String),
    Op {
        op: CompareOp,
        case_insensitive: bool,
    },
    And,
    Or,
    Not,
    True,
    False,
    Now,
    LParen,
    RParen,
    Comma,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Attribute(name) => format!("attribute '@{}'", name),
            Token::Number(n) => format!("number '{}'", n),
            Token::Quoted(s) => format!("string {:?}", s),
            Token::Word(w) => format!("word '{}'", w),
            Token::Op {
                op,
                case_insensitive,
            } => format!("operator '{}{}'", if *case_insensitive { "~" } else { "" }, op),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::Not => "'not'".to_string(),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Now => "'now'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

/// A token and the 1-based column it starts at
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub column: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '/' | '-' | '+')
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split `input` into tokens, recording a diagnostic for each bad character
pub(crate) fn tokenize(input: &str, diagnostics: &mut Vec<String>) -> Vec<Spanned> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(Spanned { token, column });
            i += 1;
            continue;
        }

        if matches!(c, '~' | '=' | '!' | '<' | '>' | '$') {
            let case_insensitive = c == '~';
            let start = if case_insensitive { i + 1 } else { i };
            match read_operator(&chars, start) {
                Some((op, len)) => {
                    tokens.push(Spanned {
                        token: Token::Op {
                            op,
                            case_insensitive,
                        },
                        column,
                    });
                    i = start + len;
                }
                None => {
                    diagnostics.push(format!("column {}: incomplete operator '{}'", column, c));
                    i = start.max(i + 1);
                }
            }
            continue;
        }

        if c == '"' || c == '\'' {
            let mut text = String::new();
            let mut j = i + 1;
            let mut closed = false;
            while j < chars.len() {
                match chars[j] {
                    '\\' if j + 1 < chars.len() => {
                        text.push(chars[j + 1]);
                        j += 2;
                    }
                    q if q == c => {
                        closed = true;
                        j += 1;
                        break;
                    }
                    other => {
                        text.push(other);
                        j += 1;
                    }
                }
            }
            if !closed {
                diagnostics.push(format!("column {}: unterminated string", column));
            }
            tokens.push(Spanned {
                token: Token::Quoted(text),
                column,
            });
            i = j;
            continue;
        }

        if c == '@' {
            if chars.get(i + 1) == Some(&'@') {
                let end = scan(&chars, i + 2, is_word_char);
                let text: String = chars[i + 1..end].iter().collect();
                tokens.push(Spanned {
                    token: Token::Word(text),
                    column,
                });
                i = end;
                continue;
            }
            let end = scan(&chars, i + 1, is_name_char);
            if end == i + 1 {
                diagnostics.push(format!("column {}: '@' must be followed by an attribute name", column));
                i += 1;
                continue;
            }
            tokens.push(Spanned {
                token: Token::Attribute(chars[i + 1..end].iter().collect()),
                column,
            });
            i = end;
            continue;
        }

        if is_word_char(c) {
            let end = scan(&chars, i, is_word_char);
            let text: String = chars[i..end].iter().collect();
            tokens.push(Spanned {
                token: classify(text),
                column,
            });
            i = end;
            continue;
        }

        diagnostics.push(format!("column {}: unexpected character '{}'", column, c));
        i += 1;
    }

    tokens
}

fn scan(chars: &[char], from: usize, accept: fn(char) -> bool) -> usize {
    let mut end = from;
    while end < chars.len() && accept(chars[end]) {
        end += 1;
    }
    end
}

fn read_operator(chars: &[char], at: usize) -> Option<(CompareOp, usize)> {
    let first = *chars.get(at)?;
    let second = chars.get(at + 1).copied();
    match (first, second) {
        ('=', Some('=')) => Some((CompareOp::Eq, 2)),
        ('=', _) => Some((CompareOp::Eq, 1)),
        ('!', Some('=')) => Some((CompareOp::Ne, 2)),
        ('<', Some('>')) => Some((CompareOp::Ne, 2)),
        ('<', Some('=')) => Some((CompareOp::Le, 2)),
        ('<', _) => Some((CompareOp::Lt, 1)),
        ('>', Some('=')) => Some((CompareOp::Ge, 2)),
        ('>', _) => Some((CompareOp::Gt, 1)),
        ('$', _) => Some((CompareOp::SubstringOf, 1)),
        _ => None,
    }
}

fn classify(text: String) -> Token {
    match text.to_ascii_lowercase().as_str() {
        "and" => return Token::And,
        "or" => return Token::Or,
        "not" => return Token::Not,
        "true" => return Token::True,
        "false" => return Token::False,
        "now" => return Token::Now,
        _ => {}
    }
    if text.parse::<i64>().is_ok()
        || (text.chars().any(|c| c.is_ascii_digit()) && text.parse::<f64>().is_ok())
    {
        Token::Number(text)
    } else {
        Token::Word(text)
    }
}
