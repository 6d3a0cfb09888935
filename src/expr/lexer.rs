use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Bang,
    AndAnd,
    OrOr,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    /// Byte offset of the first character.
    pub pos: usize,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => name.clone(),
            Token::Str(s) => format!("{s:?}"),
            Token::Num(n) => n.to_string(),
            Token::Dot => ".".into(),
            Token::LBracket => "[".into(),
            Token::RBracket => "]".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Bang => "!".into(),
            Token::AndAnd => "&&".into(),
            Token::OrOr => "||".into(),
            Token::StrictEq => "===".into(),
            Token::StrictNe => "!==".into(),
            Token::Lt => "<".into(),
            Token::Le => "<=".into(),
            Token::Gt => ">".into(),
            Token::Ge => ">=".into(),
        }
    }
}

/// Longest match first.
const OPERATORS: [(&str, Token); 13] = [
    ("===", Token::StrictEq),
    ("!==", Token::StrictNe),
    ("&&", Token::AndAnd),
    ("||", Token::OrOr),
    ("<=", Token::Le),
    (">=", Token::Ge),
    ("<", Token::Lt),
    (">", Token::Gt),
    ("!", Token::Bang),
    ("(", Token::LParen),
    (")", Token::RParen),
    ("[", Token::LBracket),
    ("]", Token::RBracket),
];

pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut out = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '"' || ch == '\'' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => text.push('\n'),
                        Some((_, 't')) => text.push('\t'),
                        Some((_, 'r')) => text.push('\r'),
                        Some((_, escaped)) => text.push(escaped),
                        None => break,
                    },
                    c if c == ch => {
                        closed = true;
                        break;
                    }
                    c => text.push(c),
                }
            }
            if !closed {
                return Err(ExprError::UnterminatedString { pos });
            }
            out.push(Spanned { token: Token::Str(text), pos });
            continue;
        }

        let negative_number = ch == '-'
            && src[pos + 1..].chars().next().is_some_and(|c| c.is_ascii_digit());
        if ch.is_ascii_digit() || negative_number {
            let end = number_end(src, pos + 1);
            let text = &src[pos..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| ExprError::InvalidNumber { pos, text: text.to_string() })?;
            while chars.peek().is_some_and(|&(i, _)| i < end) {
                chars.next();
            }
            out.push(Spanned { token: Token::Num(value), pos });
            continue;
        }

        if ch.is_alphabetic() || ch == '_' || ch == '$' {
            let mut name = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '$' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            out.push(Spanned { token: Token::Ident(name), pos });
            continue;
        }

        if ch == '.' {
            chars.next();
            out.push(Spanned { token: Token::Dot, pos });
            continue;
        }

        let rest = &src[pos..];
        match OPERATORS.iter().find(|(op, _)| rest.starts_with(op)) {
            Some((op, token)) => {
                for _ in 0..op.len() {
                    chars.next();
                }
                out.push(Spanned { token: token.clone(), pos });
            }
            None => return Err(ExprError::UnexpectedChar { pos, ch }),
        }
    }

    Ok(out)
}

/// End of a `\d+(\.\d+)?` run starting at `from`.
fn number_end(src: &str, from: usize) -> usize {
    let bytes = src.as_bytes();
    let mut end = from;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn operators_prefer_longest_match() {
        assert_eq!(
            kinds("!== === <= >= ! < >"),
            vec![
                Token::StrictNe,
                Token::StrictEq,
                Token::Le,
                Token::Ge,
                Token::Bang,
                Token::Lt,
                Token::Gt
            ]
        );
    }

    #[test]
    fn references_and_literals() {
        assert_eq!(
            kinds(r#"state.items[0] === 'a\'b' && -1.5"#),
            vec![
                Token::Ident("state".into()),
                Token::Dot,
                Token::Ident("items".into()),
                Token::LBracket,
                Token::Num(0.0),
                Token::RBracket,
                Token::StrictEq,
                Token::Str("a'b".into()),
                Token::AndAnd,
                Token::Num(-1.5),
            ]
        );
    }

    #[test]
    fn positions_are_byte_offsets() {
        let toks = tokenize("  state").unwrap();
        assert_eq!(toks[0].pos, 2);
    }

    #[test]
    fn rejects_stray_characters() {
        assert_eq!(tokenize("a = b"), Err(ExprError::UnexpectedChar { pos: 2, ch: '=' }));
        assert_eq!(tokenize("a + b"), Err(ExprError::UnexpectedChar { pos: 2, ch: '+' }));
        assert_eq!(tokenize("\"open"), Err(ExprError::UnterminatedString { pos: 0 }));
    }
}
