use std::path::Path;

use logos::Logos;
use tracing::debug;

use crate::program::{Instruction, Number, Program};

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[token("+")]
    Plus,
    #[token(".")]
    Dot,
    #[token("=")]
    Equals,

    // Block keywords
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("end")]
    End,

    // Anything else up to the next whitespace; must parse as a number.
    // Below the operator tokens so a lone `+` or `.` is never a word.
    #[regex(r"[^ \t\r\n\f]+", |lex| lex.slice().to_string(), priority = 1)]
    Word(String),
}

#[derive(Debug, thiserror::Error)]
#[error("unknown token '{token}' at position {position}")]
pub struct LexError {
    pub position: usize,
    pub token: String,
}

/// Lex source text into a program. Fails on the first token that is neither
/// a keyword nor a number; no partial program is returned.
pub fn lex(source: &str) -> Result<Program, LexError> {
    let mut lexer = Token::lexer(source);
    let mut instructions = Vec::new();

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let token = result.map_err(|()| LexError {
            position: span.start,
            token: source[span.clone()].to_string(),
        })?;
        let inst = match token {
            Token::Plus => Instruction::Add,
            Token::Dot => Instruction::Dump,
            Token::Equals => Instruction::Equals,
            Token::If => Instruction::If,
            Token::Else => Instruction::Else,
            Token::While => Instruction::While,
            Token::End => Instruction::End,
            Token::Word(word) => match parse_number(&word) {
                Some(n) => Instruction::Push(n),
                None => {
                    return Err(LexError { position: span.start, token: word });
                }
            },
        };
        instructions.push(inst);
    }

    debug!(instructions = instructions.len(), "lexed source");
    Ok(Program::new(instructions))
}

/// Integer first, then float.
fn parse_number(word: &str) -> Option<Number> {
    if let Ok(i) = word.parse::<i64>() {
        return Some(Number::Int(i));
    }
    word.parse::<f64>().ok().map(Number::Float)
}

/// Read a source file, drop empty lines and join the rest with single spaces
/// before lexing.
pub fn lex_file(path: &Path) -> Result<Program, crate::Error> {
    let text = std::fs::read_to_string(path).map_err(|source| crate::Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let code = join_lines(&text);
    Ok(lex(&code)?)
}

fn join_lines(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
