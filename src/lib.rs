//! stk — a tiny stack language.
//!
//! Source text is lexed into a [`Program`](program::Program), optionally
//! persisted with [`container`], and run by the [`vm`] against an operand
//! stack.

pub mod container;
pub mod lexer;
pub mod program;
pub mod repl;
pub mod vm;

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::program::{Program, Stack};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] lexer::LexError),
    #[error(transparent)]
    Container(#[from] container::ContainerError),
    #[error(transparent)]
    Vm(#[from] vm::VmError),
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Terminal(#[from] std::io::Error),
    #[error("cannot install interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),
}

/// Lex `source` and write the compiled form to `output`.
pub fn compile_file(source: &Path, output: &Path) -> Result<Program, Error> {
    let program = lexer::lex_file(source)?;
    container::save(&program, output)?;
    Ok(program)
}

/// Load a compiled file and run it on a fresh stack.
pub fn execute_file(path: &Path, out: &mut dyn Write, options: vm::Options) -> Result<Stack, Error> {
    let program = container::load(path)?;
    let mut stack = Stack::new();
    vm::run(&program, &mut stack, out, options)?;
    Ok(stack)
}
