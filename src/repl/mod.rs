use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::lexer::lex;
use crate::program::Stack;
use crate::vm::{self, Options};

const PROMPT: &str = "> ";

/// Lex and run one line against a stack that outlives it. On error the
/// stack keeps whatever the failed line left behind.
pub fn eval_line(
    line: &str,
    stack: &mut Stack,
    out: &mut dyn Write,
    options: Options,
) -> Result<(), crate::Error> {
    let program = lex(line)?;
    vm::run(&program, stack, out, options)?;
    Ok(())
}

/// Ctrl-C ends the session with status 0, like end of input does.
pub fn exit_on_interrupt() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        debug!("interrupted");
        std::process::exit(0);
    })
}

/// Read-eval-print loop. Prints the stack after each good line and
/// `error: ...` to `err` after a bad one. Returns at end of input.
pub fn run<R: BufRead, W: Write, E: Write>(
    mut input: R,
    mut out: W,
    mut err: E,
    options: Options,
) -> io::Result<()> {
    let mut stack = Stack::new();
    let mut line = String::new();

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            debug!(depth = stack.len(), "end of input");
            return Ok(());
        }

        match eval_line(line.trim_end_matches(['\r', '\n']), &mut stack, &mut out, options) {
            Ok(()) => writeln!(out, "{}", stack)?,
            Err(e) => writeln!(err, "error: {}", e)?,
        }
    }
}
