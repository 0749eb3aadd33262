use std::io::Write;

use tracing::{debug, trace};

use crate::program::{Instruction, Program, Stack, Value};

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("stack underflow: '{op}' needs {needed} value(s), found {found}")]
    StackUnderflow { op: &'static str, needed: usize, found: usize },
    #[error("if requires an end")]
    IfWithoutEnd,
    #[error("while requires an end")]
    WhileWithoutEnd,
    #[error("else requires an if")]
    ElseWithoutIf,
    #[error("end must close an if or while")]
    StrayEnd,
    #[error("block runs past the end of the program")]
    UnterminatedBlock,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type VmResult<T> = Result<T, VmError>;

/// How a `while` loop decides whether to run its body again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// The condition is popped once at `while` and never re-read, so a true
    /// loop only stops on an error or the step limit.
    #[default]
    Latched,
    /// Each time the body reaches `end`, pop the condition the body left on
    /// the stack.
    Refresh,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub loop_mode: LoopMode,
    /// Cap on dispatched steps for one run. `None` runs unbounded.
    pub max_steps: Option<u64>,
}

/// Executes one program against a borrowed stack. Block instructions are
/// resolved by scanning forward from the instruction pointer.
pub struct Machine<'a> {
    program: &'a Program,
    stack: &'a mut Stack,
    out: &'a mut dyn Write,
    options: Options,
    ip: usize,
    steps: u64,
}

impl<'a> Machine<'a> {
    pub fn new(program: &'a Program, stack: &'a mut Stack, out: &'a mut dyn Write) -> Self {
        Machine { program, stack, out, options: Options::default(), ip: 0, steps: 0 }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Run until the instruction pointer reaches the end of the program.
    pub fn execute(&mut self) -> VmResult<()> {
        debug!(instructions = self.program.len(), depth = self.stack.len(), "execute");
        while self.ip < self.program.len() {
            self.step()?;
        }
        debug!(steps = self.steps, depth = self.stack.len(), "finished");
        Ok(())
    }

    fn current(&self) -> VmResult<Instruction> {
        self.program.get(self.ip).ok_or(VmError::UnterminatedBlock)
    }

    fn has_end_from_ip(&self) -> bool {
        self.program.instructions()[self.ip..]
            .iter()
            .any(|inst| matches!(inst, Instruction::End))
    }

    fn skip_to_end(&mut self) -> VmResult<()> {
        while self.current()? != Instruction::End {
            self.ip += 1;
        }
        Ok(())
    }

    fn tick(&mut self) -> VmResult<()> {
        self.steps += 1;
        match self.options.max_steps {
            Some(limit) if self.steps > limit => Err(VmError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    /// Check depth before popping so a failed operator leaves the stack as is.
    fn require(&self, op: &'static str, needed: usize) -> VmResult<()> {
        let found = self.stack.len();
        if found < needed {
            return Err(VmError::StackUnderflow { op, needed, found });
        }
        Ok(())
    }

    fn pop(&mut self, op: &'static str) -> VmResult<Value> {
        self.require(op, 1)?;
        self.stack.pop().ok_or(VmError::StackUnderflow { op, needed: 1, found: 0 })
    }

    fn pop_pair(&mut self, op: &'static str) -> VmResult<(Value, Value)> {
        self.require(op, 2)?;
        let b = self.pop(op)?;
        let a = self.pop(op)?;
        Ok((a, b))
    }

    /// Dispatch the current instruction, then advance past it. Blocks leave
    /// the pointer on their closing `end`, so they land one past it.
    fn step(&mut self) -> VmResult<()> {
        self.tick()?;
        let inst = self.current()?;
        trace!(ip = self.ip, %inst, depth = self.stack.len(), "dispatch");

        match inst {
            Instruction::Push(n) => self.stack.push(Value::Number(n)),
            Instruction::Add => {
                let (a, b) = self.pop_pair("+")?;
                let sum = a.checked_add(b).ok_or(VmError::IntegerOverflow)?;
                self.stack.push(sum);
            }
            Instruction::Equals => {
                let (a, b) = self.pop_pair("=")?;
                self.stack.push(Value::Bool(a == b));
            }
            Instruction::If => self.exec_if()?,
            Instruction::Else => return Err(VmError::ElseWithoutIf),
            Instruction::While => self.exec_while()?,
            Instruction::End => return Err(VmError::StrayEnd),
            Instruction::Dump => {
                let v = self.pop(".")?;
                writeln!(self.out, "{}", v)?;
            }
        }

        self.ip += 1;
        Ok(())
    }

    fn exec_if(&mut self) -> VmResult<()> {
        if !self.has_end_from_ip() {
            return Err(VmError::IfWithoutEnd);
        }
        let cond = self.pop("if")?.is_truthy();

        if cond {
            self.ip += 1;
            loop {
                match self.current()? {
                    Instruction::End => break,
                    Instruction::Else => self.skip_to_end()?,
                    _ => self.step()?,
                }
            }
        } else {
            // Stops at the first else or end, nested or not
            while self.current()? != Instruction::End {
                self.ip += 1;
                if self.current()? == Instruction::Else {
                    self.ip += 1;
                    while self.current()? != Instruction::End {
                        self.step()?;
                    }
                }
            }
        }
        Ok(())
    }

    fn exec_while(&mut self) -> VmResult<()> {
        if !self.has_end_from_ip() {
            return Err(VmError::WhileWithoutEnd);
        }
        let mut cond = self.pop("while")?.is_truthy();
        self.ip += 1;
        let body_start = self.ip;

        while cond {
            if self.current()? == Instruction::End {
                if self.options.loop_mode == LoopMode::Refresh {
                    cond = self.pop("while")?.is_truthy();
                    if !cond {
                        break;
                    }
                }
                self.tick()?;
                self.ip = body_start;
            }
            self.step()?;
        }

        self.skip_to_end()
    }
}

/// Run `program` against `stack`, writing `.` output to `out`.
pub fn run(program: &Program, stack: &mut Stack, out: &mut dyn Write, options: Options) -> VmResult<()> {
    Machine::new(program, stack, out).with_options(options).execute()
}
