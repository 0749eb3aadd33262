use std::fmt;

use serde::{Deserialize, Serialize};

/// A numeric literal. The integer/float distinction survives lexing,
/// serialization and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            // Debug keeps the trailing ".0" so floats never print like ints
            Number::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// One unit of a program. `Push` carries its operand inline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Push(Number),
    Add,
    Equals,
    If,
    Else,
    While,
    End,
    Dump,
}

impl Instruction {
    /// Mnemonic used in diagnostics and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Push(_) => "push",
            Instruction::Add => "+",
            Instruction::Equals => "=",
            Instruction::If => "if",
            Instruction::Else => "else",
            Instruction::While => "while",
            Instruction::End => "end",
            Instruction::Dump => ".",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(n) => write!(f, "{}", n),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// An ordered, immutable instruction sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Program { instructions }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, ip: usize) -> Option<Instruction> {
        self.instructions.get(ip).copied()
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Program::new(instructions)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, inst) in self.instructions.iter().enumerate() {
            if i > 0 { write!(f, " ")?; }
            write!(f, "{}", inst)?;
        }
        Ok(())
    }
}

/// A runtime stack entry.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    Number(Number),
    Bool(bool),
}

impl Value {
    pub fn int(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Value::Number(Number::Float(f))
    }

    /// Non-zero numbers (NaN included) and `true`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(Number::Int(i)) => *i != 0,
            Value::Number(Number::Float(f)) => *f != 0.0,
            Value::Bool(b) => *b,
        }
    }

    /// Numeric view used by arithmetic: booleans count as 0 and 1.
    fn as_number(self) -> Number {
        match self {
            Value::Number(n) => n,
            Value::Bool(b) => Number::Int(b as i64),
        }
    }

    /// Sum with int/float promotion. `None` on integer overflow.
    pub fn checked_add(self, other: Value) -> Option<Value> {
        let sum = match (self.as_number(), other.as_number()) {
            (Number::Int(a), Number::Int(b)) => Number::Int(a.checked_add(b)?),
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        };
        Some(Value::Number(sum))
    }
}

/// Exact int/float comparison; no rounding of the int through `f64`.
fn int_eq_float(i: i64, f: f64) -> bool {
    // i64 spans [-2^63, 2^63)
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    f.fract() == 0.0 && (-BOUND..BOUND).contains(&f) && f as i64 == i
}

/// Numeric equality across subtypes, so `1 = 1.0` and `true = 1` hold.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.as_number(), other.as_number()) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Int(i), Number::Float(f)) | (Number::Float(f), Number::Int(i)) => {
                int_eq_float(i, f)
            }
            (Number::Float(a), Number::Float(b)) => a == b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// The operand stack. Bottom of the stack is index 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    values: Vec<Value>,
}

impl Stack {
    pub fn new() -> Self {
        Stack::default()
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.values.pop()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl From<Vec<Value>> for Stack {
    fn from(values: Vec<Value>) -> Self {
        Stack { values }
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{}", v)?;
        }
        write!(f, "]")
    }
}
