//! Chunk -> side effects. A read-execute loop over a fixed-capacity
//! value stack and local-slot array: fetch one opcode byte, decode,
//! execute, advance, until `OP_HALT` or a fatal error. There are no
//! user-defined functions or fibers to juggle, so the loop stays flat —
//! one instruction cursor, one stack, no call frames.

pub mod error;

use crate::{
    common::{chunk::Chunk, opcode::Opcode, table::StringTable, value::Value},
    modules::ModuleRegistry,
    vm::error::RuntimeError,
};

const STACK_CAPACITY: usize = 256;
const LOCALS_CAPACITY: usize = 256;

pub struct Vm {
    chunk: Chunk,
    ip: usize,
    stack: Vec<Value>,
    locals: Vec<Value>,
    locals_count: usize,
    globals: StringTable<Value>,
    loaded_modules: StringTable<()>,
    registry: ModuleRegistry,
}

impl Vm {
    /// Constructs a VM over a compiled chunk. Construction initializes
    /// the module system by registering the built-in module set (spec
    /// §3's "VM state" — "construction initializes the module system by
    /// registering built-ins"); no module is actually *loaded* until an
    /// `OP_IMPORT` names it.
    pub fn new(chunk: Chunk) -> Vm {
        Vm {
            chunk,
            ip: 0,
            stack: Vec::with_capacity(STACK_CAPACITY),
            locals: vec![Value::Nil; LOCALS_CAPACITY],
            locals_count: 0,
            globals: StringTable::new(),
            loaded_modules: StringTable::new(),
            registry: ModuleRegistry::with_builtins(),
        }
    }

    /// Runs the chunk to completion (`OP_HALT`) or the first fatal
    /// error. The VM does not recover from a `RuntimeError` — execution
    /// stops at the opcode that raised it.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let opcode = self.read_opcode()?;
            match opcode {
                Opcode::Constant => {
                    let value = self.read_constant()?;
                    self.push(value)?;
                },
                Opcode::Pop => {
                    self.pop()?;
                },
                Opcode::GetLocal => {
                    let slot = self.read_byte()? as usize;
                    let value = self.local(slot)?.clone();
                    self.push(value)?;
                },
                Opcode::SetLocal => {
                    let slot = self.read_byte()? as usize;
                    let value = self.pop()?;
                    self.set_local(slot, value)?;
                },
                Opcode::GetGlobal => {
                    let name = self.read_constant_string()?;
                    match self.globals.get(&name) {
                        Some(value) => {
                            let value = value.clone();
                            self.push(value)?;
                        },
                        None => return Err(RuntimeError::new(format!("Undefined global '{}'", name))),
                    }
                },
                Opcode::CallNative => {
                    let argc = self.read_byte()? as usize;
                    self.call_native(argc)?;
                },
                Opcode::Import => {
                    let name = self.read_constant_string()?;
                    self.import_module(&name)?;
                },
                Opcode::Add => self.binary_arith(|a, b| a.wrapping_add(b), |a, b| a + b)?,
                Opcode::Sub => self.binary_arith(|a, b| a.wrapping_sub(b), |a, b| a - b)?,
                Opcode::Mul => self.binary_arith(|a, b| a.wrapping_mul(b), |a, b| a * b)?,
                Opcode::Div => self.divide()?,
                Opcode::Mod => self.modulo()?,
                Opcode::Negate => self.negate()?,
                Opcode::Equal => self.compare_eq(false)?,
                Opcode::NotEqual => self.compare_eq(true)?,
                Opcode::Less => self.compare_ord(|a, b| a < b)?,
                Opcode::LessEqual => self.compare_ord(|a, b| a <= b)?,
                Opcode::Greater => self.compare_ord(|a, b| a > b)?,
                Opcode::GreaterEqual => self.compare_ord(|a, b| a >= b)?,
                Opcode::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(!value.truthy()))?;
                },
                Opcode::Jump => {
                    let offset = self.read_short()?;
                    self.ip += offset as usize;
                },
                Opcode::JumpIfFalse => {
                    let offset = self.read_short()?;
                    if !self.peek()?.truthy() {
                        self.ip += offset as usize;
                    }
                },
                Opcode::Loop => {
                    let offset = self.read_short()?;
                    self.ip -= offset as usize;
                },
                Opcode::Halt => return Ok(()),
            }
        }
    }

    // --- fetch/decode ----------------------------------------------------

    fn read_byte(&mut self) -> Result<u8, RuntimeError> {
        if self.ip >= self.chunk.len() {
            return Err(RuntimeError::new("Unexpected end of chunk"));
        }
        let byte = self.chunk.read_byte(self.ip);
        self.ip += 1;
        Ok(byte)
    }

    fn read_short(&mut self) -> Result<u16, RuntimeError> {
        if self.ip + 1 >= self.chunk.len() {
            return Err(RuntimeError::new("Unexpected end of chunk"));
        }
        let short = self.chunk.read_short(self.ip);
        self.ip += 2;
        Ok(short)
    }

    fn read_opcode(&mut self) -> Result<Opcode, RuntimeError> {
        let byte = self.read_byte()?;
        Opcode::from_byte_safe(byte).ok_or_else(|| RuntimeError::new(format!("Unknown opcode {}", byte)))
    }

    fn read_constant(&mut self) -> Result<Value, RuntimeError> {
        let index = self.read_byte()? as usize;
        self.chunk.constants.get(index).cloned().ok_or_else(|| RuntimeError::new("Invalid constant index"))
    }

    fn read_constant_string(&mut self) -> Result<String, RuntimeError> {
        match self.read_constant()? {
            Value::String(s) => Ok((*s).clone()),
            other => Err(RuntimeError::new(format!("Expected a string constant, got {}", other.type_name()))),
        }
    }

    // --- stack -------------------------------------------------------------

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_CAPACITY {
            return Err(RuntimeError::new("Stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| RuntimeError::new("Stack underflow"))
    }

    fn peek(&self) -> Result<&Value, RuntimeError> {
        self.stack.last().ok_or_else(|| RuntimeError::new("Stack underflow"))
    }

    fn peek_at(&self, depth: usize) -> Result<&Value, RuntimeError> {
        let index = self.stack.len().checked_sub(depth + 1).ok_or_else(|| RuntimeError::new("Stack underflow"))?;
        Ok(&self.stack[index])
    }

    // --- locals --------------------------------------------------------

    fn local(&self, slot: usize) -> Result<&Value, RuntimeError> {
        self.locals.get(slot).ok_or_else(|| RuntimeError::new("Invalid local slot"))
    }

    /// `locals[slot] = pop(); if slot >= count, count = slot + 1` (spec
    /// §4.4's `OP_SET_LOCAL` effect).
    fn set_local(&mut self, slot: usize, value: Value) -> Result<(), RuntimeError> {
        if slot >= self.locals.len() {
            return Err(RuntimeError::new("Invalid local slot"));
        }
        self.locals[slot] = value;
        if slot >= self.locals_count {
            self.locals_count = slot + 1;
        }
        Ok(())
    }

    // --- arithmetic & comparison -----------------------------------------

    /// `ADD`/`SUB`/`MUL`: integer result (wrapping) if both operands are
    /// integers, otherwise both are coerced to float.
    fn binary_arith(&mut self, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = match (&a, &b) {
            (Value::Int(a), Value::Int(b)) => Value::Int(int_op(*a, *b)),
            _ => match (a.as_float(), b.as_float()) {
                (Some(a), Some(b)) => Value::Float(float_op(a, b)),
                _ => return Err(RuntimeError::new(format!("Cannot apply operator to {} and {}", a.type_name(), b.type_name()))),
            },
        };
        self.push(result)
    }

    /// `DIV` is always floating, and fails on a zero divisor.
    fn divide(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let (a, b) = match (a.as_float(), b.as_float()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(RuntimeError::new(format!("Cannot divide {} and {}", a.type_name(), b.type_name()))),
        };
        if b == 0.0 {
            return Err(RuntimeError::new("Division by zero"));
        }
        self.push(Value::Float(a / b))
    }

    /// `MOD` requires both integer operands and a nonzero divisor.
    fn modulo(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (&a, &b) {
            (Value::Int(_), Value::Int(0)) => Err(RuntimeError::new("Division by zero")),
            (Value::Int(a), Value::Int(b)) => self.push(Value::Int(a.wrapping_rem(*b))),
            _ => Err(RuntimeError::new(format!("'%' requires integer operands, got {} and {}", a.type_name(), b.type_name()))),
        }
    }

    fn negate(&mut self) -> Result<(), RuntimeError> {
        let value = self.pop()?;
        match value {
            Value::Int(n) => self.push(Value::Int(n.wrapping_neg())),
            Value::Float(n) => self.push(Value::Float(-n)),
            other => Err(RuntimeError::new(format!("Cannot negate non-numeric value ({})", other.type_name()))),
        }
    }

    /// `OP_EQUAL`/`OP_NOT_EQ`: structural equality per `Value`'s
    /// `PartialEq`. `negate` flips the sense for `NOT_EQ`.
    fn compare_eq(&mut self, negate: bool) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let equal = a == b;
        self.push(Value::Bool(equal != negate))
    }

    /// `<`/`<=`/`>`/`>=`: both operands coerce to float before comparing —
    /// a non-numeric operand is a type-mismatch failure.
    fn compare_ord(&mut self, op: fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (a.as_float(), b.as_float()) {
            (Some(a), Some(b)) => self.push(Value::Bool(op(a, b))),
            _ => Err(RuntimeError::new(format!("Cannot compare {} and {}", a.type_name(), b.type_name()))),
        }
    }

    // --- calls & modules -------------------------------------------------

    /// The calling convention for natives: stack layout is
    /// `[…, callee, arg1, …, argn]`. Peeks the callee at depth `n`,
    /// invokes it with the argument slice, then collapses the whole
    /// frame (callee + args) down to the single return value.
    fn call_native(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let callee = self.peek_at(argc)?;
        let native = match callee {
            Value::Native(native) => native.clone(),
            other => return Err(RuntimeError::new(format!("Cannot call a non-function value ({})", other.type_name()))),
        };

        if self.stack.len() < argc + 1 {
            return Err(RuntimeError::new("Stack underflow"));
        }
        let frame_start = self.stack.len() - argc;
        let args: Vec<Value> = self.stack[frame_start..].to_vec();
        let result = native.call(&args)?;

        self.stack.truncate(frame_start - 1);
        self.push(result)
    }

    /// `OP_IMPORT`: idempotent module loading. A second import of an
    /// already-loaded module is a silent no-op, observable only via the
    /// loaded-modules table.
    fn import_module(&mut self, name: &str) -> Result<(), RuntimeError> {
        if self.loaded_modules.contains(name) {
            return Ok(());
        }

        match self.registry.initialize(name, &mut self.globals) {
            Some(()) => {
                self.loaded_modules.set(name, ());
                Ok(())
            },
            None => Err(RuntimeError::new(format!("Failed to load module '{}'", name))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{common::source::Source, compiler::Compiler, parser::Parser, scanner::Scanner};

    fn run(source: &str) -> Result<(), RuntimeError> {
        let src = Source::source(source);
        let tokens = Scanner::new(src.clone()).scan_tokens();
        let program = Parser::parse(tokens).expect("expected a clean parse");
        let chunk = Compiler::compile(&program, crate::common::span::Span::eof(&src, 1, 1)).expect("expected a clean compile");
        Vm::new(chunk).run()
    }

    #[test]
    fn arithmetic_precedence_leaves_no_diagnostic() {
        assert!(run("import io\nlet x := 2 + 3 * 4\nio.println \"{}\", x").is_ok());
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let err = run("let x := 5 / 0").unwrap_err();
        assert_eq!(err.message, "Division by zero");
    }

    #[test]
    fn comparisons_coerce_to_float() {
        assert!(run("import io\nlet a := 7\nlet b := 10\nio.println \"{} < {} = {}\", a, b, a < b").is_ok());
    }

    #[test]
    fn while_loop_runs_body_exactly_n_times() {
        // n starts at 3; decrements to 0 across exactly 3 iterations.
        assert!(run("let n := 3\nwhile n then\n  n = n - 1").is_ok());
    }

    #[test]
    fn module_import_is_idempotent() {
        assert!(run("import io\nimport io\nio.println \"ok\"").is_ok());
    }

    #[test]
    fn unknown_module_is_fatal() {
        let err = run("import nope").unwrap_err();
        assert!(err.message.contains("Failed to load module"));
    }

    #[test]
    fn negating_a_string_is_a_type_error() {
        let err = run("let x := -\"hi\"").unwrap_err();
        assert!(err.message.contains("Cannot negate"));
    }

    #[test]
    fn if_else_selects_the_false_branch() {
        // if/else with no side-effecting natives still must not crash or
        // underflow the stack on either branch.
        assert!(run("let score := 75\nif score >= 80 then\n  let a := 1\nelse\n  let b := 2").is_ok());
    }
}
