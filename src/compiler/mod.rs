//! AST -> `Chunk`. A single-pass tree walk with no lowering step in
//! between: each AST node emits its opcodes directly as it's visited,
//! into one flat chunk — there are no user-defined functions to compile
//! separately, so there's nothing to lower or schedule.

use crate::{
    common::{chunk::Chunk, opcode::Opcode, span::Span, value::Value},
    error::Diagnostic,
    parser::ast::{BinOp, Expr, Program, Stmt, UnOp},
};

/// A single flat local: its source name and the slot it occupies. The
/// locals array has no scope-depth field — the whole program shares one
/// scope, so slot index and array index coincide and no block-exit
/// bookkeeping is needed.
struct Local {
    name: String,
}

const MAX_LOCALS: usize = 256;

pub struct Compiler {
    chunk: Chunk,
    locals: Vec<Local>,
    had_error: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Compiler {
    /// Compiles a whole program into a `Chunk`, or collects every
    /// diagnostic raised along the way. Compilation does not stop at
    /// the first error — like the parser, it keeps walking to surface
    /// as many problems as it can.
    pub fn compile(program: &Program, error_span: Span) -> Result<Chunk, Vec<Diagnostic>> {
        let mut compiler =
            Compiler { chunk: Chunk::new(), locals: Vec::new(), had_error: false, diagnostics: Vec::new() };

        for stmt in &program.statements {
            compiler.statement(stmt);
        }
        compiler.chunk.write_opcode(Opcode::Halt);

        if compiler.had_error {
            if compiler.diagnostics.is_empty() {
                // Defensive: every `had_error = true` assignment below
                // is paired with a pushed diagnostic, but a bare span is
                // kept around in case that invariant is ever violated.
                compiler.diagnostics.push(Diagnostic::new("compilation failed", error_span));
            }
            Err(compiler.diagnostics)
        } else {
            Ok(compiler.chunk)
        }
    }

    fn fail(&mut self, reason: impl Into<String>, span: Span) {
        self.had_error = true;
        self.diagnostics.push(Diagnostic::new(reason, span));
    }

    // --- constants and locals -------------------------------------------

    fn make_constant(&mut self, value: Value, span: Span) -> u8 {
        match self.chunk.add_constant(value) {
            Ok(index) => index,
            Err(message) => {
                self.fail(message, span);
                0
            },
        }
    }

    /// Appends a new local and returns its slot, or fails with "Too many
    /// local variables" if the flat locals array would overflow its
    /// 256-slot capacity (mirrors the constant pool's overflow check,
    /// since both are indexed by a single byte operand).
    fn add_local(&mut self, name: String, span: Span) -> u8 {
        if self.locals.len() >= MAX_LOCALS {
            self.fail("Too many local variables", span);
            return 0;
        }
        self.locals.push(Local { name });
        (self.locals.len() - 1) as u8
    }

    /// Scans from most recently declared to oldest, so a redeclaration
    /// of the same name shadows the earlier slot.
    fn resolve_local(&self, name: &str) -> Option<u8> {
        self.locals.iter().rposition(|local| local.name == name).map(|slot| slot as u8)
    }

    // --- statements ------------------------------------------------------

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Import { module, span } => self.import_statement(module, span.clone()),
            Stmt::Let { name, init, span } => self.let_statement(name, init, span.clone()),
            Stmt::Assignment { name, value, span } => self.assignment_statement(name, value, span.clone()),
            Stmt::If { condition, then_branch, else_branch, span } => {
                self.if_statement(condition, then_branch, else_branch.as_deref(), span.clone())
            },
            Stmt::While { condition, body, span } => self.while_statement(condition, body, span.clone()),
            Stmt::Loop { body, span } => self.loop_statement(body, span.clone()),
            Stmt::Break(span) => self.fail("break/continue not yet implemented", span.clone()),
            Stmt::Continue(span) => self.fail("break/continue not yet implemented", span.clone()),
            Stmt::Block(statements) => {
                for stmt in statements {
                    self.statement(stmt);
                }
            },
            Stmt::Expr(expr, span) => self.expression_statement(expr, span.clone()),
        }
    }

    fn import_statement(&mut self, module: &str, span: Span) {
        let index = self.make_constant(Value::string(module), span);
        self.chunk.write_opcode(Opcode::Import);
        self.chunk.write_byte(index);
    }

    fn let_statement(&mut self, name: &str, init: &Expr, span: Span) {
        self.expression(init, span.clone());
        let slot = self.add_local(name.to_string(), span);
        self.chunk.write_opcode(Opcode::SetLocal);
        self.chunk.write_byte(slot);
    }

    fn assignment_statement(&mut self, name: &str, value: &Expr, span: Span) {
        self.expression(value, span.clone());
        match self.resolve_local(name) {
            Some(slot) => {
                self.chunk.write_opcode(Opcode::SetLocal);
                self.chunk.write_byte(slot);
            },
            None => self.fail(format!("Undefined variable '{}'", name), span),
        }
    }

    /// Only a `call` expression is a meaningful statement — call sites
    /// are restricted to native invocation, so a bare literal or
    /// identifier used as a statement has no defined effect to emit.
    fn expression_statement(&mut self, expr: &Expr, span: Span) {
        match expr {
            Expr::Call { .. } => self.expression(expr, span),
            _ => self.fail("Only calls may be used as statements", span),
        }
    }

    fn if_statement(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>, span: Span) {
        self.expression(condition, span.clone());
        let then_patch = self.chunk.write_opcode(Opcode::JumpIfFalse);
        self.chunk.write_placeholder();
        self.chunk.write_opcode(Opcode::Pop);
        self.statement(then_branch);

        let end_patch = self.chunk.write_opcode(Opcode::Jump);
        self.chunk.write_placeholder();

        self.patch_jump(then_patch + 1, span.clone());
        self.chunk.write_opcode(Opcode::Pop);

        if let Some(else_branch) = else_branch {
            self.statement(else_branch);
        }

        self.patch_jump(end_patch + 1, span);
    }

    fn while_statement(&mut self, condition: &Expr, body: &Stmt, span: Span) {
        let loop_start = self.chunk.len();
        self.expression(condition, span.clone());
        let exit_patch = self.chunk.write_opcode(Opcode::JumpIfFalse);
        self.chunk.write_placeholder();
        self.chunk.write_opcode(Opcode::Pop);
        self.statement(body);
        self.emit_loop(loop_start, span.clone());

        self.patch_jump(exit_patch + 1, span);
        self.chunk.write_opcode(Opcode::Pop);
    }

    fn loop_statement(&mut self, body: &Stmt, span: Span) {
        let loop_start = self.chunk.len();
        self.statement(body);
        self.emit_loop(loop_start, span);
    }

    /// `patch_jump(site)`: `current_addr − site − 2`. The `-2` accounts
    /// for the two operand bytes at `site` not yet consumed when the
    /// jump executes.
    fn patch_jump(&mut self, site: usize, span: Span) {
        let offset = self.chunk.len() as isize - site as isize - 2;
        match u16::try_from(offset) {
            Ok(offset) => self.chunk.patch_short(site, offset),
            Err(_) => self.fail("Too much code to jump over", span),
        }
    }

    /// Emits `OP_LOOP` and patches its backward offset once the whole
    /// instruction (opcode + 2-byte operand) has been written, so the
    /// offset already accounts for those three bytes.
    fn emit_loop(&mut self, target: usize, span: Span) {
        let site = self.chunk.write_opcode(Opcode::Loop);
        self.chunk.write_placeholder();
        let offset = self.chunk.len() as isize - target as isize;
        match u16::try_from(offset) {
            Ok(offset) => self.chunk.patch_short(site + 1, offset),
            Err(_) => self.fail("Loop body too large", span),
        }
    }

    // --- expressions -----------------------------------------------------

    fn expression(&mut self, expr: &Expr, span: Span) {
        match expr {
            Expr::Identifier(name) => match self.resolve_local(name) {
                Some(slot) => {
                    self.chunk.write_opcode(Opcode::GetLocal);
                    self.chunk.write_byte(slot);
                },
                None => self.fail(format!("Undefined variable '{}'", name), span),
            },
            Expr::StringLiteral(s) => {
                let index = self.make_constant(Value::string(s.as_str()), span);
                self.chunk.write_opcode(Opcode::Constant);
                self.chunk.write_byte(index);
            },
            Expr::IntLiteral(n) => {
                let index = self.make_constant(Value::Int(*n), span);
                self.chunk.write_opcode(Opcode::Constant);
                self.chunk.write_byte(index);
            },
            Expr::FloatLiteral(n) => {
                let index = self.make_constant(Value::Float(*n), span);
                self.chunk.write_opcode(Opcode::Constant);
                self.chunk.write_byte(index);
            },
            Expr::Unary { op, operand } => {
                self.expression(operand, span.clone());
                self.chunk.write_opcode(match op {
                    UnOp::Negate => Opcode::Negate,
                    UnOp::Not => Opcode::Not,
                });
            },
            Expr::Binary { op, left, right } => {
                self.expression(left, span.clone());
                self.expression(right, span);
                self.chunk.write_opcode(match op {
                    BinOp::Add => Opcode::Add,
                    BinOp::Sub => Opcode::Sub,
                    BinOp::Mul => Opcode::Mul,
                    BinOp::Div => Opcode::Div,
                    BinOp::Mod => Opcode::Mod,
                    BinOp::Eq => Opcode::Equal,
                    BinOp::Neq => Opcode::NotEqual,
                    BinOp::Lt => Opcode::Less,
                    BinOp::Lte => Opcode::LessEqual,
                    BinOp::Gt => Opcode::Greater,
                    BinOp::Gte => Opcode::GreaterEqual,
                });
            },
            Expr::Call { callee, args } => self.call_expression(callee, args, span),
            Expr::MemberAccess { .. } => self.fail("member access must be used in a call", span),
        }
    }

    /// Only one callee shape compiles: a `member_access` over a bare
    /// `identifier`, e.g. `io.println`. Everything else — including a
    /// call whose callee is itself a call, or a member-access chain more
    /// than one level deep — is a compile error, since there's no
    /// first-class callable value to resolve dynamically.
    fn call_expression(&mut self, callee: &Expr, args: &[Expr], span: Span) {
        let qualified_name = match callee {
            Expr::MemberAccess { object, member } => match object.as_ref() {
                Expr::Identifier(object_name) => Some(format!("{}.{}", object_name, member)),
                _ => None,
            },
            _ => None,
        };

        let qualified_name = match qualified_name {
            Some(name) => name,
            None => {
                self.fail("Unknown function call", span);
                return;
            },
        };

        let name_index = self.make_constant(Value::string(qualified_name), span.clone());
        self.chunk.write_opcode(Opcode::GetGlobal);
        self.chunk.write_byte(name_index);

        for arg in args {
            self.expression(arg, span.clone());
        }

        if args.len() > u8::MAX as usize {
            self.fail("Too many arguments in call", span);
            return;
        }

        self.chunk.write_opcode(Opcode::CallNative);
        self.chunk.write_byte(args.len() as u8);
        self.chunk.write_opcode(Opcode::Pop);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{common::source::Source, parser::Parser, scanner::Scanner};

    fn eof_span(source: &std::rc::Rc<crate::common::source::Source>) -> Span {
        Span::eof(source, 1, 1)
    }

    fn compile(source: &str) -> Chunk {
        let src = Source::source(source);
        let tokens = Scanner::new(src.clone()).scan_tokens();
        let program = Parser::parse(tokens).expect("expected a clean parse");
        Compiler::compile(&program, eof_span(&src)).expect("expected a clean compile")
    }

    fn compile_err(source: &str) -> Vec<Diagnostic> {
        let src = Source::source(source);
        let tokens = Scanner::new(src.clone()).scan_tokens();
        let program = Parser::parse(tokens).expect("expected a clean parse");
        Compiler::compile(&program, eof_span(&src)).expect_err("expected a compile error")
    }

    #[test]
    fn every_chunk_ends_in_halt() {
        let chunk = compile("let x := 1");
        assert_eq!(*chunk.code.last().unwrap(), Opcode::Halt as u8);
    }

    #[test]
    fn let_then_get_local_round_trips_through_identifier() {
        let chunk = compile("let x := 1\nlet y := x");
        assert_eq!(chunk.code[0], Opcode::Constant as u8);
        assert_eq!(chunk.code[2], Opcode::SetLocal as u8);
        assert_eq!(chunk.code[3], 0); // x is slot 0
        assert_eq!(chunk.code[4], Opcode::GetLocal as u8);
        assert_eq!(chunk.code[5], 0);
    }

    #[test]
    fn redeclaration_shadows_with_a_new_slot() {
        let chunk = compile("let x := 1\nlet x := 2");
        // first SetLocal targets slot 0, second targets slot 1
        assert_eq!(chunk.code[3], 0);
        assert_eq!(chunk.code[7], 1);
    }

    #[test]
    fn undefined_variable_is_a_compile_error() {
        let diagnostics = compile_err("let x := y");
        assert!(diagnostics.iter().any(|d| d.reason.contains("Undefined variable")));
    }

    #[test]
    fn call_emits_qualified_name_and_argc() {
        let chunk = compile(r#"import io
io.println "{}", 1"#);
        // Import, GetGlobal, Constant("{}"), Constant(1), CallNative(2), Pop, Halt
        assert!(chunk.code.contains(&(Opcode::GetGlobal as u8)));
        assert!(chunk.code.contains(&(Opcode::CallNative as u8)));
    }

    #[test]
    fn bare_member_access_outside_a_call_is_a_compile_error() {
        // `io.println` alone (no arguments trailing on the same
        // expression) still parses as a Call node with zero args via the
        // application loop only when a new argument token follows; with
        // nothing following it is a lone member_access statement.
        let diagnostics = compile_err("import io\nio.println");
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn lone_expression_statement_that_is_not_a_call_is_rejected() {
        let diagnostics = compile_err("let x := 1\nx");
        assert!(diagnostics.iter().any(|d| d.reason.contains("Only calls")));
    }

    #[test]
    fn break_and_continue_are_not_yet_implemented() {
        let diagnostics = compile_err("loop\n  break");
        assert!(diagnostics.iter().any(|d| d.reason.contains("not yet implemented")));
    }

    #[test]
    fn if_else_patches_both_jumps_past_the_chunk_end() {
        let chunk = compile("let x := 1\nif x then\n  let y := 2\nelse\n  let z := 3");
        // Jump targets must never point past the final Halt.
        for (i, byte) in chunk.code.iter().enumerate() {
            if *byte == Opcode::JumpIfFalse as u8 || *byte == Opcode::Jump as u8 {
                let offset = chunk.read_short(i + 1) as usize;
                let target = i + 3 + offset;
                assert!(target <= chunk.code.len());
            }
        }
    }

    #[test]
    fn while_loop_emits_a_backward_loop_opcode() {
        let chunk = compile("let n := 3\nwhile n then\n  n = n - 1");
        assert!(chunk.code.contains(&(Opcode::Loop as u8)));
    }
}
