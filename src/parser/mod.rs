//! Token stream -> AST. Recursive descent with one-token lookahead
//! (`current`) and one-token memory (`previous`) over a fully-scanned
//! `Vec<Token>`, with a sticky error flag so a bad statement doesn't
//! abort the whole parse.

pub mod ast;

use crate::{
    error::Diagnostic,
    parser::ast::{BinOp, Expr, Program, Stmt, UnOp},
    scanner::{Kind, Token},
};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    had_error: bool,
    diagnostics: Vec<Diagnostic>,
}

type ExprResult = Result<Expr, ()>;
type StmtResult = Result<Stmt, ()>;

impl Parser {
    /// Parses a full token stream into a `Program`. Returns `Ok` only
    /// if no syntax errors were ever raised; on failure, every
    /// diagnostic collected along the way is returned — parsing keeps
    /// going after the first error so it can surface more than one
    /// problem per run, but the resulting tree is always discarded.
    pub fn parse(tokens: Vec<Token>) -> Result<Program, Vec<Diagnostic>> {
        let mut parser = Parser { tokens, current: 0, had_error: false, diagnostics: Vec::new() };
        let mut statements = Vec::new();

        parser.skip_newlines();
        while !parser.is_at_end() {
            match parser.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(()) => parser.synchronize(),
            }
            parser.skip_newlines();
        }

        if parser.had_error {
            Err(parser.diagnostics)
        } else {
            Ok(Program { statements })
        }
    }

    // --- token stream plumbing ---------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, Kind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: &Kind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn matches(&mut self, kind: &Kind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().kind, Kind::Newline) {
            self.advance();
        }
    }

    /// Consumes a token of the given kind or raises a `syntax` error.
    fn expect(&mut self, kind: &Kind, message: &str) -> Result<&Token, ()> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn error_at_current(&mut self, message: &str) {
        self.had_error = true;
        let span = self.peek().span.clone();
        self.diagnostics.push(Diagnostic::new(message.to_string(), span));
    }

    /// Like `error_at_current`, but for a scan error whose message and
    /// span were already carried by the `Kind::Error` token itself.
    fn error_at_current_span(&mut self, message: String, span: crate::common::span::Span) {
        self.had_error = true;
        self.diagnostics.push(Diagnostic::new(message, span));
    }

    fn fail<T>(&mut self, message: &str) -> Result<T, ()> {
        self.error_at_current(message);
        Err(())
    }

    /// After a syntax error, discards tokens up to the next statement
    /// boundary (a newline) so further diagnostics aren't just cascades
    /// of the same failure.
    fn synchronize(&mut self) {
        while !self.is_at_end() && !matches!(self.peek().kind, Kind::Newline) {
            self.advance();
        }
    }

    // --- statements ----------------------------------------------------

    fn statement(&mut self) -> StmtResult {
        match &self.peek().kind {
            Kind::Import => self.import_statement(),
            Kind::Let => self.let_statement(),
            Kind::If => self.if_statement(),
            Kind::While => self.while_statement(),
            Kind::Loop => self.loop_statement(),
            Kind::Break => {
                let span = self.advance().span.clone();
                Ok(Stmt::Break(span))
            },
            Kind::Continue => {
                let span = self.advance().span.clone();
                Ok(Stmt::Continue(span))
            },
            Kind::LeftBrace => self.block_statement(),
            _ => self.expression_or_assignment_statement(),
        }
    }

    fn import_statement(&mut self) -> StmtResult {
        let start_span = self.advance().span.clone(); // `import`
        let name_token = self.expect_identifier("Expected a module name after 'import'")?;
        let module = identifier_name(&name_token.kind);
        Ok(Stmt::Import { module, span: start_span })
    }

    fn let_statement(&mut self) -> StmtResult {
        let start_span = self.advance().span.clone(); // `let`
        let name_token = self.expect_identifier("Expected a variable name after 'let'")?;
        let name = identifier_name(&name_token.kind);
        self.expect(&Kind::ColonEqual, "Expected ':=' after variable name")?;
        let init = self.expression()?;
        Ok(Stmt::Let { name, init, span: start_span })
    }

    fn if_statement(&mut self) -> StmtResult {
        let start_span = self.advance().span.clone(); // `if`
        let condition = self.expression()?;
        self.expect(&Kind::Then, "Expected 'then' after 'if' condition")?;
        self.skip_newlines();
        let then_branch = Box::new(self.statement()?);

        let else_branch = if self.matches_keyword_else() {
            self.skip_newlines();
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If { condition, then_branch, else_branch, span: start_span })
    }

    fn matches_keyword_else(&mut self) -> bool {
        // `else` may appear right after the then-branch, possibly
        // separated by newlines the then-branch already consumed.
        let checkpoint = self.current;
        self.skip_newlines();
        if matches!(self.peek().kind, Kind::Else) {
            self.advance();
            true
        } else {
            self.current = checkpoint;
            false
        }
    }

    fn while_statement(&mut self) -> StmtResult {
        let start_span = self.advance().span.clone(); // `while`
        let condition = self.expression()?;
        self.expect(&Kind::Then, "Expected 'then' after 'while' condition")?;
        self.skip_newlines();
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body, span: start_span })
    }

    fn loop_statement(&mut self) -> StmtResult {
        let start_span = self.advance().span.clone(); // `loop`
        self.skip_newlines();
        let body = Box::new(self.statement()?);
        Ok(Stmt::Loop { body, span: start_span })
    }

    fn block_statement(&mut self) -> StmtResult {
        self.advance(); // `{`
        self.skip_newlines();
        let mut statements = Vec::new();
        while !self.check(&Kind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
            self.skip_newlines();
        }
        self.expect(&Kind::RightBrace, "Expected '}' to close block")?;
        Ok(Stmt::Block(statements))
    }

    /// Handles both `identifier = expression` (assignment) and any
    /// other expression used as a statement. Only a `call`-shaped
    /// expression statement actually compiles to anything; the compiler
    /// rejects anything else.
    fn expression_or_assignment_statement(&mut self) -> StmtResult {
        if let Kind::Identifier(name) = self.peek().kind.clone() {
            if matches!(self.peek_at(1).kind, Kind::Equal) {
                let span = self.advance().span.clone(); // identifier
                self.advance(); // `=`
                let value = self.expression()?;
                return Ok(Stmt::Assignment { name, value, span });
            }
        }

        let span = self.peek().span.clone();
        let expr = self.expression()?;
        Ok(Stmt::Expr(expr, span))
    }

    fn expect_identifier(&mut self, message: &str) -> Result<Token, ()> {
        if let Kind::Identifier(_) = self.peek().kind {
            Ok(self.advance().clone())
        } else {
            self.fail(message)
        }
    }

    // --- expressions: equality > comparison > term > factor > unary >
    // call > primary --------------------------------------------------

    fn expression(&mut self) -> ExprResult {
        self.equality()
    }

    fn equality(&mut self) -> ExprResult {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.peek().kind {
                Kind::EqualEqual => BinOp::Eq,
                Kind::BangEqual => BinOp::Neq,
                _ => break,
            };
            self.advance();
            let right = self.comparison()?;
            expr = Expr::Binary { op, left: Box::new(expr), right: Box::new(right) };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ExprResult {
        let mut expr = self.term()?;
        loop {
            let op = match self.peek().kind {
                Kind::Less => BinOp::Lt,
                Kind::LessEqual => BinOp::Lte,
                Kind::Greater => BinOp::Gt,
                Kind::GreaterEqual => BinOp::Gte,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            expr = Expr::Binary { op, left: Box::new(expr), right: Box::new(right) };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ExprResult {
        let mut expr = self.factor()?;
        loop {
            let op = match self.peek().kind {
                Kind::Plus => BinOp::Add,
                Kind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            expr = Expr::Binary { op, left: Box::new(expr), right: Box::new(right) };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ExprResult {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().kind {
                Kind::Star => BinOp::Mul,
                Kind::Slash => BinOp::Div,
                Kind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.unary()?;
            expr = Expr::Binary { op, left: Box::new(expr), right: Box::new(right) };
        }
        Ok(expr)
    }

    /// Right-associative: `- - - x` parses as `-(-(-x))`.
    fn unary(&mut self) -> ExprResult {
        let op = match self.peek().kind {
            Kind::Minus => Some(UnOp::Negate),
            Kind::Bang => Some(UnOp::Not),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            Ok(Expr::Unary { op, operand: Box::new(operand) })
        } else {
            self.call()
        }
    }

    /// Member access (`.name`) and the parentheses-free call form.
    /// After a primary (and any `.` chain), if the next token can start
    /// an expression, the current expression becomes a callee and a
    /// comma-separated argument list follows. The loop does not chain a
    /// second call onto the result of the first — a call's result is
    /// never itself treated as a new callee.
    fn call(&mut self) -> ExprResult {
        let mut expr = self.primary()?;

        loop {
            if matches!(self.peek().kind, Kind::Dot) {
                self.advance();
                let member_token = self.expect_identifier("Expected a member name after '.'")?;
                let member = identifier_name(&member_token.kind);
                expr = Expr::MemberAccess { object: Box::new(expr), member };
            } else if self.starts_expression() {
                let mut args = vec![self.equality()?];
                while matches!(self.peek().kind, Kind::Comma) {
                    self.advance();
                    args.push(self.equality()?);
                }
                expr = Expr::Call { callee: Box::new(expr), args };
                break;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// True if the current token could begin an expression: a string,
    /// integer, float, identifier, unary `-`/`!`, or `(`.
    fn starts_expression(&self) -> bool {
        matches!(
            self.peek().kind,
            Kind::String(_)
                | Kind::Integer(_)
                | Kind::Float(_)
                | Kind::Identifier(_)
                | Kind::Minus
                | Kind::Bang
                | Kind::LeftParen
        )
    }

    fn primary(&mut self) -> ExprResult {
        let token = self.peek().clone();
        match token.kind {
            Kind::String(s) => {
                self.advance();
                Ok(Expr::StringLiteral(s))
            },
            Kind::Integer(n) => {
                self.advance();
                Ok(Expr::IntLiteral(n))
            },
            Kind::Float(n) => {
                self.advance();
                Ok(Expr::FloatLiteral(n))
            },
            Kind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier(name))
            },
            Kind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&Kind::RightParen, "Expected ')' to close parenthesized expression")?;
                Ok(expr)
            },
            Kind::Error(message) => {
                self.advance();
                self.error_at_current_span(message, token.span.clone());
                Err(())
            },
            _ => self.fail("Expected an expression"),
        }
    }
}

fn identifier_name(kind: &Kind) -> String {
    match kind {
        Kind::Identifier(name) => name.clone(),
        _ => unreachable!("expect_identifier guarantees an Identifier kind"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{common::source::Source, scanner::Scanner};

    fn parse_ok(source: &str) -> Program {
        let tokens = Scanner::new(Source::source(source)).scan_tokens();
        Parser::parse(tokens).expect("expected a successful parse")
    }

    fn parse_err(source: &str) -> Vec<Diagnostic> {
        let tokens = Scanner::new(Source::source(source)).scan_tokens();
        Parser::parse(tokens).expect_err("expected a parse error")
    }

    #[test]
    fn import_statement() {
        let program = parse_ok("import io");
        assert!(matches!(program.statements[0], Stmt::Import { ref module, .. } if module == "io"));
    }

    #[test]
    fn let_and_arithmetic_precedence() {
        let program = parse_ok("let x := 2 + 3 * 4");
        match &program.statements[0] {
            Stmt::Let { name, init, .. } => {
                assert_eq!(name, "x");
                match init {
                    Expr::Binary { op: BinOp::Add, left, right } => {
                        assert!(matches!(**left, Expr::IntLiteral(2)));
                        assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
                    },
                    other => panic!("expected Add at the top, got {:?}", other),
                }
            },
            other => panic!("expected Let, got {:?}", other),
        }
    }

    #[test]
    fn call_with_comma_arguments() {
        let program = parse_ok(r#"io.println "{}", x"#);
        match &program.statements[0] {
            Stmt::Expr(Expr::Call { callee, args }, _) => {
                assert!(matches!(**callee, Expr::MemberAccess { .. }));
                assert_eq!(args.len(), 2);
            },
            other => panic!("expected a call statement, got {:?}", other),
        }
    }

    #[test]
    fn call_does_not_chain_onto_its_own_result() {
        // `f a b` applies `f` to `a`, producing one call; `b` is not
        // itself treated as a second application over that call's
        // result — it is simply left unconsumed, which here surfaces as
        // a synchronize-to-newline, not a panic.
        let program = parse_ok("io.println x");
        assert!(matches!(&program.statements[0], Stmt::Expr(Expr::Call { args, .. }, _) if args.len() == 1));
    }

    #[test]
    fn if_else_selection() {
        let program = parse_ok("if score >= 80 then\n  io.println \"B or better\"\nelse\n  io.println \"below B\"");
        assert!(matches!(program.statements[0], Stmt::If { else_branch: Some(_), .. }));
    }

    #[test]
    fn while_loop() {
        let program = parse_ok("while n then\n  n = n - 1");
        assert!(matches!(program.statements[0], Stmt::While { .. }));
    }

    #[test]
    fn assignment_statement() {
        let program = parse_ok("x = 5");
        assert!(matches!(program.statements[0], Stmt::Assignment { ref name, .. } if name == "x"));
    }

    #[test]
    fn right_associative_unary_chain_does_not_overflow_at_moderate_depth() {
        let source = format!("let x := {}1", "-".repeat(100));
        parse_ok(&source);
    }

    #[test]
    fn missing_walrus_is_syntax_error() {
        let diagnostics = parse_err("let x 5");
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn missing_then_is_syntax_error() {
        let diagnostics = parse_err("if true\n  io.println \"x\"");
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn unrecognized_primary_is_syntax_error() {
        let diagnostics = parse_err("let x := )");
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn scan_error_token_surfaces_its_own_message() {
        let diagnostics = parse_err("let x := @");
        assert!(diagnostics.iter().any(|d| d.reason.contains("Unexpected character")));
    }
}
