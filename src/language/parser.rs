use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    span::Span,
    token::{Token, TokenKind},
};
use std::rc::Rc;

/// Deepest expression or function nesting the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 128;

pub fn parse(tokens: &[Token]) -> Result<Program, SyntaxErrors> {
    let mut parser = AstParser::new(tokens);
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(SyntaxErrors::new(parser.errors))
    }
}

struct AstParser<'a> {
    tokens: &'a [Token],
    position: usize,
    depth: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> AstParser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            errors: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Program {
        let statements = self.parse_statements(false);
        Program { statements }
    }

    fn parse_statements(&mut self, in_block: bool) -> Vec<Statement> {
        let mut statements = Vec::new();
        while !self.is_at_end() && !(in_block && self.check(&TokenKind::RBrace)) {
            let start = self.position;
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                    if self.position == start {
                        self.advance();
                    }
                }
            }
        }
        statements
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.peek_kind() {
            TokenKind::Function if self.peek_nth_is_identifier(1) => {
                let def = self.parse_function()?;
                Ok(Statement::Constructor(Rc::new(def)))
            }
            TokenKind::Let => self.parse_let(),
            TokenKind::Return => self.parse_return(),
            TokenKind::RBrace => Err(self.error_here("Unexpected `}` outside of a function body")),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().span;
        let name = self.expect_identifier("Expected a variable name after `let`", || {
            let_syntax_help().to_string()
        })?;
        self.consume(&TokenKind::Eq, "Expected `=` after variable name")
            .map_err(|err| err.with_help(format!("Try: let {name} = <value>;")))?;
        let value = self.parse_expression()?;
        let span = start.to(value.span);
        self.expect_semicolon(format!("Try: let {name} = {};", value.as_source()));
        Ok(Statement::Let { name, value, span })
    }

    fn parse_return(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.advance().span;
        let value = if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::RBrace) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let span = value.as_ref().map_or(start, |expr| start.to(expr.span));
        let preview = value.as_ref().map(Expr::as_source).unwrap_or_default();
        self.expect_semicolon(format!("Try: return {preview};"));
        Ok(Statement::Return { value, span })
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, SyntaxError> {
        let expr = self.parse_expression()?;
        if !self.check(&TokenKind::Eq) {
            self.expect_semicolon(format!("Try: {};", expr.as_source()));
            return Ok(Statement::Expr(expr));
        }

        let target_span = expr.span;
        let target = match expr.kind {
            ExprKind::Identifier(name) => AssignTarget::Variable(name),
            ExprKind::Member { object, property } => AssignTarget::Property {
                object: *object,
                key: property,
            },
            _ => {
                return Err(SyntaxError::new("Invalid assignment target", target_span)
                    .with_help("Only variables and properties such as `record.key` can be assigned"));
            }
        };
        self.advance();
        let value = self.parse_expression()?;
        let span = target_span.to(value.span);
        self.expect_semicolon(format!("Try: ... = {};", value.as_source()));
        Ok(Statement::Assign {
            target,
            value,
            span,
        })
    }

    fn parse_function(&mut self) -> Result<FunctionDef, SyntaxError> {
        self.nested(Self::parse_function_def)
    }

    fn parse_function_def(&mut self) -> Result<FunctionDef, SyntaxError> {
        let start = self.advance().span;
        let name = match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        self.consume(&TokenKind::LParen, "Expected `(` to open the parameter list")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier("Expected a parameter name", || {
                    "Parameters are plain names: function (name, age) { ... }".to_string()
                })?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen, "Expected `)` after parameters")?;
        self.consume(&TokenKind::LBrace, "Expected `{` to open the function body")?;
        let body = self.parse_statements(true);
        let end = self.peek().span;
        self.consume(&TokenKind::RBrace, "Expected `}` to close the function body")?;
        Ok(FunctionDef {
            name,
            params,
            body,
            span: start.to(end),
        })
    }

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::parse_sum)
    }

    fn parse_sum(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.parse_postfix()?;
        if !self.check(&TokenKind::Plus) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.check(&TokenKind::Plus) {
            self.advance();
            operands.push(self.parse_postfix()?);
        }
        let span = operands[0].span.to(operands[operands.len() - 1].span);
        Ok(Expr::new(ExprKind::Add(operands), span))
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let depth = self.depth;
        let result = self.parse_postfix_chain();
        self.depth = depth;
        result
    }

    /// Every `.key` and `(args)` link wraps the expression once more, so each
    /// one counts towards the nesting limit.
    fn parse_postfix_chain(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.descend()?;
                    expr = self.parse_member(expr)?;
                }
                TokenKind::LParen => {
                    self.descend()?;
                    let (args, end) = self.parse_arguments()?;
                    let span = expr.span.to(end);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_member(&mut self, object: Expr) -> Result<Expr, SyntaxError> {
        self.advance();
        let token = self.peek().clone();
        // Keywords are valid property names (`Person.prototype.new` and the like).
        let property = match &token.kind {
            TokenKind::Identifier(name) => name.clone(),
            kind => match kind.keyword_text() {
                Some(word) => word.to_string(),
                None => {
                    return Err(SyntaxError::new(
                        format!("Expected a property name after `.`, found {}", kind.describe()),
                        token.span,
                    ));
                }
            },
        };
        self.advance();
        let span = object.span.to(token.span);
        Ok(Expr::new(
            ExprKind::Member {
                object: Box::new(object),
                property,
            },
            span,
        ))
    }

    fn parse_arguments(&mut self) -> Result<(Vec<Expr>, Span), SyntaxError> {
        self.consume(&TokenKind::LParen, "Expected `(` to open the argument list")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let end = self.peek().span;
        self.consume(&TokenKind::RParen, "Expected `)` to close the argument list")?;
        Ok((args, end))
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::Number(value) => ExprKind::Number(value),
            TokenKind::String(value) => ExprKind::String(value),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Null => ExprKind::Null,
            TokenKind::Undefined => ExprKind::Undefined,
            TokenKind::This => ExprKind::This,
            TokenKind::Identifier(name) => ExprKind::Identifier(name),
            TokenKind::New => return self.parse_new(),
            TokenKind::Function => {
                let def = self.parse_function()?;
                let span = def.span;
                return Ok(Expr::new(ExprKind::Function(Rc::new(def)), span));
            }
            TokenKind::LParen => {
                self.advance();
                let mut inner = self.parse_expression()?;
                let end = self.peek().span;
                self.consume(&TokenKind::RParen, "Expected `)` after expression")?;
                inner.span = token.span.to(end);
                return Ok(inner);
            }
            other => {
                return Err(SyntaxError::new(
                    format!("Unexpected {} in expression", other.describe()),
                    token.span,
                ));
            }
        };
        self.advance();
        Ok(Expr::new(kind, token.span))
    }

    fn parse_new(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.advance().span;
        let name_token = self.peek().clone();
        let TokenKind::Identifier(name) = &name_token.kind else {
            return Err(SyntaxError::new(
                format!("Expected a constructor name after `new`, found {}", name_token.kind.describe()),
                name_token.span,
            )
            .with_help("Try: new Person(\"Yoshi\", 23)"));
        };
        self.advance();
        let mut constructor = Expr::new(ExprKind::Identifier(name.clone()), name_token.span);
        while self.check(&TokenKind::Dot) {
            self.descend()?;
            constructor = self.parse_member(constructor)?;
        }
        if !self.check(&TokenKind::LParen) {
            let span = Span::new(constructor.span.end, constructor.span.end);
            return Err(SyntaxError::new("Expected `(` after constructor name", span)
                .with_help(format!("Try: new {}()", constructor.as_source())));
        }
        let (args, end) = self.parse_arguments()?;
        Ok(Expr::new(
            ExprKind::New {
                constructor: Box::new(constructor),
                args,
            },
            start.to(end),
        ))
    }

    fn expect_identifier(
        &mut self,
        message: &str,
        help: impl FnOnce() -> String,
    ) -> Result<String, SyntaxError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(SyntaxError::new(
                format!("{message}, found {}", other.describe()),
                token.span,
            )
            .with_help(help())),
        }
    }

    /// A missing `;` is reported but does not abort the statement.
    fn expect_semicolon(&mut self, help: String) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return;
        }
        let span = self.span_after_previous();
        let found = self.peek_kind().describe();
        self.errors.push(
            SyntaxError::new(format!("Expected `;` after statement, found {found}"), span)
                .with_help(help),
        );
    }

    fn consume(&mut self, expected: &TokenKind, message: &str) -> Result<(), SyntaxError> {
        if self.check(expected) {
            self.advance();
            return Ok(());
        }
        let token = self.peek();
        Err(SyntaxError::new(
            format!("{message}, found {}", token.kind.describe()),
            token.span,
        ))
    }

    fn peek(&self) -> &'a Token {
        let tokens = self.tokens;
        let last = tokens.len().saturating_sub(1);
        &tokens[self.position.min(last)]
    }

    fn peek_kind(&self) -> &'a TokenKind {
        &self.peek().kind
    }

    fn peek_nth_is_identifier(&self, n: usize) -> bool {
        matches!(
            self.tokens.get(self.position + n).map(|token| &token.kind),
            Some(TokenKind::Identifier(_))
        )
    }

    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if !self.is_at_end() {
            self.position += 1;
        }
        token
    }

    fn check(&self, expected: &TokenKind) -> bool {
        self.peek_kind() == expected
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn span_after_previous(&self) -> Span {
        match self.position.checked_sub(1).and_then(|idx| self.tokens.get(idx)) {
            Some(token) => Span::new(token.span.end, token.span.end),
            None => Span::default(),
        }
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        let depth = self.depth;
        let result = self.descend().and_then(|()| parse(self));
        self.depth = depth;
        result
    }

    fn descend(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self
                .error_here(&format!("Expression nests deeper than {MAX_NESTING_DEPTH} levels"))
                .with_help("Split it up with intermediate `let` bindings"));
        }
        self.depth += 1;
        Ok(())
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        SyntaxError::new(message, self.peek().span)
    }

    fn synchronize(&mut self) {
        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    break;
                }
                TokenKind::RBrace => break,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

fn let_syntax_help() -> &'static str {
    "Syntax: let <name> = <value>;"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::lexer::lex;

    fn parse_source(source: &str) -> Result<Program, SyntaxErrors> {
        parse(&lex(source).expect("lex"))
    }

    #[test]
    fn parses_constructor_declaration() {
        let program = parse_source(
            "function Person(name, age) { this.name = name; this.age = age; }",
        )
        .expect("parse");
        let [Statement::Constructor(def)] = program.statements.as_slice() else {
            panic!("expected a single constructor, got {:?}", program.statements);
        };
        assert_eq!(def.name.as_deref(), Some("Person"));
        assert_eq!(def.params, vec!["name", "age"]);
        assert_eq!(def.body.len(), 2);
        assert!(matches!(
            &def.body[0],
            Statement::Assign {
                target: AssignTarget::Property { key, .. },
                ..
            } if key == "name"
        ));
    }

    #[test]
    fn parses_prototype_method_assignment() {
        let program = parse_source(
            "Person.prototype.movement = function() { return 'Moves by ' + this.movement_means; };",
        )
        .expect("parse");
        let [Statement::Assign { target, value, .. }] = program.statements.as_slice() else {
            panic!("expected an assignment");
        };
        let AssignTarget::Property { object, key } = target else {
            panic!("expected a property target");
        };
        assert_eq!(key, "movement");
        assert_eq!(object.as_source(), "Person.prototype");
        let ExprKind::Function(def) = &value.kind else {
            panic!("expected a function value");
        };
        assert!(def.name.is_none());
        assert!(matches!(
            &def.body[0],
            Statement::Return {
                value: Some(Expr {
                    kind: ExprKind::Add(_),
                    ..
                }),
                ..
            }
        ));
    }

    #[test]
    fn parses_method_calls_and_new() {
        let program = parse_source(
            "let child = Object.create(new Person('Yoshi', 23)); console.log(child.movement());",
        )
        .expect("parse");
        assert_eq!(program.statements.len(), 2);
        let Statement::Let { value, .. } = &program.statements[0] else {
            panic!("expected let");
        };
        assert_eq!(value.as_source(), "Object.create(new Person(\"Yoshi\", 23))");
        let Statement::Expr(call) = &program.statements[1] else {
            panic!("expected expression statement");
        };
        assert_eq!(call.as_source(), "console.log(child.movement())");
    }

    #[test]
    fn keywords_are_valid_property_names() {
        let program = parse_source("box.new = 1; box.this.null = 2;").expect("parse");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn rejects_invalid_assignment_target() {
        let errors = parse_source("1 + 2 = 3;").unwrap_err().errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Invalid assignment target");
        assert_eq!(errors[0].span, Span::new(0, 5));
    }

    #[test]
    fn missing_semicolon_is_reported_with_help() {
        let errors = parse_source("let a = 1\nlet b = 2;").unwrap_err().errors;
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Expected `;`"));
        assert_eq!(errors[0].span, Span::new(9, 9));
        assert_eq!(errors[0].help.as_deref(), Some("Try: let a = 1;"));
    }

    #[test]
    fn recovers_and_reports_every_statement_error() {
        let source = "let = 1;\nlet ok = 2;\nnew 5;\n}\nlet fine = 3;";
        let errors = parse_source(source).unwrap_err().errors;
        assert_eq!(errors.len(), 3);
        assert!(errors[0].message.starts_with("Expected a variable name"));
        assert_eq!(errors[0].help.as_deref(), Some(let_syntax_help()));
        assert!(errors[1].message.starts_with("Expected a constructor name"));
        assert!(errors[2].message.starts_with("Unexpected `}`"));
    }

    #[test]
    fn new_requires_argument_list() {
        let errors = parse_source("let p = new Person;").unwrap_err().errors;
        assert_eq!(errors[0].help.as_deref(), Some("Try: new Person()"));
    }

    #[test]
    fn long_sums_stay_flat() {
        let terms = vec!["1"; 200_000].join(" + ");
        let program = parse_source(&format!("console.log({terms});")).expect("parse");
        let [Statement::Expr(call)] = program.statements.as_slice() else {
            panic!("expected one expression statement");
        };
        let ExprKind::Call { args, .. } = &call.kind else {
            panic!("expected a call");
        };
        let ExprKind::Add(operands) = &args[0].kind else {
            panic!("expected a sum");
        };
        assert_eq!(operands.len(), 200_000);

        let program = parse_source("let s = (1 + 2) + 3 + 'x';").expect("parse");
        let Statement::Let { value, .. } = &program.statements[0] else {
            panic!("expected let");
        };
        assert_eq!(value.as_source(), "(1 + 2) + 3 + \"x\"");
    }

    #[test]
    fn nesting_within_the_limit_parses() {
        let source = format!("let x = {}1{};", "(".repeat(100), ")".repeat(100));
        assert!(parse_source(&source).is_ok());
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let source = format!(
            "let x = {}1{};\nlet y = 2;",
            "(".repeat(10_000),
            ")".repeat(10_000)
        );
        let errors = parse_source(&source).unwrap_err().errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            format!("Expression nests deeper than {MAX_NESTING_DEPTH} levels")
        );
        assert!(errors[0].help.is_some());

        let chain = format!("let z = a{};", ".b".repeat(5_000));
        let errors = parse_source(&chain).unwrap_err().errors;
        assert!(errors[0].message.starts_with("Expression nests deeper"));

        let functions = format!(
            "let f = {}1;{};",
            "function() { return ".repeat(200),
            " }".repeat(200)
        );
        let errors = parse_source(&functions).unwrap_err().errors;
        assert!(errors[0].message.starts_with("Expression nests deeper"));
    }
}
