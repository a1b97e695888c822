use std::cell::RefCell;

use crate::{
    ast::{
        Block, Compound, Declaration, Expression, InfixOperator, Literal, ProcedureDecl, Program,
        Statement, TypeSpec, UnaryOperator, VarDecl,
    },
    lexer::{LexError, Lexer, Token, TokenType},
    span::Span,
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub error: SyntaxErrorKind,
    pub found: Token,
    context: Vec<&'static str>,
}

impl SyntaxError {
    pub fn span(&self) -> Span {
        self.found.span
    }
}

impl std::error::Error for SyntaxError {}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.context.is_empty() {
            writeln!(f, "While parsing {}", self.context.join(" > "))?;
        }
        write!(
            f,
            "{} at {} but found \"{}\"",
            self.error, self.found.span, self.found.token_type
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("Expected \"{0}\"")]
    Expected(TokenType),
    #[error("Expected one of {0:?}")]
    ExpectedOneOf(Vec<TokenType>),
    #[error("Expected identifier")]
    ExpectedIdentifier,
    #[error("Expected expression")]
    ExpectedExpression,
    #[error("Nesting deeper than {0} rules")]
    TooDeeplyNested(usize),
}

/// Rule stack depth past which the parser gives up instead of recursing further.
const MAX_NESTING: usize = 512;

#[derive(Debug)]
struct ParseContext {
    stack: RefCell<Vec<&'static str>>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, name: &'static str) -> ParseContextGuard {
        self.stack.borrow_mut().push(name);
        ParseContextGuard::new(self)
    }

    fn pop(&self) {
        self.stack.borrow_mut().pop();
    }

    fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    fn snapshot(&self) -> Vec<&'static str> {
        self.stack.borrow().clone()
    }
}

struct ParseContextGuard<'a> {
    context: &'a ParseContext,
}

impl<'a> ParseContextGuard<'a> {
    fn new(context: &'a ParseContext) -> Self {
        Self { context }
    }
}

impl<'a> Drop for ParseContextGuard<'a> {
    fn drop(&mut self) {
        self.context.pop();
    }
}

/// Recursive descent parser with a single token of lookahead.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

pub fn program(source: &str) -> Result<Program, ParseError> {
    Parser::new(Lexer::new(source))?.parse()
}

/// Parses a standalone expression, mostly useful for evaluating snippets.
pub fn expression(source: &str) -> Result<Expression, ParseError> {
    let mut parser = Parser::new(Lexer::new(source))?;
    let context = ParseContext::new();
    let expr = parser.expr(&context)?;
    parser.consume(&context, TokenType::Eof)?;
    Ok(expr)
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    pub fn parse(mut self) -> Result<Program, ParseError> {
        let context = ParseContext::new();
        let program = self.program(&context)?;
        log::debug!(
            "parsed program {} with {} top-level declarations",
            program.name,
            program.block.declarations.len()
        );
        Ok(program)
    }

    fn program(&mut self, context: &ParseContext) -> Result<Program, ParseError> {
        let _guard = context.push("program");
        self.consume(context, TokenType::Program)?;
        let name = self.match_identifier(context)?;
        self.consume(context, TokenType::Semicolon)?;
        let block = self.block(context)?;
        self.consume(context, TokenType::Dot)?;
        self.consume(context, TokenType::Eof)?;
        Ok(Program { name, block })
    }

    fn block(&mut self, context: &ParseContext) -> Result<Block, ParseError> {
        let _guard = context.push("block");
        let declarations = self.declarations(context)?;
        let compound = self.compound_statement(context)?;
        Ok(Block {
            declarations,
            compound,
        })
    }

    fn declarations(&mut self, context: &ParseContext) -> Result<Vec<Declaration>, ParseError> {
        let _guard = context.push("declarations");
        let mut declarations = Vec::new();

        while self.check(&TokenType::Var) {
            self.advance()?;
            loop {
                declarations.extend(
                    self.var_declaration(context)?
                        .into_iter()
                        .map(Declaration::Variable),
                );
                self.consume(context, TokenType::Semicolon)?;
                if !matches!(self.current.token_type, TokenType::Identifier(_)) {
                    break;
                }
            }
        }

        while self.check(&TokenType::Procedure) {
            declarations.push(Declaration::Procedure(self.procedure_declaration(context)?));
        }

        Ok(declarations)
    }

    fn var_declaration(&mut self, context: &ParseContext) -> Result<Vec<VarDecl>, ParseError> {
        let _guard = context.push("var_declaration");
        let mut names = vec![self.match_identifier(context)?];
        while self.check(&TokenType::Comma) {
            self.advance()?;
            names.push(self.match_identifier(context)?);
        }
        self.consume(context, TokenType::Colon)?;
        let type_spec = self.type_spec(context)?;

        Ok(names
            .into_iter()
            .map(|name| VarDecl {
                name,
                type_spec: type_spec.clone(),
            })
            .collect())
    }

    fn procedure_declaration(
        &mut self,
        context: &ParseContext,
    ) -> Result<ProcedureDecl, ParseError> {
        let _guard = context.push("procedure_declaration");
        self.check_depth(context)?;
        self.consume(context, TokenType::Procedure)?;
        let name = self.match_identifier(context)?;
        self.consume(context, TokenType::Semicolon)?;
        let block = self.block(context)?;
        self.consume(context, TokenType::Semicolon)?;
        Ok(ProcedureDecl { name, block })
    }

    fn type_spec(&mut self, context: &ParseContext) -> Result<TypeSpec, ParseError> {
        let _guard = context.push("type_spec");
        match self.current.token_type {
            TokenType::Integer | TokenType::Real => {
                let token = self.advance()?;
                Ok(TypeSpec { name: token.lexeme })
            }
            _ => Err(self.error(
                context,
                SyntaxErrorKind::ExpectedOneOf(vec![TokenType::Integer, TokenType::Real]),
            )),
        }
    }

    fn compound_statement(&mut self, context: &ParseContext) -> Result<Compound, ParseError> {
        let _guard = context.push("compound_statement");
        self.check_depth(context)?;
        self.consume(context, TokenType::Begin)?;
        let statements = self.statement_list(context)?;
        if !self.check(&TokenType::End) {
            return Err(self.error(
                context,
                SyntaxErrorKind::ExpectedOneOf(vec![TokenType::Semicolon, TokenType::End]),
            ));
        }
        self.advance()?;
        Ok(Compound(statements))
    }

    fn statement_list(&mut self, context: &ParseContext) -> Result<Vec<Statement>, ParseError> {
        let _guard = context.push("statement_list");
        let mut statements = vec![self.statement(context)?];
        while self.check(&TokenType::Semicolon) {
            self.advance()?;
            statements.push(self.statement(context)?);
        }
        Ok(statements)
    }

    fn statement(&mut self, context: &ParseContext) -> Result<Statement, ParseError> {
        let _guard = context.push("statement");
        match self.current.token_type {
            TokenType::Begin => Ok(Statement::Compound(self.compound_statement(context)?)),
            TokenType::Identifier(_) => self.assignment_statement(context),
            _ => Ok(Statement::NoOp),
        }
    }

    fn assignment_statement(&mut self, context: &ParseContext) -> Result<Statement, ParseError> {
        let _guard = context.push("assignment_statement");
        let name = self.match_identifier(context)?;
        self.consume(context, TokenType::Assign)?;
        let expr = self.expr(context)?;
        Ok(Statement::Assign { name, expr })
    }

    fn binary(
        &mut self,
        context: &ParseContext,
        precedence: fn(&mut Self, &ParseContext) -> Result<Expression, ParseError>,
        operator: impl Fn(&TokenType) -> Option<InfixOperator>,
    ) -> Result<Expression, ParseError> {
        let mut expr = precedence(self, context)?;

        while let Some(op) = operator(self.current.token_type()) {
            self.advance()?;
            let right = precedence(self, context)?;
            expr = Expression::Binary(Box::new(expr), op, Box::new(right));
        }

        Ok(expr)
    }

    fn expr(&mut self, context: &ParseContext) -> Result<Expression, ParseError> {
        let _guard = context.push("expr");
        self.binary(context, Self::term, |token_type| match token_type {
            TokenType::Plus => Some(InfixOperator::Plus),
            TokenType::Minus => Some(InfixOperator::Minus),
            _ => None,
        })
    }

    fn term(&mut self, context: &ParseContext) -> Result<Expression, ParseError> {
        let _guard = context.push("term");
        self.binary(context, Self::factor, |token_type| match token_type {
            TokenType::Star => Some(InfixOperator::Multiply),
            TokenType::Div => Some(InfixOperator::IntegerDivide),
            TokenType::Slash => Some(InfixOperator::FloatDivide),
            _ => None,
        })
    }

    fn factor(&mut self, context: &ParseContext) -> Result<Expression, ParseError> {
        let _guard = context.push("factor");
        self.check_depth(context)?;

        let operator = match self.current.token_type {
            TokenType::Plus => Some(UnaryOperator::Plus),
            TokenType::Minus => Some(UnaryOperator::Minus),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance()?;
            let operand = self.factor(context)?;
            return Ok(Expression::Unary(operator, Box::new(operand)));
        }

        match &self.current.token_type {
            TokenType::IntegerConst(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expression::Num(Literal::Integer(n)))
            }
            TokenType::RealConst(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expression::Num(Literal::Real(n)))
            }
            TokenType::LeftParen => {
                self.advance()?;
                let expr = self.expr(context)?;
                self.consume(context, TokenType::RightParen)?;
                Ok(expr)
            }
            TokenType::Identifier(_) => Ok(Expression::Var(self.match_identifier(context)?)),
            _ => Err(self.error(context, SyntaxErrorKind::ExpectedExpression)),
        }
    }

    fn check_depth(&self, context: &ParseContext) -> Result<(), ParseError> {
        if context.depth() > MAX_NESTING {
            return Err(self.error(context, SyntaxErrorKind::TooDeeplyNested(MAX_NESTING)));
        }
        Ok(())
    }

    fn check(&self, token_type: &TokenType) -> bool {
        self.current.token_type() == token_type
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn consume(&mut self, context: &ParseContext, token_type: TokenType) -> Result<Token, ParseError> {
        if self.check(&token_type) {
            self.advance()
        } else {
            Err(self.error(context, SyntaxErrorKind::Expected(token_type)))
        }
    }

    fn match_identifier(&mut self, context: &ParseContext) -> Result<String, ParseError> {
        match &self.current.token_type {
            TokenType::Identifier(_) => Ok(self.advance()?.lexeme),
            _ => Err(self.error(context, SyntaxErrorKind::ExpectedIdentifier)),
        }
    }

    fn error(&self, context: &ParseContext, error: SyntaxErrorKind) -> ParseError {
        ParseError::Syntax(SyntaxError {
            error,
            found: self.current.clone(),
            context: context.snapshot(),
        })
    }
}
