use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub declarations: Vec<Declaration>,
    pub compound: Compound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Variable(VarDecl),
    Procedure(ProcedureDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub type_spec: TypeSpec,
}

/// Declared but never callable: the grammar has no call statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDecl {
    pub name: String,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: String,
}

/// `BEGIN ... END`. Never empty, an empty body holds a single [`Statement::NoOp`].
#[derive(Debug, Clone, PartialEq)]
pub struct Compound(pub Vec<Statement>);

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Compound(Compound),
    Assign { name: String, expr: Expression },
    NoOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Num(Literal),
    Var(String),
    Binary(Box<Expression>, InfixOperator, Box<Expression>),
    Unary(UnaryOperator, Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Plus,
    Minus,
    Multiply,
    IntegerDivide,
    FloatDivide,
}

/// Formats a real so that it lexes back as a real constant.
pub(crate) fn format_real(f: &mut std::fmt::Formatter<'_>, n: f64) -> std::fmt::Result {
    let text = n.to_string();
    if n.is_finite() && !text.contains('.') {
        write!(f, "{}.0", text)
    } else {
        write!(f, "{}", text)
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PROGRAM {};", self.name)?;
        write!(f, "{}.", self.block)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for declaration in &self.declarations {
            writeln!(f, "{}", declaration)?;
        }
        write!(f, "{}", self.compound)
    }
}

impl Display for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Declaration::Variable(decl) => write!(f, "VAR {} : {};", decl.name, decl.type_spec),
            Declaration::Procedure(decl) => {
                writeln!(f, "PROCEDURE {};", decl.name)?;
                write!(f, "{};", decl.block)
            }
        }
    }
}

impl Display for TypeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Display for Compound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BEGIN")?;
        for (i, statement) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, ";")?;
            }
            writeln!(f)?;
            write!(f, "{}", statement)?;
        }
        writeln!(f)?;
        write!(f, "END")
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Compound(compound) => write!(f, "{}", compound),
            Statement::Assign { name, expr } => write!(f, "{} := {}", name, expr),
            Statement::NoOp => Ok(()),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Num(literal) => write!(f, "{}", literal),
            Expression::Var(name) => write!(f, "{}", name),
            Expression::Binary(left, op, right) => write!(f, "({} {} {})", left, op, right),
            Expression::Unary(op, operand) => write!(f, "({}{})", op, operand),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Real(n) => format_real(f, *n),
        }
    }
}

impl Display for InfixOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InfixOperator::Plus => write!(f, "+"),
            InfixOperator::Minus => write!(f, "-"),
            InfixOperator::Multiply => write!(f, "*"),
            InfixOperator::IntegerDivide => write!(f, "DIV"),
            InfixOperator::FloatDivide => write!(f, "/"),
        }
    }
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Minus => write!(f, "-"),
        }
    }
}
