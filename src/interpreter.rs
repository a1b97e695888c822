mod value;

use indexmap::IndexMap;

use crate::ast::{Compound, Expression, Program, Statement, UnaryOperator};

pub use self::value::Value;

/// Final variable values, in the order each variable was first assigned.
pub type Store = IndexMap<String, Value>;

/// Tree-walking evaluator over a single flat store. Declarations have no
/// runtime effect and procedure bodies never execute.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    store: Store,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Error executing statement: {statement} - {kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub statement: Statement,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Integer overflow in {0}")]
    Overflow(String),
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `program` in a fresh interpreter and returns the resulting store.
    pub fn run(program: &Program) -> Result<Store, RuntimeError> {
        let mut interpreter = Self::new();
        interpreter.interpret(program)?;
        Ok(interpreter.into_store())
    }

    pub fn interpret(&mut self, program: &Program) -> Result<(), RuntimeError> {
        log::debug!("interpreting program {}", program.name);
        let Compound(statements) = &program.block.compound;
        for stmt in statements {
            if let Err(kind) = self.execute(stmt) {
                return Err(RuntimeError {
                    kind,
                    statement: stmt.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    fn execute(&mut self, stmt: &Statement) -> Result<(), RuntimeErrorKind> {
        #[cfg(feature = "trace")]
        {
            log::trace!("{}", stmt);
            log::trace!("{:?}", self.store);
        }

        match stmt {
            Statement::Compound(Compound(statements)) => {
                for statement in statements {
                    self.execute(statement)?;
                }
            }
            Statement::Assign { name, expr } => {
                let value = self.evaluate(expr)?;
                log::trace!("{} := {}", name, value);
                self.store.insert(name.clone(), value);
            }
            Statement::NoOp => {}
        }

        Ok(())
    }

    pub fn evaluate(&self, expression: &Expression) -> Result<Value, RuntimeErrorKind> {
        match expression {
            Expression::Num(literal) => Ok(Value::from(*literal)),
            Expression::Var(name) => self
                .store
                .get(name)
                .copied()
                .ok_or_else(|| RuntimeErrorKind::UndefinedVariable(name.clone())),
            Expression::Binary(left, op, right) => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                left.binary(*op, right)
            }
            Expression::Unary(op, operand) => {
                let operand = self.evaluate(operand)?;
                match op {
                    UnaryOperator::Plus => Ok(operand),
                    UnaryOperator::Minus => operand.negate(),
                }
            }
        }
    }
}
