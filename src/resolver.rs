mod symbol;

use crate::ast::{Block, Compound, Declaration, Expression, Program, Statement, VarDecl};

pub use self::symbol::{BuiltinType, ScopeId, ScopedSymbolTable, Symbol, SymbolTable};

/// Static pass run before interpretation. Checks that every referenced name
/// is a declared variable, opening one lexical scope per procedure.
#[derive(Debug)]
pub struct Resolver {
    table: SymbolTable,
    current: ScopeId,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Undeclared variable: {0}")]
    UndeclaredVariable(String),
    #[error("Unknown type: {0}")]
    UnknownType(String),
    #[error("Duplicate declaration of {name} in scope {scope}")]
    DuplicateDeclaration { name: String, scope: String },
    #[error("Not a variable: {0}")]
    NotAVariable(String),
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a fresh [`Resolver`] over `program` and hands back its scopes.
pub fn resolve(program: &Program) -> Result<SymbolTable, ResolveError> {
    let mut resolver = Resolver::new();
    resolver.resolve(program)?;
    Ok(resolver.into_symbols())
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            table: SymbolTable::new(),
            current: ScopeId::BUILTINS,
        }
    }

    pub fn resolve(&mut self, program: &Program) -> Result<(), ResolveError> {
        log::debug!("resolving names in program {}", program.name);
        self.begin_scope(&program.name);
        let result = self.resolve_block(&program.block);
        self.end_scope();
        result
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.table
    }

    fn resolve_block(&mut self, block: &Block) -> Result<(), ResolveError> {
        for declaration in &block.declarations {
            self.resolve_declaration(declaration)?;
        }
        self.resolve_compound(&block.compound)
    }

    fn resolve_declaration(&mut self, declaration: &Declaration) -> Result<(), ResolveError> {
        match declaration {
            Declaration::Variable(VarDecl { name, type_spec }) => {
                let ty = match self.table.lookup(self.current, &type_spec.name) {
                    Some(Symbol::BuiltinType(ty)) => *ty,
                    _ => return Err(ResolveError::UnknownType(type_spec.name.clone())),
                };
                self.declare(Symbol::Variable {
                    name: name.clone(),
                    ty,
                })
            }
            Declaration::Procedure(procedure) => {
                self.declare(Symbol::Procedure {
                    name: procedure.name.clone(),
                })?;
                self.begin_scope(&procedure.name);
                let result = self.resolve_block(&procedure.block);
                self.end_scope();
                result
            }
        }
    }

    fn resolve_compound(&mut self, compound: &Compound) -> Result<(), ResolveError> {
        for statement in &compound.0 {
            self.resolve_statement(statement)?;
        }
        Ok(())
    }

    fn resolve_statement(&mut self, statement: &Statement) -> Result<(), ResolveError> {
        match statement {
            Statement::Compound(compound) => self.resolve_compound(compound),
            Statement::Assign { name, expr } => {
                self.resolve_variable(name)?;
                self.resolve_expression(expr)
            }
            Statement::NoOp => Ok(()),
        }
    }

    fn resolve_expression(&mut self, expression: &Expression) -> Result<(), ResolveError> {
        match expression {
            Expression::Num(_) => Ok(()),
            Expression::Var(name) => self.resolve_variable(name),
            Expression::Binary(left, _, right) => {
                self.resolve_expression(left)?;
                self.resolve_expression(right)
            }
            Expression::Unary(_, operand) => self.resolve_expression(operand),
        }
    }

    fn resolve_variable(&self, name: &str) -> Result<(), ResolveError> {
        match self.table.lookup(self.current, name) {
            Some(Symbol::Variable { .. }) => Ok(()),
            Some(_) => Err(ResolveError::NotAVariable(name.to_string())),
            None => Err(ResolveError::UndeclaredVariable(name.to_string())),
        }
    }

    fn begin_scope(&mut self, name: &str) {
        self.current = self.table.push_scope(name.to_string(), self.current);
    }

    fn end_scope(&mut self) {
        if let Some(parent) = self.table.scope(self.current).parent {
            self.current = parent;
        }
    }

    fn declare(&mut self, symbol: Symbol) -> Result<(), ResolveError> {
        log::debug!(
            "declare {} in scope {}",
            symbol,
            self.table.scope(self.current).name
        );
        self.table
            .insert(self.current, symbol)
            .map_err(|existing| ResolveError::DuplicateDeclaration {
                name: existing.name(),
                scope: self.table.scope(self.current).name.clone(),
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::TypeSpec;
    use crate::parser;

    fn resolve_source(source: &str) -> Result<SymbolTable, ResolveError> {
        let program = parser::program(source).expect("Parse should work on valid program");
        resolve(&program)
    }

    #[test]
    fn test_declared_variables_resolve() {
        let source = r#"
        PROGRAM Ok;
        VAR a, b : INTEGER; y : REAL;
        BEGIN a := 2; b := a * 3; y := a / b END.
        "#;
        let table = resolve_source(source).unwrap();
        let global = table.global().unwrap();
        assert_eq!(global.name, "Ok");
        assert_eq!(global.level, 1);
        assert_eq!(global.len(), 3);
        assert_eq!(
            global.get("y"),
            Some(&Symbol::Variable {
                name: "y".to_string(),
                ty: BuiltinType::Real,
            })
        );
    }

    #[test]
    fn test_undeclared_in_expression() {
        let source = "PROGRAM u; VAR a : INTEGER; BEGIN a := b + 1 END.";
        assert_eq!(
            resolve_source(source).unwrap_err(),
            ResolveError::UndeclaredVariable("b".to_string())
        );
    }

    #[test]
    fn test_undeclared_assignment_target() {
        let source = "PROGRAM u; VAR a : INTEGER; BEGIN BEGIN c := a END END.";
        assert_eq!(
            resolve_source(source).unwrap_err(),
            ResolveError::UndeclaredVariable("c".to_string())
        );
    }

    #[test]
    fn test_procedure_sees_enclosing_scope() {
        let source = r#"
        PROGRAM Outer;
        VAR a : INTEGER;
        PROCEDURE P;
        VAR b : REAL;
        BEGIN b := a * 2.5 END;
        BEGIN a := 1 END.
        "#;
        let table = resolve_source(source).unwrap();
        let inner = table.find_scope("P").unwrap();
        assert_eq!(inner.level, 2);
        assert!(inner.get("b").is_some());
        assert!(inner.get("a").is_none());
        assert_eq!(
            table.global().unwrap().get("P"),
            Some(&Symbol::Procedure {
                name: "P".to_string()
            })
        );
    }

    #[test]
    fn test_procedure_locals_not_visible_outside() {
        let source = r#"
        PROGRAM Outer;
        PROCEDURE P;
        VAR hidden : INTEGER;
        BEGIN hidden := 1 END;
        BEGIN hidden := 2 END.
        "#;
        assert_eq!(
            resolve_source(source).unwrap_err(),
            ResolveError::UndeclaredVariable("hidden".to_string())
        );
    }

    #[test]
    fn test_shadowing_keeps_outer_declaration() {
        let source = r#"
        PROGRAM Shadow;
        VAR a : INTEGER;
        PROCEDURE P;
        VAR a : REAL;
        BEGIN a := 1.5 END;
        BEGIN a := 1 END.
        "#;
        let table = resolve_source(source).unwrap();
        assert_eq!(
            table.global().unwrap().get("a"),
            Some(&Symbol::Variable {
                name: "a".to_string(),
                ty: BuiltinType::Integer,
            })
        );
        assert_eq!(
            table.find_scope("P").unwrap().get("a"),
            Some(&Symbol::Variable {
                name: "a".to_string(),
                ty: BuiltinType::Real,
            })
        );
    }

    #[test]
    fn test_duplicate_declaration_in_same_scope() {
        let source = "PROGRAM d; VAR a : INTEGER; a : REAL; BEGIN END.";
        assert_eq!(
            resolve_source(source).unwrap_err(),
            ResolveError::DuplicateDeclaration {
                name: "a".to_string(),
                scope: "d".to_string(),
            }
        );
    }

    #[test]
    fn test_procedure_is_not_a_variable() {
        let source = "PROGRAM n; PROCEDURE P; BEGIN END; BEGIN P := 1 END.";
        assert_eq!(
            resolve_source(source).unwrap_err(),
            ResolveError::NotAVariable("P".to_string())
        );
    }

    #[test]
    fn test_unknown_type() {
        let program = Program {
            name: "t".to_string(),
            block: Block {
                declarations: vec![Declaration::Variable(VarDecl {
                    name: "flag".to_string(),
                    type_spec: TypeSpec {
                        name: "BOOLEAN".to_string(),
                    },
                })],
                compound: Compound(vec![Statement::NoOp]),
            },
        };
        assert_eq!(
            resolve(&program).unwrap_err(),
            ResolveError::UnknownType("BOOLEAN".to_string())
        );
    }

    #[test]
    fn test_resolver_returns_to_builtins_scope() {
        let program = parser::program("PROGRAM r; BEGIN END.").unwrap();
        let mut resolver = Resolver::new();
        resolver.resolve(&program).unwrap();
        assert_eq!(resolver.current, ScopeId::BUILTINS);
        assert_eq!(resolver.symbols().iter().count(), 2);
    }
}
