use std::{collections::hash_map::Entry, fmt::Display};

use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    Integer,
    Real,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 2] = [BuiltinType::Integer, BuiltinType::Real];
}

impl Display for BuiltinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltinType::Integer => write!(f, "INTEGER"),
            BuiltinType::Real => write!(f, "REAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    BuiltinType(BuiltinType),
    Variable { name: String, ty: BuiltinType },
    Procedure { name: String },
}

impl Symbol {
    pub fn name(&self) -> String {
        match self {
            Symbol::BuiltinType(ty) => ty.to_string(),
            Symbol::Variable { name, .. } | Symbol::Procedure { name } => name.clone(),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::BuiltinType(ty) => write!(f, "<builtin {}>", ty),
            Symbol::Variable { name, ty } => write!(f, "<var {} : {}>", name, ty),
            Symbol::Procedure { name } => write!(f, "<procedure {}>", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const BUILTINS: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone)]
pub struct ScopedSymbolTable {
    pub name: String,
    pub level: usize,
    pub parent: Option<ScopeId>,
    symbols: FxHashMap<String, Symbol>,
}

impl ScopedSymbolTable {
    fn new(name: String, level: usize, parent: Option<ScopeId>) -> Self {
        Self {
            name,
            level,
            parent,
            symbols: FxHashMap::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// Every scope opened during resolution, in creation order. Scope 0 holds the
/// builtin types, scope 1 is the global scope of the first resolved program.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<ScopedSymbolTable>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut builtins = ScopedSymbolTable::new("builtins".to_string(), 0, None);
        for ty in BuiltinType::ALL {
            builtins.symbols.insert(ty.to_string(), Symbol::BuiltinType(ty));
        }
        Self {
            scopes: vec![builtins],
        }
    }

    pub(super) fn push_scope(&mut self, name: String, parent: ScopeId) -> ScopeId {
        let level = self.scope(parent).level + 1;
        self.scopes
            .push(ScopedSymbolTable::new(name, level, Some(parent)));
        ScopeId(self.scopes.len() - 1)
    }

    /// Inserts into exactly the given scope. Returns the symbol already bound
    /// to that name there, leaving the scope untouched.
    pub(super) fn insert(&mut self, id: ScopeId, symbol: Symbol) -> Result<(), Symbol> {
        match self.scopes[id.0].symbols.entry(symbol.name()) {
            Entry::Occupied(o) => Err(o.get().clone()),
            Entry::Vacant(v) => {
                v.insert(symbol);
                Ok(())
            }
        }
    }

    pub fn scope(&self, id: ScopeId) -> &ScopedSymbolTable {
        &self.scopes[id.0]
    }

    /// Looks `name` up starting in `id` and walking out through enclosing scopes.
    pub fn lookup(&self, id: ScopeId, name: &str) -> Option<&Symbol> {
        let mut scope = Some(id);
        while let Some(id) = scope {
            let table = self.scope(id);
            if let Some(symbol) = table.get(name) {
                return Some(symbol);
            }
            scope = table.parent;
        }
        None
    }

    pub fn find_scope(&self, name: &str) -> Option<&ScopedSymbolTable> {
        self.scopes.iter().find(|scope| scope.name == name)
    }

    pub fn global(&self) -> Option<&ScopedSymbolTable> {
        self.scopes.get(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopedSymbolTable> {
        self.scopes.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builtins_preregistered() {
        let table = SymbolTable::new();
        assert_eq!(
            table.lookup(ScopeId::BUILTINS, "INTEGER"),
            Some(&Symbol::BuiltinType(BuiltinType::Integer))
        );
        assert_eq!(
            table.lookup(ScopeId::BUILTINS, "REAL"),
            Some(&Symbol::BuiltinType(BuiltinType::Real))
        );
        assert!(table.global().is_none());

        let mut names = table
            .scope(ScopeId::BUILTINS)
            .symbols()
            .map(Symbol::name)
            .collect::<Vec<_>>();
        names.sort_unstable();
        assert_eq!(names, vec!["INTEGER", "REAL"]);
    }

    #[test]
    fn test_new_scope_starts_empty() {
        let mut table = SymbolTable::new();
        let global = table.push_scope("main".to_string(), ScopeId::BUILTINS);
        assert!(table.scope(global).is_empty());
        assert_eq!(table.scope(global).len(), 0);
        assert!(!table.scope(ScopeId::BUILTINS).is_empty());
    }

    #[test]
    fn test_lookup_walks_outward() {
        let mut table = SymbolTable::new();
        let global = table.push_scope("main".to_string(), ScopeId::BUILTINS);
        let inner = table.push_scope("inner".to_string(), global);
        table
            .insert(
                global,
                Symbol::Variable {
                    name: "x".to_string(),
                    ty: BuiltinType::Integer,
                },
            )
            .unwrap();

        assert_eq!(table.scope(inner).level, 2);
        assert!(table.lookup(inner, "x").is_some());
        assert!(table.lookup(inner, "REAL").is_some());
        assert!(table.scope(inner).get("x").is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_in_same_scope() {
        let mut table = SymbolTable::new();
        let global = table.push_scope("main".to_string(), ScopeId::BUILTINS);
        let x = Symbol::Variable {
            name: "x".to_string(),
            ty: BuiltinType::Integer,
        };
        table.insert(global, x.clone()).unwrap();
        let duplicate = Symbol::Variable {
            name: "x".to_string(),
            ty: BuiltinType::Real,
        };
        assert_eq!(table.insert(global, duplicate), Err(x.clone()));
        assert_eq!(table.lookup(global, "x"), Some(&x));
    }
}
