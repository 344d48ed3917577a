use std::collections::HashMap;

use decaf_common::Span;
use serde::Serialize;

use super::types::Type;

/// Index of a scope inside a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

/// The kind of a scope. Struct scopes are closed: lookups never leave them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScopeKind {
    Global,
    Block,
    Method,
    Struct,
}

impl ScopeKind {
    pub fn is_closed(self) -> bool {
        matches!(self, ScopeKind::Struct)
    }
}

/// What a declared name denotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    Variable,
    /// Array parameters carry no length.
    Array { length: Option<i64> },
    /// A method; its parameters and body live in `scope`.
    Method { scope: ScopeId },
    /// A struct; its members live in the closed `scope`.
    Struct { scope: ScopeId },
}

/// A declared name. For arrays `ty` is the element type, for methods the
/// return type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub defined_at: Span,
}

impl Symbol {
    pub fn variable(name: &str, ty: Type, defined_at: Span) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Variable,
            ty,
            defined_at,
        }
    }

    pub fn array(name: &str, ty: Type, length: Option<i64>, defined_at: Span) -> Self {
        Self {
            name: name.to_string(),
            kind: SymbolKind::Array { length },
            ty,
            defined_at,
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, SymbolKind::Method { .. })
    }
}

/// A lexical scope containing symbol declarations.
#[derive(Debug, Serialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub label: String,
    pub symbols: HashMap<String, Symbol>,
    parent: Option<ScopeId>,
    /// Declared return type, for method scopes.
    pub return_type: Option<Type>,
    /// Ordered parameter types, for method scopes.
    pub signature: Vec<Type>,
}

impl Scope {
    fn new(kind: ScopeKind, label: String, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            label,
            symbols: HashMap::new(),
            parent,
            return_type: None,
            signature: Vec::new(),
        }
    }

    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }
}

/// Every scope created during one analysis run.
///
/// Scopes are stored in a flat `Vec` and linked by parent indices, so a
/// scope stays reachable after traversal has left it.
#[derive(Debug, Serialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    #[serde(skip)]
    block_counter: usize,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Global, "globalScope".into(), None)],
            block_counter: 0,
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId::GLOBAL
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    fn push(&mut self, scope: Scope) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(scope);
        id
    }

    /// Open a block scope under `parent`, labelled `label_base` plus a
    /// counter that is unique for the whole tree.
    pub fn enter_child(&mut self, parent: ScopeId, label_base: &str) -> ScopeId {
        let label = format!("{}{}", label_base, self.block_counter);
        self.block_counter += 1;
        self.push(Scope::new(ScopeKind::Block, label, Some(parent)))
    }

    /// The scope that becomes current when leaving `scope`.
    pub fn exit(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Create the (open) scope of a method named `name`.
    pub fn new_method(&mut self, parent: ScopeId, name: &str, return_type: Type) -> ScopeId {
        let mut scope = Scope::new(ScopeKind::Method, name.to_string(), Some(parent));
        scope.return_type = Some(return_type);
        self.push(scope)
    }

    /// Create the closed member scope of a struct named `name`.
    pub fn new_struct(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        self.push(Scope::new(ScopeKind::Struct, name.to_string(), Some(parent)))
    }

    /// Append a parameter type to a method's signature.
    pub fn push_param_type(&mut self, method: ScopeId, ty: Type) {
        self.scopes[method.0].signature.push(ty);
    }

    /// Define a symbol in `scope`'s own table. Enclosing scopes are not
    /// consulted. Returns `false`, leaving the scope unchanged, on a clash.
    pub fn define(&mut self, scope: ScopeId, symbol: Symbol) -> bool {
        let symbols = &mut self.scopes[scope.0].symbols;
        if symbols.contains_key(&symbol.name) {
            return false;
        }
        symbols.insert(symbol.name.clone(), symbol);
        true
    }

    /// Look up a name starting at `scope`, walking outward through open
    /// scopes. A closed scope ends the walk.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut idx = scope.0;
        loop {
            let current = &self.scopes[idx];
            if let Some(sym) = current.symbols.get(name) {
                return Some(sym);
            }
            if current.kind.is_closed() {
                return None;
            }
            match current.parent {
                Some(parent) => idx = parent.0,
                None => return None,
            }
        }
    }

    /// The nearest method scope enclosing `scope` (inclusive).
    pub fn enclosing_method(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut idx = scope.0;
        loop {
            if self.scopes[idx].kind == ScopeKind::Method {
                return Some(ScopeId(idx));
            }
            match self.scopes[idx].parent {
                Some(parent) => idx = parent.0,
                None => return None,
            }
        }
    }
}
