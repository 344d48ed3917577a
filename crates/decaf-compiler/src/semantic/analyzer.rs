use std::collections::HashMap;

use decaf_common::config::AnalysisSection;
use decaf_common::{CompileError, Diagnostic, DiagnosticBag, Span};
use log::{debug, trace};

use crate::ast::nodes::*;

use super::scope::{ScopeId, ScopeTree, Symbol, SymbolKind};
use super::type_checker;
use super::types::{Type, TypeRegistry};

/// Knobs for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerOptions {
    /// Name of the method every program must declare at top level.
    pub entry_point: String,
    pub require_entry_point: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            entry_point: "main".to_string(),
            require_entry_point: true,
        }
    }
}

impl From<&AnalysisSection> for AnalyzerOptions {
    fn from(section: &AnalysisSection) -> Self {
        Self {
            entry_point: section.entry_point.clone(),
            require_entry_point: section.require_entry_point,
        }
    }
}

/// The outcome of analysing one program: the scope tree, which node opened
/// which scope, and every diagnostic found.
#[derive(Debug)]
pub struct Analysis {
    scopes: ScopeTree,
    scope_map: HashMap<NodeId, ScopeId>,
    diagnostics: DiagnosticBag,
}

impl Analysis {
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn global(&self) -> ScopeId {
        self.scopes.global()
    }

    /// The scope opened by a program, struct, method, if, else or while node.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.scope_map.get(&node).copied()
    }

    pub fn scope_map(&self) -> &HashMap<NodeId, ScopeId> {
        &self.scope_map
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    pub fn had_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_diagnostics()
    }
}

/// How a location is being used. A whole, unindexed array is only a
/// valid value when passed directly as a call argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Value,
    Argument,
}

/// Single-pass name resolver and type checker.
///
/// Declarations are visible from the point they are analysed onward; the
/// scope to resolve in is threaded through every call.
pub struct Analyzer {
    options: AnalyzerOptions,
    types: TypeRegistry,
    scopes: ScopeTree,
    /// Member scope of each struct type, by name.
    structs: HashMap<String, ScopeId>,
    scope_map: HashMap<NodeId, ScopeId>,
    diagnostics: DiagnosticBag,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self::with_options(AnalyzerOptions::default())
    }

    pub fn with_options(options: AnalyzerOptions) -> Self {
        Self {
            options,
            types: TypeRegistry::new(),
            scopes: ScopeTree::new(),
            structs: HashMap::new(),
            scope_map: HashMap::new(),
            diagnostics: DiagnosticBag::new(),
        }
    }

    /// Analyse a whole program. Always runs to completion.
    pub fn analyze(mut self, program: &Program) -> Analysis {
        let global = self.scopes.global();
        for decl in &program.declarations {
            self.check_declaration(global, decl);
        }
        self.scope_map.insert(program.id, global);

        if self.options.require_entry_point {
            self.check_entry_point(global, program.span);
        }

        debug!(
            "analysis finished: {} scope(s), {} diagnostic(s)",
            self.scopes.len(),
            self.diagnostics.len()
        );
        Analysis {
            scopes: self.scopes,
            scope_map: self.scope_map,
            diagnostics: self.diagnostics,
        }
    }

    fn error(&mut self, error: CompileError, span: Span) {
        trace!("line {}: {}", span, error);
        self.diagnostics.error(error, span);
    }

    fn define(&mut self, scope: ScopeId, symbol: Symbol, span: Span) {
        let name = symbol.name.clone();
        if !self.scopes.define(scope, symbol) {
            let scope = self.scopes.get(scope).label.clone();
            self.error(CompileError::Redeclaration { name, scope }, span);
        }
    }

    fn resolve_type(&mut self, name: &str, span: Span) -> Type {
        match self.types.resolve(name) {
            Ok(ty) => ty,
            Err(e) => {
                self.error(e, span);
                Type::Error
            }
        }
    }

    fn check_entry_point(&mut self, global: ScopeId, span: Span) {
        let entry = &self.options.entry_point;
        let found = self
            .scopes
            .get(global)
            .lookup_local(entry)
            .is_some_and(Symbol::is_method);
        if !found {
            let name = format!("{entry}()");
            self.error(CompileError::UndefinedName { name }, span);
        }
    }

    // ====================================================================
    // Declarations
    // ====================================================================

    fn check_declaration(&mut self, scope: ScopeId, decl: &Declaration) {
        match decl {
            Declaration::Struct(d) => {
                self.check_struct_decl(scope, d);
            }
            Declaration::Var(d) => self.check_var_decl(scope, d),
            Declaration::Array(d) => self.check_array_decl(scope, d),
            Declaration::Method(d) => self.check_method_decl(scope, d),
        }
    }

    /// Returns the struct's name so an inline declaration can use it as a type.
    fn check_struct_decl(&mut self, scope: ScopeId, decl: &StructDecl) -> String {
        if let Err(e) = self.types.register_struct(&decl.name) {
            self.error(e, decl.span);
        }

        let members = self.scopes.new_struct(scope, &decl.name);
        let symbol = Symbol {
            name: decl.name.clone(),
            kind: SymbolKind::Struct { scope: members },
            ty: Type::Struct(decl.name.clone()),
            defined_at: decl.span,
        };
        self.define(scope, symbol, decl.span);
        self.structs.entry(decl.name.clone()).or_insert(members);

        debug!("entering struct scope '{}' ({})", decl.name, decl.id);
        for member in &decl.members {
            self.check_declaration(members, member);
        }
        debug!("leaving struct scope '{}'", decl.name);

        self.scope_map.insert(decl.id, members);
        decl.name.clone()
    }

    fn declared_type(&mut self, scope: ScopeId, spec: &TypeSpec, span: Span) -> Type {
        let name = match spec {
            TypeSpec::Named(name) => name.clone(),
            TypeSpec::Struct(decl) => self.check_struct_decl(scope, decl),
        };
        self.resolve_type(&name, span)
    }

    fn check_var_decl(&mut self, scope: ScopeId, decl: &VarDecl) {
        let ty = self.declared_type(scope, &decl.ty, decl.span);
        self.define(scope, Symbol::variable(&decl.name, ty, decl.span), decl.span);
    }

    fn check_array_decl(&mut self, scope: ScopeId, decl: &ArrayDecl) {
        if decl.length <= 0 {
            self.error(
                CompileError::ArraySize {
                    name: decl.name.clone(),
                },
                decl.span,
            );
        }
        let ty = self.declared_type(scope, &decl.ty, decl.span);
        let symbol = Symbol::array(&decl.name, ty, Some(decl.length), decl.span);
        self.define(scope, symbol, decl.span);
    }

    fn check_method_decl(&mut self, scope: ScopeId, decl: &MethodDecl) {
        let return_type = self.resolve_type(&decl.return_type, decl.span);
        let method = self.scopes.new_method(scope, &decl.name, return_type.clone());

        // Parameters share the method's own table and are defined before
        // the method itself becomes visible.
        for param in &decl.params {
            let ty = self.resolve_type(&param.ty, param.span);
            self.scopes.push_param_type(method, ty.clone());
            let symbol = match param.kind {
                ParamKind::Variable => Symbol::variable(&param.name, ty, param.span),
                ParamKind::Array => Symbol::array(&param.name, ty, None, param.span),
            };
            if !self.scopes.define(method, symbol) {
                self.error(
                    CompileError::DuplicateParam {
                        param: param.name.clone(),
                        method: decl.name.clone(),
                    },
                    param.span,
                );
            }
        }

        let symbol = Symbol {
            name: decl.name.clone(),
            kind: SymbolKind::Method { scope: method },
            ty: return_type,
            defined_at: decl.span,
        };
        self.define(scope, symbol, decl.span);

        debug!("entering method scope '{}' ({})", decl.name, decl.id);
        self.check_block(method, &decl.body);
        debug!("leaving method scope '{}'", decl.name);

        self.scope_map.insert(decl.id, method);
    }

    // ====================================================================
    // Statements
    // ====================================================================

    fn check_block(&mut self, scope: ScopeId, block: &Block) {
        for decl in &block.declarations {
            self.check_declaration(scope, decl);
        }
        for stmt in &block.statements {
            self.check_stmt(scope, stmt);
        }
    }

    /// Open a fresh block scope under `scope`, analyse `body` in it and
    /// record it against `node`.
    fn check_nested_block(&mut self, scope: ScopeId, label: &str, node: NodeId, body: &Block) {
        let inner = self.scopes.enter_child(scope, label);
        debug!(
            "entering block scope '{}' ({})",
            self.scopes.get(inner).label,
            node
        );
        self.check_block(inner, body);
        self.scope_map.insert(node, inner);
        debug!("leaving block scope '{}'", self.scopes.get(inner).label);
    }

    fn check_stmt(&mut self, scope: ScopeId, stmt: &Stmt) {
        match stmt {
            Stmt::If(s) => {
                self.check_condition(scope, &s.condition, "ifScope", s.span);
                self.check_nested_block(scope, "ifScope", s.id, &s.body);
                if let Some(else_branch) = &s.else_branch {
                    self.check_nested_block(scope, "elseScope", else_branch.id, &else_branch.body);
                }
            }
            Stmt::While(s) => {
                self.check_condition(scope, &s.condition, "whileScope", s.span);
                self.check_nested_block(scope, "whileScope", s.id, &s.body);
            }
            Stmt::Return(s) => self.check_return(scope, s),
            Stmt::Assign(s) => {
                let target = self.check_location(scope, scope, &s.target, Usage::Value);
                let value = self.check_expr(scope, &s.value);
                if let Err(e) = type_checker::check_assignment(&target, &value) {
                    self.error(e, s.span);
                }
            }
            Stmt::Call(call) => {
                self.check_call(scope, call);
            }
        }
    }

    fn check_condition(&mut self, scope: ScopeId, condition: &Expr, stmt: &str, span: Span) {
        let ty = self.check_expr(scope, condition);
        if ty != Type::Boolean {
            self.error(
                CompileError::NonBooleanCondition {
                    stmt: stmt.to_string(),
                },
                span,
            );
        }
    }

    fn check_return(&mut self, scope: ScopeId, stmt: &ReturnStmt) {
        let found = match &stmt.value {
            Some(value) => self.check_expr(scope, value),
            None => Type::Void,
        };
        let Some(method) = self.scopes.enclosing_method(scope) else {
            return;
        };
        let expected = self
            .scopes
            .get(method)
            .return_type
            .clone()
            .unwrap_or(Type::Void);
        if found != expected {
            self.error(
                CompileError::ReturnMismatch {
                    expected: expected.display_name(),
                    found: found.display_name(),
                },
                stmt.span,
            );
        }
    }

    // ====================================================================
    // Expressions
    // ====================================================================

    fn check_expr(&mut self, scope: ScopeId, expr: &Expr) -> Type {
        match expr {
            Expr::Location(loc) => self.check_location(scope, scope, loc, Usage::Value),
            Expr::Call(call) => self.check_call(scope, call),
            Expr::Binary(e) => {
                let left = self.check_expr(scope, &e.left);
                let right = self.check_expr(scope, &e.right);
                match type_checker::check_binary_op(&left, e.op, &right) {
                    Ok(ty) => ty,
                    Err(err) => {
                        self.error(err, e.span);
                        Type::Error
                    }
                }
            }
            Expr::Unary(e) => {
                let operand = self.check_expr(scope, &e.operand);
                match type_checker::check_unary_op(e.op, &operand) {
                    Ok(ty) => ty,
                    Err(err) => {
                        self.error(err, e.span);
                        Type::Error
                    }
                }
            }
            Expr::Literal(lit) => match lit.value {
                LiteralValue::Int(_) => Type::Int,
                LiteralValue::Char(_) => Type::Char,
                LiteralValue::Bool(_) => Type::Boolean,
            },
        }
    }

    fn check_call(&mut self, scope: ScopeId, call: &MethodCall) -> Type {
        let callee = self
            .scopes
            .resolve(scope, &call.name)
            .map(|sym| (sym.kind.clone(), sym.ty.clone()));
        trace!("call '{}' resolved to {:?}", call.name, callee);

        let method = match callee {
            Some((SymbolKind::Method { scope: method }, return_type)) => {
                Some((method, return_type))
            }
            Some(_) => {
                let name = call.name.clone();
                self.error(CompileError::NotCallable { name }, call.span);
                None
            }
            None => {
                let name = call.name.clone();
                self.error(CompileError::UndefinedName { name }, call.span);
                None
            }
        };

        let args: Vec<Type> = call
            .args
            .iter()
            .map(|arg| self.check_argument(scope, arg))
            .collect();

        let Some((method, return_type)) = method else {
            return Type::Error;
        };
        if self.scopes.get(method).signature != args {
            let name = call.name.clone();
            self.error(CompileError::BadArguments { name }, call.span);
        }
        return_type
    }

    fn check_argument(&mut self, scope: ScopeId, arg: &Expr) -> Type {
        match arg {
            Expr::Location(loc) => self.check_location(scope, scope, loc, Usage::Argument),
            other => self.check_expr(scope, other),
        }
    }

    /// Type a location. Names are looked up from `lookup`; index expressions
    /// are evaluated in `scope`, the scope the location appears in.
    fn check_location(
        &mut self,
        scope: ScopeId,
        lookup: ScopeId,
        loc: &Location,
        usage: Usage,
    ) -> Type {
        let Some(symbol) = self.scopes.resolve(lookup, &loc.name).cloned() else {
            let name = loc.name.clone();
            self.error(CompileError::UndefinedName { name }, loc.span);
            return Type::Error;
        };
        trace!(
            "'{}' resolved in '{}' to {:?}",
            loc.name,
            self.scopes.get(lookup).label,
            symbol.kind
        );

        match (&symbol.kind, &loc.index) {
            (SymbolKind::Method { .. } | SymbolKind::Struct { .. }, _) => {
                let op = symbol.name.clone();
                self.error(CompileError::UnsupportedOperand { op }, loc.span);
                return Type::Error;
            }
            (SymbolKind::Variable, Some(index)) => {
                self.check_expr(scope, index);
                let op = symbol.name.clone();
                self.error(CompileError::UnsupportedOperand { op }, loc.span);
            }
            (SymbolKind::Array { length }, Some(index)) => {
                self.check_index(scope, &symbol.name, *length, index, loc.span);
            }
            (SymbolKind::Array { .. }, None) if usage == Usage::Value || loc.member.is_some() => {
                let name = symbol.name.clone();
                self.error(CompileError::ArrayNotIndexed { name }, loc.span);
                return Type::Error;
            }
            (SymbolKind::Variable | SymbolKind::Array { .. }, None) => {}
        }

        match &symbol.ty {
            Type::Error => Type::Error,
            ty if ty.is_builtin() => {
                if let Some(member) = &loc.member {
                    self.error(
                        CompileError::NoAttribute {
                            name: symbol.name.clone(),
                            member: member.to_string(),
                        },
                        loc.span,
                    );
                }
                ty.clone()
            }
            Type::Struct(struct_name) => match &loc.member {
                None => symbol.ty.clone(),
                Some(member) => match self.structs.get(struct_name).copied() {
                    Some(members) => self.check_location(scope, members, member, usage),
                    None => Type::Error,
                },
            },
            _ => Type::Error,
        }
    }

    /// Check an array index. Literal indices are range checked; any other
    /// index only has to be an `int`.
    fn check_index(
        &mut self,
        scope: ScopeId,
        name: &str,
        length: Option<i64>,
        index: &Expr,
        span: Span,
    ) {
        let Some(value) = index.literal_int() else {
            let ty = self.check_expr(scope, index);
            if ty != Type::Int {
                self.error(
                    CompileError::ArrayIndexType {
                        name: name.to_string(),
                        found: ty.display_name(),
                    },
                    span,
                );
            }
            return;
        };
        let out_of_range = value < 0 || length.is_some_and(|len| value >= len);
        if out_of_range {
            self.error(
                CompileError::ArrayIndex {
                    name: name.to_string(),
                    index: value,
                },
                span,
            );
        }
    }
}
