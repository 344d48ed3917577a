use decaf_common::Span;
use serde::{Deserialize, Serialize};

/// Parser-assigned identity of a node that opens a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Program (top-level)
// ============================================================================

/// A complete, syntactically valid Decaf program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: NodeId,
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

// ============================================================================
// Declarations
// ============================================================================

/// A declaration, at top level, inside a struct body or at the head of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Declaration {
    Struct(StructDecl),
    Var(VarDecl),
    Array(ArrayDecl),
    Method(MethodDecl),
}

/// ```decaf
/// struct Point { int x; int y; }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub id: NodeId,
    pub name: String,
    pub members: Vec<Declaration>,
    pub span: Span,
}

/// The declared type of a variable or array.
///
/// Either a type name (`int`, `Point`) or an inline struct declaration
/// (`struct Point { ... } p;`), which declares the struct and uses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Named(String),
    Struct(Box<StructDecl>),
}

impl From<&str> for TypeSpec {
    fn from(name: &str) -> Self {
        TypeSpec::Named(name.to_string())
    }
}

/// `int x;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub ty: TypeSpec,
    pub name: String,
    pub span: Span,
}

/// `int xs[10];`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDecl {
    pub ty: TypeSpec,
    pub name: String,
    pub length: i64,
    pub span: Span,
}

/// `int add(int a, int b) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub id: NodeId,
    pub return_type: String,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParamKind {
    #[default]
    Variable,
    /// `int xs[]`
    Array,
}

/// A method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub kind: ParamKind,
    pub ty: String,
    pub name: String,
    pub span: Span,
}

/// `{ declarations* statements* }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    #[serde(default)]
    pub statements: Vec<Stmt>,
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Stmt {
    If(IfStmt),
    While(WhileStmt),
    Return(ReturnStmt),
    Assign(AssignStmt),
    Call(MethodCall),
}

/// `if (cond) { ... } [else { ... }]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub id: NodeId,
    pub condition: Expr,
    pub body: Block,
    #[serde(default)]
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

/// The `else` block of an `if`. It opens its own scope, hence the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElseBranch {
    pub id: NodeId,
    pub body: Block,
}

/// `while (cond) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub id: NodeId,
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

/// `return [expr];`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    #[serde(default)]
    pub value: Option<Expr>,
    pub span: Span,
}

/// `location = expr;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub target: Location,
    pub value: Expr,
    pub span: Span,
}

/// `name(args...)`, as a statement or inside an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expr>,
    pub span: Span,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Expr {
    Location(Location),
    Call(MethodCall),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Literal(Literal),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Location(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Literal(e) => e.span,
        }
    }

    pub fn int(value: i64, span: Span) -> Self {
        Expr::Literal(Literal {
            value: LiteralValue::Int(value),
            span,
        })
    }

    pub fn char(value: char, span: Span) -> Self {
        Expr::Literal(Literal {
            value: LiteralValue::Char(value),
            span,
        })
    }

    pub fn bool(value: bool, span: Span) -> Self {
        Expr::Literal(Literal {
            value: LiteralValue::Bool(value),
            span,
        })
    }

    pub fn var(name: &str, span: Span) -> Self {
        Expr::Location(Location::new(name, span))
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        let span = left.span();
        Expr::Binary(BinaryExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
            span,
        })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        let span = operand.span();
        Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    /// The value of a statically known integer index: a literal, or `-`
    /// applied directly to one.
    pub fn literal_int(&self) -> Option<i64> {
        match self {
            Expr::Literal(Literal {
                value: LiteralValue::Int(v),
                ..
            }) => Some(*v),
            Expr::Unary(UnaryExpr {
                op: UnaryOp::Neg,
                operand,
                ..
            }) => match operand.as_ref() {
                Expr::Literal(Literal {
                    value: LiteralValue::Int(v),
                    ..
                }) => v.checked_neg(),
                _ => None,
            },
            _ => None,
        }
    }
}

/// An identifier, optionally indexed and/or followed by a member access:
/// `x`, `xs[3]`, `p.x`, `ps[0].pos.x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub index: Option<Box<Expr>>,
    #[serde(default)]
    pub member: Option<Box<Location>>,
    pub span: Span,
}

impl Location {
    pub fn new(name: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            index: None,
            member: None,
            span,
        }
    }

    pub fn with_index(mut self, index: Expr) -> Self {
        self.index = Some(Box::new(index));
        self
    }

    pub fn with_member(mut self, member: Location) -> Self {
        self.member = Some(Box::new(member));
        self
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if self.index.is_some() {
            f.write_str("[..]")?;
        }
        if let Some(member) = &self.member {
            write!(f, ".{member}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Int(i64),
    Char(char),
    Bool(bool),
}

/// Binary operators, grouped by the grammar's precedence families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFamily {
    Mul,
    Add,
    Rel,
    Eq,
    Cond,
}

impl BinaryOp {
    pub fn family(self) -> OpFamily {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => OpFamily::Mul,
            BinaryOp::Add | BinaryOp::Sub => OpFamily::Add,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Lte | BinaryOp::Gte => OpFamily::Rel,
            BinaryOp::Eq | BinaryOp::Neq => OpFamily::Eq,
            BinaryOp::And | BinaryOp::Or => OpFamily::Cond,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Lte => "<=",
            BinaryOp::Gte => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation `-`
    #[serde(rename = "-")]
    Neg,
    /// Boolean negation `!`
    #[serde(rename = "!")]
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// Errors raised while loading a serialized parse tree.
#[derive(Debug, thiserror::Error)]
pub enum AstError {
    #[error("invalid parse tree: {0}")]
    Json(#[from] serde_json::Error),
}

impl Program {
    /// Load a parse tree serialized as JSON by the external parser.
    pub fn from_json(source: &str) -> Result<Program, AstError> {
        Ok(serde_json::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn literal_int_sees_through_negation() {
        let span = Span::line(1);
        assert_eq!(Expr::int(4, span).literal_int(), Some(4));
        assert_eq!(
            Expr::unary(UnaryOp::Neg, Expr::int(2, span)).literal_int(),
            Some(-2)
        );
        assert_eq!(Expr::var("i", span).literal_int(), None);
        assert_eq!(
            Expr::binary(Expr::int(1, span), BinaryOp::Add, Expr::int(1, span)).literal_int(),
            None
        );
    }

    #[test]
    fn operator_families() {
        assert_eq!(BinaryOp::Mod.family(), OpFamily::Mul);
        assert_eq!(BinaryOp::Sub.family(), OpFamily::Add);
        assert_eq!(BinaryOp::Gte.family(), OpFamily::Rel);
        assert_eq!(BinaryOp::Neq.family(), OpFamily::Eq);
        assert_eq!(BinaryOp::Or.family(), OpFamily::Cond);
    }

    #[test]
    fn parse_tree_from_json() {
        let json = r#"{
            "id": 0,
            "span": {"line": 1},
            "declarations": [
                {"kind": "Var", "ty": "int", "name": "x", "span": {"line": 1}},
                {"kind": "Var", "name": "p", "span": {"line": 2},
                 "ty": {"id": 1, "name": "P", "span": {"line": 2}, "members": []}},
                {"kind": "Method", "id": 2, "return_type": "void", "name": "main",
                 "span": {"line": 3},
                 "params": [{"kind": "Array", "ty": "int", "name": "xs", "span": {"line": 3}}],
                 "body": {"span": {"line": 3}, "statements": [
                    {"kind": "Assign", "span": {"line": 4},
                     "target": {"name": "x", "span": {"line": 4}},
                     "value": {"kind": "Binary", "op": "+", "span": {"line": 4},
                               "left": {"kind": "Literal", "value": {"Int": 1},
                                        "span": {"line": 4}},
                               "right": {"kind": "Location", "name": "x", "span": {"line": 4}}}}
                 ]}}
            ]
        }"#;
        let program = Program::from_json(json).unwrap();
        assert_eq!(program.declarations.len(), 3);
        assert!(matches!(
            &program.declarations[0],
            Declaration::Var(VarDecl { ty: TypeSpec::Named(t), .. }) if t == "int"
        ));
        assert!(matches!(
            &program.declarations[1],
            Declaration::Var(VarDecl { ty: TypeSpec::Struct(s), .. }) if s.name == "P"
        ));
        let Declaration::Method(main) = &program.declarations[2] else {
            panic!("expected method");
        };
        assert_eq!(main.params[0].kind, ParamKind::Array);
        let Stmt::Assign(assign) = &main.body.statements[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(&assign.value, Expr::Binary(b) if b.op == BinaryOp::Add));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            Program::from_json("{\"declarations\": 3}"),
            Err(AstError::Json(_))
        ));
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId(7).to_string(), "#7");
    }

    #[test]
    fn location_display() {
        let loc = Location::new("ps", Span::line(1))
            .with_index(Expr::int(0, Span::line(1)))
            .with_member(Location::new("x", Span::line(1)));
        assert_eq!(loc.to_string(), "ps[..].x");
    }
}
