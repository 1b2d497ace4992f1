use crate::language::span::Span;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub enum Statement {
    /// `function Name(params) { ... }` at statement level declares a
    /// constructor.
    Constructor(Rc<FunctionDef>),
    Let {
        name: String,
        value: Expr,
        span: Span,
    },
    Assign {
        target: AssignTarget,
        value: Expr,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Expr(Expr),
}

#[derive(Clone, Debug)]
pub enum AssignTarget {
    Variable(String),
    Property { object: Expr, key: String },
}

#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Undefined,
    This,
    Identifier(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        constructor: Box<Expr>,
        args: Vec<Expr>,
    },
    Function(Rc<FunctionDef>),
    /// `a + b + c` as one left-to-right chain. A parenthesised sum is a
    /// nested `Add` operand.
    Add(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Short source-like rendering used in help texts and error messages.
    pub fn as_source(&self) -> String {
        match &self.kind {
            ExprKind::Number(value) => crate::runtime::value::format_number(*value),
            ExprKind::String(value) => format!("{value:?}"),
            ExprKind::Bool(value) => value.to_string(),
            ExprKind::Null => "null".into(),
            ExprKind::Undefined => "undefined".into(),
            ExprKind::This => "this".into(),
            ExprKind::Identifier(name) => name.clone(),
            ExprKind::Member { object, property } => format!("{}.{}", object.as_source(), property),
            ExprKind::Call { callee, args } => {
                format!("{}({})", callee.as_source(), join_sources(args))
            }
            ExprKind::New { constructor, args } => {
                format!("new {}({})", constructor.as_source(), join_sources(args))
            }
            ExprKind::Function(def) => match &def.name {
                Some(name) => format!("function {name}(...)"),
                None => "function (...)".into(),
            },
            ExprKind::Add(operands) => operands
                .iter()
                .map(|operand| match operand.kind {
                    ExprKind::Add(_) => format!("({})", operand.as_source()),
                    _ => operand.as_source(),
                })
                .collect::<Vec<_>>()
                .join(" + "),
        }
    }
}

fn join_sources(args: &[Expr]) -> String {
    args.iter()
        .map(Expr::as_source)
        .collect::<Vec<_>>()
        .join(", ")
}
