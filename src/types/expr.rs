use std::fmt;

use ruint::aliases::U256;

/// Tallest expression the compiler accepts and the decompiler rebuilds.
///
/// Each operator, `NOT` and mapped tracker read adds a level, and so does
/// each pair of parentheses while parsing.
pub const MAX_DEPTH: usize = 64;

/// Infix operators, grouped by precedence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Lt,
    Gt,
    Eq,
    Gte,
    Lte,
    Neq,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Binding strength, loosest first: `AND`, `OR`, (`NOT`), comparisons,
    /// additive, multiplicative.
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::And => 1,
            BinaryOp::Or => 2,
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Eq
            | BinaryOp::Gte
            | BinaryOp::Lte
            | BinaryOp::Neq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div => 6,
        }
    }

    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    #[must_use]
    pub fn is_comparison(self) -> bool {
        self.precedence() == 4
    }

    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        self.precedence() >= 5
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Eq => "==",
            BinaryOp::Gte => ">=",
            BinaryOp::Lte => "<=",
            BinaryOp::Neq => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Assignment operators accepted on a `TRU:` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    /// The arithmetic operator a compound assignment expands to.
    #[must_use]
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
        }
    }

    #[must_use]
    pub fn from_binary(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Add => Some(AssignOp::AddAssign),
            BinaryOp::Sub => Some(AssignOp::SubAssign),
            BinaryOp::Mul => Some(AssignOp::MulAssign),
            BinaryOp::Div => Some(AssignOp::DivAssign),
            _ => None,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A reference as written in source text, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    /// A bare identifier: an argument, a global variable, or a text literal.
    Ident(String),
    /// `FC:name` or `FC:name(args)`. The argument text is kept verbatim.
    ForeignCall { name: String, args: Option<String> },
    /// `TR:name`, or `TRU:name` when `update` is set.
    Tracker { name: String, update: bool },
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Ident(name) => f.write_str(name),
            Symbol::ForeignCall { name, args: None } => write!(f, "FC:{name}"),
            Symbol::ForeignCall {
                name,
                args: Some(args),
            } => write!(f, "FC:{name}({args})"),
            Symbol::Tracker {
                name,
                update: false,
            } => write!(f, "TR:{name}"),
            Symbol::Tracker { name, update: true } => write!(f, "TRU:{name}"),
        }
    }
}

/// Binary expression tree over references of type `R`.
///
/// The parser produces `Expr<Symbol>`; name resolution turns it into
/// `Expr<ReferenceBinding>`, which is what the instruction compiler walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr<R> {
    Number(U256),
    Text(String),
    Bytes(Vec<u8>),
    Ref(R),
    /// Read of a mapped tracker at `key`.
    MappedTracker { tracker: R, key: Box<Expr<R>> },
    Not(Box<Expr<R>>),
    Binary {
        op: BinaryOp,
        left: Box<Expr<R>>,
        right: Box<Expr<R>>,
    },
}

impl<R> Expr<R> {
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expr<R>, right: Expr<R>) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Binding strength of this node; leaves bind tightest.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Not(_) => 3,
            _ => 7,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.precedence() == 7
    }
}

/// A full effect expression: either a plain expression or a tracker update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<R> {
    Expr(Expr<R>),
    TrackerUpdate {
        tracker: R,
        key: Option<Expr<R>>,
        op: AssignOp,
        value: Expr<R>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_tiers_are_ordered() {
        assert!(BinaryOp::And.precedence() < BinaryOp::Or.precedence());
        assert!(BinaryOp::Or.precedence() < BinaryOp::Gt.precedence());
        assert!(BinaryOp::Gt.precedence() < BinaryOp::Add.precedence());
        assert!(BinaryOp::Add.precedence() < BinaryOp::Mul.precedence());
    }

    #[test]
    fn op_classes() {
        assert!(BinaryOp::Or.is_logical());
        assert!(BinaryOp::Neq.is_comparison());
        assert!(BinaryOp::Div.is_arithmetic());
        assert!(!BinaryOp::Lte.is_arithmetic());
    }

    #[test]
    fn compound_assignment_mapping() {
        for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
            let assign = AssignOp::from_binary(op).unwrap();
            assert_eq!(assign.binary(), Some(op));
            assert_eq!(assign.symbol(), format!("{op}="));
        }
        assert_eq!(AssignOp::from_binary(BinaryOp::Eq), None);
        assert_eq!(AssignOp::Assign.binary(), None);
    }

    #[test]
    fn symbol_display() {
        let fc = Symbol::ForeignCall {
            name: "getScore".into(),
            args: Some("to".into()),
        };
        assert_eq!(fc.to_string(), "FC:getScore(to)");
        let tru = Symbol::Tracker {
            name: "balance".into(),
            update: true,
        };
        assert_eq!(tru.to_string(), "TRU:balance");
    }

    #[test]
    fn leaf_precedence() {
        let leaf: Expr<Symbol> = Expr::Number(U256::from(1u64));
        let not = Expr::Not(Box::new(leaf.clone()));
        assert!(leaf.is_leaf());
        assert_eq!(not.precedence(), 3);
        let sum = Expr::binary(BinaryOp::Add, leaf.clone(), leaf);
        assert_eq!(sum.precedence(), 5);
    }
}
