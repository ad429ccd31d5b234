use super::Value;
use indexmap::IndexSet;

/// Built-in functions callable from expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Abs,
    Min,
    Max,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(Function::Abs),
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Min => "min",
            Function::Max => "max",
        }
    }
}

/// The Abstract Syntax Tree of a compiled step expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Arithmetic
    Sum(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Modulo(Box<Expression>, Box<Expression>),
    Negate(Box<Expression>),

    // Logical
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Xor(Box<Expression>, Box<Expression>),

    // Comparison
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    SmallerThan(Box<Expression>, Box<Expression>),
    SmallerThanOrEqual(Box<Expression>, Box<Expression>),

    // Structure
    List(Vec<Expression>),
    Record(Vec<(String, Expression)>),
    Member(Box<Expression>, String),
    Index(Box<Expression>, Box<Expression>),
    Call(Function, Vec<Expression>),

    // Leaf nodes
    Literal(Value),
    Input(String),
}

impl Expression {
    /// Collects the names of every input the expression reads, in first-use order.
    pub fn collect_inputs(&self, names: &mut IndexSet<String>) {
        match self {
            Expression::Input(name) => {
                names.insert(name.clone());
            }
            Expression::Sum(l, r)
            | Expression::Subtract(l, r)
            | Expression::Multiply(l, r)
            | Expression::Divide(l, r)
            | Expression::Modulo(l, r)
            | Expression::And(l, r)
            | Expression::Or(l, r)
            | Expression::Xor(l, r)
            | Expression::Equal(l, r)
            | Expression::NotEqual(l, r)
            | Expression::GreaterThan(l, r)
            | Expression::GreaterThanOrEqual(l, r)
            | Expression::SmallerThan(l, r)
            | Expression::SmallerThanOrEqual(l, r)
            | Expression::Index(l, r) => {
                l.collect_inputs(names);
                r.collect_inputs(names);
            }
            Expression::Negate(v) | Expression::Not(v) | Expression::Member(v, _) => {
                v.collect_inputs(names);
            }
            Expression::List(items) | Expression::Call(_, items) => {
                for item in items {
                    item.collect_inputs(names);
                }
            }
            Expression::Record(fields) => {
                for (_, field) in fields {
                    field.collect_inputs(names);
                }
            }
            Expression::Literal(_) => {}
        }
    }

    /// Direct sub-expressions, left to right.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Sum(l, r)
            | Expression::Subtract(l, r)
            | Expression::Multiply(l, r)
            | Expression::Divide(l, r)
            | Expression::Modulo(l, r)
            | Expression::And(l, r)
            | Expression::Or(l, r)
            | Expression::Xor(l, r)
            | Expression::Equal(l, r)
            | Expression::NotEqual(l, r)
            | Expression::GreaterThan(l, r)
            | Expression::GreaterThanOrEqual(l, r)
            | Expression::SmallerThan(l, r)
            | Expression::SmallerThanOrEqual(l, r)
            | Expression::Index(l, r) => vec![l.as_ref(), r.as_ref()],
            Expression::Negate(v) | Expression::Not(v) | Expression::Member(v, _) => {
                vec![v.as_ref()]
            }
            Expression::List(items) | Expression::Call(_, items) => items.iter().collect(),
            Expression::Record(fields) => fields.iter().map(|(_, field)| field).collect(),
            Expression::Literal(_) | Expression::Input(_) => Vec::new(),
        }
    }

    /// Height of the tree; a leaf has depth 1. Walks iteratively.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((expression, depth)) = pending.pop() {
            deepest = deepest.max(depth);
            pending.extend(expression.children().into_iter().map(|child| (child, depth + 1)));
        }
        deepest
    }

    /// Convenience wrapper around [`Expression::collect_inputs`].
    pub fn input_names(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        self.collect_inputs(&mut names);
        names
    }
}
