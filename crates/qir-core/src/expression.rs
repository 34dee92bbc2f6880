//! The QIR expression tree.
//!
//! A single tagged sum with boxed children. Binary algebraic operators
//! share one variant with a `BinaryOp` discriminant; everything else
//! gets a variant of its own. Expressions are immutable once built and
//! tree-shaped: each child is uniquely owned by its parent.

use std::fmt;
use std::rc::Rc;

use qir_bytecode::CodeObject;

use crate::native::NativeFunction;

/// Binary algebraic operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Div,
    Minus,
    Mod,
    Plus,
    Star,
    Power,
    And,
    Or,
    Equal,
    LowerOrEqual,
    LowerThan,
    GreaterOrEqual,
    GreaterThan,
}

impl BinaryOp {
    /// Operator name as it appears on the wire and in dumps.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Div => "Div",
            BinaryOp::Minus => "Minus",
            BinaryOp::Mod => "Mod",
            BinaryOp::Plus => "Plus",
            BinaryOp::Star => "Star",
            BinaryOp::Power => "Power",
            BinaryOp::And => "And",
            BinaryOp::Or => "Or",
            BinaryOp::Equal => "Equal",
            BinaryOp::LowerOrEqual => "LowerOrEqual",
            BinaryOp::LowerThan => "LowerThan",
            BinaryOp::GreaterOrEqual => "GreaterOrEqual",
            BinaryOp::GreaterThan => "GreaterThan",
        }
    }
}

/// A reference to a database server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Database {
    pub driver: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

/// A QIR expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    // Values
    Null,
    Boolean(bool),
    Number(i64),
    Double(f64),
    String(String),

    // Structural
    ListNil,
    /// Right-associated list cell: `ListCons(head, tail)`.
    ListCons(Box<Expression>, Box<Expression>),
    ListDestr {
        input: Box<Expression>,
        on_nil: Box<Expression>,
        on_cons: Box<Expression>,
    },
    TupleNil,
    /// Association cell: the first matching key from the head wins.
    TupleCons {
        key: Box<Expression>,
        value: Box<Expression>,
        tail: Box<Expression>,
    },
    TupleDestr {
        input: Box<Expression>,
        key: Box<Expression>,
    },

    // Functional
    Identifier(String),
    Lambda {
        parameter: String,
        body: Box<Expression>,
    },
    Application {
        function: Box<Expression>,
        argument: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        on_true: Box<Expression>,
        on_false: Box<Expression>,
    },
    /// The fixed-point combinator, materialisable on demand.
    Fixed,

    // Relational operators
    Scan(Box<Expression>),
    Filter {
        predicate: Box<Expression>,
        input: Box<Expression>,
    },
    Project {
        format: Box<Expression>,
        input: Box<Expression>,
    },
    Sort {
        key: Box<Expression>,
        ascending: Box<Expression>,
        input: Box<Expression>,
    },
    Limit {
        count: Box<Expression>,
        input: Box<Expression>,
    },
    Group {
        key: Box<Expression>,
        input: Box<Expression>,
    },
    Join {
        predicate: Box<Expression>,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    // Algebraic operators
    Not(Box<Expression>),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    // Specials
    /// Opaque host callable. Unserialisable, and poisons every
    /// enclosing subtree for remote evaluation.
    Native(NativeFunction),
    Builtin {
        module: String,
        name: String,
        function: NativeFunction,
    },
    Bytecode(Rc<CodeObject>),
    Database(Database),
    Table {
        database: Database,
        name: String,
    },
}

impl Expression {
    pub fn string(value: impl Into<String>) -> Self {
        Expression::String(value.into())
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn lambda(parameter: impl Into<String>, body: Expression) -> Self {
        Expression::Lambda {
            parameter: parameter.into(),
            body: Box::new(body),
        }
    }

    pub fn apply(function: Expression, argument: Expression) -> Self {
        Expression::Application {
            function: Box::new(function),
            argument: Box::new(argument),
        }
    }

    pub fn conditional(condition: Expression, on_true: Expression, on_false: Expression) -> Self {
        Expression::Conditional {
            condition: Box::new(condition),
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
        }
    }

    pub fn cons(head: Expression, tail: Expression) -> Self {
        Expression::ListCons(Box::new(head), Box::new(tail))
    }

    pub fn list_destr(input: Expression, on_nil: Expression, on_cons: Expression) -> Self {
        Expression::ListDestr {
            input: Box::new(input),
            on_nil: Box::new(on_nil),
            on_cons: Box::new(on_cons),
        }
    }

    pub fn tuple_cons(key: Expression, value: Expression, tail: Expression) -> Self {
        Expression::TupleCons {
            key: Box::new(key),
            value: Box::new(value),
            tail: Box::new(tail),
        }
    }

    pub fn tuple_destr(input: Expression, key: Expression) -> Self {
        Expression::TupleDestr {
            input: Box::new(input),
            key: Box::new(key),
        }
    }

    /// Attribute access: `TupleDestr(input, String(key))`.
    pub fn attr(input: Expression, key: impl Into<String>) -> Self {
        Expression::tuple_destr(input, Expression::String(key.into()))
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(element: Expression) -> Self {
        Expression::Not(Box::new(element))
    }

    pub fn scan(table: Expression) -> Self {
        Expression::Scan(Box::new(table))
    }

    pub fn filter(predicate: Expression, input: Expression) -> Self {
        Expression::Filter {
            predicate: Box::new(predicate),
            input: Box::new(input),
        }
    }

    pub fn project(format: Expression, input: Expression) -> Self {
        Expression::Project {
            format: Box::new(format),
            input: Box::new(input),
        }
    }

    pub fn sort(key: Expression, ascending: Expression, input: Expression) -> Self {
        Expression::Sort {
            key: Box::new(key),
            ascending: Box::new(ascending),
            input: Box::new(input),
        }
    }

    pub fn limit(count: Expression, input: Expression) -> Self {
        Expression::Limit {
            count: Box::new(count),
            input: Box::new(input),
        }
    }

    pub fn group(key: Expression, input: Expression) -> Self {
        Expression::Group {
            key: Box::new(key),
            input: Box::new(input),
        }
    }

    pub fn join(predicate: Expression, left: Expression, right: Expression) -> Self {
        Expression::Join {
            predicate: Box::new(predicate),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Fold a sequence of expressions into a right-associated list.
    pub fn list(items: impl IntoIterator<Item = Expression>) -> Self {
        let items: Vec<Expression> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(Expression::ListNil, |tail, head| Expression::cons(head, tail))
    }

    /// Whether this is a value variant (Null, Boolean, Number, Double,
    /// String).
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            Expression::Null
                | Expression::Boolean(_)
                | Expression::Number(_)
                | Expression::Double(_)
                | Expression::String(_)
        )
    }

    /// The variant name, as used on the wire and in dumps.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Expression::Null => "Null",
            Expression::Boolean(_) => "Boolean",
            Expression::Number(_) => "Number",
            Expression::Double(_) => "Double",
            Expression::String(_) => "String",
            Expression::ListNil => "ListNil",
            Expression::ListCons(..) => "ListCons",
            Expression::ListDestr { .. } => "ListDestr",
            Expression::TupleNil => "TupleNil",
            Expression::TupleCons { .. } => "TupleCons",
            Expression::TupleDestr { .. } => "TupleDestr",
            Expression::Identifier(_) => "Identifier",
            Expression::Lambda { .. } => "Lambda",
            Expression::Application { .. } => "Application",
            Expression::Conditional { .. } => "Conditional",
            Expression::Fixed => "Fixed",
            Expression::Scan(_) => "Scan",
            Expression::Filter { .. } => "Filter",
            Expression::Project { .. } => "Project",
            Expression::Sort { .. } => "Sort",
            Expression::Limit { .. } => "Limit",
            Expression::Group { .. } => "Group",
            Expression::Join { .. } => "Join",
            Expression::Not(_) => "Not",
            Expression::Binary { op, .. } => op.name(),
            Expression::Native(_) => "Native",
            Expression::Builtin { .. } => "Builtin",
            Expression::Bytecode(_) => "Bytecode",
            Expression::Database(_) => "Database",
            Expression::Table { .. } => "Table",
        }
    }

    /// Expression children, in field order.
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::ListCons(head, tail) => vec![head, tail],
            Expression::ListDestr {
                input,
                on_nil,
                on_cons,
            } => vec![input, on_nil, on_cons],
            Expression::TupleCons { key, value, tail } => vec![key, value, tail],
            Expression::TupleDestr { input, key } => vec![input, key],
            Expression::Lambda { body, .. } => vec![body],
            Expression::Application { function, argument } => vec![function, argument],
            Expression::Conditional {
                condition,
                on_true,
                on_false,
            } => vec![condition, on_true, on_false],
            Expression::Scan(table) => vec![table],
            Expression::Filter { predicate, input } => vec![predicate, input],
            Expression::Project { format, input } => vec![format, input],
            Expression::Sort {
                key,
                ascending,
                input,
            } => vec![key, ascending, input],
            Expression::Limit { count, input } => vec![count, input],
            Expression::Group { key, input } => vec![key, input],
            Expression::Join {
                predicate,
                left,
                right,
            } => vec![predicate, left, right],
            Expression::Not(element) => vec![element],
            Expression::Binary { left, right, .. } => vec![left, right],
            _ => Vec::new(),
        }
    }

    /// Whether a `Native` node occurs anywhere in the tree, which makes
    /// it unserialisable.
    pub fn contains_native(&self) -> bool {
        matches!(self, Expression::Native(_))
            || self.children().iter().any(|child| child.contains_native())
    }

    /// Substitute every free occurrence of `name` with `replacement`.
    /// Occurrences under a `Lambda` binding the same name are left
    /// untouched; the replacement's own free names are not renamed.
    pub fn substitute(&self, name: &str, replacement: &Expression) -> Expression {
        match self {
            Expression::Identifier(id) if id.as_str() == name => replacement.clone(),
            Expression::Lambda { parameter, .. } if parameter.as_str() == name => self.clone(),
            Expression::Lambda { parameter, body } => Expression::Lambda {
                parameter: parameter.clone(),
                body: Box::new(body.substitute(name, replacement)),
            },
            Expression::ListCons(head, tail) => Expression::cons(
                head.substitute(name, replacement),
                tail.substitute(name, replacement),
            ),
            Expression::ListDestr {
                input,
                on_nil,
                on_cons,
            } => Expression::list_destr(
                input.substitute(name, replacement),
                on_nil.substitute(name, replacement),
                on_cons.substitute(name, replacement),
            ),
            Expression::TupleCons { key, value, tail } => Expression::tuple_cons(
                key.substitute(name, replacement),
                value.substitute(name, replacement),
                tail.substitute(name, replacement),
            ),
            Expression::TupleDestr { input, key } => Expression::tuple_destr(
                input.substitute(name, replacement),
                key.substitute(name, replacement),
            ),
            Expression::Application { function, argument } => Expression::apply(
                function.substitute(name, replacement),
                argument.substitute(name, replacement),
            ),
            Expression::Conditional {
                condition,
                on_true,
                on_false,
            } => Expression::conditional(
                condition.substitute(name, replacement),
                on_true.substitute(name, replacement),
                on_false.substitute(name, replacement),
            ),
            Expression::Scan(table) => Expression::scan(table.substitute(name, replacement)),
            Expression::Filter { predicate, input } => Expression::filter(
                predicate.substitute(name, replacement),
                input.substitute(name, replacement),
            ),
            Expression::Project { format, input } => Expression::project(
                format.substitute(name, replacement),
                input.substitute(name, replacement),
            ),
            Expression::Sort {
                key,
                ascending,
                input,
            } => Expression::sort(
                key.substitute(name, replacement),
                ascending.substitute(name, replacement),
                input.substitute(name, replacement),
            ),
            Expression::Limit { count, input } => Expression::limit(
                count.substitute(name, replacement),
                input.substitute(name, replacement),
            ),
            Expression::Group { key, input } => Expression::group(
                key.substitute(name, replacement),
                input.substitute(name, replacement),
            ),
            Expression::Join {
                predicate,
                left,
                right,
            } => Expression::join(
                predicate.substitute(name, replacement),
                left.substitute(name, replacement),
                right.substitute(name, replacement),
            ),
            Expression::Not(element) => Expression::not(element.substitute(name, replacement)),
            Expression::Binary { op, left, right } => Expression::binary(
                *op,
                left.substitute(name, replacement),
                right.substitute(name, replacement),
            ),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Expression {
    /// Compact single-line rendering, `Variant(child, ...)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Null => f.write_str("Null"),
            Expression::Boolean(b) => write!(f, "Boolean({b})"),
            Expression::Number(n) => write!(f, "Number({n})"),
            Expression::Double(d) => write!(f, "Double({d})"),
            Expression::String(s) => write!(f, "String({s:?})"),
            Expression::ListNil => f.write_str("ListNil"),
            Expression::TupleNil => f.write_str("TupleNil"),
            Expression::Identifier(name) => write!(f, "Identifier({name:?})"),
            Expression::Lambda { parameter, body } => {
                write!(f, "Lambda(Identifier({parameter:?}), {body})")
            }
            Expression::Fixed => f.write_str("Fixed"),
            Expression::Native(_) => f.write_str("Native(<host>)"),
            Expression::Builtin { module, name, .. } => {
                write!(f, "Builtin({module:?}, {name:?})")
            }
            Expression::Bytecode(code) => write!(f, "Bytecode({:?})", code.name),
            Expression::Database(db) => write!(f, "Database({:?})", db.name),
            Expression::Table { database, name } => {
                write!(f, "Table(Database({:?}), {name:?})", database.name)
            }
            other => {
                write!(f, "{}(", other.variant_name())?;
                for (index, child) in other.children().into_iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}
