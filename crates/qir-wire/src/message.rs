//! The message mirror of the expression algebra.
//!
//! One variant per algebra variant (binary operators spelled out by
//! name, as the schema demands), one field per declared serialisable
//! field. `Builtin.function` and `Bytecode.code` are flagged
//! unserialisable and skipped; a `Native` anywhere fails the whole
//! conversion.

use serde::{Deserialize, Serialize};

use qir_core::{BinaryOp, Database, Expression, NativeFunction};

use crate::error::WireError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMessage {
    pub driver: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Null,
    Boolean { value: bool },
    Number { value: i64 },
    Double { value: f64 },
    String { value: String },

    ListNil,
    ListCons { head: Box<Message>, tail: Box<Message> },
    ListDestr { input: Box<Message>, on_nil: Box<Message>, on_cons: Box<Message> },
    TupleNil,
    TupleCons { key: Box<Message>, value: Box<Message>, tail: Box<Message> },
    TupleDestr { input: Box<Message>, key: Box<Message> },

    Identifier { name: String },
    Lambda { parameter: String, body: Box<Message> },
    Application { function: Box<Message>, argument: Box<Message> },
    Conditional { condition: Box<Message>, on_true: Box<Message>, on_false: Box<Message> },
    Fixed,

    Scan { table: Box<Message> },
    Filter { predicate: Box<Message>, input: Box<Message> },
    Project { format: Box<Message>, input: Box<Message> },
    Sort { key: Box<Message>, ascending: Box<Message>, input: Box<Message> },
    Limit { count: Box<Message>, input: Box<Message> },
    Group { key: Box<Message>, input: Box<Message> },
    Join { predicate: Box<Message>, left: Box<Message>, right: Box<Message> },

    Not { element: Box<Message> },
    Div { left: Box<Message>, right: Box<Message> },
    Minus { left: Box<Message>, right: Box<Message> },
    Mod { left: Box<Message>, right: Box<Message> },
    Plus { left: Box<Message>, right: Box<Message> },
    Star { left: Box<Message>, right: Box<Message> },
    Power { left: Box<Message>, right: Box<Message> },
    And { left: Box<Message>, right: Box<Message> },
    Or { left: Box<Message>, right: Box<Message> },
    Equal { left: Box<Message>, right: Box<Message> },
    LowerOrEqual { left: Box<Message>, right: Box<Message> },
    LowerThan { left: Box<Message>, right: Box<Message> },
    GreaterOrEqual { left: Box<Message>, right: Box<Message> },
    GreaterThan { left: Box<Message>, right: Box<Message> },

    /// The host callable is unserialisable and skipped.
    Builtin { module: String, name: String },
    /// The code object is unserialisable and skipped, so this message
    /// is a marker that cannot be reconstructed.
    Bytecode,
    Database { database: DatabaseMessage },
    Table { database: DatabaseMessage, name: String },
}

/// Host-side capability resolving a skipped `Builtin` callable when a
/// message is reconstructed.
pub trait BuiltinResolver {
    fn resolve(&self, module: &str, name: &str) -> Option<NativeFunction>;
}

/// A resolver that knows no builtins.
pub struct NoBuiltins;

impl BuiltinResolver for NoBuiltins {
    fn resolve(&self, _module: &str, _name: &str) -> Option<NativeFunction> {
        None
    }
}

fn database_message(database: &Database) -> DatabaseMessage {
    DatabaseMessage {
        driver: database.driver.clone(),
        name: database.name.clone(),
        host: database.host.clone(),
        port: database.port,
        user: database.user.clone(),
        password: database.password.clone(),
    }
}

fn database_expression(message: &DatabaseMessage) -> Database {
    Database {
        driver: message.driver.clone(),
        name: message.name.clone(),
        host: message.host.clone(),
        port: message.port,
        user: message.user.clone(),
        password: message.password.clone(),
    }
}

/// Mirror an expression into its message. Fails on any subtree
/// containing a `Native` node.
pub fn to_message(expression: &Expression) -> Result<Message, WireError> {
    let node = |expression: &Expression| to_message(expression).map(Box::new);

    Ok(match expression {
        Expression::Native(_) => return Err(WireError::NotSerializable),

        Expression::Null => Message::Null,
        Expression::Boolean(value) => Message::Boolean { value: *value },
        Expression::Number(value) => Message::Number { value: *value },
        Expression::Double(value) => Message::Double { value: *value },
        Expression::String(value) => Message::String { value: value.clone() },

        Expression::ListNil => Message::ListNil,
        Expression::ListCons(head, tail) => Message::ListCons {
            head: node(head)?,
            tail: node(tail)?,
        },
        Expression::ListDestr { input, on_nil, on_cons } => Message::ListDestr {
            input: node(input)?,
            on_nil: node(on_nil)?,
            on_cons: node(on_cons)?,
        },
        Expression::TupleNil => Message::TupleNil,
        Expression::TupleCons { key, value, tail } => Message::TupleCons {
            key: node(key)?,
            value: node(value)?,
            tail: node(tail)?,
        },
        Expression::TupleDestr { input, key } => Message::TupleDestr {
            input: node(input)?,
            key: node(key)?,
        },

        Expression::Identifier(name) => Message::Identifier { name: name.clone() },
        Expression::Lambda { parameter, body } => Message::Lambda {
            parameter: parameter.clone(),
            body: node(body)?,
        },
        Expression::Application { function, argument } => Message::Application {
            function: node(function)?,
            argument: node(argument)?,
        },
        Expression::Conditional { condition, on_true, on_false } => Message::Conditional {
            condition: node(condition)?,
            on_true: node(on_true)?,
            on_false: node(on_false)?,
        },
        Expression::Fixed => Message::Fixed,

        Expression::Scan(table) => Message::Scan { table: node(table)? },
        Expression::Filter { predicate, input } => Message::Filter {
            predicate: node(predicate)?,
            input: node(input)?,
        },
        Expression::Project { format, input } => Message::Project {
            format: node(format)?,
            input: node(input)?,
        },
        Expression::Sort { key, ascending, input } => Message::Sort {
            key: node(key)?,
            ascending: node(ascending)?,
            input: node(input)?,
        },
        Expression::Limit { count, input } => Message::Limit {
            count: node(count)?,
            input: node(input)?,
        },
        Expression::Group { key, input } => Message::Group {
            key: node(key)?,
            input: node(input)?,
        },
        Expression::Join { predicate, left, right } => Message::Join {
            predicate: node(predicate)?,
            left: node(left)?,
            right: node(right)?,
        },

        Expression::Not(element) => Message::Not { element: node(element)? },
        Expression::Binary { op, left, right } => {
            let left = node(left)?;
            let right = node(right)?;
            match op {
                BinaryOp::Div => Message::Div { left, right },
                BinaryOp::Minus => Message::Minus { left, right },
                BinaryOp::Mod => Message::Mod { left, right },
                BinaryOp::Plus => Message::Plus { left, right },
                BinaryOp::Star => Message::Star { left, right },
                BinaryOp::Power => Message::Power { left, right },
                BinaryOp::And => Message::And { left, right },
                BinaryOp::Or => Message::Or { left, right },
                BinaryOp::Equal => Message::Equal { left, right },
                BinaryOp::LowerOrEqual => Message::LowerOrEqual { left, right },
                BinaryOp::LowerThan => Message::LowerThan { left, right },
                BinaryOp::GreaterOrEqual => Message::GreaterOrEqual { left, right },
                BinaryOp::GreaterThan => Message::GreaterThan { left, right },
            }
        }

        Expression::Builtin { module, name, .. } => Message::Builtin {
            module: module.clone(),
            name: name.clone(),
        },
        Expression::Bytecode(_) => Message::Bytecode,
        Expression::Database(database) => Message::Database {
            database: database_message(database),
        },
        Expression::Table { database, name } => Message::Table {
            database: database_message(database),
            name: name.clone(),
        },
    })
}

/// Rebuild an expression from a message. Builtins resolve their
/// callable through `resolver`; `Bytecode` markers cannot come back.
pub fn from_message(
    message: &Message,
    resolver: &dyn BuiltinResolver,
) -> Result<Expression, WireError> {
    let node = |message: &Message| from_message(message, resolver);
    let binary = |op: BinaryOp, left: &Message, right: &Message| -> Result<Expression, WireError> {
        Ok(Expression::binary(
            op,
            from_message(left, resolver)?,
            from_message(right, resolver)?,
        ))
    };

    Ok(match message {
        Message::Null => Expression::Null,
        Message::Boolean { value } => Expression::Boolean(*value),
        Message::Number { value } => Expression::Number(*value),
        Message::Double { value } => Expression::Double(*value),
        Message::String { value } => Expression::String(value.clone()),

        Message::ListNil => Expression::ListNil,
        Message::ListCons { head, tail } => Expression::cons(node(head)?, node(tail)?),
        Message::ListDestr { input, on_nil, on_cons } => {
            Expression::list_destr(node(input)?, node(on_nil)?, node(on_cons)?)
        }
        Message::TupleNil => Expression::TupleNil,
        Message::TupleCons { key, value, tail } => {
            Expression::tuple_cons(node(key)?, node(value)?, node(tail)?)
        }
        Message::TupleDestr { input, key } => Expression::tuple_destr(node(input)?, node(key)?),

        Message::Identifier { name } => Expression::ident(name.clone()),
        Message::Lambda { parameter, body } => Expression::lambda(parameter.clone(), node(body)?),
        Message::Application { function, argument } => {
            Expression::apply(node(function)?, node(argument)?)
        }
        Message::Conditional { condition, on_true, on_false } => {
            Expression::conditional(node(condition)?, node(on_true)?, node(on_false)?)
        }
        Message::Fixed => Expression::Fixed,

        Message::Scan { table } => Expression::scan(node(table)?),
        Message::Filter { predicate, input } => Expression::filter(node(predicate)?, node(input)?),
        Message::Project { format, input } => Expression::project(node(format)?, node(input)?),
        Message::Sort { key, ascending, input } => {
            Expression::sort(node(key)?, node(ascending)?, node(input)?)
        }
        Message::Limit { count, input } => Expression::limit(node(count)?, node(input)?),
        Message::Group { key, input } => Expression::group(node(key)?, node(input)?),
        Message::Join { predicate, left, right } => {
            Expression::join(node(predicate)?, node(left)?, node(right)?)
        }

        Message::Not { element } => Expression::not(node(element)?),
        Message::Div { left, right } => binary(BinaryOp::Div, left, right)?,
        Message::Minus { left, right } => binary(BinaryOp::Minus, left, right)?,
        Message::Mod { left, right } => binary(BinaryOp::Mod, left, right)?,
        Message::Plus { left, right } => binary(BinaryOp::Plus, left, right)?,
        Message::Star { left, right } => binary(BinaryOp::Star, left, right)?,
        Message::Power { left, right } => binary(BinaryOp::Power, left, right)?,
        Message::And { left, right } => binary(BinaryOp::And, left, right)?,
        Message::Or { left, right } => binary(BinaryOp::Or, left, right)?,
        Message::Equal { left, right } => binary(BinaryOp::Equal, left, right)?,
        Message::LowerOrEqual { left, right } => binary(BinaryOp::LowerOrEqual, left, right)?,
        Message::LowerThan { left, right } => binary(BinaryOp::LowerThan, left, right)?,
        Message::GreaterOrEqual { left, right } => binary(BinaryOp::GreaterOrEqual, left, right)?,
        Message::GreaterThan { left, right } => binary(BinaryOp::GreaterThan, left, right)?,

        Message::Builtin { module, name } => {
            let function = resolver.resolve(module, name).ok_or_else(|| {
                WireError::UnknownBuiltin {
                    module: module.clone(),
                    name: name.clone(),
                }
            })?;
            Expression::Builtin {
                module: module.clone(),
                name: name.clone(),
                function,
            }
        }
        Message::Bytecode => return Err(WireError::NotUnserializable),
        Message::Database { database } => Expression::Database(database_expression(database)),
        Message::Table { database, name } => Expression::Table {
            database: database_expression(database),
            name: name.clone(),
        },
    })
}

/// Frame a message with postcard.
pub fn encode_wire(message: &Message) -> Result<Vec<u8>, WireError> {
    postcard::to_allocvec(message).map_err(|error| WireError::Codec(error.to_string()))
}

/// Read a postcard-framed message.
pub fn decode_wire(bytes: &[u8]) -> Result<Message, WireError> {
    postcard::from_bytes(bytes).map_err(|error| WireError::Codec(error.to_string()))
}
