//! Call-by-value local evaluation.
//!
//! The evaluator is a β-reducer threading an environment through the
//! tree. It never mutates its input; every result is a fresh
//! expression. Relational operators and database references are not
//! locally evaluable and surface `NotLocallyEvaluable` so the caller
//! can delegate to a remote evaluator.

use std::rc::Rc;

use qir_bytecode::CodeObject;

use crate::algebra::{apply_binary, apply_not};
use crate::encode::{decode, encode};
use crate::environment::Environment;
use crate::error::EvalError;
use crate::expression::Expression;

/// Hook turning a `Bytecode` node into an evaluable expression.
/// Installed by the orchestration layer, which owns the decompiler.
pub type BytecodeRealizer = Rc<dyn Fn(&CodeObject) -> Result<Expression, EvalError>>;

/// Local evaluator.
#[derive(Default)]
pub struct Evaluator {
    realizer: Option<BytecodeRealizer>,
}

/// Evaluate with an empty environment and no bytecode realizer.
pub fn evaluate(expression: &Expression) -> Result<Expression, EvalError> {
    Evaluator::new().evaluate(expression, &Environment::new())
}

/// Evaluate with the given environment and no bytecode realizer.
pub fn evaluate_with(
    expression: &Expression,
    environment: &Environment,
) -> Result<Expression, EvalError> {
    Evaluator::new().evaluate(expression, environment)
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the bytecode realizer.
    pub fn realizer(mut self, realizer: BytecodeRealizer) -> Self {
        self.realizer = Some(realizer);
        self
    }

    pub fn evaluate(
        &self,
        expression: &Expression,
        environment: &Environment,
    ) -> Result<Expression, EvalError> {
        match expression {
            // Values, nils, lambdas and natives evaluate to themselves.
            Expression::Null
            | Expression::Boolean(_)
            | Expression::Number(_)
            | Expression::Double(_)
            | Expression::String(_)
            | Expression::ListNil
            | Expression::TupleNil
            | Expression::Lambda { .. }
            | Expression::Native(_) => Ok(expression.clone()),

            // Free identifiers stay free; they may be resolved remotely
            // inside projections and filters.
            Expression::Identifier(name) => Ok(environment
                .get(name)
                .cloned()
                .unwrap_or_else(|| expression.clone())),

            Expression::Application { function, argument } => {
                self.evaluate_application(function, argument, environment)
            }

            Expression::Conditional {
                condition,
                on_true,
                on_false,
            } => {
                // Only the selected branch is evaluated.
                match self.evaluate(condition, environment)? {
                    Expression::Boolean(true) => self.evaluate(on_true, environment),
                    Expression::Boolean(false) => self.evaluate(on_false, environment),
                    other => Err(EvalError::Type(format!(
                        "conditional on {}",
                        other.variant_name()
                    ))),
                }
            }

            Expression::Fixed => Ok(y_combinator()),

            Expression::Not(element) => {
                let element = self.evaluate(element, environment)?;
                if !element.is_value() {
                    return Err(EvalError::NotLocallyEvaluable);
                }
                apply_not(&element)
            }

            Expression::Binary { op, left, right } => {
                // Left before right.
                let left = self.evaluate(left, environment)?;
                let right = self.evaluate(right, environment)?;
                if !left.is_value() || !right.is_value() {
                    return Err(EvalError::NotLocallyEvaluable);
                }
                apply_binary(*op, &left, &right)
            }

            Expression::ListCons(head, tail) => Ok(Expression::cons(
                self.evaluate(head, environment)?,
                self.evaluate(tail, environment)?,
            )),

            Expression::ListDestr {
                input,
                on_nil,
                on_cons,
            } => match self.evaluate(input, environment)? {
                Expression::ListNil => self.evaluate(on_nil, environment),
                Expression::ListCons(head, tail) => {
                    let applied =
                        Expression::apply(Expression::apply((**on_cons).clone(), *head), *tail);
                    self.evaluate(&applied, environment)
                }
                other => Err(EvalError::Type(format!(
                    "list destructor on {}",
                    other.variant_name()
                ))),
            },

            Expression::TupleCons { key, value, tail } => Ok(Expression::tuple_cons(
                self.evaluate(key, environment)?,
                self.evaluate(value, environment)?,
                self.evaluate(tail, environment)?,
            )),

            Expression::TupleDestr { input, key } => {
                let input = self.evaluate(input, environment)?;
                let key = self.evaluate(key, environment)?;
                if !matches!(key, Expression::String(_)) {
                    return Ok(Expression::Null);
                }
                tuple_lookup(&input, &key)
            }

            // Remote-only nodes.
            Expression::Scan(_)
            | Expression::Filter { .. }
            | Expression::Project { .. }
            | Expression::Sort { .. }
            | Expression::Limit { .. }
            | Expression::Group { .. }
            | Expression::Join { .. }
            | Expression::Database(_)
            | Expression::Table { .. } => Err(EvalError::NotLocallyEvaluable),

            Expression::Builtin { function, .. } => Ok(Expression::Native(function.clone())),

            Expression::Bytecode(code) => match &self.realizer {
                Some(realizer) => realizer(code),
                None => Err(EvalError::NotYetImplemented(
                    "bytecode realisation without a decompiler",
                )),
            },
        }
    }

    fn evaluate_application(
        &self,
        function: &Expression,
        argument: &Expression,
        environment: &Environment,
    ) -> Result<Expression, EvalError> {
        // Guarded fixed-point reduction. `Fixed f` and `(Fixed f) a`
        // collapse into one step binding the recursion parameter to a
        // re-entrant thunk; expanding the combinator naively would
        // diverge under call-by-value, and returning an intermediate
        // lambda would drop the recursion binding from the dynamic
        // environment.
        if let Expression::Application {
            function: inner,
            argument: recursive,
        } = function
        {
            if matches!(**inner, Expression::Fixed) {
                return self.apply_fixed(recursive, Some(argument), environment);
            }
        }
        if matches!(function, Expression::Fixed) {
            return self.apply_fixed(argument, None, environment);
        }

        // The argument is evaluated before the function.
        let argument = self.evaluate(argument, environment)?;
        let function = self.evaluate(function, environment)?;

        match function {
            Expression::Native(native) => Ok(encode(&native.call(decode(&argument)?)?)?),
            Expression::Lambda { parameter, body } => {
                let mut inner = environment.clone();
                inner.insert(parameter.clone(), argument.clone());
                let result = self.evaluate(&body, &inner)?;
                // The binding dies here; patch any unevaluated lambda
                // the body returned so curried chains keep their
                // earlier parameters.
                Ok(result.substitute(&parameter, &argument))
            }
            other => Err(EvalError::Type(format!(
                "application of {}",
                other.variant_name()
            ))),
        }
    }

    /// Reduce `Fixed f` (and `(Fixed f) a`) with the recursion
    /// parameter bound to `λv. (Fixed f) v`.
    fn apply_fixed(
        &self,
        recursive: &Expression,
        argument: Option<&Expression>,
        environment: &Environment,
    ) -> Result<Expression, EvalError> {
        let function = self.evaluate(recursive, environment)?;
        let Expression::Lambda {
            parameter: rec_name,
            body: rec_body,
        } = &function
        else {
            return Err(EvalError::Type(format!(
                "fixed point of {}",
                function.variant_name()
            )));
        };

        let reenter = Expression::lambda(
            "%fix",
            Expression::apply(
                Expression::apply(Expression::Fixed, function.clone()),
                Expression::ident("%fix"),
            ),
        );

        let Some(argument) = argument else {
            let mut inner = environment.clone();
            inner.insert(rec_name.clone(), reenter.clone());
            let result = self.evaluate(rec_body, &inner)?;
            return Ok(result.substitute(rec_name, &reenter));
        };

        let argument = self.evaluate(argument, environment)?;
        match &**rec_body {
            // The common thunked shape: bind recursion and argument in
            // one extended environment and evaluate the inner body.
            Expression::Lambda {
                parameter: arg_name,
                body: inner_body,
            } => {
                let mut inner = environment.clone();
                inner.insert(rec_name.clone(), reenter.clone());
                inner.insert(arg_name.clone(), argument.clone());
                let result = self.evaluate(inner_body, &inner)?;
                Ok(result
                    .substitute(rec_name, &reenter)
                    .substitute(arg_name, &argument))
            }
            _ => {
                let mut inner = environment.clone();
                inner.insert(rec_name.clone(), reenter.clone());
                let reduced = self
                    .evaluate(rec_body, &inner)?
                    .substitute(rec_name, &reenter);
                match reduced {
                    Expression::Lambda { parameter, body } => {
                        let mut env = environment.clone();
                        env.insert(parameter.clone(), argument.clone());
                        let result = self.evaluate(&body, &env)?;
                        Ok(result.substitute(&parameter, &argument))
                    }
                    Expression::Native(native) => {
                        Ok(encode(&native.call(decode(&argument)?)?)?)
                    }
                    other => Err(EvalError::Type(format!(
                        "application of {}",
                        other.variant_name()
                    ))),
                }
            }
        }
    }
}

/// Head-first traversal; the first matching key wins.
fn tuple_lookup(input: &Expression, key: &Expression) -> Result<Expression, EvalError> {
    match input {
        Expression::TupleNil => Ok(Expression::Null),
        Expression::TupleCons {
            key: head_key,
            value,
            tail,
        } => {
            if **head_key == *key {
                Ok((**value).clone())
            } else {
                tuple_lookup(tail, key)
            }
        }
        other => Err(EvalError::Type(format!(
            "tuple destructor on {}",
            other.variant_name()
        ))),
    }
}

/// The Y combinator, expressed in pure QIR:
/// `λf.(λx.f(x x))(λx.f(x x))`.
fn y_combinator() -> Expression {
    let half = || {
        Expression::lambda(
            "x",
            Expression::apply(
                Expression::ident("f"),
                Expression::apply(Expression::ident("x"), Expression::ident("x")),
            ),
        )
    };
    Expression::lambda("f", Expression::apply(half(), half()))
}
