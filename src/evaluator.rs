use crate::error::{LilithError, Span};
use crate::operator::{AssignOp, BinaryOp};
use crate::value::Value;
use std::collections::HashMap;
use std::io::{self, Write};
use tracing::debug;

/// Variable bindings for one program run.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn assign(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One flag per open conditional block. Effects are permitted only while
/// every flag is `true`; an empty stack means top level.
#[derive(Debug, Clone, Default)]
pub struct ActivationStack {
    flags: Vec<bool>,
}

impl ActivationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, active: bool) {
        self.flags.push(active);
    }

    pub fn pop(&mut self) -> Option<bool> {
        self.flags.pop()
    }

    pub fn depth(&self) -> usize {
        self.flags.len()
    }

    pub fn is_active(&self) -> bool {
        self.flags.iter().all(|&flag| flag)
    }
}

/// Runtime state a program executes against: bindings, the activation
/// stack and the sink that `[o]` writes to.
pub struct Evaluator<W: Write = io::Stdout> {
    environment: Environment,
    activation: ActivationStack,
    output: W,
}

impl Evaluator<io::Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Evaluator<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Evaluator<W> {
    pub fn with_output(output: W) -> Self {
        Self {
            environment: Environment::new(),
            activation: ActivationStack::new(),
            output,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn is_active(&self) -> bool {
        self.activation.is_active()
    }

    pub fn depth(&self) -> usize {
        self.activation.depth()
    }

    pub fn open_block(&mut self, active: bool) {
        self.activation.push(active);
        debug!(depth = self.activation.depth(), active, "block opened");
    }

    pub fn close_block(&mut self) {
        let flag = self.activation.pop();
        debug!(depth = self.activation.depth(), ?flag, "block closed");
    }

    /// Drop any blocks left open by a statement that failed part way.
    pub fn reset_blocks(&mut self) {
        while self.activation.pop().is_some() {}
    }

    /// A bound name yields its stored value; anything else is classified
    /// from its own text, which for an identifier means `Undefined`.
    pub fn resolve(&self, name: &str) -> Value {
        match self.environment.get(name) {
            Some(value) => value.clone().normalize(),
            None => Value::from_text(name),
        }
    }

    pub fn guard(&self, value: &Value, span: Span) -> Result<bool, LilithError> {
        value.truthiness().ok_or_else(|| {
            LilithError::eval_error_with_help(
                span,
                format!("Condition must be a number, found {}", value.type_name()),
                "A guard is true when it is a nonzero number and false when it is zero.".to_string(),
            )
        })
    }

    pub fn assign(
        &mut self,
        name: &str,
        operator: AssignOp,
        value: Value,
        span: Span,
    ) -> Result<(), LilithError> {
        if !self.is_active() {
            return Ok(());
        }

        let value = match operator.arithmetic() {
            None => value.normalize(),
            Some(arithmetic) => {
                let current = match self.environment.get(name) {
                    Some(current @ Value::Number(_)) => current.clone(),
                    Some(other) => {
                        return Err(LilithError::eval_error(
                            span,
                            format!(
                                "Cannot apply '{}' to '{}', which holds a {}",
                                operator,
                                name,
                                other.type_name()
                            ),
                        ))
                    }
                    None => {
                        return Err(LilithError::eval_error_with_help(
                            span,
                            format!("Cannot apply '{}' to unbound variable '{}'", operator, name),
                            format!("Bind it first, for example '{} = 0 ->'.", name),
                        ))
                    }
                };
                self.evaluate_binary_op(arithmetic, current, value, span)?
            }
        };

        debug!(variable = name, %value, "assign");
        self.environment.assign(name, value);
        Ok(())
    }

    pub fn write_output(&mut self, value: &Value, span: Span) -> Result<(), LilithError> {
        if !self.is_active() {
            return Ok(());
        }

        writeln!(self.output, "{}", value).map_err(|error| {
            LilithError::eval_error(span, format!("Failed to write output: {}", error))
        })
    }

    /// Apply `operator`, or skip it inside an inactive block.
    pub fn binary(
        &self,
        operator: BinaryOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> Result<Value, LilithError> {
        if !self.is_active() {
            return Ok(Value::Undefined);
        }
        self.evaluate_binary_op(operator, left, right, span)
    }

    fn evaluate_binary_op(
        &self,
        operator: BinaryOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> Result<Value, LilithError> {
        match operator {
            BinaryOp::Equal => return Ok(Value::from_bool(self.is_equal(&left, &right))),
            BinaryOp::NotEqual => return Ok(Value::from_bool(!self.is_equal(&left, &right))),
            _ => {}
        }

        let (l, r) = match (&left, &right) {
            (Value::Number(l), Value::Number(r)) => (*l, *r),
            _ => {
                return Err(LilithError::eval_error_with_help(
                    span,
                    format!(
                        "Cannot apply '{}' to {} and {}",
                        operator,
                        left.type_name(),
                        right.type_name()
                    ),
                    "Arithmetic and ordering operators only work on numbers.".to_string(),
                ))
            }
        };

        let result = match operator {
            BinaryOp::Add => Value::Number(l + r),
            BinaryOp::Subtract => Value::Number(l - r),
            BinaryOp::Multiply => Value::Number(l * r),
            BinaryOp::Divide => {
                if r == 0.0 {
                    return Err(LilithError::eval_error(span, "Division by zero".to_string()));
                }
                Value::Number(l / r)
            }
            BinaryOp::Modulo => {
                if r == 0.0 {
                    return Err(LilithError::eval_error(span, "Modulo by zero".to_string()));
                }
                // Floored: the result takes the sign of the divisor
                Value::Number(l - r * (l / r).floor())
            }
            BinaryOp::Power => Value::Number(l.powf(r)),
            BinaryOp::Greater => Value::from_bool(l > r),
            BinaryOp::GreaterEqual => Value::from_bool(l >= r),
            BinaryOp::Less => Value::from_bool(l < r),
            BinaryOp::LessEqual => Value::from_bool(l <= r),
            BinaryOp::Equal | BinaryOp::NotEqual => unreachable!("handled above"),
        };

        Ok(result)
    }

    fn is_equal(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Undefined, Value::Undefined) => true,
            _ => false,
        }
    }
}
