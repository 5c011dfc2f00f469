use crate::lexer::TokenType;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
}

impl BinaryOp {
    /// Operators reduced at the expression tier: additive and ordering.
    pub fn expression_tier(token_type: TokenType) -> Option<BinaryOp> {
        match token_type {
            TokenType::Plus => Some(BinaryOp::Add),
            TokenType::Minus => Some(BinaryOp::Subtract),
            TokenType::Greater => Some(BinaryOp::Greater),
            TokenType::GreaterEqual => Some(BinaryOp::GreaterEqual),
            TokenType::Less => Some(BinaryOp::Less),
            TokenType::LessEqual => Some(BinaryOp::LessEqual),
            _ => None,
        }
    }

    /// Operators reduced at the term tier: multiplicative and equality.
    pub fn term_tier(token_type: TokenType) -> Option<BinaryOp> {
        match token_type {
            TokenType::Star => Some(BinaryOp::Multiply),
            TokenType::Slash => Some(BinaryOp::Divide),
            TokenType::Percent => Some(BinaryOp::Modulo),
            TokenType::Caret => Some(BinaryOp::Power),
            TokenType::EqualEqual => Some(BinaryOp::Equal),
            TokenType::LessGreater | TokenType::BangEqual => Some(BinaryOp::NotEqual),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "^",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl AssignOp {
    pub fn from_token(token_type: TokenType) -> Option<AssignOp> {
        match token_type {
            TokenType::Equal => Some(AssignOp::Assign),
            TokenType::PlusEqual => Some(AssignOp::Add),
            TokenType::MinusEqual => Some(AssignOp::Subtract),
            TokenType::StarEqual => Some(AssignOp::Multiply),
            TokenType::SlashEqual => Some(AssignOp::Divide),
            TokenType::PercentEqual => Some(AssignOp::Modulo),
            _ => None,
        }
    }

    /// The arithmetic a compound assignment performs; `None` for plain `=`.
    pub fn arithmetic(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Subtract => Some(BinaryOp::Subtract),
            AssignOp::Multiply => Some(BinaryOp::Multiply),
            AssignOp::Divide => Some(BinaryOp::Divide),
            AssignOp::Modulo => Some(BinaryOp::Modulo),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.arithmetic() {
            Some(op) => write!(f, "{}=", op),
            None => f.write_str("="),
        }
    }
}
