// Lilith Language Interpreter Library
//
// Core of the Lilith/fuk scripting language: a tokenizer and a
// syntax-directed evaluator that executes each statement as its grammar
// rule is recognised, against one mutable environment and a stack of
// conditional activation flags.

// Public modules
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

// Re-export commonly used items
pub use error::{ErrorKind, LilithError, Span};
pub use evaluator::{ActivationStack, Environment, Evaluator};
pub use lexer::{Lexer, Token, TokenType};
pub use operator::{AssignOp, BinaryOp};
pub use parser::Parser;
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::{execute, run};
