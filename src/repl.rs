use crate::error::LilithError;
use crate::evaluator::Evaluator;
use crate::lexer::{Lexer, TokenType};
use crate::operator::AssignOp;
use crate::parser::Parser;
use crate::value::Value;
use std::io::{self, Write};

/// Interactive session. One evaluator persists across lines, so bindings
/// made on one line are visible on the next.
pub fn start() {
    println!("Lilith Interpreter v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+C to quit");
    println!();

    let mut evaluator = Evaluator::new();

    loop {
        print!("> ");
        if let Err(error) = io::stdout().flush() {
            eprintln!("Error writing prompt: {}", error);
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF reached (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }

                match run_repl_command(line, &mut evaluator) {
                    Ok(Some(value)) => println!("{}", value),
                    Ok(None) => {}
                    Err(error) => error.report(line, None),
                }
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

/// Execute one line. A bare expression without a terminator is evaluated
/// and its value handed back for display; anything else runs as statements.
pub fn run_repl_command<W: Write>(
    source: &str,
    evaluator: &mut Evaluator<W>,
) -> Result<Option<Value>, LilithError> {
    let tokens = Lexer::new(source.to_string()).scan_tokens()?;

    let is_bare_expression = !tokens.iter().any(|token| {
        AssignOp::from_token(token.token_type).is_some()
            || matches!(
                token.token_type,
                TokenType::Arrow | TokenType::Question | TokenType::Output | TokenType::Send
            )
    });

    let mut parser = Parser::new(tokens, evaluator);
    if is_bare_expression {
        parser.parse_expression().map(Some)
    } else {
        parser.parse().map(|_| None)
    }
}
