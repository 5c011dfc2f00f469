use crate::error::LilithError;
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;
use std::io::Write;
use tracing::debug;

/// Run one source unit against `evaluator`.
///
/// The whole source is tokenized before anything executes, so a lexical
/// error anywhere halts the run with no output and no bindings. Statements
/// then execute in source order until the first syntax or evaluation
/// error. Returns the number of top-level statements executed.
pub fn execute<W: Write>(source: &str, evaluator: &mut Evaluator<W>) -> Result<usize, LilithError> {
    let tokens = Lexer::new(source.to_string()).scan_tokens()?;
    debug!(tokens = tokens.len(), "tokenized");

    let mut parser = Parser::new(tokens, evaluator);
    let executed = parser.parse()?;
    debug!(statements = executed, "program finished");
    Ok(executed)
}

/// Run a program against standard output, reporting any error on stderr.
pub fn run(source: &str, filename: Option<&str>) -> Result<(), LilithError> {
    let mut evaluator = Evaluator::new();
    match execute(source, &mut evaluator) {
        Ok(_) => Ok(()),
        Err(error) => {
            error.report(source, filename);
            Err(error)
        }
    }
}
