use lilith::error::ErrorKind;
use lilith::evaluator::Evaluator;
use lilith::lexer::{Lexer, TokenType};
use lilith::repl::run_repl_command;
use lilith::runner::execute;
use lilith::value::Value;
use lilith::LilithError;
use pretty_assertions::assert_eq;

/// Run `source` and return the evaluator for inspection.
fn run(source: &str) -> Result<Evaluator<Vec<u8>>, LilithError> {
    let mut evaluator = Evaluator::with_output(Vec::new());
    execute(source, &mut evaluator)?;
    Ok(evaluator)
}

fn output_of(source: &str) -> String {
    match run(source) {
        Ok(evaluator) => String::from_utf8_lossy(evaluator.output()).into_owned(),
        Err(e) => panic!("Script failed: {e}"),
    }
}

fn var(evaluator: &Evaluator<Vec<u8>>, name: &str) -> Option<Value> {
    evaluator.environment().get(name).cloned()
}

fn token_types(source: &str) -> Vec<TokenType> {
    Lexer::new(source.to_string())
        .scan_tokens()
        .unwrap_or_else(|e| panic!("Failed to tokenize {source:?}: {e}"))
        .into_iter()
        .map(|token| token.token_type)
        .collect()
}

#[test]
fn tokenizer_prefers_longest_symbols() {
    use TokenType::*;
    assert_eq!(
        token_types("a <= b <> c ?? ??? ?> <? <- -> [i] [o]"),
        vec![
            Identifier, LessEqual, Identifier, LessGreater, Identifier, DoubleQuestion,
            TripleQuestion, BlockClose, BlockOpen, Send, Arrow, Input, Output, Eof,
        ]
    );
    assert_eq!(
        token_types("a += b -= c *= d /= e %= f == g != h >= i"),
        vec![
            Identifier, PlusEqual, Identifier, MinusEqual, Identifier, StarEqual, Identifier,
            SlashEqual, Identifier, PercentEqual, Identifier, EqualEqual, Identifier, BangEqual,
            Identifier, GreaterEqual, Identifier, Eof,
        ]
    );
}

#[test]
fn tokenizer_reads_signs_and_markers_by_operand_context() {
    let tokens = Lexer::new("x = -3 - -4 * *a b* ->".to_string())
        .scan_tokens()
        .expect("tokenizes");
    let lexemes: Vec<&str> = tokens.iter().map(|token| token.lexeme.as_str()).collect();
    assert_eq!(lexemes, vec!["x", "=", "-3", "-", "-4", "*", "*a b*", "->", ""]);
    assert_eq!(tokens[6].token_type, TokenType::String);
    assert_eq!(tokens[5].token_type, TokenType::Star);
}

#[test]
fn tokenizer_is_lazy_and_stops_after_an_error() {
    let mut lexer = Lexer::new("x $ y".to_string());
    match lexer.next() {
        Some(Ok(token)) => assert_eq!(token.token_type, TokenType::Identifier),
        other => panic!("expected an identifier, got {other:?}"),
    }

    let error = match lexer.next() {
        Some(Err(error)) => error,
        other => panic!("expected a lex error, got {other:?}"),
    };
    assert_eq!(error.kind, ErrorKind::Lex { character: '$' });
    assert_eq!(error.span.start, 2);
    assert!(lexer.next().is_none());
}

#[test]
fn reserved_words_are_keywords() {
    use TokenType::*;
    assert_eq!(
        token_types("while for break continue whilex"),
        vec![While, For, Break, Continue, Identifier, Eof]
    );
}

#[test]
fn conversion_rule_classifies_text() {
    assert_eq!(Value::from_text("3.0"), Value::Number(3.0));
    assert_eq!(Value::from_text("3"), Value::from_text("3.0"));
    assert_eq!(Value::from_text("-2.5e2"), Value::Number(-250.0));
    assert_eq!(Value::from_text("*hi there*"), Value::Str("*hi there*".to_string()));
    assert_eq!(Value::from_text("answer"), Value::Undefined);
    assert_eq!(Value::from_text("nan"), Value::Undefined);
    assert_eq!(Value::from_text("inf"), Value::Undefined);
    assert_eq!(Value::from_text("1e"), Value::Undefined);
    assert_eq!(Value::from_text("*"), Value::Undefined);
}

#[test]
fn conversion_rule_is_idempotent() {
    for value in [
        Value::Number(42.0),
        Value::Number(-0.125),
        Value::Str("*text*".to_string()),
        Value::Str("*3*".to_string()),
        Value::Undefined,
    ] {
        assert_eq!(value.clone().normalize(), value);
        assert_eq!(value.clone().normalize().normalize(), value);
    }
}

#[test]
fn numbers_round_trip_through_their_text() {
    for text in ["0", "3", "3.0", "-17.25", "1e3", "0.1", "123456.789"] {
        let value = Value::from_text(text);
        assert_eq!(Value::from_text(&value.to_string()), value, "round trip of {text}");
    }
    let sum = Value::Number(0.1 + 0.2);
    assert_eq!(Value::from_text(&sum.to_string()), sum);
}

#[test]
fn operator_precedence() {
    assert_eq!(output_of("[o] <- 2 + 3 * 4 ->"), "14.0\n");
    assert_eq!(output_of("[o] <- (2 + 3) * 4 ->"), "20.0\n");
    assert_eq!(output_of("[o] <- 10 - 4 - 3 ->"), "3.0\n");
    assert_eq!(output_of("[o] <- 2 ^ 3 ^ 2 ->"), "64.0\n");
    // Equality binds tighter than addition
    assert_eq!(output_of("[o] <- 1 + 1 == 2 ->"), "1.0\n");
}

#[test]
fn arithmetic_and_relational_results() {
    let output = output_of(
        "[o] <- 7 / 2 ->
         [o] <- -7 % 3 ->
         [o] <- 7 % -3 ->
         [o] <- 2 ^ 10 ->
         [o] <- 5 > 3 ->
         [o] <- 5 <= 3 ->
         [o] <- 1 <> 2 ->
         [o] <- 1 != 1 ->
         [o] <- 5 -2 ->",
    );
    assert_eq!(output, "3.5\n2.0\n-2.0\n1024.0\n1.0\n0.0\n1.0\n0.0\n3.0\n");
}

#[test]
fn compound_assignment() {
    let evaluator = run("x = 10 -> x += 5 ->").expect("runs");
    assert_eq!(var(&evaluator, "x"), Some(Value::Number(15.0)));

    let evaluator = run("m = 10 -> m %= 4 -> d = 9 -> d /= 2 -> p = 3 -> p *= p -> s = 1 -> s -= 4 ->")
        .expect("runs");
    assert_eq!(var(&evaluator, "m"), Some(Value::Number(2.0)));
    assert_eq!(var(&evaluator, "d"), Some(Value::Number(4.5)));
    assert_eq!(var(&evaluator, "p"), Some(Value::Number(9.0)));
    assert_eq!(var(&evaluator, "s"), Some(Value::Number(-3.0)));
}

#[test]
fn strings_keep_their_markers() {
    assert_eq!(output_of("s = *hello world* -> [o] <- s ->"), "*hello world*\n");
    assert_eq!(output_of("[o] <- *a* == *a* -> [o] <- *a* == *b* ->"), "1.0\n0.0\n");
}

#[test]
fn unbound_identifiers_are_undefined() {
    assert_eq!(output_of("[o] <- nobody ->"), "NIHIL\n");
    assert_eq!(output_of("u = nobody -> [o] <- u == nobody ->"), "1.0\n");

    let error = run("x = nobody * 2 ->").err().expect("undefined arithmetic fails");
    assert_eq!(error.kind, ErrorKind::Eval);
}

#[test]
fn guard_selects_first_true_branch() {
    let program = "? 5 > 3 <? [o] <- 1 -> ?> ?? 1 <? [o] <- 2 -> ?> ??? <? [o] <- 3 -> ?>";
    assert_eq!(output_of(program), "1.0\n");

    let program = "? 0 <? [o] <- 1 -> ?> ?? 2 > 1 <? [o] <- 2 -> ?> ?? 1 <? [o] <- 3 -> ?> ??? <? [o] <- 4 -> ?>";
    assert_eq!(output_of(program), "2.0\n");
}

#[test]
fn else_branch_runs_when_guard_is_false() {
    let evaluator = run("? 0 <? x = 1 -> ?> ??? <? x = 2 -> ?>").expect("runs");
    assert_eq!(var(&evaluator, "x"), Some(Value::Number(2.0)));
}

#[test]
fn false_outer_guard_suppresses_inner_block() {
    let evaluator = run("? 0 <? ? 1 <? x = 1 -> [o] <- x -> ?> ?>").expect("runs");
    assert_eq!(var(&evaluator, "x"), None);
    assert!(evaluator.output().is_empty());
    assert_eq!(evaluator.depth(), 0);
}

#[test]
fn nested_conditionals_pop_their_flags() {
    let program = "
        y = 0 ->
        ? 1 <?
            ? 0 <? y = 1 -> ?>
            ??? <? y = 2 -> ?>
            z = 3 ->
        ?>
        ? 0 <? w = 1 -> ?>
        after = 4 ->
        [o] <- y ->
    ";
    let evaluator = run(program).expect("runs");
    assert_eq!(var(&evaluator, "y"), Some(Value::Number(2.0)));
    assert_eq!(var(&evaluator, "z"), Some(Value::Number(3.0)));
    assert_eq!(var(&evaluator, "w"), None);
    assert_eq!(var(&evaluator, "after"), Some(Value::Number(4.0)));
    assert_eq!(String::from_utf8_lossy(evaluator.output()), "2.0\n");
}

#[test]
fn lex_error_halts_before_any_effect() {
    let mut evaluator = Evaluator::with_output(Vec::new());
    let error = execute("x = 1 -> [o] <- x -> y = 2 $ -> z = 3 ->", &mut evaluator)
        .err()
        .expect("lex error");

    assert_eq!(error.kind, ErrorKind::Lex { character: '$' });
    assert!(evaluator.output().is_empty());
    assert!(evaluator.environment().is_empty());
}

#[test]
fn statements_before_a_runtime_error_keep_their_effects() {
    let mut evaluator = Evaluator::with_output(Vec::new());
    let error = execute("a = 1 -> [o] <- a -> b = a / 0 -> c = 2 ->", &mut evaluator)
        .err()
        .expect("division by zero");

    assert!(error.is_eval());
    assert_eq!(String::from_utf8_lossy(evaluator.output()), "1.0\n");
    assert_eq!(var(&evaluator, "a"), Some(Value::Number(1.0)));
    assert_eq!(var(&evaluator, "b"), None);
    assert_eq!(var(&evaluator, "c"), None);
}

#[test]
fn failed_compound_assignment_leaves_binding_untouched() {
    let mut evaluator = Evaluator::with_output(Vec::new());
    let error = execute("x = 4 -> x += 1 + *oops* ->", &mut evaluator)
        .err()
        .expect("string arithmetic");

    assert!(error.is_eval());
    assert_eq!(var(&evaluator, "x"), Some(Value::Number(4.0)));
}

#[test]
fn failure_inside_a_block_resets_the_activation_stack() {
    let mut evaluator = Evaluator::with_output(Vec::new());
    let error = execute("? 1 <? ? 1 <? x = 1 / 0 -> ?> ?>", &mut evaluator)
        .err()
        .expect("division by zero");

    assert!(error.is_eval());
    assert_eq!(evaluator.depth(), 0);
    assert!(evaluator.is_active());
}

#[test]
fn input_statement_has_no_effect() {
    let evaluator = run("name <- [i] -> other <- [i] <- *prompt* ->").expect("runs");
    assert!(evaluator.environment().is_empty());
    assert!(evaluator.output().is_empty());
}

#[test]
fn execute_counts_top_level_statements() {
    let mut evaluator = Evaluator::with_output(Vec::new());
    let executed = execute("x = 1 -> ? 1 <? y = 2 -> z = 3 -> ?> -> [o] <- x ->", &mut evaluator)
        .expect("runs");
    assert_eq!(executed, 3);
}

#[test]
fn independent_runs_do_not_share_state() {
    let first = run("x = 1 ->").expect("runs");
    let second = run("[o] <- x ->").expect("runs");
    assert_eq!(var(&first, "x"), Some(Value::Number(1.0)));
    assert_eq!(String::from_utf8_lossy(second.output()), "NIHIL\n");
}

#[test]
fn repl_keeps_state_between_lines() {
    let mut evaluator = Evaluator::with_output(Vec::new());

    assert_eq!(
        run_repl_command("1 + 2", &mut evaluator).expect("evaluates"),
        Some(Value::Number(3.0))
    );
    assert_eq!(run_repl_command("x = 4 ->", &mut evaluator).expect("runs"), None);
    assert_eq!(
        run_repl_command("x * 2", &mut evaluator).expect("evaluates"),
        Some(Value::Number(8.0))
    );

    let error = run_repl_command("x = 5", &mut evaluator).err().expect("needs terminator");
    assert!(error.is_syntax());
    assert_eq!(var(&evaluator, "x"), Some(Value::Number(4.0)));
}
