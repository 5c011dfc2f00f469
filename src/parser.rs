use crate::error::{LilithError, Span};
use crate::evaluator::Evaluator;
use crate::lexer::{Token, TokenType};
use crate::operator::{AssignOp, BinaryOp};
use crate::value::Value;
use std::io::Write;
use tracing::{debug, trace};

/// Syntax-directed evaluator: every production acts on the evaluator as
/// soon as it is recognised, so no tree is ever built.
pub struct Parser<'e, W: Write> {
    tokens: Vec<Token>,
    current: usize,
    evaluator: &'e mut Evaluator<W>,
}

impl<'e, W: Write> Parser<'e, W> {
    /// `tokens` must end with an `Eof` token, as produced by the lexer.
    pub fn new(mut tokens: Vec<Token>, evaluator: &'e mut Evaluator<W>) -> Self {
        if tokens.last().map(|token| token.token_type) != Some(TokenType::Eof) {
            let end = tokens.last().map(|token| token.span.end).unwrap_or(0);
            tokens.push(Token::new(TokenType::Eof, String::new(), Span::single(end)));
        }
        Self {
            tokens,
            current: 0,
            evaluator,
        }
    }

    /// Run every statement in order, returning how many top-level
    /// statements completed.
    pub fn parse(&mut self) -> Result<usize, LilithError> {
        let mut executed = 0;

        while !self.is_at_end() {
            if let Err(error) = self.statement() {
                self.evaluator.reset_blocks();
                return Err(error);
            }
            executed += 1;
        }

        Ok(executed)
    }

    /// Evaluate a lone expression that must span the whole input.
    pub fn parse_expression(&mut self) -> Result<Value, LilithError> {
        let value = self.expression()?;
        if !self.is_at_end() {
            let token = self.peek();
            return Err(LilithError::syntax_error(
                token.span,
                format!("Unexpected '{}' after expression", token.lexeme),
            ));
        }
        Ok(value)
    }

    fn statement(&mut self) -> Result<(), LilithError> {
        let token = self.peek().clone();
        trace!(token = ?token.token_type, offset = token.span.start, "statement");

        match token.token_type {
            TokenType::Question => {
                self.advance();
                self.conditional()?;
                // A terminator after the whole chain is optional
                self.match_types(&[TokenType::Arrow]);
                Ok(())
            }
            TokenType::Output => self.output_statement(),
            TokenType::Identifier => {
                let next = self.peek_next().token_type;
                if let Some(operator) = AssignOp::from_token(next) {
                    self.assignment(operator)
                } else if next == TokenType::Send {
                    self.input_statement()
                } else {
                    self.expression_statement()
                }
            }
            TokenType::DoubleQuestion | TokenType::TripleQuestion => {
                Err(LilithError::syntax_error_with_help(
                    token.span,
                    format!("Unexpected '{}' outside a conditional chain", token.lexeme),
                    "'??' and '???' branches must directly follow a '? condition <? ... ?>' block."
                        .to_string(),
                ))
            }
            TokenType::BlockClose => Err(LilithError::syntax_error(
                token.span,
                "Unexpected '?>' without an open block".to_string(),
            )),
            t if t.is_reserved() => Err(self.reserved(&token)),
            _ => self.expression_statement(),
        }
    }

    fn assignment(&mut self, operator: AssignOp) -> Result<(), LilithError> {
        let name = self.advance().clone();
        self.advance(); // the assignment operator

        if !self.starts_factor() {
            return Err(LilithError::syntax_error_with_help(
                self.error_span(),
                format!("Expected expression after '{}'", operator),
                format!("Give '{}' a value, for example '{} {} 1 ->'.", name.lexeme, name.lexeme, operator),
            ));
        }
        let value = self.expression()?;
        let end = self.terminator()?;

        self.evaluator
            .assign(&name.lexeme, operator, value, name.span.to(end))
    }

    fn output_statement(&mut self) -> Result<(), LilithError> {
        let marker = self.advance().span;
        self.consume_with_help(
            TokenType::Send,
            "Expected '<-' after '[o]'",
            "Output statements look like '[o] <- expression ->'.".to_string(),
        )?;
        let value = self.expression()?;
        let end = self.terminator()?;

        self.evaluator.write_output(&value, marker.to(end))
    }

    fn input_statement(&mut self) -> Result<(), LilithError> {
        let name = self.advance().clone();
        self.advance(); // '<-'
        self.consume_with_help(
            TokenType::Input,
            "Expected '[i]' after '<-'",
            "Input statements look like 'name <- [i] ->' or 'name <- [i] <- prompt ->'.".to_string(),
        )?;

        if self.match_types(&[TokenType::Send]) {
            self.suspended(|parser| parser.expression())?;
        }
        self.terminator()?;

        debug!(variable = %name.lexeme, "input operation has no effect; skipped");
        Ok(())
    }

    fn expression_statement(&mut self) -> Result<(), LilithError> {
        self.expression()?;
        self.terminator()?;
        Ok(())
    }

    /// `?` is already consumed. Exactly one branch of the chain runs.
    fn conditional(&mut self) -> Result<(), LilithError> {
        let live = self.evaluator.is_active();
        let mut taken = false;

        let run = self.branch_guard(live)?;
        self.block(run)?;
        taken |= run;

        while self.match_types(&[TokenType::DoubleQuestion]) {
            let run = self.branch_guard(live && !taken)?;
            self.block(run)?;
            taken |= run;
        }

        if self.match_types(&[TokenType::TripleQuestion]) {
            self.block(live && !taken)?;
        }

        Ok(())
    }

    /// Evaluate a guard when its branch can still be chosen; otherwise only
    /// parse it.
    fn branch_guard(&mut self, live: bool) -> Result<bool, LilithError> {
        if !self.starts_factor() {
            return Err(LilithError::syntax_error_with_help(
                self.error_span(),
                "Expected a condition".to_string(),
                "Conditional branches look like '? condition <? ... ?>'.".to_string(),
            ));
        }

        if !live {
            self.suspended(|parser| parser.expression())?;
            return Ok(false);
        }

        let start = self.peek().span;
        let value = self.expression()?;
        let span = start.to(self.previous().span);
        self.evaluator.guard(&value, span)
    }

    fn block(&mut self, active: bool) -> Result<(), LilithError> {
        self.consume_with_help(
            TokenType::BlockOpen,
            "Expected '<?' to open the conditional block",
            "Every branch needs a block: '? condition <? statements ?>'.".to_string(),
        )?;
        self.evaluator.open_block(active);

        while !self.check(&TokenType::BlockClose) && !self.is_at_end() {
            self.statement()?;
        }

        self.consume_with_help(
            TokenType::BlockClose,
            "Expected '?>' to close the conditional block",
            "Blocks opened with '<?' must be closed with '?>'.".to_string(),
        )?;
        self.evaluator.close_block();
        Ok(())
    }

    fn expression(&mut self) -> Result<Value, LilithError> {
        let start = self.peek().span;
        let mut value = self.term()?;

        while let Some(operator) = BinaryOp::expression_tier(self.peek().token_type) {
            self.advance();
            let right = self.operand(operator, Self::term)?;
            let span = start.to(self.previous().span);
            value = self.evaluator.binary(operator, value, right, span)?;
        }

        Ok(value)
    }

    fn term(&mut self) -> Result<Value, LilithError> {
        let start = self.peek().span;
        let mut value = self.factor()?;

        while let Some(operator) = BinaryOp::term_tier(self.peek().token_type) {
            self.advance();
            let right = self.operand(operator, Self::factor)?;
            let span = start.to(self.previous().span);
            value = self.evaluator.binary(operator, value, right, span)?;
        }

        Ok(value)
    }

    /// Right-hand operand of `operator`, parsed by the next tier down.
    fn operand(
        &mut self,
        operator: BinaryOp,
        tier: fn(&mut Self) -> Result<Value, LilithError>,
    ) -> Result<Value, LilithError> {
        if !self.starts_factor() {
            let operator_token = self.previous();
            return Err(LilithError::syntax_error_with_help(
                operator_token.span,
                format!("Expected expression after '{}'", operator_token.lexeme),
                format!("The '{}' operator needs an operand on both sides.", operator),
            ));
        }
        tier(self)
    }

    fn factor(&mut self) -> Result<Value, LilithError> {
        if self.is_at_end() {
            return Err(LilithError::syntax_error_with_help(
                self.error_span(),
                "Unexpected end of input".to_string(),
                "Expected an expression here. Check for unmatched parentheses or incomplete statements."
                    .to_string(),
            ));
        }

        let token = self.advance().clone();

        match token.token_type {
            TokenType::LeftParen => {
                let value = self.expression()?;
                self.consume_with_help(
                    TokenType::RightParen,
                    "Expected ')' after expression",
                    "Every '(' needs a matching ')'.".to_string(),
                )?;
                Ok(value)
            }
            TokenType::Identifier => Ok(self.evaluator.resolve(&token.lexeme)),
            TokenType::Number | TokenType::String => Ok(Value::from_text(&token.lexeme)),
            t if t.is_reserved() => Err(self.reserved(&token)),
            _ => Err(LilithError::syntax_error(
                token.span,
                format!("Expected expression, found '{}'", token.lexeme),
            )),
        }
    }

    /// Parse without effects by running `f` under an inactive flag.
    fn suspended<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, LilithError>,
    ) -> Result<T, LilithError> {
        self.evaluator.open_block(false);
        let result = f(self);
        self.evaluator.close_block();
        result
    }

    fn terminator(&mut self) -> Result<Span, LilithError> {
        let token = self.consume_with_help(
            TokenType::Arrow,
            "Expected '->' after statement",
            "Every statement, including the last one, ends with '->'.".to_string(),
        )?;
        Ok(token.span)
    }

    fn reserved(&self, token: &Token) -> LilithError {
        LilithError::syntax_error_with_help(
            token.span,
            format!("'{}' is reserved and cannot be used yet", token.lexeme),
            "'while', 'for', 'break' and 'continue' are reserved words with no statement form."
                .to_string(),
        )
    }

    /// Reserved words count, so that `factor` can name them in its error.
    fn starts_factor(&self) -> bool {
        let token_type = self.peek().token_type;
        token_type.is_reserved()
            || matches!(
                token_type,
                TokenType::LeftParen | TokenType::Identifier | TokenType::Number | TokenType::String
            )
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            &self.peek().token_type == token_type
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> &Token {
        let index = (self.current + 1).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Where to point when the current token is not what was expected.
    fn error_span(&self) -> Span {
        if self.is_at_end() && self.current > 0 {
            // At EOF, point just past the last real token
            Span::single(self.tokens[self.current - 1].span.end)
        } else {
            self.peek().span
        }
    }

    fn consume_with_help(
        &mut self,
        token_type: TokenType,
        message: &str,
        help: String,
    ) -> Result<&Token, LilithError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(LilithError::syntax_error_with_help(
                self.error_span(),
                message.to_string(),
                help,
            ))
        }
    }
}
