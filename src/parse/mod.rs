mod grammar;

use winnow::error::{ContextError, ParseError};
use winnow::Parser;

use crate::types::{CompileError, Expr, Statement, Symbol};

use grammar::{Input, Nesting};
pub(crate) use grammar::{is_identifier, is_reserved};

fn input(text: &str) -> Input<'_> {
    Input {
        input: text,
        state: Nesting::default(),
    }
}

/// Parse a condition into an unresolved expression tree.
///
/// # Errors
///
/// Returns [`CompileError::MalformedExpression`] with the byte offset of the
/// first problem, including expressions nested deeper than
/// [`MAX_DEPTH`](crate::MAX_DEPTH).
pub fn parse_condition(text: &str) -> Result<Expr<Symbol>, CompileError> {
    grammar::condition.parse(input(text)).map_err(malformed)
}

/// Parse an effect expression, which may be a `TRU:` tracker update.
///
/// # Errors
///
/// Returns [`CompileError::MalformedExpression`] with the byte offset of the
/// first problem.
pub fn parse_statement(text: &str) -> Result<Statement<Symbol>, CompileError> {
    grammar::statement.parse(input(text)).map_err(malformed)
}

fn malformed(error: ParseError<Input<'_>, ContextError>) -> CompileError {
    let message = error.inner().to_string().replace('\n', "; ");
    CompileError::MalformedExpression {
        offset: error.offset(),
        message: if message.is_empty() {
            "unexpected input".to_owned()
        } else {
            message
        },
    }
}
