use crate::compile::Compiler;
use crate::parse::parse_statement;
use crate::resolve::resolve_statement;
use crate::types::{
    strip_quotes, CompileError, CompiledEffects, Effect, EventParam, NameResolver, NameTables,
    Placeholder,
};

/// Compile every effect of a rule against one shared placeholder table.
///
/// # Errors
///
/// Returns the first [`CompileError`] raised by any effect.
pub fn compile_effects<S: AsRef<str>>(
    positive: &[S],
    negative: &[S],
    tables: &NameTables,
) -> Result<CompiledEffects, CompileError> {
    let mut placeholders = Vec::new();
    let positive = positive
        .iter()
        .map(|text| compile_effect(text.as_ref(), tables, &mut placeholders))
        .collect::<Result<Vec<_>, _>>()?;
    let negative = negative
        .iter()
        .map(|text| compile_effect(text.as_ref(), tables, &mut placeholders))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CompiledEffects {
        placeholders,
        positive,
        negative,
    })
}

/// Classify one effect as a revert, an event or an expression. Expression
/// effects append their references to `placeholders`.
///
/// # Errors
///
/// [`CompileError::EmptyEffect`] for blank text,
/// [`CompileError::NameTable`] for ambiguous tables, otherwise any error from
/// parsing or resolving an expression effect.
pub fn compile_effect(
    text: &str,
    tables: &NameTables,
    placeholders: &mut Vec<Placeholder>,
) -> Result<Effect, CompileError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CompileError::EmptyEffect);
    }
    tables.validate()?;
    let lead = text.len() - text.trim_start().len();

    if let Some(rest) = after_keyword(trimmed, "revert") {
        return revert(rest, lead + "revert".len());
    }
    if let Some(rest) = after_keyword(trimmed, "emit") {
        return event(rest, lead + "emit".len());
    }

    let statement = resolve_statement(&parse_statement(text)?, tables)?;
    let mut compiler = Compiler::new(placeholders);
    compiler.statement(&statement)?;
    let (instruction_set, raw_data) = compiler.finish();
    Ok(Effect::Expression {
        instruction_set,
        raw_data,
    })
}

/// The text after `word`, if `text` starts with it as a whole word.
fn after_keyword<'t>(text: &'t str, word: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(word)?;
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ':' => None,
        _ => Some(rest),
    }
}

fn revert(rest: &str, offset: usize) -> Result<Effect, CompileError> {
    let args = rest.trim_start();
    if args.is_empty() {
        return Ok(Effect::Revert {
            message: String::new(),
        });
    }
    match args.strip_prefix('(').and_then(|a| a.strip_suffix(')')) {
        Some(inner) => Ok(Effect::Revert {
            message: strip_quotes(inner.trim()).to_owned(),
        }),
        None => Err(CompileError::MalformedExpression {
            offset: offset + (rest.len() - args.len()),
            message: "expected revert(message)".to_owned(),
        }),
    }
}

fn event(rest: &str, offset: usize) -> Result<Effect, CompileError> {
    let body = rest.trim();
    let (tag, param) = match body.split_once(',') {
        Some((tag, param)) => (tag.trim(), Some(param.trim())),
        None => (body, None),
    };
    if tag.is_empty() || tag.contains(char::is_whitespace) {
        return Err(CompileError::MalformedExpression {
            offset,
            message: "expected event tag".to_owned(),
        });
    }
    if param == Some("") {
        return Err(CompileError::MalformedExpression {
            offset,
            message: "expected event parameter after ','".to_owned(),
        });
    }
    Ok(Effect::Event {
        tag: tag.to_owned(),
        param: param.map(EventParam::from_text),
    })
}
