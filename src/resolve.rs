//! Binds parsed symbols against caller-supplied name tables.

use crate::types::{
    CompileError, Expr, GlobalVariable, NameTables, ReferenceBinding, ReferenceKind, Statement,
    Symbol,
};

pub(crate) fn resolve_expr(
    expr: &Expr<Symbol>,
    tables: &NameTables,
) -> Result<Expr<ReferenceBinding>, CompileError> {
    Ok(match expr {
        Expr::Number(value) => Expr::Number(*value),
        Expr::Text(text) => Expr::Text(text.clone()),
        Expr::Bytes(bytes) => Expr::Bytes(bytes.clone()),
        Expr::Ref(Symbol::Ident(name)) => resolve_ident(name, tables),
        Expr::Ref(Symbol::ForeignCall { name, .. }) => {
            let entry =
                tables
                    .find_foreign_call(name)
                    .ok_or_else(|| CompileError::UnresolvedReference {
                        kind: "foreign call",
                        name: name.clone(),
                    })?;
            Expr::Ref(ReferenceBinding::new(
                ReferenceKind::ForeignCall(entry.id),
                entry.value_type,
            ))
        }
        Expr::Ref(symbol @ Symbol::Tracker { .. }) => {
            Expr::Ref(resolve_tracker(symbol, false, false, tables)?)
        }
        Expr::MappedTracker { tracker, key } => Expr::MappedTracker {
            tracker: resolve_tracker(tracker, true, false, tables)?,
            key: Box::new(resolve_expr(key, tables)?),
        },
        Expr::Not(inner) => Expr::Not(Box::new(resolve_expr(inner, tables)?)),
        Expr::Binary { op, left, right } => Expr::binary(
            *op,
            resolve_expr(left, tables)?,
            resolve_expr(right, tables)?,
        ),
    })
}

pub(crate) fn resolve_statement(
    statement: &Statement<Symbol>,
    tables: &NameTables,
) -> Result<Statement<ReferenceBinding>, CompileError> {
    match statement {
        Statement::Expr(expr) => Ok(Statement::Expr(resolve_expr(expr, tables)?)),
        Statement::TrackerUpdate {
            tracker,
            key,
            op,
            value,
        } => Ok(Statement::TrackerUpdate {
            tracker: resolve_tracker(tracker, key.is_some(), true, tables)?,
            key: key
                .as_ref()
                .map(|key| resolve_expr(key, tables))
                .transpose()?,
            op: *op,
            value: resolve_expr(value, tables)?,
        }),
    }
}

/// Arguments shadow globals; anything unknown is a string literal.
fn resolve_ident(name: &str, tables: &NameTables) -> Expr<ReferenceBinding> {
    if let Some(argument) = tables.find_argument(name) {
        return Expr::Ref(ReferenceBinding::new(
            ReferenceKind::Argument(argument.index),
            argument.value_type,
        ));
    }
    if let Some(global) = GlobalVariable::from_name(name) {
        return Expr::Ref(ReferenceBinding::new(
            ReferenceKind::Global(global),
            global.value_type(),
        ));
    }
    Expr::Text(name.to_owned())
}

fn resolve_tracker(
    symbol: &Symbol,
    keyed: bool,
    as_target: bool,
    tables: &NameTables,
) -> Result<ReferenceBinding, CompileError> {
    let Symbol::Tracker { name, update } = symbol else {
        return Err(CompileError::UnresolvedReference {
            kind: "tracker",
            name: symbol.to_string(),
        });
    };
    if *update && !as_target {
        return Err(CompileError::MisplacedTrackerUpdate { name: name.clone() });
    }
    let entry = tables
        .find_tracker(name)
        .ok_or_else(|| CompileError::UnresolvedReference {
            kind: "tracker",
            name: name.clone(),
        })?;
    match (entry.is_mapped(), keyed) {
        (true, false) => Err(CompileError::TrackerKeyMismatch {
            name: name.clone(),
            problem: "is mapped and needs a key",
        }),
        (false, true) => Err(CompileError::TrackerKeyMismatch {
            name: name.clone(),
            problem: "is not mapped and takes no key",
        }),
        _ => Ok(ReferenceBinding::new(
            ReferenceKind::Tracker(entry.id),
            entry.value_type,
        )),
    }
}
