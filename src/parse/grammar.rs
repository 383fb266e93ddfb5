use ruint::aliases::U256;
use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, eof, fail, not, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::stream::Stateful;
use winnow::token::{any, one_of, take, take_while};

use crate::types::{AssignOp, BinaryOp, Expr, Statement, Symbol, MAX_DEPTH};

/// Source text plus the count of open parentheses and `NOT`s around the
/// current position.
pub(crate) type Input<'i> = Stateful<&'i str, Nesting>;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Nesting(usize);

/// A parsed subtree and the height it has once compiled.
struct Node {
    expr: Expr<Symbol>,
    depth: usize,
}

impl Node {
    fn leaf(expr: Expr<Symbol>) -> Self {
        Node { expr, depth: 1 }
    }
}

// -- Depth limits -----------------------------------------------------------

fn too_deep<O>(input: &mut Input<'_>) -> ModalResult<O> {
    cut_err(fail::<_, O, _>)
        .context(StrContext::Label("nesting depth"))
        .parse_next(input)
}

fn node(input: &mut Input<'_>, expr: Expr<Symbol>, depth: usize) -> ModalResult<Node> {
    if depth > MAX_DEPTH {
        return too_deep(input);
    }
    Ok(Node { expr, depth })
}

/// Run `parser` one nesting level down.
fn nested<O>(
    input: &mut Input<'_>,
    mut parser: impl FnMut(&mut Input<'_>) -> ModalResult<O>,
) -> ModalResult<O> {
    if input.state.0 >= MAX_DEPTH {
        return too_deep(input);
    }
    input.state.0 += 1;
    let result = parser(input);
    input.state.0 -= 1;
    result
}

// -- Whitespace & words -----------------------------------------------------

fn ws(input: &mut Input<'_>) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Succeeds without consuming when the next character cannot continue a word.
fn word_end(input: &mut Input<'_>) -> ModalResult<()> {
    not(one_of(is_ident_char)).parse_next(input)
}

pub(crate) fn is_reserved(word: &str) -> bool {
    matches!(
        word,
        "AND" | "and" | "OR" | "or" | "NOT" | "not" | "true" | "false"
    )
}

fn ident<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .take()
        .parse_next(input)
}

fn end_of_input(input: &mut Input<'_>) -> ModalResult<()> {
    ws.parse_next(input)?;
    cut_err(eof)
        .context(StrContext::Expected(StrContextValue::Description(
            "end of input",
        )))
        .void()
        .parse_next(input)
}

// -- Literals ---------------------------------------------------------------

fn string_literal(input: &mut Input<'_>) -> ModalResult<String> {
    let quote = one_of(['"', '\'']).parse_next(input)?;
    let mut next = cut_err(any::<_, ErrMode<ContextError>>).context(StrContext::Expected(
        StrContextValue::Description("closing quote"),
    ));
    let mut text = String::new();
    loop {
        match next.parse_next(input)? {
            c if c == quote => return Ok(text),
            '\\' => match next.parse_next(input)? {
                esc @ ('"' | '\'' | '\\') => text.push(esc),
                other => {
                    text.push('\\');
                    text.push(other);
                }
            },
            c => text.push(c),
        }
    }
}

/// `0x` + 40 hex digits is an address and becomes its numeric value; any
/// other even-length run is a bytes literal.
fn hex_literal(input: &mut Input<'_>) -> ModalResult<Expr<Symbol>> {
    alt(("0x", "0X")).parse_next(input)?;
    let digits = cut_err(take_while(1.., |c: char| c.is_ascii_hexdigit()))
        .context(StrContext::Expected(StrContextValue::Description(
            "hex digits",
        )))
        .parse_next(input)?;
    if digits.len() == 40 {
        return U256::from_str_radix(digits, 16)
            .map(Expr::Number)
            .map_err(|_| ErrMode::from_input(input).cut());
    }
    if digits.len() % 2 != 0 {
        return Err(ErrMode::from_input(input).cut());
    }
    hex::decode(digits)
        .map(Expr::Bytes)
        .map_err(|_| ErrMode::from_input(input).cut())
}

fn number(input: &mut Input<'_>) -> ModalResult<U256> {
    let digits = digit1.parse_next(input)?;
    U256::from_str_radix(digits, 10).map_err(|_| ErrMode::from_input(input).cut())
}

fn literal(input: &mut Input<'_>) -> ModalResult<Expr<Symbol>> {
    alt((
        string_literal.map(Expr::Text),
        hex_literal.context(StrContext::Label("hex literal")),
        number
            .map(Expr::Number)
            .context(StrContext::Label("uint256 literal")),
        (alt(("true", "TRUE")), word_end).value(Expr::Number(U256::from(1u64))),
        (alt(("false", "FALSE")), word_end).value(Expr::Number(U256::ZERO)),
        ident
            .verify(|word: &str| !is_reserved(word))
            .map(|name: &str| Expr::Ref(Symbol::Ident(name.to_owned()))),
    ))
    .parse_next(input)
}

// -- References -------------------------------------------------------------

/// Foreign call arguments are kept verbatim up to the matching `)`.
fn balanced<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    let mut open = 0usize;
    let count = input
        .input
        .chars()
        .enumerate()
        .find_map(|(i, c)| match c {
            '(' => {
                open += 1;
                None
            }
            ')' if open == 0 => Some(i),
            ')' => {
                open -= 1;
                None
            }
            _ => None,
        })
        .unwrap_or_else(|| input.input.chars().count());
    take(count).parse_next(input)
}

fn call_args<'i>(input: &mut Input<'i>) -> ModalResult<&'i str> {
    preceded(
        '(',
        cut_err(terminated(balanced, ')')).context(StrContext::Expected(
            StrContextValue::CharLiteral(')'),
        )),
    )
    .map(str::trim)
    .parse_next(input)
}

fn foreign_call(input: &mut Input<'_>) -> ModalResult<Expr<Symbol>> {
    "FC:".parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "foreign call name",
        )))
        .parse_next(input)?;
    let args = opt(call_args).parse_next(input)?;
    Ok(Expr::Ref(Symbol::ForeignCall {
        name: name.to_owned(),
        args: args.map(str::to_owned),
    }))
}

fn tracker(input: &mut Input<'_>) -> ModalResult<Node> {
    let update = alt(("TRU:".value(true), "TR:".value(false))).parse_next(input)?;
    let name = cut_err(ident)
        .context(StrContext::Expected(StrContextValue::Description(
            "tracker name",
        )))
        .parse_next(input)?;
    let tracker = Symbol::Tracker {
        name: name.to_owned(),
        update,
    };
    match opt(parenthesized).parse_next(input)? {
        Some(key) => node(
            input,
            Expr::MappedTracker {
                tracker,
                key: Box::new(key.expr),
            },
            key.depth + 1,
        ),
        None => Ok(Node::leaf(Expr::Ref(tracker))),
    }
}

// -- Expressions (precedence: AND < OR < NOT < comparison < + - < * /) ------

fn parenthesized(input: &mut Input<'_>) -> ModalResult<Node> {
    '('.parse_next(input)?;
    nested(input, |input| {
        cut_err(terminated(expression, (ws, ')')))
            .context(StrContext::Expected(StrContextValue::CharLiteral(')')))
            .parse_next(input)
    })
}

fn primary(input: &mut Input<'_>) -> ModalResult<Node> {
    ws.parse_next(input)?;
    alt((
        parenthesized,
        foreign_call.map(Node::leaf),
        tracker,
        literal.map(Node::leaf),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

/// Fold a left-associative chain, failing once the tree grows too tall.
fn chain(input: &mut Input<'_>, first: Node, rest: Vec<(BinaryOp, Node)>) -> ModalResult<Node> {
    rest.into_iter().try_fold(first, |acc, (op, r)| {
        let depth = 1 + acc.depth.max(r.depth);
        node(input, Expr::binary(op, acc.expr, r.expr), depth)
    })
}

fn multiplicative(input: &mut Input<'_>) -> ModalResult<Node> {
    let first = primary(input)?;
    let rest = repeat(
        0..,
        (
            preceded(ws, alt(('*'.value(BinaryOp::Mul), '/'.value(BinaryOp::Div)))),
            cut_err(primary),
        ),
    )
    .parse_next(input)?;
    chain(input, first, rest)
}

fn additive(input: &mut Input<'_>) -> ModalResult<Node> {
    let first = multiplicative(input)?;
    let rest = repeat(
        0..,
        (
            preceded(ws, alt(('+'.value(BinaryOp::Add), '-'.value(BinaryOp::Sub)))),
            cut_err(multiplicative),
        ),
    )
    .parse_next(input)?;
    chain(input, first, rest)
}

fn compare_op(input: &mut Input<'_>) -> ModalResult<BinaryOp> {
    alt((
        ">=".value(BinaryOp::Gte),
        ">".value(BinaryOp::Gt),
        "<=".value(BinaryOp::Lte),
        "<".value(BinaryOp::Lt),
        "==".value(BinaryOp::Eq),
        "!=".value(BinaryOp::Neq),
    ))
    .parse_next(input)
}

/// Comparisons do not chain: `a < b < c` leaves `< c` unconsumed.
fn comparison(input: &mut Input<'_>) -> ModalResult<Node> {
    let left = additive(input)?;
    match opt(preceded(ws, compare_op)).parse_next(input)? {
        Some(op) => {
            let right = cut_err(additive).parse_next(input)?;
            chain(input, left, vec![(op, right)])
        }
        None => Ok(left),
    }
}

fn unary(input: &mut Input<'_>) -> ModalResult<Node> {
    ws.parse_next(input)?;
    if opt((alt(("NOT", "not")), word_end))
        .parse_next(input)?
        .is_some()
    {
        let inner = nested(input, |input| cut_err(unary).parse_next(input))?;
        node(input, Expr::Not(Box::new(inner.expr)), inner.depth + 1)
    } else {
        comparison(input)
    }
}

fn or_expr(input: &mut Input<'_>) -> ModalResult<Node> {
    let first = unary(input)?;
    let rest: Vec<Node> = repeat(
        0..,
        preceded((ws, alt(("OR", "or")), word_end), cut_err(unary)),
    )
    .parse_next(input)?;
    chain(
        input,
        first,
        rest.into_iter().map(|r| (BinaryOp::Or, r)).collect(),
    )
}

fn and_expr(input: &mut Input<'_>) -> ModalResult<Node> {
    let first = or_expr(input)?;
    let rest: Vec<Node> = repeat(
        0..,
        preceded((ws, alt(("AND", "and")), word_end), cut_err(or_expr)),
    )
    .parse_next(input)?;
    chain(
        input,
        first,
        rest.into_iter().map(|r| (BinaryOp::And, r)).collect(),
    )
}

fn expression(input: &mut Input<'_>) -> ModalResult<Node> {
    and_expr(input)
}

// -- Effect statements ------------------------------------------------------

fn assign_op(input: &mut Input<'_>) -> ModalResult<AssignOp> {
    alt((
        "+=".value(AssignOp::AddAssign),
        "-=".value(AssignOp::SubAssign),
        "*=".value(AssignOp::MulAssign),
        "/=".value(AssignOp::DivAssign),
        terminated('=', not('=')).value(AssignOp::Assign),
    ))
    .parse_next(input)
}

type UpdateTarget<'i> = (&'i str, Option<Node>, AssignOp);

fn update_target<'i>(input: &mut Input<'i>) -> ModalResult<UpdateTarget<'i>> {
    "TRU:".parse_next(input)?;
    let name = ident.parse_next(input)?;
    let key = opt(parenthesized).parse_next(input)?;
    ws.parse_next(input)?;
    let op = assign_op.parse_next(input)?;
    Ok((name, key, op))
}

// -- Top-level parsers ------------------------------------------------------

pub fn condition(input: &mut Input<'_>) -> ModalResult<Expr<Symbol>> {
    let expr = expression(input)?.expr;
    end_of_input(input)?;
    Ok(expr)
}

pub fn statement(input: &mut Input<'_>) -> ModalResult<Statement<Symbol>> {
    ws.parse_next(input)?;
    let statement = match opt(update_target).parse_next(input)? {
        Some((name, key, op)) => {
            let value = cut_err(expression)
                .context(StrContext::Expected(StrContextValue::Description(
                    "assigned value",
                )))
                .parse_next(input)?;
            // `TRU:t op= v` compiles as `TR:t op v`, one level taller.
            let target = key.as_ref().map_or(1, |key| key.depth + 1);
            if op.binary().is_some() && 1 + value.depth.max(target) > MAX_DEPTH {
                return too_deep(input);
            }
            Statement::TrackerUpdate {
                tracker: Symbol::Tracker {
                    name: name.to_owned(),
                    update: true,
                },
                key: key.map(|key| key.expr),
                op,
                value: value.expr,
            }
        }
        None => Statement::Expr(expression(input)?.expr),
    };
    end_of_input(input)?;
    Ok(statement)
}

/// Whether `word` reads back as a single identifier token.
pub(crate) fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(is_ident_char)
}
