use winnow::combinator::{alt, cut_err, delimited, eof, not, opt, preceded, repeat, separated, terminated};
use winnow::error::{ModalResult, StrContext};
use winnow::prelude::*;
use winnow::token::{one_of, rest, take_while};

use crate::{CriterionKind, PolicyFamily};

/// One rule text line, still borrowing from the source so positions can be
/// recovered with [`Offset`](winnow::stream::Offset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawStatement<'i> {
    Priority(Vec<RawPriorityItem<'i>>),
    Fallback {
        colon: &'i str,
        policies: Vec<RawPolicy<'i>>,
    },
    Criteria {
        criteria: Vec<RawCriterion<'i>>,
        policies: Option<(&'i str, Vec<RawPolicy<'i>>)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawPriorityItem<'i> {
    Letters(RawLetters<'i>),
    Criterium {
        keyword: &'i str,
        letters: RawLetters<'i>,
    },
    NumberOfCriteria(&'i str),
    FirstLine(&'i str),
    LastLine(&'i str),
}

/// `start` is the input where the list begins, so an empty list still has a
/// position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawLetters<'i> {
    pub(crate) start: &'i str,
    pub(crate) letters: Vec<(CriterionKind, &'i str)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCriterion<'i> {
    pub(crate) kind: CriterionKind,
    pub(crate) letter: &'i str,
    pub(crate) names: Vec<&'i str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawPolicy<'i> {
    pub(crate) family: PolicyFamily,
    pub(crate) letter: &'i str,
    pub(crate) id: &'i str,
}

const KIND_LETTERS: [char; 7] = ['t', 's', 'c', 'b', 'a', 'm', 'g'];

// -- Whitespace & comments --------------------------------------------------

fn spaces(input: &mut &str) -> ModalResult<()> {
    take_while(0.., ' ').void().parse_next(input)
}

fn spaces1(input: &mut &str) -> ModalResult<()> {
    take_while(1.., ' ').void().parse_next(input)
}

fn line_end(input: &mut &str) -> ModalResult<()> {
    (spaces, opt(('#', rest)), eof).void().parse_next(input)
}

// -- Tokens -----------------------------------------------------------------

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn kind_letter<'i>(input: &mut &'i str) -> ModalResult<(CriterionKind, &'i str)> {
    terminated(one_of(KIND_LETTERS).with_taken(), not(one_of(is_word_char)))
        .verify_map(|(letter, token)| CriterionKind::from_letter(letter).map(|kind| (kind, token)))
        .parse_next(input)
}

/// An id token. `!` may prefix it; `+`, `:` and `#` cannot start it.
fn name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(|c: char| c != ' ' && c != ':' && c != '+' && c != '#'),
        take_while(0.., |c: char| c != ' ' && c != ':'),
    )
        .take()
        .parse_next(input)
}

// -- Priority line ----------------------------------------------------------

/// `,` with optional spaces, or spaces alone.
fn letter_separator(input: &mut &str) -> ModalResult<()> {
    alt(((spaces, ',', spaces).void(), spaces1)).parse_next(input)
}

fn letter_list<'i>(input: &mut &'i str) -> ModalResult<RawLetters<'i>> {
    let start = *input;
    let letters: Vec<(CriterionKind, &str)> =
        separated(0.., kind_letter, letter_separator).parse_next(input)?;
    Ok(RawLetters { start, letters })
}

fn criterium_key<'i>(input: &mut &'i str) -> ModalResult<RawPriorityItem<'i>> {
    let keyword = "criterium".parse_next(input)?;
    let letters = delimited(
        (spaces, cut_err('('), spaces),
        letter_list,
        (spaces, cut_err(')')),
    )
    .context(StrContext::Label("criterium expects a parenthesized letter list"))
    .parse_next(input)?;
    Ok(RawPriorityItem::Criterium { keyword, letters })
}

fn priority_key<'i>(input: &mut &'i str) -> ModalResult<RawPriorityItem<'i>> {
    alt((
        "number-of-criteria".map(RawPriorityItem::NumberOfCriteria),
        "first-line".map(RawPriorityItem::FirstLine),
        "last-line".map(RawPriorityItem::LastLine),
        criterium_key,
    ))
    .parse_next(input)
}

fn priority_keys<'i>(input: &mut &'i str) -> ModalResult<Vec<RawPriorityItem<'i>>> {
    separated(1.., priority_key, (spaces, ',', spaces)).parse_next(input)
}

fn priority_line<'i>(input: &mut &'i str) -> ModalResult<RawStatement<'i>> {
    "priority".parse_next(input)?;
    cut_err((spaces, ':', spaces))
        .context(StrContext::Label("':' expected after priority"))
        .parse_next(input)?;
    let items = alt((
        priority_keys,
        letter_list.map(|letters| vec![RawPriorityItem::Letters(letters)]),
    ))
    .parse_next(input)?;
    Ok(RawStatement::Priority(items))
}

// -- Policies ---------------------------------------------------------------

fn policy<'i>(input: &mut &'i str) -> ModalResult<RawPolicy<'i>> {
    let (family, letter) = take_while(1.., |c: char| c != ' ')
        .verify_map(|token: &str| {
            let mut chars = token.chars();
            let family = chars.next().and_then(PolicyFamily::from_letter)?;
            chars.next().is_none().then_some((family, token))
        })
        .context(StrContext::Label("Policy type l, r, n, o or i expected"))
        .parse_next(input)?;
    let id = preceded(spaces1, name)
        .context(StrContext::Label("Policy name missing"))
        .parse_next(input)?;
    Ok(RawPolicy { family, letter, id })
}

fn policies<'i>(input: &mut &'i str) -> ModalResult<Vec<RawPolicy<'i>>> {
    let mut out = Vec::new();
    loop {
        spaces(input)?;
        if input.is_empty() || input.starts_with('#') {
            return Ok(out);
        }
        out.push(cut_err(policy).parse_next(input)?);
    }
}

fn fallback_line<'i>(input: &mut &'i str) -> ModalResult<RawStatement<'i>> {
    "fallback-policy".parse_next(input)?;
    spaces(input)?;
    let colon = cut_err(":")
        .context(StrContext::Label("Policy missing"))
        .parse_next(input)?;
    let policies = policies(input)?;
    Ok(RawStatement::Fallback { colon, policies })
}

// -- Criteria lines ---------------------------------------------------------

fn criterion<'i>(input: &mut &'i str) -> ModalResult<RawCriterion<'i>> {
    let (kind, letter) = kind_letter.parse_next(input)?;
    let names: Vec<&str> = cut_err(repeat(1.., preceded(spaces1, name)))
        .context(StrContext::Label("Name missing"))
        .parse_next(input)?;
    Ok(RawCriterion { kind, letter, names })
}

fn criteria_line<'i>(input: &mut &'i str) -> ModalResult<RawStatement<'i>> {
    let mut criteria = vec![criterion.parse_next(input)?];
    while opt((spaces, '+')).parse_next(input)?.is_some() {
        spaces(input)?;
        criteria.push(
            cut_err(criterion)
                .context(StrContext::Label("Criterium letter expected after '+'"))
                .parse_next(input)?,
        );
    }
    spaces(input)?;
    let policies = match opt(":").parse_next(input)? {
        Some(colon) => Some((colon, policies(input)?)),
        None => None,
    };
    Ok(RawStatement::Criteria { criteria, policies })
}

// -- Top-level parser -------------------------------------------------------

/// Parses one non-blank, non-comment line, indentation included.
pub(crate) fn statement<'i>(input: &mut &'i str) -> ModalResult<RawStatement<'i>> {
    spaces(input)?;
    let statement = alt((priority_line, fallback_line, criteria_line))
        .context(StrContext::Label(
            "Criterium letter, priority or fallback-policy expected",
        ))
        .parse_next(input)?;
    cut_err(line_end)
        .context(StrContext::Label("Unexpected text"))
        .parse_next(input)?;
    Ok(statement)
}
