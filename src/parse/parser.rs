use winnow::stream::Offset;

use crate::{CriterionKind, PolicyFamily};

use super::grammar::{RawCriterion, RawLetters, RawPolicy, RawPriorityItem, RawStatement};

/// Rule text after parsing: the priority declaration and every statement
/// line, with positions, before indentation is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRules {
    pub priority: PriorityLine,
    pub lines: Vec<ParsedLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityLine {
    pub line: usize,
    pub items: Vec<PriorityItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityItem {
    pub column: usize,
    pub kind: PriorityItemKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorityItemKind {
    /// The bare `t, s, c, b, a, m, g` form.
    Letters(LetterList),
    Criterium(LetterList),
    NumberOfCriteria,
    FirstLine,
    LastLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterList {
    pub column: usize,
    pub letters: Vec<(CriterionKind, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub line: usize,
    /// Leading spaces.
    pub indent: usize,
    pub statement: Statement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Fallback(PolicyList),
    Criteria {
        criteria: Vec<CriterionToken>,
        /// `None` for a grouping header without `:`.
        policies: Option<PolicyList>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyList {
    pub colon_column: usize,
    pub policies: Vec<PolicyToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyToken {
    pub family: PolicyFamily,
    pub id: String,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionToken {
    pub kind: CriterionKind,
    pub column: usize,
    pub names: Vec<NameToken>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameToken {
    pub name: String,
    pub negated: bool,
    pub column: usize,
}

/// Resolves borrowed tokens of one line into owned tokens with 1-based
/// columns.
pub(crate) struct Lowering<'i> {
    text: &'i str,
}

/// Either half of a lowered line.
pub(crate) enum Lowered {
    Priority(Vec<PriorityItem>),
    Line(Statement),
}

impl<'i> Lowering<'i> {
    pub(crate) fn new(text: &'i str) -> Self {
        Self { text }
    }

    /// 1-based character column of a slice borrowed from the line.
    pub(crate) fn column_of(&self, token: &'i str) -> usize {
        self.column_at(token.offset_from(&self.text))
    }

    pub(crate) fn column_at(&self, offset: usize) -> usize {
        self.text
            .get(..offset)
            .map_or(offset, |prefix| prefix.chars().count())
            + 1
    }

    pub(crate) fn lower(&self, raw: RawStatement<'i>) -> Lowered {
        match raw {
            RawStatement::Priority(items) => {
                Lowered::Priority(items.into_iter().map(|item| self.priority_item(item)).collect())
            }
            RawStatement::Fallback { colon, policies } => {
                Lowered::Line(Statement::Fallback(self.policy_list(colon, policies)))
            }
            RawStatement::Criteria { criteria, policies } => Lowered::Line(Statement::Criteria {
                criteria: criteria.into_iter().map(|c| self.criterion(c)).collect(),
                policies: policies.map(|(colon, policies)| self.policy_list(colon, policies)),
            }),
        }
    }

    fn priority_item(&self, item: RawPriorityItem<'i>) -> PriorityItem {
        let (token, kind) = match item {
            RawPriorityItem::Letters(letters) => {
                (letters.start, PriorityItemKind::Letters(self.letters(letters)))
            }
            RawPriorityItem::Criterium { keyword, letters } => {
                (keyword, PriorityItemKind::Criterium(self.letters(letters)))
            }
            RawPriorityItem::NumberOfCriteria(token) => (token, PriorityItemKind::NumberOfCriteria),
            RawPriorityItem::FirstLine(token) => (token, PriorityItemKind::FirstLine),
            RawPriorityItem::LastLine(token) => (token, PriorityItemKind::LastLine),
        };
        PriorityItem {
            column: self.column_of(token),
            kind,
        }
    }

    fn letters(&self, raw: RawLetters<'i>) -> LetterList {
        LetterList {
            column: self.column_of(raw.start),
            letters: raw
                .letters
                .into_iter()
                .map(|(kind, letter)| (kind, self.column_of(letter)))
                .collect(),
        }
    }

    fn policy_list(&self, colon: &'i str, policies: Vec<RawPolicy<'i>>) -> PolicyList {
        PolicyList {
            colon_column: self.column_of(colon),
            policies: policies
                .into_iter()
                .map(|policy| PolicyToken {
                    family: policy.family,
                    id: policy.id.to_owned(),
                    column: self.column_of(policy.letter),
                })
                .collect(),
        }
    }

    fn criterion(&self, raw: RawCriterion<'i>) -> CriterionToken {
        CriterionToken {
            kind: raw.kind,
            column: self.column_of(raw.letter),
            names: raw
                .names
                .into_iter()
                .map(|name| {
                    let column = self.column_of(name);
                    match name.strip_prefix('!') {
                        Some(rest) => NameToken {
                            name: rest.to_owned(),
                            negated: true,
                            column,
                        },
                        None => NameToken {
                            name: name.to_owned(),
                            negated: false,
                            column,
                        },
                    }
                })
                .collect(),
        }
    }
}
