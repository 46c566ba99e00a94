use crate::parse::{
    CriterionToken, LetterList, ParsedRules, PolicyList, PriorityItem, PriorityItemKind,
    PriorityLine, Statement,
};
use crate::types::{
    CompileError, Criterion, CriterionKind, KindSet, LineOrder, PolicyAssignments, PriorityOrder,
    RankKey, Ranking, RuleLine, RuleSet, RulesVersion,
};

/// An enclosing line whose criteria the lines indented below it inherit.
struct Frame {
    indent: usize,
    criteria: Vec<Criterion>,
    kinds: KindSet,
    line: usize,
    /// A line without `:` exists only to group the lines below it.
    header: bool,
    has_children: bool,
}

impl Frame {
    fn close(self) -> Result<(), CompileError> {
        if self.header && !self.has_children {
            return Err(CompileError::PolicyMissing {
                line: self.line,
                column: self.indent + 1,
            });
        }
        Ok(())
    }
}

pub(crate) fn compile(parsed: &ParsedRules, version: RulesVersion) -> Result<RuleSet, CompileError> {
    let ranking = compile_priority(&parsed.priority)?;

    let mut stack: Vec<Frame> = Vec::new();
    let mut lines: Vec<RuleLine> = Vec::new();
    let mut fallback_seen = false;

    for parsed_line in &parsed.lines {
        let line = parsed_line.line;
        let indent = parsed_line.indent;

        while stack.last().is_some_and(|top| top.indent >= indent) {
            if let Some(frame) = stack.pop() {
                frame.close()?;
            }
        }

        match &parsed_line.statement {
            Statement::Fallback(list) => {
                if indent > 0 {
                    return Err(CompileError::IndentedFallback {
                        line,
                        column: indent + 1,
                    });
                }
                if fallback_seen {
                    return Err(CompileError::DuplicateFallback { line, column: 1 });
                }
                fallback_seen = true;
                lines.push(RuleLine::fallback(assignments(list, line)?, line));
            }
            Statement::Criteria { criteria, policies } => {
                let (mut inherited, mut kinds) = match stack.last_mut() {
                    Some(parent) => {
                        parent.has_children = true;
                        (parent.criteria.clone(), parent.kinds)
                    }
                    None => (Vec::new(), KindSet::empty()),
                };

                for token in criteria {
                    if kinds.contains(token.kind) {
                        return Err(CompileError::DuplicateCriterion {
                            kind: token.kind.letter(),
                            line,
                            column: token.column,
                        });
                    }
                    kinds.insert(token.kind);
                    inherited.push(criterion(token, line)?);
                }

                let header = match policies {
                    Some(list) => {
                        let policies = assignments(list, line)?;
                        lines.push(RuleLine::new(inherited.clone(), policies, line));
                        false
                    }
                    None => true,
                };

                stack.push(Frame {
                    indent,
                    criteria: inherited,
                    kinds,
                    line,
                    header,
                    has_children: false,
                });
            }
        }
    }

    while let Some(frame) = stack.pop() {
        frame.close()?;
    }

    if !fallback_seen {
        let last = parsed
            .lines
            .last()
            .map_or(parsed.priority.line, |l| l.line);
        return Err(CompileError::MissingFallback {
            line: last + 1,
            column: 1,
        });
    }

    tracing::debug!(lines = lines.len(), ranking = %ranking, "compiled rule text");
    Ok(RuleSet::new(ranking, lines, version))
}

fn compile_priority(priority: &PriorityLine) -> Result<Ranking, CompileError> {
    let line = priority.line;

    if let [PriorityItem {
        kind: PriorityItemKind::Letters(list),
        ..
    }] = priority.items.as_slice()
    {
        return Ok(Ranking::from_order(priority_order(list, line)?));
    }

    let mut keys = Vec::with_capacity(priority.items.len());
    let mut seen = [false; 3];
    let last = priority.items.len().saturating_sub(1);

    for (position, item) in priority.items.iter().enumerate() {
        let column = item.column;
        let (slot, key) = match &item.kind {
            PriorityItemKind::NumberOfCriteria => (0, RankKey::NumberOfCriteria),
            PriorityItemKind::Letters(list) | PriorityItemKind::Criterium(list) => {
                (1, RankKey::Criterium(priority_order(list, line)?))
            }
            PriorityItemKind::FirstLine => (2, RankKey::Line(LineOrder::FirstLine)),
            PriorityItemKind::LastLine => (2, RankKey::Line(LineOrder::LastLine)),
        };
        if seen[slot] {
            return Err(CompileError::DuplicatePriorityType { line, column });
        }
        seen[slot] = true;
        if slot == 2 && position != last {
            return Err(CompileError::MisplacedLinePriority { line, column });
        }
        keys.push(key);
    }

    Ok(Ranking::from_keys(keys))
}

/// Exactly the seven kind letters, each once.
fn priority_order(list: &LetterList, line: usize) -> Result<PriorityOrder, CompileError> {
    if list.letters.len() > CriterionKind::ALL.len() {
        return Err(CompileError::TooManyPriorityLetters {
            found: list.letters.len(),
            line,
            column: list.column,
        });
    }
    let mut seen = KindSet::empty();
    for &(kind, column) in &list.letters {
        if seen.contains(kind) {
            return Err(CompileError::DuplicatePriorityLetter {
                letter: kind.letter(),
                line,
                column,
            });
        }
        seen.insert(kind);
    }

    let too_few = CompileError::TooFewPriorityLetters {
        found: list.letters.len(),
        line,
        column: list.column,
    };
    let kinds: [CriterionKind; 7] = list
        .letters
        .iter()
        .map(|&(kind, _)| kind)
        .collect::<Vec<_>>()
        .try_into()
        .map_err(|_| too_few.clone())?;
    PriorityOrder::new(kinds).ok_or(too_few)
}

fn criterion(token: &CriterionToken, line: usize) -> Result<Criterion, CompileError> {
    if let [name] = token.names.as_slice() {
        if name.name == "all" && !name.negated {
            return Ok(Criterion::all(token.kind));
        }
    }

    let negated = token.names.first().is_some_and(|name| name.negated);
    if let Some(odd) = token.names.iter().find(|name| name.negated != negated) {
        return Err(CompileError::MixedNegation {
            line,
            column: odd.column,
        });
    }

    let ids = token.names.iter().map(|name| name.name.clone());
    Ok(if negated {
        Criterion::none_of(token.kind, ids)
    } else {
        Criterion::any_of(token.kind, ids)
    })
}

fn assignments(list: &PolicyList, line: usize) -> Result<PolicyAssignments, CompileError> {
    if list.policies.is_empty() {
        return Err(CompileError::PolicyMissingAfterColon {
            line,
            column: list.colon_column,
        });
    }
    let mut policies = PolicyAssignments::new();
    for token in &list.policies {
        if policies.insert(token.family, token.id.clone()).is_some() {
            return Err(CompileError::DuplicatePolicy {
                family: token.family.letter(),
                line,
                column: token.column,
            });
        }
    }
    Ok(policies)
}
