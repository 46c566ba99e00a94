mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::{
    CriterionToken, LetterList, NameToken, ParsedLine, ParsedRules, PolicyList, PolicyToken,
    PriorityItem, PriorityItemKind, PriorityLine, Statement,
};

use winnow::error::{ContextError, StrContext};
use winnow::Parser;

use parser::{Lowered, Lowering};

/// Parse rule text into a [`ParsedRules`].
///
/// Blank lines and lines whose first non-space character is `#` or `/` are
/// skipped. The first remaining line must be the `priority:` declaration.
///
/// # Errors
///
/// Returns [`ParseError`] with the line and column of the first problem: a
/// tab character anywhere, a malformed line, an empty document, or a missing
/// or repeated priority line.
pub fn parse(input: &str) -> Result<ParsedRules, ParseError> {
    if let Some((line, column)) = find_tab(input) {
        return Err(ParseError::new(line, column, "Tab character not allowed"));
    }

    let mut priority: Option<PriorityLine> = None;
    let mut lines = Vec::new();

    for (index, text) in input.lines().enumerate() {
        let line = index + 1;
        let content = text.trim_start_matches(' ');
        if content.is_empty() || content.starts_with('#') || content.starts_with('/') {
            continue;
        }
        let indent = text.len() - content.len();

        let lowering = Lowering::new(text);
        let raw = grammar::statement.parse(text).map_err(|e| {
            ParseError::new(line, lowering.column_at(e.offset()), describe(e.inner()))
        })?;

        match (lowering.lower(raw), priority.is_some()) {
            (Lowered::Priority(items), false) => {
                priority = Some(PriorityLine { line, items });
            }
            (Lowered::Priority(_), true) => {
                return Err(ParseError::new(line, indent + 1, "Duplicate priority line"));
            }
            (Lowered::Line(_), false) => {
                return Err(ParseError::new(
                    line,
                    indent + 1,
                    "priority line expected as first line",
                ));
            }
            (Lowered::Line(statement), true) => lines.push(ParsedLine {
                line,
                indent,
                statement,
            }),
        }
    }

    match priority {
        Some(priority) => Ok(ParsedRules { priority, lines }),
        None => Err(ParseError::new(1, 1, "Rules text is empty")),
    }
}

/// 1-based line and column of the first tab.
fn find_tab(input: &str) -> Option<(usize, usize)> {
    input.split('\n').enumerate().find_map(|(index, text)| {
        text.chars()
            .position(|c| c == '\t')
            .map(|position| (index + 1, position + 1))
    })
}

/// The innermost label names the problem; fall back to what was expected.
fn describe(error: &ContextError) -> String {
    error
        .context()
        .find_map(|context| match context {
            StrContext::Label(label) => Some((*label).to_owned()),
            _ => None,
        })
        .unwrap_or_else(|| {
            let rendered = error.to_string();
            if rendered.is_empty() {
                "Unexpected text".to_owned()
            } else {
                rendered
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CriterionKind, PolicyFamily};

    const RULES: &str = "\
priority: t, s, c, b, a, m, g
fallback-policy: l lp2 r rp1
m book: l lp3
    g staff: l lp4
";

    #[test]
    fn parses_lines_with_indentation() {
        let parsed = parse(RULES).unwrap();
        assert_eq!(parsed.priority.line, 1);
        assert_eq!(parsed.lines.len(), 3);
        assert!(matches!(parsed.lines[0].statement, Statement::Fallback(_)));
        assert_eq!(parsed.lines[2].indent, 4);
        assert_eq!(parsed.lines[2].line, 4);
    }

    #[test]
    fn token_columns_are_one_based() {
        let parsed = parse(RULES).unwrap();
        let Statement::Criteria { criteria, policies } = &parsed.lines[2].statement else {
            panic!("expected criteria");
        };
        assert_eq!(criteria[0].kind, CriterionKind::PatronGroup);
        assert_eq!(criteria[0].column, 5);
        assert_eq!(criteria[0].names[0].column, 7);
        let policies = policies.as_ref().unwrap();
        assert_eq!(policies.colon_column, 12);
        assert_eq!(policies.policies[0].family, PolicyFamily::Loan);
        assert_eq!(policies.policies[0].column, 14);
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let text = "# header\n\npriority: last-line\n/ note\nfallback-policy: l lp1\n   # indented comment\n";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.priority.line, 3);
        assert_eq!(parsed.lines.len(), 1);
        assert_eq!(parsed.lines[0].line, 5);
    }

    #[test]
    fn tab_reports_line_and_column() {
        let text = "priority: t, s, c, b, a, m, g\nfallback-policy: l lp1\n  \t m book: l lp2\n";
        let err = parse(text).unwrap_err();
        assert_eq!((err.line(), err.column()), (3, 3));
        assert!(err.message().contains("Tab"));
    }

    #[test]
    fn tab_in_comment_still_rejected() {
        let err = parse("priority: last-line\n# a\tcomment\n").unwrap_err();
        assert_eq!((err.line(), err.column()), (2, 4));
    }

    #[test]
    fn empty_document() {
        let err = parse("").unwrap_err();
        assert_eq!((err.line(), err.column()), (1, 1));
        let err = parse("\n# only a comment\n").unwrap_err();
        assert!(err.message().contains("empty"));
    }

    #[test]
    fn priority_must_come_first() {
        let err = parse("fallback-policy: l lp1\npriority: last-line\n").unwrap_err();
        assert_eq!((err.line(), err.column()), (1, 1));
    }

    #[test]
    fn second_priority_rejected() {
        let err = parse("priority: last-line\npriority: first-line\n").unwrap_err();
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn missing_name_reported() {
        let err = parse("priority: last-line\nm : l lp1\n").unwrap_err();
        assert_eq!(err.line(), 2);
        assert_eq!(err.message(), "Name missing");
    }

    #[test]
    fn unknown_policy_type_reported() {
        let err = parse("priority: last-line\nfallback-policy: l lp1 x xp1\n").unwrap_err();
        assert_eq!((err.line(), err.column()), (2, 24));
        assert_eq!(err.message(), "Policy type l, r, n, o or i expected");
    }

    #[test]
    fn fallback_without_colon() {
        let err = parse("priority: last-line\nfallback-policy\n").unwrap_err();
        assert_eq!((err.line(), err.column()), (2, 16));
        assert_eq!(err.message(), "Policy missing");
    }

    #[test]
    fn crlf_line_endings() {
        let parsed = parse("priority: last-line\r\nfallback-policy: l lp1\r\n").unwrap();
        assert_eq!(parsed.lines.len(), 1);
    }
}
