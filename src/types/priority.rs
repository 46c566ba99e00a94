use std::cmp::Ordering;
use std::fmt;

use super::criterion::{CriterionKind, KindSet};
use super::rule::RuleLine;

/// A permutation of the seven criterion kinds, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityOrder([CriterionKind; 7]);

impl PriorityOrder {
    /// Builds an order from exactly seven distinct kinds.
    #[must_use]
    pub fn new(kinds: [CriterionKind; 7]) -> Option<Self> {
        let distinct: KindSet = kinds.into_iter().collect();
        (distinct.len() == 7).then_some(Self(kinds))
    }

    #[must_use]
    pub fn kinds(&self) -> &[CriterionKind; 7] {
        &self.0
    }

    /// Of the kinds in `set`, the one declared first.
    #[must_use]
    pub fn highest(&self, set: KindSet) -> Option<CriterionKind> {
        self.0.iter().copied().find(|kind| set.contains(*kind))
    }

    /// Kind-by-kind containment: the set holding the first kind its
    /// competitor lacks ranks first.
    #[must_use]
    pub fn compare(&self, a: KindSet, b: KindSet) -> Ordering {
        for kind in self.0 {
            match (a.contains(kind), b.contains(kind)) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
        }
        Ordering::Equal
    }
}

/// `t, s, c, b, a, m, g`
impl Default for PriorityOrder {
    fn default() -> Self {
        Self(CriterionKind::ALL)
    }
}

impl fmt::Display for PriorityOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", kind.letter())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrder {
    FirstLine,
    LastLine,
}

/// One ranking key of a `priority:` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKey {
    /// More criteria ranks first.
    NumberOfCriteria,
    /// Containment of higher-priority kinds ranks first.
    Criterium(PriorityOrder),
    Line(LineOrder),
}

/// The ordered ranking keys used to sort candidate rule lines.
///
/// Every ranking ends with a [`RankKey::Line`] key, so two distinct
/// non-fallback lines never compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    keys: Vec<RankKey>,
}

impl Ranking {
    /// The ranking implied by `priority: <seven letters>`: number of
    /// criteria, then the declared kind order, then the later line.
    #[must_use]
    pub fn from_order(order: PriorityOrder) -> Self {
        Self {
            keys: vec![
                RankKey::NumberOfCriteria,
                RankKey::Criterium(order),
                RankKey::Line(LineOrder::LastLine),
            ],
        }
    }

    /// Builds a ranking from explicit keys. A trailing last-line key is
    /// appended when the keys do not end with a line key.
    #[must_use]
    pub fn from_keys(mut keys: Vec<RankKey>) -> Self {
        if !matches!(keys.last(), Some(RankKey::Line(_))) {
            keys.push(RankKey::Line(LineOrder::LastLine));
        }
        Self { keys }
    }

    #[must_use]
    pub fn keys(&self) -> &[RankKey] {
        &self.keys
    }

    /// The declared kind order, or the default order when the ranking has
    /// no criterium key.
    #[must_use]
    pub fn priority_order(&self) -> PriorityOrder {
        self.keys
            .iter()
            .find_map(|key| match key {
                RankKey::Criterium(order) => Some(*order),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// `Less` when `a` ranks before `b`. The fallback line always ranks last.
    #[must_use]
    pub fn compare(&self, a: &RuleLine, b: &RuleLine) -> Ordering {
        match (a.is_fallback, b.is_fallback) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        for key in &self.keys {
            let ord = match key {
                RankKey::NumberOfCriteria => b.criteria.len().cmp(&a.criteria.len()),
                RankKey::Criterium(order) => order.compare(a.kinds, b.kinds),
                RankKey::Line(LineOrder::LastLine) => b.source_line.cmp(&a.source_line),
                RankKey::Line(LineOrder::FirstLine) => a.source_line.cmp(&b.source_line),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl Default for Ranking {
    fn default() -> Self {
        Self::from_order(PriorityOrder::default())
    }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match key {
                RankKey::NumberOfCriteria => f.write_str("number-of-criteria")?,
                RankKey::Criterium(order) => write!(f, "criterium({order})")?,
                RankKey::Line(LineOrder::FirstLine) => f.write_str("first-line")?,
                RankKey::Line(LineOrder::LastLine) => f.write_str("last-line")?,
            }
        }
        Ok(())
    }
}
