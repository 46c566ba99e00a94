use std::fmt;

/// What a rule line can match on.
///
/// The four location kinds (`s`, `c`, `b`, `a`) form a ladder from shelving
/// location up to institution, but the engine treats every kind as a plain
/// equality criterion; the caller supplies whichever ancestor ids it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CriterionKind {
    LoanType,
    ShelvingLocation,
    Library,
    Campus,
    Institution,
    MaterialType,
    PatronGroup,
}

impl CriterionKind {
    pub const ALL: [CriterionKind; 7] = [
        CriterionKind::LoanType,
        CriterionKind::ShelvingLocation,
        CriterionKind::Library,
        CriterionKind::Campus,
        CriterionKind::Institution,
        CriterionKind::MaterialType,
        CriterionKind::PatronGroup,
    ];

    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            't' => Some(Self::LoanType),
            's' => Some(Self::ShelvingLocation),
            'c' => Some(Self::Library),
            'b' => Some(Self::Campus),
            'a' => Some(Self::Institution),
            'm' => Some(Self::MaterialType),
            'g' => Some(Self::PatronGroup),
            _ => None,
        }
    }

    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::LoanType => 't',
            Self::ShelvingLocation => 's',
            Self::Library => 'c',
            Self::Campus => 'b',
            Self::Institution => 'a',
            Self::MaterialType => 'm',
            Self::PatronGroup => 'g',
        }
    }

    /// Bit used for this kind inside a [`KindSet`].
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoanType => "loan type",
            Self::ShelvingLocation => "shelving location",
            Self::Library => "library",
            Self::Campus => "campus",
            Self::Institution => "institution",
            Self::MaterialType => "material type",
            Self::PatronGroup => "patron group",
        };
        f.write_str(name)
    }
}

/// A set of criterion kinds packed into one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u8);

impl KindSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn with(mut self, kind: CriterionKind) -> Self {
        self.insert(kind);
        self
    }

    pub fn insert(&mut self, kind: CriterionKind) {
        self.0 |= kind.bit();
    }

    #[must_use]
    pub fn contains(self, kind: CriterionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[must_use]
    pub fn is_subset_of(self, other: KindSet) -> bool {
        self.0 & !other.0 == 0
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = CriterionKind> {
        CriterionKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl FromIterator<CriterionKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = CriterionKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

/// The id side of a criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatcher {
    /// Matches any id the query supplies for the kind.
    All,
    /// Matches when the query id is one of `ids`, or none of them when negated.
    Ids { ids: Vec<String>, negated: bool },
}

/// One `kind id...` term of a rule line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub kind: CriterionKind,
    pub names: NameMatcher,
}

impl Criterion {
    /// A criterion matching exactly one id.
    pub fn new(kind: CriterionKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            names: NameMatcher::Ids {
                ids: vec![id.into()],
                negated: false,
            },
        }
    }

    /// A criterion matching any of `ids`.
    pub fn any_of<I, S>(kind: CriterionKind, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            names: NameMatcher::Ids {
                ids: ids.into_iter().map(Into::into).collect(),
                negated: false,
            },
        }
    }

    /// A criterion matching any id except `ids`.
    pub fn none_of<I, S>(kind: CriterionKind, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            names: NameMatcher::Ids {
                ids: ids.into_iter().map(Into::into).collect(),
                negated: true,
            },
        }
    }

    #[must_use]
    pub fn all(kind: CriterionKind) -> Self {
        Self {
            kind,
            names: NameMatcher::All,
        }
    }

    /// Tests the id the query supplied for this criterion's kind.
    /// A kind absent from the query never matches.
    #[must_use]
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.names {
            NameMatcher::All => true,
            NameMatcher::Ids { ids, negated } => {
                ids.iter().any(|id| id == value) != *negated
            }
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.letter())?;
        match &self.names {
            NameMatcher::All => write!(f, " all"),
            NameMatcher::Ids { ids, negated } => {
                for id in ids {
                    if *negated {
                        write!(f, " !{id}")?;
                    } else {
                        write!(f, " {id}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_round_trip() {
        for kind in CriterionKind::ALL {
            assert_eq!(CriterionKind::from_letter(kind.letter()), Some(kind));
        }
        assert_eq!(CriterionKind::from_letter('x'), None);
    }

    #[test]
    fn kind_set_subset() {
        let small: KindSet = [CriterionKind::MaterialType].into_iter().collect();
        let big = small.with(CriterionKind::PatronGroup);
        assert!(small.is_subset_of(big));
        assert!(!big.is_subset_of(small));
        assert!(KindSet::empty().is_subset_of(small));
        assert_eq!(big.len(), 2);
    }

    #[test]
    fn kind_set_iterates_in_declaration_order() {
        let set = KindSet::empty()
            .with(CriterionKind::PatronGroup)
            .with(CriterionKind::LoanType);
        let kinds: Vec<_> = set.iter().collect();
        assert_eq!(kinds, [CriterionKind::LoanType, CriterionKind::PatronGroup]);
    }

    #[test]
    fn single_id_matches_exactly() {
        let c = Criterion::new(CriterionKind::MaterialType, "book");
        assert!(c.matches(Some("book")));
        assert!(!c.matches(Some("dvd")));
        assert!(!c.matches(None));
    }

    #[test]
    fn negated_list_excludes_ids() {
        let c = Criterion::none_of(CriterionKind::MaterialType, ["dvd", "music"]);
        assert!(c.matches(Some("book")));
        assert!(!c.matches(Some("dvd")));
        assert!(!c.matches(Some("music")));
        assert!(!c.matches(None));
    }

    #[test]
    fn all_matches_any_supplied_id() {
        let c = Criterion::all(CriterionKind::PatronGroup);
        assert!(c.matches(Some("anything")));
        assert!(!c.matches(None));
    }

    #[test]
    fn display_uses_source_syntax() {
        let c = Criterion::none_of(CriterionKind::MaterialType, ["dvd", "music"]);
        assert_eq!(c.to_string(), "m !dvd !music");
        assert_eq!(Criterion::all(CriterionKind::PatronGroup).to_string(), "g all");
    }
}
