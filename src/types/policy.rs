use std::fmt;

/// The independent decisions a rule set answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PolicyFamily {
    Loan,
    Request,
    Notice,
    OverdueFine,
    LostItemFee,
}

impl PolicyFamily {
    pub const ALL: [PolicyFamily; 5] = [
        PolicyFamily::Loan,
        PolicyFamily::Request,
        PolicyFamily::Notice,
        PolicyFamily::OverdueFine,
        PolicyFamily::LostItemFee,
    ];

    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'l' => Some(Self::Loan),
            'r' => Some(Self::Request),
            'n' => Some(Self::Notice),
            'o' => Some(Self::OverdueFine),
            'i' => Some(Self::LostItemFee),
            _ => None,
        }
    }

    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::Loan => 'l',
            Self::Request => 'r',
            Self::Notice => 'n',
            Self::OverdueFine => 'o',
            Self::LostItemFee => 'i',
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PolicyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loan => "loan",
            Self::Request => "request",
            Self::Notice => "notice",
            Self::OverdueFine => "overdue fine",
            Self::LostItemFee => "lost item fee",
        };
        f.write_str(name)
    }
}

/// Policy ids assigned by one rule line, at most one per family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyAssignments {
    ids: [Option<String>; 5],
}

impl PolicyAssignments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `id` to `family`, replacing any previous assignment.
    #[must_use]
    pub fn with(mut self, family: PolicyFamily, id: impl Into<String>) -> Self {
        self.ids[family.index()] = Some(id.into());
        self
    }

    /// Assign `id` to `family`. Returns the previous id, if any.
    pub fn insert(&mut self, family: PolicyFamily, id: impl Into<String>) -> Option<String> {
        self.ids[family.index()].replace(id.into())
    }

    #[must_use]
    pub fn get(&self, family: PolicyFamily) -> Option<&str> {
        self.ids[family.index()].as_deref()
    }

    #[must_use]
    pub fn assigns(&self, family: PolicyFamily) -> bool {
        self.ids[family.index()].is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.iter().all(Option::is_none)
    }

    /// Assigned (family, id) pairs in family order.
    pub fn iter(&self) -> impl Iterator<Item = (PolicyFamily, &str)> {
        PolicyFamily::ALL
            .into_iter()
            .filter_map(|family| self.get(family).map(|id| (family, id)))
    }
}

impl fmt::Display for PolicyAssignments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (family, id) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{} {id}", family.letter())?;
            first = false;
        }
        Ok(())
    }
}
