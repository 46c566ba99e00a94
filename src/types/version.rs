use std::fmt;

/// BLAKE3 digest of a rule text, identifying the version a compiled set was
/// built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RulesVersion(blake3::Hash);

impl RulesVersion {
    #[must_use]
    pub fn of(text: &str) -> Self {
        Self(blake3::hash(text.as_bytes()))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl fmt::Display for RulesVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_version() {
        assert_eq!(RulesVersion::of("priority: last-line"), RulesVersion::of("priority: last-line"));
    }

    #[test]
    fn whitespace_changes_version() {
        assert_ne!(
            RulesVersion::of("priority: last-line"),
            RulesVersion::of("priority:  last-line")
        );
    }

    #[test]
    fn display_is_short_hex() {
        let shown = RulesVersion::of("x").to_string();
        assert_eq!(shown.len(), 16);
        assert!(shown.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
