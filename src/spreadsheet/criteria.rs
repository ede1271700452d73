use glob::Pattern;

/// Criteria for selecting sheets from spreadsheets.
#[derive(Clone, Debug, Default)]
pub(crate) struct Criteria {
    /// Sheet name patterns for filtering which sheets to process.
    pub(crate) sheet_name_patterns: Option<Vec<Pattern>>,

    /// Maximum number of sheets to read.
    pub(crate) sheet_limit: Option<usize>,
}

impl Criteria {
    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        if let Some(patterns) = &self.sheet_name_patterns {
            patterns.iter().any(|pattern| pattern.matches(sheet_name))
        } else {
            true
        }
    }

    /// Checks whether enough sheets have been read already.
    pub(crate) fn is_exhausted(&self, sheet_count: usize) -> bool {
        self.sheet_limit.map(|limit| sheet_count >= limit).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept() {
        let criteria = Criteria {
            sheet_name_patterns: Some(vec![Pattern::new("Sim*").unwrap()]),
            ..Criteria::default()
        };
        assert!(criteria.accept("Simulated"));
        assert!(!criteria.accept("Summary"));
        assert!(Criteria::default().accept("Anything"));
    }

    #[test]
    fn test_is_exhausted() {
        let criteria = Criteria {
            sheet_limit: Some(1),
            ..Criteria::default()
        };
        assert!(!criteria.is_exhausted(0));
        assert!(criteria.is_exhausted(1));
        assert!(!Criteria::default().is_exhausted(100));
    }
}
