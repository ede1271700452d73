use std::fmt::Display;

/// The two document layouts differ only in the role text that marks a question
/// and in one spacer row before the explanation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct VariantPolicy {
    pub(crate) name: &'static str,
    /// Role cell text of an anchor row, compared ignoring case
    pub(crate) marker_role: &'static str,
    /// Extra rows between the last answer slot and the explanation slot
    pub(crate) explanation_extra_offset: usize,
}

impl VariantPolicy {
    pub(crate) const VERSION_A: VariantPolicy = VariantPolicy {
        name: "Version A",
        marker_role: "question number",
        explanation_extra_offset: 1,
    };

    pub(crate) const VERSION_B: VariantPolicy = VariantPolicy {
        name: "Version B",
        marker_role: "slide name",
        explanation_extra_offset: 0,
    };

    /// Accepts `A`, `Version A`, `B` or `Version B`, ignoring case and surrounding spaces
    pub(crate) fn from_name(name: &str) -> Option<VariantPolicy> {
        let name = name.trim().to_ascii_lowercase();
        let letter = name
            .strip_prefix("version")
            .map(str::trim_start)
            .unwrap_or(name.as_str());
        match letter {
            "a" => Some(Self::VERSION_A),
            "b" => Some(Self::VERSION_B),
            _ => None,
        }
    }
}

impl Default for VariantPolicy {
    fn default() -> Self {
        Self::VERSION_A
    }
}

impl Display for VariantPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
