//! Builds the final follow-up prompt out of the editor's optional sections.

const SECTION_SEPARATOR: &str = "\n\n";

/// Join prompt fragments in order, separated by a blank line.
///
/// Every fragment is trimmed; missing and blank fragments are dropped. Returns
/// an empty string when nothing is left, which callers treat as nothing to
/// send.
pub fn compose<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    join_sections(fragments.into_iter().flatten().map(str::trim))
}

fn join_sections<'a>(sections: impl Iterator<Item = &'a str>) -> String {
    sections
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// The sections a follow-up prompt is made of, in prompt order.
#[derive(Debug, Clone, Default)]
pub struct PromptFragments<'a> {
    /// Merge/rebase conflict instructions. Used verbatim.
    pub conflict: Option<&'a str>,
    /// Context for elements clicked in the preview.
    pub clicked: Option<&'a str>,
    /// Review comments left on the diff.
    pub review: Option<&'a str>,
    /// What the user typed.
    pub message: Option<&'a str>,
}

impl PromptFragments<'_> {
    pub fn compose(&self) -> String {
        // Conflict text keeps its own whitespace, but a blank one must not
        // turn into a whitespace-only prompt.
        let conflict = self.conflict.filter(|c| !c.trim().is_empty());

        join_sections(
            [
                conflict,
                self.clicked.map(str::trim),
                self.review.map(str::trim),
                self.message.map(str::trim),
            ]
            .into_iter()
            .flatten(),
        )
    }
}
