//! User-facing strings. Lookup is delegated to a [`TextCatalog`] so the
//! controllers stay locale-agnostic.

use shared::domain::SortOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKey {
    DeletionSuccess,
    RefreshSuccess,
    RefreshNotPossible,
    SourceResetSuccess,
    ChangesSent,
    SortMessage,
    SortNone,
    SortAscending,
    SortDescending,
}

impl TextKey {
    pub fn sort_label(order: SortOrder) -> Self {
        match order {
            SortOrder::None => Self::SortNone,
            SortOrder::Ascending => Self::SortAscending,
            SortOrder::Descending => Self::SortDescending,
        }
    }
}

pub trait TextCatalog: Send + Sync {
    /// Resolves `key`, substituting `{0}`, `{1}`, ... with `args`.
    fn text(&self, key: TextKey, args: &[&str]) -> String;
}

/// English texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTexts;

impl DefaultTexts {
    fn template(key: TextKey) -> &'static str {
        match key {
            TextKey::DeletionSuccess => "User deleted",
            TextKey::RefreshSuccess => "List refreshed",
            TextKey::RefreshNotPossible => {
                "Before refreshing, please save or revert your changes"
            }
            TextKey::SourceResetSuccess => "Data source reset successfully",
            TextKey::ChangesSent => "Changes sent",
            TextKey::SortMessage => "Users sorted by {0}",
            TextKey::SortNone => "none",
            TextKey::SortAscending => "last name ascending",
            TextKey::SortDescending => "last name descending",
        }
    }
}

impl TextCatalog for DefaultTexts {
    fn text(&self, key: TextKey, args: &[&str]) -> String {
        args.iter()
            .enumerate()
            .fold(Self::template(key).to_string(), |text, (index, arg)| {
                text.replace(&format!("{{{index}}}"), arg)
            })
    }
}
