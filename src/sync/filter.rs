use crate::storage::Bookmark;

/// Case-insensitive substring filter over title and url.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    raw: String,
    needle: String,
}

impl SearchFilter {
    pub fn set(&mut self, text: &str) {
        self.raw = text.to_string();
        self.needle = text.to_lowercase();
    }

    /// The search string as typed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        self.needle.is_empty()
            || bookmark.title.to_lowercase().contains(&self.needle)
            || bookmark.url.to_lowercase().contains(&self.needle)
    }

    /// The matching subsequence of `items`, order preserved.
    pub fn visible<'a>(&self, items: &'a [Bookmark]) -> Vec<&'a Bookmark> {
        items.iter().filter(|b| self.matches(b)).collect()
    }
}

/// What the list area should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The owner has no bookmarks at all.
    EmptyNoBookmarks,
    /// There are bookmarks, but none match the search string.
    EmptyNoMatches,
    HasResults,
}

impl Classification {
    pub fn classify(total: usize, visible: usize) -> Self {
        if total == 0 {
            Classification::EmptyNoBookmarks
        } else if visible == 0 {
            Classification::EmptyNoMatches
        } else {
            Classification::HasResults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn bm(id: i64, title: &str, url: &str) -> Bookmark {
        Bookmark {
            id,
            owner_id: "u".to_string(),
            title: Arc::from(title),
            url: Arc::from(url),
            created_at: 0,
        }
    }

    #[test]
    fn test_matches_title_or_url_case_insensitively() {
        let mut filter = SearchFilter::default();
        let b = bm(1, "Rust Book", "https://doc.rust-lang.org/book");

        filter.set("BOOK");
        assert!(filter.matches(&b));
        filter.set("lang.ORG");
        assert!(filter.matches(&b));
        filter.set("python");
        assert!(!filter.matches(&b));
    }

    #[test]
    fn test_raw_text_kept_as_typed() {
        let mut filter = SearchFilter::default();
        filter.set("MiXeD");
        assert_eq!(filter.raw(), "MiXeD");
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_classification() {
        assert_eq!(Classification::classify(0, 0), Classification::EmptyNoBookmarks);
        assert_eq!(Classification::classify(3, 0), Classification::EmptyNoMatches);
        assert_eq!(Classification::classify(3, 1), Classification::HasResults);
    }

    proptest! {
        #[test]
        fn prop_filter_is_exact_subsequence(
            entries in prop::collection::vec(("[a-zA-Z]{0,6}", "[a-zA-Z]{0,6}"), 0..10),
            needle in "[a-zA-Z]{0,3}",
        ) {
            let items: Vec<Bookmark> = entries
                .iter()
                .enumerate()
                .map(|(i, (t, u))| bm(i as i64, t, &format!("https://{}.example", u)))
                .collect();

            let mut filter = SearchFilter::default();
            filter.set(&needle);
            let visible: Vec<i64> = filter.visible(&items).iter().map(|b| b.id).collect();

            let lower = needle.to_lowercase();
            let expected: Vec<i64> = items
                .iter()
                .filter(|b| b.title.to_lowercase().contains(&lower) || b.url.to_lowercase().contains(&lower))
                .map(|b| b.id)
                .collect();
            prop_assert_eq!(visible, expected);
        }

        #[test]
        fn prop_empty_filter_is_identity(titles in prop::collection::vec("[a-z]{0,6}", 0..10)) {
            let items: Vec<Bookmark> = titles
                .iter()
                .enumerate()
                .map(|(i, t)| bm(i as i64, t, "https://x.example"))
                .collect();
            let mut filter = SearchFilter::default();
            filter.set("");
            let visible: Vec<&Bookmark> = filter.visible(&items);
            prop_assert_eq!(visible.len(), items.len());
            prop_assert!(visible.iter().zip(items.iter()).all(|(a, b)| a.id == b.id));
        }
    }
}
