use crate::storage::Bookmark;

use super::events::FeedEvent;

/// The session's ordered bookmark sequence.
///
/// Order is fixed at seed time (newest first) and afterwards only changes by
/// inserts, which go to the front. Identifiers are unique at all times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkList {
    items: Vec<Bookmark>,
}

impl BookmarkList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole sequence.
    ///
    /// A snapshot should never contain the same id twice; if it does, the
    /// first occurrence wins so the uniqueness invariant holds.
    pub fn seed(&mut self, bookmarks: Vec<Bookmark>) {
        let mut items: Vec<Bookmark> = Vec::with_capacity(bookmarks.len());
        for bookmark in bookmarks {
            if items.iter().any(|b| b.id == bookmark.id) {
                tracing::warn!(id = bookmark.id, "Duplicate id in snapshot, keeping first");
                continue;
            }
            items.push(bookmark);
        }
        self.items = items;
    }

    /// Apply one feed event. Returns true if the sequence changed.
    ///
    /// Applying the same event again leaves the sequence as it is.
    pub fn apply(&mut self, event: &FeedEvent) -> bool {
        match event {
            FeedEvent::Insert(record) => match self.position(record.id) {
                Some(idx) => replace_at(&mut self.items, idx, record),
                None => {
                    self.items.insert(0, record.clone());
                    true
                }
            },
            FeedEvent::Update(record) => match self.position(record.id) {
                Some(idx) => replace_at(&mut self.items, idx, record),
                None => false,
            },
            FeedEvent::Delete(id) => match self.position(*id) {
                Some(idx) => {
                    self.items.remove(idx);
                    true
                }
                None => false,
            },
        }
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|b| b.id == id)
    }

    pub fn get(&self, id: i64) -> Option<&Bookmark> {
        self.items.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bookmark> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

fn replace_at(items: &mut [Bookmark], idx: usize, record: &Bookmark) -> bool {
    if items[idx] == *record {
        return false;
    }
    items[idx] = record.clone();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn bm(id: i64, title: &str) -> Bookmark {
        Bookmark {
            id,
            owner_id: "owner".to_string(),
            title: Arc::from(title),
            url: Arc::from(format!("https://{}.example.com", id).as_str()),
            created_at: 1_700_000_000 - id,
        }
    }

    fn ids(list: &BookmarkList) -> Vec<i64> {
        list.iter().map(|b| b.id).collect()
    }

    #[test]
    fn test_seed_overwrites() {
        let mut list = BookmarkList::new();
        list.seed(vec![bm(1, "a"), bm(2, "b")]);
        list.seed(vec![bm(3, "c")]);
        assert_eq!(ids(&list), vec![3]);
    }

    #[test]
    fn test_seed_drops_duplicate_ids() {
        let mut list = BookmarkList::new();
        list.seed(vec![bm(1, "first"), bm(2, "b"), bm(1, "second")]);
        assert_eq!(ids(&list), vec![1, 2]);
        assert_eq!(&*list.get(1).unwrap().title, "first");
    }

    #[test]
    fn test_insert_prepends() {
        let mut list = BookmarkList::new();
        list.seed(vec![bm(1, "a"), bm(2, "b")]);
        assert!(list.apply(&FeedEvent::Insert(bm(3, "c"))));
        assert_eq!(ids(&list), vec![3, 1, 2]);
    }

    #[test]
    fn test_insert_of_present_id_replaces_in_place() {
        let mut list = BookmarkList::new();
        list.seed(vec![bm(1, "a"), bm(2, "b")]);
        assert!(list.apply(&FeedEvent::Insert(bm(2, "b2"))));
        assert_eq!(ids(&list), vec![1, 2]);
        assert_eq!(&*list.get(2).unwrap().title, "b2");
    }

    #[test]
    fn test_update_keeps_position() {
        let mut list = BookmarkList::new();
        list.seed(vec![bm(1, "a"), bm(2, "b"), bm(3, "c")]);
        assert!(list.apply(&FeedEvent::Update(bm(2, "renamed"))));
        assert_eq!(ids(&list), vec![1, 2, 3]);
        assert_eq!(&*list.get(2).unwrap().title, "renamed");
    }

    #[test]
    fn test_update_of_absent_id_is_noop() {
        let mut list = BookmarkList::new();
        list.seed(vec![bm(1, "a")]);
        assert!(!list.apply(&FeedEvent::Update(bm(9, "x"))));
        assert_eq!(ids(&list), vec![1]);
    }

    #[test]
    fn test_delete_of_absent_id_is_noop() {
        let mut list = BookmarkList::new();
        list.seed(vec![bm(5, "a")]);
        let before = list.clone();
        assert!(!list.apply(&FeedEvent::Delete(6)));
        assert_eq!(list, before);
    }

    fn arb_event() -> impl Strategy<Value = FeedEvent> {
        prop_oneof![
            (0i64..12, "[a-z]{0,4}").prop_map(|(id, t)| FeedEvent::Insert(bm(id, &t))),
            (0i64..12, "[a-z]{0,4}").prop_map(|(id, t)| FeedEvent::Update(bm(id, &t))),
            (0i64..12).prop_map(FeedEvent::Delete),
        ]
    }

    fn arb_seed() -> impl Strategy<Value = Vec<Bookmark>> {
        prop::collection::vec((0i64..12, "[a-z]{0,4}"), 0..8)
            .prop_map(|v| v.into_iter().map(|(id, t)| bm(id, &t)).collect())
    }

    proptest! {
        #[test]
        fn prop_events_are_idempotent(seed in arb_seed(), prefix in prop::collection::vec(arb_event(), 0..10), event in arb_event()) {
            let mut once = BookmarkList::new();
            once.seed(seed);
            for e in &prefix {
                once.apply(e);
            }
            once.apply(&event);

            let mut twice = once.clone();
            twice.apply(&event);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_ids_stay_unique(seed in arb_seed(), events in prop::collection::vec(arb_event(), 0..30)) {
            let mut list = BookmarkList::new();
            list.seed(seed);
            for e in &events {
                list.apply(e);
                let mut seen = std::collections::HashSet::new();
                prop_assert!(list.iter().all(|b| seen.insert(b.id)));
            }
        }

        #[test]
        fn prop_update_never_moves_entry(seed in arb_seed(), id in 0i64..12, title in "[a-z]{0,4}") {
            let mut list = BookmarkList::new();
            list.seed(seed);
            let before = ids(&list);
            list.apply(&FeedEvent::Update(bm(id, &title)));
            prop_assert_eq!(ids(&list), before);
        }

        #[test]
        fn prop_insert_lands_at_front_when_new(seed in arb_seed(), id in 0i64..12) {
            let mut list = BookmarkList::new();
            list.seed(seed);
            let was_present = list.position(id);
            list.apply(&FeedEvent::Insert(bm(id, "new")));
            match was_present {
                Some(idx) => prop_assert_eq!(list.position(id), Some(idx)),
                None => prop_assert_eq!(list.position(id), Some(0)),
            }
        }
    }
}
