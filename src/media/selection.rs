use std::collections::BTreeSet;

use crate::model::{Media, MediaId};

/// Multi-select state over media ids, independent of the active filters.
///
/// `toggle_select_all` only ever looks at the list it is given. Callers pass
/// the filtered view, so "select all" under an active tab or search selects
/// the visible items and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSelection {
    selected: BTreeSet<MediaId>,
}

impl MediaSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: MediaId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in ascending order.
    pub fn ids(&self) -> Vec<MediaId> {
        self.selected.iter().copied().collect()
    }

    pub fn toggle(&mut self, id: MediaId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn select(&mut self, id: MediaId) {
        self.selected.insert(id);
    }

    pub fn deselect(&mut self, id: MediaId) {
        self.selected.remove(&id);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// True when `visible` is non-empty and the selection is exactly its ids.
    pub fn is_all_selected(&self, visible: &[Media]) -> bool {
        !visible.is_empty()
            && visible.len() == self.selected.len()
            && visible.iter().all(|m| self.selected.contains(&m.id))
    }

    /// Clear when everything visible is already selected, otherwise replace
    /// the selection with exactly the visible ids.
    pub fn toggle_select_all(&mut self, visible: &[Media]) {
        if self.is_all_selected(visible) {
            self.selected.clear();
        } else {
            self.selected = visible.iter().map(|m| m.id).collect();
        }
    }

    /// Drop ids that are no longer present, e.g. after a refetch.
    pub fn retain_existing(&mut self, all: &[Media]) {
        let present: BTreeSet<MediaId> = all.iter().map(|m| m.id).collect();
        self.selected.retain(|id| present.contains(id));
    }

    pub fn remove_all(&mut self, ids: &[MediaId]) {
        for id in ids {
            self.selected.remove(id);
        }
    }

    /// Selected items, in the order of `all`.
    pub fn selected_media<'a>(&self, all: &'a [Media]) -> Vec<&'a Media> {
        all.iter().filter(|m| self.selected.contains(&m.id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaType;
    use chrono::Utc;

    fn media(id: MediaId) -> Media {
        Media {
            id,
            media_type: MediaType::Photo,
            original_file_name: format!("{}.jpg", id),
            file_size: 1,
            full_url: None,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn toggle_flips_membership() {
        let mut sel = MediaSelection::new();
        sel.toggle(4);
        assert!(sel.is_selected(4));
        sel.toggle(4);
        assert!(sel.is_empty());
    }

    #[test]
    fn select_all_twice_clears() {
        let visible = vec![media(1), media(2)];
        let mut sel = MediaSelection::new();
        sel.toggle_select_all(&visible);
        assert_eq!(sel.ids(), vec![1, 2]);
        assert!(sel.is_all_selected(&visible));
        sel.toggle_select_all(&visible);
        assert!(sel.is_empty());
    }

    #[test]
    fn select_all_replaces_hidden_selection() {
        let mut sel = MediaSelection::new();
        sel.select(99);
        sel.select(1);
        let visible = vec![media(1), media(2)];
        assert!(!sel.is_all_selected(&visible));
        sel.toggle_select_all(&visible);
        assert_eq!(sel.ids(), vec![1, 2]);
    }

    #[test]
    fn select_all_on_empty_view_selects_nothing() {
        let mut sel = MediaSelection::new();
        sel.select(5);
        sel.toggle_select_all(&[]);
        assert!(sel.is_empty());
        assert!(!sel.is_all_selected(&[]));
    }

    #[test]
    fn retain_existing_drops_stale_ids() {
        let mut sel = MediaSelection::new();
        sel.select(1);
        sel.select(2);
        sel.retain_existing(&[media(2), media(3)]);
        assert_eq!(sel.ids(), vec![2]);
    }
}
