//! Ordered collection with single-selection tracking.

use std::collections::HashMap;

use crate::types::Identifiable;

/// Change notification sent to collection observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    /// Contents were swapped wholesale.
    Reset,
    /// A single item was appended at this index.
    Inserted(usize),
}

type Observer = Box<dyn FnMut(ListChange)>;

/// Items keyed by identity, optionally kept sorted by display name, with one
/// selected entry and a dirty flag for selection changes.
///
/// The selected display text is remembered separately, so a selection can be
/// restored by name after the items are replaced with fresh values.
pub struct SelectableCollection<T> {
    items: Vec<T>,
    indexes: HashMap<String, usize>,
    sorted: bool,
    selected_index: Option<usize>,
    last_selected_index: Option<usize>,
    selected_text: Option<String>,
    observers: Vec<Observer>,
    notify: bool,
}

impl<T: Identifiable + Clone> SelectableCollection<T> {
    pub fn new(sorted: bool) -> Self {
        Self {
            items: Vec::new(),
            indexes: HashMap::new(),
            sorted,
            selected_index: None,
            last_selected_index: None,
            selected_text: None,
            observers: Vec::new(),
            notify: true,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.indexes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.indexes.get(id).map(|&index| &self.items[index])
    }

    /// Register a callback for content changes.
    pub fn subscribe(&mut self, observer: impl FnMut(ListChange) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index.filter(|&index| index < self.items.len())
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected_index().map(|index| &self.items[index])
    }

    /// Name of the selected item, or the last remembered selection text.
    pub fn selected_text(&self) -> Option<&str> {
        self.selected()
            .map(Identifiable::name)
            .or(self.selected_text.as_deref())
    }

    /// Select by position; out-of-range clears the selection.
    pub fn select_index(&mut self, index: Option<usize>) {
        self.selected_index = index.filter(|&i| i < self.items.len());
        self.remember_text();
    }

    /// Select by identity; returns false when absent.
    ///
    /// A miss clears the selection together with the remembered text, so a
    /// later `replace` does not bring the old entry back.
    pub fn select(&mut self, id: &str) -> bool {
        self.selected_index = self.indexes.get(id).copied();
        self.remember_text();
        self.selected_index.is_some()
    }

    /// Select the last item whose name matches case-insensitively.
    ///
    /// The text is remembered even when nothing matches, so a later `replace`
    /// can pick it up.
    pub fn select_text(&mut self, text: &str) {
        let wanted = text.to_lowercase();
        self.selected_index = self
            .items
            .iter()
            .rposition(|item| item.name().to_lowercase() == wanted);
        self.selected_text = Some(text.to_string());
    }

    pub fn is_dirty(&self) -> bool {
        self.last_selected_index != self.selected_index
    }

    pub fn clear_dirty(&mut self) {
        self.last_selected_index = self.selected_index;
    }

    pub fn clear(&mut self) {
        self.clear_items();
        self.notify_observers(ListChange::Reset);
    }

    /// Append one item unless its identity is already present.
    pub fn push(&mut self, item: T) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        let index = self.items.len();
        self.indexes.insert(item.id().to_string(), index);
        self.items.push(item);
        self.notify_observers(ListChange::Inserted(index));
        true
    }

    /// Add the items whose identity is not present yet.
    pub fn add_range(&mut self, items: impl IntoIterator<Item = T>) {
        let mut merged = self.items.clone();
        for item in items {
            if !self.contains(item.id()) && !merged.iter().any(|m| m.id() == item.id()) {
                merged.push(item);
            }
        }
        self.replace(merged);
    }

    /// Swap the contents, keeping the selection by identity, then by name.
    ///
    /// Emits a single `Reset` and re-baselines the dirty flag.
    pub fn replace(&mut self, items: impl IntoIterator<Item = T>) {
        let mut items: Vec<T> = items.into_iter().collect();
        if self.sorted {
            items.sort_by_cached_key(|item| item.name().to_lowercase());
        }

        let previous_id = self.selected().map(|item| item.id().to_string());
        let previous_text = self.selected_text().map(str::to_lowercase);

        self.notify = false;
        self.clear_items();
        for item in items {
            self.push(item);
        }
        self.notify = true;

        let by_id = previous_id.and_then(|id| self.indexes.get(&id).copied());
        self.selected_index = by_id.or_else(|| {
            let text = previous_text?;
            self.items
                .iter()
                .position(|item| item.name().to_lowercase() == text)
        });

        self.last_selected_index = self.selected_index;
        self.notify_observers(ListChange::Reset);
    }

    fn clear_items(&mut self) {
        self.selected_index = None;
        self.indexes.clear();
        self.items.clear();
    }

    fn remember_text(&mut self) {
        self.selected_text = self.selected().map(|item| item.name().to_string());
    }

    fn notify_observers(&mut self, change: ListChange) {
        if !self.notify {
            return;
        }
        for observer in &mut self.observers {
            observer(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::types::User;

    fn users(names: &[(&str, &str)]) -> Vec<User> {
        names.iter().map(|(id, name)| User::new(*id, *name)).collect()
    }

    #[test]
    fn test_replace_sorts_case_insensitively() {
        let mut list = SelectableCollection::new(true);
        list.replace(users(&[("1", "charlie"), ("2", "Bravo"), ("3", "alpha")]));

        let names: Vec<&str> = list.items().iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Bravo", "charlie"]);
    }

    #[test]
    fn test_unsorted_keeps_order() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "charlie"), ("2", "alpha")]));
        assert_eq!(list.items()[0].name, "charlie");
    }

    #[test]
    fn test_replace_keeps_selection_by_identity() {
        let mut list = SelectableCollection::new(true);
        list.replace(users(&[("1", "Bob"), ("2", "Alice")]));
        assert!(list.select("1"));

        list.replace(users(&[("3", "Aaron"), ("1", "Robert")]));
        assert_eq!(list.selected().map(|u| u.id.as_str()), Some("1"));
    }

    #[test]
    fn test_replace_falls_back_to_display_name() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob"), ("2", "Alice")]));
        list.select("1");

        list.replace(users(&[("7", "alice"), ("9", "BOB")]));
        assert_eq!(list.selected().map(|u| u.id.as_str()), Some("9"));
    }

    #[test]
    fn test_replace_without_match_clears_selection() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob")]));
        list.select("1");

        list.replace(users(&[("2", "Alice")]));
        assert!(list.selected().is_none());
        assert!(!list.is_dirty());
    }

    #[test]
    fn test_selected_text_survives_until_a_match_appears() {
        let mut list: SelectableCollection<User> = SelectableCollection::new(false);
        list.select_text("Alice");
        assert!(list.selected().is_none());
        assert_eq!(list.selected_text(), Some("Alice"));

        list.replace(users(&[("1", "Bob"), ("2", "Alice")]));
        assert_eq!(list.selected_index(), Some(1));
    }

    #[test]
    fn test_select_unknown_identity_clears_selection() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob")]));
        list.select("1");
        assert!(!list.select("42"));
        assert!(list.selected().is_none());
    }

    #[test]
    fn test_select_miss_forgets_previous_name() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob"), ("2", "Alice")]));
        list.select("1");
        assert!(!list.select("42"));
        assert_eq!(list.selected_text(), None);

        list.replace(users(&[("9", "bob"), ("2", "Alice")]));
        assert!(list.selected().is_none());
    }

    #[test]
    fn test_select_text_on_populated_collection() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob"), ("2", "Alice")]));
        list.select("1");

        list.select_text("ALICE");
        assert_eq!(list.selected().map(|u| u.id.as_str()), Some("2"));

        list.select_text("Carol");
        assert!(list.selected().is_none());
        assert_eq!(list.selected_text(), Some("Carol"));

        list.replace(users(&[("3", "carol"), ("2", "Alice")]));
        assert_eq!(list.selected().map(|u| u.id.as_str()), Some("3"));
    }

    #[test]
    fn test_select_index_out_of_range() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob")]));
        list.select_index(Some(5));
        assert_eq!(list.selected_index(), None);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob"), ("2", "Alice")]));
        assert!(!list.is_dirty());

        list.select_index(Some(1));
        assert!(list.is_dirty());

        list.clear_dirty();
        assert!(!list.is_dirty());

        list.select_index(Some(1));
        list.add_range(users(&[("3", "Carol")]));
        assert!(!list.is_dirty());
    }

    #[test]
    fn test_add_range_skips_existing_identities() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob")]));
        list.add_range(users(&[("1", "Bobby"), ("2", "Alice"), ("2", "Alice again")]));

        assert_eq!(list.len(), 2);
        assert_eq!(list.get("1").map(|u| u.name.as_str()), Some("Bob"));
        assert!(list.contains("2"));
    }

    #[test]
    fn test_replace_emits_single_reset() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut list = SelectableCollection::new(false);
        let sink = Rc::clone(&events);
        list.subscribe(move |change| sink.borrow_mut().push(change));

        list.replace(users(&[("1", "Bob"), ("2", "Alice"), ("3", "Carol")]));
        assert_eq!(*events.borrow(), vec![ListChange::Reset]);

        list.push(User::new("4", "Dave"));
        assert_eq!(
            *events.borrow(),
            vec![ListChange::Reset, ListChange::Inserted(3)]
        );
    }

    #[test]
    fn test_clear_resets_selection() {
        let mut list = SelectableCollection::new(false);
        list.replace(users(&[("1", "Bob")]));
        list.select("1");
        list.clear_dirty();

        list.clear();
        assert!(list.is_empty());
        assert!(list.selected().is_none());
        assert!(list.is_dirty());
    }
}
