//! Text filtering for include/exclude lists shown to users.

/// A list of strings with a case-insensitive filter applied.
///
/// `*` in the filter splits it into fragments that must all appear, in
/// order. An empty filter passes everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilteredStringList {
    items: Vec<String>,
    filter: String,
}

impl FilteredStringList {
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            filter: String::new(),
        }
    }

    pub fn set_items(&mut self, items: Vec<String>) {
        self.items = items;
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Returns true if the filter changed.
    pub fn set_filter(&mut self, filter: &str) -> bool {
        if self.filter == filter {
            return false;
        }
        self.filter = filter.to_string();
        true
    }

    pub fn filtered_items(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|item| matches_filter(item, &self.filter))
            .map(String::as_str)
            .collect()
    }

    /// There are items, but the filter hides all of them.
    pub fn is_filtered_empty(&self) -> bool {
        !self.items.is_empty() && self.filtered_items().is_empty()
    }
}

/// Case-insensitive fragment match.
pub fn matches_filter(item: &str, filter: &str) -> bool {
    let item = item.to_lowercase();
    let filter = filter.to_lowercase();
    let mut rest = item.as_str();
    for fragment in filter.split('*').filter(|f| !f.is_empty()) {
        match rest.find(fragment) {
            Some(pos) => rest = &rest[pos + fragment.len()..],
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_filter() {
        assert!(matches_filter("/World/KeyLight", ""));
        assert!(matches_filter("/World/KeyLight", "keylight"));
        assert!(matches_filter("/World/KeyLight", "world*light"));
        assert!(!matches_filter("/World/KeyLight", "light*world"));
        assert!(matches_filter("/World/KeyLight", "**"));
    }

    #[test]
    fn test_filtered_empty() {
        let mut list = FilteredStringList::default();
        assert!(!list.is_filtered_empty());
        list.set_items(vec!["/A/Cube".into(), "/A/Sphere".into()]);
        assert!(list.set_filter("cube"));
        assert!(!list.set_filter("cube"));
        assert_eq!(list.filtered_items(), vec!["/A/Cube"]);
        list.set_filter("cone");
        assert!(list.is_filtered_empty());
    }
}
