use std::collections::BTreeSet;

/// The citations a user chose to keep. Unique by exact text, listed sorted.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    entries: BTreeSet<String>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the text was already saved.
    pub fn save(&mut self, text: impl Into<String>) -> bool {
        self.entries.insert(text.into())
    }

    /// Saved texts in ascending lexicographic order.
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_is_idempotent() {
        let mut refs = ReferenceSet::new();
        assert!(refs.save("Walker, M. (2017). Why We Sleep. Scribner."));
        assert!(!refs.save("Walker, M. (2017). Why We Sleep. Scribner."));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_list_is_sorted() {
        let mut refs = ReferenceSet::new();
        refs.save("B");
        refs.save("A");
        assert_eq!(refs.list(), vec!["A", "B"]);
    }

    #[test]
    fn test_exact_match_only() {
        let mut refs = ReferenceSet::new();
        refs.save("smith");
        refs.save("Smith");
        refs.save("Smith ");
        assert_eq!(refs.list(), vec!["Smith", "Smith ", "smith"]);
    }

    #[test]
    fn test_clear_empties() {
        let mut refs = ReferenceSet::new();
        refs.save("A");
        refs.save("B");
        refs.clear();
        assert!(refs.list().is_empty());
        assert!(refs.is_empty());
    }
}
