//! Product Categories

use std::string::ToString;

use smallvec::SmallVec;

/// Sorted, de-duplicated set of category names attached to a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Categories {
    names: SmallVec<[String; 4]>,
}

impl Categories {
    /// Create a category set, sorting and removing duplicates.
    #[must_use]
    pub fn new(names: SmallVec<[String; 4]>) -> Self {
        let mut categories = Self { names };

        categories.names.sort();
        categories.names.dedup();

        categories
    }

    /// Create a category set from string slices.
    pub fn from_strs(names: &[&str]) -> Self {
        Self::new(names.iter().map(ToString::to_string).collect())
    }

    /// Whether `name` is one of the categories.
    pub fn contains(&self, name: &str) -> bool {
        self.names
            .binary_search_by(|probe| probe.as_str().cmp(name))
            .is_ok()
    }

    /// Iterate the category names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there are no categories.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for Categories {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
