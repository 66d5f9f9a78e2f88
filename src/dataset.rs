use crate::quark::{Quark, StringTable, TextVectorizer};

pub type Item = Vec<Attr>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attr {
    pub id: usize,
    pub value: f64,
}

impl Attr {
    pub fn new(id: usize, value: f64) -> Self {
        Self { id, value }
    }
}

/// One sentence as attribute ids. `labels` is parallel to `items` when the
/// sequence is used for training and may be empty at tagging time.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub items: Vec<Item>,
    pub labels: Vec<usize>,
    pub weight: f64,
}

impl Default for Sequence {
    fn default() -> Self {
        Self { items: Default::default(), labels: Default::default(), weight: 1.0 }
    }
}

impl Sequence {
    pub fn push(&mut self, item: Item, label: usize) {
        self.items.push(item);
        self.labels.push(label);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Builds an unlabeled sequence against a fixed attribute table, dropping
    /// attributes the table does not know.
    pub fn lookup<T: StringTable>(items: &[Vec<(String, f64)>], attrs: &T) -> Self {
        let items = items
            .iter()
            .map(|item| {
                item.iter()
                    .filter_map(|(name, value)| attrs.to_id(name).map(|id| Attr::new(id, *value)))
                    .collect()
            })
            .collect();
        Self { items, ..Default::default() }
    }
}

/// Training sequences with the attribute and label tables that interned them.
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    pub seqs: Vec<Sequence>,
    pub attrs: Quark,
    pub labels: Quark,
}

impl Dataset {
    /// Interns and appends one labeled sequence. Empty sequences are ignored.
    ///
    /// # Panics
    ///
    /// Panics if `items` and `labels` differ in length.
    pub fn append<S: AsRef<str>>(&mut self, items: &[Vec<(String, f64)>], labels: &[S]) {
        assert_eq!(items.len(), labels.len(), "items and labels differ in length");
        let mut seq = Sequence::default();
        for (item, label) in items.iter().zip(labels) {
            let item = item
                .iter()
                .map(|(name, value)| Attr::new(self.attrs.find_or_insert(name), *value))
                .collect();
            seq.push(item, self.labels.find_or_insert(label.as_ref()));
        }
        if !seq.is_empty() {
            self.seqs.push(seq);
        }
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }

    pub fn max_seq_length(&self) -> usize {
        self.seqs.iter().map(|x| x.len()).max().unwrap_or_default()
    }

    pub fn total_items(&self) -> usize {
        self.seqs.iter().map(|x| x.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(names: &[&str]) -> Vec<(String, f64)> {
        names.iter().map(|n| (n.to_string(), 1.0)).collect()
    }

    #[test]
    fn append_interns() {
        let mut ds = Dataset::default();
        ds.append(&[item(&["hello", "world"]), item(&["hi", "world"])], &["P", "Q"]);
        ds.append(&[item(&["hello"])], &["Q"]);
        ds.append::<&str>(&[], &[]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.num_attrs(), 3);
        assert_eq!(ds.num_labels(), 2);
        assert_eq!(ds.max_seq_length(), 2);
        assert_eq!(ds.total_items(), 3);
        assert_eq!(ds.seqs[0].labels, vec![0, 1]);
        assert_eq!(ds.seqs[1].items[0], vec![Attr::new(0, 1.0)]);
    }

    #[test]
    #[should_panic(expected = "differ in length")]
    fn append_rejects_unaligned_labels() {
        let mut ds = Dataset::default();
        ds.append(&[item(&["a"]), item(&["b"])], &["X"]);
    }

    #[test]
    fn lookup_drops_unknown_attributes() {
        let mut ds = Dataset::default();
        ds.append(&[item(&["a", "b"])], &["X"]);
        let seq = Sequence::lookup(&[item(&["b", "zzz"]), item(&["zzz"])], &ds.attrs);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.items[0], vec![Attr::new(1, 1.0)]);
        assert!(seq.items[1].is_empty());
        assert!(seq.labels.is_empty());
    }
}
