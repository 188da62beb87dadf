use std::{collections::BTreeMap, fmt::Display};

/**
 * Class for computing and accessing histogram type data.  Stored internally in
 * a sorted Map so that keys can be iterated in order.
 */
#[derive(Clone, Debug)]
pub(crate) struct Histogram<N> {
    map: BTreeMap<N, Bin<N>>,
    bin_label: String,
    value_label: String,
}

impl<N> Default for Histogram<N> {
    fn default() -> Self {
        Self {
            map: Default::default(),
            bin_label: "BIN".to_string(),
            value_label: "VALUE".to_string(),
        }
    }
}

impl<N> Histogram<N>
where
    N: Ord + Copy,
{
    /** Constructs a new Histogram with supplied bin and value labels. */
    pub(crate) fn from_labels<S: ToString>(bin_label: S, value_label: S) -> Self {
        Self {
            bin_label: bin_label.to_string(),
            value_label: value_label.to_string(),
            ..Default::default()
        }
    }

    /** Increments the value in the designated bin by the supplied increment. */
    pub(crate) fn increment(&mut self, id: N, increment: f64) {
        self.map.entry(id).or_insert_with(|| Bin::new(id)).value += increment;
    }

    pub(crate) fn increment1(&mut self, id: impl Into<N>) {
        self.increment(id.into(), 1.0);
    }

    /// Adds every bin of `other` into this histogram.
    pub(crate) fn add_histogram(&mut self, other: &Histogram<N>) {
        for bin in other.map.values() {
            self.increment(bin.id, bin.value);
        }
    }

    pub(crate) fn get_bin_label(&self) -> &str {
        self.bin_label.as_str()
    }

    pub(crate) fn get_value_label(&self) -> &str {
        self.value_label.as_str()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /**
     * Retrieves the bin associated with the given key.
     */
    pub(crate) fn get(&self, key: &N) -> Option<&Bin<N>> {
        self.map.get(key)
    }

    /// Bins in ascending key order.
    pub(crate) fn bins(&self) -> impl Iterator<Item = &Bin<N>> {
        self.map.values()
    }
}

impl<N> PartialEq for Histogram<N>
where
    N: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.bin_label == other.bin_label
            && self.value_label == other.value_label
            && self.map == other.map
    }
}

/** Represents a bin in the Histogram. */
#[derive(Clone, Debug)]
pub(crate) struct Bin<N> {
    id: N,
    value: f64,
}

impl<N> Bin<N>
where
    N: Copy,
{
    pub(crate) fn new(id: N) -> Self {
        Self { id, value: 0.0 }
    }

    /** Gets the ID of this bin. */
    pub(crate) fn get_id(&self) -> N {
        self.id
    }

    /** Gets the value in the bin. */
    pub(crate) fn get_value(&self) -> f64 {
        self.value
    }
}

impl<N> Display for Bin<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<N> PartialEq for Bin<N>
where
    N: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.id == other.id
    }
}
