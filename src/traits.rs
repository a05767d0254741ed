//! Upstream source of color classes.

/// Sequential, single-pass producer of sorted color class lists.
///
/// This is the shape of an inverted-index reader: it walks its lists once in
/// order, and reports totals up front so the build can check them.
pub trait ColorClassSource {
    /// Size of the id universe; every member lies in `[0, num_docs)`.
    fn num_docs(&self) -> u32;

    /// Total number of members across all lists, as reported by the source.
    fn num_ints(&self) -> u64;

    /// Whether a current list remains.
    fn has_next(&self) -> bool;

    /// Members of the current list, strictly increasing.
    fn list(&self) -> &[u32];

    /// Move to the next list.
    fn advance(&mut self);
}

/// In-memory source over owned lists.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    num_docs: u32,
    num_ints: u64,
    lists: Vec<Vec<u32>>,
    position: usize,
}

impl InMemorySource {
    /// Create a source over `lists`, reporting their actual member total.
    pub fn new(num_docs: u32, lists: Vec<Vec<u32>>) -> Self {
        let num_ints = lists.iter().map(|l| l.len() as u64).sum();
        Self {
            num_docs,
            num_ints,
            lists,
            position: 0,
        }
    }

    /// Override the reported member total.
    ///
    /// Useful to replay headers of an on-disk inverted index, whose totals
    /// are stored separately from the lists.
    pub fn with_num_ints(mut self, num_ints: u64) -> Self {
        self.num_ints = num_ints;
        self
    }
}

impl ColorClassSource for InMemorySource {
    fn num_docs(&self) -> u32 {
        self.num_docs
    }

    fn num_ints(&self) -> u64 {
        self.num_ints
    }

    fn has_next(&self) -> bool {
        self.position < self.lists.len()
    }

    fn list(&self) -> &[u32] {
        self.lists.get(self.position).map_or(&[][..], Vec::as_slice)
    }

    fn advance(&mut self) {
        self.position += 1;
    }
}
