//! Disjoint-set forest tracking the size of each component.

use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct SetKey(u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct ComponentSize(u32);

impl UnifyValue for ComponentSize {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, NoError> {
        Ok(ComponentSize(a.0 + b.0))
    }
}

impl UnifyKey for SetKey {
    type Value = ComponentSize;
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> SetKey {
        SetKey(u)
    }
    fn tag() -> &'static str {
        "SetKey"
    }
}

/// A union-find structure over the elements `0..len`.
///
/// Every element starts in its own singleton set. Queries take `&mut self`
/// because they compress paths.
pub struct DisjointSet {
    table: InPlaceUnificationTable<SetKey>,
}

impl DisjointSet {
    /// Creates `len` singleton sets.
    pub fn new(len: usize) -> Self {
        let mut table = InPlaceUnificationTable::new();
        for _ in 0..len {
            let _ = table.new_key(ComponentSize(1));
        }
        Self { table }
    }

    /// The number of elements (not sets) tracked by this structure.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Is this structure tracking no element at all?
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Merges the sets containing `a` and `b`.
    pub fn union(&mut self, a: u32, b: u32) {
        self.table.union(SetKey(a), SetKey(b));
    }

    /// The representative of the set containing `a`.
    pub fn find(&mut self, a: u32) -> u32 {
        self.table.find(SetKey(a)).0
    }

    /// Are `a` and `b` in the same set?
    pub fn same_set(&mut self, a: u32, b: u32) -> bool {
        self.table.unioned(SetKey(a), SetKey(b))
    }

    /// The number of elements in the set containing `a`.
    pub fn component_size(&mut self, a: u32) -> u32 {
        self.table.probe_value(SetKey(a)).0
    }

    /// Lists every element, grouped so that the members of each set are contiguous.
    ///
    /// Sets are ordered by the first element they contain, and elements are
    /// increasing inside of each set.
    pub fn make_contiguous_components(&mut self) -> Vec<u32> {
        let len = self.len();
        let roots: Vec<u32> = (0..len as u32).map(|i| self.find(i)).collect();
        let mut group_start = vec![u32::MAX; len];
        let mut next_start = 0;

        for &root in &roots {
            if group_start[root as usize] == u32::MAX {
                group_start[root as usize] = next_start;
                next_start += self.component_size(root);
            }
        }

        let mut result = vec![0; len];
        for (elt, &root) in roots.iter().enumerate() {
            let slot = &mut group_start[root as usize];
            result[*slot as usize] = elt as u32;
            *slot += 1;
        }

        result
    }
}
