use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
}

impl<T> Entry<T> {
    /// Create a new cell with the given value.
    fn new(value: T) -> Self {
        Self { value, next: 0 }
    }
}

/// Append-only arena with optional hash consing.
///
/// Cells are addressed by stable indices; index 0 is a sentry and never
/// refers to a value. Values are never moved or removed, so an index handed
/// out once stays valid for the lifetime of the table.
///
/// [`Table::add`] always allocates a fresh cell (identity semantics),
/// [`Table::put`] returns the existing cell for an equal value (structural
/// semantics) by walking a chain of cells hanging off a hash bucket.
pub struct Table<T> {
    /// Cell 0 is the sentry, hence `Option`.
    data: Vec<Option<Entry<T>>>,

    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T> {
    /// Create a new table with `2^bits` pre-allocated cells.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let mut data = Vec::with_capacity(1 << bits);
        data.push(None); // Cell 0 is the sentry.

        let buckets_bits = min(bits, 16);
        let buckets_size = 1 << buckets_bits;
        let buckets = vec![0; buckets_size];
        let bitmask = (buckets_size - 1) as u64;

        Self { data, buckets, bitmask }
    }

    /// Get the number of allocated cells, excluding the sentry.
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }

    /// Get the number of cells that fit without reallocation.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    fn entry(&self, index: usize) -> &Entry<T> {
        assert_ne!(index, 0, "Index is 0");
        match self.data.get(index) {
            Some(Some(entry)) => entry,
            _ => panic!("Index {} is not allocated", index),
        }
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        &self.entry(index).value
    }

    /// Check if the cell at the given index holds a value.
    pub fn is_occupied(&self, index: usize) -> bool {
        index != 0 && index < self.data.len()
    }

    /// Get the index of the next cell in the same bucket chain.
    pub fn next(&self, index: usize) -> usize {
        self.entry(index).next
    }

    fn set_next(&mut self, index: usize, next: usize) {
        assert_ne!(index, 0, "Index is 0");
        if let Some(Some(entry)) = self.data.get_mut(index) {
            entry.next = next;
        }
    }

    /// Add a new value to the table and return its index.
    pub fn add(&mut self, value: T) -> usize {
        let index = self.data.len();
        assert!(index <= u32::MAX as usize, "Storage is full");
        self.data.push(Some(Entry::new(value)));
        index
    }
}

impl<T> Table<T>
where
    T: MyHash,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Put a value into the table and return its index, reusing the cell of
    /// an equal value if one exists.
    pub fn put(&mut self, value: T) -> usize
    where
        T: Eq,
    {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            // Create new node and put it into the bucket.
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return i;
        }

        loop {
            assert!(index > 0);

            if &value == self.value(index) {
                // The node already exists.
                return index;
            }

            let next = self.next(index);

            if next == 0 {
                // Create new node and append it to the bucket.
                let i = self.add(value);
                self.set_next(index, i);
                return i;
            } else {
                // Go to the next node in the bucket.
                index = next;
            }
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
