use crate::domain::SnapshotError;

/// Ordered byte-key/byte-value store.
///
/// The physical engine behind the snapshot chain. Implementations must apply
/// a [`WriteBatch`] atomically.
pub trait OrderedStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SnapshotError>;

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), SnapshotError>;

    fn delete(&self, key: &[u8]) -> Result<(), SnapshotError>;

    fn write_batch(&self, batch: WriteBatch) -> Result<(), SnapshotError>;

    /// All entries in key order.
    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, SnapshotError>;
}

/// Ordered set of puts and deletes applied as one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<(Vec<u8>, Option<Vec<u8>>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push((key, Some(value)));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push((key, None));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
        self.ops
    }

    pub fn ops(&self) -> &[(Vec<u8>, Option<Vec<u8>>)] {
        &self.ops
    }
}
