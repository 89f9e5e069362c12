use ahash::AHashMap;
use corax_common::{Result, error::Error};

/// A variable-size item stored in a container page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerItem<'a> {
    pub data: &'a [u8],
    /// Per-page value; for term items it identifies the key dictionary the page
    /// was encoded with.
    pub page_metadata: u64,
}

pub trait ContainerStore {
    /// Fetches an item. A missing id is corruption: ids are only obtained from
    /// other persisted structures.
    fn get(&self, id: u64) -> Result<ContainerItem<'_>>;
}

#[derive(Debug, Default)]
pub struct MemoryContainerStore {
    items: AHashMap<u64, (Box<[u8]>, u64)>,
    next_id: u64,
}

impl MemoryContainerStore {
    pub fn new() -> MemoryContainerStore {
        MemoryContainerStore::default()
    }

    /// Allocates a new item and returns its id. Ids start at 1.
    pub fn allocate(&mut self, data: &[u8], page_metadata: u64) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.insert(id, (data.into(), page_metadata));
        id
    }

    /// Stores an item under a caller-chosen id, replacing any previous item.
    pub fn insert(&mut self, id: u64, data: &[u8], page_metadata: u64) {
        self.next_id = self.next_id.max(id);
        self.items.insert(id, (data.into(), page_metadata));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ContainerStore for MemoryContainerStore {
    fn get(&self, id: u64) -> Result<ContainerItem<'_>> {
        self.items
            .get(&id)
            .map(|(data, page_metadata)| ContainerItem {
                data,
                page_metadata: *page_metadata,
            })
            .ok_or_else(|| Error::invalid_format("container", format!("item {id} does not exist")))
    }
}
