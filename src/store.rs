use std::collections::HashMap;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::models::Descriptor;

/// Full composite key: an entry is only retrievable when media type, digest
/// and size all match the descriptor used to look it up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BlobKey {
    media_type: String,
    digest: String,
    size: u64,
}

impl BlobKey {
    fn from_descriptor(desc: &Descriptor) -> Self {
        Self {
            media_type: desc.media_type.clone(),
            digest: desc.digest.to_string(),
            size: desc.size,
        }
    }
}

/// In-memory content-addressable store, scoped to a single build-and-push or
/// pull operation. The store does not verify that a descriptor's digest
/// matches the content it is given; callers construct descriptors from the
/// bytes themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<BlobKey, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the content for `descriptor`.
    pub fn put(&mut self, descriptor: &Descriptor, content: Bytes) {
        self.blobs
            .insert(BlobKey::from_descriptor(descriptor), content);
    }

    /// Fetch the content for `descriptor`, failing when no entry matches
    /// exactly on all three key fields.
    pub fn get(&self, descriptor: &Descriptor) -> Result<Bytes> {
        self.blobs
            .get(&BlobKey::from_descriptor(descriptor))
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "blob {} ({}, {} bytes) not in store",
                    descriptor.digest, descriptor.media_type, descriptor.size
                ))
            })
    }

    pub fn contains(&self, descriptor: &Descriptor) -> bool {
        self.blobs.contains_key(&BlobKey::from_descriptor(descriptor))
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Descriptor;

    #[test]
    fn put_then_get_round_trips() {
        let mut store = MemoryStore::new();
        let content = Bytes::from_static(b"spec document");
        let desc = Descriptor::from_content("text/yaml", &content);

        store.put(&desc, content.clone());
        assert_eq!(store.get(&desc).unwrap(), content);
        assert!(store.contains(&desc));
    }

    #[test]
    fn get_requires_exact_key_match() {
        let mut store = MemoryStore::new();
        let content = Bytes::from_static(b"spec document");
        let desc = Descriptor::from_content("text/yaml", &content);
        store.put(&desc, content);

        // same digest and size, different media type
        let mut other = desc.clone();
        other.media_type = "application/octet-stream".to_string();
        assert!(matches!(store.get(&other), Err(Error::NotFound(_))));

        // same media type and digest, different size
        let mut other = desc.clone();
        other.size += 1;
        assert!(matches!(store.get(&other), Err(Error::NotFound(_))));
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let mut store = MemoryStore::new();
        let content = Bytes::from_static(b"v1");
        let desc = Descriptor::from_content("text/yaml", &content);

        store.put(&desc, content.clone());
        store.put(&desc, content.clone());
        assert_eq!(store.len(), 1);
    }
}
