use bytes::Bytes;

/// Hard limit on the number of files a single load may publish.
pub const MAX_ENTRIES: usize = 65_534;

/// One cached file: the request path it is served under, the full path
/// hash, the preloaded body, and the inferred Content-Type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub hash: u64,
    pub body: Bytes,
    pub mime: &'static str,
}

impl Entry {
    /// Byte count of the cached body.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Hashes a request path: `h = h * 31 + byte`, wrapping 64-bit arithmetic.
/// The full hash is stored per entry; the table index is `hash & mask`.
pub fn path_hash(path: &str) -> u64 {
    path.bytes()
        .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)))
}

/// An immutable content map built by one cache load. Open-addressed with
/// linear probing; the slot count is a power of two strictly greater than
/// the entry count, so the load factor stays at or below one half.
#[derive(Debug)]
pub struct Snapshot {
    slots: Vec<Option<Entry>>,
    mask: usize,
    count: usize,
}

impl Snapshot {
    /// Builds a snapshot from the entries a directory walk produced. A
    /// duplicate path replaces the earlier entry in place.
    pub fn build(entries: Vec<Entry>) -> Self {
        let mut capacity = 1usize;
        while capacity <= entries.len() {
            capacity <<= 1;
        }
        let mask = capacity - 1;

        let mut slots: Vec<Option<Entry>> = vec![None; capacity];
        let mut count = 0;
        for entry in entries {
            let mut index = (entry.hash as usize) & mask;
            loop {
                let slot = &mut slots[index];
                match slot {
                    Some(occupant) if occupant.path == entry.path => {
                        *slot = Some(entry);
                        break;
                    }
                    Some(_) => {
                        index = (index + 1) & mask;
                    }
                    None => {
                        *slot = Some(entry);
                        count += 1;
                        break;
                    }
                }
            }
        }

        Snapshot { slots, mask, count }
    }

    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    /// Probes for the entry stored under `path`. A miss terminates on an
    /// empty slot, or on wrapping back to the origin index when the table
    /// is full.
    pub fn get(&self, path: &str) -> Option<&Entry> {
        let origin = (path_hash(path) as usize) & self.mask;
        let mut index = origin;
        loop {
            match &self.slots[index] {
                None => return None,
                Some(entry) if entry.path == path => return Some(entry),
                Some(_) => {
                    index = (index + 1) & self.mask;
                    if index == origin {
                        return None;
                    }
                }
            }
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total slot count; always a power of two greater than `len()`.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterates the occupied slots in table order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}
