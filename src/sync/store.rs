//! Record store
//!
//! Ordered, capacity-bounded collection of named byte payloads. The master
//! stages values here before each broadcast; a slave merges every received
//! datagram into it and serves reads from it.

use std::fmt;

use crate::core::StoreError;
use crate::core::constants::{MAX_NAME_LEN, MAX_PAYLOAD_SIZE, MAX_RECORDS, NAME_TERMINATOR};

/// A named, owned byte payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: String,
    payload: Vec<u8>,
}

impl Record {
    /// Record name (unique within its store).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Current payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Record store
///
/// Records keep first-write order, which is also their serialization order.
/// Lookups are linear: a store holds tens of records and each one is looked
/// up at most once per frame.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
    capacity: usize,
}

impl RecordStore {
    /// Create an empty store with the default record cap.
    pub fn new() -> Self {
        Self::with_capacity(MAX_RECORDS)
    }

    /// Create an empty store holding at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    /// Maximum number of records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of the record called `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name == name)
    }

    /// Payload of the record called `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.find(name).map(|i| self.records[i].payload())
    }

    /// Iterate over records in serialization order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Store `bytes` under `name`.
    ///
    /// Unknown names are appended. A known name whose size changed gets a
    /// fresh buffer of the new size; the old one is dropped first.
    pub fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        validate_name(name)?;
        if bytes.len() > MAX_PAYLOAD_SIZE {
            return Err(StoreError::PayloadTooLarge {
                name: name.to_owned(),
                size: bytes.len(),
            });
        }

        match self.find(name) {
            Some(index) => {
                let record = &mut self.records[index];
                if record.payload.len() == bytes.len() {
                    record.payload.copy_from_slice(bytes);
                } else {
                    record.payload = bytes.to_vec();
                }
            }
            None => {
                if self.records.len() >= self.capacity {
                    return Err(StoreError::CapacityExceeded {
                        capacity: self.capacity,
                    });
                }
                self.records.push(Record {
                    name: name.to_owned(),
                    payload: bytes.to_vec(),
                });
            }
        }
        Ok(())
    }

    /// Copy the record called `name` into `dest`, returning the bytes copied.
    ///
    /// `dest` is left untouched on error.
    pub fn read(&self, name: &str, dest: &mut [u8]) -> Result<usize, StoreError> {
        let payload = self.get(name).ok_or_else(|| StoreError::NotFound {
            name: name.to_owned(),
        })?;

        if dest.len() < payload.len() {
            return Err(StoreError::BufferTooSmall {
                name: name.to_owned(),
                required: payload.len(),
                available: dest.len(),
            });
        }

        dest[..payload.len()].copy_from_slice(payload);
        Ok(payload.len())
    }

    /// Release every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.records.is_empty() {
            return write!(f, "[ the list is empty ]");
        }
        writeln!(f, "index  size name")?;
        for (i, record) in self.records.iter().enumerate() {
            writeln!(f, "{:5} {:5} {}", i, record.size(), record.name)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.len() > MAX_NAME_LEN {
        return Err(StoreError::InvalidName {
            reason: format!("{} bytes exceeds the {MAX_NAME_LEN} byte limit", name.len()),
        });
    }
    if name.as_bytes().contains(&NAME_TERMINATOR) {
        return Err(StoreError::InvalidName {
            reason: "embedded NUL byte".to_owned(),
        });
    }
    Ok(())
}
