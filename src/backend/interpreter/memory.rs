use hashbrown::HashMap;

use super::RuntimeError;
use crate::middle::{frame::WORD_SIZE, label::Label};

/// The simulated address space. Address 0 is never handed out so a zero
/// static link can not be mistaken for a frame. The static area grows up from
/// the bottom, the stack grows down from the top.
#[derive(Debug)]
pub struct Memory {
    bytes: Vec<u8>,
    labels: HashMap<Label, i64>,
    /// First address past the static area
    static_end: i64,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            labels: HashMap::new(),
            static_end: WORD_SIZE,
        }
    }

    pub fn size(&self) -> i64 {
        self.bytes.len() as i64
    }

    pub fn static_end(&self) -> i64 {
        self.static_end
    }

    /// Reserves `size` bytes of static memory for `label`, rounded up to a
    /// whole number of words
    pub fn allocate(&mut self, label: Label, size: i64) -> Result<i64, RuntimeError> {
        let address = self.static_end;
        let end = (size.max(1) as u64)
            .div_ceil(WORD_SIZE as u64)
            .checked_mul(WORD_SIZE as u64)
            .and_then(|bytes| i64::try_from(bytes).ok())
            .and_then(|bytes| address.checked_add(bytes))
            .filter(|end| *end <= self.size())
            .ok_or(RuntimeError::AddressOutOfBounds(address))?;

        self.static_end = end;
        self.labels.insert(label, address);

        Ok(address)
    }

    pub fn address_of(&self, label: &Label) -> Option<i64> {
        self.labels.get(label).copied()
    }

    /// The bytes `address..address + len`, if all of them are inside memory
    fn range(&self, address: i64, len: usize) -> Result<core::ops::Range<usize>, RuntimeError> {
        let start = usize::try_from(address).map_err(|_| RuntimeError::AddressOutOfBounds(address))?;

        start
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .map(|end| start..end)
            .ok_or(RuntimeError::AddressOutOfBounds(address))
    }

    pub fn load(&self, address: i64) -> Result<i64, RuntimeError> {
        let range = self.range(address, WORD_SIZE as usize)?;
        let mut word = [0; WORD_SIZE as usize];
        word.copy_from_slice(&self.bytes[range]);
        Ok(i64::from_le_bytes(word))
    }

    pub fn store(&mut self, address: i64, value: i64) -> Result<(), RuntimeError> {
        let range = self.range(address, WORD_SIZE as usize)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Copies `bytes` to `address` followed by a NUL terminator
    pub fn store_string(&mut self, address: i64, bytes: &[u8]) -> Result<(), RuntimeError> {
        let range = self.range(address, bytes.len().saturating_add(1))?;
        let (text, terminator) = self.bytes[range].split_at_mut(bytes.len());
        text.copy_from_slice(bytes);
        terminator[0] = 0;
        Ok(())
    }

    /// Reads the NUL terminated string starting at `address`
    pub fn load_string(&self, address: i64) -> Result<String, RuntimeError> {
        let start = self.range(address, 0)?.start;
        let len = self.bytes[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(RuntimeError::AddressOutOfBounds(self.size()))?;

        Ok(String::from_utf8_lossy(&self.bytes[start..start + len]).into_owned())
    }
}
