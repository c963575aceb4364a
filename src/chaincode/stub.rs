use std::collections::BTreeMap;

pub type WorldState = BTreeMap<String, Vec<u8>>;

/// What a contract sees while executing: reads against a snapshot of the
/// world state, writes buffered until the transaction commits.
pub struct ChaincodeStub<'a> {
    state: &'a WorldState,
    tx_id: &'a str,
    writes: BTreeMap<String, Vec<u8>>,
}

impl<'a> ChaincodeStub<'a> {
    pub fn new(state: &'a WorldState, tx_id: &'a str) -> Self {
        Self {
            state,
            tx_id,
            writes: BTreeMap::new(),
        }
    }

    /// Reads see this transaction's own writes.
    pub fn get_state(&self, key: &str) -> Option<&[u8]> {
        self.writes
            .get(key)
            .or_else(|| self.state.get(key))
            .map(Vec::as_slice)
    }

    pub fn put_state(&mut self, key: &str, value: Vec<u8>) {
        self.writes.insert(key.to_string(), value);
    }

    pub fn tx_id(&self) -> &str {
        self.tx_id
    }

    pub fn into_writes(self) -> Vec<(String, Vec<u8>)> {
        self.writes.into_iter().collect()
    }
}
