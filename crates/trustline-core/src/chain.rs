//! Append-only transaction history.
//!
//! Each accepted mutation becomes one fixed-size [`Transaction`] record. A
//! backing store holds the records back to back, so file order is logical
//! order and the record count is `len / Transaction::SIZE`.
//!
//! ```text
//! offset  size  field
//!      0     1  command
//!      1    32  x_username
//!     33    32  y_server_address
//!     65    32  y_username
//!     97     4  trustline   (big-endian i32)
//!    101     4  counter     (big-endian u32)
//!    105     8  timestamp   (big-endian u64, Unix seconds)
//!    113    32  signature   (tag of the frame that authorised it)
//! ```
//!
//! Loading is fail-soft: a truncated trailing record is ignored, and a read
//! or allocation failure part way through yields the records read so far.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut};
use parking_lot::Mutex;
use trustline_proto::{
    Frame,
    frame::{Name, SIGNATURE_SIZE},
};

use crate::storage::StorageError;

/// One accepted ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Command that produced the mutation
    pub command: u8,
    /// Local account
    pub x_username: Name,
    /// Counterparty host
    pub y_server_address: Name,
    /// Counterparty account
    pub y_username: Name,
    /// Trust-line value after the mutation
    pub trustline: i32,
    /// Counter of the authorising frame
    pub counter: u32,
    /// When the mutation was applied (Unix seconds)
    pub timestamp: u64,
    /// Tag of the authorising frame
    pub signature: [u8; SIGNATURE_SIZE],
}

impl Transaction {
    /// Encoded record size
    pub const SIZE: usize = 1 + 3 * Name::CAPACITY + 4 + 4 + 8 + SIGNATURE_SIZE;

    /// Record the mutation authorised by `frame`.
    pub fn from_frame(frame: &Frame, trustline: i32, timestamp: u64) -> Self {
        Self {
            command: frame.command,
            x_username: frame.x_username,
            y_server_address: frame.y_server_address,
            y_username: frame.y_username,
            trustline,
            counter: frame.counter,
            timestamp,
            signature: frame.signature,
        }
    }

    /// Append the encoded record to `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(self.command);
        dst.put_slice(self.x_username.as_bytes());
        dst.put_slice(self.y_server_address.as_bytes());
        dst.put_slice(self.y_username.as_bytes());
        dst.put_i32(self.trustline);
        dst.put_u32(self.counter);
        dst.put_u64(self.timestamp);
        dst.put_slice(&self.signature);
    }

    /// Encode into a fixed array.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        self.encode(&mut &mut out[..]);
        out
    }

    /// Decode one record. Every bit pattern is a valid record.
    pub fn decode(bytes: &[u8; Self::SIZE]) -> Self {
        let mut buf = &bytes[..];
        Self {
            command: buf.get_u8(),
            x_username: Name::from_bytes(take_array(&mut buf)),
            y_server_address: Name::from_bytes(take_array(&mut buf)),
            y_username: Name::from_bytes(take_array(&mut buf)),
            trustline: buf.get_i32(),
            counter: buf.get_u32(),
            timestamp: buf.get_u64(),
            signature: take_array(&mut buf),
        }
    }
}

fn take_array<const N: usize>(buf: &mut impl Buf) -> [u8; N] {
    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    out
}

/// Ordered, owned sequence of transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionChain {
    records: Vec<Transaction>,
}

impl TransactionChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record in memory.
    pub fn push(&mut self, transaction: Transaction) {
        self.records.push(transaction);
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the chain has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `index`, oldest first
    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.records.get(index)
    }

    /// Most recent record
    pub fn last(&self) -> Option<&Transaction> {
        self.records.last()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.records.iter()
    }

    /// All records as a slice
    pub fn as_slice(&self) -> &[Transaction] {
        &self.records
    }

    /// Write every record, in order, to `writer`.
    pub fn write_to(&self, mut writer: impl Write) -> io::Result<()> {
        for transaction in &self.records {
            writer.write_all(&transaction.to_bytes())?;
        }
        writer.flush()
    }

    /// Read records until end of data.
    ///
    /// Never fails: a trailing partial record is dropped, and a read error
    /// or failed allocation ends the load with what was read before it.
    pub fn read_from(mut reader: impl Read) -> Self {
        let mut chain = Self::new();
        let mut record = [0u8; Transaction::SIZE];

        loop {
            match read_record(&mut reader, &mut record) {
                Ok(0) => break,
                Ok(n) if n < Transaction::SIZE => {
                    tracing::debug!(bytes = n, "ignoring truncated trailing transaction record");
                    break;
                },
                Ok(_) => {
                    if chain.records.try_reserve(1).is_err() {
                        tracing::warn!(
                            records = chain.len(),
                            "allocation failed loading transaction chain, keeping records read so far"
                        );
                        break;
                    }
                    chain.records.push(Transaction::decode(&record));
                },
                Err(error) => {
                    tracing::warn!(
                        %error,
                        records = chain.len(),
                        "read failed loading transaction chain, keeping records read so far"
                    );
                    break;
                },
            }
        }

        chain
    }
}

/// Fill `buf` as far as the reader allows, returning the bytes read.
fn read_record(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl From<Vec<Transaction>> for TransactionChain {
    fn from(records: Vec<Transaction>) -> Self {
        Self { records }
    }
}

impl FromIterator<Transaction> for TransactionChain {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self { records: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a TransactionChain {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Durable backing store for a transaction chain.
pub trait TransactionLog: Send + Sync {
    /// Append one record without reading existing content.
    fn append(&self, transaction: &Transaction) -> Result<(), StorageError>;

    /// Replace the store's content with `chain`.
    fn save(&self, chain: &TransactionChain) -> Result<(), StorageError>;

    /// Load every complete record, fail-soft (see [`TransactionChain::read_from`]).
    fn load(&self) -> Result<TransactionChain, StorageError>;
}

/// In-memory log holding the same byte image a file would.
#[derive(Debug, Default)]
pub struct MemoryTransactionLog {
    bytes: Mutex<Vec<u8>>,
}

impl MemoryTransactionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw byte image of the log
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }
}

impl TransactionLog for MemoryTransactionLog {
    fn append(&self, transaction: &Transaction) -> Result<(), StorageError> {
        self.bytes.lock().extend_from_slice(&transaction.to_bytes());
        Ok(())
    }

    fn save(&self, chain: &TransactionChain) -> Result<(), StorageError> {
        let mut image = Vec::with_capacity(chain.len() * Transaction::SIZE);
        chain
            .write_to(&mut image)
            .map_err(|source| StorageError::io("<memory>", source))?;
        *self.bytes.lock() = image;
        Ok(())
    }

    fn load(&self) -> Result<TransactionChain, StorageError> {
        Ok(TransactionChain::read_from(&self.bytes.lock()[..]))
    }
}
