//! File-backed transaction chain.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
};

use trustline_core::{StorageError, Transaction, TransactionChain, TransactionLog};

use super::write_atomic;

/// Transaction chain stored as a flat file of fixed-size records.
#[derive(Debug, Clone)]
pub struct ChainFile {
    path: PathBuf,
}

impl ChainFile {
    /// Chain stored at `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of complete records on disk, without loading them.
    pub fn height(&self) -> Result<u64, StorageError> {
        match self.path.metadata() {
            Ok(meta) => Ok(meta.len() / Transaction::SIZE as u64),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }
}

impl TransactionLog for ChainFile {
    /// Append one record.
    ///
    /// A torn record left at the tail by an earlier crash or failed write is
    /// cut off first, so new records always start on a record boundary.
    fn append(&self, transaction: &Transaction) -> Result<(), StorageError> {
        let io_err = |e| StorageError::io(&self.path, e);

        let mut file =
            OpenOptions::new().create(true).append(true).open(&self.path).map_err(io_err)?;

        let len = file.metadata().map_err(io_err)?.len();
        let aligned = len - len % Transaction::SIZE as u64;
        if aligned != len {
            tracing::warn!(
                path = %self.path.display(),
                discarded = len - aligned,
                "truncating torn transaction record"
            );
            file.set_len(aligned).map_err(io_err)?;
        }

        if let Err(e) = file.write_all(&transaction.to_bytes()) {
            // Best effort; the next append realigns anyway
            let _ = file.set_len(aligned);
            return Err(io_err(e));
        }
        file.sync_data().map_err(io_err)
    }

    fn save(&self, chain: &TransactionChain) -> Result<(), StorageError> {
        let mut image = Vec::with_capacity(chain.len() * Transaction::SIZE);
        chain.write_to(&mut image).map_err(|e| StorageError::io(&self.path, e))?;
        write_atomic(&self.path, &image)
    }

    fn load(&self) -> Result<TransactionChain, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TransactionChain::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        Ok(TransactionChain::read_from(BufReader::new(file)))
    }
}
