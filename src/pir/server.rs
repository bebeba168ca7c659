//! PIR server: row storage, database encoding and query answering
//!
//! # Layout
//!
//! Rows are grouped into chunks of n rows (n = slot count). Within a chunk,
//! row r occupies slot r of every column plaintext, and column j holds bits
//! `[j·plain_bits, (j+1)·plain_bits)` of each row. A chunk therefore has
//! `db_columns` plaintexts, kept in the NTT domain. Columns that are zero in
//! every row of the chunk are not stored.
//!
//! # Answer
//!
//! 1. Column products: `compressed_j = Σ_c query_c ⊙ chunk_c[j]`. Only the
//!    selected slot survives, so `compressed_j` carries coefficient j of the
//!    wanted row in that slot.
//! 2. Fold: the lower columns are combined as `Σ_j rotate_right^j(compressed_j)`
//!    using Horner's rule, so a single rotation key (one step right) suffices.
//!    The upper columns are folded the same way and moved to the other slot
//!    row with a column swap.
//!
//! # Concurrency
//!
//! Writers are serialized on the row store. Chunk encodings are immutable
//! and shared behind `Arc`; a writer re-encodes the affected chunk off to the
//! side and swaps it in under a brief write lock. An answer clones the chunk
//! list under a brief read lock and then works on that snapshot, so it always
//! sees each row either fully before or fully after a concurrent write.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::bfv::{BatchEncoder, BfvContext, Ciphertext, GaloisKeys, PlaintextNtt};
use crate::bfv::{column_swap_element, galois_element};
use crate::codec::extract_submatrix;
use crate::params::{BfvParams, Row, MESSAGE_SIZE, MESSAGE_SIZE_BITS};

use super::error::{malformed, PirError, Result};
use super::query::{Answer, Query};

/// Encoded form of one chunk of n rows
#[derive(Debug)]
struct EncodedChunk {
    /// One plaintext per column; `None` for all-zero columns
    columns: Vec<Option<PlaintextNtt>>,
}

impl EncodedChunk {
    fn empty(db_columns: usize) -> Self {
        Self {
            columns: vec![None; db_columns],
        }
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    chunks: Vec<Arc<EncodedChunk>>,
    row_count: usize,
}

/// PIR server holding the mailbox database
pub struct PirServer {
    ctx: Arc<BfvContext>,
    encoder: BatchEncoder,
    /// Raw rows, `MESSAGE_SIZE` bytes each; the lock serializes writers
    rows: Mutex<Vec<u8>>,
    snapshot: RwLock<Snapshot>,
}

impl PirServer {
    pub fn new(params: BfvParams) -> Result<Self> {
        Self::with_context(BfvContext::new(params)?)
    }

    pub fn with_context(ctx: Arc<BfvContext>) -> Result<Self> {
        let encoder = BatchEncoder::new(ctx.clone())?;
        Ok(Self {
            ctx,
            encoder,
            rows: Mutex::new(Vec::new()),
            snapshot: RwLock::new(Snapshot::default()),
        })
    }

    pub fn context(&self) -> &Arc<BfvContext> {
        &self.ctx
    }

    pub fn row_count(&self) -> usize {
        self.snapshot.read().row_count
    }

    pub fn chunk_count(&self) -> usize {
        self.snapshot.read().chunks.len()
    }

    /// Append a zeroed row and return its index.
    ///
    /// A zero row leaves the encoding of its chunk unchanged, so only a new
    /// chunk (at every n-th row) needs any encoding work.
    pub fn allocate(&self) -> usize {
        let mut rows = self.rows.lock();
        let index = rows.len() / MESSAGE_SIZE;
        self.grow(&mut rows, index + 1);
        index
    }

    /// Allocate rows until `max_index` is valid. No-op if it already is.
    pub fn allocate_to(&self, max_index: usize) {
        let mut rows = self.rows.lock();
        if max_index < rows.len() / MESSAGE_SIZE {
            return;
        }
        self.grow(&mut rows, max_index + 1);
    }

    fn grow(&self, rows: &mut Vec<u8>, row_count: usize) {
        rows.resize(row_count * MESSAGE_SIZE, 0);

        let params = self.ctx.params();
        let mut snapshot = self.snapshot.write();
        while snapshot.chunks.len() < params.chunk_count(row_count) {
            snapshot
                .chunks
                .push(Arc::new(EncodedChunk::empty(params.db_columns())));
        }
        snapshot.row_count = row_count;
        self.check_rep(rows, &snapshot);

        debug!(row_count, chunks = snapshot.chunks.len(), "allocated rows");
    }

    /// Overwrite row `index` and re-encode its chunk.
    pub fn set_value(&self, index: usize, value: &Row) -> Result<()> {
        let started = Instant::now();
        let mut rows = self.rows.lock();
        let row_count = rows.len() / MESSAGE_SIZE;
        if index >= row_count {
            return Err(PirError::IndexNotAllocated { index, row_count });
        }

        rows[index * MESSAGE_SIZE..(index + 1) * MESSAGE_SIZE].copy_from_slice(value);

        let n = self.ctx.degree();
        let chunk_index = index / n;
        let start = chunk_index * n * MESSAGE_SIZE;
        let end = rows.len().min(start + n * MESSAGE_SIZE);
        let chunk = Arc::new(self.encode_chunk(&rows[start..end]));

        let mut snapshot = self.snapshot.write();
        snapshot.chunks[chunk_index] = chunk;
        self.check_rep(&rows, &snapshot);
        drop(snapshot);

        debug!(
            index,
            chunk = chunk_index,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "updated row"
        );
        Ok(())
    }

    /// Current contents of row `index`
    pub fn get_value(&self, index: usize) -> Result<Row> {
        let rows = self.rows.lock();
        let row_count = rows.len() / MESSAGE_SIZE;
        if index >= row_count {
            return Err(PirError::IndexNotAllocated { index, row_count });
        }
        let mut row = [0u8; MESSAGE_SIZE];
        row.copy_from_slice(&rows[index * MESSAGE_SIZE..(index + 1) * MESSAGE_SIZE]);
        Ok(row)
    }

    /// Encode the rows of one chunk into column plaintexts
    fn encode_chunk(&self, chunk_rows: &[u8]) -> EncodedChunk {
        let params = self.ctx.params();
        let plain_bits = params.plain_bits;
        let slots = params.slot_count();

        let columns = (0..params.db_columns())
            .into_par_iter()
            .map(|j| {
                let values =
                    extract_submatrix(chunk_rows, MESSAGE_SIZE_BITS, j * plain_bits, plain_bits, slots);
                if values.iter().all(|&v| v == 0) {
                    return None;
                }
                Some(self.encoder.encode(&values).to_ntt(&self.ctx))
            })
            .collect();

        EncodedChunk { columns }
    }

    /// Answer an encrypted query against the current database
    pub fn answer(&self, query: &Query) -> Result<Answer> {
        let started = Instant::now();
        let ctx = &*self.ctx;
        if !query.galois_keys.fits(ctx) || !query.ciphertexts.iter().all(|ct| ct.fits(ctx)) {
            return Err(malformed!("query was built in a different ring"));
        }

        let chunks = self.snapshot.read().chunks.clone();

        if query.chunk_count() > chunks.len() {
            return Err(PirError::QueryTooLarge {
                query_chunks: query.chunk_count(),
                db_chunks: chunks.len(),
            });
        }

        let n = ctx.degree();
        let half = n / 2;
        let db_columns = ctx.params().db_columns();
        let keys = &query.galois_keys;

        let step = galois_element(-1, n);
        if db_columns > 1 && !keys.contains(step) {
            return Err(PirError::MissingGaloisKey(step));
        }
        if db_columns > half && !keys.contains(column_swap_element(n)) {
            return Err(PirError::MissingGaloisKey(column_swap_element(n)));
        }

        let selections: Vec<Ciphertext> = query
            .ciphertexts
            .par_iter()
            .map(|ct| {
                let mut ct = ct.clone();
                ct.to_ntt(ctx);
                ct
            })
            .collect();

        let compressed: Vec<Ciphertext> = (0..db_columns)
            .into_par_iter()
            .map(|j| {
                let mut acc = Ciphertext::zero_ntt(ctx);
                for (selection, chunk) in selections.iter().zip(&chunks) {
                    if let Some(pt) = &chunk.columns[j] {
                        acc.multiply_plain_acc(selection, pt, ctx);
                    }
                }
                acc.from_ntt(ctx);
                acc
            })
            .collect();

        let (lower, upper) = compressed.split_at(db_columns.min(half));
        let mut result = fold_columns(ctx, keys, lower)?;
        if !upper.is_empty() {
            let folded = fold_columns(ctx, keys, upper)?;
            result.add_assign(&keys.rotate_columns(ctx, &folded)?);
        }

        info!(
            chunks = selections.len(),
            columns = db_columns,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answered PIR query"
        );

        Ok(Answer { ciphertext: result })
    }

    fn check_rep(&self, rows: &[u8], snapshot: &Snapshot) {
        let params = self.ctx.params();
        assert_eq!(rows.len() % MESSAGE_SIZE, 0, "row store holds a partial row");
        let row_count = rows.len() / MESSAGE_SIZE;
        assert_eq!(snapshot.row_count, row_count, "snapshot row count out of sync");
        assert_eq!(
            snapshot.chunks.len(),
            params.chunk_count(row_count),
            "chunk count does not cover the rows"
        );
        assert!(
            snapshot
                .chunks
                .iter()
                .all(|c| c.columns.len() == params.db_columns()),
            "chunk with wrong column count"
        );
    }
}

/// `Σ_i rotate_right^i(columns[i])`, evaluated as
/// `c_0 + R(c_1 + R(c_2 + ...))` with R one step right.
fn fold_columns(ctx: &BfvContext, keys: &GaloisKeys, columns: &[Ciphertext]) -> Result<Ciphertext> {
    let mut rev = columns.iter().rev();
    let mut acc = match rev.next() {
        Some(last) => last.clone(),
        None => return Ok(Ciphertext::zero(ctx)),
    };
    for column in rev {
        acc = keys.rotate_rows(ctx, &acc, -1)?;
        acc.add_assign(column);
    }
    Ok(acc)
}

impl std::fmt::Debug for PirServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PirServer")
            .field("params", self.ctx.params())
            .field("row_count", &self.row_count())
            .field("chunk_count", &self.chunk_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pir::PirClient;

    fn server(n: usize) -> PirServer {
        PirServer::new(BfvParams::with_degree(n)).unwrap()
    }

    fn row_with(prefix: &[u8]) -> Row {
        let mut row = [0u8; MESSAGE_SIZE];
        row[..prefix.len()].copy_from_slice(prefix);
        row
    }

    #[test]
    fn test_allocate_sequence() {
        let s = server(512);
        assert_eq!(s.row_count(), 0);
        assert_eq!(s.chunk_count(), 0);

        assert_eq!(s.allocate(), 0);
        assert_eq!(s.allocate(), 1);
        assert_eq!(s.row_count(), 2);
        assert_eq!(s.chunk_count(), 1);
        assert_eq!(s.get_value(1).unwrap(), [0u8; MESSAGE_SIZE]);
    }

    #[test]
    fn test_allocate_to() {
        let s = server(512);
        s.allocate_to(600);
        assert_eq!(s.row_count(), 601);
        assert_eq!(s.chunk_count(), 2);

        // already valid
        s.allocate_to(10);
        assert_eq!(s.row_count(), 601);
        assert_eq!(s.allocate(), 601);
    }

    #[test]
    fn test_set_value_requires_allocation() {
        let s = server(512);
        s.allocate();
        assert!(matches!(
            s.set_value(1, &row_with(b"x")),
            Err(PirError::IndexNotAllocated {
                index: 1,
                row_count: 1
            })
        ));
        assert!(s.get_value(1).is_err());
    }

    #[test]
    fn test_set_and_get_value() {
        let s = server(512);
        s.allocate_to(3);
        s.set_value(2, &row_with(b"hello")).unwrap();
        assert_eq!(&s.get_value(2).unwrap()[..5], b"hello");
        assert_eq!(s.get_value(3).unwrap(), [0u8; MESSAGE_SIZE]);
    }

    #[test]
    fn test_zero_columns_are_not_stored() {
        let s = server(512);
        s.allocate();
        s.set_value(0, &row_with(&[0xFF])).unwrap();

        let snapshot = s.snapshot.read();
        let stored = snapshot.chunks[0].columns.iter().filter(|c| c.is_some()).count();
        // 8 set bits fall in the first 18-bit column
        assert_eq!(stored, 1);
    }

    #[test]
    fn test_query_too_large() {
        let s = server(512);
        s.allocate();
        let client = PirClient::new(BfvParams::with_degree(512)).unwrap();
        let query = client.build_query(0, 1024).unwrap();
        assert!(matches!(
            s.answer(&query),
            Err(PirError::QueryTooLarge {
                query_chunks: 2,
                db_chunks: 1
            })
        ));
    }

    #[test]
    fn test_query_from_other_ring_rejected() {
        let s = server(1024);
        s.allocate();
        let client = PirClient::new(BfvParams::with_degree(512)).unwrap();
        let query = client.build_query(0, 1).unwrap();
        assert!(matches!(s.answer(&query), Err(PirError::Malformed(_))));

        // keys from one ring, ciphertexts from another
        let native = PirClient::new(BfvParams::with_degree(1024)).unwrap();
        let mut mixed = native.build_query(0, 1).unwrap();
        mixed.galois_keys = query.galois_keys.clone();
        assert!(matches!(s.answer(&mixed), Err(PirError::Malformed(_))));
    }

    #[test]
    fn test_missing_rotation_key() {
        let s = server(512);
        s.allocate();
        let client = PirClient::new(BfvParams::with_degree(512)).unwrap();
        let mut query = client.build_query(0, 1).unwrap();
        query.galois_keys = GaloisKeys::default();
        assert!(matches!(s.answer(&query), Err(PirError::MissingGaloisKey(_))));
    }

    #[test]
    fn test_answer_roundtrip() {
        let s = server(512);
        let client = PirClient::new(BfvParams::with_degree(512)).unwrap();
        s.allocate_to(4);

        let mut row = [0u8; MESSAGE_SIZE];
        for (i, b) in row.iter_mut().enumerate() {
            *b = (i * 7 + 1) as u8;
        }
        s.set_value(3, &row).unwrap();

        let query = client.build_query(3, 5).unwrap();
        let answer = s.answer(&query).unwrap();
        assert_eq!(client.decode(&answer, 3).unwrap(), row);
    }
}
