//! Mailbox PIR over BFV
//!
//! A client retrieves one fixed-size row from the server's database without
//! the server learning which row.
//!
//! # Protocol Overview
//!
//! 1. **Store**: the server allocates rows and encodes each chunk of n rows
//!    as column plaintexts
//! 2. **Query**: the client encrypts a one-hot selection vector per chunk,
//!    sized against its own row-count bound, plus two rotation keys
//! 3. **Answer**: the server multiplies, sums over chunks and folds all
//!    columns into a single ciphertext with rotations
//! 4. **Decode**: the client decrypts, realigns the slots and repacks the row
//!
//! # Example
//!
//! ```ignore
//! use mailbox_pir::params::{BfvParams, CLIENT_DB_ROWS, MESSAGE_SIZE};
//! use mailbox_pir::pir::{PirClient, PirServer};
//!
//! let server = PirServer::new(BfvParams::default())?;
//! // Provision up to the bound clients size their queries against
//! server.allocate_to(CLIENT_DB_ROWS - 1);
//! let index = 42;
//! server.set_value(index, &[7u8; MESSAGE_SIZE])?;
//!
//! let client = PirClient::new(BfvParams::default())?;
//! let query = client.build_query(index, CLIENT_DB_ROWS)?;
//! let answer = server.answer(&query)?;
//! assert_eq!(client.decode(&answer, index)?, [7u8; MESSAGE_SIZE]);
//! ```

mod client;
pub mod error;
mod query;
mod server;

pub use client::PirClient;
pub use error::{PirError, Result};
pub use query::{Answer, Query};
pub use server::PirServer;
