//! Common types shared across `voucher-pipeline` crates: tabular records,
//! per-row decode outcomes, and the fatal error taxonomy.

pub mod error;
pub mod outcome;
pub mod record;

pub use error::PipelineError;
pub use outcome::DecryptionOutcome;
pub use record::{AugmentedRecord, Record, DECRYPTED_COLUMN, ENCRYPTED_COLUMN};
