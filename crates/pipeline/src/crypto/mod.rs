//! Voucher token authentication and decryption primitives.
//!
//! This module is intentionally free of I/O, batching, and export
//! dependencies. It provides the single-token decode operation driven by the
//! batch layer.
//!
//! # Token format
//!
//! ```text
//! base64( iv[16] || mac[32] || ciphertext )
//! ```
//!
//! The MAC is HMAC-SHA-256 over the **ciphertext only**; the IV is not
//! covered. That is a property of the legacy wire format that existing token
//! issuers rely on. Widening the MAC input would reject every token already
//! in circulation, so the scope must not be changed here.

pub mod codec;
pub mod key;

pub use codec::VoucherCodec;
pub use key::{VoucherKey, KEY_LEN};
