//! Wire protocol for the zo venue.
//!
//! Every request body is `varint(len(P)) ‖ P ‖ sig` where `P` is the
//! serialized action and `sig` a 64-byte Ed25519 signature. Responses
//! are `varint(len(R)) ‖ R` with `R` a receipt message; trailing bytes
//! are ignored. Two signature shapes exist and the venue's verifier is
//! exact about them:
//!
//! - user-sign (session creation): sign the lower-case hex encoding of
//!   the framed message, with the long-lived identity key;
//! - session-sign (everything else): sign the framed message itself,
//!   with the ephemeral session key.

pub mod error;
pub mod proto;
pub mod signer;
pub mod varint;

pub use error::{Result, WireError};
pub use proto::{
    Action, ActionKind, CancelOrder, CreateSession, ErrCode, FillMode, PlaceOrder, Receipt,
    ReceiptBody, WireSide,
};
pub use signer::{seal_frame, IdentityKey, KeyError, SessionKeypair, SIGNATURE_LEN};
pub use varint::{decode_uvarint, encode_uvarint, frame_payload, put_uvarint, read_frame};
