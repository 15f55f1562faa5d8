//! Action and receipt messages in protobuf wire format.
//!
//! The message set is small and frozen, so the fields are hand-encoded
//! on top of the varint codec rather than generated. All field tags
//! live in the `tags` module below; re-syncing against the venue's
//! published `schema.proto` is a one-module change.
//!
//! Encoding follows proto3 conventions: fields at their default value
//! are omitted, unknown fields are skipped on decode.

use crate::error::WireError;
use crate::varint::{decode_uvarint, put_uvarint};

/// Field tags for every message on the wire, in one place.
mod tags {
    // Action
    pub const ACTION_CURRENT_TIMESTAMP: u32 = 1;
    pub const ACTION_NONCE: u32 = 2;
    pub const ACTION_CREATE_SESSION: u32 = 3;
    pub const ACTION_PLACE_ORDER: u32 = 4;
    pub const ACTION_CANCEL_ORDER: u32 = 5;

    // CreateSession
    pub const CREATE_SESSION_USER_PUBKEY: u32 = 1;
    pub const CREATE_SESSION_SESSION_PUBKEY: u32 = 2;
    pub const CREATE_SESSION_EXPIRY: u32 = 3;

    // PlaceOrder
    pub const PLACE_SESSION_ID: u32 = 1;
    pub const PLACE_MARKET_ID: u32 = 2;
    pub const PLACE_SIDE: u32 = 3;
    pub const PLACE_FILL_MODE: u32 = 4;
    pub const PLACE_REDUCE_ONLY: u32 = 5;
    pub const PLACE_PRICE: u32 = 6;
    pub const PLACE_SIZE: u32 = 7;
    pub const PLACE_CLIENT_ORDER_ID: u32 = 8;

    // CancelOrder
    pub const CANCEL_SESSION_ID: u32 = 1;
    pub const CANCEL_ORDER_ID: u32 = 2;

    // Receipt
    pub const RECEIPT_ERR: u32 = 1;
    pub const RECEIPT_CREATE_SESSION_RESULT: u32 = 2;
    pub const RECEIPT_PLACE_ORDER_RESULT: u32 = 3;
    pub const RECEIPT_CANCEL_ORDER_RESULT: u32 = 4;
    pub const RECEIPT_POSITION: u32 = 5;

    // CreateSessionResult
    pub const SESSION_RESULT_SESSION_ID: u32 = 1;

    // PlaceOrderResult
    pub const PLACE_RESULT_POSTED: u32 = 1;

    // PlaceOrderResult.Posted
    pub const POSTED_ORDER_ID: u32 = 1;
}

// ---------------------------------------------------------------------------
// Field writer
// ---------------------------------------------------------------------------

const WIRE_TYPE_VARINT: u64 = 0;
const WIRE_TYPE_FIXED64: u64 = 1;
const WIRE_TYPE_LEN: u64 = 2;
const WIRE_TYPE_FIXED32: u64 = 5;

fn field_key(field: u32, wire_type: u64) -> u64 {
    (u64::from(field) << 3) | wire_type
}

/// Write a varint field, omitting the proto3 default.
pub fn put_varint_field(buf: &mut Vec<u8>, field: u32, value: u64) {
    if value == 0 {
        return;
    }
    put_uvarint(buf, field_key(field, WIRE_TYPE_VARINT));
    put_uvarint(buf, value);
}

/// Write a zigzag-encoded signed varint field.
pub fn put_sint_field(buf: &mut Vec<u8>, field: u32, value: i64) {
    if value == 0 {
        return;
    }
    put_uvarint(buf, field_key(field, WIRE_TYPE_VARINT));
    put_uvarint(buf, zigzag_encode(value));
}

/// Write a bool field (omitted when false).
pub fn put_bool_field(buf: &mut Vec<u8>, field: u32, value: bool) {
    put_varint_field(buf, field, u64::from(value));
}

/// Write a length-delimited field.
pub fn put_bytes_field(buf: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    put_uvarint(buf, field_key(field, WIRE_TYPE_LEN));
    put_uvarint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

// ---------------------------------------------------------------------------
// Field reader
// ---------------------------------------------------------------------------

/// Cursor over a single encoded message.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn uvarint(&mut self) -> Result<u64, WireError> {
        let (value, read) = decode_uvarint(self.buf, self.pos)?;
        self.pos += read;
        Ok(value)
    }

    /// Read a field key; returns (field number, wire type).
    fn field_key(&mut self) -> Result<(u32, u64), WireError> {
        let key = self.uvarint()?;
        let field = u32::try_from(key >> 3)
            .map_err(|_| WireError::MalformedFrame("field number overflows u32".into()))?;
        Ok((field, key & 0x7))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.buf.len() - self.pos < n {
            return Err(WireError::MalformedFrame(format!(
                "field wants {n} bytes, {} remain",
                self.buf.len() - self.pos
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a length-delimited field body.
    fn bytes(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.uvarint()?;
        let len = usize::try_from(len)
            .map_err(|_| WireError::MalformedFrame("field length overflows usize".into()))?;
        self.take(len)
    }

    /// Skip a field of the given wire type.
    fn skip(&mut self, wire_type: u64) -> Result<(), WireError> {
        match wire_type {
            WIRE_TYPE_VARINT => {
                self.uvarint()?;
            }
            WIRE_TYPE_FIXED64 => {
                self.take(8)?;
            }
            WIRE_TYPE_LEN => {
                self.bytes()?;
            }
            WIRE_TYPE_FIXED32 => {
                self.take(4)?;
            }
            other => {
                return Err(WireError::MalformedFrame(format!(
                    "unsupported wire type {other}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Order side on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireSide {
    Bid = 0,
    Ask = 1,
}

/// Fill mode on the wire. The grid controller only ever places
/// post-only; the flatten path uses immediate-or-cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    Limit = 0,
    PostOnly = 1,
    ImmediateOrCancel = 2,
}

/// Session creation request, signed with the identity key.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_pubkey: [u8; 32],
    pub session_pubkey: [u8; 32],
    pub expiry_timestamp: u64,
}

/// Limit order placement, signed with the session key.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub session_id: u64,
    pub market_id: u32,
    pub side: WireSide,
    pub fill_mode: FillMode,
    pub reduce_only: bool,
    /// Price in 10^-8 units, always positive.
    pub price_units: u64,
    /// Size in 10^-8 units, signed: buy positive, sell negative.
    pub size_units: i64,
    pub client_order_id: u32,
}

/// Cancel-by-id, signed with the session key.
#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub session_id: u64,
    pub order_id: u32,
}

/// The oneof body of an [`Action`].
#[derive(Debug, Clone)]
pub enum ActionKind {
    CreateSession(CreateSession),
    PlaceOrder(PlaceOrder),
    CancelOrder(CancelOrder),
}

/// Top-level request message.
#[derive(Debug, Clone)]
pub struct Action {
    /// Venue timestamp (seconds) the request was built against.
    pub current_timestamp: u64,
    pub nonce: u64,
    pub kind: ActionKind,
}

impl Action {
    /// Serialize to protobuf wire format (unframed, unsigned).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(96);
        put_varint_field(&mut buf, tags::ACTION_CURRENT_TIMESTAMP, self.current_timestamp);
        put_varint_field(&mut buf, tags::ACTION_NONCE, self.nonce);
        match &self.kind {
            ActionKind::CreateSession(body) => {
                let mut nested = Vec::with_capacity(80);
                put_bytes_field(
                    &mut nested,
                    tags::CREATE_SESSION_USER_PUBKEY,
                    &body.user_pubkey,
                );
                put_bytes_field(
                    &mut nested,
                    tags::CREATE_SESSION_SESSION_PUBKEY,
                    &body.session_pubkey,
                );
                put_varint_field(&mut nested, tags::CREATE_SESSION_EXPIRY, body.expiry_timestamp);
                put_bytes_field(&mut buf, tags::ACTION_CREATE_SESSION, &nested);
            }
            ActionKind::PlaceOrder(body) => {
                let mut nested = Vec::with_capacity(48);
                put_varint_field(&mut nested, tags::PLACE_SESSION_ID, body.session_id);
                put_varint_field(&mut nested, tags::PLACE_MARKET_ID, u64::from(body.market_id));
                put_varint_field(&mut nested, tags::PLACE_SIDE, body.side as u64);
                put_varint_field(&mut nested, tags::PLACE_FILL_MODE, body.fill_mode as u64);
                put_bool_field(&mut nested, tags::PLACE_REDUCE_ONLY, body.reduce_only);
                put_varint_field(&mut nested, tags::PLACE_PRICE, body.price_units);
                put_sint_field(&mut nested, tags::PLACE_SIZE, body.size_units);
                put_varint_field(
                    &mut nested,
                    tags::PLACE_CLIENT_ORDER_ID,
                    u64::from(body.client_order_id),
                );
                put_bytes_field(&mut buf, tags::ACTION_PLACE_ORDER, &nested);
            }
            ActionKind::CancelOrder(body) => {
                let mut nested = Vec::with_capacity(16);
                put_varint_field(&mut nested, tags::CANCEL_SESSION_ID, body.session_id);
                put_varint_field(&mut nested, tags::CANCEL_ORDER_ID, u64::from(body.order_id));
                put_bytes_field(&mut buf, tags::ACTION_CANCEL_ORDER, &nested);
            }
        }
        buf
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Venue error codes carried in receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrCode {
    SignatureInvalid,
    SessionExpired,
    SessionNotFound,
    DuplicateSession,
    OrderNotFound,
    PostOnlyWouldMatch,
    InsufficientMargin,
    Other(u32),
}

impl ErrCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::SignatureInvalid,
            2 => Self::SessionExpired,
            3 => Self::SessionNotFound,
            4 => Self::DuplicateSession,
            5 => Self::OrderNotFound,
            6 => Self::PostOnlyWouldMatch,
            7 => Self::InsufficientMargin,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::SignatureInvalid => 1,
            Self::SessionExpired => 2,
            Self::SessionNotFound => 3,
            Self::DuplicateSession => 4,
            Self::OrderNotFound => 5,
            Self::PostOnlyWouldMatch => 6,
            Self::InsufficientMargin => 7,
            Self::Other(code) => *code,
        }
    }

    /// Session errors of either flavour invalidate the local session.
    pub fn is_session_error(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::SessionNotFound)
    }
}

impl std::fmt::Display for ErrCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignatureInvalid => write!(f, "SIGNATURE_INVALID"),
            Self::SessionExpired => write!(f, "SESSION_EXPIRED"),
            Self::SessionNotFound => write!(f, "SESSION_NOT_FOUND"),
            Self::DuplicateSession => write!(f, "DUPLICATE_SESSION"),
            Self::OrderNotFound => write!(f, "ORDER_NOT_FOUND"),
            Self::PostOnlyWouldMatch => write!(f, "POST_ONLY_WOULD_MATCH"),
            Self::InsufficientMargin => write!(f, "INSUFFICIENT_MARGIN"),
            Self::Other(code) => write!(f, "ERR_{code}"),
        }
    }
}

/// The result branch of a receipt, one case per outcome kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptBody {
    SessionCreated { session_id: u64 },
    OrderPosted { order_id: u32 },
    OrderCancelled,
}

/// Decoded response message.
#[derive(Debug, Clone, Default)]
pub struct Receipt {
    /// Venue error, if the action was rejected.
    pub err: Option<ErrCode>,
    /// Success body, if the action was accepted.
    pub body: Option<ReceiptBody>,
    /// Heartbeat: current signed position in 10^-8 units, when the
    /// venue includes it.
    pub position_units: Option<i64>,
}

impl Receipt {
    /// Decode a receipt message (already unframed). Unknown fields are
    /// skipped; trailing garbage inside a nested field is a
    /// [`WireError::MalformedFrame`].
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        let mut receipt = Receipt::default();
        let mut reader = Reader::new(payload);

        while !reader.done() {
            let (field, wire_type) = reader.field_key()?;
            match field {
                tags::RECEIPT_ERR if wire_type == WIRE_TYPE_VARINT => {
                    let code = reader.uvarint()?;
                    if code != 0 {
                        let code = u32::try_from(code).map_err(|_| {
                            WireError::MalformedFrame("error code overflows u32".into())
                        })?;
                        receipt.err = Some(ErrCode::from_code(code));
                    }
                }
                tags::RECEIPT_CREATE_SESSION_RESULT if wire_type == WIRE_TYPE_LEN => {
                    let session_id = decode_session_result(reader.bytes()?)?;
                    receipt.body = Some(ReceiptBody::SessionCreated { session_id });
                }
                tags::RECEIPT_PLACE_ORDER_RESULT if wire_type == WIRE_TYPE_LEN => {
                    let order_id = decode_place_result(reader.bytes()?)?;
                    receipt.body = Some(ReceiptBody::OrderPosted { order_id });
                }
                tags::RECEIPT_CANCEL_ORDER_RESULT if wire_type == WIRE_TYPE_LEN => {
                    reader.bytes()?;
                    receipt.body = Some(ReceiptBody::OrderCancelled);
                }
                tags::RECEIPT_POSITION if wire_type == WIRE_TYPE_VARINT => {
                    receipt.position_units = Some(zigzag_decode(reader.uvarint()?));
                }
                _ => reader.skip(wire_type)?,
            }
        }

        Ok(receipt)
    }
}

fn decode_session_result(payload: &[u8]) -> Result<u64, WireError> {
    let mut reader = Reader::new(payload);
    let mut session_id = None;
    while !reader.done() {
        let (field, wire_type) = reader.field_key()?;
        if field == tags::SESSION_RESULT_SESSION_ID && wire_type == WIRE_TYPE_VARINT {
            session_id = Some(reader.uvarint()?);
        } else {
            reader.skip(wire_type)?;
        }
    }
    session_id
        .ok_or_else(|| WireError::MalformedFrame("create_session_result without session_id".into()))
}

fn decode_place_result(payload: &[u8]) -> Result<u32, WireError> {
    let mut reader = Reader::new(payload);
    let mut order_id = None;
    while !reader.done() {
        let (field, wire_type) = reader.field_key()?;
        if field == tags::PLACE_RESULT_POSTED && wire_type == WIRE_TYPE_LEN {
            let mut posted = Reader::new(reader.bytes()?);
            while !posted.done() {
                let (pf, pw) = posted.field_key()?;
                if pf == tags::POSTED_ORDER_ID && pw == WIRE_TYPE_VARINT {
                    let id = posted.uvarint()?;
                    let id = u32::try_from(id).map_err(|_| {
                        WireError::MalformedFrame("order id overflows u32".into())
                    })?;
                    order_id = Some(id);
                } else {
                    posted.skip(pw)?;
                }
            }
        } else {
            reader.skip(wire_type)?;
        }
    }
    order_id
        .ok_or_else(|| WireError::MalformedFrame("place_order_result without posted order id".into()))
}

// ---------------------------------------------------------------------------
// Test-facing receipt writer
// ---------------------------------------------------------------------------

/// Encode a receipt. Production code only decodes receipts; this is
/// used by tests and mock venues to build response bodies.
pub fn encode_receipt(receipt: &Receipt) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32);
    if let Some(err) = receipt.err {
        put_varint_field(&mut buf, tags::RECEIPT_ERR, u64::from(err.code()));
    }
    match receipt.body {
        Some(ReceiptBody::SessionCreated { session_id }) => {
            let mut nested = Vec::new();
            put_varint_field(&mut nested, tags::SESSION_RESULT_SESSION_ID, session_id);
            put_bytes_field(&mut buf, tags::RECEIPT_CREATE_SESSION_RESULT, &nested);
        }
        Some(ReceiptBody::OrderPosted { order_id }) => {
            let mut posted = Vec::new();
            put_varint_field(&mut posted, tags::POSTED_ORDER_ID, u64::from(order_id));
            let mut nested = Vec::new();
            put_bytes_field(&mut nested, tags::PLACE_RESULT_POSTED, &posted);
            put_bytes_field(&mut buf, tags::RECEIPT_PLACE_ORDER_RESULT, &nested);
        }
        Some(ReceiptBody::OrderCancelled) => {
            // empty nested message still needs its key + zero length
            put_uvarint(
                &mut buf,
                field_key(tags::RECEIPT_CANCEL_ORDER_RESULT, WIRE_TYPE_LEN),
            );
            put_uvarint(&mut buf, 0);
        }
        None => {}
    }
    if let Some(units) = receipt.position_units {
        put_sint_field(&mut buf, tags::RECEIPT_POSITION, units);
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag() {
        for value in [0i64, 1, -1, 100_000, -100_000, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(value)), value);
        }
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
    }

    #[test]
    fn test_place_order_encode_decode_fields() {
        let action = Action {
            current_timestamp: 1_700_000_000,
            nonce: 42,
            kind: ActionKind::PlaceOrder(PlaceOrder {
                session_id: 9,
                market_id: 0,
                side: WireSide::Ask,
                fill_mode: FillMode::PostOnly,
                reduce_only: false,
                price_units: 7_001_500_000_000,
                size_units: -100_000,
                client_order_id: 12345,
            }),
        };
        let encoded = action.encode();

        // walk the top-level message by hand
        let mut reader = Reader::new(&encoded);
        let (field, wt) = reader.field_key().unwrap();
        assert_eq!((field, wt), (tags::ACTION_CURRENT_TIMESTAMP, WIRE_TYPE_VARINT));
        assert_eq!(reader.uvarint().unwrap(), 1_700_000_000);

        let (field, _) = reader.field_key().unwrap();
        assert_eq!(field, tags::ACTION_NONCE);
        assert_eq!(reader.uvarint().unwrap(), 42);

        let (field, wt) = reader.field_key().unwrap();
        assert_eq!((field, wt), (tags::ACTION_PLACE_ORDER, WIRE_TYPE_LEN));
        let nested = reader.bytes().unwrap();

        let mut inner = Reader::new(nested);
        let mut seen_size = None;
        let mut seen_side = None;
        let mut seen_cloid = None;
        while !inner.done() {
            let (field, wt) = inner.field_key().unwrap();
            match field {
                tags::PLACE_SIZE => seen_size = Some(zigzag_decode(inner.uvarint().unwrap())),
                tags::PLACE_SIDE => seen_side = Some(inner.uvarint().unwrap()),
                tags::PLACE_CLIENT_ORDER_ID => seen_cloid = Some(inner.uvarint().unwrap()),
                _ => inner.skip(wt).unwrap(),
            }
        }
        assert_eq!(seen_size, Some(-100_000));
        assert_eq!(seen_side, Some(WireSide::Ask as u64));
        assert_eq!(seen_cloid, Some(12345));
    }

    #[test]
    fn test_create_session_carries_both_pubkeys() {
        let action = Action {
            current_timestamp: 100,
            nonce: 0,
            kind: ActionKind::CreateSession(CreateSession {
                user_pubkey: [0xaa; 32],
                session_pubkey: [0xbb; 32],
                expiry_timestamp: 3_700,
            }),
        };
        let encoded = action.encode();

        let mut reader = Reader::new(&encoded);
        let mut nested = None;
        while !reader.done() {
            let (field, wt) = reader.field_key().unwrap();
            if field == tags::ACTION_CREATE_SESSION {
                nested = Some(reader.bytes().unwrap().to_vec());
            } else {
                reader.skip(wt).unwrap();
            }
        }
        let nested = nested.expect("create_session body present");

        let mut inner = Reader::new(&nested);
        let mut user = None;
        let mut session = None;
        while !inner.done() {
            let (field, wt) = inner.field_key().unwrap();
            match field {
                tags::CREATE_SESSION_USER_PUBKEY => user = Some(inner.bytes().unwrap().to_vec()),
                tags::CREATE_SESSION_SESSION_PUBKEY => {
                    session = Some(inner.bytes().unwrap().to_vec())
                }
                _ => inner.skip(wt).unwrap(),
            }
        }
        assert_eq!(user.unwrap(), vec![0xaa; 32]);
        assert_eq!(session.unwrap(), vec![0xbb; 32]);
    }

    #[test]
    fn test_receipt_round_trip_session_created() {
        let receipt = Receipt {
            err: None,
            body: Some(ReceiptBody::SessionCreated { session_id: 777 }),
            position_units: None,
        };
        let decoded = Receipt::decode(&encode_receipt(&receipt)).unwrap();
        assert_eq!(decoded.body, Some(ReceiptBody::SessionCreated { session_id: 777 }));
        assert!(decoded.err.is_none());
    }

    #[test]
    fn test_receipt_round_trip_order_posted_with_position() {
        let receipt = Receipt {
            err: None,
            body: Some(ReceiptBody::OrderPosted { order_id: 54321 }),
            position_units: Some(-750_000),
        };
        let decoded = Receipt::decode(&encode_receipt(&receipt)).unwrap();
        assert_eq!(decoded.body, Some(ReceiptBody::OrderPosted { order_id: 54321 }));
        assert_eq!(decoded.position_units, Some(-750_000));
    }

    #[test]
    fn test_receipt_error_codes() {
        let receipt = Receipt {
            err: Some(ErrCode::SessionExpired),
            body: None,
            position_units: None,
        };
        let decoded = Receipt::decode(&encode_receipt(&receipt)).unwrap();
        assert_eq!(decoded.err, Some(ErrCode::SessionExpired));
        assert!(decoded.err.unwrap().is_session_error());

        let unknown = Receipt {
            err: Some(ErrCode::Other(99)),
            body: None,
            position_units: None,
        };
        let decoded = Receipt::decode(&encode_receipt(&unknown)).unwrap();
        assert_eq!(decoded.err, Some(ErrCode::Other(99)));
    }

    #[test]
    fn test_receipt_skips_unknown_fields() {
        let mut buf = Vec::new();
        // unknown varint field 15, unknown length-delimited field 16
        put_varint_field(&mut buf, 15, 123);
        put_bytes_field(&mut buf, 16, b"future extension");
        let mut nested = Vec::new();
        put_varint_field(&mut nested, tags::SESSION_RESULT_SESSION_ID, 5);
        put_bytes_field(&mut buf, tags::RECEIPT_CREATE_SESSION_RESULT, &nested);

        let decoded = Receipt::decode(&buf).unwrap();
        assert_eq!(decoded.body, Some(ReceiptBody::SessionCreated { session_id: 5 }));
    }

    #[test]
    fn test_receipt_truncated_nested_is_malformed() {
        let mut buf = Vec::new();
        put_uvarint(&mut buf, field_key(tags::RECEIPT_CREATE_SESSION_RESULT, WIRE_TYPE_LEN));
        put_uvarint(&mut buf, 50); // claims 50 bytes, none follow
        assert!(matches!(
            Receipt::decode(&buf),
            Err(WireError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_cancel_receipt_round_trip() {
        let receipt = Receipt {
            err: None,
            body: Some(ReceiptBody::OrderCancelled),
            position_units: None,
        };
        let decoded = Receipt::decode(&encode_receipt(&receipt)).unwrap();
        assert_eq!(decoded.body, Some(ReceiptBody::OrderCancelled));
    }
}
