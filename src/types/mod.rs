pub mod protocols;
pub mod records;

pub use protocols::{protocol_label, KnownProtocol, KNOWN_PROTOCOLS};
pub use records::{
    Assignment, CollectedTransaction, CollectionStream, RawTransactionRecord, TrackedProtocol,
    UNKNOWN_BLOCK_TIME,
};
