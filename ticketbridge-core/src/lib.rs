//! TicketBridge Core - Domain Types
//!
//! Escalation enums, the 4-line note format, keyword classification and the
//! helpdesk capability contract. Every other crate in the workspace depends on
//! this one; nothing here performs I/O.

pub mod classify;
pub mod clock;
pub mod enums;
pub mod error;
pub mod helpdesk;
pub mod note;
pub mod ticket;
pub mod validation;

pub use classify::{infer_category, infer_escalation_reason, CATEGORY_RULES, REASON_RULES};
pub use clock::{Clock, ManualClock, SystemClock};
pub use enums::{Category, EnumParseError, EscalationReason, Source};
pub use error::{
    AuthError, ConfigError, HelpdeskError, IdempotencyConflict, TicketBridgeError,
    TicketBridgeResult, ValidationError,
};
pub use helpdesk::{AppendNoteOutcome, HelpdeskCapability, NoteAuthor};
pub use note::{parse as parse_note, Note, NoteFields, MAX_NOTE_CHARS, NOTE_LINES, NOTE_PREFIXES};
pub use ticket::{CreatedTicket, DedupKeys, EscalationRequest, NewTicket, TicketOutcome, TicketRef};
pub use validation::{validate_caller_number, validate_oa_key, Confidence, ValidateNonEmpty};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 digest used for payload fingerprints.
pub type PayloadHash = [u8; 32];

/// Compute the SHA-256 digest of a payload.
pub fn compute_payload_hash(content: &[u8]) -> PayloadHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_hash_is_stable() {
        let a = compute_payload_hash(b"{\"note\":\"x\"}");
        let b = compute_payload_hash(b"{\"note\":\"x\"}");
        assert_eq!(a, b);
        assert_ne!(a, compute_payload_hash(b"{\"note\":\"y\"}"));
    }

    #[test]
    fn test_payload_hash_known_vector() {
        let hash = compute_payload_hash(b"");
        assert_eq!(
            hex::encode(hash),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
