//! Reason phrases shared by the gate layers and the failure classifier
//!
//! Layers prefix their `FieldVerdict::reason` with one of these phrases; the
//! classifier maps phrases back to failure types. Changing a phrase here changes
//! both sides together.

pub const NO_VALUE: &str = "no value supplied";
pub const NO_RULE: &str = "no deterministic rule";

pub const VALID: &str = "valid";
pub const INSECURE_URL: &str = "non-HTTPS URL";

pub const INVALID_FORMAT: &str = "invalid format";
pub const MISSING_SCHEME: &str = "missing URL scheme";
pub const RESERVED_DOMAIN: &str = "reserved domain";
pub const PLACEHOLDER: &str = "placeholder";
pub const DISPOSABLE_MAILBOX: &str = "disposable mailbox";
pub const FIELD_SWAP: &str = "field swap";
pub const THIN_CONTENT: &str = "thin content";
pub const SUSPECTED_DUMP: &str = "suspected dump";
pub const IMPLAUSIBLE: &str = "implausible value";

pub const NO_QUOTE: &str = "no source quote";
pub const NO_SOURCE: &str = "no source text";
pub const UNUSABLE_SOURCE: &str = "source text unusable";
pub const GROUNDED: &str = "grounded";
pub const UNGROUNDED: &str = "ungrounded";

pub const AI_CONFIRMED: &str = "confirmed by AI verifier";
pub const AI_REFUTED: &str = "refuted by AI verifier";
