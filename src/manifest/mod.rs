//! ads.txt manifest handling
//!
//! This module contains everything that works on the text of a manifest:
//! - Domain types for records and directives
//! - The tolerant line parser
//! - Structural validation of parsed rows

mod parser;
mod types;
mod validate;

pub use parser::{parse_line, sanitize, LineEvent, Manifest};
pub use types::{
    normalize_key, AccountType, AdsRecord, ContentDirective, Directive, DirectiveKind,
    RecordCandidate, Relationship, UNKNOWN_EXCHANGE_ID,
};
pub use validate::{validate_directive, validate_record, Rejection, MIN_DOMAIN_LEN};
