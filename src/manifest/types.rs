//! Domain types shared by the parser, validator and storage layers

use std::fmt;

/// Registry id stored for records whose exchange domain is not in the registry
///
/// Registry ids are positive, so `0` never collides with a real exchange.
pub const UNKNOWN_EXCHANGE_ID: i64 = 0;

/// Seller relationship declared by an ads.txt record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    Direct,
    Reseller,
}

impl AccountType {
    /// Parses an account type, ignoring case and surrounding whitespace
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "reseller" => Some(Self::Reseller),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Reseller => "reseller",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a `...domain=` directive line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `subdomain=`: referral only
    Subdomain,
    /// `contentproducerdomain=`: referral plus a producer relationship
    ContentProducer,
    /// `contentdistributordomain=`: referral plus a distributor relationship
    ContentDistributor,
}

impl DirectiveKind {
    /// Classifies the left-hand side of a directive by prefix
    pub fn from_lhs(lhs: &str) -> Option<Self> {
        let lhs = lhs.trim();
        if lhs.starts_with("subdomain") {
            Some(Self::Subdomain)
        } else if lhs.starts_with("contentproducerdomain") {
            Some(Self::ContentProducer)
        } else if lhs.starts_with("contentdistributordomain") {
            Some(Self::ContentDistributor)
        } else {
            None
        }
    }

    /// The content relationship this directive declares, if any
    pub fn relationship(&self) -> Option<Relationship> {
        match self {
            Self::Subdomain => None,
            Self::ContentProducer => Some(Relationship::Producer),
            Self::ContentDistributor => Some(Relationship::Distributor),
        }
    }
}

/// Content relationship between a site and another host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    Producer,
    Distributor,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Distributor => "distributor",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directive line as produced by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Right-hand side hostname, lower-cased and trimmed
    pub target: String,
    pub comment: Option<String>,
}

/// A data row with the 3 or 4 fields of an ads.txt record, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCandidate {
    pub exchange_domain: String,
    pub seller_account_id: String,
    /// Raw account type; checked by the validator
    pub account_type: String,
    pub tag_id: Option<String>,
    pub comment: Option<String>,
}

/// A validated ads.txt record ready to be stored
///
/// Storage key: (site, exchange domain, exchange id, seller id, account type, tag id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdsRecord {
    pub site_domain: String,
    pub exchange_domain: String,
    /// `None` when the exchange domain is not in the registry
    pub exchange_id: Option<i64>,
    pub seller_account_id: String,
    pub account_type: AccountType,
    pub tag_id: Option<String>,
    pub comment: Option<String>,
}

/// A validated content producer/distributor relationship
///
/// Storage key: (relationship, site hostname, related hostname).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDirective {
    pub relationship: Relationship,
    pub site_domain: String,
    pub related_domain: String,
    pub comment: Option<String>,
}

/// Lower-cases and trims a hostname or storage key
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}
