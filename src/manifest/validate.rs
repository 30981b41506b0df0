//! Structural validation of parsed ads.txt rows
//!
//! Pure functions: a candidate plus its crawl context either becomes a
//! storable record or a [`Rejection`] describing the first rule it broke.

use crate::manifest::types::{
    normalize_key, AccountType, AdsRecord, ContentDirective, DirectiveKind, RecordCandidate,
};
use thiserror::Error;

/// Minimum length of a site or exchange hostname
pub const MIN_DOMAIN_LEN: usize = 3;

/// Reason a candidate was not accepted for storage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("site hostname too short: '{0}'")]
    SiteTooShort(String),

    #[error("exchange domain too short: '{0}'")]
    ExchangeTooShort(String),

    #[error("related hostname too short: '{0}'")]
    RelatedTooShort(String),

    #[error("missing seller account id")]
    MissingSellerId,

    #[error("invalid account type: '{0}'")]
    InvalidAccountType(String),

    #[error("directive does not declare a content relationship: {0:?}")]
    NotARelationship(DirectiveKind),
}

/// Validates a record candidate found on `site`
///
/// An unknown exchange (`exchange_id == None`) does not reject the record;
/// the caller is expected to log it as a data-quality warning.
///
/// # Example
///
/// ```
/// use adstxt_crawler::manifest::{validate_record, AccountType, RecordCandidate};
///
/// let candidate = RecordCandidate {
///     exchange_domain: "exchange.example.com".to_string(),
///     seller_account_id: "12345".to_string(),
///     account_type: "DIRECT".to_string(),
///     tag_id: None,
///     comment: None,
/// };
/// let record = validate_record("site.example.com", &candidate, Some(7)).unwrap();
/// assert_eq!(record.account_type, AccountType::Direct);
/// ```
pub fn validate_record(
    site: &str,
    candidate: &RecordCandidate,
    exchange_id: Option<i64>,
) -> Result<AdsRecord, Rejection> {
    let site_domain = normalize_key(site);
    if site_domain.len() < MIN_DOMAIN_LEN {
        return Err(Rejection::SiteTooShort(site_domain));
    }

    let exchange_domain = normalize_key(&candidate.exchange_domain);
    if exchange_domain.len() < MIN_DOMAIN_LEN {
        return Err(Rejection::ExchangeTooShort(exchange_domain));
    }

    let seller_account_id = normalize_key(&candidate.seller_account_id);
    if seller_account_id.is_empty() {
        return Err(Rejection::MissingSellerId);
    }

    let account_type = AccountType::parse(&candidate.account_type)
        .ok_or_else(|| Rejection::InvalidAccountType(candidate.account_type.clone()))?;

    Ok(AdsRecord {
        site_domain,
        exchange_domain,
        exchange_id,
        seller_account_id,
        account_type,
        tag_id: candidate.tag_id.as_deref().map(normalize_key),
        comment: candidate.comment.clone(),
    })
}

/// Validates a content directive declared by `site`
pub fn validate_directive(
    site: &str,
    kind: DirectiveKind,
    related: &str,
    comment: Option<&str>,
) -> Result<ContentDirective, Rejection> {
    let relationship = kind
        .relationship()
        .ok_or(Rejection::NotARelationship(kind))?;

    let site_domain = normalize_key(site);
    if site_domain.len() < MIN_DOMAIN_LEN {
        return Err(Rejection::SiteTooShort(site_domain));
    }

    let related_domain = normalize_key(related);
    if related_domain.len() < MIN_DOMAIN_LEN {
        return Err(Rejection::RelatedTooShort(related_domain));
    }

    Ok(ContentDirective {
        relationship,
        site_domain,
        related_domain,
        comment: comment.map(str::to_string),
    })
}
