//! ads.txt manifest parser
//!
//! Turns the raw body of an `ads.txt` file into a stream of [`LineEvent`]s.
//! The parser never fails: malformed lines simply produce no events.
//!
//! # Line handling
//!
//! - Characters outside printable ASCII (plus tab, CR and LF) are dropped
//! - Everything after the first `#` on a line is the line comment
//! - The field delimiter is chosen per line: tab if present, otherwise comma
//! - A first field containing `domain=` is a directive
//! - A line with 3 or 4 fields is a data record candidate
//!
//! The directive and data checks are independent, so one physical line can
//! yield both a [`LineEvent::Directive`] and a [`LineEvent::DataCandidate`].

use crate::manifest::types::{normalize_key, Directive, DirectiveKind, RecordCandidate};

const DIRECTIVE_PATTERN: &str = "domain=";

/// One typed event produced from a physical manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A line that starts with `#`
    CommentOnly(String),
    /// A `subdomain=`, `contentproducerdomain=` or `contentdistributordomain=` line
    Directive(Directive),
    /// A row with the shape of an ads.txt record
    DataCandidate(RecordCandidate),
}

/// A sanitized manifest body
#[derive(Debug, Clone)]
pub struct Manifest {
    text: String,
}

impl Manifest {
    /// Sanitizes a raw manifest body
    ///
    /// # Example
    ///
    /// ```
    /// use adstxt_crawler::manifest::{LineEvent, Manifest};
    ///
    /// let manifest = Manifest::new("exchange.example.com, 12345, DIRECT\n# done");
    /// let events: Vec<LineEvent> = manifest.events().collect();
    /// assert_eq!(events.len(), 2);
    /// ```
    pub fn new(raw: &str) -> Self {
        Self {
            text: sanitize(raw),
        }
    }

    /// The sanitized text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lazily parses the manifest, line by line
    pub fn events(&self) -> impl Iterator<Item = LineEvent> + '_ {
        self.text.lines().flat_map(parse_line)
    }
}

/// Drops every character that is not printable ASCII, tab, CR or LF
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| matches!(c, ' '..='~' | '\t' | '\r' | '\n'))
        .collect()
}

/// Parses a single physical line into zero, one or two events
pub fn parse_line(line: &str) -> Vec<LineEvent> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Vec::new();
    }

    if let Some(comment) = line.trim_start().strip_prefix('#') {
        return vec![LineEvent::CommentOnly(comment.trim().to_string())];
    }

    let (data, comment) = split_comment(line);
    let delimiter = if data.contains('\t') { '\t' } else { ',' };
    let fields: Vec<&str> = data.split(delimiter).collect();

    let mut events = Vec::with_capacity(2);

    if let Some(directive) = fields
        .first()
        .and_then(|first| parse_directive(first, comment.as_deref()))
    {
        events.push(LineEvent::Directive(directive));
    }

    if let Some(candidate) = parse_record(&fields, comment) {
        events.push(LineEvent::DataCandidate(candidate));
    }

    events
}

/// Splits a line at its first `#` into the data portion and an optional comment
fn split_comment(line: &str) -> (&str, Option<String>) {
    match line.split_once('#') {
        Some((data, comment)) => (data, non_empty(comment)),
        None => (line, None),
    }
}

/// Interprets a field as a `...domain=` directive
///
/// Returns None for fields without the directive pattern, unknown directive
/// names, and directives with an empty right-hand side.
fn parse_directive(field: &str, line_comment: Option<&str>) -> Option<Directive> {
    let lowered = field.to_lowercase();
    if !lowered.contains(DIRECTIVE_PATTERN) {
        return None;
    }

    let (lhs, rhs) = lowered.split_once('=')?;
    let kind = DirectiveKind::from_lhs(lhs)?;

    let target = normalize_key(rhs);
    if target.is_empty() {
        return None;
    }

    Some(Directive {
        kind,
        target,
        comment: line_comment.map(str::to_string),
    })
}

/// Interprets fields positionally as (exchange, seller id, account type[, tag id])
fn parse_record(fields: &[&str], comment: Option<String>) -> Option<RecordCandidate> {
    if !(3..=4).contains(&fields.len()) {
        return None;
    }

    Some(RecordCandidate {
        exchange_domain: normalize_key(fields[0]),
        seller_account_id: normalize_key(fields[1]),
        account_type: normalize_key(fields[2]),
        tag_id: fields
            .get(3)
            .map(|tag| normalize_key(tag))
            .filter(|tag| !tag.is_empty()),
        comment,
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
