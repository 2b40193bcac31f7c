//! Conversion between ticket codes and opaque public tokens.
//!
//! Two token generations coexist. Current tokens hash the character codes of
//! the initials followed by the sequence. Legacy tokens hash the positional
//! `[day, month, hour, sequence]` fields of the old all-digit codes. Decoding
//! classifies the hashed vector into a [`TokenFormat`] once and reassembles the
//! code from that variant.

use tracing::debug;

use super::{TicketCode, normalize_ticket_input};
use crate::domain::HashId;

/// Minimum length of every public token.
pub const DEFAULT_TOKEN_MIN_LENGTH: usize = 10;

const UPPERCASE_CODES: std::ops::RangeInclusive<u64> = 65..=90;
const LEGACY_FIELD_COUNT: usize = 4;
const LEGACY_MIN_LEN: usize = 9;

/// Errors raised while producing a public token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The ticket produced no hashable components.
    #[error("ticket code {ticket:?} cannot be encoded")]
    Unencodable { ticket: String },
}

/// Structural generation of a decoded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFormat {
    /// Initials character codes followed by the sequence.
    Current,
    /// Positional `[day, month, hour, sequence]` fields.
    Legacy,
    /// A valid token whose components match neither generation.
    Unrecognised,
    /// Not a token at all; the input is treated as a raw ticket code.
    Plain,
}

/// Ticket code recovered from a token together with its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTicket {
    /// Canonical ticket text.
    pub code: String,
    /// Which generation the input belonged to.
    pub format: TokenFormat,
}

/// Codec for public ticket tokens.
///
/// # Examples
/// ```
/// use ed_queue::domain::ticket::TicketCodec;
///
/// let codec = TicketCodec::new("pepper", 10);
/// let token = codec.encode("AS076").expect("encodable");
/// assert!(token.len() >= 10);
/// assert_eq!(codec.decode(&token), "AS076");
/// assert_eq!(codec.decode("as076"), "AS076");
/// ```
#[derive(Debug, Clone)]
pub struct TicketCodec {
    hasher: HashId,
}

impl TicketCodec {
    /// Build a codec from the token secret and minimum token length.
    pub fn new(secret: &str, min_length: usize) -> Self {
        Self {
            hasher: HashId::new(secret, min_length),
        }
    }

    /// Encode a ticket code into its public token.
    ///
    /// # Errors
    /// Returns [`CodecError::Unencodable`] when the input yields no components.
    pub fn encode(&self, ticket: &str) -> Result<String, CodecError> {
        let normalized = normalize_ticket_input(ticket);
        let components = components_for(&normalized);
        let token = self.hasher.encode(&components);
        if token.is_empty() {
            return Err(CodecError::Unencodable { ticket: normalized });
        }
        Ok(token)
    }

    /// Decode a token (or a raw ticket code) into canonical ticket text.
    ///
    /// Never fails: input that is not a token is returned uppercased.
    pub fn decode(&self, token: &str) -> String {
        self.decode_detailed(token).code
    }

    /// Decode a token and report which format it was recognised as.
    pub fn decode_detailed(&self, token: &str) -> DecodedTicket {
        let components = self.hasher.decode(token);
        if components.is_empty() {
            return DecodedTicket {
                code: token.to_uppercase(),
                format: TokenFormat::Plain,
            };
        }

        let format = classify(&components);
        let code = match format {
            TokenFormat::Current => reassemble_current(&components),
            TokenFormat::Legacy => reassemble_legacy(&components),
            TokenFormat::Unrecognised | TokenFormat::Plain => concatenate(&components),
        };
        debug!(?format, "decoded ticket token");
        DecodedTicket { code, format }
    }
}

fn components_for(normalized: &str) -> Vec<u64> {
    if let Some(code) = TicketCode::parse(normalized) {
        return code
            .initials()
            .chars()
            .map(|c| u64::from(u32::from(c)))
            .chain(std::iter::once(u64::from(code.sequence())))
            .collect();
    }

    legacy_fields(normalized).unwrap_or_else(|| per_character(normalized))
}

/// Split an old positional code into `[day, month, hour, sequence]`.
fn legacy_fields(normalized: &str) -> Option<Vec<u64>> {
    if normalized.len() < LEGACY_MIN_LEN {
        return None;
    }
    [
        normalized.get(0..2)?,
        normalized.get(2..4)?,
        normalized.get(4..6)?,
        normalized.get(6..)?,
    ]
    .into_iter()
    .map(|field| field.parse::<u64>().ok())
    .collect()
}

fn per_character(normalized: &str) -> Vec<u64> {
    normalized
        .chars()
        .map(|c| {
            c.to_digit(10)
                .map_or_else(|| u64::from(u32::from(c)), u64::from)
        })
        .collect()
}

/// Current tokens end with the sequence and every earlier component is an
/// uppercase character code, so a sequence that itself lands in `65..=90`
/// stays unambiguous.
fn classify(components: &[u64]) -> TokenFormat {
    match components.split_last() {
        Some((_, letters))
            if !letters.is_empty() && letters.iter().all(|c| UPPERCASE_CODES.contains(c)) =>
        {
            TokenFormat::Current
        }
        _ if components.len() == LEGACY_FIELD_COUNT => TokenFormat::Legacy,
        _ => TokenFormat::Unrecognised,
    }
}

fn reassemble_current(components: &[u64]) -> String {
    let Some((&sequence, letters)) = components.split_last() else {
        return String::new();
    };
    let initials: String = letters
        .iter()
        .filter_map(|&code| u32::try_from(code).ok().and_then(char::from_u32))
        .collect();

    match u32::try_from(sequence) {
        Ok(sequence) => TicketCode::new(initials.clone(), sequence)
            .map_or_else(|| format!("{initials}{sequence}"), |code| code.to_string()),
        Err(_) => format!("{initials}{sequence}"),
    }
}

fn reassemble_legacy(components: &[u64]) -> String {
    match components {
        [day, month, hour, sequence] => format!("{day:02}{month:02}{hour:02}{sequence:03}"),
        _ => concatenate(components),
    }
}

fn concatenate(components: &[u64]) -> String {
    components.iter().map(u64::to_string).collect()
}
