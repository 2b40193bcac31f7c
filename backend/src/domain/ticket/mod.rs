//! Queue ticket codes: the human-readable `<Initials><Sequence>` identifiers
//! printed for patients, their opaque public tokens, and the sequencer that
//! issues a fresh code for every visit.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::FALLBACK_INITIALS;

pub mod codec;
pub mod sequencer;

pub use codec::{
    CodecError, DEFAULT_TOKEN_MIN_LENGTH, DecodedTicket, TicketCodec, TokenFormat,
};
pub use sequencer::{IssuedTicket, TicketOrigin, TicketSequencer, TicketSequencerConfig};

static TICKET_CODE_RE: OnceLock<Regex> = OnceLock::new();

fn ticket_code_regex() -> &'static Regex {
    TICKET_CODE_RE.get_or_init(|| {
        Regex::new(r"^([A-Z]+)(\d{3,5})$")
            .unwrap_or_else(|error| panic!("ticket code regex failed to compile: {error}"))
    })
}

/// Uppercase a raw ticket string and drop every whitespace character.
///
/// # Examples
/// ```
/// use ed_queue::domain::ticket::normalize_ticket_input;
///
/// assert_eq!(normalize_ticket_input(" as 076\n"), "AS076");
/// ```
pub fn normalize_ticket_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Zero-padding applied to the sequence part of a ticket code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TicketWidth {
    /// Normal daily volume, up to 999.
    Three,
    /// Unusually busy day, 1000 to 9999.
    Four,
    /// Timestamp-derived overflow codes.
    Five,
}

impl TicketWidth {
    /// Select the width a sequence naturally occupies.
    ///
    /// # Examples
    /// ```
    /// use ed_queue::domain::ticket::TicketWidth;
    ///
    /// assert_eq!(TicketWidth::for_sequence(999), TicketWidth::Three);
    /// assert_eq!(TicketWidth::for_sequence(1000), TicketWidth::Four);
    /// assert_eq!(TicketWidth::for_sequence(10_000), TicketWidth::Five);
    /// ```
    pub const fn for_sequence(sequence: u32) -> Self {
        match sequence {
            0..=999 => Self::Three,
            1000..=9999 => Self::Four,
            _ => Self::Five,
        }
    }

    /// Number of digits rendered.
    pub const fn digits(self) -> usize {
        match self {
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
        }
    }

    const fn from_digits(digits: usize) -> Option<Self> {
        match digits {
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            5 => Some(Self::Five),
            _ => None,
        }
    }
}

/// Canonical `<Initials><Sequence>` queue identifier such as `AS076`.
///
/// ## Invariants
/// - `initials` is non-empty and contains only `A`–`Z`.
/// - The rendered sequence uses at least `width` digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketCode {
    initials: String,
    sequence: u32,
    width: TicketWidth,
}

impl TicketCode {
    /// Build a code whose width follows the sequence magnitude.
    ///
    /// Returns `None` when `initials` is empty or not uppercase ASCII letters.
    pub fn new(initials: impl Into<String>, sequence: u32) -> Option<Self> {
        Self::with_width(initials, sequence, TicketWidth::for_sequence(sequence))
    }

    /// Build a code with an explicit width, used by fallback sequencing.
    pub fn with_width(
        initials: impl Into<String>,
        sequence: u32,
        width: TicketWidth,
    ) -> Option<Self> {
        let initials = initials.into();
        if !valid_initials(&initials) {
            return None;
        }
        Some(Self {
            initials,
            sequence,
            width,
        })
    }

    /// Build a code for issuing, substituting [`FALLBACK_INITIALS`] when
    /// `initials` is unusable.
    pub fn issued(initials: &str, sequence: u32, width: TicketWidth) -> Self {
        let initials = if valid_initials(initials) {
            initials
        } else {
            FALLBACK_INITIALS
        };
        Self {
            initials: initials.to_owned(),
            sequence,
            width,
        }
    }

    /// Parse a ticket code after normalising case and whitespace.
    ///
    /// The digit count of the input is preserved as the width.
    ///
    /// # Examples
    /// ```
    /// use ed_queue::domain::ticket::TicketCode;
    ///
    /// let code = TicketCode::parse("as 0076").expect("valid code");
    /// assert_eq!(code.initials(), "AS");
    /// assert_eq!(code.sequence(), 76);
    /// assert_eq!(code.to_string(), "AS0076");
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_ticket_input(raw);
        let captures = ticket_code_regex().captures(&normalized)?;
        let initials = captures.get(1)?.as_str();
        let digits = captures.get(2)?.as_str();
        let sequence = digits.parse().ok()?;
        let width = TicketWidth::from_digits(digits.len())?;
        Self::with_width(initials, sequence, width)
    }

    /// Uppercase letter prefix.
    pub fn initials(&self) -> &str {
        &self.initials
    }

    /// Daily sequence number (or timestamp-derived fallback value).
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Rendered sequence width.
    pub fn width(&self) -> TicketWidth {
        self.width
    }

    /// Every textual spelling of this code from its natural width upwards.
    ///
    /// Fallback tickets may carry more zero-padding than their magnitude
    /// implies, so lookups by decoded token search all of them.
    ///
    /// # Examples
    /// ```
    /// use ed_queue::domain::ticket::TicketCode;
    ///
    /// let code = TicketCode::new("AS", 42).expect("valid code");
    /// assert_eq!(code.spellings(), vec!["AS042", "AS0042", "AS00042"]);
    /// ```
    pub fn spellings(&self) -> Vec<String> {
        [TicketWidth::Three, TicketWidth::Four, TicketWidth::Five]
            .into_iter()
            .filter(|width| *width >= TicketWidth::for_sequence(self.sequence))
            .map(|width| render(&self.initials, self.sequence, width))
            .collect()
    }
}

fn valid_initials(initials: &str) -> bool {
    !initials.is_empty() && initials.chars().all(|c| c.is_ascii_uppercase())
}

fn render(initials: &str, sequence: u32, width: TicketWidth) -> String {
    format!("{initials}{sequence:0>digits$}", digits = width.digits())
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.initials, self.sequence, self.width))
    }
}

/// Extract the trailing run of decimal digits from a stored ticket code.
///
/// Returns `None` when the code does not end in a digit or the run does not
/// fit in `u64`.
pub(crate) fn trailing_number(code: &str) -> Option<u64> {
    let digits_start = code
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(index, _)| index)?;
    code.get(digits_start..)?.parse().ok()
}
