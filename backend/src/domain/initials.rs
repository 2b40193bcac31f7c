//! Patient initials used as the letter prefix of ticket codes.

/// Initials returned when a name yields no usable letters.
pub const FALLBACK_INITIALS: &str = "XX";

const MAX_NAME_PARTS: usize = 3;

/// Derive the uppercase ticket prefix for a display name.
///
/// Takes the first letter of up to three whitespace-separated name parts.
/// When the only letter comes from the first part, the second letter of
/// that part is appended so that most tickets carry at least two letters. Names without usable ASCII letters
/// fall back to [`FALLBACK_INITIALS`].
///
/// # Examples
/// ```
/// use ed_queue::domain::derive_initials;
///
/// assert_eq!(derive_initials("Asep Sunandar"), "AS");
/// assert_eq!(derive_initials("siti"), "SI");
/// assert_eq!(derive_initials("Muhammad Rizki Ramadhan Putra"), "MRR");
/// assert_eq!(derive_initials("   "), "XX");
/// ```
pub fn derive_initials(name: &str) -> String {
    let mut parts = name.split_whitespace();
    let first_part = parts.next();

    let mut initials: String = first_part
        .into_iter()
        .chain(parts)
        .take(MAX_NAME_PARTS)
        .filter_map(|part| part.chars().next())
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let lone_from_first = initials.len() == 1
        && first_part
            .and_then(|part| part.chars().next())
            .is_some_and(|c| c.is_ascii_alphabetic());
    if lone_from_first {
        if let Some(second) = first_part
            .and_then(|part| part.chars().nth(1))
            .filter(char::is_ascii_alphabetic)
        {
            initials.push(second.to_ascii_uppercase());
        }
    }

    if initials.is_empty() {
        FALLBACK_INITIALS.to_owned()
    } else {
        initials
    }
}
