//! Reversible integer-sequence hashing compatible with the Hashids scheme.
//!
//! Public ticket tokens are produced by hashing a short vector of
//! non-negative integers with a secret salt. The output is stable for a given
//! salt and minimum length, and decoding re-encodes the result to reject any
//! input that was not produced by the same configuration.

const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
const DEFAULT_SEPARATORS: &str = "cfhistuCFHISTU";
/// One guard character per twelve alphabet characters.
const GUARD_DIV: usize = 12;

/// Salted, reversible encoder for integer vectors.
///
/// # Examples
/// ```
/// use ed_queue::domain::HashId;
///
/// let hasher = HashId::new("pepper", 10);
/// let token = hasher.encode(&[65, 83, 76]);
/// assert!(token.len() >= 10);
/// assert_eq!(hasher.decode(&token), vec![65, 83, 76]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashId {
    salt: Vec<char>,
    min_length: usize,
    alphabet: Vec<char>,
    separators: Vec<char>,
    guards: Vec<char>,
}

impl HashId {
    /// Build a hasher for the given secret salt and minimum token length.
    pub fn new(salt: &str, min_length: usize) -> Self {
        let salt: Vec<char> = salt.chars().collect();
        let mut separators: Vec<char> = DEFAULT_SEPARATORS
            .chars()
            .filter(|c| DEFAULT_ALPHABET.contains(*c))
            .collect();
        let mut alphabet: Vec<char> = DEFAULT_ALPHABET
            .chars()
            .filter(|c| !separators.contains(c))
            .collect();

        consistent_shuffle(&mut separators, &salt);

        // Keep the alphabet-to-separator ratio at or below 3.5.
        if separators.is_empty() || alphabet.len() * 2 > separators.len() * 7 {
            let wanted = (alphabet.len() * 2).div_ceil(7).max(2);
            if wanted > separators.len() {
                let missing = (wanted - separators.len()).min(alphabet.len());
                separators.extend(alphabet.drain(..missing));
            } else {
                separators.truncate(wanted);
            }
        }

        consistent_shuffle(&mut alphabet, &salt);

        let guard_count = alphabet.len().div_ceil(GUARD_DIV);
        let guards = if alphabet.len() < 3 {
            let take = guard_count.min(separators.len());
            separators.drain(..take).collect()
        } else {
            alphabet.drain(..guard_count).collect()
        };

        Self {
            salt,
            min_length,
            alphabet,
            separators,
            guards,
        }
    }

    /// Minimum length of every produced token.
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Encode `numbers` into a token.
    ///
    /// Returns an empty string when `numbers` is empty.
    pub fn encode(&self, numbers: &[u64]) -> String {
        let Some(first_lottery) = self.lottery_for(numbers) else {
            return String::new();
        };

        let mut alphabet = self.alphabet.clone();
        let numbers_hash = numbers_hash(numbers);
        let mut output = vec![first_lottery];

        for (index, &number) in numbers.iter().enumerate() {
            self.reshuffle_for_lottery(&mut alphabet, first_lottery);
            let chunk = to_alphabet(number, &alphabet);
            let lead = chunk.first().copied().map_or(0, char_code);
            output.extend_from_slice(&chunk);

            if index + 1 < numbers.len() {
                let reduced = number % (lead + index as u64);
                output.push(pick(&self.separators, reduced));
            }
        }

        if output.len() < self.min_length {
            let lead = output.first().copied().map_or(0, char_code);
            output.insert(0, pick(&self.guards, numbers_hash + lead));

            if output.len() < self.min_length {
                let third = output.get(2).copied().map_or(0, char_code);
                output.push(pick(&self.guards, numbers_hash + third));
            }
        }

        let half = alphabet.len() / 2;
        while output.len() < self.min_length {
            let shuffle_salt = alphabet.clone();
            consistent_shuffle(&mut alphabet, &shuffle_salt);

            let (front, back) = alphabet.split_at(half);
            let mut padded = Vec::with_capacity(output.len() + alphabet.len());
            padded.extend_from_slice(back);
            padded.extend_from_slice(&output);
            padded.extend_from_slice(front);

            let excess = padded.len().saturating_sub(self.min_length);
            if excess > 0 {
                let start = excess / 2;
                if let Some(window) = padded.get(start..start + self.min_length) {
                    padded = window.to_vec();
                }
            }
            output = padded;
        }

        output.into_iter().collect()
    }

    /// Decode a token back into its integer vector.
    ///
    /// Returns an empty vector for anything that is not a token produced by
    /// this hasher, including strings with foreign characters.
    pub fn decode(&self, token: &str) -> Vec<u64> {
        let chars: Vec<char> = token.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let parts: Vec<&[char]> = chars.split(|c| self.guards.contains(c)).collect();
        let body_index = if matches!(parts.len(), 2 | 3) { 1 } else { 0 };
        let Some((&lottery, body)) = parts.get(body_index).and_then(|part| part.split_first())
        else {
            return Vec::new();
        };

        let mut alphabet = self.alphabet.clone();
        let mut numbers = Vec::new();
        for chunk in body.split(|c| self.separators.contains(c)) {
            self.reshuffle_for_lottery(&mut alphabet, lottery);
            match from_alphabet(chunk, &alphabet) {
                Some(number) => numbers.push(number),
                None => return Vec::new(),
            }
        }

        if self.encode(&numbers) == token {
            numbers
        } else {
            Vec::new()
        }
    }

    fn lottery_for(&self, numbers: &[u64]) -> Option<char> {
        if numbers.is_empty() || self.alphabet.is_empty() {
            return None;
        }
        Some(pick(&self.alphabet, numbers_hash(numbers)))
    }

    fn reshuffle_for_lottery(&self, alphabet: &mut [char], lottery: char) {
        let mut buffer = Vec::with_capacity(1 + self.salt.len() + alphabet.len());
        buffer.push(lottery);
        buffer.extend_from_slice(&self.salt);
        buffer.extend_from_slice(alphabet);
        buffer.truncate(alphabet.len());
        consistent_shuffle(alphabet, &buffer);
    }
}

fn char_code(c: char) -> u64 {
    u64::from(u32::from(c))
}

fn numbers_hash(numbers: &[u64]) -> u64 {
    numbers
        .iter()
        .enumerate()
        .map(|(index, number)| number % (index as u64 + 100))
        .sum()
}

fn pick(set: &[char], value: u64) -> char {
    let len = set.len() as u64;
    if len == 0 {
        return ' ';
    }
    let index = usize::try_from(value % len).unwrap_or(0);
    set.get(index).copied().unwrap_or(' ')
}

/// Deterministically permute `alphabet` using `salt`.
fn consistent_shuffle(alphabet: &mut [char], salt: &[char]) {
    if salt.is_empty() || alphabet.len() < 2 {
        return;
    }

    let mut salt_index = 0usize;
    let mut running_sum = 0u64;
    for position in (1..alphabet.len()).rev() {
        salt_index %= salt.len();
        let code = salt.get(salt_index).copied().map_or(0, char_code);
        running_sum += code;
        let target = (code + salt_index as u64 + running_sum) % position as u64;
        alphabet.swap(position, usize::try_from(target).unwrap_or(0));
        salt_index += 1;
    }
}

fn to_alphabet(mut number: u64, alphabet: &[char]) -> Vec<char> {
    let base = alphabet.len() as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(pick(alphabet, number));
        number /= base;
        if number == 0 {
            break;
        }
    }
    digits.reverse();
    digits
}

fn from_alphabet(chunk: &[char], alphabet: &[char]) -> Option<u64> {
    let base = alphabet.len() as u64;
    chunk.iter().try_fold(0u64, |acc, c| {
        let position = alphabet.iter().position(|candidate| candidate == c)? as u64;
        acc.checked_mul(base)?.checked_add(position)
    })
}
