//! Text normalisation before synthesis.
//!
//! Applied in order:
//! 1. every run of ASCII digits → its cardinal reading,
//! 2. literal abbreviation replacements (`St.`, `Mr.`, `Dr.`, `&`),
//! 3. whitespace squeezed to single spaces and trimmed.
//!
//! Pure and deterministic.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// ─────────────────────────────────────────────────────────────────────────────
// Number → words
// ─────────────────────────────────────────────────────────────────────────────

const ONES: &[&str] = &[
    "", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen",
    "seventeen", "eighteen", "nineteen",
];
const TENS: &[&str] = &["", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety"];
const SCALE: &[&str] = &["", "thousand", "million", "billion", "trillion", "quadrillion", "quintillion"];

fn below_hundred(n: u64) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    let tens_word = TENS[(n / 10) as usize];
    match ONES[(n % 10) as usize] {
        "" => tens_word.to_string(),
        ones_word => format!("{}-{}", tens_word, ones_word),
    }
}

/// 1..=999 → words, British style ("one hundred and five").
fn three_digits_to_words(n: u64) -> String {
    let hundreds = n / 100;
    let remainder = n % 100;
    match (hundreds, remainder) {
        (0, r) => below_hundred(r),
        (h, 0) => format!("{} hundred", ONES[h as usize]),
        (h, r) => format!("{} hundred and {}", ONES[h as usize], below_hundred(r)),
    }
}

/// Cardinal reading of `n`: `1234` → "one thousand, two hundred and thirty-four".
pub fn number_to_words(n: u64) -> String {
    if n == 0 {
        return "zero".to_string();
    }

    // (group value, scale index), most significant first, zero groups skipped
    let mut groups = Vec::new();
    let mut remaining = n;
    for scale in 0..SCALE.len() {
        let chunk = remaining % 1000;
        if chunk > 0 {
            groups.push((chunk, scale));
        }
        remaining /= 1000;
        if remaining == 0 {
            break;
        }
    }
    groups.reverse();

    let mut out = String::new();
    let last = groups.len() - 1;
    for (i, &(chunk, scale)) in groups.iter().enumerate() {
        if i > 0 {
            // A trailing units group under a hundred reads "… and five".
            if i == last && scale == 0 && chunk < 100 {
                out.push_str(" and ");
            } else {
                out.push_str(", ");
            }
        }
        out.push_str(&three_digits_to_words(chunk));
        if scale > 0 {
            out.push(' ');
            out.push_str(SCALE[scale]);
        }
    }
    out
}

/// Read a digit string one digit at a time.
pub fn digits_to_words(s: &str) -> String {
    s.chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| if d == 0 { "zero" } else { ONES[d as usize] })
        .collect::<Vec<_>>()
        .join(" ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Normaliser
// ─────────────────────────────────────────────────────────────────────────────

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());
static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Literal substring replacements, applied in this order.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("St.", "Street"),
    ("Mr.", "Mister"),
    ("Dr.", "Doctor"),
    ("&", " and "),
];

/// Replace each maximal digit run with its spoken form.
pub fn replace_numbers(text: &str) -> String {
    RE_DIGITS
        .replace_all(text, |caps: &Captures| match caps[0].parse::<u64>() {
            Ok(n) => number_to_words(n),
            // Longer than u64: read it out digit by digit.
            Err(_) => digits_to_words(&caps[0]),
        })
        .into_owned()
}

pub fn expand_abbreviations(text: &str) -> String {
    ABBREVIATIONS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

pub fn remove_extra_whitespace(text: &str) -> String {
    RE_SPACES.replace_all(text.trim(), " ").into_owned()
}

/// Full normalisation pipeline used ahead of every synthesis tier.
pub fn normalize_for_speech(text: &str) -> String {
    let text = replace_numbers(text);
    let text = expand_abbreviations(&text);
    remove_extra_whitespace(&text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_words() {
        assert_eq!(number_to_words(0), "zero");
        assert_eq!(number_to_words(7), "seven");
        assert_eq!(number_to_words(12), "twelve");
        assert_eq!(number_to_words(42), "forty-two");
        assert_eq!(number_to_words(100), "one hundred");
        assert_eq!(number_to_words(105), "one hundred and five");
        assert_eq!(number_to_words(1000), "one thousand");
        assert_eq!(number_to_words(1001), "one thousand and one");
        assert_eq!(number_to_words(1234), "one thousand, two hundred and thirty-four");
        assert_eq!(number_to_words(105_000), "one hundred and five thousand");
        assert_eq!(number_to_words(1_000_000), "one million");
        assert_eq!(number_to_words(2_000_005), "two million and five");
    }

    #[test]
    fn test_u64_max_has_words() {
        let words = number_to_words(u64::MAX);
        assert!(words.starts_with("eighteen quintillion"), "got: {words}");
    }

    #[test]
    fn test_digits_to_words() {
        assert_eq!(digits_to_words("907"), "nine zero seven");
    }

    #[test]
    fn test_cats() {
        let out = normalize_for_speech("I have 3 cats");
        assert_eq!(out, "I have three cats");
        assert!(!out.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(normalize_for_speech("Dr. Smith on St. Paul"), "Doctor Smith on Street Paul");
        assert_eq!(normalize_for_speech("Mr. Lee"), "Mister Lee");
        assert_eq!(normalize_for_speech("salt&pepper"), "salt and pepper");
    }

    #[test]
    fn test_whitespace_squeezed() {
        assert_eq!(normalize_for_speech("  a \n\t b  "), "a b");
    }

    #[test]
    fn test_overlong_digit_run_read_digitwise() {
        let out = normalize_for_speech("code 123456789012345678901234567890");
        assert!(out.starts_with("code one two three"), "got: {out}");
        assert!(!out.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_idempotent_on_clean_text() {
        for text in ["Plain words here.", "  spaced   out  ", "Doctor Who and Mister Bean"] {
            let once = normalize_for_speech(text);
            assert_eq!(normalize_for_speech(&once), once);
        }
    }

    #[test]
    fn test_idempotent_after_first_pass() {
        let once = normalize_for_speech("Dr. No had 42 cats & 1 dog on St. James");
        assert_eq!(normalize_for_speech(&once), once);
    }
}
