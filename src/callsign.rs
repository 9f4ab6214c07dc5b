//! Callsign normalization and parsing
//!
//!  Turns raw entity names and heard phrases into a canonical token sequence
//!  so that `"Hussein 1-1 | SpyderF16"` and `"hussein one one"` index the same
//!  way.

/// Everything from this character onward is a tag (squadron, airframe, handle)
pub const TAG_DELIMITER: char = '|';

/// Spoken digit words recognised during numeral unification
const SPOKEN_DIGITS: [(&str, char); 11] = [
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("niner", '9'),
];

/// Split a raw or heard phrase into lowercase alphabetic words and single digits.
///
/// Anything that is not a letter or an ASCII digit separates tokens, digit runs
/// are split into single digits (`15` -> `1 5`) and spoken digits are folded
/// into numerals.
pub fn tokenize(raw: &str) -> Vec<String> {
    let untagged = match raw.find(TAG_DELIMITER) {
        Some(idx) => &raw[..idx],
        None => raw,
    };

    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in untagged.chars() {
        if c.is_alphabetic() {
            word.extend(c.to_lowercase());
            continue;
        }
        flush_word(&mut word, &mut tokens);
        if c.is_ascii_digit() {
            tokens.push(c.to_string());
        }
    }
    flush_word(&mut word, &mut tokens);
    tokens
}

/// Canonical form of a phrase: its tokens joined by single spaces.
pub fn normalize(raw: &str) -> String {
    tokenize(raw).join(" ")
}

/// Extract the pilot callsign from a raw entity name.
///
/// The callsign is the leading run of words followed directly by its digits,
/// e.g. `"Mobius 1 Reaper"` -> `"mobius 1"`. Returns `None` when the name does
/// not start with a word or carries no element number.
pub fn parse_pilot_callsign(raw: &str) -> Option<String> {
    let tokens = tokenize(raw);

    let words = tokens.iter().take_while(|t| !is_digit_token(t)).count();
    if words == 0 {
        return None;
    }
    let digits = tokens[words..]
        .iter()
        .take_while(|t| is_digit_token(t))
        .count();
    if digits == 0 {
        return None;
    }

    Some(tokens[..words + digits].join(" "))
}

/// True for the single-digit tokens produced by `tokenize`
pub fn is_digit_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn flush_word(word: &mut String, tokens: &mut Vec<String>) {
    if word.is_empty() {
        return;
    }
    let word = std::mem::take(word);
    match SPOKEN_DIGITS.iter().find(|(spoken, _)| *spoken == word) {
        Some((_, digit)) => tokens.push(digit.to_string()),
        None => tokens.push(word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_hyphens() {
        assert_eq!(tokenize("Olympus-1-1"), vec!["olympus", "1", "1"]);
    }

    #[test]
    fn test_normalize_drops_tag() {
        assert_eq!(normalize("Hussein 1-1 | SpyderF16"), "hussein 1 1");
        assert_eq!(normalize("Hussein 1-1 | SpyderF16"), normalize("hussein 1 1"));
    }

    #[test]
    fn test_normalize_numerals() {
        assert_eq!(normalize("Spare 15"), "spare 1 5");
        assert_eq!(normalize("spare one five"), "spare 1 5");
        assert_eq!(normalize("Dodge 3 Niner"), "dodge 3 9");
        assert_eq!(normalize("viper11"), "viper 1 1");
    }

    #[test]
    fn test_normalize_punctuation_and_spacing() {
        assert_eq!(normalize("  Colt,   2.1!  "), "colt 2 1");
        assert_eq!(normalize("UZI  1 -- 3"), "uzi 1 3");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  --  "), "");
        assert_eq!(normalize("| tag only"), "");
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_parse_pilot_callsign() {
        assert_eq!(parse_pilot_callsign("Mobius 1 Reaper").as_deref(), Some("mobius 1"));
        assert_eq!(parse_pilot_callsign("Yellow 13 Reiher").as_deref(), Some("yellow 1 3"));
        assert_eq!(
            parse_pilot_callsign("Hussein 1-1 | SpyderF16").as_deref(),
            Some("hussein 1 1")
        );
        assert_eq!(parse_pilot_callsign("Olympus-1-1").as_deref(), Some("olympus 1 1"));
        assert_eq!(parse_pilot_callsign("Big Bird 4").as_deref(), Some("big bird 4"));
    }

    #[test]
    fn test_parse_pilot_callsign_rejects() {
        assert_eq!(parse_pilot_callsign("Reaper"), None);
        assert_eq!(parse_pilot_callsign("1-1 Viper"), None);
        assert_eq!(parse_pilot_callsign(""), None);
    }

    #[test]
    fn test_is_digit_token() {
        assert!(is_digit_token("7"));
        assert!(!is_digit_token("seven"));
        assert!(!is_digit_token(""));
    }
}
