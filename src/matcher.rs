//! Fuzzy callsign matching
//!
//!  Compares a normalized query against normalized candidate callsigns token by
//!  token. A token pair is accepted when it is identical, sounds alike, or is a
//!  single typo apart; anything else disqualifies the candidate. Digits must
//!  always match exactly.
//!
//!  Sound-alike detection uses a consonant skeleton: digraphs are rewritten,
//!  the first letter is kept and every following consonant is folded into a
//!  soundex-style sound class. Vowels only separate classes. Speech-to-text
//!  tends to drop or add a consonant ("houston" for "hussein"), so skeletons
//!  that differ only by an inserted or deleted class also count as sound-alike.

use crate::callsign::is_digit_token;

/// Maximum single-character edits tolerated per token
pub const MAX_TYPO_EDITS: usize = 1;
/// Sound classes that may be dropped from one skeleton to reach the other
pub const PHONETIC_CODE_TOLERANCE: usize = 1;
/// Skeletons shorter than this must be equal to count as sound-alike
pub const MIN_PHONETIC_CODE_LEN: usize = 3;

pub const EXACT_COST: u32 = 0;
pub const PHONETIC_COST: u32 = 1;
pub const TYPO_COST: u32 = 2;

/// Tunable matching policy. `Default` uses the module constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPolicy {
    pub max_typo_edits: usize,
    pub phonetic_code_tolerance: usize,
    pub min_phonetic_code_len: usize,
    pub exact_cost: u32,
    pub phonetic_cost: u32,
    pub typo_cost: u32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            max_typo_edits: MAX_TYPO_EDITS,
            phonetic_code_tolerance: PHONETIC_CODE_TOLERANCE,
            min_phonetic_code_len: MIN_PHONETIC_CODE_LEN,
            exact_cost: EXACT_COST,
            phonetic_cost: PHONETIC_COST,
            typo_cost: TYPO_COST,
        }
    }
}

impl MatchPolicy {
    fn cost(&self, token_match: TokenMatch) -> u32 {
        match token_match {
            TokenMatch::Exact => self.exact_cost,
            TokenMatch::Phonetic => self.phonetic_cost,
            TokenMatch::Typo => self.typo_cost,
        }
    }
}

/// How a single query token was matched to a candidate token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMatch {
    Exact,
    Phonetic,
    Typo,
}

/// Result of ranking a set of candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome<K> {
    /// A single candidate had the lowest score
    Found { key: K, score: u32 },
    /// No candidate survived
    NotFound,
    /// Two or more candidates shared the lowest score
    Ambiguous { score: u32 },
}

/// Consonant-skeleton code of a lowercase word.
pub fn phonetic_code(word: &str) -> String {
    let rewritten = rewrite_digraphs(word);
    let mut chars = rewritten.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut code = String::new();
    code.push(first);
    let mut last = sound_class(first);
    for c in chars {
        match sound_class(c) {
            Some(class) => {
                if last != Some(class) {
                    code.push(class);
                }
                last = Some(class);
            }
            // Vowels separate repeated classes, 'h' and 'w' do not
            None if is_vowel(c) => last = None,
            None => {}
        }
    }
    code
}

fn rewrite_digraphs(word: &str) -> String {
    let mut w = word.to_string();
    for (prefix, replacement) in [("wh", "w"), ("kn", "n"), ("wr", "r")] {
        if let Some(rest) = w.strip_prefix(prefix) {
            w = format!("{replacement}{rest}");
            break;
        }
    }
    w = w.replace("tch", "ch").replace("ph", "f").replace("ck", "k");

    // 'gh' is silent except at the start of a word
    if let Some((idx, _)) = w.char_indices().nth(1) {
        let (head, tail) = w.split_at(idx);
        w = format!("{head}{}", tail.replace("gh", ""));
    }
    w
}

fn sound_class(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Optimal string alignment distance between `a` and `b`, or `None` if it
/// exceeds `cap`. Counts insertions, deletions, substitutions and adjacent
/// transpositions.
pub fn edit_distance_within(a: &str, b: &str, cap: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > cap {
        return None;
    }

    let width = b.len() + 1;
    let mut prev2 = vec![0usize; width];
    let mut prev: Vec<usize> = (0..width).collect();
    let mut curr = vec![0usize; width];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let substitution = usize::from(a[i - 1] != b[j - 1]);
            let mut d = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + substitution);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d = d.min(prev2[j - 2] + 1);
            }
            curr[j] = d;
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= cap).then_some(distance)
}

/// True when two words share a skeleton, or one skeleton is the other with up
/// to `phonetic_code_tolerance` extra sound classes.
pub fn sounds_alike(a: &str, b: &str, policy: &MatchPolicy) -> bool {
    let code_a = phonetic_code(a);
    let code_b = phonetic_code(b);
    if code_a.is_empty() || code_b.is_empty() {
        return false;
    }
    if code_a == code_b {
        return true;
    }

    let shortest = code_a.chars().count().min(code_b.chars().count());
    if policy.phonetic_code_tolerance == 0 || shortest < policy.min_phonetic_code_len {
        return false;
    }
    if code_a.chars().next() != code_b.chars().next() {
        return false;
    }

    // Only dropped or added classes: the distance must equal the length gap
    let gap = code_a.chars().count().abs_diff(code_b.chars().count());
    gap > 0
        && edit_distance_within(&code_a, &code_b, policy.phonetic_code_tolerance) == Some(gap)
}

/// Compare one query token to one candidate token.
pub fn compare_tokens(query: &str, candidate: &str, policy: &MatchPolicy) -> Option<TokenMatch> {
    if query == candidate {
        return Some(TokenMatch::Exact);
    }
    if is_digit_token(query) || is_digit_token(candidate) {
        return None;
    }
    if sounds_alike(query, candidate, policy) {
        return Some(TokenMatch::Phonetic);
    }

    if edit_distance_within(query, candidate, policy.max_typo_edits).is_some() {
        return Some(TokenMatch::Typo);
    }
    None
}

/// Score a candidate token sequence against the query. Lower is better;
/// `None` means the candidate is disqualified.
pub fn score<Q: AsRef<str>, C: AsRef<str>>(
    query: &[Q],
    candidate: &[C],
    policy: &MatchPolicy,
) -> Option<u32> {
    if query.len() != candidate.len() {
        return None;
    }
    query
        .iter()
        .zip(candidate)
        .try_fold(0u32, |total, (q, c)| {
            compare_tokens(q.as_ref(), c.as_ref(), policy).map(|m| total + policy.cost(m))
        })
}

/// Pick the single best candidate for the query.
///
/// Candidates are `(tokens, key)` pairs. A tie on the lowest score is reported
/// as `Ambiguous` rather than resolved arbitrarily.
pub fn best_match<'c, Q, C, K, I>(query: &[Q], candidates: I, policy: &MatchPolicy) -> MatchOutcome<K>
where
    Q: AsRef<str>,
    C: AsRef<str> + 'c,
    I: IntoIterator<Item = (&'c [C], K)>,
{
    if query.is_empty() {
        return MatchOutcome::NotFound;
    }

    let mut best: Option<(u32, K)> = None;
    let mut tied = false;
    for (tokens, key) in candidates {
        let Some(s) = score(query, tokens, policy) else {
            continue;
        };
        match best.as_ref().map(|(b, _)| *b) {
            Some(b) if s > b => {}
            Some(b) if s == b => tied = true,
            _ => {
                best = Some((s, key));
                tied = false;
            }
        }
    }

    match best {
        None => MatchOutcome::NotFound,
        Some((score, _)) if tied => MatchOutcome::Ambiguous { score },
        Some((score, key)) => MatchOutcome::Found { key, score },
    }
}
