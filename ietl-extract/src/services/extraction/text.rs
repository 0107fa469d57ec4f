//! Text helpers for rule-based extraction
//!
//! Everything returned here is a slice of the input so that snippets stay
//! verbatim substrings of the transcript. Case-insensitive searches run over an
//! ASCII-lowercased copy, which keeps byte offsets aligned with the original.

/// Split text into trimmed, non-empty sentences
///
/// Breaks on `.`, `!`, `?` followed by whitespace or end of text, and on line
/// breaks. Decimal points ("v2.1") do not split.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' | '\r' => true,
            '.' | '!' | '?' => chars.peek().map_or(true, |(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            push_trimmed(&mut sentences, &text[start..i]);
            start = i + c.len_utf8();
        }
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, s: &'a str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s);
    }
}

/// Byte offset of `needle` in `haystack` where it starts on a word boundary
///
/// `needle` must be lowercase. The match may continue with a plural or verb
/// suffix (`assets`, `approved`), but not with arbitrary
/// letters.
pub fn find_word(haystack_lower: &str, needle: &str) -> Option<usize> {
    let bytes = haystack_lower.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack_lower[from..].find(needle) {
        let at = from + pos;
        let end = at + needle.len();
        let starts_clean = at == 0 || !is_word_byte(bytes[at - 1]);
        if starts_clean && ends_clean(haystack_lower, end) {
            return Some(at);
        }
        from = at + needle.len().max(1);
        if from >= haystack_lower.len() {
            break;
        }
    }
    None
}

fn ends_clean(haystack_lower: &str, end: usize) -> bool {
    let rest = &haystack_lower[end..];
    let word_tail: &str = rest
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .unwrap_or("");
    matches!(word_tail, "" | "s" | "es" | "ed" | "d" | "ing")
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

/// True when `needle` occurs as a word in `haystack_lower`
pub fn contains_word(haystack_lower: &str, needle: &str) -> bool {
    find_word(haystack_lower, needle).is_some()
}

const CLAUSE_STOPS: &[&str] = &[",", ";", " so that ", " in order to ", " because ", " but "];

/// Cut `s` at the first clause stop and trim trailing punctuation
fn clause(s: &str) -> Option<&str> {
    let lower = s.to_ascii_lowercase();
    let end = CLAUSE_STOPS
        .iter()
        .filter_map(|stop| lower.find(stop))
        .min()
        .unwrap_or(s.len());
    let out = s[..end].trim().trim_end_matches(&['.', '!', '?', ':'][..]).trim();
    (!out.is_empty()).then_some(out)
}

/// Role from an "as a <role>" / "as an <role>" phrase
pub fn role_phrase(sentence: &str) -> Option<&str> {
    let lower = sentence.to_ascii_lowercase();
    for lead in ["as an ", "as a "] {
        if let Some(at) = find_word(&lower, lead.trim_end()).filter(|at| lower[*at..].starts_with(lead)) {
            let rest = &sentence[at + lead.len()..];
            let rest_lower = &lower[at + lead.len()..];
            let end = [",", " i ", ";"]
                .iter()
                .filter_map(|stop| rest_lower.find(stop))
                .min()
                .unwrap_or(rest.len());
            let role = rest[..end].trim().trim_end_matches(&['.', '!', '?'][..]).trim();
            if !role.is_empty() {
                return Some(role);
            }
        }
    }
    None
}

const CAPABILITY_LEADS: &[&str] = &[
    "need to", "needs to", "want to", "wants to", "would like to", "should be able to",
    "must be able to", "need", "needs", "want", "wants", "should", "must", "require",
    "requires",
];

/// Clause following need/want/should/must/require
pub fn capability_clause(sentence: &str) -> Option<&str> {
    let lower = sentence.to_ascii_lowercase();
    let (at, lead) = CAPABILITY_LEADS
        .iter()
        .filter_map(|lead| exact_word(&lower, lead).map(|at| (at, *lead)))
        .min_by_key(|(at, lead)| (*at, std::cmp::Reverse(lead.len())))?;
    clause(&sentence[at + lead.len()..])
}

const BENEFIT_LEADS: &[&str] = &["so that", "in order to", "because"];

/// Clause following "so that" / "in order to" / "because"
pub fn benefit_clause(sentence: &str) -> Option<&str> {
    let lower = sentence.to_ascii_lowercase();
    let (at, lead) = BENEFIT_LEADS
        .iter()
        .filter_map(|lead| exact_word(&lower, lead).map(|at| (at, *lead)))
        .min_by_key(|(at, _)| *at)?;
    let rest = sentence[at + lead.len()..].trim();
    let out = rest.trim_end_matches(&['.', '!', '?'][..]).trim();
    (!out.is_empty()).then_some(out)
}

/// Like [`find_word`] but without suffix tolerance
fn exact_word(haystack_lower: &str, needle: &str) -> Option<usize> {
    let bytes = haystack_lower.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack_lower[from..].find(needle) {
        let at = from + pos;
        let end = at + needle.len();
        let starts_clean = at == 0 || !is_word_byte(bytes[at - 1]);
        let ends = end == bytes.len() || !is_word_byte(bytes[end]);
        if starts_clean && ends {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

/// Locate `candidate` in `text`, returning the verbatim slice
///
/// Tries an exact match, then a case-insensitive one.
pub fn locate<'a>(text: &'a str, candidate: &str) -> Option<&'a str> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    if let Some(at) = text.find(candidate) {
        return Some(&text[at..at + candidate.len()]);
    }
    let lower = text.to_ascii_lowercase();
    let needle = candidate.to_ascii_lowercase();
    lower.find(&needle).map(|at| &text[at..at + needle.len()])
}

/// Leading slice of `text` of at most `max_chars` characters
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => text[..i].trim_end(),
        None => text,
    }
}
