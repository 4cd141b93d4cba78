//! Korean collation for school names.
//!
//! Follows the shape of the Korean locale ordering: punctuation and
//! symbols first, then digits, then Hangul, then Han, then every other
//! script. Hangul syllables are laid out in Unicode in dictionary order
//! (초성, 중성, 종성), so code point order within the Hangul group is the
//! dictionary order. Other letters compare case-insensitively. Strings that
//! are equal under these rules fall back to plain code point order so the
//! result is total and deterministic.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CharClass {
    Symbol,
    Digit,
    Hangul,
    Han,
    Other,
}

fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}'   // syllables
        | '\u{1100}'..='\u{11FF}' // jamo
        | '\u{3130}'..='\u{318F}' // compatibility jamo
        | '\u{A960}'..='\u{A97F}'
        | '\u{D7B0}'..='\u{D7FF}')
}

fn is_han(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

fn classify(c: char) -> CharClass {
    if is_hangul(c) {
        CharClass::Hangul
    } else if is_han(c) {
        CharClass::Han
    } else if c.is_numeric() {
        CharClass::Digit
    } else if c.is_alphabetic() {
        CharClass::Other
    } else {
        CharClass::Symbol
    }
}

fn primary_key(c: char) -> (CharClass, char) {
    let class = classify(c);
    let folded = match class {
        CharClass::Other => c.to_lowercase().next().unwrap_or(c),
        _ => c,
    };
    (class, folded)
}

/// Compare two strings under Korean collation.
pub fn compare(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .map(primary_key)
        .cmp(b.chars().map(primary_key));
    primary.then_with(|| a.cmp(b))
}
