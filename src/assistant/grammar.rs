//! Rule-based grammar fixer used when no language model is available

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([,.!?;:])").expect("valid regex"));
static LONE_I: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bi\b").expect("valid regex"));

/// Tidy a sentence: collapse whitespace, fix spacing before punctuation,
/// capitalize "i" and sentence starts, and end with punctuation.
pub fn fix_grammar(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text.trim(), " ");
    if collapsed.is_empty() {
        return String::new();
    }
    let spaced = SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1");
    let with_i = LONE_I.replace_all(&spaced, "I");

    let mut out = String::with_capacity(with_i.len() + 1);
    let mut capitalize_next = true;
    for ch in with_i.chars() {
        if capitalize_next && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(ch);
            if matches!(ch, '.' | '!' | '?') {
                capitalize_next = true;
            } else if !ch.is_whitespace() && !matches!(ch, '"' | '\'' | '(') {
                capitalize_next = false;
            }
        }
    }

    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_fixes() {
        assert_eq!(fix_grammar("  hello   world "), "Hello world.");
        assert_eq!(fix_grammar("i think i'm late"), "I think I'm late.");
        assert_eq!(fix_grammar("wait , what ?"), "Wait, what?");
    }

    #[test]
    fn test_sentence_starts() {
        assert_eq!(
            fix_grammar("done for today. tomorrow more! really"),
            "Done for today. Tomorrow more! Really."
        );
    }

    #[test]
    fn test_leaves_words_containing_i() {
        assert_eq!(fix_grammar("it is fine"), "It is fine.");
    }

    #[test]
    fn test_empty() {
        assert_eq!(fix_grammar("   "), "");
    }

    #[test]
    fn test_numbers_do_not_capitalize() {
        assert_eq!(fix_grammar("3 laps. ok"), "3 laps. Ok.");
    }
}
