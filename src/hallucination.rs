//! # Hallucination Filter
//!
//! Removes characters and tokens an OCR engine tends to invent on product
//! labels. Three passes run in a fixed order:
//!
//! 1. runs of three or more identical punctuation characters are deleted
//! 2. stray one-letter tokens (anything but "a" and "i") lose their letter
//! 3. tokens mixing letters and digits are dropped unless they carry a `%`
//!
//! Tokens are maximal runs of non-whitespace. Whitespace is never touched, so
//! a dropped token leaves its surrounding spaces behind. The passes are
//! repeated until the text stops changing, which makes the filter idempotent
//! even when one pass exposes work for an earlier one (e.g. `--m-` becoming
//! `---`).

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\S+").expect("Invalid token regex pattern");
}

/// Minimum length of an identical-punctuation run that counts as noise.
const MIN_NOISE_RUN: usize = 3;

/// Run all three passes to a fixpoint.
///
/// # Examples
///
/// ```
/// use skin_journal::hallucination::filter_hallucinations;
///
/// assert_eq!(filter_hallucinations("Aqua ----- Niacinamide 5%"), "Aqua  Niacinamide 5%");
/// assert_eq!(filter_hallucinations("x Glycerin m3"), " Glycerin ");
/// ```
pub fn filter_hallucinations(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = drop_mixed_tokens(&remove_stray_letters(&strip_punctuation_runs(&current)));
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Pass 1: delete every run of [`MIN_NOISE_RUN`] or more identical characters
/// that are neither alphanumeric nor whitespace.
pub fn strip_punctuation_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let mut run = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            run += 1;
        }
        if is_noise_char(c) && run >= MIN_NOISE_RUN {
            continue;
        }
        out.extend(std::iter::repeat(c).take(run));
    }

    out
}

/// Pass 2: a token whose only alphanumeric character is a single letter other
/// than `a`/`i` loses that letter. Attached punctuation stays, so `m,` becomes `,`.
pub fn remove_stray_letters(text: &str) -> String {
    TOKEN
        .replace_all(text, |caps: &Captures| {
            let token = &caps[0];
            let mut alnum = token.chars().filter(|c| c.is_alphanumeric());
            match (alnum.next(), alnum.next()) {
                (Some(letter), None) if letter.is_alphabetic() && !is_legit_single_letter(letter) => {
                    token.chars().filter(|c| !c.is_alphanumeric()).collect()
                }
                _ => token.to_string(),
            }
        })
        .into_owned()
}

/// Pass 3: drop tokens containing both a letter and a digit, unless they
/// contain a percent sign.
pub fn drop_mixed_tokens(text: &str) -> String {
    TOKEN
        .replace_all(text, |caps: &Captures| {
            let token = &caps[0];
            if is_mixed_noise(token) {
                String::new()
            } else {
                token.to_string()
            }
        })
        .into_owned()
}

fn is_noise_char(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

fn is_legit_single_letter(c: char) -> bool {
    matches!(c, 'a' | 'A' | 'i' | 'I')
}

fn is_mixed_noise(token: &str) -> bool {
    !token.contains('%')
        && token.chars().any(char::is_alphabetic)
        && token.chars().any(char::is_numeric)
}
