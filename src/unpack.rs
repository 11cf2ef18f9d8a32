//! Decoder for `eval(function(p,a,c,k,e,d){...})` packed scripts.
//!
//! The packer replaces every identifier in a script with a short token (the
//! identifier's index in a dictionary, written in base `a`) and ships the
//! dictionary next to the payload. Decoding reverses the substitution.
//!
//! # Example
//!
//! ```rust
//! use streamscout::unpack_in;
//!
//! let page = r"<script>eval(function(p,a,c,k,e,d){while(c--)if(k[c])p=p.replace(new RegExp('\\b'+c.toString(a)+'\\b','g'),k[c]);return p}('0 1=2',10,3,'var|answer|42'.split('|')))</script>";
//! assert_eq!(unpack_in(page).as_deref(), Some("var answer=42"));
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

/// Digit alphabet shared by every supported radix (up to 62).
const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Locates a whole packed invocation inside surrounding page source.
static PACKED_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)eval\(function\(p,a,c,k,e,[dr]\).*?\.split\('\|'\)[^)]*\)\)")
        .expect("packed call pattern")
});

/// Pulls the four packer arguments out of an invocation.
static PACKED_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)return p\}\('(.*?)',\s*(\d+),\s*(\d+),\s*'(.*?)'\.split\('\|'\)")
        .expect("packed args pattern")
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("word pattern"));

/// The four arguments of a packed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPayload {
    pub body: String,
    pub radix: usize,
    pub symbol_count: usize,
    pub dictionary: Vec<String>,
}

impl PackedPayload {
    /// Parse the arguments from the text of a packed invocation.
    ///
    /// Returns `None` when the invocation shape is absent, the radix is
    /// outside `2..=62`, or the dictionary length disagrees with the symbol
    /// count.
    pub fn parse(packed: &str) -> Option<Self> {
        let caps = PACKED_ARGS.captures(packed)?;
        let radix: usize = caps[2].parse().ok()?;
        let symbol_count: usize = caps[3].parse().ok()?;
        if !(2..=ALPHABET.len()).contains(&radix) {
            debug!(radix, "Unsupported packer radix");
            return None;
        }

        let dictionary: Vec<String> = caps[4].split('|').map(str::to_string).collect();
        if dictionary.len() != symbol_count {
            debug!(
                symbol_count,
                dictionary = dictionary.len(),
                "Packer dictionary does not match symbol count"
            );
            return None;
        }

        Some(Self {
            body: caps[1].to_string(),
            radix,
            symbol_count,
            dictionary,
        })
    }

    /// Reconstruct the original script.
    ///
    /// Every token is replaced in a single left-to-right pass, so text that
    /// came out of the dictionary is never substituted again.
    pub fn unpack(&self) -> String {
        let mut table = HashMap::with_capacity(self.dictionary.len());
        for (index, word) in self.dictionary.iter().enumerate().rev() {
            let token = encode_radix(index, self.radix);
            let replacement = if word.is_empty() {
                token.clone()
            } else {
                word.clone()
            };
            table.insert(token, replacement);
        }

        WORD.replace_all(&self.body, |caps: &Captures| {
            let word = &caps[0];
            table.get(word).cloned().unwrap_or_else(|| word.to_string())
        })
        .into_owned()
    }
}

/// Find a packed invocation in `source`.
pub fn find_packed(source: &str) -> Option<&str> {
    PACKED_CALL.find(source).map(|m| m.as_str())
}

/// Find and decode the first packed script inside `source`.
pub fn unpack_in(source: &str) -> Option<String> {
    let packed = find_packed(source)?;
    let payload = PackedPayload::parse(packed)?;
    Some(payload.unpack())
}

/// Write `value` in base `radix` using [`ALPHABET`], most significant digit first.
fn encode_radix(mut value: usize, radix: usize) -> String {
    if value == 0 {
        return (ALPHABET[0] as char).to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[value % radix]);
        value /= radix;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}
