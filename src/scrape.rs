//! Help-text scraping heuristics.
//!
//! Pure text-to-token functions. They are approximate by design: help output
//! has no grammar, so these lean on shapes that hold across argparse, clap,
//! cobra and hand-written usage screens.

use crate::config::ScrapeConfig;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Trailing punctuation trimmed from a matched flag token.
const FLAG_TRIM: &[char] = &['.', ',', ';', ':', ')'];

lazy_static! {
    // One or two hyphens, a word-start character, then word/hyphen chars.
    // The leading group rejects matches inside identifiers like `foo--bar`.
    static ref FLAG_RE: Regex = Regex::new(r"(?:^|[^\w-])(--?[\w?][\w-]*)").unwrap();
    static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9._-]*$").unwrap();
    static ref BRACKET_RE: Regex = Regex::new(r"\[([^\]]+)\]").unwrap();
    static ref ANGLE_RE: Regex = Regex::new(r"<([^>]+)>").unwrap();
    static ref BRACE_RE: Regex = Regex::new(r"\{([^}]+)\}").unwrap();
    static ref DASH_DESC_RE: Regex = Regex::new(r"^([A-Za-z0-9._-]+)\s+-\s+").unwrap();
    static ref ALTERNATIVE_SPLIT_RE: Regex = Regex::new(r"[|,]").unwrap();
}

/// Every token shaped like a command-line flag.
pub fn extract_flags(output: &str) -> BTreeSet<String> {
    let mut flags = BTreeSet::new();
    for caps in FLAG_RE.captures_iter(output) {
        let cleaned = caps[1].trim_end_matches(FLAG_TRIM);
        if !cleaned.is_empty() {
            flags.insert(cleaned.to_string());
        }
    }
    flags
}

/// Normalize one candidate word from help output.
///
/// Rejects flags, metavariable placeholders (all-caps), stop words, the
/// command's own name, and anything not shaped like an identifier.
pub fn normalize_token(token: &str, command_lower: &str, scrape: &ScrapeConfig) -> Option<String> {
    let stripped = token.trim_matches(|c| scrape.token_strip.contains(c));
    if stripped.is_empty() {
        return None;
    }

    let stripped = stripped.replace(['[', ']'], "");
    if stripped.is_empty() || stripped.starts_with('-') {
        return None;
    }

    let lower = stripped.to_lowercase();
    if lower == command_lower || scrape.is_stop_word(&lower) {
        return None;
    }
    if lower.chars().count() <= 1 {
        return None;
    }
    if !stripped.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    // All-caps words are metavariable placeholders (FILE, PATH), not
    // literal arguments.
    if stripped
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(|c| c.is_uppercase())
    {
        return None;
    }
    if !IDENT_RE.is_match(&stripped) {
        return None;
    }

    Some(stripped)
}

/// Top-level positional candidates: a bounded line-by-line word scan.
pub fn extract_positionals(
    output: &str,
    command_name: &str,
    scrape: &ScrapeConfig,
) -> BTreeSet<String> {
    let command_lower = command_name.to_lowercase();
    let mut tokens = BTreeSet::new();

    for line in output.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }

        let lower = stripped.to_lowercase();
        if lower.starts_with("usage") || lower.starts_with("synopsis") {
            continue;
        }
        if stripped.starts_with('-') {
            continue;
        }
        // Bare section headers like "Commands:".
        if stripped.ends_with(':') && !stripped.contains(' ') {
            continue;
        }

        let mut parts = stripped.split_whitespace().peekable();
        if parts
            .peek()
            .is_some_and(|first| first.to_lowercase() == command_lower)
        {
            parts.next();
        }
        for part in parts {
            if let Some(normalized) = normalize_token(part, &command_lower, scrape) {
                tokens.insert(normalized);
            }
        }

        if tokens.len() >= scrape.root_token_cap {
            break;
        }
    }

    tokens
}

/// Prefix-keyed subcommand tree scraped from help output.
///
/// The root node collects each line's leading word; lines mentioning the
/// command's own name are walked token by token, so `tool add group <name>`
/// registers children under `()`, `(add)` and `(add, group)`.
pub fn build_tree(
    output: &str,
    command_name: &str,
    scrape: &ScrapeConfig,
) -> HashMap<Vec<String>, BTreeSet<String>> {
    let command_lower = command_name.to_lowercase();
    let mut tree: HashMap<Vec<String>, BTreeSet<String>> = HashMap::new();

    for raw_line in output.lines() {
        let stripped = raw_line.trim();
        if stripped.is_empty() {
            continue;
        }

        if let Some(head) = stripped.split_whitespace().next() {
            if let Some(normalized) = normalize_token(head, &command_lower, scrape) {
                tree.entry(Vec::new()).or_default().insert(normalized);
            }
        }

        // ASCII lowering keeps byte offsets valid for slicing the raw line.
        let lowered = raw_line.to_ascii_lowercase();
        let Some(idx) = lowered.find(&command_lower) else {
            continue;
        };
        let tail = &raw_line[idx + command_lower.len()..];

        let mut prefix: Vec<String> = Vec::new();
        for part in tail.replace('/', " ").split_whitespace() {
            let Some(normalized) = normalize_token(part, &command_lower, scrape) else {
                continue;
            };
            tree.entry(prefix.clone())
                .or_default()
                .insert(normalized.clone());
            prefix.push(normalized);
        }
    }

    tree
}

/// Broader scan used for contextual (subcommand) probes: bracketed groups,
/// alternative lists, `word - description` leads and `key := value` lines.
pub fn extract_context_words(
    output: &str,
    command_lower: &str,
    ignore_tokens: &HashSet<String>,
    scrape: &ScrapeConfig,
) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();

    let add_candidate = |tokens: &mut BTreeSet<String>, raw: &str| {
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }
        if let Some(normalized) = normalize_token(raw, command_lower, scrape) {
            if !ignore_tokens.contains(&normalized.to_lowercase()) {
                tokens.insert(normalized);
            }
        }
    };

    for raw_line in output.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        for group_re in [&*BRACKET_RE, &*ANGLE_RE, &*BRACE_RE] {
            for caps in group_re.captures_iter(line) {
                for part in ALTERNATIVE_SPLIT_RE.split(&caps[1]) {
                    add_candidate(&mut tokens, part);
                }
            }
        }

        if let Some(caps) = DASH_DESC_RE.captures(line) {
            add_candidate(&mut tokens, &caps[1]);
        }

        if let Some((_, rhs)) = line.split_once(":=") {
            for part in rhs.split_whitespace() {
                add_candidate(&mut tokens, part);
            }
        }

        if tokens.len() >= scrape.context_token_cap {
            break;
        }
    }

    tokens
}
