//! Filesystem path fragment completion.
//!
//! A fragment may be quote-delimited or backslash-escaped; only the directory
//! prefix is `~`/`$VAR` expanded, so the partial entry name matches literally.
//! Every filesystem error degrades to an empty candidate list.

use anyhow::Result;
use colored::Colorize;
use std::path::{Component, Path, PathBuf};

/// Characters that need a backslash when emitted unquoted.
const ESCAPE_CHARS: &str = " \t\n\\'\"$`&|;<>*?()[]{}!";

/// Expand `~` and environment variables, leaving unknown variables as-is.
pub(crate) fn expand_user_vars(value: &str) -> String {
    shellexpand::full_with_context_no_errors(
        value,
        || dirs::home_dir().map(|p| p.to_string_lossy().into_owned()),
        |var| std::env::var(var).ok(),
    )
    .into_owned()
}

/// Lexical `.`/`..` normalization, no filesystem access.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_in_name =
                    matches!(out.components().next_back(), Some(Component::Normal(_)));
                let at_root = matches!(out.components().next_back(), Some(Component::RootDir));
                if ends_in_name {
                    out.pop();
                } else if !at_root {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Remove one level of backslash escaping. A trailing lone backslash is kept.
fn unescape_fragment(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut escaping = false;
    for ch in value.chars() {
        if escaping {
            result.push(ch);
            escaping = false;
        } else if ch == '\\' {
            escaping = true;
        } else {
            result.push(ch);
        }
    }
    if escaping {
        result.push('\\');
    }
    result
}

fn escape_fragment(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ESCAPE_CHARS.contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Split at the last `/`: everything up to and including it is the directory
/// prefix, the rest is the partial entry name.
fn split_prefix(fragment: &str) -> (&str, &str) {
    match fragment.rfind('/') {
        Some(idx) => fragment.split_at(idx + 1),
        None => ("", fragment),
    }
}

fn resolve_lookup_dir(prefix: &str, working_dir: &Path) -> PathBuf {
    if prefix.is_empty() {
        return working_dir.to_path_buf();
    }
    let expanded = expand_user_vars(prefix);
    if expanded.is_empty() {
        return working_dir.to_path_buf();
    }
    let expanded_path = Path::new(&expanded);
    if expanded_path.is_absolute() {
        normalize_path(expanded_path)
    } else {
        normalize_path(&working_dir.join(expanded_path))
    }
}

/// The segment the user is typing: the partial name, or the last prefix
/// segment when the fragment ends in `/`.
fn segment_for_hidden<'a>(prefix: &'a str, partial: &'a str) -> &'a str {
    if !partial.is_empty() {
        return partial;
    }
    let trimmed = prefix.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

fn should_include_hidden(prefix: &str, partial: &str) -> bool {
    segment_for_hidden(prefix, partial).starts_with('.')
}

/// Whether a fragment should be treated as a filesystem path outright.
pub fn looks_like_path(fragment: &str) -> bool {
    let stripped = fragment.trim_start_matches(['\'', '"']);
    if stripped.is_empty() {
        return false;
    }
    if stripped.starts_with("./")
        || stripped.starts_with("../")
        || stripped.starts_with("~/")
        || stripped.starts_with('/')
    {
        return true;
    }
    stripped.contains('/') || stripped.starts_with('.')
}

fn format_candidate(unescaped: &str, quote_char: Option<char>) -> String {
    match quote_char {
        Some(q) => format!("{q}{unescaped}"),
        None => escape_fragment(unescaped),
    }
}

pub(crate) fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::with_capacity(values.len());
    for value in values {
        if seen.insert(value.clone()) {
            ordered.push(value);
        }
    }
    ordered
}

/// Complete a path fragment against the working directory.
///
/// Candidates keep the typed directory prefix, directories gain a trailing
/// `/`, and output is directories first, lexical within each group.
pub fn complete_path(fragment: &str, working_dir: &Path) -> Vec<String> {
    let quote_char = fragment.chars().next().filter(|c| *c == '\'' || *c == '"');
    let body = if quote_char.is_some() {
        &fragment[1..]
    } else {
        fragment
    };

    let unescaped_body = unescape_fragment(body);
    let (prefix, partial) = split_prefix(&unescaped_body);
    let lookup_dir = resolve_lookup_dir(prefix, working_dir);
    let include_hidden = should_include_hidden(prefix, partial);

    let entries = match std::fs::read_dir(&lookup_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !include_hidden && name.starts_with('.') {
            continue;
        }
        if !name.starts_with(partial) {
            continue;
        }
        let mut candidate = format!("{prefix}{name}");
        if entry.path().is_dir() {
            candidate.push('/');
        }
        candidates.push(format_candidate(&candidate, quote_char));
    }

    let mut ordered = dedup_preserving_order(candidates);
    ordered.sort_by(|a, b| {
        let rank = |s: &str| u8::from(!s.ends_with('/'));
        rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
    });
    ordered
}

pub fn run(fragment: &str, working_dir: &Path, verbose: u8) -> Result<()> {
    if verbose > 0 {
        eprintln!(
            "path: completing '{}' in {}",
            fragment,
            working_dir.display()
        );
    }

    for candidate in complete_path(fragment, working_dir) {
        if candidate.ends_with('/') {
            println!("{}", candidate.blue().bold());
        } else {
            println!("{}", candidate);
        }
    }

    Ok(())
}
