//! Shell-like line tokenization for completion requests.
//!
//! Splitting must never fail: the host line editor calls into the engine on
//! every keystroke, including half-typed quotes.

/// Split a line into words, quote and escape aware.
///
/// Falls back to naive whitespace splitting when the line cannot be lexed
/// (unterminated quote, trailing backslash).
pub fn split_line(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    match shlex::split(text) {
        Some(tokens) => tokens,
        None => text.split_whitespace().map(str::to_string).collect(),
    }
}

/// Split the text left of the cursor into (tokens before the current word,
/// raw fragment under the cursor).
///
/// The fragment is returned verbatim — quotes and backslashes intact — so the
/// path completer can honor the quoting style the user already typed.
pub fn split_for_completion(text: &str) -> (Vec<String>, String) {
    let start = current_word_start(text);
    let fragment = text[start..].to_string();
    let tokens = split_line(&text[..start]);
    (tokens, fragment)
}

/// Byte offset where the in-progress word begins, or `text.len()` if the
/// line ends in unquoted whitespace.
fn current_word_start(text: &str) -> usize {
    let mut word_start: Option<usize> = None;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\\' => {
                    escaped = true;
                    word_start.get_or_insert(i);
                }
                '\'' | '"' => {
                    quote = Some(ch);
                    word_start.get_or_insert(i);
                }
                c if c.is_whitespace() => {
                    word_start = None;
                }
                _ => {
                    word_start.get_or_insert(i);
                }
            },
        }
    }

    word_start.unwrap_or(text.len())
}
