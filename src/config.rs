//! Tunable parameters for probing and help-text scraping.
//!
//! The scraping heuristics are tuned against observed tool output, not
//! derived from any grammar, so every knob is overridable from
//! `<config_dir>/tabkit/config.toml`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Tunables {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-attempt wall-clock budget in milliseconds.
    #[serde(default = "ProbeConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Switches tried in order for the top-level help probe. Entries not
    /// starting with `-` are passed as a bare argument (`tool help`).
    #[serde(default = "ProbeConfig::default_help_switches")]
    pub help_switches: Vec<String>,
    /// Argument suffixes tried in order when probing a subcommand prefix.
    #[serde(default = "ProbeConfig::default_context_suffixes")]
    pub context_suffixes: Vec<Vec<String>>,
}

impl ProbeConfig {
    fn default_timeout_ms() -> u64 {
        1500
    }

    fn default_help_switches() -> Vec<String> {
        ["--help", "-h", "-?", "help"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn default_context_suffixes() -> Vec<Vec<String>> {
        vec![
            vec!["--help".into()],
            vec!["help".into()],
            vec!["-h".into()],
        ]
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            help_switches: Self::default_help_switches(),
            context_suffixes: Self::default_context_suffixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Words never offered as candidates (case-insensitive).
    #[serde(default = "ScrapeConfig::default_stop_words")]
    pub stop_words: Vec<String>,
    /// Punctuation stripped from both ends of a candidate token.
    #[serde(default = "ScrapeConfig::default_token_strip")]
    pub token_strip: String,
    /// Token cap for the top-level positional scan.
    #[serde(default = "ScrapeConfig::default_root_token_cap")]
    pub root_token_cap: usize,
    /// Token cap for the broader contextual scan.
    #[serde(default = "ScrapeConfig::default_context_token_cap")]
    pub context_token_cap: usize,
}

impl ScrapeConfig {
    fn default_stop_words() -> Vec<String> {
        [
            "usage",
            "options",
            "option",
            "argument",
            "arguments",
            "command",
            "commands",
            "object",
            "objects",
            "help",
            "examples",
            "example",
            "description",
            "available",
            "list",
            "show",
            "when",
            "where",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_token_strip() -> String {
        ".,;:()[]{}<>|\"'".to_string()
    }

    fn default_root_token_cap() -> usize {
        128
    }

    fn default_context_token_cap() -> usize {
        256
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.iter().any(|w| w == word)
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            stop_words: Self::default_stop_words(),
            token_strip: Self::default_token_strip(),
            root_token_cap: Self::default_root_token_cap(),
            context_token_cap: Self::default_context_token_cap(),
        }
    }
}

impl Tunables {
    pub fn load() -> Result<Self> {
        let path = config_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let tunables: Tunables = toml::from_str(&content)?;
            Ok(tunables)
        } else {
            Ok(Tunables::default())
        }
    }
}

fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("tabkit").join("config.toml")
}

pub fn show_config() -> Result<()> {
    let path = config_path();
    println!("Config: {}", path.display());
    println!();

    if path.exists() {
        let tunables = Tunables::load()?;
        println!("{}", toml::to_string_pretty(&tunables)?);
    } else {
        println!("(default config, file not created)");
        println!();
        println!("{}", toml::to_string_pretty(&Tunables::default())?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_probe_order() {
        let t = Tunables::default();
        assert_eq!(t.probe.help_switches, ["--help", "-h", "-?", "help"]);
        assert_eq!(t.probe.timeout_ms, 1500);
        assert_eq!(t.probe.context_suffixes[0], ["--help"]);
    }

    #[test]
    fn stop_word_lookup() {
        let t = Tunables::default();
        assert!(t.scrape.is_stop_word("usage"));
        assert!(!t.scrape.is_stop_word("fetch"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let t: Tunables = toml::from_str("[probe]\ntimeout_ms = 200\n").unwrap();
        assert_eq!(t.probe.timeout_ms, 200);
        assert_eq!(t.probe.help_switches, ["--help", "-h", "-?", "help"]);
        assert_eq!(t.scrape.root_token_cap, 128);
    }
}
