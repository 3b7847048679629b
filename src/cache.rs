//! Per-executable completion metadata, keyed by resolved absolute path.
//!
//! Flags and root positionals are computed at most once per process
//! lifetime; deeper prefixes are probed lazily, at most once each. A probe
//! that fails or yields nothing is recorded and never retried.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::Tunables;
use crate::probe::Prober;
use crate::scrape;

pub type Prefix = Vec<String>;

/// Probe bookkeeping. Distinguishes "not yet probed" from "probed, found
/// nothing" — an empty collection alone cannot.
#[derive(Debug, Clone, Default)]
pub enum AttemptState<T> {
    #[default]
    NotTried,
    TriedEmpty,
    Tried(T),
}

#[derive(Debug, Clone, Default)]
pub struct TopLevel {
    pub flags: Vec<String>,
    pub positionals: Vec<String>,
}

#[derive(Debug, Default)]
struct ExeEntry {
    top: AttemptState<TopLevel>,
    tree: HashMap<Prefix, AttemptState<Vec<String>>>,
}

/// Session-owned cache; injected into the dispatcher, never global.
#[derive(Default)]
pub struct MetadataCache {
    entries: HashMap<PathBuf, ExeEntry>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags and root positionals for one executable, probing on first use.
    pub fn top_level(
        &mut self,
        exe: &Path,
        working_dir: &Path,
        prober: &dyn Prober,
        tunables: &Tunables,
        verbose: u8,
    ) -> TopLevel {
        if let Some(entry) = self.entries.get(exe) {
            match &entry.top {
                AttemptState::Tried(top) => return top.clone(),
                AttemptState::TriedEmpty => return TopLevel::default(),
                AttemptState::NotTried => {}
            }
        }

        let output = self.collect_help_output(exe, working_dir, prober, tunables, verbose);
        let entry = self.entries.entry(exe.to_path_buf()).or_default();

        let Some(output) = output else {
            entry.top = AttemptState::TriedEmpty;
            return TopLevel::default();
        };

        let command_name = basename(exe);
        let flags: Vec<String> = scrape::extract_flags(&output).into_iter().collect();
        let mut positionals = scrape::extract_positionals(&output, &command_name, &tunables.scrape);
        let tree = scrape::build_tree(&output, &command_name, &tunables.scrape);
        if let Some(root) = tree.get(&Vec::new()) {
            positionals.extend(root.iter().cloned());
        }

        for (prefix, values) in tree {
            entry
                .tree
                .entry(prefix)
                .or_insert_with(|| AttemptState::Tried(values.into_iter().collect()));
        }

        let top = TopLevel {
            flags,
            positionals: positionals.into_iter().collect(),
        };
        entry.top = AttemptState::Tried(top.clone());
        top
    }

    /// Candidates cached (or probed, once) for an exact subcommand prefix.
    /// Returns an empty list when the prefix is known to yield nothing.
    pub fn prefix_candidates(
        &mut self,
        exe: &Path,
        prefix: &[String],
        working_dir: &Path,
        prober: &dyn Prober,
        tunables: &Tunables,
        verbose: u8,
    ) -> Vec<String> {
        if let Some(state) = self.entries.get(exe).and_then(|e| e.tree.get(prefix)) {
            return match state {
                AttemptState::Tried(values) => values.clone(),
                _ => Vec::new(),
            };
        }

        let command_lower = basename(exe).to_lowercase();
        let mut ignore: std::collections::HashSet<String> =
            prefix.iter().map(|tok| tok.to_lowercase()).collect();
        ignore.insert(command_lower.clone());

        let mut found: Option<Vec<String>> = None;
        for suffix in &tunables.probe.context_suffixes {
            let mut args: Vec<String> = prefix.to_vec();
            args.extend(suffix.iter().cloned());
            let output = match prober.run(exe, &args, working_dir) {
                Ok(output) => output,
                Err(err) => {
                    if verbose > 1 {
                        eprintln!("probe: {} {:?}: {}", exe.display(), args, err);
                    }
                    continue;
                }
            };
            let tokens =
                scrape::extract_context_words(&output, &command_lower, &ignore, &tunables.scrape);
            if !tokens.is_empty() {
                found = Some(tokens.into_iter().collect());
                break;
            }
        }

        let entry = self.entries.entry(exe.to_path_buf()).or_default();
        match found {
            Some(values) => {
                entry
                    .tree
                    .insert(prefix.to_vec(), AttemptState::Tried(values.clone()));
                values
            }
            None => {
                entry
                    .tree
                    .insert(prefix.to_vec(), AttemptState::TriedEmpty);
                Vec::new()
            }
        }
    }

    fn collect_help_output(
        &self,
        exe: &Path,
        working_dir: &Path,
        prober: &dyn Prober,
        tunables: &Tunables,
        verbose: u8,
    ) -> Option<String> {
        for switch in &tunables.probe.help_switches {
            let args = vec![switch.clone()];
            match prober.run(exe, &args, working_dir) {
                Ok(output) if !output.trim().is_empty() => return Some(output),
                Ok(_) => continue,
                Err(err) => {
                    if verbose > 1 {
                        eprintln!("probe: {} {}: {}", exe.display(), switch, err);
                    }
                    continue;
                }
            }
        }
        None
    }
}

fn basename(exe: &Path) -> String {
    exe.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| exe.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;
    use std::sync::{Arc, Mutex};

    /// Prober that serves canned output per argv and records every call.
    struct ScriptedProber {
        responses: HashMap<Vec<String>, String>,
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl ScriptedProber {
        fn new(responses: &[(&[&str], &str)]) -> (Self, Arc<Mutex<Vec<Vec<String>>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let responses = responses
                .iter()
                .map(|(args, text)| {
                    (
                        args.iter().map(|s| s.to_string()).collect(),
                        text.to_string(),
                    )
                })
                .collect();
            (
                Self {
                    responses,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl Prober for ScriptedProber {
        fn run(
            &self,
            _exe: &Path,
            args: &[String],
            _working_dir: &Path,
        ) -> Result<String, ProbeError> {
            self.calls.lock().unwrap().push(args.to_vec());
            match self.responses.get(args) {
                Some(text) => Ok(text.clone()),
                None => Err(ProbeError::Process(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no scripted response",
                ))),
            }
        }
    }

    const HELP: &str = "\
Usage: tool add group <name>
Commands:
  fetch    Download refs
  push     Upload refs
Options:
  -v, --verbose   verbose output
";

    fn exe() -> PathBuf {
        PathBuf::from("/opt/bin/tool")
    }

    fn cwd() -> PathBuf {
        PathBuf::from("/")
    }

    #[test]
    fn top_level_probes_at_most_once() {
        let (prober, calls) = ScriptedProber::new(&[(&["--help"], HELP)]);
        let tunables = Tunables::default();
        let mut cache = MetadataCache::new();

        let first = cache.top_level(&exe(), &cwd(), &prober, &tunables, 0);
        let second = cache.top_level(&exe(), &cwd(), &prober, &tunables, 0);

        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(first.flags, second.flags);
        assert!(first.flags.contains(&"--verbose".to_string()));
        assert!(first.flags.contains(&"-v".to_string()));
        assert!(first.positionals.contains(&"fetch".to_string()));
        assert!(first.positionals.contains(&"add".to_string()));
    }

    #[test]
    fn failed_probe_is_cached_as_empty_and_never_retried() {
        let (prober, calls) = ScriptedProber::new(&[]);
        let tunables = Tunables::default();
        let mut cache = MetadataCache::new();

        let first = cache.top_level(&exe(), &cwd(), &prober, &tunables, 0);
        let attempts_after_first = calls.lock().unwrap().len();
        let second = cache.top_level(&exe(), &cwd(), &prober, &tunables, 0);

        assert_eq!(attempts_after_first, tunables.probe.help_switches.len());
        assert_eq!(calls.lock().unwrap().len(), attempts_after_first);
        assert!(first.flags.is_empty() && second.flags.is_empty());
    }

    #[test]
    fn probing_stops_at_first_non_empty_output() {
        let (prober, calls) = ScriptedProber::new(&[(&["--help"], "   \n"), (&["-h"], HELP)]);
        let tunables = Tunables::default();
        let mut cache = MetadataCache::new();

        cache.top_level(&exe(), &cwd(), &prober, &tunables, 0);

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![vec!["--help".to_string()], vec!["-h".to_string()]]);
    }

    #[test]
    fn usage_chains_seed_the_prefix_tree() {
        let (prober, calls) = ScriptedProber::new(&[(&["--help"], HELP)]);
        let tunables = Tunables::default();
        let mut cache = MetadataCache::new();

        cache.top_level(&exe(), &cwd(), &prober, &tunables, 0);
        let add = cache.prefix_candidates(
            &exe(),
            &["add".to_string()],
            &cwd(),
            &prober,
            &tunables,
            0,
        );

        // Seeded by the top-level probe; no contextual probe issued.
        assert_eq!(add, ["group"]);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn prefix_probe_happens_once_even_when_empty() {
        let (prober, calls) = ScriptedProber::new(&[]);
        let tunables = Tunables::default();
        let mut cache = MetadataCache::new();
        let prefix = vec!["add".to_string(), "group".to_string()];

        let first = cache.prefix_candidates(&exe(), &prefix, &cwd(), &prober, &tunables, 0);
        let attempts = calls.lock().unwrap().len();
        let second = cache.prefix_candidates(&exe(), &prefix, &cwd(), &prober, &tunables, 0);

        assert_eq!(attempts, tunables.probe.context_suffixes.len());
        assert_eq!(calls.lock().unwrap().len(), attempts);
        assert!(first.is_empty() && second.is_empty());
    }

    #[test]
    fn prefix_probe_parses_contextual_output() {
        let (prober, _calls) = ScriptedProber::new(&[(
            &["remote", "--help"],
            "usage: tool remote <add|remove|show>\n",
        )]);
        let tunables = Tunables::default();
        let mut cache = MetadataCache::new();

        let candidates = cache.prefix_candidates(
            &exe(),
            &["remote".to_string()],
            &cwd(),
            &prober,
            &tunables,
            0,
        );

        assert_eq!(candidates, ["add", "remove", "show"]);
    }
}
