//! Completion dispatch.
//!
//! `Session` owns the executable index, the metadata cache and the prober;
//! one session lives as long as the host shell process. Completion itself
//! never fails: every error path degrades to a smaller candidate list, and a
//! final panic guard turns anything unexpected into an empty one.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::Duration;

use crate::cache::MetadataCache;
use crate::config::Tunables;
use crate::exec_index::{self, ExecutableIndex};
use crate::lexer;
use crate::paths;
use crate::probe::{HelpProber, Prober};
use crate::registry;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

pub struct Session {
    tunables: Tunables,
    index: ExecutableIndex,
    cache: MetadataCache,
    prober: Box<dyn Prober>,
    verbose: u8,
}

impl Session {
    pub fn new(tunables: Tunables, prober: Box<dyn Prober>, verbose: u8) -> Self {
        Self {
            tunables,
            index: ExecutableIndex::scan(),
            cache: MetadataCache::new(),
            prober,
            verbose,
        }
    }

    fn help_prober(tunables: &Tunables) -> Box<dyn Prober> {
        Box::new(HelpProber::new(Duration::from_millis(
            tunables.probe.timeout_ms,
        )))
    }

    /// Complete the fragment under the cursor. Returns replacement strings
    /// for that fragment, best candidates first group by group.
    pub fn complete(&mut self, buffer: &str, cursor: usize, working_dir: &Path) -> Vec<String> {
        let mut end = cursor.min(buffer.len());
        while end > 0 && !buffer.is_char_boundary(end) {
            end -= 1;
        }
        let text = buffer[..end].to_string();

        // The host line editor must survive anything that goes wrong in
        // here, so the whole request is fenced off.
        std::panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&text, working_dir)))
            .unwrap_or_default()
    }

    fn dispatch(&mut self, text: &str, working_dir: &Path) -> Vec<String> {
        let (tokens_before, fragment) = lexer::split_for_completion(text);
        if tokens_before.is_empty() {
            self.complete_first_token(&fragment, working_dir)
        } else {
            self.complete_after_command(&fragment, &tokens_before, working_dir)
        }
    }

    fn complete_first_token(&mut self, fragment: &str, working_dir: &Path) -> Vec<String> {
        if paths::looks_like_path(fragment) {
            return paths::complete_path(fragment, working_dir);
        }

        let mut candidates: Vec<String> = registry::aliases()
            .iter()
            .filter(|alias| alias.starts_with(fragment))
            .map(|alias| alias.to_string())
            .collect();

        // The full executable listing is noise until something was typed.
        if !fragment.is_empty() {
            candidates.extend(self.index.matching(fragment));
        }

        paths::dedup_preserving_order(candidates)
    }

    fn complete_after_command(
        &mut self,
        fragment: &str,
        tokens_before: &[String],
        working_dir: &Path,
    ) -> Vec<String> {
        let command = &tokens_before[0];
        let Some(spec) = registry::lookup(command) else {
            return self.complete_external(command, fragment, tokens_before, working_dir);
        };

        let args_before = &tokens_before[1..];
        if registry::is_flag_context(fragment, args_before, spec) {
            return registry::complete_flags(fragment, args_before, spec);
        }
        if spec.takes_path {
            return paths::complete_path(fragment, working_dir);
        }
        Vec::new()
    }

    fn complete_external(
        &mut self,
        command: &str,
        fragment: &str,
        tokens_before: &[String],
        working_dir: &Path,
    ) -> Vec<String> {
        let Some(resolved) = exec_index::resolve_external(command, working_dir) else {
            return paths::complete_path(fragment, working_dir);
        };

        if tokens_before[1..].iter().any(|tok| tok == "--") {
            return paths::complete_path(fragment, working_dir);
        }

        if fragment.starts_with('-') {
            let top = self.cache.top_level(
                &resolved,
                working_dir,
                self.prober.as_ref(),
                &self.tunables,
                self.verbose,
            );
            return top
                .flags
                .into_iter()
                .filter(|flag| flag.starts_with(fragment))
                .collect();
        }

        if paths::looks_like_path(fragment) {
            return paths::complete_path(fragment, working_dir);
        }

        let top = self.cache.top_level(
            &resolved,
            working_dir,
            self.prober.as_ref(),
            &self.tunables,
            self.verbose,
        );

        let prefix: Vec<String> = tokens_before[1..]
            .iter()
            .filter(|tok| !tok.starts_with('-'))
            .cloned()
            .collect();

        let mut candidates = self.cache.prefix_candidates(
            &resolved,
            &prefix,
            working_dir,
            self.prober.as_ref(),
            &self.tunables,
            self.verbose,
        );

        // Unknown prefix: inherit from the nearest ancestor that knows
        // anything, probing each on the way up.
        if candidates.is_empty() && !prefix.is_empty() {
            for cut in (0..prefix.len()).rev() {
                let parent = self.cache.prefix_candidates(
                    &resolved,
                    &prefix[..cut],
                    working_dir,
                    self.prober.as_ref(),
                    &self.tunables,
                    self.verbose,
                );
                if !parent.is_empty() {
                    candidates = parent;
                    break;
                }
            }
        }

        if candidates.is_empty() {
            candidates = top.positionals;
        }

        if !candidates.is_empty() {
            let filtered: Vec<String> = candidates
                .into_iter()
                .filter(|candidate| candidate.starts_with(fragment))
                .collect();
            if !filtered.is_empty() {
                return filtered;
            }
        }

        paths::complete_path(fragment, working_dir)
    }
}

fn print_candidates(candidates: &[String]) {
    for candidate in candidates {
        if candidate.ends_with('/') {
            println!("{}", candidate.blue().bold());
        } else if candidate.starts_with('-') {
            println!("{}", candidate.cyan());
        } else {
            println!("{}", candidate);
        }
    }
}

pub fn run_complete(
    buffer: &str,
    cursor: Option<usize>,
    working_dir: &Path,
    format: OutputFormat,
    verbose: u8,
) -> Result<()> {
    let tunables = Tunables::load()?;
    let prober = Session::help_prober(&tunables);
    let mut session = Session::new(tunables, prober, verbose);

    let cursor = cursor.unwrap_or(buffer.len());
    if verbose > 0 {
        eprintln!("complete: buffer '{}' cursor {}", buffer, cursor);
    }

    let candidates = session.complete(buffer, cursor, working_dir);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&candidates)?),
        OutputFormat::Plain => print_candidates(&candidates),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    resolved: String,
    flags: Vec<String>,
    positionals: Vec<String>,
    prefix: Vec<String>,
    prefix_candidates: Vec<String>,
}

pub fn run_probe(
    command: &str,
    prefix: &[String],
    working_dir: &Path,
    format: OutputFormat,
    verbose: u8,
) -> Result<()> {
    let tunables = Tunables::load()?;
    let prober = Session::help_prober(&tunables);
    let mut session = Session::new(tunables, prober, verbose);

    let Some(resolved) = exec_index::resolve_external(command, working_dir) else {
        anyhow::bail!("'{}' does not resolve to an executable", command);
    };

    let top = session.cache.top_level(
        &resolved,
        working_dir,
        session.prober.as_ref(),
        &session.tunables,
        verbose,
    );
    let prefix_candidates = if prefix.is_empty() {
        Vec::new()
    } else {
        session.cache.prefix_candidates(
            &resolved,
            prefix,
            working_dir,
            session.prober.as_ref(),
            &session.tunables,
            verbose,
        )
    };

    let report = ProbeReport {
        resolved: resolved.to_string_lossy().into_owned(),
        flags: top.flags,
        positionals: top.positionals,
        prefix: prefix.to_vec(),
        prefix_candidates,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            println!("Resolved: {}", report.resolved.bold());
            println!("\nFlags ({}):", report.flags.len());
            for flag in &report.flags {
                println!("  {}", flag.cyan());
            }
            println!("\nPositionals ({}):", report.positionals.len());
            for positional in &report.positionals {
                println!("  {}", positional);
            }
            if !report.prefix.is_empty() {
                println!(
                    "\nPrefix [{}] ({}):",
                    report.prefix.join(" "),
                    report.prefix_candidates.len()
                );
                for candidate in &report.prefix_candidates {
                    println!("  {}", candidate);
                }
            }
        }
    }
    Ok(())
}
