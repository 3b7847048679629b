//! Search-path executable enumeration and external command resolution.

use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::paths::{expand_user_vars, normalize_path};

/// Names of executable files visible on `$PATH`.
///
/// Built once; stale until an explicit [`refresh`](Self::refresh) — directory
/// changes on disk are not watched.
#[derive(Debug, Default)]
pub struct ExecutableIndex {
    names: Vec<String>,
}

impl ExecutableIndex {
    pub fn scan() -> Self {
        Self {
            names: gather_path_executables(),
        }
    }

    pub fn refresh(&mut self) {
        self.names = gather_path_executables();
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect()
    }
}

fn gather_path_executables() -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut executables = Vec::new();

    for directory in search_path_dirs() {
        let entries = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if seen.contains(&name) {
                continue;
            }
            if !is_executable_file(&entry.path()) {
                continue;
            }
            seen.insert(name.clone());
            executables.push(name);
        }
    }

    executables.sort();
    executables
}

fn search_path_dirs() -> Vec<PathBuf> {
    match std::env::var_os("PATH") {
        Some(path) => std::env::split_paths(&path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Resolve a typed command name to an absolute executable path.
///
/// A name containing `/` is expanded and resolved against the working
/// directory (or taken as-is when absolute) and must exist on disk. A bare
/// name goes through the `$PATH` lookup, first match wins.
pub fn resolve_external(command: &str, working_dir: &Path) -> Option<PathBuf> {
    let expanded = expand_user_vars(command);
    if command.contains('/') {
        let expanded_path = Path::new(&expanded);
        let candidate = if expanded_path.is_absolute() {
            normalize_path(expanded_path)
        } else {
            normalize_path(&working_dir.join(expanded_path))
        };
        return candidate.exists().then_some(candidate);
    }
    find_in_path(&expanded)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    for directory in search_path_dirs() {
        let candidate = directory.join(name);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

pub fn run(prefix: Option<&str>, verbose: u8) -> Result<()> {
    let mut index = ExecutableIndex::default();
    index.refresh();
    if verbose > 0 {
        eprintln!("exes: {} entries on PATH", index.names().len());
    }

    let names = match prefix {
        Some(prefix) => index.matching(prefix),
        None => index.names().to_vec(),
    };
    for name in names {
        println!("{}", name);
    }

    Ok(())
}
