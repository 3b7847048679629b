//! Static registry of built-in shell commands.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// One built-in command: canonical name, accepted aliases, completable
/// flags, and whether its arguments are filesystem paths.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub flags: &'static [&'static str],
    pub takes_path: bool,
}

const BUILTINS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        aliases: &["help"],
        flags: &[],
        takes_path: false,
    },
    CommandSpec {
        name: "exit",
        aliases: &["exit"],
        flags: &[],
        takes_path: false,
    },
    CommandSpec {
        name: "reload",
        aliases: &["reload"],
        flags: &["--full", "--hard", "--all", "-f", "-a"],
        takes_path: false,
    },
    CommandSpec {
        name: "clear",
        aliases: &["clear"],
        flags: &[],
        takes_path: false,
    },
    CommandSpec {
        name: "cd",
        aliases: &["cd", "goto"],
        flags: &[],
        takes_path: true,
    },
    CommandSpec {
        name: "ls",
        aliases: &["ls", "dir"],
        flags: &["-a", "-A", "--all", "--"],
        takes_path: true,
    },
    CommandSpec {
        name: "mkdir",
        aliases: &["mkdir"],
        flags: &[],
        takes_path: true,
    },
    CommandSpec {
        name: "touch",
        aliases: &["touch"],
        flags: &[],
        takes_path: true,
    },
    CommandSpec {
        name: "rm",
        aliases: &["rm"],
        flags: &["-f", "-r", "-R", "-rf", "-fr", "--"],
        takes_path: true,
    },
    CommandSpec {
        name: "edit",
        aliases: &["edit"],
        flags: &[],
        takes_path: true,
    },
];

lazy_static! {
    static ref BY_ALIAS: HashMap<&'static str, &'static CommandSpec> = {
        let mut map = HashMap::new();
        for spec in BUILTINS {
            for alias in spec.aliases {
                map.insert(*alias, spec);
            }
        }
        map
    };
    static ref ALL_ALIASES: Vec<&'static str> = {
        let mut aliases: Vec<&'static str> = BY_ALIAS.keys().copied().collect();
        aliases.sort_unstable();
        aliases
    };
}

pub fn lookup(alias: &str) -> Option<&'static CommandSpec> {
    BY_ALIAS.get(alias).copied()
}

/// All registered aliases, sorted.
pub fn aliases() -> &'static [&'static str] {
    &ALL_ALIASES
}

/// A flag position: the fragment starts with `-`, the command declares
/// flags, and no literal `--` terminator appeared among prior arguments.
pub fn is_flag_context(fragment: &str, args_before: &[String], spec: &CommandSpec) -> bool {
    if spec.flags.is_empty() {
        return false;
    }
    if args_before.iter().any(|tok| tok == "--") {
        return false;
    }
    fragment.starts_with('-')
}

/// Flags matching the fragment, minus flags already present (flags are not
/// repeatable). Collection stops at a literal `--`.
pub fn complete_flags(fragment: &str, args_before: &[String], spec: &CommandSpec) -> Vec<String> {
    let mut used = std::collections::HashSet::new();
    for token in args_before {
        if token == "--" {
            break;
        }
        if spec.flags.contains(&token.as_str()) {
            used.insert(token.as_str());
        }
    }

    spec.flags
        .iter()
        .filter(|flag| flag.starts_with(fragment) && !used.contains(**flag))
        .map(|flag| flag.to_string())
        .collect()
}
