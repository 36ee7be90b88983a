//! # Shell Completion Module
//!
//! Generates completion scripts through clap's completion system.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! muse-resolver completion bash > ~/.local/share/bash-completion/completions/muse-resolver
//!
//! # Generate zsh completions
//! muse-resolver completion zsh > ~/.config/zsh/completions/_muse-resolver
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn io::Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
pub fn shell_to_completion_shell(shell: Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::CommandFactory;

    fn script(shell: Shell) -> String {
        let mut out = Vec::new();
        generate_completions(shell_to_completion_shell(shell), &mut Args::command(), &mut out);
        String::from_utf8(out).expect("utf-8 completion script")
    }

    #[test]
    fn test_bash_completion_mentions_subcommands() {
        let bash = script(Shell::Bash);
        assert!(bash.contains("muse-resolver"));
        assert!(bash.contains("resolve"));
        assert!(bash.contains("completion"));
    }

    #[test]
    fn test_every_shell_generates() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
            assert!(!script(shell).is_empty(), "{shell:?}");
        }
    }
}
