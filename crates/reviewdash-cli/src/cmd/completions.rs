use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use clap_complete::{Shell, generate};
use tracing::debug;

/// Arguments for `rdash completions`.
#[derive(Args, Debug, PartialEq, Eq)]
pub struct CompletionsArgs {
    /// Shell to generate the completion script for.
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Emit the completion script for `rdash` to stdout or `--output`.
///
/// # Errors
///
/// Returns an error if the destination cannot be created or written.
pub fn run_completions(args: &CompletionsArgs, command: &mut clap::Command) -> Result<()> {
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("could not create {}", path.display()))?;
            write_completions(args.shell, command, &mut BufWriter::new(file))
                .with_context(|| format!("could not write {}", path.display()))?;
            debug!(shell = %args.shell, path = %path.display(), "completions written");
        }
        None => write_completions(args.shell, command, &mut io::stdout().lock())?,
    }
    Ok(())
}

/// Generate the script under the command's own binary name.
fn write_completions(
    shell: Shell,
    command: &mut clap::Command,
    out: &mut dyn Write,
) -> io::Result<()> {
    let bin_name = command.get_name().to_string();
    generate(shell, command, bin_name, out);
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> clap::Command {
        clap::Command::new("rdash")
            .subcommand(clap::Command::new("report"))
            .subcommand(clap::Command::new("export"))
    }

    #[test]
    fn bash_script_completes_subcommands() {
        let mut buf = Vec::new();
        write_completions(Shell::Bash, &mut command(), &mut buf).expect("generate");
        let script = String::from_utf8(buf).expect("utf8");
        assert!(script.contains("rdash"));
        assert!(script.contains("report"));
        assert!(script.contains("export"));
    }

    #[test]
    fn output_flag_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rdash.zsh");
        let args = CompletionsArgs {
            shell: Shell::Zsh,
            output: Some(path.clone()),
        };
        run_completions(&args, &mut command()).expect("completions");
        let script = std::fs::read_to_string(&path).expect("script");
        assert!(script.contains("#compdef rdash"));
    }

    #[test]
    fn unwritable_output_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = CompletionsArgs {
            shell: Shell::Fish,
            output: Some(dir.path().join("missing").join("rdash.fish")),
        };
        let err = run_completions(&args, &mut command()).expect_err("no parent dir");
        assert!(err.to_string().contains("could not create"));
    }
}
