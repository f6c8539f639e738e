use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use zocalo_core::config::{self, RcFile};
use zocalo_core::startup::StartupMode;

#[derive(Parser)]
#[command(
    name = "zocalo",
    version,
    about = "An alternative desktop shell for Windows"
)]
struct Cli {
    /// Never run startup items
    #[arg(long, overrides_with = "startup")]
    nostartup: bool,

    /// Run startup items even when a held modifier key or the boot
    /// file would suppress them
    #[arg(long, overrides_with = "nostartup")]
    startup: bool,

    /// A !command to forward to the running instance, or the path of
    /// an alternate boot file
    #[arg(value_name = "COMMAND_OR_RC")]
    rest: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize(std::env::args()));

    // Tell the welcome screen to close before anything can open a
    // message box underneath it.
    zocalo_windows::instance::signal_shell_ready();

    // A leading !token is a one-shot command for an already-running
    // instance; this process never becomes a shell then.
    if let Some(first) = cli.rest.first() {
        if first.starts_with('!') {
            let args = cli.rest[1..].join(" ");
            return match zocalo_windows::instance::forward_bang(first, &args) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("zocalo: {e}");
                    ExitCode::from(1)
                }
            };
        }
    }

    let mode = if cli.startup {
        StartupMode::ForceRun
    } else if cli.nostartup {
        StartupMode::DontRun
    } else {
        StartupMode::Default
    };

    let rc_path = resolve_rc_path(&cli.rest);

    // The boot file is the one hard requirement before the shell
    // starts.
    let rc = match RcFile::load(&rc_path) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("zocalo: {e}");
            zocalo_windows::instance::report_fatal(&e.to_string());
            return ExitCode::from(2);
        }
    };

    let ambient = config::load();
    zocalo_core::log::init(&ambient.logging);

    match zocalo_windows::run(rc, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("zocalo: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Picks the boot file: the default `step.rc` next to the executable,
/// unless a free token names an existing file. An absolute token is
/// used as-is; a bare name resolves relative to the executable's
/// directory.
fn resolve_rc_path(tokens: &[String]) -> PathBuf {
    let app_dir = exe_dir();
    let mut rc_path = app_dir.join("step.rc");

    for token in tokens {
        let candidate = PathBuf::from(token);
        let resolved = if candidate.is_absolute() {
            candidate
        } else {
            app_dir.join(token)
        };
        if resolved.exists() {
            rc_path = resolved;
        }
    }
    rc_path
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_default()
}

/// Maps the legacy single-dash flag spellings onto the forms clap
/// understands. Last-specified still wins via `overrides_with`.
fn normalize(args: impl Iterator<Item = String>) -> Vec<String> {
    args.map(|arg| match arg.as_str() {
        "-nostartup" => "--nostartup".to_string(),
        "-startup" => "--startup".to_string(),
        _ => arg,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn legacy_flags_are_rewritten() {
        let args = ["zocalo", "-nostartup", "-startup", "!Recycle"]
            .iter()
            .map(|s| s.to_string());
        assert_eq!(
            normalize(args),
            vec!["zocalo", "--nostartup", "--startup", "!Recycle"]
        );
    }

    #[test]
    fn other_tokens_pass_through() {
        let args = ["zocalo", "theme.rc", "--startup"].iter().map(|s| s.to_string());
        assert_eq!(normalize(args), vec!["zocalo", "theme.rc", "--startup"]);
    }
}
