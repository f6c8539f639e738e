//! Startup-item runner.
//!
//! Runs on its own worker thread, fire-and-forget: the shell never
//! waits for it, and it may still be launching programs while the
//! message pump is already up. It only spawns processes; what the
//! items are comes from the boot file.

use std::os::windows::process::CommandExt;
use std::process::Command;
use std::thread;

use zocalo_core::{log_info, log_warn};

/// Windows process creation flags for fully detached children.
///
/// `CREATE_NEW_PROCESS_GROUP` (0x200) — startup items get their own
/// process group, so signals aimed at the shell don't reach them.
///
/// `CREATE_NO_WINDOW` (0x08000000) — no console window, and no
/// inherited console handles to leak.
const DETACH_FLAGS: u32 = 0x08000000 | 0x00000200;

/// Launches every startup item on a detached worker thread.
pub fn spawn_runner(items: Vec<String>) {
    thread::spawn(move || {
        log_info!("startup runner: {} item(s)", items.len());
        for item in items {
            launch(&item);
        }
    });
}

fn launch(command_line: &str) {
    let Some((program, args)) = split_command_line(command_line) else {
        return;
    };

    let mut command = Command::new(program);
    if !args.is_empty() {
        command.args(args.split_whitespace());
    }

    match command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .creation_flags(DETACH_FLAGS)
        .spawn()
    {
        Ok(mut child) => {
            // Detach: acknowledge the child without blocking on it.
            let _ = child.try_wait();
        }
        Err(e) => log_warn!("startup item {command_line:?} failed: {e}"),
    }
}

/// Splits a startup line into program and arguments, honoring a
/// quoted program path.
fn split_command_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(rest) = line.strip_prefix('"') {
        let end = rest.find('"')?;
        return Some((&rest[..end], rest[end + 1..].trim_start()));
    }
    match line.split_once(char::is_whitespace) {
        Some((program, args)) => Some((program, args.trim_start())),
        None => Some((line, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_and_quoted_program_paths() {
        assert_eq!(
            split_command_line(r"C:\tools\sync.exe --quiet"),
            Some((r"C:\tools\sync.exe", "--quiet"))
        );
        assert_eq!(
            split_command_line(r#""C:\Program Files\app.exe" /s"#),
            Some((r"C:\Program Files\app.exe", "/s"))
        );
        assert_eq!(split_command_line("notepad"), Some(("notepad", "")));
        assert_eq!(split_command_line("   "), None);
    }
}
