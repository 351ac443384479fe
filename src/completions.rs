use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap_complete::{generate, Shell};

use crate::app::AppError;

const BIN_NAME: &str = "roam";

pub fn generate_completions(shell: Shell, buf: &mut dyn Write) {
    let mut cmd = crate::cli::styled_command();
    generate(shell, &mut cmd, BIN_NAME, buf);
}

fn shell_from_name(raw: &str) -> Option<Shell> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "bash" => Some(Shell::Bash),
        "zsh" => Some(Shell::Zsh),
        "fish" => Some(Shell::Fish),
        "elvish" => Some(Shell::Elvish),
        "powershell" | "pwsh" => Some(Shell::PowerShell),
        _ => None,
    }
}

/// Shell named by a `$SHELL` value such as `/usr/bin/zsh`.
fn shell_from_env_value(value: &str) -> Option<Shell> {
    let basename = value.rsplit('/').next()?;
    shell_from_name(basename)
}

pub fn detect_current_shell() -> Option<Shell> {
    shell_from_env_value(&std::env::var("SHELL").ok()?)
}

fn install_path(shell: Shell, home: &Path) -> Option<PathBuf> {
    let relative = match shell {
        Shell::Bash => ".local/share/bash-completion/completions/roam",
        Shell::Zsh => ".config/roam/completions/roam.zsh",
        Shell::Fish => ".config/fish/completions/roam.fish",
        _ => return None,
    };
    Some(home.join(relative))
}

/// Writes the completion script under `home` and returns where it went.
pub fn install_completions(shell: Shell, home: &Path) -> io::Result<PathBuf> {
    let path = install_path(shell, home).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no install path for {shell:?}"),
        )
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut script = Vec::new();
    generate_completions(shell, &mut script);
    std::fs::write(&path, script)?;

    if shell == Shell::Zsh {
        source_from_zshrc(home, &path)?;
    }
    tracing::debug!(path = %path.display(), "installed completions");
    Ok(path)
}

fn source_from_zshrc(home: &Path, script: &Path) -> io::Result<()> {
    let zshrc = home.join(".zshrc");
    let source_line = format!("source \"{}\"", script.display());
    match std::fs::read_to_string(&zshrc) {
        Ok(content) if content.lines().any(|line| line.trim() == source_line) => {
            return Ok(())
        }
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&zshrc)?;
    writeln!(file)?;
    writeln!(file, "# roam shell completions")?;
    writeln!(file, "{source_line}")?;
    Ok(())
}

pub fn run_completions_command(shell_arg: Option<&str>, install: bool) -> Result<(), AppError> {
    let shell = match shell_arg {
        Some(name) => shell_from_name(name)
            .ok_or_else(|| AppError::InvalidArgument(format!("unknown shell '{name}'")))?,
        None => detect_current_shell().ok_or_else(|| {
            AppError::InvalidArgument(
                "unable to detect shell from $SHELL; pass a shell name".to_string(),
            )
        })?,
    };

    if install {
        let home = directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or_else(|| {
                AppError::InvalidArgument("cannot determine home directory".to_string())
            })?;
        let path = install_completions(shell, &home)?;
        println!("completions installed to {}", path.display());
    } else {
        let mut stdout = io::stdout().lock();
        generate_completions(shell, &mut stdout);
    }
    Ok(())
}
