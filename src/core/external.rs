//! External tool detection and dispatch for rdir.
//!
//! Clipboard, editor and pager commands are resolved once at startup:
//! environment variables first (`VISUAL`/`EDITOR`/`PAGER`), then platform
//! defaults probed with `which`. Invocation goes through one routine so
//! every failure is labelled with the tool's role.

use crate::error::{Error, Result};

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// A resolved external command: program plus fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    fn with_args(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// A resolved clipboard command. `pipe` commands read the payload from
/// stdin; the rest take it as a single trailing argument.
#[derive(Debug, Clone)]
pub struct ClipboardSpec {
    pub command: CommandSpec,
    pub pipe: bool,
}

/// The capability set detected at startup.
#[derive(Debug, Clone, Default)]
pub struct ExternalTools {
    pub editor: Option<CommandSpec>,
    pub pager: Option<CommandSpec>,
    pub clipboard: Option<ClipboardSpec>,
}

impl ExternalTools {
    pub fn detect() -> Self {
        Self {
            editor: detect_editor(),
            pager: detect_pager(),
            clipboard: detect_clipboard(),
        }
    }
}

/// Splits a shell-ish command string into tokens, honouring single and
/// double quotes and backslash escapes, and expanding a leading `~` on the
/// first token only.
pub fn shell_tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut any = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => {
                in_single = !in_single;
                any = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                any = true;
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if any || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                    any = false;
                }
            }
            c => {
                current.push(c);
                any = true;
            }
        }
    }
    if any || !current.is_empty() {
        tokens.push(current);
    }

    if let Some(first) = tokens.first_mut()
        && let Some(rest) = first.strip_prefix('~')
        && (rest.is_empty() || rest.starts_with('/'))
        && let Some(home) = dirs::home_dir()
    {
        *first = format!("{}{}", home.display(), rest);
    }

    tokens
}

fn spec_from_env(var: &str) -> Option<CommandSpec> {
    let value = std::env::var(var).ok()?;
    let tokens = shell_tokenize(&value);
    let (program, args) = tokens.split_first()?;
    if program.is_empty() {
        return None;
    }
    Some(CommandSpec {
        program: program.clone(),
        args: args.to_vec(),
    })
}

fn detect_editor() -> Option<CommandSpec> {
    if let Some(spec) = spec_from_env("VISUAL").or_else(|| spec_from_env("EDITOR")) {
        return Some(spec);
    }

    #[cfg(unix)]
    {
        for candidate in ["vim", "nano"] {
            if which::which(candidate).is_ok() {
                return Some(CommandSpec::new(candidate));
            }
        }
    }
    #[cfg(windows)]
    {
        if which::which("code").is_ok() {
            return Some(CommandSpec::with_args("code", &["--wait"]));
        }
        for candidate in ["notepad++.exe", "notepad.exe"] {
            if which::which(candidate).is_ok() {
                return Some(CommandSpec::new(candidate));
            }
        }
    }
    None
}

fn detect_pager() -> Option<CommandSpec> {
    if let Some(spec) = spec_from_env("PAGER") {
        return Some(spec);
    }

    #[cfg(unix)]
    {
        if which::which("less").is_ok() {
            return Some(CommandSpec::new("less"));
        }
    }
    #[cfg(windows)]
    {
        if which::which("more.com").is_ok() {
            return Some(CommandSpec::new("more.com"));
        }
        if which::which("cmd").is_ok() {
            return Some(CommandSpec::with_args("cmd", &["/C", "type"]));
        }
    }
    None
}

fn detect_clipboard() -> Option<ClipboardSpec> {
    #[cfg(unix)]
    {
        let candidates: [(&str, &[&str]); 4] = [
            ("pbcopy", &[]),
            ("xclip", &["-selection", "clipboard"]),
            ("wl-copy", &[]),
            ("xsel", &["--clipboard", "--input"]),
        ];
        for (program, args) in candidates {
            if which::which(program).is_ok() {
                return Some(ClipboardSpec {
                    command: CommandSpec::with_args(program, args),
                    pipe: true,
                });
            }
        }
        None
    }
    #[cfg(windows)]
    {
        for candidate in ["clip.exe", "clip"] {
            if which::which(candidate).is_ok() {
                return Some(ClipboardSpec {
                    command: CommandSpec::new(candidate),
                    pipe: true,
                });
            }
        }
        if which::which("powershell").is_ok() {
            return Some(ClipboardSpec {
                command: CommandSpec::with_args(
                    "powershell",
                    &["-NoProfile", "-Command", "Set-Clipboard", "-Value"],
                ),
                pipe: false,
            });
        }
        None
    }
}

/// Runs an external command with the terminal handed over (inherited
/// stdio), blocking until it exits. The caller is responsible for
/// suspending and resuming raw mode around the call.
pub fn run_with_terminal(spec: &CommandSpec, target: &Path, role: &'static str) -> Result<()> {
    tracing::debug!(role, command = %spec.display(), target = %target.display(), "spawning external tool");
    let status = Command::new(&spec.program)
        .args(&spec.args)
        .arg(target)
        .status()
        .map_err(|e| Error::external(role, spec.display(), e))?;

    if !status.success() {
        return Err(Error::external(
            role,
            spec.display(),
            std::io::Error::other(format!("exited with {status}")),
        ));
    }
    Ok(())
}

/// Copies `lines` to the clipboard tool, streaming through a pipe when the
/// tool reads stdin and buffering into one argument otherwise. Lines are
/// joined with LF.
pub fn copy_lines<I>(clip: &ClipboardSpec, lines: I) -> Result<()>
where
    I: IntoIterator<Item = String>,
{
    if clip.pipe {
        let mut child = Command::new(&clip.command.program)
            .args(&clip.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::external("clipboard", clip.command.display(), e))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| {
                    Error::external(
                        "clipboard",
                        clip.command.display(),
                        std::io::Error::other("no stdin pipe"),
                    )
                })?;
            let mut first = true;
            for line in lines {
                if !first {
                    stdin
                        .write_all(b"\n")
                        .map_err(|e| Error::external("clipboard", clip.command.display(), e))?;
                }
                stdin
                    .write_all(line.as_bytes())
                    .map_err(|e| Error::external("clipboard", clip.command.display(), e))?;
                first = false;
            }
        }

        let status = child
            .wait()
            .map_err(|e| Error::external("clipboard", clip.command.display(), e))?;
        if !status.success() {
            return Err(Error::external(
                "clipboard",
                clip.command.display(),
                std::io::Error::other(format!("exited with {status}")),
            ));
        }
        Ok(())
    } else {
        let joined: Vec<String> = lines.into_iter().collect();
        let status = Command::new(&clip.command.program)
            .args(&clip.command.args)
            .arg(joined.join("\n"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::external("clipboard", clip.command.display(), e))?;
        if !status.success() {
            return Err(Error::external(
                "clipboard",
                clip.command.display(),
                std::io::Error::other(format!("exited with {status}")),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_plain_words() {
        assert_eq!(shell_tokenize("vim -u NONE"), vec!["vim", "-u", "NONE"]);
    }

    #[test]
    fn tokenize_quotes() {
        assert_eq!(
            shell_tokenize(r#"code --wait "my file.txt""#),
            vec!["code", "--wait", "my file.txt"]
        );
        assert_eq!(shell_tokenize("'a b' c"), vec!["a b", "c"]);
    }

    #[test]
    fn tokenize_escapes() {
        assert_eq!(shell_tokenize(r"ed\ itor x"), vec!["ed itor", "x"]);
    }

    #[test]
    fn tokenize_tilde_first_token_only() {
        if let Some(home) = dirs::home_dir() {
            let tokens = shell_tokenize("~/bin/ed ~/notes");
            assert_eq!(tokens[0], format!("{}/bin/ed", home.display()));
            assert_eq!(tokens[1], "~/notes");
        }
    }

    #[test]
    fn tokenize_empty() {
        assert!(shell_tokenize("").is_empty());
        assert!(shell_tokenize("   ").is_empty());
    }
}
