//! Command-line argument handling for rdir.
//!
//! One positional argument: the starting directory (default: cwd). Plus
//! `--help` and `--version`. Anything else is an error on stderr.

use std::path::PathBuf;

pub enum CliAction {
    RunApp { start_dir: PathBuf },
    Exit { code: i32 },
}

pub fn handle_args() -> CliAction {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut start_dir: Option<PathBuf> = None;
    for arg in &args {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return CliAction::Exit { code: 0 };
            }
            "-V" | "--version" => {
                println!("rdir {}", env!("CARGO_PKG_VERSION"));
                return CliAction::Exit { code: 0 };
            }
            flag if flag.starts_with('-') => {
                eprintln!("rdir: unknown option: {flag}");
                return CliAction::Exit { code: 2 };
            }
            positional => {
                if start_dir.is_some() {
                    eprintln!("rdir: expected at most one starting directory");
                    return CliAction::Exit { code: 2 };
                }
                start_dir = Some(PathBuf::from(positional));
            }
        }
    }

    let start_dir = match start_dir {
        Some(dir) => dir,
        None => match std::env::current_dir() {
            Ok(cwd) => cwd,
            Err(e) => {
                eprintln!("rdir: cannot determine current directory: {e}");
                return CliAction::Exit { code: 2 };
            }
        },
    };

    let start_dir = match start_dir.canonicalize() {
        Ok(dir) if dir.is_dir() => dir,
        Ok(dir) => {
            eprintln!("rdir: {}: not a directory", dir.display());
            return CliAction::Exit { code: 2 };
        }
        Err(e) => {
            eprintln!("rdir: {}: {e}", start_dir.display());
            return CliAction::Exit { code: 2 };
        }
    };

    CliAction::RunApp { start_dir }
}

fn print_help() {
    println!(
        r#"rdir - a three-panel terminal file browser with an embedded pager

USAGE:
    rdir [DIR]

ARGS:
    DIR                   Starting directory (default: current directory)

OPTIONS:
    -h, --help            Print help information
    -V, --version         Print version

ENVIRONMENT:
    VISUAL, EDITOR        Editor used by `e`
    PAGER                 External pager command
    RDIR_CONFIG           Override the config path (~/.config/rdir/rdir.toml)
    RDIR_DEBUG_LOG=1      Verbose event trace in the system temp directory

On quit-and-change (Q) the final directory is printed on stdout, so a
shell wrapper can `cd "$(rdir)"`."#
    );
}
