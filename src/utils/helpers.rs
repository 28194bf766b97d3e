//! Small helpers for rdir.

use std::path::{MAIN_SEPARATOR, Path};

/// Shortens the home directory prefix to `~`. Used by the header
/// breadcrumb; the status line always shows the full absolute path.
pub fn shorten_home_path<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    if let Some(home_dir) = dirs::home_dir()
        && let Ok(stripped) = path.strip_prefix(&home_dir)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        } else {
            let mut short = stripped.display().to_string();
            if short.starts_with(MAIN_SEPARATOR) {
                short.remove(0);
            }
            return format!("~{}{}", MAIN_SEPARATOR, short);
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_shortens_to_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(shorten_home_path(&home), "~");
            let sub = home.join("projects");
            assert_eq!(
                shorten_home_path(&sub),
                format!("~{}projects", MAIN_SEPARATOR)
            );
        }
    }

    #[test]
    fn foreign_paths_pass_through() {
        assert_eq!(shorten_home_path("/tmp/x"), "/tmp/x");
    }
}
