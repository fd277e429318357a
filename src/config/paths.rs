//! Canonical names for files and directories.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! ## Progress layout
//!
//! | Location | Contents |
//! |----------|----------|
//! | `{progress}/{user}/courses/{course}.json` | Course processed on its own |
//! | `{progress}/{user}/specs/{spec}/{course}.json` | Course within a specialization |
//! | `{document}.lock` | Advisory lock held during a run |

/// Directory holding the project config file
pub const CONFIG_DIR: &str = ".courscape";

/// Config file name
pub const CONFIG_FILE: &str = "config.yaml";

/// Default progress root (relative to the working directory)
pub const DEFAULT_PROGRESS_DIR: &str = "progress";

/// Default session cookie file
pub const DEFAULT_COOKIES_FILE: &str = "cookies.json";

/// Namespace for courses processed on their own
pub const COURSES_DIR: &str = "courses";

/// Namespace for courses processed within a specialization
pub const SPECS_DIR: &str = "specs";

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_namespaces_differ() {
        assert_ne!(COURSES_DIR, SPECS_DIR);
    }

    #[test]
    fn test_config_location() {
        let path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);
        assert_eq!(path, PathBuf::from(".courscape/config.yaml"));
    }
}
