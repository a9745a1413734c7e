//! Minimal `.env` loader.
//!
//! Loads `./.env` then `~/.engram/.env` into the process environment.
//! System environment variables take priority and are never overwritten.

use std::path::PathBuf;

/// Load env files if present.
pub fn load_dotenv() {
    let mut candidates = vec![PathBuf::from(".env")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".engram").join(".env"));
    }
    for path in candidates {
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if key.is_empty() || std::env::var_os(key).is_some() {
                continue;
            }
            std::env::set_var(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_shapes() {
        // Exercise the parsing rules through a scratch variable name that
        // nothing else uses.
        let key = "ENGRAM_DOTENV_TEST_KEY";
        std::env::remove_var(key);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, format!("# comment\n{key}=\"quoted value\"\n")).unwrap();

        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        load_dotenv();
        std::env::set_current_dir(cwd).unwrap();

        assert_eq!(std::env::var(key).unwrap(), "quoted value");
        std::env::remove_var(key);
    }
}
