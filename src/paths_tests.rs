//! Tests for paths module.

use super::*;
use serial_test::serial;
use std::env;
use tempfile::tempdir;

struct HomeOverride {
    previous: Option<std::ffi::OsString>,
}

impl HomeOverride {
    fn set(path: &std::path::Path) -> Self {
        let previous = env::var_os(CONTENTQ_HOME_ENV);
        env::set_var(CONTENTQ_HOME_ENV, path);
        Self { previous }
    }
}

impl Drop for HomeOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => env::set_var(CONTENTQ_HOME_ENV, value),
            None => env::remove_var(CONTENTQ_HOME_ENV),
        }
    }
}

#[test]
#[serial]
fn test_home_override_is_created() {
    let dir = tempdir().unwrap();
    let home = dir.path().join("studio");
    let _guard = HomeOverride::set(&home);

    let path = contentq_home_dir().unwrap();
    assert_eq!(path, home);
    assert!(home.is_dir());
}

#[test]
#[serial]
fn test_subdirectories() {
    let dir = tempdir().unwrap();
    let _guard = HomeOverride::set(dir.path());

    let sessions = sessions_dir().unwrap();
    assert_eq!(sessions, dir.path().join("sessions"));
    assert!(sessions.is_dir());

    let logs = logs_dir().unwrap();
    assert_eq!(logs, dir.path().join("logs"));
    assert!(logs.is_dir());
}

#[test]
#[serial]
fn test_default_config_path_not_created() {
    let dir = tempdir().unwrap();
    let _guard = HomeOverride::set(dir.path());

    let path = default_config_path().unwrap();
    assert_eq!(path, dir.path().join("config.yaml"));
    assert!(!path.exists());
}

#[test]
#[serial]
fn test_default_home_under_home_dir() {
    let previous = env::var_os(CONTENTQ_HOME_ENV);
    env::remove_var(CONTENTQ_HOME_ENV);

    let result = contentq_home_dir();
    if let Some(value) = previous {
        env::set_var(CONTENTQ_HOME_ENV, value);
    }
    let expected = dirs::home_dir().unwrap().join(".contentq");
    assert_eq!(result.unwrap(), expected);
}
