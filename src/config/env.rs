//! Environment variable lookup.

/// Source of environment variables.
pub trait EnvSource {
    /// Returns the value of `name`, or `None` when unset or not Unicode.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
