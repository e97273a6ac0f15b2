//! Environment abstraction for LLM settings.
//!
//! API keys and provider overrides are read through `AiEnvironment` so that
//! settings resolution can be tested without touching the process
//! environment.

/// Source of named configuration values.
pub trait AiEnvironment: Send + Sync {
    /// Value of `name`, or `None` when unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads from the process environment (after `.env` has been loaded).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl AiEnvironment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

#[cfg(test)]
pub mod test_env {
    use super::*;
    use std::collections::HashMap;

    /// Fixed key/value environment for tests.
    #[derive(Debug, Default)]
    pub struct MockEnvironment {
        vars: HashMap<String, String>,
    }

    impl MockEnvironment {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, name: &str, value: &str) -> Self {
            self.vars.insert(name.to_string(), value.to_string());
            self
        }
    }

    impl AiEnvironment for MockEnvironment {
        fn var(&self, name: &str) -> Option<String> {
            self.vars.get(name).cloned()
        }
    }
}
