//! Reads the environment variables set by the GitHub Actions runner.

use std::{borrow::Borrow, collections::HashMap, fmt::Debug, hash::Hash};

/// A source of environment variables.
///
/// The process environment is the only source used in production. Tests hand in a [`HashMap`] instead so nothing
/// global is mutated.
pub trait Env: Debug + Send + Sync {
    /// Looks up a variable, returning [`None`] if it is unset or not valid unicode.
    fn var(&self, key: &str) -> Option<String>;

    /// Looks up a variable, treating an empty value as unset.
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|value| !value.is_empty())
    }

    /// Reads an action input the way the Actions toolkit does: from `INPUT_<NAME>`, trimmed.
    ///
    /// Returns [`None`] if the input is unset or blank.
    fn input(&self, name: &str) -> Option<String> {
        self.var(&input_key(name))
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }
}

/// The environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<K, V> Env for HashMap<K, V>
where
    K: Borrow<str> + Hash + Eq + Debug + Send + Sync,
    V: AsRef<str> + Debug + Send + Sync,
{
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.as_ref().to_owned())
    }
}

impl<E> Env for &E
where
    E: Env + ?Sized,
{
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

/// Maps an input name to the variable the runner exposes it as.
pub fn input_key(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_key_follows_runner_convention() {
        assert_eq!(input_key("token"), "INPUT_TOKEN");
        assert_eq!(input_key("retry count"), "INPUT_RETRY_COUNT");
    }

    #[test]
    fn inputs_are_trimmed_and_blank_is_unset() {
        let env = HashMap::from([("INPUT_TOKEN", "  secret \n"), ("INPUT_ENDPOINT", "   ")]);
        assert_eq!(env.input("token").as_deref(), Some("secret"));
        assert_eq!(env.input("endpoint"), None);
        assert_eq!(env.input("timeout"), None);
    }

    #[test]
    fn empty_variables_are_not_present() {
        let env = HashMap::from([("GITHUB_HEAD_REF", "")]);
        assert_eq!(env.var("GITHUB_HEAD_REF").as_deref(), Some(""));
        assert_eq!(env.non_empty("GITHUB_HEAD_REF"), None);
    }
}
