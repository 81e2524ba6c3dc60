//! Test identity and failure reporting
//!
//! A [`TestScope`] supplies the prefix a hook namespaces keys with, and the
//! sink that configuration errors are reported to. Reporting halts the test:
//! the default sink panics, the way a failed assertion does.
//!
//! [`TestName`] is the usual scope. The [`prefix_test`](crate::prefix_test)
//! attribute hands one to a test function, already filled in with the test's
//! module path and name.

use std::fmt;

use crate::error::PrefixError;

/// Prefix source and failure sink for hook construction
pub trait TestScope {
    /// Identity of the running test, used as the key prefix
    fn name(&self) -> String;

    /// Report a configuration failure and stop the test
    fn fatal(&self, err: PrefixError) -> ! {
        panic!("{}: {}", self.name(), err)
    }
}

/// Name of a running test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestName(String);

impl TestName {
    /// Wrap an explicit test name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TestScope for TestName {
    fn name(&self) -> String {
        self.0.clone()
    }
}

impl TestScope for str {
    fn name(&self) -> String {
        self.to_string()
    }
}

impl TestScope for String {
    fn name(&self) -> String {
        self.clone()
    }
}

impl<T: TestScope + ?Sized> TestScope for &T {
    fn name(&self) -> String {
        (**self).name()
    }

    fn fatal(&self, err: PrefixError) -> ! {
        (**self).fatal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_name() {
        let name = TestName::new("suite::case");
        assert_eq!(name.as_str(), "suite::case");
        assert_eq!(name.to_string(), "suite::case");
        assert_eq!(TestScope::name(&name), "suite::case");
    }

    #[test]
    fn test_str_scopes() {
        assert_eq!("TestFoo".name(), "TestFoo");
        assert_eq!(String::from("TestBar").name(), "TestBar");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_name_is_independent_of_worker_thread() {
        let names = ["suite::first", "suite::second"];
        let tasks: Vec<_> = names
            .into_iter()
            .map(|name| tokio::spawn(async move { TestName::new(name).name() }))
            .collect();

        let mut seen = Vec::new();
        for task in tasks {
            seen.push(task.await.unwrap());
        }
        assert_eq!(seen, names);
    }

    #[test]
    #[should_panic(expected = "TestFoo: WithDelimiter: cannot be empty")]
    fn test_default_fatal_panics() {
        "TestFoo".fatal(PrefixError::EmptyDelimiter);
    }
}
