//! Secrets sourcing (spec.md §6 "Secrets are retrieved by name from a
//! secrets provider in production and from environment variables in
//! development").

/// Retrieves a named secret. The env-var implementation below covers
/// development; a production deployment supplies its own implementation
/// (e.g. backed by a vault or cloud secrets manager) without the core
/// pipeline crates knowing the difference.
pub trait SecretsSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads secrets straight from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretsSource;

impl SecretsSource for EnvSecretsSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_source_reads_existing_variable() {
        std::env::set_var("LEADGUARD_TEST_SECRET", "shh");
        let source = EnvSecretsSource;
        assert_eq!(source.get("LEADGUARD_TEST_SECRET").as_deref(), Some("shh"));
        std::env::remove_var("LEADGUARD_TEST_SECRET");
    }

    #[test]
    fn env_source_returns_none_for_missing_variable() {
        let source = EnvSecretsSource;
        assert_eq!(source.get("LEADGUARD_TEST_SECRET_MISSING"), None);
    }
}
