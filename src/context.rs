use std::sync::Arc;

use crate::config_file::ConfigStore;
use crate::repo::Repo;

/// Per-invocation state, created once by the entry point and passed by
/// reference to the dispatcher and to every running command.
pub struct Context {
    config: ConfigStore,
    repo: Option<Arc<dyn Repo>>,
}

impl Context {
    #[must_use]
    pub fn new(config: ConfigStore) -> Self {
        Context { config, repo: None }
    }

    #[must_use]
    pub fn with_repo(mut self, repo: Arc<dyn Repo>) -> Self {
        self.repo = Some(repo);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    #[must_use]
    pub fn repo(&self) -> Option<&dyn Repo> {
        self.repo.as_deref()
    }
}
