use std::sync::Arc;

use crate::api::ConsoleApi;
use crate::notify::{Confirmer, Notifier};

/// Collaborators shared by every state container.
#[derive(Clone)]
pub struct Services {
    pub api: Arc<dyn ConsoleApi>,
    pub notifier: Notifier,
    pub confirmer: Arc<dyn Confirmer>,
}

impl Services {
    pub fn new(api: Arc<dyn ConsoleApi>, notifier: Notifier, confirmer: Arc<dyn Confirmer>) -> Self {
        Self {
            api,
            notifier,
            confirmer,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
