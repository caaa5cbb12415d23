//! Named provider lookup.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::LoginProvider;

/// Registry of login providers keyed by name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn LoginProvider>>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").finish_non_exhaustive()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `name`, replacing any previous entry.
    pub async fn register(&self, name: impl Into<String>, provider: Arc<dyn LoginProvider>) {
        let name = name.into();
        let replaced = self
            .providers
            .write()
            .await
            .insert(name.clone(), provider)
            .is_some();
        info!(provider = %name, replaced, "Login provider registered");
    }

    /// Look a provider up by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn LoginProvider>> {
        self.providers.read().await.get(name).cloned()
    }

    /// Sorted names of every registered provider.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;

    use gatehouse_core::result::AppResult;
    use gatehouse_entity::User;

    use super::*;

    struct Fixed(i64);

    #[async_trait]
    impl LoginProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn login(&self, _credentials: &[u8]) -> AppResult<User> {
            let now = Utc::now();
            Ok(User {
                id: self.0,
                username: format!("user{}", self.0),
                name: String::new(),
                avatar: String::new(),
                created_at: now,
                updated_at: now,
            })
        }
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let registry = ProviderRegistry::new();
        registry.register("fixed", Arc::new(Fixed(1))).await;
        registry.register("fixed", Arc::new(Fixed(2))).await;

        let provider = registry.get("fixed").await.unwrap();
        assert_eq!(provider.login(b"").await.unwrap().id, 2);
        assert_eq!(registry.names().await, vec!["fixed".to_string()]);
        assert!(registry.get("missing").await.is_none());
    }
}
