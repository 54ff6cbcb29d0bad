use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::errors::ServiceError;
use crate::models::{SerialMatchMode, SerializedPart};
use crate::repositories::GenealogyStore;

/// One step of the identifier fallback chain.
#[async_trait]
pub trait LookupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(
        &self,
        store: &dyn GenealogyStore,
        identifier: &str,
    ) -> Result<Option<SerializedPart>, ServiceError>;
}

/// Exact serial number match.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSerialMatch;

#[async_trait]
impl LookupStrategy for ExactSerialMatch {
    fn name(&self) -> &'static str {
        "exact"
    }

    async fn lookup(
        &self,
        store: &dyn GenealogyStore,
        identifier: &str,
    ) -> Result<Option<SerializedPart>, ServiceError> {
        store.find_serialized_part_by_serial_number(identifier).await
    }
}

/// Pattern match on the serial number; the first row in storage order wins.
#[derive(Debug, Clone, Copy)]
pub struct SerialPatternMatch(pub SerialMatchMode);

#[async_trait]
impl LookupStrategy for SerialPatternMatch {
    fn name(&self) -> &'static str {
        match self.0 {
            SerialMatchMode::StartsWith => "starts_with",
            SerialMatchMode::Contains => "contains",
            SerialMatchMode::EndsWith => "ends_with",
        }
    }

    async fn lookup(
        &self,
        store: &dyn GenealogyStore,
        identifier: &str,
    ) -> Result<Option<SerializedPart>, ServiceError> {
        Ok(store
            .find_serialized_parts_by_serial_pattern(identifier, self.0)
            .await?
            .into_iter()
            .next())
    }
}

/// Resolves a free-form identifier to a serialized part by running the
/// strategy chain in order and stopping at the first hit.
pub struct PartLookupResolver {
    store: Arc<dyn GenealogyStore>,
    strategies: Vec<Box<dyn LookupStrategy>>,
}

impl PartLookupResolver {
    /// Exact, then prefix, then substring, then suffix.
    pub fn new(store: Arc<dyn GenealogyStore>) -> Self {
        Self::with_strategies(
            store,
            vec![
                Box::new(ExactSerialMatch),
                Box::new(SerialPatternMatch(SerialMatchMode::StartsWith)),
                Box::new(SerialPatternMatch(SerialMatchMode::Contains)),
                Box::new(SerialPatternMatch(SerialMatchMode::EndsWith)),
            ],
        )
    }

    pub fn with_strategies(
        store: Arc<dyn GenealogyStore>,
        strategies: Vec<Box<dyn LookupStrategy>>,
    ) -> Self {
        Self { store, strategies }
    }

    pub async fn resolve(&self, identifier: &str) -> Result<SerializedPart, ServiceError> {
        if identifier.trim().is_empty() {
            return Err(not_found(identifier));
        }

        for strategy in &self.strategies {
            if let Some(part) = strategy.lookup(self.store.as_ref(), identifier).await? {
                debug!(
                    identifier,
                    strategy = strategy.name(),
                    serial_number = %part.serial_number,
                    "Resolved identifier"
                );
                return Ok(part);
            }
        }

        Err(not_found(identifier))
    }
}

fn not_found(identifier: &str) -> ServiceError {
    ServiceError::NotFound(format!(
        "Serialized part not found for identifier \"{}\"",
        identifier
    ))
}
