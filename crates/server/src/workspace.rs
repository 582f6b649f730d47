//! In-memory working copies of quotes in front of the repository.
//!
//! Every mutation lands on the in-memory snapshot first (totals recomputed),
//! then is persisted best-effort. A failed write keeps the local state and
//! marks it `synced: false`; the next successful persist flips the flag
//! back. There is no rollback and no automatic retry.

use std::collections::HashMap;
use std::sync::Arc;

use devis_core::{ApplicationError, DomainError, Quote, QuoteId};
use devis_db::repositories::QuoteRepository;
use tokio::sync::RwLock;
use tracing::warn;

struct Entry {
    quote: Quote,
    synced: bool,
}

/// A quote paired with its persistence state, as surfaced to callers.
#[derive(Clone, Debug)]
pub struct WorkingCopy {
    pub quote: Quote,
    pub synced: bool,
}

pub struct QuoteWorkspace {
    repository: Arc<dyn QuoteRepository>,
    entries: RwLock<HashMap<QuoteId, Entry>>,
}

impl QuoteWorkspace {
    pub fn new(repository: Arc<dyn QuoteRepository>) -> Self {
        Self { repository, entries: RwLock::new(HashMap::new()) }
    }

    /// All quotes, local working copies winning over stored rows.
    pub async fn list(&self) -> Result<Vec<WorkingCopy>, ApplicationError> {
        let stored = self
            .repository
            .list()
            .await
            .map_err(|e| ApplicationError::Persistence(e.to_string()))?;

        let entries = self.entries.read().await;
        let mut copies: Vec<WorkingCopy> = stored
            .into_iter()
            .map(|quote| match entries.get(&quote.id) {
                Some(entry) => {
                    WorkingCopy { quote: entry.quote.clone(), synced: entry.synced }
                }
                None => WorkingCopy { quote, synced: true },
            })
            .collect();

        // Unsynced creations exist only locally.
        for entry in entries.values() {
            if !entry.synced && !copies.iter().any(|c| c.quote.id == entry.quote.id) {
                copies.push(WorkingCopy { quote: entry.quote.clone(), synced: false });
            }
        }
        copies.sort_by(|a, b| b.quote.created_at.cmp(&a.quote.created_at));
        Ok(copies)
    }

    pub async fn get(&self, id: &QuoteId) -> Result<WorkingCopy, ApplicationError> {
        if let Some(entry) = self.entries.read().await.get(id) {
            return Ok(WorkingCopy { quote: entry.quote.clone(), synced: entry.synced });
        }

        let quote = self
            .repository
            .find_by_id(id)
            .await
            .map_err(|e| ApplicationError::Persistence(e.to_string()))?
            .ok_or_else(|| ApplicationError::NotFound(format!("quote {}", id.0)))?;
        Ok(WorkingCopy { quote, synced: true })
    }

    /// Install a new quote and persist it best-effort.
    pub async fn insert(&self, quote: Quote) -> WorkingCopy {
        self.store(quote).await
    }

    /// Apply a mutation to the working copy. The local snapshot is updated
    /// and totals recomputed before the persist attempt; a persist failure
    /// never rolls the mutation back.
    pub async fn mutate<F>(&self, id: &QuoteId, apply: F) -> Result<WorkingCopy, ApplicationError>
    where
        F: FnOnce(&mut Quote) -> Result<(), DomainError>,
    {
        let mut quote = self.get(id).await?.quote;
        apply(&mut quote)?;
        quote.recompute();
        Ok(self.store(quote).await)
    }

    /// Every quote number in use, including unsynced local creations.
    /// Feeds sequential number allocation.
    pub async fn quote_numbers(&self) -> Result<Vec<String>, ApplicationError> {
        let mut numbers = self
            .repository
            .list_quote_numbers()
            .await
            .map_err(|e| ApplicationError::Persistence(e.to_string()))?;
        for entry in self.entries.read().await.values() {
            if !numbers.contains(&entry.quote.quote_number) {
                numbers.push(entry.quote.quote_number.clone());
            }
        }
        Ok(numbers)
    }

    pub async fn remove(&self, id: &QuoteId) -> Result<(), ApplicationError> {
        let existed_locally = self.entries.write().await.remove(id).is_some();
        let deleted = self
            .repository
            .delete(id)
            .await
            .map_err(|e| ApplicationError::Persistence(e.to_string()))?;
        if !deleted && !existed_locally {
            return Err(ApplicationError::NotFound(format!("quote {}", id.0)));
        }
        Ok(())
    }

    async fn store(&self, quote: Quote) -> WorkingCopy {
        let synced = match self.repository.save(quote.clone()).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "quote.workspace.persist_failed",
                    quote_id = %quote.id.0,
                    error = %error,
                    "quote persisted locally only, repository write failed"
                );
                false
            }
        };

        let mut entries = self.entries.write().await;
        if synced {
            // Stored copy is authoritative again.
            entries.remove(&quote.id);
        } else {
            entries.insert(quote.id.clone(), Entry { quote: quote.clone(), synced });
        }
        WorkingCopy { quote, synced }
    }
}
