//! Resolution of field display names to Jira field ids.

use crate::client::JiraClient;
use crate::domain::FieldDescriptor;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Maps field display names to field ids, case-insensitively.
///
/// The full field list is fetched from Jira on the first lookup and kept for
/// the lifetime of the resolver. A failed fetch is not remembered, so the next
/// lookup tries again.
///
/// # Concurrency
///
/// The state mutex is held while the field list is fetched, so concurrent
/// first lookups wait for a single request instead of issuing their own.
pub struct FieldResolver {
    client: Arc<dyn JiraClient>,
    state: Mutex<ResolverState>,
}

#[derive(Default)]
struct ResolverState {
    /// Every field, once fetched.
    fields: Option<Vec<FieldDescriptor>>,
    /// Lowercased name to id, for names that are unique.
    ids: HashMap<String, String>,
}

impl FieldResolver {
    /// Create a resolver with an empty cache.
    pub fn new(client: Arc<dyn JiraClient>) -> Self {
        Self {
            client,
            state: Mutex::new(ResolverState::default()),
        }
    }

    /// Resolve a field display name to its id.
    ///
    /// # Errors
    ///
    /// - `Error::FieldFetch` if Jira returned no field list
    /// - `Error::UnknownField` if no field has the name
    /// - `Error::AmbiguousField` if several fields share the name
    /// - client errors from fetching the field list
    pub async fn resolve(&self, name: &str) -> Result<String> {
        let query = normalize(name);
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        if let Some(id) = state.ids.get(&query) {
            debug!(field = %name, id = %id, "Field id cache hit");
            return Ok(id.clone());
        }

        if state.fields.is_none() {
            debug!(field = %name, "Fetching Jira field list");
            let fields = self.client.list_fields().await?.ok_or_else(|| Error::FieldFetch {
                reason: "could not fetch field list".to_string(),
            })?;
            debug!(count = fields.len(), "Fetched Jira field list");
            state.ids = unique_names(&fields);
            state.fields = Some(fields);
        }
        let fields = state.fields.as_deref().unwrap_or_default();

        let matches: Vec<&FieldDescriptor> =
            fields.iter().filter(|f| normalize(&f.name) == query).collect();

        match matches.as_slice() {
            [] => Err(Error::UnknownField {
                name: name.to_string(),
                known: fields
                    .iter()
                    .map(|f| (f.name.clone(), f.id.clone()))
                    .collect(),
            }),
            [field] => {
                let id = field.id.clone();
                state.ids.insert(query, id.clone());
                Ok(id)
            }
            duplicates => Err(Error::AmbiguousField {
                name: name.to_string(),
                duplicates: duplicates.iter().map(|f| (*f).clone()).collect(),
            }),
        }
    }
}

impl std::fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldResolver").finish_non_exhaustive()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Index every field whose name no other field shares.
fn unique_names(fields: &[FieldDescriptor]) -> HashMap<String, String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for field in fields {
        *counts.entry(normalize(&field.name)).or_default() += 1;
    }
    fields
        .iter()
        .map(|f| (normalize(&f.name), f))
        .filter(|(name, _)| counts.get(name) == Some(&1))
        .map(|(name, f)| (name, f.id.clone()))
        .collect()
}
