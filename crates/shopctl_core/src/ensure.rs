use anyhow::{Context, Result};
use serde::Serialize;

use crate::client::{CatalogWriteApi, DesiredCollection};
use crate::session::SessionCookie;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnsureAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub id: String,
    pub action: EnsureAction,
}

/// Guarantee that exactly one remote collection with `desired.slug` exists
/// and that its translations match the desired state.
///
/// Lookup is by exact slug match limited to one result. A hit becomes an
/// update carrying the full translation set (replace, not merge); a miss
/// becomes a create with the parent reference. A failed create is followed
/// by one fallback lookup so a concurrent invocation that won the create
/// race turns this call into an update instead of a duplicate or an error.
/// Running the operation twice with the same desired state returns the same
/// identifier both times.
pub fn ensure_collection<A: CatalogWriteApi>(
    api: &mut A,
    session: &SessionCookie,
    desired: &DesiredCollection,
) -> Result<EnsureOutcome> {
    // A failed lookup is treated as absent: create still gets its chance and
    // the fallback lookup below covers whatever the first one missed.
    let existing = api
        .find_collection_by_slug(session, &desired.slug)
        .ok()
        .flatten();
    if let Some(existing) = existing {
        let updated = api
            .update_collection(session, &existing.id, &desired.translations)
            .with_context(|| format!("failed to update collection '{}'", desired.slug))?;
        return Ok(EnsureOutcome {
            id: updated.id,
            action: EnsureAction::Updated,
        });
    }

    match api.create_collection(session, desired) {
        Ok(created) => Ok(EnsureOutcome {
            id: created.id,
            action: EnsureAction::Created,
        }),
        Err(create_error) => {
            match api.find_collection_by_slug(session, &desired.slug) {
                Ok(Some(existing)) => {
                    let updated = api
                        .update_collection(session, &existing.id, &desired.translations)
                        .with_context(|| {
                            format!(
                                "collection '{}' appeared after a failed create but could not be updated",
                                desired.slug
                            )
                        })?;
                    Ok(EnsureOutcome {
                        id: updated.id,
                        action: EnsureAction::Updated,
                    })
                }
                _ => Err(create_error)
                    .with_context(|| format!("failed to create collection '{}'", desired.slug)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::client::CatalogReadApi;
    use crate::testing::{MockApi, desired, mock_session, translation};

    use super::{EnsureAction, ensure_collection};

    #[test]
    fn creates_when_absent_then_updates_on_rerun() {
        let mut api = MockApi::default();
        let session = mock_session();
        let node = desired(
            "pilote",
            None,
            vec![translation("pt", "Piloto"), translation("en", "Driver")],
        );

        let first = ensure_collection(&mut api, &session, &node).expect("first run");
        assert_eq!(first.action, EnsureAction::Created);
        assert_eq!(api.create_calls, 1);

        let second = ensure_collection(&mut api, &session, &node).expect("second run");
        assert_eq!(second.action, EnsureAction::Updated);
        assert_eq!(second.id, first.id);
        // Still exactly one create, and exactly one remote node for the slug.
        assert_eq!(api.create_calls, 1);
        assert_eq!(api.collections_with_slug("pilote"), 1);
    }

    #[test]
    fn update_carries_full_translation_set() {
        let mut api = MockApi::default();
        let session = mock_session();
        let node = desired(
            "pilote",
            None,
            vec![translation("pt", "Piloto"), translation("en", "Driver")],
        );
        ensure_collection(&mut api, &session, &node).expect("seed");
        ensure_collection(&mut api, &session, &node).expect("rerun");

        let stored = api.translations_for("pilote");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].language_code, "pt");
        assert_eq!(stored[0].name, "Piloto");
        assert_eq!(stored[1].language_code, "en");
        assert_eq!(stored[1].name, "Driver");
    }

    #[test]
    fn failed_create_falls_back_to_lookup_when_raced() {
        let mut api = MockApi::default();
        // Create fails, but the node materializes anyway: another invocation
        // won the race between our lookup and our create.
        api.create_failures
            .insert("pilote".to_string(), "slug already in use".to_string());
        api.concurrent_creation.insert("pilote".to_string());
        let session = mock_session();
        let node = desired("pilote", None, vec![translation("pt", "Piloto")]);

        let outcome = ensure_collection(&mut api, &session, &node).expect("ensure");
        assert_eq!(outcome.action, EnsureAction::Updated);
        assert_eq!(api.collections_with_slug("pilote"), 1);
    }

    #[test]
    fn failed_create_without_existing_node_surfaces_the_create_error() {
        let mut api = MockApi::default();
        api.create_failures
            .insert("pilote".to_string(), "translations are required".to_string());
        let session = mock_session();
        let node = desired("pilote", None, vec![translation("pt", "Piloto")]);

        let error = ensure_collection(&mut api, &session, &node).expect_err("must fail");
        let chain = format!("{error:#}");
        assert!(chain.contains("failed to create collection 'pilote'"));
        assert!(chain.contains("translations are required"));
    }

    #[test]
    fn failed_update_on_existing_node_is_fatal_for_that_node() {
        let mut api = MockApi::default();
        let session = mock_session();
        let node = desired("pilote", None, vec![translation("pt", "Piloto")]);
        ensure_collection(&mut api, &session, &node).expect("seed");

        api.update_failures.insert("pilote".to_string());
        let error = ensure_collection(&mut api, &session, &node).expect_err("must fail");
        assert!(format!("{error:#}").contains("failed to update collection 'pilote'"));
    }

    #[test]
    fn created_id_parents_subsequent_children() {
        let mut api = MockApi::default();
        let session = mock_session();
        let root = desired("pilote", None, vec![translation("pt", "Piloto")]);
        let root_outcome = ensure_collection(&mut api, &session, &root).expect("root");

        let child = desired(
            "capacetes",
            Some(root_outcome.id.clone()),
            vec![translation("pt", "Capacetes")],
        );
        ensure_collection(&mut api, &session, &child).expect("child");

        let stored = api
            .find_collection_by_slug(&session, "capacetes")
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.parent_id.as_deref(), Some(root_outcome.id.as_str()));
    }
}
