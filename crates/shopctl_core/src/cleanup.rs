use anyhow::Result;
use serde::Serialize;

use crate::client::CatalogWriteApi;
use crate::session::SessionCookie;

/// Page size for the purge loop; matches the platform's product list default.
pub const PURGE_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStatus {
    Deleted,
    AlreadyAbsent,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupItem {
    pub slug: String,
    pub status: CleanupStatus,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub success: bool,
    pub deleted: usize,
    pub already_absent: usize,
    pub failed: usize,
    pub items: Vec<CleanupItem>,
    pub request_count: usize,
}

/// Remove the collections named by an enumerated slug list. A slug that no
/// longer resolves is reported, not failed: the point of these cleanups is
/// converging on "gone", and rerunning one must stay harmless.
pub fn delete_collections_by_slug<A: CatalogWriteApi>(
    api: &mut A,
    session: &SessionCookie,
    slugs: &[String],
) -> Result<CleanupReport> {
    let mut report = empty_report();
    for slug in slugs {
        let found = match api.find_collection_by_slug(session, slug) {
            Ok(found) => found,
            Err(error) => {
                record_failure(&mut report, slug, &format!("lookup failed: {error:#}"));
                continue;
            }
        };
        let Some(collection) = found else {
            report.already_absent += 1;
            report.items.push(CleanupItem {
                slug: slug.clone(),
                status: CleanupStatus::AlreadyAbsent,
                detail: None,
            });
            continue;
        };
        match api.delete_collection(session, &collection.id) {
            Ok(outcome) if outcome.is_deleted() => {
                report.deleted += 1;
                report.items.push(CleanupItem {
                    slug: slug.clone(),
                    status: CleanupStatus::Deleted,
                    detail: None,
                });
            }
            Ok(outcome) => record_failure(
                &mut report,
                slug,
                &format!(
                    "{}: {}",
                    outcome.result,
                    outcome.message.as_deref().unwrap_or("no message")
                ),
            ),
            Err(error) => record_failure(&mut report, slug, &format!("{error:#}")),
        }
    }
    report.request_count = api.request_count();
    report.success = report.failed == 0;
    Ok(report)
}

/// Same contract as `delete_collections_by_slug`, for products.
pub fn delete_products_by_slug<A: CatalogWriteApi>(
    api: &mut A,
    session: &SessionCookie,
    slugs: &[String],
) -> Result<CleanupReport> {
    let mut report = empty_report();
    for slug in slugs {
        let found = match api.find_product_by_slug(session, slug) {
            Ok(found) => found,
            Err(error) => {
                record_failure(&mut report, slug, &format!("lookup failed: {error:#}"));
                continue;
            }
        };
        let Some(product) = found else {
            report.already_absent += 1;
            report.items.push(CleanupItem {
                slug: slug.clone(),
                status: CleanupStatus::AlreadyAbsent,
                detail: None,
            });
            continue;
        };
        match api.delete_product(session, &product.id) {
            Ok(outcome) if outcome.is_deleted() => {
                report.deleted += 1;
                report.items.push(CleanupItem {
                    slug: slug.clone(),
                    status: CleanupStatus::Deleted,
                    detail: None,
                });
            }
            Ok(outcome) => record_failure(
                &mut report,
                slug,
                &format!(
                    "{}: {}",
                    outcome.result,
                    outcome.message.as_deref().unwrap_or("no message")
                ),
            ),
            Err(error) => record_failure(&mut report, slug, &format!("{error:#}")),
        }
    }
    report.request_count = api.request_count();
    report.success = report.failed == 0;
    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub success: bool,
    pub deleted: usize,
    pub failed: usize,
    pub pages: usize,
    pub errors: Vec<String>,
    pub request_count: usize,
}

/// Delete every product: keep fetching the first page and deleting its items
/// until the catalog reports empty. Per-item failures are logged and the item
/// is left behind; a page where nothing could be deleted ends the loop so a
/// wall of failures cannot spin forever.
pub fn purge_all_products<A: CatalogWriteApi>(
    api: &mut A,
    session: &SessionCookie,
    page_size: usize,
) -> Result<PurgeReport> {
    let mut report = PurgeReport {
        success: true,
        deleted: 0,
        failed: 0,
        pages: 0,
        errors: Vec::new(),
        request_count: 0,
    };

    loop {
        let page = api.products_page(session, 0, page_size)?;
        if page.items.is_empty() {
            break;
        }
        report.pages += 1;

        let mut deleted_this_page = 0;
        for product in &page.items {
            match api.delete_product(session, &product.id) {
                Ok(outcome) if outcome.is_deleted() => {
                    report.deleted += 1;
                    deleted_this_page += 1;
                }
                Ok(outcome) => {
                    report.failed += 1;
                    report.errors.push(format!(
                        "{}: {}: {}",
                        product.slug,
                        outcome.result,
                        outcome.message.as_deref().unwrap_or("no message")
                    ));
                }
                Err(error) => {
                    report.failed += 1;
                    report.errors.push(format!("{}: {error:#}", product.slug));
                }
            }
        }

        if deleted_this_page == 0 {
            report
                .errors
                .push("no product on the current page could be deleted; stopping".to_string());
            break;
        }
    }

    report.request_count = api.request_count();
    report.success = report.failed == 0;
    Ok(report)
}

fn empty_report() -> CleanupReport {
    CleanupReport {
        success: true,
        deleted: 0,
        already_absent: 0,
        failed: 0,
        items: Vec::new(),
        request_count: 0,
    }
}

fn record_failure(report: &mut CleanupReport, slug: &str, detail: &str) {
    report.failed += 1;
    report.items.push(CleanupItem {
        slug: slug.to_string(),
        status: CleanupStatus::Failed,
        detail: Some(detail.to_string()),
    });
}

#[cfg(test)]
mod tests {
    use crate::client::DeletionOutcome;
    use crate::testing::{MockApi, desired, mock_session, translation};

    use super::{
        CleanupStatus, delete_collections_by_slug, delete_products_by_slug, purge_all_products,
    };

    fn slugs(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn deletes_listed_collections_and_tolerates_absent_ones() {
        let mut api = MockApi::default();
        api.insert_collection(&desired("electronics", None, vec![translation("en", "Electronics")]));
        let session = mock_session();

        let report = delete_collections_by_slug(
            &mut api,
            &session,
            &slugs(&["electronics", "home-garden"]),
        )
        .expect("cleanup");

        assert!(report.success);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.already_absent, 1);
        assert_eq!(api.deleted_collections, vec!["electronics"]);
        assert!(
            report
                .items
                .iter()
                .any(|item| item.slug == "home-garden"
                    && item.status == CleanupStatus::AlreadyAbsent)
        );
    }

    #[test]
    fn rerun_after_deletion_reports_already_absent() {
        let mut api = MockApi::default();
        api.insert_collection(&desired("electronics", None, vec![translation("en", "Electronics")]));
        let session = mock_session();
        let list = slugs(&["electronics"]);

        delete_collections_by_slug(&mut api, &session, &list).expect("first run");
        let report = delete_collections_by_slug(&mut api, &session, &list).expect("second run");
        assert_eq!(report.deleted, 0);
        assert_eq!(report.already_absent, 1);
    }

    #[test]
    fn delete_products_by_slug_records_not_deleted_results() {
        let mut api = MockApi::default();
        api.insert_product("p1", "ia0-1879-a01", &[]);
        api.insert_product("p2", "ia0-1876-a01", &[]);
        api.delete_product_outcomes.insert(
            "p2".to_string(),
            DeletionOutcome {
                result: "NOT_DELETED".to_string(),
                message: Some("product is referenced by an order".to_string()),
            },
        );
        let session = mock_session();

        let report = delete_products_by_slug(
            &mut api,
            &session,
            &slugs(&["ia0-1879-a01", "ia0-1876-a01"]),
        )
        .expect("cleanup");

        assert!(!report.success);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 1);
        assert!(
            report
                .items
                .iter()
                .any(|item| item.slug == "ia0-1876-a01"
                    && item.status == CleanupStatus::Failed
                    && item
                        .detail
                        .as_deref()
                        .is_some_and(|detail| detail.contains("referenced by an order")))
        );
    }

    #[test]
    fn purge_empties_the_catalog_across_pages() {
        let mut api = MockApi::default();
        for index in 0..7 {
            let id = format!("p{index}");
            let slug = format!("product-{index}");
            api.insert_product(&id, &slug, &[]);
        }
        let session = mock_session();

        let report = purge_all_products(&mut api, &session, 3).expect("purge");
        assert!(report.success);
        assert_eq!(report.deleted, 7);
        assert!(report.pages >= 3);
        assert_eq!(api.products.len(), 0);
    }

    #[test]
    fn purge_stops_when_no_page_progress_is_possible() {
        let mut api = MockApi::default();
        api.insert_product("p1", "stuck", &[]);
        api.delete_product_outcomes.insert(
            "p1".to_string(),
            DeletionOutcome {
                result: "NOT_DELETED".to_string(),
                message: Some("product is referenced by an order".to_string()),
            },
        );
        let session = mock_session();

        let report = purge_all_products(&mut api, &session, 50).expect("purge");
        assert!(!report.success);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.failed, 1);
        assert!(report.errors.iter().any(|error| error.contains("stopping")));
        assert_eq!(api.products.len(), 1);
    }

    #[test]
    fn purge_on_empty_catalog_is_a_no_op() {
        let mut api = MockApi::default();
        let session = mock_session();
        let report = purge_all_products(&mut api, &session, 50).expect("purge");
        assert!(report.success);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.pages, 0);
    }
}
