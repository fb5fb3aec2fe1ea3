use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::client::CatalogWriteApi;
use crate::pagination::fetch_all;
use crate::session::SessionCookie;

/// List-query page sizes, kept safely below the platform's enforced caps
/// (1000 for facet values, lower for products).
pub const FACET_VALUES_PAGE_SIZE: usize = 500;
pub const PRODUCTS_PAGE_SIZE: usize = 100;

/// Hand-maintained remap from source-tag codes to derived-tag codes.
/// Lives in a TOML file so the business rule stays editable data.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FacetRemap {
    pub source_facet: String,
    pub derived_facet: String,
    #[serde(default)]
    pub map: BTreeMap<String, String>,
}

impl FacetRemap {
    pub fn validate(&self) -> Result<()> {
        if self.source_facet.trim().is_empty() {
            bail!("facet remap needs a source_facet code");
        }
        if self.derived_facet.trim().is_empty() {
            bail!("facet remap needs a derived_facet code");
        }
        if self.map.is_empty() {
            bail!("facet remap table is empty");
        }
        Ok(())
    }
}

pub fn load_facet_remap(path: &Path) -> Result<FacetRemap> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let remap: FacetRemap =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    remap.validate()?;
    Ok(remap)
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetAssignReport {
    pub success: bool,
    pub products_seen: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub request_count: usize,
}

/// Tag every product with the derived facet values implied by its source
/// facet values. Products already carrying everything the table implies are
/// left untouched, which makes the whole run safely repeatable; unmapped
/// source codes produce a warning, never an error.
pub fn assign_derived_facets<A: CatalogWriteApi>(
    api: &mut A,
    session: &SessionCookie,
    remap: &FacetRemap,
) -> Result<FacetAssignReport> {
    remap.validate()?;

    let facet_values = fetch_all(FACET_VALUES_PAGE_SIZE, |skip, take| {
        api.facet_values_page(session, skip, take)
    })
    .context("failed to load facet values")?;
    let derived_by_code: BTreeMap<&str, &str> = facet_values
        .iter()
        .filter(|value| value.facet_code == remap.derived_facet)
        .map(|value| (value.code.as_str(), value.id.as_str()))
        .collect();

    let products = fetch_all(PRODUCTS_PAGE_SIZE, |skip, take| {
        api.products_page(session, skip, take)
    })
    .context("failed to load products")?;

    let mut report = FacetAssignReport {
        success: true,
        products_seen: 0,
        updated: 0,
        unchanged: 0,
        warnings: Vec::new(),
        errors: Vec::new(),
        request_count: 0,
    };
    let mut warned = BTreeSet::new();

    for product in &products {
        report.products_seen += 1;

        let existing: Vec<String> = product
            .facet_values
            .iter()
            .map(|value| value.id.clone())
            .collect();
        let mut to_add: Vec<String> = Vec::new();

        for value in &product.facet_values {
            if value.facet_code != remap.source_facet {
                continue;
            }
            let Some(derived_code) = remap.map.get(&value.code) else {
                warn_once(
                    &mut report,
                    &mut warned,
                    format!("no derived mapping for source tag '{}'", value.code),
                );
                continue;
            };
            let Some(derived_id) = derived_by_code.get(derived_code.as_str()) else {
                warn_once(
                    &mut report,
                    &mut warned,
                    format!(
                        "derived tag '{derived_code}' does not exist under facet '{}'",
                        remap.derived_facet
                    ),
                );
                continue;
            };
            if existing.iter().any(|id| id == derived_id)
                || to_add.iter().any(|id| id == derived_id)
            {
                continue;
            }
            to_add.push((*derived_id).to_string());
        }

        // Only mutate when the union strictly grows the tag set; a no-op
        // write would defeat re-runnability and hammer the job queue.
        if to_add.is_empty() {
            report.unchanged += 1;
            continue;
        }
        let mut union = existing;
        union.extend(to_add);
        match api.update_product_facet_values(session, &product.id, &union) {
            Ok(()) => report.updated += 1,
            Err(error) => report
                .errors
                .push(format!("{}: {error:#}", product.slug)),
        }
    }

    report.request_count = api.request_count();
    report.success = report.errors.is_empty();
    Ok(report)
}

fn warn_once(report: &mut FacetAssignReport, warned: &mut BTreeSet<String>, message: String) {
    if warned.insert(message.clone()) {
        report.warnings.push(message);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use tempfile::tempdir;

    use crate::testing::{MockApi, mock_session};

    use super::{FacetRemap, assign_derived_facets, load_facet_remap};

    fn remap() -> FacetRemap {
        let mut map = BTreeMap::new();
        map.insert("pitline".to_string(), "equip_mecanico".to_string());
        map.insert("gants-fia".to_string(), "piloto".to_string());
        FacetRemap {
            source_facet: "sub_category".to_string(),
            derived_facet: "categoria-principal".to_string(),
            map,
        }
    }

    fn seeded_api() -> MockApi {
        let mut api = MockApi::default();
        // Source facet values.
        api.insert_facet_value("10", "pitline", "sub_category");
        api.insert_facet_value("11", "gants-fia", "sub_category");
        api.insert_facet_value("12", "lifestyle", "sub_category");
        // Derived facet values.
        api.insert_facet_value("20", "equip_mecanico", "categoria-principal");
        api.insert_facet_value("21", "piloto", "categoria-principal");
        api
    }

    #[test]
    fn assigns_derived_tags_as_a_union() {
        let mut api = seeded_api();
        api.insert_product("p1", "brake-bleeder", &["10"]);
        let session = mock_session();

        let report = assign_derived_facets(&mut api, &session, &remap()).expect("assign");
        assert!(report.success);
        assert_eq!(report.updated, 1);
        assert_eq!(report.unchanged, 0);
        assert_eq!(api.product_facet_ids("p1"), vec!["10", "20"]);
    }

    #[test]
    fn rerun_is_a_no_op() {
        let mut api = seeded_api();
        api.insert_product("p1", "brake-bleeder", &["10"]);
        api.insert_product("p2", "race-gloves", &["11"]);
        let session = mock_session();

        assign_derived_facets(&mut api, &session, &remap()).expect("first run");
        let mutations_after_first = api.product_update_calls.len();
        assert_eq!(mutations_after_first, 2);

        let report = assign_derived_facets(&mut api, &session, &remap()).expect("second run");
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 2);
        assert_eq!(api.product_update_calls.len(), mutations_after_first);
    }

    #[test]
    fn unmapped_source_tag_warns_and_leaves_product_alone() {
        let mut api = seeded_api();
        api.insert_product("p1", "team-cap", &["12"]); // lifestyle is not mapped
        let session = mock_session();

        let report = assign_derived_facets(&mut api, &session, &remap()).expect("assign");
        assert!(report.success);
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("lifestyle"));
        assert_eq!(api.product_facet_ids("p1"), vec!["12"]);
    }

    #[test]
    fn missing_derived_value_warns_once_across_products() {
        let mut api = MockApi::default();
        api.insert_facet_value("10", "pitline", "sub_category");
        // The derived facet has no values at all.
        api.insert_product("p1", "one", &["10"]);
        api.insert_product("p2", "two", &["10"]);
        let session = mock_session();

        let report = assign_derived_facets(&mut api, &session, &remap()).expect("assign");
        assert_eq!(report.updated, 0);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("equip_mecanico"));
    }

    #[test]
    fn one_product_failure_does_not_stop_the_batch() {
        let mut api = seeded_api();
        api.insert_product("p1", "brake-bleeder", &["10"]);
        api.insert_product("p2", "race-gloves", &["11"]);
        api.product_update_failures.insert("p1".to_string());
        let session = mock_session();

        let report = assign_derived_facets(&mut api, &session, &remap()).expect("assign");
        assert!(!report.success);
        assert_eq!(report.updated, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("brake-bleeder"));
        assert_eq!(api.product_facet_ids("p2"), vec!["11", "21"]);
    }

    #[test]
    fn products_without_source_tags_are_unchanged() {
        let mut api = seeded_api();
        api.insert_product("p1", "plain", &["20"]); // already only a derived tag
        let session = mock_session();

        let report = assign_derived_facets(&mut api, &session, &remap()).expect("assign");
        assert_eq!(report.unchanged, 1);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn load_facet_remap_parses_toml() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("facet_map.toml");
        fs::write(
            &path,
            r#"
source_facet = "sub_category"
derived_facet = "categoria-principal"

[map]
pitline = "equip_mecanico"
"gants-fia" = "piloto"
"#,
        )
        .expect("write remap");

        let remap = load_facet_remap(&path).expect("load");
        assert_eq!(remap.map.len(), 2);
        assert_eq!(remap.map.get("pitline").map(String::as_str), Some("equip_mecanico"));
    }

    #[test]
    fn empty_map_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("facet_map.toml");
        fs::write(
            &path,
            "source_facet = \"sub_category\"\nderived_facet = \"categoria-principal\"\n",
        )
        .expect("write remap");

        let error = load_facet_remap(&path).expect_err("must fail");
        assert!(error.to_string().contains("empty"));
    }
}
