use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::client::{CatalogWriteApi, DesiredCollection, Translation};
use crate::ensure::{EnsureAction, ensure_collection};
use crate::session::SessionCookie;

/// A category tree as edited by operators: data, not code. Loaded from a
/// TOML file so remaps and renames never require touching the sync logic.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogTree {
    #[serde(default)]
    pub nodes: Vec<CatalogNode>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogNode {
    pub slug: String,
    #[serde(default)]
    pub translations: Vec<NodeTranslation>,
    #[serde(default)]
    pub children: Vec<CatalogNode>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NodeTranslation {
    pub language: String,
    pub name: String,
    pub description: Option<String>,
}

impl CatalogTree {
    /// Sibling slugs are the idempotency keys; duplicates would make two
    /// nodes race for one remote collection.
    pub fn validate(&self) -> Result<()> {
        validate_siblings(&self.nodes, "root")
    }
}

fn validate_siblings(nodes: &[CatalogNode], parent: &str) -> Result<()> {
    let mut seen = BTreeSet::new();
    for node in nodes {
        if node.slug.trim().is_empty() {
            bail!("catalog tree node under '{parent}' has an empty slug");
        }
        if node.translations.is_empty() {
            bail!("catalog tree node '{}' has no translations", node.slug);
        }
        if !seen.insert(node.slug.clone()) {
            bail!("duplicate sibling slug '{}' under '{parent}'", node.slug);
        }
        validate_siblings(&node.children, &node.slug)?;
    }
    Ok(())
}

pub fn load_catalog_tree(path: &Path) -> Result<CatalogTree> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let tree: CatalogTree =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    tree.validate()?;
    Ok(tree)
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSyncResult {
    pub slug: String,
    pub action: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSyncReport {
    pub success: bool,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub nodes: Vec<NodeSyncResult>,
    pub request_count: usize,
}

/// Ensure every node of the tree exists remotely with the desired
/// translations, parenting children on the identifiers the roots return.
/// One node's failure never aborts the batch; its children are skipped
/// because they have nothing to be parented on.
pub fn sync_catalog_tree<A: CatalogWriteApi>(
    api: &mut A,
    session: &SessionCookie,
    tree: &CatalogTree,
) -> Result<CatalogSyncReport> {
    tree.validate()?;

    let mut report = CatalogSyncReport {
        success: true,
        created: 0,
        updated: 0,
        failed: 0,
        skipped: 0,
        nodes: Vec::new(),
        request_count: 0,
    };
    sync_level(api, session, &tree.nodes, None, &mut report);
    report.request_count = api.request_count();
    report.success = report.failed == 0;
    Ok(report)
}

fn sync_level<A: CatalogWriteApi>(
    api: &mut A,
    session: &SessionCookie,
    nodes: &[CatalogNode],
    parent_id: Option<&str>,
    report: &mut CatalogSyncReport,
) {
    for node in nodes {
        let desired = desired_from_node(node, parent_id);
        match ensure_collection(api, session, &desired) {
            Ok(outcome) => {
                match outcome.action {
                    EnsureAction::Created => {
                        report.created += 1;
                        report.nodes.push(NodeSyncResult {
                            slug: node.slug.clone(),
                            action: "created".to_string(),
                            detail: None,
                        });
                    }
                    EnsureAction::Updated => {
                        report.updated += 1;
                        report.nodes.push(NodeSyncResult {
                            slug: node.slug.clone(),
                            action: "updated".to_string(),
                            detail: None,
                        });
                    }
                }
                sync_level(api, session, &node.children, Some(outcome.id.as_str()), report);
            }
            Err(error) => {
                report.failed += 1;
                report.nodes.push(NodeSyncResult {
                    slug: node.slug.clone(),
                    action: "error".to_string(),
                    detail: Some(format!("{error:#}")),
                });
                skip_subtree(&node.children, report);
            }
        }
    }
}

fn skip_subtree(nodes: &[CatalogNode], report: &mut CatalogSyncReport) {
    for node in nodes {
        report.skipped += 1;
        report.nodes.push(NodeSyncResult {
            slug: node.slug.clone(),
            action: "skipped".to_string(),
            detail: Some("parent failed".to_string()),
        });
        skip_subtree(&node.children, report);
    }
}

fn desired_from_node(node: &CatalogNode, parent_id: Option<&str>) -> DesiredCollection {
    DesiredCollection {
        slug: node.slug.clone(),
        parent_id: parent_id.map(ToString::to_string),
        translations: node
            .translations
            .iter()
            .map(|translation| Translation {
                language_code: translation.language.clone(),
                name: translation.name.clone(),
                slug: node.slug.clone(),
                description: translation
                    .description
                    .clone()
                    .unwrap_or_else(|| translation.name.clone()),
            })
            .collect(),
        private: false,
        inherit_filters: false,
    }
}
