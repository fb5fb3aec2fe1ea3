//! Shared test doubles: an in-memory admin API standing in for the network.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};

use crate::client::{
    CatalogReadApi, CatalogWriteApi, CollectionRef, CurrentUser, DeletionOutcome,
    DesiredCollection, FacetValueRef, JobStatus, ProductFacets, ProductRef, Translation,
};
use crate::pagination::Page;
use crate::session::SessionCookie;

#[derive(Debug, Clone)]
pub struct MockCollection {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<String>,
    pub translations: Vec<Translation>,
}

#[derive(Debug, Clone)]
pub struct MockProduct {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub facet_value_ids: Vec<String>,
}

#[derive(Default)]
pub struct MockApi {
    pub collections: BTreeMap<String, MockCollection>,
    pub products: Vec<MockProduct>,
    pub facet_values: Vec<FacetValueRef>,
    pub job_polls: Vec<JobStatus>,
    job_poll_cursor: usize,

    // Failure knobs, keyed by slug or id.
    pub create_failures: BTreeMap<String, String>,
    pub concurrent_creation: BTreeSet<String>,
    pub update_failures: BTreeSet<String>,
    pub product_update_failures: BTreeSet<String>,
    pub delete_product_outcomes: BTreeMap<String, DeletionOutcome>,

    // Call accounting.
    pub create_calls: usize,
    pub update_calls: usize,
    pub product_update_calls: Vec<(String, Vec<String>)>,
    pub deleted_products: Vec<String>,
    pub deleted_collections: Vec<String>,
    pub logins: usize,
    next_id: usize,
    request_count: usize,
}

impl MockApi {
    pub fn insert_collection(&mut self, desired: &DesiredCollection) -> String {
        self.next_id += 1;
        let id = self.next_id.to_string();
        self.collections.insert(
            desired.slug.clone(),
            MockCollection {
                id: id.clone(),
                name: desired
                    .translations
                    .first()
                    .map(|translation| translation.name.clone())
                    .unwrap_or_default(),
                slug: desired.slug.clone(),
                parent_id: desired.parent_id.clone(),
                translations: desired.translations.to_vec(),
            },
        );
        id
    }

    pub fn insert_product(&mut self, id: &str, slug: &str, facet_value_ids: &[&str]) {
        self.products.push(MockProduct {
            id: id.to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
            facet_value_ids: facet_value_ids.iter().map(ToString::to_string).collect(),
        });
    }

    pub fn insert_facet_value(&mut self, id: &str, code: &str, facet_code: &str) {
        self.facet_values.push(FacetValueRef {
            id: id.to_string(),
            code: code.to_string(),
            facet_code: facet_code.to_string(),
        });
    }

    pub fn collections_with_slug(&self, slug: &str) -> usize {
        self.collections
            .values()
            .filter(|collection| collection.slug == slug)
            .count()
    }

    pub fn translations_for(&self, slug: &str) -> Vec<Translation> {
        self.collections
            .get(slug)
            .map(|collection| collection.translations.clone())
            .unwrap_or_default()
    }

    pub fn product_facet_ids(&self, product_id: &str) -> Vec<String> {
        self.products
            .iter()
            .find(|product| product.id == product_id)
            .map(|product| product.facet_value_ids.clone())
            .unwrap_or_default()
    }

    fn resolve_facet_values(&self, ids: &[String]) -> Vec<FacetValueRef> {
        ids.iter()
            .filter_map(|id| {
                self.facet_values
                    .iter()
                    .find(|value| &value.id == id)
                    .cloned()
            })
            .collect()
    }
}

impl CatalogReadApi for MockApi {
    fn find_collection_by_slug(
        &mut self,
        _session: &SessionCookie,
        slug: &str,
    ) -> Result<Option<CollectionRef>> {
        self.request_count += 1;
        Ok(self.collections.get(slug).map(|collection| CollectionRef {
            id: collection.id.clone(),
            name: collection.name.clone(),
            slug: collection.slug.clone(),
            parent_id: collection.parent_id.clone(),
        }))
    }

    fn find_product_by_slug(
        &mut self,
        _session: &SessionCookie,
        slug: &str,
    ) -> Result<Option<ProductRef>> {
        self.request_count += 1;
        Ok(self
            .products
            .iter()
            .find(|product| product.slug == slug)
            .map(|product| ProductRef {
                id: product.id.clone(),
                name: product.name.clone(),
                slug: product.slug.clone(),
            }))
    }

    fn products_page(
        &mut self,
        _session: &SessionCookie,
        skip: usize,
        take: usize,
    ) -> Result<Page<ProductFacets>> {
        self.request_count += 1;
        let total = self.products.len();
        let end = total.min(skip.saturating_add(take));
        let window = if skip >= total {
            Vec::new()
        } else {
            self.products[skip..end].to_vec()
        };
        Ok(Page {
            items: window
                .into_iter()
                .map(|product| ProductFacets {
                    id: product.id.clone(),
                    name: product.name.clone(),
                    slug: product.slug.clone(),
                    facet_values: self.resolve_facet_values(&product.facet_value_ids),
                })
                .collect(),
            total_items: total,
        })
    }

    fn facet_values_page(
        &mut self,
        _session: &SessionCookie,
        skip: usize,
        take: usize,
    ) -> Result<Page<FacetValueRef>> {
        self.request_count += 1;
        let total = self.facet_values.len();
        let end = total.min(skip.saturating_add(take));
        let items = if skip >= total {
            Vec::new()
        } else {
            self.facet_values[skip..end].to_vec()
        };
        Ok(Page {
            items,
            total_items: total,
        })
    }

    fn job(&mut self, _session: &SessionCookie, _job_id: &str) -> Result<Option<JobStatus>> {
        self.request_count += 1;
        if self.job_polls.is_empty() {
            return Ok(None);
        }
        let index = self.job_poll_cursor.min(self.job_polls.len() - 1);
        self.job_poll_cursor += 1;
        Ok(Some(self.job_polls[index].clone()))
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

impl CatalogWriteApi for MockApi {
    fn login(&mut self, _username: &str, _password: &str) -> Result<(CurrentUser, SessionCookie)> {
        self.request_count += 1;
        self.logins += 1;
        Ok((
            CurrentUser {
                id: "1".to_string(),
                identifier: "ops@example.org".to_string(),
            },
            mock_session(),
        ))
    }

    fn create_collection(
        &mut self,
        _session: &SessionCookie,
        desired: &DesiredCollection,
    ) -> Result<CollectionRef> {
        self.request_count += 1;
        self.create_calls += 1;
        if let Some(message) = self.create_failures.get(&desired.slug).cloned() {
            if self.concurrent_creation.contains(&desired.slug) {
                self.insert_collection(desired);
            }
            bail!("{message}");
        }
        if self.collections.contains_key(&desired.slug) {
            bail!("create collection rejected: slug '{}' already in use", desired.slug);
        }
        let id = self.insert_collection(desired);
        Ok(CollectionRef {
            id,
            name: desired
                .translations
                .first()
                .map(|translation| translation.name.clone())
                .unwrap_or_default(),
            slug: desired.slug.clone(),
            parent_id: desired.parent_id.clone(),
        })
    }

    fn update_collection(
        &mut self,
        _session: &SessionCookie,
        id: &str,
        translations: &[Translation],
    ) -> Result<CollectionRef> {
        self.request_count += 1;
        self.update_calls += 1;
        let slug = self
            .collections
            .values()
            .find(|collection| collection.id == id)
            .map(|collection| collection.slug.clone())
            .ok_or_else(|| anyhow::anyhow!("collection {id} not found"))?;
        if self.update_failures.contains(&slug) {
            bail!("update collection rejected for '{slug}'");
        }
        let collection = self
            .collections
            .get_mut(&slug)
            .expect("slug resolved above");
        collection.translations = translations.to_vec();
        if let Some(first) = translations.first() {
            collection.name = first.name.clone();
        }
        Ok(CollectionRef {
            id: collection.id.clone(),
            name: collection.name.clone(),
            slug: collection.slug.clone(),
            parent_id: collection.parent_id.clone(),
        })
    }

    fn delete_collection(
        &mut self,
        _session: &SessionCookie,
        id: &str,
    ) -> Result<DeletionOutcome> {
        self.request_count += 1;
        let slug = self
            .collections
            .values()
            .find(|collection| collection.id == id)
            .map(|collection| collection.slug.clone());
        match slug {
            Some(slug) => {
                self.collections.remove(&slug);
                self.deleted_collections.push(slug);
                Ok(DeletionOutcome {
                    result: "DELETED".to_string(),
                    message: None,
                })
            }
            None => Ok(DeletionOutcome {
                result: "NOT_DELETED".to_string(),
                message: Some(format!("collection {id} not found")),
            }),
        }
    }

    fn delete_product(&mut self, _session: &SessionCookie, id: &str) -> Result<DeletionOutcome> {
        self.request_count += 1;
        if let Some(outcome) = self.delete_product_outcomes.get(id) {
            return Ok(outcome.clone());
        }
        let before = self.products.len();
        self.products.retain(|product| product.id != id);
        if self.products.len() == before {
            return Ok(DeletionOutcome {
                result: "NOT_DELETED".to_string(),
                message: Some(format!("product {id} not found")),
            });
        }
        self.deleted_products.push(id.to_string());
        Ok(DeletionOutcome {
            result: "DELETED".to_string(),
            message: None,
        })
    }

    fn update_product_facet_values(
        &mut self,
        _session: &SessionCookie,
        product_id: &str,
        facet_value_ids: &[String],
    ) -> Result<()> {
        self.request_count += 1;
        if self.product_update_failures.contains(product_id) {
            bail!("update product rejected for {product_id}");
        }
        let product = self
            .products
            .iter_mut()
            .find(|product| product.id == product_id)
            .ok_or_else(|| anyhow::anyhow!("product {product_id} not found"))?;
        product.facet_value_ids = facet_value_ids.to_vec();
        self.product_update_calls
            .push((product_id.to_string(), facet_value_ids.to_vec()));
        Ok(())
    }

    fn trigger_reindex(&mut self, _session: &SessionCookie) -> Result<String> {
        self.request_count += 1;
        Ok("job-1".to_string())
    }
}

pub fn mock_session() -> SessionCookie {
    SessionCookie::from_header("session=mock").expect("mock session")
}

pub fn translation(language: &str, name: &str) -> Translation {
    Translation {
        language_code: language.to_string(),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        description: name.to_string(),
    }
}

pub fn desired(
    slug: &str,
    parent_id: Option<String>,
    translations: Vec<Translation>,
) -> DesiredCollection {
    DesiredCollection {
        slug: slug.to_string(),
        parent_id,
        translations,
        private: false,
        inherit_filters: false,
    }
}
