use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::SET_COOKIE;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::ShopConfig;
use crate::pagination::Page;
use crate::session::SessionCookie;

const LOGIN_MUTATION: &str = "\
mutation Login($u: String!, $p: String!) {
  login(username: $u, password: $p, rememberMe: true) {
    __typename
    ... on CurrentUser { id identifier }
    ... on InvalidCredentialsError { errorCode message }
    ... on NativeAuthStrategyError { errorCode message }
  }
}";

const FIND_COLLECTION_QUERY: &str = "\
query FindCollection($slug: String!) {
  collections(options: { filter: { slug: { eq: $slug } }, take: 1 }) {
    totalItems
    items { id name slug parent { id } }
  }
}";

const CREATE_COLLECTION_MUTATION: &str = "\
mutation CreateCollection($input: CreateCollectionInput!) {
  createCollection(input: $input) {
    __typename
    ... on Collection { id name slug }
  }
}";

const UPDATE_COLLECTION_MUTATION: &str = "\
mutation UpdateCollection($input: UpdateCollectionInput!) {
  updateCollection(input: $input) {
    __typename
    ... on Collection { id name slug }
  }
}";

const DELETE_COLLECTION_MUTATION: &str = "\
mutation DeleteCollection($id: ID!) {
  deleteCollection(id: $id) { result message }
}";

const FIND_PRODUCT_QUERY: &str = "\
query FindProduct($slug: String!) {
  products(options: { filter: { slug: { eq: $slug } }, take: 1 }) {
    totalItems
    items { id name slug }
  }
}";

const PRODUCTS_PAGE_QUERY: &str = "\
query ProductsPage($skip: Int!, $take: Int!) {
  products(options: { skip: $skip, take: $take }) {
    totalItems
    items {
      id
      name
      slug
      facetValues { id code facet { code } }
    }
  }
}";

const FACET_VALUES_PAGE_QUERY: &str = "\
query FacetValuesPage($skip: Int!, $take: Int!) {
  facetValues(options: { skip: $skip, take: $take }) {
    totalItems
    items { id code name facet { code } }
  }
}";

const DELETE_PRODUCT_MUTATION: &str = "\
mutation DeleteProduct($id: ID!) {
  deleteProduct(id: $id) { result message }
}";

const UPDATE_PRODUCT_FACETS_MUTATION: &str = "\
mutation UpdateProduct($input: UpdateProductInput!) {
  updateProduct(input: $input) { id }
}";

const REINDEX_MUTATION: &str = "\
mutation Reindex {
  reindex { id }
}";

const JOB_QUERY: &str = "\
query Job($id: ID!) {
  job(jobId: $id) {
    id
    state
    progress
    queueName
    isSettled
    error
    result
  }
}";

/// A collection as the admin API reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionRef {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRef {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFacets {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub facet_values: Vec<FacetValueRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetValueRef {
    pub id: String,
    pub code: String,
    pub facet_code: String,
}

/// One per-locale display tuple. The slug is repeated per locale because the
/// remote schema requires it on every translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub language_code: String,
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// Desired state for one catalog node, keyed by its slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredCollection {
    pub slug: String,
    pub parent_id: Option<String>,
    pub translations: Vec<Translation>,
    pub private: bool,
    pub inherit_filters: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub identifier: String,
}

/// Discriminated result of the login mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success(CurrentUser),
    Failure { error_code: String, message: String },
}

/// Typed result of a delete mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    pub result: String,
    pub message: Option<String>,
}

impl DeletionOutcome {
    pub fn is_deleted(&self) -> bool {
        self.result == "DELETED"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub state: String,
    pub progress: Option<f64>,
    pub queue_name: Option<String>,
    pub is_settled: bool,
    pub error: Option<String>,
    pub result: Option<Value>,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        self.is_settled || self.state == "COMPLETED" || self.state == "FAILED"
    }
}

/// Read-only admin API surface used by the batch operations.
pub trait CatalogReadApi {
    fn find_collection_by_slug(
        &mut self,
        session: &SessionCookie,
        slug: &str,
    ) -> Result<Option<CollectionRef>>;
    fn find_product_by_slug(
        &mut self,
        session: &SessionCookie,
        slug: &str,
    ) -> Result<Option<ProductRef>>;
    fn products_page(
        &mut self,
        session: &SessionCookie,
        skip: usize,
        take: usize,
    ) -> Result<Page<ProductFacets>>;
    fn facet_values_page(
        &mut self,
        session: &SessionCookie,
        skip: usize,
        take: usize,
    ) -> Result<Page<FacetValueRef>>;
    fn job(&mut self, session: &SessionCookie, job_id: &str) -> Result<Option<JobStatus>>;
    fn request_count(&self) -> usize;
}

/// Mutating admin API surface. Every method takes the session explicitly so
/// runs against different environments can coexist in one process.
pub trait CatalogWriteApi: CatalogReadApi {
    fn login(&mut self, username: &str, password: &str) -> Result<(CurrentUser, SessionCookie)>;
    fn create_collection(
        &mut self,
        session: &SessionCookie,
        desired: &DesiredCollection,
    ) -> Result<CollectionRef>;
    fn update_collection(
        &mut self,
        session: &SessionCookie,
        id: &str,
        translations: &[Translation],
    ) -> Result<CollectionRef>;
    fn delete_collection(
        &mut self,
        session: &SessionCookie,
        id: &str,
    ) -> Result<DeletionOutcome>;
    fn delete_product(&mut self, session: &SessionCookie, id: &str) -> Result<DeletionOutcome>;
    fn update_product_facet_values(
        &mut self,
        session: &SessionCookie,
        product_id: &str,
        facet_value_ids: &[String],
    ) -> Result<()>;
    fn trigger_reindex(&mut self, session: &SessionCookie) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct AdminClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl AdminClientConfig {
    pub fn from_config(config: &ShopConfig) -> Result<Self> {
        Ok(Self {
            api_url: config.api_url()?,
            user_agent: config.user_agent(),
            timeout_ms: config.timeout_ms(),
        })
    }
}

pub struct AdminClient {
    client: Client,
    config: AdminClientConfig,
    request_count: usize,
}

impl AdminClient {
    pub fn new(config: AdminClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build admin API HTTP client")?;
        Ok(Self {
            client,
            config,
            request_count: 0,
        })
    }

    /// POST one GraphQL document and return `(data, set_cookie_headers)`.
    ///
    /// A non-JSON body is fatal with the raw body echoed for diagnosis; a
    /// GraphQL `errors` array is fatal for the call with the first message
    /// surfaced verbatim.
    fn post_graphql(
        &mut self,
        query: &str,
        variables: Value,
        session: Option<&SessionCookie>,
    ) -> Result<(Value, Vec<String>)> {
        self.request_count += 1;

        let mut request = self
            .client
            .post(&self.config.api_url)
            .header("User-Agent", self.config.user_agent.clone())
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(session) = session {
            request = request.header("Cookie", session.header_value().to_string());
        }

        let response = request
            .send()
            .with_context(|| format!("failed to call admin API at {}", self.config.api_url))?;
        let status = response.status();
        let set_cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok().map(ToString::to_string))
            .collect::<Vec<_>>();
        let body = response
            .text()
            .context("failed to read admin API response body")?;

        if !status.is_success() {
            bail!("admin API request failed with HTTP {status}: {body}");
        }
        let payload: Value = serde_json::from_str(&body)
            .with_context(|| format!("admin API returned a non-JSON response: {body}"))?;

        if let Some(errors) = payload.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            let message = errors[0]
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            bail!("admin API GraphQL error: {message}");
        }

        let data = payload.get("data").cloned().unwrap_or(Value::Null);
        Ok((data, set_cookie))
    }

    fn collection_list(&mut self, session: &SessionCookie, slug: &str) -> Result<CollectionList> {
        let (data, _) =
            self.post_graphql(FIND_COLLECTION_QUERY, json!({ "slug": slug }), Some(session))?;
        let decoded: CollectionListData =
            serde_json::from_value(data).context("failed to decode collection lookup response")?;
        Ok(decoded.collections)
    }
}

/// The remote schema rejects collections without a filter list; this payload
/// is the accepted way to attach none.
fn noop_filters() -> Value {
    json!([{
        "code": "facet-value-filter",
        "arguments": [
            { "name": "facetValueIds", "value": "[]" },
            { "name": "containsAny", "value": "false" },
        ],
    }])
}

pub fn decode_login_outcome(data: &Value) -> Result<LoginOutcome> {
    let decoded: LoginData = serde_json::from_value(data.clone())
        .context("failed to decode login mutation response")?;
    let login = decoded
        .login
        .ok_or_else(|| anyhow::anyhow!("missing login payload in API response"))?;
    if login.typename == "CurrentUser" {
        let id = login
            .id
            .ok_or_else(|| anyhow::anyhow!("login succeeded without a user id"))?;
        let identifier = login.identifier.unwrap_or_default();
        return Ok(LoginOutcome::Success(CurrentUser { id, identifier }));
    }
    Ok(LoginOutcome::Failure {
        error_code: login
            .error_code
            .unwrap_or_else(|| login.typename.clone()),
        message: login
            .message
            .unwrap_or_else(|| "unknown login error".to_string()),
    })
}

fn decode_mutated_collection(payload: Option<MutatedCollection>, verb: &str) -> Result<CollectionRef> {
    let payload =
        payload.ok_or_else(|| anyhow::anyhow!("missing {verb} payload in API response"))?;
    if let Some(typename) = &payload.typename
        && typename != "Collection"
    {
        bail!(
            "{verb} rejected by the admin API [{typename}]: {}",
            payload.message.as_deref().unwrap_or("no message")
        );
    }
    let id = payload
        .id
        .ok_or_else(|| anyhow::anyhow!("{verb} response carried no collection id"))?;
    Ok(CollectionRef {
        id,
        name: payload.name.unwrap_or_default(),
        slug: payload.slug.unwrap_or_default(),
        parent_id: None,
    })
}

impl CatalogReadApi for AdminClient {
    fn find_collection_by_slug(
        &mut self,
        session: &SessionCookie,
        slug: &str,
    ) -> Result<Option<CollectionRef>> {
        let list = self.collection_list(session, slug)?;
        Ok(list.items.into_iter().next().map(|item| CollectionRef {
            id: item.id,
            name: item.name,
            slug: item.slug,
            parent_id: item.parent.map(|parent| parent.id),
        }))
    }

    fn find_product_by_slug(
        &mut self,
        session: &SessionCookie,
        slug: &str,
    ) -> Result<Option<ProductRef>> {
        let (data, _) =
            self.post_graphql(FIND_PRODUCT_QUERY, json!({ "slug": slug }), Some(session))?;
        let decoded: ProductListData =
            serde_json::from_value(data).context("failed to decode product lookup response")?;
        Ok(decoded.products.items.into_iter().next().map(|item| ProductRef {
            id: item.id,
            name: item.name,
            slug: item.slug,
        }))
    }

    fn products_page(
        &mut self,
        session: &SessionCookie,
        skip: usize,
        take: usize,
    ) -> Result<Page<ProductFacets>> {
        let (data, _) = self.post_graphql(
            PRODUCTS_PAGE_QUERY,
            json!({ "skip": skip, "take": take }),
            Some(session),
        )?;
        let decoded: ProductListData =
            serde_json::from_value(data).context("failed to decode products page response")?;
        Ok(Page {
            items: decoded
                .products
                .items
                .into_iter()
                .map(|item| ProductFacets {
                    id: item.id,
                    name: item.name,
                    slug: item.slug,
                    facet_values: item
                        .facet_values
                        .into_iter()
                        .map(|value| FacetValueRef {
                            id: value.id,
                            code: value.code,
                            facet_code: value.facet.code,
                        })
                        .collect(),
                })
                .collect(),
            total_items: decoded.products.total_items,
        })
    }

    fn facet_values_page(
        &mut self,
        session: &SessionCookie,
        skip: usize,
        take: usize,
    ) -> Result<Page<FacetValueRef>> {
        let (data, _) = self.post_graphql(
            FACET_VALUES_PAGE_QUERY,
            json!({ "skip": skip, "take": take }),
            Some(session),
        )?;
        let decoded: FacetValueListData =
            serde_json::from_value(data).context("failed to decode facet values page response")?;
        Ok(Page {
            items: decoded
                .facet_values
                .items
                .into_iter()
                .map(|value| FacetValueRef {
                    id: value.id,
                    code: value.code,
                    facet_code: value.facet.code,
                })
                .collect(),
            total_items: decoded.facet_values.total_items,
        })
    }

    fn job(&mut self, session: &SessionCookie, job_id: &str) -> Result<Option<JobStatus>> {
        let (data, _) = self.post_graphql(JOB_QUERY, json!({ "id": job_id }), Some(session))?;
        let decoded: JobData =
            serde_json::from_value(data).context("failed to decode job query response")?;
        Ok(decoded.job.map(|job| JobStatus {
            id: job.id,
            state: job.state,
            progress: job.progress,
            queue_name: job.queue_name,
            is_settled: job.is_settled,
            error: job.error,
            result: job.result,
        }))
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

impl CatalogWriteApi for AdminClient {
    fn login(&mut self, username: &str, password: &str) -> Result<(CurrentUser, SessionCookie)> {
        let (data, set_cookie) = self.post_graphql(
            LOGIN_MUTATION,
            json!({ "u": username, "p": password }),
            None,
        )?;
        match decode_login_outcome(&data)? {
            LoginOutcome::Success(user) => {
                let session = SessionCookie::from_set_cookie_headers(set_cookie)?;
                Ok((user, session))
            }
            LoginOutcome::Failure {
                error_code,
                message,
            } => bail!("login failed [{error_code}]: {message}"),
        }
    }

    fn create_collection(
        &mut self,
        session: &SessionCookie,
        desired: &DesiredCollection,
    ) -> Result<CollectionRef> {
        let mut input = json!({
            "isPrivate": desired.private,
            "inheritFilters": desired.inherit_filters,
            "filters": noop_filters(),
            "translations": desired.translations,
        });
        if let Some(parent_id) = &desired.parent_id {
            input["parentId"] = json!(parent_id);
        }
        let (data, _) = self.post_graphql(
            CREATE_COLLECTION_MUTATION,
            json!({ "input": input }),
            Some(session),
        )?;
        let decoded: CreateCollectionData = serde_json::from_value(data)
            .context("failed to decode create collection response")?;
        decode_mutated_collection(decoded.create_collection, "create collection")
    }

    fn update_collection(
        &mut self,
        session: &SessionCookie,
        id: &str,
        translations: &[Translation],
    ) -> Result<CollectionRef> {
        let (data, _) = self.post_graphql(
            UPDATE_COLLECTION_MUTATION,
            json!({ "input": { "id": id, "translations": translations } }),
            Some(session),
        )?;
        let decoded: UpdateCollectionData = serde_json::from_value(data)
            .context("failed to decode update collection response")?;
        decode_mutated_collection(decoded.update_collection, "update collection")
    }

    fn delete_collection(
        &mut self,
        session: &SessionCookie,
        id: &str,
    ) -> Result<DeletionOutcome> {
        let (data, _) =
            self.post_graphql(DELETE_COLLECTION_MUTATION, json!({ "id": id }), Some(session))?;
        let decoded: DeleteCollectionData = serde_json::from_value(data)
            .context("failed to decode delete collection response")?;
        let payload = decoded
            .delete_collection
            .ok_or_else(|| anyhow::anyhow!("missing delete collection payload in API response"))?;
        Ok(DeletionOutcome {
            result: payload.result,
            message: payload.message,
        })
    }

    fn delete_product(&mut self, session: &SessionCookie, id: &str) -> Result<DeletionOutcome> {
        let (data, _) =
            self.post_graphql(DELETE_PRODUCT_MUTATION, json!({ "id": id }), Some(session))?;
        let decoded: DeleteProductData = serde_json::from_value(data)
            .context("failed to decode delete product response")?;
        let payload = decoded
            .delete_product
            .ok_or_else(|| anyhow::anyhow!("missing delete product payload in API response"))?;
        Ok(DeletionOutcome {
            result: payload.result,
            message: payload.message,
        })
    }

    fn update_product_facet_values(
        &mut self,
        session: &SessionCookie,
        product_id: &str,
        facet_value_ids: &[String],
    ) -> Result<()> {
        let (data, _) = self.post_graphql(
            UPDATE_PRODUCT_FACETS_MUTATION,
            json!({ "input": { "id": product_id, "facetValueIds": facet_value_ids } }),
            Some(session),
        )?;
        let decoded: UpdateProductData = serde_json::from_value(data)
            .context("failed to decode update product response")?;
        if decoded.update_product.and_then(|payload| payload.id).is_none() {
            bail!("update product returned an empty payload for {product_id}");
        }
        Ok(())
    }

    fn trigger_reindex(&mut self, session: &SessionCookie) -> Result<String> {
        let (data, _) = self.post_graphql(REINDEX_MUTATION, json!({}), Some(session))?;
        let decoded: ReindexData =
            serde_json::from_value(data).context("failed to decode reindex response")?;
        decoded
            .reindex
            .map(|job| job.id)
            .ok_or_else(|| anyhow::anyhow!("reindex mutation returned no job"))
    }
}

#[derive(Debug, Deserialize, Default)]
struct CollectionListData {
    #[serde(default)]
    collections: CollectionList,
}

#[derive(Debug, Deserialize, Default)]
struct CollectionList {
    #[serde(default)]
    items: Vec<CollectionItem>,
}

#[derive(Debug, Deserialize)]
struct CollectionItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    parent: Option<ParentRef>,
}

#[derive(Debug, Deserialize)]
struct ParentRef {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
struct LoginData {
    login: Option<LoginPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(rename = "__typename", default)]
    typename: String,
    id: Option<String>,
    identifier: Option<String>,
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CreateCollectionData {
    create_collection: Option<MutatedCollection>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdateCollectionData {
    update_collection: Option<MutatedCollection>,
}

#[derive(Debug, Deserialize)]
struct MutatedCollection {
    #[serde(rename = "__typename", default)]
    typename: Option<String>,
    id: Option<String>,
    name: Option<String>,
    slug: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DeleteCollectionData {
    delete_collection: Option<DeletionPayload>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DeleteProductData {
    delete_product: Option<DeletionPayload>,
}

#[derive(Debug, Deserialize)]
struct DeletionPayload {
    result: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ProductListData {
    #[serde(default)]
    products: ProductList,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ProductList {
    #[serde(default)]
    items: Vec<ProductItem>,
    #[serde(default)]
    total_items: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    facet_values: Vec<FacetValueItem>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FacetValueListData {
    #[serde(default)]
    facet_values: FacetValueList,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FacetValueList {
    #[serde(default)]
    items: Vec<FacetValueItem>,
    #[serde(default)]
    total_items: usize,
}

#[derive(Debug, Deserialize)]
struct FacetValueItem {
    id: String,
    code: String,
    facet: FacetParent,
}

#[derive(Debug, Deserialize)]
struct FacetParent {
    code: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdateProductData {
    update_product: Option<UpdatedProduct>,
}

#[derive(Debug, Deserialize)]
struct UpdatedProduct {
    id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ReindexData {
    reindex: Option<ReindexJob>,
}

#[derive(Debug, Deserialize)]
struct ReindexJob {
    id: String,
}

#[derive(Debug, Deserialize, Default)]
struct JobData {
    job: Option<JobPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobPayload {
    id: String,
    state: String,
    progress: Option<f64>,
    queue_name: Option<String>,
    #[serde(default)]
    is_settled: bool,
    error: Option<String>,
    result: Option<Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{LoginOutcome, decode_login_outcome};

    #[test]
    fn login_success_decodes_current_user() {
        let data = json!({
            "login": {
                "__typename": "CurrentUser",
                "id": "1",
                "identifier": "ops@example.org",
            }
        });
        match decode_login_outcome(&data).expect("decode") {
            LoginOutcome::Success(user) => {
                assert_eq!(user.id, "1");
                assert_eq!(user.identifier, "ops@example.org");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn login_failure_carries_code_and_message() {
        let data = json!({
            "login": {
                "__typename": "InvalidCredentialsError",
                "errorCode": "INVALID_CREDENTIALS_ERROR",
                "message": "The provided credentials are invalid",
            }
        });
        match decode_login_outcome(&data).expect("decode") {
            LoginOutcome::Failure {
                error_code,
                message,
            } => {
                assert_eq!(error_code, "INVALID_CREDENTIALS_ERROR");
                assert_eq!(message, "The provided credentials are invalid");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn login_failure_without_code_falls_back_to_typename() {
        let data = json!({
            "login": { "__typename": "NativeAuthStrategyError" }
        });
        match decode_login_outcome(&data).expect("decode") {
            LoginOutcome::Failure { error_code, .. } => {
                assert_eq!(error_code, "NativeAuthStrategyError");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn missing_login_payload_is_an_error() {
        let error = decode_login_outcome(&json!({})).expect_err("must fail");
        assert!(error.to_string().contains("missing login payload"));
    }
}
