//! Elasticsearch-backed catalog store.
//!
//! Talks to the REST API directly. Every product is one document in the
//! configured index, keyed by product id. Stock changes run as painless
//! update scripts, which Elasticsearch applies atomically per document, so
//! the conditional decrement cannot drive a quantity below zero even when
//! several orders race for the same product.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{CatalogError, CatalogStore, Product, ProductId, Result, SearchQuery};

const DECREMENT_SCRIPT: &str = "if (ctx._source.quantity < params.count) { ctx.op = 'noop' } \
     else { ctx._source.quantity -= params.count }";

const INCREMENT_SCRIPT: &str = "ctx._source.quantity += params.count";

/// Connection settings for the Elasticsearch catalog.
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    /// Base URL, e.g. `http://127.0.0.1:9200`.
    pub base_url: String,
    /// Index holding product documents.
    pub index: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9200".to_string(),
            index: "product".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    result: String,
    get: Option<UpdateGet>,
}

#[derive(Debug, Deserialize)]
struct UpdateGet {
    #[serde(rename = "_source")]
    source: QuantitySource,
}

#[derive(Debug, Deserialize)]
struct QuantitySource {
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: Value,
}

/// Catalog store backed by an Elasticsearch index.
#[derive(Debug, Clone)]
pub struct ElasticsearchCatalogStore {
    client: Client,
    base_url: Url,
    index: String,
}

impl ElasticsearchCatalogStore {
    /// Creates a store from `config`. Does not contact the cluster.
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            CatalogError::Unavailable(format!("invalid catalog url {}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::Unavailable(format!(
                "catalog url {} cannot be used as a base",
                config.base_url
            )));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            index: config.index,
        })
    }

    /// Checks that the cluster answers.
    pub async fn ping(&self) -> Result<()> {
        let response = self.client.get(self.base_url.clone()).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CatalogError::Unavailable(format!(
                "ping returned status {}",
                response.status()
            )))
        }
    }

    /// Creates the product index with its mapping if it does not exist yet.
    pub async fn ensure_index(&self) -> Result<()> {
        let url = self.endpoint(&[]);
        let response = self.client.head(url.clone()).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Err(error_from_response(response).await);
        }

        let response = self.client.put(url).json(&index_definition()).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        tracing::info!(index = %self.index, "created product index");
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.index).extend(segments);
        }
        url
    }

    async fn run_script(
        &self,
        product_id: &ProductId,
        script: &str,
        count: u32,
    ) -> Result<UpdateResponse> {
        let response = self
            .client
            .post(self.endpoint(&["_update", product_id.as_str()]))
            .query(&[("retry_on_conflict", "3"), ("_source", "quantity")])
            .json(&json!({
                "script": {
                    "source": script,
                    "lang": "painless",
                    "params": { "count": count }
                }
            }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(product_id.clone()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CatalogStore for ElasticsearchCatalogStore {
    #[tracing::instrument(skip(self), fields(index = %self.index))]
    async fn get(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let response = self
            .client
            .get(self.endpoint(&["_doc", product_id.as_str()]))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let doc: GetResponse = response.json().await?;
        match (doc.found, doc.source) {
            (true, Some(source)) => Ok(Some(product_from_source(doc.id, source)?)),
            _ => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    async fn put_product(&self, product: Product) -> Result<()> {
        let response = self
            .client
            .put(self.endpoint(&["_doc", product.id.as_str()]))
            .json(&product)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        tracing::info!("product indexed");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&["_update", product_id.as_str()]))
            .json(&json!({ "doc": { "quantity": quantity } }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(product_id.clone()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn decrement_quantity(&self, product_id: &ProductId, count: u32) -> Result<u32> {
        let update = self.run_script(product_id, DECREMENT_SCRIPT, count).await?;

        // The fallback read is a second request, so under concurrent writes
        // its quantity may differ from the one the script refused against.
        // It only feeds the error report.
        let remaining = match update.get {
            Some(get) => get.source.quantity,
            None => self
                .get(product_id)
                .await?
                .map(|p| p.quantity)
                .ok_or_else(|| CatalogError::NotFound(product_id.clone()))?,
        };

        if update.result == "noop" {
            return Err(CatalogError::InsufficientStock {
                product_id: product_id.clone(),
                requested: count,
                available: remaining,
            });
        }
        Ok(remaining)
    }

    #[tracing::instrument(skip(self))]
    async fn increment_quantity(&self, product_id: &ProductId, count: u32) -> Result<u32> {
        let update = self.run_script(product_id, INCREMENT_SCRIPT, count).await?;
        match update.get {
            Some(get) => Ok(get.source.quantity),
            None => self
                .get(product_id)
                .await?
                .map(|p| p.quantity)
                .ok_or_else(|| CatalogError::NotFound(product_id.clone())),
        }
    }

    #[tracing::instrument(skip(self), fields(keyword = %query.keyword))]
    async fn search(&self, query: SearchQuery) -> Result<Vec<Product>> {
        let response = self
            .client
            .post(self.endpoint(&["_search"]))
            .json(&search_body(&query))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let result: SearchResponse = response.json().await?;
        let products = result
            .hits
            .hits
            .into_iter()
            .map(|hit| product_from_source(hit.id, hit.source))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(returned = products.len(), "catalog search finished");
        Ok(products)
    }
}

/// Builds the `_search` request body for `query`.
pub fn search_body(query: &SearchQuery) -> Value {
    let mut filters = Vec::new();
    if query.in_stock_only {
        filters.push(json!({ "range": { "quantity": { "gt": 0 } } }));
    }
    if let Some(ref category) = query.category {
        filters.push(json!({ "term": { "category": category } }));
    }
    if let Some(ref seller_id) = query.seller_id {
        filters.push(json!({ "term": { "seller_id": seller_id.as_str() } }));
    }

    let mut sort = serde_json::Map::new();
    sort.insert(
        query.sort_field.as_str().to_string(),
        json!({ "order": query.sort_order.as_str() }),
    );

    json!({
        "size": query.limit,
        "query": {
            "bool": {
                "must": [{
                    "multi_match": {
                        "query": query.keyword,
                        "fields": ["title^3", "description^1", "category^2"],
                        "type": "best_fields",
                        "fuzziness": "AUTO"
                    }
                }],
                "filter": filters
            }
        },
        "sort": [sort]
    })
}

fn index_definition() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        },
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "title": { "type": "text", "analyzer": "standard" },
                "description": { "type": "text", "analyzer": "standard" },
                "price": { "type": "long" },
                "picture_url": { "type": "keyword" },
                "quantity": { "type": "integer" },
                "category": { "type": "keyword" },
                "seller_id": { "type": "keyword" },
                "seller_name": { "type": "keyword" }
            }
        }
    })
}

fn product_from_source(id: String, mut source: Value) -> Result<Product> {
    if let Value::Object(ref mut fields) = source {
        fields.entry("id").or_insert(Value::String(id));
    }
    Ok(serde_json::from_value(source)?)
}

async fn error_from_response(response: Response) -> CatalogError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        CatalogError::Unavailable(format!("status {status}: {body}"))
    } else {
        CatalogError::UnexpectedResponse {
            status: status.as_u16(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_body_carries_filters_and_sort() {
        let body = search_body(
            &SearchQuery::keyword("lamp")
                .category("lighting")
                .seller("s1")
                .limit(5),
        );

        assert_eq!(body["size"], 5);
        assert_eq!(
            body["query"]["bool"]["must"][0]["multi_match"]["query"],
            "lamp"
        );
        let filters = body["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters.len(), 3);
        assert_eq!(filters[0]["range"]["quantity"]["gt"], 0);
        assert_eq!(filters[1]["term"]["category"], "lighting");
        assert_eq!(filters[2]["term"]["seller_id"], "s1");
        assert_eq!(body["sort"][0]["price"]["order"], "desc");
    }

    #[test]
    fn search_body_without_stock_filter() {
        let body = search_body(&SearchQuery::keyword("lamp").include_out_of_stock());
        assert!(body["query"]["bool"]["filter"].as_array().unwrap().is_empty());
    }

    #[test]
    fn source_without_id_takes_document_id() {
        let product = product_from_source(
            "abc".to_string(),
            json!({"title": "Lamp", "price": 100, "seller_id": "s1", "quantity": 2}),
        )
        .unwrap();
        assert_eq!(product.id, ProductId::new("abc"));
    }

    #[test]
    fn endpoint_joins_index_and_segments() {
        let store = ElasticsearchCatalogStore::new(ElasticsearchConfig {
            base_url: "http://localhost:9200/".to_string(),
            ..Default::default()
        })
        .unwrap();

        let url = store.endpoint(&["_doc", "p/1"]);
        assert_eq!(url.as_str(), "http://localhost:9200/product/_doc/p%2F1");
    }

    #[test]
    fn rejects_unusable_base_url() {
        let result = ElasticsearchCatalogStore::new(ElasticsearchConfig {
            base_url: "mailto:ops@example.com".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(CatalogError::Unavailable(_))));
    }
}
