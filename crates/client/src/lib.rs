//! HTTP shell for feature services: layer handles and the
//! info/query/applyEdits operations.
//!
//! All decoding is done by pure functions over already-retrieved bytes
//! (see [`decode`]); this module only does transport and status
//! classification.

#![forbid(unsafe_code)]

pub mod decode;

use std::time::Instant;

use metrics::counter;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::info;

use fsrv_core::{Error, Feature, FieldDescriptor, GeometryKind, LayerId, Result};
use fsrv_schema::{decode_layer_info, LayerInfo};

/// Client configuration. Everything is optional; defaults mirror reqwest's.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Pre-built HTTP client to use instead of the default, for custom
    /// timeouts, proxies or TLS setup.
    pub http: Option<reqwest::Client>,
}

/// Handle to one feature service endpoint.
#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, ClientConfig::default())
    }

    pub fn with_config(base_url: &str, config: ClientConfig) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Structural(format!("invalid base url '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Structural(format!(
                "invalid base url '{base_url}': cannot be a base"
            )));
        }
        Ok(Self {
            base,
            http: config.http.unwrap_or_default(),
        })
    }

    /// Handle for one layer (or table) of this service.
    pub fn layer(&self, id: LayerId) -> Layer<'_> {
        Layer { id, client: self }
    }

    /// Apply add/update/delete batches across layers in one call.
    pub async fn apply_edits(&self, edits: &[Edit]) -> Result<Vec<LayerEditResults>> {
        let t0 = Instant::now();
        info!(edits = edits.len(), "apply_edits start");
        counter!("fsrv_apply_edits_total", 1u64);
        let url = self.endpoint(&["applyEdits"]);
        let edits_json = serde_json::to_string(edits)?;
        let form = vec![("edits", edits_json), ("f", "json".to_string())];
        let body = self.post_form(url, &form).await?;
        let results = decode::decode_edit_results(&body)?;
        info!(layers = results.len(), took_ms = %t0.elapsed().as_millis(), "apply_edits ok");
        Ok(results)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was ruled out at construction
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::classify_status(resp.status())?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }

    async fn post_form(&self, url: Url, form: &[(&str, String)]) -> Result<Vec<u8>> {
        let resp = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::classify_status(resp.status())?;
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }

    /// 404 is distinguished; every other non-success status collapses into
    /// a generic transport failure carrying the code.
    fn classify_status(status: StatusCode) -> Result<()> {
        if status.is_success() {
            return Ok(());
        }
        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            other => Err(Error::Status(other.as_u16())),
        }
    }
}

/// Handle to one layer within a feature service.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    id: LayerId,
    client: &'a Client,
}

impl Layer<'_> {
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Fetch this layer's self-described metadata (schema fields, geometry
    /// kind). Fetched fresh on every call; nothing is cached.
    pub async fn info(&self) -> Result<LayerInfo> {
        let t0 = Instant::now();
        info!(layer = self.id, "info start");
        counter!("fsrv_info_total", 1u64);
        let mut url = self.client.endpoint(&[&self.id.to_string()]);
        url.query_pairs_mut().append_pair("f", "json");
        let body = self.client.get(url).await?;
        let layer_info = decode_layer_info(&body)?;
        info!(layer = self.id, name = %layer_info.name(), took_ms = %t0.elapsed().as_millis(), "info ok");
        Ok(layer_info)
    }

    /// Query features with a SQL where clause.
    pub async fn query(&self, params: QueryParams) -> Result<QueryResults> {
        let t0 = Instant::now();
        info!(layer = self.id, where_clause = %params.where_clause, "query start");
        counter!("fsrv_query_total", 1u64);
        let url = self.client.endpoint(&[&self.id.to_string(), "query"]);
        let mut form: Vec<(&str, String)> = vec![
            ("where", params.where_clause.clone()),
            ("f", "json".to_string()),
            ("returnGeometry", params.return_geometry.to_string()),
        ];
        if let Some(out_fields) = &params.out_fields {
            form.push(("outFields", out_fields.join(",")));
        }
        if let Some(count) = params.result_record_count {
            form.push(("resultRecordCount", count.to_string()));
        }
        let body = self.client.post_form(url, &form).await?;
        let results = decode::decode_query_results(&body, params.return_geometry)?;
        info!(layer = self.id, features = results.features.len(), took_ms = %t0.elapsed().as_millis(), "query ok");
        Ok(results)
    }
}

/// Parameters for a layer query.
#[derive(Debug, Clone)]
pub struct QueryParams {
    /// SQL where clause applied server side. Any legal clause over the
    /// layer's fields.
    pub where_clause: String,
    /// Include geometry with each returned feature. When false, decoded
    /// features always carry the none variant.
    pub return_geometry: bool,
    /// Field names to return; `None` leaves the server default set.
    pub out_fields: Option<Vec<String>>,
    /// Cap on the number of returned features; `None` leaves the server
    /// default.
    pub result_record_count: Option<u32>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            where_clause: "1=1".into(),
            return_geometry: false,
            out_fields: None,
            result_record_count: None,
        }
    }
}

/// Decoded result set of one query call.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    pub object_id_field_name: String,
    pub global_id_field_name: String,
    /// Geometry kind the whole result set declares. Every feature's
    /// geometry decodes under this one kind; the server is assumed never
    /// to mix kinds within one result.
    pub geometry_type: GeometryKind,
    pub fields: Vec<FieldDescriptor>,
    pub features: Vec<Feature>,
}

/// One layer's batch of add/update/delete operations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Edit {
    #[serde(rename = "id")]
    pub layer_id: LayerId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub adds: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deletes: Vec<serde_json::Value>,
}

impl Edit {
    pub fn new(layer_id: LayerId) -> Self {
        Self {
            layer_id,
            ..Default::default()
        }
    }

    /// Append a record to create. The record's shape should have been
    /// validated against the target layer's schema first.
    pub fn add<T: Serialize>(mut self, record: &T) -> Result<Self> {
        self.adds.push(serde_json::to_value(record)?);
        Ok(self)
    }

    pub fn update<T: Serialize>(mut self, record: &T) -> Result<Self> {
        self.updates.push(serde_json::to_value(record)?);
        Ok(self)
    }

    pub fn delete<T: Serialize>(mut self, record: &T) -> Result<Self> {
        self.deletes.push(serde_json::to_value(record)?);
        Ok(self)
    }
}

/// Per-layer outcome of an applyEdits call. Individual results stay raw;
/// their shape varies across server versions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerEditResults {
    #[serde(rename = "id")]
    pub layer_id: LayerId,
    #[serde(default, rename = "addsResults")]
    pub add_results: Vec<serde_json::Value>,
    #[serde(default, rename = "updateResults")]
    pub update_results: Vec<serde_json::Value>,
    #[serde(default, rename = "deleteResults")]
    pub delete_results: Vec<serde_json::Value>,
}
