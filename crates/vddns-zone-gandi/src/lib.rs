// # Gandi Zone API
//
// Versioned zone client for Gandi's XML-RPC domain API.
//
// ## Behavior
//
// - One HTTP request per trait call; no retries, no caching
// - Errors propagate to the caller, which decides about rollback and retry
// - Per-request timeout from configuration
// - Production and OT&E (test) platforms
//
// ## Security Requirements
//
// - The API key NEVER appears in logs or `Debug` output
// - The client refuses to build with an empty key
//
// ## API Reference
//
// Every method takes the API key as its first parameter.
//
// - `domain.zone.info(key, zone)` → struct with `version`
// - `domain.zone.version.new(key, zone, source)` → new version id
// - `domain.zone.version.delete(key, zone, version)` → bool
// - `domain.zone.version.set(key, zone, version)` → bool
// - `domain.zone.record.list(key, zone, version)` → array of record structs
// - `domain.zone.record.add(key, zone, version, {name, type, value, ttl})` → record struct
// - `domain.zone.record.delete(key, zone, version, {id})` → number deleted

pub mod xmlrpc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use vddns_core::config::{Platform, ZoneApiConfig};
use vddns_core::traits::{NewRecord, RecordId, RecordInfo, VersionId, ZoneApi, ZoneId};
use vddns_core::{Error, Result};
use xmlrpc::{Value, XmlRpcError};

/// Production XML-RPC endpoint
pub const PRODUCTION_ENDPOINT: &str = "https://rpc.gandi.net/xmlrpc/";

/// OT&E (test platform) XML-RPC endpoint
pub const TESTING_ENDPOINT: &str = "https://rpc.ote.gandi.net/xmlrpc/";

const API_NAME: &str = "gandi";

/// Longest slice of an error body quoted in error messages
const MAX_BODY_SNIPPET: usize = 200;

/// Endpoint URL for a platform
pub fn endpoint_for(platform: Platform) -> &'static str {
    match platform {
        Platform::Production => PRODUCTION_ENDPOINT,
        Platform::Testing => TESTING_ENDPOINT,
    }
}

/// Gandi versioned zone client
pub struct GandiZoneApi {
    /// ⚠️ NEVER log this value
    api_key: String,

    /// XML-RPC endpoint URL
    endpoint: String,

    /// HTTP client carrying the request timeout
    client: reqwest::Client,
}

impl std::fmt::Debug for GandiZoneApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GandiZoneApi")
            .field("api_key", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GandiZoneApi {
    /// Create a client
    ///
    /// # Parameters
    ///
    /// - `api_key`: Gandi API key
    /// - `platform`: Production or OT&E
    /// - `timeout`: Deadline for each request
    ///
    /// # Errors
    ///
    /// `Error::Config` if the key is empty, `Error::Http` if the HTTP
    /// client cannot be built.
    pub fn new(api_key: impl Into<String>, platform: Platform, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("Gandi API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            endpoint: endpoint_for(platform).to_string(),
            client,
        })
    }

    /// Create a client from the zone API section of the configuration
    pub fn from_config(config: &ZoneApiConfig) -> Result<Self> {
        config.validate()?;
        let api = Self::new(
            config.api_key.clone(),
            config.platform,
            config.request_timeout(),
        )?;
        tracing::info!(
            "Using Gandi {:?} platform at {}",
            config.platform,
            api.endpoint
        );
        Ok(api)
    }

    /// Point the client at another endpoint (a proxy or a local stub)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The endpoint requests go to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform one XML-RPC call, prepending the API key to `params`
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let mut all_params = Vec::with_capacity(params.len() + 1);
        all_params.push(Value::from(self.api_key.as_str()));
        all_params.extend(params);
        let body = xmlrpc::encode_call(method, &all_params);

        tracing::debug!("Calling {}", method);

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::zone_api(API_NAME, format!("{} timed out", method))
                } else {
                    Error::zone_api(API_NAME, format!("{}: HTTP request failed: {}", method, e))
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            Error::zone_api(API_NAME, format!("{}: failed to read response: {}", method, e))
        })?;

        if !status.is_success() {
            return Err(status_error(method, status, &text));
        }

        xmlrpc::decode_response(&text).map_err(|e| rpc_error(method, e))
    }
}

/// Map a non-2xx status to an error
fn status_error(method: &str, status: reqwest::StatusCode, body: &str) -> Error {
    let snippet: String = body.chars().take(MAX_BODY_SNIPPET).collect();
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Gandi rejected the API key or its permissions. Status: {}",
            status
        )),
        429 => Error::rate_limited(format!(
            "Gandi rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::zone_api(
            API_NAME,
            format!("{}: server error (transient): {} - {}", method, status, snippet),
        ),
        _ => Error::zone_api(
            API_NAME,
            format!("{}: unexpected status: {} - {}", method, status, snippet),
        ),
    }
}

fn rpc_error(method: &str, err: XmlRpcError) -> Error {
    Error::zone_api(API_NAME, format!("{}: {}", method, err))
}

fn unexpected(method: &str, what: &str, value: &Value) -> Error {
    Error::zone_api(
        API_NAME,
        format!("{}: expected {}, got {:?}", method, what, value),
    )
}

/// Delete and activate calls answer `true` on success
fn expect_true(method: &str, value: Value) -> Result<()> {
    match value.as_bool() {
        Some(true) => Ok(()),
        Some(false) => Err(Error::zone_api(
            API_NAME,
            format!("{} returned false", method),
        )),
        None => Err(unexpected(method, "a boolean", &value)),
    }
}

fn record_to_value(record: &NewRecord) -> Value {
    Value::structure([
        ("name", Value::from(record.name.as_str())),
        ("type", Value::from(record.record_type.as_str())),
        ("value", Value::from(record.value.as_str())),
        ("ttl", Value::Int(i64::from(record.ttl))),
    ])
}

fn record_from_value(method: &str, value: &Value) -> Result<RecordInfo> {
    let int = |field: &str| {
        value
            .get(field)
            .and_then(Value::as_i64)
            .ok_or_else(|| unexpected(method, &format!("integer field {:?}", field), value))
    };
    let string = |field: &str| {
        value
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| unexpected(method, &format!("string field {:?}", field), value))
    };

    let ttl = int("ttl")?;
    let ttl = u32::try_from(ttl)
        .map_err(|_| Error::zone_api(API_NAME, format!("{}: ttl {} out of range", method, ttl)))?;

    Ok(RecordInfo {
        id: RecordId(int("id")?),
        name: string("name")?,
        record_type: string("type")?,
        value: string("value")?,
        ttl,
    })
}

#[async_trait]
impl ZoneApi for GandiZoneApi {
    async fn current_active_version(&self, zone_id: ZoneId) -> Result<VersionId> {
        const METHOD: &str = "domain.zone.info";
        let info = self.call(METHOD, vec![Value::Int(zone_id.0)]).await?;
        info.get("version")
            .and_then(Value::as_i64)
            .map(VersionId)
            .ok_or_else(|| unexpected(METHOD, "a struct with an integer version", &info))
    }

    async fn clone_version(&self, zone_id: ZoneId, source: VersionId) -> Result<VersionId> {
        const METHOD: &str = "domain.zone.version.new";
        let created = self
            .call(METHOD, vec![Value::Int(zone_id.0), Value::Int(source.0)])
            .await?;
        created
            .as_i64()
            .map(VersionId)
            .ok_or_else(|| unexpected(METHOD, "a version id", &created))
    }

    async fn delete_version(&self, zone_id: ZoneId, version: VersionId) -> Result<()> {
        const METHOD: &str = "domain.zone.version.delete";
        let answer = self
            .call(METHOD, vec![Value::Int(zone_id.0), Value::Int(version.0)])
            .await?;
        expect_true(METHOD, answer)
    }

    async fn activate_version(&self, zone_id: ZoneId, version: VersionId) -> Result<()> {
        const METHOD: &str = "domain.zone.version.set";
        let answer = self
            .call(METHOD, vec![Value::Int(zone_id.0), Value::Int(version.0)])
            .await?;
        expect_true(METHOD, answer)
    }

    async fn list_records(&self, zone_id: ZoneId, version: VersionId) -> Result<Vec<RecordInfo>> {
        const METHOD: &str = "domain.zone.record.list";
        let listed = self
            .call(METHOD, vec![Value::Int(zone_id.0), Value::Int(version.0)])
            .await?;
        listed
            .as_array()
            .ok_or_else(|| unexpected(METHOD, "an array", &listed))?
            .iter()
            .map(|record| record_from_value(METHOD, record))
            .collect()
    }

    async fn add_record(
        &self,
        zone_id: ZoneId,
        version: VersionId,
        record: &NewRecord,
    ) -> Result<RecordInfo> {
        const METHOD: &str = "domain.zone.record.add";
        let added = self
            .call(
                METHOD,
                vec![
                    Value::Int(zone_id.0),
                    Value::Int(version.0),
                    record_to_value(record),
                ],
            )
            .await?;
        record_from_value(METHOD, &added)
    }

    async fn delete_record(
        &self,
        zone_id: ZoneId,
        version: VersionId,
        record_id: RecordId,
    ) -> Result<()> {
        const METHOD: &str = "domain.zone.record.delete";
        let deleted = self
            .call(
                METHOD,
                vec![
                    Value::Int(zone_id.0),
                    Value::Int(version.0),
                    Value::structure([("id", Value::Int(record_id.0))]),
                ],
            )
            .await?;
        match deleted.as_i64() {
            Some(0) => Err(Error::zone_api(
                API_NAME,
                format!("{}: record {} not deleted", METHOD, record_id),
            )),
            Some(_) => Ok(()),
            None => Err(unexpected(METHOD, "a deleted count", &deleted)),
        }
    }

    fn api_name(&self) -> &'static str {
        API_NAME
    }
}
