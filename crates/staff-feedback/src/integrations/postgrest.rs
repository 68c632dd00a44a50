//! Primary store over a PostgREST (Supabase-style) endpoint.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/rest/v1/{staff}?select=ESCOLA&ESCOLA=not.is.null&order=ESCOLA.asc` | unit values |
//! | GET    | `/rest/v1/{staff}?ESCOLA=eq.{unit}&order=Nome.asc` | exact roster |
//! | GET    | `/rest/v1/{staff}?ESCOLA=ilike.{pattern}&order=Nome.asc` | fallback roster |
//! | POST   | `/rest/v1/{feedback}` | feedback insert |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::StoreConfig;
use crate::workflows::feedback::domain::{
    display_value, FeedbackRecord, StaffRow, NAME_COLUMN, STAFF_SELECT, UNIT_COLUMN,
};
use crate::workflows::feedback::repository::{
    FeedbackRepository, StaffDirectory, StaffFilter, StoreError,
};

const REST_PREFIX: &str = "rest/v1";

#[derive(Debug, Clone)]
pub struct PostgrestStore {
    http: reqwest::Client,
    base_url: String,
    staff_table: String,
    feedback_table: String,
}

#[derive(Debug, Deserialize)]
struct UnitRow {
    #[serde(rename = "ESCOLA", default)]
    school: Option<Value>,
}

impl PostgrestStore {
    pub fn new(base_url: &str, config: &StoreConfig, timeout: Duration) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref() {
            let invalid = |_| StoreError::Unavailable("STORE_API_KEY is not a valid header value".into());
            headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|source| StoreError::Http {
                endpoint: "client_init".into(),
                source,
            })?;

        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        Ok(Self {
            http,
            base_url,
            staff_table: config.staff_table.clone(),
            feedback_table: config.feedback_table.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, REST_PREFIX, table)
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let resp = self
            .http
            .get(self.table_url(&self.staff_table))
            .query(query)
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.into(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        resp.json().await.map_err(|source| StoreError::Deserialization {
            endpoint: endpoint.into(),
            source,
        })
    }
}

#[async_trait]
impl StaffDirectory for PostgrestStore {
    async fn unit_values(&self) -> Result<Vec<String>, StoreError> {
        let query = [
            ("select", UNIT_COLUMN.to_string()),
            (UNIT_COLUMN, "not.is.null".to_string()),
            ("order", format!("{UNIT_COLUMN}.asc")),
        ];
        let rows: Vec<UnitRow> = self.get_rows("GET units", &query).await?;
        Ok(rows
            .iter()
            .map(|row| display_value(row.school.as_ref()))
            .collect())
    }

    async fn find_staff(&self, filter: &StaffFilter) -> Result<Vec<StaffRow>, StoreError> {
        let (endpoint, condition) = match filter {
            StaffFilter::UnitEquals(unit) => ("GET staff (eq)", format!("eq.{unit}")),
            StaffFilter::UnitLike(pattern) => ("GET staff (ilike)", format!("ilike.{pattern}")),
        };
        let query = [
            ("select", STAFF_SELECT.to_string()),
            (UNIT_COLUMN, condition),
            ("order", format!("{NAME_COLUMN}.asc")),
        ];
        self.get_rows(endpoint, &query).await
    }
}

#[async_trait]
impl FeedbackRepository for PostgrestStore {
    async fn insert(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        let endpoint = "POST feedback";
        let resp = self
            .http
            .post(self.table_url(&self.feedback_table))
            .header("Prefer", "return=minimal")
            .json(&[record.row()])
            .send()
            .await
            .map_err(|source| StoreError::Http {
                endpoint: endpoint.into(),
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        Ok(())
    }
}
