//! PostgREST (`/rest/v1`) client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_RANGE};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::http::{send, send_json, with_params};
use super::{AuthProvider, Datastore, Query, SupabaseError};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Whose token goes in the `Authorization` header.
enum Bearer {
    /// The API key itself (anon or service role).
    ApiKey,
    /// The visitor's access token when signed in, else the API key.
    Visitor(Arc<dyn AuthProvider>),
}

/// Row access through PostgREST.
pub struct PostgrestClient {
    http: reqwest::Client,
    rest_url: Url,
    api_key: SecretString,
    bearer: Bearer,
}

impl PostgrestClient {
    /// A client that acts as whoever is signed in on `auth`.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST endpoint URL cannot be built.
    pub fn for_visitor(
        http: reqwest::Client,
        project_url: &Url,
        anon_key: SecretString,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Self, SupabaseError> {
        Ok(Self {
            http,
            rest_url: project_url.join("rest/v1/")?,
            api_key: anon_key,
            bearer: Bearer::Visitor(auth),
        })
    }

    /// A client authenticated with the API key alone. With the service role
    /// key this bypasses row-level security.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST endpoint URL cannot be built.
    pub fn with_key(
        http: reqwest::Client,
        project_url: &Url,
        api_key: SecretString,
    ) -> Result<Self, SupabaseError> {
        Ok(Self {
            http,
            rest_url: project_url.join("rest/v1/")?,
            api_key,
            bearer: Bearer::ApiKey,
        })
    }

    async fn token(&self) -> Result<String, SupabaseError> {
        let session = match &self.bearer {
            Bearer::ApiKey => None,
            Bearer::Visitor(auth) => auth.get_session().await?,
        };
        Ok(session.map_or_else(
            || self.api_key.expose_secret().to_owned(),
            |s| s.access_token,
        ))
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<RequestBuilder, SupabaseError> {
        let url = with_params(self.rest_url.join(path)?, params);
        let token = self.token().await?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", self.api_key.expose_secret())
            .header(AUTHORIZATION, format!("Bearer {token}")))
    }
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.parse().ok()
}

#[async_trait]
impl Datastore for PostgrestClient {
    #[instrument(skip(self), fields(table = query.table_name()))]
    async fn select(&self, query: &Query) -> Result<Vec<Value>, SupabaseError> {
        if query.is_empty_selection() {
            return Ok(Vec::new());
        }
        let request = self
            .request(reqwest::Method::GET, query.table_name(), query.read_params())
            .await?;
        match send_json(request, "postgrest.select").await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    #[instrument(skip(self), fields(table = query.table_name()))]
    async fn single(&self, query: &Query) -> Result<Value, SupabaseError> {
        if query.is_empty_selection() {
            return Err(SupabaseError::NoRows);
        }
        let request = self
            .request(reqwest::Method::GET, query.table_name(), query.read_params())
            .await?
            .header(ACCEPT, SINGLE_OBJECT);
        send_json(request, "postgrest.single").await
    }

    #[instrument(skip(self, row))]
    async fn insert(&self, table: &str, row: &Value) -> Result<Value, SupabaseError> {
        let request = self
            .request(reqwest::Method::POST, table, Vec::new())
            .await?
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row);
        send_json(request, "postgrest.insert").await
    }

    #[instrument(skip(self, row))]
    async fn upsert(
        &self,
        table: &str,
        row: &Value,
        on_conflict: &str,
    ) -> Result<Value, SupabaseError> {
        let params = vec![("on_conflict".to_owned(), on_conflict.to_owned())];
        let request = self
            .request(reqwest::Method::POST, table, params)
            .await?
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row);
        send_json(request, "postgrest.upsert").await
    }

    #[instrument(skip(self, patch), fields(table = query.table_name()))]
    async fn update(&self, query: &Query, patch: &Value) -> Result<Vec<Value>, SupabaseError> {
        if query.is_empty_selection() {
            return Ok(Vec::new());
        }
        let request = self
            .request(reqwest::Method::PATCH, query.table_name(), query.filter_params())
            .await?
            .header("Prefer", "return=representation")
            .json(patch);
        match send_json(request, "postgrest.update").await? {
            Value::Array(rows) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    #[instrument(skip(self), fields(table = query.table_name()))]
    async fn delete(&self, query: &Query) -> Result<(), SupabaseError> {
        if query.is_empty_selection() {
            return Ok(());
        }
        let request = self
            .request(reqwest::Method::DELETE, query.table_name(), query.filter_params())
            .await?;
        send(request, "postgrest.delete").await?;
        Ok(())
    }

    #[instrument(skip(self), fields(table = query.table_name()))]
    async fn count(&self, query: &Query) -> Result<u64, SupabaseError> {
        if query.is_empty_selection() {
            return Ok(0);
        }
        let mut params = vec![("select".to_owned(), "id".to_owned())];
        params.extend(query.filter_params());
        let request = self
            .request(reqwest::Method::HEAD, query.table_name(), params)
            .await?
            .header("Prefer", "count=exact");
        let response = send(request, "postgrest.count").await?;
        Ok(response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .unwrap_or(0))
    }

    #[instrument(skip(self, args))]
    async fn rpc(&self, function: &str, args: &Value) -> Result<Value, SupabaseError> {
        let request = self
            .request(reqwest::Method::POST, &format!("rpc/{function}"), Vec::new())
            .await?
            .json(args);
        send_json(request, "postgrest.rpc").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn test_key_client_sends_api_key_as_bearer() {
        let client = PostgrestClient::with_key(
            reqwest::Client::new(),
            &Url::parse("https://abc.supabase.co").unwrap(),
            SecretString::from("service-key"),
        )
        .unwrap();
        assert_eq!(client.token().await.unwrap(), "service-key");
        assert_eq!(
            client.rest_url.join("rpc/log_admin_activity").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/rpc/log_admin_activity"
        );
    }

    #[tokio::test]
    async fn test_empty_in_list_short_circuits() {
        let client = PostgrestClient::with_key(
            reqwest::Client::new(),
            // Unroutable: any real request would fail
            &Url::parse("http://127.0.0.1:9").unwrap(),
            SecretString::from("k"),
        )
        .unwrap();
        let query = Query::table("order_items").in_list("order_id", Vec::<String>::new());
        assert!(client.select(&query).await.unwrap().is_empty());
        assert_eq!(client.count(&query).await.unwrap(), 0);
    }
}
