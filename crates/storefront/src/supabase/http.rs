//! Shared request plumbing for the GoTrue and PostgREST clients.

use reqwest::{RequestBuilder, Response};
use url::Url;

use super::SupabaseError;

/// Append query parameters to an endpoint URL.
pub(crate) fn with_params<K, V>(mut url: Url, params: impl IntoIterator<Item = (K, V)>) -> Url
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key.as_ref(), value.as_ref());
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    url
}

/// Send a request and return the response if its status is a success.
///
/// Non-success bodies are logged (truncated) and turned into a
/// [`SupabaseError`].
pub(crate) async fn send(request: RequestBuilder, api: &'static str) -> Result<Response, SupabaseError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = SupabaseError::from_response(status.as_u16(), &body);
    if err.is_no_rows() {
        tracing::debug!(api, "no rows returned");
    } else if status.is_server_error() {
        tracing::error!(
            api,
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Supabase returned non-success status"
        );
    } else {
        tracing::debug!(
            api,
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Supabase rejected request"
        );
    }
    Err(err)
}

/// Send a request and read the JSON body (`null` when the body is empty).
pub(crate) async fn send_json(
    request: RequestBuilder,
    api: &'static str,
) -> Result<serde_json::Value, SupabaseError> {
    let text = send(request, api).await?.text().await?;
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            api,
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse Supabase response"
        );
        SupabaseError::Parse(e)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_with_params_encodes_values() {
        let url = Url::parse("https://abc.supabase.co/rest/v1/products").unwrap();
        let url = with_params(url, [("select", "*,category:categories(name)"), ("id", "eq.1")]);
        assert_eq!(
            url.as_str(),
            "https://abc.supabase.co/rest/v1/products?select=*%2Ccategory%3Acategories%28name%29&id=eq.1"
        );
    }

    #[test]
    fn test_with_no_params_leaves_no_question_mark() {
        let url = Url::parse("https://abc.supabase.co/auth/v1/logout").unwrap();
        let url = with_params(url, std::iter::empty::<(&str, &str)>());
        assert_eq!(url.as_str(), "https://abc.supabase.co/auth/v1/logout");
    }
}
