//! Reqwest-backed gateway for a PostgREST / Supabase endpoint.
//!
//! This adapter owns transport details only: URL and header construction,
//! timeout and HTTP status mapping, and decoding the JSON body into the
//! `{rows, error}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use super::query::query_pairs;
use crate::domain::ports::{
    DataGateway, GatewayError, GatewayResponse, Record, RemoteErrorBody,
};
use crate::domain::request::{Table, TableRequest};

const DEFAULT_USER_AGENT: &str = "insights-dashboard/0.1";

/// Live gateway issuing one HTTP GET per request.
pub struct PostgrestGateway {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl PostgrestGateway {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let gateway = PostgrestGateway::new(endpoint, "anon-key".to_owned(), timeout)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    fn table_url(&self, table: Table) -> Result<Url, GatewayError> {
        table_url(&self.endpoint, table)
    }
}

#[async_trait]
impl DataGateway for PostgrestGateway {
    async fn execute(&self, request: &TableRequest) -> Result<GatewayResponse, GatewayError> {
        let url = self.table_url(request.table)?;
        let response = self
            .client
            .get(url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query_pairs(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Ok(GatewayResponse::failed(map_status_error(status, body.as_ref())));
        }
        parse_rows(body.as_ref())
    }
}

fn table_url(endpoint: &Url, table: Table) -> Result<Url, GatewayError> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|()| GatewayError::network(format!("endpoint `{endpoint}` cannot carry a path")))?
        .pop_if_empty()
        .extend(["rest", "v1", table.as_str()]);
    Ok(url)
}

fn parse_rows(body: &[u8]) -> Result<GatewayResponse, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GatewayResponse::default());
    }
    let decoded: Value = serde_json::from_slice(body)
        .map_err(|error| GatewayError::decode(format!("invalid JSON payload: {error}")))?;
    match decoded {
        Value::Null => Ok(GatewayResponse::default()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(GatewayError::decode(format!(
                    "expected an object row, got {other}"
                ))),
            })
            .collect::<Result<Vec<Record>, _>>()
            .map(GatewayResponse::ok),
        Value::Object(record) => Ok(GatewayResponse::ok(vec![record])),
        other => Err(GatewayError::decode(format!(
            "expected an array of rows, got {other}"
        ))),
    }
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::network(format!("request timed out: {error}"))
    } else {
        GatewayError::network(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RemoteErrorBody {
    if let Ok(error) = serde_json::from_slice::<RemoteErrorBody>(body) {
        return error;
    }
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };
    RemoteErrorBody {
        code: Some(status.as_u16().to_string()),
        ..RemoteErrorBody::message(message)
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network PostgREST mapping helpers.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("https://project.supabase.co", "https://project.supabase.co/rest/v1/insights")]
    #[case("https://project.supabase.co/", "https://project.supabase.co/rest/v1/insights")]
    #[case("http://localhost:54321/base/", "http://localhost:54321/base/rest/v1/insights")]
    fn table_urls_append_rest_path(#[case] endpoint: &str, #[case] expected: &str) {
        let endpoint = Url::parse(endpoint).expect("valid endpoint");
        let url = table_url(&endpoint, Table::Insights).expect("url builds");
        assert_eq!(url.as_str(), expected);
    }

    #[rstest]
    fn structured_error_body_is_kept_verbatim() {
        let error = map_status_error(
            StatusCode::BAD_REQUEST,
            br#"{"message":"Database error","code":"PGRST100","details":null,"hint":null}"#,
        );
        assert_eq!(error.message, "Database error");
        assert_eq!(error.code.as_deref(), Some("PGRST100"));
    }

    #[rstest]
    #[case(b"<html>\n  Bad   Gateway\n</html>".as_slice(), "status 502: <html> Bad Gateway </html>")]
    #[case(b"".as_slice(), "status 502")]
    fn unstructured_error_falls_back_to_status(#[case] body: &[u8], #[case] expected: &str) {
        let error = map_status_error(StatusCode::BAD_GATEWAY, body);
        assert_eq!(error.message, expected);
        assert_eq!(error.code.as_deref(), Some("502"));
    }

    #[rstest]
    fn long_bodies_are_truncated_in_previews() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.chars().count(), 163);
        assert!(preview.ends_with("..."));
    }

    #[rstest]
    fn row_arrays_decode_into_records() {
        let response = parse_rows(br#"[{"id":"a"},{"id":"b"}]"#).expect("rows decode");
        let rows = response.into_rows().expect("no remote error");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.first().and_then(|row| row.get("id")), Some(&Value::from("a")));
    }

    #[rstest]
    #[case(b"null".as_slice())]
    #[case(b"  ".as_slice())]
    fn null_bodies_are_empty_results(#[case] body: &[u8]) {
        let response = parse_rows(body).expect("body decodes");
        assert_eq!(response.into_rows(), Ok(Vec::new()));
    }

    #[rstest]
    #[case(b"{not json".as_slice())]
    #[case(b"[1, 2]".as_slice())]
    #[case(b"\"rows\"".as_slice())]
    fn malformed_success_bodies_are_decode_errors(#[case] body: &[u8]) {
        let error = parse_rows(body).expect_err("body must fail");
        assert!(matches!(error, GatewayError::Decode { .. }));
    }
}
