use crate::config::Config;
use crate::error::{FoodReportError, Result};
use crate::query::SelectQuery;
use crate::store::{Binding, KnowledgeStore, QueryError, Row, RowSet};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// SPARQL 1.1 JSON results document
#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<HashMap<String, RawTerm>>,
}

/// A single bound value as it appears on the wire
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawTerm {
    Uri {
        value: String,
    },
    Literal {
        value: String,
        #[serde(default)]
        datatype: Option<String>,
        #[serde(default, rename = "xml:lang")]
        lang: Option<String>,
    },
    /// SPARQL XML-era servers still emit this for typed literals
    TypedLiteral {
        value: String,
        datatype: String,
    },
    Bnode {
        value: String,
    },
}

impl From<RawTerm> for Binding {
    fn from(raw: RawTerm) -> Self {
        match raw {
            RawTerm::Uri { value } => Binding::Uri(value),
            RawTerm::Literal { value, datatype, lang } => Binding::Literal { value, datatype, lang },
            RawTerm::TypedLiteral { value, datatype } => Binding::Literal {
                value,
                datatype: Some(datatype),
                lang: None,
            },
            RawTerm::Bnode { value } => Binding::BlankNode(value),
        }
    }
}

/// Decode a SPARQL JSON results body into rows, preserving row order.
pub fn parse_results(body: &str) -> std::result::Result<RowSet, QueryError> {
    let response: SparqlResponse = serde_json::from_str(body)
        .map_err(|e| QueryError::InvalidResponse(format!("Failed to parse SPARQL results: {}", e)))?;

    Ok(response
        .results
        .bindings
        .into_iter()
        .map(|solution| {
            let mut row = Row::new();
            for (var, term) in solution {
                row.insert(&var, term.into());
            }
            row
        })
        .collect())
}

/// SPARQL protocol client
///
/// Sends queries as form-encoded POSTs and retries transient failures
/// (429, 5xx, network errors) with exponential backoff.
pub struct SparqlClient {
    client: Client,
    endpoint: String,
    credentials: Option<(String, String)>,
    max_retries: usize,
    retry_delay: Duration,
}

impl SparqlClient {
    /// Create a client for `endpoint`
    ///
    /// # Arguments
    ///
    /// * `endpoint` - SPARQL query endpoint URL
    /// * `timeout` - Per-request timeout
    /// * `max_retries` - Retry attempts for transient failures
    pub fn new(endpoint: &str, timeout: Duration, max_retries: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FoodReportError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            credentials: None,
            max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Create a client from the `[store]` section, including basic auth.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Self::new(&config.store.endpoint, config.store_timeout(), config.store.max_retries)?;
        Ok(match config.store_credentials() {
            Some((username, password)) => client.with_basic_auth(username, password),
            None => client,
        })
    }

    pub fn with_basic_auth(mut self, username: String, password: String) -> Self {
        self.credentials = Some((username, password));
        self
    }

    /// Initial backoff; doubles after every retry.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one query without retrying
    async fn execute(&self, query_text: &str) -> std::result::Result<RowSet, QueryError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query_text)]);

        if let Some((ref username, ref password)) = self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                QueryError::Timeout(e.to_string())
            } else {
                QueryError::Transport(format!("Network error: {}", e))
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            if status.as_u16() == 400 {
                return Err(QueryError::Syntax(body));
            }
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Transport(format!("Failed to read response: {}", e)))?;

        parse_results(&body)
    }
}

#[async_trait]
impl KnowledgeStore for SparqlClient {
    async fn select(&self, query: &SelectQuery) -> std::result::Result<RowSet, QueryError> {
        let query_text = query.to_sparql();
        let start = std::time::Instant::now();
        let mut attempt = 0;
        let mut delay = self.retry_delay;

        loop {
            match self.execute(&query_text).await {
                Ok(rows) => {
                    log::debug!(
                        "SPARQL query returned {} rows in {:?} (attempt {})",
                        rows.len(),
                        start.elapsed(),
                        attempt + 1
                    );
                    return Ok(rows);
                }
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    log::warn!("Retry {}/{} after error: {}", attempt + 1, self.max_retries, e);
                    tokio::time::sleep(delay).await;
                    delay *= 2; // Exponential backoff
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{EntityRef, Term};
    use mockito::Matcher;

    const RESULTS: &str = r#"{
  "head": { "vars": ["ingredient", "name", "amount"] },
  "results": {
    "bindings": [
      {
        "ingredient": { "type": "uri", "value": "http://www.foodreport.be/data#Tomato" },
        "name": { "type": "literal", "value": "Tomato", "xml:lang": "en" },
        "amount": { "type": "literal", "value": "3", "datatype": "http://www.w3.org/2001/XMLSchema#integer" }
      },
      {
        "ingredient": { "type": "uri", "value": "http://www.foodreport.be/data#Beef" },
        "name": { "type": "typed-literal", "value": "Beef", "datatype": "http://www.w3.org/2001/XMLSchema#string" }
      },
      {
        "ingredient": { "type": "bnode", "value": "b0" }
      }
    ]
  }
}"#;

    fn query() -> SelectQuery {
        SelectQuery::new()
            .prefix("ontology", "http://www.foodreport.be/ontology#")
            .select("ingredient")
            .triple(
                Term::var("recipe"),
                EntityRef::in_namespace("ontology", "http://www.foodreport.be/ontology#", "needsIngredient"),
                Term::var("ingredient"),
            )
    }

    fn client(endpoint: &str, retries: usize) -> SparqlClient {
        SparqlClient::new(endpoint, Duration::from_secs(5), retries)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    #[test]
    fn test_parse_results_keeps_order_and_types() {
        let rows = parse_results(RESULTS).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("ingredient"), Some(&Binding::uri("http://www.foodreport.be/data#Tomato")));
        assert_eq!(
            rows[0].get("name"),
            Some(&Binding::Literal {
                value: "Tomato".to_string(),
                datatype: None,
                lang: Some("en".to_string()),
            })
        );
        assert_eq!(rows[0].get("amount").and_then(Binding::as_number), Some(3.0));
        assert_eq!(rows[1].text("name"), Some("Beef"));
        assert_eq!(rows[1].text("amount"), None);
        assert_eq!(rows[2].get("ingredient"), Some(&Binding::BlankNode("b0".to_string())));
    }

    #[test]
    fn test_parse_results_empty_bindings() {
        let rows = parse_results(r#"{"head":{"vars":["x"]},"results":{"bindings":[]}}"#).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_results_rejects_garbage() {
        let err = parse_results("<html>Fuseki is starting</html>").unwrap_err();
        assert!(matches!(err, QueryError::InvalidResponse(_)));
        // ASK responses carry no bindings
        assert!(parse_results(r#"{"head":{},"boolean":true}"#).is_err());
    }

    #[tokio::test]
    async fn test_select_posts_form_encoded_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/foodreport/sparql")
            .match_header("accept", SPARQL_RESULTS_JSON)
            .match_body(Matcher::UrlEncoded("query".into(), query().to_sparql()))
            .with_status(200)
            .with_header("content-type", SPARQL_RESULTS_JSON)
            .with_body(RESULTS)
            .create_async()
            .await;

        let endpoint = format!("{}/foodreport/sparql", server.url());
        let rows = client(&endpoint, 0).select(&query()).await.unwrap();
        assert_eq!(rows.len(), 3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_select_sends_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sparql")
            // "admin:pw" base64-encoded
            .match_header("authorization", "Basic YWRtaW46cHc=")
            .with_status(200)
            .with_body(RESULTS)
            .create_async()
            .await;

        let endpoint = format!("{}/sparql", server.url());
        let store = client(&endpoint, 0).with_basic_auth("admin".to_string(), "pw".to_string());
        assert!(store.select(&query()).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_request_is_syntax_error_and_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sparql")
            .with_status(400)
            .with_body("Parse error: Encountered \" \".\" \". \"\" at line 5")
            .expect(1)
            .create_async()
            .await;

        let endpoint = format!("{}/sparql", server.url());
        let err = client(&endpoint, 3).select(&query()).await.unwrap_err();
        assert!(matches!(err, QueryError::Syntax(ref body) if body.contains("Parse error")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/sparql")
            .with_status(503)
            .with_body("Service Unavailable")
            .expect(3)
            .create_async()
            .await;

        let endpoint = format!("{}/sparql", server.url());
        let err = client(&endpoint, 2).select(&query()).await.unwrap_err();
        assert_eq!(
            err,
            QueryError::Status {
                status: 503,
                body: "Service Unavailable".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_body_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/sparql")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let endpoint = format!("{}/sparql", server.url());
        let err = client(&endpoint, 2).select(&query()).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        // Port 9 (discard) is not listening on test machines.
        let err = client("http://127.0.0.1:9/sparql", 0)
            .select(&query())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Transport(_) | QueryError::Timeout(_)));
    }

    #[test]
    fn test_from_config_uses_store_section() {
        let config = Config::default();
        let store = SparqlClient::from_config(&config).unwrap();
        assert_eq!(store.endpoint(), "http://localhost:8080/fuseki/foodreport/sparql");
        assert_eq!(store.max_retries, 2);
        assert!(store.credentials.is_none());
    }
}
