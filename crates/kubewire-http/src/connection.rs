use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use kubewire_types::{Document, Status};

use crate::stream::WatchStream;
use crate::{ClientError, Endpoint, Scope};

const JSON: &str = "application/json";

/// Performs JSON requests against one endpoint.
///
/// Cloning is cheap; clones share the endpoint and the pooled HTTP client, so
/// a connection can serve overlapping calls. No call is ever retried.
#[derive(Clone, Debug)]
pub struct Connection {
    http: reqwest::Client,
    endpoint: Arc<Endpoint>,
}

impl Connection {
    pub fn new(endpoint: Endpoint) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_client(endpoint, http))
    }

    /// Use a preconfigured HTTP client, e.g. one with timeouts
    pub fn with_client(endpoint: Endpoint, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: Arc::new(endpoint),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn namespace(&self) -> &str {
        self.endpoint.namespace()
    }

    pub async fn get(&self, path: &str, scope: &Scope) -> Result<Document, ClientError> {
        let url = self.endpoint.url(scope, path)?;
        let request = self.request(Method::GET, url).header(ACCEPT, JSON);
        let (status, body) = read_body(send(request).await?).await?;
        decode_document(status, &body)
    }

    /// Create `body` under `path`; the response reflects server-assigned fields
    pub async fn post<B>(&self, path: &str, body: &B, scope: &Scope) -> Result<Document, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint.url(scope, path)?;
        let bytes = serde_json::to_vec(body).map_err(ClientError::Encode)?;
        trace!("request body: {}", String::from_utf8_lossy(&bytes));

        let request = self
            .request(Method::POST, url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .body(bytes);
        let (status, body) = read_body(send(request).await?).await?;
        decode_document(status, &body)
    }

    pub async fn delete(&self, path: &str, scope: &Scope) -> Result<Document, ClientError> {
        let url = self.endpoint.url(scope, path)?;
        let request = self.request(Method::DELETE, url).header(ACCEPT, JSON);
        let (status, body) = read_body(send(request).await?).await?;
        decode_document(status, &body)
    }

    /// GET a plain text resource such as pod logs
    pub async fn get_text(
        &self,
        path: &str,
        scope: &Scope,
        query: &[(&str, String)],
    ) -> Result<String, ClientError> {
        let mut url = self.endpoint.url(scope, path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let (status, body) = read_body(send(self.request(Method::GET, url)).await?).await?;
        if !status.is_success() {
            return Err(decode_failure(status, &body));
        }

        String::from_utf8(body.to_vec()).map_err(|err| ClientError::MalformedResponse {
            status: status.as_u16(),
            reason: err.to_string(),
        })
    }

    /// Open a watch on `path`, i.e. `{scope}/watch/{path}`
    pub async fn watch(&self, path: &str, scope: &Scope) -> Result<WatchStream, ClientError> {
        let url = self.endpoint.url(scope, &format!("watch/{}", path))?;
        let response = send(self.request(Method::GET, url).header(ACCEPT, JSON)).await?;

        let status = response.status();
        if !status.is_success() {
            let (status, body) = read_body(response).await?;
            return Err(decode_failure(status, &body));
        }

        debug!("watch established: {}", response.url());
        Ok(WatchStream::new(response))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        let request = self.http.request(method, url);
        match self.endpoint.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
    let response = request.send().await?;
    debug!("response status: {}", response.status());
    Ok(response)
}

async fn read_body(response: Response) -> Result<(StatusCode, Bytes), ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    trace!("response body: {}", String::from_utf8_lossy(&body));
    Ok((status, body))
}

fn decode_document(status: StatusCode, body: &[u8]) -> Result<Document, ClientError> {
    if !status.is_success() {
        return Err(decode_failure(status, body));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(_) => Err(ClientError::MalformedResponse {
            status: status.as_u16(),
            reason: "expected a JSON object".to_string(),
        }),
        Err(err) => Err(ClientError::MalformedResponse {
            status: status.as_u16(),
            reason: err.to_string(),
        }),
    }
}

/// Map a non-success body to the server's Status, or to MalformedResponse
/// when the body is not a Status document
fn decode_failure(status: StatusCode, body: &[u8]) -> ClientError {
    let malformed = |reason: String| ClientError::MalformedResponse {
        status: status.as_u16(),
        reason,
    };

    let document = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(document)) => document,
        Ok(_) => return malformed("expected a Status object".to_string()),
        Err(err) => return malformed(err.to_string()),
    };

    // a Status names its kind or carries at least one Status field
    let is_status = document.get("kind").and_then(Value::as_str) == Some("Status")
        || ["reason", "message", "code"]
            .iter()
            .any(|field| document.contains_key(*field));
    if !is_status {
        return malformed("error body is not a Status".to_string());
    }

    match serde_json::from_value::<Status>(Value::Object(document)) {
        Ok(mut api_status) => {
            if api_status.code == 0 {
                api_status.code = status.as_u16();
            }
            ClientError::Api(api_status)
        }
        Err(err) => malformed(err.to_string()),
    }
}
