use reqwest::Client;
use reqwest::Response;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::compare::SequenceMatch;
use crate::spec::Spec;
use crate::suite::CallError;
use crate::suite::EndpointResponse;
use crate::suite::SpecSuite;
use crate::validator::HttpSetup;
use crate::validator::ValidatedSpecs;
use crate::validator::parse_url;

/// Calls specs over HTTP. Actors are names of header sets (usually
/// credentials) declared in the spec file.
pub struct HttpSuite {
    client: Client,
    setup: HttpSetup,
    specs: Vec<Spec<String>>,
}

impl HttpSuite {
    pub fn new(validated: ValidatedSpecs) -> Self {
        Self::with_client(Client::new(), validated)
    }

    pub fn with_client(client: Client, validated: ValidatedSpecs) -> Self {
        let ValidatedSpecs { setup, specs } = validated;

        Self {
            client,
            setup,
            specs,
        }
    }

    pub fn set_sequence_match(&mut self, sequences: SequenceMatch) {
        self.setup.sequences = sequences;
    }

    /// Global headers, with the actor's own headers taking precedence.
    fn headers_for(&self, actor: &str) -> Result<HeaderMap, CallError> {
        let actor_headers = self
            .setup
            .actors
            .get(actor)
            .ok_or_else(|| CallError(format!("unknown actor `{actor}`")))?;

        let mut headers = self.setup.global_headers.clone();
        for (key, value) in actor_headers {
            headers.insert(key, value.clone());
        }

        Ok(headers)
    }

    async fn send(&self, spec: &Spec<String>, actor: &str) -> Result<EndpointResponse, CallError> {
        let url = parse_url(&self.setup.base_url, &spec.endpoint)
            .map_err(|e| CallError(e.to_string()))?;
        let headers = self.headers_for(actor)?;

        let request = self
            .client
            .request(spec.method.into(), url)
            .headers(headers);

        let request = match &spec.request_payload {
            Some(payload) if spec.method.sends_body() => request.json(payload),
            Some(payload) => request.query(payload),
            None => request,
        };

        let response = request.send().await?;

        Ok(CapturedResponse::from_response(response).await?.into())
    }
}

impl SpecSuite for HttpSuite {
    type Actor = String;

    fn name(&self) -> &str {
        &self.setup.name
    }

    fn sequence_match(&self) -> SequenceMatch {
        self.setup.sequences
    }

    fn specs(&self) -> Vec<Spec<String>> {
        self.specs.clone()
    }

    fn call_endpoint(
        &self,
        spec: &Spec<String>,
        actor: &String,
    ) -> impl Future<Output = Result<EndpointResponse, CallError>> + Send {
        self.send(spec, actor)
    }
}

#[derive(Debug)]
pub struct CapturedResponse {
    pub status: u16,
    pub body_text: String,
    pub body_json: Option<Value>,
}

impl CapturedResponse {
    pub async fn from_response(resp: Response) -> Result<Self, reqwest::Error> {
        let status = resp.status().as_u16();
        let body_text = resp.text().await?;
        let body_json = serde_json::from_str::<Value>(&body_text).ok();

        Ok(Self {
            status,
            body_text,
            body_json,
        })
    }
}

impl From<CapturedResponse> for EndpointResponse {
    /// Non-JSON bodies are compared as a JSON string; an empty body as `null`.
    fn from(captured: CapturedResponse) -> Self {
        let body = match captured.body_json {
            Some(json) => json,
            None if captured.body_text.is_empty() => Value::Null,
            None => Value::String(captured.body_text),
        };

        EndpointResponse::new(captured.status, body)
    }
}
