use std::collections::BTreeMap;

use miette::Diagnostic;
use miette::NamedSource;
use miette::SourceSpan;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use serde_json::Value;
use thiserror::Error;

use crate::compare::SequenceMatch;
use crate::parser::SpecEntry;
use crate::parser::SpecFile;
use crate::spec::Method;
use crate::spec::Spec;

// Error messages for parsing URLs
const BASE_URL_ENDS_WITH: &str =
    "The base URL from setup can't end with a /, and each spec endpoint must start with one";
const ENDPOINT_MISSING_SLASH: &str = "The endpoint of a spec is required to begin with a leading /.";

pub struct Validator {
    spec_file: SpecFile,
    toml_src: String,
    file_name: String,
}

/// Everything the HTTP suite needs besides the specs.
#[derive(Debug, Clone)]
pub struct HttpSetup {
    pub name: String,
    pub base_url: String,
    pub sequences: SequenceMatch,
    pub global_headers: HeaderMap,
    pub actors: BTreeMap<String, HeaderMap>,
}

pub struct ValidatedSpecs {
    pub setup: HttpSetup,
    pub specs: Vec<Spec<String>>,
}

#[derive(Debug, Error, Diagnostic)]
#[error("Invalid field `{field}`: {message}")]
pub struct ValidationError {
    pub(crate) field: String,
    pub(crate) message: String,
    #[source_code]
    pub(crate) src: Option<NamedSource<String>>,
    #[label("invalid value here")]
    pub(crate) span: Option<SourceSpan>,
}

macro_rules! validation_err {
    ($field:expr, $msg:expr, $self:expr, $span:expr) => {
        ValidationError {
            field: $field.to_string(),
            message: $msg.to_string(),
            src: Some(NamedSource::new(
                $self.file_name.clone(),
                $self.toml_src.clone(),
            )),
            span: $span,
        }
    };
}

impl Validator {
    pub fn new(spec_file: &SpecFile, toml_src: &str, file_name: &str) -> Self {
        Self {
            spec_file: spec_file.clone(),
            toml_src: toml_src.into(),
            file_name: file_name.into(),
        }
    }

    pub fn validate(&self) -> miette::Result<ValidatedSpecs, ValidationError> {
        let setup = self.validate_setup()?;

        let specs = self
            .spec_file
            .specs
            .iter()
            .enumerate()
            .map(|(index, entry)| self.create_spec(index, entry, &setup))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(ValidatedSpecs { setup, specs })
    }

    fn validate_setup(&self) -> Result<HttpSetup, ValidationError> {
        let setup = &self.spec_file.setup;

        if setup.base_url.ends_with('/') {
            return Err(validation_err!(
                "setup.base_url",
                BASE_URL_ENDS_WITH,
                self,
                find_span(&setup.base_url, &self.toml_src, 0)
            ));
        }

        Url::parse(&setup.base_url).map_err(|e| {
            validation_err!(
                "setup.base_url",
                format!("Failed to parse URL: {e}"),
                self,
                find_span(&setup.base_url, &self.toml_src, 0)
            )
        })?;

        let global_headers = match &self.spec_file.global.headers {
            Some(value) => {
                self.parse_headers("global.headers", value, self.table_start("[global]"))?
            }
            None => HeaderMap::new(),
        };

        let actors = self
            .spec_file
            .actors
            .iter()
            .map(|(name, actor)| {
                let headers = match &actor.headers {
                    Some(value) => self.parse_headers(
                        &format!("actors.{name}.headers"),
                        value,
                        self.table_start(&format!("[actors.{name}]")),
                    )?,
                    None => HeaderMap::new(),
                };
                Ok((name.clone(), headers))
            })
            .collect::<Result<BTreeMap<_, _>, ValidationError>>()?;

        let sequences = if setup.strict_sequences.unwrap_or(false) {
            SequenceMatch::Strict
        } else {
            SequenceMatch::Truncate
        };

        Ok(HttpSetup {
            name: setup.name.clone().unwrap_or_else(|| self.file_name.clone()),
            base_url: setup.base_url.clone(),
            sequences,
            global_headers,
            actors,
        })
    }

    /// Parses a table of header names to string values. `scope` names the
    /// table in errors, `from` is where its section starts in the source.
    fn parse_headers(
        &self,
        scope: &str,
        value: &toml::Value,
        from: usize,
    ) -> Result<HeaderMap, ValidationError> {
        let table = value.as_table().ok_or_else(|| {
            validation_err!(
                scope,
                format!("Expected a table for headers, got {value}"),
                self,
                None
            )
        })?;

        let mut headers = HeaderMap::new();

        for (key, value) in table {
            let field = format!("{scope}.{key}");
            let key_span = find_raw_span(key, &self.toml_src, from);

            let text = value.as_str().ok_or_else(|| {
                validation_err!(
                    field,
                    format!("Header value must be a string, got {value}"),
                    self,
                    key_span
                )
            })?;

            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                validation_err!(
                    field,
                    format!("Invalid header name `{key}`: {e}"),
                    self,
                    key_span
                )
            })?;

            let header_value = HeaderValue::from_str(text).map_err(|e| {
                validation_err!(
                    field,
                    format!("Invalid header value for `{key}`: {e}"),
                    self,
                    find_span(text, &self.toml_src, from)
                )
            })?;

            headers.insert(name, header_value);
        }

        Ok(headers)
    }

    fn create_spec(
        &self,
        index: usize,
        entry: &SpecEntry,
        setup: &HttpSetup,
    ) -> Result<Spec<String>, ValidationError> {
        let title = entry.title.clone().unwrap_or_else(|| index.to_string());
        let section = self.spec_start(index);

        let method = entry.method.parse::<Method>().map_err(|e| {
            validation_err!(
                format!("{title} - method"),
                e,
                self,
                find_span(&entry.method, &self.toml_src, section)
            )
        })?;

        let expected_status = parse_status(entry.expected_status).map_err(|message| {
            validation_err!(
                format!("{title} - expected_status"),
                message,
                self,
                find_raw_span(
                    &entry.expected_status.to_string(),
                    &self.toml_src,
                    self.key_start("expected_status", section)
                )
            )
        })?;

        parse_url(&setup.base_url, &entry.endpoint).map_err(|e| match e {
            ParseUrlError::EndpointMissingSlash => validation_err!(
                format!("{title} - endpoint"),
                ENDPOINT_MISSING_SLASH,
                self,
                find_span(&entry.endpoint, &self.toml_src, section)
            ),
            ParseUrlError::ParseIntoUrlFailed(parse_error) => validation_err!(
                format!("{title} - endpoint"),
                format!("Failed to parse URL: {parse_error}"),
                self,
                find_span(&entry.endpoint, &self.toml_src, section)
            ),
        })?;

        if let Some(actors) = &entry.actors {
            for actor in actors {
                if !setup.actors.contains_key(actor) {
                    return Err(validation_err!(
                        format!("{title} - actors"),
                        format!("Actor `{actor}` is not declared under [actors]"),
                        self,
                        find_span(actor, &self.toml_src, section)
                    ));
                }
            }
        }

        if let Some(payload) = &entry.request_payload {
            let Some(fields) = payload.as_object() else {
                return Err(validation_err!(
                    format!("{title} - request_payload"),
                    format!("Expected a table for the request payload, got {payload}"),
                    self,
                    None
                ));
            };

            // Sent as a query string, which only holds flat key/value pairs.
            if !method.sends_body()
                && let Some((key, _)) = fields
                    .iter()
                    .find(|(_, value)| !is_query_scalar(value))
            {
                return Err(validation_err!(
                    format!("{title} - request_payload"),
                    format!(
                        "The payload of a {method} spec is sent as query parameters, \
                         so `{key}` must be a string, number or boolean"
                    ),
                    self,
                    find_raw_span(
                        key,
                        &self.toml_src,
                        self.key_start("request_payload", section)
                    )
                ));
            }
        }

        Ok(Spec {
            title: entry.title.clone(),
            endpoint: entry.endpoint.clone(),
            method,
            expected_status,
            actors: entry.actors.clone(),
            expected_response: entry.expected_response.clone(),
            request_payload: entry.request_payload.clone(),
        })
    }

    /// Offset of a `[table]` header, or 0 when the table is written inline.
    fn table_start(&self, header: &str) -> usize {
        self.toml_src.find(header).unwrap_or(0)
    }

    /// Offset of the `[[specs]]` header of the spec at `index`.
    fn spec_start(&self, index: usize) -> usize {
        self.toml_src
            .match_indices("[[specs]]")
            .nth(index)
            .map_or(0, |(start, _)| start)
    }

    /// Offset of the first `key` at or after `from`, or `from` itself.
    fn key_start(&self, key: &str, from: usize) -> usize {
        self.toml_src
            .get(from..)
            .and_then(|rest| rest.find(key))
            .map_or(from, |start| from + start)
    }
}

fn is_query_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn parse_status(status: i64) -> Result<u16, String> {
    let code = u16::try_from(status).map_err(|_| format!("Invalid status code: {status}"))?;
    StatusCode::from_u16(code).map_err(|e| format!("Invalid status code {status}: {e}"))?;

    Ok(code)
}

#[derive(Debug, Error)]
pub(crate) enum ParseUrlError {
    #[error("endpoint must start with a /")]
    EndpointMissingSlash,
    #[error("Failed to parse URL: {0}")]
    ParseIntoUrlFailed(#[from] url::ParseError),
}

/// Joins `base_url` and `endpoint` the way requests are sent.
pub(crate) fn parse_url(base_url: &str, endpoint: &str) -> Result<Url, ParseUrlError> {
    if !endpoint.starts_with('/') {
        return Err(ParseUrlError::EndpointMissingSlash);
    }

    let url = Url::parse(&format!("{base_url}{endpoint}"))?;

    Ok(url)
}

/// Span of a quoted string value, searching from byte offset `from`.
fn find_span(needle: &str, toml_src: &str, from: usize) -> Option<SourceSpan> {
    let pattern = format!("\"{needle}\"");
    let start = from + toml_src.get(from..)?.find(&pattern)?;
    Some(SourceSpan::new((start + 1).into(), needle.len()))
}

fn find_raw_span(needle: &str, toml_src: &str, from: usize) -> Option<SourceSpan> {
    let start = from + toml_src.get(from..)?.find(needle)?;
    Some(SourceSpan::new(start.into(), needle.len()))
}


#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use reqwest::header::ACCEPT;
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;

    use super::ValidatedSpecs;
    use super::ValidationError;
    use super::Validator;
    use crate::compare::SequenceMatch;
    use crate::parser::SpecFile;
    use crate::spec::Method;

    fn validate(src: &str) -> Result<ValidatedSpecs, ValidationError> {
        let file: SpecFile = toml::from_str(src).unwrap();
        Validator::new(&file, src, "api_specs.toml").validate()
    }

    const HEADER: &str = r#"
        [setup]
        base_url = "http://localhost:3000"

        [actors.alice]
        headers = { authorization = "Bearer alice" }
    "#;

    fn with_spec(spec: &str) -> String {
        format!("{HEADER}\n[[specs]]\n{spec}")
    }

    #[test]
    fn valid_file_becomes_typed_specs() {
        let src = with_spec(
            r#"
            title = "list users"
            endpoint = "/users"
            method = "GET"
            expected_status = 200
            actors = ["alice"]
            expected_response = { count = 2 }
            "#,
        );

        let validated = validate(&src).unwrap();

        assert_eq!(validated.setup.name, "api_specs.toml");
        assert_eq!(validated.setup.sequences, SequenceMatch::Truncate);
        assert_eq!(
            validated.setup.actors["alice"][AUTHORIZATION],
            "Bearer alice"
        );
        let spec = &validated.specs[0];
        assert_eq!(spec.title.as_deref(), Some("list users"));
        assert_eq!(spec.method, Method::Get);
        assert_eq!(spec.expected_status, 200);
        assert_eq!(spec.actor_list(), &["alice".to_string()]);
        assert_eq!(spec.expected_response, Some(json!({ "count": 2 })));
    }

    #[test]
    fn unsupported_method_names_spec_and_method() {
        let src = with_spec(
            r#"
            title = "trace users"
            endpoint = "/users"
            method = "trace"
            expected_status = 200
            actors = ["alice"]
            "#,
        );

        let err = validate(&src).err().unwrap();

        assert_eq!(err.field, "trace users - method");
        assert!(err.message.contains("unsupported method `trace`"));
        assert!(err.span.is_some());
    }

    #[test]
    fn untitled_spec_is_named_by_position_in_errors() {
        let src = with_spec(
            r#"
            endpoint = "/users"
            method = "head"
            expected_status = 200
            "#,
        );

        let err = validate(&src).err().unwrap();
        assert_eq!(err.field, "0 - method");
    }

    #[test]
    fn invalid_status_is_rejected() {
        let src = with_spec(
            r#"
            endpoint = "/users"
            method = "get"
            expected_status = 70000
            "#,
        );

        let err = validate(&src).err().unwrap();
        assert_eq!(err.field, "0 - expected_status");
    }

    #[test]
    fn endpoint_needs_leading_slash() {
        let src = with_spec(
            r#"
            endpoint = "users"
            method = "get"
            expected_status = 200
            "#,
        );

        let err = validate(&src).err().unwrap();
        assert_eq!(err.field, "0 - endpoint");
    }

    #[test]
    fn base_url_cannot_end_with_slash() {
        let src = r#"
            [setup]
            base_url = "http://localhost:3000/"
        "#;

        let err = validate(src).err().unwrap();
        assert_eq!(err.field, "setup.base_url");
    }

    #[test]
    fn unknown_actor_is_rejected() {
        let src = with_spec(
            r#"
            endpoint = "/users"
            method = "get"
            expected_status = 200
            actors = ["mallory"]
            "#,
        );

        let err = validate(&src).err().unwrap();
        assert!(err.message.contains("`mallory`"));
    }

    #[test]
    fn payload_must_be_a_table() {
        let src = with_spec(
            r#"
            endpoint = "/users"
            method = "post"
            expected_status = 201
            request_payload = [1, 2]
            "#,
        );

        let err = validate(&src).err().unwrap();
        assert_eq!(err.field, "0 - request_payload");
    }

    #[test]
    fn get_payload_must_be_flat() {
        let src = with_spec(
            r#"
            endpoint = "/users"
            method = "get"
            expected_status = 200
            request_payload = { page = 2, filter = { name = "alice" } }
            "#,
        );

        let err = validate(&src).err().unwrap();

        assert_eq!(err.field, "0 - request_payload");
        assert!(err.message.contains("`filter`"));
        let span = err.span.unwrap();
        assert_eq!(span.offset(), src.find("filter =").unwrap());
    }

    #[test]
    fn nested_payload_is_allowed_as_a_body() {
        let src = with_spec(
            r#"
            endpoint = "/users"
            method = "post"
            expected_status = 201
            request_payload = { name = "carol", roles = ["admin"], address = { city = "Oslo" } }
            "#,
        );

        let validated = validate(&src).unwrap();
        assert_eq!(
            validated.specs[0].request_payload,
            Some(json!({ "name": "carol", "roles": ["admin"], "address": { "city": "Oslo" } }))
        );
    }

    #[test]
    fn status_span_points_into_its_own_spec() {
        // `30` also occurs in the base url's port.
        let src = with_spec(
            r#"
            endpoint = "/users"
            method = "get"
            expected_status = 30
            "#,
        );

        let err = validate(&src).err().unwrap();

        assert_eq!(err.field, "0 - expected_status");
        let span = err.span.unwrap();
        assert_eq!(
            span.offset(),
            src.find("expected_status = 30").unwrap() + "expected_status = ".len()
        );
        assert_eq!(span.len(), 2);
    }

    #[test]
    fn spans_are_searched_within_the_failing_spec() {
        let src = format!(
            "{HEADER}\n{}",
            r#"
            [[specs]]
            endpoint = "/users"
            method = "get"
            expected_status = 200

            [[specs]]
            endpoint = "/users"
            method = "trace"
            expected_status = 200
            "#
        );

        let err = validate(&src).err().unwrap();

        assert_eq!(err.field, "1 - method");
        assert_eq!(err.span.unwrap().offset(), src.find("\"trace\"").unwrap() + 1);
    }

    #[test]
    fn headers_are_parsed_per_scope() {
        let src = r#"
            [setup]
            base_url = "http://localhost:3000"

            [global]
            headers = { accept = "application/json" }

            [actors.alice]
            headers = { authorization = "Bearer alice", accept = "text/plain" }

            [actors.anonymous]
        "#;

        let setup = validate(src).unwrap().setup;

        assert_eq!(setup.global_headers.len(), 1);
        assert_eq!(setup.global_headers[ACCEPT], "application/json");
        assert_eq!(setup.actors["alice"][AUTHORIZATION], "Bearer alice");
        assert_eq!(setup.actors["alice"][ACCEPT], "text/plain");
        assert!(setup.actors["anonymous"].is_empty());
    }

    #[test]
    fn header_errors_name_the_owning_actor() {
        let src = r#"
            [setup]
            base_url = "http://localhost:3000"

            [actors.alice]
            headers = { x-retries = "1" }

            [actors.bob]
            headers = { x-retries = 3 }
        "#;

        let err = validate(src).err().unwrap();

        assert_eq!(err.field, "actors.bob.headers.x-retries");
        assert!(err.message.contains("must be a string"));
        assert_eq!(
            err.span.unwrap().offset(),
            src.find("x-retries = 3").unwrap()
        );
    }

    #[test]
    fn invalid_global_header_name_is_rejected() {
        let src = r#"
            [setup]
            base_url = "http://localhost:3000"

            [global]
            headers = { "bad header" = "x" }
        "#;

        let err = validate(src).err().unwrap();

        assert_eq!(err.field, "global.headers.bad header");
        assert!(err.message.contains("Invalid header name"));
    }

    #[test]
    fn headers_must_be_a_table() {
        let src = r#"
            [setup]
            base_url = "http://localhost:3000"

            [actors.alice]
            headers = "nope"
        "#;

        let err = validate(src).err().unwrap();
        assert_eq!(err.field, "actors.alice.headers");
    }

    #[test]
    fn strict_sequences_from_setup() {
        let src = r#"
            [setup]
            base_url = "http://localhost:3000"
            name = "users"
            strict_sequences = true
        "#;

        let validated = validate(src).unwrap();
        assert_eq!(validated.setup.sequences, SequenceMatch::Strict);
        assert_eq!(validated.setup.name, "users");
    }

    #[test]
    fn demo_spec_file_is_valid() {
        let validated = validate(include_str!("../demos/api_specs.toml")).unwrap();

        assert_eq!(validated.setup.name, "users api");
        assert_eq!(validated.setup.actors.len(), 3);
        assert_eq!(validated.specs.len(), 5);
        assert_eq!(validated.specs[4].title, None);
        assert!(validated.specs[4].actor_list().is_empty());
    }

    #[test]
    fn parse_url_joins_base_and_endpoint() {
        let url = super::parse_url("http://localhost:3000", "/users?page=2").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/users?page=2");
        assert!(super::parse_url("http://localhost:3000", "users").is_err());
    }
}
