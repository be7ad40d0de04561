//! Raw HTTP message helpers.
//!
//! Session-handling hosts hand over requests and responses as raw bytes and
//! expose a small helper surface for reading and rewriting parameters. The
//! [`MessageHelpers`] trait captures that surface; [`RawMessageHelpers`] is a
//! self-contained implementation over HTTP/1.x bytes.
//!
//! Parameter names and values are kept exactly as they appear on the wire.
//! Rewriting a request only touches the bytes of the parameter being updated
//! (plus `Content-Length` when the body changes).

use http::Method;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HeaderName, TRANSFER_ENCODING};
use thiserror::Error;

use super::types::{Parameter, ParameterType};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Host capabilities the request updater relies on.
pub trait MessageHelpers: Send + Sync {
    /// All parameters of a raw request, in source order.
    fn parameters(&self, request: &[u8]) -> Result<Vec<Parameter>, MessageError>;

    /// Build a parameter in the host's representation.
    fn build_parameter(&self, name: &str, value: &str, kind: ParameterType) -> Parameter {
        Parameter::new(name, value, kind)
    }

    /// Return a copy of `request` with `parameter` replaced, or added when no
    /// parameter with the same name and type exists.
    fn update_parameter(
        &self,
        request: &[u8],
        parameter: &Parameter,
    ) -> Result<Vec<u8>, MessageError>;

    /// Body of a raw response as text.
    fn response_body(&self, response: &[u8]) -> String;
}

/// Failures while reading or rewriting a raw request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("request is empty")]
    Empty,
    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),
    #[error("invalid request method: {0}")]
    InvalidMethod(String),
    #[error("request {0} is not valid UTF-8")]
    InvalidEncoding(&'static str),
    #[error("unsupported body content type: {0}")]
    UnsupportedBody(String),
    #[error("chunked request bodies cannot be rewritten")]
    ChunkedBody,
}

/// [`MessageHelpers`] over raw HTTP/1.x bytes.
///
/// Understands query-string, cookie, and url-encoded form body parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawMessageHelpers;

impl RawMessageHelpers {
    pub fn new() -> Self {
        Self
    }
}

impl MessageHelpers for RawMessageHelpers {
    fn parameters(&self, request: &[u8]) -> Result<Vec<Parameter>, MessageError> {
        let request = RawRequest::parse(request)?;
        let mut parameters = Vec::new();

        if let Some(query) = request.query() {
            parameters.extend(
                FORM_PAIRS
                    .pairs(query)
                    .map(|(name, value)| Parameter::new(name, value, ParameterType::Url)),
            );
        }

        for line in request.headers_named(&COOKIE) {
            let Some((_, value)) = line.split_once(':') else {
                continue;
            };
            parameters.extend(
                COOKIE_PAIRS
                    .pairs(value)
                    .map(|(name, value)| Parameter::new(name, value, ParameterType::Cookie)),
            );
        }

        if request.has_form_body() {
            let body = request.body_str()?;
            parameters.extend(
                FORM_PAIRS
                    .pairs(body)
                    .map(|(name, value)| Parameter::new(name, value, ParameterType::Body)),
            );
        }

        Ok(parameters)
    }

    fn update_parameter(
        &self,
        request: &[u8],
        parameter: &Parameter,
    ) -> Result<Vec<u8>, MessageError> {
        let mut request = RawRequest::parse(request)?;
        match parameter.kind {
            ParameterType::Url => request.upsert_query(parameter),
            ParameterType::Cookie => request.upsert_cookie(parameter),
            ParameterType::Body => request.upsert_body(parameter)?,
        }
        Ok(request.to_bytes())
    }

    fn response_body(&self, response: &[u8]) -> String {
        let body = match find_head_end(response) {
            Some((position, separator)) => &response[position + separator.len()..],
            None => &[][..],
        };
        String::from_utf8_lossy(body).into_owned()
    }
}

/// Delimiter conventions of a `name=value` list.
struct PairSyntax {
    delimiter: char,
    joiner: &'static str,
    trim: bool,
}

const FORM_PAIRS: PairSyntax = PairSyntax {
    delimiter: '&',
    joiner: "&",
    trim: false,
};

const COOKIE_PAIRS: PairSyntax = PairSyntax {
    delimiter: ';',
    joiner: "; ",
    trim: true,
};

impl PairSyntax {
    fn segment<'a>(&self, raw: &'a str) -> &'a str {
        if self.trim { raw.trim() } else { raw }
    }

    fn pairs<'a>(&'a self, source: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        source
            .split(self.delimiter)
            .map(|raw| self.segment(raw))
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.split_once('=').unwrap_or((segment, "")))
    }

    /// Replace the first pair called `name`, or append one. Every other byte
    /// of `source` is kept.
    fn upsert(&self, source: &str, name: &str, value: &str) -> String {
        let mut replaced = false;
        let mut segments = Vec::new();

        for raw in source.split(self.delimiter) {
            let segment = self.segment(raw);
            let segment_name = segment.split_once('=').map_or(segment, |(name, _)| name);
            if !replaced && !segment.is_empty() && segment_name == name {
                let leading = &raw[..raw.len() - raw.trim_start().len()];
                segments.push(format!("{leading}{name}={value}"));
                replaced = true;
            } else {
                segments.push(raw.to_string());
            }
        }

        let delimiter = self.delimiter.to_string();
        let mut rebuilt = segments.join(delimiter.as_str());
        if !replaced {
            if let Some(head) = rebuilt.trim_end().strip_suffix(self.delimiter) {
                let kept = head.len();
                rebuilt.truncate(kept);
            }
            if !rebuilt.trim().is_empty() {
                rebuilt.push_str(self.joiner);
            }
            rebuilt.push_str(name);
            rebuilt.push('=');
            rebuilt.push_str(value);
        }
        rebuilt
    }
}

/// A request split into the parts the helpers edit.
struct RawRequest {
    line_ending: &'static str,
    separator: String,
    request_line: String,
    headers: Vec<String>,
    body: Vec<u8>,
}

impl RawRequest {
    fn parse(message: &[u8]) -> Result<Self, MessageError> {
        if message.is_empty() {
            return Err(MessageError::Empty);
        }

        let (head, separator, body) = match find_head_end(message) {
            Some((position, separator)) => (
                &message[..position],
                separator,
                &message[position + separator.len()..],
            ),
            None => (message, "", &[][..]),
        };

        let head = std::str::from_utf8(head).map_err(|_| MessageError::InvalidEncoding("head"))?;
        let line_ending = if separator.starts_with("\r\n") || (separator.is_empty() && head.contains("\r\n")) {
            "\r\n"
        } else {
            "\n"
        };

        let mut lines = head.split(line_ending);
        let request_line = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or(MessageError::Empty)?;

        let (method, rest) = request_line
            .split_once(' ')
            .ok_or_else(|| MessageError::MalformedRequestLine(request_line.to_string()))?;
        if rest.trim().is_empty() {
            return Err(MessageError::MalformedRequestLine(request_line.to_string()));
        }
        Method::from_bytes(method.as_bytes())
            .map_err(|_| MessageError::InvalidMethod(method.to_string()))?;

        Ok(Self {
            line_ending,
            separator: separator.to_string(),
            request_line: request_line.to_string(),
            headers: lines.map(str::to_string).collect(),
            body: body.to_vec(),
        })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.request_line.len() + self.body.len() + 256);
        out.extend_from_slice(self.request_line.as_bytes());
        for header in &self.headers {
            out.extend_from_slice(self.line_ending.as_bytes());
            out.extend_from_slice(header.as_bytes());
        }
        out.extend_from_slice(self.separator.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    fn target_span(&self) -> (usize, usize) {
        let line = &self.request_line;
        let start = line.find(' ').map_or(line.len(), |i| i + 1);
        let end = line[start..].find(' ').map_or(line.len(), |i| start + i);
        (start, end)
    }

    fn target(&self) -> &str {
        let (start, end) = self.target_span();
        &self.request_line[start..end]
    }

    fn query(&self) -> Option<&str> {
        self.target().split_once('?').map(|(_, query)| query)
    }

    fn upsert_query(&mut self, parameter: &Parameter) {
        let target = match self.target().split_once('?') {
            Some((path, query)) => format!(
                "{path}?{}",
                FORM_PAIRS.upsert(query, &parameter.name, &parameter.value)
            ),
            None => format!("{}?{}={}", self.target(), parameter.name, parameter.value),
        };
        let (start, end) = self.target_span();
        self.request_line.replace_range(start..end, &target);
    }

    fn upsert_cookie(&mut self, parameter: &Parameter) {
        let existing = self.header_positions(&COOKIE).into_iter().find(|&index| {
            self.headers[index]
                .split_once(':')
                .is_some_and(|(_, value)| {
                    COOKIE_PAIRS
                        .pairs(value)
                        .any(|(name, _)| name == parameter.name)
                })
        });

        // Without a matching cookie the pair goes into the first Cookie header.
        let target = existing.or_else(|| self.header_positions(&COOKIE).first().copied());
        match target {
            Some(index) => {
                let line = &self.headers[index];
                let (name, value) = line.split_once(':').unwrap_or((line.as_str(), ""));
                let value = COOKIE_PAIRS.upsert(value, &parameter.name, &parameter.value);
                let value = if value.starts_with(' ') { value } else { format!(" {value}") };
                let rebuilt = format!("{name}:{value}");
                self.headers[index] = rebuilt;
            }
            None => self
                .headers
                .push(format!("Cookie: {}={}", parameter.name, parameter.value)),
        }
    }

    fn upsert_body(&mut self, parameter: &Parameter) -> Result<(), MessageError> {
        if self
            .header_value(&TRANSFER_ENCODING)
            .is_some_and(|value| value.to_ascii_lowercase().contains("chunked"))
        {
            return Err(MessageError::ChunkedBody);
        }

        let content_type = self.header_value(&CONTENT_TYPE).map(str::to_string);
        match content_type.as_deref() {
            Some(content_type) if !is_form_content_type(content_type) => {
                return Err(MessageError::UnsupportedBody(content_type.to_string()));
            }
            Some(_) => {}
            None if self.body.is_empty() => {
                self.headers.push(format!("Content-Type: {FORM_URLENCODED}"));
            }
            None => return Err(MessageError::UnsupportedBody("unspecified".into())),
        }

        let body = FORM_PAIRS.upsert(self.body_str()?, &parameter.name, &parameter.value);
        self.body = body.into_bytes();
        if self.separator.is_empty() {
            self.separator = self.line_ending.repeat(2);
        }
        self.set_content_length();
        Ok(())
    }

    fn set_content_length(&mut self) {
        let length = self.body.len();
        match self.header_positions(&CONTENT_LENGTH).first() {
            Some(&index) => {
                let line = &self.headers[index];
                let name = line.split_once(':').map_or(line.as_str(), |(name, _)| name);
                let rebuilt = format!("{name}: {length}");
                self.headers[index] = rebuilt;
            }
            None => self.headers.push(format!("Content-Length: {length}")),
        }
    }

    fn has_form_body(&self) -> bool {
        self.header_value(&CONTENT_TYPE)
            .is_some_and(is_form_content_type)
    }

    fn body_str(&self) -> Result<&str, MessageError> {
        std::str::from_utf8(&self.body).map_err(|_| MessageError::InvalidEncoding("body"))
    }

    fn header_positions(&self, name: &HeaderName) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, line)| header_name_matches(line, name))
            .map(|(index, _)| index)
            .collect()
    }

    fn headers_named<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |line| header_name_matches(line, name))
            .map(String::as_str)
    }

    fn header_value(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|line| header_name_matches(line, name))
            .and_then(|line| line.split_once(':'))
            .map(|(_, value)| value.trim())
    }
}

fn header_name_matches(line: &str, name: &HeaderName) -> bool {
    line.split_once(':')
        .is_some_and(|(candidate, _)| candidate.trim().eq_ignore_ascii_case(name.as_str()))
}

fn is_form_content_type(value: &str) -> bool {
    value.trim().to_ascii_lowercase().starts_with(FORM_URLENCODED)
}

/// Offset and spelling of the blank line that ends the header block.
fn find_head_end(message: &[u8]) -> Option<(usize, &'static str)> {
    let crlf = find_subslice(message, b"\r\n\r\n");
    let lf = find_subslice(message, b"\n\n");
    match (crlf, lf) {
        (Some(crlf), Some(lf)) if lf < crlf => Some((lf, "\n\n")),
        (Some(crlf), _) => Some((crlf, "\r\n\r\n")),
        (None, Some(lf)) => Some((lf, "\n\n")),
        (None, None) => None,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
