//! Request/response pairs handed over by the session-handling host.

use bytes::Bytes;

/// Read access to a captured HTTP exchange.
pub trait HttpExchange {
    /// Raw request bytes.
    fn request(&self) -> &[u8];

    /// Raw response bytes, when the exchange received one.
    fn response(&self) -> Option<&[u8]>;
}

/// An exchange whose request can be replaced before it is sent.
pub trait MutableExchange: HttpExchange {
    fn set_request(&mut self, request: Vec<u8>);
}

/// A recorded request with its optional response (one macro step, or the
/// in-flight base request).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedExchange {
    request: Bytes,
    response: Option<Bytes>,
}

impl RecordedExchange {
    pub fn new(request: impl Into<Bytes>) -> Self {
        Self {
            request: request.into(),
            response: None,
        }
    }

    pub fn with_response(mut self, response: impl Into<Bytes>) -> Self {
        self.response = Some(response.into());
        self
    }
}

impl HttpExchange for RecordedExchange {
    fn request(&self) -> &[u8] {
        &self.request
    }

    fn response(&self) -> Option<&[u8]> {
        self.response.as_deref()
    }
}

impl MutableExchange for RecordedExchange {
    fn set_request(&mut self, request: Vec<u8>) {
        self.request = Bytes::from(request);
    }
}
