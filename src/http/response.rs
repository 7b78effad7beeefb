use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::http::date::DateSnapshot;
use crate::http::request::Method;

const STATUS_LINE_OK: &[u8] = b"HTTP/1.1 200 OK\r\n";
const SERVER_HEADER: &[u8] = b"Server: Custom\r\n";
const CONTENT_TYPE: &[u8] = b"Content-Type: ";
const CONTENT_LENGTH: &[u8] = b"Content-Length: ";
const CRLF: &[u8] = b"\r\n";

pub const PLAINTEXT_BODY: &[u8] = b"Hello, World!";

/// Body of the `/json` route.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub const HELLO_MESSAGE: Message = Message {
    message: "Hello, World!",
};

/// The canned responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Plaintext,
    Json,
    /// Empty 200 for every other path and every non-GET request.
    Default,
}

impl Route {
    /// Picks a route by path prefix. Only GET requests are routed.
    ///
    /// ```
    /// # use rawbench::http::request::Method;
    /// # use rawbench::http::response::Route;
    /// assert_eq!(Route::select(Method::Get, b"/plaintext"), Route::Plaintext);
    /// assert_eq!(Route::select(Method::Get, b"/json"), Route::Json);
    /// assert_eq!(Route::select(Method::Post, b"/json"), Route::Default);
    /// assert_eq!(Route::select(Method::Get, b"/"), Route::Default);
    /// ```
    pub fn select(method: Method, path: &[u8]) -> Self {
        if method != Method::Get {
            return Route::Default;
        }

        if path.starts_with(b"/plaintext") {
            Route::Plaintext
        } else if path.starts_with(b"/json") {
            Route::Json
        } else {
            Route::Default
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    TextPlain,
    ApplicationJson,
}

impl ContentType {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            ContentType::TextPlain => b"text/plain",
            ContentType::ApplicationJson => b"application/json",
        }
    }
}

/// Reusable response header state.
///
/// Set per response, written in wire order, then reset for the next request.
/// `Server` and `Date` are always written.
#[derive(Debug, Default)]
pub struct ResponseHeaders {
    content_type: Option<ContentType>,
    content_length: usize,
}

impl ResponseHeaders {
    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = Some(content_type);
    }

    pub fn set_content_length(&mut self, len: usize) {
        self.content_length = len;
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.content_type
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Appends every header line plus the blank line ending the head.
    pub fn write_to(&self, date: &DateSnapshot, out: &mut BytesMut) {
        out.put_slice(SERVER_HEADER);
        out.put_slice(date.header_line());

        if let Some(content_type) = self.content_type {
            out.put_slice(CONTENT_TYPE);
            out.put_slice(content_type.as_bytes());
            out.put_slice(CRLF);
        }

        out.put_slice(CONTENT_LENGTH);
        out.put_slice(itoa::Buffer::new().format(self.content_length).as_bytes());
        out.put_slice(CRLF);

        out.put_slice(CRLF);
    }

    pub fn reset(&mut self) {
        self.content_type = None;
        self.content_length = 0;
    }
}

/// Writes canned responses straight into a connection's output buffer.
///
/// Owns the per-connection scratch: header state and the JSON body buffer,
/// both reused across requests.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    headers: ResponseHeaders,
    json: Vec<u8>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(
        &mut self,
        route: Route,
        date: &DateSnapshot,
        out: &mut BytesMut,
    ) -> Result<(), serde_json::Error> {
        let body: &[u8] = match route {
            Route::Plaintext => {
                self.headers.set_content_type(ContentType::TextPlain);
                PLAINTEXT_BODY
            }
            Route::Json => {
                self.json.clear();
                serde_json::to_writer(&mut self.json, &HELLO_MESSAGE)?;
                self.headers.set_content_type(ContentType::ApplicationJson);
                &self.json
            }
            Route::Default => &[],
        };
        self.headers.set_content_length(body.len());

        out.put_slice(STATUS_LINE_OK);
        self.headers.write_to(date, out);
        out.put_slice(body);

        self.headers.reset();
        Ok(())
    }
}
