use crate::http::cursor::BufferView;
use crate::http::parser::{
    DEFAULT_MAX_HEADER_BYTES, HeaderBlockParser, HeaderObserver, ParseError, ParseStatus,
    parse_request_line,
};
use crate::http::request::{Method, PathStorage};

/// Parse progress of the request currently arriving on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Waiting for a complete request line.
    #[default]
    StartLine,
    /// Request line seen, waiting for the blank line that ends the headers.
    Headers,
    /// A full request is ready for dispatch.
    Body,
}

/// Per-connection protocol state.
///
/// Lives for the whole connection. `method` and `path` describe the current
/// request and are only meaningful while the state is [`ConnectionState::Body`].
#[derive(Debug)]
pub struct RequestContext {
    state: ConnectionState,
    method: Method,
    path: PathStorage,
    headers: HeaderBlockParser,
    max_request_line: usize,
}

impl RequestContext {
    pub fn new(max_header_bytes: usize) -> Self {
        Self {
            state: ConnectionState::StartLine,
            method: Method::default(),
            path: PathStorage::new(),
            headers: HeaderBlockParser::new(max_header_bytes),
            max_request_line: max_header_bytes,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &[u8] {
        self.path.as_bytes()
    }

    pub fn path_storage(&self) -> &PathStorage {
        &self.path
    }

    /// Whether a full request is waiting for dispatch.
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Body
    }

    /// Whether a request has started but not finished arriving.
    pub fn is_mid_request(&self) -> bool {
        self.state == ConnectionState::Headers
    }

    /// Runs the parsers over `view` until a request is ready or input runs out.
    ///
    /// The request line and the header block are parsed in one call when both
    /// are buffered. Once [`is_ready`](Self::is_ready) returns true, further
    /// calls are no-ops until [`finish_request`](Self::finish_request).
    pub fn advance<O>(
        &mut self,
        view: &mut BufferView<'_>,
        observer: &mut O,
    ) -> Result<ParseStatus<()>, ParseError>
    where
        O: HeaderObserver + ?Sized,
    {
        if self.state == ConnectionState::StartLine {
            match parse_request_line(view)? {
                ParseStatus::Complete(line) => {
                    self.method = line.method;
                    self.path.set(line.path);
                    self.state = ConnectionState::Headers;
                }
                ParseStatus::Incomplete if view.remaining().len() > self.max_request_line => {
                    return Err(ParseError::RequestLineTooLong {
                        limit: self.max_request_line,
                    });
                }
                ParseStatus::Incomplete => return Ok(ParseStatus::Incomplete),
            }
        }

        if self.state == ConnectionState::Headers {
            match self.headers.parse(view, observer)? {
                ParseStatus::Complete(()) => self.state = ConnectionState::Body,
                ParseStatus::Incomplete => return Ok(ParseStatus::Incomplete),
            }
        }

        Ok(ParseStatus::Complete(()))
    }

    /// Resets to [`ConnectionState::StartLine`] after the response went out.
    ///
    /// Storage is cleared, not released.
    pub fn finish_request(&mut self) {
        self.path.clear();
        self.headers.reset();
        self.method = Method::default();
        self.state = ConnectionState::StartLine;
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES)
    }
}
