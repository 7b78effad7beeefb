/// Maximum path length kept in a connection's inline scratch buffer.
pub const INLINE_PATH_CAPACITY: usize = 256;

/// HTTP request methods.
///
/// Only `Get` is routed; every other verb still parses and gets the default
/// response. Tokens outside the standard table become `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// GET - Retrieve a resource
    Get,
    /// HEAD - Like GET but without the response body
    Head,
    /// POST - Create or submit data
    Post,
    /// PUT - Replace a resource
    Put,
    /// DELETE - Delete a resource
    Delete,
    /// OPTIONS - Describe communication options
    Options,
    /// PATCH - Partial modification of a resource
    Patch,
    /// TRACE - Message loop-back test
    Trace,
    /// CONNECT - Establish a tunnel
    Connect,
    /// Any other syntactically valid method token
    #[default]
    Other,
}

impl Method {
    /// Maps a method token to a known method (case-sensitive).
    ///
    /// ```
    /// # use rawbench::http::request::Method;
    /// assert_eq!(Method::from_bytes(b"GET"), Method::Get);
    /// assert_eq!(Method::from_bytes(b"get"), Method::Other);
    /// assert_eq!(Method::from_bytes(b"PURGE"), Method::Other);
    /// ```
    pub fn from_bytes(token: &[u8]) -> Self {
        match token {
            b"GET" => Method::Get,
            b"HEAD" => Method::Head,
            b"POST" => Method::Post,
            b"PUT" => Method::Put,
            b"DELETE" => Method::Delete,
            b"OPTIONS" => Method::Options,
            b"PATCH" => Method::Patch,
            b"TRACE" => Method::Trace,
            b"CONNECT" => Method::Connect,
            _ => Method::Other,
        }
    }
}

/// Protocol version from the request line.
///
/// `HTTP/1.0` is accepted alongside `HTTP/1.1` so old clients and load tools
/// still get an answer, but nothing else about 1.0 is honoured: the response
/// is always an HTTP/1.1 one and the connection stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn from_bytes(token: &[u8]) -> Option<Self> {
        match token {
            b"HTTP/1.1" => Some(Version::Http11),
            b"HTTP/1.0" => Some(Version::Http10),
            _ => None,
        }
    }
}

/// A parsed request line borrowing the connection's input buffer.
///
/// The slices are only valid until the input buffer is advanced, so anything
/// that must outlive the parse step is copied into [`PathStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: Method,
    /// Request target up to (not including) the first `?`.
    pub path: &'a [u8],
    /// Bytes after the first `?`, if any.
    pub query: Option<&'a [u8]>,
    pub version: Version,
}

/// Per-connection path storage.
///
/// Paths up to [`INLINE_PATH_CAPACITY`] bytes are copied into a fixed buffer
/// that lives as long as the connection; longer ones get an owned copy.
pub struct PathStorage {
    inline: [u8; INLINE_PATH_CAPACITY],
    len: usize,
    owned: Option<Vec<u8>>,
}

impl PathStorage {
    pub fn new() -> Self {
        Self {
            inline: [0; INLINE_PATH_CAPACITY],
            len: 0,
            owned: None,
        }
    }

    pub fn set(&mut self, path: &[u8]) {
        if path.len() <= INLINE_PATH_CAPACITY {
            self.inline[..path.len()].copy_from_slice(path);
            self.len = path.len();
            self.owned = None;
        } else {
            self.len = 0;
            self.owned = Some(path.to_vec());
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.owned {
            Some(owned) => owned,
            None => &self.inline[..self.len],
        }
    }

    /// Whether the current path lives in the inline buffer.
    pub fn is_inline(&self) -> bool {
        self.owned.is_none()
    }

    /// Forgets the current path. The inline buffer is kept for reuse.
    pub fn clear(&mut self) {
        self.len = 0;
        self.owned = None;
    }
}

impl Default for PathStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PathStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathStorage")
            .field("path", &String::from_utf8_lossy(self.as_bytes()))
            .field("inline", &self.is_inline())
            .finish()
    }
}
