use thiserror::Error;

use crate::http::cursor::BufferView;
use crate::http::request::{Method, RequestLine, Version};

/// Default bound on the size of a request's header block.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8192;

/// Grammar violations. Each one is fatal to the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed request line: {0}")]
    RequestLine(&'static str),
    #[error("malformed header line: {0}")]
    Header(&'static str),
    #[error("request line exceeds {limit} bytes")]
    RequestLineTooLong { limit: usize },
    #[error("header block exceeds {limit} bytes")]
    HeadersTooLarge { limit: usize },
}

/// Outcome of a parse step that did not hit a grammar violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus<T> {
    /// More input is needed; nothing was consumed.
    Incomplete,
    Complete(T),
}

impl<T> ParseStatus<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, ParseStatus::Complete(_))
    }
}

/// Parses `<METHOD> SP <TARGET> SP <VERSION> CRLF` from the front of `view`.
///
/// On success the line, CRLF included, is consumed and the returned slices
/// borrow the view's buffer.
pub fn parse_request_line<'a>(
    view: &mut BufferView<'a>,
) -> Result<ParseStatus<RequestLine<'a>>, ParseError> {
    let Some(lf) = view.find_line_end() else {
        return Ok(ParseStatus::Incomplete);
    };

    let line = match view.remaining()[..lf].split_last() {
        Some((b'\r', line)) => line,
        _ => return Err(ParseError::RequestLine("line not terminated by CRLF")),
    };

    let request_line = split_request_line(line)?;
    view.consume(lf + 1);
    Ok(ParseStatus::Complete(request_line))
}

fn split_request_line(line: &[u8]) -> Result<RequestLine<'_>, ParseError> {
    let method_end = line
        .iter()
        .position(|&b| b == b' ')
        .ok_or(ParseError::RequestLine("missing space after method"))?;
    let method = &line[..method_end];
    if method.is_empty() {
        return Err(ParseError::RequestLine("empty method"));
    }
    if !method.iter().all(|&b| is_token(b)) {
        return Err(ParseError::RequestLine("invalid method token"));
    }

    let rest = &line[method_end + 1..];
    let target_end = rest
        .iter()
        .position(|&b| b == b' ')
        .ok_or(ParseError::RequestLine("missing space after request target"))?;
    let target = &rest[..target_end];
    if target.is_empty() {
        return Err(ParseError::RequestLine("empty request target"));
    }
    if target.iter().any(|&b| b < 0x21 || b == 0x7f) {
        return Err(ParseError::RequestLine("invalid byte in request target"));
    }

    let version = Version::from_bytes(&rest[target_end + 1..])
        .ok_or(ParseError::RequestLine("unsupported protocol version"))?;

    let (path, query) = match target.iter().position(|&b| b == b'?') {
        Some(q) => (&target[..q], Some(&target[q + 1..])),
        None => (target, None),
    };

    Ok(RequestLine {
        method: Method::from_bytes(method),
        path,
        query,
        version,
    })
}

/// Receives every header line of a request, exactly once.
pub trait HeaderObserver {
    fn on_header(&mut self, name: &[u8], value: &[u8]);
}

/// Observer that drops every header.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreHeaders;

impl HeaderObserver for IgnoreHeaders {
    #[inline]
    fn on_header(&mut self, _name: &[u8], _value: &[u8]) {}
}

impl<F> HeaderObserver for F
where
    F: FnMut(&[u8], &[u8]),
{
    fn on_header(&mut self, name: &[u8], value: &[u8]) {
        self(name, value)
    }
}

/// Incremental header block parser.
///
/// Complete lines are handed to the observer and consumed as soon as they are
/// seen; the parser only remembers how many header bytes it has accepted so
/// far, to enforce the size bound across reads.
#[derive(Debug)]
pub struct HeaderBlockParser {
    limit: usize,
    seen: usize,
}

impl HeaderBlockParser {
    pub fn new(limit: usize) -> Self {
        Self { limit, seen: 0 }
    }

    /// Header bytes consumed for the current request.
    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn reset(&mut self) {
        self.seen = 0;
    }

    pub fn parse<O>(
        &mut self,
        view: &mut BufferView<'_>,
        observer: &mut O,
    ) -> Result<ParseStatus<()>, ParseError>
    where
        O: HeaderObserver + ?Sized,
    {
        loop {
            let Some(lf) = view.find_line_end() else {
                if self.seen + view.remaining().len() > self.limit {
                    return Err(ParseError::HeadersTooLarge { limit: self.limit });
                }
                return Ok(ParseStatus::Incomplete);
            };

            let line_len = lf + 1;
            if self.seen + line_len > self.limit {
                return Err(ParseError::HeadersTooLarge { limit: self.limit });
            }

            let line = match view.remaining()[..lf].split_last() {
                Some((b'\r', line)) => line,
                _ => return Err(ParseError::Header("line not terminated by CRLF")),
            };

            if line.is_empty() {
                view.consume(line_len);
                self.seen += line_len;
                return Ok(ParseStatus::Complete(()));
            }

            let (name, value) = split_header_line(line)?;
            observer.on_header(name, value);
            view.consume(line_len);
            self.seen += line_len;
        }
    }
}

impl Default for HeaderBlockParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES)
    }
}

fn split_header_line(line: &[u8]) -> Result<(&[u8], &[u8]), ParseError> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(ParseError::Header("missing colon"))?;

    let name = &line[..colon];
    if name.is_empty() {
        return Err(ParseError::Header("empty header name"));
    }
    if !name.iter().all(|&b| is_token(b)) {
        return Err(ParseError::Header("invalid header name"));
    }

    Ok((name, trim_ows(&line[colon + 1..])))
}

fn trim_ows(mut value: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }
    value
}

// RFC 7230 tchar
fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}
