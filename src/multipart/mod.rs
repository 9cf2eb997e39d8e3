//! Multipart (`multipart/x-mixed-replace`) image stream parsing
//!
//! Camera firmware serves its motion stream as one endless HTTP body made of parts:
//!
//! ```text
//! --<token>\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: 1234\r\n
//! \r\n
//! <jpeg bytes>\r\n
//! --<token>\r\n
//! ...
//! ```
//!
//! The token comes from the `boundary=` parameter of the response `Content-Type`.
//! [`BoundaryScanner`] turns arbitrarily chunked body bytes into [`ImageFrame`]s.
//!
//! [`ImageFrame`]: crate::types::ImageFrame

mod scanner;

pub use scanner::BoundaryScanner;

/// Token used when the response does not advertise one.
pub const DEFAULT_BOUNDARY: &str = "frame";

/// Extract the boundary token from a `Content-Type` header value.
///
/// Takes the text after `boundary=` up to the next `;` (or the end), trims
/// whitespace and surrounding quotes. Falls back to [`DEFAULT_BOUNDARY`] when the
/// parameter is missing or empty. The parameter name is matched case-sensitively.
pub fn boundary_from_content_type(content_type: &str) -> String {
    const PARAM: &str = "boundary=";

    content_type
        .find(PARAM)
        .map(|idx| {
            let rest = &content_type[idx + PARAM.len()..];
            let value = rest.split(';').next().unwrap_or_default();
            value.trim().trim_matches('"').trim()
        })
        .filter(|token| !token.is_empty())
        .unwrap_or(DEFAULT_BOUNDARY)
        .to_string()
}
