//! URI Construction
//!
//! Base URL + subpath joining, query encoding and origin comparison.

use url::form_urlencoded;
use url::Url;

use crate::error::{ConfigurationError, RestError, RestResult};
use crate::types::QueryValue;

/// Join a base URL and a subpath with exactly one `/`.
///
/// An empty subpath (or a lone `/`) yields the base URL unchanged.
pub fn join_path(base_url: &str, subpath: &str) -> String {
    if subpath.is_empty() || subpath == "/" {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        subpath.trim_start_matches('/')
    )
}

/// Encode ordered query parameters.
///
/// List values render as repeated parameters, with a `[]` key suffix for
/// [`QueryValue::BracketList`].
pub fn encode_query(query: &[(String, QueryValue)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        match value {
            QueryValue::Single(v) => {
                serializer.append_pair(key, v);
            }
            QueryValue::List(values) => {
                for v in values {
                    serializer.append_pair(key, v);
                }
            }
            QueryValue::BracketList(values) => {
                let key = format!("{}[]", key);
                for v in values {
                    serializer.append_pair(&key, v);
                }
            }
        }
    }
    serializer.finish()
}

/// Build the final request URL.
pub fn build_url(base_url: &str, subpath: &str, query: &[(String, QueryValue)]) -> String {
    let mut url = join_path(base_url, subpath);
    let encoded = encode_query(query);
    if !encoded.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&encoded);
    }
    url
}

/// Parse an absolute URL, mapping failures to a configuration error.
pub fn parse_url(url: &str) -> RestResult<Url> {
    Url::parse(url).map_err(|e| {
        RestError::Configuration(ConfigurationError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })
    })
}

/// `scheme://host[:port]` of a URL, without trailing slash.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
