//! Share links
//!
//! ```text
//! https://<origin>/f/<objectId>#key=<urlencoded secret>
//! ```
//!
//! The object id rides in the path and may show up in access logs. The
//! secret rides in the fragment, which clients never send to a server.

use secrecy::{ExposeSecret, SecretString};
use url::{form_urlencoded, Url};
use veil_core::{ObjectId, VeilError, VeilResult};

/// Path segment preceding the object id
pub const LOCATOR_PATH: &str = "f";

/// Fragment key carrying the secret
pub const SECRET_PARAM: &str = "key";

/// A parsed share link. Never persisted.
#[derive(Debug)]
pub struct ShareLocator {
    pub object_id: ObjectId,
    pub secret: SecretString,
}

impl ShareLocator {
    pub fn new(object_id: ObjectId, secret: SecretString) -> Self {
        Self { object_id, secret }
    }

    /// Render the share link under `base_origin`.
    pub fn build(&self, base_origin: &str) -> VeilResult<String> {
        validate_object_id(self.object_id.as_str())?;
        if self.secret.expose_secret().is_empty() {
            return Err(invalid("secret must not be empty"));
        }

        let mut url =
            Url::parse(base_origin).map_err(|e| invalid(format!("bad base origin {base_origin:?}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("base origin {base_origin:?} cannot carry a path")))?
            .pop_if_empty()
            .push(LOCATOR_PATH)
            .push(self.object_id.as_str());

        let fragment = form_urlencoded::Serializer::new(String::new())
            .append_pair(SECRET_PARAM, self.secret.expose_secret())
            .finish();
        url.set_fragment(Some(&fragment));

        Ok(url.into())
    }

    /// Parse a share link: the last path segment is the object id and the
    /// fragment must carry a non-empty `key` entry.
    pub fn parse(link: &str) -> VeilResult<Self> {
        let url = Url::parse(link.trim()).map_err(|e| invalid(format!("not a URL: {e}")))?;

        let object_id = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .ok_or_else(|| invalid("missing object id in path"))?;
        validate_object_id(object_id)?;

        let fragment = url
            .fragment()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| invalid("missing #key= fragment"))?;
        let secret = form_urlencoded::parse(fragment.as_bytes())
            .find(|(k, _)| k == SECRET_PARAM)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| invalid("fragment has no key entry"))?;

        Ok(Self {
            object_id: ObjectId::new(object_id),
            secret: SecretString::from(secret),
        })
    }
}

/// Strip the fragment so a link can be logged.
pub fn redact(link: &str) -> String {
    match link.split_once('#') {
        Some((base, _)) => format!("{base}#[REDACTED]"),
        None => link.to_string(),
    }
}

/// Object ids are emitted verbatim as a path segment, so only URL
/// unreserved characters are accepted.
fn validate_object_id(id: &str) -> VeilResult<()> {
    if id.is_empty() {
        return Err(invalid("object id is empty"));
    }
    if !id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
    {
        return Err(invalid(format!("object id {id:?} contains reserved characters")));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> VeilError {
    VeilError::InvalidLocator(msg.into())
}
