use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct ContentUrl(String);

crate::impl_string_newtype!(ContentUrl);

impl ContentUrl {
    pub fn to_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.0)
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Deref, From, Into, AsRef,
)]
#[serde(transparent)]
pub struct AccessKey(String);

crate::impl_string_newtype!(AccessKey);

/// Picks the single URL the screen surface loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSource {
    pub default_url: ContentUrl,
    pub access_key: Option<AccessKey>,
}

impl ScreenSource {
    pub fn new(default_url: ContentUrl, access_key: Option<AccessKey>) -> Self {
        Self {
            default_url,
            access_key,
        }
    }

    /// The active cartridge's content if one is inserted, otherwise the
    /// default page. Either way the access key rides along as `key=`.
    pub fn url_for(&self, active_content: Option<&ContentUrl>) -> Result<Url, url::ParseError> {
        let mut url = active_content.unwrap_or(&self.default_url).to_url()?;
        if let Some(key) = self.access_key.as_ref().filter(|k| !k.is_empty()) {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }
}
