//! Items exchanged with `op`.
//!
//! [`TemplateItem`] is what item creation needs from an item. [`NewItem`]
//! is a template-built item ready to create, and [`Item`] is what
//! `op get item` returns.

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempPath};

use crate::error::OpError;
use crate::Result;

/// An item that can be handed to `op create item`.
pub trait TemplateItem {
    /// Whether this item was produced from a category template.
    fn is_from_template(&self) -> bool;

    /// Category name passed to `op create item` (e.g. `Login`).
    fn category(&self) -> &str;

    /// First URL of the item, if it has any.
    fn first_url(&self) -> Option<&str>;

    /// JSON template body written to the template file.
    fn template_json(&self) -> Result<String>;

    /// Write the template to an owner-only temporary file.
    ///
    /// The file is removed when the returned path is dropped.
    fn write_secure_tempfile(&self) -> Result<TempPath> {
        let body = self.template_json()?;
        let mut file = NamedTempFile::new()?;
        file.write_all(body.as_bytes())?;
        file.flush()?;
        Ok(file.into_temp_path())
    }
}

/// A URL attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUrl {
    #[serde(rename = "l", default)]
    pub label: String,
    #[serde(rename = "u")]
    pub url: String,
}

/// A new item built from a category template.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    category: String,
    details: Value,
    urls: Vec<ItemUrl>,
}

impl NewItem {
    /// Create an item of `category` with a raw details template.
    pub fn from_template(category: impl Into<String>, details: Value) -> Self {
        Self {
            category: category.into(),
            details,
            urls: Vec::new(),
        }
    }

    /// Create a login item.
    pub fn login(username: &str, password: &str) -> Self {
        let details = json!({
            "fields": [
                {"designation": "username", "name": "username", "type": "T", "value": username},
                {"designation": "password", "name": "password", "type": "P", "value": password},
            ],
            "notesPlain": "",
            "passwordHistory": [],
            "sections": [],
        });
        Self::from_template("Login", details)
    }

    /// Attach a URL. Only the first one reaches `op`.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(ItemUrl {
            label: "website".to_string(),
            url: url.into(),
        });
        self
    }

    pub fn urls(&self) -> &[ItemUrl] {
        &self.urls
    }
}

impl TemplateItem for NewItem {
    fn is_from_template(&self) -> bool {
        true
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn first_url(&self) -> Option<&str> {
        self.urls.first().map(|u| u.url.as_str())
    }

    fn template_json(&self) -> Result<String> {
        serde_json::to_string(&self.details).map_err(|e| OpError::decode("item template", e))
    }
}

/// Overview section of a fetched item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemOverview {
    pub title: String,
    pub url: Option<String>,
    #[serde(rename = "URLs")]
    pub urls: Vec<ItemUrl>,
    pub tags: Vec<String>,
}

/// An item as returned by `op get item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub uuid: String,
    #[serde(default)]
    pub template_uuid: Option<String>,
    #[serde(default)]
    pub vault_uuid: Option<String>,
    #[serde(default)]
    pub overview: ItemOverview,
    #[serde(default)]
    pub details: Value,
}

impl Item {
    /// Parse `op get item` output.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| OpError::decode("item JSON", e))
    }

    pub fn title(&self) -> &str {
        &self.overview.title
    }

    /// Value of the field with the given designation (`username`, `password`).
    pub fn field_by_designation(&self, designation: &str) -> Option<&str> {
        self.details
            .get("fields")?
            .as_array()?
            .iter()
            .find(|f| f.get("designation").and_then(Value::as_str) == Some(designation))?
            .get("value")?
            .as_str()
    }

    pub fn username(&self) -> Option<&str> {
        self.field_by_designation("username")
    }

    /// Login password field, falling back to the top-level password of
    /// password-category items.
    pub fn password(&self) -> Option<&str> {
        self.field_by_designation("password")
            .or_else(|| self.details.get("password").and_then(Value::as_str))
    }

    /// File name of a document item.
    pub fn document_filename(&self) -> Option<&str> {
        self.details
            .get("documentAttributes")?
            .get("fileName")?
            .as_str()
    }
}

impl TemplateItem for Item {
    fn is_from_template(&self) -> bool {
        false
    }

    fn category(&self) -> &str {
        self.template_uuid.as_deref().unwrap_or_default()
    }

    fn first_url(&self) -> Option<&str> {
        self.overview
            .urls
            .first()
            .map(|u| u.url.as_str())
            .or(self.overview.url.as_deref())
    }

    fn template_json(&self) -> Result<String> {
        serde_json::to_string(&self.details).map_err(|e| OpError::decode("item details", e))
    }
}

/// Summary entry from `op list items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub uuid: String,
    #[serde(default)]
    pub template_uuid: Option<String>,
    #[serde(default)]
    pub vault_uuid: Option<String>,
    #[serde(default)]
    pub overview: ItemOverview,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_JSON: &str = r#"{
        "uuid": "nok7367v4vbsfgg2fczwu4ei44",
        "templateUuid": "001",
        "vaultUuid": "yhdg6ovhkjcfhn3u25cp2bnl6e",
        "details": {
            "fields": [
                {"designation": "username", "name": "username", "type": "T", "value": "janedoe"},
                {"designation": "password", "name": "password", "type": "P", "value": "doth-parrot-hid-tussock-veldt"}
            ]
        },
        "overview": {
            "title": "Example Login 1",
            "url": "https://example.com",
            "URLs": [{"l": "website", "u": "https://example.com"}]
        }
    }"#;

    #[test]
    fn test_parse_login_item() {
        let item = Item::from_json(LOGIN_JSON.as_bytes()).unwrap();
        assert_eq!(item.uuid, "nok7367v4vbsfgg2fczwu4ei44");
        assert_eq!(item.title(), "Example Login 1");
        assert_eq!(item.username(), Some("janedoe"));
        assert_eq!(item.password(), Some("doth-parrot-hid-tussock-veldt"));
        assert_eq!(item.first_url(), Some("https://example.com"));
        assert!(!item.is_from_template());
    }

    #[test]
    fn test_document_filename() {
        let json = r#"{"uuid":"d1","details":{"documentAttributes":{"fileName":"a.webp","decryptedSize":10}}}"#;
        let item = Item::from_json(json.as_bytes()).unwrap();
        assert_eq!(item.document_filename(), Some("a.webp"));
        assert_eq!(item.username(), None);
    }

    #[test]
    fn test_invalid_item_json() {
        let result = Item::from_json(b"not json");
        assert!(matches!(result, Err(OpError::Decode { .. })));
    }

    #[test]
    fn test_new_item_first_url() {
        let item = NewItem::login("u", "p")
            .with_url("https://one.example")
            .with_url("https://two.example");
        assert_eq!(item.urls().len(), 2);
        assert_eq!(item.first_url(), Some("https://one.example"));
        assert_eq!(item.category(), "Login");
    }

    #[test]
    fn test_secure_tempfile_contents() {
        let item = NewItem::login("jane", "hunter2");
        let path = item.write_secure_tempfile().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let written: Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(written["fields"][0]["value"], "jane");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o077, 0);
        }
    }
}
