use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;
use url::form_urlencoded;

use crate::browser::driver::{FormRead, PageDriver, RawField};
use crate::form::error::FormError;

/// Identifies one form on the page: the `index`-th match of `selector`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormLocator {
    pub selector: String,
    #[serde(default)]
    pub index: usize,
}

impl FormLocator {
    pub fn new(selector: impl Into<String>) -> Self {
        FormLocator {
            selector: selector.into(),
            index: 0,
        }
    }

    pub fn nth(selector: impl Into<String>, index: usize) -> Self {
        FormLocator {
            selector: selector.into(),
            index,
        }
    }
}

impl From<&str> for FormLocator {
    fn from(selector: &str) -> Self {
        FormLocator::new(selector)
    }
}

impl std::fmt::Display for FormLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.index == 0 {
            write!(f, "{}", self.selector)
        } else {
            write!(f, "{}[{}]", self.selector, self.index)
        }
    }
}

/// Captured field state of a form at one point in time.
///
/// Entries keep DOM encounter order so array-style names (`option[]`)
/// encode exactly as the browser would. The snapshot owns its data: later
/// changes to the live form never reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSnapshot {
    entries: Vec<(String, String)>,
    action_url: String,
}

impl FormSnapshot {
    pub fn new(action_url: impl Into<String>, entries: Vec<(String, String)>) -> Self {
        FormSnapshot {
            entries,
            action_url: action_url.into(),
        }
    }

    /// Build a snapshot from a browser form read, applying the native
    /// form-encoding rules.
    pub fn from_read(read: &FormRead) -> Result<Self, FormError> {
        let action_url = resolve_action(&read.page_url, &read.action)?;
        let entries = read
            .fields
            .iter()
            .filter_map(encoded_value)
            .collect();
        Ok(FormSnapshot {
            entries,
            action_url,
        })
    }

    pub fn action_url(&self) -> &str {
        &self.action_url
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Name → value view; repeated names collapse to the last value.
    pub fn fields(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Return a copy with `name` set to `value`.
    ///
    /// The first entry with that name is replaced in place and later
    /// duplicates are dropped; an absent name is appended.
    pub fn with_override(&self, name: &str, value: &str) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        let mut replaced = false;
        for (k, v) in &self.entries {
            if k == name {
                if !replaced {
                    entries.push((k.clone(), value.to_string()));
                    replaced = true;
                }
            } else {
                entries.push((k.clone(), v.clone()));
            }
        }
        if !replaced {
            entries.push((name.to_string(), value.to_string()));
        }
        FormSnapshot {
            entries,
            action_url: self.action_url.clone(),
        }
    }

    /// Apply several overrides in order.
    pub fn with_overrides<'a, I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        overrides
            .into_iter()
            .fold(self.clone(), |snap, (k, v)| snap.with_override(k, v))
    }

    pub fn with_action_url(&self, url: impl Into<String>) -> Self {
        FormSnapshot {
            entries: self.entries.clone(),
            action_url: url.into(),
        }
    }

    /// `application/x-www-form-urlencoded` body, entries in order.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.entries.iter())
            .finish()
    }
}

/// Read the designated form from the live page.
pub fn read_form(
    driver: &mut dyn PageDriver,
    locator: &FormLocator,
) -> Result<FormSnapshot, FormError> {
    let read = driver
        .read_form(locator)?
        .ok_or_else(|| FormError::ElementNotFound {
            selector: locator.to_string(),
            context: "no matching form element in document".into(),
        })?;
    FormSnapshot::from_read(&read)
}

/// The value a control contributes to the form data set, if any.
fn encoded_value(field: &RawField) -> Option<(String, String)> {
    if field.name.is_empty() || field.disabled {
        return None;
    }
    match field.kind.as_str() {
        "checkbox" | "radio" => {
            if !field.checked {
                return None;
            }
            // A missing value attribute submits "on"; an explicit
            // value="" submits the empty string.
            let value = field.value.clone().unwrap_or_else(|| "on".to_string());
            Some((field.name.clone(), value))
        }
        "submit" | "button" | "reset" | "image" | "file" => None,
        _ => Some((field.name.clone(), field.value.clone().unwrap_or_default())),
    }
}

/// Resolve a form `action` against the page it lives in.
fn resolve_action(page_url: &str, action: &str) -> Result<String, FormError> {
    let base = Url::parse(page_url).map_err(|e| FormError::InvalidUrl {
        url: page_url.to_string(),
        source: e,
    })?;
    if action.trim().is_empty() {
        return Ok(base.to_string());
    }
    base.join(action.trim())
        .map(|u| u.to_string())
        .map_err(|e| FormError::InvalidUrl {
            url: action.to_string(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, value: &str, kind: &str) -> RawField {
        RawField {
            name: name.into(),
            value: Some(value.into()),
            kind: kind.into(),
            checked: false,
            disabled: false,
        }
    }

    #[test]
    fn relative_action_resolves_against_page() {
        let url = resolve_action(
            "http://shop.test/index.php?route=account/login",
            "index.php?route=account/login.login&language=en-gb",
        )
        .unwrap();
        assert_eq!(
            url,
            "http://shop.test/index.php?route=account/login.login&language=en-gb"
        );
    }

    #[test]
    fn empty_action_is_page_url() {
        let url = resolve_action("http://shop.test/cart", "").unwrap();
        assert_eq!(url, "http://shop.test/cart");
    }

    #[test]
    fn buttons_never_encode() {
        assert!(encoded_value(&field("send", "Go", "submit")).is_none());
        assert!(encoded_value(&field("", "x", "text")).is_none());
        assert_eq!(
            encoded_value(&field("q", "mac", "text")),
            Some(("q".into(), "mac".into()))
        );
    }

    #[test]
    fn checkbox_value_attribute_presence_matters() {
        let mut bare = field("newsletter", "", "checkbox");
        bare.value = None;
        bare.checked = true;
        assert_eq!(
            encoded_value(&bare),
            Some(("newsletter".into(), "on".into()))
        );

        let mut empty = field("newsletter", "", "checkbox");
        empty.checked = true;
        assert_eq!(
            encoded_value(&empty),
            Some(("newsletter".into(), String::new()))
        );
    }
}
