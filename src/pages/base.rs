use url::form_urlencoded;

pub const LANGUAGE: &str = "en-gb";

/// Route-based URL builder shared by every page object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasePage {
    base_url: String,
}

impl BasePage {
    pub fn new(base_url: &str) -> Self {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        BasePage { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>index.php?route=<route>&language=en-gb`
    pub fn route(&self, route: &str) -> String {
        format!(
            "{}index.php?route={}&language={}",
            self.base_url, route, LANGUAGE
        )
    }

    /// Route URL with extra query parameters, values form-encoded.
    pub fn route_with(&self, route: &str, params: &[(&str, &str)]) -> String {
        let mut url = self.route(route);
        if !params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            url.push('&');
            url.push_str(&query);
        }
        url
    }
}
