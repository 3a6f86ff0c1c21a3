use crate::browser::driver::PageDriver;
use crate::form::error::FormError;
use crate::pages::base::BasePage;
use crate::pipeline::submitter::FormSubmitter;

pub const SEARCH_ROUTE: &str = "product/search";

/// Search results are a plain GET route; no AJAX form involved.
pub struct SearchPage<'a, D: PageDriver> {
    submitter: &'a mut FormSubmitter<D>,
    base: BasePage,
}

impl<'a, D: PageDriver> SearchPage<'a, D> {
    pub fn new(submitter: &'a mut FormSubmitter<D>, base_url: &str) -> Self {
        SearchPage {
            submitter,
            base: BasePage::new(base_url),
        }
    }

    pub fn open(&mut self) -> Result<(), FormError> {
        let url = self.base.route(SEARCH_ROUTE);
        self.submitter.navigate(&url)
    }

    pub fn search(&mut self, keyword: &str) -> Result<String, FormError> {
        let url = self.base.route_with(SEARCH_ROUTE, &[("search", keyword)]);
        self.submitter.navigate(&url)?;
        Ok(url)
    }
}
