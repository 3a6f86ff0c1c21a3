use crate::browser::driver::PageDriver;
use crate::form::error::FormError;
use crate::pages::base::BasePage;
use crate::pipeline::submitter::{FormRequest, FormSubmitter, SubmissionReport};

pub const HOME_ROUTE: &str = "common/home";
pub const CURRENCY_FORM: &str = "#form-currency";
pub const CURRENCY_SAVE_ROUTE: &str = "common/currency|save";

pub struct HomePage<'a, D: PageDriver> {
    submitter: &'a mut FormSubmitter<D>,
    base: BasePage,
}

impl<'a, D: PageDriver> HomePage<'a, D> {
    pub fn new(submitter: &'a mut FormSubmitter<D>, base_url: &str) -> Self {
        HomePage {
            submitter,
            base: BasePage::new(base_url),
        }
    }

    pub fn open(&mut self) -> Result<(), FormError> {
        let url = self.base.route(HOME_ROUTE);
        self.submitter.navigate(&url)
    }

    /// Switch the store currency (`EUR`, `GBP`, `USD`). The header form
    /// carries the current page as `redirect`; the reply sends the browser
    /// back there with prices in the new currency.
    pub fn switch_currency(&mut self, code: &str) -> Result<SubmissionReport, FormError> {
        let request = FormRequest::form(CURRENCY_FORM)
            .url(self.base.route(CURRENCY_SAVE_ROUTE))
            .set("code", code);
        self.submitter.submit_form(&request)
    }
}
