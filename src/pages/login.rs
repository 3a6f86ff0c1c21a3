use crate::browser::driver::PageDriver;
use crate::form::error::FormError;
use crate::pages::base::BasePage;
use crate::pipeline::submitter::{FormRequest, FormSubmitter, SubmissionReport};

pub const LOGIN_ROUTE: &str = "account/login";

pub struct LoginPage<'a, D: PageDriver> {
    submitter: &'a mut FormSubmitter<D>,
    base: BasePage,
}

impl<'a, D: PageDriver> LoginPage<'a, D> {
    pub fn new(submitter: &'a mut FormSubmitter<D>, base_url: &str) -> Self {
        LoginPage {
            submitter,
            base: BasePage::new(base_url),
        }
    }

    pub fn open_direct(&mut self) -> Result<(), FormError> {
        let url = self.base.route(LOGIN_ROUTE);
        self.submitter.navigate(&url)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<SubmissionReport, FormError> {
        let request = FormRequest::form("#form-login")
            .set("email", email)
            .set("password", password);
        self.submitter.submit_form(&request)
    }
}

/// The account dashboard URL carries a per-login `customer_token`.
pub fn is_login_successful(report: &SubmissionReport) -> bool {
    report
        .navigated_to
        .as_deref()
        .is_some_and(|url| url.contains("route=account/account"))
}
