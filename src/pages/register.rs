use crate::browser::driver::PageDriver;
use crate::form::error::FormError;
use crate::pages::base::BasePage;
use crate::pipeline::submitter::{FormRequest, FormSubmitter, SubmissionReport};

pub const REGISTER_ROUTE: &str = "account/register";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub agree_privacy: bool,
}

pub struct RegisterPage<'a, D: PageDriver> {
    submitter: &'a mut FormSubmitter<D>,
    base: BasePage,
}

impl<'a, D: PageDriver> RegisterPage<'a, D> {
    pub fn new(submitter: &'a mut FormSubmitter<D>, base_url: &str) -> Self {
        RegisterPage {
            submitter,
            base: BasePage::new(base_url),
        }
    }

    pub fn open_direct(&mut self) -> Result<(), FormError> {
        let url = self.base.route(REGISTER_ROUTE);
        self.submitter.navigate(&url)
    }

    pub fn register(&mut self, details: &Registration) -> Result<SubmissionReport, FormError> {
        let mut request = FormRequest::form("#form-register")
            .set("firstname", details.first_name.as_str())
            .set("lastname", details.last_name.as_str())
            .set("email", details.email.as_str())
            .set("password", details.password.as_str());
        if details.agree_privacy {
            request = request.set("agree", "1");
        }
        self.submitter.submit_form(&request)
    }
}

/// Success lands on `account/success` with a fresh `customer_token`.
pub fn is_registration_successful(report: &SubmissionReport) -> bool {
    report
        .navigated_to
        .as_deref()
        .is_some_and(|url| url.contains("route=account/success"))
}
