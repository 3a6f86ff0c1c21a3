use crate::browser::driver::PageDriver;
use crate::form::error::FormError;
use crate::pages::base::BasePage;
use crate::pages::cart::{CART_REGION, CART_ROUTE};
use crate::pipeline::submitter::{FormRequest, FormSubmitter, PartialReload, SubmissionReport};

pub const CHECKOUT_ROUTE: &str = "checkout/checkout";

/// Single-page checkout plus the coupon/voucher forms on the cart page.
pub struct CheckoutPage<'a, D: PageDriver> {
    submitter: &'a mut FormSubmitter<D>,
    base: BasePage,
}

impl<'a, D: PageDriver> CheckoutPage<'a, D> {
    pub fn new(submitter: &'a mut FormSubmitter<D>, base_url: &str) -> Self {
        CheckoutPage {
            submitter,
            base: BasePage::new(base_url),
        }
    }

    pub fn open(&mut self) -> Result<(), FormError> {
        let url = self.base.route(CHECKOUT_ROUTE);
        self.submitter.navigate(&url)
    }

    pub fn open_cart(&mut self) -> Result<(), FormError> {
        let url = self.base.route(CART_ROUTE);
        self.submitter.navigate(&url)
    }

    /// Save the guest/register details form as filled on the page.
    pub fn continue_guest(&mut self) -> Result<SubmissionReport, FormError> {
        let request =
            FormRequest::form("#form-register").url(self.base.route("checkout/register|save"));
        self.submitter.submit_form(&request)
    }

    pub fn apply_coupon(&mut self, code: &str) -> Result<SubmissionReport, FormError> {
        let request = FormRequest::form("#form-coupon")
            .set("coupon", code)
            .reload(self.cart_reload());
        self.submitter.submit_form(&request)
    }

    pub fn apply_gift_certificate(&mut self, code: &str) -> Result<SubmissionReport, FormError> {
        let request = FormRequest::form("#form-voucher")
            .set("voucher", code)
            .reload(self.cart_reload());
        self.submitter.submit_form(&request)
    }

    fn cart_reload(&self) -> PartialReload {
        PartialReload::new(self.base.route("checkout/cart|list"), CART_REGION)
    }
}
