use crate::browser::driver::PageDriver;
use crate::form::error::FormError;
use crate::form::snapshot::FormLocator;
use crate::pages::base::BasePage;
use crate::pipeline::submitter::{FormRequest, FormSubmitter, PartialReload, SubmissionReport};

pub const CART_ROUTE: &str = "checkout/cart";
pub const CART_FORMS: &str = "#shopping-cart form";
pub const CART_REGION: &str = "#shopping-cart";

/// Shopping cart page: one form per product row.
pub struct CartPage<'a, D: PageDriver> {
    submitter: &'a mut FormSubmitter<D>,
    base: BasePage,
}

impl<'a, D: PageDriver> CartPage<'a, D> {
    pub fn new(submitter: &'a mut FormSubmitter<D>, base_url: &str) -> Self {
        CartPage {
            submitter,
            base: BasePage::new(base_url),
        }
    }

    pub fn open(&mut self) -> Result<(), FormError> {
        let url = self.base.route(CART_ROUTE);
        self.submitter.navigate(&url)
    }

    /// Set the quantity of the `index`-th row and refresh the cart list.
    pub fn update_quantity(
        &mut self,
        quantity: u32,
        index: usize,
    ) -> Result<SubmissionReport, FormError> {
        let request = self
            .row_request("checkout/cart|edit", index)
            .set("quantity", quantity.to_string());
        self.submitter.submit_form(&request)
    }

    /// Remove the `index`-th row and refresh the cart list.
    pub fn remove_item(&mut self, index: usize) -> Result<SubmissionReport, FormError> {
        let request = self.row_request("checkout/cart|remove", index);
        self.submitter.submit_form(&request)
    }

    fn row_request(&self, route: &str, index: usize) -> FormRequest {
        FormRequest::form(FormLocator::nth(CART_FORMS, index))
            .url(self.base.route(route))
            .reload(PartialReload::new(
                self.base.route("checkout/cart|list"),
                CART_REGION,
            ))
    }
}
