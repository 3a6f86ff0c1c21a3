use crate::browser::driver::PageDriver;
use crate::form::error::FormError;
use crate::pages::base::BasePage;
use crate::pipeline::submitter::{FormRequest, FormSubmitter, PartialReload, SubmissionReport};

pub const PRODUCT_ROUTE: &str = "product/product";
pub const HEADER_CART: &str = "#header-cart";
pub const WISHLIST_ADD_ROUTE: &str = "account/wishlist|add";

pub struct ProductPage<'a, D: PageDriver> {
    submitter: &'a mut FormSubmitter<D>,
    base: BasePage,
}

impl<'a, D: PageDriver> ProductPage<'a, D> {
    pub fn new(submitter: &'a mut FormSubmitter<D>, base_url: &str) -> Self {
        ProductPage {
            submitter,
            base: BasePage::new(base_url),
        }
    }

    pub fn open(&mut self, product_id: u32) -> Result<(), FormError> {
        let url = self
            .base
            .route_with(PRODUCT_ROUTE, &[("product_id", &product_id.to_string())]);
        self.submitter.navigate(&url)
    }

    /// Add the product; on success the header cart widget is refreshed.
    pub fn add_to_cart(&mut self, quantity: Option<u32>) -> Result<SubmissionReport, FormError> {
        let mut request = FormRequest::form("#form-product")
            .url(self.base.route("checkout/cart|add"))
            .reload(
                PartialReload::new(self.base.route("common/cart|info"), HEADER_CART).on_success(),
            );
        if let Some(quantity) = quantity {
            request = request.set("quantity", quantity.to_string());
        }
        self.submitter.submit_form(&request)
    }

    /// Add a product to the wishlist. The storefront answers guests with
    /// a login redirect or an error, which reconcile like any other reply.
    pub fn add_to_wishlist(&mut self, product_id: u32) -> Result<SubmissionReport, FormError> {
        let request = FormRequest::post(self.base.route(WISHLIST_ADD_ROUTE))
            .set("product_id", product_id.to_string());
        self.submitter.submit_form(&request)
    }
}
