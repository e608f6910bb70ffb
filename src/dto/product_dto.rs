use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::utils::validation::validate_non_negative_amount;

// Alta de producto (admin)
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 2, max = 200))]
    pub name: String,

    #[validate(length(min = 2, max = 64))]
    pub sku: String,

    #[validate(length(min = 2, max = 100))]
    pub category: String,

    pub description: Option<String>,

    #[validate(custom = "validate_non_negative_amount")]
    pub price: Decimal,

    #[validate(range(min = 0))]
    pub stock: i32,

    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilters {
    pub category: Option<String>,
}
