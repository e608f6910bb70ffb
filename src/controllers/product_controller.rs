use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::dto::product_dto::{CreateProductRequest, ProductFilters};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::product::Product;
use crate::repositories::product_repository::{NewProduct, ProductRepository};
use crate::utils::errors::AppError;

pub struct ProductController {
    repository: ProductRepository,
}

impl ProductController {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ProductRepository::new(pool),
        }
    }

    pub async fn list(&self, filters: ProductFilters) -> Result<Vec<Product>, AppError> {
        self.repository.list_active(filters.category.as_deref()).await
    }

    /// Los productos desactivados no se muestran en la tienda
    pub async fn get_by_id(&self, id: Uuid) -> Result<Product, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::NotFound("Producto no encontrado".to_string()))
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        request: CreateProductRequest,
    ) -> Result<ApiResponse<Product>, AppError> {
        user.require_admin()?;

        let product = self
            .repository
            .create(NewProduct {
                name: request.name.trim().to_string(),
                sku: request.sku.trim().to_uppercase(),
                category: request.category.trim().to_string(),
                description: request.description,
                price: request.price.round_dp(2),
                stock: request.stock,
                image_url: request.image_url,
            })
            .await?;

        info!("🛒 Producto {} ({}) creado", product.name, product.sku);

        Ok(ApiResponse::success_with_message(product, "Producto creado"))
    }
}
