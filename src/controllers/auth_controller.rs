use bcrypt::{hash, verify, DEFAULT_COST};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dto::auth_dto::{LoginRequest, LoginResponse, RegisterRequest, UpdateRoleRequest};
use crate::dto::ApiResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::user::{UserResponse, UserRole};
use crate::repositories::user_repository::UserRepository;
use crate::utils::errors::AppError;
use crate::utils::jwt::{generate_token, JwtConfig};

/// Hashear en un hilo bloqueante; bcrypt es costoso en CPU
async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| AppError::Internal(format!("Tarea de hash interrumpida: {}", e)))?
        .map_err(|e| AppError::Hash(e.to_string()))
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("Tarea de hash interrumpida: {}", e)))?
        .map_err(|e| AppError::Hash(e.to_string()))
}

pub struct AuthController {
    repository: UserRepository,
    jwt: JwtConfig,
}

impl AuthController {
    pub fn new(pool: PgPool, jwt: JwtConfig) -> Self {
        Self {
            repository: UserRepository::new(pool),
            jwt,
        }
    }

    /// Registro público: siempre con rol customer
    pub async fn register(&self, request: RegisterRequest) -> Result<ApiResponse<LoginResponse>, AppError> {
        let email = request.email.trim().to_lowercase();

        if self.repository.email_exists(&email).await? {
            return Err(AppError::Conflict(format!("El email '{}' ya está registrado", email)));
        }

        let password_hash = hash_password(request.password).await?;
        let user = self
            .repository
            .create(
                request.full_name.trim(),
                &email,
                request.phone.as_deref().map(str::trim),
                &password_hash,
                UserRole::Customer,
            )
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => {
                    AppError::Conflict(format!("El email '{}' ya está registrado", email))
                }
                other => other,
            })?;

        let token = generate_token(user.id, &user.email, user.role, &self.jwt)?;
        info!("👤 Usuario registrado: {}", user.email);

        Ok(ApiResponse::success_with_message(
            LoginResponse::bearer(token, self.jwt.expiration, user.into()),
            "Registro completado",
        ))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<ApiResponse<LoginResponse>, AppError> {
        let invalid = || AppError::Unauthorized("Credenciales inválidas".to_string());

        let Some(user) = self.repository.find_by_email(request.email.trim()).await? else {
            warn!("🔐 Login fallido para {}", request.email);
            return Err(invalid());
        };

        if !verify_password(request.password, user.password_hash.clone()).await? {
            warn!("🔐 Contraseña incorrecta para {}", user.email);
            return Err(invalid());
        }

        let token = generate_token(user.id, &user.email, user.role, &self.jwt)?;
        info!("🔓 Login correcto: {} ({})", user.email, user.role.as_str());

        Ok(ApiResponse::success(LoginResponse::bearer(
            token,
            self.jwt.expiration,
            user.into(),
        )))
    }

    pub async fn me(&self, user: &AuthenticatedUser) -> Result<UserResponse, AppError> {
        let found = self
            .repository
            .find_by_id(user.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

        Ok(found.into())
    }

    pub async fn list_users(&self, role: Option<&str>) -> Result<Vec<UserResponse>, AppError> {
        let role = role
            .map(|r| {
                UserRole::from_str(r).ok_or_else(|| AppError::BadRequest(format!("Rol inválido: '{}'", r)))
            })
            .transpose()?;

        let users = self.repository.list(role).await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    pub async fn update_role(
        &self,
        admin: &AuthenticatedUser,
        id: Uuid,
        request: UpdateRoleRequest,
    ) -> Result<ApiResponse<UserResponse>, AppError> {
        admin.require_admin()?;
        let role = UserRole::from_str(&request.role)
            .ok_or_else(|| AppError::BadRequest(format!("Rol inválido: '{}'", request.role)))?;

        if id == admin.user_id && role != UserRole::Admin {
            return Err(AppError::BadRequest("Un administrador no puede quitarse su propio rol".to_string()));
        }

        let user = self
            .repository
            .update_role(id, role)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;

        info!("🛡️ Rol de {} cambiado a {} por {}", user.email, role.as_str(), admin.email);

        Ok(ApiResponse::success_with_message(user.into(), "Rol actualizado"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_hash_roundtrip() {
        let hashed = hash_password("marina-secreta".to_string()).await.unwrap();
        assert_ne!(hashed, "marina-secreta");
        assert!(verify_password("marina-secreta".to_string(), hashed.clone()).await.unwrap());
        assert!(!verify_password("otra".to_string(), hashed).await.unwrap());
    }
}
