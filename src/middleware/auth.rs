//! Middleware de autenticación JWT
//!
//! Este módulo maneja la autenticación JWT, extracción de tokens
//! y verificación de roles de los usuarios autenticados.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension,
};
use uuid::Uuid;

use crate::{
    models::user::UserRole,
    state::AppState,
    utils::{
        errors::AppError,
        jwt::{extract_token_from_header, verify_token, JwtConfig},
    },
};

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Empleado o administrador
    pub fn require_staff(&self) -> Result<(), AppError> {
        if !self.is_staff() {
            return Err(AppError::Forbidden("Se requieren permisos de personal".to_string()));
        }
        Ok(())
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if !self.is_admin() {
            return Err(AppError::Forbidden("Se requieren permisos de administrador".to_string()));
        }
        Ok(())
    }

    /// El recurso pertenece al usuario o el usuario es personal del centro
    pub fn require_owner_or_staff(&self, owner_id: Option<Uuid>) -> Result<(), AppError> {
        if self.is_staff() || owner_id == Some(self.user_id) {
            return Ok(());
        }
        Err(AppError::Forbidden("No tienes permiso para acceder a este recurso".to_string()))
    }
}

/// Decodificar el header Authorization en un usuario autenticado
fn authenticate(request: &Request, jwt: &JwtConfig) -> Result<AuthenticatedUser, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Token de autorización requerido".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    let claims = verify_token(token, jwt)?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("ID de usuario inválido".to_string()))?;
    let role = UserRole::from_str(&claims.role)
        .ok_or_else(|| AppError::Unauthorized("Rol inválido en el token".to_string()))?;

    Ok(AuthenticatedUser {
        user_id,
        email: claims.email,
        role,
    })
}

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&request, &state.jwt_config())?;

    // Inyectar usuario autenticado en las extensions
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Middleware opcional de autenticación (para rutas que pueden ser públicas o privadas).
/// Un token inválido se ignora y la request sigue como anónima.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.headers().contains_key(header::AUTHORIZATION) {
        match authenticate(&request, &state.jwt_config()) {
            Ok(user) => {
                request.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!("🔓 Token opcional ignorado: {}", e),
        }
    }

    next.run(request).await
}

/// Middleware para verificar permisos de admin
pub async fn admin_only_middleware(
    Extension(user): Extension<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    user.require_admin()?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "user@marina.test".to_string(),
            role,
        }
    }

    #[test]
    fn test_role_guards() {
        assert!(user(UserRole::Customer).require_staff().is_err());
        assert!(user(UserRole::Employee).require_staff().is_ok());
        assert!(user(UserRole::Employee).require_admin().is_err());
        assert!(user(UserRole::Admin).require_admin().is_ok());
    }

    #[test]
    fn test_owner_or_staff() {
        let customer = user(UserRole::Customer);
        assert!(customer.require_owner_or_staff(Some(customer.user_id)).is_ok());
        assert!(customer.require_owner_or_staff(Some(Uuid::new_v4())).is_err());
        assert!(customer.require_owner_or_staff(None).is_err());
        assert!(user(UserRole::Employee).require_owner_or_staff(None).is_ok());
    }
}
