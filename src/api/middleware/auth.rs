//! JWT authentication middleware and access guards.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::domain::Permission;
use crate::errors::AppError;
use crate::services::Actor;

/// Session id of the token that authenticated the request
#[derive(Clone, Debug)]
pub struct SessionId(pub String);

/// JWT authentication middleware.
///
/// Validates the bearer token and its live session, then injects the
/// [`Actor`] and [`SessionId`] into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_TOKEN_PREFIX))
        .ok_or(AppError::Unauthorized)?;

    let claims = state.services.auth().authenticate(token).await?;
    let session = SessionId(claims.sid.clone());

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(claims.into_actor());

    Ok(next.run(request).await)
}

/// Seller holding `permission`; returns the caller's store.
pub fn require_permission(actor: &Actor, permission: Permission) -> Result<Uuid, AppError> {
    actor.require(permission)?;
    actor.store()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StaffPermissions, UserRole};

    fn actor(role: UserRole, permissions: StaffPermissions) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            store_id: (role != UserRole::Admin).then(Uuid::new_v4),
            email: "x@shop.example".into(),
            role,
            permissions,
        }
    }

    #[test]
    fn test_admin_holds_no_store_permissions() {
        let admin = actor(UserRole::Admin, StaffPermissions::all());
        assert!(require_permission(&admin, Permission::Orders).is_err());
    }

    #[test]
    fn test_staff_permission_returns_store() {
        let staff = actor(
            UserRole::Staff,
            StaffPermissions {
                pos: true,
                ..Default::default()
            },
        );
        assert_eq!(
            require_permission(&staff, Permission::Pos).unwrap(),
            staff.store_id.unwrap()
        );
    }
}
