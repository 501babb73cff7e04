use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    entity::Users,
    error::AppError,
    models::Role,
    services::{auth_service::decode_token, stored},
    state::AppState,
};

const INVALID_TOKEN: &str = "Token is not valid";

/// The caller behind a verified bearer token, loaded from the users table.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

/// An [`AuthUser`] whose role is `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.role != Role::Admin {
        return Err(AppError::Forbidden("Access denied. Admin only.".into()));
    }
    Ok(())
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("No token, authorization denied".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized(INVALID_TOKEN.into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("No token, authorization denied".into()))?;
    Ok(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = decode_token(&state.config.jwt_secret, token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized(INVALID_TOKEN.into()))?;

        let user = Users::find_by_id(user_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.into()))?;

        Ok(AuthUser {
            user_id: user.id,
            username: user.username,
            role: stored(&user.role)?,
        })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        ensure_admin(&user)?;
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn only_admins_pass_ensure_admin() {
        let mut user = AuthUser {
            user_id: Uuid::new_v4(),
            username: "kim".into(),
            role: Role::User,
        };
        assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden(_))));
        user.role = Role::Admin;
        assert!(ensure_admin(&user).is_ok());
    }
}
