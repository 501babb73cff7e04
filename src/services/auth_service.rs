use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
    ActiveValue::NotSet,
};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    dto::auth::{AuthResponse, Claims, LoginRequest, RegisterRequest},
    entity::{
        Settings, Users,
        users::{ActiveModel as UserActive, Column as UserCol, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Profile, Role, User},
    response::ApiResponse,
    services::stored,
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let payload = normalize_registration(payload)?;

    let registration_open = Settings::find_by_id(1)
        .one(&state.orm)
        .await?
        .map(|s| s.allow_registration)
        .unwrap_or(true);
    if !registration_open {
        return Err(AppError::Forbidden("Registration is currently disabled".into()));
    }

    let existing = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Email.eq(payload.email.as_str()))
                .add(UserCol::Username.eq(payload.username.as_str())),
        )
        .one(&state.orm)
        .await?;
    if let Some(existing) = existing {
        let message = if existing.email == payload.email {
            "Email is already taken"
        } else {
            "Username is already taken"
        };
        return Err(AppError::bad_request(message));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(payload.username),
        email: Set(payload.email),
        password_hash: Set(password_hash),
        role: Set(Role::User.as_str().to_string()),
        profile_name: Set(None),
        profile_address: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(registration_conflict)?;

    audit::record(
        state,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let user = user_from_entity(user)?;
    let token = issue_token(&state.config, user.id, user.role)?;
    Ok(ApiResponse::success(AuthResponse { token, user }))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user = authenticate(state, payload).await?;

    audit::record(
        state,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let token = issue_token(&state.config, user.id, user.role)?;
    Ok(ApiResponse::success(AuthResponse { token, user }))
}

pub async fn current_user(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<User>> {
    let user = Users::find_by_id(auth.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(ApiResponse::success(user_from_entity(user)?))
}

/// Check email and password; bad credentials are a 401.
pub(crate) async fn authenticate(state: &AppState, payload: LoginRequest) -> AppResult<User> {
    let LoginRequest { email, password } = payload;
    let email = email.trim().to_lowercase();
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }
    user_from_entity(user)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.token_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(secret: &str, token: &str) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Token is not valid".into()))?;
    Ok(decoded.claims)
}

/// A concurrent registration can pass the lookup above and still lose on the
/// unique index.
fn registration_conflict(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            AppError::bad_request(duplicate_user_message(&detail))
        }
        _ => err.into(),
    }
}

fn duplicate_user_message(detail: &str) -> &'static str {
    if detail.contains("username") {
        "Username is already taken"
    } else {
        "Email is already taken"
    }
}

fn normalize_registration(payload: RegisterRequest) -> AppResult<RegisterRequest> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if !(3..=30).contains(&username.chars().count()) {
        return Err(AppError::bad_request(
            "Username must be between 3 and 30 characters",
        ));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(AppError::bad_request("Please enter a valid email")),
    }
    if payload.password.chars().count() < 6 {
        return Err(AppError::bad_request(
            "Password must be at least 6 characters long",
        ));
    }

    Ok(RegisterRequest {
        username,
        email,
        password: payload.password,
    })
}

pub(crate) fn user_from_entity(model: UserModel) -> AppResult<User> {
    Ok(User {
        id: model.id,
        role: stored(&model.role)?,
        username: model.username,
        email: model.email,
        profile: Profile {
            name: model.profile_name.unwrap_or_default(),
            address: model.profile_address.unwrap_or_default(),
        },
        created_at: model.created_at.with_timezone(&Utc),
    })
}
