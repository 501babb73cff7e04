use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use crate::{
    audit,
    dto::profile::{ProfileResponse, UpdateProfileRequest},
    entity::{Users, users::ActiveModel as UserActive},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Profile,
    response::ApiResponse,
    state::AppState,
};

pub async fn get_profile(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(ApiResponse::success(ProfileResponse {
        username: model.username,
        profile: Profile {
            name: model.profile_name.unwrap_or_default(),
            address: model.profile_address.unwrap_or_default(),
        },
    }))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<ProfileResponse>> {
    let profile = require_profile(payload)?;

    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let mut active: UserActive = model.into();
    active.profile_name = Set(Some(profile.name.clone()));
    active.profile_address = Set(Some(profile.address.clone()));
    active.updated_at = Set(Utc::now().into());
    let model = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "profile_update",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(ProfileResponse {
        username: model.username,
        profile,
    }))
}

fn require_profile(payload: UpdateProfileRequest) -> AppResult<Profile> {
    match payload {
        UpdateProfileRequest {
            name: Some(name),
            address: Some(address),
        } => Ok(Profile { name, address }),
        _ => Err(AppError::bad_request("Name and address are required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_profile_fields_must_be_present() {
        assert!(require_profile(UpdateProfileRequest::default()).is_err());
        assert!(
            require_profile(UpdateProfileRequest {
                name: Some("Ada".into()),
                address: None,
            })
            .is_err()
        );

        let profile = require_profile(UpdateProfileRequest {
            name: Some("Ada".into()),
            address: Some(String::new()),
        })
        .unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.address, "");
    }
}
