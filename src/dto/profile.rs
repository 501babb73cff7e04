use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Profile;

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub username: String,
    pub profile: Profile,
}
