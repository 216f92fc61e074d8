use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationError;

use crate::models::{Subscription, User};

/// Letters, digits and `_ . @ + -`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::new("username_empty"));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(ValidationError::new("username_invalid_chars"));
    }
    Ok(())
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SubscriptionList {
    #[schema(value_type = Vec<Subscription>)]
    pub items: Vec<Subscription>,
}
