use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Recipe;

/// One `{ id, amount }` entry of a recipe's ingredient list.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct IngredientAmountInput {
    pub id: Uuid,
    #[validate(range(min = 1, max = 32767))]
    pub amount: i32,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateRecipeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub text: String,
    pub image: Option<String>,
    #[validate(range(min = 1, max = 32767))]
    pub cooking_time: i32,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmountInput>,
}

/// Partial update. `tags` and `ingredients`, when present, replace the whole set.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateRecipeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub text: Option<String>,
    pub image: Option<String>,
    #[validate(range(min = 1, max = 32767))]
    pub cooking_time: Option<i32>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientAmountInput>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct RecipeList {
    #[schema(value_type = Vec<Recipe>)]
    pub items: Vec<Recipe>,
}
