use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, SetPasswordRequest},
        ingredients::{CreateIngredientRequest, IngredientList},
        recipes::{CreateRecipeRequest, IngredientAmountInput, RecipeList, UpdateRecipeRequest},
        tags::TagList,
        users::{SubscriptionList, UserList},
    },
    models::{Ingredient, Recipe, RecipeIngredient, RecipeShort, Subscription, Tag, User},
    response::{ApiResponse, Meta},
    routes::{auth, health, ingredients, params, recipes, tags, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        users::register,
        users::list_users,
        users::get_user,
        users::me,
        users::set_password,
        users::list_subscriptions,
        users::subscribe,
        users::unsubscribe,
        tags::list_tags,
        tags::get_tag,
        ingredients::list_ingredients,
        ingredients::get_ingredient,
        ingredients::create_ingredient,
        ingredients::delete_ingredient,
        recipes::list_recipes,
        recipes::get_recipe,
        recipes::create_recipe,
        recipes::update_recipe,
        recipes::delete_recipe,
        recipes::add_favorite,
        recipes::remove_favorite,
        recipes::add_to_shopping_cart,
        recipes::remove_from_shopping_cart,
        recipes::download_shopping_cart
    ),
    components(
        schemas(
            User,
            Tag,
            Ingredient,
            RecipeIngredient,
            Recipe,
            RecipeShort,
            Subscription,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            SetPasswordRequest,
            CreateIngredientRequest,
            CreateRecipeRequest,
            UpdateRecipeRequest,
            IngredientAmountInput,
            UserList,
            SubscriptionList,
            TagList,
            IngredientList,
            RecipeList,
            params::Pagination,
            params::IngredientQuery,
            params::RecipeListQuery,
            params::SubscriptionQuery,
            health::HealthData,
            Meta,
            ApiResponse<User>,
            ApiResponse<Recipe>,
            ApiResponse<RecipeList>,
            ApiResponse<LoginResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Token issuance"),
        (name = "Users", description = "Registration, profiles and subscriptions"),
        (name = "Tags", description = "Recipe tags"),
        (name = "Ingredients", description = "Ingredient catalogue"),
        (name = "Recipes", description = "Recipes, favorites, shopping cart and shopping list"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
