use axum::{extract::Query, http::Uri};
use foodgram_api::{
    dto::{
        auth::RegisterRequest,
        recipes::{CreateRecipeRequest, IngredientAmountInput},
        users::validate_username,
    },
    error::AppError,
    routes::params::{PageWindow, Pagination, RecipeListQuery},
    services::{
        ingredient_service::escape_like,
        recipe_service::{validate_ingredient_inputs, validate_tag_ids},
    },
};
use uuid::Uuid;
use validator::Validate;

fn register(username: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.into(),
        username: username.into(),
        first_name: "Ivan".into(),
        last_name: "Petrov".into(),
        password: password.into(),
    }
}

#[test]
fn usernames_allow_word_characters_and_punctuation() {
    assert!(validate_username("chef.ivan+1@home-kitchen_2").is_ok());
    assert!(validate_username("повар").is_ok());
    assert!(validate_username("").is_err());
    assert!(validate_username("chef ivan").is_err());
    assert!(validate_username("chef/ivan").is_err());
}

#[test]
fn registration_payload_is_validated() {
    assert!(register("chef", "chef@example.com", "s3cret-pass").validate().is_ok());
    assert!(register("chef", "not-an-email", "s3cret-pass").validate().is_err());
    assert!(register("chef", "chef@example.com", "short").validate().is_err());
    assert!(register("bad name", "chef@example.com", "s3cret-pass").validate().is_err());
}

#[test]
fn recipe_needs_unique_tags() {
    let tag = Uuid::new_v4();
    assert!(validate_tag_ids(&[tag]).is_ok());
    assert!(matches!(validate_tag_ids(&[]), Err(AppError::BadRequest(_))));
    assert!(matches!(
        validate_tag_ids(&[tag, Uuid::new_v4(), tag]),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn recipe_needs_unique_positive_ingredients() {
    let flour = Uuid::new_v4();
    let sugar = Uuid::new_v4();
    let item = |id, amount| IngredientAmountInput { id, amount };

    assert!(validate_ingredient_inputs(&[item(flour, 200), item(sugar, 1)]).is_ok());
    assert!(matches!(
        validate_ingredient_inputs(&[]),
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        validate_ingredient_inputs(&[item(flour, 0)]),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        validate_ingredient_inputs(&[item(flour, 100), item(flour, 50)]),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn recipe_payload_rejects_zero_cooking_time() {
    let recipe = CreateRecipeRequest {
        name: "Pancakes".into(),
        text: "Mix and fry.".into(),
        image: None,
        cooking_time: 0,
        tags: vec![Uuid::new_v4()],
        ingredients: vec![IngredientAmountInput {
            id: Uuid::new_v4(),
            amount: 1,
        }],
    };
    assert!(recipe.validate().is_err());
}

#[test]
fn like_wildcards_are_escaped() {
    assert_eq!(escape_like("мук"), "мук");
    assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
}

#[test]
fn pagination_is_normalized() {
    let default = Pagination::default().normalize(6);
    assert_eq!(
        default,
        PageWindow {
            page: 1,
            limit: 6,
            offset: 0
        }
    );

    let third = Pagination {
        page: Some(3),
        limit: Some(10),
    }
    .normalize(6);
    assert_eq!(third.offset, 20);

    let clamped = Pagination {
        page: Some(-4),
        limit: Some(10_000),
    }
    .normalize(6);
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.limit, 100);

    let far = Pagination {
        page: Some(i64::MAX),
        limit: Some(6),
    }
    .normalize(6);
    assert_eq!(far.page, i64::MAX);
    assert_eq!(far.offset, i64::MAX);
}

#[test]
fn unique_violations_become_bad_requests() {
    let err = AppError::conflict(
        "duplicate key value violates unique constraint \"unique_name_author\"",
    );
    assert!(matches!(
        &err,
        AppError::BadRequest(msg) if msg == "You already have a recipe with this name"
    ));
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);

    assert!(matches!(
        AppError::conflict("users_email_key"),
        AppError::BadRequest(msg) if msg == "Email is already taken"
    ));
    assert!(matches!(
        AppError::conflict(""),
        AppError::BadRequest(msg) if msg == "Resource already exists"
    ));
}

#[test]
fn recipe_query_parses_flags_and_tags() {
    let uri: Uri = "/api/recipes?tags=breakfast,%20dinner,&is_favorited=1&is_in_shopping_cart=false&limit=3"
        .parse()
        .unwrap();
    let Query(query) = Query::<RecipeListQuery>::try_from_uri(&uri).unwrap();

    assert_eq!(query.is_favorited, Some(true));
    assert_eq!(query.is_in_shopping_cart, Some(false));
    assert_eq!(query.tag_slugs(), vec!["breakfast", "dinner"]);
    assert_eq!(query.pagination().normalize(6).limit, 3);
}

#[test]
fn recipe_query_without_flags_leaves_them_unset() {
    let uri: Uri = "/api/recipes".parse().unwrap();
    let Query(query) = Query::<RecipeListQuery>::try_from_uri(&uri).unwrap();
    assert_eq!(query.is_favorited, None);
    assert!(query.tag_slugs().is_empty());
}
