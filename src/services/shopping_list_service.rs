//! Shopping list built from the recipes in a user's cart.
//!
//! Rows are fetched with one join, then grouped and rendered by the pure
//! [`aggregate`] and [`render`] functions.

use std::collections::BTreeMap;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use sqlx::FromRow;

use crate::{db::DbPool, error::AppResult, middleware::auth::AuthUser};

pub const SHOPPING_LIST_HEADER: &str = "Список продуктов к покупке:";

/// One ingredient entry of one recipe in the cart.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartIngredientRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// The rendered list plus the filename it is offered under.
#[derive(Debug, Clone)]
pub struct ShoppingList {
    pub filename: String,
    pub items: Vec<ShoppingListItem>,
    pub body: String,
}

impl IntoResponse for ShoppingList {
    fn into_response(self) -> Response {
        let disposition = format!(
            "attachment; filename=\"{}\"",
            self.filename.replace(['"', '\\'], "_")
        );
        (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}

/// Sums amounts per (name, unit) and orders the groups by name, then unit,
/// in code-point order.
pub fn aggregate<I>(rows: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = CartIngredientRow>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals
            .entry((row.name, row.measurement_unit))
            .or_default() += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

pub fn render(items: &[ShoppingListItem]) -> String {
    let mut body = String::with_capacity(SHOPPING_LIST_HEADER.len() + 1 + items.len() * 32);
    body.push_str(SHOPPING_LIST_HEADER);
    body.push('\n');
    for item in items {
        body.push_str(&format!(
            "- {} - {} {}\n",
            item.name, item.amount, item.measurement_unit
        ));
    }
    body
}

/// Every ingredient entry of every recipe in the user's cart. The cart is
/// read as a set of recipe ids, so a recipe contributes at most once.
pub async fn cart_ingredients(pool: &DbPool, user: &AuthUser) -> AppResult<Vec<CartIngredientRow>> {
    let rows = sqlx::query_as::<_, CartIngredientRow>(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id IN (
            SELECT ce.recipe_id FROM cart_entries ce WHERE ce.user_id = $1
        )
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn generate(
    pool: &DbPool,
    user: &AuthUser,
    filename: &str,
) -> AppResult<ShoppingList> {
    let rows = cart_ingredients(pool, user).await?;
    let row_count = rows.len();
    let items = aggregate(rows);
    let body = render(&items);

    tracing::debug!(
        user_id = %user.user_id,
        rows = row_count,
        lines = items.len(),
        "shopping list rendered"
    );

    Ok(ShoppingList {
        filename: filename.to_string(),
        items,
        body,
    })
}
