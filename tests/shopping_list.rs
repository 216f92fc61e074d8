use foodgram_api::services::shopping_list_service::{
    CartIngredientRow, SHOPPING_LIST_HEADER, ShoppingList, ShoppingListItem, aggregate, render,
};

fn row(name: &str, unit: &str, amount: i32) -> CartIngredientRow {
    CartIngredientRow {
        name: name.to_string(),
        measurement_unit: unit.to_string(),
        amount,
    }
}

#[test]
fn sums_amounts_across_recipes() {
    // Recipe 1: flour + sugar, recipe 2: flour + egg.
    let rows = vec![
        row("Flour", "g", 200),
        row("Sugar", "g", 50),
        row("Flour", "g", 300),
        row("Egg", "pcs", 2),
    ];

    let body = render(&aggregate(rows));

    assert_eq!(
        body,
        "Список продуктов к покупке:\n- Egg - 2 pcs\n- Flour - 500 g\n- Sugar - 50 g\n"
    );
}

#[test]
fn empty_cart_renders_header_only() {
    let items = aggregate(Vec::new());
    assert!(items.is_empty());
    assert_eq!(render(&items), format!("{SHOPPING_LIST_HEADER}\n"));
}

#[test]
fn same_name_with_different_units_stays_separate() {
    let items = aggregate(vec![
        row("Milk", "ml", 200),
        row("Milk", "cup", 1),
        row("Milk", "ml", 50),
    ]);

    assert_eq!(
        items,
        vec![
            ShoppingListItem {
                name: "Milk".into(),
                measurement_unit: "cup".into(),
                amount: 1,
            },
            ShoppingListItem {
                name: "Milk".into(),
                measurement_unit: "ml".into(),
                amount: 250,
            },
        ]
    );
}

#[test]
fn ordering_is_case_sensitive_code_point_order() {
    let items = aggregate(vec![
        row("apple", "pcs", 1),
        row("Banana", "pcs", 1),
        row("молоко", "мл", 1),
        row("Zucchini", "pcs", 1),
        row("Яблоко", "шт.", 1),
    ]);

    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Banana", "Zucchini", "apple", "Яблоко", "молоко"]);
}

#[test]
fn one_line_per_group_with_positive_totals() {
    let rows: Vec<CartIngredientRow> = (1..=10)
        .map(|i| row(if i % 2 == 0 { "salt" } else { "pepper" }, "g", i))
        .collect();

    let items = aggregate(rows);

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "pepper");
    assert_eq!(items[0].amount, 1 + 3 + 5 + 7 + 9);
    assert_eq!(items[1].name, "salt");
    assert_eq!(items[1].amount, 2 + 4 + 6 + 8 + 10);
    assert!(items.iter().all(|i| i.amount >= 1));
}

#[test]
fn totals_do_not_overflow_small_integer_amounts() {
    let rows = vec![row("Rice", "g", i32::MAX), row("Rice", "g", i32::MAX)];
    let items = aggregate(rows);
    assert_eq!(items[0].amount, 2 * i64::from(i32::MAX));
}

#[tokio::test]
async fn document_is_served_as_text_attachment() {
    use axum::{body::to_bytes, http::header, response::IntoResponse};

    let items = aggregate(vec![row("Egg", "pcs", 2)]);
    let list = ShoppingList {
        filename: "shopping_list.txt".into(),
        body: render(&items),
        items,
    };

    let response = list.into_response();
    let headers = response.headers();
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        headers.get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"shopping_list.txt\""
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        "Список продуктов к покупке:\n- Egg - 2 pcs\n"
    );
}
