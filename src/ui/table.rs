use crate::models::{CartLine, Category, ProductListing};
use crate::storage::StoreStats;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ProductRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Product")]
    name: String,
    #[tabled(rename = "Stall")]
    vendor: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Stock")]
    stock: i64,
    #[tabled(rename = "Rating")]
    rating: String,
}

#[derive(Tabled)]
struct CartRow {
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Qty")]
    quantity: i64,
    #[tabled(rename = "Unit")]
    unit_price: String,
    #[tabled(rename = "Subtotal")]
    subtotal: String,
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Category")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

fn money(value: f64) -> String {
    format!("R$ {:.2}", value)
}

pub fn stats_table(stats: &StoreStats) -> String {
    let rows: Vec<MetricRow> = [
        ("Tables", format!("{}/{}", stats.tables, stats.expected_tables)),
        ("Users", stats.users.to_string()),
        ("Vendors", stats.vendors.to_string()),
        ("Categories", stats.categories.to_string()),
        ("Products", stats.products.to_string()),
        ("Carts", stats.carts.to_string()),
    ]
    .into_iter()
    .map(|(metric, value)| MetricRow {
        metric: metric.to_string(),
        value,
    })
    .collect();
    render(&rows)
}

pub fn products_table(products: &[ProductListing]) -> String {
    let rows: Vec<ProductRow> = products
        .iter()
        .map(|p| ProductRow {
            id: p.id,
            name: p.name.clone(),
            vendor: p.vendor_name.clone(),
            category: p.category_name.clone(),
            price: money(p.price),
            stock: p.stock,
            rating: format!("{:.1} ({})", p.rating_avg, p.rating_count),
        })
        .collect();
    render(&rows)
}

pub fn cart_table(lines: &[CartLine]) -> String {
    let rows: Vec<CartRow> = lines
        .iter()
        .map(|line| CartRow {
            product: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: money(line.unit_price),
            subtotal: money(line.unit_price * line.quantity as f64),
        })
        .collect();
    render(&rows)
}

pub fn categories_table(categories: &[Category]) -> String {
    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|c| CategoryRow {
            id: c.id,
            name: c.name.clone(),
            description: c.description.clone().unwrap_or_default(),
        })
        .collect();
    render(&rows)
}
