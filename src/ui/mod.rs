pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, error, header, info, success, summary_row, warn};
pub use table::{cart_table, categories_table, products_table, stats_table};
pub use theme::{theme, Theme};
