pub struct Icons;

impl Icons {
    pub const MARKET: &str = "🧺";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const PERSON: &str = "👤";
    pub const CART: &str = "🛒";
    pub const STAR: &str = "⭐";
    pub const PIN: &str = "📍";
}
