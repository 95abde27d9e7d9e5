//! Data-access operations
//!
//! Each public call opens its own connection, runs its statements, commits
//! and drops the connection. Nothing is shared between calls except the
//! database file itself.

use std::path::{Path, PathBuf};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, warn};
use crate::{Error, Result};
use crate::models::{CartLine, Category, NewProduct, NewUser, NewVendor, ProductListing, User, UserRole, Vendor};
use super::{is_unique_violation, open_connection, schema};

const USER_COLUMNS: &str = "id, email, senha_hash, nome, telefone, latitude, longitude, tipo, ativo, data_criacao";

const VENDOR_COLUMNS: &str = "id, usuario_id, nome_estabelecimento, descricao, horario_funcionamento, \
     dias_funcionamento, avaliacao_media, total_avaliacoes, ativo";

const PRODUCT_LISTING_QUERY: &str = r#"
SELECT p.id, p.feirante_id, p.nome, p.descricao, p.preco, p.quantidade_estoque,
       p.categoria_id, p.latitude, p.longitude, p.avaliacao_media, p.total_avaliacoes,
       p.ativo, p.data_criacao, f.nome_estabelecimento, c.nome
FROM produtos p
JOIN feirantes f ON p.feirante_id = f.id
JOIN categorias c ON p.categoria_id = c.id
WHERE p.ativo = 1 AND f.ativo = 1
"#;

const CART_LINE_QUERY: &str = r#"
SELECT i.carrinho_id, i.produto_id, p.nome, p.preco, i.quantidade
FROM itens_carrinho i
JOIN produtos p ON i.produto_id = p.id
"#;

/// What a review is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewSubject {
    Vendor,
    Product,
}

impl ReviewSubject {
    fn review_table(&self) -> &'static str {
        match self {
            ReviewSubject::Vendor => "avaliacoes_feirantes",
            ReviewSubject::Product => "avaliacoes_produtos",
        }
    }

    fn subject_column(&self) -> &'static str {
        match self {
            ReviewSubject::Vendor => "feirante_id",
            ReviewSubject::Product => "produto_id",
        }
    }

    fn subject_table(&self) -> &'static str {
        match self {
            ReviewSubject::Vendor => "feirantes",
            ReviewSubject::Product => "produtos",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ReviewSubject::Vendor => "vendor",
            ReviewSubject::Product => "product",
        }
    }
}

/// Per-call access to the marketplace database
#[derive(Debug, Clone)]
pub struct FeiraStore {
    db_path: PathBuf,
}

impl FeiraStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// A fresh connection with foreign keys enforced.
    pub fn connection(&self) -> Result<Connection> {
        open_connection(&self.db_path)
    }

    // ========== Users ==========

    /// Insert a user and return its id.
    ///
    /// A repeated email fails with [`Error::Duplicate`]; every other store
    /// fault is an [`Error::Operation`].
    pub fn create_user(&self, user: &NewUser) -> Result<i64> {
        let conn = self.connection()?;
        let role = user.role.clone().unwrap_or_default();

        conn.execute(
            r#"
            INSERT INTO usuarios (email, senha_hash, nome, telefone, latitude, longitude, tipo)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                user.email,
                user.password_hash,
                user.name,
                user.phone,
                user.latitude,
                user.longitude,
                role.as_str(),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Duplicate(format!("email already registered: {}", user.email))
            } else {
                Error::operation("create user", e)
            }
        })?;

        let id = conn.last_insert_rowid();
        debug!("Created user {} ({})", id, role);
        Ok(id)
    }

    /// Exact, case-sensitive lookup. A missing email is `Ok(None)`.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.connection()?;
        conn.query_row(
            &format!("SELECT {} FROM usuarios WHERE email = ?1", USER_COLUMNS),
            [email],
            row_to_user,
        )
        .optional()
        .map_err(|e| Error::operation("find user", e))
    }

    // ========== Vendors & categories ==========

    /// Attach a vendor profile to an existing user and return its id.
    pub fn create_vendor(&self, vendor: &NewVendor) -> Result<i64> {
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT INTO feirantes (usuario_id, nome_estabelecimento, descricao, horario_funcionamento, dias_funcionamento)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                vendor.user_id,
                vendor.stall_name,
                vendor.description,
                vendor.opening_hours,
                vendor.operating_days,
            ],
        )
        .map_err(|e| Error::operation("create vendor", e))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_vendor(&self, id: i64) -> Result<Option<Vendor>> {
        let conn = self.connection()?;
        conn.query_row(
            &format!("SELECT {} FROM feirantes WHERE id = ?1", VENDOR_COLUMNS),
            [id],
            row_to_vendor,
        )
        .optional()
        .map_err(|e| Error::operation("find vendor", e))
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let op = |e| Error::operation("list categories", e);
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT id, nome, descricao FROM categorias ORDER BY nome")
            .map_err(op)?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                })
            })
            .map_err(op)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(op)?;
        Ok(categories)
    }

    // ========== Products ==========

    pub fn create_product(&self, product: &NewProduct) -> Result<i64> {
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT INTO produtos (feirante_id, nome, descricao, preco, quantidade_estoque, categoria_id, latitude, longitude)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                product.vendor_id,
                product.name,
                product.description,
                product.price,
                product.stock,
                product.category_id,
                product.latitude,
                product.longitude,
            ],
        )
        .map_err(|e| Error::operation("create product", e))?;
        Ok(conn.last_insert_rowid())
    }

    /// Active products of active vendors, best rated first.
    ///
    /// Known limitation: `latitude`, `longitude` and `radius_km` are accepted
    /// but not applied. The result is the same for any location; only
    /// `category_id` narrows it.
    pub fn list_products_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        category_id: Option<i64>,
    ) -> Result<Vec<ProductListing>> {
        warn!(latitude, longitude, radius_km, "Proximity filtering not implemented, listing every location");

        let op = |e| Error::operation("list products", e);
        let conn = self.connection()?;

        let mut sql = PRODUCT_LISTING_QUERY.to_string();
        if category_id.is_some() {
            sql.push_str(" AND p.categoria_id = ?1");
        }
        sql.push_str(" ORDER BY p.avaliacao_media DESC, p.id");

        let mut stmt = conn.prepare(&sql).map_err(op)?;
        let rows = match category_id {
            Some(id) => stmt.query_map([id], row_to_listing),
            None => stmt.query_map([], row_to_listing),
        }
        .map_err(op)?;

        let products = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(op)?;
        debug!("Listed {} products (category: {:?})", products.len(), category_id);
        Ok(products)
    }

    // ========== Cart ==========

    /// Add `quantity` of a product to the user's cart, creating the cart on first use.
    ///
    /// Quantities accumulate: the line ends up at its previous quantity plus
    /// `quantity`. Cart lookup/creation and the line upsert run in one
    /// IMMEDIATE transaction, so concurrent callers for the same user
    /// serialize on the write lock.
    pub fn add_to_cart(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<CartLine> {
        if quantity <= 0 {
            return Err(Error::Invalid(format!("cart quantity must be positive, got {}", quantity)));
        }

        let op = |e| Error::operation("add item to cart", e);
        let mut conn = self.connection()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(op)?;

        let existing: Option<i64> = tx
            .query_row("SELECT id FROM carrinhos WHERE usuario_id = ?1", [user_id], |row| row.get(0))
            .optional()
            .map_err(op)?;

        let cart_id = match existing {
            Some(id) => id,
            None => {
                tx.execute("INSERT INTO carrinhos (usuario_id) VALUES (?1)", [user_id])
                    .map_err(op)?;
                let id = tx.last_insert_rowid();
                debug!("Created cart {} for user {}", id, user_id);
                id
            }
        };

        let current: Option<i64> = tx
            .query_row(
                "SELECT quantidade FROM itens_carrinho WHERE carrinho_id = ?1 AND produto_id = ?2",
                [cart_id, product_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(op)?;
        if current.unwrap_or(0).checked_add(quantity).is_none() {
            return Err(Error::Invalid(format!(
                "cart quantity for product {} would overflow",
                product_id
            )));
        }

        tx.execute(
            r#"
            INSERT INTO itens_carrinho (carrinho_id, produto_id, quantidade)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(carrinho_id, produto_id) DO UPDATE SET quantidade = quantidade + excluded.quantidade
            "#,
            params![cart_id, product_id, quantity],
        )
        .map_err(op)?;

        let line = tx
            .query_row(
                &format!("{} WHERE i.carrinho_id = ?1 AND i.produto_id = ?2", CART_LINE_QUERY),
                [cart_id, product_id],
                row_to_cart_line,
            )
            .map_err(op)?;

        tx.commit().map_err(op)?;
        Ok(line)
    }

    /// Lines of the user's cart; empty when the user has no cart yet.
    pub fn cart_lines(&self, user_id: i64) -> Result<Vec<CartLine>> {
        let op = |e| Error::operation("read cart", e);
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare(&format!(
                "{} JOIN carrinhos c ON i.carrinho_id = c.id WHERE c.usuario_id = ?1 ORDER BY i.id",
                CART_LINE_QUERY
            ))
            .map_err(op)?;
        let lines = stmt
            .query_map([user_id], row_to_cart_line)
            .map_err(op)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(op)?;
        Ok(lines)
    }

    // ========== Reviews ==========

    /// Review a vendor and refresh its rating aggregates.
    pub fn review_vendor(&self, vendor_id: i64, user_id: i64, rating: f64, comment: Option<&str>) -> Result<i64> {
        self.review(ReviewSubject::Vendor, vendor_id, user_id, rating, comment)
    }

    /// Review a product and refresh its rating aggregates.
    pub fn review_product(&self, product_id: i64, user_id: i64, rating: f64, comment: Option<&str>) -> Result<i64> {
        self.review(ReviewSubject::Product, product_id, user_id, rating, comment)
    }

    fn review(
        &self,
        subject: ReviewSubject,
        subject_id: i64,
        user_id: i64,
        rating: f64,
        comment: Option<&str>,
    ) -> Result<i64> {
        if !(0.0..=5.0).contains(&rating) {
            return Err(Error::Invalid(format!("rating must be between 0 and 5, got {}", rating)));
        }

        let op = |e| Error::operation("save review", e);
        let mut conn = self.connection()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(op)?;

        tx.execute(
            &format!(
                "INSERT INTO {} ({}, usuario_id, nota, comentario) VALUES (?1, ?2, ?3, ?4)",
                subject.review_table(),
                subject.subject_column()
            ),
            params![subject_id, user_id, rating, comment],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Duplicate(format!(
                    "user {} already reviewed {} {}",
                    user_id,
                    subject.label(),
                    subject_id
                ))
            } else {
                op(e)
            }
        })?;
        let review_id = tx.last_insert_rowid();

        // Aggregates are recomputed from the review rows, not incremented.
        tx.execute(
            &format!(
                "UPDATE {subject} SET \
                 avaliacao_media = (SELECT COALESCE(AVG(nota), 0) FROM {reviews} WHERE {column} = ?1), \
                 total_avaliacoes = (SELECT COUNT(*) FROM {reviews} WHERE {column} = ?1) \
                 WHERE id = ?1",
                subject = subject.subject_table(),
                reviews = subject.review_table(),
                column = subject.subject_column(),
            ),
            [subject_id],
        )
        .map_err(op)?;

        tx.commit().map_err(op)?;
        debug!("User {} reviewed {} {} with {}", user_id, subject.label(), subject_id, rating);
        Ok(review_id)
    }

    // ========== Audit ==========

    pub fn record_search(
        &self,
        user_id: Option<i64>,
        term: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<i64> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO historico_buscas (usuario_id, termo_busca, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, term, latitude, longitude],
        )
        .map_err(|e| Error::operation("record search", e))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn log_action(
        &self,
        user_id: Option<i64>,
        action: &str,
        details: Option<&str>,
        ip_address: Option<&str>,
    ) -> Result<i64> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO log_acoes (usuario_id, acao, detalhes, ip_address) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, action, details, ip_address],
        )
        .map_err(|e| Error::operation("log action", e))?;
        Ok(conn.last_insert_rowid())
    }

    // ========== Statistics ==========

    pub fn stats(&self) -> Result<StoreStats> {
        let op = |e| Error::operation("read statistics", e);
        let conn = self.connection()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .map_err(op)?;
            Ok(n as usize)
        };

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .map_err(op)?;

        Ok(StoreStats {
            tables: tables as usize,
            expected_tables: schema::TABLE_NAMES.len(),
            users: count("usuarios")?,
            vendors: count("feirantes")?,
            categories: count("categorias")?,
            products: count("produtos")?,
            carts: count("carrinhos")?,
        })
    }
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let role = UserRole::from_tag(&row.get::<_, String>(7)?);

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        phone: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        role,
        active: row.get::<_, Option<bool>>(8)?.unwrap_or(true),
        created_at: row.get(9)?,
    })
}

fn row_to_vendor(row: &Row) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        id: row.get(0)?,
        user_id: row.get(1)?,
        stall_name: row.get(2)?,
        description: row.get(3)?,
        opening_hours: row.get(4)?,
        operating_days: row.get(5)?,
        rating_avg: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
        rating_count: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        active: row.get::<_, Option<bool>>(8)?.unwrap_or(true),
    })
}

fn row_to_listing(row: &Row) -> rusqlite::Result<ProductListing> {
    Ok(ProductListing {
        id: row.get(0)?,
        vendor_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        stock: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        category_id: row.get(6)?,
        latitude: row.get(7)?,
        longitude: row.get(8)?,
        rating_avg: row.get::<_, Option<f64>>(9)?.unwrap_or(0.0),
        rating_count: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
        active: row.get::<_, Option<bool>>(11)?.unwrap_or(true),
        created_at: row.get(12)?,
        vendor_name: row.get(13)?,
        category_name: row.get(14)?,
    })
}

fn row_to_cart_line(row: &Row) -> rusqlite::Result<CartLine> {
    Ok(CartLine {
        cart_id: row.get(0)?,
        product_id: row.get(1)?,
        product_name: row.get(2)?,
        unit_price: row.get(3)?,
        quantity: row.get(4)?,
    })
}

/// Row counts for a quick health check of the store
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub tables: usize,
    pub expected_tables: usize,
    pub users: usize,
    pub vendors: usize,
    pub categories: usize,
    pub products: usize,
    pub carts: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Tables: {}/{}", self.tables, self.expected_tables)?;
        writeln!(f, "  Users: {}", self.users)?;
        writeln!(f, "  Vendors: {}", self.vendors)?;
        writeln!(f, "  Categories: {}", self.categories)?;
        writeln!(f, "  Products: {}", self.products)?;
        write!(f, "  Carts: {}", self.carts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SchemaManager;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: FeiraStore,
    }

    fn setup() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feira.db");
        let mut manager = SchemaManager::new(&path);
        manager.initialize(true).unwrap();
        manager.close().unwrap();
        Fixture {
            _dir: dir,
            store: FeiraStore::new(path),
        }
    }

    fn category_id(store: &FeiraStore, name: &str) -> i64 {
        store
            .list_categories()
            .unwrap()
            .into_iter()
            .find(|c| c.name == name)
            .unwrap()
            .id
    }

    /// A vendor user with one stall; returns (user id, vendor id)
    fn vendor(store: &FeiraStore, email: &str) -> (i64, i64) {
        let user_id = store
            .create_user(&NewUser::new(email, "hash", "Maria Oliveira").with_role(UserRole::Feirante))
            .unwrap();
        let vendor_id = store
            .create_vendor(&NewVendor::new(user_id, "Feira Orgânica da Maria"))
            .unwrap();
        (user_id, vendor_id)
    }

    fn product(store: &FeiraStore, vendor_id: i64, category_id: i64, name: &str) -> i64 {
        store
            .create_product(&NewProduct::new(vendor_id, category_id, name, 8.5))
            .unwrap()
    }

    fn customer(store: &FeiraStore, email: &str) -> i64 {
        store.create_user(&NewUser::new(email, "hash", "Xamuel")).unwrap()
    }

    #[test]
    fn test_create_then_find_user() {
        let fx = setup();
        let new_user = NewUser::new("xamuel@exemplo.com", "hash_123", "Xamuel")
            .with_phone("(11) 99999-9999")
            .with_location(-23.550520, -46.633308);

        let id = fx.store.create_user(&new_user).unwrap();
        let user = fx.store.find_user_by_email("xamuel@exemplo.com").unwrap().unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.email, new_user.email);
        assert_eq!(user.password_hash, "hash_123");
        assert_eq!(user.phone.as_deref(), Some("(11) 99999-9999"));
        assert_eq!(user.latitude, Some(-23.550520));
        assert_eq!(user.longitude, Some(-46.633308));
        assert_eq!(user.role, UserRole::Cliente);
        assert!(user.active);

        let second = customer(&fx.store, "other@exemplo.com");
        assert_ne!(second, id);
    }

    #[test]
    fn test_duplicate_email() {
        let fx = setup();
        let first = NewUser::new("dup@exemplo.com", "hash_a", "First");
        let id = fx.store.create_user(&first).unwrap();

        let err = fx
            .store
            .create_user(&NewUser::new("dup@exemplo.com", "hash_b", "Second"))
            .unwrap_err();
        assert!(err.is_duplicate());

        let user = fx.store.find_user_by_email("dup@exemplo.com").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "First");
        assert_eq!(user.password_hash, "hash_a");
    }

    #[test]
    fn test_find_missing_and_case_sensitive() {
        let fx = setup();
        customer(&fx.store, "case@exemplo.com");
        assert!(fx.store.find_user_by_email("nobody@exemplo.com").unwrap().is_none());
        assert!(fx.store.find_user_by_email("CASE@exemplo.com").unwrap().is_none());
    }

    #[test]
    fn test_store_fault_is_operation_error() {
        let dir = tempfile::tempdir().unwrap();
        // No schema: the table does not exist.
        let store = FeiraStore::new(dir.path().join("empty.db"));
        let err = store.create_user(&NewUser::new("a@b.com", "h", "A")).unwrap_err();
        assert!(matches!(err, Error::Operation { .. }));
        assert!(!err.is_duplicate());

        let unreachable = FeiraStore::new(dir.path().join("missing").join("feira.db"));
        assert!(matches!(
            unreachable.find_user_by_email("a@b.com"),
            Err(Error::Connection { .. })
        ));
    }

    #[test]
    fn test_add_to_cart_accumulates() {
        let fx = setup();
        let (_, vendor_id) = vendor(&fx.store, "feirante@exemplo.com");
        let apple = product(&fx.store, vendor_id, category_id(&fx.store, "Frutas"), "Maçã Fuji");
        let user = customer(&fx.store, "cliente@exemplo.com");

        let first = fx.store.add_to_cart(user, apple, 3).unwrap();
        let second = fx.store.add_to_cart(user, apple, 2).unwrap();

        assert_eq!(first.cart_id, second.cart_id);
        assert_eq!(second.quantity, 5);

        let lines = fx.store.cart_lines(user).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].product_name, "Maçã Fuji");
    }

    #[test]
    fn test_cart_created_once() {
        let fx = setup();
        let (_, vendor_id) = vendor(&fx.store, "feirante@exemplo.com");
        let fruits = category_id(&fx.store, "Frutas");
        let apple = product(&fx.store, vendor_id, fruits, "Maçã");
        let banana = product(&fx.store, vendor_id, fruits, "Banana");
        let user = customer(&fx.store, "cliente@exemplo.com");

        assert!(fx.store.cart_lines(user).unwrap().is_empty());
        fx.store.add_to_cart(user, apple, 1).unwrap();
        fx.store.add_to_cart(user, banana, 4).unwrap();

        let conn = fx.store.connection().unwrap();
        let carts: i64 = conn
            .query_row("SELECT COUNT(*) FROM carrinhos WHERE usuario_id = ?1", [user], |row| row.get(0))
            .unwrap();
        assert_eq!(carts, 1);
        assert_eq!(fx.store.cart_lines(user).unwrap().len(), 2);

        let dup = conn.execute("INSERT INTO carrinhos (usuario_id) VALUES (?1)", [user]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_find_user_with_unlisted_role() {
        let fx = setup();
        fx.store
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO usuarios (email, senha_hash, nome, tipo) VALUES ('x@y.com', 'h', 'X', 'customer ')",
                [],
            )
            .unwrap();

        let user = fx.store.find_user_by_email("x@y.com").unwrap().unwrap();
        assert_eq!(user.role, UserRole::Other("customer ".to_string()));
        assert_eq!(user.role.as_str(), "customer ");
    }

    #[test]
    fn test_cart_quantity_overflow_is_invalid() {
        let fx = setup();
        let (_, stall) = vendor(&fx.store, "feirante@exemplo.com");
        let apple = product(&fx.store, stall, category_id(&fx.store, "Frutas"), "Maçã");
        let user = customer(&fx.store, "cliente@exemplo.com");

        fx.store.add_to_cart(user, apple, i64::MAX).unwrap();
        assert!(matches!(fx.store.add_to_cart(user, apple, 1), Err(Error::Invalid(_))));

        let lines = fx.store.cart_lines(user).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, i64::MAX);
    }

    #[test]
    fn test_add_to_cart_rejects_bad_input() {
        let fx = setup();
        let user = customer(&fx.store, "cliente@exemplo.com");
        assert!(matches!(fx.store.add_to_cart(user, 1, 0), Err(Error::Invalid(_))));
        // Unknown product trips the foreign key and leaves no cart behind.
        assert!(matches!(fx.store.add_to_cart(user, 999, 1), Err(Error::Operation { .. })));
        let carts: i64 = fx
            .store
            .connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM carrinhos", [], |row| row.get(0))
            .unwrap();
        assert_eq!(carts, 0);
    }

    #[test]
    fn test_concurrent_first_adds_share_one_cart() {
        let fx = setup();
        let (_, vendor_id) = vendor(&fx.store, "feirante@exemplo.com");
        let apple = product(&fx.store, vendor_id, category_id(&fx.store, "Frutas"), "Maçã");
        let user = customer(&fx.store, "cliente@exemplo.com");

        let store = Arc::new(fx.store.clone());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.add_to_cart(user, apple, 1).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = fx.store.cart_lines(user).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 8);
    }

    #[test]
    fn test_listing_filters_and_orders() {
        let fx = setup();
        let fruits = category_id(&fx.store, "Frutas");
        let bakery = category_id(&fx.store, "Padaria");
        let (_, open_stall) = vendor(&fx.store, "a@exemplo.com");
        let (_, closed_stall) = vendor(&fx.store, "b@exemplo.com");

        let apple = product(&fx.store, open_stall, fruits, "Maçã");
        let banana = product(&fx.store, open_stall, fruits, "Banana");
        let bread = product(&fx.store, open_stall, bakery, "Pão");
        let hidden = product(&fx.store, open_stall, fruits, "Pera");
        let closed = product(&fx.store, closed_stall, fruits, "Uva");

        let conn = fx.store.connection().unwrap();
        conn.execute("UPDATE produtos SET ativo = 0 WHERE id = ?1", [hidden]).unwrap();
        conn.execute("UPDATE feirantes SET ativo = 0 WHERE id = ?1", [closed_stall]).unwrap();
        conn.execute("UPDATE produtos SET avaliacao_media = 4.5 WHERE id = ?1", [banana]).unwrap();
        conn.execute("UPDATE produtos SET avaliacao_media = 3.0 WHERE id = ?1", [bread]).unwrap();

        let all = fx.store.list_products_by_location(-23.55, -46.63, 10.0, None).unwrap();
        let ids: Vec<i64> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![banana, bread, apple]);
        assert!(!ids.contains(&hidden));
        assert!(!ids.contains(&closed));
        assert_eq!(all[0].vendor_name, "Feira Orgânica da Maria");
        assert_eq!(all[1].category_name, "Padaria");

        let only_fruits = fx.store.list_products_by_location(0.0, 0.0, 10.0, Some(fruits)).unwrap();
        let ids: Vec<i64> = only_fruits.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![banana, apple]);
    }

    #[test]
    fn test_listing_ignores_location() {
        let fx = setup();
        let fruits = category_id(&fx.store, "Frutas");
        let (_, stall) = vendor(&fx.store, "a@exemplo.com");
        let mut far = NewProduct::new(stall, fruits, "Manga", 5.0);
        far.latitude = Some(40.7);
        far.longitude = Some(-74.0);
        fx.store.create_product(&far).unwrap();
        product(&fx.store, stall, fruits, "Maçã");

        let near = fx.store.list_products_by_location(-23.55, -46.63, 1.0, Some(fruits)).unwrap();
        let wide = fx.store.list_products_by_location(10.0, 10.0, 10000.0, Some(fruits)).unwrap();
        assert_eq!(near, wide);
        assert_eq!(near.len(), 2);
    }

    #[test]
    fn test_vendor_cascade_removes_products() {
        let fx = setup();
        let fruits = category_id(&fx.store, "Frutas");
        let (_, stall) = vendor(&fx.store, "a@exemplo.com");
        product(&fx.store, stall, fruits, "Maçã");
        product(&fx.store, stall, fruits, "Banana");

        let conn = fx.store.connection().unwrap();
        conn.execute("DELETE FROM feirantes WHERE id = ?1", [stall]).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM produtos WHERE feirante_id = ?1", [stall], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_user_cascade_and_set_null() {
        let fx = setup();
        let fruits = category_id(&fx.store, "Frutas");
        let (seller, stall) = vendor(&fx.store, "seller@exemplo.com");
        let apple = product(&fx.store, stall, fruits, "Maçã");
        let pear = product(&fx.store, stall, fruits, "Pera");
        let buyer = customer(&fx.store, "buyer@exemplo.com");
        let other = customer(&fx.store, "other@exemplo.com");

        fx.store.add_to_cart(buyer, apple, 2).unwrap();
        fx.store.review_vendor(stall, buyer, 4.0, Some("bom")).unwrap();
        fx.store.review_product(apple, buyer, 5.0, None).unwrap();
        fx.store.review_product(pear, buyer, 3.0, None).unwrap();
        fx.store.review_product(pear, other, 4.0, None).unwrap();
        fx.store.record_search(Some(buyer), "maçã", None, None).unwrap();
        fx.store.log_action(Some(buyer), "login", None, Some("127.0.0.1")).unwrap();

        let conn = fx.store.connection().unwrap();
        conn.execute(
            "INSERT INTO mensagens (remetente_id, destinatario_id, produto_id, mensagem) VALUES (?1, ?2, ?3, 'tem maçã?')",
            [buyer, seller, apple],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO mensagens (remetente_id, destinatario_id, mensagem) VALUES (?1, ?2, 'oi')",
            [seller, buyer],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO mensagens (remetente_id, destinatario_id, produto_id, mensagem) VALUES (?1, ?2, ?3, 'ainda tem?')",
            [other, seller, apple],
        )
        .unwrap();

        // Product removal nulls the message reference but keeps the message.
        conn.execute("DELETE FROM itens_carrinho WHERE produto_id = ?1", [apple]).unwrap();
        conn.execute("DELETE FROM produtos WHERE id = ?1", [apple]).unwrap();
        let product_ref: Option<i64> = conn
            .query_row("SELECT produto_id FROM mensagens WHERE remetente_id = ?1", [other], |row| row.get(0))
            .unwrap();
        assert!(product_ref.is_none());

        conn.execute("DELETE FROM usuarios WHERE id = ?1", [buyer]).unwrap();
        let count = |sql: &str| -> i64 { conn.query_row(sql, [buyer], |row| row.get(0)).unwrap() };
        assert_eq!(count("SELECT COUNT(*) FROM carrinhos WHERE usuario_id = ?1"), 0);
        assert_eq!(count("SELECT COUNT(*) FROM avaliacoes_feirantes WHERE usuario_id = ?1"), 0);
        assert_eq!(count("SELECT COUNT(*) FROM avaliacoes_produtos WHERE usuario_id = ?1"), 0);
        let pear_reviews: i64 = conn
            .query_row("SELECT COUNT(*) FROM avaliacoes_produtos WHERE produto_id = ?1", [pear], |row| row.get(0))
            .unwrap();
        assert_eq!(pear_reviews, 1);
        assert_eq!(
            count("SELECT COUNT(*) FROM mensagens WHERE remetente_id = ?1 OR destinatario_id = ?1"),
            0
        );
        assert_eq!(count("SELECT COUNT(*) FROM historico_buscas WHERE usuario_id = ?1"), 0);
        let audit: i64 = conn
            .query_row("SELECT COUNT(*) FROM log_acoes WHERE usuario_id IS NULL", [], |row| row.get(0))
            .unwrap();
        assert_eq!(audit, 1);

        conn.execute("DELETE FROM usuarios WHERE id = ?1", [seller]).unwrap();
        assert!(fx.store.find_vendor(stall).unwrap().is_none());
        let messages: i64 = conn
            .query_row("SELECT COUNT(*) FROM mensagens", [], |row| row.get(0))
            .unwrap();
        assert_eq!(messages, 0);
    }

    #[test]
    fn test_reviews_refresh_aggregates() {
        let fx = setup();
        let fruits = category_id(&fx.store, "Frutas");
        let (_, stall) = vendor(&fx.store, "a@exemplo.com");
        let apple = product(&fx.store, stall, fruits, "Maçã");
        let ana = customer(&fx.store, "ana@exemplo.com");
        let bia = customer(&fx.store, "bia@exemplo.com");

        fx.store.review_vendor(stall, ana, 4.0, Some("ótimo")).unwrap();
        fx.store.review_vendor(stall, bia, 5.0, None).unwrap();
        let vendor = fx.store.find_vendor(stall).unwrap().unwrap();
        assert_eq!(vendor.rating_count, 2);
        assert!((vendor.rating_avg - 4.5).abs() < 1e-9);

        fx.store.review_product(apple, ana, 3.0, None).unwrap();
        let listing = fx.store.list_products_by_location(0.0, 0.0, 1.0, None).unwrap();
        assert_eq!(listing[0].rating_count, 1);
        assert!((listing[0].rating_avg - 3.0).abs() < 1e-9);

        let dup = fx.store.review_product(apple, ana, 1.0, None).unwrap_err();
        assert!(dup.is_duplicate());
        assert!(matches!(
            fx.store.review_product(apple, bia, 5.5, None),
            Err(Error::Invalid(_))
        ));

        let listing = fx.store.list_products_by_location(0.0, 0.0, 1.0, None).unwrap();
        assert_eq!(listing[0].rating_count, 1);
    }

    #[test]
    fn test_stats() {
        let fx = setup();
        let (_, stall) = vendor(&fx.store, "a@exemplo.com");
        product(&fx.store, stall, category_id(&fx.store, "Padaria"), "Pão");

        let stats = fx.store.stats().unwrap();
        assert_eq!(stats.tables, 13);
        assert_eq!(stats.expected_tables, 13);
        assert_eq!(stats.users, 1);
        assert_eq!(stats.vendors, 1);
        assert_eq!(stats.categories, 5);
        assert_eq!(stats.products, 1);
        assert_eq!(stats.carts, 0);
        assert!(stats.to_string().contains("Tables: 13/13"));
    }
}
