//! Row and input types for the marketplace schema
//!
//! Read types (`User`, `Vendor`, `ProductListing`, ...) mirror table rows.
//! Input types (`NewUser`, `NewVendor`, `NewProduct`) carry only what the
//! caller supplies; identifiers, defaults and timestamps come from the store.

use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role tag stored in `usuarios.tipo`
///
/// The column is free text, so tags written by other tools decode as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    #[default]
    Cliente,
    Feirante,
    Admin,
    Other(String),
}

impl UserRole {
    pub fn as_str(&self) -> &str {
        match self {
            UserRole::Cliente => "cliente",
            UserRole::Feirante => "feirante",
            UserRole::Admin => "admin",
            UserRole::Other(tag) => tag,
        }
    }

    /// Decode a stored tag exactly as written. Never fails.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "cliente" => UserRole::Cliente,
            "feirante" => UserRole::Feirante,
            "admin" => UserRole::Admin,
            other => UserRole::Other(other.to_string()),
        }
    }
}

impl From<String> for UserRole {
    fn from(tag: String) -> Self {
        UserRole::from_tag(&tag)
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.as_str().to_string()
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cliente" | "customer" => Ok(UserRole::Cliente),
            "feirante" | "vendor" => Ok(UserRole::Feirante),
            "admin" => Ok(UserRole::Admin),
            _ => Err(Error::Invalid(format!("Unknown user role: {}", s))),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Unique, matched case-sensitively
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub role: UserRole,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

/// Fields accepted by [`crate::FeiraStore::create_user`]
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Defaults to [`UserRole::Cliente`] when omitted
    pub role: Option<UserRole>,
}

impl NewUser {
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// Vendor profile (1:1 extension of a user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub user_id: i64,
    pub stall_name: String,
    pub description: Option<String>,
    pub opening_hours: Option<String>,
    pub operating_days: Option<String>,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewVendor {
    pub user_id: i64,
    pub stall_name: String,
    pub description: Option<String>,
    pub opening_hours: Option<String>,
    pub operating_days: Option<String>,
}

impl NewVendor {
    pub fn new(user_id: i64, stall_name: impl Into<String>) -> Self {
        Self {
            user_id,
            stall_name: stall_name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub vendor_id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl NewProduct {
    pub fn new(vendor_id: i64, category_id: i64, name: impl Into<String>, price: f64) -> Self {
        Self {
            vendor_id,
            category_id,
            name: name.into(),
            price,
            ..Self::default()
        }
    }
}

/// A product row joined with its vendor's stall name and its category name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListing {
    pub id: i64,
    pub vendor_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    pub category_id: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub active: bool,
    pub created_at: NaiveDateTime,
    pub vendor_name: String,
    pub category_name: String,
}

/// One product line in a user's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub cart_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: f64,
    pub quantity: i64,
}
