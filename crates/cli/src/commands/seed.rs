//! Seed the marketplace database from a YAML file.
//!
//! The file lists accounts, categories, one business per vendor, and the
//! vendors' listings. Listings reference their vendor by email and their
//! category by slug, so the file never depends on row IDs. Prices are in
//! rupees.
//!
//! Everything is written in one transaction; a bad row leaves the database
//! untouched.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info};

use nellore_market_api::services::auth::password::hash_password;
use nellore_market_api::services::catalog::slugify;
use nellore_market_core::{BusinessType, Email, Money, UserRole};

/// Tables in the order they can be emptied without tripping foreign keys.
const CLEAR_ORDER: [&str; 10] = [
    "cart",
    "order_items",
    "orders",
    "reviews",
    "services",
    "products",
    "businesses",
    "users",
    "service_categories",
    "product_categories",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub users: Vec<SeedUser>,
    pub service_categories: Vec<SeedCategory>,
    pub product_categories: Vec<SeedCategory>,
    pub businesses: Vec<SeedBusiness>,
    pub services: Vec<SeedService>,
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedBusiness {
    /// Owner's email; must be a vendor listed under `users`.
    pub owner: String,
    pub business_name: String,
    pub business_type: BusinessType,
    pub description: Option<String>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub pincode: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub rating: f64,
}

#[derive(Debug, Deserialize)]
pub struct SeedService {
    pub vendor: String,
    pub category: String,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Money,
    #[serde(default = "default_price_unit")]
    pub price_unit: String,
    pub duration_mins: Option<i64>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub vendor: String,
    pub category: String,
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Money,
    pub mrp: Option<Money>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub image: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
}

fn default_price_unit() -> String {
    "per service".to_owned()
}

fn default_unit() -> String {
    "piece".to_owned()
}

/// Row counts written by a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub service_categories: usize,
    pub product_categories: usize,
    pub businesses: usize,
    pub services: usize,
    pub products: usize,
}

/// Check cross-references and values before touching the database.
///
/// Returns one message per problem; an empty list means the file is usable.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    let mut emails = HashSet::new();
    let mut vendors = HashSet::new();
    for user in &seed.users {
        match Email::parse(&user.email) {
            Ok(email) => {
                if !emails.insert(email.as_str().to_owned()) {
                    errors.push(format!("duplicate user email: {}", user.email));
                }
                if matches!(user.role, UserRole::Vendor | UserRole::Admin) {
                    vendors.insert(email.as_str().to_owned());
                }
            }
            Err(e) => errors.push(format!("user {}: {e}", user.email)),
        }
        if user.name.trim().is_empty() {
            errors.push(format!("user {}: name is required", user.email));
        }
        if user.password.is_empty() {
            errors.push(format!("user {}: password is required", user.email));
        }
    }

    let service_slugs = unique_slugs(&seed.service_categories, "service", &mut errors);
    let product_slugs = unique_slugs(&seed.product_categories, "product", &mut errors);

    let mut owners = HashSet::new();
    for business in &seed.businesses {
        let owner = business.owner.trim().to_lowercase();
        if !vendors.contains(&owner) {
            errors.push(format!(
                "business {}: owner {} is not a vendor",
                business.business_name, business.owner
            ));
        }
        if !owners.insert(owner) {
            errors.push(format!(
                "business {}: {} already owns a business",
                business.business_name, business.owner
            ));
        }
    }

    for service in &seed.services {
        check_listing(
            &service.name,
            &service.vendor,
            &service.category,
            &vendors,
            &service_slugs,
            &mut errors,
        );
        if service.price.is_negative() {
            errors.push(format!("service {}: price must not be negative", service.name));
        }
        check_rating(&service.name, service.rating, &mut errors);
    }

    for product in &seed.products {
        check_listing(
            &product.name,
            &product.vendor,
            &product.category,
            &vendors,
            &product_slugs,
            &mut errors,
        );
        if product.price.is_negative() {
            errors.push(format!("product {}: price must not be negative", product.name));
        }
        if product.stock < 0 {
            errors.push(format!("product {}: stock must not be negative", product.name));
        }
        check_rating(&product.name, product.rating, &mut errors);
    }

    errors
}

fn unique_slugs<'a>(
    categories: &'a [SeedCategory],
    kind: &str,
    errors: &mut Vec<String>,
) -> HashSet<&'a str> {
    let mut slugs = HashSet::new();
    for category in categories {
        if !slugs.insert(category.slug.as_str()) {
            errors.push(format!("duplicate {kind} category slug: {}", category.slug));
        }
    }
    slugs
}

fn check_listing(
    name: &str,
    vendor: &str,
    category: &str,
    vendors: &HashSet<String>,
    categories: &HashSet<&str>,
    errors: &mut Vec<String>,
) {
    if !vendors.contains(&vendor.trim().to_lowercase()) {
        errors.push(format!("{name}: vendor {vendor} is not a vendor account"));
    }
    if !categories.contains(category) {
        errors.push(format!("{name}: unknown category {category}"));
    }
}

fn check_rating(name: &str, rating: f64, errors: &mut Vec<String>) {
    if !(0.0..=5.0).contains(&rating) {
        errors.push(format!("{name}: rating must be between 0 and 5"));
    }
}

/// Seed the database from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML seed file
/// * `clear` - If true, delete all marketplace rows first
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if a
/// database operation fails.
pub async fn from_file(file_path: &str, clear: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");

    // Parse and validate before connecting
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = super::connect().await?;

    info!(clear, "Starting seeding process");
    let summary = seed_database(&pool, &seed, clear).await?;

    info!("Seeding complete!");
    info!("  Users: {}", summary.users);
    info!("  Service categories: {}", summary.service_categories);
    info!("  Services: {}", summary.services);
    info!("  Product categories: {}", summary.product_categories);
    info!("  Products: {}", summary.products);
    info!("  Businesses: {}", summary.businesses);

    Ok(())
}

/// Write a validated seed file in a single transaction.
///
/// # Errors
///
/// Returns an error if hashing a password or any insert fails; nothing is
/// committed in that case.
pub async fn seed_database(
    pool: &SqlitePool,
    seed: &SeedFile,
    clear: bool,
) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let mut tx = pool.begin().await?;

    if clear {
        for table in CLEAR_ORDER {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        info!("Cleared existing data");
    }

    let service_categories =
        insert_categories(&mut tx, "service_categories", &seed.service_categories).await?;
    let product_categories =
        insert_categories(&mut tx, "product_categories", &seed.product_categories).await?;

    let mut user_ids = HashMap::new();
    for user in &seed.users {
        let email = Email::parse(&user.email)?;
        let password_hash = hash_password(&user.password)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (name, email, phone, password_hash, role, address) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(user.name.trim())
        .bind(&email)
        .bind(&user.phone)
        .bind(&password_hash)
        .bind(user.role)
        .bind(&user.address)
        .fetch_one(&mut *tx)
        .await?;
        user_ids.insert(email.as_str().to_owned(), id);
    }

    for business in &seed.businesses {
        let owner = lookup(&user_ids, &business.owner)?;
        sqlx::query(
            "INSERT INTO businesses (user_id, business_name, business_type, description, \
             address, area, pincode, phone, whatsapp, is_verified, rating) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner)
        .bind(&business.business_name)
        .bind(business.business_type)
        .bind(&business.description)
        .bind(&business.address)
        .bind(&business.area)
        .bind(&business.pincode)
        .bind(&business.phone)
        .bind(&business.whatsapp)
        .bind(business.is_verified)
        .bind(business.rating)
        .execute(&mut *tx)
        .await?;
    }

    for service in &seed.services {
        let vendor = lookup(&user_ids, &service.vendor)?;
        let category = lookup(&service_categories, &service.category)?;
        let slug = service
            .slug
            .clone()
            .unwrap_or_else(|| slugify(&service.name));
        sqlx::query(
            "INSERT INTO services (category_id, vendor_id, name, slug, description, price, \
             price_unit, duration_mins, rating, review_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(category)
        .bind(vendor)
        .bind(&service.name)
        .bind(slug)
        .bind(&service.description)
        .bind(service.price.paise())
        .bind(&service.price_unit)
        .bind(service.duration_mins)
        .bind(service.rating)
        .bind(service.review_count)
        .execute(&mut *tx)
        .await?;
    }

    for product in &seed.products {
        let vendor = lookup(&user_ids, &product.vendor)?;
        let category = lookup(&product_categories, &product.category)?;
        let slug = product
            .slug
            .clone()
            .unwrap_or_else(|| slugify(&product.name));
        sqlx::query(
            "INSERT INTO products (category_id, vendor_id, name, slug, description, price, mrp, \
             stock, unit, image, is_featured, rating, review_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(category)
        .bind(vendor)
        .bind(&product.name)
        .bind(slug)
        .bind(&product.description)
        .bind(product.price.paise())
        .bind(product.mrp.unwrap_or(product.price).paise())
        .bind(product.stock)
        .bind(&product.unit)
        .bind(&product.image)
        .bind(product.featured)
        .bind(product.rating)
        .bind(product.review_count)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(SeedSummary {
        users: seed.users.len(),
        service_categories: seed.service_categories.len(),
        product_categories: seed.product_categories.len(),
        businesses: seed.businesses.len(),
        services: seed.services.len(),
        products: seed.products.len(),
    })
}

async fn insert_categories(
    conn: &mut SqliteConnection,
    table: &str,
    categories: &[SeedCategory],
) -> Result<HashMap<String, i64>, sqlx::Error> {
    let mut ids = HashMap::with_capacity(categories.len());
    for category in categories {
        let id: i64 = sqlx::query_scalar(&format!(
            "INSERT INTO {table} (name, slug, icon, description) VALUES (?, ?, ?, ?) RETURNING id"
        ))
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.icon)
        .bind(&category.description)
        .fetch_one(&mut *conn)
        .await?;
        ids.insert(category.slug.clone(), id);
    }
    Ok(ids)
}

fn lookup(ids: &HashMap<String, i64>, key: &str) -> Result<i64, String> {
    ids.get(key.trim().to_lowercase().as_str())
        .or_else(|| ids.get(key))
        .copied()
        .ok_or_else(|| format!("unknown reference: {key}"))
}
