//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use nellore_market_core::{Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str =
    "id, name, email, phone, role, avatar, address, city, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    phone: Option<String>,
    role: UserRole,
    avatar: Option<String>,
    address: Option<String>,
    city: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            phone: row.phone,
            role: row.role,
            avatar: row.avatar,
            address: row.address,
            city: row.city,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields for a new account. `password_hash` is an Argon2 PHC string.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
    pub role: UserRole,
}

/// Partial profile update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.address.is_none() && self.city.is_none()
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user together with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(self.pool)
                .await?;

        let Some((hash,)) = row else {
            return Ok(None);
        };
        Ok(self.get_by_email(email).await?.map(|user| (user, hash)))
    }

    /// Get the password hash for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(hash,)| hash))
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or phone is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (name, email, phone, password_hash, role) \
             VALUES (?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.email)
        .bind(new.phone)
        .bind(new.password_hash)
        .bind(new.role)
        .fetch_one(self.pool)
        .await
        .map_err(unique_field_conflict)?;

        row.try_into()
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the new phone is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET \
                name = COALESCE(?, name), \
                phone = COALESCE(?, phone), \
                address = COALESCE(?, address), \
                city = COALESCE(?, city), \
                updated_at = CURRENT_TIMESTAMP \
             WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.address.as_deref())
        .bind(update.city.as_deref())
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(unique_field_conflict)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_password(&self, id: UserId, hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(hash)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Change a user's role inside an open transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(
        conn: &mut SqliteConnection,
        id: UserId,
        role: UserRole,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET role = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(role)
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Names the unique column that rejected an insert or update.
fn unique_field_conflict(err: sqlx::Error) -> RepositoryError {
    let field = match &err {
        sqlx::Error::Database(db_err) if db_err.message().contains("users.phone") => {
            "Phone number already registered"
        }
        _ => "Email already registered",
    };
    RepositoryError::conflict_on_unique(err, field)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn test_create_and_fetch() {
        let pool = create_memory_pool().await.unwrap();
        let repo = UserRepository::new(&pool);
        let email = Email::parse("asha@nellore.com").unwrap();

        let user = repo
            .create(&NewUser {
                name: "Asha",
                email: &email,
                phone: Some("9876500001"),
                password_hash: "hash",
                role: UserRole::Customer,
            })
            .await
            .unwrap();

        assert_eq!(user.city, "Nellore");
        assert_eq!(user.role, UserRole::Customer);

        let (found, hash) = repo.get_credentials(&email).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(hash, "hash");
    }

    #[tokio::test]
    async fn test_duplicate_email_and_phone_conflict() {
        let pool = create_memory_pool().await.unwrap();
        let repo = UserRepository::new(&pool);
        let email = Email::parse("dup@nellore.com").unwrap();
        let other = Email::parse("other@nellore.com").unwrap();
        let new = NewUser {
            name: "Dup",
            email: &email,
            phone: Some("9876500002"),
            password_hash: "hash",
            role: UserRole::Customer,
        };
        repo.create(&new).await.unwrap();

        let err = repo
            .create(&NewUser {
                phone: Some("9876500003"),
                ..new.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref m) if m.contains("Email")));

        let err = repo
            .create(&NewUser {
                email: &other,
                ..new.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ref m) if m.contains("Phone")));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_unset_fields() {
        let pool = create_memory_pool().await.unwrap();
        let repo = UserRepository::new(&pool);
        let email = Email::parse("ravi@nellore.com").unwrap();
        let user = repo
            .create(&NewUser {
                name: "Ravi",
                email: &email,
                phone: None,
                password_hash: "hash",
                role: UserRole::Customer,
            })
            .await
            .unwrap();

        let updated = repo
            .update_profile(
                user.id,
                &ProfileUpdate {
                    address: Some("Trunk Road".to_string()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ravi");
        assert_eq!(updated.address.as_deref(), Some("Trunk Road"));
    }
}
