use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

use super::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Instructor, Role::Admin];

    const fn bit(self) -> u8 {
        match self {
            Role::Student => 0b001,
            Role::Instructor => 0b010,
            Role::Admin => 0b100,
        }
    }
}

/// Independent capability flags. Holding one role never implies another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roles(u8);

impl Roles {
    pub const NONE: Roles = Roles(0);

    pub fn of(roles: &[Role]) -> Self {
        roles.iter().fold(Roles::NONE, |acc, role| acc.with(*role))
    }

    pub fn with(self, role: Role) -> Self {
        Roles(self.0 | role.bit())
    }

    pub fn without(self, role: Role) -> Self {
        Roles(self.0 & !role.bit())
    }

    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn to_vec(self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|role| self.contains(*role)).collect()
    }
}

impl Serialize for Roles {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Roles {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let roles = Vec::<Role>::deserialize(deserializer)?;
        Ok(Roles::of(&roles))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub roles: Roles,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub roles: Roles,
    pub is_superuser: bool,
}

#[derive(Debug, Clone)]
pub struct UserChanges {
    pub email: String,
    pub full_name: String,
    pub roles: Roles,
    pub is_superuser: bool,
    pub is_active: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, StoreError>;
    async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    is_student: bool,
    is_instructor: bool,
    is_admin: bool,
    is_superuser: bool,
    is_active: bool,
    date_joined: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let mut roles = Roles::NONE;
        if row.is_student {
            roles = roles.with(Role::Student);
        }
        if row.is_instructor {
            roles = roles.with(Role::Instructor);
        }
        if row.is_admin {
            roles = roles.with(Role::Admin);
        }

        User {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            password_hash: row.password_hash,
            roles,
            is_superuser: row.is_superuser,
            is_active: row.is_active,
            date_joined: row.date_joined,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, is_student, is_instructor, \
     is_admin, is_superuser, is_active, date_joined";

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
                INSERT INTO users (username, email, full_name, password_hash, is_student, is_instructor, is_admin, is_superuser)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.password_hash)
            .bind(user.roles.contains(Role::Student))
            .bind(user.roles.contains(Role::Instructor))
            .bind(user.roles.contains(Role::Admin))
            .bind(user.is_superuser)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 ORDER BY id LIMIT 1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY date_joined DESC, id DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, StoreError> {
        let sql = format!(
            r#"
                UPDATE users
                SET email = $2, full_name = $3, is_student = $4, is_instructor = $5,
                    is_admin = $6, is_superuser = $7, is_active = $8
                WHERE id = $1
                RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&changes.email)
            .bind(&changes.full_name)
            .bind(changes.roles.contains(Role::Student))
            .bind(changes.roles.contains(Role::Instructor))
            .bind(changes.roles.contains(Role::Admin))
            .bind(changes.is_superuser)
            .bind(changes.is_active)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
