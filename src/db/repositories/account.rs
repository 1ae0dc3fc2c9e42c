use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    LoaderTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::db::{StoreError, StoreResult};
use crate::domain::{AccountId, Gender, RoleName};
use crate::entities::{authorities, prelude::*, users, users_authorities};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Mutable profile attributes of an account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountProfileFields {
    pub first_name: String,
    pub last_name: Option<String>,
    pub gender: Gender,
    pub birthday: Option<NaiveDate>,
    pub hide_birthday: bool,
    pub info: Option<String>,
    pub photo_link: Option<String>,
}

/// A persisted account with its role set resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
    pub enabled: bool,
    pub roles: BTreeSet<RoleName>,
    pub profile: AccountProfileFields,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    /// Fails with a type error when a stored column no longer parses.
    fn from_parts(model: users::Model, authorities: &[authorities::Model]) -> StoreResult<Self> {
        let birthday = model
            .birthday
            .as_deref()
            .map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT))
            .transpose()
            .map_err(|e| corrupt_column(model.id, "birthday", &e.to_string()))?;
        let gender: Gender = model
            .gender
            .parse()
            .map_err(|e: String| corrupt_column(model.id, "gender", &e))?;

        Ok(Self {
            id: AccountId::new(model.id),
            username: model.username,
            password_hash: model.password_hash,
            enabled: model.enabled,
            roles: authorities
                .iter()
                .filter_map(|a| RoleName::parse(&a.authority))
                .collect(),
            profile: AccountProfileFields {
                first_name: model.first_name,
                last_name: model.last_name,
                gender,
                birthday,
                hide_birthday: model.hide_birthday,
                info: model.info,
                photo_link: model.photo_link,
            },
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

fn corrupt_column(id: i32, column: &str, detail: &str) -> StoreError {
    warn!(account_id = id, column, detail, "Unreadable account column");
    StoreError::Database(DbErr::Type(format!(
        "users.{column} of account {id}: {detail}"
    )))
}

/// An account that has not been assigned an identifier yet.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub enabled: bool,
    pub roles: BTreeSet<RoleName>,
    pub profile: AccountProfileFields,
}

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let user = Users::find_by_id(id.value()).one(&self.conn).await?;

        match user {
            Some(model) => Ok(load_roles(&self.conn, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        match user {
            Some(model) => Ok(load_roles(&self.conn, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn exists_by_id(&self, id: AccountId) -> StoreResult<bool> {
        let count = Users::find_by_id(id.value()).count(&self.conn).await?;
        Ok(count > 0)
    }

    pub async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        let count = Users::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn find_all(&self) -> StoreResult<Vec<Account>> {
        let models = Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await?;

        load_roles(&self.conn, models).await
    }

    pub async fn find_all_by_id(&self, ids: &[AccountId]) -> StoreResult<Vec<Account>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = Users::find()
            .filter(users::Column::Id.is_in(ids.iter().map(AccountId::value)))
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await?;

        load_roles(&self.conn, models).await
    }

    /// Inserts the account and its role links in one transaction and assigns
    /// the identifier.
    ///
    /// The unique index on `username` turns a racing duplicate into
    /// [`StoreError::Conflict`].
    pub async fn insert(&self, account: NewAccount) -> StoreResult<Account> {
        let timestamp = now();
        let txn = self.conn.begin().await?;

        let model = users::ActiveModel {
            username: Set(account.username.clone()),
            password_hash: Set(account.password_hash),
            enabled: Set(account.enabled),
            first_name: Set(account.profile.first_name),
            last_name: Set(account.profile.last_name),
            gender: Set(account.profile.gender.as_str().to_string()),
            birthday: Set(account
                .profile
                .birthday
                .map(|d| d.format(DATE_FORMAT).to_string())),
            hide_birthday: Set(account.profile.hide_birthday),
            info: Set(account.profile.info),
            photo_link: Set(account.profile.photo_link),
            created_at: Set(timestamp.clone()),
            updated_at: Set(timestamp),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_write_err(e, &account.username))?;

        link_roles(&txn, model.id, &account.roles).await?;

        txn.commit().await?;
        debug!(account_id = model.id, "Inserted account");

        let authorities = resolve_authorities(&self.conn, &account.roles).await?;
        Account::from_parts(model, &authorities)
    }

    /// Rewrites the profile columns only. Credentials, the enabled flag and
    /// role links are left as they are in the database.
    pub async fn update_profile(
        &self,
        id: AccountId,
        profile: &AccountProfileFields,
    ) -> StoreResult<Account> {
        let result = Users::update_many()
            .col_expr(
                users::Column::FirstName,
                Expr::value(profile.first_name.clone()),
            )
            .col_expr(users::Column::LastName, Expr::value(profile.last_name.clone()))
            .col_expr(users::Column::Gender, Expr::value(profile.gender.as_str()))
            .col_expr(
                users::Column::Birthday,
                Expr::value(profile.birthday.map(|d| d.format(DATE_FORMAT).to_string())),
            )
            .col_expr(users::Column::HideBirthday, Expr::value(profile.hide_birthday))
            .col_expr(users::Column::Info, Expr::value(profile.info.clone()))
            .col_expr(users::Column::PhotoLink, Expr::value(profile.photo_link.clone()))
            .col_expr(users::Column::UpdatedAt, Expr::value(now()))
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Account {id} not found")));
        }
        debug!(account_id = %id, "Updated account profile");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Account {id} not found")))
    }

    pub async fn update_password_hash(&self, id: AccountId, password_hash: &str) -> StoreResult<()> {
        let result = Users::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(users::Column::UpdatedAt, Expr::value(now()))
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Account {id} not found")));
        }
        Ok(())
    }

    /// Swaps `current` for `replacement` only if the stored hash is still
    /// `current`. Returns `false` when the hash changed in the meantime.
    pub async fn replace_password_hash(
        &self,
        id: AccountId,
        current: &str,
        replacement: &str,
    ) -> StoreResult<bool> {
        let result = Users::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(replacement))
            .col_expr(users::Column::UpdatedAt, Expr::value(now()))
            .filter(users::Column::Id.eq(id.value()))
            .filter(users::Column::PasswordHash.eq(current))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn set_enabled(&self, id: AccountId, enabled: bool) -> StoreResult<()> {
        let result = Users::update_many()
            .col_expr(users::Column::Enabled, Expr::value(enabled))
            .col_expr(users::Column::UpdatedAt, Expr::value(now()))
            .filter(users::Column::Id.eq(id.value()))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Account {id} not found")));
        }
        debug!(account_id = %id, enabled, "Changed account state");
        Ok(())
    }

    /// Links `role` to the account. Returns `false` if it was already held.
    pub async fn add_role(&self, id: AccountId, role: RoleName) -> StoreResult<bool> {
        let txn = self.conn.begin().await?;

        // Write first so the transaction takes the write lock up front
        let touched = Users::update_many()
            .col_expr(users::Column::UpdatedAt, Expr::value(now()))
            .filter(users::Column::Id.eq(id.value()))
            .exec(&txn)
            .await?;
        if touched.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Account {id} not found")));
        }

        let authority = resolve_authorities(&txn, &BTreeSet::from([role]))
            .await?
            .pop()
            .ok_or_else(|| StoreError::NotFound(format!("Role {role}")))?;

        let inserted = UsersAuthorities::insert(users_authorities::ActiveModel {
            user_id: Set(id.value()),
            authority_id: Set(authority.id),
        })
        .on_conflict(
            OnConflict::columns([
                users_authorities::Column::UserId,
                users_authorities::Column::AuthorityId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

        txn.commit().await?;
        debug!(account_id = %id, role = %role, added = inserted > 0, "Linked role");

        Ok(inserted > 0)
    }

    /// Removes the account together with its role links, memberships and the
    /// events it organizes. Deleting an unknown id is not an error.
    pub async fn delete_by_id(&self, id: AccountId) -> StoreResult<bool> {
        use crate::entities::{event_members, sport_events};

        let txn = self.conn.begin().await?;

        let organized: Vec<i32> = SportEvents::find()
            .filter(sport_events::Column::OrganizerId.eq(id.value()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();

        EventMembers::delete_many()
            .filter(event_members::Column::UserId.eq(id.value()))
            .exec(&txn)
            .await?;

        if !organized.is_empty() {
            EventMembers::delete_many()
                .filter(event_members::Column::EventId.is_in(organized))
                .exec(&txn)
                .await?;
            SportEvents::delete_many()
                .filter(sport_events::Column::OrganizerId.eq(id.value()))
                .exec(&txn)
                .await?;
        }

        UsersAuthorities::delete_many()
            .filter(users_authorities::Column::UserId.eq(id.value()))
            .exec(&txn)
            .await?;

        let result = Users::delete_by_id(id.value()).exec(&txn).await?;

        txn.commit().await?;
        debug!(account_id = %id, rows = result.rows_affected, "Deleted account");

        Ok(result.rows_affected > 0)
    }
}

async fn load_roles<C: ConnectionTrait>(
    conn: &C,
    models: Vec<users::Model>,
) -> StoreResult<Vec<Account>> {
    let roles = models
        .load_many_to_many(Authorities, UsersAuthorities, conn)
        .await?;

    models
        .into_iter()
        .zip(roles)
        .map(|(model, authorities)| Account::from_parts(model, &authorities))
        .collect()
}

async fn resolve_authorities<C: ConnectionTrait>(
    conn: &C,
    roles: &BTreeSet<RoleName>,
) -> StoreResult<Vec<authorities::Model>> {
    if roles.is_empty() {
        return Ok(Vec::new());
    }

    let rows = Authorities::find()
        .filter(authorities::Column::Authority.is_in(roles.iter().map(RoleName::authority)))
        .all(conn)
        .await?;

    if rows.len() != roles.len() {
        return Err(StoreError::NotFound(format!(
            "Unknown role in {:?}",
            roles.iter().map(RoleName::as_str).collect::<Vec<_>>()
        )));
    }

    Ok(rows)
}

async fn link_roles<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    roles: &BTreeSet<RoleName>,
) -> StoreResult<()> {
    let authorities = resolve_authorities(conn, roles).await?;
    if authorities.is_empty() {
        return Ok(());
    }

    let links: Vec<users_authorities::ActiveModel> = authorities
        .into_iter()
        .map(|a| users_authorities::ActiveModel {
            user_id: Set(user_id),
            authority_id: Set(a.id),
        })
        .collect();

    UsersAuthorities::insert_many(links).exec(conn).await?;
    Ok(())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn map_write_err(err: DbErr, username: &str) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            StoreError::Conflict(format!("Username '{username}' is already taken"))
        }
        _ => StoreError::Database(err),
    }
}
