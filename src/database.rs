// SQLite persistence for the workflow engine

use async_trait::async_trait;
use chrono::Utc;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::workflow::errors::StoreError;
use crate::workflow::roles::{Role, RoleSet};
use crate::workflow::traits::{
    GroupDirectory, NewRelation, RelationUpdate, RoleDirectory, WorkflowStore, WorkflowTx,
};
use crate::workflow::types::{
    search_key, Audit, ItemDetails, ItemFilter, ItemPatch, OperatorRelation, RelationType,
    WorkItem, WorkItemKind,
};

/// Owns the connection pool and the schema
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (creating if needed) the database, optionally running migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        auto_migrate: bool,
    ) -> Result<Self, StoreError> {
        // Create database if it doesn't exist
        if !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let manager = Self { pool };
        if auto_migrate {
            manager.migrate().await?;
        }
        Ok(manager)
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::new(&config.url, config.max_connections, config.auto_migrate).await
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore {
            pool: self.pool.clone(),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connections closed");
    }
}

/// Workflow store, role directory and group directory backed by SQLite
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn grant_role(&self, uid: &str, role: Role) -> Result<bool, StoreError> {
        let result = sqlx::query("INSERT OR IGNORE INTO user_role (uid, role) VALUES (?1, ?2)")
            .bind(uid)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn revoke_role(&self, uid: &str, role: Role) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_role WHERE uid = ?1 AND role = ?2")
            .bind(uid)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_group(&self, uid: &str, group_code: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_group (uid, group_code) VALUES (?1, ?2)
            ON CONFLICT(uid) DO UPDATE SET group_code = excluded.group_code
            "#,
        )
        .bind(uid)
        .bind(group_code)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn corrupt(what: &str, value: &str) -> StoreError {
    StoreError::Corrupt(format!("unexpected {what} {value:?}"))
}

fn item_from_row(row: &SqliteRow) -> Result<WorkItem, StoreError> {
    let kind: String = row.try_get("kind")?;
    let kind = WorkItemKind::from_str(&kind).map_err(|_| corrupt("kind", &kind))?;
    let details = match kind {
        WorkItemKind::Requirement => {
            let raw: Option<String> = row.try_get("requirement_type")?;
            let raw = raw.unwrap_or_default();
            let requirement_type = raw.parse().map_err(|_| corrupt("requirement_type", &raw))?;
            ItemDetails::Requirement { requirement_type }
        }
        WorkItemKind::Story => {
            let req_code: Option<String> = row.try_get("req_code")?;
            ItemDetails::Story {
                req_code: req_code.ok_or_else(|| corrupt("req_code", ""))?,
            }
        }
        WorkItemKind::Issue => ItemDetails::Issue,
        WorkItemKind::Retrospective => ItemDetails::Retrospective,
    };

    Ok(WorkItem {
        code: row.try_get("code")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: row.try_get("status")?,
        priority: row.try_get("priority")?,
        details,
        audit: audit_from_row(row)?,
    })
}

fn relation_from_row(row: &SqliteRow) -> Result<OperatorRelation, StoreError> {
    let relation_type: String = row.try_get("relation_type")?;
    Ok(OperatorRelation {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        uid: row.try_get("uid")?,
        relation_type: RelationType::from_str(&relation_type)
            .map_err(|_| corrupt("relation_type", &relation_type))?,
        old_status: row.try_get("old_status")?,
        new_status: row.try_get("new_status")?,
        description: row.try_get("description")?,
        audit: audit_from_row(row)?,
    })
}

fn audit_from_row(row: &SqliteRow) -> Result<Audit, StoreError> {
    Ok(Audit {
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_by: row.try_get("updated_by")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn escape_like(keyword: &str) -> String {
    keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ItemFilter) {
    qb.push(" WHERE kind = ").push_bind(filter.kind.as_str());
    if let Some(status) = &filter.status {
        qb.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
    for keyword in &filter.keywords {
        qb.push(" AND title_key LIKE ")
            .push_bind(format!("%{}%", escape_like(&search_key(keyword))))
            .push(" ESCAPE '\\'");
    }
}

#[async_trait]
impl WorkflowStore for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTx { tx }))
    }

    async fn find_item(&self, code: &str) -> Result<Option<WorkItem>, StoreError> {
        let row = sqlx::query("SELECT * FROM work_item WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&self, filter: &ItemFilter) -> Result<(u64, Vec<WorkItem>), StoreError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM work_item");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let direction = if filter.descending { "DESC" } else { "ASC" };
        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM work_item");
        push_filters(&mut select, filter);
        select
            .push(format!(
                " ORDER BY {column} {direction}, code {direction}",
                column = filter.sort.column()
            ))
            .push(" LIMIT ")
            .push_bind(i64::try_from(filter.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(filter.offset).unwrap_or(i64::MAX));

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(item_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((total.max(0) as u64, items))
    }

    async fn relations_of(&self, code: &str) -> Result<Vec<OperatorRelation>, StoreError> {
        let rows = sqlx::query("SELECT * FROM operator_relation WHERE code = ?1 ORDER BY id")
            .bind(code)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(relation_from_row).collect()
    }

    async fn count_assigned(&self, uid: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM operator_relation WHERE uid = ?1 AND relation_type = 'HANDLING'",
        )
        .bind(uid)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn count_open(
        &self,
        kind: WorkItemKind,
        terminal: &[&'static str],
    ) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM work_item WHERE kind = ");
        qb.push_bind(kind.as_str());
        if !terminal.is_empty() {
            qb.push(" AND status NOT IN (");
            let mut names = qb.separated(", ");
            for name in terminal {
                names.push_bind(*name);
            }
            names.push_unseparated(")");
        }
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl RoleDirectory for SqliteStore {
    async fn roles_of(&self, uid: &str) -> Result<RoleSet, StoreError> {
        let names: Vec<String> = sqlx::query_scalar("SELECT role FROM user_role WHERE uid = ?1")
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;
        names
            .iter()
            .map(|name| Role::from_str(name).map_err(|_| corrupt("role", name)))
            .collect()
    }
}

#[async_trait]
impl GroupDirectory for SqliteStore {
    async fn group_of(&self, uid: &str) -> Result<Option<String>, StoreError> {
        Ok(sqlx::query_scalar("SELECT group_code FROM user_group WHERE uid = ?1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?)
    }
}

struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl WorkflowTx for SqliteTx {
    async fn next_sequence(&mut self, prefix: &str, actor: &str) -> Result<i64, StoreError> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counter (prefix, value, created_by, created_at, updated_by, updated_at)
            VALUES (?1, 1, ?2, ?3, ?2, ?3)
            ON CONFLICT(prefix) DO UPDATE SET
                value = counter.value + 1,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            RETURNING value
            "#,
        )
        .bind(prefix)
        .bind(actor)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(value)
    }

    async fn insert_item(&mut self, item: &WorkItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO work_item (
                code, kind, title, title_key, description, status, priority, requirement_type,
                req_code, created_by, created_at, updated_by, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&item.code)
        .bind(item.kind().as_str())
        .bind(&item.title)
        .bind(search_key(&item.title))
        .bind(&item.description)
        .bind(&item.status)
        .bind(item.priority)
        .bind(item.details.requirement_type().map(|t| t.as_str()))
        .bind(item.details.req_code())
        .bind(&item.audit.created_by)
        .bind(item.audit.created_at)
        .bind(&item.audit.updated_by)
        .bind(item.audit.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn compare_and_set_status(
        &mut self,
        code: &str,
        expected: &str,
        new: &str,
        actor: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE work_item
            SET status = ?1, updated_by = ?2, updated_at = ?3
            WHERE code = ?4 AND status = ?5
            "#,
        )
        .bind(new)
        .bind(actor)
        .bind(Utc::now())
        .bind(code)
        .bind(expected)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_fields(
        &mut self,
        code: &str,
        patch: &ItemPatch,
        actor: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE work_item SET
                title = COALESCE(?1, title),
                title_key = COALESCE(?9, title_key),
                description = COALESCE(?2, description),
                priority = COALESCE(?3, priority),
                requirement_type = COALESCE(?4, requirement_type),
                req_code = COALESCE(?5, req_code),
                updated_by = ?6,
                updated_at = ?7
            WHERE code = ?8
            "#,
        )
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.priority)
        .bind(patch.requirement_type.map(|t| t.as_str()))
        .bind(patch.req_code.as_deref())
        .bind(actor)
        .bind(Utc::now())
        .bind(code)
        .bind(patch.title.as_deref().map(search_key))
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Corrupt(format!("work item {code} vanished mid-update")));
        }
        Ok(())
    }

    async fn insert_relation(&mut self, relation: &NewRelation) -> Result<i64, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO operator_relation (
                code, uid, relation_type, old_status, new_status, description,
                created_by, created_at, updated_by, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?7, ?8)
            "#,
        )
        .bind(&relation.code)
        .bind(&relation.uid)
        .bind(relation.relation_type.as_str())
        .bind(&relation.old_status)
        .bind(relation.new_status.as_deref())
        .bind(relation.description.as_deref())
        .bind(&relation.actor)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn pending_relations(
        &mut self,
        code: &str,
        status: &str,
        uid: Option<&str>,
    ) -> Result<Vec<OperatorRelation>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM operator_relation
            WHERE code = ?1 AND old_status = ?2 AND relation_type = 'HANDLING'
              AND (?3 IS NULL OR uid = ?3)
            ORDER BY id
            "#,
        )
        .bind(code)
        .bind(status)
        .bind(uid)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(relation_from_row).collect()
    }

    async fn count_pending(&mut self, code: &str, status: &str) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM operator_relation
            WHERE code = ?1 AND old_status = ?2 AND relation_type = 'HANDLING'
            "#,
        )
        .bind(code)
        .bind(status)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn count_decided(
        &mut self,
        code: &str,
        status: &str,
        uid: &str,
        relation_type: RelationType,
    ) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM operator_relation
            WHERE code = ?1 AND old_status = ?2 AND uid = ?3 AND relation_type = ?4
            "#,
        )
        .bind(code)
        .bind(status)
        .bind(uid)
        .bind(relation_type.as_str())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn close_pending(
        &mut self,
        code: &str,
        status: &str,
        uid: Option<&str>,
        update: &RelationUpdate,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE operator_relation SET
                relation_type = ?1,
                new_status = COALESCE(?2, new_status),
                description = COALESCE(?3, description),
                updated_by = ?4,
                updated_at = ?5
            WHERE code = ?6 AND old_status = ?7 AND relation_type = 'HANDLING'
              AND (?8 IS NULL OR uid = ?8)
            "#,
        )
        .bind(update.relation_type.as_str())
        .bind(update.new_status.as_deref())
        .bind(update.description.as_deref())
        .bind(&update.actor)
        .bind(Utc::now())
        .bind(code)
        .bind(status)
        .bind(uid)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_patterns_are_escaped() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
