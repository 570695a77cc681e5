use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewTask, Task, TaskChanges};

/// Task store. Every lookup takes the owner: a task belonging to someone
/// else is reported exactly like a task that does not exist.
#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn create(&self, owner: Uuid, task: NewTask) -> anyhow::Result<Task>;
    /// Newest first. `search` is a case-insensitive substring of the title.
    async fn list(&self, owner: Uuid, search: Option<&str>) -> anyhow::Result<Vec<Task>>;
    async fn find(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Task>>;
    async fn update(&self, owner: Uuid, id: Uuid, changes: TaskChanges)
        -> anyhow::Result<Option<Task>>;
    /// `false` when nothing matched `(id, owner)`.
    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgTaskRepo {
    db: PgPool,
}

impl PgTaskRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Escapes `LIKE` metacharacters so the search text matches literally.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl TaskRepo for PgTaskRepo {
    async fn create(&self, owner: Uuid, task: NewTask) -> anyhow::Result<Task> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(owner)
        .bind(&task.title)
        .bind(&task.description)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list(&self, owner: Uuid, search: Option<&str>) -> anyhow::Result<Vec<Task>> {
        let pattern = search.filter(|s| !s.is_empty()).map(like_pattern);
        let rows = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE user_id = $1
              AND ($2::text IS NULL OR title ILIKE $2 ESCAPE '\')
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .bind(pattern)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
               SET title       = COALESCE($3, title),
                   description = COALESCE($4, description),
                   completed   = COALESCE($5, completed),
                   updated_at  = now()
             WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.completed)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            DELETE FROM tasks
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}
