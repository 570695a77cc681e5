//! In-process store implementing both repositories. Used by the test suites
//! and for running the router without PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{CreateUserError, UserRepo},
        repo_types::{NewUser, User},
    },
    tasks::{
        repo::TaskRepo,
        repo_types::{NewTask, Task, TaskChanges},
    },
};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    // second element is the insertion sequence, used to order tasks created
    // within the same clock tick
    tasks: RwLock<HashMap<Uuid, (u64, Task)>>,
    seq: std::sync::atomic::AtomicU64,
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, CreateUserError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(CreateUserError::DuplicateEmail);
        }
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_name(&self, id: Uuid, name: &str) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|u| {
            u.name = name.to_string();
            u.clone()
        }))
    }
}

#[async_trait]
impl TaskRepo for MemoryStore {
    async fn create(&self, owner: Uuid, task: NewTask) -> anyhow::Result<Task> {
        let now = OffsetDateTime::now_utc();
        let record = Task {
            id: Uuid::new_v4(),
            owner,
            title: task.title,
            description: task.description,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        let seq = self
            .seq
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.tasks
            .write()
            .await
            .insert(record.id, (seq, record.clone()));
        Ok(record)
    }

    async fn list(&self, owner: Uuid, search: Option<&str>) -> anyhow::Result<Vec<Task>> {
        let needle = search.filter(|s| !s.is_empty()).map(str::to_lowercase);
        let tasks = self.tasks.read().await;
        let mut rows: Vec<&(u64, Task)> = tasks
            .values()
            .filter(|(_, t)| t.owner == owner)
            .filter(|(_, t)| match &needle {
                Some(n) => t.title.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(rows.into_iter().map(|(_, t)| t.clone()).collect())
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .get(&id)
            .filter(|(_, t)| t.owner == owner)
            .map(|(_, t)| t.clone()))
    }

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: TaskChanges,
    ) -> anyhow::Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some((_, task)) = tasks.get_mut(&id).filter(|(_, t)| t.owner == owner) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(completed) = changes.completed {
            task.completed = completed;
        }
        task.updated_at = OffsetDateTime::now_utc();
        Ok(Some(task.clone()))
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let mut tasks = self.tasks.write().await;
        let owned = tasks.get(&id).is_some_and(|(_, t)| t.owner == owner);
        if owned {
            tasks.remove(&id);
        }
        Ok(owned)
    }
}
