//! Shared fakes for the test modules

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::{
    brain::{ChatProvider, ChatRequest, ChatResponse, ProviderError, ToolCallRequest},
    models::{
        Goal, Habit, NewGoal, NewHabit, NewNote, NewProject, NewReminder, NewTask, Note, Priority,
        Project, Reminder, Task, TaskStatus, TaskUpdate,
    },
    store::{EntityKind, EntityStore, InMemoryStore, SequentialIds, StoreError, StoreResult},
};

pub fn task(id: &str, title: &str) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        area: None,
        priority: Priority::Medium,
        status: TaskStatus::Todo,
        due_date: None,
    }
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// In-memory store that counts mutations and can be told to fail
pub struct CountingStore {
    inner: InMemoryStore,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    fail_creates: AtomicBool,
    fail_reads: AtomicBool,
    failing_ids: Mutex<HashSet<String>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::with_id_generator(Box::new(SequentialIds::new())),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_creates: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            failing_ids: Mutex::new(HashSet::new()),
        }
    }

    /// Store pre-populated with tasks titled `titles`, ids `task-1..`
    pub async fn with_tasks(titles: &[&str]) -> Self {
        let store = Self::new();
        for title in titles {
            store.inner.create_task(NewTask::titled(*title)).await.unwrap();
        }
        store
    }

    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes_to(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check_create(&self) -> StoreResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("create failed".to_string()));
        }
        Ok(())
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk unreadable".to_string()));
        }
        Ok(())
    }

    fn check_write(&self, id: &str) -> StoreResult<()> {
        if self.failing_ids.lock().unwrap().contains(id) {
            return Err(StoreError::Unavailable(format!("write to {} failed", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for CountingStore {
    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.check_read()?;
        self.inner.list_tasks().await
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<String> {
        self.check_create()?;
        self.inner.create_task(task).await
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.check_write(id)?;
        self.inner.update_task(id, update).await
    }

    async fn list_goals(&self) -> StoreResult<Vec<Goal>> {
        self.inner.list_goals().await
    }

    async fn create_goal(&self, goal: NewGoal) -> StoreResult<String> {
        self.check_create()?;
        self.inner.create_goal(goal).await
    }

    async fn list_habits(&self) -> StoreResult<Vec<Habit>> {
        self.inner.list_habits().await
    }

    async fn create_habit(&self, habit: NewHabit) -> StoreResult<String> {
        self.check_create()?;
        self.inner.create_habit(habit).await
    }

    async fn list_notes(&self) -> StoreResult<Vec<Note>> {
        self.inner.list_notes().await
    }

    async fn create_note(&self, note: NewNote) -> StoreResult<String> {
        self.check_create()?;
        self.inner.create_note(note).await
    }

    async fn list_reminders(&self) -> StoreResult<Vec<Reminder>> {
        self.inner.list_reminders().await
    }

    async fn create_reminder(&self, reminder: NewReminder) -> StoreResult<String> {
        self.check_create()?;
        self.inner.create_reminder(reminder).await
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        self.inner.list_projects().await
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<String> {
        self.check_create()?;
        self.inner.create_project(project).await
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_write(id)?;
        self.inner.delete(kind, id).await
    }
}

/// Provider replaying a fixed script of responses.
///
/// Once the script runs out it keeps returning `repeat`, or a plain text
/// reply when none is set.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    repeat: Option<ChatResponse>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ChatResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            repeat: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(response: ChatResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => Ok(self
                .repeat
                .clone()
                .unwrap_or_else(|| ChatResponse::text("Done."))),
        }
    }
}

pub fn rate_limited() -> ProviderError {
    ProviderError::RateLimited {
        retry_after_ms: None,
    }
}
