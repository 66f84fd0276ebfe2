//! Command dispatch.
//!
//! The dispatcher is sequencing only: it splits command payloads into
//! fields, drives the validators against fresh store snapshots, and issues
//! the create/update/delete calls. Every piece of real logic lives in
//! `validate`, `taxonomy`, `pending`, or behind the `TaskStore` seam.
//!
//! Payload fields use the double-slash delimiter:
//! `newTask name//description//DD mon YY HHMM//to tags//by tags//type tags`
//! and `updateTask name//field//value`.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::pending::PendingDeletions;
use crate::store::{StoreError, TaskDraft, TaskSnapshot, TaskStore};
use crate::taxonomy::{Taxonomy, TaxonomyCache, TaxonomyCategory};
use crate::validate::fields::{self, FieldUpdate, ResolveContext, FIELD_LABELS};
use crate::validate::tags::{self, TagMatch};
use crate::validate::{datetime, ValidationError};

/// Default command prefix, overridable in config.
pub const DEFAULT_PREFIX: &str = "$";

/// An inbound command as handed over by the chat gateway.
#[derive(Debug, Clone)]
pub struct CommandEnvelope {
    /// Display name of the author, used by `listMyTasks`.
    pub author: String,
    /// The raw message line, prefix included.
    pub line: String,
}

/// Structured outcome of one command. Presentation (embeds, message
/// formatting) is a boundary; the [`fmt::Display`] impl is a plain-text
/// rendering for the local gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Info { title: String, body: String },
    Task { title: String, task: TaskSnapshot },
    TaskList { title: String, tasks: Vec<TaskSnapshot> },
    /// Recoverable input problem, surfaced to the command author.
    UserError(String),
    /// External-store failure, surfaced to the operators.
    OperatorError(String),
}

/// Sequences commands against the store, the taxonomy cache, and the
/// pending-deletion registry. One command runs to completion before the
/// next starts; the registries' own locks keep the invariants sound if a
/// future gateway interleaves.
pub struct Dispatcher {
    store: Arc<dyn TaskStore>,
    taxonomy: TaxonomyCache,
    pending: PendingDeletions,
    prefix: String,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn TaskStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            taxonomy: TaxonomyCache::new(),
            pending: PendingDeletions::new(),
            prefix: prefix.into(),
        }
    }

    /// Handle one inbound line. Returns `None` for lines that are not
    /// commands (no prefix).
    pub async fn handle(&self, envelope: &CommandEnvelope) -> Option<Reply> {
        let (verb, payload) = self.parse(&envelope.line)?;
        info!(command = verb, "dispatching command");

        let reply = match verb {
            "newTask" => self.new_task(payload).await,
            "getTask" => self.get_task(payload).await,
            "updateTask" => self.update_task(payload).await,
            "completeTask" => self.complete_task(payload).await,
            "deleteTask" => self.delete_task(payload).await,
            "confirmDeleteTask" => self.confirm_delete_task(payload).await,
            "listDeleteTasks" => self.list_delete_tasks().await,
            "listFields" => list_fields(),
            "listTags" => self.list_tags().await,
            "listTasks" => self.list_person_tasks(payload).await,
            "listMyTasks" => self.list_person_tasks(&envelope.author).await,
            "listCommands" => list_commands(),
            _ => Reply::UserError(format!(
                "unknown command `{}{verb}` — use `{}listCommands` to see all commands",
                self.prefix, self.prefix
            )),
        };
        Some(reply)
    }

    /// Split a raw line into verb and payload. The payload may be wrapped in
    /// double quotes (chat clients often require it for `//` payloads).
    fn parse<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = line.trim().strip_prefix(&self.prefix)?;
        let (verb, payload) = match rest.split_once(char::is_whitespace) {
            Some((verb, payload)) => (verb, payload.trim()),
            None => (rest, ""),
        };
        if verb.is_empty() {
            return None;
        }
        let payload = payload
            .strip_prefix('"')
            .and_then(|p| p.strip_suffix('"'))
            .unwrap_or(payload);
        Some((verb, payload))
    }

    // ─── Command handlers ────────────────────────────────────────────────────

    /// `newTask name//desc//date//assign to//assign by//task type`
    ///
    /// Error precedence: field count, name collision, date/time, then per
    /// category unusable (to, by, type), then per category mismatch (to, by,
    /// type). An empty tag field means "no constraint" and bypasses the
    /// matcher entirely.
    async fn new_task(&self, payload: &str) -> Reply {
        let parts: Vec<&str> = payload.split("//").map(str::trim).collect();
        let [name, description, date_txt, to_txt, by_txt, type_txt] = parts.as_slice() else {
            return Reply::UserError(
                "expected 6 fields: name//description//DD mon YY HHMM//assign to//assign by//task type"
                    .to_string(),
            );
        };

        let names = match self.task_names().await {
            Ok(names) => names,
            Err(e) => return operator_error("read the task list", e),
        };
        if name_exists(&names, name) {
            return Reply::UserError(
                ValidationError::NameCollision(name.to_string()).to_string(),
            );
        }

        let date_time = match datetime::validate(date_txt, Utc::now()) {
            Ok(instant) => instant,
            Err(e) => return Reply::UserError(e.to_string()),
        };

        if let Err(e) = self.taxonomy.refresh(self.store.as_ref()).await {
            return operator_error("read the tag taxonomy", e);
        }
        let taxonomy = self.taxonomy.snapshot().await;

        let submissions = [
            (TaxonomyCategory::AssignTo, *to_txt),
            (TaxonomyCategory::AssignBy, *by_txt),
            (TaxonomyCategory::TaskType, *type_txt),
        ];
        let mut results: Vec<(TaxonomyCategory, Option<TagMatch>)> = Vec::new();
        for (category, raw) in submissions {
            // Empty field: the caller chose not to constrain this category.
            let outcome = (!raw.is_empty())
                .then(|| tags::classify(raw, taxonomy.category(category)));
            results.push((category, outcome));
        }
        // All unusable-category errors outrank all mismatch errors.
        for (category, outcome) in &results {
            if matches!(outcome, Some(TagMatch::Unusable)) {
                return Reply::UserError(
                    ValidationError::TaxonomyUnusable(*category).to_string(),
                );
            }
        }
        for (category, outcome) in &results {
            if let Some(TagMatch::Invalid(tokens)) = outcome {
                return Reply::UserError(
                    ValidationError::TagMismatch {
                        category: *category,
                        tokens: tokens.clone(),
                    }
                    .to_string(),
                );
            }
        }
        let mut canonical = results.into_iter().map(|(_, outcome)| match outcome {
            Some(TagMatch::Valid(tags)) => tags,
            _ => Vec::new(),
        });

        let draft = TaskDraft {
            name: name.to_string(),
            description: description.to_string(),
            date_time,
            assigned_to: canonical.next().unwrap_or_default(),
            assigned_by: canonical.next().unwrap_or_default(),
            task_type: canonical.next().unwrap_or_default(),
        };
        if let Err(e) = self.store.create(&draft).await {
            return operator_error(&format!("post {name}"), e);
        }
        self.refresh_after_write().await;

        let title = format!("{} is posted to the store", capitalize(name));
        match self.store.get(name).await {
            Ok(task) => Reply::Task { title, task },
            Err(e) => {
                warn!(error = %e, "created task could not be re-read");
                Reply::Info {
                    title,
                    body: String::new(),
                }
            }
        }
    }

    /// `getTask name`
    async fn get_task(&self, name: &str) -> Reply {
        match self.store.get(name).await {
            Ok(task) => Reply::Task {
                title: "Task Request".to_string(),
                task,
            },
            Err(StoreError::NotFound(_)) => Reply::UserError("task name does not exist".to_string()),
            Err(e) => operator_error("read the task", e),
        }
    }

    /// `updateTask name//field//value`
    async fn update_task(&self, payload: &str) -> Reply {
        let parts: Vec<&str> = payload.split("//").map(str::trim).collect();
        let [name, field, value] = parts.as_slice() else {
            return Reply::UserError("expected 3 fields: name//field//value".to_string());
        };

        let names = match self.task_names().await {
            Ok(names) => names,
            Err(e) => return operator_error("read the task list", e),
        };
        if !name_exists(&names, name) {
            return Reply::UserError("task name does not exist".to_string());
        }
        if let Err(e) = self.taxonomy.refresh(self.store.as_ref()).await {
            return operator_error("read the tag taxonomy", e);
        }
        let taxonomy = self.taxonomy.snapshot().await;

        let cx = ResolveContext {
            now: Utc::now(),
            taxonomy: &taxonomy,
            existing_names: &names,
        };
        let update = match fields::resolve(field, value, &cx) {
            Ok(update) => update,
            Err(e) => return Reply::UserError(e.to_string()),
        };
        debug!(field_code = update.code(), task = *name, "resolved field update");

        if let Err(e) = self.store.update(name, &update).await {
            return operator_error(&format!("update {name}"), e);
        }
        self.refresh_after_write().await;

        // A rename changes the lookup key.
        let current_name = match &update {
            FieldUpdate::Name(new_name) => new_name.as_str(),
            _ => name,
        };
        self.render_task(current_name, "Task Updated!").await
    }

    /// `completeTask name`
    async fn complete_task(&self, name: &str) -> Reply {
        let task = match self.store.get(name).await {
            Ok(task) => task,
            Err(StoreError::NotFound(_)) => {
                return Reply::UserError("task name does not exist".to_string())
            }
            Err(e) => return operator_error("read the task", e),
        };
        if task.completion {
            return Reply::Info {
                title: "Task is Complete".to_string(),
                body: format!("{name} was already completed"),
            };
        }
        if let Err(e) = self.store.update(name, &FieldUpdate::Completion(true)).await {
            return operator_error(&format!("update {name}"), e);
        }
        self.refresh_after_write().await;
        self.render_task(name, "Task Updated!").await
    }

    /// `deleteTask name` — first phase: mark only, nothing is deleted yet.
    async fn delete_task(&self, name: &str) -> Reply {
        // Existence is verified against the store, never against registry
        // state.
        let task = match self.store.get(name).await {
            Ok(task) => task,
            Err(StoreError::NotFound(_)) => {
                return Reply::UserError("task name does not exist".to_string())
            }
            Err(e) => return operator_error("read the task", e),
        };
        // The canonical store casing is what confirm will look up.
        self.pending.mark(&task.name).await;
        Reply::Task {
            title: format!("{} Pending Deletion", task.name),
            task,
        }
    }

    /// `confirmDeleteTask name` — second phase. The registry is only
    /// committed after the store reports success; on failure the name stays
    /// marked and the operation is retryable.
    async fn confirm_delete_task(&self, name: &str) -> Reply {
        if self.pending.is_empty().await {
            return Reply::UserError("no tasks are pending deletion".to_string());
        }
        let task = match self.store.get(name).await {
            Ok(task) => task,
            Err(StoreError::NotFound(_)) => {
                return Reply::UserError(format!(
                    "task name does not exist — use `{}listDeleteTasks` to view the tasks pending deletion",
                    self.prefix
                ))
            }
            Err(e) => return operator_error("read the task", e),
        };
        if !self.pending.contains(&task.name).await {
            return Reply::UserError(format!(
                "{} is not pending deletion — use `{}deleteTask \"task name\"` to put it up for deletion",
                task.name, self.prefix
            ));
        }
        if let Err(e) = self.store.delete(&task.name).await {
            // Registry stays in its pre-call state; confirm can be retried.
            return operator_error(&format!("delete {}", task.name), e);
        }
        self.pending.remove(&task.name).await;
        self.refresh_after_write().await;
        Reply::Info {
            title: format!("{} Removed!", task.name),
            body: String::new(),
        }
    }

    /// `listDeleteTasks`
    async fn list_delete_tasks(&self) -> Reply {
        let names = self.pending.names().await;
        if names.is_empty() {
            return Reply::UserError("no tasks pending deletion!".to_string());
        }
        let mut tasks = Vec::new();
        for name in names {
            match self.store.get(&name).await {
                Ok(task) => tasks.push(task),
                // Entry stays marked; only a confirmed delete or an unmark
                // may remove it.
                Err(e) => warn!(task = %name, error = %e, "pending task could not be read"),
            }
        }
        Reply::TaskList {
            title: "Pending Deletion Task List".to_string(),
            tasks,
        }
    }

    /// `listTags`
    async fn list_tags(&self) -> Reply {
        if let Err(e) = self.taxonomy.refresh(self.store.as_ref()).await {
            return operator_error("read the tag taxonomy", e);
        }
        let taxonomy = self.taxonomy.snapshot().await;
        Reply::Info {
            title: "Available Tags for Task Creation".to_string(),
            body: render_taxonomy(&taxonomy),
        }
    }

    /// `listTasks person` / `listMyTasks` — the person must be a valid
    /// Assign To tag.
    async fn list_person_tasks(&self, person: &str) -> Reply {
        if let Err(e) = self.taxonomy.refresh(self.store.as_ref()).await {
            return operator_error("read the tag taxonomy", e);
        }
        let taxonomy = self.taxonomy.snapshot().await;
        let assignees = match tags::classify(person, taxonomy.category(TaxonomyCategory::AssignTo))
        {
            TagMatch::Valid(tags) => tags,
            TagMatch::Invalid(tokens) => {
                return Reply::UserError(
                    ValidationError::TagMismatch {
                        category: TaxonomyCategory::AssignTo,
                        tokens,
                    }
                    .to_string(),
                )
            }
            TagMatch::Unusable => {
                return Reply::UserError(
                    ValidationError::TaxonomyUnusable(TaxonomyCategory::AssignTo).to_string(),
                )
            }
        };
        let all = match self.store.read_all().await {
            Ok(tasks) => tasks,
            Err(e) => return operator_error("read the task list", e),
        };
        let tasks = all
            .into_iter()
            .filter(|task| {
                task.assigned_to
                    .iter()
                    .any(|tag| assignees.iter().any(|a| a == tag))
            })
            .collect();
        Reply::TaskList {
            title: format!("Tasks for {}", assignees.join(", ")),
            tasks,
        }
    }

    // ─── Shared steps ────────────────────────────────────────────────────────

    async fn task_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .read_all()
            .await?
            .into_iter()
            .map(|task| task.name)
            .collect())
    }

    /// Re-read the taxonomy after a successful write so subsequent
    /// validations see the store's current state. A failed refresh is not a
    /// command failure — the write already landed.
    async fn refresh_after_write(&self) {
        if let Err(e) = self.taxonomy.refresh(self.store.as_ref()).await {
            warn!(error = %e, "taxonomy refresh after write failed");
        }
    }

    async fn render_task(&self, name: &str, title: &str) -> Reply {
        match self.store.get(name).await {
            Ok(task) => Reply::Task {
                title: title.to_string(),
                task,
            },
            Err(e) => {
                warn!(task = name, error = %e, "task could not be re-read after write");
                Reply::Info {
                    title: title.to_string(),
                    body: String::new(),
                }
            }
        }
    }
}

// ─── Free helpers ────────────────────────────────────────────────────────────

fn name_exists(names: &[String], candidate: &str) -> bool {
    let lowered = candidate.to_lowercase();
    names.iter().any(|name| name.to_lowercase() == lowered)
}

fn operator_error(action: &str, error: StoreError) -> Reply {
    warn!(error = %error, "store call failed: {action}");
    Reply::OperatorError(format!(
        "could not {action} ({error}) — report this in the operator channel"
    ))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn list_fields() -> Reply {
    let body = FIELD_LABELS
        .iter()
        .map(|(code, label)| format!("{code}:\t{label}"))
        .collect::<Vec<_>>()
        .join("\n");
    Reply::Info {
        title: "Available Fields".to_string(),
        body,
    }
}

fn list_commands() -> Reply {
    let body = "\
newTask            --> create a new task
getTask            --> view a specific task
updateTask         --> update a task's information
completeTask       --> mark a task as complete
deleteTask         --> mark a task for deletion
confirmDeleteTask  --> delete a task from the store
listDeleteTasks    --> view all tasks marked for deletion
listFields         --> view all task fields
listTags           --> view all tags for Assign To, Assign By and Type
listTasks          --> view all tasks assigned to a particular person
listMyTasks        --> view all tasks assigned to you
listCommands       --> view all bot commands"
        .to_string();
    Reply::Info {
        title: "Bot Commands".to_string(),
        body,
    }
}

fn render_taxonomy(taxonomy: &Taxonomy) -> String {
    [
        (TaxonomyCategory::AssignTo, &taxonomy.assign_to),
        (TaxonomyCategory::AssignBy, &taxonomy.assign_by),
        (TaxonomyCategory::TaskType, &taxonomy.task_type),
    ]
    .iter()
    .map(|(category, tags)| format!("{category}: {}", tags.join(", ")))
    .collect::<Vec<_>>()
    .join("\n")
}

fn render_snapshot(task: &TaskSnapshot) -> String {
    format!(
        "Task Name:    {}\nDescription:  {}\nDate & Time:  {}\nAssigned To:  {}\nAssigned By:  {}\nTask Type:    {}\nCompletion:   {}\nLink:         {}",
        task.name,
        task.description,
        task.date_time,
        task.assigned_to.join(", "),
        task.assigned_by.join(", "),
        task.task_type.join(", "),
        if task.completion { "Yes" } else { "No" },
        task.url,
    )
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Info { title, body } => {
                if body.is_empty() {
                    write!(f, "{title}")
                } else {
                    write!(f, "{title}\n{body}")
                }
            }
            Reply::Task { title, task } => write!(f, "{title}\n{}", render_snapshot(task)),
            Reply::TaskList { title, tasks } => {
                write!(f, "{title}")?;
                for (index, task) in tasks.iter().enumerate() {
                    write!(f, "\n----- Task {} -----\n{}", index + 1, render_snapshot(task))?;
                }
                Ok(())
            }
            Reply::UserError(message) => write!(f, "error: {message}"),
            Reply::OperatorError(message) => write!(f, "operator error: {message}"),
        }
    }
}
