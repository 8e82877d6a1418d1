//! Shared fixtures for database integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value as Json};
use tracing_subscriber::EnvFilter;

use reactdb::{
    Database, FieldSpec, Predicate, RdbType, SchemaDefinition, SchemaRegistry, VirtualFieldSpec,
};

/// Install a test subscriber once. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn task_schema() -> SchemaDefinition {
    SchemaDefinition::new("Task", "_id")
        .with_fields([
            FieldSpec::typed("_id", RdbType::String),
            FieldSpec::typed("content", RdbType::String),
            FieldSpec::typed("note", RdbType::String),
            FieldSpec::typed("_projectId", RdbType::String),
            FieldSpec::typed("created", RdbType::DateTime),
        ])
        .with_virtual(
            VirtualFieldSpec::one_to_one("project", "Project").with_local_key("_projectId"),
        )
        .with_virtual(
            VirtualFieldSpec::one_to_many("subtasks", "Subtask")
                .with_join(|key| Predicate::eq("_taskId", key.clone())),
        )
        .with_virtual(VirtualFieldSpec::many_to_many("tags", "Tag"))
}

pub fn project_schema() -> SchemaDefinition {
    SchemaDefinition::new("Project", "_id")
        .with_field(FieldSpec::typed("_id", RdbType::String))
        .with_field(FieldSpec::typed("name", RdbType::String))
}

pub fn subtask_schema() -> SchemaDefinition {
    SchemaDefinition::new("Subtask", "_id")
        .with_field(FieldSpec::typed("_id", RdbType::String))
        .with_field(FieldSpec::typed("content", RdbType::String))
        .with_field(FieldSpec::typed("_taskId", RdbType::String))
        .with_virtual(VirtualFieldSpec::one_to_one("task", "Task").with_local_key("_taskId"))
}

pub fn tag_schema() -> SchemaDefinition {
    SchemaDefinition::new("Tag", "_id")
        .with_field(FieldSpec::typed("_id", RdbType::String))
        .with_field(FieldSpec::typed("name", RdbType::String))
}

pub fn registry() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_schema(task_schema())
        .with_schema(project_schema())
        .with_schema(subtask_schema())
        .with_schema(tag_schema())
}

pub fn database() -> Database {
    init_tracing();
    Database::new(registry()).expect("test registry compiles")
}

/// Deterministic generator of task payloads.
pub struct TaskGenerator {
    rng: StdRng,
    next_id: usize,
    epoch: DateTime<Utc>,
}

impl TaskGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 0,
            epoch: Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    /// Creation time of the `n`-th generated task; one day apart.
    pub fn created_at(&self, n: usize) -> DateTime<Utc> {
        self.epoch + Duration::days(n as i64)
    }

    pub fn task(&mut self) -> Json {
        let n = self.next_id;
        self.next_id += 1;
        let words = self.rng.gen_range(1..6);
        json!({
            "_id": format!("task-{}", n),
            "content": format!("task {} with {} words", n, words),
            "note": format!("note-{}", self.rng.gen::<u32>()),
            "created": self.created_at(n).to_rfc3339(),
        })
    }

    pub fn tasks(&mut self, count: usize) -> Vec<Json> {
        (0..count).map(|_| self.task()).collect()
    }
}
