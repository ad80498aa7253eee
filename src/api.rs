//! Typed record services over the gateway
//!
//! One method per records endpoint. Responses come wrapped in envelopes
//! (`{"groups": [...]}`, `{"message": "...", "group": {...}}`); these are
//! unwrapped here so callers only see entities.

use crate::error::Result;
use crate::gateway::{fetch, query_of, Gateway, Method, Query};
use crate::models::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result of a create or update: the server's message plus the stored entity
#[derive(Debug, Clone)]
pub struct Saved<T> {
    pub message: String,
    pub record: T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: String,
    #[serde(flatten)]
    inner: std::collections::HashMap<String, T>,
}

/// Clonable handle on the records API
#[derive(Clone)]
pub struct RecordApi {
    gateway: Arc<dyn Gateway>,
}

impl RecordApi {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    // ==================== Groups ====================

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        self.get_field("groups", Vec::new(), "groups").await
    }

    pub async fn get_group(&self, id: &str) -> Result<Group> {
        self.get_field(&item_path("groups", id), Vec::new(), "group").await
    }

    pub async fn create_group(&self, group: &impl Serialize) -> Result<Saved<Group>> {
        self.create("groups", group, "group").await
    }

    pub async fn update_group(&self, id: &str, group: &impl Serialize) -> Result<Saved<Group>> {
        self.update("groups", id, group, "group").await
    }

    pub async fn delete_group(&self, id: &str) -> Result<MessageResponse> {
        self.delete("groups", id).await
    }

    pub async fn group_stats(&self, id: &str) -> Result<GroupStats> {
        let path = format!("{}/stats", item_path("groups", id));
        self.get_field(&path, Vec::new(), "stats").await
    }

    // ==================== Students ====================

    /// All students, or only those of `group_id`
    pub async fn list_students(&self, group_id: Option<&str>) -> Result<Vec<Student>> {
        let query = query_of(&[("group_id", group_id)]);
        self.get_field("students", query, "students").await
    }

    pub async fn get_student(&self, id: &str) -> Result<Student> {
        self.get_field(&item_path("students", id), Vec::new(), "student").await
    }

    pub async fn create_student(&self, student: &impl Serialize) -> Result<Saved<Student>> {
        self.create("students", student, "student").await
    }

    pub async fn update_student(&self, id: &str, student: &impl Serialize) -> Result<Saved<Student>> {
        self.update("students", id, student, "student").await
    }

    pub async fn delete_student(&self, id: &str) -> Result<MessageResponse> {
        self.delete("students", id).await
    }

    pub async fn student_progress(&self, id: &str) -> Result<StudentProgress> {
        let path = format!("{}/progress", item_path("students", id));
        fetch(self.gateway.as_ref(), Method::Get, &path, None, Vec::new()).await
    }

    // ==================== Activities ====================

    /// All activities, or only those assigned to `student_id`
    pub async fn list_activities(&self, student_id: Option<&str>) -> Result<Vec<Activity>> {
        let query = query_of(&[("student_id", student_id)]);
        self.get_field("activities", query, "activities").await
    }

    pub async fn get_activity(&self, id: &str) -> Result<Activity> {
        self.get_field(&item_path("activities", id), Vec::new(), "activity").await
    }

    pub async fn create_activity(&self, activity: &impl Serialize) -> Result<Saved<Activity>> {
        self.create("activities", activity, "activity").await
    }

    pub async fn update_activity(&self, id: &str, activity: &impl Serialize) -> Result<Saved<Activity>> {
        self.update("activities", id, activity, "activity").await
    }

    pub async fn delete_activity(&self, id: &str) -> Result<MessageResponse> {
        self.delete("activities", id).await
    }

    // ==================== Progress ====================

    pub async fn list_progress(
        &self,
        student_id: Option<&str>,
        activity_id: Option<&str>,
    ) -> Result<Vec<Progress>> {
        let query = query_of(&[("student_id", student_id), ("activity_id", activity_id)]);
        self.get_field("progress", query, "progress").await
    }

    pub async fn get_progress(&self, id: &str) -> Result<Progress> {
        self.get_field(&item_path("progress", id), Vec::new(), "progress").await
    }

    pub async fn create_progress(&self, progress: &impl Serialize) -> Result<Saved<Progress>> {
        self.create("progress", progress, "progress").await
    }

    pub async fn update_progress(&self, id: &str, progress: &impl Serialize) -> Result<Saved<Progress>> {
        self.update("progress", id, progress, "progress").await
    }

    pub async fn delete_progress(&self, id: &str) -> Result<MessageResponse> {
        self.delete("progress", id).await
    }

    // ==================== Helper Methods ====================

    async fn get_field<T: DeserializeOwned>(&self, path: &str, query: Query, field: &str) -> Result<T> {
        let envelope: Envelope<Value> =
            fetch(self.gateway.as_ref(), Method::Get, path, None, query).await?;
        take_field(envelope, field).map(|(_, record)| record)
    }

    async fn create<T: DeserializeOwned>(
        &self,
        resource: &str,
        payload: &impl Serialize,
        field: &str,
    ) -> Result<Saved<T>> {
        let body = serde_json::to_value(payload)?;
        let envelope: Envelope<Value> =
            fetch(self.gateway.as_ref(), Method::Post, resource, Some(body), Vec::new()).await?;
        let (message, record) = take_field(envelope, field)?;
        Ok(Saved { message, record })
    }

    async fn update<T: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
        payload: &impl Serialize,
        field: &str,
    ) -> Result<Saved<T>> {
        let body = serde_json::to_value(payload)?;
        let path = item_path(resource, id);
        let envelope: Envelope<Value> =
            fetch(self.gateway.as_ref(), Method::Put, &path, Some(body), Vec::new()).await?;
        let (message, record) = take_field(envelope, field)?;
        Ok(Saved { message, record })
    }

    async fn delete(&self, resource: &str, id: &str) -> Result<MessageResponse> {
        let path = item_path(resource, id);
        let value = self
            .gateway
            .request(Method::Delete, &path, None, Vec::new())
            .await?;
        if value.is_null() {
            return Ok(MessageResponse::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn item_path(resource: &str, id: &str) -> String {
    format!("{}/{}", resource, urlencoding::encode(id))
}

fn take_field<T: DeserializeOwned>(mut envelope: Envelope<Value>, field: &str) -> Result<(String, T)> {
    let value = envelope.inner.remove(field).unwrap_or(Value::Null);
    let record = serde_json::from_value(value)?;
    Ok((envelope.message, record))
}
