//! Record types exchanged with the records API
//!
//! Field names follow the server's snake_case wire format. Every entity
//! keeps unmodelled fields in `extra` so that a full representation can be
//! sent back on update without dropping anything the server returned.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Anything with a stable server-assigned id.
pub trait Record: Clone + Send + Sync + 'static {
    fn record_id(&self) -> &str;
}

// ==================== Session ====================

/// The authenticated user held by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub role: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Payload accepted by the registration endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Registration form as filled in by the user.
///
/// `confirm_password` never leaves the client.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<String>,
}

impl RegistrationForm {
    /// Whether both password entries agree.
    pub fn passwords_match(&self) -> bool {
        self.password == self.confirm_password
    }

    /// Strip client-only fields.
    pub fn into_request(self) -> RegisterRequest {
        let RegistrationForm {
            name,
            email,
            password,
            role,
            ..
        } = self;
        RegisterRequest {
            email,
            password,
            name,
            role,
        }
    }
}

/// Response from `auth/login` and `auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    pub user: Principal,
    pub token: String,
}

/// Bare `{message}` body returned by deletes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

// ==================== Groups ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub teacher_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    /// `is_active` is not part of every deployment's schema; absent means inactive.
    pub fn is_active(&self) -> bool {
        self.extra
            .get("is_active")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

impl Record for Group {
    fn record_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressBreakdown {
    pub progress_status: String,
    /// The server reports counts as strings.
    pub count: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub total_students: u64,
    pub total_activities: u64,
    #[serde(default)]
    pub progress_breakdown: Vec<ProgressBreakdown>,
}

impl GroupStats {
    /// Count for one progress status, 0 when missing or unparsable.
    pub fn progress_count(&self, status: ProgressStatus) -> u64 {
        self.progress_breakdown
            .iter()
            .find(|b| b.progress_status == status.as_str())
            .and_then(|b| b.count.trim().parse().ok())
            .unwrap_or(0)
    }
}

// ==================== Students ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default)]
    pub disability_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Student {
    pub fn has_special_needs(&self) -> bool {
        !self.disability_type.trim().is_empty()
    }
}

impl Record for Student {
    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Response from `students/{id}/progress`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentProgress {
    #[serde(default)]
    pub progress: Vec<Progress>,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

// ==================== Activities ====================

/// Lifecycle of an activity.
///
/// The server stores status as free text; values this client does not know
/// are carried verbatim in `Other` so they decode and round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityStatus {
    Pending,
    InProgress,
    Completed,
    Other(String),
}

impl ActivityStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Other(status) => status,
        }
    }
}

impl From<String> for ActivityStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "pending" => Self::Pending,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Other(status),
        }
    }
}

impl From<ActivityStatus> for String {
    fn from(status: ActivityStatus) -> Self {
        match status {
            ActivityStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl Default for ActivityStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub difficulty_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub status: ActivityStatus,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Activity {
    fn record_id(&self) -> &str {
        &self.id
    }
}

// ==================== Progress ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Achieved,
    InProgress,
    NotAchieved,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Achieved => "achieved",
            Self::InProgress => "in_progress",
            Self::NotAchieved => "not_achieved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: String,
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    pub activity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_title: Option<String>,
    pub progress_status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_indicators: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_notes: Option<String>,
    pub progress_date: String,
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Progress {
    fn record_id(&self) -> &str {
        &self.id
    }
}
