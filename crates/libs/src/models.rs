use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Approved,
    Scheduled,
    Rejected,
}

impl UploadStatus {
    pub const ALL: [UploadStatus; 4] = [
        UploadStatus::Pending,
        UploadStatus::Approved,
        UploadStatus::Scheduled,
        UploadStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Approved => "approved",
            UploadStatus::Scheduled => "scheduled",
            UploadStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(UploadStatus::Pending),
            "approved" => Ok(UploadStatus::Approved),
            "scheduled" => Ok(UploadStatus::Scheduled),
            "rejected" => Ok(UploadStatus::Rejected),
            other => Err(format!("unknown upload status {other:?}")),
        }
    }
}

// The API is not consistent about casing ("APPROVED" vs "approved").
impl<'de> Deserialize<'de> for UploadStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uploader {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub status: UploadStatus,
    #[serde(default)]
    pub displayed: bool,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub uploaded_by: Option<Uploader>,
}

impl Upload {
    /// Message with surrounding whitespace removed, `None` when blank.
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }
}

/// `GET /api/uploads` answers with a bare array unless paginated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UploadListing {
    Flat(Vec<Upload>),
    #[serde(rename_all = "camelCase")]
    Paged {
        uploads: Vec<Upload>,
        total: u64,
        total_pages: u64,
    },
}

impl UploadListing {
    pub fn uploads(&self) -> &[Upload] {
        match self {
            UploadListing::Flat(v) => v,
            UploadListing::Paged { uploads, .. } => uploads,
        }
    }

    pub fn into_uploads(self) -> Vec<Upload> {
        match self {
            UploadListing::Flat(v) => v,
            UploadListing::Paged { uploads, .. } => uploads,
        }
    }

    pub fn total(&self) -> u64 {
        match self {
            UploadListing::Flat(v) => v.len() as u64,
            UploadListing::Paged { total, .. } => *total,
        }
    }

    pub fn total_pages(&self) -> u64 {
        match self {
            UploadListing::Flat(_) => 1,
            UploadListing::Paged { total_pages, .. } => *total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
    Schedule,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Schedule => "schedule",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(UploadStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayedFilter {
    Displayed,
    NotDisplayed,
}

impl DisplayedFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayedFilter::Displayed => "displayed",
            DisplayedFilter::NotDisplayed => "not-displayed",
        }
    }
}

/// Filters and pagination for the uploads listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: StatusFilter,
    pub displayed: Option<DisplayedFilter>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn approved_not_displayed() -> Self {
        Self {
            status: StatusFilter::Only(UploadStatus::Approved),
            displayed: Some(DisplayedFilter::NotDisplayed),
            ..Self::default()
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let StatusFilter::Only(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(displayed) = self.displayed {
            params.push(("displayed", displayed.as_str().to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Photographer,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Photographer => "photographer",
            Role::Other(s) => s,
        }
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(match raw.as_str() {
            "admin" => Role::Admin,
            "photographer" => Role::Photographer,
            _ => Role::Other(raw),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Body of `PATCH /api/uploads/:id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UploadPatch {
    #[serde(rename_all = "camelCase")]
    Schedule {
        action: ModerationAction,
        scheduled_for: DateTime<Utc>,
    },
    Action { action: ModerationAction },
    Displayed { displayed: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkRequest<'a> {
    pub ids: &'a [String],
    pub action: ModerationAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_parses_api_shape() {
        let json = r#"{
            "id": "65f1",
            "photoUrl": "/uploads/a.jpg",
            "message": "  hello  ",
            "status": "APPROVED",
            "createdAt": "2025-03-01T10:00:00Z",
            "uploadedBy": { "username": "ana" }
        }"#;
        let upload: Upload = serde_json::from_str(json).unwrap();
        assert_eq!(upload.status, UploadStatus::Approved);
        assert!(!upload.displayed);
        assert_eq!(upload.text(), Some("hello"));
        assert_eq!(upload.uploaded_by.unwrap().username.as_deref(), Some("ana"));
    }

    #[test]
    fn listing_accepts_both_shapes() {
        let upload = r#"{"id":"1","status":"pending","createdAt":"2025-03-01T10:00:00Z"}"#;

        let flat: UploadListing = serde_json::from_str(&format!("[{upload}]")).unwrap();
        assert_eq!(flat.uploads().len(), 1);
        assert_eq!(flat.total_pages(), 1);

        let paged: UploadListing = serde_json::from_str(&format!(
            r#"{{"uploads":[{upload}],"total":31,"totalPages":4}}"#
        ))
        .unwrap();
        assert_eq!(paged.total(), 31);
        assert_eq!(paged.total_pages(), 4);
        assert_eq!(paged.into_uploads()[0].id, "1");
    }

    #[test]
    fn list_query_params() {
        assert!(ListQuery::default().params().is_empty());
        let q = ListQuery {
            status: StatusFilter::Only(UploadStatus::Pending),
            displayed: None,
            page: Some(2),
            limit: Some(20),
        };
        assert_eq!(
            q.params(),
            vec![
                ("status", "pending".to_string()),
                ("page", "2".to_string()),
                ("limit", "20".to_string())
            ]
        );
        assert_eq!(
            ListQuery::approved_not_displayed().params(),
            vec![
                ("status", "approved".to_string()),
                ("displayed", "not-displayed".to_string())
            ]
        );
    }

    #[test]
    fn patch_bodies() {
        let at: DateTime<Utc> = "2025-03-01T18:30:00Z".parse().unwrap();
        let body = serde_json::to_value(UploadPatch::Schedule {
            action: ModerationAction::Schedule,
            scheduled_for: at,
        })
        .unwrap();
        assert_eq!(body["action"], "schedule");
        assert_eq!(body["scheduledFor"], "2025-03-01T18:30:00Z");

        let body = serde_json::to_value(UploadPatch::Displayed { displayed: true }).unwrap();
        assert_eq!(body, serde_json::json!({ "displayed": true }));
    }

    #[test]
    fn unknown_roles_survive() {
        let user: User = serde_json::from_str(
            r#"{"id":"u1","username":"sam","role":"editor","active":false}"#,
        )
        .unwrap();
        assert_eq!(user.role, Role::Other("editor".into()));
        assert!(!user.active);
        assert_eq!(serde_json::to_value(&user.role).unwrap(), "editor");
    }
}
