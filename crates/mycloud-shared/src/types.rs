use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Server-assigned primary keys
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An account as the server reports it.
///
/// Login and registration return a subset of these fields; anything
/// missing falls back to its default until the next `users/me` refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_staff: bool,
    /// Bytes currently used.
    #[serde(default)]
    pub storage_usage: u64,
    /// Quota in bytes.
    #[serde(default)]
    pub max_storage: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_usage_percent: Option<f64>,
}

fn default_true() -> bool {
    true
}

impl Default for UserId {
    fn default() -> Self {
        Self(0)
    }
}

// Accounts are active unless the server says otherwise.
impl Default for User {
    fn default() -> Self {
        Self {
            id: UserId::default(),
            username: String::new(),
            email: String::new(),
            full_name: None,
            is_active: true,
            is_superuser: false,
            is_staff: false,
            storage_usage: 0,
            max_storage: 0,
            storage_usage_percent: None,
        }
    }
}

impl User {
    /// Staff and superusers are administrators; everyone else is a
    /// regular account shown in the admin table.
    pub fn is_regular(&self) -> bool {
        !self.is_staff && !self.is_superuser
    }
}

/// A stored file's metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredFile {
    pub id: FileId,
    pub original_name: String,
    pub size: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub shared_link: Option<String>,
    #[serde(default)]
    pub shared_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_shared_expired: bool,
    #[serde(default)]
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_download: Option<DateTime<Utc>>,
    /// Owner username.
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

/// Partial update of an account. Absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_storage: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShareRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_days: Option<u32>,
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
}

/// Result of (re)generating a public download link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShareLink {
    pub shared_link: Option<String>,
    #[serde(default)]
    pub shared_expiry: Option<DateTime<Utc>>,
}

/// Public URL under which a share token can be downloaded without
/// authentication.
pub fn shared_download_url(api_base: &str, token: &str) -> String {
    format!("{}/storage/shared/{}/", api_base.trim_end_matches('/'), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_login_user_decodes() {
        let json = r#"{"id": 7, "username": "scorpion", "email": "s@mk.io",
                       "is_staff": false, "is_superuser": false, "is_active": true}"#;
        let user: User = serde_json::from_str(json).unwrap();

        assert_eq!(user.id, UserId(7));
        assert_eq!(user.max_storage, 0);
        assert!(user.full_name.is_none());
        assert!(user.is_regular());
    }

    #[test]
    fn test_user_patch_skips_absent_fields() {
        let patch = UserPatch {
            max_storage: Some(1024),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"max_storage":1024}"#);
    }

    #[test]
    fn test_registration_confirm_field_name() {
        let reg = Registration {
            confirm_password: "Secret1!".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&reg).unwrap();
        assert_eq!(value["confirmPassword"], "Secret1!");
    }

    #[test]
    fn test_file_with_null_link() {
        let json = r#"{"id": 3, "original_name": "a.txt", "size": 12,
                       "comment": "", "shared_link": null,
                       "upload_date": "2024-05-01T10:00:00.123456Z"}"#;
        let file: StoredFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, FileId(3));
        assert!(file.shared_link.is_none());
        assert!(file.upload_date.is_some());
    }

    #[test]
    fn test_shared_download_url() {
        assert_eq!(
            shared_download_url("https://cloud.example/api/", "abc123"),
            "https://cloud.example/api/storage/shared/abc123/"
        );
    }
}
