//! Provider event normalization.
//!
//! Clerk and Mux deliver loosely shaped JSON (`{"type": ..., "data": {...}}`).
//! [`normalize`] turns one delivery into a typed [`NormalizedEvent`] carrying
//! only the fields the dispatcher needs, or explains why it produced nothing.
//! Field presence is always checked; a missing key never panics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::iso_timestamp;

/// Role recorded when Clerk omits one. Clerk user events never carry a role
/// and membership events occasionally arrive without one.
pub const DEFAULT_ROLE: &str = "member";

/// Top-level shape shared by Clerk and Mux webhook bodies.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Absent on malformed deliveries; an empty type is unrecognized.
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Which group of provider events a kind belongs to. Each Clerk endpoint only
/// accepts the families it is subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    Organization,
    Membership,
    User,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OrgCreated,
    OrgUpdated,
    OrgDeleted,
    MemberAdded,
    MemberUpdated,
    MemberRemoved,
    UserCreated,
    UserUpdated,
    UserDeleted,
    AssetCreated,
    AssetReady,
    AssetErrored,
    AssetDeleted,
}

impl EventKind {
    /// Look up the provider event type string. This table is exhaustive:
    /// everything else is unrecognized.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        let kind = match event_type {
            "organization.created" => EventKind::OrgCreated,
            "organization.updated" => EventKind::OrgUpdated,
            "organization.deleted" => EventKind::OrgDeleted,
            "organizationMembership.created" => EventKind::MemberAdded,
            "organizationMembership.updated" => EventKind::MemberUpdated,
            "organizationMembership.deleted" => EventKind::MemberRemoved,
            "user.created" => EventKind::UserCreated,
            "user.updated" => EventKind::UserUpdated,
            "user.deleted" => EventKind::UserDeleted,
            "video.upload.asset_created" => EventKind::AssetCreated,
            "video.asset.ready" => EventKind::AssetReady,
            "video.asset.errored" => EventKind::AssetErrored,
            "video.asset.deleted" => EventKind::AssetDeleted,
            _ => return None,
        };
        Some(kind)
    }

    pub fn family(&self) -> EventFamily {
        match self {
            EventKind::OrgCreated | EventKind::OrgUpdated | EventKind::OrgDeleted => {
                EventFamily::Organization
            }
            EventKind::MemberAdded | EventKind::MemberUpdated | EventKind::MemberRemoved => {
                EventFamily::Membership
            }
            EventKind::UserCreated | EventKind::UserUpdated | EventKind::UserDeleted => {
                EventFamily::User
            }
            EventKind::AssetCreated
            | EventKind::AssetReady
            | EventKind::AssetErrored
            | EventKind::AssetDeleted => EventFamily::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgCreated {
    pub org_id: String,
    pub org_admin: Option<String>,
    pub org_name: Option<String>,
    pub created_at: Option<String>,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgUpdated {
    pub org_id: String,
    pub org_name: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgDeleted {
    pub org_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAdded {
    pub membership_id: Option<String>,
    pub org_id: String,
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdated {
    pub org_id: String,
    pub user_id: String,
    pub role: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRemoved {
    pub org_id: String,
    pub user_id: String,
}

/// Allow-listed user fields forwarded for `user.created` / `user.updated`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub image_url: String,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDeleted {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetCreated {
    pub asset_id: String,
    pub upload_id: Option<String>,
    pub project_id: Option<String>,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetReady {
    pub asset_id: String,
    pub playback_id: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetErrored {
    pub asset_id: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetDeleted {
    pub asset_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    OrgCreated(OrgCreated),
    OrgUpdated(OrgUpdated),
    OrgDeleted(OrgDeleted),
    MemberAdded(MemberAdded),
    MemberUpdated(MemberUpdated),
    MemberRemoved(MemberRemoved),
    UserCreated(UserProfile),
    UserUpdated(UserProfile),
    UserDeleted(UserDeleted),
    AssetCreated(AssetCreated),
    AssetReady(AssetReady),
    AssetErrored(AssetErrored),
    AssetDeleted(AssetDeleted),
}

impl NormalizedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NormalizedEvent::OrgCreated(_) => EventKind::OrgCreated,
            NormalizedEvent::OrgUpdated(_) => EventKind::OrgUpdated,
            NormalizedEvent::OrgDeleted(_) => EventKind::OrgDeleted,
            NormalizedEvent::MemberAdded(_) => EventKind::MemberAdded,
            NormalizedEvent::MemberUpdated(_) => EventKind::MemberUpdated,
            NormalizedEvent::MemberRemoved(_) => EventKind::MemberRemoved,
            NormalizedEvent::UserCreated(_) => EventKind::UserCreated,
            NormalizedEvent::UserUpdated(_) => EventKind::UserUpdated,
            NormalizedEvent::UserDeleted(_) => EventKind::UserDeleted,
            NormalizedEvent::AssetCreated(_) => EventKind::AssetCreated,
            NormalizedEvent::AssetReady(_) => EventKind::AssetReady,
            NormalizedEvent::AssetErrored(_) => EventKind::AssetErrored,
            NormalizedEvent::AssetDeleted(_) => EventKind::AssetDeleted,
        }
    }
}

/// Result of normalizing one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Event(NormalizedEvent),
    /// The event type is not in the mapping table.
    Unrecognized(String),
    /// The type is known but a field needed downstream is missing.
    Dropped {
        kind: EventKind,
        reason: &'static str,
    },
}

/// Normalize a verified delivery. `now` stamps fields the provider does not
/// supply (membership `updatedAt`, fallback filenames).
pub fn normalize(event_type: &str, data: &Value, now: DateTime<Utc>) -> Normalized {
    let kind = match EventKind::from_event_type(event_type) {
        Some(k) => k,
        None => return Normalized::Unrecognized(event_type.to_string()),
    };

    let extracted = match kind {
        EventKind::OrgCreated => org_created(data),
        EventKind::OrgUpdated => org_updated(data),
        EventKind::OrgDeleted => str_field(data, "id")
            .map(|org_id| NormalizedEvent::OrgDeleted(OrgDeleted { org_id }))
            .ok_or("missing organization id"),
        EventKind::MemberAdded => membership(data).map(|(org_id, user_id)| {
            let role = match str_field(data, "role") {
                Some(role) => role,
                None => {
                    warn!(
                        org_id = %org_id,
                        user_id = %user_id,
                        "membership event carried no role, defaulting to {DEFAULT_ROLE}"
                    );
                    DEFAULT_ROLE.to_string()
                }
            };
            NormalizedEvent::MemberAdded(MemberAdded {
                membership_id: str_field(data, "id"),
                org_id,
                user_id,
                role,
            })
        }),
        EventKind::MemberUpdated => membership(data).map(|(org_id, user_id)| {
            NormalizedEvent::MemberUpdated(MemberUpdated {
                org_id,
                user_id,
                role: str_field(data, "role"),
                updated_at: iso_timestamp(now),
            })
        }),
        EventKind::MemberRemoved => membership(data).map(|(org_id, user_id)| {
            NormalizedEvent::MemberRemoved(MemberRemoved { org_id, user_id })
        }),
        EventKind::UserCreated => user_profile(data).map(NormalizedEvent::UserCreated),
        EventKind::UserUpdated => user_profile(data).map(NormalizedEvent::UserUpdated),
        EventKind::UserDeleted => str_field(data, "id")
            .map(|user_id| NormalizedEvent::UserDeleted(UserDeleted { user_id }))
            .ok_or("missing user id"),
        EventKind::AssetCreated => asset_created(data, now),
        EventKind::AssetReady => asset_id(data).map(|asset_id| {
            NormalizedEvent::AssetReady(AssetReady {
                asset_id,
                playback_id: data
                    .get("playback_ids")
                    .and_then(|ids| ids.get(0))
                    .and_then(|first| str_field(first, "id")),
                duration: data.get("duration").and_then(Value::as_f64),
            })
        }),
        EventKind::AssetErrored => asset_id(data).map(|asset_id| {
            NormalizedEvent::AssetErrored(AssetErrored {
                asset_id,
                error_message: asset_error_message(data),
            })
        }),
        EventKind::AssetDeleted => {
            asset_id(data).map(|asset_id| NormalizedEvent::AssetDeleted(AssetDeleted { asset_id }))
        }
    };

    match extracted {
        Ok(event) => Normalized::Event(event),
        Err(reason) => Normalized::Dropped { kind, reason },
    }
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn epoch_millis(data: &Value, key: &str) -> Option<i64> {
    let v = data.get(key)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

fn millis_to_iso(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(iso_timestamp)
}

fn org_created(data: &Value) -> Result<NormalizedEvent, &'static str> {
    let org_id = str_field(data, "id").ok_or("missing organization id")?;
    let org_admin = str_field(data, "created_by");
    Ok(NormalizedEvent::OrgCreated(OrgCreated {
        org_id,
        members: org_admin.iter().cloned().collect(),
        org_admin,
        org_name: str_field(data, "name"),
        created_at: epoch_millis(data, "created_at").and_then(millis_to_iso),
    }))
}

fn org_updated(data: &Value) -> Result<NormalizedEvent, &'static str> {
    let org_id = str_field(data, "id").ok_or("missing organization id")?;
    Ok(NormalizedEvent::OrgUpdated(OrgUpdated {
        org_id,
        org_name: str_field(data, "name"),
        updated_at: epoch_millis(data, "updated_at").and_then(millis_to_iso),
    }))
}

/// Both the `organization` and `public_user_data` sub-objects must be present.
fn membership(data: &Value) -> Result<(String, String), &'static str> {
    let org = data
        .get("organization")
        .filter(|v| v.is_object())
        .ok_or("missing organization")?;
    let user = data
        .get("public_user_data")
        .filter(|v| v.is_object())
        .ok_or("missing public_user_data")?;
    let org_id = str_field(org, "id").ok_or("missing organization id")?;
    let user_id = str_field(user, "user_id").ok_or("missing membership user id")?;
    Ok((org_id, user_id))
}

fn user_profile(data: &Value) -> Result<UserProfile, &'static str> {
    let user_id = str_field(data, "id").ok_or("missing user id")?;
    Ok(UserProfile {
        user_id,
        image_url: str_field(data, "image_url")
            .or_else(|| str_field(data, "profile_image_url"))
            .unwrap_or_default(),
        username: str_field(data, "username"),
        first_name: str_field(data, "first_name").unwrap_or_default(),
        last_name: str_field(data, "last_name").unwrap_or_default(),
        created_at: epoch_millis(data, "created_at"),
        updated_at: epoch_millis(data, "updated_at"),
        role: DEFAULT_ROLE.to_string(),
    })
}

fn asset_id(data: &Value) -> Result<String, &'static str> {
    str_field(data, "id").ok_or("missing asset id")
}

fn asset_created(data: &Value, now: DateTime<Utc>) -> Result<NormalizedEvent, &'static str> {
    let asset_id = str_field(data, "asset_id").ok_or("missing asset id")?;
    let filename = str_field(data, "filename")
        .unwrap_or_else(|| format!("video-{}.mp4", now.timestamp_millis()));
    Ok(NormalizedEvent::AssetCreated(AssetCreated {
        asset_id,
        upload_id: str_field(data, "upload_id").or_else(|| str_field(data, "id")),
        project_id: data
            .get("new_asset_settings")
            .and_then(|s| str_field(s, "passthrough")),
        filename,
    }))
}

/// Mux reports failures either as `error.message` or `errors.messages[]`.
fn asset_error_message(data: &Value) -> Option<String> {
    data.get("error")
        .and_then(|e| str_field(e, "message"))
        .or_else(|| {
            data.get("errors")
                .and_then(|e| e.get("messages"))
                .and_then(|m| m.get(0))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
}
