use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Account identifier owned by the identity store.
    UserId
);
row_id!(
    /// Seeker-side profile identifier.
    ApplicantId
);
row_id!(JobId);
row_id!(ApplicationId);
row_id!(ChatRoomId);
row_id!(MessageId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Seeker,
    Provider,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Seeker => "SEEKER",
            Role::Provider => "PROVIDER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SEEKER" => Some(Role::Seeker),
            "PROVIDER" => Some(Role::Provider),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Account record held by the identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub enabled: bool,
}

/// Seeker profile, one-to-one with a SEEKER account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub user_id: UserId,
    pub age: Option<u8>,
    pub gender: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
}

/// Job posting. The provider is referenced by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub job_type: String,
    pub timing: String,
    pub salary: String,
    pub description: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub provider_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Status of a seeker's application against a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    SeekerAccepted,
    ProviderAccepted,
    BothAccepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::SeekerAccepted => "seeker_accepted",
            ApplicationStatus::ProviderAccepted => "provider_accepted",
            ApplicationStatus::BothAccepted => "both_accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Final statuses: withdrawal is closed and hiding is open.
    pub const fn is_final(self) -> bool {
        matches!(
            self,
            ApplicationStatus::BothAccepted | ApplicationStatus::Rejected
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The central lifecycle row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub applicant_id: ApplicantId,
    pub seeker_message: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub chat_room_id: Option<ChatRoomId>,
    pub hidden_from_seeker: bool,
    pub hidden_from_provider: bool,
}

impl JobApplication {
    pub fn hidden_from(&self, side: Side) -> bool {
        match side {
            Side::Seeker => self.hidden_from_seeker,
            Side::Provider => self.hidden_from_provider,
        }
    }

    /// An unhidden mutual match blocks account deletion for that side.
    pub fn is_active_match_for(&self, side: Side) -> bool {
        self.status == ApplicationStatus::BothAccepted && !self.hidden_from(side)
    }
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub job_id: JobId,
    pub applicant_id: ApplicantId,
    pub seeker_message: String,
    pub applied_at: DateTime<Utc>,
}

/// Which party of an application an operation acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Seeker,
    Provider,
}

impl Side {
    pub const fn label(self) -> &'static str {
        match self {
            Side::Seeker => "seeker",
            Side::Provider => "provider",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: ChatRoomId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_room_id: ChatRoomId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub chat_room_id: ChatRoomId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// The two fixed participants of a chat room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomParticipants {
    pub seeker: UserId,
    pub provider: UserId,
}

impl RoomParticipants {
    pub fn includes(&self, user: UserId) -> bool {
        self.seeker == user || self.provider == user
    }

    /// The party opposite `user`, if `user` is a participant.
    pub fn counterpart(&self, user: UserId) -> Option<UserId> {
        if user == self.seeker {
            Some(self.provider)
        } else if user == self.provider {
            Some(self.seeker)
        } else {
            None
        }
    }
}

/// Verified identity of whoever issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub const fn seeker(user_id: u64) -> Self {
        Self::new(UserId(user_id), Role::Seeker)
    }

    pub const fn provider(user_id: u64) -> Self {
        Self::new(UserId(user_id), Role::Provider)
    }

    pub const fn admin(user_id: u64) -> Self {
        Self::new(UserId(user_id), Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
