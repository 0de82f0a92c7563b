//! Response shapes. Every constructor is a pure mapping from rows.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    Applicant, ApplicantId, ApplicationId, ApplicationStatus, ChatMessage, ChatRoomId, Job,
    JobApplication, JobId, MessageId, Role, Side, User, UserId,
};

const PROVIDER_FALLBACK_NAME: &str = "Provider";

/// Result of an apply/accept/reject call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationView {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub message: String,
    pub applied_at: DateTime<Utc>,
    pub job_id: JobId,
    pub job_title: String,
    pub provider_id: Option<UserId>,
    pub provider_name: Option<String>,
    pub provider_email: Option<String>,
    pub chat_id: Option<ChatRoomId>,
}

impl ApplicationView {
    pub fn from_parts(application: &JobApplication, job: &Job, provider: Option<&User>) -> Self {
        Self {
            application_id: application.id,
            status: application.status,
            message: application.seeker_message.clone(),
            applied_at: application.applied_at,
            job_id: job.id,
            job_title: job.title.clone(),
            provider_id: provider.map(|user| user.id),
            provider_name: provider.map(|user| user.full_name.clone()),
            provider_email: provider.map(|user| user.email.clone()),
            chat_id: application.chat_room_id,
        }
    }
}

/// One row of a seeker's "applied jobs" listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedJobView {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub title: String,
    pub job_type: String,
    pub salary: String,
    pub location: Option<String>,
    pub provider_name: String,
    pub status: ApplicationStatus,
    pub chat_id: Option<ChatRoomId>,
}

impl AppliedJobView {
    pub fn from_parts(application: &JobApplication, job: &Job, provider: Option<&User>) -> Self {
        Self {
            application_id: application.id,
            job_id: job.id,
            title: job.title.clone(),
            job_type: job.job_type.clone(),
            salary: job.salary.clone(),
            location: job.city.clone(),
            provider_name: provider
                .map(|user| user.full_name.clone())
                .unwrap_or_else(|| PROVIDER_FALLBACK_NAME.to_string()),
            status: application.status,
            chat_id: application.chat_room_id,
        }
    }
}

/// An applicant as seen from the provider's job page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderApplicantView {
    pub application_id: ApplicationId,
    pub applicant_id: ApplicantId,
    pub user_id: UserId,
    pub name: String,
    pub age: Option<u8>,
    pub status: ApplicationStatus,
    pub message: String,
    pub chat_id: Option<ChatRoomId>,
}

impl ProviderApplicantView {
    pub fn from_parts(application: &JobApplication, applicant: &Applicant, seeker: &User) -> Self {
        Self {
            application_id: application.id,
            applicant_id: applicant.id,
            user_id: seeker.id,
            name: seeker.full_name.clone(),
            age: applicant.age,
            status: application.status,
            message: application.seeker_message.clone(),
            chat_id: application.chat_room_id,
        }
    }
}

/// A job together with the applications still visible to its provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderJobView {
    pub id: JobId,
    pub title: String,
    pub job_type: String,
    pub timing: String,
    pub salary: String,
    pub description: String,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub applicants: Vec<ProviderApplicantView>,
}

impl ProviderJobView {
    pub fn from_parts(job: &Job, applicants: Vec<ProviderApplicantView>) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            job_type: job.job_type.clone(),
            timing: job.timing.clone(),
            salary: job.salary.clone(),
            description: job.description.clone(),
            city: job.city.clone(),
            district: job.district.clone(),
            state: job.state.clone(),
            latitude: job.latitude,
            longitude: job.longitude,
            created_at: job.created_at,
            applicants,
        }
    }
}

/// Public job posting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
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

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            job_type: job.job_type.clone(),
            timing: job.timing.clone(),
            salary: job.salary.clone(),
            description: job.description.clone(),
            address: job.address.clone(),
            city: job.city.clone(),
            district: job.district.clone(),
            state: job.state.clone(),
            latitude: job.latitude,
            longitude: job.longitude,
            provider_id: job.provider_id,
            created_at: job.created_at,
        }
    }
}

/// A freshly registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub applicant_id: Option<ApplicantId>,
}

impl AccountView {
    pub fn from_parts(user: &User, applicant: Option<&Applicant>) -> Self {
        Self {
            user_id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            role: user.role,
            applicant_id: applicant.map(|profile| profile.id),
        }
    }
}

/// Seeker row of the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeekerSummary {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub age: Option<u8>,
    pub gender: Option<String>,
    pub city: Option<String>,
}

impl SeekerSummary {
    pub fn from_parts(user: &User, applicant: &Applicant) -> Self {
        Self {
            user_id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            age: applicant.age,
            gender: applicant.gender.clone(),
            city: applicant.city.clone(),
        }
    }
}

/// Provider row of the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub jobs: usize,
}

impl ProviderSummary {
    pub fn from_parts(user: &User, jobs: usize) -> Self {
        Self {
            user_id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            jobs,
        }
    }
}

/// Outcome of a hide request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HideOutcome {
    /// Only the caller's side is hidden; the row persists for the other side.
    Hidden {
        application_id: ApplicationId,
        side: Side,
    },
    /// Both sides had hidden the row, so it was deleted with its chat room.
    Removed {
        application_id: ApplicationId,
        chat_room_id: Option<ChatRoomId>,
    },
}

/// Message as stored and as pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub room_id: ChatRoomId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read: bool,
}

impl From<&ChatMessage> for MessageView {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            room_id: message.chat_room_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            sent_at: message.sent_at,
            read: message.read,
        }
    }
}

/// Reply to a send: the stored message plus whether fan-out accepted it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentMessage {
    #[serde(flatten)]
    pub message: MessageView,
    pub delivered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnreadCountView {
    pub room_id: ChatRoomId,
    pub unread: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPartnerView {
    pub name: String,
}

/// Flattened application row for the admin console.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminApplicationRecord {
    pub application_id: ApplicationId,
    pub provider_name: Option<String>,
    pub provider_email: Option<String>,
    pub provider_phone: Option<String>,
    pub job_title: String,
    pub job_type: String,
    pub job_timing: String,
    pub job_address: Option<String>,
    pub seeker_name: Option<String>,
    pub seeker_email: Option<String>,
    pub seeker_phone: Option<String>,
    pub status: ApplicationStatus,
}

impl AdminApplicationRecord {
    pub fn from_parts(
        application: &JobApplication,
        job: &Job,
        seeker: Option<&User>,
        provider: Option<&User>,
    ) -> Self {
        Self {
            application_id: application.id,
            provider_name: provider.map(|user| user.full_name.clone()),
            provider_email: provider.map(|user| user.email.clone()),
            provider_phone: provider.and_then(|user| user.phone.clone()),
            job_title: job.title.clone(),
            job_type: job.job_type.clone(),
            job_timing: job.timing.clone(),
            job_address: job.address.clone(),
            seeker_name: seeker.map(|user| user.full_name.clone()),
            seeker_email: seeker.map(|user| user.email.clone()),
            seeker_phone: seeker.and_then(|user| user.phone.clone()),
            status: application.status,
        }
    }
}
