use chrono::{DateTime, Utc};

use super::domain::{
    Applicant, ApplicantId, ApplicationId, ChatMessage, ChatRoom, ChatRoomId, Job, JobApplication,
    JobId, NewApplication, NewMessage, Role, User, UserId,
};

/// Accounts and seeker profiles.
pub trait IdentityStore {
    fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError>;
    fn save_user(&mut self, user: User) -> Result<User, RepositoryError>;
    fn delete_user(&mut self, id: UserId) -> Result<(), RepositoryError>;
    fn users_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError>;

    fn find_applicant(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError>;
    fn find_applicant_by_user(&self, user: UserId) -> Result<Option<Applicant>, RepositoryError>;
    fn save_applicant(&mut self, applicant: Applicant) -> Result<Applicant, RepositoryError>;
    fn delete_applicant(&mut self, id: ApplicantId) -> Result<(), RepositoryError>;
    fn all_applicants(&self) -> Result<Vec<Applicant>, RepositoryError>;
}

/// Job postings keyed by provider.
pub trait JobStore {
    fn find_job(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;
    fn jobs_by_provider(&self, provider: UserId) -> Result<Vec<Job>, RepositoryError>;
    /// Every posting, newest first.
    fn all_jobs(&self) -> Result<Vec<Job>, RepositoryError>;
    fn save_job(&mut self, job: Job) -> Result<Job, RepositoryError>;
    fn delete_job(&mut self, id: JobId) -> Result<(), RepositoryError>;
}

/// `job_application` rows.
pub trait ApplicationStore {
    fn insert_application(
        &mut self,
        application: NewApplication,
    ) -> Result<JobApplication, RepositoryError>;
    fn find_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<JobApplication>, RepositoryError>;
    fn find_application_by_room(
        &self,
        room: ChatRoomId,
    ) -> Result<Option<JobApplication>, RepositoryError>;
    fn application_exists(&self, applicant: ApplicantId, job: JobId)
        -> Result<bool, RepositoryError>;
    fn update_application(&mut self, application: &JobApplication) -> Result<(), RepositoryError>;
    fn delete_application(&mut self, id: ApplicationId) -> Result<(), RepositoryError>;
    fn applications_by_applicant(
        &self,
        applicant: ApplicantId,
    ) -> Result<Vec<JobApplication>, RepositoryError>;
    fn applications_by_job(&self, job: JobId) -> Result<Vec<JobApplication>, RepositoryError>;
    fn all_applications(&self) -> Result<Vec<JobApplication>, RepositoryError>;
}

/// `chat_room` and `chat_message` rows.
pub trait ChatStore {
    fn insert_chat_room(&mut self, created_at: DateTime<Utc>) -> Result<ChatRoom, RepositoryError>;
    fn find_chat_room(&self, id: ChatRoomId) -> Result<Option<ChatRoom>, RepositoryError>;
    fn delete_chat_room(&mut self, id: ChatRoomId) -> Result<(), RepositoryError>;

    fn insert_message(&mut self, message: NewMessage) -> Result<ChatMessage, RepositoryError>;
    /// Messages of a room ordered by `sent_at`, ties broken by id.
    fn messages_in_room(&self, room: ChatRoomId) -> Result<Vec<ChatMessage>, RepositoryError>;
    fn mark_read(&mut self, room: ChatRoomId, receiver: UserId) -> Result<usize, RepositoryError>;
    fn delete_messages_in_room(&mut self, room: ChatRoomId) -> Result<usize, RepositoryError>;
}

/// Everything a unit of work may touch.
pub trait Transaction: IdentityStore + JobStore + ApplicationStore + ChatStore {}

impl<T> Transaction for T where T: IdentityStore + JobStore + ApplicationStore + ChatStore {}

/// Storage abstraction so the engine can be exercised in isolation.
///
/// `atomically` runs `work` as one transaction: staged writes become visible only when `work`
/// returns `Ok`, and concurrent transactions never observe each other half-way.
pub trait MarketplaceRepository: Send + Sync {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint violated: {0}")]
    Constraint(String),
    #[error("row not found: {0}")]
    MissingRow(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
