//! In-process marketplace store.
//!
//! Each transaction works on a staged copy of the tables and swaps it in on success, so a failed
//! unit of work leaves nothing behind. The mutex is held for the whole transaction.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::domain::{
    Applicant, ApplicantId, ApplicationId, ApplicationStatus, ChatMessage, ChatRoom, ChatRoomId,
    Job, JobApplication, JobId, MessageId, NewApplication, NewMessage, Role, User, UserId,
};
use super::repository::{
    ApplicationStore, ChatStore, IdentityStore, JobStore, MarketplaceRepository, RepositoryError,
    Transaction,
};

#[derive(Debug, Default)]
pub struct InMemoryMarketplace {
    tables: Mutex<Tables>,
}

impl InMemoryMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row counts, used by tests and the demo to show cascades.
    pub fn counts(&self) -> Result<TableCounts, RepositoryError> {
        let tables = self.lock()?;
        Ok(TableCounts {
            users: tables.users.len(),
            applicants: tables.applicants.len(),
            jobs: tables.jobs.len(),
            applications: tables.applications.len(),
            chat_rooms: tables.rooms.len(),
            chat_messages: tables.messages.len(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl MarketplaceRepository for InMemoryMarketplace {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut committed = self.lock()?;
        let mut staged = (*committed).clone();
        let output = work(&mut staged)?;
        *committed = staged;
        Ok(output)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableCounts {
    pub users: usize,
    pub applicants: usize,
    pub jobs: usize,
    pub applications: usize,
    pub chat_rooms: usize,
    pub chat_messages: usize,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    applicants: BTreeMap<ApplicantId, Applicant>,
    jobs: BTreeMap<JobId, Job>,
    applications: BTreeMap<ApplicationId, JobApplication>,
    rooms: BTreeMap<ChatRoomId, ChatRoom>,
    messages: BTreeMap<MessageId, ChatMessage>,
    sequence: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

fn missing(what: &str, id: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::MissingRow(format!("{what} {id}"))
}

impl IdentityStore for Tables {
    fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(&id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn exists_by_email(&self, email: &str) -> Result<bool, RepositoryError> {
        Ok(self.find_user_by_email(email)?.is_some())
    }

    fn save_user(&mut self, mut user: User) -> Result<User, RepositoryError> {
        let email_taken = self
            .users
            .values()
            .any(|existing| {
                existing.id != user.id && existing.email.eq_ignore_ascii_case(&user.email)
            });
        if email_taken {
            return Err(RepositoryError::Constraint(format!(
                "email {} already registered",
                user.email
            )));
        }
        if user.id.0 == 0 {
            user.id = UserId(self.next_id());
        }
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn delete_user(&mut self, id: UserId) -> Result<(), RepositoryError> {
        self.users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("user", id))
    }

    fn users_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .users
            .values()
            .filter(|user| user.role == role)
            .cloned()
            .collect())
    }

    fn find_applicant(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Ok(self.applicants.get(&id).cloned())
    }

    fn find_applicant_by_user(&self, user: UserId) -> Result<Option<Applicant>, RepositoryError> {
        Ok(self
            .applicants
            .values()
            .find(|applicant| applicant.user_id == user)
            .cloned())
    }

    fn save_applicant(&mut self, mut applicant: Applicant) -> Result<Applicant, RepositoryError> {
        let profile_taken = self
            .applicants
            .values()
            .any(|existing| existing.id != applicant.id && existing.user_id == applicant.user_id);
        if profile_taken {
            return Err(RepositoryError::Constraint(format!(
                "user {} already has an applicant profile",
                applicant.user_id
            )));
        }
        if applicant.id.0 == 0 {
            applicant.id = ApplicantId(self.next_id());
        }
        self.applicants.insert(applicant.id, applicant.clone());
        Ok(applicant)
    }

    fn delete_applicant(&mut self, id: ApplicantId) -> Result<(), RepositoryError> {
        self.applicants
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("applicant", id))
    }

    fn all_applicants(&self) -> Result<Vec<Applicant>, RepositoryError> {
        Ok(self.applicants.values().cloned().collect())
    }
}

impl JobStore for Tables {
    fn find_job(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs.get(&id).cloned())
    }

    fn jobs_by_provider(&self, provider: UserId) -> Result<Vec<Job>, RepositoryError> {
        Ok(self
            .jobs
            .values()
            .filter(|job| job.provider_id == provider)
            .cloned()
            .collect())
    }

    fn all_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        let mut jobs: Vec<Job> = self.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    fn save_job(&mut self, mut job: Job) -> Result<Job, RepositoryError> {
        if job.id.0 == 0 {
            job.id = JobId(self.next_id());
        }
        self.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    fn delete_job(&mut self, id: JobId) -> Result<(), RepositoryError> {
        self.jobs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("job", id))
    }
}

impl ApplicationStore for Tables {
    fn insert_application(
        &mut self,
        application: NewApplication,
    ) -> Result<JobApplication, RepositoryError> {
        if self.application_exists(application.applicant_id, application.job_id)? {
            return Err(RepositoryError::Constraint(format!(
                "applicant {} already applied to job {}",
                application.applicant_id, application.job_id
            )));
        }

        let row = JobApplication {
            id: ApplicationId(self.next_id()),
            job_id: application.job_id,
            applicant_id: application.applicant_id,
            seeker_message: application.seeker_message,
            status: ApplicationStatus::SeekerAccepted,
            applied_at: application.applied_at,
            chat_room_id: None,
            hidden_from_seeker: false,
            hidden_from_provider: false,
        };
        self.applications.insert(row.id, row.clone());
        Ok(row)
    }

    fn find_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(self.applications.get(&id).cloned())
    }

    fn find_application_by_room(
        &self,
        room: ChatRoomId,
    ) -> Result<Option<JobApplication>, RepositoryError> {
        Ok(self
            .applications
            .values()
            .find(|application| application.chat_room_id == Some(room))
            .cloned())
    }

    fn application_exists(
        &self,
        applicant: ApplicantId,
        job: JobId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .applications
            .values()
            .any(|row| row.applicant_id == applicant && row.job_id == job))
    }

    fn update_application(&mut self, application: &JobApplication) -> Result<(), RepositoryError> {
        if let Some(room) = application.chat_room_id {
            if room_bound_elsewhere(&self.applications, application.id, room) {
                return Err(RepositoryError::Constraint(format!(
                    "chat room {room} is already bound to another application"
                )));
            }
        }

        let row = self
            .applications
            .get_mut(&application.id)
            .ok_or_else(|| missing("application", application.id))?;
        *row = application.clone();
        Ok(())
    }

    fn delete_application(&mut self, id: ApplicationId) -> Result<(), RepositoryError> {
        self.applications
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("application", id))
    }

    fn applications_by_applicant(
        &self,
        applicant: ApplicantId,
    ) -> Result<Vec<JobApplication>, RepositoryError> {
        Ok(self
            .applications
            .values()
            .filter(|row| row.applicant_id == applicant)
            .cloned()
            .collect())
    }

    fn applications_by_job(&self, job: JobId) -> Result<Vec<JobApplication>, RepositoryError> {
        Ok(self
            .applications
            .values()
            .filter(|row| row.job_id == job)
            .cloned()
            .collect())
    }

    fn all_applications(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        Ok(self.applications.values().cloned().collect())
    }
}

fn room_bound_elsewhere(
    applications: &BTreeMap<ApplicationId, JobApplication>,
    owner: ApplicationId,
    room: ChatRoomId,
) -> bool {
    applications
        .values()
        .any(|row| row.id != owner && row.chat_room_id == Some(room))
}

impl ChatStore for Tables {
    fn insert_chat_room(&mut self, created_at: DateTime<Utc>) -> Result<ChatRoom, RepositoryError> {
        let room = ChatRoom {
            id: ChatRoomId(self.next_id()),
            created_at,
        };
        self.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    fn find_chat_room(&self, id: ChatRoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        Ok(self.rooms.get(&id).cloned())
    }

    fn delete_chat_room(&mut self, id: ChatRoomId) -> Result<(), RepositoryError> {
        if self.messages.values().any(|message| message.chat_room_id == id) {
            return Err(RepositoryError::Constraint(format!(
                "chat room {id} still has messages"
            )));
        }
        self.rooms
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing("chat room", id))
    }

    fn insert_message(&mut self, message: NewMessage) -> Result<ChatMessage, RepositoryError> {
        if !self.rooms.contains_key(&message.chat_room_id) {
            return Err(missing("chat room", message.chat_room_id));
        }

        let row = ChatMessage {
            id: MessageId(self.next_id()),
            chat_room_id: message.chat_room_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            sent_at: message.sent_at,
            read: false,
        };
        self.messages.insert(row.id, row.clone());
        Ok(row)
    }

    fn messages_in_room(&self, room: ChatRoomId) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .values()
            .filter(|message| message.chat_room_id == room)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    fn mark_read(&mut self, room: ChatRoomId, receiver: UserId) -> Result<usize, RepositoryError> {
        let mut flipped = 0;
        for message in self.messages.values_mut() {
            if message.chat_room_id == room && message.receiver_id == receiver && !message.read {
                message.read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    fn delete_messages_in_room(&mut self, room: ChatRoomId) -> Result<usize, RepositoryError> {
        let before = self.messages.len();
        self.messages.retain(|_, message| message.chat_room_id != room);
        Ok(before - self.messages.len())
    }
}
