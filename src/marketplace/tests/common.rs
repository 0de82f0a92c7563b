use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::marketplace::chat::{ChatHub, ChatPublisher, PublishError};
use crate::marketplace::domain::{
    Applicant, ApplicantId, ApplicationId, Caller, ChatRoomId, Job, JobId, Role, User, UserId,
};
use crate::marketplace::memory::InMemoryMarketplace;
use crate::marketplace::repository::{MarketplaceRepository, RepositoryError, Transaction};
use crate::marketplace::views::MessageView;
use crate::marketplace::{marketplace_router, Marketplace};

pub(super) type TestMarketplace = Marketplace<InMemoryMarketplace, ChatHub>;

/// Accounts and jobs every scenario starts from.
#[derive(Debug, Clone, Copy)]
pub(super) struct Seeded {
    pub(super) seeker: Caller,
    pub(super) seeker_profile: ApplicantId,
    pub(super) other_seeker: Caller,
    pub(super) provider: Caller,
    pub(super) other_provider: Caller,
    pub(super) admin: Caller,
    pub(super) job: JobId,
    pub(super) other_job: JobId,
}

pub(super) fn user(full_name: &str, email: &str, role: Role) -> User {
    User {
        id: UserId(0),
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: Some("+91 98450 00000".to_string()),
        role,
        enabled: true,
    }
}

pub(super) fn applicant_for(user_id: UserId) -> Applicant {
    Applicant {
        id: ApplicantId(0),
        user_id,
        age: Some(21),
        gender: None,
        skills: Some("billing, inventory".to_string()),
        experience: Some("6 months".to_string()),
        city: Some("Mysuru".to_string()),
        district: Some("Mysuru".to_string()),
        state: Some("Karnataka".to_string()),
        status: Some("student".to_string()),
    }
}

pub(super) fn job_for(provider_id: UserId, title: &str) -> Job {
    Job {
        id: JobId(0),
        title: title.to_string(),
        job_type: "Part-time".to_string(),
        timing: "17:00-21:00".to_string(),
        salary: "250/day".to_string(),
        description: "Evening counter shift".to_string(),
        address: Some("12 Sayyaji Rao Road".to_string()),
        city: Some("Mysuru".to_string()),
        district: Some("Mysuru".to_string()),
        state: Some("Karnataka".to_string()),
        latitude: Some(12.3051),
        longitude: Some(76.6551),
        provider_id,
        created_at: Utc::now(),
    }
}

pub(super) fn seed(repository: &InMemoryMarketplace) -> Seeded {
    repository
        .atomically(|tx| -> Result<_, RepositoryError> {
            let seeker = tx.save_user(user("Asha Rao", "asha@example.com", Role::Seeker))?;
            let profile = tx.save_applicant(applicant_for(seeker.id))?;
            let other_seeker =
                tx.save_user(user("Kiran Das", "kiran@example.com", Role::Seeker))?;
            tx.save_applicant(applicant_for(other_seeker.id))?;
            let provider =
                tx.save_user(user("Meera Stores", "meera@example.com", Role::Provider))?;
            let other_provider =
                tx.save_user(user("Ravi Cafe", "ravi@example.com", Role::Provider))?;
            let admin = tx.save_user(user("Ops Admin", "ops@example.com", Role::Admin))?;
            let job = tx.save_job(job_for(provider.id, "Billing assistant"))?;
            let other_job = tx.save_job(job_for(other_provider.id, "Barista"))?;

            Ok(Seeded {
                seeker: Caller::new(seeker.id, Role::Seeker),
                seeker_profile: profile.id,
                other_seeker: Caller::new(other_seeker.id, Role::Seeker),
                provider: Caller::new(provider.id, Role::Provider),
                other_provider: Caller::new(other_provider.id, Role::Provider),
                admin: Caller::new(admin.id, Role::Admin),
                job: job.id,
                other_job: other_job.id,
            })
        })
        .expect("seed data commits")
}

pub(super) fn build_marketplace() -> (TestMarketplace, Arc<InMemoryMarketplace>, Seeded) {
    let repository = Arc::new(InMemoryMarketplace::new());
    let seeded = seed(&repository);
    let marketplace = Marketplace::new(repository.clone(), Arc::new(ChatHub::new(8)));
    (marketplace, repository, seeded)
}

/// Apply and accept, returning the matched application and its room.
pub(super) fn matched_pair(
    marketplace: &TestMarketplace,
    seeded: &Seeded,
) -> (ApplicationId, ChatRoomId) {
    let applied = marketplace
        .lifecycle
        .apply(seeded.seeker, seeded.job, "I can start Monday")
        .expect("apply succeeds");
    let accepted = marketplace
        .lifecycle
        .provider_accept(seeded.provider, applied.application_id)
        .expect("accept succeeds");
    let room = accepted.chat_id.expect("match opens a chat room");
    (applied.application_id, room)
}

/// Run a read-only closure against the committed tables.
pub(super) fn inspect<T>(
    repository: &InMemoryMarketplace,
    read: impl FnOnce(&mut dyn Transaction) -> Result<T, RepositoryError>,
) -> T {
    repository.atomically(read).expect("inspection succeeds")
}

#[derive(Default)]
pub(super) struct RecordingPublisher {
    published: Mutex<Vec<(ChatRoomId, MessageView)>>,
}

impl RecordingPublisher {
    pub(super) fn published(&self) -> Vec<(ChatRoomId, MessageView)> {
        self.published
            .lock()
            .expect("publisher mutex poisoned")
            .clone()
    }
}

impl ChatPublisher for RecordingPublisher {
    fn publish(&self, room: ChatRoomId, message: &MessageView) -> Result<(), PublishError> {
        self.published
            .lock()
            .expect("publisher mutex poisoned")
            .push((room, message.clone()));
        Ok(())
    }
}

pub(super) struct FailingPublisher;

impl ChatPublisher for FailingPublisher {
    fn publish(&self, room: ChatRoomId, _message: &MessageView) -> Result<(), PublishError> {
        Err(PublishError::Channel {
            channel: format!("room:{room}"),
            reason: "broker offline".to_string(),
        })
    }
}

pub(super) struct UnavailableRepository;

impl MarketplaceRepository for UnavailableRepository {
    fn atomically<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(E::from(RepositoryError::Unavailable(
            "database offline".to_string(),
        )))
    }
}

pub(super) fn router_for(marketplace: TestMarketplace) -> axum::Router {
    marketplace_router(Arc::new(marketplace))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
