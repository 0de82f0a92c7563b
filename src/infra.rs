use chrono::Utc;
use jobportal::marketplace::{
    Applicant, ApplicantId, Caller, InMemoryMarketplace, Job, JobId, MarketplaceRepository,
    RepositoryError, Role, User, UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Callers and the job created by [`seed_sample_directory`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct SampleDirectory {
    pub(crate) seeker: Caller,
    pub(crate) second_seeker: Caller,
    pub(crate) provider: Caller,
    pub(crate) admin: Caller,
    pub(crate) job: JobId,
}

fn account(full_name: &str, email: &str, phone: &str, role: Role) -> User {
    User {
        id: UserId(0),
        full_name: full_name.to_string(),
        email: email.to_string(),
        phone: Some(phone.to_string()),
        role,
        enabled: true,
    }
}

fn profile(user_id: UserId, age: u8, skills: &str) -> Applicant {
    Applicant {
        id: ApplicantId(0),
        user_id,
        age: Some(age),
        gender: None,
        skills: Some(skills.to_string()),
        experience: None,
        city: Some("Udupi".to_string()),
        district: Some("Udupi".to_string()),
        state: Some("Karnataka".to_string()),
        status: Some("student".to_string()),
    }
}

/// Two seekers with profiles, one provider with an open job, and an admin.
pub(crate) fn seed_sample_directory(
    repository: &InMemoryMarketplace,
) -> Result<SampleDirectory, RepositoryError> {
    repository.atomically(|tx| -> Result<_, RepositoryError> {
        let seeker = tx.save_user(account(
            "Priya Shetty",
            "priya.shetty@example.com",
            "+91 90000 11111",
            Role::Seeker,
        ))?;
        tx.save_applicant(profile(seeker.id, 20, "customer service, UPI billing"))?;
        let second_seeker = tx.save_user(account(
            "Nikhil Pai",
            "nikhil.pai@example.com",
            "+91 90000 44444",
            Role::Seeker,
        ))?;
        tx.save_applicant(profile(second_seeker.id, 19, "delivery, stock keeping"))?;

        let provider = tx.save_user(account(
            "Coastal Bakes",
            "hiring@coastalbakes.example.com",
            "+91 90000 22222",
            Role::Provider,
        ))?;
        let admin = tx.save_user(account(
            "Portal Admin",
            "admin@jobportal.example.com",
            "+91 90000 33333",
            Role::Admin,
        ))?;

        let job = tx.save_job(Job {
            id: JobId(0),
            title: "Weekend counter staff".to_string(),
            job_type: "Part-time".to_string(),
            timing: "Sat-Sun 08:00-14:00".to_string(),
            salary: "400/day".to_string(),
            description: "Serve customers and manage the billing counter".to_string(),
            address: Some("Car Street, Udupi".to_string()),
            city: Some("Udupi".to_string()),
            district: Some("Udupi".to_string()),
            state: Some("Karnataka".to_string()),
            latitude: Some(13.3409),
            longitude: Some(74.7421),
            provider_id: provider.id,
            created_at: Utc::now(),
        })?;

        Ok(SampleDirectory {
            seeker: Caller::new(seeker.id, Role::Seeker),
            second_seeker: Caller::new(second_seeker.id, Role::Seeker),
            provider: Caller::new(provider.id, Role::Provider),
            admin: Caller::new(admin.id, Role::Admin),
            job: job.id,
        })
    })
}
