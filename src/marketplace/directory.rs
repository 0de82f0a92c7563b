use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::domain::{Applicant, ApplicantId, Caller, Role, User, UserId};
use super::error::MarketplaceError;
use super::repository::MarketplaceRepository;
use super::views::{AccountView, ProviderSummary, SeekerSummary};

/// Profile data for a new account. Credentials are handled by the authentication layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

const NEW_SEEKER_STATUS: &str = "ACTIVE";

/// Account registration and the admin's seeker/provider listings.
pub struct AccountDirectory<R> {
    repository: Arc<R>,
}

impl<R> AccountDirectory<R>
where
    R: MarketplaceRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create a seeker or provider account. Seekers also get their applicant profile.
    pub fn register(&self, registration: Registration) -> Result<AccountView, MarketplaceError> {
        if registration.role == Role::Admin {
            return Err(MarketplaceError::unauthorized(
                "admin accounts cannot be self-registered",
            ));
        }
        let email = registration.email.trim().to_string();

        let view = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            if tx.exists_by_email(&email)? {
                return Err(MarketplaceError::EmailTaken(email.clone()));
            }

            let user = tx.save_user(User {
                id: UserId(0),
                full_name: registration.full_name.trim().to_string(),
                email: email.clone(),
                phone: registration.phone,
                role: registration.role,
                enabled: true,
            })?;

            let profile = match user.role {
                Role::Seeker => Some(tx.save_applicant(Applicant {
                    id: ApplicantId(0),
                    user_id: user.id,
                    age: registration.age,
                    gender: registration.gender,
                    skills: registration.skills,
                    experience: registration.experience,
                    city: registration.city,
                    district: registration.district,
                    state: registration.state,
                    status: Some(NEW_SEEKER_STATUS.to_string()),
                })?),
                Role::Provider | Role::Admin => None,
            };
            Ok(AccountView::from_parts(&user, profile.as_ref()))
        })?;

        info!(user_id = %view.user_id, role = view.role.label(), "account registered");
        Ok(view)
    }

    /// Every seeker profile with its account. Admin only.
    pub fn seekers(&self, caller: Caller) -> Result<Vec<SeekerSummary>, MarketplaceError> {
        require_admin(caller, "seeker")?;
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let mut seekers = Vec::new();
            for applicant in tx.all_applicants()? {
                if let Some(user) = tx.find_user(applicant.user_id)? {
                    seekers.push(SeekerSummary::from_parts(&user, &applicant));
                }
            }
            Ok(seekers)
        })
    }

    /// Every provider account with its posting count. Admin only.
    pub fn providers(&self, caller: Caller) -> Result<Vec<ProviderSummary>, MarketplaceError> {
        require_admin(caller, "provider")?;
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let mut providers = Vec::new();
            for user in tx.users_by_role(Role::Provider)? {
                let jobs = tx.jobs_by_provider(user.id)?.len();
                providers.push(ProviderSummary::from_parts(&user, jobs));
            }
            Ok(providers)
        })
    }
}

fn require_admin(caller: Caller, listing: &str) -> Result<(), MarketplaceError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(MarketplaceError::unauthorized(format!(
            "{listing} listing is restricted to admins"
        )))
    }
}
