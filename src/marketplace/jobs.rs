use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::domain::{Caller, Job, JobId, Role};
use super::error::MarketplaceError;
use super::lifecycle::{authorize_provider, load_job, load_user};
use super::repository::MarketplaceRepository;
use super::views::JobView;

/// Editable fields of a posting. The owner and creation time are never taken from the client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobDraft {
    pub title: String,
    #[serde(alias = "type")]
    pub job_type: String,
    pub timing: String,
    pub salary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl JobDraft {
    fn apply_to(self, job: &mut Job) {
        job.title = self.title;
        job.job_type = self.job_type;
        job.timing = self.timing;
        job.salary = self.salary;
        job.description = self.description;
        job.address = self.address;
        job.city = self.city;
        job.district = self.district;
        job.state = self.state;
        job.latitude = self.latitude;
        job.longitude = self.longitude;
    }
}

/// Browse filters. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobFilter {
    /// Case-insensitive substring of the title or address.
    #[serde(default)]
    pub search: Option<String>,
    /// Case-insensitive substring of the city or address.
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, alias = "type")]
    pub job_type: Option<String>,
    /// Upper bound on the numeric part of the salary text.
    #[serde(default)]
    pub max_salary: Option<u64>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        let address = job.address.as_deref().unwrap_or_default();
        let city = job.city.as_deref().unwrap_or_default();

        if let Some(term) = normalized(&self.search) {
            if !contains_folded(&job.title, &term) && !contains_folded(address, &term) {
                return false;
            }
        }
        if let Some(place) = normalized(&self.city) {
            if !contains_folded(city, &place) && !contains_folded(address, &place) {
                return false;
            }
        }
        if let Some(kind) = normalized(&self.job_type) {
            if !job.job_type.trim().eq_ignore_ascii_case(&kind) {
                return false;
            }
        }
        if let Some(limit) = self.max_salary {
            match salary_amount(&job.salary) {
                Some(amount) if amount <= limit => {}
                _ => return false,
            }
        }
        true
    }
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::to_lowercase)
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Digits of a free-text salary such as `"400/day"`, read as one number.
fn salary_amount(salary: &str) -> Option<u64> {
    let digits: String = salary.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Job postings: providers publish and edit their own, anyone may browse.
pub struct JobBoard<R> {
    repository: Arc<R>,
}

impl<R> JobBoard<R>
where
    R: MarketplaceRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Publish a posting owned by the calling provider.
    pub fn create_job(&self, caller: Caller, draft: JobDraft) -> Result<JobView, MarketplaceError> {
        if caller.role != Role::Provider {
            return Err(MarketplaceError::unauthorized(
                "only providers can post jobs",
            ));
        }

        let job = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            load_user(tx, caller.user_id)?;
            let mut job = Job {
                id: JobId(0),
                title: String::new(),
                job_type: String::new(),
                timing: String::new(),
                salary: String::new(),
                description: String::new(),
                address: None,
                city: None,
                district: None,
                state: None,
                latitude: None,
                longitude: None,
                provider_id: caller.user_id,
                created_at: Utc::now(),
            };
            draft.apply_to(&mut job);
            Ok(tx.save_job(job)?)
        })?;

        info!(job_id = %job.id, provider = %caller.user_id, "job posted");
        Ok(JobView::from(&job))
    }

    /// The calling provider's own postings.
    pub fn provider_jobs(&self, caller: Caller) -> Result<Vec<JobView>, MarketplaceError> {
        if caller.role != Role::Provider {
            return Err(MarketplaceError::unauthorized(
                "only providers have job postings",
            ));
        }
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let jobs = tx.jobs_by_provider(caller.user_id)?;
            Ok(jobs.iter().map(JobView::from).collect())
        })
    }

    pub fn job(&self, job_id: JobId) -> Result<JobView, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            Ok(JobView::from(&load_job(tx, job_id)?))
        })
    }

    /// Replace the editable fields. Owning provider or admin only.
    pub fn update_job(
        &self,
        caller: Caller,
        job_id: JobId,
        draft: JobDraft,
    ) -> Result<JobView, MarketplaceError> {
        let job = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let mut job = load_job(tx, job_id)?;
            authorize_provider(caller, &job)?;
            draft.apply_to(&mut job);
            Ok(tx.save_job(job)?)
        })?;

        info!(job_id = %job_id, editor = %caller.user_id, "job updated");
        Ok(JobView::from(&job))
    }

    /// Every posting matching `filter`, newest first.
    pub fn search_jobs(&self, filter: &JobFilter) -> Result<Vec<JobView>, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            Ok(tx
                .all_jobs()?
                .iter()
                .filter(|job| filter.matches(job))
                .map(JobView::from)
                .collect())
        })
    }
}
