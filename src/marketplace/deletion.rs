use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::chat::ChatPublisher;
use super::domain::{Caller, ChatRoomId, JobApplication, JobId, Role, Side, UserId};
use super::error::MarketplaceError;
use super::lifecycle::{authorize_provider, load_job, load_user, purge_chat_room};
use super::repository::{MarketplaceRepository, Transaction};

/// What a destructive operation removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeletionReport {
    pub chat_rooms: usize,
    pub chat_messages: usize,
    pub applications: usize,
    pub jobs: usize,
    pub profiles: usize,
    pub accounts: usize,
}

/// Safety check and ordered cascade for removing seeker/provider accounts and jobs.
///
/// An account with an unhidden `both_accepted` application on its own side cannot be deleted.
/// Otherwise rooms lose their messages first, then the rooms, applications, profile/jobs, and
/// finally the account, all inside one transaction.
pub struct AccountDeletionGuard<R, P> {
    repository: Arc<R>,
    publisher: Arc<P>,
}

impl<R, P> AccountDeletionGuard<R, P>
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    pub fn new(repository: Arc<R>, publisher: Arc<P>) -> Self {
        Self {
            repository,
            publisher,
        }
    }

    pub fn delete_seeker(
        &self,
        caller: Caller,
        user_id: UserId,
    ) -> Result<DeletionReport, MarketplaceError> {
        authorize_account_owner(caller, user_id)?;

        let (report, rooms) = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let user = load_user(tx, user_id)?;
            if user.role != Role::Seeker {
                return Err(MarketplaceError::not_found("seeker", user_id));
            }

            let applicant = tx.find_applicant_by_user(user_id)?;
            let applications = match &applicant {
                Some(applicant) => tx.applications_by_applicant(applicant.id)?,
                None => Vec::new(),
            };
            refuse_active_match(&applications, Side::Seeker, user_id)?;

            let (mut report, rooms) = remove_applications(tx, &applications)?;
            if let Some(applicant) = applicant {
                tx.delete_applicant(applicant.id)?;
                report.profiles = 1;
            }
            tx.delete_user(user_id)?;
            report.accounts = 1;
            Ok((report, rooms))
        })?;
        self.close_rooms(&rooms);

        info!(user_id = %user_id, ?report, "seeker account deleted");
        Ok(report)
    }

    pub fn delete_provider(
        &self,
        caller: Caller,
        user_id: UserId,
    ) -> Result<DeletionReport, MarketplaceError> {
        authorize_account_owner(caller, user_id)?;

        let (report, rooms) = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let user = load_user(tx, user_id)?;
            if user.role != Role::Provider {
                return Err(MarketplaceError::not_found("provider", user_id));
            }

            let jobs = tx.jobs_by_provider(user_id)?;
            let mut applications = Vec::new();
            for job in &jobs {
                applications.extend(tx.applications_by_job(job.id)?);
            }
            refuse_active_match(&applications, Side::Provider, user_id)?;

            let (mut report, rooms) = remove_applications(tx, &applications)?;
            for job in &jobs {
                tx.delete_job(job.id)?;
            }
            report.jobs = jobs.len();
            tx.delete_user(user_id)?;
            report.accounts = 1;
            Ok((report, rooms))
        })?;
        self.close_rooms(&rooms);

        info!(user_id = %user_id, ?report, "provider account deleted");
        Ok(report)
    }

    /// Remove a job with its applications and their chats. Owning provider or admin only.
    pub fn delete_job(
        &self,
        caller: Caller,
        job_id: JobId,
    ) -> Result<DeletionReport, MarketplaceError> {
        let (report, rooms) = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let job = load_job(tx, job_id)?;
            authorize_provider(caller, &job)?;

            let applications = tx.applications_by_job(job.id)?;
            let (mut report, rooms) = remove_applications(tx, &applications)?;
            tx.delete_job(job.id)?;
            report.jobs = 1;
            Ok((report, rooms))
        })?;
        self.close_rooms(&rooms);

        info!(job_id = %job_id, ?report, "job deleted");
        Ok(report)
    }

    fn close_rooms(&self, rooms: &[ChatRoomId]) {
        for room in rooms {
            self.publisher.close(*room);
        }
    }
}

fn authorize_account_owner(caller: Caller, user_id: UserId) -> Result<(), MarketplaceError> {
    if caller.is_admin() || caller.user_id == user_id {
        Ok(())
    } else {
        Err(MarketplaceError::unauthorized(format!(
            "user {} cannot delete account {user_id}",
            caller.user_id
        )))
    }
}

fn refuse_active_match(
    applications: &[JobApplication],
    side: Side,
    user_id: UserId,
) -> Result<(), MarketplaceError> {
    match applications
        .iter()
        .find(|application| application.is_active_match_for(side))
    {
        Some(active) => {
            warn!(
                user_id = %user_id,
                application_id = %active.id,
                side = side.label(),
                "account deletion refused: active match"
            );
            Err(MarketplaceError::conflict(format!(
                "cannot delete {} {user_id}: application {} is an active accepted match",
                side.label(),
                active.id
            )))
        }
        None => Ok(()),
    }
}

/// Rooms (messages first) and then the application rows. Returns the purged room ids.
fn remove_applications(
    tx: &mut dyn Transaction,
    applications: &[JobApplication],
) -> Result<(DeletionReport, Vec<ChatRoomId>), MarketplaceError> {
    let mut report = DeletionReport::default();
    let mut rooms = Vec::new();

    for room in applications.iter().filter_map(|application| application.chat_room_id) {
        report.chat_messages += purge_chat_room(tx, room)?;
        report.chat_rooms += 1;
        rooms.push(room);
    }
    for application in applications {
        tx.delete_application(application.id)?;
    }
    report.applications = applications.len();
    Ok((report, rooms))
}
