use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{
    Applicant, ApplicationId, ApplicationStatus, Caller, ChatRoomId, Job, JobApplication, JobId,
    NewApplication, Role, RoomParticipants, Side, User, UserId,
};
use super::chat::ChatPublisher;
use super::error::MarketplaceError;
use super::repository::{MarketplaceRepository, Transaction};
use super::views::{
    AdminApplicationRecord, AppliedJobView, ApplicationView, HideOutcome, ProviderApplicantView,
    ProviderJobView,
};

/// Application lifecycle engine: apply, accept/reject, withdraw, hide, and the listings.
///
/// Every operation runs inside one store transaction, so the room check-then-create on accept and
/// the dual-hide cleanup are atomic with respect to concurrent callers.
pub struct ApplicationLifecycle<R, P> {
    repository: Arc<R>,
    publisher: Arc<P>,
}

impl<R, P> ApplicationLifecycle<R, P>
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

    /// Create a `seeker_accepted` application. Re-applying is refused whatever the old status.
    pub fn apply(
        &self,
        caller: Caller,
        job_id: JobId,
        message: impl Into<String>,
    ) -> Result<ApplicationView, MarketplaceError> {
        if caller.role != Role::Seeker {
            return Err(MarketplaceError::unauthorized(
                "only seekers can apply for jobs",
            ));
        }
        let message = message.into();

        let view = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let job = load_job(tx, job_id)?;
            load_user(tx, caller.user_id)?;
            let applicant = seeker_profile(tx, caller.user_id)?;

            if tx.application_exists(applicant.id, job.id)? {
                return Err(MarketplaceError::Duplicate {
                    applicant: applicant.id,
                    job: job.id,
                });
            }

            let stored = tx.insert_application(NewApplication {
                job_id: job.id,
                applicant_id: applicant.id,
                seeker_message: message,
                applied_at: Utc::now(),
            })?;
            let provider = tx.find_user(job.provider_id)?;
            Ok(ApplicationView::from_parts(&stored, &job, provider.as_ref()))
        })?;

        info!(
            application_id = %view.application_id,
            job_id = %job_id,
            seeker = %caller.user_id,
            "application submitted"
        );
        Ok(view)
    }

    /// Provider acceptance. A `seeker_accepted` row becomes `both_accepted` and gets its chat
    /// room; a row that is already matched is returned unchanged.
    pub fn provider_accept(
        &self,
        caller: Caller,
        application_id: ApplicationId,
    ) -> Result<ApplicationView, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let mut application = load_application(tx, application_id)?;
            let job = load_job(tx, application.job_id)?;
            authorize_provider(caller, &job)?;

            match application.status {
                ApplicationStatus::SeekerAccepted | ApplicationStatus::BothAccepted => {
                    let previous = application.status;
                    application.status = ApplicationStatus::BothAccepted;
                    let room = ensure_chat_room(tx, &mut application)?;
                    tx.update_application(&application)?;
                    if previous == ApplicationStatus::BothAccepted {
                        debug!(%application_id, "accept on matched application is a no-op");
                    } else {
                        info!(%application_id, chat_room_id = %room, "application matched");
                    }
                }
                ApplicationStatus::ProviderAccepted | ApplicationStatus::Rejected => {
                    if application.hidden_from_seeker || application.hidden_from_provider {
                        return Err(MarketplaceError::conflict(format!(
                            "application {application_id} has been hidden and cannot be re-opened"
                        )));
                    }
                    application.status = ApplicationStatus::ProviderAccepted;
                    tx.update_application(&application)?;
                    info!(%application_id, "application accepted by provider");
                }
            }

            let provider = tx.find_user(job.provider_id)?;
            Ok(ApplicationView::from_parts(&application, &job, provider.as_ref()))
        })
    }

    /// Unconditional rejection. Hide flags and the chat room are left as they are.
    pub fn provider_reject(
        &self,
        caller: Caller,
        application_id: ApplicationId,
    ) -> Result<ApplicationView, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let mut application = load_application(tx, application_id)?;
            let job = load_job(tx, application.job_id)?;
            authorize_provider(caller, &job)?;

            application.status = ApplicationStatus::Rejected;
            tx.update_application(&application)?;
            info!(%application_id, "application rejected by provider");

            let provider = tx.find_user(job.provider_id)?;
            Ok(ApplicationView::from_parts(&application, &job, provider.as_ref()))
        })
    }

    /// Seeker withdrawal while the application is still pending.
    pub fn withdraw(
        &self,
        caller: Caller,
        application_id: ApplicationId,
    ) -> Result<(), MarketplaceError> {
        let purged_room = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let application = load_application(tx, application_id)?;
            let applicant = load_applicant(tx, &application)?;
            if applicant.user_id != caller.user_id {
                return Err(MarketplaceError::unauthorized(format!(
                    "user {} does not own application {application_id}",
                    caller.user_id
                )));
            }
            if application.status.is_final() {
                return Err(MarketplaceError::conflict(format!(
                    "cannot withdraw application {application_id} after it was {}",
                    application.status
                )));
            }

            let room = purge_application(tx, &application)?;
            info!(%application_id, "application withdrawn by seeker");
            Ok(room)
        })?;

        if let Some(room) = purged_room {
            self.publisher.close(room);
        }
        Ok(())
    }

    pub fn hide_for_seeker(
        &self,
        caller: Caller,
        application_id: ApplicationId,
    ) -> Result<HideOutcome, MarketplaceError> {
        self.hide(caller, application_id, Side::Seeker)
    }

    pub fn hide_for_provider(
        &self,
        caller: Caller,
        application_id: ApplicationId,
    ) -> Result<HideOutcome, MarketplaceError> {
        self.hide(caller, application_id, Side::Provider)
    }

    /// Set the caller's hide flag; once both flags are set the row and its chat are deleted in
    /// the same transaction, so no committed row ever carries both flags.
    fn hide(
        &self,
        caller: Caller,
        application_id: ApplicationId,
        side: Side,
    ) -> Result<HideOutcome, MarketplaceError> {
        let outcome = self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let mut application = load_application(tx, application_id)?;
            let owner = match side {
                Side::Seeker => load_applicant(tx, &application)?.user_id,
                Side::Provider => load_job(tx, application.job_id)?.provider_id,
            };
            if owner != caller.user_id {
                return Err(MarketplaceError::unauthorized(format!(
                    "user {} is not the {} of application {application_id}",
                    caller.user_id,
                    side.label()
                )));
            }
            if !application.status.is_final() {
                return Err(MarketplaceError::conflict(format!(
                    "application {application_id} is still {} and cannot be hidden",
                    application.status
                )));
            }

            match side {
                Side::Seeker => application.hidden_from_seeker = true,
                Side::Provider => application.hidden_from_provider = true,
            }

            if application.hidden_from_seeker && application.hidden_from_provider {
                let chat_room_id = purge_application(tx, &application)?;
                info!(%application_id, ?chat_room_id, "application hidden by both sides, removed");
                return Ok(HideOutcome::Removed {
                    application_id,
                    chat_room_id,
                });
            }

            tx.update_application(&application)?;
            info!(%application_id, side = side.label(), "application hidden");
            Ok(HideOutcome::Hidden {
                application_id,
                side,
            })
        })?;

        if let HideOutcome::Removed {
            chat_room_id: Some(room),
            ..
        } = outcome
        {
            self.publisher.close(room);
        }
        Ok(outcome)
    }

    /// The caller's own applications, minus the ones they have hidden.
    pub fn applied_jobs_for_seeker(
        &self,
        caller: Caller,
    ) -> Result<Vec<AppliedJobView>, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            load_user(tx, caller.user_id)?;
            let applicant = seeker_profile(tx, caller.user_id)?;

            let mut views = Vec::new();
            for application in tx.applications_by_applicant(applicant.id)? {
                if application.hidden_from_seeker {
                    continue;
                }
                let job = load_job(tx, application.job_id)?;
                let provider = tx.find_user(job.provider_id)?;
                views.push(AppliedJobView::from_parts(&application, &job, provider.as_ref()));
            }
            Ok(views)
        })
    }

    /// A job and the applications its provider has not hidden.
    pub fn applications_for_job(
        &self,
        caller: Caller,
        job_id: JobId,
    ) -> Result<ProviderJobView, MarketplaceError> {
        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let job = load_job(tx, job_id)?;
            authorize_provider(caller, &job)?;

            let mut applicants = Vec::new();
            for application in tx.applications_by_job(job.id)? {
                if application.hidden_from_provider {
                    continue;
                }
                let applicant = load_applicant(tx, &application)?;
                let seeker = load_user(tx, applicant.user_id)?;
                applicants.push(ProviderApplicantView::from_parts(
                    &application,
                    &applicant,
                    &seeker,
                ));
            }
            Ok(ProviderJobView::from_parts(&job, applicants))
        })
    }

    /// Every application with contact details on both sides. Admin only.
    pub fn admin_records(
        &self,
        caller: Caller,
    ) -> Result<Vec<AdminApplicationRecord>, MarketplaceError> {
        if !caller.is_admin() {
            return Err(MarketplaceError::unauthorized(
                "application records are restricted to admins",
            ));
        }

        self.repository.atomically(|tx| -> Result<_, MarketplaceError> {
            let mut records = Vec::new();
            for application in tx.all_applications()? {
                let job = load_job(tx, application.job_id)?;
                let seeker = match tx.find_applicant(application.applicant_id)? {
                    Some(applicant) => tx.find_user(applicant.user_id)?,
                    None => None,
                };
                let provider = tx.find_user(job.provider_id)?;
                records.push(AdminApplicationRecord::from_parts(
                    &application,
                    &job,
                    seeker.as_ref(),
                    provider.as_ref(),
                ));
            }
            Ok(records)
        })
    }
}

pub(crate) fn authorize_provider(caller: Caller, job: &Job) -> Result<(), MarketplaceError> {
    if caller.is_admin() || caller.user_id == job.provider_id {
        Ok(())
    } else {
        Err(MarketplaceError::unauthorized(format!(
            "user {} does not own job {}",
            caller.user_id, job.id
        )))
    }
}

/// Bind a room to the application unless one is already bound. Must run inside the transaction
/// that persists the application.
fn ensure_chat_room(
    tx: &mut dyn Transaction,
    application: &mut JobApplication,
) -> Result<ChatRoomId, MarketplaceError> {
    if let Some(room) = application.chat_room_id {
        return Ok(room);
    }
    let room = tx.insert_chat_room(Utc::now())?;
    application.chat_room_id = Some(room.id);
    Ok(room.id)
}

pub(crate) fn load_application(
    tx: &dyn Transaction,
    id: ApplicationId,
) -> Result<JobApplication, MarketplaceError> {
    tx.find_application(id)?
        .ok_or_else(|| MarketplaceError::not_found("application", id))
}

pub(crate) fn load_job(tx: &dyn Transaction, id: JobId) -> Result<Job, MarketplaceError> {
    tx.find_job(id)?
        .ok_or_else(|| MarketplaceError::not_found("job", id))
}

pub(crate) fn load_user(tx: &dyn Transaction, id: UserId) -> Result<User, MarketplaceError> {
    tx.find_user(id)?
        .ok_or_else(|| MarketplaceError::not_found("user", id))
}

fn seeker_profile(tx: &dyn Transaction, user: UserId) -> Result<Applicant, MarketplaceError> {
    tx.find_applicant_by_user(user)?
        .ok_or_else(|| MarketplaceError::not_found("applicant profile for user", user))
}

pub(crate) fn load_applicant(
    tx: &dyn Transaction,
    application: &JobApplication,
) -> Result<Applicant, MarketplaceError> {
    tx.find_applicant(application.applicant_id)?
        .ok_or_else(|| MarketplaceError::not_found("applicant", application.applicant_id))
}

/// Seeker account and job provider of an application.
pub(crate) fn participants_of(
    tx: &dyn Transaction,
    application: &JobApplication,
) -> Result<RoomParticipants, MarketplaceError> {
    let applicant = load_applicant(tx, application)?;
    let job = load_job(tx, application.job_id)?;
    Ok(RoomParticipants {
        seeker: applicant.user_id,
        provider: job.provider_id,
    })
}

/// Delete a room's messages, then the room. Returns the number of messages removed.
pub(crate) fn purge_chat_room(
    tx: &mut dyn Transaction,
    room: ChatRoomId,
) -> Result<usize, MarketplaceError> {
    let removed = tx.delete_messages_in_room(room)?;
    if tx.find_chat_room(room)?.is_some() {
        tx.delete_chat_room(room)?;
    }
    debug!(chat_room_id = %room, messages = removed, "chat room purged");
    Ok(removed)
}

/// Delete an application together with its chat room and messages.
pub(crate) fn purge_application(
    tx: &mut dyn Transaction,
    application: &JobApplication,
) -> Result<Option<ChatRoomId>, MarketplaceError> {
    if let Some(room) = application.chat_room_id {
        purge_chat_room(tx, room)?;
    }
    tx.delete_application(application.id)?;
    Ok(application.chat_room_id)
}
