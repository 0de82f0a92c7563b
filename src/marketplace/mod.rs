//! Part-time job marketplace core.
//!
//! * [`lifecycle`] moves a seeker's application through the mutual-acceptance state machine and
//!   opens a chat room on match.
//! * [`chat`] stores and fans out messages for matched pairs.
//! * [`deletion`] refuses to delete accounts with live matches and otherwise cascades in
//!   dependency order.
//! * [`jobs`] and [`directory`] create the postings and accounts the other services act on.
//!
//! All of them share one [`repository::MarketplaceRepository`]; [`memory`] is the in-process
//! implementation used by the service and the tests.

pub mod chat;
pub mod deletion;
pub mod directory;
pub mod domain;
pub mod error;
pub mod jobs;
pub mod lifecycle;
pub mod memory;
pub mod repository;
pub mod router;
pub mod views;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use chat::{channel_name, ChatChannelManager, ChatHub, ChatPublisher, PublishError};
pub use deletion::{AccountDeletionGuard, DeletionReport};
pub use directory::{AccountDirectory, Registration};
pub use domain::{
    Applicant, ApplicantId, ApplicationId, ApplicationStatus, Caller, ChatMessage, ChatRoom,
    ChatRoomId, Job, JobApplication, JobId, MessageId, Role, Side, User, UserId,
};
pub use error::{ErrorKind, MarketplaceError};
pub use jobs::{JobBoard, JobDraft, JobFilter};
pub use lifecycle::ApplicationLifecycle;
pub use memory::{InMemoryMarketplace, TableCounts};
pub use repository::{MarketplaceRepository, RepositoryError, Transaction};
pub use router::marketplace_router;
pub use views::{
    AccountView, AdminApplicationRecord, AppliedJobView, ApplicationView, ChatPartnerView,
    HideOutcome, JobView, MessageView, ProviderApplicantView, ProviderJobView, ProviderSummary,
    SeekerSummary, SentMessage, UnreadCountView,
};

/// The marketplace services wired to one store and one publisher.
pub struct Marketplace<R, P> {
    pub lifecycle: ApplicationLifecycle<R, P>,
    pub chat: ChatChannelManager<R, P>,
    pub deletion: AccountDeletionGuard<R, P>,
    pub jobs: JobBoard<R>,
    pub directory: AccountDirectory<R>,
}

impl<R, P> Marketplace<R, P>
where
    R: MarketplaceRepository + 'static,
    P: ChatPublisher + 'static,
{
    pub fn new(repository: Arc<R>, publisher: Arc<P>) -> Self {
        Self {
            lifecycle: ApplicationLifecycle::new(repository.clone(), publisher.clone()),
            chat: ChatChannelManager::new(repository.clone(), publisher.clone()),
            deletion: AccountDeletionGuard::new(repository.clone(), publisher),
            jobs: JobBoard::new(repository.clone()),
            directory: AccountDirectory::new(repository),
        }
    }
}
