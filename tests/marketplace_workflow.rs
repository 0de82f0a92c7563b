//! End-to-end scenarios for the job marketplace driven through the public service facade and
//! HTTP router: apply, match, chat, hide, and account deletion.

mod common {
    use std::sync::Arc;

    use chrono::Utc;

    use jobportal::marketplace::{
        Applicant, ApplicantId, Caller, ChatHub, InMemoryMarketplace, Job, JobId, Marketplace,
        MarketplaceRepository, RepositoryError, Role, User, UserId,
    };

    pub(super) type Service = Marketplace<InMemoryMarketplace, ChatHub>;

    #[derive(Debug, Clone, Copy)]
    pub(super) struct Cast {
        pub(super) seeker: Caller,
        pub(super) provider: Caller,
        pub(super) admin: Caller,
        pub(super) job: JobId,
    }

    fn user(full_name: &str, email: &str, role: Role) -> User {
        User {
            id: UserId(0),
            full_name: full_name.to_string(),
            email: email.to_string(),
            phone: None,
            role,
            enabled: true,
        }
    }

    pub(super) fn build_service() -> (Service, Arc<InMemoryMarketplace>, Cast) {
        let repository = Arc::new(InMemoryMarketplace::new());
        let cast = repository
            .atomically(|tx| -> Result<_, RepositoryError> {
                let seeker = tx.save_user(user("Divya N", "divya@example.com", Role::Seeker))?;
                tx.save_applicant(Applicant {
                    id: ApplicantId(0),
                    user_id: seeker.id,
                    age: Some(22),
                    gender: None,
                    skills: Some("cashier".to_string()),
                    experience: None,
                    city: Some("Hubballi".to_string()),
                    district: None,
                    state: Some("Karnataka".to_string()),
                    status: None,
                })?;
                let provider =
                    tx.save_user(user("Hubli Mart", "jobs@hublimart.example.com", Role::Provider))?;
                let admin = tx.save_user(user("Admin", "admin@example.com", Role::Admin))?;
                let job = tx.save_job(Job {
                    id: JobId(0),
                    title: "Evening cashier".to_string(),
                    job_type: "Part-time".to_string(),
                    timing: "18:00-22:00".to_string(),
                    salary: "300/day".to_string(),
                    description: "Billing and closing".to_string(),
                    address: None,
                    city: Some("Hubballi".to_string()),
                    district: None,
                    state: Some("Karnataka".to_string()),
                    latitude: None,
                    longitude: None,
                    provider_id: provider.id,
                    created_at: Utc::now(),
                })?;
                Ok(Cast {
                    seeker: Caller::new(seeker.id, Role::Seeker),
                    provider: Caller::new(provider.id, Role::Provider),
                    admin: Caller::new(admin.id, Role::Admin),
                    job: job.id,
                })
            })
            .expect("seed commits");

        let service = Marketplace::new(repository.clone(), Arc::new(ChatHub::new(16)));
        (service, repository, cast)
    }
}

mod lifecycle {
    use super::common::*;
    use std::sync::Arc;

    use jobportal::marketplace::{
        ApplicationStatus, Caller, ChatHub, ErrorKind, HideOutcome, InMemoryMarketplace, JobDraft,
        Marketplace, Registration, Role,
    };

    fn sign_up(service: &Service, name: &str, email: &str, role: Role) -> Caller {
        let account = service
            .directory
            .register(Registration {
                full_name: name.to_string(),
                email: email.to_string(),
                phone: None,
                role,
                age: Some(23),
                gender: None,
                skills: None,
                experience: None,
                city: Some("Belagavi".to_string()),
                district: None,
                state: None,
            })
            .expect("registration succeeds");
        Caller::new(account.user_id, role)
    }

    #[test]
    fn empty_store_supports_the_whole_flow() {
        let repository = Arc::new(InMemoryMarketplace::new());
        let service = Marketplace::new(repository.clone(), Arc::new(ChatHub::new(4)));
        let provider = sign_up(&service, "Belgaum Books", "books@example.com", Role::Provider);
        let seeker = sign_up(&service, "Rohan K", "rohan@example.com", Role::Seeker);

        let job = service
            .jobs
            .create_job(
                provider,
                JobDraft {
                    title: "Shelf organiser".to_string(),
                    job_type: "Part-time".to_string(),
                    timing: "16:00-19:00".to_string(),
                    salary: "200/day".to_string(),
                    description: String::new(),
                    address: None,
                    city: Some("Belagavi".to_string()),
                    district: None,
                    state: None,
                    latitude: None,
                    longitude: None,
                },
            )
            .expect("job posted");

        let applied = service
            .lifecycle
            .apply(seeker, job.id, "After college")
            .expect("apply succeeds");
        let matched = service
            .lifecycle
            .provider_accept(provider, applied.application_id)
            .expect("accept succeeds");
        assert_eq!(matched.status, ApplicationStatus::BothAccepted);
        assert_eq!(matched.provider_name.as_deref(), Some("Belgaum Books"));

        let counts = repository.counts().expect("counts");
        assert_eq!(counts.users, 2);
        assert_eq!(counts.applicants, 1);
        assert_eq!(counts.chat_rooms, 1);
    }

    #[test]
    fn match_chat_and_dual_hide_leave_no_rows_behind() {
        let (service, repository, cast) = build_service();

        let applied = service
            .lifecycle
            .apply(cast.seeker, cast.job, "Evenings suit me")
            .expect("apply succeeds");
        assert_eq!(applied.status, ApplicationStatus::SeekerAccepted);
        assert_eq!(
            service
                .lifecycle
                .apply(cast.seeker, cast.job, "again")
                .expect_err("duplicate")
                .kind(),
            ErrorKind::Duplicate
        );

        let matched = service
            .lifecycle
            .provider_accept(cast.provider, applied.application_id)
            .expect("accept succeeds");
        let room = matched.chat_id.expect("room opened");

        service
            .chat
            .send(cast.provider, room, "See you at six")
            .expect("send succeeds");
        service
            .chat
            .send(cast.seeker, room, "Thank you!")
            .expect("send succeeds");
        let history = service.chat.history(cast.seeker, room).expect("history");
        assert_eq!(history.len(), 2);

        service
            .lifecycle
            .hide_for_seeker(cast.seeker, applied.application_id)
            .expect("seeker hides");
        let outcome = service
            .lifecycle
            .hide_for_provider(cast.provider, applied.application_id)
            .expect("provider hides");
        assert!(matches!(outcome, HideOutcome::Removed { .. }));

        let counts = repository.counts().expect("counts");
        assert_eq!(counts.applications, 0);
        assert_eq!(counts.chat_rooms, 0);
        assert_eq!(counts.chat_messages, 0);
    }

    #[test]
    fn deletion_waits_for_the_match_to_be_hidden() {
        let (service, repository, cast) = build_service();
        let applied = service
            .lifecycle
            .apply(cast.seeker, cast.job, "")
            .expect("apply succeeds");
        service
            .lifecycle
            .provider_accept(cast.provider, applied.application_id)
            .expect("accept succeeds");

        let refused = service
            .deletion
            .delete_seeker(cast.admin, cast.seeker.user_id)
            .expect_err("active match");
        assert_eq!(refused.kind(), ErrorKind::Conflict);

        service
            .lifecycle
            .hide_for_seeker(cast.seeker, applied.application_id)
            .expect("seeker hides");
        let report = service
            .deletion
            .delete_seeker(cast.admin, cast.seeker.user_id)
            .expect("deletion succeeds");

        assert_eq!(report.accounts, 1);
        assert_eq!(report.chat_rooms, 1);
        let counts = repository.counts().expect("counts");
        assert_eq!(counts.applicants, 0);
        assert_eq!(counts.applications, 0);
        assert_eq!(counts.users, 2);
    }
}

mod routing {
    use super::common::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use jobportal::marketplace::marketplace_router;
    use jobportal::marketplace::router::{USER_ID_HEADER, USER_ROLE_HEADER};
    use jobportal::marketplace::Caller;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn authed(method: &str, uri: &str, caller: Caller) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, caller.user_id.to_string())
            .header(USER_ROLE_HEADER, caller.role.label())
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .expect("request builds")
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[tokio::test]
    async fn seeker_listing_reflects_the_match() {
        let (service, _, cast) = build_service();
        let router = marketplace_router(Arc::new(service));

        let response = router
            .clone()
            .oneshot(authed("POST", &format!("/api/jobs/{}/apply", cast.job), cast.seeker))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::CREATED);
        let application_id = json_body(response).await["application_id"]
            .as_u64()
            .expect("application id");

        let response = router
            .clone()
            .oneshot(authed(
                "PUT",
                &format!("/api/jobs/applications/{application_id}/accept"),
                cast.provider,
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(authed("GET", "/api/jobs/applied", cast.seeker))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let listing = json_body(response).await;
        assert_eq!(listing[0]["status"], "both_accepted");
        assert_eq!(listing[0]["provider_name"], "Hubli Mart");
        assert!(listing[0]["chat_id"].is_u64());
    }

    #[tokio::test]
    async fn admin_listing_is_forbidden_for_seekers() {
        let (service, _, cast) = build_service();
        let router = marketplace_router(Arc::new(service));

        let response = router
            .clone()
            .oneshot(authed("GET", "/api/admin/applications", cast.seeker))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router
            .oneshot(authed("GET", "/api/admin/applications", cast.admin))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
