use crate::infra::seed_sample_directory;
use clap::Args;
use jobportal::config::ChatConfig;
use jobportal::error::AppError;
use jobportal::marketplace::{ChatHub, InMemoryMarketplace, Marketplace, TableCounts};
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print each response payload as JSON.
    #[arg(long)]
    pub(crate) json: bool,
    /// Stop after the chat portion and keep the accounts.
    #[arg(long)]
    pub(crate) skip_deletion: bool,
}

fn show<T: Serialize>(enabled: bool, label: &str, payload: &T) {
    if !enabled {
        return;
    }
    match serde_json::to_string_pretty(payload) {
        Ok(json) => println!("  {label}:\n{json}"),
        Err(err) => println!("  {label} unavailable: {err}"),
    }
}

fn show_counts(counts: TableCounts) {
    println!(
        "  rows: {} users | {} jobs | {} applications | {} chat rooms | {} messages",
        counts.users, counts.jobs, counts.applications, counts.chat_rooms, counts.chat_messages
    );
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        json,
        skip_deletion,
    } = args;

    let repository = Arc::new(InMemoryMarketplace::new());
    let directory = seed_sample_directory(&repository)?;
    let hub = Arc::new(ChatHub::new(ChatConfig::default().channel_capacity));
    let marketplace = Marketplace::new(repository.clone(), hub);
    let seeker = directory.seeker;
    let provider = directory.provider;

    println!("Job marketplace demo");
    show_counts(repository.counts()?);

    println!("\n1. Seeker applies");
    let applied = marketplace
        .lifecycle
        .apply(seeker, directory.job, "I can cover both weekend shifts")?;
    println!(
        "- application {} for '{}' -> {} (chat: none)",
        applied.application_id, applied.job_title, applied.status
    );
    show(json, "application", &applied);
    match marketplace
        .lifecycle
        .apply(seeker, directory.job, "applying again")
    {
        Err(err) => println!("- re-apply refused: {err}"),
        Ok(view) => println!("- unexpected second application {}", view.application_id),
    }

    println!("\n2. Provider accepts");
    let matched = marketplace
        .lifecycle
        .provider_accept(provider, applied.application_id)?;
    let Some(room) = matched.chat_id else {
        println!("- accept did not open a chat room");
        return Ok(());
    };
    println!("- status {} | chat room {room}", matched.status);
    let again = marketplace
        .lifecycle
        .provider_accept(provider, applied.application_id)?;
    println!(
        "- accepting again keeps status {} and room {:?}",
        again.status, again.chat_id
    );
    show_counts(repository.counts()?);

    println!("\n3. Provider rejects a fresh application");
    let second = marketplace.lifecycle.apply(
        directory.second_seeker,
        directory.job,
        "Available after college hours",
    )?;
    let rejected = marketplace
        .lifecycle
        .provider_reject(provider, second.application_id)?;
    println!(
        "- application {} -> {} | chat room {:?}",
        rejected.application_id, rejected.status, rejected.chat_id
    );

    println!("\nChat between the matched pair");
    let mut feed = marketplace.chat.subscribe(seeker, room)?;
    let sent = marketplace
        .chat
        .send(provider, room, "Welcome! Please come by Saturday at 8")?;
    match feed.try_recv() {
        Ok(pushed) => println!(
            "- seeker feed received message {}: {}",
            pushed.id, pushed.content
        ),
        Err(err) => println!("- seeker feed empty: {err}"),
    }
    show(json, "message", &sent);
    let unread = marketplace.chat.unread_count(seeker, room)?;
    println!("- seeker has {} unread", unread.unread);
    let flipped = marketplace.chat.mark_read(seeker, room)?;
    println!("- seeker marked {flipped} read");
    let partner = marketplace.chat.chat_partner(seeker, room)?;
    println!("- seeker is chatting with {}", partner.name);

    if skip_deletion {
        return Ok(());
    }

    println!("\n4. Both sides hide the match");
    let outcome = marketplace
        .lifecycle
        .hide_for_seeker(seeker, applied.application_id)?;
    show(json, "seeker hide", &outcome);
    let visible = marketplace
        .lifecycle
        .applications_for_job(provider, directory.job)?;
    println!(
        "- provider still sees {} application(s) on the job",
        visible.applicants.len()
    );
    let outcome = marketplace
        .lifecycle
        .hide_for_provider(provider, applied.application_id)?;
    show(json, "provider hide", &outcome);
    match marketplace.chat.history(seeker, room) {
        Err(err) => println!("- chat history now: {err}"),
        Ok(messages) => println!("- chat history still has {} message(s)", messages.len()),
    }
    show_counts(repository.counts()?);

    println!("\n5. Provider account deletion");
    let rematch = marketplace
        .lifecycle
        .apply(seeker, directory.job, "Back for the festival rush")?;
    marketplace
        .lifecycle
        .provider_accept(provider, rematch.application_id)?;
    match marketplace
        .deletion
        .delete_provider(directory.admin, provider.user_id)
    {
        Err(err) => println!("- deletion refused: {err}"),
        Ok(report) => println!("- deletion unexpectedly ran: {report:?}"),
    }
    marketplace
        .lifecycle
        .hide_for_provider(provider, rematch.application_id)?;
    let report = marketplace
        .deletion
        .delete_provider(directory.admin, provider.user_id)?;
    println!(
        "- deleted {} job(s), {} application(s), {} chat room(s), {} message(s)",
        report.jobs, report.applications, report.chat_rooms, report.chat_messages
    );
    show(json, "deletion report", &report);
    show_counts(repository.counts()?);

    Ok(())
}
