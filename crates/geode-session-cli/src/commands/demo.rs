//! Demo command - run a session lifecycle against an in-process region.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use tokio::sync::mpsc::UnboundedReceiver;

use geode_session::{
    LocalRegion, LocalRegionConfig, PRINCIPAL_NAME_ATTRIBUTE, Region, RepositoryConfig,
    SerializerRegistry, SessionEvent, SessionEventKind, SessionRepository,
};

use super::Context;

/// Arguments for the demo command.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Max inactive interval for the demo session, in seconds
    #[arg(long, default_value_t = 1)]
    pub interval: i64,

    /// Write the final full session frame to this file
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Principal name stored on the session
    #[arg(long, default_value = "demo-user")]
    pub principal: String,
}

/// Run the demo command.
pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    if args.interval <= 0 {
        bail!("--interval must be at least 1 second so the session can expire");
    }

    let config = &ctx.loaded.config;
    let registry = Arc::new(SerializerRegistry::with_defaults());
    let region_config = LocalRegionConfig::from_session_config(config)
        .with_expiration_interval(Duration::from_millis(100));
    let region = Arc::new(LocalRegion::new(region_config, Arc::clone(&registry)));
    let repo_config =
        RepositoryConfig::from_session_config(config).with_max_inactive_interval_secs(args.interval);
    let repo = SessionRepository::new(Arc::clone(&region), registry, repo_config)?;
    let mut events = repo.notifier().subscribe_channel();
    let reaper = region.start_expiration_task();

    let mut session = repo.create_session();
    let id = session.id().to_string();
    step(ctx, &format!("create session {id}"));
    session.set_attribute(PRINCIPAL_NAME_ATTRIBUTE, args.principal.as_str());
    session.set_attribute("a", 1);
    repo.save(&mut session).await?;
    print_events(ctx, &mut events);

    step(ctx, "find, set cart=3, save delta");
    let mut found = repo
        .find_by_id(&id)
        .await?
        .context("session vanished after first save")?;
    found.set_attribute("cart", 3);
    repo.save(&mut found).await?;
    print_events(ctx, &mut events);

    step(ctx, "remove a, save delta");
    found.remove_attribute("a");
    repo.save(&mut found).await?;
    print_events(ctx, &mut events);

    if ctx.verbose {
        println!("    region '{}' holds {} entries", region.name(), region.len().await);
    }

    let reloaded = repo
        .find_by_id(&id)
        .await?
        .context("session vanished after delta save")?;
    let mut names: Vec<String> = reloaded.attribute_names().collect();
    names.sort();
    step(ctx, &format!("attributes now: {}", names.join(", ")));

    let by_principal = repo.find_by_principal_name(&args.principal).await?;
    step(
        ctx,
        &format!("sessions for principal '{}': {}", args.principal, by_principal.len()),
    );

    if let Some(ref path) = args.out {
        let frame = region
            .get(&id)
            .await?
            .context("session missing when writing frame")?;
        std::fs::write(path, &frame)
            .with_context(|| format!("writing frame to {}", path.display()))?;
        step(ctx, &format!("wrote {} bytes to {}", frame.len(), path.display()));
    }

    step(ctx, &format!("waiting up to {}s for expiration", args.interval + 2));
    let deadline = Duration::from_secs(args.interval.unsigned_abs() + 2);
    let expired = tokio::time::timeout(deadline, wait_for_expiry(ctx, &mut events, &id)).await;
    reaper.abort();

    match expired {
        Ok(true) => Ok(()),
        _ => bail!("session {id} did not expire within {}s", deadline.as_secs()),
    }
}

async fn wait_for_expiry(
    ctx: &Context,
    events: &mut UnboundedReceiver<SessionEvent>,
    id: &str,
) -> bool {
    while let Some(event) = events.recv().await {
        print_event(ctx, &event);
        if event.kind == SessionEventKind::Expired && event.session_id == id {
            return true;
        }
    }
    false
}

fn step(ctx: &Context, message: &str) {
    if !ctx.json_output {
        println!("==> {message}");
    }
}

fn print_events(ctx: &Context, events: &mut UnboundedReceiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        print_event(ctx, &event);
    }
}

fn print_event(ctx: &Context, event: &SessionEvent) {
    if ctx.json_output {
        let attributes = event
            .session
            .as_ref()
            .map(|s| s.attribute_names().collect::<Vec<_>>())
            .unwrap_or_default();
        println!(
            "{}",
            serde_json::json!({
                "event": event.kind.to_string(),
                "session_id": event.session_id,
                "timestamp": event.timestamp.to_rfc3339(),
                "attributes": attributes,
            })
        );
    } else {
        println!(
            "    {:<8} {}  {}",
            event.kind.to_string(),
            event.session_id,
            event.timestamp.format("%H:%M:%S%.3f")
        );
    }
}
