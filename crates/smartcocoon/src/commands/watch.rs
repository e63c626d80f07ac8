//! `watch`: run the polling coordinator and print fan entities on every
//! refresh.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use smartcocoon_api::{AttributeValue, FanKey, System};
use smartcocoon_config::profile_to_coordinator_config;
use smartcocoon_core::{Coordinator, Entity, Platform, Selection, Snapshot, register};

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;

use super::util::Session;

/// Everything on the account when the profile selects nothing.
fn selection_for(session: &Session, systems: &[System]) -> Selection {
    let selection = session.profile.selection();
    if !selection.fans.is_empty() {
        return selection;
    }
    let keys: Vec<FanKey> = systems
        .iter()
        .flat_map(System::fans)
        .filter_map(|f| FanKey::of(&f))
        .collect();
    Selection {
        systems: keys.iter().map(|k| k.system_id).collect(),
        fans: keys.iter().map(|k| k.fan_id).collect(),
    }
}

fn render_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Text(s) => s.clone(),
        AttributeValue::Number(n) => n.to_string(),
        AttributeValue::Flag(b) => String::from(if *b { "on" } else { "off" }),
        AttributeValue::Absent => "-".into(),
    }
}

fn print_snapshot(entities: &[Entity], snapshot: &Snapshot) {
    let stamp = snapshot
        .updated_at
        .map_or_else(|| "never".into(), |t| t.to_rfc3339());
    let status = if snapshot.last_update_success { "ok" } else { "stale" };
    println!("── {stamp} ({status})");
    if let Some(ref error) = snapshot.last_error {
        println!("   {error}");
    }

    for entity in entities {
        let name = entity.name(snapshot).unwrap_or_else(|| "?".into());
        let availability = if entity.is_available(snapshot) { "" } else { " [unavailable]" };
        let state = render_value(&entity.state(snapshot));
        match entity.platform() {
            Platform::Fan => {
                let pct = entity
                    .percentage(snapshot)
                    .map_or_else(|| "-".into(), |p| format!("{p}%"));
                let preset = entity.preset_mode(snapshot).unwrap_or_else(|| "-".into());
                println!("   {name}: {state} {pct} {preset}{availability}");
            }
            Platform::Select | Platform::BinarySensor => {
                println!("   {name}: {state}{availability}");
            }
        }
    }
}

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut session = Session::open(global).await?;
    let result = run(&mut session, &args).await;
    session.finish(result).await
}

async fn run(session: &mut Session, args: &WatchArgs) -> Result<(), CliError> {
    let systems = session.systems().await?;
    let selection = selection_for(session, &systems);
    let entities = register(&systems, &selection)?;

    let config = profile_to_coordinator_config(&session.profile, &session.config.defaults)?;
    let coordinator = Coordinator::new(session.client.clone(), config);
    if let Err(e) = coordinator.refresh().await {
        warn!(error = %e, "initial refresh failed");
    }
    session.persist_tokens().await?;

    let mut rx = coordinator.subscribe();
    let cancel = CancellationToken::new();
    let handle = coordinator.spawn(cancel.clone());

    let mut printed = 0usize;
    print_snapshot(&entities, &rx.borrow_and_update());
    printed += 1;

    while args.count.is_none_or(|limit| printed < limit) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                print_snapshot(&entities, &snapshot);
                printed += 1;
            }
        }
    }

    cancel.cancel();
    if let Err(e) = handle.await {
        warn!(error = %e, "refresh task ended abnormally");
    }
    Ok(())
}
