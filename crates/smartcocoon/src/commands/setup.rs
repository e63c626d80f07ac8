//! `setup`: interactive profile wizard and `login`.
//!
//! Logs in, runs a first update, lets the user pick systems, fans and
//! polling options, then saves the profile together with the session
//! tokens.

use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use secrecy::SecretString;
use tracing::warn;

use smartcocoon_api::{SmartCocoonClient, System, UpdateOutcome};
use smartcocoon_config::{
    OptionBounds, Profile, SCAN_INTERVAL, TIMEOUT, config_path, load_config,
    profile_to_client_config, save_config, store_password,
};
use smartcocoon_core::{CoreError, DeviceEntry, DeviceIdentifier, orphaned_devices};

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::util::{Session, check_login, load_profile};

// ── Prompts ─────────────────────────────────────────────────────────

/// Pick from `items`, everything preselected. Returns the chosen indices.
fn pick_all(prompt: &str, items: &[String]) -> Result<Vec<usize>, CliError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let defaults = vec![true; items.len()];
    Ok(MultiSelect::new()
        .with_prompt(prompt)
        .items(items)
        .defaults(&defaults)
        .interact()?)
}

fn pick_seconds(prompt: &str, bounds: &OptionBounds, current: Option<u64>) -> Result<u64, CliError> {
    let choices = bounds.choices();
    let wanted = current.unwrap_or(bounds.default);
    let default = choices.iter().position(|&c| c == wanted).unwrap_or(0);
    let labels: Vec<String> = choices.iter().map(|c| format!("{c}s")).collect();
    let index = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(default)
        .interact()?;
    Ok(choices.get(index).copied().unwrap_or(bounds.default))
}

/// Device entries for a profile's selection, for orphan reporting.
fn devices_of(profile: &Profile) -> Vec<DeviceEntry> {
    let systems = profile.systems.iter().map(|&id| ("system", id));
    let fans = profile.fans.iter().map(|&id| ("fan", id));
    systems
        .chain(fans)
        .map(|(kind, id)| DeviceEntry {
            name: format!("{kind} {id}"),
            identifiers: vec![DeviceIdentifier::new(id)],
        })
        .collect()
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_setup(global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = load_config()?;
    let profile_name = config.active_profile_name(global.profile.as_deref());
    let previous = config.profiles.get(&profile_name).cloned();

    eprintln!("SmartCocoon setup");
    eprintln!("   Config path: {}", config_path().display());
    eprintln!("   Profile: {profile_name}\n");

    // 1. Credentials
    let mut email_prompt = Input::<String>::new().with_prompt("Email");
    if let Some(ref p) = previous {
        email_prompt = email_prompt.with_initial_text(p.email.clone());
    }
    let email = email_prompt.interact_text()?;
    let password = SecretString::from(Password::new().with_prompt("Password").interact()?);

    let mut profile = previous.clone().unwrap_or_default();
    profile.email.clone_from(&email);
    profile.clear_tokens();

    // 2. Login
    let client = SmartCocoonClient::new(profile_to_client_config(&profile, &config.defaults)?)?;
    check_login(client.login(&email, &password).await?, &email)?;
    eprintln!("   ✓ Logged in");

    // 3. First update; a rejection is reported and setup continues
    let systems = match client.update(None).await? {
        UpdateOutcome::Refreshed(systems) => systems,
        UpdateOutcome::Failed { error, previous } => {
            eprintln!("   ! update_failed: {}", CoreError::update_failed(&error));
            previous
        }
    };

    // 4. Systems
    let names: Vec<String> = systems.iter().map(System::name_location).collect();
    let chosen: Vec<&System> = pick_all("Systems", &names)?
        .into_iter()
        .filter_map(|i| systems.get(i))
        .collect();
    profile.systems = chosen.iter().filter_map(|s| s.id()).collect();

    // 5. Fans, per chosen system
    profile.fans.clear();
    for system in &chosen {
        let fans = system.fans();
        let labels: Vec<String> = fans.iter().map(|f| f.fan_id_location()).collect();
        let prompt = format!("Fans in {}", system.name_location());
        for i in pick_all(&prompt, &labels)? {
            if let Some(id) = fans.get(i).and_then(|f| f.id()) {
                profile.fans.push(id);
            }
        }
    }

    // 6. Advanced options
    profile.scan_interval = Some(pick_seconds(
        "Scan interval",
        &SCAN_INTERVAL,
        profile.scan_interval,
    )?);
    profile.timeout = Some(pick_seconds("Update timeout", &TIMEOUT, profile.timeout)?);
    profile.save_responses = Some(
        Confirm::new()
            .with_prompt("Save API responses to disk?")
            .default(profile.save_responses.unwrap_or(false))
            .interact()?,
    );

    // 7. Password storage
    let keep_password = Confirm::new()
        .with_prompt("Store password in system keyring?")
        .default(true)
        .interact()?;
    if keep_password {
        match store_password(&profile_name, &password) {
            Ok(()) => eprintln!("   ✓ Password stored in system keyring"),
            Err(e) => warn!(error = %e, "could not store password in keyring"),
        }
    }

    if let Some(tokens) = client.tokens().await {
        profile.set_tokens(&tokens);
    }

    // 8. Report devices dropped from the selection
    if let Some(ref old) = previous {
        let entries = devices_of(old);
        for orphan in orphaned_devices(&entries, &profile.selection()) {
            eprintln!("   - no longer tracked: {}", orphan.name);
        }
    }

    config.profiles.insert(profile_name.clone(), profile);
    if config.default_profile.is_none() {
        config.default_profile = Some(profile_name.clone());
    }
    let path = save_config(&config)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: smartcocoon fans list");
    Ok(())
}

pub async fn handle_login(global: &GlobalOpts) -> Result<(), CliError> {
    let (config, profile_name, mut profile) = load_profile(global)?;
    profile.clear_tokens();
    let client = SmartCocoonClient::new(profile_to_client_config(&profile, &config.defaults)?)?;
    let mut session = Session {
        config,
        profile_name,
        profile,
        client,
    };
    session.login().await?;
    session.persist_tokens().await?;
    if !global.quiet {
        eprintln!("✓ Logged in as {}", session.profile.email);
    }
    Ok(())
}
