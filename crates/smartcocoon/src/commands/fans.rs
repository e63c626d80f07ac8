//! Fan command handlers.

use serde::Serialize;
use tabled::Tabled;

use smartcocoon_api::{Fan, FanAttribute, FanKey, FanMode, System};

use crate::cli::{FanOnArgs, FanSetArgs, FansArgs, FansCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util::{Session, find_fan};

// ── Views ───────────────────────────────────────────────────────────

#[derive(Tabled)]
struct FanRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Fan ID")]
    fan_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Speed")]
    speed: String,
    #[tabled(rename = "On")]
    on: String,
    #[tabled(rename = "Connected")]
    connected: String,
}

/// Serializable snapshot of a fan for JSON output.
#[derive(Debug, Serialize)]
struct FanView {
    id: Option<i64>,
    fan_id: Option<String>,
    name: String,
    system_id: Option<i64>,
    system: String,
    room_id: Option<i64>,
    room: Option<String>,
    model: &'static str,
    firmware_version: Option<String>,
    mode: Option<String>,
    power_pct: Option<i64>,
    speed_level_pct: &'static str,
    fan_on: Option<bool>,
    connected: Option<bool>,
    last_connection: Option<String>,
    predicted_room_temperature: Option<f64>,
    is_room_estimating: Option<bool>,
    is_room_schedule_running: Option<bool>,
}

impl From<&Fan<'_>> for FanView {
    fn from(f: &Fan<'_>) -> Self {
        Self {
            id: f.id(),
            fan_id: f.fan_id().map(str::to_owned),
            name: f.name(),
            system_id: f.system().id(),
            system: f.system().name_location(),
            room_id: f.room().id(),
            room: f.room().name().map(str::to_owned),
            model: f.model_name(),
            firmware_version: f.firmware_version().map(str::to_owned),
            mode: f.mode().map(str::to_owned),
            power_pct: f.power_pct(),
            speed_level_pct: f.speed_level_pct(),
            fan_on: f.fan_on(),
            connected: f.connected(),
            last_connection: f.last_connection().map(str::to_owned),
            predicted_room_temperature: f.predicted_room_temperature(),
            is_room_estimating: f.is_room_estimating(),
            is_room_schedule_running: f.is_room_schedule_running(),
        }
    }
}

impl From<&FanView> for FanRow {
    fn from(v: &FanView) -> Self {
        Self {
            id: output::opt(v.id),
            fan_id: output::opt(v.fan_id.as_deref()),
            name: v.name.clone(),
            room: output::opt(v.room.as_deref()),
            mode: output::opt(v.mode.as_deref()),
            power: output::opt(v.power_pct.map(|p| format!("{p}%"))),
            speed: v.speed_level_pct.into(),
            on: output::opt(v.fan_on),
            connected: output::opt(v.connected),
        }
    }
}

fn detail(v: &FanView) -> String {
    output::detail_lines(&[
        ("ID", output::opt(v.id)),
        ("Fan ID", output::opt(v.fan_id.as_deref())),
        ("Name", v.name.clone()),
        ("System", v.system.clone()),
        ("Room", output::opt(v.room.as_deref())),
        ("Model", v.model.into()),
        ("Firmware", output::opt(v.firmware_version.as_deref())),
        ("Mode", output::opt(v.mode.as_deref())),
        ("Power", output::opt(v.power_pct.map(|p| format!("{p}%")))),
        ("Speed", v.speed_level_pct.into()),
        ("On", output::opt(v.fan_on)),
        ("Connected", output::opt(v.connected)),
        ("Last connection", output::opt(v.last_connection.as_deref())),
        (
            "Predicted temp",
            output::opt(v.predicted_room_temperature.map(|t| format!("{t:.1}"))),
        ),
        ("Estimating", output::opt(v.is_room_estimating)),
        ("Schedule running", output::opt(v.is_room_schedule_running)),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: FansArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut session = Session::open(global).await?;
    let result = run(&session, args, global).await;
    session.finish(result).await
}

async fn run(session: &Session, args: FansArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let systems = session.systems().await?;

    match args.command {
        FansCommand::List(list) => {
            let selection = session.profile.selection();
            let views: Vec<FanView> = systems
                .iter()
                .flat_map(System::fans)
                .filter(|fan| {
                    list.all
                        || selection.fans.is_empty()
                        || FanKey::of(fan).is_some_and(|key| selection.contains(&key))
                })
                .map(|fan| FanView::from(&fan))
                .collect();
            let out = output::render_list(
                global.output,
                &views,
                |v| FanRow::from(v),
                |v| output::opt(v.id),
            );
            output::print_output(&out, global.quiet);
        }

        FansCommand::Show(target) => {
            let fan = find_fan(&systems, &target.fan)?;
            let view = FanView::from(&fan);
            let out = output::render_single(global.output, &view, detail, |v| output::opt(v.id));
            output::print_output(&out, global.quiet);
        }

        FansCommand::Set(set) => apply_settings(&systems, &set, global).await?,

        FansCommand::On(on) => turn_on(&systems, &on, global).await?,

        FansCommand::Off(target) => {
            let fan = find_fan(&systems, &target.fan)?;
            fan.turn_off().await?;
            report(global, &fan, "off");
        }

        FansCommand::Auto(target) => {
            let fan = find_fan(&systems, &target.fan)?;
            fan.set_auto().await?;
            report(global, &fan, "auto");
        }

        FansCommand::Eco(target) => {
            let fan = find_fan(&systems, &target.fan)?;
            fan.set_eco().await?;
            report(global, &fan, "eco");
        }
    }

    Ok(())
}

fn report(global: &GlobalOpts, fan: &Fan<'_>, what: &str) {
    if !global.quiet {
        eprintln!("✓ {}: {what}", fan.fan_id_location());
    }
}

/// Write each given setting through the capability table.
async fn apply_settings(
    systems: &[System],
    set: &FanSetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let settings = [
        (FanAttribute::Mode, set.mode.as_deref()),
        (FanAttribute::PowerPct, set.power.as_deref()),
        (FanAttribute::SpeedLevelPct, set.speed.as_deref()),
    ];
    if settings.iter().all(|(_, value)| value.is_none()) {
        return Err(CliError::Validation {
            field: "settings".into(),
            reason: "give at least one of --mode, --power, --speed".into(),
        });
    }

    let fan = find_fan(systems, &set.target.fan)?;
    for (attribute, value) in settings {
        let Some(value) = value else { continue };
        if attribute.set(&fan, value).await?.is_none() {
            let expected = attribute
                .options()
                .map_or_else(|| "a number from 0 to 100".to_owned(), |o| o.join(", "));
            return Err(CliError::Validation {
                field: attribute.key().into(),
                reason: format!("'{value}' is not valid, expected {expected}"),
            });
        }
        report(global, &fan, &format!("{} = {value}", attribute.key()));
    }
    Ok(())
}

async fn turn_on(systems: &[System], on: &FanOnArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mode = on
        .mode
        .as_deref()
        .map(str::parse::<FanMode>)
        .transpose()
        .map_err(|_| CliError::Validation {
            field: "mode".into(),
            reason: format!("expected one of {}", FanMode::options().join(", ")),
        })?;
    let fan = find_fan(systems, &on.target.fan)?;
    fan.turn_on(mode, on.power).await?;
    report(global, &fan, "on");
    Ok(())
}
