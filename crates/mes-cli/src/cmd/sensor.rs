use crate::context::Context;
use crate::output::{or_dash, print_json, print_table};
use chrono::Utc;
use clap::Subcommand;
use mes_core::sensor::{self, NewSensorReading};

#[derive(Subcommand)]
pub enum SensorSubcommand {
    /// List stored readings, newest first
    List,
    /// Store one reading for a registered machine, stamped now
    Record {
        /// Equipment id, e.g. EQ-001
        #[arg(long)]
        equipment: String,
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        vibration: Option<f64>,
        #[arg(long)]
        current: Option<f64>,
        #[arg(long)]
        rpm: Option<i64>,
        #[arg(long)]
        pressure: Option<f64>,
        /// Flag the reading as abnormal
        #[arg(long)]
        abnormal: bool,
    },
}

pub fn run(ctx: &Context, subcmd: SensorSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        SensorSubcommand::List => list(ctx, json),
        SensorSubcommand::Record {
            equipment,
            temperature,
            vibration,
            current,
            rpm,
            pressure,
            abnormal,
        } => {
            let new = NewSensorReading {
                equipment_id: equipment,
                temperature,
                vibration,
                current,
                rpm,
                pressure,
                status: Some(abnormal),
            };
            record(ctx, new, json)
        }
    }
}

fn list(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let conn = ctx.open_db()?.connect()?;
    let readings = sensor::list(&conn)?;

    if json {
        return print_json(&readings);
    }
    if readings.is_empty() {
        println!("No sensor readings.");
        return Ok(());
    }

    let rows = readings
        .iter()
        .map(|r| {
            vec![
                r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.equipment_id.clone(),
                or_dash(r.temperature),
                or_dash(r.vibration),
                or_dash(r.current),
                or_dash(r.rpm),
                or_dash(r.pressure),
                or_dash(r.status.map(|s| if s { "abnormal" } else { "normal" })),
            ]
        })
        .collect();
    print_table(
        &["TIME", "EQUIPMENT", "TEMP", "VIBRATION", "CURRENT", "RPM", "PRESSURE", "STATUS"],
        rows,
    );
    Ok(())
}

fn record(ctx: &Context, new: NewSensorReading, json: bool) -> anyhow::Result<()> {
    let conn = ctx.open_db()?.connect()?;
    let reading = sensor::insert(&conn, new, Utc::now())?;

    if json {
        return print_json(&reading);
    }
    println!(
        "Recorded reading {} for {}",
        reading.sensor_id, reading.equipment_id
    );
    Ok(())
}
