use crate::context::Context;
use crate::output::print_json;
use anyhow::Context as _;
use chrono::{DateTime, Utc};
use mes_core::predict::PredictionInput;
use mes_core::time::parse_due_date;

/// Run the predictor once without touching the database.
pub fn run(
    ctx: &Context,
    product: &str,
    qty: i64,
    due: &str,
    now: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let now = match now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --now '{raw}': expected RFC 3339"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let input = PredictionInput {
        product_id: product,
        planned_qty: qty,
        due_date: parse_due_date(due)?,
    };

    let models = ctx.load_models();
    let predictor = models.require()?;
    let prediction = predictor.predict(&input, now)?;

    if json {
        return print_json(&prediction);
    }
    let f = &prediction.features;
    println!(
        "delivery: {} (score {:.3})",
        if prediction.pred_delivery { "on-time" } else { "late" },
        prediction.delivery_score
    );
    println!("defect:   {}", prediction.pred_defect_rate);
    println!(
        "features: product={} qty={} month={} day_of_week={} days_to_due={}",
        f.product_encoded, f.planned_qty, f.month, f.day_of_week, f.days_to_due
    );
    Ok(())
}
