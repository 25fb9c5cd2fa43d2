use crate::context::Context;
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context as _;
use chrono::Utc;
use clap::Subcommand;
use mes_core::db::parse_id;
use mes_core::progress::{self, AdvanceRequest};
use mes_core::time::parse_due_date;
use mes_core::types::OperationSeq;
use mes_core::work_order::{self, NewOrder};
use mes_core::work_result;

#[derive(Subcommand)]
pub enum OrderSubcommand {
    /// List work orders, earliest due first
    List,
    /// Create a work order (predictions are attached when models load)
    Create {
        /// Product id, e.g. P001
        #[arg(long)]
        product: String,
        /// Planned quantity
        #[arg(long)]
        qty: i64,
        /// Due date, YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS]
        #[arg(long)]
        due: String,
    },
    /// Show one order and its step log
    Show { order_id: String },
    /// Record a production step (1-5) for an order
    Advance {
        order_id: String,
        operation_seq: String,
        /// Equipment that performed the step
        #[arg(long)]
        equipment: Option<String>,
    },
}

pub fn run(ctx: &Context, subcmd: OrderSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        OrderSubcommand::List => list(ctx, json),
        OrderSubcommand::Create { product, qty, due } => create(ctx, product, qty, &due, json),
        OrderSubcommand::Show { order_id } => show(ctx, &order_id, json),
        OrderSubcommand::Advance {
            order_id,
            operation_seq,
            equipment,
        } => advance(ctx, &order_id, &operation_seq, equipment, json),
    }
}

fn list(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let conn = ctx.open_db()?.connect()?;
    let orders = work_order::list(&conn)?;

    if json {
        return print_json(&orders);
    }
    if orders.is_empty() {
        println!("No work orders.");
        return Ok(());
    }

    let rows = orders
        .iter()
        .map(|v| {
            let o = &v.order;
            vec![
                o.order_id.to_string(),
                o.product_id.clone(),
                o.planned_qty.to_string(),
                o.due_date.format("%Y-%m-%d %H:%M").to_string(),
                o.status.to_string(),
                or_dash(o.pred_delivery.map(|d| if d { "on-time" } else { "late" })),
                or_dash(o.pred_defect_rate),
            ]
        })
        .collect();
    print_table(
        &["ORDER", "PRODUCT", "QTY", "DUE", "STATUS", "DELIVERY", "DEFECT"],
        rows,
    );
    Ok(())
}

fn create(ctx: &Context, product: String, qty: i64, due: &str, json: bool) -> anyhow::Result<()> {
    let new = NewOrder {
        product_id: product,
        planned_qty: qty,
        due_date: parse_due_date(due)?,
    };
    let models = ctx.load_models();
    let conn = ctx.open_db()?.connect()?;
    let order = work_order::create(&conn, new, &models, Utc::now())
        .context("failed to create work order")?;

    if json {
        return print_json(&order);
    }
    println!("Created order {}", order.order_id);
    println!("  product:  {} x {}", order.product_id, order.planned_qty);
    println!("  due:      {}", order.due_date);
    match (order.pred_delivery, order.pred_defect_rate) {
        (Some(on_time), Some(rate)) => {
            println!("  delivery: {}", if on_time { "on-time" } else { "late" });
            println!("  defect:   {rate}");
        }
        _ => println!("  prediction unavailable"),
    }
    Ok(())
}

fn show(ctx: &Context, order_id: &str, json: bool) -> anyhow::Result<()> {
    let id = parse_id(order_id)?;
    let conn = ctx.open_db()?.connect()?;
    let view = work_order::get_detail(&conn, id)?;
    let results = work_result::list_for_order(&conn, id)?;

    if json {
        return print_json(&serde_json::json!({
            "order": view,
            "results": results,
        }));
    }

    let o = &view.order;
    println!("Order {}", o.order_id);
    println!(
        "  product:  {} ({})",
        o.product_id,
        view.product_name.as_deref().unwrap_or("unknown")
    );
    println!("  qty:      {}", o.planned_qty);
    println!("  due:      {}", o.due_date);
    println!("  status:   {}", o.status);
    println!("  started:  {}", or_dash(o.start_ts));
    println!("  finished: {}", or_dash(o.end_ts));

    if !results.is_empty() {
        println!();
        let rows = results
            .iter()
            .map(|r| {
                vec![
                    r.operation_seq.to_string(),
                    r.operation_seq.status().to_string(),
                    or_dash(r.equipment_id.as_deref()),
                    r.start_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                ]
            })
            .collect();
        print_table(&["STEP", "STATUS", "EQUIPMENT", "AT"], rows);
    }
    Ok(())
}

fn advance(
    ctx: &Context,
    order_id: &str,
    seq: &str,
    equipment: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let id = parse_id(order_id)?;
    let seq: OperationSeq = seq.parse()?;
    let mut conn = ctx.open_db()?.connect()?;
    let outcome = progress::advance(
        &mut conn,
        AdvanceRequest::new(id, seq, equipment),
        ctx.config.progress,
        Utc::now(),
    )?;

    if json {
        return print_json(&outcome);
    }
    match (&outcome.order, outcome.transition) {
        (Some(order), Some(kind)) => {
            println!("Order {} -> {} ({})", order.order_id, order.status, kind.as_str())
        }
        _ => println!("Recorded step {seq} for unknown order {id}"),
    }
    Ok(())
}
