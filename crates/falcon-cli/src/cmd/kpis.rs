use crate::context::{block_on, Context};
use crate::output::{print_json, print_table};
use chrono::Utc;

pub fn run(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    let kpis = block_on(gw.fetch_kpis(Utc::now()))??;
    if json {
        return print_json(&kpis);
    }
    let rows = vec![
        vec!["Open".to_string(), kpis.total_open.to_string()],
        vec!["In review".to_string(), kpis.in_review.to_string()],
        vec!["Due this week".to_string(), kpis.due_this_week.to_string()],
        vec!["Overdue".to_string(), kpis.overdue.to_string()],
        vec!["New (7 days)".to_string(), kpis.new_this_7.to_string()],
    ];
    print_table(&["METRIC", "COUNT"], rows);
    Ok(())
}
