use crate::context::{block_on, Context};
use crate::output::{print_json, print_table, short_id};

pub fn run(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    let rows = block_on(gw.fetch_workload())??;
    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No open orders.");
        return Ok(());
    }
    let table = rows
        .iter()
        .map(|r| {
            let who = match (r.assigned_to, r.assignee_name.as_deref()) {
                (_, Some(name)) if !name.is_empty() => name.to_string(),
                (Some(id), _) => short_id(id),
                (None, _) => "Unassigned".to_string(),
            };
            vec![who, r.open_count.to_string()]
        })
        .collect();
    print_table(&["ASSIGNEE", "OPEN"], table);
    Ok(())
}
