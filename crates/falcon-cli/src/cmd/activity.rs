use crate::context::{block_on, Context};
use crate::output::{local_time, or_dash, print_json, print_json_line, print_table};
use falcon_client::{ChangeFeed, ChangeFilter, ChangeKind};
use falcon_core::activity::ActivityEvent;
use falcon_core::notify::Toast;
use futures::StreamExt;
use uuid::Uuid;

/// Table of `order_activity` rows the live tail listens to.
pub const ACTIVITY_TABLE: &str = "order_activity";

pub fn run(ctx: &Context, order: Uuid, watch: bool, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    block_on(async {
        let events = gw.fetch_activity(order).await?;
        if json && !watch {
            return print_json(&events);
        }
        if events.is_empty() && !watch {
            println!("No activity yet.");
            return Ok(());
        }
        if json {
            for e in &events {
                print_json_line(e)?;
            }
        } else {
            let rows = events.iter().map(row).collect();
            print_table(&["WHEN", "EVENT", "DETAIL", "BY"], rows);
        }
        if !watch {
            return Ok(());
        }

        let filter = ChangeFilter::table(gw.config().schema.clone(), ACTIVITY_TABLE)
            .events(&[ChangeKind::Insert])
            .eq("order_id", order);
        let mut sub = gw.change_feed()?.subscribe(filter);
        tracing::info!(%order, "following activity");
        while let Some(change) = sub.next().await {
            let change = change?;
            let event = match serde_json::from_value::<ActivityEvent>(change.record) {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable activity row");
                    continue;
                }
            };
            if json {
                print_json_line(&event)?;
            } else {
                println!("{}", row(&event).join("  "));
            }
        }
        Ok::<(), anyhow::Error>(())
    })?
}

fn row(event: &ActivityEvent) -> Vec<String> {
    let toast = Toast::from_event(event);
    vec![
        local_time(event.occurred_at),
        toast.title,
        or_dash(toast.body.as_deref()),
        or_dash(event.actor.as_deref()),
    ]
}
