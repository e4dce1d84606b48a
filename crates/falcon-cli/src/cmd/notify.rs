use crate::cmd::activity::ACTIVITY_TABLE;
use crate::context::{block_on, Context};
use crate::output::print_json_line;
use anyhow::Context as _;
use falcon_client::{ChangeFeed, ChangeFilter, ChangeKind};
use falcon_core::activity::ActivityEvent;
use falcon_core::notify::{should_notify, Toast};
use futures::StreamExt;

/// Follow new activity across the organisation and print one toast per
/// entry. Runs until the feed ends or the process is interrupted.
pub fn run(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    block_on(async {
        let prefs = gw.user_prefs().await.context("failed to load preferences")?;
        let me = gw.current_user_id().await.ok();

        let filter = ChangeFilter::table(gw.config().schema.clone(), ACTIVITY_TABLE)
            .events(&[ChangeKind::Insert]);
        let mut sub = gw.change_feed()?.subscribe(filter);
        tracing::info!(muted = prefs.mute_my_toasts, "listening for activity");

        while let Some(change) = sub.next().await {
            let change = change?;
            let event: ActivityEvent = match serde_json::from_value(change.record) {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable activity row");
                    continue;
                }
            };
            if !should_notify(&event, me, &prefs) {
                tracing::debug!(id = %event.id, "muted own change");
                continue;
            }
            let toast = Toast::from_event(&event);
            if json {
                print_json_line(&toast)?;
            } else {
                match &toast.body {
                    Some(body) => println!("[{}] {}: {}", short(&toast), toast.title, body),
                    None => println!("[{}] {}", short(&toast), toast.title),
                }
            }
        }
        tracing::info!("activity feed closed");
        Ok::<(), anyhow::Error>(())
    })?
}

fn short(toast: &Toast) -> String {
    crate::output::short_id(toast.order_id)
}
