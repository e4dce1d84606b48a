use crate::context::{block_on, Context};
use crate::output::{local_time, or_dash, print_json, short_id};
use anyhow::Context as _;
use clap::Subcommand;
use falcon_client::{BoardBackend, BoardSession, ChangeFeed, RestGateway};
use falcon_core::board::MoveRequest;
use falcon_core::types::OrderStatus;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum BoardSubcommand {
    /// Print the board
    Show {
        /// Include the cancelled column
        #[arg(long)]
        show_cancelled: bool,
        /// Split each column by assignee
        #[arg(long)]
        by_assignee: bool,
    },
    /// Move a card to another column and/or assignee
    Move {
        id: Uuid,
        /// Target status
        #[arg(long)]
        to: Option<OrderStatus>,
        /// Target assignee
        #[arg(long)]
        assignee: Option<Uuid>,
    },
    /// Print the board again on every change
    Watch {
        #[arg(long)]
        show_cancelled: bool,
        #[arg(long)]
        by_assignee: bool,
    },
}

pub fn run(ctx: &Context, subcmd: BoardSubcommand, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    match subcmd {
        BoardSubcommand::Show {
            show_cancelled,
            by_assignee,
        } => block_on(async {
            let session = open(&gw, show_cancelled).await?;
            print_board(&session, by_assignee, json)
        })?,
        BoardSubcommand::Move { id, to, assignee } => block_on(move_card(&gw, id, to, assignee, json))?,
        BoardSubcommand::Watch {
            show_cancelled,
            by_assignee,
        } => block_on(async {
            let mut session = open(&gw, show_cancelled).await?;
            print_board(&session, by_assignee, json)?;
            let filter = session.change_filter(&gw.config().schema);
            let mut sub = gw.change_feed()?.subscribe(filter);
            while session.watch(&mut sub).await? {
                if let Some(e) = session.state().error() {
                    eprintln!("reload failed: {e}");
                    continue;
                }
                print_board(&session, by_assignee, json)?;
            }
            Ok::<(), anyhow::Error>(())
        })?,
    }
}

async fn open(
    gw: &Arc<RestGateway>,
    show_cancelled: bool,
) -> anyhow::Result<BoardSession<Arc<RestGateway>>> {
    let settings = gw
        .kanban_settings()
        .await
        .context("failed to load board settings")?;
    let mut session = BoardSession::new(gw.clone(), settings);
    if show_cancelled {
        session.set_show_cancelled(true);
    }
    session.reload().await?;
    Ok(session)
}

async fn move_card(
    gw: &Arc<RestGateway>,
    id: Uuid,
    to: Option<OrderStatus>,
    assignee: Option<Uuid>,
    json: bool,
) -> anyhow::Result<()> {
    if to.is_none() && assignee.is_none() {
        anyhow::bail!("nothing to do: pass --to and/or --assignee");
    }
    // Cancelled cards can only be moved when their column is loaded.
    let mut session = open(gw, true).await?;
    let card = session
        .board()
        .find(id)
        .with_context(|| format!("order {id} is not on the board"))?;
    let mut req = MoveRequest::status(id, card.status, to.unwrap_or(card.status));
    if let Some(user) = assignee {
        req = req.with_assignee(None, user);
    }

    let outcome = session.move_card(&req).await?;
    if json {
        return print_json(&serde_json::json!({
            "order_id": outcome.order_id,
            "status": outcome.status_changed,
            "assignee": outcome.assignee_changed,
            "noop": outcome.is_noop(),
        }));
    }
    if outcome.is_noop() {
        println!("Nothing changed.");
        return Ok(());
    }
    if let Some(status) = outcome.status_changed {
        println!("Moved {} to {}.", short_id(id), status.label());
    }
    if let Some(user) = outcome.assignee_changed {
        println!("Assigned {} to {user}.", short_id(id));
    }
    Ok(())
}

fn print_board<B: BoardBackend>(
    session: &BoardSession<B>,
    by_assignee: bool,
    json: bool,
) -> anyhow::Result<()> {
    let board = session.board();
    let wip = session.wip_limits();
    if json {
        let columns: Vec<serde_json::Value> = session
            .visible_statuses()
            .into_iter()
            .map(|status| {
                serde_json::json!({
                    "status": status,
                    "limit": wip.limit_for(status),
                    "cards": board.column(status),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "loaded_at": session.state().ready(),
            "columns": columns,
        }));
    }

    if let Some(at) = session.state().ready() {
        println!("Board as of {}\n", local_time(*at));
    }
    for status in session.visible_statuses() {
        let limit = wip
            .limit_for(status)
            .map(|l| l.to_string())
            .unwrap_or_else(|| "∞".to_string());
        let full = if board.is_full(status, &wip) { "  FULL" } else { "" };
        println!("{} ({}/{}){}", status.label(), board.count(status), limit, full);

        if by_assignee {
            for lane in board.lanes(status) {
                let name = match lane.assignee {
                    Some(id) => lane.assignee_name.map(str::to_string).unwrap_or_else(|| short_id(id)),
                    None => "Unassigned".to_string(),
                };
                println!("  [{name}]");
                for card in lane.cards {
                    println!("    {}  {}", short_id(card.id), card.display_address());
                }
            }
        } else {
            for card in board.column(status) {
                println!(
                    "  {}  {}  {}",
                    short_id(card.id),
                    card.display_address(),
                    or_dash(card.assignee_name.as_deref())
                );
            }
        }
        println!();
    }
    Ok(())
}
