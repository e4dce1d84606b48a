use crate::context::{block_on, Context};
use crate::output::{print_json, print_table};
use clap::Subcommand;
use falcon_core::settings::{KanbanSettings, KanbanSettingsPatch};
use falcon_core::types::OrderStatus;

#[derive(Subcommand)]
pub enum KanbanSubcommand {
    /// Show WIP limits and board defaults
    Show,
    /// Change board settings for the whole organisation
    Set {
        /// WIP limit as STATUS=N, or STATUS=none to remove it (repeatable)
        #[arg(long = "wip", value_name = "STATUS=N", value_parser = parse_wip)]
        wip: Vec<(OrderStatus, Option<u32>)>,
        #[arg(long)]
        show_cancelled: Option<bool>,
        #[arg(long)]
        group_by_assignee: Option<bool>,
    },
}

pub fn run(ctx: &Context, subcmd: KanbanSubcommand, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    match subcmd {
        KanbanSubcommand::Show => {
            let settings = block_on(gw.kanban_settings())??;
            print_settings(&settings, json)
        }
        KanbanSubcommand::Set {
            wip,
            show_cancelled,
            group_by_assignee,
        } => {
            let mut patch = KanbanSettingsPatch {
                show_cancelled,
                group_by_assignee_default: group_by_assignee,
                ..Default::default()
            };
            for (status, limit) in wip {
                patch.set_wip(status, limit);
            }
            if patch == KanbanSettingsPatch::default() {
                anyhow::bail!("nothing to change: pass --wip, --show-cancelled or --group-by-assignee");
            }
            let settings = block_on(gw.update_kanban_settings(&patch))??;
            print_settings(&settings, json)
        }
    }
}

fn parse_wip(s: &str) -> Result<(OrderStatus, Option<u32>), String> {
    let (status, limit) = s
        .split_once('=')
        .ok_or_else(|| format!("expected STATUS=N, got '{s}'"))?;
    let status: OrderStatus = status.trim().parse().map_err(|e| format!("{e}"))?;
    let limit = match limit.trim() {
        "" | "none" => None,
        n => Some(
            n.parse::<u32>()
                .map_err(|_| format!("'{n}' is not a card count"))?,
        ),
    };
    Ok((status, limit))
}

fn print_settings(settings: &KanbanSettings, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(settings);
    }
    let wip = settings.wip_limits();
    let rows = OrderStatus::all()
        .iter()
        .map(|&status| {
            vec![
                status.label().to_string(),
                wip.limit_for(status)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&["COLUMN", "WIP LIMIT"], rows);
    println!();
    println!("Show cancelled:    {}", yes_no(settings.show_cancelled));
    println!("Group by assignee: {}", yes_no(settings.group_by_assignee_default));
    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}
