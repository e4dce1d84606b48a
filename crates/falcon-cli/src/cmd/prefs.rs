use crate::context::{block_on, Context};
use crate::output::print_json;
use clap::Subcommand;
use falcon_core::filters::OrderFilters;
use falcon_core::settings::{OrdersDefaultFilters, UserPrefs, UserPrefsPatch};

#[derive(Subcommand)]
pub enum PrefsSubcommand {
    /// Show my preferences
    Show,
    /// Change my preferences; unspecified ones stay as they are
    Set {
        /// Hide notifications for changes I made myself
        #[arg(long)]
        mute: Option<bool>,
        /// Rows per page on the orders list
        #[arg(long)]
        page_size: Option<u32>,
        /// Default list filters, as a list URL query string
        #[arg(long, value_name = "QUERY")]
        default_query: Option<String>,
    },
}

pub fn run(ctx: &Context, subcmd: PrefsSubcommand, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    match subcmd {
        PrefsSubcommand::Show => {
            let prefs = block_on(gw.user_prefs())??;
            print_prefs(&prefs, json)
        }
        PrefsSubcommand::Set {
            mute,
            page_size,
            default_query,
        } => {
            let patch = UserPrefsPatch {
                mute_my_toasts: mute,
                orders_page_size: page_size,
                orders_default_filters: default_query.map(|q| {
                    OrdersDefaultFilters::from_filters(&OrderFilters::from_query_string(&q))
                }),
            };
            if patch == UserPrefsPatch::default() {
                anyhow::bail!("nothing to change: pass --mute, --page-size or --default-query");
            }
            let prefs = block_on(gw.update_user_prefs(&patch))??;
            print_prefs(&prefs, json)
        }
    }
}

fn print_prefs(prefs: &UserPrefs, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(prefs);
    }
    let defaults = prefs.default_filters().to_query_string();
    println!("Mute my toasts:  {}", if prefs.mute_my_toasts { "yes" } else { "no" });
    println!("Page size:       {}", prefs.orders_page_size);
    println!(
        "Default filters: {}",
        if defaults.is_empty() { "(none)" } else { defaults.as_str() }
    );
    Ok(())
}
