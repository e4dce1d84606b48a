use crate::context::{block_on, Context};
use crate::output::{print_json, print_table};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum UsersSubcommand {
    /// Users orders can be assigned to
    List {
        #[arg(long, default_value = "200")]
        limit: u64,
    },
}

pub fn run(ctx: &Context, subcmd: UsersSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        UsersSubcommand::List { limit } => {
            let gw = ctx.gateway()?;
            let users = block_on(gw.list_users(limit))??;
            if json {
                return print_json(&users);
            }
            if users.is_empty() {
                println!("No users.");
                return Ok(());
            }
            let rows = users
                .iter()
                .map(|u| vec![u.id.to_string(), u.display().to_string()])
                .collect();
            print_table(&["ID", "NAME"], rows);
            Ok(())
        }
    }
}
