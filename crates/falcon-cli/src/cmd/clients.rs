use crate::context::{block_on, Context};
use crate::output::{local_time, or_dash, print_json, print_table, short_id};
use anyhow::Context as _;
use clap::Subcommand;
use falcon_core::client::NewClient;
use falcon_core::types::ClientKind;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ClientsSubcommand {
    /// List clients, optionally filtered by name
    List {
        #[arg(long)]
        q: Option<String>,
        #[arg(long, default_value = "50")]
        limit: u64,
    },
    /// Show one client
    Show { id: Uuid },
    /// Create a client in my organisation
    Create {
        name: String,
        /// Kind: lender or amc
        #[arg(long, default_value = "lender")]
        kind: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Archive a client (or bring it back with --restore)
    Archive {
        id: Uuid,
        #[arg(long)]
        restore: bool,
    },
    /// Orders placed by a client
    Orders { id: Uuid },
}

pub fn run(ctx: &Context, subcmd: ClientsSubcommand, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    match subcmd {
        ClientsSubcommand::List { q, limit } => {
            let clients = block_on(gw.list_clients(q.as_deref(), limit))??;
            if json {
                return print_json(&clients);
            }
            if clients.is_empty() {
                println!("No clients.");
                return Ok(());
            }
            let rows = clients
                .iter()
                .map(|c| vec![c.id.to_string(), c.display_name.clone()])
                .collect();
            print_table(&["ID", "NAME"], rows);
            Ok(())
        }
        ClientsSubcommand::Show { id } => {
            let client = block_on(gw.fetch_client(id))??
                .with_context(|| format!("client {id} not found"))?;
            if json {
                return print_json(&client);
            }
            println!("Client:   {}", client.id);
            println!("Name:     {}", client.display_name);
            println!("Kind:     {}", client.kind);
            println!("Notes:    {}", or_dash(client.notes.as_deref()));
            println!("Created:  {}", local_time(client.created_at));
            if client.is_archived.unwrap_or(false) {
                println!("Archived: yes");
            }
            Ok(())
        }
        ClientsSubcommand::Create { name, kind, notes } => {
            let kind = ClientKind::parse_known(&kind)?;
            let id = block_on(async {
                let organization_id = gw.my_org_id().await?;
                gw.create_client(&NewClient {
                    organization_id,
                    display_name: name.clone(),
                    kind,
                    notes,
                })
                .await
            })??;
            if json {
                print_json(&serde_json::json!({ "id": id, "display_name": name }))
            } else {
                println!("Created client '{name}' ({id}).");
                Ok(())
            }
        }
        ClientsSubcommand::Archive { id, restore } => {
            block_on(gw.archive_client(id, !restore))??;
            if json {
                print_json(&serde_json::json!({ "id": id, "archived": !restore }))
            } else {
                let verb = if restore { "Restored" } else { "Archived" };
                println!("{verb} client {}.", short_id(id));
                Ok(())
            }
        }
        ClientsSubcommand::Orders { id } => {
            let orders = block_on(gw.fetch_client_orders(id))??;
            if json {
                return print_json(&orders);
            }
            if orders.is_empty() {
                println!("No orders for this client.");
                return Ok(());
            }
            let rows = orders
                .iter()
                .map(|o| {
                    vec![
                        short_id(o.id),
                        o.status.label().to_string(),
                        o.display_address(),
                        o.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                    ]
                })
                .collect();
            print_table(&["ID", "STATUS", "ADDRESS", "DUE"], rows);
            Ok(())
        }
    }
}
