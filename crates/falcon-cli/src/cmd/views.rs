use crate::cmd::filter_args::FilterArgs;
use crate::context::Context;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use falcon_core::filters::{AssigneeFilter, OrderFilters};
use falcon_core::views::SavedViews;

#[derive(Subcommand)]
pub enum ViewsSubcommand {
    /// List saved views
    List,
    /// Save a view from a query string and/or filter flags
    Save {
        name: String,
        /// Start from this list URL query string; flags apply on top
        #[arg(long)]
        query: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Delete a saved view
    Delete { name: String },
    /// Print the list URL query string for a set of filter flags
    Encode {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Print the filters a list URL query string stands for
    Decode { query: String },
}

pub fn run(ctx: &Context, subcmd: ViewsSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ViewsSubcommand::List => {
            let views = SavedViews::load(&ctx.views_path())?;
            let list = views.list();
            if json {
                return print_json(&list);
            }
            if list.is_empty() {
                println!("No saved views.");
                return Ok(());
            }
            let rows = list
                .iter()
                .map(|v| vec![v.name.clone(), v.query.clone()])
                .collect();
            print_table(&["NAME", "QUERY"], rows);
            Ok(())
        }
        ViewsSubcommand::Save {
            name,
            query,
            filters,
        } => {
            if name.trim().is_empty() {
                anyhow::bail!("view name cannot be empty");
            }
            let mut f = query
                .as_deref()
                .map(OrderFilters::from_query_string)
                .unwrap_or_default();
            filters.apply_to(&mut f);
            let mut views = SavedViews::load(&ctx.views_path())?;
            let view = views.save(&name, &f)?;
            if json {
                print_json(view)
            } else {
                println!("Saved view '{}': ?{}", view.name, view.query);
                Ok(())
            }
        }
        ViewsSubcommand::Delete { name } => {
            let mut views = SavedViews::load(&ctx.views_path())?;
            let removed = views.remove(&name)?;
            if json {
                print_json(&removed)
            } else {
                println!("Deleted view '{}'.", removed.name);
                Ok(())
            }
        }
        ViewsSubcommand::Encode { filters } => {
            let mut f = OrderFilters::default();
            filters.apply_to(&mut f);
            let query = f.to_query_string();
            if json {
                print_json(&serde_json::json!({ "query": query }))
            } else {
                println!("{query}");
                Ok(())
            }
        }
        ViewsSubcommand::Decode { query } => {
            let f = OrderFilters::from_query_string(&query);
            if json {
                return print_json(&f);
            }
            print_filters(&f);
            Ok(())
        }
    }
}

fn print_filters(f: &OrderFilters) {
    let statuses: Vec<&str> = f.status.iter().map(|s| s.label()).collect();
    let assignee = match f.assignee {
        AssigneeFilter::Any => "any".to_string(),
        AssigneeFilter::Unassigned => "unassigned".to_string(),
        AssigneeFilter::User(id) => id.to_string(),
    };
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());

    println!(
        "Status:    {}",
        if statuses.is_empty() { "all".to_string() } else { statuses.join(", ") }
    );
    println!("Assignee:  {assignee}");
    println!(
        "Client:    {}",
        f.client_id.map(|c| c.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("Search:    {}", f.q.as_deref().unwrap_or("-"));
    println!("Due from:  {}", date(f.due_from));
    println!("Due to:    {}", date(f.due_to));
    println!("Archived:  {}", if f.include_archived { "included" } else { "hidden" });
    println!("Page:      {} ({} per page)", f.page, f.page_size);
}
