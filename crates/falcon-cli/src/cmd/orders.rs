use crate::cmd::filter_args::FilterArgs;
use crate::context::{block_on, Context};
use crate::output::{local_time, or_dash, print_json, print_table, short_id};
use anyhow::Context as _;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use falcon_client::{ChangeFeed, OrdersListSession, RestGateway};
use falcon_core::filters::OrderFilters;
use falcon_core::order::{NewOrder, OrderView, Page};
use falcon_core::views::SavedViews;
use std::sync::Arc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum OrdersSubcommand {
    /// List orders. With no filters at all, my saved defaults apply
    List {
        #[command(flatten)]
        filters: FilterArgs,
        /// Start from a list URL query string; flags apply on top
        #[arg(long, conflicts_with = "view")]
        query: Option<String>,
        /// Start from a saved view; flags apply on top
        #[arg(long)]
        view: Option<String>,
        /// Keep running and refresh on every change
        #[arg(long)]
        watch: bool,
    },
    /// Show one order with its appointments
    Show { id: Uuid },
    /// Create an order in my organisation
    Create {
        #[arg(long)]
        client: Option<Uuid>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        postal_code: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Assign an order to a user
    Assign { id: Uuid, user: Uuid },
    /// Assign several orders at once
    BulkAssign {
        #[arg(long)]
        user: Uuid,
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Archive an order
    Archive { id: Uuid },
    /// Restore an archived order
    Restore { id: Uuid },
    /// Add a note to the activity log
    Note { id: Uuid, body: String },
    /// Schedule, clear or list inspection appointments
    Appointment {
        #[command(subcommand)]
        subcommand: AppointmentSubcommand,
    },
}

#[derive(Subcommand)]
pub enum AppointmentSubcommand {
    /// Set the appointment (RFC 3339 time, e.g. 2026-04-02T15:00:00Z)
    Set {
        id: Uuid,
        at: DateTime<Utc>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Remove the appointment
    Clear { id: Uuid },
    /// Appointment history of an order
    List { id: Uuid },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcmd: OrdersSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        OrdersSubcommand::List {
            filters,
            query,
            view,
            watch,
        } => list(ctx, &filters, query.as_deref(), view.as_deref(), watch, json),
        OrdersSubcommand::Show { id } => show(ctx, id, json),
        OrdersSubcommand::Create {
            client,
            address,
            city,
            state,
            postal_code,
            due,
        } => {
            let order = NewOrder {
                organization_id: Uuid::nil(),
                client_id: client,
                address,
                city,
                state,
                postal_code,
                due_date: due,
            };
            create(ctx, order, json)
        }
        OrdersSubcommand::Assign { id, user } => {
            let gw = ctx.gateway()?;
            block_on(gw.assign_order(id, user))??;
            done(json, id, &format!("Assigned order {} to {user}.", short_id(id)))
        }
        OrdersSubcommand::BulkAssign { user, ids } => {
            let gw = ctx.gateway()?;
            let updated = block_on(gw.bulk_assign_orders(&ids, user))??;
            if json {
                print_json(&serde_json::json!({ "updated": updated, "assignee": user }))?;
            } else {
                println!("Assigned {updated} order(s) to {user}.");
            }
            Ok(())
        }
        OrdersSubcommand::Archive { id } => {
            let gw = ctx.gateway()?;
            block_on(gw.archive_order(id, true))??;
            done(json, id, &format!("Archived order {}.", short_id(id)))
        }
        OrdersSubcommand::Restore { id } => {
            let gw = ctx.gateway()?;
            block_on(gw.archive_order(id, false))??;
            done(json, id, &format!("Restored order {}.", short_id(id)))
        }
        OrdersSubcommand::Note { id, body } => {
            let gw = ctx.gateway()?;
            let note = block_on(gw.add_order_note(id, &body))??;
            if json {
                print_json(&serde_json::json!({ "order_id": id, "activity_id": note }))?;
            } else {
                println!("Added note {note} to order {}.", short_id(id));
            }
            Ok(())
        }
        OrdersSubcommand::Appointment { subcommand } => appointment(ctx, subcommand, json),
    }
}

fn done(json: bool, id: Uuid, message: &str) -> anyhow::Result<()> {
    if json {
        print_json(&serde_json::json!({ "order_id": id, "ok": true }))
    } else {
        println!("{message}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(
    ctx: &Context,
    args: &FilterArgs,
    query: Option<&str>,
    view: Option<&str>,
    watch: bool,
    json: bool,
) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    let start = match (query, view) {
        (Some(q), _) => Some(OrderFilters::from_query_string(q)),
        (None, Some(name)) => {
            let views = SavedViews::load(&ctx.views_path())?;
            Some(views.get(name)?.filters())
        }
        (None, None) if !args.is_empty() => Some(OrderFilters::default()),
        (None, None) => None,
    };

    block_on(async {
        let mut session = match start {
            Some(mut filters) => {
                args.apply_to(&mut filters);
                OrdersListSession::new(gw.clone(), filters)
            }
            None => {
                let prefs = gw.user_prefs().await.context("failed to load preferences")?;
                let (session, _) = OrdersListSession::from_query(gw.clone(), "", &prefs);
                session
            }
        };
        session.refresh().await?;
        if let Some(page) = session.page() {
            print_page(page, &session.query_string(), json)?;
        }
        if !watch {
            return Ok(());
        }

        let schema = gw.config().schema.clone();
        let org = gw.my_org_id().await.ok();
        let mut sub = gw
            .change_feed()?
            .subscribe(falcon_client::orders_filter(&schema, org));
        while session.watch(&mut sub).await? {
            match (session.page(), session.state().error()) {
                (Some(page), _) => print_page(page, &session.query_string(), json)?,
                (None, Some(e)) => eprintln!("refresh failed: {e}"),
                _ => {}
            }
        }
        Ok::<(), anyhow::Error>(())
    })?
}

fn print_page(page: &Page<OrderView>, query: &str, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({ "query": query, "page": page }));
    }
    if page.rows.is_empty() {
        println!("No orders match these filters.");
        return Ok(());
    }
    let today = Utc::now().date_naive();
    let rows: Vec<Vec<String>> = page
        .rows
        .iter()
        .map(|o| {
            let due = match o.due_date {
                Some(d) if o.is_overdue(today) => format!("{d} (overdue)"),
                Some(d) => d.to_string(),
                None => "-".to_string(),
            };
            vec![
                short_id(o.id),
                o.status.label().to_string(),
                o.display_address(),
                or_dash(o.client_name.as_deref()),
                or_dash(o.assignee_name.as_deref()),
                due,
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "ADDRESS", "CLIENT", "ASSIGNEE", "DUE"], rows);
    println!(
        "\nPage {} of {} ({} orders)  ?{}",
        page.page,
        page.page_count().max(1),
        page.total,
        query
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// show / create / appointments
// ---------------------------------------------------------------------------

fn show(ctx: &Context, id: Uuid, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    let (order, appointments) = block_on(async {
        tokio::try_join!(gw.fetch_order(id), gw.fetch_appointments(id))
    })??;
    let order = order.with_context(|| format!("order {id} not found"))?;

    if json {
        return print_json(&serde_json::json!({
            "order": order,
            "appointments": appointments,
        }));
    }
    println!("Order:     {}", order.id);
    println!("Status:    {}", order.status.label());
    println!("Address:   {}", order.display_address());
    println!("Client:    {}", or_dash(order.client_name.as_deref()));
    println!("Assignee:  {}", or_dash(order.assignee_name.as_deref()));
    println!(
        "Due:       {}",
        order.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("Created:   {}", local_time(order.created_at));
    if order.archived() {
        println!("Archived:  yes");
    }
    if let Some(start) = order.appointment_start {
        println!("Inspection: {}", local_time(start));
    }
    if !appointments.is_empty() {
        println!("\nAppointments:");
        for a in &appointments {
            println!("  {}  {}", local_time(a.scheduled_at), or_dash(a.note.as_deref()));
        }
    }
    Ok(())
}

fn create(ctx: &Context, mut order: NewOrder, json: bool) -> anyhow::Result<()> {
    let gw: Arc<RestGateway> = ctx.gateway()?;
    let id = block_on(async {
        order.organization_id = gw.my_org_id().await?;
        gw.create_order(&order).await
    })??;
    if json {
        print_json(&serde_json::json!({ "id": id }))
    } else {
        println!("Created order {id}.");
        Ok(())
    }
}

fn appointment(ctx: &Context, subcmd: AppointmentSubcommand, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    match subcmd {
        AppointmentSubcommand::Set { id, at, note } => {
            block_on(gw.set_appointment(id, at, note.as_deref()))??;
            done(
                json,
                id,
                &format!("Appointment for {} set to {}.", short_id(id), local_time(at)),
            )
        }
        AppointmentSubcommand::Clear { id } => {
            block_on(gw.clear_appointment(id))??;
            done(json, id, &format!("Appointment for {} cleared.", short_id(id)))
        }
        AppointmentSubcommand::List { id } => {
            let rows = block_on(gw.fetch_appointments(id))??;
            if json {
                return print_json(&rows);
            }
            if rows.is_empty() {
                println!("No appointments.");
                return Ok(());
            }
            let rows = rows
                .iter()
                .map(|a| vec![local_time(a.scheduled_at), or_dash(a.note.as_deref())])
                .collect();
            print_table(&["WHEN", "NOTE"], rows);
            Ok(())
        }
    }
}
