use crate::context::{block_on, Context};
use crate::output::{local_time, or_dash, print_json, print_table, short_id};
use anyhow::Context as _;
use clap::Subcommand;
use falcon_client::RestGateway;
use falcon_core::file::OrderFile;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum FilesSubcommand {
    /// Attachments of an order, newest first
    List { order: Uuid },
    /// Upload a file to an order
    Upload {
        order: Uuid,
        path: PathBuf,
        /// Override the content type guessed from the file name
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete an attachment
    Delete { order: Uuid, file: Uuid },
    /// Print a short-lived download link
    Url {
        order: Uuid,
        file: Uuid,
        /// Link lifetime in seconds
        #[arg(long, default_value = "60")]
        expires: u64,
        /// Open the link in the browser
        #[arg(long)]
        open: bool,
    },
}

pub fn run(ctx: &Context, subcmd: FilesSubcommand, json: bool) -> anyhow::Result<()> {
    let gw = ctx.gateway()?;
    match subcmd {
        FilesSubcommand::List { order } => {
            let files = block_on(gw.list_order_files(order))??;
            if json {
                return print_json(&files);
            }
            if files.is_empty() {
                println!("No files.");
                return Ok(());
            }
            let rows = files
                .iter()
                .map(|f| {
                    vec![
                        short_id(f.id),
                        f.filename.clone(),
                        or_dash(f.content_type.as_deref()),
                        f.bytes.map(|b| b.to_string()).unwrap_or_else(|| "-".into()),
                        local_time(f.created_at),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "TYPE", "BYTES", "UPLOADED"], rows);
            Ok(())
        }
        FilesSubcommand::Upload {
            order,
            path,
            content_type,
        } => {
            let data = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("'{}' has no usable file name", path.display()))?
                .to_string();
            let stored = block_on(gw.upload_order_file(
                order,
                &filename,
                data.into(),
                content_type.as_deref(),
            ))??;
            if json {
                print_json(&stored)
            } else {
                println!("Uploaded {filename} to {}/{}.", stored.bucket, stored.path);
                Ok(())
            }
        }
        FilesSubcommand::Delete { order, file } => {
            block_on(async {
                let file = find(&gw, order, file).await?;
                gw.delete_order_file(&file).await?;
                Ok::<(), anyhow::Error>(())
            })??;
            if json {
                print_json(&serde_json::json!({ "id": file, "deleted": true }))
            } else {
                println!("Deleted file {}.", short_id(file));
                Ok(())
            }
        }
        FilesSubcommand::Url {
            order,
            file,
            expires,
            open,
        } => {
            let url = block_on(async {
                let file = find(&gw, order, file).await?;
                let url = gw.signed_url(&file.bucket, &file.path, expires).await?;
                Ok::<String, anyhow::Error>(url)
            })??;
            if json {
                print_json(&serde_json::json!({ "url": url, "expires_in": expires }))?;
            } else {
                println!("{url}");
            }
            if open {
                open::that(&url).context("failed to open browser")?;
            }
            Ok(())
        }
    }
}

async fn find(gw: &RestGateway, order: Uuid, file: Uuid) -> anyhow::Result<OrderFile> {
    gw.list_order_files(order)
        .await?
        .into_iter()
        .find(|f| f.id == file)
        .with_context(|| format!("file {file} not found on order {order}"))
}
