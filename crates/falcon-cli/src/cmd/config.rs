use crate::context::Context;
use crate::output::print_json;
use clap::Subcommand;
use falcon_core::config::WarnLevel;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective config (token redacted)
    Show,
    /// Check the effective config for problems
    Validate,
    /// Write the effective config (file plus flags) to the config path
    Init,
}

pub fn run(ctx: &Context, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => {
            let mut shown = ctx.config.clone();
            if shown.access_token.is_some() {
                shown.access_token = Some("<redacted>".to_string());
            }
            if json {
                return print_json(&serde_json::json!({
                    "path": ctx.config_path,
                    "config": shown,
                }));
            }
            println!("# {}", ctx.config_path.display());
            print!("{}", serde_yaml::to_string(&shown)?);
            Ok(())
        }
        ConfigSubcommand::Validate => {
            let warnings = ctx.config.validate();
            let errors = warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .count();
            if json {
                print_json(&serde_json::json!({
                    "path": ctx.config_path,
                    "ok": errors == 0,
                    "warnings": warnings,
                }))?;
            } else if warnings.is_empty() {
                println!("Config OK.");
            } else {
                for w in &warnings {
                    let tag = match w.level {
                        WarnLevel::Error => "error",
                        WarnLevel::Warning => "warning",
                    };
                    println!("{tag}: {}", w.message);
                }
            }
            if errors > 0 {
                anyhow::bail!("config has {errors} error(s)");
            }
            Ok(())
        }
        ConfigSubcommand::Init => {
            ctx.config.save(&ctx.config_path)?;
            if json {
                print_json(&serde_json::json!({ "path": ctx.config_path, "written": true }))
            } else {
                println!("Wrote {}.", ctx.config_path.display());
                Ok(())
            }
        }
    }
}
