mod cli;
mod error_fmt;
mod logging;
mod run;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::Result;
use femto_core::error::LockError;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("error reporting setup failed: {e}");
    }

    let code = match real_main(&cli) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "femto failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: &Cli) -> Result<()> {
    // Config errors are typed so they map to their own exit code.
    let cfg = femto_config::load_file(&cli.config)
        .map_err(|e| eyre::Report::new(LockError::Config(format!("{e:#}"))));
    logging::init(
        cli.json,
        cli.log_level.as_deref(),
        cfg.as_ref().ok().map(|c| &c.logging),
    );
    let cfg = cfg?;

    match &cli.cmd {
        Commands::Run {
            cycles,
            calibrate,
            inject_jump,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "could not install Ctrl-C handler");
                }
            }
            let summary = run::run_locker(&cfg, *cycles, *calibrate, *inject_jump, &shutdown)?;
            if cli.json {
                println!("{}", summary.to_json());
            } else {
                println!("{}", summary.render());
            }
        }
        Commands::SelfCheck => {
            let check = run::self_check(&cfg)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "locker": cfg.locker.name,
                        "status": check.status,
                        "delay_ns": check.model.delay_ns,
                        "offset_ns": check.model.offset_ns,
                    })
                );
            } else {
                println!(
                    "OK: locker {} connected, status \"{}\", delay {:.4} ns, offset {:.4} ns",
                    cfg.locker.name, check.status, check.model.delay_ns, check.model.offset_ns
                );
            }
        }
        Commands::Channels => {
            let rows = run::channel_listing(&cfg);
            if cli.json {
                let map: serde_json::Map<String, serde_json::Value> = rows
                    .into_iter()
                    .map(|(role, name)| (role.to_string(), serde_json::Value::String(name)))
                    .collect();
                println!("{}", serde_json::Value::Object(map));
            } else {
                for (role, name) in rows {
                    println!("{role:<24} {name}");
                }
            }
        }
    }
    Ok(())
}
