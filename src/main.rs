// SPDX-License-Identifier: GPL-3.0-only

use clap::{CommandFactory, Parser};
use shotux::notifications::{notify, NotificationKind};
use shotux::{report_error, Error, ScreenshotKind, Shotux};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser, Debug)]
#[command(version, about = "Screenshot tool for X11 desktops", long_about = None)]
struct Args {
    /// Capture mode
    #[arg(long, value_enum)]
    capture: Option<ScreenshotKind>,
    /// Save the screenshot to this file, in the format its extension names
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Seconds to wait before capturing
    #[arg(short, long, default_value_t = 0)]
    delay: u64,
    /// Copy the screenshot to the clipboard
    #[arg(short, long)]
    clipboard: bool,
    /// Send a desktop notification when the screenshot was delivered
    #[arg(long)]
    notify: bool,
    /// Register the global hotkeys and keep them until interrupted
    #[arg(long)]
    hotkeys: bool,
    /// Restore the default settings
    #[arg(long)]
    reset_config: bool,
    /// Write the current settings to a file
    #[arg(long, value_name = "PATH")]
    export_config: Option<PathBuf>,
    /// Replace the settings with the contents of a file
    #[arg(long, value_name = "PATH")]
    import_config: Option<PathBuf>,
}

impl Args {
    fn has_action(&self) -> bool {
        self.capture.is_some()
            || self.hotkeys
            || self.reset_config
            || self.export_config.is_some()
            || self.import_config.is_some()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if !args.has_action() {
        if let Err(e) = Args::command().print_help() {
            log::error!("Failed to print help: {e}");
        }
        return ExitCode::SUCCESS;
    }

    let mut app = Shotux::new();
    let result = run(&args, &mut app).await;
    app.cleanup();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("{e}");
            report_error!("Error", &e.to_user_facing());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, app: &mut Shotux) -> Result<(), Error> {
    if args.reset_config {
        app.settings_mut().reset();
        println!("Configuration reset to defaults");
    }
    if let Some(path) = &args.import_config {
        app.settings_mut().import(path)?;
        println!("Configuration imported from: {}", path.display());
    }
    if let Some(path) = &args.export_config {
        app.settings().export(path)?;
        println!("Configuration exported to: {}", path.display());
    }

    if let Some(kind) = args.capture {
        capture(args, app, kind).await?;
    }

    if args.hotkeys && app.start_hotkeys() {
        if app.hotkeys().helper_count() == 0 {
            println!("Global hotkeys are unavailable: {}", app.hotkeys().daemon().missing());
        } else {
            println!("Hotkeys registered, press Ctrl-C to stop");
            wait_for_shutdown().await;
            app.shutdown();
        }
    }

    Ok(())
}

async fn capture(args: &Args, app: &mut Shotux, kind: ScreenshotKind) -> Result<(), Error> {
    let Some(image) = app.capture(kind, Some(args.delay)).await? else {
        println!("Screenshot capture failed or was cancelled");
        return Ok(());
    };

    if let Some(path) = &args.output {
        let saved = app.save_as(&image, path.clone()).await?;
        announce(args, &format!("Screenshot saved to: {}", saved.display())).await;
    }

    if args.clipboard {
        app.copy_to_clipboard(&image).await?;
        announce(args, "Screenshot copied to clipboard").await;
    }

    if args.output.is_none() && !args.clipboard {
        let saved = app.save_to_default_directory(&image)?;
        announce(args, &format!("Screenshot saved to: {}", saved.display())).await;
    }

    Ok(())
}

async fn announce(args: &Args, message: &str) {
    println!("{message}");
    if args.notify {
        if let Err(e) = notify(NotificationKind::Success, "Shotux", message).await {
            log::warn!("Failed to send notification: {e}");
        }
    }
}

async fn wait_for_shutdown() {
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted, releasing hotkeys"),
        _ = terminate.recv() => log::info!("Terminated, releasing hotkeys"),
    }
}
