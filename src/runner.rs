use anyhow::{bail, ensure, Context};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use blob_hunter::config::{ClientConfig, PageLimit, ScanConfig};
use blob_hunter::http_client::create_client;
use blob_hunter::output::{report_channel, spawn_reporter, ResultsMap};
use blob_hunter::probe::{ContainerProber, Dispatcher};
use blob_hunter::utils::{filter_valid_accounts, filter_valid_containers, read_lines};

fn print_banner() {
    println!(r#"
    _     _       _      _                 _
   | |__ | | ___ | |__  | |__  _   _ _ __ | |_ ___ _ __
   | '_ \| |/ _ \| '_ \ | '_ \| | | | '_ \| __/ _ \ '__|
   | |_) | | (_) | |_) || | | | |_| | | | | ||  __/ |
   |_.__/|_|\___/|_.__/ |_| |_|\__,_|_| |_|\__\___|_|
    "#);
}

fn init_logging(verbose: u8) {
    // Keep reqwest/hyper quiet even at the highest verbosity; RUST_LOG wins when set.
    use tracing_subscriber::EnvFilter;
    let crate_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter_str = format!(
        "blob_hunter={level},reqwest=warn,hyper=warn,h2=warn,rustls=warn",
        level = crate_level
    );
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&filter_str))
        .unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose);
    print_banner();

    let (accounts, containers) = load_targets(&cli)?;

    let scan_cfg = ScanConfig {
        max_tasks: cli.max_tasks,
        blobs_only: cli.blobs,
        max_pages: PageLimit::from_signed(cli.max_pages),
        invert: cli.invert,
    };
    let client_cfg = ClientConfig {
        timeout_secs: cli.timeout,
        max_idle_per_host: cli.max_idle_per_host,
        skip_tls_verify: cli.skip_tls,
    };
    tracing::info!(
        accounts = accounts.len(),
        containers = containers.len(),
        max_tasks = scan_cfg.max_tasks,
        max_pages = ?scan_cfg.max_pages,
        invert = scan_cfg.invert,
        "Starting scan"
    );

    let client = create_client(&client_cfg)?;
    let output_file = match cli.output.as_deref() {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("failed to open output file {}", path))?,
        ),
        None => None,
    };

    let results = Arc::new(ResultsMap::new());
    let (tx, rx) = report_channel();
    let reporter = spawn_reporter(rx, output_file);

    let prober = ContainerProber::new(Arc::new(client), results.clone(), tx, &scan_cfg);
    let dispatcher = Dispatcher::new(prober, scan_cfg.max_tasks, scan_cfg.invert);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(name) => {
                tracing::warn!("Signal detected ({}), stopping scan", name);
                signal_cancel.cancel();
            }
            Err(e) => tracing::warn!(error=%e, "failed to install signal handlers"),
        }
    });

    let report = dispatcher.run(&accounts, &containers, &cancel).await;
    tracing::info!(
        launched = report.launched,
        completed = report.completed,
        in_flight = report.in_flight,
        batches = report.batches_finished,
        "Probe phase finished"
    );

    if report.cancelled {
        println!("\x1b[31m[-] Scan interrupted. Printing partial results...\x1b[0m");
        print_summary(&results, cli.report.as_deref())?;
        std::process::exit(1);
    }

    // Dropping the dispatcher drops the last report sender, which lets the reporter finish.
    drop(dispatcher);
    match reporter.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error=%e, "reporter stopped early"),
        Err(e) => tracing::warn!(error=%e, "reporter task failed"),
    }

    print_summary(&results, cli.report.as_deref())
}

fn load_targets(cli: &Cli) -> anyhow::Result<(Vec<String>, Vec<String>)> {
    let raw_accounts = match (cli.accounts.as_deref(), cli.target.as_deref()) {
        (Some(path), _) => read_lines(Path::new(path))?,
        (None, Some(target)) => vec![target.to_string()],
        (None, None) => bail!("no target given; pass a storage account name or --accounts FILE"),
    };
    let raw_containers = read_lines(Path::new(&cli.containers))?;

    let (accounts, skipped_accounts) = filter_valid_accounts(&raw_accounts);
    let (containers, skipped_containers) = filter_valid_containers(&raw_containers);
    if skipped_accounts > 0 || skipped_containers > 0 {
        tracing::info!("Skipped {} invalid account(s) and {} invalid container name(s)", skipped_accounts, skipped_containers);
    }

    ensure!(!accounts.is_empty(), "no valid storage account names to scan");
    ensure!(!containers.is_empty(), "no valid container names in {}", cli.containers);
    Ok((accounts, containers))
}

fn print_summary(results: &ResultsMap, report_path: Option<&str>) -> anyhow::Result<()> {
    let summary = results.snapshot();
    print!("{}", summary.render());
    if let Some(path) = report_path {
        summary
            .save_to_file(Path::new(path))
            .with_context(|| format!("failed to save report to {}", path))?;
        println!("[=] Report saved to: {}", path);
    }
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;
    let name = tokio::select! {
        r = tokio::signal::ctrl_c() => { r?; "SIGINT" }
        _ = term.recv() => "SIGTERM",
        _ = hup.recv() => "SIGHUP",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
