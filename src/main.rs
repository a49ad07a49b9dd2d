mod cases;
mod checker;
mod config;
mod core;
mod error;
mod evaluation;
mod i18n;
mod runner;
mod test_case;

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::GradingConfig;
use crate::core::{StopReason, StopToken};
use crate::evaluation::Evaluator;
use crate::i18n::enhance::language_for_file;
use crate::i18n::{Catalog, Enhancer};
use crate::runner::ProcessRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // The time budget covers setup as well as the runs.
    let started = Instant::now();

    // stdout carries the report; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("case_grader=warn".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = GradingConfig::from_env();
    let catalog = load_translator(&config).context("Failed to initialize message catalog")?;
    info!(
        "Message catalog {} loaded (enhanced: {})",
        catalog.code(),
        catalog.is_enhanced()
    );

    let stop = StopToken::new();
    let listener = spawn_signal_listener(stop.clone());

    let evaluation = tokio::task::spawn_blocking(move || {
        let mut evaluator = Evaluator::new(&config, ProcessRunner::default(), &catalog, stop)
            .started_at(started);
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        evaluator.evaluate(&mut out)?;
        Ok::<_, std::io::Error>((evaluator.runs(), evaluator.errors(), evaluator.grade()))
    });

    // A broken report sink is not a grading failure; the exit status stays 0.
    match evaluation.await {
        Ok(Ok((runs, errors, grade))) => info!(
            "Evaluation finished: {} runs, {} failed, grade {:.2}",
            runs, errors, grade
        ),
        Ok(Err(e)) => error!("Failed to write report: {}", e),
        Err(e) => error!("Evaluation task failed: {}", e),
    }

    if let Some(listener) = listener {
        listener.abort();
    }
    Ok(())
}

/// Catalog for the configured locale, with enhancement rules for the
/// submission's language when enhanced mode is on.
fn load_translator(config: &GradingConfig) -> Result<Catalog> {
    let catalog = Catalog::load(&config.lang_dir, &config.locale)?;
    if !config.enhanced {
        return Ok(catalog);
    }
    let Some(language) = language_for_file(&config.submission_file) else {
        warn!(
            "No enhancement rules for submission file {:?}",
            config.submission_file
        );
        return Ok(catalog);
    };
    let enhancer = Enhancer::load(&config.lang_dir, language, catalog.code())
        .with_context(|| format!("Failed to load enhancement rules for {}", language))?;
    Ok(catalog.with_enhancer(enhancer))
}

/// Turn the first SIGTERM, SIGINT, SIGQUIT or SIGHUP into a stop request.
fn spawn_signal_listener(stop: StopToken) -> Option<JoinHandle<()>> {
    let streams = (|| {
        Ok::<_, std::io::Error>((
            signal(SignalKind::terminate())?,
            signal(SignalKind::interrupt())?,
            signal(SignalKind::quit())?,
            signal(SignalKind::hangup())?,
        ))
    })();
    let (mut term, mut int, mut quit, mut hup) = match streams {
        Ok(streams) => streams,
        Err(e) => {
            warn!("Failed to install signal handlers: {}", e);
            return None;
        }
    };

    Some(tokio::spawn(async move {
        let reason = tokio::select! {
            _ = term.recv() => StopReason::Terminate,
            _ = int.recv() => StopReason::Signal,
            _ = quit.recv() => StopReason::Signal,
            _ = hup.recv() => StopReason::Signal,
        };
        warn!("Stop requested ({})", reason);
        stop.request(reason);
    }))
}
