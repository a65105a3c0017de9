//! OS signal wiring.
//!
//! Without hardware attached the trigger event is SIGUSR1, so a stream
//! toggle is one `kill -USR1 $(pidof streampilot)` away. GPIO-backed
//! trigger sources implement the same [`sp_core::hardware::PressSource`]
//! trait and replace [`signal_press_source`] at wiring time. SIGTERM and
//! SIGINT request graceful shutdown.

use sp_core::hardware::{ChannelPressSource, Press};
use sp_core::shutdown::ShutdownSignal;
use tracing::{debug, info};

/// A press source fed by SIGUSR1.
#[cfg(unix)]
pub fn signal_press_source() -> std::io::Result<ChannelPressSource> {
    use tokio::signal::unix::{signal, SignalKind};

    let (tx, source) = ChannelPressSource::channel(8);
    let mut usr1 = signal(SignalKind::user_defined1())?;

    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            debug!("Trigger signal received (SIGUSR1)");
            if tx.send(Press).await.is_err() {
                break;
            }
        }
    });

    info!("Trigger source ready (SIGUSR1)");
    Ok(source)
}

/// Non-Unix fallback: a source that never fires.
#[cfg(not(unix))]
pub fn signal_press_source() -> std::io::Result<ChannelPressSource> {
    let (tx, source) = ChannelPressSource::channel(8);
    // Keep the sender alive so the source stays open.
    tokio::spawn(async move {
        let _tx = tx;
        std::future::pending::<()>().await;
    });
    Ok(source)
}

/// Route SIGTERM and SIGINT into the shutdown signal.
#[cfg(unix)]
pub fn install_termination_handlers(shutdown: &ShutdownSignal) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let term_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if sigterm.recv().await.is_some() {
            info!("Received SIGTERM, shutting down");
            term_shutdown.request();
        }
    });

    let mut sigint = signal(SignalKind::interrupt())?;
    let int_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if sigint.recv().await.is_some() {
            info!("Received SIGINT, shutting down");
            int_shutdown.request();
        }
    });

    Ok(())
}

#[cfg(not(unix))]
pub fn install_termination_handlers(shutdown: &ShutdownSignal) -> std::io::Result<()> {
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            ctrl_c_shutdown.request();
        }
    });
    Ok(())
}
