use std::io::{IsTerminal, Write};
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::Print,
    terminal::{Clear, ClearType},
};

use crate::shutdown::ShutdownReceiver;

use super::{RunController, RunPhase, render_live_line};

/// Interval between live status lines.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Redraws the live status line on stderr every second while a run is active,
/// until shutdown is broadcast.
///
/// Does nothing when stderr is not a terminal.
pub fn setup_progress_reporter(
    controller: RunController,
    mut shutdown_rx: ShutdownReceiver,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !std::io::stderr().is_terminal() {
            return;
        }

        let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately.
        ticker.tick().await;

        let mut drawn = false;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {
                    if controller.phase() != RunPhase::Running {
                        continue;
                    }
                    let line = render_live_line(&controller.status());
                    if render_progress_line(&line).is_err() {
                        break;
                    }
                    drawn = true;
                }
            }
        }
        if drawn {
            drop(finish_progress_line());
        }
    })
}

fn render_progress_line(line: &str) -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    queue!(
        out,
        cursor::MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(line)
    )?;
    out.flush()?;
    Ok(())
}

fn finish_progress_line() -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
