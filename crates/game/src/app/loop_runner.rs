use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use tracing::{error, info, warn};

use super::bootstrap::{build_app, GameError};
use super::commands::parse_command;
use super::session::{CommandOutcome, GameSession};

const PROMPT: &str = "> ";

pub(crate) fn run() -> ExitCode {
    let mut session = match build_app() {
        Ok(session) => session,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    info!(
        seed = session.build_report().seed,
        placed = session.build_report().total_placed(),
        entity_count = session.scene().entity_count(),
        "session_started"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    if let Err(err) = run_session(&mut session, stdin.lock(), stdout.lock()) {
        error!(error = %err, "session_failed");
        return ExitCode::FAILURE;
    }
    info!("session_ended");
    ExitCode::SUCCESS
}

/// Reads commands until `quit` or end of input.
pub(crate) fn run_session<R: BufRead, W: Write>(
    session: &mut GameSession,
    input: R,
    mut output: W,
) -> Result<(), GameError> {
    flush_lines(session, &mut output)?;
    write!(output, "{PROMPT}").map_err(GameError::Terminal)?;
    output.flush().map_err(GameError::Terminal)?;

    for line in input.lines() {
        let line = line.map_err(GameError::Terminal)?;
        match parse_command(&line) {
            Ok(None) => {}
            Ok(Some(command)) => {
                if session.execute(command)? == CommandOutcome::Quit {
                    flush_lines(session, &mut output)?;
                    return Ok(());
                }
            }
            Err(err) => {
                warn!(line = %line, error = %err, "command_rejected");
                writeln!(output, "{err}").map_err(GameError::Terminal)?;
            }
        }
        flush_lines(session, &mut output)?;
        write!(output, "{PROMPT}").map_err(GameError::Terminal)?;
        output.flush().map_err(GameError::Terminal)?;
    }
    Ok(())
}

fn flush_lines<W: Write>(session: &mut GameSession, output: &mut W) -> Result<(), GameError> {
    for line in session.take_output() {
        writeln!(output, "{line}").map_err(GameError::Terminal)?;
    }
    Ok(())
}
