//! Interactive request source and result sink.
//!
//! Incidental glue around the dispatch core: reads one line per request,
//! parses two integers and an operator, and prints each result. Malformed
//! input is rejected here and never reaches the dispatch core.

use std::io::{self, BufRead, Write};

use tracing::info;

use crate::dispatch::{OperationTag, Request, Supervisor};

const PROMPT: &str = "Enter two integers and an operation (+, -, *) or 'q' to quit: ";

/// One parsed line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Dispatch(Request),
    Quit,
}

/// Parse a request line of the form `<int> <int> <op>`.
pub fn parse_line(line: &str) -> Result<ReplCommand, String> {
    let trimmed = line.trim();
    if trimmed == "q" || trimmed == "quit" {
        return Ok(ReplCommand::Quit);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let &[lhs, rhs, op] = tokens.as_slice() else {
        return Err("expected two integers and an operation, e.g. '7 5 +'".into());
    };

    let lhs: i32 = lhs
        .parse()
        .map_err(|_| format!("'{}' is not a 32-bit integer", lhs))?;
    let rhs: i32 = rhs
        .parse()
        .map_err(|_| format!("'{}' is not a 32-bit integer", rhs))?;

    let mut symbols = op.chars();
    let operation = match (symbols.next(), symbols.next()) {
        (Some(c), None) => OperationTag::from_symbol(c)
            .ok_or_else(|| format!("unknown operation '{}'; use +, - or *", c))?,
        _ => return Err(format!("unknown operation '{}'; use +, - or *", op)),
    };

    Ok(ReplCommand::Dispatch(Request::new(lhs, rhs, operation)))
}

/// Run the request loop until `q` or EOF.
///
/// A failed dispatch prints an error and continues accepting requests; it
/// never silently prints a wrong result.
pub fn run(supervisor: &mut Supervisor) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        stdout.write_all(PROMPT.as_bytes())?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let request = match parse_line(&line) {
            Ok(ReplCommand::Quit) => break,
            Ok(ReplCommand::Dispatch(request)) => request,
            Err(msg) => {
                println!("Invalid input: {}. Please try again.", msg);
                continue;
            }
        };

        info!(
            operation = %request.operation,
            pid = supervisor.worker_pid(request.operation).as_raw(),
            "dispatching to worker"
        );
        match supervisor.dispatch(&request) {
            Ok(result) => println!("Result: {}", result),
            Err(e) => println!("Dispatch failed: {}", e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_requests() {
        assert_eq!(
            parse_line("7 5 +"),
            Ok(ReplCommand::Dispatch(Request::new(
                7,
                5,
                OperationTag::Add
            )))
        );
        assert_eq!(
            parse_line("  -3   10 *  "),
            Ok(ReplCommand::Dispatch(Request::new(
                -3,
                10,
                OperationTag::Multiply
            )))
        );
    }

    #[test]
    fn test_parse_quit() {
        assert_eq!(parse_line("q"), Ok(ReplCommand::Quit));
        assert_eq!(parse_line("quit\n"), Ok(ReplCommand::Quit));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(parse_line("garbage").is_err());
        assert!(parse_line("7 5").is_err());
        assert!(parse_line("7 5 /").is_err());
        assert!(parse_line("7 5 ++").is_err());
        assert!(parse_line("a b +").is_err());
        assert!(parse_line("7 99999999999 +").is_err());
    }
}
