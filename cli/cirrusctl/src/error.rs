//! Error display for the CLI.

use colored::Colorize;

use cirrus_client::ClientError;

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    // Check for specific error types and provide hints
    if let Some(client_err) = err.downcast_ref::<ClientError>() {
        match client_err {
            ClientError::Config(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check credentials and URL in cirrus.yml or the CIRRUS_* environment."
                        .yellow()
                );
            }
            ClientError::Network(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check your network connection and server endpoint.".yellow()
                );
            }
            ClientError::Api { status, .. } if *status == 401 => {
                eprintln!(
                    "\n{}",
                    "Hint: Your token may have expired. Remove the cached token and retry."
                        .yellow()
                );
            }
            _ => {}
        }
    }
}
