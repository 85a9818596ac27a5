use colored::*;
use serde_json::Value;
use sse::Error;

pub fn print_connecting(url: &str) {
    println!("{} Connecting to {}", "→".blue(), url);
}

pub fn print_connected(user_ids: &str) {
    println!("{} Subscribed as {}", "✓".green(), user_ids.bold());
}

pub fn print_event(index: usize, payload: &Value) {
    let body = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    println!("{} {}", format!("[{index}]").cyan(), body);
}

pub fn print_error(error: &Error) {
    println!("{} {}", "✗".red(), error);
}

pub fn print_summary(received: usize, error: Option<&Error>) {
    println!("\n{}", "=== SUMMARY ===".bright_white().bold());
    println!("Events received: {}", received.to_string().bold());
    match error {
        Some(e) => println!("{} Connection ended: {}", "✗".red(), e),
        None => println!("{} Disconnected cleanly", "✓".green()),
    }
}
