use anyhow::Result;
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use statline_tool_runtime::AgentResponse;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const USER_PROMPT: Color = Color::Green;
    const ANSWER: Color = Color::Cyan;
    const TOOL_CALL: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
    const HEADER: Color = Color::Magenta;
}

const RULE: &str = "============================================================";

/// Lines that end an interactive session.
pub fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q")
}

/// Terminal I/O for single-question and interactive modes.
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    /// Print the startup banner.
    pub fn print_banner(&self, provider: &str, model: &str, tools: usize) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("statline"),
            ResetColor,
            Print(" - NFL Stats Agent\n"),
            SetForegroundColor(Colors::DIM),
            Print(format!("Provider: {} | Model: {} | Tools: {}\n", provider, model, tools)),
            Print("Type 'quit' to exit.\n"),
            Print(format!("{RULE}\n")),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Read a question. `None` on EOF or an exit command.
    pub fn read_input(&self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            Print("\n"),
            SetForegroundColor(Colors::USER_PROMPT),
            Print("Your question: "),
            ResetColor,
        )?;
        stdout.flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let trimmed = input.trim();
        if is_exit_command(trimmed) {
            return Ok(None);
        }
        Ok(Some(trimmed.to_string()))
    }

    /// Show a spinner/waiting indicator. Returns a handle to stop it.
    pub fn start_spinner(&self, message: &str) -> Result<SpinnerHandle> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{} ", message)),
            ResetColor,
        )?;
        stdout.flush()?;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = std::thread::spawn(move || {
            let frames = ['|', '/', '-', '\\'];
            let mut i = 0;
            while running_clone.load(Ordering::SeqCst) {
                let mut stdout = io::stdout();
                execute!(
                    stdout,
                    SetForegroundColor(Colors::DIM),
                    Print(format!("\r{} ", frames[i % frames.len()])),
                    ResetColor,
                )
                .ok();
                stdout.flush().ok();
                i += 1;
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            let mut stdout = io::stdout();
            execute!(stdout, Print("\r  \r")).ok();
            stdout.flush().ok();
        });

        Ok(SpinnerHandle {
            running,
            thread: Some(handle),
        })
    }

    /// Print the answer block, then tools, iterations and timing.
    pub fn print_response(&self, response: &AgentResponse, verbose: bool) -> Result<()> {
        let mut stdout = io::stdout();

        if verbose {
            for call in &response.tool_calls {
                let outcome = match (&call.error, call.success) {
                    (_, true) => "ok".to_string(),
                    (Some(err), false) => format!("failed: {err}"),
                    (None, false) => "failed".to_string(),
                };
                execute!(
                    stdout,
                    SetForegroundColor(Colors::TOOL_CALL),
                    Print(format!("[tool: {}] ", call.tool)),
                    ResetColor,
                    SetForegroundColor(Colors::DIM),
                    Print(format!("{} -> {}\n", call.arguments, outcome)),
                    ResetColor,
                )?;
            }
            for step in &response.thinking {
                execute!(
                    stdout,
                    SetForegroundColor(Colors::DIM),
                    Print(format!("  - {step}\n")),
                    ResetColor,
                )?;
            }
        }

        execute!(
            stdout,
            Print(format!("\n{RULE}\n")),
            SetForegroundColor(Colors::HEADER),
            Print("Answer:\n"),
            ResetColor,
            SetForegroundColor(Colors::ANSWER),
            Print(format!("{}\n", response.answer)),
            ResetColor,
            Print(format!("{RULE}\n")),
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", summary_line(response))),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an error message.
    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    /// Print an info message.
    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

/// `Tools used: [..] | Iterations: n | Time: nms`
pub fn summary_line(response: &AgentResponse) -> String {
    format!(
        "Tools used: [{}] | Iterations: {} | Time: {:.0}ms",
        response.tool_names().join(", "),
        response.iterations,
        response.total_time_ms
    )
}

/// Handle to a running spinner. Stopping (or dropping) joins the thread so
/// the spinner line is cleared before the next output.
pub struct SpinnerHandle {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl SpinnerHandle {
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            handle.join().ok();
        }
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statline_tool_runtime::ToolCallRecord;

    #[test]
    fn test_exit_commands() {
        for cmd in ["quit", "exit", "q", "QUIT"] {
            assert!(is_exit_command(cmd), "{cmd}");
        }
        assert!(!is_exit_command("quarterbacks"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn test_summary_line() {
        let response = AgentResponse {
            answer: "Joe Burrow".into(),
            tool_calls: vec![ToolCallRecord {
                tool: "rankings".into(),
                arguments: serde_json::json!({}),
                result: None,
                error: None,
                success: true,
            }],
            thinking: Vec::new(),
            total_time_ms: 1234.4,
            iterations: 2,
        };
        assert_eq!(
            summary_line(&response),
            "Tools used: [rankings] | Iterations: 2 | Time: 1234ms"
        );
    }
}
