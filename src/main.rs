//! scoped-console - an interactive console of scoped, dot-addressable commands.

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::style::{Color as TermColor, Print, ResetColor, SetForegroundColor};
use crossterm::{queue, tty::IsTty};
use scoped_console::cli::Cli;
use scoped_console::config::Config;
use scoped_console::console::{Console, ConsoleLog, LogLine};
use scoped_console::demo::{self, Fleet};
use scoped_console::error::{ConsoleError, Result};
use scoped_console::logging::{self, LogTarget};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config.console);

    let target = LogTarget::select(config.console.log_file.as_deref(), !cli.is_batch());
    if let Err(e) = logging::init(&target, config.console.debug) {
        eprintln!("Warning: {e}; tracing to stderr");
        logging::init(&LogTarget::Stderr, config.console.debug)?;
    }
    info!("Loaded config from: {}", config_path.display());

    let console = Console::new(&config.console)?;
    let fleet = Arc::new(Fleet::with_ships(["Aurora", "Borealis"]));
    console.submit_modules([demo::module(fleet)]);

    let mut printer = LogPrinter::new(console.log());

    if cli.is_batch() {
        for path in &cli.execute {
            console.try_execute_command(path).await?;
            printer.flush(console.log())?;
        }
        if let Some(script) = &cli.script {
            run_script(&console, &mut printer, script).await?;
        }
        return Ok(());
    }

    repl(&console, &mut printer).await
}

/// Runs every line of `script` ("-" reads stdin). Blank lines and lines
/// starting with `#` are skipped.
async fn run_script(console: &Console, printer: &mut LogPrinter, script: &str) -> Result<()> {
    let content = if script == "-" {
        let mut content = String::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ConsoleError::runtime(format!("Failed to read stdin: {e}")))?
        {
            content.push_str(&line);
            content.push('\n');
        }
        content
    } else {
        tokio::fs::read_to_string(script)
            .await
            .map_err(|e| ConsoleError::runtime(format!("Failed to read script {script}: {e}")))?
    };

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        console.try_execute_command(line).await?;
        printer.flush(console.log())?;
    }
    Ok(())
}

async fn repl(console: &Console, printer: &mut LogPrinter) -> Result<()> {
    console.wait_loaded().await;
    println!("scoped-console v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' to list commands, 'quit' to exit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout()
            .flush()
            .map_err(|e| ConsoleError::runtime(format!("Failed to write prompt: {e}")))?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ConsoleError::runtime(format!("Failed to read input: {e}")))?
        else {
            break;
        };

        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            _ => {}
        }

        // Unhandled failures only surface here in debug mode; keep the
        // session alive and show them.
        if let Err(e) = console.try_execute_command(line).await {
            console.log().error(format!("{}: {}", e.category(), e));
        }
        printer.flush(console.log())?;
    }
    Ok(())
}

/// Prints log lines that appeared since the previous flush.
struct LogPrinter {
    cursor: u64,
    colored: bool,
}

impl LogPrinter {
    fn new(log: &ConsoleLog) -> Self {
        Self {
            cursor: log.cursor(),
            colored: io::stdout().is_tty(),
        }
    }

    fn flush(&mut self, log: &ConsoleLog) -> Result<()> {
        let (lines, cursor) = log.lines_since(self.cursor);
        self.cursor = cursor;

        let mut out = io::stdout().lock();
        for line in &lines {
            self.print_line(&mut out, line)
                .map_err(|e| ConsoleError::runtime(format!("Failed to write output: {e}")))?;
        }
        out.flush()
            .map_err(|e| ConsoleError::runtime(format!("Failed to write output: {e}")))
    }

    fn print_line(&self, out: &mut impl Write, line: &LogLine) -> io::Result<()> {
        match line.color {
            Some(color) if self.colored => queue!(
                out,
                SetForegroundColor(TermColor::Rgb {
                    r: color.r,
                    g: color.g,
                    b: color.b,
                }),
                Print(&line.text),
                ResetColor,
                Print("\n")
            ),
            _ => writeln!(out, "{}", line.text),
        }
    }
}
