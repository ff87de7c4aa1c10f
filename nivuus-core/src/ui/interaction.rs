use anyhow::{Context, Result};
use async_trait::async_trait;
use console::style;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::time::Duration;

/// Things the loop reports to the user while it works
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent<'a> {
    Assistant(&'a str),
    ToolRequested { name: &'a str, arguments: &'a str },
    ToolFinished { name: &'a str, success: bool },
    CommandOutput(&'a str),
    ModelCallStarted,
    ModelCallFinished,
    /// Recoverable problem, the loop keeps going
    Diagnostic(&'a str),
    Retrying { attempt: u32, delay: Duration },
    Fatal(&'a str),
}

/// User-facing collaborator of the conversation loop
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Free-text input. An error means the input channel is gone.
    async fn prompt_text(&self, label: &str) -> Result<String>;

    /// Pick one of `options`, returning the chosen text
    async fn prompt_choice(&self, label: &str, options: &[String]) -> Result<String>;

    async fn confirm(&self, label: &str) -> Result<bool>;

    fn notify(&self, event: LoopEvent<'_>);
}

/// Interactive terminal front end
#[derive(Default)]
pub struct ConsoleInteraction {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_spinner(&self) {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg:.dim}")
        {
            pb.set_style(spinner_style);
        }
        pb.set_message("Thinking...");
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Some(previous) = self.spinner.lock().replace(pb) {
            previous.finish_and_clear();
        }
    }

    fn stop_spinner(&self) {
        if let Some(pb) = self.spinner.lock().take() {
            pb.finish_and_clear();
        }
    }
}

#[async_trait]
impl UserInteraction for ConsoleInteraction {
    async fn prompt_text(&self, label: &str) -> Result<String> {
        self.stop_spinner();
        let label = label.to_string();
        tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(label)
                .allow_empty(true)
                .interact_text()
        })
        .await
        .context("Input task failed")?
        .context("Failed to read user input")
    }

    async fn prompt_choice(&self, label: &str, options: &[String]) -> Result<String> {
        self.stop_spinner();
        let label = label.to_string();
        let items = options.to_vec();
        let selection = tokio::task::spawn_blocking(move || {
            Select::new()
                .with_prompt(label)
                .default(0)
                .items(&items)
                .interact()
                .map(|index| items.get(index).cloned().unwrap_or_default())
        })
        .await
        .context("Selection task failed")?
        .context("Failed to read selection")?;
        Ok(selection)
    }

    async fn confirm(&self, label: &str) -> Result<bool> {
        self.stop_spinner();
        let label = label.to_string();
        tokio::task::spawn_blocking(move || {
            Confirm::new().with_prompt(label).default(false).interact()
        })
        .await
        .context("Confirmation task failed")?
        .context("Failed to read confirmation")
    }

    fn notify(&self, event: LoopEvent<'_>) {
        match event {
            LoopEvent::ModelCallStarted => self.start_spinner(),
            LoopEvent::ModelCallFinished => self.stop_spinner(),
            LoopEvent::Assistant(text) => {
                self.stop_spinner();
                println!("{} {}", style("Agent:").cyan().bold(), text);
            }
            LoopEvent::ToolRequested { name, arguments } => {
                println!(
                    "{} {} {}",
                    style("[TOOL]").blue().bold(),
                    style(name).cyan(),
                    style(arguments).dim()
                );
            }
            LoopEvent::ToolFinished { name, success } => {
                if success {
                    println!("{} {}", style("[DONE]").green(), style(name).dim());
                } else {
                    println!("{} {}", style("[FAILED]").red(), style(name).dim());
                }
            }
            LoopEvent::CommandOutput(output) => {
                println!("{}", style(output).dim());
            }
            LoopEvent::Diagnostic(message) => {
                self.stop_spinner();
                eprintln!("{} {}", style("Warning:").yellow().bold(), message);
            }
            LoopEvent::Retrying { attempt, delay } => {
                eprintln!(
                    "{}",
                    style(format!(
                        "Retrying model call (attempt {attempt}) in {:.1}s",
                        delay.as_secs_f32()
                    ))
                    .yellow()
                );
            }
            LoopEvent::Fatal(message) => {
                self.stop_spinner();
                eprintln!("{} {}", style("Error:").red().bold(), message);
            }
        }
    }
}
