use super::commands::{Command, COMMAND_BOX};
use super::typing::reveal;
use crate::config::{UiConfig, UiVariant};
use crate::error::{Result, SessionError};
use crate::models::{ChatRequest, Message, Role};
use crate::relay::ChatBackend;
use crate::renderer::{normalize, MarkdownRenderer};
use crate::session::{ChatSession, ERROR_PREFIX};
use colored::*;
use rustyline::{config::Configurer, error::ReadlineError, DefaultEditor};
use std::io::{self, Write};
use std::path::PathBuf;
use terminal_size::{terminal_size, Width};
use tracing::{debug, warn};

const TITLE: &str = "🤖 AI Model Hub";
const HISTORY_FILE: &str = ".model_hub_history";

pub struct TerminalUI<B: ChatBackend> {
    backend: B,
    session: ChatSession,
    renderer: MarkdownRenderer,
    editor: DefaultEditor,
    history_file: PathBuf,
    config: UiConfig,
    width: usize,
}

impl<B: ChatBackend> TerminalUI<B> {
    pub fn new(backend: B, config: UiConfig) -> Result<Self> {
        let width = match terminal_size() {
            Some((Width(w), _)) => (w as usize).saturating_sub(2),
            None => 80,
        };

        let mut editor = DefaultEditor::new()?;
        editor.set_max_history_size(100)?;

        let history_file = dirs::home_dir()
            .map(|mut path| {
                path.push(HISTORY_FILE);
                path
            })
            .unwrap_or_else(|| HISTORY_FILE.into());

        if history_file.exists() {
            let _ = editor.load_history(&history_file);
        }

        Ok(Self {
            backend,
            session: ChatSession::default(),
            renderer: MarkdownRenderer::new(width),
            editor,
            history_file,
            config,
            width,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.show_welcome()?;

        loop {
            let prompt = self.prompt();
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.editor.add_history_entry(line.as_str())?;
                    match line.parse::<Command>() {
                        Ok(Command::Exit) => break,
                        Ok(command) => self.handle_command(command).await?,
                        Err(usage) => println!("{}", usage.yellow()),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Use 'exit' to quit");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("Error: {}", err);
                    break;
                }
            }
        }

        if let Err(err) = self.editor.save_history(&self.history_file) {
            warn!(error = %err, path = ?self.history_file, "could not save input history");
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        match self.config.variant {
            UiVariant::Hub => format!("{}", format!("{} > ", self.session.active().profile.id).blue().bold()),
            UiVariant::Plain => format!("{}", "> ".blue().bold()),
        }
    }

    async fn handle_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Message(text) => {
                let request = match self.session.submit(&text) {
                    Ok(request) => request,
                    Err(err) => return self.notice(err),
                };
                if self.config.variant == UiVariant::Plain {
                    println!("{} {}", "🧑 You:".bold(), text);
                }
                self.exchange(request).await?;
            }
            Command::Regenerate => match self.session.regenerate() {
                Ok(Some(request)) => {
                    self.redraw()?;
                    self.exchange(request).await?;
                }
                Ok(None) => println!("{}", "Nothing to regenerate yet.".yellow()),
                Err(err) => return self.notice(err),
            },
            Command::Undo => match self.session.undo() {
                Ok(0) => println!("{}", "Nothing to undo.".yellow()),
                Ok(removed) => {
                    debug!(removed, "undo");
                    self.redraw()?;
                }
                Err(err) => return self.notice(err),
            },
            Command::Clear => match self.session.clear() {
                Ok(()) => {
                    self.redraw()?;
                    println!("{}", "Starting a fresh conversation...".green());
                }
                Err(err) => return self.notice(err),
            },
            Command::Models => self.show_models(),
            Command::Model(id) => match self.session.select_model(&id) {
                Ok(_) => self.redraw()?,
                Err(err) => return self.notice(err),
            },
            Command::Settings => self.show_settings(),
            Command::System(prompt) => {
                self.session.config_mut().system_prompt = prompt;
                self.show_settings();
            }
            Command::Temperature(value) => {
                let applied = self.session.config_mut().set_temperature(value);
                println!("{}", format!("Temperature set to {applied:.1}").green());
            }
            Command::MaxTokens(value) => {
                let applied = self.session.config_mut().set_max_tokens(value);
                println!("{}", format!("Max tokens set to {applied}").green());
            }
            Command::Help => self.show_command_box(),
            Command::Exit => {}
        }
        Ok(())
    }

    /// Sends the pending request and shows whatever comes back, error or reply.
    async fn exchange(&mut self, request: ChatRequest) -> Result<()> {
        let reply = self
            .session
            .dispatch(&self.backend, request, || {
                print!("{}", "Thinking...".yellow());
                let _ = io::stdout().flush();
            })
            .await?
            .clone();

        print!("\r{}\r", " ".repeat(self.width));
        self.print_reply(&reply).await?;
        println!();
        Ok(())
    }

    async fn print_reply(&self, message: &Message) -> Result<()> {
        let failed = message.content.starts_with(ERROR_PREFIX);

        match self.config.variant {
            UiVariant::Plain => {
                let line = format!("{} {}", "🤖 Bot:".bold(), message.content);
                if failed {
                    println!("{}", line.red());
                } else {
                    println!("{}", line);
                }
            }
            UiVariant::Hub if failed => {
                println!("{}", format!("  {}", message.content).red());
            }
            UiVariant::Hub => {
                let rendered = self.renderer.render(&normalize(&message.content));
                let styled = format!("{}", rendered.cyan());
                reveal(&mut io::stdout(), &styled, self.config.typing_delay).await?;
                println!();
            }
        }
        Ok(())
    }

    fn redraw(&self) -> Result<()> {
        if self.config.variant == UiVariant::Plain {
            return Ok(());
        }
        clearscreen::clear()?;
        self.show_header();
        Ok(())
    }

    /// Re-prints the active transcript without the typing effect.
    fn show_transcript(&self) {
        for message in self.session.transcript().messages() {
            match message.role {
                Role::User => println!("{}{}\n", "> ".blue().bold(), message.content),
                Role::Assistant if message.content.starts_with(ERROR_PREFIX) => {
                    println!("{}\n", format!("  {}", message.content).red())
                }
                Role::Assistant => {
                    println!("{}\n", self.renderer.render(&normalize(&message.content)).cyan())
                }
            }
        }
    }

    fn show_welcome(&self) -> Result<()> {
        match self.config.variant {
            UiVariant::Hub => {
                clearscreen::clear()?;
                println!("{}", TITLE.bold());
                println!();
                self.show_command_box();
                self.show_header();
            }
            UiVariant::Plain => {
                println!("{}", "## 💬 Simple Chatbot".bold());
                println!("{}", "Type a message, or 'exit' to quit.".dimmed());
                println!();
            }
        }
        Ok(())
    }

    fn show_header(&self) {
        let active = self.session.active();
        println!(
            "{}",
            format!("{} {}", active.profile.icon, active.config.name).bold()
        );
        println!("{}", format!("Backend: {}", self.config.backend_url).dimmed());
        println!();
        self.show_transcript();
    }

    fn show_command_box(&self) {
        println!("{}", COMMAND_BOX.green());
        println!();
    }

    fn show_models(&self) {
        let active = self.session.active().profile.id;
        for model in self.session.models() {
            let marker = if model.profile.id == active { "●" } else { " " };
            let line = format!(
                "{marker} {} {} ({})",
                model.profile.icon, model.config.name, model.profile.id
            );
            if model.config.enabled {
                println!("{}", line);
            } else {
                println!("{} {}", line.dimmed(), "🔴");
            }
        }
        println!();
    }

    fn show_settings(&self) {
        let active = self.session.active();
        println!(
            "{}",
            format!("{} {} Settings", active.profile.icon, active.config.name).bold()
        );
        println!("  System prompt: {}", active.config.system_prompt);
        println!("  Temperature:   {:.1}", active.config.temperature());
        println!("  Max tokens:    {}", active.config.max_tokens());
        println!();
    }

    fn notice(&self, err: SessionError) -> Result<()> {
        println!("{}", err.to_string().yellow());
        Ok(())
    }
}
