/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `chat`: interactive tutoring chat
- `sessions`: list and print stored sessions

Both open the configured session store; only `chat` talks to a model.
*/

use crate::chat::ERROR_MESSAGE;
use crate::config::Config;
use crate::error::Result;
use crate::providers::Role;
use crate::render::message_to_ansi;
use crate::session::{Session, SessionListEntry, SessionStore};
use crate::storage::SqliteStore;
use colored::Colorize;
use prettytable::{format, Table};

// Special commands parser for the chat loop
pub mod special_commands;

/// Open the session store at the configured location and restore it
fn open_store(config: &Config) -> Result<SessionStore> {
    let backend = match &config.storage.path {
        Some(path) => SqliteStore::new_with_path(path)?,
        None => SqliteStore::new()?,
    };
    Ok(SessionStore::open(Box::new(backend)))
}

/// Print a session transcript with terminal formatting
fn print_transcript(session: &Session) {
    println!("{}\n", format!("── {} ({}) ──", session.title, session.id).bold());
    for message in &session.messages {
        let rendered = message_to_ansi(message);
        if rendered.is_empty() {
            continue;
        }
        match message.role {
            Role::User => println!("{}\n{}", "You:".blue().bold(), rendered),
            Role::Model => println!("{}\n{}", "Tutor:".magenta().bold(), rendered),
        }
    }
}

/// Print session list entries as a numbered table
fn print_session_table(entries: &[SessionListEntry]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "#".bold(),
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        ""
    ]);

    for (index, entry) in entries.iter().enumerate() {
        let title: String = if entry.title.chars().count() > 40 {
            format!("{}...", entry.title.chars().take(37).collect::<String>())
        } else {
            entry.title.clone()
        };
        let marker = if entry.active { "active".green() } else { "".normal() };

        table.add_row(prettytable::row![
            index + 1,
            entry.id.cyan(),
            title,
            entry.message_count,
            marker
        ]);
    }

    table.printstd();
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Opens the session store, creates the model client, and runs a
    //! readline-based loop that sends each line to the tutor and prints the
    //! reply as it streams in.

    use super::special_commands::{parse_special_command, print_help, SessionRef, SpecialCommand};
    use super::*;
    use crate::app::{ChatApp, SendOutcome};
    use crate::attachment::load_image;
    use crate::error::CtutorError;
    use crate::prompts::QUICK_START_PROMPTS;
    use crate::providers::{create_client, InlineImage, Message};
    use crate::render::{render_message, ProseLine, Segment, Span};
    use crate::session::session_list;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::io::Write;

    /// Start interactive chat
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `provider_name` - Optional override for the configured provider
    /// * `resume` - Optional session id to make active before the first prompt
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened, the provider is unknown,
    /// the resumed session does not exist, or the terminal cannot be read.
    pub async fn run_chat(
        config: Config,
        provider_name: Option<String>,
        resume: Option<String>,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let store = open_store(&config)?;
        let client = create_client(&config.provider, provider_name.as_deref())?;
        tracing::info!("Using model {}", client.model_name());
        let mut app = ChatApp::new(store, Some(client), &config.chat);

        if let Some(id) = &resume {
            app.select_session(id)?;
        }

        print_welcome_banner();
        if let Some(session) = app.active_session() {
            print_transcript(session);
        }

        let mut rl = DefaultEditor::new()?;
        let mut pending_image: Option<InlineImage> = None;

        loop {
            report_titles(&mut app);

            let prompt = format_prompt(app.active_session(), pending_image.is_some());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    rl.add_history_entry(trimmed)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::NewChat => {
                            app.new_chat();
                            println!("{}\n", "Started a new chat.".green());
                        }
                        SpecialCommand::ListSessions => {
                            let entries = session_list(app.store());
                            if entries.is_empty() {
                                println!("{}\n", "No chats yet.".yellow());
                            } else {
                                print_session_table(&entries);
                                println!();
                            }
                        }
                        SpecialCommand::Switch(target) => {
                            match switch_session(&mut app, target) {
                                Ok(()) => {
                                    if let Some(session) = app.active_session() {
                                        print_transcript(session);
                                    }
                                }
                                Err(e) => eprintln!("{}\n", format!("{:#}", e).red()),
                            }
                        }
                        SpecialCommand::AttachImage(path) => {
                            match load_image(&path, config.chat.max_image_bytes) {
                                Ok(image) => {
                                    println!(
                                        "{}\n",
                                        format!(
                                            "Attached {} ({}); it will be sent with your next message.",
                                            path.display(),
                                            image.mime_type
                                        )
                                        .green()
                                    );
                                    pending_image = Some(image);
                                }
                                Err(e) => eprintln!("{}\n", format!("{:#}", e).red()),
                            }
                        }
                        SpecialCommand::ClearImage => {
                            pending_image = None;
                            println!("{}\n", "Attachment cleared.".green());
                        }
                        SpecialCommand::QuickStart(n) => {
                            let text = QUICK_START_PROMPTS[n - 1];
                            println!("{} {}", ">".blue().bold(), text);
                            send(&mut app, text, pending_image.take()).await?;
                        }
                        SpecialCommand::Help => print_help(),
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {
                            send(&mut app, trimmed, pending_image.take()).await?;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        report_titles(&mut app);
        println!("Goodbye!");
        Ok(())
    }

    /// Send one message and print the reply as it streams
    async fn send(app: &mut ChatApp, text: &str, image: Option<InlineImage>) -> Result<()> {
        let mut live = LiveText::default();
        println!("{}", "Tutor:".magenta().bold());

        let outcome = app
            .send_message(text, image, |session| {
                if let Some(last) = session.last_message() {
                    if let Some(delta) = live.advance(&last.content) {
                        print!("{}", delta);
                        if let Err(e) = std::io::stdout().flush() {
                            tracing::debug!("Failed to flush stdout: {}", e);
                        }
                    }
                }
            })
            .await;

        match outcome {
            Ok(SendOutcome::Completed { reply, .. }) => match format_reply(&reply) {
                Some(formatted) => println!("\n{}", formatted),
                None => println!("\n"),
            },
            Ok(SendOutcome::Failed { error, .. }) => {
                tracing::debug!("Reply failed: {}", error);
                println!("\n{}\n", ERROR_MESSAGE.red());
            }
            Ok(SendOutcome::Ignored) => {}
            Err(e) => match e.downcast_ref::<CtutorError>() {
                Some(CtutorError::Busy) => eprintln!("{}\n", e.to_string().yellow()),
                _ => return Err(e),
            },
        }

        Ok(())
    }

    fn switch_session(app: &mut ChatApp, target: SessionRef) -> Result<()> {
        let id = match target {
            SessionRef::Id(id) => id,
            SessionRef::Index(n) => session_list(app.store())
                .into_iter()
                .nth(n - 1)
                .map(|entry| entry.id)
                .ok_or_else(|| CtutorError::SessionNotFound(format!("#{}", n)))?,
        };
        app.select_session(&id)
    }

    fn report_titles(app: &mut ChatApp) {
        for update in app.apply_title_updates() {
            tracing::debug!("Session {} titled {}", update.session_id, update.title);
            println!("{}\n", format!("Titled: {}", update.title).dimmed());
        }
    }

    /// Formatted copy of a streamed reply, shown below the raw text
    ///
    /// Returns `None` when the reply carries no code blocks or markup, so
    /// plain replies are not printed twice.
    pub(crate) fn format_reply(reply: &str) -> Option<String> {
        let message = Message::model(reply);
        let formatted = render_message(&message).iter().any(|segment| match segment {
            Segment::Code { .. } => true,
            Segment::Prose(prose) => prose.lines.iter().any(|line| match line {
                ProseLine::Rule | ProseLine::ListItem(_) => true,
                ProseLine::Paragraph(spans) => {
                    spans.iter().any(|span| !matches!(span, Span::Text(_)))
                }
            }),
        });
        if !formatted {
            return None;
        }

        Some(format!(
            "{}\n{}",
            "─".repeat(40).dimmed(),
            message_to_ansi(&message)
        ))
    }

    /// Build the readline prompt for the active session
    fn format_prompt(session: Option<&Session>, image_pending: bool) -> String {
        let label = match session {
            Some(session) => session.title.clone(),
            None => "new chat".to_string(),
        };
        let attachment = if image_pending { " [image]" } else { "" };
        format!("[{}]{} >> ", label.cyan(), attachment.yellow())
    }

    /// Display welcome banner at the start of interactive chat
    fn print_welcome_banner() {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║            C Programming Tutor - Welcome!                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Your AI assistant for C, from K&R C through C23.\n");
        println!("Quick start:");
        for (index, prompt) in QUICK_START_PROMPTS.iter().enumerate() {
            println!("  {} {}", format!("/quick {}", index + 1).cyan(), prompt);
        }
        println!("\nType '/help' for available commands, 'exit' to quit\n");
    }

    /// Tracks how much of a streaming reply has been printed
    #[derive(Debug, Default)]
    pub(crate) struct LiveText {
        shown: String,
    }

    impl LiveText {
        /// New text to print for the reply now reading `content`
        ///
        /// Returns `None` when nothing was appended, including when the
        /// reply was replaced rather than extended.
        pub(crate) fn advance(&mut self, content: &str) -> Option<String> {
            if content.len() <= self.shown.len() || !content.starts_with(&self.shown) {
                return None;
            }
            let delta = content[self.shown.len()..].to_string();
            self.shown = content.to_string();
            Some(delta)
        }
    }

}

// Session inspection handler
pub mod sessions {
    //! Non-interactive session inspection.

    use super::*;
    use crate::cli::SessionsCommand;
    use crate::error::CtutorError;
    use crate::session::session_list;

    /// Handle `ctutor sessions` subcommands
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be opened or `show` names an
    /// unknown session
    pub fn handle_sessions(config: &Config, command: SessionsCommand) -> Result<()> {
        let store = open_store(config)?;

        match command {
            SessionsCommand::List => {
                let entries = session_list(&store);
                if entries.is_empty() {
                    println!("{}", "No stored chats found.".yellow());
                    return Ok(());
                }

                println!("\nStored Chats:");
                print_session_table(&entries);
                println!();
                println!(
                    "Use {} to continue a chat.",
                    "ctutor chat --resume <ID>".cyan()
                );
                println!();
            }
            SessionsCommand::Show { id } => {
                let session = store
                    .get(&id)
                    .ok_or_else(|| CtutorError::SessionNotFound(id.clone()))?;
                print_transcript(session);
            }
        }

        Ok(())
    }

}
