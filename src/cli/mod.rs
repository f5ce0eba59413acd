mod commands;
mod formatter;
mod helper;

use std::io::Write;

use commands::{all_commands_info, Command};
use helper::CliHelper;
use rustyline::{error::ReadlineError, Editor};
use tracing::{info, warn};

use crate::context::{ContextError, SessionContext};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize the result: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No database called {0}")]
    UnknownDatabase(String),

    #[error("No table called {0}")]
    UnknownTable(String),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Record a statement that already ran in the history log, if that's
/// enabled. Failing to do so doesn't undo the statement, so it's only a
/// warning.
async fn record_history(ctx: &mut SessionContext, statement: &str, prompt: Option<String>) {
    if !ctx.config.misc.record_history {
        return;
    }
    if let Err(e) = ctx.append_history(statement, prompt).await {
        warn!("Couldn't add the statement to the history: {e}");
    }
}

/// Run the command text as one batch against the active database and write
/// the result (the last row set) as a JSON object
pub async fn run_one_off_command<W: Write>(
    ctx: &mut SessionContext,
    command: &str,
    mut output: W,
) -> Result<()> {
    let statement = command.trim();
    let result = ctx.execute(statement).await?;
    writeln!(output, "{}", serde_json::to_string(&result)?)?;
    record_history(ctx, statement, None).await;
    Ok(())
}

pub struct SqlbenchCli {
    ctx: SessionContext,
}

impl SqlbenchCli {
    // Instantiate new CLI instance
    pub fn new(ctx: SessionContext) -> Self {
        SqlbenchCli { ctx }
    }

    fn prompt(&self) -> String {
        match self.ctx.active_database() {
            Some(database) => format!("{}> ", database.name),
            None => "sqlbench> ".to_string(),
        }
    }

    // Interactive loop for running commands from a CLI
    pub async fn repl_loop(&mut self) -> rustyline::Result<()> {
        let mut rl = Editor::new()?;
        rl.set_helper(Some(CliHelper {}));
        rl.load_history(".sqlbench_history").ok();

        loop {
            match rl.readline(&self.prompt()) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) if line.starts_with('\\') => {
                    rl.add_history_entry(line.trim_end())?;
                    let command = line.split_whitespace().collect::<Vec<_>>().join(" ");
                    if let Ok(cmd) = command[1..].parse::<Command>() {
                        match cmd {
                            Command::Quit => break,
                            _ => {
                                if let Err(e) = self.handle_command(cmd).await {
                                    eprintln!("{e}")
                                }
                            }
                        }
                    } else {
                        eprintln!("'\\{}' is not a valid command, try \\?", &line[1..]);
                    }
                }
                Ok(line) => {
                    rl.add_history_entry(line.trim_end())?;

                    match self.exec_and_print(&line).await {
                        Ok(_) => {}
                        Err(err) => eprintln!("{err}"),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("\\q");
                    break;
                }
                Err(err) => {
                    eprintln!("Error while reading input: {err:?}",);
                    break;
                }
            }
        }

        rl.save_history(".sqlbench_history")
    }

    fn resolve(&self, target: &str) -> Result<String> {
        self.ctx
            .resolve_database(target)
            .map(|d| d.id.clone())
            .ok_or_else(|| CliError::UnknownDatabase(target.to_string()))
    }

    // Handle a client command
    async fn handle_command(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Help => println!("{}", formatter::format_help(&all_commands_info())),
            Command::ListDatabases => println!(
                "{}",
                formatter::format_databases(self.ctx.databases(), self.ctx.active_id())
            ),
            Command::Connect(target) => {
                let id = self.resolve(&target)?;
                self.ctx.switch_to(&id).await?;
            }
            Command::CreateDatabase { name, description } => {
                let record = self.ctx.create_database(&name, description).await?;
                println!("Created {} ({})", record.name, record.id);
            }
            Command::DropDatabase(target) => {
                let id = self.resolve(&target)?;
                self.ctx.delete_database(&id).await?;
                println!("Deleted {id}");
            }
            Command::ListTables => {
                println!("{}", formatter::format_tables(self.ctx.tables()))
            }
            Command::DescribeTable(name) => {
                let schema = self
                    .ctx
                    .tables()
                    .iter()
                    .find(|t| t.name.eq_ignore_ascii_case(&name))
                    .ok_or_else(|| CliError::UnknownTable(name.clone()))?;
                println!("{}", formatter::format_columns(schema));
            }
            Command::History => {
                println!("{}", formatter::format_history(self.ctx.history()))
            }
            Command::ToggleFavorite(id) => {
                let entry = self.ctx.toggle_favorite(&id).await?;
                println!(
                    "{} is {}a favorite",
                    entry.id,
                    if entry.is_favorite { "" } else { "no longer " }
                );
            }
            Command::RemoveHistory(id) => self.ctx.remove_history(&id).await?,
            Command::Save => {
                self.ctx.persist_now().await?;
                println!("Saved");
            }
            Command::Ask(prompt) => {
                let generated = self.ctx.generate_and_execute(&prompt).await?;
                println!("{}", generated.statement);
                println!("{}", formatter::format_result(&generated.result));
                record_history(&mut self.ctx, &generated.statement, Some(prompt)).await;
            }
            Command::Import { path, name } => {
                let image = tokio::fs::read(&path).await?;
                let record = self
                    .ctx
                    .import_database(&image, &name, Some(format!("Imported from {path}")))
                    .await?;
                println!("Imported {} ({})", record.name, record.id);
            }
            Command::Export(path) => {
                let image = self.ctx.export_active()?;
                tokio::fs::write(&path, &image).await?;
                info!("Exported {} bytes to {path}", image.len());
            }
            Command::Quit => {
                panic!("Unexpected quit, this should be handled in the repl loop")
            }
        }
        Ok(())
    }

    // Execute provided statement(s) and print the output
    async fn exec_and_print(&mut self, query: &str) -> Result<()> {
        let statement = query.trim();
        let result = self.ctx.execute(statement).await?;
        println!("{}", formatter::format_result(&result));
        record_history(&mut self.ctx, statement, None).await;
        Ok(())
    }
}
