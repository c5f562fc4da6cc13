//! privfs REPL: an interactive front-end for the private file store.
//!
//! Each action of the store is a command working on the session state:
//!
//! - `name`, `content`, `dir` set the file name, file content and
//!   directory name
//! - `write`, `read`, `save`, `delete`, `mkdir`, `import`, `ls` run a
//!   store operation and print its status line
//! - Meta-commands: `/help`, `/quit`, `/state`

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use privfs_kernel::config::SessionConfig;
use privfs_kernel::{
    open_store, paths, Action, Config, ExportCapabilities, ExportKind, FileStore, ImportSource,
    OperationError, Session,
};

/// REPL state: a session and the runtime its actions run on.
pub struct Repl {
    runtime: tokio::runtime::Runtime,
    session: Session,
    quit: bool,
}

impl Repl {
    /// Create a REPL as configured, probing the terminal for a save dialog.
    pub fn new(config: &Config) -> Result<Self> {
        let store = open_store(config, ExportCapabilities::probe());
        Self::with_store(store, &config.session)
    }

    /// Create a REPL around an existing store.
    pub fn with_store(store: FileStore, initial: &SessionConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        Ok(Self {
            runtime,
            session: Session::new(store, initial),
            quit: false,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True once `/quit` has been entered.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Process a single line of input.
    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        let trimmed = line.trim();

        // Handle meta-commands
        if trimmed.starts_with('/') {
            return Ok(Some(self.handle_meta_command(trimmed)));
        }

        // Skip empty lines
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (command, rest) = split_command(line.trim_start());
        let session = &mut self.session;
        let output = match command {
            "name" => {
                session.set_file_name(rest.trim());
                return Ok(None);
            }
            "content" => {
                session.set_file_content(rest);
                return Ok(None);
            }
            "dir" => {
                session.set_directory_name(rest.trim());
                return Ok(None);
            }
            "write" => self.runtime.block_on(session.write()).to_string(),
            "read" => self.runtime.block_on(session.read()).to_string(),
            "save" => self.runtime.block_on(session.save_to_os()).to_string(),
            "delete" => self.runtime.block_on(session.delete()).to_string(),
            "mkdir" => self.runtime.block_on(session.create_directory()).to_string(),
            "ls" => {
                let dir = Some(rest.trim()).filter(|d| !d.is_empty());
                self.runtime.block_on(session.list(dir)).to_string()
            }
            "import" => {
                let path = rest.trim();
                if path.is_empty() {
                    return Ok(Some("Usage: import <path>".to_string()));
                }
                self.runtime.block_on(async {
                    match ImportSource::open(path).await {
                        Ok(source) => session.import(source).await.to_string(),
                        Err(e) => session
                            .report(OperationError::from_io(Action::ImportingFile, e).to_string())
                            .to_string(),
                    }
                })
            }
            _ => {
                return Ok(Some(format!(
                    "Unknown command: {command}\nType /help for available commands."
                )));
            }
        };
        Ok(Some(output))
    }

    /// Handle a meta-command (starts with /).
    fn handle_meta_command(&mut self, cmd: &str) -> String {
        let command = cmd.split_whitespace().next().unwrap_or("");

        match command {
            "/quit" | "/q" | "/exit" => {
                self.quit = true;
                "Bye.".to_string()
            }
            "/help" | "/h" | "/?" => HELP_TEXT.to_string(),
            "/state" => self.format_state(),
            _ => format!("Unknown command: {command}\nType /help for available commands."),
        }
    }

    fn format_state(&self) -> String {
        let session = &self.session;
        let export = match session.store().export_kind() {
            ExportKind::InteractivePicker => "save dialog",
            ExportKind::DownloadLink => "download",
        };
        format!(
            "file name:  {}\ncontent:    {:?}\ndirectory:  {}\nexport:     {}\nlast:       {}",
            session.file_name(),
            session.file_content(),
            session.directory_name(),
            export,
            session.output().unwrap_or("(none)"),
        )
    }
}

/// Split `line` into its first word and the rest after one separator.
///
/// The rest is kept verbatim so `content` can hold leading or repeated
/// spaces.
fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest),
        None => (line, ""),
    }
}

const HELP_TEXT: &str = r#"privfs: private file store REPL

State:
  name <file>       Set the file name
  content <text>    Set the file content (rest of the line)
  dir <name>        Set the directory name

Actions:
  write             Write the content to the file
  read              Read the file
  save              Save the file to the OS (save dialog or download)
  delete            Delete the file
  mkdir             Create the directory
  import <path>     Import a file from the OS into the directory
  ls [dir]          List the root or a directory

Commands:
  /state            Show the current state
  /help, /h, /?     Show this help
  /quit, /q, /exit  Exit the REPL"#;

/// Print a status line, coloured by outcome.
fn print_output(output: &str) {
    if output.starts_with("Error ") {
        println!("{}", output.red());
    } else if output.starts_with("File ") || output.starts_with("Directory ") {
        println!("{}", output.green());
    } else {
        println!("{output}");
    }
}

/// Run commands non-interactively, printing each output.
pub fn run_commands(repl: &mut Repl, commands: &[String]) -> Result<()> {
    for command in commands {
        if let Some(output) = repl.process_line(command)? {
            print_output(&output);
        }
        if repl.should_quit() {
            break;
        }
    }
    Ok(())
}

/// Run the interactive REPL.
pub fn run(mut repl: Repl) -> Result<()> {
    println!("privfs v{}", env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands, /quit to exit.\n");

    let mut rl: Editor<(), DefaultHistory> = Editor::new().context("Failed to create editor")?;

    // Load history if it exists
    let history_path = paths::data_dir().join("history.txt");
    let _ = rl.load_history(&history_path);

    while !repl.should_quit() {
        match rl.readline("privfs> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                match repl.process_line(&line) {
                    Ok(Some(output)) => print_output(&output),
                    Ok(None) => {}
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    // Save history
    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = rl.save_history(&history_path) {
        tracing::debug!(error = %e, "could not save history");
    }

    Ok(())
}
