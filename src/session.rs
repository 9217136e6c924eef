use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::backend::Backend;
use crate::command::{Command, ConfigOp, Input, classify};
use crate::config::{self, Config};
use crate::context::{self, ContextLimits};
use crate::conversation::Conversation;
use crate::error::SessionError;
use crate::fs_tools;
use crate::util::ask_or_eof;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureKind {
    Create,
    Append,
}

struct Capture {
    kind: CaptureKind,
    path: PathBuf,
    lines: Vec<String>,
}

/// The interactive read-classify-execute-print cycle. Owns the working
/// directory, the settings record, and the conversation; one iteration
/// completes (including any backend call) before the next read.
pub struct Session {
    cwd: PathBuf,
    config: Config,
    config_path: PathBuf,
    limits: ContextLimits,
    conversation: Conversation,
    backend: Box<dyn Backend>,
    capture: Option<Capture>,
}

impl Session {
    pub fn new(
        cwd: PathBuf,
        config: Config,
        config_path: PathBuf,
        backend: Box<dyn Backend>,
    ) -> Self {
        let conversation = Conversation::new(&cwd);
        Self {
            cwd,
            config,
            config_path,
            limits: ContextLimits::default(),
            conversation,
            backend,
            capture: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("confab - your AI coding assistant");
        println!("Type \"/exit\" to quit or \"/help\" for commands");
        println!("Working directory: {}", self.cwd.display());
        if self.config.api_key.trim().is_empty() && !self.config.debug {
            println!("Tip: no API key configured. Set one with /config set apiKey <key>");
        }
        println!();

        loop {
            let line = match ask_or_eof(&self.prompt()) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    println!("Error: {}", SessionError::Fatal(err.to_string()));
                    break;
                }
            };
            if self.capture.is_some() {
                self.handle_capture_line(&line);
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            match self.execute_line(&line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(err) => println!("Error: {err}"),
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn prompt(&self) -> String {
        let dir = self
            .cwd
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.cwd.display().to_string());
        match &self.capture {
            Some(capture) => match capture.kind {
                CaptureKind::Create => format!("[{dir}] edit> "),
                CaptureKind::Append => format!("[{dir}] append> "),
            },
            None => format!("[{dir}]> "),
        }
    }

    async fn execute_line(&mut self, line: &str) -> Result<Flow, SessionError> {
        match classify(line)? {
            Input::Command(cmd) => self.execute(cmd),
            Input::Chat(text) => {
                self.chat(&text).await?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute(&mut self, cmd: Command) -> Result<Flow, SessionError> {
        match cmd {
            Command::Help => self.print_help(),
            Command::Exit => return Ok(Flow::Quit),
            Command::Pwd => println!("{}", self.cwd.display()),
            Command::Ls(path) => self.cmd_ls(path)?,
            Command::Tree(path) => self.cmd_tree(path)?,
            Command::Cat(path) => self.cmd_cat(&path)?,
            Command::Write(path) => self.begin_capture(CaptureKind::Create, &path)?,
            Command::Append(path) => self.begin_capture(CaptureKind::Append, &path)?,
            Command::Cd(path) => self.cmd_cd(&path)?,
            Command::Mkdir(path) => self.cmd_mkdir(&path)?,
            Command::Config(op) => self.cmd_config(op)?,
            Command::Context(path) => self.cmd_context(path)?,
        }
        Ok(Flow::Continue)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.cwd.join(path) }
    }

    fn target_or_cwd(&self, path: Option<PathBuf>) -> PathBuf {
        match path {
            Some(path) => self.resolve(&path),
            None => self.cwd.clone(),
        }
    }

    fn cmd_ls(&self, path: Option<PathBuf>) -> Result<(), SessionError> {
        let target = self.target_or_cwd(path);
        let entries = fs_tools::list_dir(&target)?;
        println!("Contents of: {}", target.display());
        if entries.is_empty() {
            println!("  (empty)");
        } else {
            for entry in entries {
                println!("  {entry}");
            }
        }
        Ok(())
    }

    fn cmd_tree(&mut self, path: Option<PathBuf>) -> Result<(), SessionError> {
        let target = self.target_or_cwd(path);
        let bundle = context::tree(&target, &self.limits)?;
        println!("Directory tree for: {}", target.display());
        if let Some(tree) = &bundle.tree {
            println!("{tree}");
        }
        self.conversation.set_pending_context(bundle);
        println!("Tree will be attached to your next message.");
        Ok(())
    }

    fn cmd_context(&mut self, path: Option<PathBuf>) -> Result<(), SessionError> {
        let target = self.target_or_cwd(path);
        println!("Getting context from: {}", target.display());
        let bundle = context::gather(&target, &self.limits)?;
        if bundle.is_empty() {
            println!("No files found in workspace.");
            self.conversation.clear_pending_context();
            return Ok(());
        }
        println!("Found {} file(s) in workspace:", bundle.files.len());
        for file in &bundle.files {
            if file.truncated {
                println!("  {} ({} bytes) (truncated)", file.path, file.byte_size);
            } else {
                println!("  {} ({} bytes)", file.path, file.byte_size);
            }
        }
        for entry in &bundle.skipped {
            println!("  skipped: {entry}");
        }
        if bundle.partial {
            println!("(context is partial; limits reached)");
        }
        println!("Context will be attached to your next message.");
        self.conversation.set_pending_context(bundle);
        Ok(())
    }

    fn cmd_cat(&self, path: &Path) -> Result<(), SessionError> {
        let target = self.resolve(path);
        let content = fs_tools::read_text_file(&target)?;
        println!("Contents of: {}", target.display());
        println!("{}", "─".repeat(40));
        println!("{content}");
        println!("{}", "─".repeat(40));
        Ok(())
    }

    fn cmd_cd(&mut self, path: &Path) -> Result<(), SessionError> {
        let target = self.resolve(path);
        let meta = fs::metadata(&target).map_err(|err| SessionError::fs(&target, err))?;
        if !meta.is_dir() {
            return Err(SessionError::fs(
                &target,
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        self.cwd = fs::canonicalize(&target).map_err(|err| SessionError::fs(&target, err))?;
        println!("Changed directory to: {}", self.cwd.display());
        Ok(())
    }

    fn cmd_mkdir(&self, path: &Path) -> Result<(), SessionError> {
        let target = self.resolve(path);
        fs_tools::make_dir(&target)?;
        println!("Created directory: {}", target.display());
        Ok(())
    }

    fn cmd_config(&mut self, op: ConfigOp) -> Result<(), SessionError> {
        match op {
            ConfigOp::Set { key, value } => {
                config::set_and_save(&mut self.config, &self.config_path, &key, &value)?;
                println!("Configuration updated: {key}");
            }
            ConfigOp::List => {
                for (key, value) in self.config.list() {
                    println!("{key} = {value}");
                }
            }
            ConfigOp::Show => {
                let text = toml::to_string_pretty(&self.config).map_err(|err| {
                    SessionError::ConfigValidation(format!("cannot serialize settings: {err}"))
                })?;
                print!("{text}");
                println!("Config path: {}", self.config_path.display());
            }
        }
        Ok(())
    }

    fn begin_capture(&mut self, kind: CaptureKind, path: &Path) -> Result<(), SessionError> {
        let target = self.resolve(path);
        match kind {
            CaptureKind::Create => println!("Creating file: {}", target.display()),
            CaptureKind::Append => {
                // The target must already exist and be text before capture starts.
                fs_tools::read_text_file(&target)?;
                println!("Appending to file: {}", target.display());
            }
        }
        println!("Enter file content (type /save to save and exit, or /cancel to cancel):");
        self.capture = Some(Capture { kind, path: target, lines: Vec::new() });
        Ok(())
    }

    /// In capture mode every line is literal content except the two
    /// terminators; nothing else is parsed as a command.
    fn handle_capture_line(&mut self, line: &str) {
        match line.trim() {
            "/save" => {
                let Some(capture) = self.capture.take() else {
                    return;
                };
                let content = capture.lines.join("\n");
                let result = match capture.kind {
                    CaptureKind::Create => fs_tools::write_file(&capture.path, &content),
                    CaptureKind::Append => fs_tools::append_file(&capture.path, &content),
                };
                match result {
                    Ok(()) => println!("File saved: {}", capture.path.display()),
                    Err(err) => println!("Error: {err}"),
                }
            }
            "/cancel" => {
                self.capture = None;
                println!("File edit cancelled.");
            }
            _ => {
                if let Some(capture) = self.capture.as_mut() {
                    capture.lines.push(line.to_string());
                }
            }
        }
    }

    async fn chat(&mut self, text: &str) -> Result<(), SessionError> {
        let reply = self
            .conversation
            .send(self.backend.as_ref(), &self.config, text)
            .await?;
        println!("Assistant: {reply}");
        Ok(())
    }

    fn print_help(&self) {
        println!("Available commands:");
        println!();
        println!("Basic:");
        println!("  /help                 show this help");
        println!("  /exit, /quit          end the session");
        println!();
        println!("Files:");
        println!("  /cat <file>           print file contents");
        println!("  /write <file>         create or overwrite a file (multi-line input)");
        println!("  /append <file>        append to an existing file (multi-line input)");
        println!();
        println!("Directories:");
        println!("  /pwd, /cwd            print working directory");
        println!("  /ls [path]            list directory entries");
        println!("  /cd <dir>             change working directory");
        println!("  /mkdir <dir>          create a directory");
        println!("  /tree [path]          show directory tree, attach it to the next message");
        println!();
        println!("Configuration:");
        println!("  /config set <key> <value>");
        println!("  /config list");
        println!("  /config show");
        println!();
        println!("Context:");
        println!("  /context [path], /# [path]");
        println!("                        collect workspace files for the next message");
        println!();
        println!("Anything else is sent to the assistant.");
    }
}
