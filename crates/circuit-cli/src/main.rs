//! CLI interface for send-circuit - post messages to Circuit from the terminal.

use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result, anyhow};
use circuit_core::{
    APP_NAME, AppConfig, CircuitClient, CircuitError, MessageOptions, resolve_config_path,
};
use clap::{Args, CommandFactory, Parser};
use clap_complete::Shell;
use env_logger::fmt::WriteStyle;
use log::{LevelFilter, debug, info};

fn main() -> Result<ExitCode> {
    try_main()
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(shell) = cli.common.completions {
        handle_completions(shell);
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("loaded config from {}", ctx.config_file.display());

    if ctx.common.show_config {
        print!("{}", ctx.config.to_redacted_yaml()?);
        return Ok(ExitCode::SUCCESS);
    }

    if cli.list {
        handle_list(&ctx)?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_send(&ctx, &cli.send)
}

#[derive(Debug, Parser)]
#[command(
    name = "send-circuit",
    author,
    version,
    about = "Send messages to Circuit conversations",
    after_help = "The command will read the message body from stdin."
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    /// List conversations of user.
    #[arg(short = 'l', long, help_heading = "List conversations")]
    list: bool,
    #[command(flatten)]
    send: SendArgs,
}

/// Options shared by every mode.
#[derive(Debug, Clone, Args)]
pub struct CommonOpts {
    /// Path to configuration file [default: /etc/send-circuit.yaml].
    #[arg(short = 'f', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Print http debug information.
    #[arg(long)]
    pub trace: bool,
    /// Reduce output to only errors.
    #[arg(short = 'q', long)]
    pub quiet: bool,
    /// Increase logging verbosity (stackable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Disable ANSI colors in output.
    #[arg(long = "no-color")]
    pub no_color: bool,
    /// Print the effective configuration and exit.
    #[arg(long = "show-config")]
    pub show_config: bool,
    /// Generate shell completions and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}

/// Options for sending a message.
#[derive(Debug, Clone, Args)]
#[command(next_help_heading = "Send message")]
struct SendArgs {
    /// Set subject for message.
    #[arg(short = 's', long, value_name = "TEXT")]
    subject: Option<String>,
    /// Id of the conversation to send a message to.
    #[arg(short = 'c', long, value_name = "ID")]
    conversation: Option<String>,
    /// Create a new group conversation.
    #[arg(short = 'n', long)]
    new: bool,
    /// Topic of the new conversation.
    #[arg(short = 't', long, value_name = "TEXT", default_value = "")]
    topic: String,
    /// Add a participant to the new conversation (repeatable).
    #[arg(short = 'p', long = "participant", value_name = "EMAIL_OR_ID")]
    participants: Vec<String>,
}

// ─── Runtime ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct RuntimeContext {
    common: CommonOpts,
    config_file: PathBuf,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let config_file = resolve_config_path(common.config.as_deref())?;
        let config = AppConfig::load_from_path(&config_file)?;
        Ok(Self {
            common,
            config_file,
            config,
        })
    }

    fn init_logging(&self) -> Result<()> {
        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
        builder.filter_level(self.effective_log_level());

        let force_color = env::var_os("FORCE_COLOR").is_some();
        let disable_color = self.common.no_color
            || env::var_os("NO_COLOR").is_some()
            || (!force_color && !io::stderr().is_terminal());

        if disable_color {
            builder.write_style(WriteStyle::Never);
        } else if force_color {
            builder.write_style(WriteStyle::Always);
        } else {
            builder.write_style(WriteStyle::Auto);
        }

        builder.try_init().or_else(|err| {
            if self.common.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    const fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else {
            match self.common.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    fn client(&self) -> CircuitClient {
        CircuitClient::new(self.config.client_config().with_trace(self.common.trace))
    }
}

// ─── Handlers ────────────────────────────────────────────────────────

fn handle_list(ctx: &RuntimeContext) -> Result<()> {
    let conversations = ctx.client().list_conversations()?;
    for conv in conversations {
        println!(
            "- {} ({})",
            conv.topic.as_deref().unwrap_or_default(),
            conv.conv_id
        );
    }
    Ok(())
}

fn handle_send(ctx: &RuntimeContext, args: &SendArgs) -> Result<ExitCode> {
    // Resolve the target before blocking on stdin.
    let existing = if args.new {
        None
    } else {
        let conv = args
            .conversation
            .clone()
            .ok_or_else(|| anyhow!("no target conversation: pass --conversation <id> or --new"))?;
        Some(conv)
    };

    let mut body = String::new();
    io::stdin()
        .read_to_string(&mut body)
        .context("reading message body from stdin")?;

    let client = ctx.client();
    let conv = match existing {
        Some(conv) => conv,
        None => {
            eprintln!("creating new group conversation...");
            client
                .create_group_conversation(&args.participants, &args.topic)
                .context("creating group conversation")?
                .conv_id
        }
    };

    let mut options = MessageOptions::new();
    if let Some(subject) = &args.subject {
        options = options.with_subject(subject.clone());
    }

    eprintln!("sending message to {conv}...");
    match client.create_message(&conv, &body, &options) {
        Ok(item) => {
            info!("sent message {} to {conv}", item.item_id);
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ CircuitError::Client { .. }) => {
            eprintln!("Could not send message: {err}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(anyhow::Error::new(err).context("sending message")),
    }
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}
