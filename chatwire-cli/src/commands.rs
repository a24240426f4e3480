//! Subcommands for the Chatwire CLI.
//!
//! Defines the [`Commands`] enum parsed by `clap` and the
//! [`handle_command`] dispatcher that runs `send`, `payload` and `replay`.

use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand, ValueEnum};
use futures::StreamExt;

use chatwire_core::decoder::StreamDecoder;
use chatwire_core::request::{self, RequestOptions, ToolUse};
use chatwire_core::{ChatClient, Config, Message, Reply, Role, StreamEvent};

use crate::conversation;

/// Top-level subcommands for the `chatwire` binary.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Send a message and print the reply
    Send(SendArgs),
    /// Print the request payload for a conversation file without sending it
    Payload {
        /// JSON conversation: a prompt list or a list of turn objects
        conversation: PathBuf,

        #[command(flatten)]
        request: RequestArgs,
    },
    /// Decode a captured SSE response body offline
    Replay {
        /// File holding the raw response body
        capture: PathBuf,

        /// Feed the decoder this many bytes at a time (0 = all at once)
        #[arg(long, default_value_t = 0)]
        chunk_size: usize,
    },
}

/// Options shared by commands that build a request.
#[derive(Args, Default)]
pub(crate) struct RequestArgs {
    /// Override the model from config
    #[arg(short, long)]
    pub(crate) model: Option<String>,

    /// JSON file with an array of tool definitions
    #[arg(long)]
    pub(crate) tools: Option<PathBuf>,

    /// Whether the model may call the tools
    #[arg(long, value_enum)]
    pub(crate) tool_use: Option<ToolUseArg>,

    /// JSON Schema file the reply must follow
    #[arg(long)]
    pub(crate) schema: Option<PathBuf>,

    /// Request a single JSON reply instead of a stream
    #[arg(long)]
    pub(crate) no_stream: bool,
}

/// Arguments of `chatwire send`.
#[derive(Args, Default)]
pub(crate) struct SendArgs {
    /// Message to send (reads from stdin if not provided)
    pub(crate) message: Option<String>,

    /// Attach an image
    #[arg(long = "image")]
    pub(crate) images: Vec<PathBuf>,

    /// Inline a text file
    #[arg(long = "file")]
    pub(crate) files: Vec<PathBuf>,

    /// Attach remote media by URL
    #[arg(long = "url")]
    pub(crate) urls: Vec<String>,

    /// Print the request payload to stderr before sending
    #[arg(long)]
    pub(crate) show_payload: bool,

    #[command(flatten)]
    pub(crate) request: RequestArgs,
}

/// `--tool-use` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ToolUseArg {
    Off,
    Auto,
    Force,
}

impl From<ToolUseArg> for ToolUse {
    fn from(arg: ToolUseArg) -> Self {
        match arg {
            ToolUseArg::Off => ToolUse::Off,
            ToolUseArg::Auto => ToolUse::Auto,
            ToolUseArg::Force => ToolUse::Force,
        }
    }
}

/// Handle a subcommand.
pub(crate) async fn handle_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Send(args) => send(args, config).await,
        Commands::Payload {
            conversation,
            request,
        } => {
            let history = conversation::load_conversation(&conversation)?;
            let payload = build_payload(&history, &request, &config)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Commands::Replay {
            capture,
            chunk_size,
        } => replay(&capture, chunk_size),
    }
}

/// Apply command-line overrides to the configuration and build a payload.
pub(crate) fn build_payload(
    history: &[Message],
    args: &RequestArgs,
    config: &Config,
) -> Result<request::RequestPayload> {
    let options = request_options(args, config)?;
    let model = config.model_info_for(args.model.as_deref().unwrap_or(&config.model));
    request::build(history, &options, &model).context("Failed to build request")
}

fn request_options(args: &RequestArgs, config: &Config) -> Result<RequestOptions> {
    let mut options = config.request_options();
    if args.no_stream {
        options.stream = false;
    }
    if let Some(tool_use) = args.tool_use {
        options.tool_use = tool_use.into();
    }
    if let Some(path) = &args.tools {
        options.tools = conversation::load_tools(path)?;
        if args.tool_use.is_none() && options.tool_use == ToolUse::Off {
            options.tool_use = ToolUse::Auto;
        }
    }
    if let Some(path) = &args.schema {
        options.response_schema = Some(conversation::load_schema(path)?);
    }
    Ok(options)
}

async fn send(args: SendArgs, config: Config) -> Result<()> {
    let has_attachments =
        !(args.images.is_empty() && args.files.is_empty() && args.urls.is_empty());
    let text = match get_message(args.message.as_deref()) {
        Ok(text) => Some(text),
        Err(_) if has_attachments => None,
        Err(e) => bail!("{e}"),
    };

    let message = if has_attachments {
        Message::user_parts(conversation::user_parts(
            text,
            &args.images,
            args.files,
            args.urls,
        )?)
    } else {
        Message::new(Role::User, text.unwrap_or_default())
    };

    let payload = build_payload(&[message], &args.request, &config)?;
    if args.show_payload {
        eprintln!("{}", serde_json::to_string_pretty(&payload)?);
    }

    let client = ChatClient::from_config(&config).context("Failed to create client")?;
    tracing::debug!(endpoint = client.endpoint(), "cli: sending request");

    if !payload.is_streaming() {
        let reply = client.complete(&payload).await.context("Request failed")?;
        if let Some(reasoning) = &reply.reasoning {
            eprintln!("{reasoning}");
        }
        if let Some(text) = &reply.text {
            println!("{text}");
        }
        return print_summary(&reply);
    }

    let mut stream = client.stream(payload);
    let mut stdout = io::stdout();
    let mut reasoning_printed = 0;

    while let Some(event) = stream.next().await {
        match event.context("Stream error")? {
            StreamEvent::TextDelta(text) => {
                print!("{}", text);
                stdout.flush().context("Failed to flush stdout")?;
            }
            StreamEvent::Reasoning(reasoning) => {
                eprint!("{}", &reasoning[reasoning_printed..]);
                reasoning_printed = reasoning.len();
            }
            StreamEvent::Done(reply) => {
                println!();
                return print_summary(&reply);
            }
        }
    }

    Ok(())
}

fn replay(capture: &Path, chunk_size: usize) -> Result<()> {
    let body = std::fs::read(capture)
        .with_context(|| format!("Failed to read capture '{}'", capture.display()))?;

    let mut decoder = StreamDecoder::new();
    let mut stdout = io::stdout();
    let step = if chunk_size == 0 { body.len().max(1) } else { chunk_size };

    let mut end = 0;
    while end < body.len() && !decoder.is_finished() {
        end = (end + step).min(body.len());
        print!("{}", decoder.decode(&body[..end]));
        stdout.flush().context("Failed to flush stdout")?;
    }
    print!("{}", decoder.finish(&body));
    println!();

    if !decoder.is_finished() {
        eprintln!("[stream ended without [DONE]]");
        decoder.end_stream();
    }

    let reply = decoder
        .into_reply()
        .context("Decoder did not produce a reply")?;
    if let Some(reasoning) = &reply.reasoning {
        eprintln!("[reasoning]\n{reasoning}");
    }
    print_summary(&reply)
}

/// Print tool calls and finish metadata after the reply text.
fn print_summary(reply: &Reply) -> Result<()> {
    if !reply.tool_calls.is_empty() {
        println!("{}", serde_json::to_string_pretty(&reply.tool_calls)?);
    }
    if let Some(stop_reason) = &reply.stop_reason {
        eprintln!("[stop: {stop_reason}]");
    }
    if let Some(tokens) = reply.output_tokens {
        eprintln!("[output tokens: {tokens}]");
    }
    Ok(())
}

/// Retrieves the message from arguments or stdin.
///
/// Priority: positional argument > stdin > error (if TTY)
fn get_message(message: Option<&str>) -> io::Result<String> {
    if let Some(msg) = message {
        return Ok(msg.to_string());
    }

    if io::stdin().is_terminal() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "No message provided",
        ));
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer.trim_end().to_string())
}
