use fishcoach_llm::{ProviderError, create_provider};
use snafu::{OptionExt, ResultExt, Snafu};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::chat::{Author, ChatController, Message, SessionEvent};
use crate::settings::CoachSettings;
use crate::settings::state::{ENV_PREFIX, FALLBACK_API_KEY_ENV};

/// Log level used when `RUST_LOG` is unset. Kept quiet because logs share the
/// terminal with the conversation.
pub const DEFAULT_LOG_FILTER: &str = "warn";
const PROMPT_PREFIX_USER: &str = "you   › ";
const PROMPT_PREFIX_COACH: &str = "coach › ";
const THINKING_LINE: &str = "coach › …";
const BUSY_NOTICE: &str =
    "(coach is still answering; kept as your draft. type /send once the reply arrives)";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display(
        "no API key configured; set {env_prefix}API_KEY or {fallback_env}, or add api_key to the settings file"
    ))]
    MissingApiKey {
        stage: &'static str,
        env_prefix: &'static str,
        fallback_env: &'static str,
    },
    #[snafu(display("failed to initialize assistant on `{stage}`: {source}"))]
    ProviderInit {
        stage: &'static str,
        source: ProviderError,
    },
    #[snafu(display("failed to read input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to write output on `{stage}`: {source}"))]
    WriteOutput {
        stage: &'static str,
        source: std::io::Error,
    },
}

/// One line of terminal input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Quit,
    SendDraft,
    Text(String),
}

impl InputLine {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/quit" | "/exit" => Self::Quit,
            "/send" => Self::SendDraft,
            _ => Self::Text(line.to_string()),
        }
    }
}

/// Appends transcript growth to a text sink.
pub struct TranscriptPrinter<W> {
    out: W,
    printed: usize,
    thinking_shown: bool,
}

impl<W: AsyncWrite + Unpin> TranscriptPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: 0,
            thinking_shown: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints messages not yet shown, then the thinking line if a reply is outstanding.
    pub async fn render(&mut self, controller: &ChatController) -> std::io::Result<()> {
        let transcript = controller.transcript();
        for message in transcript.iter().skip(self.printed) {
            let line = format_message(message);
            self.out.write_all(line.as_bytes()).await?;
        }
        self.printed = transcript.len();

        if controller.is_awaiting_response() {
            if !self.thinking_shown {
                self.out.write_all(THINKING_LINE.as_bytes()).await?;
                self.out.write_all(b"\n").await?;
                self.thinking_shown = true;
            }
        } else {
            self.thinking_shown = false;
        }

        self.out.flush().await
    }

    pub async fn notice(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }
}

/// Filter from `RUST_LOG`-style directives, or [`DEFAULT_LOG_FILTER`] when
/// they are missing or unparsable.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

pub fn format_message(message: &Message) -> String {
    let prefix = match message.author {
        Author::User => PROMPT_PREFIX_USER,
        Author::Assistant => PROMPT_PREFIX_COACH,
    };
    let indent = " ".repeat(prefix.chars().count());

    let mut formatted = String::new();
    for (index, line) in message.text.lines().enumerate() {
        formatted.push_str(if index == 0 { prefix } else { &indent });
        formatted.push_str(line);
        formatted.push('\n');
    }
    if formatted.is_empty() {
        formatted.push_str(prefix);
        formatted.push('\n');
    }
    formatted
}

/// Runs the coach in the terminal until `/quit` or end of input.
///
/// On end of input an outstanding reply is still awaited and printed.
pub async fn run(settings: &CoachSettings) -> Result<(), AppError> {
    let config = settings.to_provider_config().context(MissingApiKeySnafu {
        stage: "resolve-provider-config",
        env_prefix: ENV_PREFIX,
        fallback_env: FALLBACK_API_KEY_ENV,
    })?;
    let assistant = create_provider(config).context(ProviderInitSnafu {
        stage: "create-provider",
    })?;

    tracing::info!(
        provider_id = %assistant.id(),
        model_id = %assistant.model_id(),
        reply_timeout_secs = settings.reply_timeout_secs,
        "fish coach session started"
    );

    let mut controller =
        ChatController::new(assistant).with_reply_timeout(settings.reply_timeout());
    let mut printer = TranscriptPrinter::new(tokio::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_closed = false;

    printer.render(&controller).await.context(WriteOutputSnafu {
        stage: "render-greeting",
    })?;

    loop {
        if input_closed && !controller.is_awaiting_response() {
            break;
        }

        tokio::select! {
            event = controller.next_event(), if controller.is_awaiting_response() => {
                if let Some(SessionEvent::ReplyAppended { request_id, kind, .. }) = event {
                    tracing::debug!(request_id = %request_id, ?kind, "reply appended");
                }
            }
            line = lines.next_line(), if !input_closed => {
                let line = line.context(ReadInputSnafu { stage: "read-stdin-line" })?;
                let Some(line) = line else {
                    input_closed = true;
                    continue;
                };

                let accepted = match InputLine::parse(&line) {
                    InputLine::Quit => break,
                    InputLine::SendDraft => controller.submit_draft(),
                    InputLine::Text(text) => {
                        controller.set_draft(text);
                        controller.submit_draft()
                    }
                };

                if !accepted && controller.is_awaiting_response() {
                    printer.notice(BUSY_NOTICE).await.context(WriteOutputSnafu {
                        stage: "render-busy-notice",
                    })?;
                }
            }
        }

        printer.render(&controller).await.context(WriteOutputSnafu {
            stage: "render-transcript",
        })?;
    }

    controller.dispose();
    tracing::info!(
        transcript_len = controller.transcript().len(),
        "fish coach session closed"
    );
    Ok(())
}
