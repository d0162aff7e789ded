use clap::{Parser, Subcommand};
use eyre::Context;
use jiff::{SignedDuration, Timestamp};
use oauth2::{AccessToken, RefreshToken};
use serde::Serialize;
use serde_json::{Value, json};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_dashboard::config::PROVIDER;
use youtube_dashboard::store::{CredentialRecord, CredentialStore, SqliteStore};
use youtube_dashboard::video_id::{ThumbnailQuality, embed_url, thumbnail_url};
use youtube_dashboard::{Dashboard, Error, GoogleConfig, Result};

/// Manage YouTube comments and video details from the terminal.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Google OAuth client id
    #[arg(long, env = "AUTH_GOOGLE_ID")]
    client_id: String,

    /// Google OAuth client secret
    #[arg(long, env = "AUTH_GOOGLE_SECRET", hide_env_values = true)]
    client_secret: String,

    /// Override the Google token endpoint
    #[arg(long, env = "GOOGLE_TOKEN_URL")]
    token_url: Option<String>,

    /// Override the YouTube Data API base URL
    #[arg(long, env = "YOUTUBE_API_BASE")]
    api_base: Option<String>,

    /// SQLite database holding credentials, notes and the audit log
    #[arg(long, env = "DATABASE_PATH", default_value = "dashboard.db")]
    database: PathBuf,

    /// The dashboard user to act as
    #[arg(short, long)]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a Google credential for the user, replacing any existing one
    Link {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        refresh_token: Option<String>,
        /// Seconds until the access token expires
        #[arg(long, default_value_t = 3599)]
        expires_in: i64,
    },
    /// Print a valid access token, refreshing it first if needed
    Token,
    /// Show a video, given its id or URL
    Video { video: String },
    /// List comment threads on a video
    Comments {
        video: String,
        #[arg(long)]
        page_token: Option<String>,
        /// Follow every page instead of printing just one
        #[arg(long, conflicts_with = "page_token")]
        all: bool,
    },
    /// Post a top-level comment
    Comment { video: String, text: String },
    /// Reply to a comment
    Reply { parent_id: String, text: String },
    /// Replace the text of one of your comments
    EditComment { comment_id: String, text: String },
    DeleteComment { comment_id: String },
    /// Print the id of your own channel
    Channel,
    /// Change the title and/or description of a video
    UpdateVideo {
        video: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Private notes on videos
    Note {
        #[command(subcommand)]
        action: NoteCommand,
    },
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    Get { video: String },
    Set { video: String, content: String },
    Delete { video: String },
}

fn to_json(value: impl Serialize) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Unknown(format!("serialize output: {e}")))
}

async fn run(dashboard: &Dashboard<SqliteStore>, user: &str, command: Command) -> Result<Value> {
    match command {
        Command::Link {
            access_token,
            refresh_token,
            expires_in,
        } => {
            let expires_at = Timestamp::now()
                .checked_add(SignedDuration::from_secs(expires_in))
                .context("compute token expiry")?;
            let record = CredentialRecord::linked(
                user,
                PROVIDER,
                AccessToken::new(access_token),
                refresh_token.map(RefreshToken::new),
                expires_at,
            );
            dashboard.store().link(&record).await?;
            Ok(json!({ "user": user, "expiresAt": expires_at }))
        }
        Command::Token => {
            let token = dashboard.client().tokens().access_token(user).await?;
            Ok(json!({ "accessToken": token.secret() }))
        }
        Command::Video { video } => match dashboard.fetch_video(user, &video).await? {
            Some(video) => Ok(json!({
                "thumbnailUrl": thumbnail_url(&video.id, ThumbnailQuality::default()),
                "embedUrl": embed_url(&video.id),
                "video": to_json(video)?,
            })),
            None => Ok(Value::Null),
        },
        Command::Comments {
            video,
            page_token,
            all: false,
        } => to_json(
            dashboard
                .list_comments(user, &video, page_token.as_deref())
                .await?,
        ),
        Command::Comments { video, .. } => {
            let mut threads = Vec::new();
            let mut stream = std::pin::pin!(dashboard.comment_threads(user, &video));
            while let Some(thread) = stream.next().await {
                threads.push(thread?);
            }
            to_json(threads)
        }
        Command::Comment { video, text } => {
            to_json(dashboard.add_comment(user, &video, &text).await?)
        }
        Command::Reply { parent_id, text } => {
            to_json(dashboard.reply_to_comment(user, &parent_id, &text).await?)
        }
        Command::EditComment { comment_id, text } => {
            to_json(dashboard.update_comment(user, &comment_id, &text).await?)
        }
        Command::DeleteComment { comment_id } => {
            dashboard.delete_comment(user, &comment_id).await?;
            Ok(json!({ "ok": true }))
        }
        Command::Channel => to_json(dashboard.my_channel_id(user).await?),
        Command::UpdateVideo {
            video,
            title,
            description,
        } => {
            if title.is_none() && description.is_none() {
                return Err(Error::InvalidInput(
                    "Pass --title and/or --description".to_string(),
                ));
            }
            to_json(
                dashboard
                    .update_video(user, &video, title.as_deref(), description.as_deref())
                    .await?,
            )
        }
        Command::Note { action } => match action {
            NoteCommand::Get { video } => to_json(dashboard.note(user, &video).await?),
            NoteCommand::Set { video, content } => {
                dashboard.save_note(user, &video, &content).await?;
                to_json(dashboard.note(user, &video).await?)
            }
            NoteCommand::Delete { video } => {
                dashboard.delete_note(user, &video).await?;
                Ok(json!({ "ok": true }))
            }
        },
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let args = Args::parse();

    let mut config = GoogleConfig::new(args.client_id, args.client_secret);
    if let Some(token_url) = &args.token_url {
        config = config.with_token_url(token_url)?;
    }
    if let Some(api_base) = &args.api_base {
        config = config.with_api_base(api_base)?;
    }

    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("open database {}", args.database.display()))?;
    let dashboard = Dashboard::new(Arc::new(store), &config)?;

    match run(&dashboard, &args.user, args.command).await {
        Ok(output) => {
            let output = serde_json::to_string_pretty(&output).context("format output")?;
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            tracing::debug!(kind = %e.kind(), error = %e, "command failed");
            eprintln!("error: {}", e.user_message());
            if e.requires_reauth() {
                eprintln!("hint: store a new credential with `link`");
            }
            std::process::exit(1);
        }
    }
}
