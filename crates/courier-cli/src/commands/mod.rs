//! Command implementations.

mod session;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use courier_common_config::CourierConfig;
use courier_common_http::Response;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::args::{field_map, parse_key_value};
use crate::cli::Command;
use crate::error::CliError;

pub use session::Session;

/// GET a URL.
#[derive(Debug, Args)]
pub struct GetCommand {
    /// Target URL
    pub url: String,

    /// Query parameter (key=value, repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

/// POST a form.
#[derive(Debug, Args)]
pub struct PostFormCommand {
    /// Target URL
    pub url: String,

    /// Request header (key=value, repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,

    /// Form field (key=value, repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

/// POST a JSON body.
#[derive(Debug, Args)]
pub struct PostJsonCommand {
    /// Target URL
    pub url: String,

    /// JSON body
    #[arg(short, long)]
    pub body: String,

    /// Request header (key=value, repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,
}

/// Upload a file.
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Target URL
    pub url: String,

    /// File to upload
    pub file: PathBuf,

    /// Extra form field (key=value, repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

/// Download a URL.
#[derive(Debug, Args)]
pub struct DownloadCommand {
    /// Target URL
    pub url: String,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,
}

impl Command {
    /// Execute the selected command.
    pub async fn execute(self, config: &CourierConfig) -> Result<(), CliError> {
        let session = Session::new(config)?;

        match self {
            Command::Get(cmd) => {
                let params = field_map(&cmd.params);
                let response = session
                    .run(|d, sink| d.get_with_params(&cmd.url, Some(&params), sink))
                    .await?;
                print_body(response).await
            }
            Command::PostForm(cmd) => {
                let headers = field_map(&cmd.headers);
                let params = field_map(&cmd.params);
                let response = session
                    .run(|d, sink| {
                        d.post_form_with_headers_and_params(&cmd.url, Some(&headers), Some(&params), sink)
                    })
                    .await?;
                print_body(response).await
            }
            Command::PostJson(cmd) => {
                if cmd.body.is_empty() {
                    tracing::warn!("empty JSON body, nothing will be sent");
                }
                let headers = field_map(&cmd.headers);
                let response = session
                    .run(|d, sink| d.post_json_with_headers(&cmd.url, Some(&headers), &cmd.body, sink))
                    .await?;
                print_body(response).await
            }
            Command::Upload(cmd) => {
                let params = field_map(&cmd.params);
                let response = session
                    .run(|d, sink| d.upload_with_params(&cmd.url, &cmd.file, Some(&params), sink))
                    .await?;
                print_body(response).await
            }
            Command::Download(cmd) => {
                let response = session.run(|d, sink| d.download_file(&cmd.url, sink)).await?;
                let written = save(response, &cmd.output).await?;
                tracing::info!(bytes = written, path = %cmd.output.display(), "download complete");
                Ok(())
            }
        }
    }
}

async fn print_body(response: Response) -> Result<(), CliError> {
    let status = response.status;
    let body = response
        .bytes()
        .await
        .map_err(|e| CliError::Other(anyhow::Error::new(e).context("failed to read response body")))?;
    tracing::info!(status, bytes = body.len(), "response received");

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&body)
        .and_then(|()| stdout.flush())
        .map_err(|e| CliError::io("failed to write response", e, "<stdout>"))
}

async fn save(response: Response, path: &Path) -> Result<u64, CliError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| CliError::io("failed to create output file", e, path))?;

    let mut stream = response.into_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| CliError::Other(anyhow::Error::new(e).context("download interrupted")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| CliError::io("failed to write output file", e, path))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| CliError::io("failed to write output file", e, path))?;

    Ok(written)
}
