//! Interactive command-line client.
//!
//! Connects to a running server, turns typed commands into request
//! lines, and prints every received response line. LOG_LINE pushes are
//! printed as raw log text so streamed logs read naturally; everything
//! else is shown as a status line plus an optional data line.

use std::io::Write as _;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::protocol::{
    ContainerRefParams, CreateContainerParams, PullImageParams, Request, Response,
};

/// Shown on connect and after an unknown command.
pub const COMMAND_LIST: &str =
    "Available commands: images, containers, pull <image>[:tag], run <image> <name>, \
     stop <nameOrId>, rm <nameOrId>, logs <nameOrId>, exit";

/// Result of parsing one typed line.
#[derive(Debug)]
pub enum Command {
    /// Send this request.
    Send(Request),
    /// Leave the REPL.
    Exit,
    /// Print this usage hint, send nothing.
    Usage(String),
}

/// Parses one line of user input.
#[must_use]
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if input.eq_ignore_ascii_case("exit") {
        return Command::Exit;
    }

    let mut parts = input.split_whitespace();
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    match cmd.as_str() {
        "images" => Command::Send(Request::new("LIST_IMAGES")),
        "containers" => Command::Send(Request::new("LIST_CONTAINERS")),
        "pull" => match args.first() {
            Some(image_arg) => {
                let (image, tag) = match image_arg.split_once(':') {
                    Some((image, tag)) => (image, tag),
                    None => (*image_arg, "latest"),
                };
                Command::Send(request_with(
                    "PULL_IMAGE",
                    &PullImageParams {
                        image: Some(image.to_string()),
                        tag: Some(tag.to_string()),
                    },
                ))
            }
            None => Command::Usage("Usage: pull <image>[:tag]".to_string()),
        },
        "run" => match args.as_slice() {
            [image, name, ..] => Command::Send(request_with(
                "RUN_CONTAINER",
                &CreateContainerParams {
                    image: Some((*image).to_string()),
                    name: Some((*name).to_string()),
                },
            )),
            _ => Command::Usage("Usage: run <image> <name>".to_string()),
        },
        "stop" => container_ref_command("STOP_CONTAINER", "Usage: stop <nameOrId>", &args),
        "rm" => container_ref_command("REMOVE_CONTAINER", "Usage: rm <nameOrId>", &args),
        "logs" => container_ref_command("STREAM_LOGS", "Usage: logs <nameOrId>", &args),
        _ => Command::Usage(format!("Unknown command. {COMMAND_LIST}")),
    }
}

fn container_ref_command(action: &str, usage: &str, args: &[&str]) -> Command {
    match args.first() {
        Some(id_or_name) => Command::Send(request_with(
            action,
            &ContainerRefParams {
                id_or_name: Some((*id_or_name).to_string()),
            },
        )),
        None => Command::Usage(usage.to_string()),
    }
}

fn request_with<T: serde::Serialize>(action: &str, params: &T) -> Request {
    // These param structs always serialize.
    let payload = serde_json::to_string(params).unwrap_or_default();
    Request::with_payload(action, payload)
}

/// Renders one received line for the terminal.
#[must_use]
pub fn format_server_line(line: &str) -> Vec<String> {
    let Ok(response) = serde_json::from_str::<Response>(line) else {
        return vec![format!("[SERVER RAW] {line}")];
    };

    if response.is_log_line() {
        return response.data.into_iter().collect();
    }

    let mut out = vec![format!(
        "[SERVER] status={} message={}",
        response.status, response.message
    )];
    if let Some(data) = response.data {
        out.push(format!("[DATA] {data}"));
    }
    out
}

/// Runs the interactive client until `exit` or server disconnect.
///
/// # Errors
/// Returns error if the connection cannot be established or stdin fails.
pub async fn run(host: &str, port: u16) -> std::io::Result<()> {
    let stream = TcpStream::connect((host, port)).await?;
    let (read_half, mut write_half) = stream.into_split();

    println!("Connected to {host}:{port}");
    println!("{COMMAND_LIST}");

    // Reader task: prints every server line as it arrives, including
    // log pushes that interleave with the prompt.
    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            for rendered in format_server_line(&line) {
                println!("{rendered}");
            }
        }
        println!("Connection closed by server.");
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("rdocker> ");
        std::io::stdout().flush()?;

        let Some(input) = stdin.next_line().await? else {
            break;
        };
        match parse_command(&input) {
            Command::Exit => break,
            Command::Usage(usage) => println!("{usage}"),
            Command::Send(request) => {
                let json = serde_json::to_string(&request).map_err(std::io::Error::other)?;
                write_half.write_all(json.as_bytes()).await?;
                write_half.write_all(b"\n").await?;
            }
        }
    }
    Ok(())
}
