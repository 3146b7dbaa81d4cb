//! CLI parser and command dispatch.

mod output;

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tika::{
    ClientConfig, ConfigOption, DetectOption, Endpoint, LanguageOption, ParseService,
    RequestOptions, TikaClient, TranslateSpec, UnpackOption,
};

#[derive(Parser)]
#[command(name = "tika")]
#[command(about = "Client for the Apache Tika REST server")]
#[command(version)]
pub struct Cli {
    /// Tika server endpoint, e.g. http://localhost:9998
    #[arg(long, global = true, env = "TIKA_SERVER_ENDPOINT")]
    server: Option<String>,

    /// Server jar to launch (path or URL)
    #[arg(long, global = true)]
    install: Option<String>,

    /// Port of the server endpoint
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Never launch a server; use the endpoint as-is
    #[arg(long, global = true)]
    client_only: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text and metadata (meta, text, all)
    Parse {
        option: ParseService,
        /// Files or URLs; reads stdin when omitted
        paths: Vec<String>,
        /// Return XHTML content instead of plain text (all only)
        #[arg(long)]
        xml: bool,
    },

    /// Detect the MIME type (type)
    Detect {
        option: DetectOption,
        /// Files or URLs; reads stdin when omitted
        paths: Vec<String>,
    },

    /// Identify the document language (file, string)
    Language {
        option: LanguageOption,
        /// Files or URLs; reads stdin when omitted
        paths: Vec<String>,
    },

    /// Translate document text (src:dest or dest)
    Translate {
        spec: TranslateSpec,
        /// Files or URLs; reads stdin when omitted
        paths: Vec<String>,
    },

    /// Show server configuration (mime-types, detectors, parsers)
    Config { option: ConfigOption },

    /// Extract embedded resources (all)
    Unpack {
        option: UnpackOption,
        /// Files or URLs; reads stdin when omitted
        paths: Vec<String>,
        /// Write attachments into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

/// Input documents for a command: named locators or a single stdin buffer.
enum Inputs {
    Locators(Vec<String>),
    Stdin(Vec<u8>),
}

impl Inputs {
    fn from_paths(paths: Vec<String>) -> anyhow::Result<Self> {
        if !paths.is_empty() {
            return Ok(Inputs::Locators(paths));
        }
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer)?;
        Ok(Inputs::Stdin(buffer))
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_env()?;
    if let Some(ref server) = cli.server {
        config.endpoint = Endpoint::parse(server)?;
    }
    if let Some(port) = cli.port {
        config.endpoint.port = port;
    }
    if let Some(ref install) = cli.install {
        config.server_jar = install.clone();
    }
    if cli.client_only {
        config.client_only = true;
    }
    Ok(config)
}

/// Run the CLI.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = TikaClient::new(build_config(&cli)?)?;

    match cli.command {
        Commands::Parse { option, paths, xml } => match Inputs::from_paths(paths)? {
            Inputs::Locators(paths) => {
                for path in paths {
                    let parsed =
                        client
                            .parser()
                            .from_file(&path, option, xml, RequestOptions::new())?;
                    output::json(Some(&path), &parsed)?;
                }
            }
            Inputs::Stdin(buffer) => {
                let parsed = client.parser().from_buffer(buffer, xml, RequestOptions::new())?;
                output::json(None, &parsed)?;
            }
        },
        Commands::Detect { option, paths } => match Inputs::from_paths(paths)? {
            Inputs::Locators(paths) => {
                for path in paths {
                    let result = client
                        .detector()
                        .from_file(&path, option, RequestOptions::new())?;
                    output::text(Some(&path), &result);
                }
            }
            Inputs::Stdin(buffer) => {
                let result = client
                    .detector()
                    .from_buffer(buffer, option, RequestOptions::new())?;
                output::text(None, &result);
            }
        },
        Commands::Language { option, paths } => match Inputs::from_paths(paths)? {
            Inputs::Locators(paths) => {
                for path in paths {
                    let result = client
                        .language()
                        .from_file(&path, option, RequestOptions::new())?;
                    output::text(Some(&path), &result);
                }
            }
            Inputs::Stdin(buffer) => {
                let result = client
                    .language()
                    .from_buffer(buffer, option, RequestOptions::new())?;
                output::text(None, &result);
            }
        },
        Commands::Translate { spec, paths } => match Inputs::from_paths(paths)? {
            Inputs::Locators(paths) => {
                for path in paths {
                    let result =
                        client
                            .translator()
                            .from_file(&path, &spec, RequestOptions::new())?;
                    output::text(Some(&path), &result);
                }
            }
            Inputs::Stdin(buffer) => {
                let result = client
                    .translator()
                    .from_buffer(buffer, &spec, RequestOptions::new())?;
                output::text(None, &result);
            }
        },
        Commands::Config { option } => {
            let (status, document) = client.server_config().get(option, RequestOptions::new())?;
            match document {
                Some(document) => output::json(None, &document)?,
                None => output::failed_status(None, status),
            }
        }
        Commands::Unpack {
            option,
            paths,
            output_dir,
        } => match Inputs::from_paths(paths)? {
            Inputs::Locators(paths) => {
                for path in paths {
                    let unpacked = client
                        .unpacker()
                        .from_file(&path, option, RequestOptions::new())?;
                    output::unpacked(Some(&path), &unpacked, output_dir.as_deref())?;
                }
            }
            Inputs::Stdin(buffer) => {
                let unpacked = client
                    .unpacker()
                    .from_buffer(buffer, option, RequestOptions::new())?;
                output::unpacked(None, &unpacked, output_dir.as_deref())?;
            }
        },
    }

    Ok(())
}
