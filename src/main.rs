//! forge – cookbook JSON → print-ready HTML and PDF.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use cookbook_forge::engine::{ChromeEngine, DraftEngine, RenderEngine};
use cookbook_forge::fonts::FontManager;
use cookbook_forge::layout::layout_document;
use cookbook_forge::pipeline::{generate_pdf, handle_request, GenerateRequest, PipelineConfig};
use cookbook_forge::storage::{BlobStore, LocalStore, StorageCredentials, SupabaseFactory};
use cookbook_forge::{compose, estimate_toc, samples, Cookbook, StorageError};

#[derive(Parser)]
#[command(name = "forge")]
#[command(version, about = "Cookbook composition engine", long_about = None)]
#[command(after_help = "EXAMPLES:
    forge sample family > family.json          Write a sample cookbook
    forge compose family.json -o family.html   Compose printable HTML
    forge render family.json family.pdf        Render with the draft engine
    forge render family.json --engine chrome   Render with headless Chrome
    forge publish request.json --local-store ./out")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose a cookbook into HTML
    Compose {
        /// Cookbook JSON file
        input: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the estimated table of contents as JSON
    Toc {
        /// Cookbook JSON file
        input: PathBuf,
    },
    /// Compose and render a cookbook to PDF
    Render {
        /// Cookbook JSON file
        input: PathBuf,
        /// Output PDF (default: input path with .pdf extension)
        output: Option<PathBuf>,
        #[command(flatten)]
        engine: EngineArgs,
        /// Also write the draft layout as JSON
        #[arg(long, value_name = "FILE")]
        layout_json: Option<PathBuf>,
    },
    /// Handle a generation request: compose, render and publish
    Publish {
        /// Request JSON file
        request: PathBuf,
        /// Store into this directory instead of the request's storage service
        #[arg(long, value_name = "DIR")]
        local_store: Option<PathBuf>,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Print a bundled sample cookbook
    Sample {
        #[arg(value_enum)]
        name: SampleName,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Rendering engine
    #[arg(long, value_enum, default_value_t = EngineKind::Draft)]
    engine: EngineKind,
    /// Chrome/Chromium binary
    #[arg(long, env = "CHROME_PATH")]
    chrome: Option<PathBuf>,
    /// Run Chrome without its sandbox (containers running as root)
    #[arg(long)]
    no_sandbox: bool,
    /// Render timeout in seconds
    #[arg(long, env = "FORGE_RENDER_TIMEOUT")]
    timeout: Option<u64>,
    /// TrueType/OpenType face for the draft engine
    #[arg(long, env = "FORGE_FONT")]
    font: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineKind {
    Draft,
    Chrome,
}

#[derive(Clone, Copy, ValueEnum)]
enum SampleName {
    Soup,
    Family,
    DividerOnly,
}

impl EngineArgs {
    fn engine(&self) -> Result<Box<dyn RenderEngine>, Box<dyn Error>> {
        Ok(match self.engine {
            EngineKind::Draft => Box::new(DraftEngine::discover(self.font.as_deref())?),
            EngineKind::Chrome => {
                let chrome = ChromeEngine::discover(self.chrome.as_deref())?;
                log::info!("Using {}", chrome.binary().display());
                if self.no_sandbox {
                    Box::new(chrome.without_sandbox())
                } else {
                    Box::new(chrome)
                }
            }
        })
    }

    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_env();
        if let Some(secs) = self.timeout {
            config.render.timeout = Duration::from_secs(secs);
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Command::Compose { input, output } => {
            let cookbook = read_cookbook(&input)?;
            let document = compose(&cookbook);
            match output {
                Some(path) => {
                    write_file(&path, document.html.as_bytes())?;
                    eprintln!(
                        "Wrote '{}' ({} page blocks, {} TOC entries)",
                        path.display(),
                        document.page_count,
                        document.toc.len()
                    );
                }
                None => print!("{}", document.html),
            }
        }
        Command::Toc { input } => {
            let cookbook = read_cookbook(&input)?;
            let toc = estimate_toc(&cookbook.recipes, cookbook.toc_style());
            println!("{}", serde_json::to_string_pretty(&toc)?);
        }
        Command::Render {
            input,
            output,
            engine,
            layout_json,
        } => {
            let cookbook = read_cookbook(&input)?;
            let output = output.unwrap_or_else(|| input.with_extension("pdf"));
            let config = engine.config();
            let (bytes, document) = generate_pdf(&cookbook, engine.engine()?.as_ref(), &config.render)?;
            write_file(&output, &bytes)?;
            eprintln!(
                "Wrote '{}' ({} bytes, {} page blocks)",
                output.display(),
                bytes.len(),
                document.page_count
            );
            if let Some(path) = layout_json {
                let fonts = FontManager::discover(engine.font.as_deref())?;
                let layout = layout_document(&document.html, &config.render, &fonts);
                write_file(&path, layout.to_json()?.as_bytes())?;
            }
        }
        Command::Publish {
            request,
            local_store,
            engine,
        } => {
            let body = fs::read_to_string(&request)
                .map_err(|e| format!("reading '{}': {e}", request.display()))?;
            let request = GenerateRequest::from_json(&body)?;
            let config = engine.config();
            let engine = engine.engine()?;

            let response = match local_store {
                Some(root) => {
                    let factory = move |_: &StorageCredentials| -> Result<Box<dyn BlobStore>, StorageError> {
                        Ok(Box::new(LocalStore::new(root.clone())))
                    };
                    handle_request(&request, engine.as_ref(), &factory, &config)
                }
                None => handle_request(&request, engine.as_ref(), &SupabaseFactory::default(), &config),
            };
            println!("{}", response.to_json());
            if !response.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Sample { name } => {
            let json = match name {
                SampleName::Soup => samples::soup_json(),
                SampleName::Family => samples::family_json(),
                SampleName::DividerOnly => samples::divider_only_json(),
            };
            println!("{json}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_cookbook(path: &Path) -> Result<Cookbook, Box<dyn Error>> {
    let json = fs::read_to_string(path).map_err(|e| format!("reading '{}': {e}", path.display()))?;
    Ok(Cookbook::from_json(&json).map_err(|e| format!("parsing '{}': {e}", path.display()))?)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes).map_err(|e| format!("writing '{}': {e}", path.display()))?;
    Ok(())
}
