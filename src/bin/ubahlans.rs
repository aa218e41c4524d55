//! CLI for UbahLans - landscape transformation from the terminal.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use ubahlans::proxy::{self, DeploymentTarget, ProxyConfig};
use ubahlans::{
    ClientConfig, DesignOptions, HttpTransport, ImagePayload, Language, Rendering, Studio,
    Transport,
};

#[derive(Parser)]
#[command(name = "ubahlans")]
#[command(about = "Transform landscape photos with Gemini image editing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Ask the provider for available models before running
    #[arg(long, global = true)]
    discover: bool,

    /// Image model to try first (overrides UBAHLANS_IMAGE_MODEL)
    #[arg(long, global = true)]
    image_model: Option<String>,

    /// Text and vision model (overrides UBAHLANS_TEXT_MODEL)
    #[arg(long, global = true)]
    text_model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a landscape design to a photo
    Transform(TransformArgs),

    /// Turn a photo into a labelled plant infographic
    Infographic(InfographicArgs),

    /// List the plants in a design
    Inventory(InventoryArgs),

    /// Suggest a landscape idea for a photo
    Suggest(SuggestArgs),

    /// Show the models the provider offers
    Models,

    /// Run the credential-holding proxy
    Serve(ServeArgs),
}

#[derive(Args)]
struct TransformArgs {
    /// Photo of the property
    photo: PathBuf,

    /// The design to apply
    description: String,

    /// Output file path for the edited photo
    #[arg(short, long)]
    output: PathBuf,

    /// Also list the plants in the design
    #[arg(long)]
    inventory: bool,

    /// Inventory language (english, malay, both)
    #[arg(short, long, default_value = "english")]
    language: Language,

    /// Also render a top-down plan view to this path (direct mode only)
    #[arg(long)]
    plan: Option<PathBuf>,
}

#[derive(Args)]
struct InfographicArgs {
    /// Photo of the garden
    photo: PathBuf,

    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Label language (english, malay, both)
    #[arg(short, long, default_value = "english")]
    language: Language,
}

#[derive(Args)]
struct InventoryArgs {
    /// The design to inventory
    description: String,

    /// Transformed photo with numbered plant markers
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Inventory language (english, malay, both)
    #[arg(short, long, default_value = "english")]
    language: Language,
}

#[derive(Args)]
struct SuggestArgs {
    /// Photo of the property
    photo: PathBuf,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8888")]
    addr: SocketAddr,

    /// Deployment layout to emulate
    #[arg(long, value_enum)]
    target: Option<DeploymentTarget>,

    /// Forward image requests to the requested model unchanged
    #[arg(long)]
    no_substitute: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ubahlans=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Transform(args) => transform(&studio(&cli).await?, args, cli.json).await?,
        Commands::Infographic(args) => infographic(&studio(&cli).await?, args, cli.json).await?,
        Commands::Inventory(args) => inventory(&studio(&cli).await?, args, cli.json).await?,
        Commands::Suggest(args) => suggest(&studio(&cli).await?, args, cli.json).await?,
        Commands::Models => list_models(&client_config(&cli)?, cli.json).await?,
        Commands::Serve(args) => serve(args).await?,
    }

    Ok(())
}

fn client_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_env()?;
    if let Some(ref model) = cli.image_model {
        config.image_model = model.clone();
    }
    if let Some(ref model) = cli.text_model {
        config.text_model = model.clone();
    }
    Ok(config)
}

async fn studio(cli: &Cli) -> anyhow::Result<Studio> {
    let mut config = client_config(cli)?;
    tracing::debug!(mode = config.mode.label(), "client configured");

    if cli.discover {
        match HttpTransport::new(&config).discover_models().await {
            Ok(selection) => config = config.with_selection(&selection),
            Err(e) => tracing::warn!("model discovery failed, keeping configured models: {e}"),
        }
    }
    Ok(Studio::new(config))
}

fn read_photo(path: &Path) -> anyhow::Result<ImagePayload> {
    ImagePayload::read(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))
}

/// Saves a rendered image, returning the path actually written.
fn save_rendering(rendering: &Rendering, path: &Path) -> anyhow::Result<Option<PathBuf>> {
    match rendering.image() {
        Some(image) => {
            let path = image.output_path(path);
            image.save(&path)?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

fn rendering_json(rendering: &Rendering, output: Option<&Path>) -> serde_json::Value {
    match rendering {
        Rendering::Rendered { image, model } => serde_json::json!({
            "degraded": false,
            "output": output.map(|p| p.display().to_string()),
            "model": model,
            "size_bytes": image.size(),
            "mime_type": image.mime_type,
        }),
        Rendering::Described { description, cause } => serde_json::json!({
            "degraded": true,
            "description": description,
            "cause": cause,
        }),
    }
}

fn print_rendering(label: &str, rendering: &Rendering, output: Option<&Path>) {
    match rendering {
        Rendering::Rendered { image, model } => {
            let output = output.map(|p| p.display().to_string()).unwrap_or_default();
            println!("{label}: {output} ({} bytes) via {model}", image.size());
        }
        Rendering::Described { description, cause } => {
            println!("{label}: no image produced ({cause})");
            println!("\n{description}");
        }
    }
}

async fn transform(studio: &Studio, args: &TransformArgs, json_output: bool) -> anyhow::Result<()> {
    let photo = read_photo(&args.photo)?;
    let options = DesignOptions {
        inventory: args.inventory.then_some(args.language),
        plan_view: args.plan.is_some(),
    };

    let design = studio.design(&photo, &args.description, options).await?;

    let output = save_rendering(&design.transformation, &args.output)?;
    let plan_output = match (&design.plan_view, &args.plan) {
        (Some(plan), Some(path)) => save_rendering(plan, path)?,
        _ => None,
    };

    if json_output {
        let result = serde_json::json!({
            "type": "transform",
            "transformation": rendering_json(&design.transformation, output.as_deref()),
            "inventory": design.inventory,
            "plan_view": design
                .plan_view
                .as_ref()
                .map(|plan| rendering_json(plan, plan_output.as_deref())),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_rendering("Transformed", &design.transformation, output.as_deref());
        if let Some(ref plan) = design.plan_view {
            print_rendering("Plan view", plan, plan_output.as_deref());
        }
        if let Some(ref list) = design.inventory {
            println!("\nPlant inventory:\n{list}");
        }
    }

    Ok(())
}

async fn infographic(
    studio: &Studio,
    args: &InfographicArgs,
    json_output: bool,
) -> anyhow::Result<()> {
    let photo = read_photo(&args.photo)?;
    let outcome = studio.infographic(&photo, args.language).await?;
    let output = outcome.image.output_path(&args.output);
    outcome.image.save(&output)?;

    if json_output {
        let result = serde_json::json!({
            "type": "infographic",
            "output": output.display().to_string(),
            "model": outcome.model,
            "attempts": outcome.attempts,
            "size_bytes": outcome.image.size(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated infographic: {} ({} bytes) via {}",
            output.display(),
            outcome.image.size(),
            outcome.model
        );
    }

    Ok(())
}

async fn inventory(studio: &Studio, args: &InventoryArgs, json_output: bool) -> anyhow::Result<()> {
    let image = args.image.as_deref().map(read_photo).transpose()?;
    let list = studio
        .inventory(&args.description, image.as_ref(), args.language)
        .await?;

    if json_output {
        let result = serde_json::json!({
            "type": "inventory",
            "language": args.language.as_str(),
            "inventory": list,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{list}");
    }

    Ok(())
}

async fn suggest(studio: &Studio, args: &SuggestArgs, json_output: bool) -> anyhow::Result<()> {
    let photo = read_photo(&args.photo)?;
    let idea = studio.suggest(&photo).await?;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "type": "suggestion", "prompt": idea }))?
        );
    } else {
        println!("{idea}");
    }

    Ok(())
}

async fn list_models(config: &ClientConfig, json_output: bool) -> anyhow::Result<()> {
    let selection = HttpTransport::new(config).discover_models().await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&selection)?);
    } else {
        println!("Provider lists {} models\n", selection.total_models);
        println!(
            "  image: {}",
            selection.image_model.as_deref().unwrap_or("(none found)")
        );
        println!(
            "  text:  {}",
            selection.text_model.as_deref().unwrap_or("(none found)")
        );
        println!("\nConfigured: image {} / text {}", config.image_model, config.text_model);
    }

    Ok(())
}

async fn serve(args: &ServeArgs) -> anyhow::Result<()> {
    let mut config = ProxyConfig::from_env()?;
    if let Some(target) = args.target {
        config.target = target;
    }
    if args.no_substitute {
        config.substitute = false;
    }
    proxy::serve(args.addr, config).await?;
    Ok(())
}
