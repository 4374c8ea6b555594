use cfscsi::config::DriverConfig;
use cfscsi::{
    AccessMode, CfsDriver, CreateVolumeRequest, CsiController, CsiNode, NodePublishVolumeRequest,
    VolumeCapability, VolumeId,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cfscsi")]
#[command(about = "Run CFS CSI driver operations by hand", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: DriverConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a volume using ./cfscsi --master m1:80 create pvc-1")]
    Create {
        #[arg(value_name = "NAME")]
        name: String,
        /// Requested capacity in bytes, 0 for the default
        #[arg(long, default_value_t = 0)]
        capacity_bytes: u64,
    },
    #[command(about = "Delete a volume using ./cfscsi --master m1:80 delete pvc-1")]
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
    #[command(about = "Check whether access modes are supported")]
    Validate {
        #[arg(value_name = "MODE", required = true)]
        modes: Vec<Mode>,
    },
    #[command(about = "Mount a volume using ./cfscsi publish pvc-1 /mnt/pvc-1")]
    Publish {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "TARGET")]
        target: String,
        #[arg(long)]
        read_only: bool,
        #[arg(long = "mount-flag")]
        mount_flags: Vec<String>,
    },
    #[command(about = "Unmount a target path using ./cfscsi unpublish /mnt/pvc-1")]
    Unpublish {
        #[arg(value_name = "TARGET")]
        target: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    SingleNodeWriter,
    SingleNodeReaderOnly,
    MultiNodeReaderOnly,
    MultiNodeSingleWriter,
    MultiNodeMultiWriter,
}

impl From<Mode> for AccessMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::SingleNodeWriter => AccessMode::SingleNodeWriter,
            Mode::SingleNodeReaderOnly => AccessMode::SingleNodeReaderOnly,
            Mode::MultiNodeReaderOnly => AccessMode::MultiNodeReaderOnly,
            Mode::MultiNodeSingleWriter => AccessMode::MultiNodeSingleWriter,
            Mode::MultiNodeMultiWriter => AccessMode::MultiNodeMultiWriter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let driver = CfsDriver::from_config(&cli.config)?;

    match cli.command {
        Commands::Create {
            name,
            capacity_bytes,
        } => {
            let vol = driver
                .create_volume(CreateVolumeRequest {
                    name,
                    capacity_bytes,
                    ..Default::default()
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&vol)?);
        }
        Commands::Delete { name } => {
            driver.delete_volume(&VolumeId(name)).await?;
            print_ok();
        }
        Commands::Validate { modes } => {
            let caps: Vec<_> = modes
                .into_iter()
                .map(|mode| VolumeCapability {
                    access_mode: mode.into(),
                    ..Default::default()
                })
                .collect();
            let supported = driver
                .validate_volume_capabilities(&VolumeId(String::new()), &caps)
                .await?;
            println!("{}", serde_json::json!({ "supported": supported }));
        }
        Commands::Publish {
            name,
            target,
            read_only,
            mount_flags,
        } => {
            driver
                .publish_volume(NodePublishVolumeRequest {
                    volume_id: VolumeId(name),
                    target_path: target,
                    volume_capability: VolumeCapability {
                        mount_flags,
                        ..Default::default()
                    },
                    read_only,
                    volume_context: Default::default(),
                })
                .await?;
            print_ok();
        }
        Commands::Unpublish { target } => {
            driver
                .unpublish_volume(&VolumeId(String::new()), &target)
                .await?;
            print_ok();
        }
    }
    Ok(())
}

fn print_ok() {
    println!("{}", serde_json::json!({ "ok": true }));
}
