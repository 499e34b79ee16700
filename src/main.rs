//! hpsdrflash CLI - discover, configure, and program OpenHPSDR boards

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use hpsdrflash::config::AppConfig;
use hpsdrflash::models::{BoardDescriptor, FlashEvent};
use hpsdrflash::protocol::{self, DebugDump};
use hpsdrflash::remote::RemoteClient;
use hpsdrflash::{FirmwareImage, interfaces, utils};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "hpsdrflash")]
#[command(about = "OpenHPSDR protocol-2 board programmer - discover, set addresses, flash RBF firmware")]
struct Cli {
    /// Wire-level packet dump mode
    #[arg(long, global = true, value_enum, default_value_t = DebugDump::None)]
    debug: DebugDump,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Load saved settings first ("default" or a file path); explicit flags
    /// still win
    #[arg(long, global = true)]
    load: Option<String>,

    /// After merging flags, save the effective settings ("default" or a
    /// file path)
    #[arg(long, global = true)]
    save: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List host network interfaces
    Interfaces,
    /// Discover boards on one interface
    Discover {
        /// Interface index (see `interfaces`)
        #[arg(short, long)]
        index: Option<u32>,
        /// Collect every board answering within the window instead of the
        /// first reply
        #[arg(long)]
        all: bool,
        /// Collection window for --all, milliseconds (defaults to the saved
        /// setting)
        #[arg(long)]
        wait: Option<u64>,
    },
    /// Set a board's IPv4 address (or revert it to DHCP), then rediscover
    SetIp {
        #[arg(short, long)]
        index: Option<u32>,
        /// Target board MAC (colon-hex, as discovery prints it)
        #[arg(short, long)]
        mac: Option<String>,
        /// New dotted-quad address, or "dhcp"
        #[arg(short, long)]
        new_ip: Option<String>,
        /// Settling delay before the confirming rediscovery, seconds
        #[arg(long)]
        ddelay: Option<u64>,
    },
    /// Erase a board's firmware flash
    Erase {
        #[arg(short, long)]
        index: Option<u32>,
        #[arg(short, long)]
        mac: Option<String>,
    },
    /// Erase a board and program an RBF bitstream into it
    Flash {
        #[arg(short, long)]
        index: Option<u32>,
        #[arg(short, long)]
        mac: Option<String>,
        /// RBF file to program
        #[arg(short, long)]
        rbf: Option<PathBuf>,
        /// Skip the RBF-filename / board-name match check
        #[arg(long)]
        force: bool,
    },
    /// Show the effective settings
    Settings,
    /// Drive a remote hpsdrflash-server
    Remote {
        /// Server URL (defaults to the saved setting)
        #[arg(short, long)]
        server: Option<String>,
        #[command(subcommand)]
        command: RemoteCommands,
    },
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// Trigger a discovery on the server
    Discover {
        #[arg(short, long, default_value = "0")]
        index: u32,
        #[arg(long)]
        all: bool,
    },
    /// Ask the server to push a new address to a board
    SetIp {
        #[arg(short, long, default_value = "0")]
        index: u32,
        #[arg(short, long)]
        mac: String,
        /// New dotted-quad address, or "dhcp"
        #[arg(short, long)]
        new_ip: String,
    },
    /// Upload an RBF and flash a board through the server
    Flash {
        #[arg(short, long, default_value = "0")]
        index: u32,
        #[arg(short, long)]
        mac: String,
        #[arg(short, long)]
        rbf: PathBuf,
        /// Follow the progress stream until the run finishes
        #[arg(long)]
        watch: bool,
    },
    /// Follow the server's progress stream
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::logging::init_cli_logging(cli.verbose, cli.quiet)?;

    let mut config = match cli.load.as_deref() {
        Some("default") | Some("Default") => AppConfig::load(AppConfig::default_path())
            .context("failed to load default settings")?,
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if cli.debug != DebugDump::None {
        config.debug = cli.debug;
    }

    let result = match cli.command {
        Commands::Interfaces => cmd_interfaces(),
        Commands::Discover { index, all, wait } => {
            if let Some(index) = index {
                config.interface_index = index;
            }
            if let Some(wait) = wait {
                config.discovery_wait_ms = wait;
            }
            cmd_discover(&config, all).await
        }
        Commands::SetIp {
            index,
            mac,
            new_ip,
            ddelay,
        } => {
            apply_overrides(&mut config, index, mac, None);
            if let Some(new_ip) = new_ip {
                config.new_ip = Some(new_ip);
            }
            if let Some(ddelay) = ddelay {
                config.discovery_delay_secs = ddelay;
            }
            cmd_set_ip(&config).await
        }
        Commands::Erase { index, mac } => {
            apply_overrides(&mut config, index, mac, None);
            cmd_erase(&config).await
        }
        Commands::Flash {
            index,
            mac,
            rbf,
            force,
        } => {
            apply_overrides(&mut config, index, mac, rbf);
            cmd_flash(&config, force).await
        }
        Commands::Settings => {
            print_settings(&config);
            Ok(())
        }
        Commands::Remote { server, command } => {
            let url = server.unwrap_or_else(|| config.server_url.clone());
            cmd_remote(&url, command).await
        }
    };

    match cli.save.as_deref() {
        Some("default") | Some("Default") => config.save(AppConfig::default_path())?,
        Some(path) => config.save(path)?,
        None => {}
    }

    result
}

fn apply_overrides(
    config: &mut AppConfig,
    index: Option<u32>,
    mac: Option<String>,
    rbf: Option<PathBuf>,
) {
    if let Some(index) = index {
        config.interface_index = index;
    }
    if let Some(mac) = mac {
        config.select_mac = Some(mac);
    }
    if let Some(rbf) = rbf {
        config.rbf_path = Some(rbf);
    }
}

fn cmd_interfaces() -> Result<()> {
    let list = interfaces::enumerate()?;
    for descriptor in &list {
        let ipv4 = descriptor
            .ipv4
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        let ipv6 = descriptor
            .ipv6
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    {} - {} ({}) {} {}",
            descriptor.index, descriptor.name, descriptor.mac, ipv4, ipv6
        );
    }
    Ok(())
}

fn print_board(board: &BoardDescriptor) {
    println!();
    println!("        Board Type: {}", board.board);
    println!("       HPSDR Board: ({})", board.mac_address);
    println!("     Board Address: {}", board.board_address);
    println!("          Protocol: {}", board.protocol);
    println!("          Firmware: {}", board.firmware);
    println!("         Receivers: {}", board.receivers);
    println!("       Freq. Input: {}", board.freq_input);
    println!("    IQ data format: {}", board.iq_format);
    println!("            Status: {}", board.status);
}

fn print_settings(config: &AppConfig) {
    println!("    Settings:");
    println!("         Interface: {}", config.interface_index);
    println!(
        "      Selected MAC: {}",
        config.select_mac.as_deref().unwrap_or("none")
    );
    println!(
        "          RBF file: {}",
        config
            .rbf_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "            New IP: {}",
        config.new_ip.as_deref().unwrap_or("none")
    );
    println!("             Debug: {}", config.debug);
    println!("            Ddelay: {} s", config.discovery_delay_secs);
    println!("  Discovery window: {} ms", config.discovery_wait_ms);
    println!("     Erase timeout: {} s", config.erase_timeout_secs);
    println!("        Server URL: {}", config.server_url);
    println!("     Settings file: {}", AppConfig::default_path().display());
}

async fn cmd_discover(config: &AppConfig, all: bool) -> Result<()> {
    let config = config.clone();
    let boards = tokio::task::spawn_blocking(move || {
        let interface = interfaces::by_index(config.interface_index)?;
        if all {
            protocol::discover_all(
                &interface,
                Duration::from_millis(config.discovery_wait_ms),
                config.debug,
            )
        } else {
            protocol::discover(&interface, &config.retry_policy(), config.debug)
                .map(|board| vec![board])
        }
    })
    .await??;

    if boards.is_empty() {
        println!("    No boards answered.");
    }
    for board in &boards {
        print_board(board);
    }
    Ok(())
}

/// Discover on the configured interface and pick the configured board
fn discover_selected(config: &AppConfig) -> Result<BoardDescriptor> {
    let mac = config
        .select_mac
        .as_deref()
        .ok_or_else(|| anyhow!("no board MAC selected; pass --mac or save one in settings"))?;
    let interface = interfaces::by_index(config.interface_index)?;
    let boards = protocol::discover_all(
        &interface,
        Duration::from_millis(config.discovery_wait_ms),
        config.debug,
    )?;
    boards
        .into_iter()
        .find(|b| b.mac_address.eq_ignore_ascii_case(mac))
        .ok_or_else(|| anyhow!("no board with MAC {} answered discovery", mac))
}

async fn cmd_set_ip(config: &AppConfig) -> Result<()> {
    let new_ip_str = config
        .new_ip
        .clone()
        .ok_or_else(|| anyhow!("no new IP given; pass --new-ip or save one in settings"))?;
    let new_ip: Ipv4Addr = if new_ip_str.eq_ignore_ascii_case("dhcp") {
        Ipv4Addr::UNSPECIFIED
    } else {
        new_ip_str
            .parse()
            .with_context(|| format!("invalid IPv4 address: {}", new_ip_str))?
    };

    let config = config.clone();
    let board = tokio::task::spawn_blocking({
        let config = config.clone();
        move || {
            let board = discover_selected(&config)?;
            let interface = interfaces::by_index(config.interface_index)?;

            if protocol::is_dhcp_sentinel(new_ip) {
                println!(
                    "     Changing IP address from {} to DHCP",
                    board.board_address
                );
            } else {
                println!(
                    "     Changing IP address from {} to {}",
                    board.board_address, new_ip
                );
            }

            let result = protocol::set_address(&interface, &board, new_ip, config.debug)?;
            println!("    {}: {} -> {}", result.message, result.old_address, result.new_address);

            // The change is unacknowledged; rediscovery after the settling
            // delay confirms it
            std::thread::sleep(Duration::from_secs(config.discovery_delay_secs));
            discover_selected(&config)
        }
    })
    .await??;

    print_board(&board);
    Ok(())
}

/// Print progress events arriving from a protocol run
fn spawn_event_printer(
    rx: std::sync::mpsc::Receiver<FlashEvent>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while let Ok(event) = rx.recv() {
            match event {
                FlashEvent::EraseStarted { .. } => println!("     Erase started"),
                FlashEvent::EraseFinished { .. } => println!("    Erase finished"),
                FlashEvent::ProgramStarted { total_blocks, .. } => {
                    println!("  Programming {} blocks", total_blocks)
                }
                FlashEvent::BlockProgrammed {
                    block,
                    total_blocks,
                    percent,
                    ..
                } => {
                    if block % 64 == 0 || block + 1 == total_blocks {
                        println!(
                            "           block {}/{} ({:.1}%)",
                            block + 1,
                            total_blocks,
                            percent
                        );
                    }
                }
                FlashEvent::ProgramCompleted { early, .. } => {
                    if early {
                        println!("  Program complete (board signalled early)")
                    } else {
                        println!("  Program complete")
                    }
                }
                FlashEvent::Failed { error, .. } => println!("  FAILED: {}", error),
            }
        }
    })
}

async fn cmd_erase(config: &AppConfig) -> Result<()> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let board = discover_selected(&config)?;
        print_board(&board);
        let interface = interfaces::by_index(config.interface_index)?;

        let (tx, rx) = std::sync::mpsc::channel();
        let printer = spawn_event_printer(rx);
        let result = protocol::erase(
            &interface,
            &board,
            &config.retry_policy(),
            Some(&tx),
            config.debug,
        );
        drop(tx);
        let _ = printer.join();
        result.map_err(Into::into)
    })
    .await?
}

async fn cmd_flash(config: &AppConfig, force: bool) -> Result<()> {
    let rbf_path = config
        .rbf_path
        .clone()
        .ok_or_else(|| anyhow!("no RBF file given; pass --rbf or save one in settings"))?;
    let image = FirmwareImage::open(&rbf_path)?;
    println!("    Found rbf file: {}", image.source());
    println!("     Size rbf file: {} bytes", image.len());
    println!("Size rbf in memory: {} bytes", image.padded_len());
    println!("            Blocks: {}", image.blocks());

    let config = config.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let board = discover_selected(&config)?;
        print_board(&board);

        // Flashing the wrong model's bitstream bricks the board; require
        // the file name to mention the board type
        let file_name = rbf_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !file_name.contains(&board.board.name().to_lowercase()) && !force {
            bail!(
                "RBF name \"{}\" does not mention board type {}; use --force to program anyway",
                rbf_path.display(),
                board.board
            );
        }

        let interface = interfaces::by_index(config.interface_index)?;
        let policy = config.retry_policy();
        let (tx, rx) = std::sync::mpsc::channel();
        let printer = spawn_event_printer(rx);

        let result = protocol::erase(&interface, &board, &policy, Some(&tx), config.debug)
            .and_then(|()| {
                protocol::program(&interface, &board, &image, &policy, Some(&tx), config.debug)
            });

        drop(tx);
        let _ = printer.join();
        result?;
        Ok(())
    })
    .await?
}

async fn cmd_remote(server_url: &str, command: RemoteCommands) -> Result<()> {
    let client = RemoteClient::new(server_url);
    match command {
        RemoteCommands::Discover { index, all } => {
            let response = client.discover(index, all).await?;
            if !response.success {
                bail!("{}", response.message);
            }
            println!("    {}", response.message);
            for board in &response.boards {
                print_board(board);
            }
            Ok(())
        }
        RemoteCommands::SetIp { index, mac, new_ip } => {
            let response = client.set_address(index, &mac, &new_ip).await?;
            if !response.success {
                bail!("{}", response.message);
            }
            println!("    {}", response.message);
            if let Some(result) = &response.result {
                println!(
                    "    {} ({}) -> {}",
                    result.old_address, result.mac_address, result.new_address
                );
            }
            Ok(())
        }
        RemoteCommands::Flash {
            index,
            mac,
            rbf,
            watch,
        } => {
            let response = client.flash(index, &mac, &rbf).await?;
            if !response.success {
                bail!("{}", response.message);
            }
            println!(
                "    {} (id {})",
                response.message,
                response.flash_id.as_deref().unwrap_or("-")
            );
            if watch {
                client.watch_progress().await?;
            }
            Ok(())
        }
        RemoteCommands::Watch => client.watch_progress().await,
    }
}
