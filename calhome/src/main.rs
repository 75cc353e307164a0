use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use calhome::instance::{dev_config, Instance};
use calhome_collections::provisioning::{Node, ProvisioningNode};
use calhome_collections::ProvisioningError;
use calhome_dav::caltypes::PropertyName;
use calhome_dav::xml;
use calhome_directory::config::*;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// A special mode dedicated to developers, NOT INTENDED FOR PRODUCTION
    #[clap(long)]
    dev: bool,

    #[clap(short, long, env = "CALHOME_CONFIG", default_value = "calhome.toml")]
    /// Path to the main calhome configuration file
    config_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(subcommand)]
    /// Browse the calendar home tree
    Tree(TreeCommand),

    #[clap(subcommand)]
    /// Configuration tooling
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum TreeCommand {
    /// Names of the children of a collection
    List { path: String },
    /// Describe the node at this path
    Show { path: String },
    /// The access control list of a node, as a DAV:acl element
    Acl { path: String },
    /// Provision the default calendar of a calendar home
    Provision { path: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load the configuration and build the tree, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "main=info,calhome=info")
    }

    // Abort on panic (same behavior as in Go)
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{}", panic_info);
        eprintln!("{:?}", backtrace::Backtrace::new());
        std::process::abort();
    }));

    // stdout carries the command output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config: Config = if args.dev {
        dev_config()
    } else {
        read_config(args.config_file.clone())
            .context(format!("'{:?}' must be a calhome configuration", args.config_file))?
    };

    let instance = Instance::from_config(config)?;

    match &args.command {
        Command::Config(ConfigCommand::Check) => {
            let tree = instance.tree();
            println!(
                "{} serves {}",
                tree.url(),
                tree.list_children()?.join(", ")
            );
        }
        Command::Tree(cmd) => tree_command(&instance, cmd).await?,
    }

    Ok(())
}

async fn tree_command(instance: &Instance, cmd: &TreeCommand) -> Result<()> {
    match cmd {
        TreeCommand::List { path } => {
            let node = instance.tree().locate(path)?;
            match node.list_children() {
                Ok(names) => names.iter().for_each(|n| println!("{}", n)),
                Err(ProvisioningError::Forbidden(_)) => bail!("{} can't be listed", node.url()),
                Err(e) => return Err(e.into()),
            }
        }
        TreeCommand::Show { path } => {
            let node = instance.tree().locate(path)?;
            show(&node).await?;
        }
        TreeCommand::Acl { path } => {
            let node = instance.tree().locate(path)?;
            println!("{}", xml::to_string(&node.access_control_list()).await?);
        }
        TreeCommand::Provision { path } => {
            let node = instance.tree().locate(path)?;
            let home = match node.as_home() {
                Some(home) => home.clone(),
                None => bail!("{} is a {}, not a calendar home", node.url(), node.kind()),
            };
            let home = home.provision_default_calendars().await?;
            show(&home.resolve_child("calendar")?).await?;
        }
    }
    Ok(())
}

async fn show(node: &Node) -> Result<()> {
    println!("url: {}", node.url());
    println!("kind: {}", node.kind());

    match node {
        Node::Home(home) => {
            let record = home.record();
            println!("guid: {}", record.guid);
            println!("owner: {}", home.owner());
            if let Some(name) = &record.full_name {
                println!("full name: {}", name);
            }
            match home.quota_root().await? {
                Some(limit) => println!("quota: {} bytes", limit),
                None => println!("quota: unlimited"),
            }
        }
        Node::HomeChild(child) => {
            println!("role: {}", child.role());
            for name in [
                PropertyName::ScheduleCalendarTransp,
                PropertyName::CalendarFreeBusySet,
                PropertyName::ScheduleDefaultCalendarUrl,
            ] {
                if let Some(prop) = child.collection().read_property(name).await? {
                    println!("{}", xml::to_string(&prop).await?);
                }
            }
        }
        _ => (),
    }

    match node.list_children() {
        Ok(names) => println!("children: {}", names.join(", ")),
        Err(ProvisioningError::Forbidden(_)) => println!("children: not listable"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
