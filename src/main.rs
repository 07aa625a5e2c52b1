use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use cx_release::config;
use cx_release::release::{ReleaseOptions, ReleaseRunner};
use cx_release::ui;
use cx_release::version::ReleaseKind;

#[derive(clap::Parser)]
#[command(
    name = "cx-release",
    about = "Create and publish releases of the imaging platform"
)]
struct Args {
    #[arg(
        short = 'r',
        long = "release_type",
        value_enum,
        default_value_t = ReleaseTypeArg::Alpha,
        help = "Type of release to create"
    )]
    release_type: ReleaseTypeArg,

    #[arg(long, help = "Trigger the remote jenkins release job after tagging")]
    jenkins_release: bool,

    #[arg(short, long, default_value = "user", help = "Jenkins user name")]
    username: String,

    #[arg(short, long, default_value = "not set", help = "Jenkins password or API token")]
    password: String,

    #[arg(long, help = "Configure and build the source tree locally")]
    native_build: bool,

    #[arg(short = 'j', long, help = "Build thread count override")]
    threads: Option<u32>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Source tree location override")]
    source: Option<PathBuf>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ReleaseTypeArg {
    Release,
    Beta,
    Alpha,
}

impl From<ReleaseTypeArg> for ReleaseKind {
    fn from(arg: ReleaseTypeArg) -> Self {
        match arg {
            ReleaseTypeArg::Release => ReleaseKind::Release,
            ReleaseTypeArg::Beta => ReleaseKind::Beta,
            ReleaseTypeArg::Alpha => ReleaseKind::Alpha,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(source) = args.source {
        config.paths.source = source;
    }

    let options = ReleaseOptions {
        kind: args.release_type.into(),
        jenkins_release: args.jenkins_release,
        username: args.username,
        password: args.password,
        native_build: args.native_build,
        threads: args.threads,
    };

    let mut runner = ReleaseRunner::new(config, options);
    match runner.run() {
        Ok(summary) => {
            if !summary.publish_tag.is_empty() {
                println!("{}", summary.publish_tag);
            }
            Ok(())
        }
        Err(e) => {
            ui::error(&e.to_string());
            std::process::exit(1);
        }
    }
}
