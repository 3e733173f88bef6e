//! leap_sigil: interactive entry point.

use clap::Parser;

use leap_sigil::app::{api_key_from_env, run, AppConfig};

/// Hand-tracked magic circle with a Kamar-Taj librarian in the terminal.
#[derive(Parser, Debug)]
#[command(name = "leap_sigil", version, about)]
struct Cli {
    /// Window width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: usize,

    /// Window height in pixels.
    #[arg(long, default_value_t = 720)]
    height: usize,

    /// Seed for particle scatter (random if omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Text model used for spells and advice.
    #[arg(long, default_value = sigil_oracle::DEFAULT_MODEL)]
    model: String,

    /// Never call the text service, even if an API key is set.
    #[arg(long)]
    offline: bool,

    /// Dot every tracked landmark on top of the sigil.
    #[arg(long)]
    landmarks: bool,
}

impl Cli {
    fn into_config(self) -> AppConfig {
        AppConfig {
            width:          self.width,
            height:         self.height,
            model:          self.model,
            api_key:        if self.offline { None } else { api_key_from_env() },
            seed:           self.seed,
            show_landmarks: self.landmarks,
            ..AppConfig::default()
        }
    }
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let cli = Cli::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Leap Sigil: Sanctum Sanctorum Terminal              ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Mouse simulation  (use --features leap for hardware)");
    println!();
    println!("  Show your hand to summon the portal. Pinch to shrink the shield,");
    println!("  spread thumb and index to expand it.");
    println!("  Type here to talk to Wong; ask for a spell to change its color.");
    println!();

    let cfg = cli.into_config();
    if let Err(e) = run(cfg) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
