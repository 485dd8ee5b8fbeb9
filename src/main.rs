use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use parking_shade::sources::{
    CachedObstacleSource, FileObstacleSource, FileWeatherSource, ObstacleSource,
    StaticObstacleSource,
};
use parking_shade::sun_position::{DaylightStatus, DaylightWindow};
use parking_shade::{Config, GeoPoint, ShadowAnalyzer, SunCalculator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "parking-shade",
    version,
    about = "Will the parked car be in the sun or in shadow?"
)]
struct Cli {
    /// JSON config file (defaults to the per-user config if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Time zone for printed times, e.g. Europe/Kyiv
    #[arg(long, global = true)]
    tz: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sun/shadow intervals for the next horizon
    Timeline(TimelineArgs),
    /// Sunrise/sunset status right now
    Status(StatusArgs),
}

#[derive(Args, Debug)]
struct Location {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
}

#[derive(Args, Debug)]
struct TimelineArgs {
    #[command(flatten)]
    location: Location,

    /// Saved Overpass JSON response with buildings and trees around the location
    #[arg(long)]
    obstacles: Option<PathBuf>,

    /// JSON weather snapshot: {"cloud_cover": .., "precipitation_mm": ..}
    #[arg(long)]
    weather: Option<PathBuf>,

    /// Start of the window (RFC 3339), defaults to now
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Direction the car faces, degrees from north
    #[arg(long)]
    car_bearing: Option<f64>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct StatusArgs {
    #[command(flatten)]
    location: Location,

    /// Instant to evaluate (RFC 3339), defaults to now
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn resolve_tz(cli_tz: Option<&str>, config: &Config) -> anyhow::Result<Tz> {
    match cli_tz {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("unknown time zone {:?}: {}", name, e)),
        None => Ok(config.tz()?),
    }
}

async fn run_timeline(args: TimelineArgs, config: Config, tz: Tz) -> anyhow::Result<()> {
    let observer = GeoPoint::new(args.location.lat, args.location.lon)?;

    let source: Arc<dyn ObstacleSource> = match &args.obstacles {
        Some(path) => Arc::new(CachedObstacleSource::new(
            FileObstacleSource::new(path.clone()),
            config.cache_ttl(),
        )),
        None => {
            info!("No obstacle file given, assuming open sky");
            Arc::new(StaticObstacleSource::new(Vec::new()))
        }
    };

    let sun = match config.angle_precision {
        Some(precision) => SunCalculator::with_angle_precision(precision),
        None => SunCalculator::new(),
    };

    let mut analyzer = ShadowAnalyzer::new(sun, source, config)?;
    if let Some(path) = &args.weather {
        analyzer = analyzer.with_weather(Arc::new(FileWeatherSource::new(path.clone())));
    }

    let start = args.start.unwrap_or_else(Utc::now);
    let report = analyzer
        .analyze(observer, start, args.car_bearing)
        .await
        .context("shadow analysis failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render(tz));
    }
    Ok(())
}

fn run_status(args: StatusArgs, config: &Config, tz: Tz) -> anyhow::Result<()> {
    let point = GeoPoint::new(args.location.lat, args.location.lon)?;
    let now = args.at.unwrap_or_else(Utc::now);
    let calc = match config.angle_precision {
        Some(precision) => SunCalculator::with_angle_precision(precision),
        None => SunCalculator::new(),
    };

    match calc.daylight_status(&point, now) {
        DaylightStatus::BeforeSunrise { minutes_until } => println!(
            "It is dark now. The sun rises in {} min.",
            minutes_until
        ),
        DaylightStatus::AfterSunset => println!("The sun has set. The spot is in shadow."),
        DaylightStatus::SunUp => {
            println!("The sun is above the horizon. There may be no shadow yet.")
        }
        DaylightStatus::PolarNight => println!("Polar night: the sun does not rise today."),
        DaylightStatus::MidnightSun => println!("Midnight sun: the sun does not set today."),
    }

    let local_date = now.with_timezone(&tz).date_naive();
    if let DaylightWindow::Normal { sunrise, sunset } = calc.sunrise_sunset(local_date, &point) {
        println!(
            "Sunrise {}, sunset {}",
            sunrise.with_timezone(&tz).format("%H:%M"),
            sunset.with_timezone(&tz).format("%H:%M")
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref()).context("failed to load config")?;
    let tz = resolve_tz(cli.tz.as_deref(), &config)?;

    match cli.command {
        Command::Timeline(args) => run_timeline(args, config, tz).await,
        Command::Status(args) => run_status(args, &config, tz),
    }
}
