use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use stepsync::config::AppConfig;
use stepsync::motion::MotionPair;
use stepsync::pose::{frame_id, load, PosePair};
use stepsync::report::{ContinuousReport, SegmentReport, StatusCounts};

#[derive(Parser)]
#[command(name = "stepsync", version, about = "Dance timing analyzer")]
struct Cli {
    /// Path to a TOML config file (defaults to the XDG config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Pose document (.json, .yaml, .csv)
    input: PathBuf,

    /// Frames per second of both sequences
    #[arg(long)]
    fps: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Align at fixed time intervals using position + velocity similarity
    Continuous {
        #[command(flatten)]
        input: InputArgs,

        /// Search radius around the expected user frame, in seconds
        #[arg(long)]
        window_radius: Option<f64>,

        /// Spacing between analysis points, in seconds
        #[arg(long)]
        interval: Option<f64>,

        #[arg(long)]
        pose_weight: Option<f64>,

        #[arg(long)]
        velocity_weight: Option<f64>,

        /// Seconds ahead of the reference before a point counts as early
        #[arg(long)]
        early_threshold: Option<f64>,

        /// Seconds behind the reference before a point counts as late
        #[arg(long)]
        late_threshold: Option<f64>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Split the reference at key poses and align each segment
    Segments {
        #[command(flatten)]
        input: InputArgs,

        /// Maximum frame offset searched per segment
        #[arg(long)]
        offset_window: Option<usize>,

        /// Mean joint speed below which a pause counts as a key pose
        #[arg(long)]
        motion_threshold: Option<f64>,

        #[arg(long)]
        early_threshold: Option<f64>,

        #[arg(long)]
        late_threshold: Option<f64>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the key poses detected in the reference
    KeyPoses {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long)]
        motion_threshold: Option<f64>,
    },

    /// Show what was loaded: frames, joints, root reference
    Inspect {
        #[command(flatten)]
        input: InputArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Explicit --config must load; the default location is optional
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Continuous {
            input,
            window_radius,
            interval,
            pose_weight,
            velocity_weight,
            early_threshold,
            late_threshold,
            format,
        } => {
            override_fps(&mut config, &input);
            let c = &mut config.continuous;
            set(&mut c.window_radius_sec, window_radius);
            set(&mut c.analysis_interval_sec, interval);
            set(&mut c.pose_weight, pose_weight);
            set(&mut c.velocity_weight, velocity_weight);
            set(&mut c.early_threshold, early_threshold);
            set(&mut c.late_threshold, late_threshold);
            config.validate().context("Invalid configuration")?;

            let motion = prepare(&input.input, config.fps)?;
            let report = stepsync::align::run_continuous(&motion, &config);
            match format {
                OutputFormat::Text => print_continuous(&report),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Csv => write_continuous_csv(&report)?,
            }
        }

        Commands::Segments {
            input,
            offset_window,
            motion_threshold,
            early_threshold,
            late_threshold,
            format,
        } => {
            override_fps(&mut config, &input);
            let s = &mut config.segments;
            set(&mut s.offset_window, offset_window);
            set(&mut s.motion_threshold, motion_threshold);
            set(&mut s.early_threshold, early_threshold);
            set(&mut s.late_threshold, late_threshold);
            config.validate().context("Invalid configuration")?;

            let motion = prepare(&input.input, config.fps)?;
            let report = stepsync::align::run_segments(&motion, &config);
            match format {
                OutputFormat::Text => print_segments(&report),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Csv => write_segment_csv(&report)?,
            }
        }

        Commands::KeyPoses {
            input,
            motion_threshold,
        } => {
            override_fps(&mut config, &input);
            set(&mut config.segments.motion_threshold, motion_threshold);
            config.validate().context("Invalid configuration")?;

            let motion = prepare(&input.input, config.fps)?;
            let speed = stepsync::motion::velocity::mean_speed(&motion.original.velocities);
            let key_poses = stepsync::align::keypose::key_poses_from_speed(
                &speed,
                config.segments.motion_threshold,
            );

            if key_poses.is_empty() {
                println!(
                    "No key poses below {:.3} in {} reference frames.",
                    config.segments.motion_threshold,
                    motion.original.len()
                );
                return Ok(());
            }

            println!("{:>6} {:<14} {:>8} {:>10}", "Index", "Frame", "Time", "Speed");
            println!("{}", "-".repeat(41));
            for &k in &key_poses {
                let id = &motion.original.frame_ids[k];
                println!(
                    "{:>6} {:<14} {:>7.2}s {:>10.4}",
                    k,
                    id,
                    frame_id::timestamp(id, config.fps).unwrap_or(k as f64 / config.fps),
                    speed[k]
                );
            }
            println!();
            println!(
                "{} key poses → {} segments",
                key_poses.len(),
                key_poses.len().saturating_sub(1)
            );
        }

        Commands::Inspect { input } => {
            override_fps(&mut config, &input);
            config.validate().context("Invalid configuration")?;

            let pair = load_pair(&input.input)?;
            let motion = MotionPair::prepare(&pair, config.fps);

            println!("Pose data: {}", input.input.display());
            println!("==================");
            println!("Joints ({}):  {}", pair.joints.len(), pair.joints.join(", "));
            println!("Coordinates:  {}D", pair.depth);
            println!();
            for (dancer, data) in [("Original", &motion.original), ("User", &motion.user)] {
                println!(
                    "{:<9} {:>6} frames  {:>7.2}s  {} .. {}  root = {}",
                    dancer,
                    data.len(),
                    data.len() as f64 / config.fps,
                    data.frame_ids.first().map(String::as_str).unwrap_or("-"),
                    data.frame_ids.last().map(String::as_str).unwrap_or("-"),
                    data.root.describe(&pair.joints),
                );
            }
        }
    }

    Ok(())
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn override_fps(config: &mut AppConfig, input: &InputArgs) {
    set(&mut config.fps, input.fps);
}

fn load_pair(path: &Path) -> Result<PosePair> {
    let data = load::load_path(path)
        .with_context(|| format!("Failed to read pose data from {}", path.display()))?;
    PosePair::new(&data).with_context(|| format!("Invalid pose data in {}", path.display()))
}

fn prepare(path: &Path, fps: f64) -> Result<MotionPair> {
    let pair = load_pair(path)?;
    Ok(MotionPair::prepare(&pair, fps))
}

fn print_counts(counts: &StatusCounts, unit: &str) {
    println!(
        "{} {}: {} on time ({:.1}%), {} early ({:.1}%), {} late ({:.1}%)",
        counts.total,
        unit,
        counts.on_time,
        counts.on_time_pct,
        counts.early,
        counts.early_pct,
        counts.late,
        counts.late_pct,
    );
}

/// Print continuous alignment points with their verdicts.
fn print_continuous(report: &ContinuousReport) {
    if report.entries.is_empty() {
        println!("No alignment points found.");
        return;
    }

    println!(
        "{:>7} {:<12} {:<12} {:>6} {:>8}  {:>5} {:>5} {:>5}  {}",
        "Time", "Reference", "User", "Frames", "Offset", "Pose", "Vel", "Score", "Status"
    );
    println!("{}", "-".repeat(84));

    for e in &report.entries {
        let r = &e.record;
        println!(
            "{:>6.2}s {:<12} {:<12} {:>+6} {:>+7.3}s  {:>5.2} {:>5.2} {:>5.2}  {}",
            r.query_time,
            r.reference_frame_id,
            r.matched_user_frame_id,
            r.frame_offset,
            r.time_offset_seconds,
            r.pose_similarity,
            r.velocity_similarity,
            r.combined_score,
            e.status,
        );
    }

    let s = &report.summary;
    println!();
    print_counts(&s.counts, "points");
    println!(
        "Mean similarity: pose {:.3}, velocity {:.3}, combined {:.3}",
        s.mean_pose_similarity, s.mean_velocity_similarity, s.mean_combined_score
    );
    println!("Mean |offset|: {:.3}s", s.mean_abs_time_offset);
    println!(
        "Early < -{:.2}s, Late > +{:.2}s",
        report.thresholds.early, report.thresholds.late
    );
}

/// Print per-segment alignment results.
fn print_segments(report: &SegmentReport) {
    if report.entries.is_empty() {
        println!("No segments found (fewer than two key poses detected).");
        return;
    }

    println!(
        "{:>3} {:<18} {:<18} {:>6} {:>8}  {:>5} {:>8}  {}",
        "Seg", "Reference", "User", "Frames", "Offset", "Sim", "PosErr", "Status"
    );
    println!("{}", "-".repeat(84));

    for e in &report.entries {
        let r = &e.record;
        println!(
            "{:>3} {:<18} {:<18} {:>+6} {:>+7.3}s  {:>5.2} {:>8.3}  {}",
            r.segment_index,
            format!("{}..{}", r.reference_start, r.reference_end),
            format!("{}..{}", r.user_start, r.user_end),
            r.best_offset,
            r.time_offset_seconds,
            r.mean_similarity,
            r.position_error,
            e.status,
        );
    }

    let s = &report.summary;
    println!();
    print_counts(&s.counts, "segments");
    println!(
        "Mean similarity {:.3}, mean position error {:.3}, mean |offset| {:.3}s",
        s.mean_similarity, s.mean_position_error, s.mean_abs_time_offset
    );
    println!(
        "Early < -{:.2}s, Late > +{:.2}s",
        report.thresholds.early, report.thresholds.late
    );
}

fn write_continuous_csv(report: &ContinuousReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record([
        "query_time",
        "reference_frame_id",
        "matched_user_frame_id",
        "frame_offset",
        "time_offset_seconds",
        "pose_similarity",
        "velocity_similarity",
        "combined_score",
        "status",
    ])?;
    for e in &report.entries {
        let r = &e.record;
        wtr.write_record([
            format!("{:.4}", r.query_time),
            r.reference_frame_id.clone(),
            r.matched_user_frame_id.clone(),
            r.frame_offset.to_string(),
            format!("{:.4}", r.time_offset_seconds),
            format!("{:.4}", r.pose_similarity),
            format!("{:.4}", r.velocity_similarity),
            format!("{:.4}", r.combined_score),
            e.status.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_segment_csv(report: &SegmentReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record([
        "segment_index",
        "reference_start",
        "reference_end",
        "user_start",
        "user_end",
        "best_offset",
        "time_offset_seconds",
        "mean_similarity",
        "position_error",
        "status",
    ])?;
    for e in &report.entries {
        let r = &e.record;
        wtr.write_record([
            r.segment_index.to_string(),
            r.reference_start.to_string(),
            r.reference_end.to_string(),
            r.user_start.to_string(),
            r.user_end.to_string(),
            r.best_offset.to_string(),
            format!("{:.4}", r.time_offset_seconds),
            format!("{:.4}", r.mean_similarity),
            format!("{:.4}", r.position_error),
            e.status.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
