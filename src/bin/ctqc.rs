use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ctqc", version, about = "Visual QC reports for longitudinal cortical thickness")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every figure for one subject and its HTML report.
    Report(ReportArgs),
    /// Build a single figure.
    #[command(subcommand)]
    Figure(FigureCommand),
}

/// Overrides shared by every command that draws figures.
#[derive(Args, Debug, Default)]
struct FigureFlags {
    /// JSON report configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated tissue labels to outline (1-6).
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<u8>>,

    /// Cuts per view axis.
    #[arg(long)]
    cuts: Option<usize>,

    /// Leave the brain mask out of segmentation figures.
    #[arg(long, default_value_t = false)]
    no_mask: bool,
}

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Subject output directory (`.../sub-<label>`).
    #[arg(short = 's', long = "subject-dir")]
    subject_dir: PathBuf,

    /// Template directory the pipeline ran against.
    #[arg(short = 't', long = "template-dir")]
    template_dir: PathBuf,

    /// Root for `figures/`; defaults to the subject directory.
    #[arg(short = 'o', long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Jinja-style HTML template; sees `images` (source, snippet pairs) and `antscmd`.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Where `<subject>.html` is written; defaults to the working directory.
    #[arg(long)]
    report_dir: Option<PathBuf>,

    #[command(flatten)]
    flags: FigureFlags,
}

#[derive(Subcommand, Debug)]
enum FigureCommand {
    /// Brain mask outlined on the anatomical image.
    Brain {
        /// Anatomical image with skull.
        #[arg(long)]
        anat: PathBuf,
        /// Brain extraction mask.
        #[arg(long)]
        mask: PathBuf,
        /// Output SVG (`.svg` is appended when missing).
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        flags: FigureFlags,
    },
    /// Tissue contours on the skull-stripped anatomical image.
    Seg {
        /// Anatomical image.
        #[arg(long)]
        anat: PathBuf,
        /// Six-label segmentation.
        #[arg(long)]
        seg: PathBuf,
        /// Brain extraction mask.
        #[arg(long)]
        mask: PathBuf,
        /// Output SVG (`.svg` is appended when missing).
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        flags: FigureFlags,
    },
    /// Moving image against the fixed image it was registered to.
    Reg {
        /// Registered (moving) image.
        #[arg(long)]
        moving: PathBuf,
        /// Reference (fixed) image.
        #[arg(long)]
        fixed: PathBuf,
        /// Mask in fixed space that picks the cuts.
        #[arg(long)]
        mask: PathBuf,
        /// Output SVG (`.svg` is appended when missing).
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        flags: FigureFlags,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Report(args) => cmd_report(args),
        Command::Figure(cmd) => cmd_figure(cmd),
    }
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(flags: &FigureFlags) -> anyhow::Result<ctqc::ReportConfig> {
    let mut cfg = match &flags.config {
        Some(path) => ctqc::ReportConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => ctqc::ReportConfig::default(),
    };
    if let Some(labels) = &flags.labels {
        cfg.labels = labels.clone();
    }
    if let Some(cuts) = flags.cuts {
        cfg.cuts = cuts;
    }
    if flags.no_mask {
        cfg.segmentation_includes_mask = false;
    }
    cfg.validate().context("invalid figure settings")?;
    Ok(cfg)
}

fn cmd_report(args: ReportArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args.flags)?;
    let report_dir = match args.report_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("resolve working directory")?,
    };

    let request = ctqc::ReportRequest {
        subject_dir: args.subject_dir,
        template_dir: args.template_dir,
        out_dir: args.out_dir,
        report_dir,
        options: cfg.figure_options()?,
        template: args.template.or(cfg.template),
    };
    let out = ctqc::generate_report(&request, ctqc::SvgCompositor::default())
        .with_context(|| format!("report for '{}'", request.subject_dir.display()))?;

    eprintln!("wrote {} ({} figures)", out.html.display(), out.figures.len());
    Ok(())
}

fn cmd_figure(cmd: FigureCommand) -> anyhow::Result<()> {
    let flags = match &cmd {
        FigureCommand::Brain { flags, .. }
        | FigureCommand::Seg { flags, .. }
        | FigureCommand::Reg { flags, .. } => flags,
    };
    let opts = load_config(flags)?.figure_options()?;
    let mut composer = ctqc::FigureComposer::with_options(ctqc::SvgCompositor::default(), opts);

    let written = match &cmd {
        FigureCommand::Brain {
            anat, mask, out, ..
        } => composer
            .brain_mask_figure(anat, mask, out)
            .context("brain mask figure")?,
        FigureCommand::Seg {
            anat,
            seg,
            mask,
            out,
            ..
        } => composer
            .segmentation_figure(anat, seg, mask, out)
            .context("segmentation figure")?,
        FigureCommand::Reg {
            moving,
            fixed,
            mask,
            out,
            ..
        } => composer
            .registration_figure(moving, fixed, mask, out)
            .context("registration figure")?,
    };

    eprintln!("wrote {}", written.display());
    Ok(())
}
