use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "reelstitch", version)]
struct Cli {
    /// Log per-clip placement and export details.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve clips and print the assembled timeline as JSON.
    Plan(PlanArgs),
    /// Render the title card as a PNG.
    Title(TitleArgs),
    /// Compile the job into an MP4 (requires `ffmpeg` and `ffprobe` on PATH).
    Compile(CompileArgs),
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Compile job JSON.
    #[arg(long)]
    job: PathBuf,

    /// Library root clip handles are resolved against. Defaults to the job's directory.
    #[arg(long)]
    library: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TitleArgs {
    /// Compile job JSON.
    #[arg(long)]
    job: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Extra directory of `.ttf`/`.otf` fonts.
    #[arg(long)]
    fonts: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Quality {
    Highest,
    Balanced,
    Fast,
}

impl From<Quality> for reelstitch::QualityPreset {
    fn from(q: Quality) -> Self {
        match q {
            Quality::Highest => Self::Highest,
            Quality::Balanced => Self::Balanced,
            Quality::Fast => Self::Fast,
        }
    }
}

#[derive(Parser, Debug)]
struct CompileArgs {
    /// Compile job JSON.
    #[arg(long)]
    job: PathBuf,

    /// Library root clip handles are resolved against. Defaults to the job's directory.
    #[arg(long)]
    library: Option<PathBuf>,

    /// Scratch directory for intermediate and final files.
    #[arg(long)]
    scratch: Option<PathBuf>,

    /// Copy the finished file here.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Encoder quality.
    #[arg(long, value_enum, default_value_t = Quality::Highest)]
    quality: Quality,

    /// Concurrent clip resolutions.
    #[arg(long, default_value_t = 4)]
    resolve_threads: usize,

    /// Extra directory of `.ttf`/`.otf` fonts for the title card.
    #[arg(long)]
    fonts: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Title(args) => cmd_title(args),
        Command::Compile(args) => cmd_compile(args),
    }
}

fn library_root(job: &Path, library: Option<PathBuf>) -> PathBuf {
    library.unwrap_or_else(|| {
        job.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn title_renderer(fonts: Option<&Path>) -> reelstitch::TitleCardRenderer {
    let dirs: Vec<&Path> = fonts.into_iter().collect();
    reelstitch::TitleCardRenderer::with_system_fonts(&dirs)
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let job = reelstitch::CompileJob::from_path(&args.job)?;
    let compiler = reelstitch::VideoCompiler::with_ffmpeg(
        library_root(&args.job, args.library),
        reelstitch::CompileOpts::default(),
    );
    let plan = compiler.plan(&job)?;
    let json = serde_json::to_string_pretty(&plan).context("serialize plan")?;
    println!("{json}");
    for skipped in &plan.timeline.skipped {
        eprintln!(
            "skipped clip #{} '{}': {}",
            skipped.media_index, skipped.source, skipped.reason
        );
    }
    Ok(())
}

fn cmd_title(args: TitleArgs) -> anyhow::Result<()> {
    let job = reelstitch::CompileJob::from_path(&args.job)?;
    let settings = &job.settings;
    if settings.title_text.is_empty() {
        anyhow::bail!("job has no title text");
    }
    let card = title_renderer(args.fonts.as_deref()).render(
        &settings.title_text,
        &settings.subtitle_text,
        settings.background_color,
        settings.canvas(),
    )?;
    card.write_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    if !reelstitch::ffmpeg_tools_available() {
        anyhow::bail!("`ffmpeg` and `ffprobe` must be on PATH");
    }
    let job = reelstitch::CompileJob::from_path(&args.job)?;

    let mut opts = reelstitch::CompileOpts {
        resolve_threads: args.resolve_threads,
        quality: args.quality.into(),
        ..reelstitch::CompileOpts::default()
    };
    if let Some(dir) = args.scratch {
        opts.scratch_dir = dir;
    }
    let compiler =
        reelstitch::VideoCompiler::with_ffmpeg(library_root(&args.job, args.library), opts)
            .with_title_renderer(title_renderer(args.fonts.as_deref()));

    let handle = compiler.spawn(job)?;
    let produced = handle.wait_with_progress(|p| {
        eprint!("\rprogress {:>5.1}%", p * 100.0);
        let _ = std::io::stderr().flush();
    });
    eprintln!();
    let produced = produced?;

    let out = match args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::copy(&produced, &out).with_context(|| {
                format!("copy '{}' to '{}'", produced.display(), out.display())
            })?;
            out
        }
        None => produced,
    };
    eprintln!("wrote {}", out.display());
    Ok(())
}
