use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use tkmerge_core::{BucketPolicy, ProcessOptions, SidecarStrategy, DEFAULT_BATCH_SIZE};

#[derive(Parser)]
#[command(name = "tkmerge", version, about = "Reorganize exported photo archives by sidecar capture time")]
struct Cli {
    /// Directory tree to scan for media files
    #[arg(default_value = "./extract")]
    input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "./merge")]
    output: PathBuf,

    /// Group into capture-year folders instead of numbered batches
    #[arg(long)]
    by_year: bool,

    /// Files per batch folder (batch mode)
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Extract .zip archives from this directory into the input tree first
    #[arg(long, requires = "by_year")]
    archives: Option<PathBuf>,

    /// Sidecar lookup convention (defaults to the variant's own)
    #[arg(long, value_enum)]
    sidecar: Option<SidecarArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SidecarArg {
    /// First <media name>*.json entry in the media file's directory
    Prefix,
    /// Exact <media name>.supplemental-metadata.json path
    Suffix,
}

/// Renders progress events: a bar for the copy stage, plain lines elsewhere.
struct Reporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl Reporter {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let mut bar = self.bar.lock().unwrap();
        match stage {
            "copy" => {
                let pb = bar.get_or_insert_with(|| {
                    let pb = ProgressBar::new(total);
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("[{bar:40}] {pos}/{len} copying files")
                            .unwrap(),
                    );
                    pb
                });
                pb.println(format!("  {}", message));
                pb.set_position(current + 1);
            }
            "error" => match bar.as_ref() {
                Some(pb) => pb.println(format!("  ✗ {}", message)),
                None => eprintln!("  ✗ {}", message),
            },
            _ => eprintln!("[{}] {}/{} {}", stage, current, total, message),
        }
    }

    fn finish(&self) {
        if let Some(pb) = self.bar.lock().unwrap().take() {
            pb.finish_and_clear();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let bucket_policy = if cli.by_year {
        BucketPolicy::ByYear
    } else {
        BucketPolicy::ByBatchSize(cli.batch_size)
    };
    // Each variant ships with its own sidecar convention unless overridden
    let sidecar_strategy = match (cli.sidecar, cli.by_year) {
        (Some(SidecarArg::Prefix), _) => SidecarStrategy::PrefixMatch,
        (Some(SidecarArg::Suffix), _) => SidecarStrategy::SuffixConvention,
        (None, true) => SidecarStrategy::PrefixMatch,
        (None, false) => SidecarStrategy::SuffixConvention,
    };

    let options = ProcessOptions {
        input_root: cli.input,
        output_root: cli.output,
        archive_dir: cli.archives,
        bucket_policy,
        sidecar_strategy,
    };

    let reporter = Arc::new(Reporter::new());
    let cb_reporter = Arc::clone(&reporter);
    let callback = move |stage: &str, current: u64, total: u64, message: &str| {
        cb_reporter.report(stage, current, total, message);
    };
    let result = tkmerge_core::process(&options, &callback)?;
    reporter.finish();

    if result.media_found == 0 {
        eprintln!("No media files found. Nothing to do.");
        return Ok(());
    }

    eprintln!(
        "Done! {} media files, {} timestamps updated, {} files copied ({:.2}s)",
        result.media_found,
        result.timestamps_updated,
        result.files_copied,
        t_total.elapsed().as_secs_f64()
    );
    if !result.warnings.is_empty() {
        eprintln!("{} archive(s) failed to extract", result.warnings.len());
    }

    Ok(())
}
