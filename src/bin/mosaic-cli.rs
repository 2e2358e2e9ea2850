use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use mosaic::board::{Board, PassOutcome};
use mosaic::cache;
use mosaic::config::MosaicConfig;
use mosaic::error::MosaicError;
use mosaic::layouts::Layout;
use mosaic::loader::Loader;
use mosaic::rand::Rng;
use mosaic::render::placements;
use mosaic::store::{ImageLibrary, ImageRecord, Storage};

const EMPTY_MESSAGE: &str = "Your vision board is empty. Add images with `mosaic-cli add <url>`.";

#[derive(Parser)]
struct Opts {
    /// JSON file holding the image collection and the cached mosaic.
    #[clap(long, global = true, default_value = "vision-board.json")]
    store: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Composite the board into a PNG.
    Render {
        /// Images to use instead of the stored collection.
        sources: Vec<String>,
        #[clap(short, long, default_value = "mosaic.png")]
        output: PathBuf,
        #[clap(flatten)]
        config: MosaicConfig,
    },
    /// Print element placements as JSON.
    Layout {
        sources: Vec<String>,
        #[clap(flatten)]
        config: MosaicConfig,
    },
    /// List the stored collection.
    List,
    Add {
        url: String,
        #[clap(long, default_value = "")]
        caption: String,
    },
    Remove {
        index: usize,
    },
    Caption {
        index: usize,
        text: String,
    },
    /// Swap the images at positions A and B.
    Swap {
        a: usize,
        b: usize,
    },
    /// Remove every image, restoring the default set.
    Clear,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();

    let storage = Storage::open(&opts.store)
        .await
        .with_context(|| format!("Failed to open {}", opts.store.display()))?;
    let library = ImageLibrary::new(storage.clone());
    // Stored relative paths are relative to the store; ones given on the command line are not.
    let store_dir = opts
        .store
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    match opts.command {
        Command::Render {
            sources,
            output,
            config,
        } => {
            let (library, loader) = if sources.is_empty() {
                (library, Loader::local(store_dir))
            } else {
                (scratch_library(&sources).await?, Loader::local("."))
            };
            let board = Board::new(library, loader, cache::spawn(Some(storage)));
            match board.regenerate(&config).await {
                Ok(PassOutcome::Rendered(frame)) => {
                    std::fs::write(&output, &frame.png)
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    println!(
                        "{} images, {:?}, {}x{} -> {}",
                        frame.placements.len(),
                        frame.pattern,
                        frame.width,
                        frame.height,
                        output.display()
                    );
                }
                Ok(PassOutcome::Empty) => eprintln!("{EMPTY_MESSAGE}"),
                Ok(PassOutcome::Stale) => eprintln!("Render was superseded; nothing written."),
                Err(MosaicError::NoValidImages(e)) => {
                    eprintln!("None of your images could be loaded ({e}).");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Layout { sources, config } => {
            config.validate()?;
            let (records, loader) = if sources.is_empty() {
                (library.get_images().await?, Loader::local(store_dir))
            } else {
                let records = sources.iter().map(|url| ImageRecord::new(url.as_str(), ""));
                (records.collect(), Loader::local("."))
            };
            let images = match loader.load(&records).await {
                Ok(images) if images.is_empty() => {
                    eprintln!("{EMPTY_MESSAGE}");
                    return Ok(());
                }
                Ok(images) => images,
                Err(e) => {
                    eprintln!("None of your images could be loaded ({e}).");
                    return Ok(());
                }
            };
            let seed = config.seed_or_random();
            let layout = Layout::build(&images, &config, &mut Rng::from_seed(&seed));
            println!("{}", serde_json::to_string_pretty(&placements(&layout))?);
        }
        Command::List => {
            for (i, image) in library.get_images().await?.iter().enumerate() {
                if image.caption.is_empty() {
                    println!("{i:>3}  {}", image.url);
                } else {
                    println!("{i:>3}  {}  \"{}\"", image.url, image.caption);
                }
            }
        }
        Command::Add { url, caption } => library.add_image(url, caption).await?,
        Command::Remove { index } => {
            let removed = library.remove_image(index).await?;
            println!("removed {}", removed.url);
        }
        Command::Caption { index, text } => library.update_caption(index, text).await?,
        Command::Swap { a, b } => library.swap_images(a, b).await?,
        Command::Clear => library.clear().await?,
    }
    Ok(())
}

/// An in-memory collection of just `sources`, for one-off renders.
async fn scratch_library(sources: &[String]) -> anyhow::Result<ImageLibrary> {
    let library = ImageLibrary::with_defaults(Storage::in_memory(), Vec::new());
    let records: Vec<ImageRecord> = sources
        .iter()
        .map(|url| ImageRecord::new(url.as_str(), ""))
        .collect();
    library.set_images(&records).await?;
    Ok(library)
}
