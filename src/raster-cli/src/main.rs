// This file is part of rastercore.
// Copyright (C) 2024 the rastercore authors
//
// rastercore is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// rastercore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with rastercore.  If not, see <https://www.gnu.org/licenses/>.


use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::Level;

use rastercore::codec::Compression;

use raster_cli::importer::*;
use raster_cli::inspector::print_info;
use raster_cli::renderer::*;
use raster_cli::{Color, Point, Size};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// More logging (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Finish {
    /// Merge into the target layer
    Anchor,
    /// Keep as a new layer
    Layer,
}

#[derive(Subcommand)]
enum Commands {
    /// Show an image's layers and channels
    Info {
        /// Input file
        input: String,
    },
    /// Flatten an image to PNG
    Flatten {
        /// Input file
        input: String,

        /// Output file
        output: Option<String>,

        /// Background color (RRGGBB or RRGGBBAA)
        #[arg(short, long)]
        background: Option<Color>,

        /// Do not draw channel overlays
        #[arg(long)]
        hide_channels: bool,
    },
    /// Create an image from pictures, one layer each (bottommost first)
    Import {
        /// Output file
        output: String,

        /// Pictures to import
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Image size (WxH)
        #[arg(short, long)]
        size: Option<Size>,

        /// Create a grayscale image
        #[arg(short, long)]
        gray: bool,

        /// Store tiles uncompressed
        #[arg(long)]
        uncompressed: bool,
    },
    /// Paste a picture into an image as a floating selection
    Paste {
        /// Image file
        image: String,

        /// Picture to paste
        picture: String,

        /// Output file (defaults to overwriting the image file)
        #[arg(short, long)]
        output: Option<String>,

        /// Position of the picture (X,Y)
        #[arg(short, long, default_value = "0,0", allow_hyphen_values = true)]
        at: Point,

        /// Stack index of the target layer (0 is the topmost)
        #[arg(short, long, default_value_t = 0)]
        layer: usize,

        /// What to do with the floating selection
        #[arg(long, value_enum, default_value_t = Finish::Anchor)]
        finish: Finish,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info { input } => print_info(&input),
        Commands::Flatten {
            input,
            output,
            background,
            hide_channels,
        } => {
            let opts = FlattenOpts {
                input_file: &input,
                output_file: output.as_deref().unwrap_or_default(),
                background,
                show_channels: !hide_channels,
            };

            flatten_image(&opts)
        }
        Commands::Import {
            output,
            inputs,
            size,
            gray,
            uncompressed,
        } => {
            let opts = ImportOpts {
                input_files: &inputs,
                output_file: &output,
                size,
                grayscale: gray,
                compression: if uncompressed {
                    Compression::None
                } else {
                    Compression::Rle
                },
            };

            import_layers(&opts)
        }
        Commands::Paste {
            image,
            picture,
            output,
            at,
            layer,
            finish,
        } => {
            let opts = PasteOpts {
                image_file: &image,
                picture_file: &picture,
                output_file: output.as_deref().unwrap_or_default(),
                position: at,
                target: layer,
                mode: match finish {
                    Finish::Anchor => PasteMode::Anchor,
                    Finish::Layer => PasteMode::NewLayer,
                },
            };

            paste_file(&opts)
        }
    }
}
