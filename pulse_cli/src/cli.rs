use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pulse_core::profile::{GeneratorParams, ParamValue, ProfileEdit};
use pulse_core::timeline::{Canvas, LaneLayout, LayoutMode, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Render pulse profiles and manage saved generator parameter sets
#[derive(Parser, Debug)]
#[command(name = "pulsetrace", author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Custom data directory holding profiles.json (overrides platform default)
    #[arg(short = 'd', long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a segment array (generator output) from a file or stdin
    Render {
        /// JSON file with the segment array; "-" or omitted reads stdin
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Request a profile from the generator and render it
    Generate {
        /// Use the parameters of a saved profile (id or unique name)
        #[arg(
            short = 'p',
            long = "profile",
            value_name = "PROFILE",
            conflicts_with_all = ["t1", "t2", "t3", "t4", "burst", "polarity"]
        )]
        profile: Option<String>,

        #[command(flatten)]
        params: ParamArgs,

        /// Generator endpoint
        /// (default: $PULSETRACE_GENERATOR_URL or http://localhost:5000/generate_profile)
        #[arg(long = "url", value_name = "URL")]
        url: Option<String>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Manage saved profiles
    #[command(subcommand)]
    Profiles(ProfilesCommand),
}

#[derive(Subcommand, Debug)]
pub enum ProfilesCommand {
    /// List saved profiles in insertion order
    List {
        /// Print the raw JSON collection instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one saved profile
    Show {
        /// Profile id or unique name
        profile: String,
    },

    /// Save a new profile
    Save {
        /// Display name (duplicates allowed)
        name: String,

        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        operator: OperatorArgs,
    },

    /// Delete a saved profile
    Delete {
        /// Profile id or unique name
        profile: String,
    },

    /// Change fields of a saved profile
    Edit {
        /// Profile id or unique name
        profile: String,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        operator: OperatorArgs,
    },

    /// Replace all saved profiles with the contents of a file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write all saved profiles to a file (stdout if omitted)
    Export {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

/// Generator parameters, passed through verbatim
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// T1 interval (ms)
    #[arg(long = "t1", value_name = "MS")]
    pub t1: Option<String>,

    /// T2 interval (ms)
    #[arg(long = "t2", value_name = "MS")]
    pub t2: Option<String>,

    /// T3 interval (ms)
    #[arg(long = "t3", value_name = "MS")]
    pub t3: Option<String>,

    /// T4 interval (ms)
    #[arg(long = "t4", value_name = "MS")]
    pub t4: Option<String>,

    /// Burst mode
    #[arg(long = "burst", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub burst: Option<bool>,

    /// Polarity code, e.g. B (bipolar), P or N (unipolar positive/negative)
    #[arg(long = "polarity", value_name = "CODE")]
    pub polarity: Option<String>,
}

impl ParamArgs {
    /// Request body with unset values left blank, as an empty form field would be.
    pub fn to_params(&self) -> GeneratorParams {
        let text = |v: &Option<String>| ParamValue::from(v.clone().unwrap_or_default());
        GeneratorParams {
            t1: text(&self.t1),
            t2: text(&self.t2),
            t3: text(&self.t3),
            t4: text(&self.t4),
            burst: self.burst.unwrap_or(false),
            polarity: text(&self.polarity),
        }
    }

    /// Only the values given on the command line
    pub fn to_edit(&self) -> ProfileEdit {
        ProfileEdit {
            t1: self.t1.clone().map(ParamValue::from),
            t2: self.t2.clone().map(ParamValue::from),
            t3: self.t3.clone().map(ParamValue::from),
            t4: self.t4.clone().map(ParamValue::from),
            polarity: self.polarity.clone().map(ParamValue::from),
            burst: self.burst,
            ..ProfileEdit::default()
        }
    }
}

/// Optional operator metadata
#[derive(Args, Debug, Clone, Default)]
pub struct OperatorArgs {
    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub age: Option<String>,

    #[arg(long)]
    pub username: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeArg {
    /// Proportional timeline with one lane per segment category
    #[default]
    Timeline,
    /// One bar per segment, scaled to the longest
    Bars,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatArg {
    /// Standalone SVG document
    #[default]
    Svg,
    /// Rectangle primitives as JSON
    Json,
}

/// How and where to draw
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Layout mode
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = ModeArg::Timeline)]
    pub mode: ModeArg,

    /// Canvas width (px)
    #[arg(long = "width", default_value_t = DEFAULT_WIDTH)]
    pub width: f64,

    /// Canvas height (px)
    #[arg(long = "height", default_value_t = DEFAULT_HEIGHT)]
    pub height: f64,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = FormatArg::Svg)]
    pub format: FormatArg,

    /// Title drawn in the top-left corner
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl RenderArgs {
    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }

    pub fn layout_mode(&self) -> LayoutMode {
        match self.mode {
            ModeArg::Timeline => LayoutMode::Timeline(LaneLayout::default()),
            ModeArg::Bars => LayoutMode::BarChart,
        }
    }
}
