use clap::{Args, Subcommand, ValueEnum};
use commtest_model::{ExpectedType, ScalarType};
use std::path::PathBuf;

#[derive(Subcommand)]
pub(crate) enum TestCommand {
    /// Check a test draft without saving it.
    Validate { draft: PathBuf },
    /// Validate and save a test draft.
    Create {
        draft: PathBuf,
        #[arg(long)]
        job: Option<String>,
        #[arg(long)]
        asset: Option<String>,
    },
    Show { test_id: String },
    List {
        #[arg(long)]
        job: Option<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum LayoutCommand {
    /// Print a table input's layout as text.
    Render {
        test_id: String,
        input_id: String,
        /// Fill cells from this result.
        #[arg(long)]
        result: Option<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum ResultCommand {
    /// Save values for a test, updating the latest matching result.
    Submit {
        test_id: String,
        /// JSON object of field key to value, e.g. {"grid:0.1": "4.2"}.
        /// Display keys like "grid_0_1" are accepted when unambiguous.
        #[arg(long)]
        values: PathBuf,
        #[arg(long = "asset")]
        assets: Vec<String>,
        /// Lock the result to a single asset.
        #[arg(long, conflicts_with = "assets")]
        locked_asset: Option<String>,
        #[arg(long)]
        result: Option<String>,
        #[arg(long, default_value_t = false)]
        draft: bool,
        #[arg(long)]
        submitted_by: Option<String>,
    },
    /// Print a result's values with pass/fail annotations.
    Show {
        test_id: String,
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        result: Option<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum CatalogCommand {
    /// Replace the job and/or asset catalogs of the local store.
    Import {
        #[arg(long)]
        jobs: Option<PathBuf>,
        #[arg(long)]
        assets: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub(crate) enum BlobCommand {
    Upload { path: String, file: PathBuf },
    Download {
        path: String,
        #[arg(long)]
        out: PathBuf,
    },
    Delete { path: String },
    Url { path: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum ExpectedTypeCli {
    Range,
    Minimum,
    Maximum,
    Exact,
}

impl From<ExpectedTypeCli> for ExpectedType {
    fn from(value: ExpectedTypeCli) -> Self {
        match value {
            ExpectedTypeCli::Range => Self::Range,
            ExpectedTypeCli::Minimum => Self::Minimum,
            ExpectedTypeCli::Maximum => Self::Maximum,
            ExpectedTypeCli::Exact => Self::Exact,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum ValueTypeCli {
    Number,
    Text,
    Boolean,
}

impl From<ValueTypeCli> for ScalarType {
    fn from(value: ValueTypeCli) -> Self {
        match value {
            ValueTypeCli::Number => Self::Number,
            ValueTypeCli::Text => Self::Text,
            ValueTypeCli::Boolean => Self::Boolean,
        }
    }
}

#[derive(Args)]
pub(crate) struct EvaluateArgs {
    pub(crate) value: String,
    #[arg(long, value_enum)]
    pub(crate) expected_type: ExpectedTypeCli,
    #[arg(long, value_enum, default_value_t = ValueTypeCli::Number)]
    pub(crate) value_type: ValueTypeCli,
    #[arg(long)]
    pub(crate) min: Option<f64>,
    #[arg(long)]
    pub(crate) max: Option<f64>,
    #[arg(long)]
    pub(crate) expected: Option<f64>,
    #[arg(long)]
    pub(crate) unit: Option<String>,
}
