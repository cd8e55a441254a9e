//! CLI command definitions using clap.
//!
//! - add/list/show: manage the portfolio's projects
//! - close: run the closure workflow, optionally postponing the evaluation
//! - evaluate: record a postponed method evaluation
//! - reactivate: return a completed project to active work

use clap::{Args, Parser, Subcommand};
use projclose::domain::{EvaluationData, FinalReviewInput};
use std::path::PathBuf;

/// projclose - close portfolio projects with a two-level retrospective
#[derive(Parser, Debug)]
#[command(name = "projclose")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Act as this actor instead of the configured one
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Role of the acting actor (admin, portfolio_manager, project_manager, contributor, viewer)
    #[arg(long, global = true)]
    pub role: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a new project
    Add {
        /// Project name
        name: String,

        /// Actor id of the project manager
        #[arg(short, long)]
        manager: Option<String>,
    },

    /// List projects
    List {
        /// Filter by lifecycle status (study, in_progress, suspended, completed)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show a project with its retrospectives
    Show {
        /// Project ID
        id: String,
    },

    /// Close a project
    Close {
        /// Project ID
        id: String,

        #[command(flatten)]
        review: FinalReviewArgs,

        #[command(flatten)]
        evaluation: EvaluationArgs,

        /// Close now and record the method evaluation later
        #[arg(
            long,
            conflicts_with_all = ["what_worked", "what_was_missing", "improvements", "lessons_learned"]
        )]
        postpone: bool,
    },

    /// Record the postponed method evaluation of a closed project
    Evaluate {
        /// Project ID
        id: String,

        #[command(flatten)]
        evaluation: EvaluationArgs,
    },

    /// Return a completed project to active work
    Reactivate {
        /// Project ID
        id: String,
    },
}

/// Final review fields
#[derive(Args, Debug, Clone)]
pub struct FinalReviewArgs {
    /// Overall weather: sunny, cloudy, stormy
    #[arg(long)]
    pub weather: String,

    /// Trend: better, stable, worse
    #[arg(long)]
    pub progress: String,

    /// Percentage of the scope delivered (0-100)
    #[arg(long)]
    pub completion: f64,

    #[arg(long)]
    pub comment: Option<String>,

    #[arg(long)]
    pub difficulties: Option<String>,
}

/// Method evaluation fields, all optional
#[derive(Args, Debug, Clone, Default)]
pub struct EvaluationArgs {
    #[arg(long)]
    pub what_worked: Option<String>,

    #[arg(long)]
    pub what_was_missing: Option<String>,

    #[arg(long)]
    pub improvements: Option<String>,

    #[arg(long)]
    pub lessons_learned: Option<String>,
}

impl FinalReviewArgs {
    pub fn to_input(&self) -> FinalReviewInput {
        FinalReviewInput {
            weather: self.weather.clone(),
            progress: self.progress.clone(),
            completion: self.completion,
            comment: self.comment.clone(),
            difficulties: self.difficulties.clone(),
        }
    }
}

impl EvaluationArgs {
    pub fn to_data(&self) -> EvaluationData {
        EvaluationData {
            what_worked: self.what_worked.clone(),
            what_was_missing: self.what_was_missing.clone(),
            improvements: self.improvements.clone(),
            lessons_learned: self.lessons_learned.clone(),
        }
    }
}
