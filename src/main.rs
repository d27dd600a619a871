//! cfx CLI: certainty-factor inference over a JSON knowledge base.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use cf_expert::config::CfxConfig;
use cf_expert::infer::InferenceQuery;
use cf_expert::kb::{DocumentPath, Fact, KnowledgeStore, Rule, validate_files};
use cf_expert::request::{InferRequest, parse_fact_list, parse_weight_pairs};

#[derive(Parser)]
#[command(name = "cfx", version, about = "Certainty-factor expert system")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory with facts.json, rules.json and taxonomy.json.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty data directory.
    Init,

    /// Run inference and print the result as JSON.
    Infer {
        /// Observed fact ids, comma-separated (e.g. "cough,fever").
        #[arg(long, default_value = "")]
        facts: String,

        /// Confidence weights, comma-separated id:value pairs (e.g. "fever:0.6").
        #[arg(long, default_value = "")]
        weights: String,

        /// Also observe every fact whose baseline value is true.
        #[arg(long)]
        use_true_facts: bool,

        /// JSON request body file ({"facts": [...], "weights": {...}, "useTrueFacts": bool}).
        /// Replaces --facts and --weights.
        #[arg(long, conflicts_with_all = ["facts", "weights"])]
        request: Option<PathBuf>,
    },

    /// Validate facts/rules/taxonomy documents without loading them.
    Validate {
        #[arg(long)]
        facts: Option<PathBuf>,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long)]
        taxonomy: Option<PathBuf>,
    },

    /// Show knowledge-base counts.
    Info,

    /// Manage facts.
    Fact {
        #[command(subcommand)]
        action: FactAction,
    },

    /// Manage rules.
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Inspect or edit the concept taxonomy.
    Taxonomy {
        #[command(subcommand)]
        action: TaxonomyAction,
    },
}

#[derive(Subcommand)]
enum FactAction {
    /// List all facts.
    List,
    /// Add a fact or replace the one with the same id.
    Add {
        id: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Baseline truth value.
        #[arg(long)]
        value: bool,
        /// Tags, comma-separated.
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Remove a fact.
    Remove { id: String },
}

#[derive(Subcommand)]
enum RuleAction {
    /// List all rules.
    List,
    /// Add a rule or replace the one with the same id.
    Add {
        id: String,
        /// Condition ids, comma-separated.
        #[arg(long)]
        conditions: String,
        #[arg(long)]
        conclusion: String,
        /// Certainty factor in [0, 1].
        #[arg(long)]
        certainty: Option<f64>,
        #[arg(long)]
        explain: Option<String>,
    },
    /// Remove a rule.
    Remove { id: String },
}

#[derive(Subcommand)]
enum TaxonomyAction {
    /// Print the taxonomy document.
    Show,
    /// Set the parent of a concept, or clear it when no parent is given.
    SetParent { child: String, parent: Option<String> },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CfxConfig::load(path)?,
        None => CfxConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let files = config.data_files();

    match cli.command {
        Commands::Init => {
            KnowledgeStore::init(&files)?;
            println!("Initialized knowledge base at {}", files.dir.display());
        }

        Commands::Infer {
            facts,
            weights,
            use_true_facts,
            request,
        } => {
            let store = KnowledgeStore::open(&files)?;
            let query = match request {
                Some(path) => {
                    let body = read_json(&path)?;
                    let mut query = InferRequest::from_json(&body)
                        .into_query_with_baseline_default(config.use_true_facts);
                    query.include_baseline_true |= use_true_facts;
                    query
                }
                None => InferenceQuery {
                    observed: parse_fact_list(&facts),
                    weights: parse_weight_pairs(&weights),
                    include_baseline_true: use_true_facts || config.use_true_facts,
                },
            };
            let result = store.engine().infer(&query);
            print_json(&result)?;
        }

        Commands::Validate {
            facts,
            rules,
            taxonomy,
        } => {
            let source = |given: Option<PathBuf>, default: &PathBuf| match given {
                Some(path) => DocumentPath::Given(path),
                None => DocumentPath::Default(default.clone()),
            };
            let report = validate_files(&[
                ("facts", source(facts, &files.facts)),
                ("rules", source(rules, &files.rules)),
                ("taxonomy", source(taxonomy, &files.taxonomy)),
            ]);
            print_json(&report)?;
            if !report.valid {
                miette::bail!("validation failed with {} issue(s)", report.errors.len());
            }
        }

        Commands::Info => {
            let store = KnowledgeStore::open(&files)?;
            let summary = store.snapshot().summary();
            println!("Knowledge base: {}", store.files().dir.display());
            println!("  facts:          {}", summary.facts);
            println!("  baseline true:  {}", summary.baseline_true);
            println!("  rules:          {}", summary.rules);
            println!("  taxonomy edges: {}", summary.taxonomy_edges);
        }

        Commands::Fact { action } => {
            let store = KnowledgeStore::open(&files)?;
            match action {
                FactAction::List => {
                    let kb = store.snapshot();
                    if kb.facts().is_empty() {
                        println!("No facts.");
                    }
                    for fact in kb.facts() {
                        println!(
                            "  {} [{}] {}{}",
                            fact.id,
                            fact.value,
                            fact.description,
                            format_tags(&fact.tags)
                        );
                    }
                }
                FactAction::Add {
                    id,
                    description,
                    value,
                    tags,
                } => {
                    let fact = Fact::new(id.trim(), description.trim(), value)
                        .with_tags(parse_fact_list(&tags).into_iter().collect());
                    let replaced = store.upsert_fact(fact)?;
                    println!("Fact {} {}", id.trim(), if replaced { "updated" } else { "created" });
                }
                FactAction::Remove { id } => {
                    store.remove_fact(&id)?;
                    println!("Fact {id} deleted");
                }
            }
        }

        Commands::Rule { action } => {
            let store = KnowledgeStore::open(&files)?;
            match action {
                RuleAction::List => {
                    let kb = store.snapshot();
                    if kb.rules().is_empty() {
                        println!("No rules.");
                    }
                    for rule in kb.rules() {
                        println!(
                            "  {}: IF {} THEN {} (cf {:.3}) {}",
                            rule.id,
                            rule.conditions.join(" AND "),
                            rule.conclusion,
                            rule.certainty_factor(),
                            rule.explanation()
                        );
                    }
                }
                RuleAction::Add {
                    id,
                    conditions,
                    conclusion,
                    certainty,
                    explain,
                } => {
                    let conditions = conditions.split(',').map(str::trim).filter(|c| !c.is_empty());
                    let mut rule = Rule::new(id.trim(), conditions, conclusion.trim());
                    if let Some(cf) = certainty {
                        rule = rule.with_certainty(cf);
                    }
                    if let Some(text) = explain {
                        rule = rule.with_explain(text.trim());
                    }
                    let replaced = store.upsert_rule(rule)?;
                    println!("Rule {} {}", id.trim(), if replaced { "updated" } else { "created" });
                }
                RuleAction::Remove { id } => {
                    store.remove_rule(&id)?;
                    println!("Rule {id} deleted");
                }
            }
        }

        Commands::Taxonomy { action } => {
            let store = KnowledgeStore::open(&files)?;
            match action {
                TaxonomyAction::Show => print_json(store.snapshot().taxonomy())?,
                TaxonomyAction::SetParent { child, parent } => {
                    store.set_parent(&child, parent.as_deref())?;
                    match parent {
                        Some(p) => println!("{child} -> {p}"),
                        None => println!("{child} is now a root"),
                    }
                }
            }
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&content).into_diagnostic()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn format_tags(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(" #{}", tags.join(" #"))
    }
}
