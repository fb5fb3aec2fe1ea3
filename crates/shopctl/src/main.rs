use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shopctl_core::catalog::{CatalogSyncReport, load_catalog_tree, sync_catalog_tree};
use shopctl_core::cleanup::{
    CleanupReport, CleanupStatus, PURGE_PAGE_SIZE, PurgeReport, delete_collections_by_slug,
    delete_products_by_slug, purge_all_products,
};
use shopctl_core::client::{
    AdminClient, AdminClientConfig, CatalogWriteApi, DesiredCollection, Translation,
};
use shopctl_core::config::{ENV_COOKIE_HEADER, ENV_COOKIE_JAR, ShopConfig, load_config};
use shopctl_core::ensure::{EnsureAction, ensure_collection};
use shopctl_core::facets::{FacetAssignReport, assign_derived_facets, load_facet_remap};
use shopctl_core::jobs::{JobWatchReport, WatchOptions, format_poll_line, watch_job};
use shopctl_core::retry::LockRetryPolicy;
use shopctl_core::session::SessionCookie;

#[derive(Debug, Parser)]
#[command(
    name = "shopctl",
    version,
    about = "Operational CLI for the commerce-platform admin API"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Config file (default shopctl.toml)")]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Authenticate from a curl-format cookie jar instead of logging in"
    )]
    cookie_jar: Option<PathBuf>,
    #[arg(long, global = true, help = "Print reports as JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    config_path: PathBuf,
    cookie_jar: Option<PathBuf>,
    json: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            config_path: cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from("shopctl.toml")),
            cookie_jar: cli.cookie_jar.clone(),
            json: cli.json,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Log in and persist the session cookie for later runs")]
    Login(LoginArgs),
    #[command(name = "sync-categories", about = "Ensure the category tree exists remotely")]
    SyncCategories(SyncCategoriesArgs),
    #[command(name = "create-collection", about = "Ensure a single collection")]
    CreateCollection(CreateCollectionArgs),
    #[command(name = "assign-facets", about = "Tag products with derived facet values")]
    AssignFacets(AssignFacetsArgs),
    #[command(name = "delete-collections", about = "Delete collections by slug")]
    DeleteCollections(DeleteCollectionsArgs),
    #[command(name = "clean-products", about = "Delete products by slug, or all of them")]
    CleanProducts(CleanProductsArgs),
    #[command(name = "watch-job", about = "Poll a background job until it settles")]
    WatchJob(WatchJobArgs),
}

#[derive(Debug, Args)]
struct LoginArgs {
    #[arg(long, value_name = "PATH", default_value = "cookie.txt")]
    cookie_file: PathBuf,
}

#[derive(Debug, Args)]
struct SyncCategoriesArgs {
    #[arg(long, value_name = "PATH", help = "Catalog tree TOML file")]
    tree: PathBuf,
}

#[derive(Debug, Args)]
struct CreateCollectionArgs {
    #[arg(long, value_name = "ID", help = "Parent collection id")]
    parent_id: Option<String>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    slug: String,
    #[arg(long, default_value = "pt", help = "Language code for the translation")]
    lang: String,
    #[arg(long, value_name = "TEXT", help = "Description (defaults to the name)")]
    description: Option<String>,
    #[arg(long, help = "Inherit filters from the parent collection")]
    inherit_filters: bool,
    #[arg(long, help = "Create the collection as private")]
    private: bool,
    #[arg(long, help = "Create unconditionally instead of upserting by slug")]
    no_ensure: bool,
    #[arg(long, help = "Trigger a search reindex afterwards")]
    reindex: bool,
}

#[derive(Debug, Args)]
struct AssignFacetsArgs {
    #[arg(long, value_name = "PATH", help = "Facet remap TOML file")]
    map: PathBuf,
}

#[derive(Debug, Args)]
struct DeleteCollectionsArgs {
    #[arg(value_name = "SLUG", required = true)]
    slugs: Vec<String>,
}

#[derive(Debug, Args)]
struct CleanProductsArgs {
    #[arg(value_name = "SLUG", conflicts_with = "all")]
    slugs: Vec<String>,
    #[arg(long, help = "Delete every product in the catalog")]
    all: bool,
}

#[derive(Debug, Args)]
struct WatchJobArgs {
    #[arg(long, value_name = "ID")]
    job_id: String,
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);
    let config = load_config(&runtime.config_path)?;

    match cli.command {
        Commands::Login(args) => run_login(&runtime, &config, args),
        Commands::SyncCategories(args) => run_sync_categories(&runtime, &config, args),
        Commands::CreateCollection(args) => run_create_collection(&runtime, &config, args),
        Commands::AssignFacets(args) => run_assign_facets(&runtime, &config, args),
        Commands::DeleteCollections(args) => run_delete_collections(&runtime, &config, args),
        Commands::CleanProducts(args) => run_clean_products(&runtime, &config, args),
        Commands::WatchJob(args) => run_watch_job(&runtime, &config, args),
    }
}

fn build_client(config: &ShopConfig) -> Result<AdminClient> {
    AdminClient::new(AdminClientConfig::from_config(config)?)
}

/// Session resolution order: COOKIE_HEADER env, then a cookie jar
/// (--cookie-jar or COOKIE_JAR), then a fresh login with the configured
/// credentials. The session is acquired once per invocation and reused for
/// every call in the run.
fn resolve_session(
    api: &mut AdminClient,
    config: &ShopConfig,
    runtime: &RuntimeOptions,
) -> Result<SessionCookie> {
    if let Ok(header) = env::var(ENV_COOKIE_HEADER)
        && !header.trim().is_empty()
    {
        return SessionCookie::from_header(&header);
    }
    let jar = runtime
        .cookie_jar
        .clone()
        .or_else(|| env::var(ENV_COOKIE_JAR).ok().map(PathBuf::from));
    if let Some(jar) = jar {
        return SessionCookie::from_cookie_jar(&jar);
    }
    let credentials = config.credentials()?;
    let (user, session) = api.login(&credentials.username, &credentials.password)?;
    if !runtime.json {
        println!("logged in as {}", user.identifier);
    }
    Ok(session)
}

fn run_login(runtime: &RuntimeOptions, config: &ShopConfig, args: LoginArgs) -> Result<()> {
    let credentials = config.credentials()?;
    let mut api = build_client(config)?;
    let (user, session) = api.login(&credentials.username, &credentials.password)?;
    session.save(&args.cookie_file)?;

    #[derive(Serialize)]
    struct LoginReport {
        identifier: String,
        cookie_file: String,
    }
    let report = LoginReport {
        identifier: user.identifier,
        cookie_file: args.cookie_file.display().to_string(),
    };
    emit(runtime, &report, |report| {
        println!("logged in as {}", report.identifier);
        println!("cookie_file: {}", report.cookie_file);
    })
}

fn run_sync_categories(
    runtime: &RuntimeOptions,
    config: &ShopConfig,
    args: SyncCategoriesArgs,
) -> Result<()> {
    let tree = load_catalog_tree(&args.tree)?;
    let mut api = build_client(config)?;
    let session = resolve_session(&mut api, config, runtime)?;

    let report = sync_catalog_tree(&mut api, &session, &tree)?;
    emit(runtime, &report, print_catalog_report)
}

fn run_create_collection(
    runtime: &RuntimeOptions,
    config: &ShopConfig,
    args: CreateCollectionArgs,
) -> Result<()> {
    let desired = DesiredCollection {
        slug: args.slug.clone(),
        parent_id: args.parent_id.clone(),
        translations: vec![Translation {
            language_code: args.lang.clone(),
            name: args.name.clone(),
            slug: args.slug.clone(),
            description: args.description.clone().unwrap_or_else(|| args.name.clone()),
        }],
        private: args.private,
        inherit_filters: args.inherit_filters,
    };

    let mut api = build_client(config)?;
    let session = resolve_session(&mut api, config, runtime)?;

    // Single-resource creation occasionally trips over transient lock
    // contention in the remote store; everything else aborts immediately.
    let policy = LockRetryPolicy::default();
    let (id, action) = if args.no_ensure {
        let created = policy.run(|| api.create_collection(&session, &desired))?;
        (created.id, "created".to_string())
    } else {
        let outcome = policy.run(|| ensure_collection(&mut api, &session, &desired))?;
        let action = match outcome.action {
            EnsureAction::Created => "created",
            EnsureAction::Updated => "updated",
        };
        (outcome.id, action.to_string())
    };

    let reindex_job = if args.reindex {
        Some(api.trigger_reindex(&session)?)
    } else {
        None
    };

    #[derive(Serialize)]
    struct CreateCollectionReport {
        slug: String,
        id: String,
        action: String,
        reindex_job: Option<String>,
    }
    let report = CreateCollectionReport {
        slug: args.slug,
        id,
        action,
        reindex_job,
    };
    emit(runtime, &report, |report| {
        println!("collection: {}", report.slug);
        println!("id: {}", report.id);
        println!("action: {}", report.action);
        if let Some(job_id) = &report.reindex_job {
            println!("reindex_job: {job_id} (follow with `shopctl watch-job --job-id {job_id}`)");
        }
    })
}

fn run_assign_facets(
    runtime: &RuntimeOptions,
    config: &ShopConfig,
    args: AssignFacetsArgs,
) -> Result<()> {
    let remap = load_facet_remap(&args.map)?;
    let mut api = build_client(config)?;
    let session = resolve_session(&mut api, config, runtime)?;

    let report = assign_derived_facets(&mut api, &session, &remap)?;
    emit(runtime, &report, print_facet_report)
}

fn run_delete_collections(
    runtime: &RuntimeOptions,
    config: &ShopConfig,
    args: DeleteCollectionsArgs,
) -> Result<()> {
    let mut api = build_client(config)?;
    let session = resolve_session(&mut api, config, runtime)?;

    let report = delete_collections_by_slug(&mut api, &session, &args.slugs)?;
    emit(runtime, &report, print_cleanup_report)
}

fn run_clean_products(
    runtime: &RuntimeOptions,
    config: &ShopConfig,
    args: CleanProductsArgs,
) -> Result<()> {
    let mut api = build_client(config)?;
    let session = resolve_session(&mut api, config, runtime)?;

    if args.all {
        let report = purge_all_products(&mut api, &session, PURGE_PAGE_SIZE)?;
        return emit(runtime, &report, print_purge_report);
    }
    if args.slugs.is_empty() {
        bail!("clean-products needs product slugs or --all");
    }
    let report = delete_products_by_slug(&mut api, &session, &args.slugs)?;
    emit(runtime, &report, print_cleanup_report)
}

fn run_watch_job(runtime: &RuntimeOptions, config: &ShopConfig, args: WatchJobArgs) -> Result<()> {
    let mut api = build_client(config)?;
    let session = resolve_session(&mut api, config, runtime)?;

    let options = WatchOptions {
        interval: Duration::from_millis(args.interval_ms),
    };
    let quiet = runtime.json;
    let report = watch_job(&mut api, &session, &args.job_id, &options, |job| {
        if !quiet {
            println!("{}", format_poll_line(job));
        }
    })?;
    emit(runtime, &report, print_job_report)
}

fn emit<T: Serialize>(
    runtime: &RuntimeOptions,
    report: &T,
    print_text: impl FnOnce(&T),
) -> Result<()> {
    if runtime.json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("failed to serialize report")?
        );
    } else {
        print_text(report);
    }
    Ok(())
}

fn print_catalog_report(report: &CatalogSyncReport) {
    println!("catalog sync");
    println!("created: {}", report.created);
    println!("updated: {}", report.updated);
    println!("failed: {}", report.failed);
    println!("skipped: {}", report.skipped);
    println!("request_count: {}", report.request_count);
    for node in &report.nodes {
        match &node.detail {
            Some(detail) => println!("  {}: {} ({detail})", node.slug, node.action),
            None => println!("  {}: {}", node.slug, node.action),
        }
    }
}

fn print_facet_report(report: &FacetAssignReport) {
    println!("facet assignment");
    println!("products_seen: {}", report.products_seen);
    println!("updated: {}", report.updated);
    println!("unchanged: {}", report.unchanged);
    println!("request_count: {}", report.request_count);
    if !report.warnings.is_empty() {
        println!("warnings:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }
    if !report.errors.is_empty() {
        println!("errors:");
        for error in &report.errors {
            println!("  - {error}");
        }
    }
}

fn print_cleanup_report(report: &CleanupReport) {
    println!("cleanup");
    println!("deleted: {}", report.deleted);
    println!("already_absent: {}", report.already_absent);
    println!("failed: {}", report.failed);
    println!("request_count: {}", report.request_count);
    for item in &report.items {
        let status = match item.status {
            CleanupStatus::Deleted => "deleted",
            CleanupStatus::AlreadyAbsent => "already absent",
            CleanupStatus::Failed => "failed",
        };
        match &item.detail {
            Some(detail) => println!("  {}: {status} ({detail})", item.slug),
            None => println!("  {}: {status}", item.slug),
        }
    }
}

fn print_purge_report(report: &PurgeReport) {
    println!("product purge");
    println!("deleted: {}", report.deleted);
    println!("failed: {}", report.failed);
    println!("pages: {}", report.pages);
    println!("request_count: {}", report.request_count);
    for error in &report.errors {
        println!("  - {error}");
    }
}

fn print_job_report(report: &JobWatchReport) {
    println!("job: {}", report.job_id);
    println!("final_state: {}", report.final_state);
    println!("polls: {}", report.polls);
    if let Some(error) = &report.error {
        println!("error: {error}");
    }
    if let Some(result) = &report.result {
        println!("result: {result}");
    }
}
