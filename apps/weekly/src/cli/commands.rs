//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every mutating command flushes the repository before returning.

use super::{
    ComposeArgs, ConfigCommand, OutputFormat, QueryArgs, ReportCommand, SelectionArgs,
    SyncCommand, UserCommand,
};
use crate::autosave::{AutosaveHandle, EditingSession, RepositorySink};
use crate::remote::HttpRemote;
use crate::settings::Settings;
use crate::sync::SyncEngine;
use chrono::{Duration, Local, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use weekly_core::export::date_range;
use weekly_core::{
    Collection, ContentEntry, DeleteMode, Labels, Level, NewUser, NodeData, NodePatch, Paginator,
    QueryEngine, RecordId, Report, ReportDraft, ReportEditor, ReportFilter, ReportPatch,
    ReportStatus, Repository, SaveOutcome, SaveTrigger, User, UserPatch, WeeklyError, to_csv,
    to_text,
};

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json(value: &serde_json::Value) -> Result<(), WeeklyError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| WeeklyError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "name": user.name,
        "email": user.email,
        "role": user.role,
        "lastLogin": user.last_login,
    })
}

fn report_json(report: &Report, labels: &Labels<'_>) -> serde_json::Value {
    let content: Vec<serde_json::Value> = report
        .content
        .iter()
        .map(|entry| {
            serde_json::json!({
                "moduleId": entry.module_id,
                "module": labels.module(&entry.module_id),
                "workContent": entry.work_content,
            })
        })
        .collect();
    serde_json::json!({
        "id": report.id,
        "user": labels.user(&report.user_id),
        "dateRange": date_range(report),
        "domain": labels.node(Level::Domain, report.selection.domain_id.as_ref()),
        "brand": labels.node(Level::Brand, report.selection.brand_id.as_ref()),
        "model": labels.node(Level::Model, report.selection.model_id.as_ref()),
        "baseline": labels.node(Level::Baseline, report.selection.baseline_id.as_ref()),
        "status": report.status,
        "updatedAt": report.updated_at,
        "content": content,
    })
}

fn print_report(report: &Report, labels: &Labels<'_>) {
    println!("Report {}", report.id);
    println!("  User:     {}", labels.user(&report.user_id));
    println!("  Period:   {}", date_range(report));
    println!(
        "  Path:     {} / {} / {} / {}",
        labels.node(Level::Domain, report.selection.domain_id.as_ref()),
        labels.node(Level::Brand, report.selection.brand_id.as_ref()),
        labels.node(Level::Model, report.selection.model_id.as_ref()),
        labels.node(Level::Baseline, report.selection.baseline_id.as_ref()),
    );
    println!("  Status:   {}", report.status);
    println!(
        "  Updated:  {}",
        report.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
    for entry in &report.content {
        println!("  [{}]", labels.module(&entry.module_id));
        for line in entry.work_content.lines() {
            println!("    {line}");
        }
    }
}

fn print_report_row(report: &Report, labels: &Labels<'_>) {
    println!(
        "  {:<38} {:<24} {:<23} {:<16} {:<9}",
        report.id.as_str(),
        labels.user(&report.user_id),
        date_range(report),
        labels.node(Level::Model, report.selection.model_id.as_ref()),
        report.status,
    );
}

fn print_saved(
    json_mode: bool,
    verb: &str,
    report: &Report,
    labels: &Labels<'_>,
) -> Result<(), WeeklyError> {
    if json_mode {
        return print_json(&report_json(report, labels));
    }
    println!("{verb} report {} ({})", report.id, report.status);
    Ok(())
}

// =============================================================================
// INIT / SESSION
// =============================================================================

/// Create the database file and seed the default admin.
pub fn cmd_init(settings: &Settings, json_mode: bool, force: bool) -> Result<(), WeeklyError> {
    let path = &settings.database;
    if path.exists() {
        if !force {
            return Err(WeeklyError::Validation(format!(
                "database '{}' already exists (use --force to recreate it)",
                path.display()
            )));
        }
        std::fs::remove_file(path).map_err(|e| {
            WeeklyError::Storage(format!("cannot remove '{}': {e}", path.display()))
        })?;
        tracing::info!(database = %path.display(), "removed existing database");
    }

    let mut repo = Repository::open(path)?;
    repo.flush()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "database": path.display().to_string(),
            "users": repo.users().len(),
        }));
    }
    println!("Initialized {}", path.display());
    println!(
        "Default admin: {} / {}",
        weekly_core::primitives::DEFAULT_ADMIN_USERNAME,
        weekly_core::primitives::DEFAULT_ADMIN_PASSWORD
    );
    Ok(())
}

pub fn cmd_login(
    repo: &mut Repository,
    json_mode: bool,
    username: &str,
    password: &str,
) -> Result<(), WeeklyError> {
    let identity = repo.login(username, password)?;
    repo.flush()?;
    tracing::info!(user = %identity.user_id, "signed in");

    if json_mode {
        return print_json(&serde_json::json!(identity));
    }
    println!("Signed in as {} ({})", identity.username, identity.role);
    Ok(())
}

pub fn cmd_logout(repo: &mut Repository, json_mode: bool) -> Result<(), WeeklyError> {
    let previous = repo.logout();
    repo.flush()?;

    if json_mode {
        return print_json(&serde_json::json!({ "signedOut": previous.is_some() }));
    }
    match previous {
        Some(identity) => println!("Signed out {}", identity.username),
        None => println!("No active session"),
    }
    Ok(())
}

pub fn cmd_whoami(repo: &Repository, json_mode: bool) -> Result<(), WeeklyError> {
    let identity = repo.identity()?;
    if json_mode {
        return print_json(&serde_json::json!(identity));
    }
    println!("{}", repo.users().display_name(&identity.user_id));
    println!("  Id:   {}", identity.user_id);
    println!("  Role: {}", identity.role);
    Ok(())
}

// =============================================================================
// USERS
// =============================================================================

pub fn cmd_user(
    repo: &mut Repository,
    json_mode: bool,
    command: UserCommand,
) -> Result<(), WeeklyError> {
    let actor = repo.identity()?;
    actor.ensure_admin()?;

    match command {
        UserCommand::List => {
            let users = repo.users().records();
            if json_mode {
                let list: Vec<_> = users.iter().map(user_json).collect();
                return print_json(&serde_json::json!(list));
            }
            println!("{} user(s)", users.len());
            for user in users {
                println!(
                    "  {:<38} {:<16} {:<24} {}",
                    user.id.as_str(),
                    user.username,
                    user.name,
                    user.role
                );
            }
            Ok(())
        }
        UserCommand::Add {
            username,
            password,
            name,
            email,
            role,
        } => {
            let user = repo.users_mut().create(
                &actor,
                NewUser {
                    username,
                    password,
                    name,
                    email,
                    role,
                },
            )?;
            repo.flush()?;
            if json_mode {
                return print_json(&user_json(&user));
            }
            println!("Created user {} ({})", user.username, user.id);
            Ok(())
        }
        UserCommand::Edit {
            id,
            username,
            password,
            name,
            email,
            role,
        } => {
            let user = repo.users_mut().update(
                &actor,
                &id,
                UserPatch {
                    username,
                    password,
                    name,
                    email,
                    role,
                },
            )?;
            repo.flush()?;
            if json_mode {
                return print_json(&user_json(&user));
            }
            println!("Updated user {}", user.username);
            Ok(())
        }
        UserCommand::Remove { id } => {
            let user = repo.users_mut().delete(&actor, &id)?;
            repo.flush()?;
            if json_mode {
                return print_json(&user_json(&user));
            }
            println!("Deleted user {}", user.username);
            Ok(())
        }
    }
}

// =============================================================================
// CONFIGURATION CATALOG
// =============================================================================

pub fn cmd_config(
    repo: &mut Repository,
    json_mode: bool,
    command: ConfigCommand,
) -> Result<(), WeeklyError> {
    let actor = repo.identity()?;

    match command {
        ConfigCommand::List { level, parent } => {
            let nodes = repo.config().list_children(level, parent.as_ref());
            if json_mode {
                return print_json(&serde_json::json!(nodes));
            }
            println!("{} {}(s)", nodes.len(), level);
            for node in nodes {
                println!("  {:<38} {}", node.id.as_str(), node.name);
                if !node.description.is_empty() {
                    println!("  {:<38} {}", "", node.description);
                }
            }
            Ok(())
        }
        ConfigCommand::Add {
            level,
            name,
            description,
            refs,
        } => {
            let refs = refs.into_refs(repo.config(), level);
            let mut data = NodeData::named(name).with_refs(refs);
            data.description = description;
            let node = repo.config_mut().add_node(&actor, level, data)?;
            repo.flush()?;
            if json_mode {
                return print_json(&serde_json::json!(node));
            }
            println!("Added {level} {} ({})", node.name, node.id);
            Ok(())
        }
        ConfigCommand::Edit {
            level,
            id,
            name,
            description,
            refs,
        } => {
            let refs = refs.into_patch(repo.config(), level);
            let node = repo.config_mut().update_node(
                &actor,
                level,
                &id,
                NodePatch {
                    name,
                    description,
                    refs,
                },
            )?;
            repo.flush()?;
            if json_mode {
                return print_json(&serde_json::json!(node));
            }
            println!("Updated {level} {}", node.name);
            Ok(())
        }
        ConfigCommand::Remove { level, id, force } => {
            let mode = if force {
                DeleteMode::Force
            } else {
                DeleteMode::Restrict
            };
            let dependents = repo.config().dependents(level, &id);
            let node = repo.config_mut().delete_node(&actor, level, &id, mode)?;
            repo.flush()?;
            if !dependents.is_empty() {
                tracing::warn!(%level, id = %id, %dependents, "deleted node still referenced");
            }
            if json_mode {
                return print_json(&serde_json::json!({
                    "deleted": node,
                    "danglingReferences": dependents.total(),
                }));
            }
            println!("Deleted {level} {}", node.name);
            Ok(())
        }
    }
}

// =============================================================================
// REPORTS
// =============================================================================

pub async fn cmd_report(
    mut repo: Repository,
    settings: &Settings,
    json_mode: bool,
    command: ReportCommand,
) -> Result<(), WeeklyError> {
    let identity = repo.identity()?;

    match command {
        ReportCommand::New {
            selection,
            date,
            end,
            modules,
            submit,
        } => {
            let start = date.unwrap_or_else(|| Local::now().date_naive());
            let draft = ReportDraft {
                selection: selection.into_selection(),
                start_date: Some(start),
                end_date: Some(end.unwrap_or(start)),
                content: modules,
                status: if submit {
                    ReportStatus::Submitted
                } else {
                    ReportStatus::Draft
                },
            };
            let report = repo.save_report(None, draft)?;
            repo.flush()?;
            print_saved(json_mode, "Created", &report, &repo.labels())
        }
        ReportCommand::Edit {
            id,
            selection,
            date,
            end,
            clear_dates,
            modules,
            status,
        } => {
            let dates = |date: Option<_>| if clear_dates { Some(None) } else { date.map(Some) };
            let patch = ReportPatch {
                selection: (!selection.is_empty()).then(|| selection.into_selection()),
                start_date: dates(date),
                end_date: dates(end),
                content: (!modules.is_empty()).then_some(modules),
                status,
            };
            let report = repo.update_report(&id, patch)?;
            repo.flush()?;
            print_saved(json_mode, "Updated", &report, &repo.labels())
        }
        ReportCommand::Submit { id } => {
            let patch = ReportPatch {
                status: Some(ReportStatus::Submitted),
                ..ReportPatch::default()
            };
            let report = repo.update_report(&id, patch)?;
            repo.flush()?;
            print_saved(json_mode, "Submitted", &report, &repo.labels())
        }
        ReportCommand::Show { id } => {
            let report = repo.reports().find_by_id(&identity, &id)?;
            if json_mode {
                return print_json(&report_json(report, &repo.labels()));
            }
            print_report(report, &repo.labels());
            Ok(())
        }
        ReportCommand::Recent => {
            let labels = repo.labels();
            let recent = repo
                .reports()
                .recent(&identity, weekly_core::primitives::RECENT_REPORTS);
            if json_mode {
                let list: Vec<_> = recent.iter().map(|r| report_json(r, &labels)).collect();
                return print_json(&serde_json::json!(list));
            }
            if recent.is_empty() {
                println!("No reports yet");
            }
            for report in recent {
                print_report_row(report, &labels);
            }
            Ok(())
        }
        ReportCommand::Remove { id, remote } => {
            cmd_report_remove(&mut repo, settings, json_mode, &id, remote).await
        }
        ReportCommand::Compose(args) => cmd_report_compose(repo, settings, json_mode, args).await,
    }
}

/// Delete a report locally and, with `remote`, on the remote store too.
async fn cmd_report_remove(
    repo: &mut Repository,
    settings: &Settings,
    json_mode: bool,
    id: &RecordId,
    remote: bool,
) -> Result<(), WeeklyError> {
    let report = repo.delete_report(id)?;
    repo.flush()?;

    let remote_deleted = if remote {
        Some(engine(settings).remove_remote(Collection::Reports, id).await?)
    } else {
        None
    };

    if json_mode {
        return print_json(&serde_json::json!({
            "deleted": report.id,
            "remoteDeleted": remote_deleted,
        }));
    }
    println!("Deleted report {}", report.id);
    match remote_deleted {
        Some(true) => println!("Deleted remote copy"),
        Some(false) => println!("No remote copy existed"),
        None => {}
    }
    Ok(())
}

/// Apply the flags that were given, top level first, so lower levels are
/// not cleared by a later cascade.
fn apply_selection(editor: &mut ReportEditor, repo: &Repository, selection: SelectionArgs) {
    if selection.domain.is_some() {
        editor.select_domain(repo.config(), selection.domain);
    }
    if selection.brand.is_some() {
        editor.select_brand(selection.brand);
    }
    if selection.model.is_some() {
        editor.select_model(selection.model);
    }
    if selection.baseline.is_some() {
        editor.select_baseline(selection.baseline);
    }
}

/// One stdin line of `compose`.
#[derive(Debug, PartialEq, Eq)]
enum ComposeLine {
    Blank,
    SaveNow,
    Work(ContentEntry),
    Invalid,
}

fn parse_compose_line(line: &str) -> ComposeLine {
    let line = line.trim();
    if line.is_empty() {
        return ComposeLine::Blank;
    }
    if line == ":save" {
        return ComposeLine::SaveNow;
    }
    match line.split_once(':') {
        Some((module, text)) if !module.trim().is_empty() => {
            ComposeLine::Work(ContentEntry::new(module.trim(), text.trim()))
        }
        _ => ComposeLine::Invalid,
    }
}

/// Interactive editing with periodic autosave.
///
/// Reads `MODULE_ID: text` lines from stdin until EOF or Ctrl-C. Each line
/// is appended to that module's work content. `:save` saves a draft now.
/// When input ends the report is saved one last time (submitted with
/// `--submit`).
async fn cmd_report_compose(
    repo: Repository,
    settings: &Settings,
    json_mode: bool,
    args: ComposeArgs,
) -> Result<(), WeeklyError> {
    let identity = repo.identity()?;
    let mut editor = match args.report {
        Some(ref id) => ReportEditor::from_report(repo.reports().find_by_id(&identity, id)?),
        None => ReportEditor::new_for_day(args.date.unwrap_or_else(|| Local::now().date_naive())),
    };
    if let (Some(date), Some(_)) = (args.date, args.report.as_ref()) {
        editor.set_date(date);
    }
    apply_selection(&mut editor, &repo, args.selection);

    let shared = Arc::new(Mutex::new(repo));
    let session = EditingSession::new(RepositorySink::new(Arc::clone(&shared)), editor);
    let autosave = AutosaveHandle::start(Arc::clone(&session), settings.autosave_interval());

    if !json_mode {
        eprintln!("Enter `MODULE_ID: text` lines, `:save` to save now, Ctrl-D to finish.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                autosave.stop().await;
                return Err(WeeklyError::Storage(format!("cannot read stdin: {e}")));
            }
        };
        match parse_compose_line(&line) {
            ComposeLine::Blank => {}
            ComposeLine::SaveNow => {
                match session.save(ReportStatus::Draft, SaveTrigger::Manual).await {
                    Ok(SaveOutcome::Saved(report)) => eprintln!("saved {}", report.id),
                    Ok(SaveOutcome::Skipped(reason)) => eprintln!("not saved: {reason:?}"),
                    Err(e) => eprintln!("save failed: {e}"),
                }
            }
            ComposeLine::Work(entry) => {
                session
                    .edit(|editor| editor.append_work(entry.module_id, &entry.work_content))
                    .await;
            }
            ComposeLine::Invalid => eprintln!("ignored: expected MODULE_ID: text"),
        }
    }
    autosave.stop().await;

    let status = if args.submit {
        ReportStatus::Submitted
    } else {
        ReportStatus::Draft
    };
    let outcome = session.save(status, SaveTrigger::Manual).await?;
    let repo = shared.lock().await;
    match outcome {
        SaveOutcome::Saved(report) => print_saved(json_mode, "Saved", &report, &repo.labels()),
        SaveOutcome::Skipped(reason) => Err(WeeklyError::Validation(format!(
            "report was not saved: {reason:?}"
        ))),
    }
}

// =============================================================================
// QUERY / STATS / CLEANUP
// =============================================================================

fn write_or_print(output: Option<&Path>, text: &str) -> Result<(), WeeklyError> {
    match output {
        Some(path) => std::fs::write(path, text).map_err(|e| {
            WeeklyError::Storage(format!("cannot write '{}': {e}", path.display()))
        }),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

pub fn cmd_query(repo: &Repository, json_mode: bool, args: QueryArgs) -> Result<(), WeeklyError> {
    let identity = repo.identity()?;
    let selection = args.selection.into_selection();
    let filter = ReportFilter {
        user_id: args.user,
        domain_id: selection.domain_id,
        brand_id: selection.brand_id,
        model_id: selection.model_id,
        baseline_id: selection.baseline_id,
        status: args.status,
        start_date: args.from,
        end_date: args.to,
    };
    let results = QueryEngine::run(repo.reports(), &identity, &filter);
    let labels = repo.labels();

    match args.format {
        OutputFormat::Csv => {
            return write_or_print(args.output.as_deref(), &to_csv(&results, &labels));
        }
        OutputFormat::Text => {
            return write_or_print(
                args.output.as_deref(),
                &to_text(&results, &labels, Utc::now()),
            );
        }
        OutputFormat::Table => {}
    }

    let mut pager = Paginator::new(results.len());
    if !pager.go_to_page(args.page) && args.page != 1 {
        tracing::warn!(page = args.page, pages = pager.total_pages(), "page out of range");
    }
    let page = pager.page(&results);

    if json_mode {
        let rows: Vec<_> = page.iter().map(|r| report_json(r, &labels)).collect();
        return print_json(&serde_json::json!({
            "total": pager.total_items(),
            "page": pager.current_page(),
            "pages": pager.total_pages(),
            "reports": rows,
        }));
    }

    println!("{} report(s)", pager.total_items());
    for report in page {
        print_report_row(report, &labels);
    }
    if pager.total_pages() > 1 {
        let window: Vec<String> = pager
            .window()
            .map(|n| {
                if n == pager.current_page() {
                    format!("[{n}]")
                } else {
                    n.to_string()
                }
            })
            .collect();
        println!(
            "Page {} of {}: {}",
            pager.current_page(),
            pager.total_pages(),
            window.join(" ")
        );
    }
    Ok(())
}

pub fn cmd_stats(repo: &Repository, json_mode: bool) -> Result<(), WeeklyError> {
    let identity = repo.identity()?;
    let stats = repo.reports().statistics(&identity, Utc::now());
    let catalog: serde_json::Map<String, serde_json::Value> = Level::ALL
        .iter()
        .map(|level| (level.name().to_string(), repo.config().nodes(*level).len().into()))
        .collect();

    if json_mode {
        return print_json(&serde_json::json!({
            "reports": stats,
            "users": repo.users().len(),
            "catalog": catalog,
        }));
    }
    println!("Reports:       {}", stats.total);
    println!("Active users:  {}", stats.active_users);
    println!("Mine:          {}", stats.mine);
    println!("Drafts:        {}", stats.drafts);
    println!("Users:         {}", repo.users().len());
    for level in Level::ALL {
        println!(
            "{:<14} {}",
            format!("{}:", level.name()),
            repo.config().nodes(level).len()
        );
    }
    Ok(())
}

pub fn cmd_cleanup(repo: &mut Repository, json_mode: bool, days: i64) -> Result<(), WeeklyError> {
    if days < 0 {
        return Err(WeeklyError::Validation("days must not be negative".to_string()));
    }
    let actor = repo.identity()?;
    let cutoff = Utc::now() - Duration::days(days);
    let removed = repo.reports_mut().purge_submitted_before(&actor, cutoff)?;
    repo.flush()?;
    tracing::info!(removed, days, "cleanup complete");

    if json_mode {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    println!("Removed {removed} submitted report(s) older than {days} day(s)");
    Ok(())
}

// =============================================================================
// SYNC
// =============================================================================

fn engine(settings: &Settings) -> SyncEngine<HttpRemote> {
    SyncEngine::new(HttpRemote::new(
        &settings.remote.url,
        settings.remote.api_key.clone(),
    ))
}

pub async fn cmd_sync(
    repo: &mut Repository,
    settings: &Settings,
    json_mode: bool,
    command: SyncCommand,
) -> Result<(), WeeklyError> {
    let engine = engine(settings);

    match command {
        SyncCommand::Push => {
            repo.identity()?;
            let summary = engine.push(repo).await?;
            if json_mode {
                return print_json(&serde_json::json!(summary));
            }
            println!(
                "Pushed {} record(s): {} report(s), {} user(s), config {}",
                summary.total(),
                summary.reports,
                summary.users,
                if summary.config { "uploaded" } else { "unchanged" }
            );
            Ok(())
        }
        SyncCommand::Pull => {
            let summary = engine.pull(repo).await?;
            if json_mode {
                return print_json(&serde_json::json!(summary));
            }
            println!(
                "Pulled {} report(s), {} user(s), {} catalog node(s)",
                summary.reports, summary.users, summary.config_nodes
            );
            Ok(())
        }
        SyncCommand::Inspect { collection, id } => {
            let record = engine.inspect(collection, &id).await?;
            match record {
                Some(value) => print_json(&value),
                None if json_mode => print_json(&serde_json::Value::Null),
                None => {
                    println!("No remote {collection} record {id}");
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn compose_lines() {
        assert_eq!(parse_compose_line("   "), ComposeLine::Blank);
        assert_eq!(parse_compose_line(":save"), ComposeLine::SaveNow);
        assert_eq!(
            parse_compose_line("cam: fixed autofocus"),
            ComposeLine::Work(ContentEntry::new("cam", "fixed autofocus"))
        );
        assert_eq!(parse_compose_line("no module here"), ComposeLine::Invalid);
        assert_eq!(parse_compose_line(": orphan"), ComposeLine::Invalid);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            database: dir.path().join("weekly.redb"),
            ..Settings::default()
        };
        cmd_init(&settings, true, false).unwrap();
        assert!(cmd_init(&settings, true, false).is_err());
        cmd_init(&settings, true, true).unwrap();
    }

    #[tokio::test]
    async fn report_commands_need_a_session() {
        let repo = Repository::in_memory();
        let err = cmd_report(repo, &Settings::default(), true, ReportCommand::Recent)
            .await
            .unwrap_err();
        assert!(matches!(err, WeeklyError::Authentication(_)));
    }

    #[tokio::test]
    async fn report_remove_runs_locally_without_remote() {
        let mut repo = Repository::in_memory();
        repo.login("admin", "admin123").unwrap();
        let report = repo.save_report(None, ReportDraft::default()).unwrap();
        cmd_report_remove(&mut repo, &Settings::default(), true, &report.id, false)
            .await
            .unwrap();
        assert!(repo.reports().is_empty());
    }

    #[test]
    fn user_commands_are_admin_only() {
        let mut repo = Repository::in_memory();
        let admin = repo.login("admin", "admin123").unwrap();
        repo.users_mut()
            .create(
                &admin,
                NewUser {
                    username: "li".to_string(),
                    password: "secret1".to_string(),
                    name: "Li".to_string(),
                    email: String::new(),
                    role: weekly_core::Role::User,
                },
            )
            .unwrap();
        repo.logout();
        repo.login("li", "secret1").unwrap();
        let err = cmd_user(&mut repo, true, UserCommand::List).unwrap_err();
        assert!(matches!(err, WeeklyError::Permission(_)));
    }

    #[test]
    fn cleanup_rejects_negative_days() {
        let mut repo = Repository::in_memory();
        repo.login("admin", "admin123").unwrap();
        assert!(cmd_cleanup(&mut repo, true, -1).is_err());
        cmd_cleanup(&mut repo, true, 30).unwrap();
    }
}
